use crate::db::get_connection;
use crate::error::Result;
use crate::fmt::{format_bytes, money};
use crate::fx::RateDefaults;
use crate::settings::load_settings;
use crate::store::{count, ReviewFilter};

pub fn run() -> Result<()> {
    let settings = load_settings();
    let db_path = settings.db_path();

    println!("User:       {}", if settings.user_name.is_empty() { "(not set)" } else { &settings.user_name });
    println!("Data dir:   {}", settings.data_dir);
    println!("Database:   {}", db_path.display());
    println!("Exports:    {}", settings.export_dir);

    if db_path.exists() {
        let size = std::fs::metadata(&db_path)?.len();
        println!("DB size:    {}", format_bytes(size));

        let conn = get_connection(&db_path)?;
        let total = count(&conn, ReviewFilter::All)?;
        let pending = count(&conn, ReviewFilter::Pending)?;
        let reporting: f64 = conn.query_row(
            "SELECT COALESCE(SUM(reporting_amount), 0) FROM receipts WHERE reviewed = 1",
            [],
            |r| r.get(0),
        )?;
        let rates = RateDefaults::load(&conn)?;

        println!();
        println!("Receipts:      {total}");
        println!("Reviewed:      {}", total - pending);
        println!("Pending:       {pending}");
        println!("Reviewed total: {}", money(reporting));
        println!("FX rate:       {}", rates.fx_rate);
        println!("Markup:        {}%", rates.markup_percent);
    } else {
        println!();
        println!("Database not found. Run `chit init` to set up.");
    }

    Ok(())
}
