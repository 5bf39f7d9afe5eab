use crate::cli::open_db;
use crate::error::Result;
use crate::settings::{load_settings, save_settings, shellexpand_path};
use crate::store::{count, ReviewFilter};

/// Point chit at an existing data directory. The store there is opened and
/// queried before the switch is saved, so a bad path leaves settings alone.
pub fn run(path: &str) -> Result<()> {
    let mut settings = load_settings();
    settings.data_dir = shellexpand_path(path);

    let conn = open_db(&settings)?;
    let total = count(&conn, ReviewFilter::All)?;
    let pending = count(&conn, ReviewFilter::Pending)?;
    drop(conn);

    save_settings(&settings)?;
    tracing::info!(data_dir = %settings.data_dir, "switched data directory");
    println!(
        "Switched to {} ({total} receipts, {pending} pending review)",
        settings.db_path().display()
    );
    Ok(())
}
