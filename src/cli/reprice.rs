use crate::cli::open_db;
use crate::error::{ChitError, Result};
use crate::fx::{reprice_all, DEFAULT_MARKUP_PERCENT};
use crate::reviewer::parse_number;
use crate::settings::load_settings;

pub fn run(fx_rate: &str, markup: Option<&str>) -> Result<()> {
    let rate = parse_number("fx-rate", fx_rate)?
        .ok_or_else(|| ChitError::Validation("FX rate is required".to_string()))?;
    let markup = match markup {
        Some(raw) => parse_number("markup", raw)?,
        None => None,
    };

    let mut conn = open_db(&load_settings())?;
    let updated = reprice_all(&mut conn, rate, markup)?;
    println!(
        "Repriced {updated} receipt(s) at FX {rate} with {}% markup.",
        markup.unwrap_or(DEFAULT_MARKUP_PERCENT)
    );
    println!("New receipts will use these rates.");
    Ok(())
}
