//! Local-currency to reporting-currency conversion.

use rusqlite::Connection;

use crate::db::{get_setting, set_setting};
use crate::error::{ChitError, Result};

pub const DEFAULT_FX_RATE: f64 = 20.0;
pub const DEFAULT_MARKUP_PERCENT: f64 = 2.5;

const FX_RATE_KEY: &str = "default_fx_rate";
const MARKUP_KEY: &str = "default_markup_percent";

/// `(local / fx_rate) * (1 + markup / 100)`.
///
/// `None` when the local amount is missing or not positive, or the rate is
/// missing or not positive. A missing markup means [`DEFAULT_MARKUP_PERCENT`].
pub fn to_reporting_amount(
    local_amount: Option<f64>,
    fx_rate: Option<f64>,
    markup_percent: Option<f64>,
) -> Option<f64> {
    let local = local_amount.filter(|a| a.is_finite() && *a > 0.0)?;
    let rate = fx_rate.filter(|r| r.is_finite() && *r > 0.0)?;
    let markup = markup_percent.unwrap_or(DEFAULT_MARKUP_PERCENT);
    let amount = (local / rate) * (1.0 + markup / 100.0);
    amount.is_finite().then_some(amount)
}

/// Store-wide rate and markup applied to newly created receipts.
/// Callers load it once and pass it down; nothing reads it implicitly.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RateDefaults {
    pub fx_rate: f64,
    pub markup_percent: f64,
}

impl Default for RateDefaults {
    fn default() -> Self {
        Self {
            fx_rate: DEFAULT_FX_RATE,
            markup_percent: DEFAULT_MARKUP_PERCENT,
        }
    }
}

impl RateDefaults {
    pub fn load(conn: &Connection) -> Result<Self> {
        let fallback = Self::default();
        Ok(Self {
            fx_rate: read_number(conn, FX_RATE_KEY)?.unwrap_or(fallback.fx_rate),
            markup_percent: read_number(conn, MARKUP_KEY)?.unwrap_or(fallback.markup_percent),
        })
    }

    pub fn save(&self, conn: &Connection) -> Result<()> {
        set_setting(conn, FX_RATE_KEY, &self.fx_rate.to_string())?;
        set_setting(conn, MARKUP_KEY, &self.markup_percent.to_string())?;
        Ok(())
    }

    pub fn reporting_amount(&self, local_amount: Option<f64>) -> Option<f64> {
        to_reporting_amount(local_amount, Some(self.fx_rate), Some(self.markup_percent))
    }
}

fn read_number(conn: &Connection, key: &str) -> Result<Option<f64>> {
    let raw = get_setting(conn, key)?;
    Ok(raw.and_then(|v| match v.trim().parse::<f64>() {
        Ok(n) => Some(n),
        Err(_) => {
            tracing::warn!(key, value = %v, "ignoring non-numeric setting");
            None
        }
    }))
}

/// Apply a new rate and markup to every receipt with a positive local
/// amount and make them the defaults for future receipts.
///
/// Runs in one transaction: either every eligible receipt and both
/// defaults are updated, or nothing is. Returns the number of receipts
/// repriced.
pub fn reprice_all(conn: &mut Connection, fx_rate: f64, markup_percent: Option<f64>) -> Result<usize> {
    if !(fx_rate.is_finite() && fx_rate > 0.0) {
        return Err(ChitError::Validation(format!(
            "FX rate must be a positive number, got {fx_rate}"
        )));
    }
    let markup = markup_percent.unwrap_or(DEFAULT_MARKUP_PERCENT);
    if !markup.is_finite() {
        return Err(ChitError::Validation("Markup must be a finite number".to_string()));
    }

    let tx = conn.transaction()?;
    RateDefaults { fx_rate, markup_percent: markup }.save(&tx)?;

    let targets: Vec<(i64, f64)> = {
        let mut stmt = tx.prepare(
            "SELECT id, total_amount FROM receipts WHERE total_amount IS NOT NULL AND total_amount > 0",
        )?;
        let rows = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        rows
    };

    let mut updated = 0usize;
    for (id, local) in targets {
        let amount = to_reporting_amount(Some(local), Some(fx_rate), Some(markup));
        tx.execute(
            "UPDATE receipts SET fx_rate = ?1, markup_percent = ?2, reporting_amount = ?3, \
             updated_at = datetime('now') WHERE id = ?4",
            rusqlite::params![fx_rate, markup, amount, id],
        )?;
        updated += 1;
    }
    tx.commit()?;

    tracing::info!(updated, fx_rate, markup, "repriced receipts");
    Ok(updated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_db;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_reporting_amount_formula() {
        let amount = to_reporting_amount(Some(1000.0), Some(20.0), Some(2.5)).unwrap();
        assert!(approx(amount, 51.25), "got {amount}");
    }

    #[test]
    fn test_markup_defaults_to_two_and_a_half() {
        let amount = to_reporting_amount(Some(200.0), Some(10.0), None).unwrap();
        assert!(approx(amount, 20.5));
    }

    #[test]
    fn test_zero_markup_is_plain_conversion() {
        let amount = to_reporting_amount(Some(180.0), Some(18.0), Some(0.0)).unwrap();
        assert!(approx(amount, 10.0));
    }

    #[test]
    fn test_rejects_bad_rate() {
        assert_eq!(to_reporting_amount(Some(1000.0), Some(0.0), Some(2.5)), None);
        assert_eq!(to_reporting_amount(Some(1000.0), Some(-3.0), Some(2.5)), None);
        assert_eq!(to_reporting_amount(Some(1000.0), None, Some(2.5)), None);
    }

    #[test]
    fn test_rejects_bad_amount() {
        assert_eq!(to_reporting_amount(None, Some(20.0), Some(2.5)), None);
        assert_eq!(to_reporting_amount(Some(0.0), Some(20.0), Some(2.5)), None);
        assert_eq!(to_reporting_amount(Some(-5.0), Some(20.0), Some(2.5)), None);
    }

    #[test]
    fn test_overflow_is_not_an_amount() {
        assert_eq!(to_reporting_amount(Some(1e308), Some(1e-300), Some(2.5)), None);
    }

    #[test]
    fn test_defaults_fall_back_when_unset() {
        let (_dir, conn) = test_db();
        assert_eq!(RateDefaults::load(&conn).unwrap(), RateDefaults::default());
    }

    #[test]
    fn test_defaults_roundtrip() {
        let (_dir, conn) = test_db();
        let d = RateDefaults { fx_rate: 17.4, markup_percent: 3.0 };
        d.save(&conn).unwrap();
        assert_eq!(RateDefaults::load(&conn).unwrap(), d);
    }

    fn insert(conn: &Connection, amount: Option<f64>) -> i64 {
        conn.execute(
            "INSERT INTO receipts (filename, file_path, total_amount, fx_rate, markup_percent) \
             VALUES ('r.jpg', '/tmp/r.jpg', ?1, 20.0, 2.5)",
            [amount],
        ).unwrap();
        conn.last_insert_rowid()
    }

    #[test]
    fn test_reprice_skips_missing_amounts() {
        let (_dir, mut conn) = test_db();
        insert(&conn, Some(1000.0));
        insert(&conn, Some(500.0));
        insert(&conn, Some(250.0));
        let skipped = insert(&conn, None);

        let updated = reprice_all(&mut conn, 10.0, Some(0.0)).unwrap();
        assert_eq!(updated, 3);

        let (rate, amount): (f64, Option<f64>) = conn.query_row(
            "SELECT fx_rate, reporting_amount FROM receipts WHERE id = ?1", [skipped],
            |r| Ok((r.get(0)?, r.get(1)?)),
        ).unwrap();
        assert!(approx(rate, 20.0), "skipped receipt keeps its rate");
        assert_eq!(amount, None);

        let total: f64 = conn
            .query_row("SELECT SUM(reporting_amount) FROM receipts", [], |r| r.get(0))
            .unwrap();
        assert!(approx(total, 175.0));
    }

    #[test]
    fn test_reprice_sets_new_defaults() {
        let (_dir, mut conn) = test_db();
        reprice_all(&mut conn, 18.75, Some(4.0)).unwrap();
        let d = RateDefaults::load(&conn).unwrap();
        assert!(approx(d.fx_rate, 18.75));
        assert!(approx(d.markup_percent, 4.0));
    }

    #[test]
    fn test_reprice_rejects_non_positive_rate_without_writing() {
        let (_dir, mut conn) = test_db();
        insert(&conn, Some(100.0));
        assert!(matches!(reprice_all(&mut conn, 0.0, None), Err(ChitError::Validation(_))));
        assert!(matches!(reprice_all(&mut conn, -1.0, None), Err(ChitError::Validation(_))));
        assert_eq!(RateDefaults::load(&conn).unwrap(), RateDefaults::default());
        let amount: Option<f64> = conn
            .query_row("SELECT reporting_amount FROM receipts", [], |r| r.get(0))
            .unwrap();
        assert_eq!(amount, None);
    }
}
