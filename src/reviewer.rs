use rusqlite::{Connection, OptionalExtension};

use crate::categories::{remember, CategoryField};
use crate::error::{ChitError, Result};
use crate::filename::{canonicalize, make_unique};
use crate::fx::to_reporting_amount;
use crate::models::{Receipt, ReceiptUpdate, TrainingExample};
use crate::store::{list_receipts, taken_display_names, ReviewFilter};

/// Receipts still waiting for a human pass, oldest first.
pub fn pending(conn: &Connection) -> Result<Vec<Receipt>> {
    let mut rows = list_receipts(conn, ReviewFilter::Pending)?;
    rows.reverse();
    Ok(rows)
}

/// Save a reviewed receipt.
///
/// Overwrites every correctable and accounting field, recomputes the
/// reporting amount, and renames the receipt when both a valid date and a
/// restaurant name are present. Without them the previous display filename
/// is kept. The new name is made unique against the other reviewed
/// receipts, so re-submitting the same receipt keeps its name.
///
/// Returns `false` when no receipt has that id. A non-positive FX rate is
/// rejected before anything is written.
pub fn apply_review(
    conn: &mut Connection,
    id: i64,
    update: &ReceiptUpdate,
    name_cap: Option<usize>,
) -> Result<bool> {
    if let Some(rate) = update.fx_rate {
        if !(rate.is_finite() && rate > 0.0) {
            return Err(ChitError::Validation(format!(
                "FX rate must be a positive number, got {rate}"
            )));
        }
    }
    if update.markup_percent.is_some_and(|m| !m.is_finite()) {
        return Err(ChitError::Validation("Markup must be a finite number".to_string()));
    }

    let tx = conn.transaction()?;
    let previous: Option<Option<String>> = tx
        .query_row(
            "SELECT display_filename FROM receipts WHERE id = ?1",
            [id],
            |r| r.get(0),
        )
        .optional()?;
    let Some(previous_name) = previous else {
        return Ok(false);
    };

    let reporting = to_reporting_amount(update.total_amount, update.fx_rate, update.markup_percent);
    let display_name = match canonicalize(
        update.date.as_deref(),
        update.restaurant_name.as_deref(),
        name_cap,
    ) {
        Some(candidate) => Some(make_unique(&candidate, &taken_display_names(&tx, Some(id))?)),
        None => previous_name,
    };

    tx.execute(
        "UPDATE receipts SET restaurant_name = ?1, date = ?2, total_amount = ?3, \
         accounting_category = ?4, country = ?5, cost_center = ?6, fx_rate = ?7, \
         markup_percent = ?8, reporting_amount = ?9, reimbursement = ?10, detail = ?11, \
         display_filename = ?12, reviewed = 1, updated_at = datetime('now') WHERE id = ?13",
        rusqlite::params![
            update.restaurant_name,
            update.date,
            update.total_amount,
            update.accounting_category,
            update.country,
            update.cost_center,
            update.fx_rate,
            update.markup_percent,
            reporting,
            update.reimbursement,
            update.detail,
            display_name,
            id,
        ],
    )?;

    for (field, value) in [
        (CategoryField::AccountingCategory, &update.accounting_category),
        (CategoryField::CostCenter, &update.cost_center),
        (CategoryField::Reimbursement, &update.reimbursement),
    ] {
        if let Some(v) = value {
            remember(&tx, field, v)?;
        }
    }
    tx.commit()?;

    tracing::debug!(id, name = ?display_name, "receipt reviewed");
    Ok(true)
}

/// Most recently corrected receipts with every extracted field present,
/// used as few-shot examples for the extraction prompt.
pub fn training_examples(conn: &Connection, limit: usize) -> Result<Vec<TrainingExample>> {
    let mut stmt = conn.prepare(
        "SELECT ocr_text, restaurant_name, date, total_amount FROM receipts \
         WHERE reviewed = 1 AND ocr_text IS NOT NULL AND restaurant_name IS NOT NULL \
         AND date IS NOT NULL AND total_amount IS NOT NULL \
         ORDER BY updated_at DESC, id DESC LIMIT ?1",
    )?;
    let rows = stmt
        .query_map([limit as i64], |row| {
            Ok(TrainingExample {
                ocr_text: row.get(0)?,
                restaurant_name: row.get(1)?,
                date: row.get(2)?,
                total_amount: row.get(3)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Parse a user-typed number. Blank means "not provided"; anything else
/// that is not a number is an error rather than a silent default.
/// Thousands separators and a leading `$` are accepted.
pub fn parse_number(field: &str, raw: &str) -> Result<Option<f64>> {
    let cleaned: String = raw.trim().trim_start_matches('$').replace(',', "");
    if cleaned.is_empty() {
        return Ok(None);
    }
    match cleaned.parse::<f64>() {
        Ok(n) if n.is_finite() => Ok(Some(n)),
        _ => Err(ChitError::InvalidNumber {
            field: field.to_string(),
            value: raw.to_string(),
        }),
    }
}

/// Validate a user-typed ISO date. Blank means "not provided".
pub fn parse_date(raw: &str) -> Result<Option<String>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    chrono::NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .map(|d| Some(d.format("%Y-%m-%d").to_string()))
        .map_err(|_| ChitError::Validation(format!("Invalid date '{trimmed}', expected YYYY-MM-DD")))
}
