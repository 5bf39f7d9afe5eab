use std::collections::HashSet;
use std::path::Path;

use rusqlite::{Connection, OptionalExtension};

use crate::categories::{remember, CategoryField};
use crate::error::{ChitError, Result};
use crate::filename::{canonicalize, make_unique};
use crate::fx::RateDefaults;
use crate::models::{NewReceipt, Receipt, RECEIPT_COLUMNS};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewFilter {
    All,
    Reviewed,
    Pending,
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct DeleteOutcome {
    pub deleted: bool,
    pub file_removed: bool,
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct ClearOutcome {
    pub records: usize,
    pub files: usize,
}

/// Insert a new, unreviewed receipt. When the extraction found a local
/// amount, an initial reporting amount is computed from `defaults`.
pub fn add_receipt(conn: &Connection, new: &NewReceipt, defaults: &RateDefaults) -> Result<i64> {
    let extraction = &new.extraction;
    let reporting = defaults.reporting_amount(extraction.total_amount);
    conn.execute(
        "INSERT INTO receipts (filename, file_path, checksum, ocr_text, restaurant_name, date, \
         total_amount, accounting_category, country, cost_center, fx_rate, markup_percent, \
         reporting_amount) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
        rusqlite::params![
            new.filename,
            new.file_path,
            new.checksum,
            new.ocr_text,
            extraction.restaurant_name,
            extraction.date,
            extraction.total_amount,
            new.accounting_category,
            new.country,
            new.cost_center,
            defaults.fx_rate,
            defaults.markup_percent,
            reporting,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn get_receipt(conn: &Connection, id: i64) -> Result<Option<Receipt>> {
    let sql = format!("SELECT {RECEIPT_COLUMNS} FROM receipts WHERE id = ?1");
    let receipt = conn.query_row(&sql, [id], Receipt::from_row).optional()?;
    Ok(receipt)
}

/// Newest first, as uploaded.
pub fn list_receipts(conn: &Connection, filter: ReviewFilter) -> Result<Vec<Receipt>> {
    let clause = match filter {
        ReviewFilter::All => "",
        ReviewFilter::Reviewed => "WHERE reviewed = 1",
        ReviewFilter::Pending => "WHERE reviewed = 0",
    };
    let sql = format!("SELECT {RECEIPT_COLUMNS} FROM receipts {clause} ORDER BY created_at DESC, id DESC");
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([], Receipt::from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Reviewed receipts in report order: by date, undated last, then by id.
pub fn list_reviewed(conn: &Connection) -> Result<Vec<Receipt>> {
    let sql = format!(
        "SELECT {RECEIPT_COLUMNS} FROM receipts WHERE reviewed = 1 \
         ORDER BY date IS NULL, date, id"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([], Receipt::from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn find_by_checksum(conn: &Connection, checksum: &str) -> Result<Option<i64>> {
    let id = conn
        .query_row(
            "SELECT id FROM receipts WHERE checksum = ?1 ORDER BY id LIMIT 1",
            [checksum],
            |r| r.get(0),
        )
        .optional()?;
    Ok(id)
}

pub fn count(conn: &Connection, filter: ReviewFilter) -> Result<i64> {
    let sql = match filter {
        ReviewFilter::All => "SELECT count(*) FROM receipts",
        ReviewFilter::Reviewed => "SELECT count(*) FROM receipts WHERE reviewed = 1",
        ReviewFilter::Pending => "SELECT count(*) FROM receipts WHERE reviewed = 0",
    };
    Ok(conn.query_row(sql, [], |r| r.get(0))?)
}

/// Display filenames already claimed by reviewed receipts, excluding
/// `except` (the receipt being (re)named).
///
/// This is the one namespace display names are deduplicated in. Reports
/// read the stored names and never deduplicate again.
pub(crate) fn taken_display_names(conn: &Connection, except: Option<i64>) -> Result<HashSet<String>> {
    let mut stmt = conn.prepare(
        "SELECT display_filename FROM receipts \
         WHERE reviewed = 1 AND display_filename IS NOT NULL AND id != ?1",
    )?;
    let names = stmt
        .query_map([except.unwrap_or(-1)], |r| r.get(0))?
        .collect::<std::result::Result<HashSet<String>, _>>()?;
    Ok(names)
}

/// Remove a receipt row. `false` when no receipt has that id.
pub fn delete_receipt(conn: &Connection, id: i64) -> Result<bool> {
    let n = conn.execute("DELETE FROM receipts WHERE id = ?1", [id])?;
    Ok(n > 0)
}

/// Delete a receipt and its backing file. The file is kept while another
/// receipt (a split sibling) still points at it; a file that is already
/// gone is not an error.
pub fn delete_receipt_and_file(conn: &Connection, id: i64) -> Result<DeleteOutcome> {
    let Some(receipt) = get_receipt(conn, id)? else {
        return Ok(DeleteOutcome::default());
    };
    if !delete_receipt(conn, id)? {
        return Ok(DeleteOutcome::default());
    }

    let still_used: i64 = conn.query_row(
        "SELECT count(*) FROM receipts WHERE file_path = ?1",
        [&receipt.file_path],
        |r| r.get(0),
    )?;
    let file_removed = if still_used == 0 {
        remove_backing_file(Path::new(&receipt.file_path))
    } else {
        tracing::debug!(id, path = %receipt.file_path, still_used, "file shared with other receipts, kept");
        false
    };

    Ok(DeleteOutcome { deleted: true, file_removed })
}

fn remove_backing_file(path: &Path) -> bool {
    if !path.exists() {
        tracing::warn!(path = %path.display(), "backing file already missing");
        return false;
    }
    match std::fs::remove_file(path) {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "could not delete backing file");
            false
        }
    }
}

/// Replace one receipt with one reviewed copy per cost center, each
/// carrying an even share of the local and reporting amounts.
///
/// Fewer than two centers (or a blank center) is rejected before anything
/// is read or written. `Ok(None)` when the receipt does not exist.
/// Insertions and the deletion of the original happen in one transaction.
pub fn split_by_cost_center(
    conn: &mut Connection,
    id: i64,
    cost_centers: &[String],
    name_cap: Option<usize>,
) -> Result<Option<Vec<i64>>> {
    if cost_centers.len() < 2 {
        return Err(ChitError::Validation(
            "Need at least 2 cost centers to split".to_string(),
        ));
    }
    if cost_centers.iter().any(|c| c.trim().is_empty()) {
        return Err(ChitError::Validation("Cost center names cannot be blank".to_string()));
    }

    let tx = conn.transaction()?;
    let Some(original) = get_receipt(&tx, id)? else {
        return Ok(None);
    };

    let n = cost_centers.len() as f64;
    let local_share = original.total_amount.map(|a| a / n);
    let reporting_share = original.reporting_amount.map(|a| a / n);
    // A receipt whose date was cleared after review keeps its old name;
    // the children still need distinct names derived from it.
    let candidate = canonicalize(
        original.date.as_deref(),
        original.restaurant_name.as_deref(),
        name_cap,
    )
    .or_else(|| original.display_filename.clone());

    let mut new_ids = Vec::with_capacity(cost_centers.len());
    for center in cost_centers {
        let center = center.trim();
        // Siblings inserted earlier in this loop are already in the taken set.
        let display = match &candidate {
            Some(c) => Some(make_unique(c, &taken_display_names(&tx, Some(id))?)),
            None => None,
        };
        tx.execute(
            "INSERT INTO receipts (filename, file_path, checksum, ocr_text, restaurant_name, date, \
             total_amount, accounting_category, country, cost_center, fx_rate, markup_percent, \
             reporting_amount, reimbursement, detail, display_filename, reviewed) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, 1)",
            rusqlite::params![
                original.filename,
                original.file_path,
                original.checksum,
                original.ocr_text,
                original.restaurant_name,
                original.date,
                local_share,
                original.accounting_category,
                original.country,
                center,
                original.fx_rate,
                original.markup_percent,
                reporting_share,
                original.reimbursement,
                original.detail,
                display,
            ],
        )?;
        new_ids.push(tx.last_insert_rowid());
        remember(&tx, CategoryField::CostCenter, center)?;
    }

    tx.execute("DELETE FROM receipts WHERE id = ?1", [id])?;
    tx.commit()?;

    tracing::info!(id, parts = new_ids.len(), "split receipt across cost centers");
    Ok(Some(new_ids))
}

/// Delete every receipt, then every distinct backing file. Records and
/// files are counted separately: a file already missing from disk does not
/// stop the records from going.
pub fn clear_all(conn: &mut Connection) -> Result<ClearOutcome> {
    let tx = conn.transaction()?;
    let paths: Vec<String> = {
        let mut stmt = tx.prepare("SELECT DISTINCT file_path FROM receipts")?;
        let rows = stmt
            .query_map([], |r| r.get(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        rows
    };
    let records = tx.execute("DELETE FROM receipts", [])?;
    tx.commit()?;

    let files = paths
        .iter()
        .filter(|p| remove_backing_file(Path::new(p)))
        .count();

    Ok(ClearOutcome { records, files })
}
