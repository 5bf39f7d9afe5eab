//! Reports over reviewed receipts.
//!
//! Every export reads the stored display filename of each receipt. Names
//! are never recomputed here, so a report always agrees with what the
//! reviewer saw.

pub mod csv;
#[cfg(feature = "excel")]
pub mod xlsx;

use std::path::{Path, PathBuf};

use rusqlite::Connection;

use crate::error::{ChitError, Result};
use crate::filename::year_month;
use crate::fmt::day_month_year;
use crate::models::Receipt;
use crate::ocr::is_pdf;
use crate::store::list_reviewed;

/// Fixed column order of the accounting export.
pub const ACCOUNTING_HEADERS: [&str; 8] = [
    "Date",
    "Provider",
    "Detail",
    "Amount",
    "Reimbursement",
    "Account",
    "Country",
    "Cost Center",
];

#[derive(Debug, Clone, PartialEq)]
pub struct AccountingRow {
    pub date: String,
    pub provider: String,
    pub detail: String,
    pub amount: f64,
    pub reimbursement: String,
    pub account: String,
    pub country: String,
    pub cost_center: String,
}

impl AccountingRow {
    pub fn from_receipt(r: &Receipt) -> Self {
        Self {
            date: r.date.as_deref().map(day_month_year).unwrap_or_default(),
            provider: r.restaurant_name.clone().unwrap_or_default(),
            detail: r.detail.clone().unwrap_or_default(),
            amount: r.reporting_amount.map(round2).unwrap_or(0.0),
            reimbursement: r.reimbursement.clone().unwrap_or_default(),
            account: r.accounting_category.clone().unwrap_or_default(),
            country: r.country.clone().unwrap_or_default(),
            cost_center: r.cost_center.clone().unwrap_or_default(),
        }
    }
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

pub fn accounting_rows(receipts: &[Receipt]) -> Vec<AccountingRow> {
    receipts.iter().map(AccountingRow::from_receipt).collect()
}

/// Reviewed receipts in report order, or [`ChitError::NothingToExport`].
pub fn reviewed_for_export(conn: &Connection) -> Result<Vec<Receipt>> {
    let receipts = list_reviewed(conn)?;
    if receipts.is_empty() {
        return Err(ChitError::NothingToExport);
    }
    Ok(receipts)
}

/// `YYYY_MM` for the month a report is generated in.
pub fn current_period() -> String {
    chrono::Local::now().format("%Y_%m").to_string()
}

/// `<root>/<period>`, created if needed.
pub fn export_folder(root: &Path, period: &str) -> Result<PathBuf> {
    let folder = root.join(period);
    std::fs::create_dir_all(&folder)?;
    Ok(folder)
}

/// "first to last" over the dated receipts, for report headers.
pub fn date_range(receipts: &[Receipt]) -> String {
    let mut dates: Vec<&str> = receipts.iter().filter_map(|r| r.date.as_deref()).collect();
    dates.sort_unstable();
    match (dates.first(), dates.last()) {
        (Some(first), Some(last)) if first == last => first.to_string(),
        (Some(first), Some(last)) => format!("{first} to {last}"),
        _ => "Undated".to_string(),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SkippedItem {
    pub id: i64,
    pub name: String,
    pub reason: String,
}

#[derive(Debug, Default)]
pub struct FilesExport {
    pub written: Vec<PathBuf>,
    pub skipped: Vec<SkippedItem>,
}

/// Write one PDF per receipt to `<root>/<YYYY_MM>/<display>.pdf`.
///
/// PDF originals are copied as-is and images are converted. Receipts
/// without a date or display name, with a missing backing file, or whose
/// image cannot be converted are collected as skipped instead of failing
/// the batch. Re-running overwrites the same files.
pub fn export_organized_files(receipts: &[Receipt], root: &Path) -> Result<FilesExport> {
    let mut out = FilesExport::default();
    for r in receipts {
        let skip = |reason: &str| SkippedItem {
            id: r.id,
            name: r.export_name(),
            reason: reason.to_string(),
        };

        let (Some(display), Some(period)) = (
            r.display_filename.as_deref(),
            r.date.as_deref().and_then(year_month),
        ) else {
            out.skipped.push(skip("missing date or restaurant name"));
            continue;
        };
        let source = Path::new(&r.file_path);
        if !source.exists() {
            tracing::warn!(id = r.id, path = %r.file_path, "receipt file missing, not exported");
            out.skipped.push(skip("file not found"));
            continue;
        }

        let dest = export_folder(root, &period)?.join(format!("{display}.pdf"));
        match write_receipt_pdf(source, &dest, display) {
            Ok(()) => out.written.push(dest),
            Err(e) => {
                tracing::warn!(id = r.id, error = %e, "receipt conversion failed");
                out.skipped.push(skip(&e.to_string()));
            }
        }
    }
    Ok(out)
}

fn write_receipt_pdf(source: &Path, dest: &Path, title: &str) -> Result<()> {
    if is_pdf(source) {
        std::fs::copy(source, dest)?;
        return Ok(());
    }
    convert_image(source, dest, title)
}

#[cfg(feature = "pdf")]
fn convert_image(source: &Path, dest: &Path, title: &str) -> Result<()> {
    let bytes = crate::pdf::image_to_pdf(source, title)?;
    std::fs::write(dest, bytes)?;
    Ok(())
}

#[cfg(not(feature = "pdf"))]
fn convert_image(_source: &Path, _dest: &Path, _title: &str) -> Result<()> {
    Err(ChitError::Pdf("image conversion requires the pdf feature".to_string()))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn reviewed(id: i64, name: Option<&str>, date: Option<&str>, amount: Option<f64>) -> Receipt {
        Receipt {
            id,
            filename: format!("upload_{id}.jpg"),
            file_path: format!("/nonexistent/upload_{id}.jpg"),
            checksum: None,
            ocr_text: None,
            restaurant_name: name.map(str::to_string),
            date: date.map(str::to_string),
            total_amount: amount.map(|a| a * 20.0),
            accounting_category: Some("Client Meals".to_string()),
            country: Some("MX".to_string()),
            cost_center: Some("General".to_string()),
            fx_rate: Some(20.0),
            markup_percent: Some(2.5),
            reporting_amount: amount,
            reimbursement: Some("Client A".to_string()),
            detail: Some("Team lunch".to_string()),
            display_filename: None,
            reviewed: true,
            created_at: String::new(),
            updated_at: String::new(),
        }
    }

    #[test]
    fn test_row_formats_date_and_rounds() {
        let row = AccountingRow::from_receipt(&reviewed(1, Some("Cafe"), Some("2025-10-15"), Some(51.254)));
        assert_eq!(row.date, "15/10/2025");
        assert_eq!(row.provider, "Cafe");
        assert_eq!(row.amount, 51.25);
        assert_eq!(row.account, "Client Meals");
    }

    #[test]
    fn test_row_missing_amount_is_zero() {
        let row = AccountingRow::from_receipt(&reviewed(1, None, Some("oct 15"), None));
        assert_eq!(row.amount, 0.0);
        assert_eq!(row.date, "oct 15");
        assert_eq!(row.provider, "");
    }

    #[test]
    fn test_nothing_to_export() {
        let (_dir, conn) = crate::db::test_db();
        assert!(matches!(reviewed_for_export(&conn), Err(ChitError::NothingToExport)));
    }

    #[test]
    fn test_date_range() {
        let rs = vec![
            reviewed(1, None, Some("2025-10-20"), None),
            reviewed(2, None, None, None),
            reviewed(3, None, Some("2025-10-01"), None),
        ];
        assert_eq!(date_range(&rs), "2025-10-01 to 2025-10-20");
        assert_eq!(date_range(&rs[..1]), "2025-10-20");
        assert_eq!(date_range(&rs[1..2]), "Undated");
    }

    #[test]
    fn test_files_export_copies_pdfs_and_collects_skips() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("scan.pdf");
        std::fs::write(&src, b"%PDF-1.4 fake").unwrap();

        let mut ok = reviewed(1, Some("Cafe"), Some("2025-10-15"), Some(10.0));
        ok.file_path = src.to_string_lossy().to_string();
        ok.display_filename = Some("2025_10_Cafe".to_string());
        let mut missing = reviewed(2, Some("Bar"), Some("2025-10-16"), Some(10.0));
        missing.display_filename = Some("2025_10_Bar".to_string());
        let unnamed = reviewed(3, None, None, Some(1.0));

        let root = dir.path().join("out");
        let result = export_organized_files(&[ok.clone(), missing, unnamed], &root).unwrap();
        let expected = root.join("2025_10").join("2025_10_Cafe.pdf");
        assert_eq!(result.written, vec![expected.clone()]);
        assert_eq!(std::fs::read(&expected).unwrap(), b"%PDF-1.4 fake");
        let reasons: Vec<_> = result.skipped.iter().map(|s| (s.id, s.reason.as_str())).collect();
        assert_eq!(reasons, vec![(2, "file not found"), (3, "missing date or restaurant name")]);

        let again = export_organized_files(&[ok], &root).unwrap();
        assert_eq!(again.written, vec![expected]);
        assert_eq!(std::fs::read_dir(root.join("2025_10")).unwrap().count(), 1);
    }

    #[test]
    fn test_files_export_reports_bad_image() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("scan.jpg");
        std::fs::write(&src, b"not a jpeg").unwrap();
        let mut r = reviewed(1, Some("Cafe"), Some("2025-10-15"), Some(10.0));
        r.file_path = src.to_string_lossy().to_string();
        r.display_filename = Some("2025_10_Cafe".to_string());

        let result = export_organized_files(&[r], &dir.path().join("out")).unwrap();
        assert!(result.written.is_empty());
        assert_eq!(result.skipped.len(), 1);
    }
}
