use std::io::Write;
use std::path::Path;

use super::{AccountingRow, ACCOUNTING_HEADERS};
use crate::error::Result;

/// Accounting CSV over any writer.
pub fn write_accounting_csv<W: Write>(rows: &[AccountingRow], out: W) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(out);
    wtr.write_record(ACCOUNTING_HEADERS)?;
    for row in rows {
        let amount = format!("{:.2}", row.amount);
        wtr.write_record([
            row.date.as_str(),
            row.provider.as_str(),
            row.detail.as_str(),
            amount.as_str(),
            row.reimbursement.as_str(),
            row.account.as_str(),
            row.country.as_str(),
            row.cost_center.as_str(),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn export_csv(rows: &[AccountingRow], path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let file = std::fs::File::create(path)?;
    write_accounting_csv(rows, file)
}
