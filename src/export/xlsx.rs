use std::path::Path;

use rust_xlsxwriter::{Color, Format, FormatAlign, Workbook};

use super::{AccountingRow, ACCOUNTING_HEADERS};
use crate::error::{ChitError, Result};

const SHEET_NAME: &str = "Expenses";
const HEADER_BG: u32 = 0x366092;
const MAX_COL_WIDTH: usize = 50;
const AMOUNT_COL: usize = 3;

fn xlsx_err(e: rust_xlsxwriter::XlsxError) -> ChitError {
    ChitError::Excel(e.to_string())
}

fn cell_texts(row: &AccountingRow) -> [String; 8] {
    [
        row.date.clone(),
        row.provider.clone(),
        row.detail.clone(),
        format!("{:.2}", row.amount),
        row.reimbursement.clone(),
        row.account.clone(),
        row.country.clone(),
        row.cost_center.clone(),
    ]
}

/// Column widths: longest header or value plus two, capped.
fn column_widths(rows: &[AccountingRow]) -> [usize; 8] {
    let mut widths = ACCOUNTING_HEADERS.map(|h| h.chars().count());
    for row in rows {
        for (w, text) in widths.iter_mut().zip(cell_texts(row)) {
            *w = (*w).max(text.chars().count());
        }
    }
    widths.map(|w| (w + 2).min(MAX_COL_WIDTH))
}

/// Accounting workbook with one "Expenses" sheet in the CSV column order.
pub fn export_excel(rows: &[AccountingRow], path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let mut workbook = Workbook::new();
    let sheet = workbook
        .add_worksheet()
        .set_name(SHEET_NAME)
        .map_err(xlsx_err)?;

    let header = Format::new()
        .set_bold()
        .set_font_color(Color::White)
        .set_background_color(Color::RGB(HEADER_BG))
        .set_align(FormatAlign::Center);
    let amount = Format::new().set_num_format("#,##0.00");

    for (col, title) in ACCOUNTING_HEADERS.iter().enumerate() {
        sheet
            .write_string_with_format(0, col as u16, *title, &header)
            .map_err(xlsx_err)?;
    }

    for (i, row) in rows.iter().enumerate() {
        let r = (i + 1) as u32;
        for (col, text) in cell_texts(row).iter().enumerate() {
            if col == AMOUNT_COL {
                sheet
                    .write_number_with_format(r, col as u16, row.amount, &amount)
                    .map_err(xlsx_err)?;
            } else {
                sheet.write_string(r, col as u16, text).map_err(xlsx_err)?;
            }
        }
    }

    for (col, width) in column_widths(rows).iter().enumerate() {
        sheet
            .set_column_width(col as u16, *width as f64)
            .map_err(xlsx_err)?;
    }

    workbook.save(path).map_err(xlsx_err)?;
    Ok(())
}
