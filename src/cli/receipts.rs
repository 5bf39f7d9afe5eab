use std::io::Write;

use colored::Colorize;
use comfy_table::{Cell, Table};

use crate::cli::open_db;
use crate::error::Result;
use crate::fmt::{amount_opt, money_opt};
use crate::settings::load_settings;
use crate::store::{clear_all, delete_receipt_and_file, get_receipt, list_receipts, ReviewFilter};

pub fn list(reviewed: bool, pending: bool) -> Result<()> {
    let conn = open_db(&load_settings())?;
    // The pending queue reads oldest first, in the order it should be worked.
    let receipts = match (reviewed, pending) {
        (true, _) => list_receipts(&conn, ReviewFilter::Reviewed)?,
        (_, true) => crate::reviewer::pending(&conn)?,
        _ => list_receipts(&conn, ReviewFilter::All)?,
    };
    if receipts.is_empty() {
        println!("No receipts.");
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec!["ID", "Date", "Restaurant", "Local", "Amount", "Cost Center", "Name", "Status"]);
    for r in &receipts {
        let status = if r.reviewed { "reviewed".green() } else { "pending".yellow() };
        table.add_row(vec![
            Cell::new(r.id),
            Cell::new(r.date.as_deref().unwrap_or("")),
            Cell::new(r.restaurant_name.as_deref().unwrap_or("")),
            Cell::new(amount_opt(r.total_amount)),
            Cell::new(money_opt(r.reporting_amount)),
            Cell::new(r.cost_center.as_deref().unwrap_or("")),
            Cell::new(r.export_name()),
            Cell::new(status),
        ]);
    }
    println!("Receipts\n{table}");
    Ok(())
}

pub fn show(id: i64) -> Result<()> {
    let conn = open_db(&load_settings())?;
    let Some(r) = get_receipt(&conn, id)? else {
        println!("Receipt {id} not found.");
        return Ok(());
    };

    let opt = |v: &Option<String>| v.clone().unwrap_or_default();
    let mut table = Table::new();
    table.set_header(vec!["Field", "Value"]);
    let rows: Vec<(&str, String)> = vec![
        ("ID", r.id.to_string()),
        ("Uploaded as", r.filename.clone()),
        ("File", r.file_path.clone()),
        ("Export name", r.export_name()),
        ("Restaurant", opt(&r.restaurant_name)),
        ("Date", opt(&r.date)),
        ("Local amount", amount_opt(r.total_amount)),
        ("FX rate", r.fx_rate.map(|v| v.to_string()).unwrap_or_default()),
        ("Markup %", r.markup_percent.map(|v| v.to_string()).unwrap_or_default()),
        ("Amount", money_opt(r.reporting_amount)),
        ("Category", opt(&r.accounting_category)),
        ("Country", opt(&r.country)),
        ("Cost center", opt(&r.cost_center)),
        ("Reimbursement", opt(&r.reimbursement)),
        ("Detail", opt(&r.detail)),
        ("Reviewed", if r.reviewed { "yes".to_string() } else { "no".to_string() }),
        ("Updated", r.updated_at.clone()),
    ];
    for (field, value) in rows {
        table.add_row(vec![Cell::new(field), Cell::new(value)]);
    }
    println!("{table}");

    if let Some(text) = &r.ocr_text {
        println!("\n{}", "OCR text".bold());
        println!("{}", text.trim());
    }
    Ok(())
}

pub fn delete(id: i64) -> Result<()> {
    let conn = open_db(&load_settings())?;
    let outcome = delete_receipt_and_file(&conn, id)?;
    if !outcome.deleted {
        println!("Receipt {id} not found.");
    } else if outcome.file_removed {
        println!("Deleted receipt {id} and its file.");
    } else {
        println!("Deleted receipt {id}.");
    }
    Ok(())
}

pub fn clear(yes: bool) -> Result<()> {
    let mut conn = open_db(&load_settings())?;
    if !yes {
        print!("Delete ALL receipts and their files? Type 'yes' to confirm: ");
        std::io::stdout().flush()?;
        let mut input = String::new();
        std::io::stdin().read_line(&mut input)?;
        if input.trim() != "yes" {
            println!("Cancelled.");
            return Ok(());
        }
    }
    let outcome = clear_all(&mut conn)?;
    println!("Deleted {} receipt(s) and {} file(s).", outcome.records, outcome.files);
    Ok(())
}
