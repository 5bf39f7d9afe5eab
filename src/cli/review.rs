use crate::cli::{open_db, ReviewArgs};
use crate::error::Result;
use crate::fmt::money_opt;
use crate::models::ReceiptUpdate;
use crate::reviewer::{apply_review, parse_date, parse_number};
use crate::settings::load_settings;
use crate::store::{get_receipt, split_by_cost_center};

/// `None` keeps the current value, an empty string clears it.
fn text_field(current: &mut Option<String>, given: Option<String>) {
    if let Some(v) = given {
        let v = v.trim();
        *current = (!v.is_empty()).then(|| v.to_string());
    }
}

fn number_field(current: &mut Option<f64>, field: &str, given: Option<&str>) -> Result<()> {
    if let Some(raw) = given {
        *current = parse_number(field, raw)?;
    }
    Ok(())
}

/// Overlay the command-line edits on the receipt's current values.
/// Everything is parsed before anything is written.
pub(crate) fn build_update(mut update: ReceiptUpdate, args: ReviewArgs) -> Result<ReceiptUpdate> {
    if let Some(raw) = args.date.as_deref() {
        update.date = parse_date(raw)?;
    }
    number_field(&mut update.total_amount, "amount", args.amount.as_deref())?;
    number_field(&mut update.fx_rate, "fx-rate", args.fx_rate.as_deref())?;
    number_field(&mut update.markup_percent, "markup", args.markup.as_deref())?;
    text_field(&mut update.restaurant_name, args.restaurant);
    text_field(&mut update.accounting_category, args.category);
    text_field(&mut update.country, args.country);
    text_field(&mut update.cost_center, args.cost_center);
    text_field(&mut update.reimbursement, args.reimbursement);
    text_field(&mut update.detail, args.detail);
    Ok(update)
}

pub fn run(id: i64, args: ReviewArgs) -> Result<()> {
    let settings = load_settings();
    let mut conn = open_db(&settings)?;
    let Some(current) = get_receipt(&conn, id)? else {
        println!("Receipt {id} not found.");
        return Ok(());
    };

    let update = build_update(ReceiptUpdate::from_receipt(&current), args)?;
    apply_review(&mut conn, id, &update, settings.name_cap())?;

    if let Some(r) = get_receipt(&conn, id)? {
        println!("Reviewed receipt {id}.");
        println!("  Amount:      {}", money_opt(r.reporting_amount));
        println!("  Exports as:  {}", r.export_name());
        if r.display_filename.is_none() {
            println!("  Add a date and restaurant name to get a dated export name.");
        }
    }
    Ok(())
}

pub fn split(id: i64, cost_centers: &[String]) -> Result<()> {
    let settings = load_settings();
    let mut conn = open_db(&settings)?;
    match split_by_cost_center(&mut conn, id, cost_centers, settings.name_cap())? {
        None => println!("Receipt {id} not found."),
        Some(ids) => {
            println!("Split receipt {id} into {} receipts:", ids.len());
            for new_id in ids {
                if let Some(r) = get_receipt(&conn, new_id)? {
                    println!(
                        "  #{new_id}  {:<20} {:>12}  {}",
                        r.cost_center.as_deref().unwrap_or(""),
                        money_opt(r.reporting_amount),
                        r.export_name()
                    );
                }
            }
        }
    }
    Ok(())
}
