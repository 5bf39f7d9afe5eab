use comfy_table::{Cell, Table};

use crate::categories::{add_cost_center, cost_center_choices, usage, CategoryField};
use crate::cli::open_db;
use crate::error::{ChitError, Result};
use crate::settings::load_settings;

pub fn suggest(field: &str) -> Result<()> {
    let field = CategoryField::parse(field).ok_or_else(|| {
        ChitError::Validation(format!(
            "Unknown field '{field}'. Use category, cost-center or reimbursement."
        ))
    })?;
    let conn = open_db(&load_settings())?;
    let rows = usage(&conn, field)?;
    if rows.is_empty() {
        println!("No {} recorded yet.", field.label().to_lowercase());
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec!["Value", "Uses"]);
    for (value, uses) in rows {
        table.add_row(vec![Cell::new(value), Cell::new(uses)]);
    }
    println!("{}\n{table}", field.label());
    Ok(())
}

pub fn list_cost_centers() -> Result<()> {
    let settings = load_settings();
    let conn = open_db(&settings)?;
    let choices = cost_center_choices(&conn, &settings.cost_centers)?;

    let mut table = Table::new();
    table.set_header(vec!["Cost Center"]);
    for name in choices {
        table.add_row(vec![Cell::new(name)]);
    }
    println!("Cost centers\n{table}");
    Ok(())
}

pub fn add(name: &str) -> Result<()> {
    let conn = open_db(&load_settings())?;
    add_cost_center(&conn, name)?;
    println!("Added cost center: {}", name.trim());
    Ok(())
}
