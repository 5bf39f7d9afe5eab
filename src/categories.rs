use rusqlite::Connection;

use crate::error::{ChitError, Result};

/// Categorical receipt fields whose past values feed autocomplete.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CategoryField {
    AccountingCategory,
    CostCenter,
    Reimbursement,
}

impl CategoryField {
    pub fn key(&self) -> &'static str {
        match self {
            Self::AccountingCategory => "accounting_category",
            Self::CostCenter => "cost_center",
            Self::Reimbursement => "reimbursement",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::AccountingCategory => "Accounting categories",
            Self::CostCenter => "Cost centers",
            Self::Reimbursement => "Reimbursement tags",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().replace('-', "_").as_str() {
            "accounting_category" | "category" | "account" => Some(Self::AccountingCategory),
            "cost_center" | "cc" => Some(Self::CostCenter),
            "reimbursement" => Some(Self::Reimbursement),
            _ => None,
        }
    }
}

/// Count one more use of `value` for `field`. Blank values are ignored.
pub fn remember(conn: &Connection, field: CategoryField, value: &str) -> Result<()> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(());
    }
    conn.execute(
        "INSERT INTO category_usage (category_type, category_value, usage_count, last_used) \
         VALUES (?1, ?2, 1, datetime('now')) \
         ON CONFLICT(category_type, category_value) \
         DO UPDATE SET usage_count = usage_count + 1, last_used = datetime('now')",
        rusqlite::params![field.key(), value],
    )?;
    Ok(())
}

/// Past values for `field`, most used first, ties broken by recency.
pub fn suggestions(conn: &Connection, field: CategoryField) -> Result<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT category_value FROM category_usage WHERE category_type = ?1 \
         ORDER BY usage_count DESC, last_used DESC, id DESC",
    )?;
    let rows = stmt
        .query_map([field.key()], |row| row.get(0))?
        .collect::<std::result::Result<Vec<String>, _>>()?;
    Ok(rows)
}

/// Usage counts alongside values, for display.
pub fn usage(conn: &Connection, field: CategoryField) -> Result<Vec<(String, i64)>> {
    let mut stmt = conn.prepare(
        "SELECT category_value, usage_count FROM category_usage WHERE category_type = ?1 \
         ORDER BY usage_count DESC, last_used DESC, id DESC",
    )?;
    let rows = stmt
        .query_map([field.key()], |row| Ok((row.get(0)?, row.get(1)?)))?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Remembered cost centers, or `fallback` when none have been used yet.
pub fn cost_center_choices(conn: &Connection, fallback: &[String]) -> Result<Vec<String>> {
    let remembered = suggestions(conn, CategoryField::CostCenter)?;
    if remembered.is_empty() {
        Ok(fallback.to_vec())
    } else {
        Ok(remembered)
    }
}

pub fn add_cost_center(conn: &Connection, name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(ChitError::Validation("Cost center name required".to_string()));
    }
    remember(conn, CategoryField::CostCenter, name)
}
