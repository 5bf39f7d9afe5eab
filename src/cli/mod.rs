pub mod backup;
pub mod categories;
pub mod export;
pub mod init;
pub mod load;
pub mod receipts;
pub mod reprice;
pub mod review;
pub mod status;
pub mod upload;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use rusqlite::Connection;

use crate::db::get_connection;
use crate::error::{ChitError, Result};
use crate::settings::Settings;

/// Open the store for `settings`, refusing to create one implicitly.
pub(crate) fn open_db(settings: &Settings) -> Result<Connection> {
    let db_path = settings.db_path();
    if !db_path.exists() {
        return Err(ChitError::Settings(format!(
            "No database found at {}\nRun `chit init` to set up.",
            db_path.display()
        )));
    }
    get_connection(&db_path)
}

#[derive(Parser)]
#[command(name = "chit", version, about = "Expense-receipt review and reporting CLI.")]
pub struct Cli {
    /// Log debug output to stderr (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Set up chit: choose a data directory and initialize the database.
    Init {
        /// Path for chit data (default: ~/Documents/chit)
        #[arg(long = "data-dir")]
        data_dir: Option<String>,
    },
    /// Switch to an existing data directory.
    Load {
        /// Directory containing chit.db
        path: String,
    },
    /// Show data directory, database and receipt counts.
    Status,
    /// Snapshot the database.
    Backup {
        /// Output file (default: <data_dir>/backups/chit-<timestamp>.db)
        #[arg(long)]
        output: Option<String>,
    },
    /// Upload receipt images or PDFs (files or directories).
    Upload {
        #[arg(required = true)]
        paths: Vec<PathBuf>,
        /// Store files even when an identical upload already exists
        #[arg(long)]
        allow_duplicates: bool,
    },
    /// List receipts.
    List {
        /// Only reviewed receipts
        #[arg(long, conflicts_with = "pending")]
        reviewed: bool,
        /// Only receipts waiting for review
        #[arg(long)]
        pending: bool,
    },
    /// Show every field of one receipt.
    Show { id: i64 },
    /// Correct and approve a receipt. Omitted fields keep their current value;
    /// an empty value clears the field.
    Review {
        id: i64,
        #[command(flatten)]
        fields: ReviewArgs,
    },
    /// Delete a receipt and its file.
    Delete { id: i64 },
    /// Split a receipt evenly across cost centers.
    Split {
        id: i64,
        /// Cost center (repeat, at least two)
        #[arg(long = "cost-center", required = true)]
        cost_centers: Vec<String>,
    },
    /// Apply a new FX rate and markup to every receipt.
    Reprice {
        /// Local currency units per reporting currency unit
        #[arg(long = "fx-rate", allow_hyphen_values = true)]
        fx_rate: String,
        /// Markup percent (default 2.5)
        #[arg(long, allow_hyphen_values = true)]
        markup: Option<String>,
    },
    /// Delete all receipts and their files.
    Clear {
        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },
    /// Export reviewed receipts.
    Export {
        #[command(subcommand)]
        command: ExportCommands,
    },
    /// Show remembered values for a field (category, cost-center, reimbursement).
    Suggest { field: String },
    /// Manage cost centers.
    CostCenters {
        #[command(subcommand)]
        command: CostCenterCommands,
    },
}

#[derive(Args, Default)]
pub struct ReviewArgs {
    #[arg(long)]
    pub restaurant: Option<String>,
    /// YYYY-MM-DD
    #[arg(long)]
    pub date: Option<String>,
    /// Total in local currency
    #[arg(long, allow_hyphen_values = true)]
    pub amount: Option<String>,
    #[arg(long)]
    pub category: Option<String>,
    #[arg(long)]
    pub country: Option<String>,
    #[arg(long = "cost-center")]
    pub cost_center: Option<String>,
    #[arg(long = "fx-rate", allow_hyphen_values = true)]
    pub fx_rate: Option<String>,
    #[arg(long, allow_hyphen_values = true)]
    pub markup: Option<String>,
    #[arg(long)]
    pub reimbursement: Option<String>,
    #[arg(long)]
    pub detail: Option<String>,
}

#[derive(Subcommand)]
pub enum ExportCommands {
    /// Accounting CSV.
    Csv {
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Expense report PDF with summary table and receipt images.
    #[cfg(feature = "pdf")]
    Pdf {
        /// Summary table only
        #[arg(long)]
        no_images: bool,
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Accounting workbook.
    #[cfg(feature = "excel")]
    Excel {
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// One PDF per receipt, named by its display filename, in monthly folders.
    Files {
        /// Root folder (default: export_dir from settings)
        #[arg(long = "output-dir")]
        output_dir: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
pub enum CostCenterCommands {
    /// List cost centers, most used first.
    List,
    /// Register a cost center.
    Add { name: String },
}
