use std::path::{Path, PathBuf};

use crate::cli::{open_db, ExportCommands};
use crate::error::Result;
use crate::export::csv::export_csv;
use crate::export::{
    accounting_rows, current_period, export_folder, export_organized_files, reviewed_for_export,
};
use crate::settings::{load_settings, Settings};

fn default_path(settings: &Settings, file_name: &str) -> Result<PathBuf> {
    let period = current_period();
    let folder = export_folder(&settings.export_root(), &period)?;
    Ok(folder.join(file_name.replace("{period}", &period)))
}

fn report_written(path: &Path, count: usize) {
    println!("Wrote {} ({count} receipts)", path.display());
}

#[cfg(feature = "pdf")]
fn write_bytes(bytes: &[u8], path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, bytes)?;
    Ok(())
}

pub fn dispatch(cmd: ExportCommands) -> Result<()> {
    let settings = load_settings();
    let conn = open_db(&settings)?;
    let receipts = reviewed_for_export(&conn)?;

    match cmd {
        ExportCommands::Csv { output } => {
            let path = match output {
                Some(p) => p,
                None => default_path(&settings, "{period}_Expenses.csv")?,
            };
            export_csv(&accounting_rows(&receipts), &path)?;
            report_written(&path, receipts.len());
        }
        #[cfg(feature = "pdf")]
        ExportCommands::Pdf { no_images, output } => {
            let name = if no_images { "expense_summary.pdf" } else { "expense_report.pdf" };
            let path = match output {
                Some(p) => p,
                None => default_path(&settings, name)?,
            };
            let range = crate::export::date_range(&receipts);
            let bytes = crate::pdf::render_expense_report(&receipts, &settings.user_name, &range, !no_images)?;
            write_bytes(&bytes, &path)?;
            report_written(&path, receipts.len());
        }
        #[cfg(feature = "excel")]
        ExportCommands::Excel { output } => {
            let path = match output {
                Some(p) => p,
                None => default_path(&settings, "{period}_Expenses.xlsx")?,
            };
            crate::export::xlsx::export_excel(&accounting_rows(&receipts), &path)?;
            report_written(&path, receipts.len());
        }
        ExportCommands::Files { output_dir } => {
            let root = output_dir.unwrap_or_else(|| settings.export_root());
            let result = export_organized_files(&receipts, &root)?;
            for item in &result.skipped {
                println!("Skipped #{} {}: {}", item.id, item.name, item.reason);
            }
            println!(
                "Exported {} file(s) to {} ({} skipped)",
                result.written.len(),
                root.display(),
                result.skipped.len()
            );
        }
    }
    Ok(())
}
