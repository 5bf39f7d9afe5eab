use std::path::PathBuf;

use crate::cli::open_db;
use crate::error::Result;
use crate::ingest::{ingest_paths, SUPPORTED_EXTENSIONS};
use crate::llm::parser_from_settings;
use crate::ocr::CommandOcr;
use crate::settings::load_settings;

pub fn run(paths: &[PathBuf], allow_duplicates: bool) -> Result<()> {
    let settings = load_settings();
    let conn = open_db(&settings)?;
    let ocr = CommandOcr::new(&settings.ocr);
    let parser = parser_from_settings(&settings.llm)?;

    let summary = ingest_paths(&conn, &settings, &ocr, parser.as_ref(), paths, allow_duplicates)?;

    for path in &summary.missing {
        println!("Not found: {}", path.display());
    }
    for path in &summary.unsupported {
        println!(
            "Skipped {} (supported: {})",
            path.display(),
            SUPPORTED_EXTENSIONS.join(", ")
        );
    }
    for path in &summary.duplicates {
        println!("Already uploaded: {} (use --allow-duplicates to add again)", path.display());
    }

    println!(
        "{} uploaded, {} duplicate, {} unsupported",
        summary.added.len(),
        summary.duplicates.len(),
        summary.unsupported.len() + summary.missing.len()
    );
    if summary.extraction_failures > 0 {
        println!(
            "{} receipt(s) need fields filled in by hand. Run `chit list --pending`.",
            summary.extraction_failures
        );
    }
    Ok(())
}
