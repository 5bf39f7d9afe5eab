use std::collections::HashSet;
use std::path::{Path, PathBuf};

use rusqlite::Connection;
use sha2::{Digest, Sha256};

use crate::error::Result;
use crate::filename::make_unique;
use crate::fx::RateDefaults;
use crate::llm::ReceiptParser;
use crate::models::{Extraction, NewReceipt};
use crate::ocr::TextExtractor;
use crate::reviewer::training_examples;
use crate::settings::Settings;
use crate::store::{add_receipt, find_by_checksum};

pub const SUPPORTED_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "bmp", "tiff", "tif", "pdf"];

#[derive(Debug, Default)]
pub struct IngestSummary {
    pub added: Vec<i64>,
    pub duplicates: Vec<PathBuf>,
    pub unsupported: Vec<PathBuf>,
    pub missing: Vec<PathBuf>,
    /// Stored, but with fields left for the reviewer to fill in.
    pub extraction_failures: usize,
}

pub fn is_supported(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| SUPPORTED_EXTENSIONS.iter().any(|s| s.eq_ignore_ascii_case(ext)))
}

pub fn compute_checksum(file_path: &Path) -> Result<String> {
    let data = std::fs::read(file_path)?;
    let mut hasher = Sha256::new();
    hasher.update(&data);
    Ok(hex::encode(hasher.finalize()))
}

/// Expand directories (non-recursively, sorted) and split the inputs into
/// supported files, unsupported files and paths that do not exist.
fn collect_inputs(paths: &[PathBuf], summary: &mut IngestSummary) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for path in paths {
        if path.is_dir() {
            let mut entries: Vec<PathBuf> = std::fs::read_dir(path)?
                .filter_map(|e| e.ok().map(|e| e.path()))
                .filter(|p| p.is_file())
                .collect();
            entries.sort();
            for entry in entries {
                if is_supported(&entry) {
                    files.push(entry);
                } else {
                    summary.unsupported.push(entry);
                }
            }
        } else if !path.exists() {
            summary.missing.push(path.clone());
        } else if is_supported(path) {
            files.push(path.clone());
        } else {
            summary.unsupported.push(path.clone());
        }
    }
    Ok(files)
}

fn existing_upload_names(uploads: &Path) -> Result<HashSet<String>> {
    let mut names = HashSet::new();
    for entry in std::fs::read_dir(uploads)? {
        let entry = entry?;
        names.insert(entry.file_name().to_string_lossy().to_string());
    }
    Ok(names)
}

/// Copy `source` into the uploads directory under a name no other upload
/// uses. Returns the stored path.
fn store_upload(source: &Path, uploads: &Path) -> Result<PathBuf> {
    let original = source
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "receipt".to_string());
    let name = make_unique(&original, &existing_upload_names(uploads)?);
    let dest = uploads.join(name);
    std::fs::copy(source, &dest)?;
    Ok(dest)
}

/// Run OCR then field extraction. Either step failing leaves the fields
/// empty; the receipt is stored regardless.
fn extract(
    conn: &Connection,
    file: &Path,
    ocr: &dyn TextExtractor,
    parser: &dyn ReceiptParser,
    few_shot: usize,
) -> Result<(Option<String>, Extraction, bool)> {
    let text = match ocr.extract_text(file) {
        Ok(text) => text,
        Err(e) => {
            tracing::warn!(file = %file.display(), error = %e, "OCR failed, storing without text");
            return Ok((None, Extraction::default(), true));
        }
    };

    let examples = training_examples(conn, few_shot)?;
    match parser.parse(&text, &examples) {
        Ok(extraction) => {
            if extraction.is_empty() {
                tracing::debug!(file = %file.display(), "no fields extracted");
            }
            Ok((Some(text), extraction, false))
        }
        Err(e) => {
            tracing::warn!(file = %file.display(), error = %e, "field extraction failed, leaving fields empty");
            Ok((Some(text), Extraction::default(), true))
        }
    }
}

/// Upload receipt files: copy each into the data directory, extract its
/// text and fields, and store it unreviewed.
pub fn ingest_paths(
    conn: &Connection,
    settings: &Settings,
    ocr: &dyn TextExtractor,
    parser: &dyn ReceiptParser,
    paths: &[PathBuf],
    allow_duplicates: bool,
) -> Result<IngestSummary> {
    let mut summary = IngestSummary::default();
    let files = collect_inputs(paths, &mut summary)?;
    if files.is_empty() {
        return Ok(summary);
    }

    let uploads = settings.uploads_dir();
    std::fs::create_dir_all(&uploads)?;
    let defaults = RateDefaults::load(conn)?;

    for file in files {
        // A file can vanish or become unreadable after the inputs were
        // collected; skip it rather than abandon the rest of the batch.
        let checksum = match compute_checksum(&file) {
            Ok(c) => c,
            Err(e) => {
                tracing::warn!(file = %file.display(), error = %e, "cannot read file, skipping");
                summary.missing.push(file);
                continue;
            }
        };
        if !allow_duplicates {
            if let Some(existing) = find_by_checksum(conn, &checksum)? {
                tracing::info!(file = %file.display(), existing, "duplicate upload skipped");
                summary.duplicates.push(file);
                continue;
            }
        }

        let stored = match store_upload(&file, &uploads) {
            Ok(path) => path,
            Err(e) => {
                tracing::warn!(file = %file.display(), error = %e, "cannot copy file, skipping");
                summary.missing.push(file);
                continue;
            }
        };
        let (ocr_text, extraction, failed) =
            extract(conn, &stored, ocr, parser, settings.llm.few_shot_examples)?;
        if failed {
            summary.extraction_failures += 1;
        }

        let new = NewReceipt {
            filename: file
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default(),
            file_path: stored.to_string_lossy().to_string(),
            checksum: Some(checksum),
            ocr_text,
            extraction,
            accounting_category: Some(settings.default_category.clone()),
            country: Some(settings.default_country.clone()),
            cost_center: Some(settings.default_cost_center.clone()),
        };
        let id = add_receipt(conn, &new, &defaults)?;
        tracing::debug!(id, file = %stored.display(), "receipt stored");
        summary.added.push(id);
    }

    Ok(summary)
}
