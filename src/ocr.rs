//! Text extraction from receipt files via external tools.

use std::path::Path;
use std::process::Command;

use crate::error::{ChitError, Result};
use crate::settings::OcrSettings;

/// Produces raw text from an uploaded receipt file.
pub trait TextExtractor {
    fn extract_text(&self, file: &Path) -> Result<String>;
}

/// `pdftotext -layout` for PDFs, `tesseract` for images.
pub struct CommandOcr {
    tesseract_cmd: String,
    pdftotext_cmd: String,
    language: String,
}

impl CommandOcr {
    pub fn new(settings: &OcrSettings) -> Self {
        Self {
            tesseract_cmd: settings.tesseract_cmd.clone(),
            pdftotext_cmd: settings.pdftotext_cmd.clone(),
            language: settings.language.clone(),
        }
    }

    fn run_pdftotext(&self, file: &Path) -> Result<String> {
        require_tool(&self.pdftotext_cmd, "install poppler-utils")?;
        let output = Command::new(&self.pdftotext_cmd)
            .arg("-layout")
            .arg(file)
            .arg("-")
            .output()
            .map_err(|e| ChitError::Ocr(format!("failed to run {}: {e}", self.pdftotext_cmd)))?;
        check_status(&self.pdftotext_cmd, &output)?;
        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }

    fn run_tesseract(&self, file: &Path) -> Result<String> {
        require_tool(&self.tesseract_cmd, "install tesseract-ocr")?;
        let output = Command::new(&self.tesseract_cmd)
            .arg(file)
            .arg("stdout")
            .args(["-l", &self.language])
            .output()
            .map_err(|e| ChitError::Ocr(format!("failed to run {}: {e}", self.tesseract_cmd)))?;
        check_status(&self.tesseract_cmd, &output)?;
        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }
}

impl TextExtractor for CommandOcr {
    fn extract_text(&self, file: &Path) -> Result<String> {
        let text = if is_pdf(file) {
            self.run_pdftotext(file)?
        } else {
            self.run_tesseract(file)?
        };
        if text.trim().is_empty() {
            return Err(ChitError::Ocr(format!("no text found in {}", file.display())));
        }
        Ok(text)
    }
}

pub fn is_pdf(file: &Path) -> bool {
    file.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("pdf"))
}

fn require_tool(cmd: &str, hint: &str) -> Result<()> {
    which::which(cmd)
        .map(|_| ())
        .map_err(|_| ChitError::Ocr(format!("{cmd} not found on PATH ({hint})")))
}

fn check_status(cmd: &str, output: &std::process::Output) -> Result<()> {
    if output.status.success() {
        return Ok(());
    }
    let stderr = String::from_utf8_lossy(&output.stderr);
    Err(ChitError::Ocr(format!(
        "{cmd} failed (exit {}): {}",
        output.status.code().unwrap_or(-1),
        stderr.trim()
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_pdf_ignores_case() {
        assert!(is_pdf(Path::new("a/receipt.PDF")));
        assert!(is_pdf(Path::new("receipt.pdf")));
        assert!(!is_pdf(Path::new("receipt.jpg")));
        assert!(!is_pdf(Path::new("pdf")));
    }

    #[test]
    fn test_missing_tool_is_ocr_error() {
        let ocr = CommandOcr::new(&OcrSettings {
            tesseract_cmd: "definitely-not-a-real-ocr-binary".to_string(),
            pdftotext_cmd: "definitely-not-a-real-pdf-binary".to_string(),
            language: "eng".to_string(),
        });
        let err = ocr.extract_text(Path::new("receipt.png")).unwrap_err();
        assert!(matches!(err, ChitError::Ocr(_)));
        let err = ocr.extract_text(Path::new("receipt.pdf")).unwrap_err();
        assert!(err.to_string().contains("poppler"));
    }
}
