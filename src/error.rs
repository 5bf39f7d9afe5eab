use thiserror::Error;

#[derive(Error, Debug)]
pub enum ChitError {
    #[error("Database error: {0}")]
    Db(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("PDF error: {0}")]
    Pdf(String),

    #[error("Excel error: {0}")]
    Excel(String),

    #[error("OCR failed: {0}")]
    Ocr(String),

    #[error("Extraction failed: {0}")]
    Llm(String),

    #[error("Invalid number for {field}: '{value}'")]
    InvalidNumber { field: String, value: String },

    #[error("{0}")]
    Validation(String),

    #[error("No reviewed receipts to export. Review receipts first with `chit review`.")]
    NothingToExport,

    #[error("Settings error: {0}")]
    Settings(String),
}

pub type Result<T> = std::result::Result<T, ChitError>;
