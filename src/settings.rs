use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{ChitError, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub data_dir: String,
    #[serde(default = "default_export_dir")]
    pub export_dir: String,
    #[serde(default)]
    pub user_name: String,
    #[serde(default = "default_category")]
    pub default_category: String,
    #[serde(default = "default_country")]
    pub default_country: String,
    #[serde(default = "default_cost_center")]
    pub default_cost_center: String,
    /// Offered when no cost center has been used yet.
    #[serde(default = "default_cost_centers")]
    pub cost_centers: Vec<String>,
    /// Cap on the sanitized name part of display filenames; 0 disables.
    #[serde(default = "default_name_max_len")]
    pub name_max_len: usize,
    #[serde(default)]
    pub ocr: OcrSettings,
    #[serde(default)]
    pub llm: LlmSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrSettings {
    pub tesseract_cmd: String,
    pub pdftotext_cmd: String,
    pub language: String,
}

impl Default for OcrSettings {
    fn default() -> Self {
        Self {
            tesseract_cmd: "tesseract".to_string(),
            pdftotext_cmd: "pdftotext".to_string(),
            language: "eng".to_string(),
        }
    }
}

/// OpenAI-compatible endpoint used to structure OCR text.
/// The API key is read from `api_key_env` at call time and never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    pub enabled: bool,
    pub base_url: String,
    pub model: String,
    pub api_key_env: String,
    pub timeout_secs: u64,
    pub few_shot_examples: usize,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            base_url: "https://api.openai.com".to_string(),
            model: "gpt-4o-mini".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            timeout_secs: 30,
            few_shot_examples: 3,
        }
    }
}

fn default_export_dir() -> String {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("Downloads")
        .join("Expense_Receipts")
        .to_string_lossy()
        .to_string()
}

fn default_category() -> String {
    "Client Meals".to_string()
}

fn default_country() -> String {
    "MX".to_string()
}

fn default_cost_center() -> String {
    "General".to_string()
}

fn default_cost_centers() -> Vec<String> {
    vec!["General".to_string(), "Corporate".to_string(), "Operations".to_string()]
}

fn default_name_max_len() -> usize {
    crate::filename::DEFAULT_NAME_CAP
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir().to_string_lossy().to_string(),
            export_dir: default_export_dir(),
            user_name: String::new(),
            default_category: default_category(),
            default_country: default_country(),
            default_cost_center: default_cost_center(),
            cost_centers: default_cost_centers(),
            name_max_len: default_name_max_len(),
            ocr: OcrSettings::default(),
            llm: LlmSettings::default(),
        }
    }
}

impl Settings {
    pub fn db_path(&self) -> PathBuf {
        PathBuf::from(&self.data_dir).join("chit.db")
    }

    pub fn uploads_dir(&self) -> PathBuf {
        PathBuf::from(&self.data_dir).join("uploads")
    }

    pub fn export_root(&self) -> PathBuf {
        PathBuf::from(&self.export_dir)
    }

    /// `None` when truncation is disabled.
    pub fn name_cap(&self) -> Option<usize> {
        (self.name_max_len > 0).then_some(self.name_max_len)
    }
}

fn config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join("chit")
}

fn settings_path() -> PathBuf {
    config_dir().join("settings.json")
}

fn default_data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("Documents")
        .join("chit")
}

pub fn load_settings() -> Settings {
    let path = settings_path();
    if path.exists() {
        let content = std::fs::read_to_string(&path).unwrap_or_default();
        match serde_json::from_str(&content) {
            Ok(settings) => settings,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "unreadable settings, using defaults");
                Settings::default()
            }
        }
    } else {
        Settings::default()
    }
}

pub fn save_settings(settings: &Settings) -> Result<()> {
    let dir = config_dir();
    std::fs::create_dir_all(&dir)?;
    let json = serde_json::to_string_pretty(settings)
        .map_err(|e| ChitError::Settings(e.to_string()))?;
    std::fs::write(settings_path(), format!("{json}\n"))?;
    Ok(())
}

pub fn settings_file_exists() -> bool {
    settings_path().exists()
}

pub fn shellexpand_path(path: &str) -> String {
    if path.starts_with('~') {
        if let Some(home) = dirs::home_dir() {
            return path.replacen('~', &home.to_string_lossy(), 1);
        }
    }
    std::fs::canonicalize(path)
        .unwrap_or_else(|_| PathBuf::from(path))
        .to_string_lossy()
        .to_string()
}
