use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::{CasebookError, Result};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CasebookConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub extraction: ExtractionConfig,
    #[serde(default)]
    pub analysis: AnalysisConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5004,
        }
    }
}

impl ServerConfig {
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    pub pdf_service_url: String,
    pub request_timeout_secs: u64,
    pub ocr_enabled: bool,
    pub ocr_command: String,
    pub pdftoppm_command: String,
    /// Non-whitespace characters below which extracted PDF text is treated as a scan
    pub min_text_chars: usize,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            pdf_service_url: "http://127.0.0.1:8001".to_string(),
            request_timeout_secs: 120,
            ocr_enabled: true,
            ocr_command: "tesseract".to_string(),
            pdftoppm_command: "pdftoppm".to_string(),
            min_text_chars: 50,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub enabled: bool,
    pub ollama_host: String,
    pub model: String,
    pub timeout_secs: u64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ollama_host: "http://localhost:11434".to_string(),
            model: "llama3.1:8b".to_string(),
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub db_path: Option<PathBuf>,
}

impl CasebookConfig {
    /// Load from an optional JSON file, then apply `CASEBOOK_*` environment overrides
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(p) => {
                tracing::debug!("Loading config from {}", p.display());
                let raw = std::fs::read_to_string(p)?;
                serde_json::from_str(&raw)
                    .map_err(|e| CasebookError::Config(format!("{}: {}", p.display(), e)))?
            }
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Apply overrides from a variable lookup (the process environment in production)
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("CASEBOOK_HOST") {
            self.server.host = v;
        }
        if let Some(v) = lookup("CASEBOOK_PORT") {
            self.server.port = parse_var("CASEBOOK_PORT", &v)?;
        }
        if let Some(v) = lookup("CASEBOOK_PDF_SERVICE_URL") {
            self.extraction.pdf_service_url = v.trim_end_matches('/').to_string();
        }
        if let Some(v) = lookup("CASEBOOK_OCR_COMMAND") {
            self.extraction.ocr_command = v;
        }
        if let Some(v) = lookup("CASEBOOK_OCR_ENABLED") {
            self.extraction.ocr_enabled = parse_bool("CASEBOOK_OCR_ENABLED", &v)?;
        }
        if let Some(v) = lookup("CASEBOOK_MIN_TEXT_CHARS") {
            self.extraction.min_text_chars = parse_var("CASEBOOK_MIN_TEXT_CHARS", &v)?;
        }
        if let Some(v) = lookup("OLLAMA_HOST") {
            self.analysis.ollama_host = v;
        }
        if let Some(v) = lookup("CASEBOOK_ANALYSIS_MODEL") {
            self.analysis.model = v;
        }
        if let Some(v) = lookup("CASEBOOK_ANALYSIS_TIMEOUT_SECS") {
            self.analysis.timeout_secs = parse_var("CASEBOOK_ANALYSIS_TIMEOUT_SECS", &v)?;
        }
        if let Some(v) = lookup("CASEBOOK_DB_PATH") {
            self.storage.db_path = Some(PathBuf::from(v));
        }
        Ok(())
    }
}

fn parse_var<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| CasebookError::Config(format!("{} has invalid value '{}'", key, value)))
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(CasebookError::Config(format!(
            "{} has invalid value '{}'",
            key, value
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = [
            ("CASEBOOK_PORT", "6000"),
            ("CASEBOOK_OCR_ENABLED", "off"),
            ("CASEBOOK_PDF_SERVICE_URL", "http://pdf:8001/"),
        ]
        .into_iter()
        .collect();

        let mut config = CasebookConfig::default();
        config
            .apply_env(|k| vars.get(k).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.server.port, 6000);
        assert!(!config.extraction.ocr_enabled);
        assert_eq!(config.extraction.pdf_service_url, "http://pdf:8001");
        assert_eq!(config.analysis.timeout_secs, 30);
    }

    #[test]
    fn test_invalid_port_is_config_error() {
        let mut config = CasebookConfig::default();
        let err = config
            .apply_env(|k| (k == "CASEBOOK_PORT").then(|| "not-a-port".to_string()))
            .unwrap_err();
        assert!(matches!(err, CasebookError::Config(_)));
    }

    #[test]
    fn test_load_single_field_section() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("casebook.json");
        std::fs::write(&path, r#"{"extraction": {"pdf_service_url": "http://pdf:9000"}}"#).unwrap();

        let config = CasebookConfig::load(Some(&path)).unwrap();
        let defaults = ExtractionConfig::default();
        assert_eq!(config.extraction.pdftoppm_command, defaults.pdftoppm_command);
        assert_eq!(config.extraction.request_timeout_secs, defaults.request_timeout_secs);
    }

    #[test]
    fn test_load_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("casebook.json");
        std::fs::write(&path, r#"{"analysis": {"enabled": false, "ollama_host": "http://gpu:11434", "model": "mistral", "timeout_secs": 5}}"#).unwrap();

        let mut config: CasebookConfig =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        config.apply_env(|_| None).unwrap();

        assert!(!config.analysis.enabled);
        assert_eq!(config.analysis.model, "mistral");
        assert_eq!(config.server.port, 5004);
    }
}
