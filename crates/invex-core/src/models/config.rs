//! Configuration structures for the extraction pipeline.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{InvexError, ServiceError};

/// Main configuration for the invex pipeline.
///
/// Built once at startup and handed to the components that need it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct InvexConfig {
    /// OCR configuration.
    pub ocr: OcrConfig,

    /// PDF processing configuration.
    pub pdf: PdfConfig,

    /// Text-generation service configuration.
    pub llm: LlmConfig,

    /// Record table configuration.
    pub storage: StorageConfig,

    /// Web shell configuration.
    pub server: ServerConfig,
}

/// OCR engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrConfig {
    /// Tesseract executable (name on PATH or full path).
    pub tesseract_cmd: PathBuf,

    /// Tesseract language code(s), e.g. "eng" or "eng+deu".
    pub language: String,

    /// Page segmentation mode passed as `--psm` (engine default if unset).
    pub page_seg_mode: Option<u8>,

    /// Per-image recognition timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            tesseract_cmd: PathBuf::from("tesseract"),
            language: "eng".to_string(),
            page_seg_mode: None,
            timeout_secs: 60,
        }
    }
}

/// PDF processing configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PdfConfig {
    /// pdftoppm executable (name on PATH or full path).
    pub pdftoppm_cmd: PathBuf,

    /// DPI for rendering PDF pages to images.
    pub render_dpi: u32,

    /// Maximum pages to render (0 = unlimited).
    pub max_pages: usize,

    /// Use the embedded text layer instead of OCR when it is long enough.
    pub prefer_embedded_text: bool,

    /// Minimum embedded text length to skip OCR.
    pub min_text_length: usize,

    /// Rendering timeout in seconds for the whole document.
    pub timeout_secs: u64,
}

impl Default for PdfConfig {
    fn default() -> Self {
        Self {
            pdftoppm_cmd: PathBuf::from("pdftoppm"),
            render_dpi: 200,
            max_pages: 0,
            prefer_embedded_text: false,
            min_text_length: 50,
            timeout_secs: 60,
        }
    }
}

/// How the service is asked to format its answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseFormat {
    /// Labelled "Field: value" lines, parsed line by line.
    #[default]
    Lines,
    /// A JSON object keyed by field label, with the line parser as fallback.
    Json,
}

/// Text-generation service configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Model name.
    pub model: String,

    /// Service base URL.
    pub base_url: String,

    /// Environment variable holding the API key.
    pub api_key_env: String,

    /// API key set directly in the config file. Never written back out.
    #[serde(skip_serializing)]
    pub api_key: Option<String>,

    /// Request timeout in seconds.
    pub timeout_secs: u64,

    /// Requested response format.
    pub response_format: ResponseFormat,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: "gemini-1.5-flash".to_string(),
            base_url: "https://generativelanguage.googleapis.com".to_string(),
            api_key_env: "GOOGLE_API_KEY".to_string(),
            api_key: None,
            timeout_secs: 60,
            response_format: ResponseFormat::Lines,
        }
    }
}

/// Record table configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Table file; `.xlsx` or `.csv`.
    pub table_path: PathBuf,

    /// Worksheet name used when creating an xlsx table.
    pub sheet_name: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            table_path: PathBuf::from("extracted_data/invoice_data.xlsx"),
            sheet_name: "Sheet1".to_string(),
        }
    }
}

/// Web shell configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Listen address.
    pub bind: String,

    /// Maximum accepted upload size in bytes.
    pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8501".to_string(),
            max_upload_bytes: 20 * 1024 * 1024,
        }
    }
}

impl InvexConfig {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &std::path::Path) -> Result<Self, std::io::Error> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())
        })
    }

    /// Reject settings no pipeline can run with.
    pub fn validate(&self) -> Result<(), InvexError> {
        let positive = [
            ("ocr.timeout_secs", self.ocr.timeout_secs),
            ("pdf.timeout_secs", self.pdf.timeout_secs),
            ("pdf.render_dpi", u64::from(self.pdf.render_dpi)),
            ("llm.timeout_secs", self.llm.timeout_secs),
            ("server.max_upload_bytes", self.server.max_upload_bytes as u64),
        ];
        if let Some((key, _)) = positive.iter().find(|(_, value)| *value == 0) {
            return Err(InvexError::Config(format!("{key} must be greater than 0")));
        }

        let required = [
            ("ocr.language", &self.ocr.language),
            ("llm.model", &self.llm.model),
            ("llm.api_key_env", &self.llm.api_key_env),
        ];
        if let Some((key, _)) = required.iter().find(|(_, value)| value.trim().is_empty()) {
            return Err(InvexError::Config(format!("{key} must not be empty")));
        }

        Ok(())
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &std::path::Path) -> Result<(), std::io::Error> {
        let content = serde_json::to_string_pretty(self).map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())
        })?;
        std::fs::write(path, content)
    }
}

impl LlmConfig {
    /// Resolve the API key: config file first, then the named environment variable.
    pub fn resolve_api_key(&self) -> Result<String, ServiceError> {
        if let Some(key) = self.api_key.as_deref().filter(|k| !k.trim().is_empty()) {
            return Ok(key.trim().to_string());
        }
        std::env::var(&self.api_key_env)
            .ok()
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
            .ok_or_else(|| ServiceError::MissingCredential {
                env_var: self.api_key_env.clone(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_defaults() {
        let config = InvexConfig::default();
        assert_eq!(config.storage.table_path, PathBuf::from("extracted_data/invoice_data.xlsx"));
        assert_eq!(config.llm.model, "gemini-1.5-flash");
        assert_eq!(config.llm.api_key_env, "GOOGLE_API_KEY");
        assert_eq!(config.pdf.render_dpi, 200);
        assert_eq!(config.llm.response_format, ResponseFormat::Lines);
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let config: InvexConfig =
            serde_json::from_str(r#"{"llm": {"response_format": "json"}, "ocr": {"language": "deu"}}"#)
                .unwrap();
        assert_eq!(config.llm.response_format, ResponseFormat::Json);
        assert_eq!(config.llm.timeout_secs, 60);
        assert_eq!(config.ocr.language, "deu");
        assert_eq!(config.ocr.tesseract_cmd, PathBuf::from("tesseract"));
    }

    #[test]
    fn test_validate() {
        assert!(InvexConfig::default().validate().is_ok());

        let mut config = InvexConfig::default();
        config.pdf.render_dpi = 0;
        let err = config.validate().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConfigError);
        assert_eq!(err.to_string(), "configuration error: pdf.render_dpi must be greater than 0");

        let mut config = InvexConfig::default();
        config.ocr.language = " ".to_string();
        let err = config.validate().unwrap_err();
        assert!(matches!(err, InvexError::Config(ref msg) if msg == "ocr.language must not be empty"));
    }

    #[test]
    fn test_api_key_is_never_saved() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");

        let mut config = InvexConfig::default();
        config.llm.api_key = Some("secret-key".to_string());
        config.save(&path).unwrap();

        let saved = std::fs::read_to_string(&path).unwrap();
        assert!(!saved.contains("secret-key"));

        let loaded = InvexConfig::from_file(&path).unwrap();
        assert!(loaded.llm.api_key.is_none());
    }

    #[test]
    fn test_resolve_api_key_prefers_config_value() {
        let config = LlmConfig {
            api_key: Some("  from-config ".to_string()),
            api_key_env: "INVEX_TEST_UNSET_KEY_VAR".to_string(),
            ..LlmConfig::default()
        };
        assert_eq!(config.resolve_api_key().unwrap(), "from-config");
    }

    #[test]
    fn test_resolve_api_key_missing() {
        let config = LlmConfig {
            api_key: None,
            api_key_env: "INVEX_TEST_DEFINITELY_UNSET_VAR".to_string(),
            ..LlmConfig::default()
        };
        let err = config.resolve_api_key().unwrap_err();
        assert!(matches!(err, ServiceError::MissingCredential { ref env_var } if env_var == "INVEX_TEST_DEFINITELY_UNSET_VAR"));
    }
}
