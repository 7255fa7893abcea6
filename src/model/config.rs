use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

const ENV_CONFIG_PATH: &str = "IDP_CONFIG_PATH";
const DEFAULT_CONFIG_PATH: &str = "config.yaml";

const DEFAULT_OCR_BASE_URL: &str = "http://127.0.0.1:9090";
const DEFAULT_VISION_BASE_URL: &str = "https://api.openai.com/v1";

/// Object store layout
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Root directory of the filesystem object store
    pub root: PathBuf,
    /// Prefix under which upload folders are allocated
    pub key_prefix: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("data"),
            key_prefix: "uploads/".to_string(),
        }
    }
}

impl StorageConfig {
    /// Key prefix with exactly one trailing slash
    pub fn normalized_prefix(&self) -> String {
        let prefix = self.key_prefix.trim();
        if prefix.is_empty() {
            return "uploads/".to_string();
        }
        if prefix.ends_with('/') {
            prefix.to_string()
        } else {
            format!("{}/", prefix)
        }
    }
}

/// Asynchronous OCR gateway
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OcrConfig {
    pub base_url: Url,
    /// Wait between status polls while a job is in progress (jitter is added)
    pub poll_interval_ms: u64,
    /// Retries after a rate-limited response before giving up
    pub max_retries: u32,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            base_url: Url::parse(DEFAULT_OCR_BASE_URL).expect("default OCR URL is valid"),
            poll_interval_ms: 2000,
            max_retries: 6,
        }
    }
}

impl OcrConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// Stamp/QR vision model
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct VisionConfig {
    pub base_url: Url,
    pub model: String,
    /// Page images sent per run
    pub max_pages: usize,
}

impl Default for VisionConfig {
    fn default() -> Self {
        Self {
            base_url: Url::parse(DEFAULT_VISION_BASE_URL).expect("default vision URL is valid"),
            model: "gpt-4o".to_string(),
            max_pages: 3,
        }
    }
}

/// Field-extraction language model
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    pub model: String,
    /// OCR text is truncated to this many characters before prompting
    pub max_text_chars: usize,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            model: "gpt-4o".to_string(),
            max_text_chars: 15000,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Outer deadline for one verification run
    pub run_timeout_secs: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            run_timeout_secs: 600,
        }
    }
}

impl PipelineConfig {
    pub fn run_timeout(&self) -> Duration {
        Duration::from_secs(self.run_timeout_secs)
    }
}

/// YAML configuration file structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub ocr: OcrConfig,
    #[serde(default)]
    pub vision: VisionConfig,
    #[serde(default)]
    pub extraction: ExtractionConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub storage: StorageConfig,
    pub ocr: OcrConfig,
    pub vision: VisionConfig,
    pub extraction: ExtractionConfig,
    pub pipeline: PipelineConfig,
    pub port: u16,
    pub host: String,
}

impl Default for Config {
    fn default() -> Self {
        Self::from_file(ConfigFile::default(), "127.0.0.1".to_string(), 8080)
    }
}

impl Config {
    /// Load configuration from environment and config file
    pub fn from_env() -> Self {
        let port = std::env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(8080);

        let host = std::env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());

        let config_path = std::env::var(ENV_CONFIG_PATH)
            .unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());

        let file = Self::load_config_file(&config_path).unwrap_or_default();

        Self::from_file(file, host, port)
    }

    fn from_file(file: ConfigFile, host: String, port: u16) -> Self {
        Self {
            storage: file.storage,
            ocr: file.ocr,
            vision: file.vision,
            extraction: file.extraction,
            pipeline: file.pipeline,
            port,
            host,
        }
    }

    /// Load configuration from YAML file
    fn load_config_file(path: &str) -> Option<ConfigFile> {
        let path = Path::new(path);

        if !path.exists() {
            tracing::debug!(path = %path.display(), "Config file not found, using defaults");
            return None;
        }

        match fs::read_to_string(path) {
            Ok(contents) => parse_config(&contents)
                .inspect(|_| tracing::info!(path = %path.display(), "Loaded configuration from file"))
                .map_err(|e| {
                    tracing::warn!(path = %path.display(), error = %e, "Failed to parse config file, using defaults");
                })
                .ok(),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Failed to read config file, using defaults");
                None
            }
        }
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Parse YAML contents; an empty document yields defaults
fn parse_config(contents: &str) -> Result<ConfigFile, serde_yaml::Error> {
    let contents = contents.trim();
    if contents.is_empty() {
        return Ok(ConfigFile::default());
    }
    serde_yaml::from_str(contents)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let file = parse_config("   \n").unwrap();
        assert_eq!(file.ocr.max_retries, 6);
        assert_eq!(file.ocr.poll_interval_ms, 2000);
        assert_eq!(file.vision.max_pages, 3);
        assert_eq!(file.extraction.max_text_chars, 15000);
        assert_eq!(file.storage.key_prefix, "uploads/");
    }

    #[test]
    fn test_partial_sections_fill_defaults() {
        let yaml = r#"
ocr:
  base_url: "https://ocr.internal:8443"
  poll_interval_ms: 500
vision:
  max_pages: 2
"#;
        let file = parse_config(yaml).unwrap();
        assert_eq!(file.ocr.base_url.as_str(), "https://ocr.internal:8443/");
        assert_eq!(file.ocr.poll_interval(), Duration::from_millis(500));
        assert_eq!(file.ocr.max_retries, 6);
        assert_eq!(file.vision.max_pages, 2);
        assert_eq!(file.vision.model, "gpt-4o");
    }

    #[test]
    fn test_invalid_yaml_is_error() {
        assert!(parse_config("ocr: [not, a, map").is_err());
    }

    #[test]
    fn test_normalized_prefix() {
        let mut storage = StorageConfig::default();
        storage.key_prefix = "incoming".to_string();
        assert_eq!(storage.normalized_prefix(), "incoming/");
        storage.key_prefix = "  ".to_string();
        assert_eq!(storage.normalized_prefix(), "uploads/");
    }
}
