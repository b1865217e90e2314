// Tue Jan 13 2026 - Alex

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub writer: WriterConfig,
    pub archive: ArchiveConfig,
    pub kaitai: KaitaiConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WriterConfig {
    /// Bytes reserved up front for each encoded blob.
    pub initial_capacity: usize,
    /// Hard cap on a single encoded blob.
    pub max_size: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArchiveConfig {
    /// Emit the leading comment line.
    pub header: bool,
    /// Hoist unnamed layouts reachable from several places into `SharedN` declarations.
    pub hoist_shared: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KaitaiConfig {
    pub id: String,
    pub title: Option<String>,
}

impl Default for WriterConfig {
    fn default() -> Self {
        Self {
            initial_capacity: 4096,
            max_size: 64 * 1024 * 1024,
        }
    }
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            header: true,
            hoist_shared: true,
        }
    }
}

impl Default for KaitaiConfig {
    fn default() -> Self {
        Self {
            id: "schema_pack".to_string(),
            title: None,
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }

        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        if !ext.eq_ignore_ascii_case("json") {
            return Err(ConfigError::UnsupportedFormat(ext.to_string()));
        }

        let contents = fs::read_to_string(path)?;
        let config = Self::from_json(&contents)?;
        log::debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    pub fn from_json(contents: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let contents = serde_json::to_string_pretty(self)?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, contents)?;

        Ok(())
    }

    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        Self::load(path).unwrap_or_default()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.writer.max_size == 0 {
            return Err(ConfigError::Invalid("writer.max_size must be > 0".to_string()));
        }
        if self.writer.max_size > u32::MAX as usize {
            return Err(ConfigError::Invalid(
                "writer.max_size cannot exceed the 32-bit offset range".to_string(),
            ));
        }
        if self.kaitai.id.is_empty() || !self.kaitai.id.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_') {
            return Err(ConfigError::Invalid(
                "kaitai.id must be a non-empty lower_snake_case identifier".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Config file not found: {0}")]
    NotFound(PathBuf),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Unsupported config format: {0}")]
    UnsupportedFormat(String),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = Config::from_json(r#"{"writer": {"max_size": 1024}}"#).unwrap();
        assert_eq!(config.writer.max_size, 1024);
        assert_eq!(config.writer.initial_capacity, 4096);
        assert!(config.archive.header);
        assert_eq!(config.kaitai.id, "schema_pack");
    }

    #[test]
    fn test_validation() {
        assert!(Config::default().validate().is_ok());
        assert!(matches!(
            Config::from_json(r#"{"kaitai": {"id": "Bad Id"}}"#),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            Config::from_json(r#"{"writer": {"max_size": 0}}"#),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn test_save_and_reload() {
        let path = std::env::temp_dir().join(format!("schema_pack_config_{}.json", std::process::id()));
        let mut config = Config::new();
        config.kaitai.title = Some("Sensor log".to_string());
        config.save(&path).unwrap();
        let loaded = Config::load_or_default(&path);
        assert_eq!(loaded.kaitai.title.as_deref(), Some("Sensor log"));
        fs::remove_file(&path).ok();

        assert_eq!(Config::load_or_default(&path).kaitai.id, "schema_pack");
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            Config::load("/nonexistent/schema-pack.json"),
            Err(ConfigError::NotFound(_))
        ));
    }
}
