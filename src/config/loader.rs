// src/config/loader.rs
//! Configuration loader with search paths and validation

use crate::config::DigitizerConfig;
use crate::error::DigitizerError;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Environment variable naming an explicit configuration file
pub const CONFIG_ENV_VAR: &str = "DIGITIZER_CONFIG";

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("configuration file not found: {0}")]
    FileNotFound(String),

    #[error("configuration parse error: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("configuration validation error: {0}")]
    ValidationError(#[from] DigitizerError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Loads a [`DigitizerConfig`] from the first existing candidate path
pub struct ConfigLoader {
    config_paths: Vec<PathBuf>,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    /// Loader over the default search paths
    pub fn new() -> Self {
        Self {
            config_paths: Self::discover_config_paths(),
        }
    }

    /// Loader with custom paths, searched in order
    pub fn with_paths(paths: Vec<PathBuf>) -> Self {
        Self { config_paths: paths }
    }

    pub fn config_paths(&self) -> &[PathBuf] {
        &self.config_paths
    }

    /// Load and validate the first configuration file found
    pub fn load(&self) -> Result<DigitizerConfig, ConfigError> {
        match self.config_paths.iter().find(|path| path.is_file()) {
            Some(path) => Self::from_file(path),
            None => Err(ConfigError::FileNotFound(
                self.config_paths
                    .iter()
                    .map(|p| p.display().to_string())
                    .collect::<Vec<_>>()
                    .join(", "),
            )),
        }
    }

    /// Load and validate one file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<DigitizerConfig, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.display().to_string()));
        }
        let content = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&content)?;
        tracing::debug!(path = %path.display(), "loaded digitizer configuration");
        Ok(config)
    }

    /// Parse and validate TOML text
    pub fn from_toml_str(content: &str) -> Result<DigitizerConfig, ConfigError> {
        let config: DigitizerConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    fn discover_config_paths() -> Vec<PathBuf> {
        let mut paths = Vec::new();
        if let Ok(explicit) = std::env::var(CONFIG_ENV_VAR) {
            paths.push(PathBuf::from(explicit));
        }
        paths.push(PathBuf::from("digitizer.toml"));
        paths.push(PathBuf::from("config/digitizer.toml"));
        paths.push(PathBuf::from("/etc/digitizer/digitizer.toml"));
        paths
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hal::{OversampleMode, Transport, TriggerSource};
    use std::io::Write;

    const SAMPLE: &str = r#"
[acquisition]
name = "bpm1"
channels = 8
samples = 200
decimation = 2
clock_hz = 250000
oversample_mode = "band_pass32x"
trigger_source = "external"
transport = "block_copy"

[history]
capacity = 100
usable_depth = 90

[timing]
settle_delay_ms = 0

[calibration]
scales = [0.5, 0.25]
"#;

    #[test]
    fn test_parse_full_file() {
        let config = ConfigLoader::from_toml_str(SAMPLE).unwrap();
        assert_eq!(config.acquisition.name, "bpm1");
        assert_eq!(config.acquisition.channels, 8);
        assert_eq!(config.acquisition.mode(), OversampleMode::BandPass32x);
        assert_eq!(config.acquisition.trigger_source, TriggerSource::External);
        assert_eq!(config.acquisition.transport, Transport::BlockCopy);
        assert_eq!(config.acquisition.steps, 1);
        assert_eq!(config.history.usable_depth(), 90);
        assert_eq!(config.timing.settle_delay_ms, 0);
        assert_eq!(config.timing.pll_settle_ms, 100);
        assert_eq!(config.calibration.scales, vec![0.5, 0.25]);
    }

    #[test]
    fn test_empty_file_uses_defaults() {
        let config = ConfigLoader::from_toml_str("").unwrap();
        assert_eq!(config, DigitizerConfig::default());
    }

    #[test]
    fn test_invalid_values_rejected() {
        let result = ConfigLoader::from_toml_str("[acquisition]\nchannels = 3\n");
        assert!(matches!(result, Err(ConfigError::ValidationError(_))));

        let result = ConfigLoader::from_toml_str("[acquisition]\nchannels = \"four\"\n");
        assert!(matches!(result, Err(ConfigError::ParseError(_))));
    }

    #[test]
    fn test_load_from_search_paths() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.toml");
        let present = dir.path().join("digitizer.toml");
        let mut file = std::fs::File::create(&present).unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();

        let loader = ConfigLoader::with_paths(vec![missing.clone(), present]);
        let config = loader.load().unwrap();
        assert_eq!(config.acquisition.name, "bpm1");

        let loader = ConfigLoader::with_paths(vec![missing]);
        assert!(matches!(loader.load(), Err(ConfigError::FileNotFound(_))));
    }
}
