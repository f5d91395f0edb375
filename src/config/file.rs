//! Configuration file loading
//!
//! Handles loading configuration from TOML files.

use crate::config::Config;
use crate::error::ConfigError;

use std::path::{Path, PathBuf};

/// Configuration file handler
pub struct ConfigFile;

impl ConfigFile {
    /// Load configuration from a file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path)
            .map_err(|_| ConfigError::FileNotFound(path.display().to_string()))?;

        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load configuration from the first default location that parses
    pub fn load_default() -> Option<Config> {
        for path in Self::default_paths() {
            if !path.exists() {
                continue;
            }
            match Self::load(&path) {
                Ok(config) => {
                    log::info!("Loaded config from {}", path.display());
                    return Some(config);
                }
                Err(e) => log::warn!("Ignoring {}: {}", path.display(), e),
            }
        }
        None
    }

    /// Write a configuration as TOML
    pub fn save<P: AsRef<Path>>(config: &Config, path: P) -> Result<(), ConfigError> {
        let text = toml::to_string_pretty(config)
            .map_err(|e| ConfigError::ParseError(e.to_string()))?;
        std::fs::write(path.as_ref(), text)
            .map_err(|e| ConfigError::ParseError(format!("{}: {}", path.as_ref().display(), e)))
    }

    /// Get default configuration file paths, lowest priority first
    pub fn default_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from("/etc/varmon/config.toml")];

        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("varmon/config.toml"));
        }

        paths.push(PathBuf::from("varmon.toml"));
        paths.push(PathBuf::from(".varmon.toml"));

        paths
    }
}
