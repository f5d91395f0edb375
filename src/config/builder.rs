//! Configuration builder
//!
//! Merges configuration from files and CLI arguments.

use crate::config::{Config, ConfigFile};
use crate::domain::Severity;
use crate::error::ConfigError;

/// Builder for merging configuration sources
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Create a new builder with default configuration
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    /// Load configuration from an explicit file or the default locations
    ///
    /// An explicit path that fails to load is an error; missing default
    /// files are not.
    pub fn with_file(mut self, path: Option<&str>) -> Result<Self, ConfigError> {
        let file_config = match path {
            Some(path) => Some(ConfigFile::load(path)?),
            None => ConfigFile::load_default(),
        };

        if let Some(cfg) = file_config {
            self.config = cfg;
        }
        Ok(self)
    }

    /// Override with CLI verbose flag
    pub fn with_verbose(mut self, verbose: Option<bool>) -> Self {
        if let Some(v) = verbose {
            self.config.general.verbose = v;
        }
        self
    }

    /// Override with CLI sweep interval
    pub fn with_sweep_interval(mut self, interval_ms: Option<u64>) -> Self {
        if let Some(i) = interval_ms {
            self.config.general.sweep_interval_ms = i;
        }
        self
    }

    /// Override the hand-off acknowledgement policy
    pub fn with_ack_on_handoff(mut self, ack: Option<bool>) -> Self {
        if let Some(a) = ack {
            self.config.general.ack_on_handoff = a;
        }
        self
    }

    /// Override the monitoring enable switch
    pub fn with_enabled(mut self, enabled: Option<bool>) -> Self {
        if let Some(e) = enabled {
            self.config.monitoring_ctrlr.enabled = e;
        }
        self
    }

    /// Override the offline queuing severity
    pub fn with_offline_severity(mut self, severity: Option<Severity>) -> Self {
        if let Some(s) = severity {
            self.config.monitoring_ctrlr.offline_severity = Some(s);
        }
        self
    }

    /// Build the final configuration
    pub fn build(self) -> Config {
        self.config
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_builder_defaults() {
        let config = ConfigBuilder::new().build();
        assert!(!config.general.verbose);
        assert!(config.general.ack_on_handoff);
    }

    #[test]
    fn test_builder_overrides() {
        let config = ConfigBuilder::new()
            .with_verbose(Some(true))
            .with_sweep_interval(Some(200))
            .with_ack_on_handoff(Some(false))
            .with_enabled(Some(false))
            .with_offline_severity(Some(Severity::new(3).unwrap()))
            .build();

        assert!(config.general.verbose);
        assert_eq!(config.general.sweep_interval_ms, 200);
        assert!(!config.general.ack_on_handoff);
        assert!(!config.monitoring_ctrlr.enabled);
        assert_eq!(
            config.monitoring_ctrlr.offline_severity,
            Some(Severity::new(3).unwrap())
        );
    }

    #[test]
    fn test_builder_none_keeps_file_values() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[general]\nsweep_interval_ms = 750\n").unwrap();
        let path = file.path().to_string_lossy().to_string();

        let config = ConfigBuilder::new()
            .with_file(Some(&path))
            .unwrap()
            .with_sweep_interval(None)
            .build();
        assert_eq!(config.general.sweep_interval_ms, 750);
        assert!(config.variables.is_empty());
    }

    #[test]
    fn test_builder_explicit_missing_file() {
        let result = ConfigBuilder::new().with_file(Some("/nonexistent/varmon.toml"));
        assert!(result.is_err());
    }
}
