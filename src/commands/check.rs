//! Check command implementation
//!
//! Loads and validates a configuration file without running anything.

use crate::cli::args::OutputFormat;
use crate::cli::output::{print_output, CheckReport};
use crate::config::{Config, ConfigFile};
use crate::error::Result;

/// Execute the check command
pub fn run_check(config_path: Option<&str>, format: OutputFormat) -> Result<()> {
    let (config, source) = load_for_check(config_path)?;
    let report = check_config(&config, source)?;
    print_output(&report, format)?;
    Ok(())
}

/// Validate a configuration and summarize it
pub fn check_config(config: &Config, source: String) -> Result<CheckReport> {
    config.validate()?;

    let monitors = config.variables.iter().flat_map(|v| &v.monitors);
    Ok(CheckReport {
        source,
        variables: config.variables.len(),
        monitors: monitors.clone().count(),
        periodic_monitors: monitors.filter(|m| m.kind.is_periodic()).count(),
    })
}

fn load_for_check(config_path: Option<&str>) -> Result<(Config, String)> {
    if let Some(path) = config_path {
        return Ok((ConfigFile::load(path)?, path.to_string()));
    }
    // Unlike normal startup, a broken default file is reported
    for path in ConfigFile::default_paths().into_iter().rev() {
        if path.exists() {
            let config = ConfigFile::load(&path)?;
            return Ok((config, path.display().to_string()));
        }
    }
    Ok((Config::default(), "built-in defaults".to_string()))
}
