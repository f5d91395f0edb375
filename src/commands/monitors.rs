//! Monitors command implementation

use crate::cli::args::OutputFormat;
use crate::cli::output::{print_output, MonitorList, MonitorListEntry};
use crate::config::Config;
use crate::error::Result;

/// Execute the monitors command
pub fn run_monitors(config: &Config, format: OutputFormat) -> Result<()> {
    let model = config.to_device_model()?;

    let list = MonitorList {
        enabled: config.monitoring_ctrlr.enabled,
        monitors: model.monitors().iter().map(MonitorListEntry::from).collect(),
    };
    print_output(&list, format)?;
    Ok(())
}
