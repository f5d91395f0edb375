//! Run command implementation
//!
//! Drives the periodic timer against the configured device model.

use crate::cli::args::{OutputFormat, RunArgs};
use crate::config::Config;
use crate::device_model::ConnectivityStatus;
use crate::error::{AppError, ConfigError, Result};
use crate::monitoring::{EventSink, JsonLinesSink, TerminalSink};
use crate::services::MonitoringUpdater;

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// Execute the run command
pub fn run_monitoring(args: &RunArgs, config: &Config, format: OutputFormat) -> Result<()> {
    let mut updater_config = config.updater_config();
    if let Some(ms) = args.interval_ms {
        if ms == 0 {
            return Err(ConfigError::InvalidValue {
                key: "interval-ms".to_string(),
                message: "must be greater than zero".to_string(),
            }
            .into());
        }
        updater_config.sweep_interval = Duration::from_millis(ms);
    }
    let interval = updater_config.sweep_interval;

    let model = Arc::new(config.to_device_model()?);
    let sink = sink_for(format);
    let connectivity: Arc<dyn ConnectivityStatus> = Arc::new(|| false);
    let mut updater = MonitoringUpdater::new(model, sink, connectivity, updater_config);

    log::info!("Starting monitoring ({:?} sweep interval)", interval);

    match args.ticks {
        Some(ticks) => {
            for tick in 0..ticks {
                if tick > 0 {
                    thread::sleep(interval);
                }
                updater.tick();
            }
        }
        None => {
            let running = Arc::new(AtomicBool::new(true));
            let r = Arc::clone(&running);
            ctrlc::set_handler(move || {
                log::info!("Received shutdown signal");
                r.store(false, Ordering::SeqCst);
            })
            .map_err(|e| AppError::Io(io::Error::other(e)))?;

            updater.start_monitoring();
            while running.load(Ordering::SeqCst) {
                thread::sleep(Duration::from_millis(100));
            }
            updater.stop_monitoring();
        }
    }

    let tracked = updater.with_engine(|engine| engine.tracked_count());
    log::info!("Monitoring stopped, {} monitor(s) still tracked", tracked);
    Ok(())
}

fn sink_for(format: OutputFormat) -> Arc<dyn EventSink> {
    match format {
        OutputFormat::Table => Arc::new(TerminalSink::stdout()),
        OutputFormat::Json => Arc::new(JsonLinesSink::new(io::stdout())),
        OutputFormat::Compact => Arc::new(TerminalSink::no_color()),
    }
}
