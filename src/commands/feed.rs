//! Feed command implementation
//!
//! Writes a sequence of values to one variable, reporting trigger monitors
//! after every write the way a controller does after a settled change.

use crate::cli::args::{FeedArgs, OutputFormat};
use crate::cli::output::{print_output, EventEntry, EventList};
use crate::config::Config;
use crate::device_model::ConnectivityStatus;
use crate::error::{AppError, Result};
use crate::monitoring::{EventSink, MemorySink};
use crate::services::MonitoringUpdater;

use std::sync::Arc;

/// Execute the feed command
pub fn run_feed(args: &FeedArgs, config: &Config, format: OutputFormat) -> Result<()> {
    let events = feed_values(args, config)?;
    print_output(&events, format)?;
    Ok(())
}

/// Apply the values and collect every event handed to the sink
pub fn feed_values(args: &FeedArgs, config: &Config) -> Result<EventList> {
    let model = Arc::new(config.to_device_model()?);
    let (component, variable) = model
        .find_variable(&args.component, &args.variable)
        .ok_or_else(|| AppError::VariableNotFound {
            component: args.component.clone(),
            variable: args.variable.clone(),
        })?;

    let sink = Arc::new(MemorySink::new());
    let offline = args.offline;
    let connectivity: Arc<dyn ConnectivityStatus> = Arc::new(move || offline);
    let updater = MonitoringUpdater::new(
        Arc::clone(&model),
        Arc::clone(&sink) as Arc<dyn EventSink>,
        connectivity,
        config.updater_config(),
    );

    for value in &args.values {
        log::debug!("{}.{} <- {}", component, variable, value);
        model.set_value(&component, &variable, value.as_str())?;
        updater.process_triggered_monitors();
    }
    if args.sweep {
        updater.tick();
    }

    Ok(EventList {
        events: sink.drain().iter().map(EventEntry::from).collect(),
        tracked: updater.with_engine(|engine| engine.tracked_count()),
    })
}
