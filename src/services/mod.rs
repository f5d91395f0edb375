//! Service layer
//!
//! Wires the monitoring engine to a device model and a timer thread.

pub mod updater;

pub use updater::{MonitoringUpdater, UpdaterConfig};
