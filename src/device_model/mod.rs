//! Device model abstraction layer
//!
//! Provides trait-based access to monitor definitions and variable values,
//! plus an in-memory implementation.

pub mod memory;
pub mod traits;

pub use memory::{InMemoryDeviceModel, VariableSummary};
pub use traits::{
    ChangeNotifier, ConnectivityStatus, DeviceModel, MonitorUpdate, MonitoringSettings,
    VariableChange, VariableListener,
};
