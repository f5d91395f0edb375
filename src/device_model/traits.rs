//! Trait definitions for device model access
//!
//! These traits are the narrow capabilities the monitoring engine depends on,
//! allowing an in-memory model in tests and a persistent one in production.

use crate::domain::{
    AttributeKind, Component, MonitorDefinition, MonitorId, MonitoringBase, Severity, Variable,
    VariableAttribute, VariableCharacteristics,
};
use crate::error::DeviceModelError;
use std::sync::Weak;
use std::time::Duration;

/// Monitoring controller values served by the device model
///
/// Every field is optional; the engine degrades missing values to the
/// conservative default (monitoring disabled, no offline queuing, no budget).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MonitoringSettings {
    /// MonitoringCtrlrEnabled
    pub enabled: Option<bool>,
    /// OfflineQueuingSeverity
    pub offline_severity: Option<Severity>,
    /// ActiveMonitoringLevel
    pub active_level: Option<Severity>,
    /// ActiveMonitoringBase
    pub active_base: Option<MonitoringBase>,
    /// VariableMonitoringProcessTime
    pub process_time: Option<Duration>,
}

/// Read access to the device model
pub trait DeviceModel: Send + Sync {
    /// Current monitoring controller configuration
    fn monitoring_settings(&self) -> Result<MonitoringSettings, DeviceModelError>;

    /// All periodic and clock-aligned monitor definitions
    fn periodic_monitors(&self) -> Result<Vec<MonitorDefinition>, DeviceModelError>;

    /// Value of one attribute of a variable
    fn attribute_value(
        &self,
        component: &Component,
        variable: &Variable,
        attribute: AttributeKind,
    ) -> Result<String, DeviceModelError>;

    /// Persist a new delta reference value for a monitor
    ///
    /// Must not notify listeners.
    fn update_monitor_reference(&self, id: MonitorId, value: &str)
        -> Result<(), DeviceModelError>;
}

/// An attribute write observed by the device model
#[derive(Debug, Clone, Copy)]
pub struct VariableChange<'a> {
    /// Monitors attached to the variable
    pub monitors: &'a [MonitorDefinition],
    pub component: &'a Component,
    pub variable: &'a Variable,
    pub characteristics: &'a VariableCharacteristics,
    pub attribute: &'a VariableAttribute,
    pub value_previous: &'a str,
    pub value_current: &'a str,
}

/// A monitor definition edited in the device model
#[derive(Debug, Clone, Copy)]
pub struct MonitorUpdate<'a> {
    pub monitor: &'a MonitorDefinition,
    pub characteristics: &'a VariableCharacteristics,
    pub attribute: &'a VariableAttribute,
    /// Current value of the monitored attribute
    pub current_value: &'a str,
}

/// Receiver of device model change notifications
pub trait VariableListener: Send + Sync {
    /// A monitored attribute was written
    fn on_variable_changed(&self, change: &VariableChange<'_>);

    /// A monitor definition was replaced
    fn on_monitor_updated(&self, update: &MonitorUpdate<'_>);
}

/// Subscription side of the device model
pub trait ChangeNotifier: Send + Sync {
    /// Register a listener; dropped listeners are skipped
    fn subscribe(&self, listener: Weak<dyn VariableListener>);
}

/// Whether the station currently has no session with the CSMS
pub trait ConnectivityStatus: Send + Sync {
    fn is_offline(&self) -> bool;
}

impl<F> ConnectivityStatus for F
where
    F: Fn() -> bool + Send + Sync,
{
    fn is_offline(&self) -> bool {
        self()
    }
}
