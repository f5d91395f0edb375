//! Domain models for varmon
//!
//! Device model addressing, monitor definitions and notification events.
//! Types are validated on construction (fail-fast pattern).

pub mod component;
pub mod event;
pub mod monitor;

pub use component::{
    AttributeKind, Component, DataType, Evse, Mutability, Variable, VariableAttribute,
    VariableCharacteristics,
};
pub use event::{EventData, EventId, EventNotificationType, EventTrigger};
pub use monitor::{
    MonitorDefinition, MonitorId, MonitorKind, MonitorOrigin, MonitoringBase, Severity,
};
