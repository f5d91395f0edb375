//! Notification event types
//!
//! Structured events handed to the sink; encoding is the sink's concern.

use super::component::{Component, Variable};
use super::monitor::{MonitorId, MonitorOrigin, Severity};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::SystemTime;

/// Maximum length of a reported value
pub const MAX_ACTUAL_VALUE_LEN: usize = 2500;

/// Engine-minted event identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(i32);

impl EventId {
    /// Wrap a raw id
    pub const fn new(id: i32) -> Self {
        Self(id)
    }

    /// Raw id value
    #[inline]
    pub const fn get(&self) -> i32 {
        self.0
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What produced the event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventTrigger {
    /// Threshold crossed or cleared
    Alerting,
    /// Delta exceeded
    Delta,
    /// Periodic report
    Periodic,
}

impl fmt::Display for EventTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Alerting => write!(f, "Alerting"),
            Self::Delta => write!(f, "Delta"),
            Self::Periodic => write!(f, "Periodic"),
        }
    }
}

/// Kind of monitor behind the event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventNotificationType {
    HardWiredMonitor,
    PreconfiguredMonitor,
    CustomMonitor,
}

impl From<MonitorOrigin> for EventNotificationType {
    fn from(origin: MonitorOrigin) -> Self {
        match origin {
            MonitorOrigin::HardWired => Self::HardWiredMonitor,
            MonitorOrigin::Preconfigured => Self::PreconfiguredMonitor,
            MonitorOrigin::Custom => Self::CustomMonitor,
        }
    }
}

/// Notification event for the CSMS
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventData {
    pub event_id: EventId,
    pub timestamp: SystemTime,
    pub trigger: EventTrigger,
    pub actual_value: String,
    /// Set for alerting events only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cleared: Option<bool>,
    pub component: Component,
    pub variable: Variable,
    pub variable_monitoring_id: MonitorId,
    pub notification_type: EventNotificationType,
    pub severity: Severity,
}

impl EventData {
    /// Whether this event reports an active (not cleared) condition
    pub fn is_active_report(&self) -> bool {
        self.cleared == Some(false) || self.trigger == EventTrigger::Delta
    }
}

/// Cut a value to at most [`MAX_ACTUAL_VALUE_LEN`] characters
pub fn truncate_actual_value(value: &str) -> String {
    value.chars().take(MAX_ACTUAL_VALUE_LEN).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notification_type_from_origin() {
        assert_eq!(
            EventNotificationType::from(MonitorOrigin::HardWired),
            EventNotificationType::HardWiredMonitor
        );
        assert_eq!(
            EventNotificationType::from(MonitorOrigin::Custom),
            EventNotificationType::CustomMonitor
        );
    }

    #[test]
    fn test_truncate_short_value() {
        assert_eq!(truncate_actual_value("85.5"), "85.5");
    }

    #[test]
    fn test_truncate_long_value() {
        let long = "x".repeat(MAX_ACTUAL_VALUE_LEN + 100);
        assert_eq!(truncate_actual_value(&long).len(), MAX_ACTUAL_VALUE_LEN);
    }

    #[test]
    fn test_truncate_counts_chars() {
        let long = "é".repeat(MAX_ACTUAL_VALUE_LEN + 10);
        let cut = truncate_actual_value(&long);
        assert_eq!(cut.chars().count(), MAX_ACTUAL_VALUE_LEN);
        assert!(cut.chars().all(|c| c == 'é'));

        let exact = "é".repeat(MAX_ACTUAL_VALUE_LEN);
        assert_eq!(truncate_actual_value(&exact), exact);
    }
}
