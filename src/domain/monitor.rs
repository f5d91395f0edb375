//! Monitor definition types
//!
//! Validated types describing the monitors the device model persists.
//! The engine only reads these; identifiers are owned by the device model.

use super::component::{Component, Variable};
use crate::error::DomainError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Identifier of a persisted monitor definition
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MonitorId(i32);

impl MonitorId {
    /// Wrap a device-model assigned id
    pub const fn new(id: i32) -> Self {
        Self(id)
    }

    /// Raw id value
    #[inline]
    pub const fn get(&self) -> i32 {
        self.0
    }
}

impl fmt::Display for MonitorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl From<i32> for MonitorId {
    fn from(value: i32) -> Self {
        Self(value)
    }
}

/// Monitor severity, 0 (most severe) to 9 (least severe)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Severity(u8);

impl Severity {
    /// Highest severity
    pub const DANGER: Self = Self(0);
    /// Lowest severity
    pub const DEBUG: Self = Self(9);

    /// Create a validated severity
    pub fn new(level: u8) -> Result<Self, DomainError> {
        if level > 9 {
            return Err(DomainError::InvalidSeverity(level));
        }
        Ok(Self(level))
    }

    /// Numeric level
    #[inline]
    pub const fn level(&self) -> u8 {
        self.0
    }

    /// Whether this severity is at least as severe as `threshold`
    ///
    /// Lower numbers are more severe, so this is a numeric `<=`.
    pub fn is_at_least(&self, threshold: Severity) -> bool {
        self.0 <= threshold.0
    }
}

impl TryFrom<u8> for Severity {
    type Error = DomainError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Severity> for u8 {
    fn from(severity: Severity) -> Self {
        severity.0
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self.0 {
            0 => "Danger",
            1 => "HardwareFailure",
            2 => "SystemFailure",
            3 => "Critical",
            4 => "Error",
            5 => "Alert",
            6 => "Warning",
            7 => "Notice",
            8 => "Informational",
            _ => "Debug",
        };
        write!(f, "{} ({})", self.0, name)
    }
}

/// Monitor comparison/schedule type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MonitorKind {
    /// Fires while the value is above the threshold
    UpperThreshold,
    /// Fires while the value is below the threshold
    LowerThreshold,
    /// Fires when the value moved more than the monitor value since the reference
    Delta,
    /// Fires while the actual value deviates from the Target attribute
    TargetDelta,
    /// Like `TargetDelta`, with the monitor value as a percentage of the target
    TargetDeltaRelative,
    /// Reports the value every `value` seconds
    Periodic,
    /// Reports the value on wall-clock boundaries every `value` seconds
    PeriodicClockAligned,
}

impl MonitorKind {
    /// Periodic kinds are driven by the sweep, all others by value changes
    pub fn is_periodic(&self) -> bool {
        matches!(self, Self::Periodic | Self::PeriodicClockAligned)
    }
}

impl fmt::Display for MonitorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UpperThreshold => write!(f, "upper_threshold"),
            Self::LowerThreshold => write!(f, "lower_threshold"),
            Self::Delta => write!(f, "delta"),
            Self::TargetDelta => write!(f, "target_delta"),
            Self::TargetDeltaRelative => write!(f, "target_delta_relative"),
            Self::Periodic => write!(f, "periodic"),
            Self::PeriodicClockAligned => write!(f, "periodic_clock_aligned"),
        }
    }
}

impl FromStr for MonitorKind {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "upper_threshold" => Ok(Self::UpperThreshold),
            "lower_threshold" => Ok(Self::LowerThreshold),
            "delta" => Ok(Self::Delta),
            "target_delta" => Ok(Self::TargetDelta),
            "target_delta_relative" => Ok(Self::TargetDeltaRelative),
            "periodic" => Ok(Self::Periodic),
            "periodic_clock_aligned" => Ok(Self::PeriodicClockAligned),
            _ => Err(DomainError::InvalidValue(format!("Unknown monitor kind: {}", s))),
        }
    }
}

/// Who installed the monitor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MonitorOrigin {
    /// Built into the firmware
    HardWired,
    /// Shipped as factory configuration
    Preconfigured,
    /// Installed by the CSMS
    #[default]
    Custom,
}

impl FromStr for MonitorOrigin {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "hard_wired" | "hardwired" => Ok(Self::HardWired),
            "preconfigured" => Ok(Self::Preconfigured),
            "custom" => Ok(Self::Custom),
            _ => Err(DomainError::InvalidValue(format!("Unknown monitor origin: {}", s))),
        }
    }
}

/// Which monitors are active (SetMonitoringBase)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MonitoringBase {
    /// Every monitor
    #[default]
    All,
    /// Hard-wired and preconfigured monitors
    FactoryDefault,
    /// Only hard-wired monitors
    HardWiredOnly,
}

impl MonitoringBase {
    /// Whether a monitor of the given origin is active under this base
    pub fn includes(&self, origin: MonitorOrigin) -> bool {
        match self {
            Self::All => true,
            Self::FactoryDefault => origin != MonitorOrigin::Custom,
            Self::HardWiredOnly => origin == MonitorOrigin::HardWired,
        }
    }
}

impl FromStr for MonitoringBase {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "all" => Ok(Self::All),
            "factory_default" => Ok(Self::FactoryDefault),
            "hard_wired_only" => Ok(Self::HardWiredOnly),
            _ => Err(DomainError::InvalidValue(format!("Unknown monitoring base: {}", s))),
        }
    }
}

/// Persisted monitor definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitorDefinition {
    /// Device-model assigned id
    pub id: MonitorId,
    /// Comparison or schedule type
    pub kind: MonitorKind,
    /// Threshold, delta, or interval in seconds depending on `kind`
    pub value: f64,
    /// Severity of events raised by this monitor
    pub severity: Severity,
    /// Installer of the monitor
    pub origin: MonitorOrigin,
    /// Reference value for delta monitors
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference_value: Option<String>,
    /// Monitored component
    pub component: Component,
    /// Monitored variable
    pub variable: Variable,
}

impl MonitorDefinition {
    /// Create a custom monitor
    pub fn new(
        id: impl Into<MonitorId>,
        kind: MonitorKind,
        value: f64,
        severity: Severity,
        component: Component,
        variable: Variable,
    ) -> Self {
        Self {
            id: id.into(),
            kind,
            value,
            severity,
            origin: MonitorOrigin::Custom,
            reference_value: None,
            component,
            variable,
        }
    }

    /// Set the origin
    pub fn with_origin(mut self, origin: MonitorOrigin) -> Self {
        self.origin = origin;
        self
    }

    /// Set the delta reference value
    pub fn with_reference(mut self, reference: impl Into<String>) -> Self {
        self.reference_value = Some(reference.into());
        self
    }

    /// Check that `value` is usable for `kind`
    pub fn validate(&self) -> Result<(), DomainError> {
        let reason = if !self.value.is_finite() {
            Some("value must be finite")
        } else if self.kind.is_periodic() && self.value <= 0.0 {
            Some("interval must be positive")
        } else if self.kind.is_periodic() && self.interval().is_none() {
            Some("interval out of range")
        } else if matches!(
            self.kind,
            MonitorKind::Delta | MonitorKind::TargetDelta | MonitorKind::TargetDeltaRelative
        ) && self.value < 0.0
        {
            Some("delta must not be negative")
        } else {
            None
        };

        match reason {
            Some(reason) => Err(DomainError::InvalidMonitorValue {
                id: self.id.get(),
                value: self.value,
                reason: reason.to_string(),
            }),
            None => Ok(()),
        }
    }

    /// Interval of a periodic monitor
    ///
    /// Returns `None` for trigger kinds and for unusable values.
    pub fn interval(&self) -> Option<Duration> {
        if !self.kind.is_periodic() || !self.value.is_finite() || self.value <= 0.0 {
            return None;
        }
        Duration::try_from_secs_f64(self.value).ok()
    }
}
