//! Configuration system
//!
//! Handles TOML config file parsing and CLI argument merging. The file
//! describes the controller settings and the variables and monitors that make
//! up the in-memory device model.

pub mod builder;
pub mod file;

pub use builder::ConfigBuilder;
pub use file::ConfigFile;

use crate::device_model::{InMemoryDeviceModel, MonitoringSettings};
use crate::domain::{
    Component, DataType, MonitorDefinition, MonitorKind, MonitorOrigin, MonitoringBase,
    Mutability, Severity, Variable, VariableCharacteristics,
};
use crate::error::ConfigError;
use crate::monitoring::EngineConfig;
use crate::services::UpdaterConfig;

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General settings
    pub general: GeneralConfig,
    /// Monitoring controller settings
    pub monitoring_ctrlr: MonitoringCtrlrConfig,
    /// Device model variables and their monitors
    #[serde(default)]
    pub variables: Vec<VariableConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            general: GeneralConfig::default(),
            monitoring_ctrlr: MonitoringCtrlrConfig::default(),
            variables: default_variables(),
        }
    }
}

/// General configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Enable verbose logging
    pub verbose: bool,
    /// Periodic sweep interval in milliseconds
    pub sweep_interval_ms: u64,
    /// Count a successful sink hand-off as delivery
    pub ack_on_handoff: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            verbose: false,
            sweep_interval_ms: 1000,
            ack_on_handoff: true,
        }
    }
}

/// Monitoring controller variables served by the device model
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitoringCtrlrConfig {
    /// MonitoringCtrlrEnabled
    pub enabled: bool,
    /// OfflineQueuingSeverity
    pub offline_severity: Option<Severity>,
    /// ActiveMonitoringLevel
    pub active_level: Option<Severity>,
    /// ActiveMonitoringBase
    pub active_base: Option<MonitoringBase>,
    /// VariableMonitoringProcessTime in milliseconds
    pub process_time_ms: Option<u64>,
}

impl Default for MonitoringCtrlrConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            offline_severity: None,
            active_level: None,
            active_base: None,
            process_time_ms: None,
        }
    }
}

impl MonitoringCtrlrConfig {
    /// Convert to the settings served by the device model
    pub fn to_settings(&self) -> MonitoringSettings {
        MonitoringSettings {
            enabled: Some(self.enabled),
            offline_severity: self.offline_severity,
            active_level: self.active_level,
            active_base: self.active_base,
            process_time: self.process_time_ms.map(Duration::from_millis),
        }
    }
}

/// A variable of the device model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VariableConfig {
    /// Component name
    pub component: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub component_instance: Option<String>,
    /// EVSE id the component belongs to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evse: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connector: Option<u32>,
    /// Variable name
    pub variable: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variable_instance: Option<String>,
    #[serde(default)]
    pub data_type: DataType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(default)]
    pub mutability: Mutability,
    /// Initial Actual value
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    /// Target value for target-delta monitors
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    #[serde(default)]
    pub monitors: Vec<MonitorConfig>,
}

impl VariableConfig {
    pub fn component(&self) -> Component {
        let mut component = Component::new(&self.component);
        if let Some(instance) = &self.component_instance {
            component = component.with_instance(instance);
        }
        if let Some(evse) = self.evse {
            component = component.with_evse(evse, self.connector);
        }
        component
    }

    pub fn variable(&self) -> Variable {
        let variable = Variable::new(&self.variable);
        match &self.variable_instance {
            Some(instance) => variable.with_instance(instance),
            None => variable,
        }
    }

    pub fn characteristics(&self) -> VariableCharacteristics {
        VariableCharacteristics {
            unit: self.unit.clone(),
            ..VariableCharacteristics::of(self.data_type)
        }
    }
}

/// A monitor attached to a variable
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    pub id: i32,
    pub kind: MonitorKind,
    /// Threshold, delta or interval in seconds
    pub value: f64,
    pub severity: Severity,
    #[serde(default)]
    pub origin: MonitorOrigin,
    /// Initial delta reference value
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
}

impl MonitorConfig {
    /// Convert to a definition on the given variable
    pub fn to_definition(&self, component: Component, variable: Variable) -> MonitorDefinition {
        let definition =
            MonitorDefinition::new(self.id, self.kind, self.value, self.severity, component, variable)
                .with_origin(self.origin);
        match &self.reference {
            Some(reference) => definition.with_reference(reference),
            None => definition,
        }
    }
}

impl Config {
    /// Check the configuration for values the device model would reject
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.general.sweep_interval_ms == 0 {
            return Err(ConfigError::InvalidValue {
                key: "general.sweep_interval_ms".to_string(),
                message: "must be greater than zero".to_string(),
            });
        }

        let mut ids = HashSet::new();
        for var in &self.variables {
            for monitor in &var.monitors {
                if !ids.insert(monitor.id) {
                    return Err(ConfigError::DuplicateMonitorId(monitor.id));
                }
                monitor
                    .to_definition(var.component(), var.variable())
                    .validate()
                    .map_err(|e| ConfigError::InvalidValue {
                        key: format!("{}.{}.monitors", var.component, var.variable),
                        message: e.to_string(),
                    })?;
            }
        }
        Ok(())
    }

    /// Build the in-memory device model described by this configuration
    pub fn to_device_model(&self) -> Result<InMemoryDeviceModel, ConfigError> {
        self.validate()?;

        let model = InMemoryDeviceModel::new(self.monitoring_ctrlr.to_settings());
        for var in &self.variables {
            let component = var.component();
            let variable = var.variable();
            model.add_variable(
                component.clone(),
                variable.clone(),
                var.characteristics(),
                var.mutability,
                var.value.clone(),
            );
            if let Some(target) = &var.target {
                model
                    .set_target(&component, &variable, target.clone())
                    .map_err(|e| invalid_variable(var, e))?;
            }
            for monitor in &var.monitors {
                model
                    .add_monitor(monitor.to_definition(component.clone(), variable.clone()))
                    .map_err(|e| invalid_variable(var, e))?;
            }
        }
        log::debug!("Device model built with {} variable(s)", self.variables.len());
        Ok(model)
    }

    /// Engine settings derived from `[general]`
    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            ack_on_handoff: self.general.ack_on_handoff,
        }
    }

    /// Updater settings derived from `[general]`
    pub fn updater_config(&self) -> UpdaterConfig {
        UpdaterConfig {
            sweep_interval: Duration::from_millis(self.general.sweep_interval_ms),
            engine: self.engine_config(),
        }
    }
}

fn invalid_variable(var: &VariableConfig, err: impl std::fmt::Display) -> ConfigError {
    ConfigError::InvalidValue {
        key: format!("{}.{}", var.component, var.variable),
        message: err.to_string(),
    }
}

fn default_variables() -> Vec<VariableConfig> {
    let severity = |level| Severity::new(level).unwrap_or(Severity::DEBUG);
    vec![
        VariableConfig {
            component: "EVSE".to_string(),
            component_instance: None,
            evse: Some(1),
            connector: None,
            variable: "Temperature".to_string(),
            variable_instance: None,
            data_type: DataType::Decimal,
            unit: Some("Celsius".to_string()),
            mutability: Mutability::ReadOnly,
            value: Some("20".to_string()),
            target: None,
            monitors: vec![
                MonitorConfig {
                    id: 1,
                    kind: MonitorKind::UpperThreshold,
                    value: 80.0,
                    severity: severity(4),
                    origin: MonitorOrigin::Preconfigured,
                    reference: None,
                },
                MonitorConfig {
                    id: 2,
                    kind: MonitorKind::Periodic,
                    value: 60.0,
                    severity: severity(8),
                    origin: MonitorOrigin::Preconfigured,
                    reference: None,
                },
            ],
        },
        VariableConfig {
            component: "Connector".to_string(),
            component_instance: None,
            evse: Some(1),
            connector: Some(1),
            variable: "AvailabilityState".to_string(),
            variable_instance: None,
            data_type: DataType::OptionList,
            unit: None,
            mutability: Mutability::ReadOnly,
            value: Some("Available".to_string()),
            target: None,
            monitors: vec![MonitorConfig {
                id: 3,
                kind: MonitorKind::Delta,
                value: 0.0,
                severity: severity(6),
                origin: MonitorOrigin::Preconfigured,
                reference: None,
            }],
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device_model::DeviceModel;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.general.sweep_interval_ms, 1000);
        assert!(config.general.ack_on_handoff);
        assert!(config.monitoring_ctrlr.enabled);
        assert_eq!(config.variables.len(), 2);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_default_config_builds_model() {
        let model = Config::default().to_device_model().unwrap();
        assert_eq!(model.monitors().len(), 3);
        assert_eq!(model.periodic_monitors().unwrap().len(), 1);
        assert_eq!(model.monitoring_settings().unwrap().enabled, Some(true));
    }

    #[test]
    fn test_missing_variables_section_is_empty() {
        let config: Config = toml::from_str("[general]\nverbose = true\n").unwrap();
        assert!(config.general.verbose);
        assert!(config.variables.is_empty());
    }

    #[test]
    fn test_parse_variables() {
        let text = r#"
            [monitoring_ctrlr]
            enabled = true
            offline_severity = 2
            active_base = "hard_wired_only"
            process_time_ms = 250

            [[variables]]
            component = "EVSE"
            evse = 1
            variable = "Power"
            data_type = "decimal"
            value = "7400"
            target = "7000"

            [[variables.monitors]]
            id = 10
            kind = "target_delta_relative"
            value = 5
            severity = 3
            origin = "hard_wired"
        "#;
        let config: Config = toml::from_str(text).unwrap();
        let settings = config.monitoring_ctrlr.to_settings();
        assert_eq!(settings.offline_severity, Some(Severity::new(2).unwrap()));
        assert_eq!(settings.active_base, Some(MonitoringBase::HardWiredOnly));
        assert_eq!(settings.process_time, Some(Duration::from_millis(250)));

        let model = config.to_device_model().unwrap();
        let monitor = &model.monitors()[0];
        assert_eq!(monitor.kind, MonitorKind::TargetDeltaRelative);
        assert_eq!(monitor.origin, MonitorOrigin::HardWired);
        assert_eq!(monitor.component.evse.map(|e| e.id), Some(1));
    }

    #[test]
    fn test_invalid_severity_rejected() {
        let text = r#"
            [[variables]]
            component = "EVSE"
            variable = "Power"

            [[variables.monitors]]
            id = 1
            kind = "upper_threshold"
            value = 1
            severity = 12
        "#;
        assert!(toml::from_str::<Config>(text).is_err());
    }

    #[test]
    fn test_duplicate_monitor_id() {
        let mut config = Config::default();
        let duplicate = config.variables[0].monitors[0].clone();
        config.variables[1].monitors.push(duplicate);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::DuplicateMonitorId(1))
        ));
    }

    #[test]
    fn test_non_positive_interval_rejected() {
        let mut config = Config::default();
        config.variables[0].monitors[1].value = 0.0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_zero_sweep_interval_rejected() {
        let mut config = Config::default();
        config.general.sweep_interval_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_updater_config() {
        let mut config = Config::default();
        config.general.sweep_interval_ms = 250;
        config.general.ack_on_handoff = false;
        let updater = config.updater_config();
        assert_eq!(updater.sweep_interval, Duration::from_millis(250));
        assert!(!updater.engine.ack_on_handoff);
    }
}
