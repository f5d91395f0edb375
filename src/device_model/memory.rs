//! In-memory device model
//!
//! Holds variables, their attribute values and attached monitors, and
//! forwards writes to subscribed listeners. Used by the CLI and in tests.

use super::traits::{
    ChangeNotifier, DeviceModel, MonitorUpdate, MonitoringSettings, VariableChange,
    VariableListener,
};
use crate::domain::{
    AttributeKind, Component, MonitorDefinition, MonitorId, Mutability, Variable,
    VariableAttribute, VariableCharacteristics,
};
use crate::error::DeviceModelError;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock, Weak};

/// A variable tracked by the in-memory model
#[derive(Debug, Clone)]
struct VariableSlot {
    component: Component,
    variable: Variable,
    characteristics: VariableCharacteristics,
    mutability: Mutability,
    actual: Option<String>,
    target: Option<String>,
    monitors: Vec<MonitorDefinition>,
}

impl VariableSlot {
    fn matches(&self, component: &Component, variable: &Variable) -> bool {
        self.component == *component && self.variable == *variable
    }

    fn attribute(&self) -> VariableAttribute {
        VariableAttribute {
            kind: AttributeKind::Actual,
            mutability: self.mutability,
            value: self.actual.clone(),
        }
    }
}

/// Summary of a variable for listings
#[derive(Debug, Clone, PartialEq)]
pub struct VariableSummary {
    pub component: Component,
    pub variable: Variable,
    pub value: Option<String>,
    pub monitor_count: usize,
}

/// Device model kept entirely in memory
pub struct InMemoryDeviceModel {
    settings: RwLock<MonitoringSettings>,
    variables: RwLock<Vec<VariableSlot>>,
    listeners: Mutex<Vec<Weak<dyn VariableListener>>>,
    unavailable: AtomicBool,
}

impl InMemoryDeviceModel {
    /// Create an empty model with the given controller settings
    pub fn new(settings: MonitoringSettings) -> Self {
        Self {
            settings: RwLock::new(settings),
            variables: RwLock::new(Vec::new()),
            listeners: Mutex::new(Vec::new()),
            unavailable: AtomicBool::new(false),
        }
    }

    /// Replace the controller settings
    pub fn set_settings(&self, settings: MonitoringSettings) {
        *write_lock(&self.settings) = settings;
    }

    /// Simulate storage outages; every query fails while set
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Register a variable with its Actual value
    pub fn add_variable(
        &self,
        component: Component,
        variable: Variable,
        characteristics: VariableCharacteristics,
        mutability: Mutability,
        value: Option<String>,
    ) {
        let mut variables = write_lock(&self.variables);
        if let Some(slot) = variables
            .iter_mut()
            .find(|s| s.matches(&component, &variable))
        {
            slot.characteristics = characteristics;
            slot.mutability = mutability;
            slot.actual = value;
            return;
        }
        variables.push(VariableSlot {
            component,
            variable,
            characteristics,
            mutability,
            actual: value,
            target: None,
            monitors: Vec::new(),
        });
    }

    /// Set the Target attribute of a variable
    pub fn set_target(
        &self,
        component: &Component,
        variable: &Variable,
        value: impl Into<String>,
    ) -> Result<(), DeviceModelError> {
        let mut variables = write_lock(&self.variables);
        let slot = find_slot_mut(&mut variables, component, variable)?;
        slot.target = Some(value.into());
        Ok(())
    }

    /// Attach a monitor without notifying listeners
    pub fn add_monitor(&self, monitor: MonitorDefinition) -> Result<(), DeviceModelError> {
        let mut variables = write_lock(&self.variables);
        if variables
            .iter()
            .any(|s| s.monitors.iter().any(|m| m.id == monitor.id))
        {
            return Err(DeviceModelError::DuplicateMonitor(monitor.id.get()));
        }
        let slot = find_slot_mut(&mut variables, &monitor.component, &monitor.variable)?;
        slot.monitors.push(monitor);
        Ok(())
    }

    /// Replace an existing monitor and notify listeners
    pub fn update_monitor(&self, monitor: MonitorDefinition) -> Result<(), DeviceModelError> {
        let (characteristics, attribute, current) = {
            let mut variables = write_lock(&self.variables);
            let slot = find_slot_mut(&mut variables, &monitor.component, &monitor.variable)?;
            let existing = slot
                .monitors
                .iter_mut()
                .find(|m| m.id == monitor.id)
                .ok_or(DeviceModelError::MonitorNotFound(monitor.id.get()))?;
            *existing = monitor.clone();
            (
                slot.characteristics.clone(),
                slot.attribute(),
                slot.actual.clone().unwrap_or_default(),
            )
        };

        let update = MonitorUpdate {
            monitor: &monitor,
            characteristics: &characteristics,
            attribute: &attribute,
            current_value: &current,
        };
        for listener in self.live_listeners() {
            listener.on_monitor_updated(&update);
        }
        Ok(())
    }

    /// Remove a monitor definition; returns whether it existed
    pub fn remove_monitor(&self, id: MonitorId) -> bool {
        let mut variables = write_lock(&self.variables);
        for slot in variables.iter_mut() {
            if let Some(pos) = slot.monitors.iter().position(|m| m.id == id) {
                slot.monitors.remove(pos);
                return true;
            }
        }
        false
    }

    /// Write the Actual value of a variable and notify listeners
    pub fn set_value(
        &self,
        component: &Component,
        variable: &Variable,
        value: impl Into<String>,
    ) -> Result<(), DeviceModelError> {
        let value = value.into();
        let (slot, previous) = {
            let mut variables = write_lock(&self.variables);
            let slot = find_slot_mut(&mut variables, component, variable)?;
            let previous = slot.actual.replace(value.clone()).unwrap_or_default();
            (slot.clone(), previous)
        };

        if slot.monitors.is_empty() {
            return Ok(());
        }

        let attribute = slot.attribute();
        let change = VariableChange {
            monitors: &slot.monitors,
            component: &slot.component,
            variable: &slot.variable,
            characteristics: &slot.characteristics,
            attribute: &attribute,
            value_previous: &previous,
            value_current: &value,
        };
        for listener in self.live_listeners() {
            listener.on_variable_changed(&change);
        }
        Ok(())
    }

    /// Find a variable by component and variable name
    pub fn find_variable(&self, component: &str, variable: &str) -> Option<(Component, Variable)> {
        read_lock(&self.variables)
            .iter()
            .find(|s| s.component.name == component && s.variable.name == variable)
            .map(|s| (s.component.clone(), s.variable.clone()))
    }

    /// All monitor definitions, ordered by id
    pub fn monitors(&self) -> Vec<MonitorDefinition> {
        let mut monitors: Vec<_> = read_lock(&self.variables)
            .iter()
            .flat_map(|s| s.monitors.iter().cloned())
            .collect();
        monitors.sort_by_key(|m| m.id);
        monitors
    }

    /// Summaries of all variables
    pub fn variables(&self) -> Vec<VariableSummary> {
        read_lock(&self.variables)
            .iter()
            .map(|s| VariableSummary {
                component: s.component.clone(),
                variable: s.variable.clone(),
                value: s.actual.clone(),
                monitor_count: s.monitors.len(),
            })
            .collect()
    }

    fn live_listeners(&self) -> Vec<Arc<dyn VariableListener>> {
        let mut listeners = self
            .listeners
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        listeners.retain(|l| l.strong_count() > 0);
        listeners.iter().filter_map(Weak::upgrade).collect()
    }

    fn check_available(&self) -> Result<(), DeviceModelError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(DeviceModelError::Unavailable(
                "storage offline".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for InMemoryDeviceModel {
    fn default() -> Self {
        Self::new(MonitoringSettings {
            enabled: Some(true),
            ..MonitoringSettings::default()
        })
    }
}

impl DeviceModel for InMemoryDeviceModel {
    fn monitoring_settings(&self) -> Result<MonitoringSettings, DeviceModelError> {
        self.check_available()?;
        Ok(*read_lock(&self.settings))
    }

    fn periodic_monitors(&self) -> Result<Vec<MonitorDefinition>, DeviceModelError> {
        self.check_available()?;
        Ok(self
            .monitors()
            .into_iter()
            .filter(|m| m.kind.is_periodic())
            .collect())
    }

    fn attribute_value(
        &self,
        component: &Component,
        variable: &Variable,
        attribute: AttributeKind,
    ) -> Result<String, DeviceModelError> {
        self.check_available()?;
        let variables = read_lock(&self.variables);
        let slot = variables
            .iter()
            .find(|s| s.matches(component, variable))
            .ok_or_else(|| not_found(component, variable))?;

        let value = match attribute {
            AttributeKind::Actual => slot.actual.clone(),
            AttributeKind::Target => slot.target.clone(),
            AttributeKind::MinSet | AttributeKind::MaxSet => None,
        };
        value.ok_or_else(|| DeviceModelError::AttributeUnavailable {
            component: component.to_string(),
            variable: variable.to_string(),
            attribute: attribute.to_string(),
        })
    }

    fn update_monitor_reference(
        &self,
        id: MonitorId,
        value: &str,
    ) -> Result<(), DeviceModelError> {
        self.check_available()?;
        let mut variables = write_lock(&self.variables);
        let monitor = variables
            .iter_mut()
            .flat_map(|s| s.monitors.iter_mut())
            .find(|m| m.id == id)
            .ok_or(DeviceModelError::MonitorNotFound(id.get()))?;
        monitor.reference_value = Some(value.to_string());
        Ok(())
    }
}

impl ChangeNotifier for InMemoryDeviceModel {
    fn subscribe(&self, listener: Weak<dyn VariableListener>) {
        self.listeners
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(listener);
    }
}

fn find_slot_mut<'a>(
    variables: &'a mut [VariableSlot],
    component: &Component,
    variable: &Variable,
) -> Result<&'a mut VariableSlot, DeviceModelError> {
    variables
        .iter_mut()
        .find(|s| s.matches(component, variable))
        .ok_or_else(|| not_found(component, variable))
}

fn not_found(component: &Component, variable: &Variable) -> DeviceModelError {
    DeviceModelError::VariableNotFound {
        component: component.to_string(),
        variable: variable.to_string(),
    }
}

fn read_lock<T>(lock: &RwLock<T>) -> std::sync::RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn write_lock<T>(lock: &RwLock<T>) -> std::sync::RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(|poisoned| poisoned.into_inner())
}
