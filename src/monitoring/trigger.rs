//! Trigger evaluation
//!
//! Decides on every attribute write whether a threshold/delta monitor newly
//! fired or cleared. Nothing is sent from here; emission happens in a later
//! processing pass.

use super::engine::MonitorEngine;
use super::entry::{EntryState, MonitorEntry};
use crate::device_model::{DeviceModel, MonitorUpdate, VariableChange};
use crate::domain::{
    AttributeKind, MonitorDefinition, MonitorKind, VariableAttribute, VariableCharacteristics,
};

use std::time::{Instant, SystemTime};

/// Result of applying a monitor's comparison rule
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RuleOutcome {
    Triggered,
    NotTriggered,
    /// Rule could not be applied to this value
    Skipped,
}

impl<M: DeviceModel> MonitorEngine<M> {
    /// Device model hook: a monitored attribute was written
    pub fn on_variable_changed(&mut self, change: &VariableChange<'_>) {
        for monitor in change.monitors {
            if monitor.kind.is_periodic() {
                continue;
            }
            self.evaluate_monitor(
                monitor,
                change.characteristics,
                change.attribute,
                change.value_previous,
                change.value_current,
            );
        }
    }

    /// Device model hook: a monitor definition was replaced
    ///
    /// Periodic monitors restart their schedule at `now`/`now_wall`.
    pub fn on_monitor_updated(
        &mut self,
        update: &MonitorUpdate<'_>,
        now: Instant,
        now_wall: SystemTime,
    ) {
        let monitor = update.monitor;
        if monitor.kind.is_periodic() {
            if let Err(e) = monitor.validate() {
                log::warn!("Ignoring updated monitor {}: {}", monitor.id, e);
                return;
            }
            let mut entry = MonitorEntry::periodic(monitor.clone(), now, now_wall);
            if let Some(old) = self.store.get(monitor.id) {
                entry.value_previous = old.value_previous.clone();
                entry.value_current = old.value_current.clone();
            }
            log::debug!("Periodic monitor {} updated, schedule restarted", monitor.id);
            self.store.insert(entry);
            return;
        }

        self.evaluate_monitor(
            monitor,
            update.characteristics,
            update.attribute,
            update.current_value,
            update.current_value,
        );
    }

    /// Apply one trigger monitor to a value change and record the outcome
    pub fn evaluate_monitor(
        &mut self,
        monitor: &MonitorDefinition,
        characteristics: &VariableCharacteristics,
        attribute: &VariableAttribute,
        value_previous: &str,
        value_current: &str,
    ) {
        let outcome = self.apply_rule(monitor, characteristics, value_previous, value_current);
        let write_only = attribute.is_write_only();

        match outcome {
            RuleOutcome::Skipped => {}
            RuleOutcome::Triggered => match self.store.get_mut(monitor.id) {
                Some(entry) if entry.is_trigger() => {
                    entry.definition = monitor.clone();
                    entry.write_only = write_only;
                    if entry.set_trigger_clear_state(false) {
                        log::debug!("Monitor {} triggered again", monitor.id);
                        entry.record_values(value_previous, value_current);
                    } else if monitor.kind == MonitorKind::Delta && rearm(entry) {
                        // Every delta crossing is its own report
                        log::debug!("Monitor {} crossed its delta again", monitor.id);
                        entry.record_values(value_previous, value_current);
                    } else {
                        entry.value_current = value_current.to_string();
                    }
                }
                _ => {
                    log::debug!(
                        "Monitor {} triggered on {}.{}: {} -> {}",
                        monitor.id,
                        monitor.component,
                        monitor.variable,
                        value_previous,
                        value_current
                    );
                    self.store.insert(MonitorEntry::trigger(
                        monitor.clone(),
                        write_only,
                        value_previous,
                        value_current,
                    ));
                }
            },
            RuleOutcome::NotTriggered => {
                if let Some(entry) = self.store.get_mut(monitor.id) {
                    if !entry.is_trigger() {
                        return;
                    }
                    entry.definition = monitor.clone();
                    // Delta monitors have no clear condition
                    if monitor.kind != MonitorKind::Delta && entry.set_trigger_clear_state(true) {
                        log::debug!("Monitor {} cleared", monitor.id);
                        entry.record_values(value_previous, value_current);
                    } else {
                        entry.value_current = value_current.to_string();
                    }
                }
            }
        }
    }

    pub(crate) fn apply_rule(
        &self,
        monitor: &MonitorDefinition,
        characteristics: &VariableCharacteristics,
        value_previous: &str,
        value_current: &str,
    ) -> RuleOutcome {
        match monitor.kind {
            MonitorKind::UpperThreshold => match parse_number(value_current) {
                Some(value) => outcome(value > monitor.value),
                None => skipped(monitor, value_current),
            },
            MonitorKind::LowerThreshold => match parse_number(value_current) {
                Some(value) => outcome(value < monitor.value),
                None => skipped(monitor, value_current),
            },
            MonitorKind::Delta => {
                self.apply_delta(monitor, characteristics, value_previous, value_current)
            }
            MonitorKind::TargetDelta | MonitorKind::TargetDeltaRelative => {
                let Some(actual) = parse_number(value_current) else {
                    return skipped(monitor, value_current);
                };
                let target = match self.device_model.attribute_value(
                    &monitor.component,
                    &monitor.variable,
                    AttributeKind::Target,
                ) {
                    Ok(target) => target,
                    Err(e) => {
                        log::warn!("Monitor {}: target unavailable: {}", monitor.id, e);
                        return RuleOutcome::Skipped;
                    }
                };
                let Some(target) = parse_number(&target) else {
                    return skipped(monitor, &target);
                };
                let allowed = if monitor.kind == MonitorKind::TargetDeltaRelative {
                    monitor.value / 100.0 * target.abs()
                } else {
                    monitor.value
                };
                outcome((actual - target).abs() > allowed)
            }
            MonitorKind::Periodic | MonitorKind::PeriodicClockAligned => RuleOutcome::Skipped,
        }
    }

    fn apply_delta(
        &self,
        monitor: &MonitorDefinition,
        characteristics: &VariableCharacteristics,
        value_previous: &str,
        value_current: &str,
    ) -> RuleOutcome {
        if !characteristics.data_type.is_numeric() {
            if value_previous == value_current {
                return RuleOutcome::NotTriggered;
            }
            self.move_reference(monitor, value_current);
            return RuleOutcome::Triggered;
        }

        let Some(current) = parse_number(value_current) else {
            return skipped(monitor, value_current);
        };
        let reference = monitor.reference_value.as_deref().and_then(parse_number);
        match reference {
            None => {
                // First observation establishes the reference
                self.move_reference(monitor, value_current);
                RuleOutcome::NotTriggered
            }
            Some(reference) if (current - reference).abs() > monitor.value => {
                self.move_reference(monitor, value_current);
                RuleOutcome::Triggered
            }
            Some(_) => RuleOutcome::NotTriggered,
        }
    }

    fn move_reference(&self, monitor: &MonitorDefinition, value: &str) {
        if let Err(e) = self.device_model.update_monitor_reference(monitor.id, value) {
            log::warn!(
                "Monitor {}: failed to store reference value: {}",
                monitor.id,
                e
            );
        }
    }
}

fn rearm(entry: &mut MonitorEntry) -> bool {
    match &mut entry.state {
        EntryState::Trigger(trigger) => trigger.rearm(),
        EntryState::Periodic(_) => false,
    }
}

fn parse_number(value: &str) -> Option<f64> {
    value.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

fn outcome(triggered: bool) -> RuleOutcome {
    if triggered {
        RuleOutcome::Triggered
    } else {
        RuleOutcome::NotTriggered
    }
}

fn skipped(monitor: &MonitorDefinition, value: &str) -> RuleOutcome {
    log::warn!(
        "Monitor {} ({}): value '{}' is not numeric, skipping",
        monitor.id,
        monitor.kind,
        value
    );
    RuleOutcome::Skipped
}
