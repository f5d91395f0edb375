//! Periodic evaluation
//!
//! Timer-driven sweep over periodic and clock-aligned monitors. Definitions
//! are re-read on every sweep since they can change out of band.

use super::engine::MonitorEngine;
use super::entry::{advance_aligned, EntryState, MonitorEntry, PeriodicState};
use crate::device_model::DeviceModel;
use crate::domain::{AttributeKind, MonitorDefinition, MonitorId};

use std::collections::BTreeSet;
use std::time::{Instant, SystemTime};

impl<M: DeviceModel> MonitorEngine<M> {
    /// Reconcile periodic definitions and fire the entries that are due
    ///
    /// With a processing budget configured, the sweep stops once the budget
    /// is spent and resumes after the last evaluated monitor next time.
    pub fn sweep(&mut self, now: Instant, now_wall: SystemTime) {
        let Some(settings) = self.settings() else {
            return;
        };
        if !settings.enabled {
            return;
        }
        let started = Instant::now();

        let definitions = match self.device_model.periodic_monitors() {
            Ok(definitions) => definitions,
            Err(e) => {
                log::warn!("Failed to read periodic monitors: {}", e);
                return;
            }
        };
        self.reconcile(&definitions, now, now_wall);

        for id in self.store.periodic_ids_after(self.sweep_cursor) {
            if !self.is_due(id, now, now_wall) {
                continue;
            }
            self.fire_periodic(id, now, now_wall);

            if let Some(budget) = settings.process_time {
                if started.elapsed() >= budget {
                    log::debug!("Sweep budget of {:?} spent after monitor {}", budget, id);
                    self.sweep_cursor = Some(id);
                    return;
                }
            }
        }
        self.sweep_cursor = None;
    }

    fn reconcile(&mut self, definitions: &[MonitorDefinition], now: Instant, now_wall: SystemTime) {
        let mut seen: BTreeSet<MonitorId> = BTreeSet::new();
        for definition in definitions {
            if let Err(e) = definition.validate() {
                log::warn!("Skipping periodic monitor {}: {}", definition.id, e);
                continue;
            }
            seen.insert(definition.id);
            match self.store.get_mut(definition.id) {
                Some(entry) if entry.is_periodic() => {
                    refresh_periodic(entry, definition, now, now_wall)
                }
                _ => {
                    log::debug!(
                        "Tracking periodic monitor {} on {}.{}",
                        definition.id,
                        definition.component,
                        definition.variable
                    );
                    self.store
                        .insert(MonitorEntry::periodic(definition.clone(), now, now_wall));
                }
            }
        }

        for entry in self.store.iter_mut() {
            let id = entry.id();
            if let EntryState::Periodic(periodic) = &mut entry.state {
                if !seen.contains(&id) {
                    periodic.orphaned = true;
                }
            }
        }
        self.cleanup();
    }

    fn is_due(&self, id: MonitorId, now: Instant, now_wall: SystemTime) -> bool {
        let Some(entry) = self.store.get(id) else {
            return false;
        };
        let (Some(periodic), Some(interval)) = (entry.periodic_state(), entry.definition.interval())
        else {
            return false;
        };
        match periodic.next_aligned {
            Some(boundary) => now_wall >= boundary,
            None => now.saturating_duration_since(periodic.last_evaluated) >= interval,
        }
    }

    fn fire_periodic(&mut self, id: MonitorId, now: Instant, now_wall: SystemTime) {
        let Some(entry) = self.store.get(id) else {
            return;
        };
        let definition = &entry.definition;
        let value = match self.device_model.attribute_value(
            &definition.component,
            &definition.variable,
            AttributeKind::Actual,
        ) {
            Ok(value) => value,
            Err(e) => {
                log::warn!("Periodic monitor {}: failed to read value: {}", id, e);
                return;
            }
        };

        let Some(entry) = self.store.get_mut(id) else {
            return;
        };
        let interval = entry.definition.interval();
        entry.push_value(value);
        if let EntryState::Periodic(periodic) = &mut entry.state {
            periodic.fire_pending = true;
            periodic.last_evaluated = now;
            if let (Some(boundary), Some(interval)) = (periodic.next_aligned, interval) {
                periodic.next_aligned = Some(advance_aligned(boundary, interval, now_wall));
            }
        }
    }
}

/// Take a fresh definition snapshot, restarting the schedule if it changed
pub(crate) fn refresh_periodic(
    entry: &mut MonitorEntry,
    definition: &MonitorDefinition,
    now: Instant,
    now_wall: SystemTime,
) {
    let schedule_changed =
        entry.definition.kind != definition.kind || entry.definition.value != definition.value;
    entry.definition = definition.clone();
    if !schedule_changed {
        return;
    }
    let fire_pending = entry.periodic_state().is_some_and(|p| p.fire_pending);
    let mut state = PeriodicState::start(definition, now, now_wall);
    state.fire_pending = fire_pending;
    entry.state = EntryState::Periodic(state);
}
