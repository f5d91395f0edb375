//! Event emission and deferral
//!
//! Turns settled entry state into outward events. A pass is split in two
//! halves so the sink can be called without holding the engine:
//! [`MonitorEngine::prepare_batch`] builds the events and
//! [`MonitorEngine::complete_batch`] records the hand-off result.

use super::engine::{MonitorEngine, ResolvedSettings};
use super::entry::{EntryState, MonitorEntry};
use crate::device_model::DeviceModel;
use crate::domain::{
    event::truncate_actual_value, EventData, EventId, EventTrigger, MonitorId, MonitorKind,
};
use crate::error::SinkError;

use std::time::SystemTime;

/// Events produced by one processing pass
#[derive(Debug, Clone, Default)]
pub struct EventBatch {
    events: Vec<EventData>,
    offline: bool,
    /// Events queued while offline that count as delivered now
    flushed: Vec<EventId>,
}

impl EventBatch {
    /// Newly generated events, to hand to the sink
    pub fn events(&self) -> &[EventData] {
        &self.events
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Whether the station was offline when the batch was built
    pub fn offline(&self) -> bool {
        self.offline
    }
}

/// What a pass does with one entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    /// Leave untouched for a later pass
    Hold,
    /// Drop a pending periodic fire without reporting it
    Discard,
    Emit,
}

impl<M: DeviceModel> MonitorEngine<M> {
    /// Generate and hand off events for settled entries, then run cleanup
    ///
    /// No-op while monitoring is disabled or its settings cannot be read.
    pub fn process(&mut self, allow_periodic: bool, allow_trigger: bool) {
        let Some(batch) = self.prepare_batch(allow_periodic, allow_trigger) else {
            return;
        };
        let result = if batch.is_empty() {
            Ok(())
        } else {
            self.sink.notify(batch.events())
        };
        self.complete_batch(batch, result);
    }

    /// First half of a pass: build events and mark them generated
    pub fn prepare_batch(
        &mut self,
        allow_periodic: bool,
        allow_trigger: bool,
    ) -> Option<EventBatch> {
        let settings = self.settings()?;
        if !settings.enabled {
            log::debug!("Monitoring disabled, skipping processing pass");
            return None;
        }
        let offline = self.connectivity.is_offline();

        let mut batch = EventBatch {
            offline,
            ..EventBatch::default()
        };
        if !offline && self.config().ack_on_handoff {
            batch.flushed = std::mem::take(&mut self.queued_offline);
        }

        let ids: Vec<MonitorId> = self.store.iter().map(MonitorEntry::id).collect();
        for id in ids {
            let Some(entry) = self.store.get(id) else {
                continue;
            };
            match next_action(entry, &settings, offline, allow_periodic, allow_trigger) {
                Action::Hold => {}
                Action::Discard => {
                    if let Some(EntryState::Periodic(periodic)) =
                        self.store.get_mut(id).map(|e| &mut e.state)
                    {
                        periodic.fire_pending = false;
                    }
                }
                Action::Emit => {
                    let event_id = self.mint_event_id();
                    let Some(entry) = self.store.get_mut(id) else {
                        continue;
                    };
                    let event = build_event(entry, event_id);
                    match &mut entry.state {
                        EntryState::Trigger(trigger) => trigger.mark_generated(event_id),
                        EntryState::Periodic(periodic) => periodic.fire_pending = false,
                    }
                    entry.pending_events.push(event.clone());
                    batch.events.push(event);
                }
            }
        }

        if offline && !batch.is_empty() {
            log::info!(
                "Station offline, handing {} event(s) to the queue",
                batch.len()
            );
        }
        Some(batch)
    }

    /// Second half of a pass: apply the sink result and run cleanup
    pub fn complete_batch(&mut self, batch: EventBatch, result: Result<(), SinkError>) {
        let EventBatch {
            events,
            offline,
            flushed,
        } = batch;

        if !flushed.is_empty() {
            log::debug!("Connectivity restored, {} queued event(s) delivered", flushed.len());
            self.confirm_delivery(&flushed);
        }

        match result {
            Ok(()) if self.config().ack_on_handoff => {
                let ids: Vec<EventId> = events.iter().map(|e| e.event_id).collect();
                if offline {
                    self.queued_offline.extend(ids);
                } else {
                    self.confirm_delivery(&ids);
                }
            }
            Ok(()) => {}
            Err(e) => {
                log::error!(
                    "Sink '{}' failed to take {} event(s), regenerating next pass: {}",
                    self.sink.name(),
                    events.len(),
                    e
                );
                self.revert_generated(&events);
            }
        }

        self.cleanup();
    }

    /// Undo generation of events the sink never accepted
    fn revert_generated(&mut self, events: &[EventData]) {
        for event in events {
            let Some(entry) = self.store.get_mut(event.variable_monitoring_id) else {
                continue;
            };
            entry.pending_events.retain(|p| p.event_id != event.event_id);
            match &mut entry.state {
                EntryState::Trigger(trigger) => trigger.revert(event.event_id),
                EntryState::Periodic(periodic) => periodic.fire_pending = true,
            }
        }
    }

    /// Record delivery confirmation for previously handed-off events
    ///
    /// Unknown ids are ignored.
    pub fn confirm_delivery(&mut self, event_ids: &[EventId]) {
        self.queued_offline.retain(|id| !event_ids.contains(id));
        for entry in self.store.iter_mut() {
            let mut confirmed = Vec::new();
            entry.pending_events.retain(|event| {
                if event_ids.contains(&event.event_id) {
                    confirmed.push((event.event_id, event.is_active_report()));
                    false
                } else {
                    true
                }
            });
            if let EntryState::Trigger(trigger) = &mut entry.state {
                for (event_id, active_report) in confirmed {
                    trigger.confirm(event_id, active_report);
                }
            }
        }
    }
}

fn next_action(
    entry: &MonitorEntry,
    settings: &ResolvedSettings,
    offline: bool,
    allow_periodic: bool,
    allow_trigger: bool,
) -> Action {
    let definition = &entry.definition;
    let filtered = !definition.severity.is_at_least(settings.active_level)
        || !settings.active_base.includes(definition.origin);
    let held_offline = offline
        && !settings
            .offline_severity
            .is_some_and(|threshold| definition.severity.is_at_least(threshold));

    match &entry.state {
        EntryState::Periodic(periodic) => {
            if !allow_periodic || !periodic.fire_pending {
                Action::Hold
            } else if filtered || entry.write_only {
                Action::Discard
            } else if held_offline {
                Action::Hold
            } else {
                Action::Emit
            }
        }
        EntryState::Trigger(trigger) => {
            if !allow_trigger || trigger.event_generated() || filtered || entry.write_only {
                return Action::Hold;
            }
            // A clear is only worth reporting if the CSMS saw the activation
            if trigger.is_cleared() && !(trigger.sent_once() || entry.has_pending_active()) {
                return Action::Hold;
            }
            if held_offline {
                Action::Hold
            } else {
                Action::Emit
            }
        }
    }
}

fn build_event(entry: &MonitorEntry, event_id: EventId) -> EventData {
    let definition = &entry.definition;
    let (trigger, cleared) = match (&entry.state, definition.kind) {
        (EntryState::Periodic(_), _) => (EventTrigger::Periodic, None),
        (EntryState::Trigger(_), MonitorKind::Delta) => (EventTrigger::Delta, None),
        (EntryState::Trigger(state), _) => (EventTrigger::Alerting, Some(state.is_cleared())),
    };
    EventData {
        event_id,
        timestamp: SystemTime::now(),
        trigger,
        actual_value: truncate_actual_value(&entry.value_current),
        cleared,
        component: definition.component.clone(),
        variable: definition.variable.clone(),
        variable_monitoring_id: definition.id,
        notification_type: definition.origin.into(),
        severity: definition.severity,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device_model::{InMemoryDeviceModel, MonitoringSettings};
    use crate::domain::{
        DataType, EventNotificationType, MonitorDefinition, MonitorOrigin, MonitoringBase, Mutability, Severity,
        VariableAttribute, VariableCharacteristics,
    };
    use crate::mock::{fixture_engine, fixture_engine_with, fixture_with_link, temperature};
    use std::time::{Duration, Instant};

    fn upper(model: &InMemoryDeviceModel, id: i32, severity: u8) -> MonitorDefinition {
        let (component, variable) = temperature(model);
        MonitorDefinition::new(
            id,
            MonitorKind::UpperThreshold,
            80.0,
            Severity::new(severity).unwrap(),
            component,
            variable,
        )
    }

    fn fire(
        engine: &mut MonitorEngine<InMemoryDeviceModel>,
        monitor: &MonitorDefinition,
        prev: &str,
        cur: &str,
    ) {
        engine.evaluate_monitor(
            monitor,
            &VariableCharacteristics::of(DataType::Decimal),
            &VariableAttribute::actual(Mutability::ReadOnly),
            prev,
            cur,
        );
    }

    #[test]
    fn test_trigger_event_fields() {
        let (model, mut engine, sink) = fixture_engine();
        let monitor = upper(&model, 3, 4).with_origin(MonitorOrigin::HardWired);
        fire(&mut engine, &monitor, "70", "85");

        engine.process_triggered_monitors();
        let events = sink.events();
        assert_eq!(events.len(), 1);
        let event = &events[0];
        assert_eq!(event.trigger, EventTrigger::Alerting);
        assert_eq!(event.cleared, Some(false));
        assert_eq!(event.actual_value, "85");
        assert_eq!(event.variable_monitoring_id, MonitorId::new(3));
        assert_eq!(
            event.notification_type,
            EventNotificationType::HardWiredMonitor
        );
    }

    #[test]
    fn test_generated_once_per_phase() {
        let (model, mut engine, sink) = fixture_engine();
        let monitor = upper(&model, 1, 4);
        fire(&mut engine, &monitor, "70", "85");
        engine.process_triggered_monitors();
        fire(&mut engine, &monitor, "85", "90");
        engine.process_triggered_monitors();
        assert_eq!(sink.events().len(), 1);
    }

    #[test]
    fn test_event_ids_increase() {
        let (model, mut engine, sink) = fixture_engine();
        fire(&mut engine, &upper(&model, 1, 4), "70", "85");
        fire(&mut engine, &upper(&model, 2, 4), "70", "85");
        engine.process_triggered_monitors();
        let ids: Vec<i32> = sink.events().iter().map(|e| e.event_id.get()).collect();
        assert_eq!(ids, vec![0, 1]);
    }

    #[test]
    fn test_ack_on_handoff_confirms() {
        let (model, mut engine, _sink) = fixture_engine();
        fire(&mut engine, &upper(&model, 1, 4), "70", "85");
        engine.process_triggered_monitors();

        let entry = engine.entry(MonitorId::new(1)).unwrap();
        assert!(entry.pending_events.is_empty());
        let state = entry.trigger_state().unwrap();
        assert!(state.sent_current());
        assert!(state.sent_once());
    }

    #[test]
    fn test_sink_failure_regenerates_next_pass() {
        let (model, mut engine, sink) = fixture_engine();
        sink.set_failing(true);
        fire(&mut engine, &upper(&model, 1, 4), "70", "85");
        engine.process_triggered_monitors();

        let entry = engine.entry(MonitorId::new(1)).unwrap();
        assert!(entry.pending_events.is_empty());
        assert!(!entry.trigger_state().unwrap().event_generated());
        assert_eq!(sink.batch_count(), 0);

        sink.set_failing(false);
        engine.process_triggered_monitors();
        let events = sink.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].cleared, Some(false));
        assert!(engine
            .entry(MonitorId::new(1))
            .unwrap()
            .trigger_state()
            .unwrap()
            .sent_current());
    }

    #[test]
    fn test_refused_activation_never_followed_by_clear() {
        let (model, mut engine, sink) = fixture_engine();
        let monitor = upper(&model, 1, 4);
        for _ in 0..5 {
            sink.set_failing(true);
            fire(&mut engine, &monitor, "70", "85");
            engine.process_triggered_monitors();

            sink.set_failing(false);
            fire(&mut engine, &monitor, "85", "60");
            engine.process_triggered_monitors();
        }
        assert_eq!(sink.batch_count(), 0);
        assert_eq!(engine.tracked_count(), 0);
    }

    #[test]
    fn test_refused_periodic_fire_is_kept() {
        let (model, mut engine, sink) = fixture_engine();
        let (component, variable) = temperature(&model);
        model
            .add_monitor(MonitorDefinition::new(
                9,
                MonitorKind::Periodic,
                10.0,
                Severity::new(5).unwrap(),
                component,
                variable,
            ))
            .unwrap();
        let t0 = Instant::now();
        engine.sweep(t0, SystemTime::now());
        engine.sweep(t0 + Duration::from_secs(10), SystemTime::now());

        sink.set_failing(true);
        engine.process(true, true);
        let periodic = *engine.entry(MonitorId::new(9)).unwrap().periodic_state().unwrap();
        assert!(periodic.fire_pending);

        sink.set_failing(false);
        engine.process(true, true);
        assert_eq!(sink.events().len(), 1);
        assert_eq!(sink.events()[0].trigger, EventTrigger::Periodic);
    }

    #[test]
    fn test_each_delta_crossing_reported() {
        let (model, mut engine, sink) = fixture_engine_with(false);
        let (component, variable) = temperature(&model);
        let delta = MonitorDefinition::new(
            4,
            MonitorKind::Delta,
            0.0,
            Severity::new(4).unwrap(),
            component,
            variable,
        );
        let text = VariableCharacteristics::of(DataType::String);
        let attribute = VariableAttribute::actual(Mutability::ReadOnly);

        engine.evaluate_monitor(&delta, &text, &attribute, "a", "b");
        engine.process_triggered_monitors();
        let ids: Vec<EventId> = sink.events().iter().map(|e| e.event_id).collect();
        engine.confirm_delivery(&ids);

        engine.evaluate_monitor(&delta, &text, &attribute, "b", "c");
        engine.process_triggered_monitors();
        let values: Vec<String> = sink.events().into_iter().map(|e| e.actual_value).collect();
        assert_eq!(values, vec!["b", "c"]);
        assert!(sink.events().iter().all(|e| e.trigger == EventTrigger::Delta));
    }

    #[test]
    fn test_delta_crossing_while_pending_reported() {
        let (model, mut engine, sink) = fixture_engine_with(false);
        let (component, variable) = temperature(&model);
        let delta = MonitorDefinition::new(
            4,
            MonitorKind::Delta,
            0.0,
            Severity::new(4).unwrap(),
            component,
            variable,
        );
        let text = VariableCharacteristics::of(DataType::String);
        let attribute = VariableAttribute::actual(Mutability::ReadOnly);

        engine.evaluate_monitor(&delta, &text, &attribute, "a", "b");
        engine.process_triggered_monitors();
        engine.evaluate_monitor(&delta, &text, &attribute, "b", "c");
        engine.process_triggered_monitors();
        assert_eq!(sink.events().len(), 2);
        assert_eq!(engine.entry(MonitorId::new(4)).unwrap().pending_events.len(), 2);

        let ids: Vec<EventId> = sink.events().iter().map(|e| e.event_id).collect();
        engine.confirm_delivery(&ids);
        engine.process_triggered_monitors();
        assert_eq!(engine.tracked_count(), 0);
    }

    #[test]
    fn test_manual_confirmation() {
        let (model, mut engine, sink) = fixture_engine_with(false);
        fire(&mut engine, &upper(&model, 1, 4), "70", "85");
        engine.process_triggered_monitors();
        let state = *engine.entry(MonitorId::new(1)).unwrap().trigger_state().unwrap();
        assert!(!state.sent_current());

        let ids: Vec<EventId> = sink.events().iter().map(|e| e.event_id).collect();
        engine.confirm_delivery(&ids);
        let state = *engine.entry(MonitorId::new(1)).unwrap().trigger_state().unwrap();
        assert!(state.sent_current());
        assert!(state.sent_once());
    }

    #[test]
    fn test_active_level_filters_events() {
        let (model, mut engine, sink) = fixture_engine();
        model.set_settings(MonitoringSettings {
            enabled: Some(true),
            active_level: Some(Severity::new(3).unwrap()),
            ..MonitoringSettings::default()
        });
        fire(&mut engine, &upper(&model, 1, 4), "70", "85");
        fire(&mut engine, &upper(&model, 2, 2), "70", "85");
        engine.process_triggered_monitors();

        let events = sink.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].variable_monitoring_id, MonitorId::new(2));
    }

    #[test]
    fn test_active_base_filters_events() {
        let (model, mut engine, sink) = fixture_engine();
        model.set_settings(MonitoringSettings {
            enabled: Some(true),
            active_base: Some(MonitoringBase::HardWiredOnly),
            ..MonitoringSettings::default()
        });
        fire(&mut engine, &upper(&model, 1, 4), "70", "85");
        fire(
            &mut engine,
            &upper(&model, 2, 4).with_origin(MonitorOrigin::HardWired),
            "70",
            "85",
        );
        engine.process_triggered_monitors();

        let events = sink.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].variable_monitoring_id, MonitorId::new(2));
    }

    #[test]
    fn test_write_only_never_emits() {
        let (model, mut engine, sink) = fixture_engine();
        engine.evaluate_monitor(
            &upper(&model, 1, 4),
            &VariableCharacteristics::of(DataType::Decimal),
            &VariableAttribute::actual(Mutability::WriteOnly),
            "70",
            "85",
        );
        engine.process_triggered_monitors();
        assert_eq!(sink.batch_count(), 0);
        assert!(engine.entry(MonitorId::new(1)).is_some());
    }

    #[test]
    fn test_offline_severity_threshold() {
        let (model, mut engine, sink, link) = fixture_with_link();
        model.set_settings(MonitoringSettings {
            enabled: Some(true),
            offline_severity: Some(Severity::new(2).unwrap()),
            ..MonitoringSettings::default()
        });
        link.set_offline(true);
        fire(&mut engine, &upper(&model, 1, 1), "70", "85");
        fire(&mut engine, &upper(&model, 2, 5), "70", "85");
        engine.process_triggered_monitors();

        let events = sink.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].variable_monitoring_id, MonitorId::new(1));
        // Handed to the queue but not confirmed while offline
        let state = *engine.entry(MonitorId::new(1)).unwrap().trigger_state().unwrap();
        assert!(state.event_generated());
        assert!(!state.sent_current());
        let held = *engine.entry(MonitorId::new(2)).unwrap().trigger_state().unwrap();
        assert!(!held.event_generated());

        // Back online: the queued event counts as delivered, the held one goes out
        link.set_offline(false);
        engine.process_triggered_monitors();
        let state = *engine.entry(MonitorId::new(1)).unwrap().trigger_state().unwrap();
        assert!(state.sent_current());
        assert_eq!(sink.events().len(), 2);
    }

    #[test]
    fn test_periodic_not_emitted_by_trigger_pass() {
        let (model, mut engine, sink) = fixture_engine();
        let (component, variable) = temperature(&model);
        model
            .add_monitor(MonitorDefinition::new(
                9,
                MonitorKind::Periodic,
                10.0,
                Severity::new(5).unwrap(),
                component,
                variable,
            ))
            .unwrap();
        let t0 = Instant::now();
        engine.sweep(t0, SystemTime::now());
        engine.sweep(t0 + Duration::from_secs(10), SystemTime::now());

        engine.process_triggered_monitors();
        assert_eq!(sink.batch_count(), 0);

        engine.process(true, false);
        let events = sink.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].trigger, EventTrigger::Periodic);
        assert_eq!(events[0].cleared, None);
    }
}
