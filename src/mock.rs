//! Mock implementations for testing
//!
//! Recording sink, a switchable connectivity oracle and engine fixtures
//! built on the in-memory device model.

use crate::device_model::{ConnectivityStatus, InMemoryDeviceModel};
use crate::domain::{Component, DataType, EventData, Mutability, Variable, VariableCharacteristics};
use crate::error::SinkError;
use crate::monitoring::{EngineConfig, EventSink, MonitorEngine};

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

/// Sink that keeps every accepted batch
#[derive(Debug, Default)]
pub struct RecordingSink {
    batches: Mutex<Vec<Vec<EventData>>>,
    failing: AtomicBool,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent hand-offs fail
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// All accepted events, in hand-off order
    pub fn events(&self) -> Vec<EventData> {
        self.batches.lock().unwrap().iter().flatten().cloned().collect()
    }

    /// Number of accepted batches
    pub fn batch_count(&self) -> usize {
        self.batches.lock().unwrap().len()
    }
}

impl EventSink for RecordingSink {
    fn notify(&self, events: &[EventData]) -> Result<(), SinkError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(SinkError::Rejected {
                count: events.len(),
                reason: "mock failure".to_string(),
            });
        }
        self.batches.lock().unwrap().push(events.to_vec());
        Ok(())
    }

    fn name(&self) -> &str {
        "recording"
    }
}

/// Connectivity oracle flipped by the test
#[derive(Debug, Default)]
pub struct OfflineSwitch {
    offline: AtomicBool,
}

impl OfflineSwitch {
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }
}

impl ConnectivityStatus for OfflineSwitch {
    fn is_offline(&self) -> bool {
        self.offline.load(Ordering::SeqCst)
    }
}

/// The EVSE temperature variable, registered at "20" on first use
pub fn temperature(model: &InMemoryDeviceModel) -> (Component, Variable) {
    if let Some(found) = model.find_variable("EVSE", "Temperature") {
        return found;
    }
    let component = Component::new("EVSE").with_evse(1, None);
    let variable = Variable::new("Temperature");
    model.add_variable(
        component.clone(),
        variable.clone(),
        VariableCharacteristics::of(DataType::Decimal),
        Mutability::ReadOnly,
        Some("20".to_string()),
    );
    (component, variable)
}

/// Engine over an enabled in-memory model, with a switchable link
pub fn fixture_with_link() -> (
    Arc<InMemoryDeviceModel>,
    MonitorEngine<InMemoryDeviceModel>,
    Arc<RecordingSink>,
    Arc<OfflineSwitch>,
) {
    build(EngineConfig::default())
}

/// Engine over an enabled in-memory model, always online
pub fn fixture_engine() -> (
    Arc<InMemoryDeviceModel>,
    MonitorEngine<InMemoryDeviceModel>,
    Arc<RecordingSink>,
) {
    fixture_engine_with(true)
}

/// Same as [`fixture_engine`] with an explicit hand-off policy
pub fn fixture_engine_with(
    ack_on_handoff: bool,
) -> (
    Arc<InMemoryDeviceModel>,
    MonitorEngine<InMemoryDeviceModel>,
    Arc<RecordingSink>,
) {
    let (model, engine, sink, _link) = build(EngineConfig { ack_on_handoff });
    (model, engine, sink)
}

fn build(
    config: EngineConfig,
) -> (
    Arc<InMemoryDeviceModel>,
    MonitorEngine<InMemoryDeviceModel>,
    Arc<RecordingSink>,
    Arc<OfflineSwitch>,
) {
    let model = Arc::new(InMemoryDeviceModel::default());
    temperature(&model);
    let sink = Arc::new(RecordingSink::new());
    let link = Arc::new(OfflineSwitch::default());
    let engine = MonitorEngine::new(
        Arc::clone(&model),
        Arc::clone(&sink) as Arc<dyn EventSink>,
        Arc::clone(&link) as Arc<dyn ConnectivityStatus>,
        config,
    );
    (model, engine, sink, link)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_sink_failure_toggle() {
        let sink = RecordingSink::new();
        sink.set_failing(true);
        assert!(sink.notify(&[]).is_err());
        sink.set_failing(false);
        assert!(sink.notify(&[]).is_ok());
        assert_eq!(sink.batch_count(), 1);
    }

    #[test]
    fn test_offline_switch() {
        let link = OfflineSwitch::default();
        assert!(!link.is_offline());
        link.set_offline(true);
        assert!(link.is_offline());
    }
}
