//! Monitor update engine
//!
//! Owns the metadata store and drives the trigger, periodic, emission and
//! cleanup steps. All entry points take `&mut self`; callers serialize them.

use super::entry::MonitorEntry;
use super::sink::EventSink;
use super::store::MetadataStore;
use crate::device_model::{ConnectivityStatus, DeviceModel, MonitoringSettings};
use crate::domain::{EventId, MonitorId, MonitoringBase, Severity};

use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime};

/// Engine configuration
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Treat a successful sink hand-off as delivery confirmation
    pub ack_on_handoff: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            ack_on_handoff: true,
        }
    }
}

/// Monitoring settings with defaults applied
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ResolvedSettings {
    pub enabled: bool,
    pub offline_severity: Option<Severity>,
    pub active_level: Severity,
    pub active_base: MonitoringBase,
    pub process_time: Option<Duration>,
}

impl From<MonitoringSettings> for ResolvedSettings {
    fn from(settings: MonitoringSettings) -> Self {
        Self {
            enabled: settings.enabled.unwrap_or(false),
            offline_severity: settings.offline_severity,
            active_level: settings.active_level.unwrap_or(Severity::DEBUG),
            active_base: settings.active_base.unwrap_or_default(),
            process_time: settings.process_time,
        }
    }
}

/// Variable monitoring engine
pub struct MonitorEngine<M: DeviceModel> {
    pub(crate) device_model: Arc<M>,
    pub(crate) sink: Arc<dyn EventSink>,
    pub(crate) connectivity: Arc<dyn ConnectivityStatus>,
    pub(crate) store: MetadataStore,
    pub(crate) sweep_cursor: Option<MonitorId>,
    /// Events handed off while offline, confirmed once connectivity returns
    pub(crate) queued_offline: Vec<EventId>,
    next_event_id: i32,
    config: EngineConfig,
}

impl<M: DeviceModel> MonitorEngine<M> {
    /// Create a new engine
    pub fn new(
        device_model: Arc<M>,
        sink: Arc<dyn EventSink>,
        connectivity: Arc<dyn ConnectivityStatus>,
        config: EngineConfig,
    ) -> Self {
        Self {
            device_model,
            sink,
            connectivity,
            store: MetadataStore::new(),
            sweep_cursor: None,
            queued_offline: Vec::new(),
            next_event_id: 0,
            config,
        }
    }

    /// Tracked entry for a monitor id
    pub fn entry(&self, id: MonitorId) -> Option<&MonitorEntry> {
        self.store.get(id)
    }

    /// All tracked entries, ascending by id
    pub fn entries(&self) -> impl Iterator<Item = &MonitorEntry> {
        self.store.iter()
    }

    /// Number of tracked entries
    pub fn tracked_count(&self) -> usize {
        self.store.len()
    }

    /// Shared handle to the sink
    pub fn sink(&self) -> Arc<dyn EventSink> {
        Arc::clone(&self.sink)
    }

    /// Get the engine configuration
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Periodic sweep followed by a full processing pass
    pub fn tick(&mut self, now: Instant, now_wall: SystemTime) {
        self.sweep(now, now_wall);
        self.process(true, true);
    }

    /// Report trigger monitors now that the caller's operation settled
    pub fn process_triggered_monitors(&mut self) {
        self.process(false, true);
    }

    pub(crate) fn settings(&self) -> Option<ResolvedSettings> {
        match self.device_model.monitoring_settings() {
            Ok(settings) => Some(settings.into()),
            Err(e) => {
                log::warn!("Monitoring settings unavailable, skipping pass: {}", e);
                None
            }
        }
    }

    pub(crate) fn mint_event_id(&mut self) -> EventId {
        let id = EventId::new(self.next_event_id);
        self.next_event_id = self.next_event_id.wrapping_add(1);
        id
    }

    /// Remove every entry the cleanup policy marks as settled
    pub(crate) fn cleanup(&mut self) {
        let removed = self.store.retain(|entry| !super::cleanup::should_remove(entry));
        for id in removed {
            log::debug!("Monitor {} settled, forgetting entry", id);
        }
    }
}
