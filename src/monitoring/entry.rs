//! Monitor bookkeeping entries
//!
//! One entry per tracked monitor id. Trigger entries carry a small state
//! machine; periodic entries carry their schedule.

use crate::domain::{EventData, EventId, MonitorDefinition, MonitorId, MonitorKind};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

/// Condition state of a trigger monitor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerPhase {
    /// Condition satisfied
    Active,
    /// Condition no longer satisfied
    Cleared,
}

/// Reporting progress for the current phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportState {
    /// No event produced for the current phase yet
    Unreported,
    /// Event produced and handed off, awaiting confirmation
    Generated(EventId),
    /// Event for the current phase confirmed delivered
    Delivered,
}

/// Trigger sub-state
///
/// `Active -> Cleared` flips reset the report state in the same call; the
/// only way to reach `Delivered` is a confirmation of the current event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TriggerState {
    phase: TriggerPhase,
    report: ReportState,
    sent_once: bool,
}

impl TriggerState {
    /// Fresh state in the given phase
    pub fn new(phase: TriggerPhase) -> Self {
        Self {
            phase,
            report: ReportState::Unreported,
            sent_once: false,
        }
    }

    pub fn phase(&self) -> TriggerPhase {
        self.phase
    }

    pub fn report(&self) -> ReportState {
        self.report
    }

    pub fn is_cleared(&self) -> bool {
        self.phase == TriggerPhase::Cleared
    }

    /// An event exists for the current phase
    pub fn event_generated(&self) -> bool {
        self.report != ReportState::Unreported
    }

    /// The event for the current phase was confirmed delivered
    pub fn sent_current(&self) -> bool {
        self.report == ReportState::Delivered
    }

    /// An "active" event was confirmed delivered at least once
    pub fn sent_once(&self) -> bool {
        self.sent_once
    }

    /// Move to the given clear state; returns whether the phase flipped
    pub fn set_cleared(&mut self, cleared: bool) -> bool {
        let phase = if cleared {
            TriggerPhase::Cleared
        } else {
            TriggerPhase::Active
        };
        if phase == self.phase {
            return false;
        }
        self.phase = phase;
        self.report = ReportState::Unreported;
        true
    }

    /// Record that `event_id` reports the current phase
    pub fn mark_generated(&mut self, event_id: EventId) {
        self.report = ReportState::Generated(event_id);
    }

    /// Ask for a fresh report of the current phase; returns whether one was
    /// already generated or delivered
    pub fn rearm(&mut self) -> bool {
        if self.report == ReportState::Unreported {
            return false;
        }
        self.report = ReportState::Unreported;
        true
    }

    /// Forget `event_id` after the sink refused it
    pub fn revert(&mut self, event_id: EventId) {
        if self.report == ReportState::Generated(event_id) {
            self.report = ReportState::Unreported;
        }
    }

    /// Record delivery of an event previously generated for this entry
    pub fn confirm(&mut self, event_id: EventId, active_report: bool) {
        if active_report {
            self.sent_once = true;
        }
        if self.report == ReportState::Generated(event_id) {
            self.report = ReportState::Delivered;
        }
    }
}

/// Periodic sub-state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeriodicState {
    /// Monotonic time of the last fire (or of tracking start)
    pub last_evaluated: Instant,
    /// Next wall-clock boundary, clock-aligned monitors only
    pub next_aligned: Option<SystemTime>,
    /// A fire happened that has not been turned into an event yet
    pub fire_pending: bool,
    /// The definition disappeared from the device model
    pub orphaned: bool,
}

impl PeriodicState {
    /// Schedule for a monitor first seen at the given instants
    pub fn start(definition: &MonitorDefinition, now: Instant, now_wall: SystemTime) -> Self {
        let next_aligned = match (definition.kind, definition.interval()) {
            (MonitorKind::PeriodicClockAligned, Some(interval)) => {
                Some(align_up(now_wall, interval))
            }
            _ => None,
        };
        Self {
            last_evaluated: now,
            next_aligned,
            fire_pending: false,
            orphaned: false,
        }
    }
}

/// Kind-specific part of an entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryState {
    Trigger(TriggerState),
    Periodic(PeriodicState),
}

/// Bookkeeping unit for one monitor id
#[derive(Debug, Clone)]
pub struct MonitorEntry {
    /// Snapshot of the definition last seen
    pub definition: MonitorDefinition,
    /// Write-only attributes are evaluated but never reported
    pub write_only: bool,
    pub value_previous: String,
    pub value_current: String,
    /// Events handed to the sink and not yet confirmed
    pub pending_events: Vec<EventData>,
    pub state: EntryState,
}

impl MonitorEntry {
    /// New trigger entry in the active phase
    pub fn trigger(
        definition: MonitorDefinition,
        write_only: bool,
        value_previous: &str,
        value_current: &str,
    ) -> Self {
        Self {
            definition,
            write_only,
            value_previous: value_previous.to_string(),
            value_current: value_current.to_string(),
            pending_events: Vec::new(),
            state: EntryState::Trigger(TriggerState::new(TriggerPhase::Active)),
        }
    }

    /// New periodic entry
    pub fn periodic(definition: MonitorDefinition, now: Instant, now_wall: SystemTime) -> Self {
        let state = PeriodicState::start(&definition, now, now_wall);
        Self {
            definition,
            write_only: false,
            value_previous: String::new(),
            value_current: String::new(),
            pending_events: Vec::new(),
            state: EntryState::Periodic(state),
        }
    }

    pub fn id(&self) -> MonitorId {
        self.definition.id
    }

    pub fn is_trigger(&self) -> bool {
        matches!(self.state, EntryState::Trigger(_))
    }

    pub fn is_periodic(&self) -> bool {
        matches!(self.state, EntryState::Periodic(_))
    }

    pub fn trigger_state(&self) -> Option<&TriggerState> {
        match &self.state {
            EntryState::Trigger(t) => Some(t),
            EntryState::Periodic(_) => None,
        }
    }

    pub fn periodic_state(&self) -> Option<&PeriodicState> {
        match &self.state {
            EntryState::Periodic(p) => Some(p),
            EntryState::Trigger(_) => None,
        }
    }

    /// Flip the clear state of a trigger entry
    ///
    /// # Panics
    ///
    /// Panics when called on a periodic entry.
    pub fn set_trigger_clear_state(&mut self, cleared: bool) -> bool {
        match &mut self.state {
            EntryState::Trigger(t) => t.set_cleared(cleared),
            EntryState::Periodic(_) => panic!(
                "clear state used on periodic monitor {}",
                self.definition.id
            ),
        }
    }

    /// Record a new observed value pair
    pub fn record_values(&mut self, previous: &str, current: &str) {
        self.value_previous = previous.to_string();
        self.value_current = current.to_string();
    }

    /// Shift in a freshly read value
    pub fn push_value(&mut self, current: String) {
        self.value_previous = std::mem::replace(&mut self.value_current, current);
    }

    /// Whether an unconfirmed "active" event is in flight
    pub fn has_pending_active(&self) -> bool {
        self.pending_events.iter().any(EventData::is_active_report)
    }
}

/// First wall-clock boundary at or after `now` on the `interval` grid
pub(crate) fn align_up(now: SystemTime, interval: Duration) -> SystemTime {
    let step = interval.as_nanos().max(1);
    let since = now
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    let rem = since % step;
    let aligned = if rem == 0 { since } else { since - rem + step };
    UNIX_EPOCH + nanos_to_duration(aligned)
}

/// Next boundary strictly after `now`, stepping from `previous` on its grid
pub(crate) fn advance_aligned(
    previous: SystemTime,
    interval: Duration,
    now: SystemTime,
) -> SystemTime {
    let step = interval.as_nanos().max(1);
    let behind = now
        .duration_since(previous)
        .map(|d| d.as_nanos())
        .unwrap_or(0);
    let steps = behind / step + 1;
    previous + nanos_to_duration(step * steps)
}

fn nanos_to_duration(nanos: u128) -> Duration {
    const NANOS_PER_SEC: u128 = 1_000_000_000;
    let secs = (nanos / NANOS_PER_SEC).min(u64::MAX as u128) as u64;
    Duration::new(secs, (nanos % NANOS_PER_SEC) as u32)
}
