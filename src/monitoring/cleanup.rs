//! Cleanup policy
//!
//! Decides when a bookkeeping entry is settled and can be forgotten. The
//! persisted monitor definition is never touched.

use super::entry::{EntryState, MonitorEntry};
use crate::domain::MonitorKind;

/// Whether the entry has nothing left to report or track
///
/// A trigger entry whose CSMS-visible "active" state has not been superseded
/// by a delivered clear event is always kept.
pub fn should_remove(entry: &MonitorEntry) -> bool {
    match &entry.state {
        EntryState::Periodic(periodic) => periodic.orphaned,
        EntryState::Trigger(trigger) => {
            if !entry.pending_events.is_empty() {
                return false;
            }
            if entry.definition.kind == MonitorKind::Delta {
                return trigger.sent_current() || entry.write_only;
            }
            trigger.is_cleared() && (!trigger.sent_once() || trigger.sent_current())
        }
    }
}
