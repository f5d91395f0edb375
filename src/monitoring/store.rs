//! Monitor metadata store
//!
//! Ordered map from monitor id to its bookkeeping entry. Owned exclusively by
//! the engine; iteration order is ascending monitor id.

use super::entry::MonitorEntry;
use crate::domain::MonitorId;
use std::collections::BTreeMap;

#[derive(Debug, Default)]
pub struct MetadataStore {
    entries: BTreeMap<MonitorId, MonitorEntry>,
}

impl MetadataStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: MonitorId) -> Option<&MonitorEntry> {
        self.entries.get(&id)
    }

    pub fn get_mut(&mut self, id: MonitorId) -> Option<&mut MonitorEntry> {
        self.entries.get_mut(&id)
    }

    /// Insert or replace the entry for its monitor id
    pub fn insert(&mut self, entry: MonitorEntry) {
        self.entries.insert(entry.id(), entry);
    }

    pub fn remove(&mut self, id: MonitorId) -> Option<MonitorEntry> {
        self.entries.remove(&id)
    }

    /// Keep only entries for which `keep` returns true; returns removed ids
    pub fn retain<F>(&mut self, mut keep: F) -> Vec<MonitorId>
    where
        F: FnMut(&MonitorEntry) -> bool,
    {
        let mut removed = Vec::new();
        self.entries.retain(|id, entry| {
            let kept = keep(entry);
            if !kept {
                removed.push(*id);
            }
            kept
        });
        removed
    }

    pub fn iter(&self) -> impl Iterator<Item = &MonitorEntry> {
        self.entries.values()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut MonitorEntry> {
        self.entries.values_mut()
    }

    /// Ids of periodic entries, rotated to start after `cursor`
    pub fn periodic_ids_after(&self, cursor: Option<MonitorId>) -> Vec<MonitorId> {
        let ids: Vec<MonitorId> = self
            .entries
            .values()
            .filter(|e| e.is_periodic())
            .map(MonitorEntry::id)
            .collect();
        match cursor {
            Some(cursor) => {
                let split = ids.partition_point(|id| *id <= cursor);
                ids[split..].iter().chain(&ids[..split]).copied().collect()
            }
            None => ids,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
