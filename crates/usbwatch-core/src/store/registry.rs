// ── Live device registry ──
//
// Concurrent map of tracked devices keyed by id, with push-based change
// notification via a `watch` channel. Only the lifecycle engine mutates it.

use std::cmp::Ordering;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tokio::sync::watch;

use crate::lifecycle::Transition;
use crate::model::{DeviceRecord, DeviceStatus};
use crate::stream::DeviceStream;

type Snapshot = Arc<Vec<Arc<DeviceRecord>>>;

/// Exactly one record per id. Readers always receive copies.
pub struct DeviceRegistry {
    by_id: DashMap<String, Arc<DeviceRecord>>,

    /// Version counter, bumped on every mutation.
    version: watch::Sender<u64>,

    /// Ordered snapshot, rebuilt on mutation for subscribers.
    snapshot: watch::Sender<Snapshot>,
}

impl DeviceRegistry {
    pub fn new() -> Self {
        let (version, _) = watch::channel(0u64);
        let (snapshot, _) = watch::channel(Arc::new(Vec::new()));

        Self {
            by_id: DashMap::new(),
            version,
            snapshot,
        }
    }

    /// Apply lifecycle transitions in order. Each transition carries the
    /// full post-transition record.
    pub(crate) fn apply(&self, transitions: &[Transition]) {
        if transitions.is_empty() {
            return;
        }
        for transition in transitions {
            let record = transition.device();
            self.by_id
                .insert(record.id.clone(), Arc::new(record.clone()));
        }
        self.publish();
    }

    /// Refresh `last_seen` for ids still present in the latest snapshot.
    /// Not a lifecycle change: subscribers are not notified.
    pub(crate) fn touch(&self, ids: &[String], seen_at: DateTime<Utc>) {
        for id in ids {
            if let Some(mut entry) = self.by_id.get_mut(id) {
                Arc::make_mut(entry.value_mut()).last_seen = Some(seen_at);
            }
        }
    }

    /// Drop a record whose grace period elapsed. Records that became
    /// attached again in the meantime are kept.
    pub(crate) fn evict(&self, id: &str) -> bool {
        let removed = self
            .by_id
            .remove_if(id, |_, record| record.status == DeviceStatus::Disconnected)
            .is_some();
        if removed {
            self.publish();
        }
        removed
    }

    /// Forget every live record.
    pub(crate) fn clear(&self) {
        if self.by_id.is_empty() {
            return;
        }
        self.by_id.clear();
        self.publish();
    }

    pub fn get(&self, id: &str) -> Option<DeviceRecord> {
        self.by_id.get(id).map(|r| DeviceRecord::clone(r.value()))
    }

    /// Copy of the live set, ordered by connection time then id.
    pub fn snapshot(&self) -> Vec<DeviceRecord> {
        let mut records: Vec<DeviceRecord> = self
            .by_id
            .iter()
            .map(|r| DeviceRecord::clone(r.value()))
            .collect();
        records.sort_by(|a, b| by_connection(a, b));
        records
    }

    /// Subscribe to live-set changes.
    pub fn subscribe(&self) -> DeviceStream {
        DeviceStream::new(self.snapshot.subscribe())
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    pub fn version(&self) -> u64 {
        *self.version.borrow()
    }

    // ── Private helpers ──────────────────────────────────────────────

    fn publish(&self) {
        let mut values: Vec<Arc<DeviceRecord>> =
            self.by_id.iter().map(|r| Arc::clone(r.value())).collect();
        values.sort_by(|a, b| by_connection(a, b));
        // `send_modify` updates unconditionally, even with zero receivers.
        self.snapshot.send_modify(|snap| *snap = Arc::new(values));
        self.version.send_modify(|v| *v += 1);
    }
}

fn by_connection(a: &DeviceRecord, b: &DeviceRecord) -> Ordering {
    a.connected_at
        .cmp(&b.connected_at)
        .then_with(|| a.id.cmp(&b.id))
}

impl Default for DeviceRegistry {
    fn default() -> Self {
        Self::new()
    }
}
