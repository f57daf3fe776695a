// ── Snapshot diff ──

use std::collections::{HashMap, HashSet};

use crate::model::{DeviceRecord, DeviceStatus};

/// Id-level comparison of the live set against a fresh snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SnapshotDiff {
    /// In the snapshot, not in the live set.
    pub added: Vec<DeviceRecord>,
    /// Attached in the live set, missing from the snapshot.
    pub removed: Vec<String>,
    /// In the snapshot while their live record is still waiting out the
    /// grace period.
    pub reconnected: Vec<DeviceRecord>,
    /// Attached in both.
    pub retained: Vec<String>,
}

impl SnapshotDiff {
    /// No lifecycle transition would result.
    pub fn is_quiet(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.reconnected.is_empty()
    }
}

/// Compare two device sets by id.
///
/// Duplicate ids within `snapshot` are collapsed to their first
/// occurrence. Live records already disconnected never appear in
/// `removed`, so a poll racing the grace timer cannot produce a second
/// disconnect.
pub fn compute_diff(live: &[DeviceRecord], snapshot: &[DeviceRecord]) -> SnapshotDiff {
    let live_by_id: HashMap<&str, &DeviceRecord> =
        live.iter().map(|record| (record.id.as_str(), record)).collect();

    let mut diff = SnapshotDiff::default();
    let mut seen: HashSet<&str> = HashSet::with_capacity(snapshot.len());

    for record in snapshot {
        if !seen.insert(record.id.as_str()) {
            continue;
        }
        match live_by_id.get(record.id.as_str()) {
            None => diff.added.push(record.clone()),
            Some(stored) if stored.status == DeviceStatus::Disconnected => {
                diff.reconnected.push(record.clone());
            }
            Some(_) => diff.retained.push(record.id.clone()),
        }
    }

    diff.removed = live
        .iter()
        .filter(|stored| stored.status.is_attached() && !seen.contains(stored.id.as_str()))
        .map(|stored| stored.id.clone())
        .collect();

    diff
}
