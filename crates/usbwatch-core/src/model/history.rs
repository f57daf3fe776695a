// ── Lifecycle history types ──

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::device::DeviceRecord;

/// Kind of lifecycle transition recorded in history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum EventType {
    Connect,
    Disconnect,
}

/// Immutable record of one transition. `device` is a copy taken at the
/// moment of the transition, never a live reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub entry_id: Uuid,
    pub device_id: String,
    pub device: DeviceRecord,
    pub event_type: EventType,
    pub timestamp: DateTime<Utc>,
}

impl HistoryEntry {
    pub fn new(event_type: EventType, device: &DeviceRecord, timestamp: DateTime<Utc>) -> Self {
        Self {
            entry_id: Uuid::new_v4(),
            device_id: device.id.clone(),
            device: device.clone(),
            event_type,
            timestamp,
        }
    }
}
