// ── Event bus payloads ──

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::device::DeviceRecord;
use super::history::EventType;

/// Kind of notification published on the event bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "camelCase")]
#[strum(serialize_all = "camelCase")]
pub enum DeviceEventKind {
    DeviceConnected,
    DeviceDisconnected,
}

impl From<EventType> for DeviceEventKind {
    fn from(value: EventType) -> Self {
        match value {
            EventType::Connect => Self::DeviceConnected,
            EventType::Disconnect => Self::DeviceDisconnected,
        }
    }
}

/// One lifecycle notification for downstream transports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceEvent {
    pub kind: DeviceEventKind,
    pub device: DeviceRecord,
    pub timestamp: DateTime<Utc>,
}
