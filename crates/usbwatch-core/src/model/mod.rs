// ── Domain model ──
//
// Canonical types shared by every substrate, the lifecycle engine,
// and external consumers.

pub mod device;
pub mod event;
pub mod history;
pub mod strategy;

use serde::{Deserialize, Serialize};

pub use device::{BusLocation, DeviceRecord, DeviceStatus, UNKNOWN};
pub use event::{DeviceEvent, DeviceEventKind};
pub use history::{EventType, HistoryEntry};
pub use strategy::{DetectionStrategy, SubstrateAvailability};

/// Point-in-time summary returned by `Monitor::status()`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitorStatus {
    pub monitoring_active: bool,
    pub strategy: DetectionStrategy,
    pub device_count: usize,
    pub history_count: usize,
    pub substrate_availability: SubstrateAvailability,
    pub uptime_secs: u64,
}
