// ── Device domain types ──

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Placeholder for manufacturer/product strings the substrate could not supply.
pub const UNKNOWN: &str = "Unknown";

/// Lifecycle status of a tracked device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceStatus {
    Connected,
    Disconnected,
    /// Attached, but its descriptors could not be read.
    Error,
}

impl DeviceStatus {
    /// Attached to the host (possibly with degraded metadata).
    pub fn is_attached(self) -> bool {
        matches!(self, Self::Connected | Self::Error)
    }
}

impl fmt::Display for DeviceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Connected => "connected",
            Self::Disconnected => "disconnected",
            Self::Error => "error",
        };
        f.write_str(s)
    }
}

/// Physical position of a device on the host's USB topology.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BusLocation {
    pub bus_number: u8,
    pub device_address: u8,
}

impl BusLocation {
    pub fn new(bus_number: u8, device_address: u8) -> Self {
        Self {
            bus_number,
            device_address,
        }
    }
}

impl fmt::Display for BusLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:03}-{:03}", self.bus_number, self.device_address)
    }
}

/// The canonical record every substrate converges to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceRecord {
    pub id: String,
    pub vendor_id: u16,
    pub product_id: u16,
    pub serial_number: Option<String>,
    pub manufacturer: String,
    pub product_name: String,
    pub status: DeviceStatus,
    pub connected_at: Option<DateTime<Utc>>,
    pub disconnected_at: Option<DateTime<Utc>>,
    pub last_seen: Option<DateTime<Utc>>,
    pub bus_location: Option<BusLocation>,
}

impl DeviceRecord {
    /// Build a freshly detected, connected record. The id is derived from
    /// the identity fields.
    pub fn detected(
        vendor_id: u16,
        product_id: u16,
        serial_number: Option<String>,
        bus_location: Option<BusLocation>,
    ) -> Self {
        let mut record = Self {
            id: String::new(),
            vendor_id,
            product_id,
            serial_number,
            manufacturer: UNKNOWN.into(),
            product_name: UNKNOWN.into(),
            status: DeviceStatus::Connected,
            connected_at: None,
            disconnected_at: None,
            last_seen: None,
            bus_location,
        };
        record.normalize();
        record
    }

    pub fn with_manufacturer(mut self, manufacturer: impl Into<String>) -> Self {
        self.manufacturer = manufacturer.into();
        self.normalize();
        self
    }

    pub fn with_product_name(mut self, product_name: impl Into<String>) -> Self {
        self.product_name = product_name.into();
        self.normalize();
        self
    }

    /// Stable identifier for one physical device instance.
    ///
    /// A serial number wins over the bus location; the bus location is
    /// only consulted to tell apart devices that share vendor/product ids
    /// and expose no serial.
    pub fn generate_id(
        vendor_id: u16,
        product_id: u16,
        serial_number: Option<&str>,
        bus_location: Option<BusLocation>,
    ) -> String {
        let serial = serial_number.map(str::trim).filter(|s| !s.is_empty());
        match (serial, bus_location) {
            (Some(serial), _) => format!("{vendor_id:04x}:{product_id:04x}:{serial}"),
            (None, Some(loc)) => format!("{vendor_id:04x}:{product_id:04x}@{loc}"),
            (None, None) => format!("{vendor_id:04x}:{product_id:04x}"),
        }
    }

    /// Clean up substrate output before it enters the registry.
    pub fn normalize(&mut self) {
        self.serial_number = self
            .serial_number
            .take()
            .map(|s| s.trim().to_owned())
            .filter(|s| !s.is_empty());
        self.manufacturer = normalize_label(&self.manufacturer);
        self.product_name = normalize_label(&self.product_name);
        if self.id.trim().is_empty() {
            self.id = Self::generate_id(
                self.vendor_id,
                self.product_id,
                self.serial_number.as_deref(),
                self.bus_location,
            );
        }
    }

    /// `vvvv:pppp` form used in logs and tables.
    pub fn usb_id(&self) -> String {
        format!("{:04x}:{:04x}", self.vendor_id, self.product_id)
    }
}

fn normalize_label(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        UNKNOWN.to_owned()
    } else {
        trimmed.to_owned()
    }
}

impl fmt::Display for DeviceRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}] {}", self.product_name, self.usb_id(), self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generate_id_is_deterministic() {
        let a = DeviceRecord::generate_id(0x0951, 0x1666, Some("001A4D5E"), None);
        let b = DeviceRecord::generate_id(0x0951, 0x1666, Some("001A4D5E"), None);
        assert_eq!(a, b);
        assert_eq!(a, "0951:1666:001A4D5E");
    }

    #[test]
    fn generate_id_differs_per_component() {
        let base = DeviceRecord::generate_id(0x0951, 0x1666, Some("A"), None);
        assert_ne!(base, DeviceRecord::generate_id(0x0952, 0x1666, Some("A"), None));
        assert_ne!(base, DeviceRecord::generate_id(0x0951, 0x1667, Some("A"), None));
        assert_ne!(base, DeviceRecord::generate_id(0x0951, 0x1666, Some("B"), None));
    }

    #[test]
    fn generate_id_falls_back_to_bus_location() {
        let loc = BusLocation::new(1, 4);
        let id = DeviceRecord::generate_id(0x046d, 0xc52b, None, Some(loc));
        assert_eq!(id, "046d:c52b@001-004");

        let blank_serial = DeviceRecord::generate_id(0x046d, 0xc52b, Some("  "), Some(loc));
        assert_eq!(blank_serial, id);
    }

    #[test]
    fn normalize_fills_unknown_labels() {
        let record = DeviceRecord::detected(0x1234, 0x5678, Some(" ".into()), None)
            .with_product_name("  ");
        assert_eq!(record.manufacturer, UNKNOWN);
        assert_eq!(record.product_name, UNKNOWN);
        assert!(record.serial_number.is_none());
        assert_eq!(record.id, "1234:5678");
        assert_eq!(record.status, DeviceStatus::Connected);
    }

    #[test]
    fn error_status_counts_as_attached() {
        assert!(DeviceStatus::Error.is_attached());
        assert!(DeviceStatus::Connected.is_attached());
        assert!(!DeviceStatus::Disconnected.is_attached());
    }
}
