// ── `lsusb` output grammar ──

use std::sync::LazyLock;

use regex::Regex;
use tracing::trace;

use crate::model::{BusLocation, DeviceRecord};

static LSUSB_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^Bus (\d+) Device (\d+): ID ([0-9a-fA-F]{4}):([0-9a-fA-F]{4})\s*(.*)$")
        .expect("lsusb line pattern is valid")
});

/// Parse `lsusb` output, one device per matching line.
///
/// Lines that do not match `Bus <bus> Device <addr>: ID <vid>:<pid> <description>`
/// are skipped. lsusb exposes no serial numbers, so identity falls back to
/// the bus location.
pub fn parse_linux_lsusb(text: &str) -> Vec<DeviceRecord> {
    text.lines()
        .filter_map(|line| {
            let parsed = parse_line(line.trim());
            if parsed.is_none() && !line.trim().is_empty() {
                trace!(line, "skipping non-device lsusb line");
            }
            parsed
        })
        .collect()
}

fn parse_line(line: &str) -> Option<DeviceRecord> {
    let caps = LSUSB_LINE.captures(line)?;
    let bus: u8 = caps[1].parse().ok()?;
    let address: u8 = caps[2].parse().ok()?;
    let vendor_id = u16::from_str_radix(&caps[3], 16).ok()?;
    let product_id = u16::from_str_radix(&caps[4], 16).ok()?;
    let description = caps.get(5).map_or("", |m| m.as_str());

    Some(
        DeviceRecord::detected(
            vendor_id,
            product_id,
            None,
            Some(BusLocation::new(bus, address)),
        )
        .with_product_name(description),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{DeviceStatus, UNKNOWN};
    use pretty_assertions::assert_eq;

    const FIXTURE: &str = "\
Bus 002 Device 001: ID 1d6b:0003 Linux Foundation 3.0 root hub
Bus 001 Device 004: ID 046d:c52b Logitech USB Receiver
Bus 001 Device 003: ID 0951:1666 Kingston Technology DataTraveler 100 G3/G4/SE9 G2/50
Couldn't open device, some information will be missing
Bus 001 Device 001: ID 1d6b:0002 Linux Foundation 2.0 root hub
";

    #[test]
    fn parses_matching_lines_and_skips_noise() {
        let devices = parse_linux_lsusb(FIXTURE);
        assert_eq!(devices.len(), 4);

        let receiver = &devices[1];
        assert_eq!(receiver.vendor_id, 0x046d);
        assert_eq!(receiver.product_id, 0xc52b);
        assert_eq!(receiver.product_name, "Logitech USB Receiver");
        assert_eq!(receiver.manufacturer, UNKNOWN);
        assert_eq!(receiver.status, DeviceStatus::Connected);
        assert_eq!(receiver.bus_location, Some(BusLocation::new(1, 4)));
        assert_eq!(receiver.id, "046d:c52b@001-004");
    }

    #[test]
    fn same_model_on_different_ports_gets_distinct_ids() {
        let text = "\
Bus 001 Device 005: ID 0781:5581 SanDisk Ultra
Bus 001 Device 006: ID 0781:5581 SanDisk Ultra
";
        let devices = parse_linux_lsusb(text);
        assert_eq!(devices.len(), 2);
        assert_ne!(devices[0].id, devices[1].id);
    }

    #[test]
    fn missing_description_yields_unknown_name() {
        let devices = parse_linux_lsusb("Bus 003 Device 002: ID abcd:1234");
        assert_eq!(devices.len(), 1);
        assert_eq!(devices[0].product_name, UNKNOWN);
    }

    #[test]
    fn empty_output_yields_nothing() {
        assert!(parse_linux_lsusb("").is_empty());
    }
}
