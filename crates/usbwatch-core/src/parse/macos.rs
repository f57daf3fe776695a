// ── `system_profiler SPUSBDataType -json` grammar ──
//
// The report is a tree: bus containers hold devices under `_items`,
// hubs hold further devices under their own `_items`.

use serde_json::Value;

use crate::error::CoreError;
use crate::model::{BusLocation, DeviceRecord};

/// Apple's own devices report this literal instead of a hex id.
const APPLE_VENDOR_TOKEN: &str = "apple_vendor_id";
const APPLE_VENDOR_ID: u16 = 0x05ac;

/// Parse the JSON device tree into canonical records.
pub fn parse_macos_system_profiler(text: &str) -> Result<Vec<DeviceRecord>, CoreError> {
    let root: Value = serde_json::from_str(text).map_err(|e| CoreError::ParseFailure {
        source_name: "system_profiler".into(),
        message: e.to_string(),
    })?;

    let Value::Object(sections) = root else {
        return Err(CoreError::ParseFailure {
            source_name: "system_profiler".into(),
            message: "top-level value is not an object".into(),
        });
    };

    let mut devices = Vec::new();
    for section in sections.values() {
        if let Value::Array(nodes) = section {
            for node in nodes {
                walk(node, &mut devices);
            }
        }
    }
    Ok(devices)
}

fn walk(node: &Value, out: &mut Vec<DeviceRecord>) {
    let Some(name) = node.get("_name").and_then(Value::as_str) else {
        return;
    };

    if !is_bus_container(name) {
        out.push(to_record(node, name));
    }

    if let Some(Value::Array(children)) = node.get("_items") {
        for child in children {
            walk(child, out);
        }
    }
}

/// `USB31Bus`, `USB30Bus`, `USB 3.0 Bus`, … describe controllers, not devices.
fn is_bus_container(name: &str) -> bool {
    let compact: String = name.split_whitespace().collect();
    let lower = compact.to_ascii_lowercase();
    lower.starts_with("usb") && lower.ends_with("bus")
}

fn to_record(node: &Value, name: &str) -> DeviceRecord {
    let text = |key: &str| node.get(key).and_then(Value::as_str);

    let vendor_id = text("vendor_id").and_then(parse_hex_id).unwrap_or(0);
    let product_id = text("product_id").and_then(parse_hex_id).unwrap_or(0);
    let serial = text("serial_num").map(str::to_owned);
    let bus_location = text("location_id").and_then(parse_location);

    let mut record = DeviceRecord::detected(vendor_id, product_id, serial, bus_location)
        .with_product_name(name);
    if let Some(manufacturer) = text("manufacturer") {
        record = record.with_manufacturer(manufacturer);
    }
    record
}

/// `"0x0951"`, `"0x05ac  (Apple Inc.)"` or `"apple_vendor_id"`.
fn parse_hex_id(raw: &str) -> Option<u16> {
    let raw = raw.trim();
    if raw.eq_ignore_ascii_case(APPLE_VENDOR_TOKEN) {
        return Some(APPLE_VENDOR_ID);
    }
    let token = raw.split_whitespace().next()?;
    let digits = token
        .strip_prefix("0x")
        .or_else(|| token.strip_prefix("0X"))
        .unwrap_or(token);
    u16::from_str_radix(digits, 16).ok()
}

/// `"0x14100000 / 3"`: the top byte of the location is the bus, the
/// number after the slash is the device address.
fn parse_location(raw: &str) -> Option<BusLocation> {
    let (location, address) = raw.split_once('/')?;
    let location = location.trim();
    let location = location.strip_prefix("0x").unwrap_or(location);
    let location = u32::from_str_radix(location, 16).ok()?;
    let bus = u8::try_from(location >> 24).ok()?;
    let address: u8 = address.trim().parse().ok()?;
    Some(BusLocation::new(bus, address))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const FIXTURE: &str = r#"{
  "SPUSBDataType" : [
    {
      "_name" : "USB31Bus",
      "host_controller" : "AppleUSBXHCITR",
      "_items" : [
        {
          "_name" : "DataTraveler 3.0",
          "manufacturer" : "Kingston",
          "product_id" : "0x1666",
          "serial_num" : "60A44C413A8CF3A0B9A30143",
          "vendor_id" : "0x0951  (Kingston Technology Company)",
          "location_id" : "0x14100000 / 3"
        },
        {
          "_name" : "USB2.0 Hub",
          "product_id" : "0x0610",
          "vendor_id" : "0x05e3  (Genesys Logic, Inc.)",
          "_items" : [
            {
              "_name" : "USB Receiver",
              "manufacturer" : "Logitech",
              "product_id" : "0xc52b",
              "vendor_id" : "0x046d  (Logitech Inc.)",
              "location_id" : "0x14200000 / 5"
            }
          ]
        }
      ]
    },
    {
      "_name" : "USB 3.0 Bus",
      "_items" : [
        {
          "_name" : "Magic Keyboard",
          "product_id" : "0x029c",
          "vendor_id" : "apple_vendor_id"
        }
      ]
    }
  ]
}"#;

    #[test]
    fn descends_nested_items_and_skips_buses() {
        let devices = parse_macos_system_profiler(FIXTURE).unwrap();
        let names: Vec<&str> = devices.iter().map(|d| d.product_name.as_str()).collect();
        assert_eq!(
            names,
            vec!["DataTraveler 3.0", "USB2.0 Hub", "USB Receiver", "Magic Keyboard"]
        );
    }

    #[test]
    fn parses_hex_ids_and_metadata() {
        let devices = parse_macos_system_profiler(FIXTURE).unwrap();
        let kingston = &devices[0];
        assert_eq!(kingston.vendor_id, 0x0951);
        assert_eq!(kingston.product_id, 0x1666);
        assert_eq!(kingston.manufacturer, "Kingston");
        assert_eq!(
            kingston.serial_number.as_deref(),
            Some("60A44C413A8CF3A0B9A30143")
        );
        assert_eq!(kingston.id, "0951:1666:60A44C413A8CF3A0B9A30143");

        let receiver = &devices[2];
        assert_eq!(receiver.bus_location, Some(BusLocation::new(0x14, 5)));
        assert_eq!(receiver.id, "046d:c52b@020-005");

        assert_eq!(devices[3].vendor_id, APPLE_VENDOR_ID);
    }

    #[test]
    fn malformed_json_is_a_parse_failure() {
        let err = parse_macos_system_profiler("{ not json").unwrap_err();
        assert!(matches!(err, CoreError::ParseFailure { .. }));
    }

    #[test]
    fn empty_report_yields_nothing() {
        let devices = parse_macos_system_profiler(r#"{"SPUSBDataType": []}"#).unwrap();
        assert!(devices.is_empty());
    }

    #[test]
    fn bus_container_detection() {
        assert!(is_bus_container("USB31Bus"));
        assert!(is_bus_container("USB 3.0 Bus"));
        assert!(!is_bus_container("USB Receiver"));
        assert!(!is_bus_container("USB2.0 Hub"));
    }
}
