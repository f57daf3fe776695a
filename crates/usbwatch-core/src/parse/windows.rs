// ── `wmic … /format:csv` PnP listing grammar ──
//
// Rows look like `Node,Name,PNPDeviceID`, e.g.
//   DESKTOP-1,USB Mass Storage Device,USB\VID_0951&PID_1666\001A4D5E1F6BEF4159A71BAB
// The first non-empty line is the header.

use std::collections::HashMap;

use crate::model::DeviceRecord;

/// Parse the PnP CSV listing.
///
/// Rows with fewer than two non-empty fields are skipped. Ids never carry
/// a wall-clock component: PnP ids with `VID_`/`PID_` give the usual
/// vendor/product identity, anything else is identified by a slug of its
/// description plus its ordinal among rows sharing that description.
pub fn parse_windows_pnp_csv(text: &str) -> Vec<DeviceRecord> {
    let mut ordinals: HashMap<String, usize> = HashMap::new();

    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .skip(1)
        .filter_map(|line| {
            let fields: Vec<&str> = line.split(',').map(str::trim).collect();
            if fields.iter().filter(|f| !f.is_empty()).count() < 2 {
                return None;
            }
            Some(row_to_record(&fields, &mut ordinals))
        })
        .collect()
}

fn row_to_record(fields: &[&str], ordinals: &mut HashMap<String, usize>) -> DeviceRecord {
    // Device names may contain commas; the PnP id never does.
    let (name, pnp_id) = match fields {
        [_, name] => ((*name).to_owned(), None),
        [_, middle @ .., last] => (middle.join(","), Some(*last)),
        _ => (fields.join(","), None),
    };

    if let Some(ids) = pnp_id.and_then(PnpIds::parse) {
        let mut record = DeviceRecord::detected(ids.vendor_id, ids.product_id, None, None);
        match ids.instance {
            Some(instance) if !instance.contains('&') => {
                record.serial_number = Some(instance.to_owned());
                record.id = DeviceRecord::generate_id(
                    ids.vendor_id,
                    ids.product_id,
                    Some(instance),
                    None,
                );
            }
            // Windows-generated instance ids (`5&2a3b…&0&2`) are stable per
            // port but are not serial numbers.
            Some(instance) => {
                record.id = format!("{}#{}", record.usb_id(), instance.to_ascii_lowercase());
            }
            None => {}
        }
        return record.with_product_name(name);
    }

    let slug = slugify(&name);
    let ordinal = ordinals.entry(slug.clone()).or_insert(0);
    let id = format!("win:{slug}#{ordinal}");
    *ordinal += 1;

    let mut record = DeviceRecord::detected(0, 0, None, None).with_product_name(name);
    record.id = id;
    record
}

struct PnpIds<'a> {
    vendor_id: u16,
    product_id: u16,
    instance: Option<&'a str>,
}

impl<'a> PnpIds<'a> {
    /// `USB\VID_0951&PID_1666\001A4D5E…` (hardware id segment is case-insensitive).
    fn parse(pnp_id: &'a str) -> Option<Self> {
        let mut segments = pnp_id.split('\\');
        let _enumerator = segments.next()?;
        let hardware = segments.next()?;
        let instance = segments.next().filter(|s| !s.is_empty());

        let mut vendor_id = None;
        let mut product_id = None;
        for part in hardware.split('&') {
            let upper = part.to_ascii_uppercase();
            if let Some(hex) = upper.strip_prefix("VID_") {
                vendor_id = u16::from_str_radix(hex.get(..4)?, 16).ok();
            } else if let Some(hex) = upper.strip_prefix("PID_") {
                product_id = u16::from_str_radix(hex.get(..4)?, 16).ok();
            }
        }

        Some(Self {
            vendor_id: vendor_id?,
            product_id: product_id?,
            instance,
        })
    }
}

fn slugify(description: &str) -> String {
    let mut slug = String::with_capacity(description.len());
    for c in description.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.ends_with('-') && !slug.is_empty() {
            slug.push('-');
        }
    }
    let trimmed = slug.trim_end_matches('-');
    if trimmed.is_empty() {
        "device".to_owned()
    } else {
        trimmed.to_owned()
    }
}
