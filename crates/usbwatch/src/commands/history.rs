//! History command handler.

use tabled::Tabled;
use usbwatch_core::{HistoryEntry, Monitor};

use crate::cli::HistoryArgs;
use crate::output;

use super::Render;

#[derive(Tabled)]
struct HistoryRow {
    #[tabled(rename = "Time")]
    time: String,
    #[tabled(rename = "Event")]
    event: String,
    #[tabled(rename = "Device")]
    device: String,
    #[tabled(rename = "Product")]
    product: String,
}

impl From<&HistoryEntry> for HistoryRow {
    fn from(e: &HistoryEntry) -> Self {
        Self {
            time: e.timestamp.format("%Y-%m-%d %H:%M:%S").to_string(),
            event: e.event_type.to_string(),
            device: e.device_id.clone(),
            product: e.device.product_name.clone(),
        }
    }
}

pub fn handle(monitor: &Monitor, args: &HistoryArgs, render: &Render) {
    let entries = monitor.get_history(Some(args.limit));
    let out = output::render_list(
        render.format,
        &entries,
        |e| HistoryRow::from(e),
        |e| format!("{} {}", e.event_type, e.device_id),
    );
    output::print_output(&out, render.quiet);
}
