//! Device command handlers.

use tabled::Tabled;
use usbwatch_core::{DeviceRecord, DeviceSnapshot, Monitor};

use crate::cli::{DevicesArgs, DevicesCommand};
use crate::error::CliError;
use crate::output;

use super::Render;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct DeviceRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "USB ID")]
    usb_id: String,
    #[tabled(rename = "Product")]
    product: String,
    #[tabled(rename = "Manufacturer")]
    manufacturer: String,
    #[tabled(rename = "Bus")]
    bus: String,
    #[tabled(rename = "Status")]
    status: String,
}

impl DeviceRow {
    fn new(d: &DeviceRecord, color: bool) -> Self {
        Self {
            id: d.id.clone(),
            usb_id: d.usb_id(),
            product: d.product_name.clone(),
            manufacturer: d.manufacturer.clone(),
            bus: d.bus_location.map(|b| b.to_string()).unwrap_or_default(),
            status: output::paint_status(d.status, color),
        }
    }
}

fn detail(d: &DeviceRecord, color: bool) -> String {
    let stamp = |at: Option<chrono::DateTime<chrono::Utc>>| {
        at.map_or_else(|| "-".into(), |t| t.to_rfc3339())
    };
    [
        format!("ID:           {}", d.id),
        format!("USB ID:       {}", d.usb_id()),
        format!("Product:      {}", d.product_name),
        format!("Manufacturer: {}", d.manufacturer),
        format!("Serial:       {}", d.serial_number.as_deref().unwrap_or("-")),
        format!(
            "Bus:          {}",
            d.bus_location.map_or_else(|| "-".into(), |b| b.to_string())
        ),
        format!("Status:       {}", output::paint_status(d.status, color)),
        format!("Connected:    {}", stamp(d.connected_at)),
        format!("Last seen:    {}", stamp(d.last_seen)),
    ]
    .join("\n")
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(monitor: &Monitor, args: DevicesArgs, render: &Render) -> Result<(), CliError> {
    match args.command {
        DevicesCommand::List { follow } => {
            let mut devices = monitor.devices();
            print_list(devices.current(), render);
            if follow {
                loop {
                    tokio::select! {
                        _ = tokio::signal::ctrl_c() => break,
                        changed = devices.changed() => match changed {
                            Some(snapshot) => print_list(&snapshot, render),
                            None => break,
                        },
                    }
                }
            }
            Ok(())
        }

        DevicesCommand::Get { id } => {
            let device = monitor
                .get_device(&id)
                .ok_or(CliError::DeviceNotFound { identifier: id })?;
            let out = output::render_single(
                render.format,
                &device,
                |d| detail(d, render.color),
                |d| d.id.clone(),
            );
            output::print_output(&out, render.quiet);
            Ok(())
        }
    }
}

fn print_list(snapshot: &DeviceSnapshot, render: &Render) {
    let devices: Vec<DeviceRecord> = snapshot.iter().map(|d| d.as_ref().clone()).collect();
    let out = output::render_list(
        render.format,
        &devices,
        |d| DeviceRow::new(d, render.color),
        |d| d.id.clone(),
    );
    output::print_output(&out, render.quiet);
}
