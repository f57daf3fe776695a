//! Output formatting: table, JSON, YAML, plain.
//!
//! Renders data in the format selected by `--output`. Table uses `tabled`,
//! structured formats use serde, plain emits one identifier per line.

use std::io::{self, IsTerminal, Write};

use owo_colors::OwoColorize;
use tabled::{Table, Tabled, settings::Style};

use usbwatch_core::{DeviceEvent, DeviceEventKind, DeviceStatus};

use crate::cli::{ColorMode, OutputFormat};

// ── Color helpers ────────────────────────────────────────────────────

/// Determine whether color output should be enabled.
pub fn should_color(mode: ColorMode) -> bool {
    match mode {
        ColorMode::Always => true,
        ColorMode::Never => false,
        ColorMode::Auto => io::stdout().is_terminal() && std::env::var("NO_COLOR").is_err(),
    }
}

pub fn paint_status(status: DeviceStatus, color: bool) -> String {
    let label = status.to_string();
    if !color {
        return label;
    }
    match status {
        DeviceStatus::Connected => label.green().to_string(),
        DeviceStatus::Disconnected => label.dimmed().to_string(),
        DeviceStatus::Error => label.yellow().to_string(),
    }
}

// ── Render dispatchers ───────────────────────────────────────────────

/// Render a list of serde-serializable + tabled items in the chosen format.
pub fn render_list<T, R>(
    format: OutputFormat,
    data: &[T],
    to_row: impl Fn(&T) -> R,
    id_fn: impl Fn(&T) -> String,
) -> String
where
    T: serde::Serialize,
    R: Tabled,
{
    match format {
        OutputFormat::Table => {
            let rows: Vec<R> = data.iter().map(to_row).collect();
            render_table(&rows)
        }
        OutputFormat::Json => render_json(data, false),
        OutputFormat::JsonCompact => render_json(data, true),
        OutputFormat::Yaml => render_yaml(data),
        OutputFormat::Plain => data.iter().map(&id_fn).collect::<Vec<_>>().join("\n"),
    }
}

/// Render a single serde-serializable item in the chosen format.
///
/// Table rendering uses a `detail_fn` that returns a pre-formatted string,
/// since single-item views don't use `Tabled` derive.
pub fn render_single<T>(
    format: OutputFormat,
    data: &T,
    detail_fn: impl Fn(&T) -> String,
    id_fn: impl Fn(&T) -> String,
) -> String
where
    T: serde::Serialize,
{
    match format {
        OutputFormat::Table => detail_fn(data),
        OutputFormat::Json => render_json(data, false),
        OutputFormat::JsonCompact => render_json(data, true),
        OutputFormat::Yaml => render_yaml(data),
        OutputFormat::Plain => id_fn(data),
    }
}

/// One line per lifecycle event, for streaming. Structured formats emit
/// compact JSON so each line parses on its own.
pub fn render_event(format: OutputFormat, event: &DeviceEvent, color: bool) -> String {
    match format {
        OutputFormat::Json | OutputFormat::JsonCompact | OutputFormat::Yaml => {
            render_json(event, true)
        }
        OutputFormat::Plain => format!("{} {}", event.kind, event.device.id),
        OutputFormat::Table => {
            let (marker, verb) = match event.kind {
                DeviceEventKind::DeviceConnected => ("+", "connected"),
                DeviceEventKind::DeviceDisconnected => ("-", "disconnected"),
            };
            let time = event.timestamp.format("%H:%M:%S");
            let line = format!(
                "{marker} {time} {verb:<12} {} {} ({})",
                event.device.usb_id(),
                event.device.product_name,
                event.device.id
            );
            match (color, event.kind) {
                (false, _) => line,
                (true, DeviceEventKind::DeviceConnected) => line.green().to_string(),
                (true, DeviceEventKind::DeviceDisconnected) => line.red().to_string(),
            }
        }
    }
}

/// Print the rendered output to stdout, respecting quiet mode.
pub fn print_output(output: &str, quiet: bool) {
    if quiet || output.is_empty() {
        return;
    }
    let mut stdout = io::stdout().lock();
    let _ = writeln!(stdout, "{output}");
}

// ── Format-specific renderers ────────────────────────────────────────

fn render_table<R: Tabled>(rows: &[R]) -> String {
    Table::new(rows).with(Style::rounded()).to_string()
}

fn render_json<T: serde::Serialize + ?Sized>(data: &T, compact: bool) -> String {
    let rendered = if compact {
        serde_json::to_string(data)
    } else {
        serde_json::to_string_pretty(data)
    };
    rendered.expect("serialization should not fail")
}

fn render_yaml<T: serde::Serialize + ?Sized>(data: &T) -> String {
    serde_yaml::to_string(data).expect("serialization should not fail")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use usbwatch_core::DeviceRecord;

    fn event(kind: DeviceEventKind) -> DeviceEvent {
        DeviceEvent {
            kind,
            device: DeviceRecord::detected(0x0951, 0x1666, Some("AB12".into()), None)
                .with_product_name("DataTraveler"),
            timestamp: Utc.with_ymd_and_hms(2026, 3, 1, 12, 30, 5).single().unwrap_or_default(),
        }
    }

    #[test]
    fn table_event_line_is_readable() {
        let line = render_event(OutputFormat::Table, &event(DeviceEventKind::DeviceConnected), false);
        assert_eq!(
            line,
            "+ 12:30:05 connected    0951:1666 DataTraveler (0951:1666:AB12)"
        );
    }

    #[test]
    fn structured_event_lines_are_single_line_json() {
        let line = render_event(OutputFormat::Yaml, &event(DeviceEventKind::DeviceDisconnected), false);
        assert!(!line.contains('\n'));
        assert!(line.contains("\"kind\":\"deviceDisconnected\""));
    }

    #[test]
    fn plain_event_line_is_kind_and_id() {
        let line = render_event(OutputFormat::Plain, &event(DeviceEventKind::DeviceConnected), true);
        assert_eq!(line, "deviceConnected 0951:1666:AB12");
    }

    #[test]
    fn uncolored_status_is_plain_text() {
        assert_eq!(paint_status(DeviceStatus::Error, false), "error");
    }
}
