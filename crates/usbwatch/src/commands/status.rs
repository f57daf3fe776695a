//! Status command handler.

use usbwatch_core::{Monitor, MonitorStatus};

use crate::output;

use super::Render;

fn detail(s: &MonitorStatus) -> String {
    let yes_no = |b: bool| if b { "yes" } else { "no" };
    [
        format!("Monitoring:   {}", if s.monitoring_active { "active" } else { "stopped" }),
        format!("Strategy:     {}", s.strategy),
        format!("Devices:      {}", s.device_count),
        format!("History:      {}", s.history_count),
        format!("Uptime:       {}s", s.uptime_secs),
        "Substrates:".to_owned(),
        format!("  native-event  {}", yes_no(s.substrate_availability.native_event)),
        format!("  native-poll   {}", yes_no(s.substrate_availability.native_poll)),
        format!("  command-poll  {}", yes_no(s.substrate_availability.command_poll)),
    ]
    .join("\n")
}

pub fn handle(monitor: &Monitor, render: &Render) {
    let status = monitor.status();
    let out = output::render_single(render.format, &status, detail, |s| s.strategy.to_string());
    output::print_output(&out, render.quiet);
}
