//! Watch command: stream lifecycle events until Ctrl-C.

use tokio::sync::broadcast::error::RecvError;
use tracing::warn;
use usbwatch_core::Monitor;

use crate::cli::WatchArgs;
use crate::error::CliError;
use crate::output;

use super::Render;

pub async fn handle(monitor: &Monitor, args: &WatchArgs, render: &Render) -> Result<(), CliError> {
    // Subscribed after start(), so the initial snapshot's connects are
    // not replayed; --initial prints them from the live set instead.
    let mut events = monitor.events();

    if args.initial {
        for device in monitor.list_devices() {
            output::print_output(&format!("= {device}"), render.quiet);
        }
    }

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            received = events.recv() => match received {
                Ok(event) => {
                    let line = output::render_event(render.format, &event, render.color);
                    output::print_output(&line, render.quiet);
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "event consumer lagged, events dropped");
                }
                Err(RecvError::Closed) => break,
            },
        }
    }

    Ok(())
}
