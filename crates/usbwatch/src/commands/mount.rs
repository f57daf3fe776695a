//! Mount command handler.

use serde::Serialize;
use usbwatch_core::Monitor;

use crate::cli::MountArgs;
use crate::error::CliError;
use crate::output;

use super::Render;

#[derive(Serialize)]
struct Resolved {
    device_id: String,
    path: String,
}

pub async fn handle(monitor: &Monitor, args: MountArgs, render: &Render) -> Result<(), CliError> {
    let path = monitor.resolve_storage_path(&args.id).await?;
    let resolved = Resolved {
        device_id: args.id,
        path,
    };
    let out = output::render_single(render.format, &resolved, |r| r.path.clone(), |r| r.path.clone());
    output::print_output(&out, render.quiet);
    Ok(())
}
