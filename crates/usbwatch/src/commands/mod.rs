//! Command dispatch: bridges CLI args -> `Monitor` queries -> output formatting.

pub mod config_cmd;
pub mod devices;
pub mod history;
pub mod mount;
pub mod status;
pub mod watch;

use usbwatch_core::Monitor;

use crate::cli::{Command, OutputFormat};
use crate::error::CliError;

/// Resolved presentation settings shared by every handler.
#[derive(Debug, Clone)]
pub struct Render {
    pub format: OutputFormat,
    pub color: bool,
    pub quiet: bool,
}

/// Dispatch a monitor-bound command to the appropriate handler.
pub async fn dispatch(cmd: Command, monitor: &Monitor, render: &Render) -> Result<(), CliError> {
    match cmd {
        Command::Devices(args) => devices::handle(monitor, args, render).await,
        Command::History(args) => {
            history::handle(monitor, &args, render);
            Ok(())
        }
        Command::Status => {
            status::handle(monitor, render);
            Ok(())
        }
        Command::Mount(args) => mount::handle(monitor, args, render).await,
        Command::Watch(args) => watch::handle(monitor, &args, render).await,
        // Config and Completions are handled before dispatch
        Command::Config(_) | Command::Completions(_) => Err(CliError::Internal {
            message: "command does not use the monitor".into(),
        }),
    }
}
