// ── Command-poll enumerator ──

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use super::Enumerator;
use crate::error::CoreError;
use crate::exec::{CommandRunner, command_line};
use crate::model::{DetectionStrategy, DeviceRecord};
use crate::parse::{listing_command, parse_device_listing};
use crate::platform::Platform;

/// Runs the platform listing command and parses its output.
///
/// This is the terminal fallback: it never fails. A missing command, a
/// non-zero exit or unparseable output all degrade to an empty listing
/// with a warning.
pub struct CommandEnumerator {
    platform: Platform,
    runner: Arc<dyn CommandRunner>,
}

impl CommandEnumerator {
    pub fn new(platform: Platform, runner: Arc<dyn CommandRunner>) -> Self {
        Self { platform, runner }
    }
}

#[async_trait]
impl Enumerator for CommandEnumerator {
    fn strategy(&self) -> DetectionStrategy {
        DetectionStrategy::CommandPoll
    }

    async fn enumerate(&self) -> Result<Vec<DeviceRecord>, CoreError> {
        let (program, args) = listing_command(self.platform);

        let output = match self.runner.run(program, &args).await {
            Ok(output) => output,
            Err(e) => {
                warn!(error = %e, "device listing command failed");
                return Ok(Vec::new());
            }
        };

        if !output.is_success() {
            warn!(
                command = %command_line(program, &args),
                exit_code = ?output.exit_code,
                "device listing command exited unsuccessfully"
            );
            return Ok(Vec::new());
        }

        match parse_device_listing(self.platform, &output.stdout) {
            Ok(devices) => {
                debug!(count = devices.len(), platform = %self.platform, "parsed device listing");
                Ok(devices)
            }
            Err(e) => {
                warn!(error = %e, "device listing output could not be parsed");
                Ok(Vec::new())
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::exec::CommandOutput;

    struct Fixed(Result<CommandOutput, ()>);

    #[async_trait]
    impl CommandRunner for Fixed {
        async fn run(&self, program: &str, args: &[String]) -> Result<CommandOutput, CoreError> {
            self.0.clone().map_err(|()| CoreError::CommandFailure {
                command: command_line(program, args),
                reason: "not found".into(),
            })
        }
    }

    fn enumerator(platform: Platform, result: Result<CommandOutput, ()>) -> CommandEnumerator {
        CommandEnumerator::new(platform, Arc::new(Fixed(result)))
    }

    #[tokio::test]
    async fn parses_successful_output() {
        let e = enumerator(
            Platform::Linux,
            Ok(CommandOutput::success(
                "Bus 001 Device 004: ID 046d:c52b Logitech USB Receiver\n",
            )),
        );
        let devices = e.enumerate().await.unwrap();
        assert_eq!(devices.len(), 1);
        assert_eq!(devices[0].vendor_id, 0x046d);
    }

    #[tokio::test]
    async fn missing_command_yields_empty_list() {
        let e = enumerator(Platform::Linux, Err(()));
        assert!(e.enumerate().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn non_zero_exit_yields_empty_list() {
        let e = enumerator(
            Platform::Linux,
            Ok(CommandOutput {
                stdout: "Bus 001 Device 004: ID 046d:c52b Logitech USB Receiver".into(),
                exit_code: Some(1),
            }),
        );
        assert!(e.enumerate().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn malformed_output_yields_empty_list() {
        let e = enumerator(Platform::MacOs, Ok(CommandOutput::success("garbage")));
        assert!(e.enumerate().await.unwrap().is_empty());
    }
}
