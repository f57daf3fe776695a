// ── Storage path resolution ──
//
// Maps a live mass-storage device to the filesystem path its volume is
// mounted at. Invoked on demand, never from the polling loop.

mod mounts;

use std::sync::Arc;

use tracing::{debug, warn};

pub use mounts::{
    MountPoint, descriptor_command, descriptor_matches, mount_table_command, parse_mount_table,
};

use crate::error::CoreError;
use crate::exec::{CommandRunner, command_line};
use crate::model::DeviceRecord;
use crate::platform::Platform;

/// Resolves devices to mount paths with the platform's commands.
pub struct StorageResolver {
    platform: Platform,
    runner: Arc<dyn CommandRunner>,
}

impl StorageResolver {
    pub fn new(platform: Platform, runner: Arc<dyn CommandRunner>) -> Self {
        Self { platform, runner }
    }

    /// First mounted volume (in mount-table order) whose descriptor names
    /// the device's vendor/product pair. The path ends with a separator.
    pub async fn resolve(&self, device: &DeviceRecord) -> Result<String, CoreError> {
        let not_found = || CoreError::MountResolutionFailure {
            identifier: device.id.clone(),
        };

        let (program, args) = mount_table_command(self.platform);
        let table = match self.runner.run(program, &args).await {
            Ok(output) if output.is_success() => output.stdout,
            Ok(output) => {
                warn!(
                    command = %command_line(program, &args),
                    exit_code = ?output.exit_code,
                    "mount table command exited unsuccessfully"
                );
                return Err(not_found());
            }
            Err(e) => {
                warn!(error = %e, "mount table unavailable");
                return Err(not_found());
            }
        };

        let candidates = parse_mount_table(self.platform, &table);
        debug!(
            device_id = %device.id,
            candidates = candidates.len(),
            "resolving storage path"
        );

        for mount in &candidates {
            let (program, args) = descriptor_command(self.platform, mount);
            let output = match self.runner.run(program, &args).await {
                Ok(output) if output.is_success() => output,
                Ok(_) | Err(_) => {
                    debug!(mount = %mount.path, "volume descriptor unavailable, skipping");
                    continue;
                }
            };

            if descriptor_matches(
                self.platform,
                &output.stdout,
                device.vendor_id,
                device.product_id,
            ) {
                return Ok(with_trailing_separator(
                    &mount.path,
                    self.platform.path_separator(),
                ));
            }
        }

        Err(not_found())
    }
}

fn with_trailing_separator(path: &str, separator: char) -> String {
    if path.ends_with(separator) {
        path.to_owned()
    } else {
        format!("{path}{separator}")
    }
}
