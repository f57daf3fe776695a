// ── Command-output parsers ──
//
// One pure grammar per platform: raw command text in, canonical records
// out. Nothing here runs commands.

mod linux;
mod macos;
mod windows;

pub use linux::parse_linux_lsusb;
pub use macos::parse_macos_system_profiler;
pub use windows::parse_windows_pnp_csv;

use crate::error::CoreError;
use crate::model::DeviceRecord;
use crate::platform::Platform;

/// External command whose output the platform grammar understands.
pub fn listing_command(platform: Platform) -> (&'static str, Vec<String>) {
    match platform {
        Platform::Linux => ("lsusb", Vec::new()),
        Platform::MacOs => (
            "system_profiler",
            vec!["SPUSBDataType".into(), "-json".into()],
        ),
        Platform::Windows => (
            "wmic",
            vec![
                "path".into(),
                "Win32_PnPEntity".into(),
                "where".into(),
                "PNPDeviceID like 'USB\\\\%'".into(),
                "get".into(),
                "Name,PNPDeviceID".into(),
                "/format:csv".into(),
            ],
        ),
    }
}

/// Parse a device listing with the grammar for `platform`.
pub fn parse_device_listing(
    platform: Platform,
    text: &str,
) -> Result<Vec<DeviceRecord>, CoreError> {
    match platform {
        Platform::Linux => Ok(parse_linux_lsusb(text)),
        Platform::MacOs => parse_macos_system_profiler(text),
        Platform::Windows => Ok(parse_windows_pnp_csv(text)),
    }
}
