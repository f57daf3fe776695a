// ── Core error types ──
//
// Most substrate failures never reach a caller: they are absorbed where
// they happen and degrade to an empty enumeration or a degraded record.
// Only caller-scoped operations (refresh, storage resolution, lookups)
// surface these variants.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Substrate errors ─────────────────────────────────────────────
    #[error("Substrate unavailable: {substrate} ({reason})")]
    ProbeUnavailable { substrate: String, reason: String },

    #[error("Command `{command}` failed: {reason}")]
    CommandFailure { command: String, reason: String },

    #[error("Could not parse {source_name} output: {message}")]
    ParseFailure {
        source_name: String,
        message: String,
    },

    #[error("Descriptor read failed for {vendor_id:04x}:{product_id:04x}: {reason}")]
    DescriptorReadFailure {
        vendor_id: u16,
        product_id: u16,
        reason: String,
    },

    #[error("Device enumeration failed: {message}")]
    EnumerationFailure { message: String },

    // ── Lookup errors ────────────────────────────────────────────────
    #[error("Device not found: {identifier}")]
    DeviceNotFound { identifier: String },

    #[error("No mounted volume matches device {identifier}")]
    MountResolutionFailure { identifier: String },

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    // ── Internal errors ──────────────────────────────────────────────
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// Whether the error was produced by a caller-scoped lookup that the
    /// caller can recover from (retry later, pick another device).
    pub fn is_lookup(&self) -> bool {
        matches!(
            self,
            Self::DeviceNotFound { .. } | Self::MountResolutionFailure { .. }
        )
    }
}

#[cfg(feature = "libusb")]
impl From<rusb::Error> for CoreError {
    fn from(err: rusb::Error) -> Self {
        CoreError::EnumerationFailure {
            message: format!("libusb: {err}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn descriptor_failure_formats_ids_as_hex() {
        let err = CoreError::DescriptorReadFailure {
            vendor_id: 0x046d,
            product_id: 0xc52b,
            reason: "access denied".into(),
        };
        assert_eq!(
            err.to_string(),
            "Descriptor read failed for 046d:c52b: access denied"
        );
    }

    #[test]
    fn lookup_errors_are_flagged() {
        assert!(CoreError::DeviceNotFound { identifier: "x".into() }.is_lookup());
        assert!(!CoreError::Internal("boom".into()).is_lookup());
    }
}
