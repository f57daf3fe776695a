//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` into user-facing errors with
//! actionable help text and stable exit codes.

use miette::Diagnostic;
use thiserror::Error;

use usbwatch_config::ConfigError;
use usbwatch_core::CoreError;

pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const CONFIG: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const DETECTION: i32 = 5;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Lookups ──────────────────────────────────────────────────────

    #[error("Device '{identifier}' not found")]
    #[diagnostic(
        code(usbwatch::not_found),
        help("Run: usbwatch devices list to see attached devices")
    )]
    DeviceNotFound { identifier: String },

    #[error("No mounted volume belongs to device '{identifier}'")]
    #[diagnostic(
        code(usbwatch::no_mount),
        help(
            "Only mass-storage devices with a mounted volume resolve to a path.\n\
             Check that the volume is mounted, then retry."
        )
    )]
    MountNotFound { identifier: String },

    // ── Detection ────────────────────────────────────────────────────

    #[error("Device detection failed: {message}")]
    #[diagnostic(
        code(usbwatch::detection),
        help("Re-run with -vv for substrate diagnostics, or try --strategy command-poll.")
    )]
    Detection { message: String },

    // ── Configuration ────────────────────────────────────────────────

    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(usbwatch::validation))]
    Validation { field: String, reason: String },

    #[error("Config file already exists at {path}")]
    #[diagnostic(
        code(usbwatch::config_exists),
        help("Use --force to overwrite it.")
    )]
    ConfigExists { path: String },

    #[error(transparent)]
    #[diagnostic(
        code(usbwatch::config),
        help("Check the config file (usbwatch config path) and USBWATCH_* variables.")
    )]
    Config(Box<figment::Error>),

    #[error("failed to serialize config: {0}")]
    #[diagnostic(code(usbwatch::config))]
    ConfigSerialize(#[from] toml::ser::Error),

    // ── Internal ─────────────────────────────────────────────────────

    #[error("Internal error: {message}")]
    #[diagnostic(code(usbwatch::internal))]
    Internal { message: String },

    // ── IO ───────────────────────────────────────────────────────────

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::DeviceNotFound { .. } | Self::MountNotFound { .. } => exit_code::NOT_FOUND,
            Self::Detection { .. } => exit_code::DETECTION,
            Self::Validation { .. }
            | Self::ConfigExists { .. }
            | Self::Config(_)
            | Self::ConfigSerialize(_) => exit_code::CONFIG,
            Self::Internal { .. } | Self::Io(_) => exit_code::GENERAL,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::DeviceNotFound { identifier } => Self::DeviceNotFound { identifier },

            CoreError::MountResolutionFailure { identifier } => Self::MountNotFound { identifier },

            CoreError::Config { message } => Self::Validation {
                field: "monitor".into(),
                reason: message,
            },

            err @ (CoreError::ProbeUnavailable { .. }
            | CoreError::CommandFailure { .. }
            | CoreError::ParseFailure { .. }
            | CoreError::DescriptorReadFailure { .. }
            | CoreError::EnumerationFailure { .. }) => Self::Detection {
                message: err.to_string(),
            },

            CoreError::Internal(message) => Self::Internal { message },
        }
    }
}

// ── ConfigError → CliError mapping ───────────────────────────────────

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Validation { field, reason } => Self::Validation { field, reason },
            ConfigError::Figment(err) => Self::Config(err),
            ConfigError::Serialization(err) => Self::ConfigSerialize(err),
            ConfigError::Io(err) => Self::Io(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookups_map_to_not_found() {
        let err = CliError::from(CoreError::DeviceNotFound {
            identifier: "0951:1666".into(),
        });
        assert_eq!(err.exit_code(), exit_code::NOT_FOUND);

        let err = CliError::from(CoreError::MountResolutionFailure {
            identifier: "0951:1666".into(),
        });
        assert!(matches!(err, CliError::MountNotFound { .. }));
        assert_eq!(err.exit_code(), exit_code::NOT_FOUND);
    }

    #[test]
    fn substrate_failures_map_to_detection() {
        let err = CliError::from(CoreError::EnumerationFailure {
            message: "lsusb missing".into(),
        });
        assert_eq!(err.exit_code(), exit_code::DETECTION);
        assert!(err.to_string().contains("lsusb missing"));
    }

    #[test]
    fn unavailable_substrate_is_a_detection_error() {
        let err = CliError::from(CoreError::ProbeUnavailable {
            substrate: "libusb hotplug".into(),
            reason: "libusb reports no hotplug capability".into(),
        });
        assert_eq!(err.exit_code(), exit_code::DETECTION);
        assert!(err.to_string().contains("libusb hotplug"));
    }

    #[test]
    fn config_validation_is_a_config_error() {
        let err = CliError::from(ConfigError::Validation {
            field: "monitor.history_capacity".into(),
            reason: "must be at least 1".into(),
        });
        assert_eq!(err.exit_code(), exit_code::CONFIG);
    }
}
