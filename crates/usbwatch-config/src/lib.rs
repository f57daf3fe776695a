//! Configuration for the usbwatch CLI.
//!
//! Layered loading (built-in defaults, then the TOML file, then
//! `USBWATCH_*` environment variables) and translation to
//! `usbwatch_core::MonitorConfig`. The core crate never reads files.

use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use usbwatch_core::{DEFAULT_HISTORY_CAPACITY, DetectionStrategy, MonitorConfig, Platform};

/// Prefix of environment overrides. Nested keys use `__`, e.g.
/// `USBWATCH_MONITOR__POLL_INTERVAL_MS=500`.
pub const ENV_PREFIX: &str = "USBWATCH_";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Config {
    /// Presentation defaults for the CLI.
    #[serde(default)]
    pub defaults: Defaults,

    /// Detection engine settings.
    #[serde(default)]
    pub monitor: MonitorSection,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Defaults {
    /// "table", "json", "yaml" or "plain".
    #[serde(default = "default_output")]
    pub output: String,

    /// "auto", "always" or "never".
    #[serde(default = "default_color")]
    pub color: String,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            color: default_color(),
        }
    }
}

fn default_output() -> String {
    "table".into()
}
fn default_color() -> String {
    "auto".into()
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct MonitorSection {
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// How long a disconnected device stays queryable.
    #[serde(default = "default_grace_period_ms")]
    pub grace_period_ms: u64,

    #[serde(default = "default_history_capacity")]
    pub history_capacity: usize,

    #[serde(default = "default_command_timeout_secs")]
    pub command_timeout_secs: u64,

    #[serde(default = "default_event_channel_size")]
    pub event_channel_size: usize,

    /// Preferred detection strategy; used only when available.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strategy: Option<DetectionStrategy>,

    /// Command grammar override; defaults to the host platform.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform: Option<Platform>,
}

impl Default for MonitorSection {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            grace_period_ms: default_grace_period_ms(),
            history_capacity: default_history_capacity(),
            command_timeout_secs: default_command_timeout_secs(),
            event_channel_size: default_event_channel_size(),
            strategy: None,
            platform: None,
        }
    }
}

fn default_poll_interval_ms() -> u64 {
    2_000
}
fn default_grace_period_ms() -> u64 {
    5_000
}
fn default_history_capacity() -> usize {
    DEFAULT_HISTORY_CAPACITY
}
fn default_command_timeout_secs() -> u64 {
    10
}
fn default_event_channel_size() -> usize {
    256
}

impl Config {
    /// Build the engine configuration, rejecting values the engine
    /// cannot run with.
    pub fn to_monitor_config(&self) -> Result<MonitorConfig, ConfigError> {
        let m = &self.monitor;
        if m.poll_interval_ms == 0 {
            return Err(invalid("monitor.poll_interval_ms", "must be greater than zero"));
        }
        if m.history_capacity == 0 {
            return Err(invalid("monitor.history_capacity", "must be at least 1"));
        }
        if m.command_timeout_secs == 0 {
            return Err(invalid("monitor.command_timeout_secs", "must be greater than zero"));
        }
        if m.event_channel_size == 0 {
            return Err(invalid("monitor.event_channel_size", "must be at least 1"));
        }

        Ok(MonitorConfig {
            poll_interval: Duration::from_millis(m.poll_interval_ms),
            grace_period: Duration::from_millis(m.grace_period_ms),
            history_capacity: m.history_capacity,
            command_timeout: Duration::from_secs(m.command_timeout_secs),
            preferred_strategy: m.strategy,
            platform: m.platform.unwrap_or_else(Platform::current),
            event_channel_size: m.event_channel_size,
        })
    }
}

fn invalid(field: &str, reason: &str) -> ConfigError {
    ConfigError::Validation {
        field: field.into(),
        reason: reason.into(),
    }
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("io", "usbwatch", "usbwatch").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("usbwatch");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Layered sources for the file at `path`. A missing file contributes
/// nothing.
pub fn figment(path: &Path) -> Figment {
    Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed(ENV_PREFIX).split("__"))
}

/// Load from `path`, or from [`config_path()`] when none is given.
pub fn load_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    let default_path;
    let path = if let Some(path) = path {
        path
    } else {
        default_path = config_path();
        &default_path
    };

    let config: Config = figment(path).extract()?;
    Ok(config)
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write it to `path`, creating parent
/// directories as needed.
pub fn save_config(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config(Some(&dir.path().join("absent.toml"))).unwrap();
        assert_eq!(config, Config::default());

        let monitor = config.to_monitor_config().unwrap();
        assert_eq!(monitor.poll_interval, Duration::from_secs(2));
        assert_eq!(monitor.grace_period, Duration::from_secs(5));
        assert_eq!(monitor.history_capacity, 1000);
        assert_eq!(monitor.preferred_strategy, None);
    }

    #[test]
    fn file_values_override_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
[defaults]
output = "json"

[monitor]
poll_interval_ms = 500
strategy = "command-poll"
platform = "darwin"
"#,
        )
        .unwrap();

        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.defaults.output, "json");
        assert_eq!(config.defaults.color, "auto");
        assert_eq!(config.monitor.grace_period_ms, 5_000);

        let monitor = config.to_monitor_config().unwrap();
        assert_eq!(monitor.poll_interval, Duration::from_millis(500));
        assert_eq!(monitor.preferred_strategy, Some(DetectionStrategy::CommandPoll));
        assert_eq!(monitor.platform, Platform::MacOs);
    }

    #[test]
    fn unknown_strategy_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[monitor]\nstrategy = \"carrier-pigeon\"\n").unwrap();
        assert!(matches!(load_config(Some(&path)), Err(ConfigError::Figment(_))));
    }

    #[test]
    fn zero_values_fail_validation() {
        let mut config = Config::default();
        config.monitor.history_capacity = 0;
        let err = config.to_monitor_config().unwrap_err();
        assert!(
            matches!(&err, ConfigError::Validation { field, .. } if field == "monitor.history_capacity")
        );
    }

    #[test]
    fn save_then_load_preserves_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = Config::default();
        config.monitor.strategy = Some(DetectionStrategy::NativePoll);
        config.monitor.history_capacity = 64;
        save_config(&config, &path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("strategy = \"native-poll\""));
        assert!(!text.contains("platform"));
        assert_eq!(load_config(Some(&path)).unwrap(), config);
    }
}
