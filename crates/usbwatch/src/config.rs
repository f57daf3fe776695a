//! CLI configuration: thin wrapper around `usbwatch_config`.
//!
//! Re-exports the shared types and adds resolution that respects
//! `GlobalOpts` flag overrides (--config, --strategy, --output, --color).

use std::path::PathBuf;

use clap::ValueEnum;

use usbwatch_core::{DetectionStrategy, MonitorConfig};

use crate::cli::{ColorMode, GlobalOpts, OutputFormat, StrategyArg};
use crate::error::CliError;

// ── Re-exports from shared crate ────────────────────────────────────

pub use usbwatch_config::{Config, config_path, save_config};

// ── CLI-specific helpers ────────────────────────────────────────────

/// Config file in effect: `--config` (or `USBWATCH_CONFIG`), else the
/// platform default.
pub fn effective_path(global: &GlobalOpts) -> PathBuf {
    global.config.clone().unwrap_or_else(config_path)
}

pub fn load(global: &GlobalOpts) -> Result<Config, CliError> {
    Ok(usbwatch_config::load_config(Some(&effective_path(global)))?)
}

/// Engine configuration with flag overrides applied (flag > env > file).
pub fn monitor_config(global: &GlobalOpts, config: &Config) -> Result<MonitorConfig, CliError> {
    let mut monitor = config.to_monitor_config()?;
    if let Some(strategy) = global.strategy {
        monitor.preferred_strategy = Some(detection_strategy(strategy));
    }
    Ok(monitor)
}

pub fn detection_strategy(arg: StrategyArg) -> DetectionStrategy {
    match arg {
        StrategyArg::NativeEvent => DetectionStrategy::NativeEvent,
        StrategyArg::NativePoll => DetectionStrategy::NativePoll,
        StrategyArg::CommandPoll => DetectionStrategy::CommandPoll,
    }
}

pub fn output_format(global: &GlobalOpts, config: &Config) -> Result<OutputFormat, CliError> {
    match global.output {
        Some(format) => Ok(format),
        None => parse_value("defaults.output", &config.defaults.output),
    }
}

pub fn color_mode(global: &GlobalOpts, config: &Config) -> Result<ColorMode, CliError> {
    match global.color {
        Some(mode) => Ok(mode),
        None => parse_value("defaults.color", &config.defaults.color),
    }
}

fn parse_value<T: ValueEnum>(field: &str, raw: &str) -> Result<T, CliError> {
    T::from_str(raw, true).map_err(|reason| CliError::Validation {
        field: field.into(),
        reason,
    })
}
