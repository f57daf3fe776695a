// ── Runtime monitor configuration ──
//
// Describes how the engine polls, how long disconnected devices linger,
// and how external commands are bounded. Core never touches disk: the
// CLI (or any other host) builds a `MonitorConfig` and hands it in.

use std::time::Duration;

use crate::error::CoreError;
use crate::model::DetectionStrategy;
use crate::platform::Platform;

/// Default number of history entries kept in memory.
pub const DEFAULT_HISTORY_CAPACITY: usize = 1000;

/// Configuration for a single `Monitor`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorConfig {
    /// Interval between poll cycles for the polling strategies.
    pub poll_interval: Duration,
    /// Delay between a disconnect and removal from the live set.
    pub grace_period: Duration,
    /// Maximum number of history entries retained.
    pub history_capacity: usize,
    /// Upper bound on a single external command invocation.
    pub command_timeout: Duration,
    /// Strategy to use when available; `None` picks by priority.
    pub preferred_strategy: Option<DetectionStrategy>,
    /// Platform whose command grammars are used.
    pub platform: Platform,
    /// Capacity of the lifecycle event broadcast channel.
    pub event_channel_size: usize,
}

impl MonitorConfig {
    /// Reject values that would stall or starve the engine.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.poll_interval.is_zero() {
            return Err(CoreError::Config {
                message: "poll interval must be greater than zero".into(),
            });
        }
        if self.history_capacity == 0 {
            return Err(CoreError::Config {
                message: "history capacity must be at least 1".into(),
            });
        }
        if self.command_timeout.is_zero() {
            return Err(CoreError::Config {
                message: "command timeout must be greater than zero".into(),
            });
        }
        if self.event_channel_size == 0 {
            return Err(CoreError::Config {
                message: "event channel size must be at least 1".into(),
            });
        }
        Ok(())
    }
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(2),
            grace_period: Duration::from_secs(5),
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            command_timeout: Duration::from_secs(10),
            preferred_strategy: None,
            platform: Platform::current(),
            event_channel_size: 256,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let cfg = MonitorConfig::default();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.grace_period, Duration::from_secs(5));
        assert_eq!(cfg.history_capacity, 1000);
    }

    #[test]
    fn zero_poll_interval_is_rejected() {
        let cfg = MonitorConfig {
            poll_interval: Duration::ZERO,
            ..MonitorConfig::default()
        };
        assert!(matches!(cfg.validate(), Err(CoreError::Config { .. })));
    }
}
