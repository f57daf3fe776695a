// ── Detection strategy ──

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Substrate chosen once at startup and kept for the process lifetime.
///
/// Variants are listed in probe priority order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case", ascii_case_insensitive)]
pub enum DetectionStrategy {
    /// Native detector that pushes add/remove events.
    NativeEvent,
    /// Native detector that can be enumerated but must be polled.
    NativePoll,
    /// Platform command output, polled. Always available.
    CommandPoll,
}

impl DetectionStrategy {
    pub const PRIORITY: [Self; 3] = [Self::NativeEvent, Self::NativePoll, Self::CommandPoll];
}

/// Result of probing every substrate at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubstrateAvailability {
    pub native_event: bool,
    pub native_poll: bool,
    pub command_poll: bool,
}

impl SubstrateAvailability {
    /// Only the command fallback is usable.
    pub fn command_only() -> Self {
        Self {
            native_event: false,
            native_poll: false,
            command_poll: true,
        }
    }

    pub fn is_available(&self, strategy: DetectionStrategy) -> bool {
        match strategy {
            DetectionStrategy::NativeEvent => self.native_event,
            DetectionStrategy::NativePoll => self.native_poll,
            DetectionStrategy::CommandPoll => self.command_poll,
        }
    }
}

impl Default for SubstrateAvailability {
    fn default() -> Self {
        Self::command_only()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn strategy_string_forms_are_kebab_case() {
        assert_eq!(DetectionStrategy::NativeEvent.to_string(), "native-event");
        assert_eq!(
            "Command-Poll".parse::<DetectionStrategy>().unwrap(),
            DetectionStrategy::CommandPoll
        );
        assert!("usb".parse::<DetectionStrategy>().is_err());
    }

    #[test]
    fn command_poll_is_always_available_by_default() {
        let avail = SubstrateAvailability::default();
        assert!(avail.is_available(DetectionStrategy::CommandPoll));
        assert!(!avail.is_available(DetectionStrategy::NativeEvent));
    }
}
