// ── Strategy selection ──
//
// Probed once at startup into a fixed strategy; never re-probed.

use std::sync::Arc;

use tracing::{info, warn};

use super::{CommandEnumerator, Substrate};
use crate::exec::CommandRunner;
use crate::model::{DetectionStrategy, SubstrateAvailability};
use crate::platform::Platform;

/// Capability check for every substrate. Command polling is always
/// available.
pub fn probe_substrates() -> SubstrateAvailability {
    #[cfg(feature = "libusb")]
    let availability = SubstrateAvailability {
        native_event: super::libusb::probe_hotplug(),
        native_poll: super::libusb::probe_enumeration(),
        command_poll: true,
    };
    #[cfg(not(feature = "libusb"))]
    let availability = SubstrateAvailability::command_only();

    info!(
        native_event = availability.native_event,
        native_poll = availability.native_poll,
        "probed detection substrates"
    );
    availability
}

/// Pick the strategy to run. A preferred strategy wins when available;
/// otherwise the first available one in priority order. Never fails.
pub fn select_strategy(
    availability: &SubstrateAvailability,
    preferred: Option<DetectionStrategy>,
) -> DetectionStrategy {
    if let Some(preferred) = preferred {
        if availability.is_available(preferred) {
            return preferred;
        }
        warn!(%preferred, "preferred detection strategy unavailable, using priority order");
    }

    DetectionStrategy::PRIORITY
        .into_iter()
        .find(|strategy| availability.is_available(*strategy))
        .unwrap_or(DetectionStrategy::CommandPoll)
}

/// Construct the substrate for a selected strategy.
pub fn build_substrate(
    strategy: DetectionStrategy,
    platform: Platform,
    runner: Arc<dyn CommandRunner>,
) -> Substrate {
    match strategy {
        #[cfg(feature = "libusb")]
        DetectionStrategy::NativeEvent => Substrate::Push(Arc::new(super::LibusbHotplug::new())),
        #[cfg(feature = "libusb")]
        DetectionStrategy::NativePoll => {
            Substrate::Polling(Arc::new(super::LibusbEnumerator::new()))
        }
        #[cfg(not(feature = "libusb"))]
        DetectionStrategy::NativeEvent | DetectionStrategy::NativePoll => {
            warn!(%strategy, "native substrates not compiled in, using command polling");
            Substrate::Polling(Arc::new(CommandEnumerator::new(platform, runner)))
        }
        DetectionStrategy::CommandPoll => {
            Substrate::Polling(Arc::new(CommandEnumerator::new(platform, runner)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn availability(native_event: bool, native_poll: bool) -> SubstrateAvailability {
        SubstrateAvailability {
            native_event,
            native_poll,
            command_poll: true,
        }
    }

    #[test]
    fn picks_highest_priority_available() {
        assert_eq!(
            select_strategy(&availability(true, true), None),
            DetectionStrategy::NativeEvent
        );
        assert_eq!(
            select_strategy(&availability(false, true), None),
            DetectionStrategy::NativePoll
        );
        assert_eq!(
            select_strategy(&availability(false, false), None),
            DetectionStrategy::CommandPoll
        );
    }

    #[test]
    fn honours_available_preference() {
        assert_eq!(
            select_strategy(&availability(true, true), Some(DetectionStrategy::CommandPoll)),
            DetectionStrategy::CommandPoll
        );
    }

    #[test]
    fn unavailable_preference_falls_back_to_priority() {
        assert_eq!(
            select_strategy(&availability(false, true), Some(DetectionStrategy::NativeEvent)),
            DetectionStrategy::NativePoll
        );
    }

    #[test]
    fn probing_always_reports_command_poll() {
        assert!(probe_substrates().command_poll);
    }
}
