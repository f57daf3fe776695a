// ── Event bus ──
//
// Single publish point for lifecycle notifications. Transports subscribe
// with `subscribe()`; slow subscribers lag rather than stall the engine.

use chrono::{DateTime, Utc};
use tokio::sync::broadcast;
use tracing::trace;

use crate::model::{DeviceEvent, DeviceEventKind, DeviceRecord};

#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<DeviceEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Publish one event. Returns the number of subscribers reached;
    /// zero subscribers is not an error.
    pub fn publish(
        &self,
        kind: DeviceEventKind,
        device: &DeviceRecord,
        timestamp: DateTime<Utc>,
    ) -> usize {
        let event = DeviceEvent {
            kind,
            device: device.clone(),
            timestamp,
        };
        let reached = self.tx.send(event).unwrap_or(0);
        trace!(%kind, device_id = %device.id, reached, "event published");
        reached
    }

    pub fn subscribe(&self) -> broadcast::Receiver<DeviceEvent> {
        self.tx.subscribe()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn publish_without_subscribers_is_fine() {
        let bus = EventBus::new(8);
        let device = DeviceRecord::detected(0x0951, 0x1666, None, None);
        assert_eq!(bus.publish(DeviceEventKind::DeviceConnected, &device, Utc::now()), 0);
    }

    #[tokio::test]
    async fn subscribers_see_events_in_order() {
        let bus = EventBus::new(8);
        let mut rx = bus.subscribe();
        let device = DeviceRecord::detected(0x0951, 0x1666, None, None);

        bus.publish(DeviceEventKind::DeviceConnected, &device, Utc::now());
        bus.publish(DeviceEventKind::DeviceDisconnected, &device, Utc::now());

        assert_eq!(rx.recv().await.unwrap().kind, DeviceEventKind::DeviceConnected);
        assert_eq!(
            rx.recv().await.unwrap().kind,
            DeviceEventKind::DeviceDisconnected
        );
    }
}
