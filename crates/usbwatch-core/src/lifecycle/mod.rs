// ── Lifecycle engine ──
//
// Turns snapshots (or discrete hotplug events) into connect/disconnect
// transitions and applies them: registry first, then history, then the
// event bus, in the order the transitions were computed.
//
// Per-id states: absent → connected → disconnected (grace) → absent.

mod diff;
mod grace;

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{debug, info};

pub use diff::{SnapshotDiff, compute_diff};
pub use grace::GraceScheduler;

use crate::events::EventBus;
use crate::model::{DeviceRecord, DeviceStatus, EventType, HistoryEntry};
use crate::store::{DeviceRegistry, HistoryLog};

/// One lifecycle change, carrying the full post-transition record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    Connect(DeviceRecord),
    Disconnect(DeviceRecord),
}

impl Transition {
    pub fn device(&self) -> &DeviceRecord {
        match self {
            Self::Connect(record) | Self::Disconnect(record) => record,
        }
    }

    pub fn event_type(&self) -> EventType {
        match self {
            Self::Connect(_) => EventType::Connect,
            Self::Disconnect(_) => EventType::Disconnect,
        }
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        let at = match self {
            Self::Connect(record) => record.connected_at,
            Self::Disconnect(record) => record.disconnected_at,
        };
        at.unwrap_or_else(Utc::now)
    }
}

/// Sole writer of the registry and history.
pub struct Engine {
    registry: Arc<DeviceRegistry>,
    history: Arc<HistoryLog>,
    bus: EventBus,
    grace: GraceScheduler,
}

impl Engine {
    pub fn new(
        registry: Arc<DeviceRegistry>,
        history: Arc<HistoryLog>,
        bus: EventBus,
        grace_period: Duration,
    ) -> Self {
        Self {
            registry,
            history,
            bus,
            grace: GraceScheduler::new(grace_period),
        }
    }

    /// Diff a full snapshot against the live set and apply the result.
    /// Returns the applied lifecycle transitions.
    pub fn apply_snapshot(&self, records: Vec<DeviceRecord>) -> Vec<Transition> {
        let now = Utc::now();
        let records: Vec<DeviceRecord> = records
            .into_iter()
            .map(|mut record| {
                record.normalize();
                record
            })
            .collect();

        let live = self.registry.snapshot();
        let diff = compute_diff(&live, &records);
        debug!(
            seen = records.len(),
            added = diff.added.len(),
            removed = diff.removed.len(),
            reconnected = diff.reconnected.len(),
            "snapshot diffed"
        );

        let mut transitions = Vec::new();
        for id in &diff.removed {
            if let Some(stored) = live.iter().find(|record| &record.id == id) {
                transitions.push(Transition::Disconnect(disconnected(stored, now)));
            }
        }
        for record in diff.added {
            transitions.push(Transition::Connect(connected(record, now)));
        }
        for record in diff.reconnected {
            self.grace.cancel(&record.id);
            transitions.push(Transition::Connect(connected(record, now)));
        }

        self.registry.touch(&diff.retained, now);
        self.commit(&transitions);
        transitions
    }

    /// Apply one pushed arrival.
    pub fn apply_added(&self, mut record: DeviceRecord) -> Option<Transition> {
        record.normalize();
        let now = Utc::now();

        match self.registry.get(&record.id) {
            Some(stored) if stored.status.is_attached() => {
                self.registry.touch(&[record.id], now);
                None
            }
            Some(_) => {
                self.grace.cancel(&record.id);
                Some(self.commit_one(Transition::Connect(connected(record, now))))
            }
            None => Some(self.commit_one(Transition::Connect(connected(record, now)))),
        }
    }

    /// Apply one pushed removal. Ids that are unknown or already
    /// disconnected produce nothing.
    pub fn apply_removed(&self, id: &str) -> Option<Transition> {
        match self.registry.get(id) {
            Some(stored) if stored.status.is_attached() => {
                let transition = Transition::Disconnect(disconnected(&stored, Utc::now()));
                Some(self.commit_one(transition))
            }
            _ => {
                debug!(device_id = %id, "ignoring removal of untracked device");
                None
            }
        }
    }

    /// Hard reset: cancel every grace timer and empty the live set.
    /// History is kept.
    pub fn reset(&self) {
        self.grace.cancel_all();
        self.registry.clear();
    }

    pub fn pending_removals(&self) -> usize {
        self.grace.pending_count()
    }

    // ── Private helpers ──────────────────────────────────────────────

    fn commit_one(&self, transition: Transition) -> Transition {
        self.commit(std::slice::from_ref(&transition));
        transition
    }

    fn commit(&self, transitions: &[Transition]) {
        self.registry.apply(transitions);

        for transition in transitions {
            let device = transition.device();
            let event_type = transition.event_type();
            let timestamp = transition.timestamp();

            self.history
                .append(HistoryEntry::new(event_type, device, timestamp));
            self.bus.publish(event_type.into(), device, timestamp);

            match transition {
                Transition::Connect(record) => {
                    info!(
                        device_id = %record.id,
                        usb_id = %record.usb_id(),
                        product = %record.product_name,
                        status = %record.status,
                        "device connected"
                    );
                }
                Transition::Disconnect(record) => {
                    info!(
                        device_id = %record.id,
                        usb_id = %record.usb_id(),
                        product = %record.product_name,
                        "device disconnected"
                    );
                    self.schedule_eviction(&record.id);
                }
            }
        }
    }

    fn schedule_eviction(&self, id: &str) {
        let registry = Arc::clone(&self.registry);
        let device_id = id.to_owned();
        self.grace.schedule(id, move || {
            if registry.evict(&device_id) {
                debug!(%device_id, "grace period elapsed, device removed from live set");
            }
        });
    }
}

fn connected(mut record: DeviceRecord, now: DateTime<Utc>) -> DeviceRecord {
    if !record.status.is_attached() {
        record.status = DeviceStatus::Connected;
    }
    record.connected_at = Some(now);
    record.disconnected_at = None;
    record.last_seen = Some(now);
    record
}

fn disconnected(stored: &DeviceRecord, now: DateTime<Utc>) -> DeviceRecord {
    let mut record = stored.clone();
    record.status = DeviceStatus::Disconnected;
    record.disconnected_at = Some(now);
    record
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::model::DeviceEventKind;
    use pretty_assertions::assert_eq;

    struct Fixture {
        engine: Engine,
        registry: Arc<DeviceRegistry>,
        history: Arc<HistoryLog>,
        bus: EventBus,
    }

    fn fixture() -> Fixture {
        let registry = Arc::new(DeviceRegistry::new());
        let history = Arc::new(HistoryLog::new(100));
        let bus = EventBus::new(64);
        let engine = Engine::new(
            Arc::clone(&registry),
            Arc::clone(&history),
            bus.clone(),
            Duration::from_secs(5),
        );
        Fixture {
            engine,
            registry,
            history,
            bus,
        }
    }

    fn device(vid: u16) -> DeviceRecord {
        DeviceRecord::detected(vid, 0x0001, Some(format!("S{vid}")), None)
    }

    #[tokio::test(start_paused = true)]
    async fn connect_then_disconnect_then_evict() {
        let f = fixture();
        let mut events = f.bus.subscribe();
        let keyboard = device(0x046d);

        let applied = f.engine.apply_snapshot(vec![keyboard.clone()]);
        assert_eq!(applied.len(), 1);
        assert_eq!(events.recv().await.unwrap().kind, DeviceEventKind::DeviceConnected);

        let stored = f.registry.get(&keyboard.id).unwrap();
        assert_eq!(stored.status, DeviceStatus::Connected);
        assert!(stored.connected_at.is_some());

        let applied = f.engine.apply_snapshot(vec![]);
        assert_eq!(applied.len(), 1);
        assert_eq!(
            events.recv().await.unwrap().kind,
            DeviceEventKind::DeviceDisconnected
        );

        let stored = f.registry.get(&keyboard.id).unwrap();
        assert_eq!(stored.status, DeviceStatus::Disconnected);
        assert!(stored.disconnected_at.is_some());

        // Still pending: another empty poll must not disconnect twice.
        assert!(f.engine.apply_snapshot(vec![]).is_empty());

        tokio::time::sleep(Duration::from_secs(6)).await;
        assert!(f.registry.get(&keyboard.id).is_none());
        assert_eq!(f.history.len(), 2);
        assert_eq!(f.history.recent(1)[0].event_type, EventType::Disconnect);
    }

    #[tokio::test(start_paused = true)]
    async fn reconnect_during_grace_cancels_removal() {
        let f = fixture();
        let stick = device(0x0951);

        f.engine.apply_snapshot(vec![stick.clone()]);
        f.engine.apply_snapshot(vec![]);
        assert_eq!(f.engine.pending_removals(), 1);

        tokio::time::sleep(Duration::from_secs(2)).await;
        let applied = f.engine.apply_snapshot(vec![stick.clone()]);
        assert_eq!(applied.len(), 1);
        assert!(matches!(applied[0], Transition::Connect(_)));
        assert_eq!(f.engine.pending_removals(), 0);

        tokio::time::sleep(Duration::from_secs(10)).await;
        let stored = f.registry.get(&stick.id).unwrap();
        assert_eq!(stored.status, DeviceStatus::Connected);
        assert_eq!(f.history.len(), 3);
    }

    #[tokio::test]
    async fn unchanged_snapshot_is_quiet() {
        let f = fixture();
        let devices = vec![device(1), device(2)];
        assert_eq!(f.engine.apply_snapshot(devices.clone()).len(), 2);

        let version = f.registry.version();
        assert!(f.engine.apply_snapshot(devices).is_empty());
        assert_eq!(f.registry.version(), version);
        assert_eq!(f.history.len(), 2);
    }

    #[tokio::test]
    async fn error_records_disconnect_like_connected_ones() {
        let f = fixture();
        let mut degraded = device(0x1234);
        degraded.status = DeviceStatus::Error;

        f.engine.apply_snapshot(vec![degraded.clone()]);
        assert_eq!(
            f.registry.get(&degraded.id).unwrap().status,
            DeviceStatus::Error
        );

        let applied = f.engine.apply_snapshot(vec![]);
        assert_eq!(applied.len(), 1);
        assert!(matches!(applied[0], Transition::Disconnect(_)));
    }

    #[tokio::test]
    async fn pushed_events_follow_the_same_rules() {
        let f = fixture();
        let mouse = device(0x046d);

        assert!(f.engine.apply_added(mouse.clone()).is_some());
        assert!(f.engine.apply_added(mouse.clone()).is_none());

        assert!(f.engine.apply_removed(&mouse.id).is_some());
        assert!(f.engine.apply_removed(&mouse.id).is_none());
        assert!(f.engine.apply_removed("never-seen").is_none());

        assert!(f.engine.apply_added(mouse).is_some());
        assert_eq!(f.history.len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn reset_clears_live_set_and_timers() {
        let f = fixture();
        f.engine.apply_snapshot(vec![device(1), device(2)]);
        f.engine.apply_snapshot(vec![device(1)]);
        assert_eq!(f.engine.pending_removals(), 1);

        f.engine.reset();
        assert!(f.registry.is_empty());
        assert_eq!(f.engine.pending_removals(), 0);
        assert_eq!(f.history.len(), 3);
    }
}
