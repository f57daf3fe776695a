// ── Live-set subscriptions ──
//
// Point-in-time access to the registry's live set plus notification when
// a lifecycle change rebuilds it.

use std::sync::Arc;

use tokio::sync::watch;

use crate::model::DeviceRecord;

/// Shared, immutable view of the live set at one point in time.
pub type DeviceSnapshot = Arc<Vec<Arc<DeviceRecord>>>;

/// A subscription to the live device set. `last_seen` refreshes do not
/// count as changes; connects, disconnects and evictions do.
pub struct DeviceStream {
    current: DeviceSnapshot,
    receiver: watch::Receiver<DeviceSnapshot>,
}

impl DeviceStream {
    pub(crate) fn new(receiver: watch::Receiver<DeviceSnapshot>) -> Self {
        let current = receiver.borrow().clone();
        Self { current, receiver }
    }

    /// Snapshot captured at creation time or at the last `changed()`.
    pub fn current(&self) -> &DeviceSnapshot {
        &self.current
    }

    /// Wait for the next change, returning the new snapshot.
    /// Returns `None` once the registry has been dropped.
    pub async fn changed(&mut self) -> Option<DeviceSnapshot> {
        self.receiver.changed().await.ok()?;
        let snap = self.receiver.borrow_and_update().clone();
        self.current = snap.clone();
        Some(snap)
    }
}
