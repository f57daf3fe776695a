// ── Detection substrates ──
//
// A substrate is a concrete source of USB device information. Polling
// substrates expose `Enumerator`; event-driven ones expose
// `HotplugSource`. The lifecycle engine is fed identically from either.

mod command;
#[cfg(feature = "libusb")]
mod libusb;
mod selector;

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::CoreError;
use crate::model::{DetectionStrategy, DeviceRecord};

pub use command::CommandEnumerator;
#[cfg(feature = "libusb")]
pub use libusb::{LibusbEnumerator, LibusbHotplug};
pub use selector::{build_substrate, probe_substrates, select_strategy};

/// One-shot, restartable device enumeration. Each call re-queries the
/// substrate from scratch.
#[async_trait]
pub trait Enumerator: Send + Sync {
    fn strategy(&self) -> DetectionStrategy;

    async fn enumerate(&self) -> Result<Vec<DeviceRecord>, CoreError>;
}

/// Invoked with the normalized record of a newly attached device.
pub type AddCallback = Arc<dyn Fn(DeviceRecord) + Send + Sync>;

/// Invoked with the id (as issued on arrival) of a detached device.
pub type RemoveCallback = Arc<dyn Fn(String) + Send + Sync>;

/// Event-driven substrate: one initial snapshot, then discrete
/// add/remove notifications until `stop_push`.
#[async_trait]
pub trait HotplugSource: Send + Sync {
    async fn initial_snapshot(&self) -> Result<Vec<DeviceRecord>, CoreError>;

    fn on_add(&self, callback: AddCallback);

    fn on_remove(&self, callback: RemoveCallback);

    fn start_push(&self) -> Result<(), CoreError>;

    /// Stop delivering notifications. Calling it while stopped is a no-op.
    fn stop_push(&self);
}

/// The substrate the monitor drives for its whole lifetime.
#[derive(Clone)]
pub enum Substrate {
    Polling(Arc<dyn Enumerator>),
    Push(Arc<dyn HotplugSource>),
}

impl Substrate {
    pub fn strategy(&self) -> DetectionStrategy {
        match self {
            Self::Polling(enumerator) => enumerator.strategy(),
            Self::Push(_) => DetectionStrategy::NativeEvent,
        }
    }

    /// One full enumeration regardless of substrate kind.
    pub async fn snapshot(&self) -> Result<Vec<DeviceRecord>, CoreError> {
        match self {
            Self::Polling(enumerator) => enumerator.enumerate().await,
            Self::Push(source) => source.initial_snapshot().await,
        }
    }
}

impl fmt::Debug for Substrate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Substrate").field(&self.strategy()).finish()
    }
}
