//! USB device detection and lifecycle tracking.
//!
//! This crate owns the detection engine behind the `usbwatch` CLI:
//!
//! - **[`Monitor`]**: Facade over one engine. [`Monitor::new()`] probes the
//!   available substrates once and fixes a [`DetectionStrategy`];
//!   [`start()`](Monitor::start) takes an initial snapshot and spawns either a
//!   poll loop or a hotplug event consumer; [`stop()`](Monitor::stop) cancels
//!   both and clears the live set.
//!
//! - **Substrates** ([`substrate`]): Native hotplug events and native
//!   enumeration via libusb (`libusb` feature), plus the always-available
//!   command fallback that parses `lsusb`, `system_profiler` or `wmic` output
//!   ([`parse`]).
//!
//! - **Lifecycle** ([`lifecycle`]): Pure snapshot diffing, the apply step
//!   that feeds the [`DeviceRegistry`], [`HistoryLog`] and [`EventBus`] in
//!   order, and cancellable grace-period removal.
//!
//! - **Storage** ([`storage`]): Maps a live mass-storage device to the
//!   path its volume is mounted at.
//!
//! The crate performs no configuration I/O; hosts build a [`MonitorConfig`].

pub mod config;
pub mod error;
pub mod events;
pub mod exec;
pub mod lifecycle;
pub mod model;
pub mod monitor;
pub mod parse;
pub mod platform;
pub mod storage;
pub mod store;
pub mod stream;
pub mod substrate;

// ── Primary re-exports ──────────────────────────────────────────────
pub use config::{DEFAULT_HISTORY_CAPACITY, MonitorConfig};
pub use error::CoreError;
pub use events::EventBus;
pub use exec::{CommandOutput, CommandRunner, SystemCommandRunner};
pub use lifecycle::{Engine, SnapshotDiff, Transition, compute_diff};
pub use monitor::{DEFAULT_HISTORY_LIMIT, Monitor};
pub use platform::Platform;
pub use storage::StorageResolver;
pub use store::{DeviceRegistry, HistoryLog};
pub use stream::{DeviceSnapshot, DeviceStream};
pub use substrate::{Enumerator, HotplugSource, Substrate};

pub use model::{
    BusLocation, DetectionStrategy, DeviceEvent, DeviceEventKind, DeviceRecord, DeviceStatus,
    EventType, HistoryEntry, MonitorStatus, SubstrateAvailability, UNKNOWN,
};
