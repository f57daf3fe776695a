// ── Native substrates (libusb) ──
//
// `LibusbEnumerator` lists devices and reads their string descriptors on
// every poll. `LibusbHotplug` registers a libusb hotplug callback and
// drives `handle_events` on a dedicated thread.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};
use std::thread;
use std::time::Duration;

use async_trait::async_trait;
use rusb::{Context, Device, Hotplug, HotplugBuilder, Registration, UsbContext};
use tracing::{debug, error, info, warn};

use super::{AddCallback, Enumerator, HotplugSource, RemoveCallback};
use crate::error::CoreError;
use crate::model::{BusLocation, DetectionStrategy, DeviceRecord, DeviceStatus};

const EVENT_POLL_TIMEOUT: Duration = Duration::from_millis(100);

// ── Probing ──────────────────────────────────────────────────────────

/// libusb loads and a context can be created.
pub(super) fn probe_enumeration() -> bool {
    match Context::new() {
        Ok(_) => true,
        Err(e) => {
            let unavailable = CoreError::ProbeUnavailable {
                substrate: "libusb".into(),
                reason: e.to_string(),
            };
            debug!(error = %unavailable, "native enumeration unavailable");
            false
        }
    }
}

/// libusb was built with hotplug support on this platform.
pub(super) fn probe_hotplug() -> bool {
    if !rusb::has_hotplug() {
        let unavailable = CoreError::ProbeUnavailable {
            substrate: "libusb hotplug".into(),
            reason: "libusb reports no hotplug capability".into(),
        };
        debug!(error = %unavailable, "native events unavailable");
        return false;
    }
    probe_enumeration()
}

// ── Descriptor reads ─────────────────────────────────────────────────

type DeviceKey = (u8, u8);

/// String descriptors read through an opened handle.
#[derive(Debug, Default)]
struct Strings {
    serial: Option<String>,
    manufacturer: Option<String>,
    product: Option<String>,
}

/// Raw result of examining one device. `opened` carries the open error
/// when the device could not be opened.
#[derive(Debug)]
struct Reading {
    vendor_id: u16,
    product_id: u16,
    location: BusLocation,
    opened: Result<Strings, String>,
}

impl Reading {
    fn key(&self) -> DeviceKey {
        (self.location.bus_number, self.location.device_address)
    }

    /// Build the record. `known` is the id issued earlier for this bus
    /// location; it is reused when it names the same vendor/product pair,
    /// so a failed open or serial read does not change identity.
    fn into_record(self, known: Option<&str>) -> DeviceRecord {
        let (serial, strings, failure) = match self.opened {
            Ok(mut strings) => (strings.serial.take(), strings, None),
            Err(reason) => (None, Strings::default(), Some(reason)),
        };

        let mut record =
            DeviceRecord::detected(self.vendor_id, self.product_id, serial, Some(self.location));
        if let Some(manufacturer) = strings.manufacturer {
            record = record.with_manufacturer(manufacturer);
        }
        if let Some(product) = strings.product {
            record = record.with_product_name(product);
        }

        if let Some(reason) = failure {
            let failure = CoreError::DescriptorReadFailure {
                vendor_id: self.vendor_id,
                product_id: self.product_id,
                reason,
            };
            debug!(error = %failure, location = %self.location, "recording degraded device");
            record.status = DeviceStatus::Error;
        }

        if let Some(id) = known.filter(|id| *id != record.id && names_same_model(id, &record)) {
            debug!(issued = id, fresh = %record.id, "keeping id issued for this location");
            record.id = id.to_owned();
        }
        record
    }
}

fn names_same_model(id: &str, record: &DeviceRecord) -> bool {
    id.strip_prefix(record.usb_id().as_str())
        .is_some_and(|rest| rest.is_empty() || rest.starts_with([':', '@']))
}

/// Examine a libusb device. `None` when even the device descriptor is
/// unreadable.
fn examine<T: UsbContext>(device: &Device<T>) -> Option<Reading> {
    let descriptor = match device.device_descriptor() {
        Ok(descriptor) => descriptor,
        Err(e) => {
            warn!(
                bus = device.bus_number(),
                address = device.address(),
                error = %e,
                "skipping device without a readable device descriptor"
            );
            return None;
        }
    };

    // Devices without a serial string report an error on that read; that
    // only means identity falls back to the bus location.
    let opened = device
        .open()
        .map(|handle| Strings {
            serial: handle.read_serial_number_string_ascii(&descriptor).ok(),
            manufacturer: handle.read_manufacturer_string_ascii(&descriptor).ok(),
            product: handle.read_product_string_ascii(&descriptor).ok(),
        })
        .map_err(|e| e.to_string());

    Some(Reading {
        vendor_id: descriptor.vendor_id(),
        product_id: descriptor.product_id(),
        location: BusLocation::new(device.bus_number(), device.address()),
        opened,
    })
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// (bus, address) → id issued while the device stays at that location.
/// A departed device can no longer be opened, so its id must be
/// remembered for the removal notice too.
#[derive(Debug, Default, Clone)]
struct IdCache(Arc<Mutex<HashMap<DeviceKey, String>>>);

impl IdCache {
    /// Records for a full listing. Locations absent from it are forgotten.
    fn assign_all(&self, readings: Vec<Reading>) -> Vec<DeviceRecord> {
        let mut ids = lock(&self.0);
        let mut next = HashMap::with_capacity(readings.len());
        let records: Vec<DeviceRecord> = readings
            .into_iter()
            .map(|reading| {
                let key = reading.key();
                let record = reading.into_record(ids.get(&key).map(String::as_str));
                next.insert(key, record.id.clone());
                record
            })
            .collect();
        *ids = next;
        records
    }

    fn assign(&self, reading: Reading) -> DeviceRecord {
        let key = reading.key();
        let mut ids = lock(&self.0);
        let record = reading.into_record(ids.get(&key).map(String::as_str));
        ids.insert(key, record.id.clone());
        record
    }

    fn forget(&self, key: DeviceKey) -> Option<String> {
        lock(&self.0).remove(&key)
    }
}

fn scan(ids: &IdCache) -> Result<Vec<DeviceRecord>, CoreError> {
    let devices = rusb::devices()?;
    let readings = devices.iter().filter_map(|device| examine(&device)).collect();
    Ok(ids.assign_all(readings))
}

async fn scan_blocking(ids: IdCache) -> Result<Vec<DeviceRecord>, CoreError> {
    tokio::task::spawn_blocking(move || scan(&ids))
        .await
        .map_err(|e| CoreError::Internal(format!("libusb scan task failed: {e}")))?
}

// ── Native poll ──────────────────────────────────────────────────────

/// Polling enumerator over the libusb device list.
#[derive(Debug, Default)]
pub struct LibusbEnumerator {
    ids: IdCache,
}

impl LibusbEnumerator {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Enumerator for LibusbEnumerator {
    fn strategy(&self) -> DetectionStrategy {
        DetectionStrategy::NativePoll
    }

    async fn enumerate(&self) -> Result<Vec<DeviceRecord>, CoreError> {
        scan_blocking(self.ids.clone()).await
    }
}

// ── Native event ─────────────────────────────────────────────────────

#[derive(Default)]
struct Shared {
    on_add: RwLock<Vec<AddCallback>>,
    on_remove: RwLock<Vec<RemoveCallback>>,
    ids: IdCache,
}

impl Shared {
    fn arrived(&self, device: &Device<Context>) {
        let Some(reading) = examine(device) else {
            return;
        };
        let record = self.ids.assign(reading);

        let callbacks = self
            .on_add
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        for callback in callbacks {
            callback(record.clone());
        }
    }

    fn left(&self, key: DeviceKey) {
        let Some(id) = self.ids.forget(key) else {
            debug!(bus = key.0, address = key.1, "removal for untracked device");
            return;
        };

        let callbacks = self
            .on_remove
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        for callback in callbacks {
            callback(id.clone());
        }
    }
}

enum Notice {
    Arrived(Device<Context>),
    Left(DeviceKey),
}

/// Registered with libusb. Callbacks only enqueue; descriptor reads
/// happen on the event thread outside the callback.
struct QueueingHandler {
    tx: mpsc::Sender<Notice>,
}

impl Hotplug<Context> for QueueingHandler {
    fn device_arrived(&mut self, device: Device<Context>) {
        let _ = self.tx.send(Notice::Arrived(device));
    }

    fn device_left(&mut self, device: Device<Context>) {
        let _ = self
            .tx
            .send(Notice::Left((device.bus_number(), device.address())));
    }
}

struct PushSession {
    _registration: Registration<Context>,
    stop: Arc<AtomicBool>,
}

/// Event-driven substrate built on libusb hotplug callbacks.
#[derive(Default)]
pub struct LibusbHotplug {
    shared: Arc<Shared>,
    session: Mutex<Option<PushSession>>,
}

impl LibusbHotplug {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl HotplugSource for LibusbHotplug {
    async fn initial_snapshot(&self) -> Result<Vec<DeviceRecord>, CoreError> {
        scan_blocking(self.shared.ids.clone()).await
    }

    fn on_add(&self, callback: AddCallback) {
        self.shared
            .on_add
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(callback);
    }

    fn on_remove(&self, callback: RemoveCallback) {
        self.shared
            .on_remove
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(callback);
    }

    fn start_push(&self) -> Result<(), CoreError> {
        let mut session = lock(&self.session);
        if session.is_some() {
            warn!("hotplug delivery already running");
            return Ok(());
        }

        let context = Context::new()?;
        let (tx, rx) = mpsc::channel();
        let registration = HotplugBuilder::new()
            .enumerate(false)
            .register(&context, Box::new(QueueingHandler { tx }))?;

        let stop = Arc::new(AtomicBool::new(false));
        let thread_stop = Arc::clone(&stop);
        let shared = Arc::clone(&self.shared);

        thread::Builder::new()
            .name("usbwatch-hotplug".into())
            .spawn(move || {
                info!("hotplug event thread started");
                while !thread_stop.load(Ordering::Relaxed) {
                    match context.handle_events(Some(EVENT_POLL_TIMEOUT)) {
                        Ok(()) => {}
                        Err(rusb::Error::Interrupted) => break,
                        Err(e) => {
                            error!(error = %e, "libusb event handling failed");
                            thread::sleep(EVENT_POLL_TIMEOUT);
                        }
                    }
                    if thread_stop.load(Ordering::Relaxed) {
                        break;
                    }
                    for notice in rx.try_iter() {
                        match notice {
                            Notice::Arrived(device) => shared.arrived(&device),
                            Notice::Left(key) => shared.left(key),
                        }
                    }
                }
                info!("hotplug event thread stopped");
            })
            .map_err(|e| CoreError::Internal(format!("spawning hotplug thread: {e}")))?;

        *session = Some(PushSession {
            _registration: registration,
            stop,
        });
        Ok(())
    }

    fn stop_push(&self) {
        if let Some(session) = lock(&self.session).take() {
            session.stop.store(true, Ordering::Relaxed);
            debug!("hotplug delivery stopped");
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn reading(address: u8, opened: Result<Strings, String>) -> Reading {
        Reading {
            vendor_id: 0x0951,
            product_id: 0x1666,
            location: BusLocation::new(1, address),
            opened,
        }
    }

    fn with_serial(serial: &str) -> Result<Strings, String> {
        Ok(Strings {
            serial: Some(serial.into()),
            manufacturer: Some("Kingston".into()),
            product: Some("DataTraveler".into()),
        })
    }

    #[test]
    fn failed_open_keeps_the_id_issued_for_the_location() {
        let ids = IdCache::default();

        let first = ids.assign_all(vec![reading(7, with_serial("X"))]);
        assert_eq!(first[0].id, "0951:1666:X");
        assert_eq!(first[0].status, DeviceStatus::Connected);

        let busy = ids.assign_all(vec![reading(7, Err("Resource busy".into()))]);
        assert_eq!(busy[0].id, "0951:1666:X");
        assert_eq!(busy[0].status, DeviceStatus::Error);

        let recovered = ids.assign_all(vec![reading(7, with_serial("X"))]);
        assert_eq!(recovered[0].id, "0951:1666:X");
    }

    #[test]
    fn id_survives_a_degraded_first_read() {
        let ids = IdCache::default();
        let first = ids.assign(reading(7, Err("Access denied".into())));
        assert_eq!(first.id, "0951:1666@001-007");

        let later = ids.assign_all(vec![reading(7, with_serial("X"))]);
        assert_eq!(later[0].id, first.id);
        assert_eq!(later[0].serial_number.as_deref(), Some("X"));
    }

    #[test]
    fn unknown_or_vacated_locations_get_fresh_ids() {
        let ids = IdCache::default();
        ids.assign_all(vec![reading(7, with_serial("X"))]);

        // Location 7 disappears from the listing and is forgotten.
        ids.assign_all(vec![reading(8, with_serial("Y"))]);
        let reused = ids.assign_all(vec![reading(7, Err("Resource busy".into()))]);
        assert_eq!(reused[0].id, "0951:1666@001-007");
    }

    #[test]
    fn different_model_at_a_known_location_is_not_merged() {
        let ids = IdCache::default();
        ids.assign_all(vec![reading(7, with_serial("X"))]);

        let mut other = reading(7, Err("Resource busy".into()));
        other.product_id = 0x1667;
        let records = ids.assign_all(vec![other]);
        assert_eq!(records[0].id, "0951:1667@001-007");
    }

    #[test]
    fn removal_resolves_to_id_issued_on_arrival() {
        let shared = Shared::default();
        let removed: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&removed);
        shared
            .on_remove
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Arc::new(move |id: String| sink.lock().unwrap().push(id)));

        shared.ids.assign_all(vec![reading(7, with_serial("SERIAL1"))]);

        shared.left((1, 7));
        shared.left((1, 7));
        shared.left((2, 3));

        assert_eq!(*removed.lock().unwrap(), vec!["0951:1666:SERIAL1".to_owned()]);
    }

    #[test]
    fn stop_without_start_is_a_no_op() {
        let source = LibusbHotplug::new();
        source.stop_push();
        source.stop_push();
    }
}
