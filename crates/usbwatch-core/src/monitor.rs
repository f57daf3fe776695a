// ── Monitor ──
//
// Query interface and lifecycle owner for one detection engine.
// Selects a substrate once, drives it (poll cycles or pushed hotplug
// events), and exposes the live set, history and event stream.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};

use tokio::sync::{Mutex, broadcast, mpsc};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::config::MonitorConfig;
use crate::error::CoreError;
use crate::events::EventBus;
use crate::exec::{CommandRunner, SystemCommandRunner};
use crate::lifecycle::{Engine, Transition};
use crate::model::{
    DetectionStrategy, DeviceEvent, DeviceRecord, HistoryEntry, MonitorStatus,
    SubstrateAvailability,
};
use crate::storage::StorageResolver;
use crate::store::{DeviceRegistry, HistoryLog};
use crate::stream::DeviceStream;
use crate::substrate::{HotplugSource, Substrate, build_substrate, probe_substrates, select_strategy};

/// History entries returned when the caller gives no limit.
pub const DEFAULT_HISTORY_LIMIT: usize = 50;

enum PushEvent {
    Added(DeviceRecord),
    Removed(String),
}

// ── Monitor ──────────────────────────────────────────────────────

/// The main entry point for consumers.
///
/// Cheaply cloneable. Background tasks hold clones until [`stop()`](Self::stop)
/// joins them, so always stop a started monitor.
#[derive(Clone)]
pub struct Monitor {
    inner: Arc<MonitorInner>,
}

struct MonitorInner {
    config: MonitorConfig,
    availability: SubstrateAvailability,
    substrate: Substrate,
    registry: Arc<DeviceRegistry>,
    history: Arc<HistoryLog>,
    bus: EventBus,
    engine: Engine,
    resolver: StorageResolver,
    created_at: Instant,
    active: AtomicBool,
    /// Bumped by `stop()`; cycle results from an older epoch are discarded.
    epoch: AtomicU64,
    /// Held for the whole of a cycle so cycles never overlap.
    cycle: Mutex<()>,
    cancel: CancellationToken,
    /// Child token for the current run, replaced on every start.
    cancel_child: Mutex<CancellationToken>,
    task_handles: Mutex<Vec<JoinHandle<()>>>,
    push_rx: Mutex<Option<mpsc::UnboundedReceiver<PushEvent>>>,
}

impl Monitor {
    /// Probe substrates, select a strategy and build the engine. Does not
    /// start monitoring; call [`start()`](Self::start).
    pub fn new(config: MonitorConfig) -> Result<Self, CoreError> {
        config.validate()?;

        let availability = probe_substrates();
        let strategy = select_strategy(&availability, config.preferred_strategy);
        info!(%strategy, platform = %config.platform, "detection strategy selected");

        let runner: Arc<dyn CommandRunner> =
            Arc::new(SystemCommandRunner::new(config.command_timeout));
        let substrate = build_substrate(strategy, config.platform, Arc::clone(&runner));

        Ok(Self::assemble(config, availability, substrate, runner))
    }

    /// Build a monitor around an explicit substrate and command runner,
    /// skipping probing.
    pub fn with_substrate(
        config: MonitorConfig,
        substrate: Substrate,
        runner: Arc<dyn CommandRunner>,
    ) -> Result<Self, CoreError> {
        config.validate()?;

        let strategy = substrate.strategy();
        let availability = SubstrateAvailability {
            native_event: strategy == DetectionStrategy::NativeEvent,
            native_poll: strategy == DetectionStrategy::NativePoll,
            command_poll: true,
        };
        Ok(Self::assemble(config, availability, substrate, runner))
    }

    fn assemble(
        config: MonitorConfig,
        availability: SubstrateAvailability,
        substrate: Substrate,
        runner: Arc<dyn CommandRunner>,
    ) -> Self {
        let registry = Arc::new(DeviceRegistry::new());
        let history = Arc::new(HistoryLog::new(config.history_capacity));
        let bus = EventBus::new(config.event_channel_size);
        let engine = Engine::new(
            Arc::clone(&registry),
            Arc::clone(&history),
            bus.clone(),
            config.grace_period,
        );
        let resolver = StorageResolver::new(config.platform, runner);

        let push_rx = match &substrate {
            Substrate::Push(source) => Some(wire_callbacks(source.as_ref())),
            Substrate::Polling(_) => None,
        };

        let cancel = CancellationToken::new();
        let cancel_child = cancel.child_token();

        Self {
            inner: Arc::new(MonitorInner {
                config,
                availability,
                substrate,
                registry,
                history,
                bus,
                engine,
                resolver,
                created_at: Instant::now(),
                active: AtomicBool::new(false),
                epoch: AtomicU64::new(0),
                cycle: Mutex::new(()),
                cancel,
                cancel_child: Mutex::new(cancel_child),
                task_handles: Mutex::new(Vec::new()),
                push_rx: Mutex::new(push_rx),
            }),
        }
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.inner.config
    }

    pub fn strategy(&self) -> DetectionStrategy {
        self.inner.substrate.strategy()
    }

    // ── Lifecycle ────────────────────────────────────────────────

    /// Take an initial snapshot and start background detection.
    /// Starting an active monitor is a no-op.
    pub async fn start(&self) -> Result<(), CoreError> {
        let mut handles = self.inner.task_handles.lock().await;
        if self.is_active() {
            debug!("monitoring already active");
            return Ok(());
        }

        let child = self.inner.cancel.child_token();
        *self.inner.cancel_child.lock().await = child.clone();
        self.inner.active.store(true, Ordering::SeqCst);

        match &self.inner.substrate {
            Substrate::Polling(_) => {
                if let Err(e) = self.refresh_device_list().await {
                    error!(error = %e, "initial enumeration failed");
                }
                let monitor = self.clone();
                handles.push(tokio::spawn(poll_task(
                    monitor,
                    self.inner.config.poll_interval,
                    child,
                )));
            }
            Substrate::Push(source) => {
                if let Err(e) = self.start_push(source.as_ref(), child, &mut handles).await {
                    self.inner.active.store(false, Ordering::SeqCst);
                    self.inner.engine.reset();
                    return Err(e);
                }
            }
        }

        info!(strategy = %self.strategy(), "monitoring started");
        Ok(())
    }

    async fn start_push(
        &self,
        source: &dyn HotplugSource,
        cancel: CancellationToken,
        handles: &mut Vec<JoinHandle<()>>,
    ) -> Result<(), CoreError> {
        let Some(mut rx) = self.inner.push_rx.lock().await.take() else {
            return Err(CoreError::Internal("hotplug receiver already in use".into()));
        };
        // Notifications queued before this run belong to a stopped session.
        while rx.try_recv().is_ok() {}

        // Registered before the snapshot: arrivals during the scan queue
        // up, and a device seen both ways is only touched the second time.
        if let Err(e) = source.start_push() {
            *self.inner.push_rx.lock().await = Some(rx);
            return Err(e);
        }
        if let Err(e) = self.refresh_device_list().await {
            source.stop_push();
            *self.inner.push_rx.lock().await = Some(rx);
            return Err(e);
        }

        handles.push(tokio::spawn(push_task(self.clone(), rx, cancel)));
        Ok(())
    }

    /// Stop background detection, cancel pending grace timers and clear
    /// the live set. History is kept. Stopping twice is a no-op.
    pub async fn stop(&self) {
        let mut handles = self.inner.task_handles.lock().await;
        if !self.inner.active.swap(false, Ordering::SeqCst) {
            return;
        }
        self.inner.epoch.fetch_add(1, Ordering::SeqCst);
        self.inner.cancel_child.lock().await.cancel();

        if let Substrate::Push(source) = &self.inner.substrate {
            source.stop_push();
        }

        for handle in handles.drain(..) {
            let _ = handle.await;
        }

        // Let an in-flight manual refresh finish (its result is discarded)
        // before the live set is cleared.
        let _guard = self.inner.cycle.lock().await;
        self.inner.engine.reset();
        info!("monitoring stopped");
    }

    pub fn is_active(&self) -> bool {
        self.inner.active.load(Ordering::SeqCst)
    }

    // ── Queries ──────────────────────────────────────────────────

    /// Live devices, including those still inside their grace period.
    pub fn list_devices(&self) -> Vec<DeviceRecord> {
        self.inner.registry.snapshot()
    }

    pub fn get_device(&self, id: &str) -> Option<DeviceRecord> {
        self.inner.registry.get(id)
    }

    /// Newest-first history; `None` means [`DEFAULT_HISTORY_LIMIT`].
    pub fn get_history(&self, limit: Option<usize>) -> Vec<HistoryEntry> {
        self.inner
            .history
            .recent(limit.unwrap_or(DEFAULT_HISTORY_LIMIT))
    }

    pub fn status(&self) -> MonitorStatus {
        MonitorStatus {
            monitoring_active: self.is_active(),
            strategy: self.strategy(),
            device_count: self.inner.registry.len(),
            history_count: self.inner.history.len(),
            substrate_availability: self.inner.availability,
            uptime_secs: self.inner.created_at.elapsed().as_secs(),
        }
    }

    /// Full re-enumeration and diff. Waits for any running cycle first.
    /// Returns the transitions it applied.
    pub async fn refresh_device_list(&self) -> Result<Vec<Transition>, CoreError> {
        let _guard = self.inner.cycle.lock().await;
        self.run_cycle().await
    }

    /// Mount path of a live mass-storage device.
    pub async fn resolve_storage_path(&self, id: &str) -> Result<String, CoreError> {
        let device = self
            .inner
            .registry
            .get(id)
            .filter(|device| device.status.is_attached())
            .ok_or_else(|| CoreError::DeviceNotFound {
                identifier: id.to_owned(),
            })?;
        self.inner.resolver.resolve(&device).await
    }

    // ── Subscriptions ────────────────────────────────────────────

    /// Lifecycle events in the order they were applied.
    pub fn events(&self) -> broadcast::Receiver<DeviceEvent> {
        self.inner.bus.subscribe()
    }

    /// Reactive view of the live set.
    pub fn devices(&self) -> DeviceStream {
        self.inner.registry.subscribe()
    }

    // ── Cycles ───────────────────────────────────────────────────

    /// Periodic cycle: skipped when the previous one is still running.
    async fn poll_cycle(&self) {
        let Ok(_guard) = self.inner.cycle.try_lock() else {
            debug!("previous poll cycle still running, skipping");
            return;
        };
        if let Err(e) = self.run_cycle().await {
            error!(error = %e, "poll cycle failed");
        }
    }

    /// Caller must hold the cycle lock.
    async fn run_cycle(&self) -> Result<Vec<Transition>, CoreError> {
        let epoch = self.inner.epoch.load(Ordering::SeqCst);
        let started = Instant::now();

        let records = self.inner.substrate.snapshot().await.map_err(|e| match e {
            CoreError::EnumerationFailure { .. } => e,
            other => CoreError::EnumerationFailure {
                message: other.to_string(),
            },
        })?;

        if self.inner.epoch.load(Ordering::SeqCst) != epoch {
            debug!("discarding enumeration that finished after stop");
            return Ok(Vec::new());
        }

        let transitions = self.inner.engine.apply_snapshot(records);
        debug!(
            transitions = transitions.len(),
            elapsed_ms = started.elapsed().as_millis(),
            "cycle complete"
        );
        Ok(transitions)
    }

    fn apply_push(&self, event: PushEvent) {
        match event {
            PushEvent::Added(record) => {
                self.inner.engine.apply_added(record);
            }
            PushEvent::Removed(id) => {
                self.inner.engine.apply_removed(&id);
            }
        }
    }
}

fn wire_callbacks(source: &dyn HotplugSource) -> mpsc::UnboundedReceiver<PushEvent> {
    let (tx, rx) = mpsc::unbounded_channel();

    let add_tx = tx.clone();
    source.on_add(Arc::new(move |record| {
        let _ = add_tx.send(PushEvent::Added(record));
    }));
    source.on_remove(Arc::new(move |id| {
        let _ = tx.send(PushEvent::Removed(id));
    }));

    rx
}

// ── Background tasks ─────────────────────────────────────────────

async fn poll_task(monitor: Monitor, period: Duration, cancel: CancellationToken) {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    interval.tick().await; // consume the immediate first tick

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            _ = interval.tick() => monitor.poll_cycle().await,
        }
    }
}

/// Apply pushed hotplug events one at a time, serialized with cycles.
/// Hands the receiver back on exit so the monitor can be restarted.
async fn push_task(
    monitor: Monitor,
    mut rx: mpsc::UnboundedReceiver<PushEvent>,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            event = rx.recv() => {
                let Some(event) = event else { break };
                let _guard = monitor.inner.cycle.lock().await;
                if cancel.is_cancelled() {
                    break;
                }
                monitor.apply_push(event);
            }
        }
    }

    *monitor.inner.push_rx.lock().await = Some(rx);
}

impl std::fmt::Debug for Monitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Monitor")
            .field("strategy", &self.strategy())
            .field("active", &self.is_active())
            .field("devices", &self.inner.registry.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_capacity_config_is_rejected() {
        let config = MonitorConfig {
            history_capacity: 0,
            ..MonitorConfig::default()
        };
        assert!(matches!(Monitor::new(config), Err(CoreError::Config { .. })));
    }
}
