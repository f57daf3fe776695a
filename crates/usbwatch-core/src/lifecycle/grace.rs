// ── Grace-period removal timers ──
//
// One cancellable delayed task per device id. Rescheduling an id
// supersedes its previous timer.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use dashmap::DashMap;
use tokio_util::sync::CancellationToken;
use tracing::trace;

/// Delayed, cancellable removal keyed by device id.
pub struct GraceScheduler {
    period: Duration,
    generation: AtomicU64,
    pending: Arc<DashMap<String, (u64, CancellationToken)>>,
}

impl GraceScheduler {
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            generation: AtomicU64::new(0),
            pending: Arc::new(DashMap::new()),
        }
    }

    /// Run `on_expire` once the grace period elapses, unless cancelled
    /// first. Must be called from within a Tokio runtime.
    pub fn schedule<F>(&self, id: &str, on_expire: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.cancel(id);

        let generation = self.generation.fetch_add(1, Ordering::Relaxed);
        let token = CancellationToken::new();
        self.pending
            .insert(id.to_owned(), (generation, token.clone()));

        let pending = Arc::clone(&self.pending);
        let id = id.to_owned();
        let period = self.period;

        tokio::spawn(async move {
            tokio::select! {
                biased;
                () = token.cancelled() => {
                    trace!(device_id = %id, "grace timer cancelled");
                }
                () = tokio::time::sleep(period) => {
                    // A newer timer for the same id owns the slot; let it decide.
                    if pending.remove_if(&id, |_, (g, _)| *g == generation).is_some() {
                        on_expire();
                    }
                }
            }
        });
    }

    /// Cancel the pending timer for `id`. Returns whether one existed.
    pub fn cancel(&self, id: &str) -> bool {
        match self.pending.remove(id) {
            Some((_, (_, token))) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    /// Cancel every pending timer.
    pub fn cancel_all(&self) {
        let ids: Vec<String> = self.pending.iter().map(|e| e.key().clone()).collect();
        for id in ids {
            self.cancel(&id);
        }
    }

    pub fn is_pending(&self, id: &str) -> bool {
        self.pending.contains_key(id)
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }
}

impl Drop for GraceScheduler {
    fn drop(&mut self) {
        self.cancel_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn counter() -> (Arc<AtomicUsize>, impl FnOnce() + Send + 'static) {
        let count = Arc::new(AtomicUsize::new(0));
        let hit = Arc::clone(&count);
        (count, move || {
            hit.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[tokio::test(start_paused = true)]
    async fn fires_after_period() {
        let grace = GraceScheduler::new(Duration::from_secs(5));
        let (count, on_expire) = counter();
        grace.schedule("a", on_expire);

        tokio::time::sleep(Duration::from_secs(4)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);
        assert!(grace.is_pending("a"));

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert!(!grace.is_pending("a"));
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_timer_never_fires() {
        let grace = GraceScheduler::new(Duration::from_secs(5));
        let (count, on_expire) = counter();
        grace.schedule("a", on_expire);

        assert!(grace.cancel("a"));
        assert!(!grace.cancel("a"));

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn rescheduling_supersedes_previous_timer() {
        let grace = GraceScheduler::new(Duration::from_secs(5));
        let (first, first_expire) = counter();
        let (second, second_expire) = counter();

        grace.schedule("a", first_expire);
        tokio::time::sleep(Duration::from_secs(3)).await;
        grace.schedule("a", second_expire);

        tokio::time::sleep(Duration::from_secs(3)).await;
        assert_eq!(first.load(Ordering::SeqCst), 0);
        assert_eq!(second.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_secs(3)).await;
        assert_eq!(second.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_all_clears_everything() {
        let grace = GraceScheduler::new(Duration::from_secs(5));
        let (count, a) = counter();
        let b = {
            let hit = Arc::clone(&count);
            move || {
                hit.fetch_add(1, Ordering::SeqCst);
            }
        };
        grace.schedule("a", a);
        grace.schedule("b", b);
        assert_eq!(grace.pending_count(), 2);

        grace.cancel_all();
        assert_eq!(grace.pending_count(), 0);

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }
}
