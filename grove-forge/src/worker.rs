//! The leader-elected background furnace worker (§4.6 context 2).

use crate::advance::advance;
use crate::store::{ForgeError, ForgeStateStore};
use grove_lock::{KeyValueStore, LockService};
use grove_utils::Clock;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Skip a furnace whose last update is more recent than this; avoids wasted writes on furnaces
/// another tick just touched.
const MIN_ADVANCE_GAP_MS: i64 = 250;

/// Key of the process-wide leader lock (§4.6).
const WORKER_LOCK_KEY: &str = "lock:forge:worker";

/// The lock service's reentrant "guest id" for this worker; any fixed string works since only one
/// logical actor (the furnace worker) ever contends for this specific key.
const WORKER_IDENTITY: &str = "forge-worker";

/// Default worker-lock TTL (§6.4 `FORGE_WORKER_LOCK_TTL_SECS`).
pub const DEFAULT_WORKER_LOCK_TTL: Duration = Duration::from_secs(5);

/// Default per-scan furnace limit (§6.4 `FORGE_WORKER_SCAN_LIMIT`).
pub const DEFAULT_SCAN_LIMIT: usize = 200;

/// Scans up to `scan_limit` enabled furnaces once per second, advancing each by its elapsed
/// wall-clock time, while this replica holds the worker lock. Runs only while a `SHARED_REDIS_URL`
/// is configured; in degraded (single-replica, no Redis) deployments this task is never spawned
/// and furnace state only ever advances via [`crate::catchup::catch_up`] (§4.6 supplementary
/// detail, §9 Open Question 3).
pub struct ForgeWorker<S, K, C> {
    store: Arc<S>,
    locks: Arc<LockService<K>>,
    clock: Arc<C>,
    scan_limit: usize,
}

impl<S, K, C> ForgeWorker<S, K, C>
where
    S: ForgeStateStore,
    K: KeyValueStore,
    C: Clock,
{
    /// Builds a worker with the default scan limit.
    #[must_use]
    pub fn new(store: Arc<S>, locks: Arc<LockService<K>>, clock: Arc<C>) -> Self {
        Self::with_scan_limit(store, locks, clock, DEFAULT_SCAN_LIMIT)
    }

    /// Builds a worker with an explicit scan limit.
    #[must_use]
    pub fn with_scan_limit(
        store: Arc<S>,
        locks: Arc<LockService<K>>,
        clock: Arc<C>,
        scan_limit: usize,
    ) -> Self {
        Self {
            store,
            locks,
            clock,
            scan_limit,
        }
    }

    /// Runs the 1 Hz scan loop until `cancel` fires. Loss of leadership mid-scan is safe: each
    /// furnace row update stands on its own.
    pub async fn run(&self, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(Duration::from_secs(1));
        loop {
            tokio::select! {
                () = cancel.cancelled() => {
                    tracing::info!("forge worker shutting down");
                    break;
                }
                _ = ticker.tick() => {
                    if self.acquire_leadership().await {
                        if let Err(err) = self.scan_once().await {
                            tracing::warn!(error = %err, "forge worker scan failed");
                        }
                    }
                }
            }
        }
    }

    async fn acquire_leadership(&self) -> bool {
        self.locks.acquire(WORKER_LOCK_KEY, WORKER_IDENTITY).await.is_ok()
    }

    async fn scan_once(&self) -> Result<(), ForgeError> {
        let due = self.store.list_enabled(self.scan_limit).await?;
        for (world_id, forge_id) in due {
            let (state, updated_at_ms) = self.store.get(&world_id, &forge_id).await?;
            let now_ms = self.clock.now_ms();
            let gap_ms = now_ms - updated_at_ms;
            if gap_ms < MIN_ADVANCE_GAP_MS {
                continue;
            }
            let next = advance(&state, gap_ms as f64 / 1000.0);
            self.store.put(&world_id, &forge_id, &next, now_ms).await?;
        }
        Ok(())
    }
}
