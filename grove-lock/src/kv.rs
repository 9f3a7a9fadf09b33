//! The `KeyValueStore` abstraction (§4.5) and its in-process implementation.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Errors from a key-value backend.
#[derive(Debug, Error)]
pub enum KvError {
    /// The backend could not be reached (maps to `db_unavailable`/503 at the HTTP boundary).
    #[error("backend unavailable: {0}")]
    Unavailable(String),
}

/// The atomic primitives the lock service is built on (§4.5). Every operation here must be a
/// single round trip so two racing callers can never both believe they hold the same key.
pub trait KeyValueStore: Send + Sync {
    /// Sets `key` to `value` with `ttl` only if `key` is currently absent. Returns `true` iff the
    /// set happened.
    fn set_nx_ex(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
    ) -> impl Future<Output = Result<bool, KvError>> + Send;

    /// Reads the current value of `key`, if present and unexpired.
    fn get(&self, key: &str) -> impl Future<Output = Result<Option<String>, KvError>> + Send;

    /// Deletes `key` only if its current value equals `expected`. Returns `true` iff deleted.
    fn compare_delete(
        &self,
        key: &str,
        expected: &str,
    ) -> impl Future<Output = Result<bool, KvError>> + Send;

    /// Sets `key` to `value` with a refreshed `ttl`, only if its current value equals `expected`
    /// (the renew/reentrancy path). Returns `true` iff the set happened.
    fn compare_set_ex(
        &self,
        key: &str,
        expected: &str,
        value: &str,
        ttl: Duration,
    ) -> impl Future<Output = Result<bool, KvError>> + Send;
}

struct Entry {
    value: String,
    expires_at_ms: i64,
}

/// An in-process `KeyValueStore` backed by a sharded map and an injectable clock, used in tests
/// and single-replica deployments where no shared Redis is configured (§4.5, §4.6 degraded mode).
pub struct InMemoryKv<C> {
    clock: Arc<C>,
    entries: scc::HashMap<String, Entry>,
}

impl<C: grove_utils::Clock> InMemoryKv<C> {
    /// Builds an empty store driven by `clock`.
    #[must_use]
    pub fn new(clock: Arc<C>) -> Self {
        Self {
            clock,
            entries: scc::HashMap::new(),
        }
    }

    fn live_value(&self, key: &str) -> Option<String> {
        let now = self.clock.now_ms();
        let live = self.entries.read(key, |_, entry| {
            if entry.expires_at_ms > now {
                Some(entry.value.clone())
            } else {
                None
            }
        });
        match live {
            Some(Some(value)) => Some(value),
            _ => None,
        }
    }
}

/// Lets one backend instance be shared by several [`crate::LockService`]s (e.g. a process's own
/// lock handle and the leader-election worker's) without requiring `KeyValueStore` itself to be
/// `Clone`.
impl<T: KeyValueStore> KeyValueStore for Arc<T> {
    fn set_nx_ex(&self, key: &str, value: &str, ttl: Duration) -> impl Future<Output = Result<bool, KvError>> + Send {
        (**self).set_nx_ex(key, value, ttl)
    }

    fn get(&self, key: &str) -> impl Future<Output = Result<Option<String>, KvError>> + Send {
        (**self).get(key)
    }

    fn compare_delete(&self, key: &str, expected: &str) -> impl Future<Output = Result<bool, KvError>> + Send {
        (**self).compare_delete(key, expected)
    }

    fn compare_set_ex(
        &self,
        key: &str,
        expected: &str,
        value: &str,
        ttl: Duration,
    ) -> impl Future<Output = Result<bool, KvError>> + Send {
        (**self).compare_set_ex(key, expected, value, ttl)
    }
}

impl<C: grove_utils::Clock> KeyValueStore for InMemoryKv<C> {
    async fn set_nx_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<bool, KvError> {
        if self.live_value(key).is_some() {
            return Ok(false);
        }
        let expires_at_ms = self.clock.now_ms() + ttl.as_millis() as i64;
        let entry = Entry {
            value: value.to_string(),
            expires_at_ms,
        };
        // A concurrent winner between the liveness check and this insert is possible; re-check
        // by letting `insert` fail and falling back to the live-value test on the occupied slot.
        match self.entries.insert(key.to_string(), entry) {
            Ok(()) => Ok(true),
            Err((_, existing)) => {
                if existing.expires_at_ms > self.clock.now_ms() {
                    Ok(false)
                } else {
                    self.entries.update(key, |_, slot| *slot = existing);
                    Ok(true)
                }
            }
        }
    }

    async fn get(&self, key: &str) -> Result<Option<String>, KvError> {
        Ok(self.live_value(key))
    }

    async fn compare_delete(&self, key: &str, expected: &str) -> Result<bool, KvError> {
        let matches = self
            .entries
            .read(key, |_, entry| entry.value == expected)
            .unwrap_or(false);
        if matches {
            self.entries.remove(key);
        }
        Ok(matches)
    }

    async fn compare_set_ex(
        &self,
        key: &str,
        expected: &str,
        value: &str,
        ttl: Duration,
    ) -> Result<bool, KvError> {
        let expires_at_ms = self.clock.now_ms() + ttl.as_millis() as i64;
        let mut matched = false;
        self.entries.update(key, |_, entry| {
            if entry.value == expected {
                entry.value = value.to_string();
                entry.expires_at_ms = expires_at_ms;
                matched = true;
            }
        });
        Ok(matched)
    }
}
