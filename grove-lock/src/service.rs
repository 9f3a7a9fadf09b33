//! The lock service: named leases with TTL and reentrancy for the holder (§4.5).

use crate::kv::{KeyValueStore, KvError};
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

/// Default lease TTL (§6.4 `LOCK_TTL_SECS`).
pub const DEFAULT_LOCK_TTL: Duration = Duration::from_secs(10);

/// Outcome of a `status` probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockStatus {
    /// Whether anyone currently holds the lock.
    pub locked: bool,
    /// Whether `guest_id` itself is the current holder.
    pub by_self: bool,
}

/// Errors from the lock service.
#[derive(Debug, Error)]
pub enum LockError {
    /// The key is held by a different guest than the caller.
    #[error("locked")]
    Locked,
    /// The presented token does not match the current holder.
    #[error("token mismatch")]
    TokenMismatch,
    /// The backing store could not be reached.
    #[error("backend unavailable: {0}")]
    Backend(#[from] KvError),
}

/// Named leases over a [`KeyValueStore`], with reentrancy for the same guest (§4.5).
pub struct LockService<S> {
    store: S,
    ttl: Duration,
}

impl<S: KeyValueStore> LockService<S> {
    /// Builds a service over `store` with the default lease TTL.
    #[must_use]
    pub fn new(store: S) -> Self {
        Self::with_ttl(store, DEFAULT_LOCK_TTL)
    }

    /// Builds a service over `store` with an explicit lease TTL.
    #[must_use]
    pub fn with_ttl(store: S, ttl: Duration) -> Self {
        Self { store, ttl }
    }

    /// Acquires `key` for `guest_id`. If already held by `guest_id`, renews and returns the
    /// existing token (reentrancy); if held by a different guest, returns [`LockError::Locked`].
    pub async fn acquire(&self, key: &str, guest_id: &str) -> Result<String, LockError> {
        let token = format!("{guest_id}:{}", Uuid::new_v4());
        if self.store.set_nx_ex(key, &token, self.ttl).await? {
            return Ok(token);
        }
        let current = self.store.get(key).await?;
        match current {
            Some(existing) if holder_guest_id(&existing) == guest_id => {
                if self
                    .store
                    .compare_set_ex(key, &existing, &existing, self.ttl)
                    .await?
                {
                    Ok(existing)
                } else {
                    // Lost the lock between the read and the renew; another guest may now hold
                    // it, so surface a plain contention error rather than retrying indefinitely.
                    Err(LockError::Locked)
                }
            }
            _ => Err(LockError::Locked),
        }
    }

    /// Renews `token`'s lease on `key`. Fails unless `token` is still the current holder.
    pub async fn renew(&self, key: &str, token: &str) -> Result<(), LockError> {
        if self.store.compare_set_ex(key, token, token, self.ttl).await? {
            Ok(())
        } else {
            Err(LockError::TokenMismatch)
        }
    }

    /// Releases `key` if `token` is still the current holder (compare-and-delete).
    pub async fn release(&self, key: &str, token: &str) -> Result<(), LockError> {
        if self.store.compare_delete(key, token).await? {
            Ok(())
        } else {
            Err(LockError::TokenMismatch)
        }
    }

    /// Read-only probe of `key`'s lock state relative to `guest_id`.
    pub async fn status(&self, key: &str, guest_id: &str) -> Result<LockStatus, LockError> {
        let current = self.store.get(key).await?;
        Ok(match current {
            Some(token) => LockStatus {
                locked: true,
                by_self: holder_guest_id(&token) == guest_id,
            },
            None => LockStatus {
                locked: false,
                by_self: false,
            },
        })
    }
}

/// Extracts the `guestId` portion of a `"<guestId>:<uuid>"` lock token.
fn holder_guest_id(token: &str) -> &str {
    token.split_once(':').map_or(token, |(guest_id, _)| guest_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kv::InMemoryKv;
    use grove_utils::clock::FakeClock;
    use std::sync::Arc;

    fn service() -> LockService<InMemoryKv<FakeClock>> {
        LockService::new(InMemoryKv::new(Arc::new(FakeClock::new(0))))
    }

    #[tokio::test]
    async fn fresh_acquire_succeeds() {
        let lock = service();
        let token = lock.acquire("lock:chest:w1:c1", "g1").await.unwrap();
        assert!(token.starts_with("g1:"));
    }

    #[tokio::test]
    async fn same_guest_reentrant_acquire_returns_same_token() {
        let lock = service();
        let first = lock.acquire("lock:chest:w1:c1", "g1").await.unwrap();
        let second = lock.acquire("lock:chest:w1:c1", "g1").await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn other_guest_acquire_is_locked() {
        let lock = service();
        lock.acquire("lock:chest:w1:c1", "g1").await.unwrap();
        let err = lock.acquire("lock:chest:w1:c1", "g2").await.unwrap_err();
        assert!(matches!(err, LockError::Locked));
    }

    #[tokio::test]
    async fn release_requires_matching_token() {
        let lock = service();
        let token = lock.acquire("lock:chest:w1:c1", "g1").await.unwrap();
        assert!(matches!(
            lock.release("lock:chest:w1:c1", "wrong-token").await,
            Err(LockError::TokenMismatch)
        ));
        lock.release("lock:chest:w1:c1", &token).await.unwrap();
        let status = lock.status("lock:chest:w1:c1", "g1").await.unwrap();
        assert!(!status.locked);
    }

    #[tokio::test]
    async fn status_reports_self_vs_other() {
        let lock = service();
        lock.acquire("lock:chest:w1:c1", "g1").await.unwrap();
        let self_status = lock.status("lock:chest:w1:c1", "g1").await.unwrap();
        assert_eq!(self_status, LockStatus { locked: true, by_self: true });
        let other_status = lock.status("lock:chest:w1:c1", "g2").await.unwrap();
        assert_eq!(
            other_status,
            LockStatus { locked: true, by_self: false }
        );
    }
}
