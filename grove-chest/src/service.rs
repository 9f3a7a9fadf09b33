//! The chest service: ownership-gated, lock-moderated reads and writes (§4.7).

use crate::store::{ChestRow, ChestStateStore, ChestStoreError};
use grove_lock::{KeyValueStore, LockError, LockService};
use grove_protocol::domain::ChestState;
use grove_utils::Clock;

/// Errors surfaced to the HTTP boundary by the chest service.
#[derive(Debug, thiserror::Error)]
pub enum ChestError {
    /// The requester is not the chest's owner (§3.2 invariant 3).
    #[error("forbidden")]
    Forbidden,
    /// The chest is locked by a different guest.
    #[error("locked")]
    Locked,
    /// The presented lock token no longer matches the current holder.
    #[error("token mismatch")]
    TokenMismatch,
    /// Persistence failure.
    #[error(transparent)]
    Store(#[from] ChestStoreError),
}

impl From<LockError> for ChestError {
    fn from(err: LockError) -> Self {
        match err {
            LockError::Locked => Self::Locked,
            LockError::TokenMismatch => Self::TokenMismatch,
            LockError::Backend(backend) => Self::Store(ChestStoreError::Backend(backend.to_string())),
        }
    }
}

fn lock_key(world_id: &str, chest_id: &str) -> String {
    format!("lock:chest:{world_id}:{chest_id}")
}

/// Wraps a [`ChestStateStore`] with ownership checks and a [`LockService`] (§4.7 read path).
pub struct ChestService<S, K> {
    store: S,
    locks: LockService<K>,
}

impl<S: ChestStateStore, K: KeyValueStore> ChestService<S, K> {
    /// Builds a service over `store`, moderated by `locks`.
    #[must_use]
    pub fn new(store: S, locks: LockService<K>) -> Self {
        Self { store, locks }
    }

    /// Opens a chest for reading: verifies ownership, then acquires (or renews) the lock.
    /// Returns the current slots, a lock token, and the row's `updatedAt` (§4.7 steps 1-3).
    pub async fn open(
        &self,
        world_id: &str,
        chest_id: &str,
        guest_id: &str,
    ) -> Result<(ChestState, String, i64), ChestError> {
        let row = self.store.get(world_id, chest_id).await?;
        if row.owner_id != guest_id {
            return Err(ChestError::Forbidden);
        }
        let token = self.locks.acquire(&lock_key(world_id, chest_id), guest_id).await?;
        Ok((row.state, token, row.updated_at_ms))
    }

    /// Writes new slot state, verifying the presented lock token is still current.
    pub async fn write<C: Clock>(
        &self,
        world_id: &str,
        chest_id: &str,
        lock_token: &str,
        state: &ChestState,
        clock: &C,
    ) -> Result<(), ChestError> {
        self.locks.renew(&lock_key(world_id, chest_id), lock_token).await?;
        self.store.put_state(world_id, chest_id, state, clock.now_ms()).await?;
        Ok(())
    }

    /// Releases a previously-acquired lock (§6.2 `POST /api/chest/lock/release`).
    pub async fn release_lock(&self, world_id: &str, chest_id: &str, lock_token: &str) -> Result<(), ChestError> {
        self.locks.release(&lock_key(world_id, chest_id), lock_token).await?;
        Ok(())
    }

    /// Whether the chest is empty and therefore eligible for removal (invariant 4).
    pub async fn is_empty(&self, world_id: &str, chest_id: &str) -> Result<bool, ChestError> {
        let row = self.store.get(world_id, chest_id).await?;
        Ok(row.state.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use grove_lock::InMemoryKv;
    use grove_utils::clock::FakeClock;
    use grove_utils::SyncMutex;
    use std::collections::HashMap;
    use std::sync::Arc;

    #[derive(Default)]
    struct FakeStore {
        rows: SyncMutex<HashMap<(String, String), ChestRow>>,
    }

    impl ChestStateStore for FakeStore {
        async fn get(&self, world_id: &str, chest_id: &str) -> Result<ChestRow, ChestStoreError> {
            self.rows
                .lock()
                .get(&(world_id.to_string(), chest_id.to_string()))
                .cloned()
                .ok_or(ChestStoreError::NotFound)
        }

        async fn create(
            &self,
            world_id: &str,
            chest_id: &str,
            owner_id: &str,
            updated_at_ms: i64,
        ) -> Result<(), ChestStoreError> {
            self.rows.lock().insert(
                (world_id.to_string(), chest_id.to_string()),
                ChestRow {
                    state: ChestState::default(),
                    owner_id: owner_id.to_string(),
                    updated_at_ms,
                },
            );
            Ok(())
        }

        async fn put_state(
            &self,
            world_id: &str,
            chest_id: &str,
            state: &ChestState,
            updated_at_ms: i64,
        ) -> Result<(), ChestStoreError> {
            let mut rows = self.rows.lock();
            let row = rows
                .get_mut(&(world_id.to_string(), chest_id.to_string()))
                .ok_or(ChestStoreError::NotFound)?;
            row.state = state.clone();
            row.updated_at_ms = updated_at_ms;
            Ok(())
        }
    }

    fn service() -> ChestService<FakeStore, InMemoryKv<FakeClock>> {
        let clock = Arc::new(FakeClock::new(0));
        ChestService::new(FakeStore::default(), LockService::new(InMemoryKv::new(clock)))
    }

    #[tokio::test]
    async fn non_owner_read_is_forbidden() {
        let svc = service();
        svc.store.create("world-1", "C1", "g1", 0).await.unwrap();
        let err = svc.open("world-1", "C1", "g2").await.unwrap_err();
        assert!(matches!(err, ChestError::Forbidden));
    }

    #[tokio::test]
    async fn owner_reentrant_open_renews_same_token() {
        let svc = service();
        svc.store.create("world-1", "C1", "g1", 0).await.unwrap();
        let (_, token1, _) = svc.open("world-1", "C1", "g1").await.unwrap();
        let (_, token2, _) = svc.open("world-1", "C1", "g1").await.unwrap();
        assert_eq!(token1, token2);
    }

    #[tokio::test]
    async fn write_requires_current_token() {
        let svc = service();
        svc.store.create("world-1", "C1", "g1", 0).await.unwrap();
        let (_, token, _) = svc.open("world-1", "C1", "g1").await.unwrap();
        let clock = FakeClock::new(1_000);
        let mut state = ChestState::default();
        state.slots[0] = Some(grove_protocol::domain::ItemStack { id: "log".to_string(), qty: 3 });
        svc.write("world-1", "C1", &token, &state, &clock).await.unwrap();
        assert!(svc
            .write("world-1", "C1", "bogus-token", &state, &clock)
            .await
            .is_err());
    }

    #[tokio::test]
    async fn destroy_requires_emptiness() {
        let svc = service();
        svc.store.create("world-1", "C1", "g1", 0).await.unwrap();
        assert!(svc.is_empty("world-1", "C1").await.unwrap());
        let mut state = ChestState::default();
        state.slots[0] = Some(grove_protocol::domain::ItemStack { id: "log".to_string(), qty: 1 });
        svc.store.put_state("world-1", "C1", &state, 0).await.unwrap();
        assert!(!svc.is_empty("world-1", "C1").await.unwrap());
    }
}
