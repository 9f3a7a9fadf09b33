//! Scenario S2: a contended chest across three devices — same-owner reentrancy renews the lock,
//! a different owner is rejected outright.

use grove_chest::store::{ChestRow, ChestStateStore, ChestStoreError};
use grove_chest::{ChestError, ChestService};
use grove_lock::{InMemoryKv, LockService};
use grove_protocol::domain::{ChestState, ItemStack};
use grove_utils::clock::FakeClock;
use grove_utils::SyncMutex;
use std::collections::HashMap;
use std::sync::Arc;

/// Cheaply cloneable so a test can keep a handle to seed/inspect rows while the service owns
/// its own clone of the same underlying map.
#[derive(Default, Clone)]
struct MapStore {
    rows: Arc<SyncMutex<HashMap<(String, String), ChestRow>>>,
}

impl ChestStateStore for MapStore {
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

fn service() -> (ChestService<MapStore, InMemoryKv<FakeClock>>, MapStore) {
    let store = MapStore::default();
    let clock = Arc::new(FakeClock::new(0));
    let svc = ChestService::new(store.clone(), LockService::new(InMemoryKv::new(clock)));
    (svc, store)
}

/// Owner opens the chest from two devices, then a different guest tries to open the same
/// chest: the first device gets a token, the second (same owner) renews to the identical
/// token, and the third (a different owner) is turned away with `Forbidden` before the lock
/// even enters the picture.
#[tokio::test]
async fn contended_chest_across_three_devices() {
    let (svc, store) = service();
    store.create("world-1", "C1", "g1", 0).await.unwrap();

    let (state1, token_device1, _) = svc.open("world-1", "C1", "g1").await.unwrap();
    assert!(state1.is_empty());

    let (_, token_device2, _) = svc.open("world-1", "C1", "g1").await.unwrap();
    assert_eq!(token_device1, token_device2, "same owner reconnecting renews the same lock token");

    let forbidden = svc.open("world-1", "C1", "g2").await.unwrap_err();
    assert!(matches!(forbidden, ChestError::Forbidden));

    let clock = FakeClock::new(1_000);
    let mut written = ChestState::default();
    written.slots[0] = Some(ItemStack { id: "log".to_string(), qty: 2 });
    svc.write("world-1", "C1", &token_device2, &written, &clock).await.unwrap();

    let (state_after, _, updated_at) = svc.open("world-1", "C1", "g1").await.unwrap();
    assert_eq!(state_after, written);
    assert_eq!(updated_at, 1_000);
}

/// A stale token from before a release no longer renews or writes.
#[tokio::test]
async fn released_lock_rejects_the_old_token() {
    let (svc, store) = service();
    store.create("world-1", "C1", "g1", 0).await.unwrap();
    let (_, token, _) = svc.open("world-1", "C1", "g1").await.unwrap();
    svc.release_lock("world-1", "C1", &token).await.unwrap();

    let clock = FakeClock::new(0);
    let err = svc
        .write("world-1", "C1", &token, &ChestState::default(), &clock)
        .await
        .unwrap_err();
    assert!(matches!(err, ChestError::TokenMismatch));
}
