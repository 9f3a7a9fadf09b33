//! S3: offline catch-up. A furnace left mid-burn is advanced by the full wall-clock gap the next
//! time it's opened, exhausting its ore supply partway through and persisting the result.

use grove_forge::store::{ForgeError, ForgeStateStore};
use grove_forge::catch_up;
use grove_protocol::domain::{FurnaceState, ItemStack};
use grove_utils::clock::FakeClock;
use grove_utils::SyncMutex;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Default, Clone)]
struct MapStore {
    rows: Arc<SyncMutex<HashMap<(String, String), (FurnaceState, i64)>>>,
}

impl ForgeStateStore for MapStore {
    async fn get(&self, world_id: &str, forge_id: &str) -> Result<(FurnaceState, i64), ForgeError> {
        let key = (world_id.to_string(), forge_id.to_string());
        Ok(self.rows.lock().get(&key).cloned().unwrap_or((FurnaceState::default(), 0)))
    }

    async fn put(
        &self,
        world_id: &str,
        forge_id: &str,
        state: &FurnaceState,
        updated_at_ms: i64,
    ) -> Result<(), ForgeError> {
        self.rows
            .lock()
            .insert((world_id.to_string(), forge_id.to_string()), (state.clone(), updated_at_ms));
        Ok(())
    }

    async fn list_enabled(&self, _limit: usize) -> Result<Vec<(String, String)>, ForgeError> {
        Ok(self
            .rows
            .lock()
            .iter()
            .filter(|(_, (state, _))| state.enabled)
            .map(|(key, _)| key.clone())
            .collect())
    }
}

/// A furnace burning 30s of stored heat, one log queued, and 5 iron ore, left alone for a full
/// minute: the ore runs out after 5 ingots and the furnace goes cold, all caught up in a single
/// `catch_up` call on next open.
#[tokio::test]
async fn offline_catch_up_exhausts_ore_and_persists() {
    let store = MapStore::default();
    let clock = FakeClock::new(0);
    let state = FurnaceState {
        enabled: true,
        burn: 30.0,
        prog: 0.0,
        fuel: [Some(ItemStack { id: "log".to_string(), qty: 4 }), None],
        input: [Some(ItemStack { id: "iron_ore".to_string(), qty: 5 }), None],
        output: [None, None],
    };
    store.put("world-1", "F1", &state, 0).await.unwrap();
    clock.set(60_000);

    let result = catch_up(&store, &clock, "world-1", "F1").await.unwrap();
    assert!(!result.enabled, "the ore supply is exhausted before the full minute elapses");
    assert_eq!(result.output[0], Some(ItemStack { id: "iron_ingot".to_string(), qty: 5 }));
    assert_eq!(result.fuel[0].as_ref().unwrap().qty, 3, "one log consumed before the ore ran out");
    assert_eq!(result.input[0], None);

    let (persisted, updated_at_ms) = store.get("world-1", "F1").await.unwrap();
    assert_eq!(persisted, result, "catch_up writes back the advanced state");
    assert_eq!(updated_at_ms, 60_000, "the row's updatedAt moves to the wall-clock time of the open, not the burn time");
}

/// Opening a forge that's never been written starts from the zero-value row rather than an
/// error, matching the "furnaces persist as soon as accessed" rule.
#[tokio::test]
async fn first_open_of_an_unknown_forge_is_an_empty_row() {
    let store = MapStore::default();
    let clock = FakeClock::new(5_000);
    let result = catch_up(&store, &clock, "world-1", "new-forge").await.unwrap();
    assert_eq!(result, FurnaceState::default());
}
