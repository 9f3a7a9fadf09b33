//! The authoritative per-chunk state table (§4.2), write-through to persistent storage on
//! mutation (§3.3, §6.3 `world_chunk_state`).

use grove_protocol::domain::ChunkState;
use grove_utils::{AsyncMutex, ChunkKey};
use std::future::Future;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::broadcast;

/// A change to one chunk, broadcast to every session subscribed to it (§6.1 `worldChunk`).
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkDelta {
    /// The world this chunk belongs to.
    pub world_id: String,
    /// Chunk X coordinate.
    pub chunk_x: i32,
    /// Chunk Z coordinate.
    pub chunk_z: i32,
    /// The chunk's full state after the mutation.
    pub state: ChunkState,
}

/// Errors from a chunk mutation.
#[derive(Debug, Error)]
pub enum ChunkStoreError {
    /// The mutation closure itself rejected the write (e.g. a farm/placement validation
    /// failure surfaced up through `mutate_chunk`).
    #[error("{0}")]
    Rejected(String),
    /// The backing store could not be reached (maps to `db_unavailable`/503).
    #[error("backend unavailable: {0}")]
    Backend(String),
}

/// Read/write access to persisted chunk rows (§6.3 `world_chunk_state`). `get` returns `None` for
/// a chunk that has never been mutated, matching `readChunk`'s "existing or zero-value" contract.
pub trait ChunkStateStore: Send + Sync {
    /// Reads a chunk's persisted state, if it has ever been written.
    fn get(
        &self,
        world_id: &str,
        cx: i32,
        cz: i32,
    ) -> impl Future<Output = Result<Option<ChunkState>, ChunkStoreError>> + Send;

    /// Persists `state` as the chunk's current row, creating it if absent.
    fn put(
        &self,
        world_id: &str,
        cx: i32,
        cz: i32,
        state: &ChunkState,
    ) -> impl Future<Output = Result<(), ChunkStoreError>> + Send;
}

/// Capacity of each world's delta channel; a lagging subscriber misses the oldest deltas rather
/// than stalling the store, matching the bounded outbound buffers described in §5.
const BROADCAST_CAPACITY: usize = 256;

struct WorldSlot {
    chunks: scc::HashMap<ChunkKey, Arc<AsyncMutex<ChunkState>>>,
    deltas: broadcast::Sender<ChunkDelta>,
}

/// Sharded, per-chunk-locked world state (§4.2), write-through to `S` on every mutation.
///
/// Chunks are loaded from `S` and cached lazily on first touch (§3.3); the table is keyed by
/// `worldId` then by a packed [`ChunkKey`] rather than a formatted `"cx:cz"` string. The cell lock
/// is async (not the workspace's usual `SyncMutex`) since it is held across the write-through
/// persist call, keeping load-then-mutate-then-persist atomic per chunk.
pub struct ChunkStore<S> {
    store: Arc<S>,
    worlds: scc::HashMap<String, Arc<WorldSlot>>,
}

impl<S: ChunkStateStore> ChunkStore<S> {
    /// Builds a store backed by `store`, with no chunks cached yet.
    #[must_use]
    pub fn new(store: Arc<S>) -> Self {
        Self { store, worlds: scc::HashMap::new() }
    }

    fn world_slot(&self, world_id: &str) -> Arc<WorldSlot> {
        if let Some(slot) = self.worlds.read(world_id, |_, slot| slot.clone()) {
            return slot;
        }
        let (tx, _rx) = broadcast::channel(BROADCAST_CAPACITY);
        let slot = Arc::new(WorldSlot {
            chunks: scc::HashMap::new(),
            deltas: tx,
        });
        match self.worlds.insert(world_id.to_string(), slot.clone()) {
            Ok(()) => slot,
            Err((_, existing)) => existing,
        }
    }

    async fn chunk_cell(
        &self,
        world_id: &str,
        key: ChunkKey,
    ) -> Result<Arc<AsyncMutex<ChunkState>>, ChunkStoreError> {
        let slot = self.world_slot(world_id);
        if let Some(cell) = slot.chunks.read(&key, |_, cell| cell.clone()) {
            return Ok(cell);
        }
        let (cx, cz) = key.unpack();
        let loaded = self.store.get(world_id, cx, cz).await?.unwrap_or_default();
        let cell = Arc::new(AsyncMutex::new(loaded));
        match slot.chunks.insert(key, cell.clone()) {
            Ok(()) => Ok(cell),
            Err((_, existing)) => Ok(existing),
        }
    }

    /// Returns a copy of the chunk's current state, or a zero-value state if it has never been
    /// touched (`readChunk`).
    pub async fn read_chunk(&self, world_id: &str, cx: i32, cz: i32) -> Result<ChunkState, ChunkStoreError> {
        let cell = self.chunk_cell(world_id, ChunkKey::new(cx, cz)).await?;
        Ok(cell.lock().await.clone())
    }

    /// Applies `f` to a private copy of the chunk under its lock, bumps `version` (invariant 8),
    /// persists the result, and broadcasts the resulting delta to every `subscribe_world`
    /// receiver (`mutateChunk`). `f`'s rejection and a backend failure both leave the cached and
    /// persisted state untouched.
    pub async fn mutate_chunk<F>(
        &self,
        world_id: &str,
        cx: i32,
        cz: i32,
        f: F,
    ) -> Result<ChunkState, ChunkStoreError>
    where
        F: FnOnce(&mut ChunkState) -> Result<(), ChunkStoreError>,
    {
        let key = ChunkKey::new(cx, cz);
        let cell = self.chunk_cell(world_id, key).await?;
        let mut guard = cell.lock().await;
        let mut next = guard.clone();
        f(&mut next)?;
        next.version += 1;
        self.store.put(world_id, cx, cz, &next).await?;
        *guard = next.clone();
        drop(guard);

        let slot = self.world_slot(world_id);
        let _ = slot.deltas.send(ChunkDelta {
            world_id: world_id.to_string(),
            chunk_x: cx,
            chunk_z: cz,
            state: next.clone(),
        });
        Ok(next)
    }

    /// Subscribes to every chunk delta for `world_id` (`subscribeWorld`). Ordering is guaranteed
    /// per chunk only, not globally, matching the underlying per-chunk lock scheme.
    #[must_use]
    pub fn subscribe_world(&self, world_id: &str) -> broadcast::Receiver<ChunkDelta> {
        self.world_slot(world_id).deltas.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap as StdHashMap;

    #[derive(Default)]
    struct FakeChunkStore {
        rows: grove_utils::SyncMutex<StdHashMap<(String, i32, i32), ChunkState>>,
    }

    impl ChunkStateStore for FakeChunkStore {
        async fn get(&self, world_id: &str, cx: i32, cz: i32) -> Result<Option<ChunkState>, ChunkStoreError> {
            Ok(self.rows.lock().get(&(world_id.to_string(), cx, cz)).cloned())
        }

        async fn put(&self, world_id: &str, cx: i32, cz: i32, state: &ChunkState) -> Result<(), ChunkStoreError> {
            self.rows.lock().insert((world_id.to_string(), cx, cz), state.clone());
            Ok(())
        }
    }

    fn store() -> ChunkStore<FakeChunkStore> {
        ChunkStore::new(Arc::new(FakeChunkStore::default()))
    }

    #[tokio::test]
    async fn unread_chunk_is_zero_value() {
        let store = store();
        let state = store.read_chunk("world-1", 0, 0).await.unwrap();
        assert_eq!(state.version, 0);
        assert!(state.removed_trees.is_empty());
    }

    #[tokio::test]
    async fn mutation_bumps_version_and_persists() {
        let store = store();
        let state = store
            .mutate_chunk("world-1", 0, 0, |chunk| {
                chunk.removed_trees.push("T1".to_string());
                Ok(())
            })
            .await
            .unwrap();
        assert_eq!(state.version, 1);
        assert_eq!(store.read_chunk("world-1", 0, 0).await.unwrap().version, 1);
        assert_eq!(store.read_chunk("world-1", 0, 0).await.unwrap().removed_trees, vec!["T1"]);
    }

    #[tokio::test]
    async fn mutation_write_through_survives_cache_eviction() {
        let backend = Arc::new(FakeChunkStore::default());
        {
            let store = ChunkStore::new(backend.clone());
            store
                .mutate_chunk("world-1", 0, 0, |chunk| {
                    chunk.removed_rocks.push("R1".to_string());
                    Ok(())
                })
                .await
                .unwrap();
        }
        // A fresh store over the same backend, simulating a process restart, loads the
        // persisted row rather than starting from a zero-value chunk.
        let reloaded = ChunkStore::new(backend);
        let state = reloaded.read_chunk("world-1", 0, 0).await.unwrap();
        assert_eq!(state.removed_rocks, vec!["R1"]);
        assert_eq!(state.version, 1);
    }

    #[tokio::test]
    async fn rejected_mutation_leaves_state_untouched() {
        let store = store();
        let err = store
            .mutate_chunk("world-1", 0, 0, |_| Err(ChunkStoreError::Rejected("nope".to_string())))
            .await;
        assert!(err.is_err());
        assert_eq!(store.read_chunk("world-1", 0, 0).await.unwrap().version, 0);
    }

    #[tokio::test]
    async fn unrelated_chunks_do_not_share_state() {
        let store = store();
        store
            .mutate_chunk("world-1", 0, 0, |c| {
                c.removed_rocks.push("R1".to_string());
                Ok(())
            })
            .await
            .unwrap();
        assert!(store.read_chunk("world-1", 1, 0).await.unwrap().removed_rocks.is_empty());
    }

    #[tokio::test]
    async fn subscribers_receive_deltas() {
        let store = store();
        let mut rx = store.subscribe_world("world-1");
        store
            .mutate_chunk("world-1", 2, 3, |c| {
                c.removed_ores.push("O1".to_string());
                Ok(())
            })
            .await
            .unwrap();
        let delta = rx.recv().await.unwrap();
        assert_eq!((delta.chunk_x, delta.chunk_z), (2, 3));
        assert_eq!(delta.state.removed_ores, vec!["O1"]);
    }
}
