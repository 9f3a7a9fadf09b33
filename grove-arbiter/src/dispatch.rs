//! The world arbiter: single serial entry point per world for inbound `worldEvent`s (§4.4).

use grove_chest::store::{ChestStateStore, ChestStoreError};
use grove_protocol::domain::{PlacedStructure, PlacementKind};
use grove_protocol::world_event::{RejectReason, WorldEvent};
use grove_utils::rng::WorldRng;
use grove_utils::{ChunkKey, SyncMutex, Vector2};
use grove_world::chunk_store::ChunkStoreError;
use grove_world::placements::{PlacedObjectRegistry, PlacementError};
use grove_world::respawn::RespawnQueue;
use grove_world::{farm, ChunkSeed, ChunkStateStore, ChunkStore, ResourceKind};
use std::collections::HashMap;
use std::sync::Arc;

/// Jitter applied to passive respawn timers so every resource in a chunk doesn't reappear on the
/// same tick (§4.2).
const RESPAWN_JITTER_MS: i64 = 250;

/// The chunk world size, in world units, chunks are sharded on (§3.1, fixed per deployment).
pub const DEFAULT_CHUNK_SIZE: i32 = 32;

/// `WORLD_EVENT_RADIUS` default: how far a declared target may be from a session's last known
/// position (§4.4 step 2).
pub const DEFAULT_WORLD_EVENT_RADIUS: f64 = 3.5;

/// A chunk mutation to broadcast to every session in the world (§6.1 `worldChunk`).
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkBroadcast {
    /// The world the mutated chunk belongs to.
    pub world_id: String,
    /// Chunk X coordinate.
    pub chunk_x: i32,
    /// Chunk Z coordinate.
    pub chunk_z: i32,
    /// The chunk's full state after the accepted event.
    pub state: grove_protocol::domain::ChunkState,
}

/// Failure modes of [`WorldArbiter::dispatch`].
#[derive(Debug, thiserror::Error)]
pub enum ArbiterError {
    /// The event was validated and rejected; surfaced to the requester as `worldEventResult`.
    #[error("rejected: {0:?}")]
    Reject(RejectReason),
    /// A persistence backend could not be reached (§7 `db_unavailable`). The session stays open;
    /// only this event is rejected.
    #[error("backend unavailable: {0}")]
    Backend(String),
}

impl From<ChestStoreError> for ArbiterError {
    fn from(err: ChestStoreError) -> Self {
        Self::Backend(err.to_string())
    }
}

fn map_farm_reject(err: farm::FarmError) -> RejectReason {
    match err {
        farm::FarmError::InvalidSeed => RejectReason::InvalidSeed,
        farm::FarmError::NotTilled => RejectReason::NotTilled,
        farm::FarmError::NotReady => RejectReason::NotReady,
        farm::FarmError::Empty => RejectReason::Empty,
    }
}

fn map_placement_reject(err: PlacementError) -> RejectReason {
    match err {
        PlacementError::OutOfRange => RejectReason::OutOfRange,
        PlacementError::Duplicate => RejectReason::Duplicate,
        PlacementError::Spacing => RejectReason::Spacing,
        PlacementError::NotFound => RejectReason::NotFound,
    }
}

fn removed_list_mut(
    state: &mut grove_protocol::domain::ChunkState,
    kind: ResourceKind,
) -> &mut Vec<String> {
    match kind {
        ResourceKind::Tree => &mut state.removed_trees,
        ResourceKind::Rock => &mut state.removed_rocks,
        ResourceKind::Stick => &mut state.removed_sticks,
        ResourceKind::Bush => &mut state.removed_bushes,
        ResourceKind::Ore => &mut state.removed_ores,
    }
}

/// Parses a farm plot id (`"tx:tz"`) back into the chunk it was tilled in. Valid because
/// `floor(floor(x) / chunkSize) == floor(x / chunkSize)` for any integer `chunkSize`, so the
/// chunk a tile snaps to never depends on which of `x` or `floor(x)` is used to compute it.
fn chunk_for_plot_id(plot_id: &str, chunk_size: i32) -> Option<ChunkKey> {
    let (tx, tz) = plot_id.split_once(':')?;
    let tx: i32 = tx.parse().ok()?;
    let tz: i32 = tz.parse().ok()?;
    Some(ChunkKey::containing(f64::from(tx), f64::from(tz), chunk_size))
}

/// Single serial dispatch pipeline per world (§4.4): validates range/freshness, applies the
/// effect, and schedules respawns. Callers are expected to invoke `dispatch` for one world from a
/// single consumer task at a time — the per-world ordering guarantee in §4.4 is the caller's
/// responsibility, not this type's.
pub struct WorldArbiter<S> {
    chunk_store: Arc<ChunkStore<S>>,
    chest_store: Arc<S>,
    placements: SyncMutex<HashMap<String, PlacedObjectRegistry>>,
    respawns: SyncMutex<HashMap<(String, ChunkKey), RespawnQueue>>,
    world_rngs: SyncMutex<HashMap<String, Arc<WorldRng>>>,
    chunk_size: i32,
    world_event_radius: f64,
}

impl<S: ChestStateStore + ChunkStateStore> WorldArbiter<S> {
    /// Builds an arbiter over `chunk_store`/`chest_store` with default chunk size and event
    /// radius.
    #[must_use]
    pub fn new(chunk_store: Arc<ChunkStore<S>>, chest_store: Arc<S>) -> Self {
        Self::with_config(chunk_store, chest_store, DEFAULT_CHUNK_SIZE, DEFAULT_WORLD_EVENT_RADIUS)
    }

    /// Builds an arbiter with an explicit chunk size and event radius (from `Config`).
    #[must_use]
    pub fn with_config(
        chunk_store: Arc<ChunkStore<S>>,
        chest_store: Arc<S>,
        chunk_size: i32,
        world_event_radius: f64,
    ) -> Self {
        Self {
            chunk_store,
            chest_store,
            placements: SyncMutex::new(HashMap::new()),
            respawns: SyncMutex::new(HashMap::new()),
            world_rngs: SyncMutex::new(HashMap::new()),
            chunk_size,
            world_event_radius,
        }
    }

    fn world_rng(&self, world_id: &str) -> Arc<WorldRng> {
        let mut rngs = self.world_rngs.lock();
        rngs.entry(world_id.to_string())
            .or_insert_with(|| Arc::new(WorldRng::seeded(world_id)))
            .clone()
    }

    fn schedule_respawn(&self, world_id: &str, chunk: ChunkKey, kind: ResourceKind, id: &str, now_ms: i64) {
        let jitter = self.world_rng(world_id).jitter_ms(RESPAWN_JITTER_MS);
        let mut queues = self.respawns.lock();
        queues
            .entry((world_id.to_string(), chunk))
            .or_default()
            .schedule(kind, id, now_ms, jitter);
    }

    /// Drains every respawn due at or before `now_ms` across all worlds/chunks and re-adds the
    /// resource to its chunk, returning one [`ChunkBroadcast`] per chunk that changed. Intended to
    /// be called periodically by a background ticker (§4.2), independent of the arbiter's
    /// per-event dispatch.
    #[must_use]
    pub async fn drain_due_respawns(&self, now_ms: i64) -> Vec<ChunkBroadcast> {
        let due: Vec<((String, ChunkKey), Vec<(ResourceKind, String)>)> = {
            let mut queues = self.respawns.lock();
            queues
                .iter_mut()
                .map(|(key, queue)| (key.clone(), queue.drain_due(now_ms)))
                .filter(|(_, entries)| !entries.is_empty())
                .collect()
        };
        let mut broadcasts = Vec::with_capacity(due.len());
        for ((world_id, chunk), entries) in due {
            let (cx, cz) = chunk.unpack();
            let result = self
                .chunk_store
                .mutate_chunk(&world_id, cx, cz, |state| {
                    for (kind, id) in &entries {
                        let list = removed_list_mut(state, *kind);
                        list.retain(|existing| existing != id);
                    }
                    Ok(())
                })
                .await;
            if let Ok(state) = result {
                broadcasts.push(ChunkBroadcast {
                    world_id,
                    chunk_x: cx,
                    chunk_z: cz,
                    state,
                });
            }
        }
        broadcasts
    }

    /// Dispatches one inbound world event (§4.4 steps 1-3). `session_pos` is the session's last
    /// server-known position, used for the range check in step 2.
    pub async fn dispatch(
        &self,
        world_id: &str,
        guest_id: &str,
        session_pos: (f64, f64),
        event: &WorldEvent,
        now_ms: i64,
    ) -> Result<ChunkBroadcast, ArbiterError> {
        let outcome = self.dispatch_inner(world_id, guest_id, session_pos, event, now_ms).await;
        match &outcome {
            Ok(broadcast) => tracing::debug!(
                world_id,
                kind = event.kind_str(),
                chunk_x = broadcast.chunk_x,
                chunk_z = broadcast.chunk_z,
                "world event accepted"
            ),
            Err(ArbiterError::Reject(reason)) => {
                tracing::debug!(world_id, kind = event.kind_str(), ?reason, "world event rejected");
            }
            Err(ArbiterError::Backend(err)) => {
                tracing::warn!(world_id, kind = event.kind_str(), error = %err, "world event backend unavailable");
            }
        }
        outcome
    }

    async fn dispatch_inner(
        &self,
        world_id: &str,
        guest_id: &str,
        session_pos: (f64, f64),
        event: &WorldEvent,
        now_ms: i64,
    ) -> Result<ChunkBroadcast, ArbiterError> {
        match event {
            WorldEvent::TreeCut { tree_id, x, z, .. } => {
                self.resource_event(world_id, session_pos, ResourceKind::Tree, tree_id, *x, *z, now_ms)
                    .await
            }
            WorldEvent::RockCollect { rock_id, x, z, .. } => {
                self.resource_event(world_id, session_pos, ResourceKind::Rock, rock_id, *x, *z, now_ms)
                    .await
            }
            WorldEvent::StickCollect { stick_id, x, z, .. } => {
                self.resource_event(world_id, session_pos, ResourceKind::Stick, stick_id, *x, *z, now_ms)
                    .await
            }
            WorldEvent::BushCollect { bush_id, x, z, .. } => {
                self.resource_event(world_id, session_pos, ResourceKind::Bush, bush_id, *x, *z, now_ms)
                    .await
            }
            WorldEvent::OreBreak { ore_id, x, z, .. } => {
                self.resource_event(world_id, session_pos, ResourceKind::Ore, ore_id, *x, *z, now_ms)
                    .await
            }
            WorldEvent::PlotTill { x, z, .. } => self.plot_till(world_id, session_pos, *x, *z, now_ms).await,
            WorldEvent::Plant { plot_id, seed_id, .. } => self.plant(world_id, plot_id, seed_id, now_ms).await,
            WorldEvent::Harvest { plot_id, .. } => self.harvest(world_id, plot_id, now_ms).await,
            WorldEvent::Place {
                id,
                place_kind,
                x,
                z,
                ..
            } => {
                self.place(world_id, guest_id, id, *place_kind, *x, *z, session_pos, now_ms)
                    .await
            }
            WorldEvent::PlaceRemove { id, .. } => self.place_remove(world_id, guest_id, id).await,
        }
    }

    async fn resource_event(
        &self,
        world_id: &str,
        session_pos: (f64, f64),
        kind: ResourceKind,
        id: &str,
        x: f64,
        z: f64,
        now_ms: i64,
    ) -> Result<ChunkBroadcast, ArbiterError> {
        let target = Vector2::new(x, z);
        let session = Vector2::new(session_pos.0, session_pos.1);
        if target.distance(session) > self.world_event_radius {
            return Err(ArbiterError::Reject(RejectReason::OutOfRange));
        }
        let chunk = ChunkKey::containing(x, z, self.chunk_size);
        if !ChunkSeed::generate(chunk).contains(kind, id) {
            return Err(ArbiterError::Reject(RejectReason::UnknownId));
        }
        let (cx, cz) = chunk.unpack();
        let result = self
            .chunk_store
            .mutate_chunk(world_id, cx, cz, |state| {
                let removed = removed_list_mut(state, kind);
                if removed.iter().any(|existing| existing == id) {
                    return Err(ChunkStoreError::Rejected("already removed".to_string()));
                }
                removed.push(id.to_string());
                Ok(())
            })
            .await;
        match result {
            Ok(state) => {
                self.schedule_respawn(world_id, chunk, kind, id, now_ms);
                Ok(ChunkBroadcast {
                    world_id: world_id.to_string(),
                    chunk_x: cx,
                    chunk_z: cz,
                    state,
                })
            }
            Err(ChunkStoreError::Rejected(_)) => Err(ArbiterError::Reject(RejectReason::AlreadyRemoved)),
            Err(ChunkStoreError::Backend(msg)) => Err(ArbiterError::Backend(msg)),
        }
    }

    async fn plot_till(
        &self,
        world_id: &str,
        session_pos: (f64, f64),
        x: f64,
        z: f64,
        now_ms: i64,
    ) -> Result<ChunkBroadcast, ArbiterError> {
        let target = Vector2::new(x, z);
        let session = Vector2::new(session_pos.0, session_pos.1);
        if target.distance(session) > self.world_event_radius {
            return Err(ArbiterError::Reject(RejectReason::OutOfRange));
        }
        let chunk = ChunkKey::containing(x, z, self.chunk_size);
        let (cx, cz) = chunk.unpack();
        let plot_id = format!("{}:{}", x.floor() as i32, z.floor() as i32);
        let result = self
            .chunk_store
            .mutate_chunk(world_id, cx, cz, |state| {
                farm::till(&mut state.farm_plots, &plot_id, x, z, now_ms);
                Ok(())
            })
            .await;
        match result {
            Ok(state) => Ok(ChunkBroadcast {
                world_id: world_id.to_string(),
                chunk_x: cx,
                chunk_z: cz,
                state,
            }),
            Err(ChunkStoreError::Rejected(_)) => unreachable!("till never rejects a mutation"),
            Err(ChunkStoreError::Backend(msg)) => Err(ArbiterError::Backend(msg)),
        }
    }

    async fn plant(
        &self,
        world_id: &str,
        plot_id: &str,
        seed_id: &str,
        now_ms: i64,
    ) -> Result<ChunkBroadcast, ArbiterError> {
        let chunk =
            chunk_for_plot_id(plot_id, self.chunk_size).ok_or(ArbiterError::Reject(RejectReason::NotTilled))?;
        let (cx, cz) = chunk.unpack();
        let mut farm_err = None;
        let result = self
            .chunk_store
            .mutate_chunk(world_id, cx, cz, |state| {
                farm::plant(&mut state.farm_plots, plot_id, seed_id, now_ms).map_err(|err| {
                    farm_err = Some(err);
                    ChunkStoreError::Rejected(err.to_string())
                })
            })
            .await;
        match result {
            Ok(state) => Ok(ChunkBroadcast {
                world_id: world_id.to_string(),
                chunk_x: cx,
                chunk_z: cz,
                state,
            }),
            Err(ChunkStoreError::Rejected(_)) => Err(ArbiterError::Reject(
                farm_err.map_or(RejectReason::NotTilled, map_farm_reject),
            )),
            Err(ChunkStoreError::Backend(msg)) => Err(ArbiterError::Backend(msg)),
        }
    }

    async fn harvest(&self, world_id: &str, plot_id: &str, now_ms: i64) -> Result<ChunkBroadcast, ArbiterError> {
        let chunk =
            chunk_for_plot_id(plot_id, self.chunk_size).ok_or(ArbiterError::Reject(RejectReason::Empty))?;
        let (cx, cz) = chunk.unpack();
        let mut farm_err = None;
        let result = self
            .chunk_store
            .mutate_chunk(world_id, cx, cz, |state| {
                farm::harvest(&mut state.farm_plots, plot_id, now_ms).map(|_| ()).map_err(|err| {
                    farm_err = Some(err);
                    ChunkStoreError::Rejected(err.to_string())
                })
            })
            .await;
        match result {
            Ok(state) => Ok(ChunkBroadcast {
                world_id: world_id.to_string(),
                chunk_x: cx,
                chunk_z: cz,
                state,
            }),
            Err(ChunkStoreError::Rejected(_)) => {
                Err(ArbiterError::Reject(farm_err.map_or(RejectReason::Empty, map_farm_reject)))
            }
            Err(ChunkStoreError::Backend(msg)) => Err(ArbiterError::Backend(msg)),
        }
    }

    #[allow(clippy::too_many_arguments, reason = "mirrors the wire shape of a place event")]
    async fn place(
        &self,
        world_id: &str,
        guest_id: &str,
        id: &str,
        kind: PlacementKind,
        x: f64,
        z: f64,
        session_pos: (f64, f64),
        now_ms: i64,
    ) -> Result<ChunkBroadcast, ArbiterError> {
        let owner_id = kind.is_chest().then(|| guest_id.to_string());
        let record = {
            let mut registries = self.placements.lock();
            let registry = registries.entry(world_id.to_string()).or_default();
            registry
                .place(id, kind, x, z, owner_id.clone(), session_pos, self.world_event_radius, self.chunk_size)
                .map_err(|err| ArbiterError::Reject(map_placement_reject(err)))?
        };
        if kind.is_chest() {
            self.chest_store.create(world_id, id, guest_id, now_ms).await?;
        }
        let (cx, cz) = record.chunk.unpack();
        let state = self
            .chunk_store
            .mutate_chunk(world_id, cx, cz, |state| {
                state.placed.push(PlacedStructure {
                    id: id.to_string(),
                    kind,
                    x,
                    z,
                    owner_id: owner_id.clone(),
                });
                Ok(())
            })
            .await
            .map_err(|err| match err {
                ChunkStoreError::Rejected(_) => unreachable!("pushing a placement never rejects a mutation"),
                ChunkStoreError::Backend(msg) => ArbiterError::Backend(msg),
            })?;
        Ok(ChunkBroadcast {
            world_id: world_id.to_string(),
            chunk_x: cx,
            chunk_z: cz,
            state,
        })
    }

    async fn place_remove(&self, world_id: &str, guest_id: &str, id: &str) -> Result<ChunkBroadcast, ArbiterError> {
        let record = {
            let mut registries = self.placements.lock();
            let registry = registries.entry(world_id.to_string()).or_default();
            registry
                .get(id)
                .cloned()
                .ok_or(ArbiterError::Reject(RejectReason::NotFound))?
        };
        if record.kind.is_chest() {
            if record.owner_id.as_deref() != Some(guest_id) {
                return Err(ArbiterError::Reject(RejectReason::Unauthorized));
            }
            let row = self.chest_store.get(world_id, id).await?;
            if !row.state.is_empty() {
                return Err(ArbiterError::Reject(RejectReason::NotEmpty));
            }
        }
        {
            let mut registries = self.placements.lock();
            let registry = registries.entry(world_id.to_string()).or_default();
            registry
                .remove(id)
                .map_err(|err| ArbiterError::Reject(map_placement_reject(err)))?;
        }
        let (cx, cz) = record.chunk.unpack();
        let state = self
            .chunk_store
            .mutate_chunk(world_id, cx, cz, |state| {
                state.placed.retain(|placed| placed.id != id);
                Ok(())
            })
            .await
            .map_err(|err| match err {
                ChunkStoreError::Rejected(_) => unreachable!("removing a placement never rejects a mutation"),
                ChunkStoreError::Backend(msg) => ArbiterError::Backend(msg),
            })?;
        Ok(ChunkBroadcast {
            world_id: world_id.to_string(),
            chunk_x: cx,
            chunk_z: cz,
            state,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use grove_chest::store::ChestRow;
    use grove_protocol::domain::{ChestState, ItemStack};
    use std::collections::HashMap as StdHashMap;

    #[derive(Default)]
    struct FakeChestStore {
        rows: SyncMutex<StdHashMap<(String, String), ChestRow>>,
        chunks: SyncMutex<StdHashMap<(String, i32, i32), grove_protocol::domain::ChunkState>>,
    }

    impl ChunkStateStore for FakeChestStore {
        async fn get(
            &self,
            world_id: &str,
            cx: i32,
            cz: i32,
        ) -> Result<Option<grove_protocol::domain::ChunkState>, ChunkStoreError> {
            Ok(self.chunks.lock().get(&(world_id.to_string(), cx, cz)).cloned())
        }

        async fn put(
            &self,
            world_id: &str,
            cx: i32,
            cz: i32,
            state: &grove_protocol::domain::ChunkState,
        ) -> Result<(), ChunkStoreError> {
            self.chunks.lock().insert((world_id.to_string(), cx, cz), state.clone());
            Ok(())
        }
    }

    impl ChestStateStore for FakeChestStore {
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

    fn arbiter() -> WorldArbiter<FakeChestStore> {
        let store = Arc::new(FakeChestStore::default());
        WorldArbiter::new(Arc::new(ChunkStore::new(store.clone())), store)
    }

    fn tree_id_in(cx: i32, cz: i32) -> String {
        ChunkSeed::generate(ChunkKey::new(cx, cz)).trees[0].clone()
    }

    #[tokio::test]
    async fn tree_cut_is_accepted_then_rejected_as_already_removed() {
        let arbiter = arbiter();
        let tree_id = tree_id_in(0, 0);
        let event = WorldEvent::TreeCut {
            tree_id: tree_id.clone(),
            x: 1.0,
            z: 1.0,
            at: 0,
        };
        let broadcast = arbiter.dispatch("world-1", "g1", (0.0, 0.0), &event, 0).await.unwrap();
        assert_eq!(broadcast.state.removed_trees, vec![tree_id.clone()]);
        let err = arbiter.dispatch("world-1", "g1", (0.0, 0.0), &event, 0).await.unwrap_err();
        assert!(matches!(err, ArbiterError::Reject(RejectReason::AlreadyRemoved)));
    }

    #[tokio::test]
    async fn tree_cut_rejects_out_of_range() {
        let arbiter = arbiter();
        let tree_id = tree_id_in(0, 0);
        let event = WorldEvent::TreeCut {
            tree_id,
            x: 50.0,
            z: 50.0,
            at: 0,
        };
        let err = arbiter.dispatch("world-1", "g1", (0.0, 0.0), &event, 0).await.unwrap_err();
        assert!(matches!(err, ArbiterError::Reject(RejectReason::OutOfRange)));
    }

    #[tokio::test]
    async fn tree_cut_rejects_unknown_id() {
        let arbiter = arbiter();
        let event = WorldEvent::TreeCut {
            tree_id: "bogus".to_string(),
            x: 1.0,
            z: 1.0,
            at: 0,
        };
        let err = arbiter.dispatch("world-1", "g1", (0.0, 0.0), &event, 0).await.unwrap_err();
        assert!(matches!(err, ArbiterError::Reject(RejectReason::UnknownId)));
    }

    #[tokio::test]
    async fn till_plant_harvest_round_trip() {
        let arbiter = arbiter();
        arbiter
            .dispatch(
                "world-1",
                "g1",
                (0.0, 0.0),
                &WorldEvent::PlotTill { x: 1.0, z: 1.0, at: 0 },
                0,
            )
            .await
            .unwrap();
        let plant_err = arbiter
            .dispatch(
                "world-1",
                "g1",
                (0.0, 0.0),
                &WorldEvent::Plant {
                    plot_id: "1:1".to_string(),
                    seed_id: "bogus".to_string(),
                    at: 0,
                },
                0,
            )
            .await
            .unwrap_err();
        assert!(matches!(plant_err, ArbiterError::Reject(RejectReason::InvalidSeed)));
        arbiter
            .dispatch(
                "world-1",
                "g1",
                (0.0, 0.0),
                &WorldEvent::Plant {
                    plot_id: "1:1".to_string(),
                    seed_id: "wheat".to_string(),
                    at: 0,
                },
                0,
            )
            .await
            .unwrap();
        let not_ready = arbiter
            .dispatch(
                "world-1",
                "g1",
                (0.0, 0.0),
                &WorldEvent::Harvest {
                    plot_id: "1:1".to_string(),
                    at: 0,
                },
                1_000,
            )
            .await
            .unwrap_err();
        assert!(matches!(not_ready, ArbiterError::Reject(RejectReason::NotReady)));
        let broadcast = arbiter
            .dispatch(
                "world-1",
                "g1",
                (0.0, 0.0),
                &WorldEvent::Harvest {
                    plot_id: "1:1".to_string(),
                    at: 0,
                },
                60_000,
            )
            .await
            .unwrap();
        assert!(!broadcast.state.farm_plots[0].is_planted());
    }

    #[tokio::test]
    async fn place_chest_then_non_owner_remove_is_unauthorized() {
        let arbiter = arbiter();
        arbiter
            .dispatch(
                "world-1",
                "g1",
                (0.0, 0.0),
                &WorldEvent::Place {
                    id: "C1".to_string(),
                    place_kind: PlacementKind::Chest,
                    x: 1.0,
                    z: 1.0,
                    at: 0,
                },
                0,
            )
            .await
            .unwrap();
        let err = arbiter
            .dispatch(
                "world-1",
                "g2",
                (0.0, 0.0),
                &WorldEvent::PlaceRemove {
                    id: "C1".to_string(),
                    at: 0,
                },
                0,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ArbiterError::Reject(RejectReason::Unauthorized)));
    }

    #[tokio::test]
    async fn place_chest_remove_rejects_when_not_empty() {
        let arbiter = arbiter();
        arbiter
            .dispatch(
                "world-1",
                "g1",
                (0.0, 0.0),
                &WorldEvent::Place {
                    id: "C1".to_string(),
                    place_kind: PlacementKind::Chest,
                    x: 1.0,
                    z: 1.0,
                    at: 0,
                },
                0,
            )
            .await
            .unwrap();
        let mut state = ChestState::default();
        state.slots[0] = Some(ItemStack { id: "log".to_string(), qty: 1 });
        arbiter.chest_store.put_state("world-1", "C1", &state, 0).await.unwrap();
        let err = arbiter
            .dispatch(
                "world-1",
                "g1",
                (0.0, 0.0),
                &WorldEvent::PlaceRemove {
                    id: "C1".to_string(),
                    at: 0,
                },
                0,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ArbiterError::Reject(RejectReason::NotEmpty)));
    }

    #[tokio::test]
    async fn respawn_ticker_restores_removed_tree_after_delay() {
        let arbiter = arbiter();
        let tree_id = tree_id_in(0, 0);
        arbiter
            .dispatch(
                "world-1",
                "g1",
                (0.0, 0.0),
                &WorldEvent::TreeCut {
                    tree_id: tree_id.clone(),
                    x: 1.0,
                    z: 1.0,
                    at: 0,
                },
                0,
            )
            .await
            .unwrap();
        assert!(arbiter.drain_due_respawns(4_000).await.is_empty());
        let broadcasts = arbiter.drain_due_respawns(6_000).await;
        assert_eq!(broadcasts.len(), 1);
        assert!(!broadcasts[0].state.removed_trees.contains(&tree_id));
    }
}
