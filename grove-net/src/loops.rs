//! Background per-world tick loops: movement integration and the position-snapshot broadcaster
//! (§4.9, §5), run the same cancellable-loop way as [`grove_forge::ForgeWorker`].

use crate::gateway::GatewayState;
use crate::movement::{integrate, Collider, InputSample, Pose, PLAYER_RADIUS, TRUNK_RADIUS};
use crate::session::{Session, SessionRegistry};
use grove_chest::store::ChestStateStore;
use grove_protocol::ServerMessage;
use grove_utils::{ChunkKey, Clock, Vector2};
use grove_world::chunk_store::{ChunkStateStore, ChunkStore};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Movement integration runs at a fixed internal rate independent of `snapshot_hz`, since clients
/// can send input samples faster than the broadcast rate.
const MOVEMENT_TICK_HZ: u64 = 30;

/// Same cadence as the furnace worker's scan loop (§4.6 context 2): frequent enough that a
/// respawn feels prompt, cheap enough to run every tick.
const RESPAWN_SCAN_HZ: u64 = 1;

/// Drains queued input for every connected session and integrates its pose against the colliders
/// of its subscribed chunks, until `cancel` fires.
pub async fn run_movement_loop<CS: ChunkStateStore>(
    sessions: Arc<SessionRegistry>,
    chunk_store: Arc<ChunkStore<CS>>,
    chunk_size: i32,
    cancel: CancellationToken,
) {
    let mut ticker = tokio::time::interval(Duration::from_millis(1000 / MOVEMENT_TICK_HZ));
    loop {
        tokio::select! {
            () = cancel.cancelled() => {
                tracing::info!("movement loop shutting down");
                break;
            }
            _ = ticker.tick() => {
                for world_id in sessions.active_worlds() {
                    for session in sessions.sessions_in(&world_id) {
                        integrate_session(&session, &chunk_store, &world_id, chunk_size).await;
                    }
                }
            }
        }
    }
}

async fn integrate_session<CS: ChunkStateStore>(
    session: &Arc<Session>,
    chunk_store: &ChunkStore<CS>,
    world_id: &str,
    chunk_size: i32,
) {
    let samples = session.drain_inputs().await;
    if samples.is_empty() {
        return;
    }
    let mut pose = session.pose();
    let colliders = colliders_near(chunk_store, world_id, pose, chunk_size).await;
    for sample in samples {
        pose = integrate(pose, sample, &colliders);
    }
    session.set_pose(pose);
}

/// Tree trunks and placed structures in the pose's chunk and its 8 neighbors (§4.9). Terrain
/// features such as the mine ring or river/lake rings named alongside these in the design notes
/// have no backing data model anywhere in this workspace, so they are intentionally left
/// unmodeled rather than approximated; see `DESIGN.md`.
async fn colliders_near<CS: ChunkStateStore>(
    chunk_store: &ChunkStore<CS>,
    world_id: &str,
    pose: Pose,
    chunk_size: i32,
) -> Vec<Collider> {
    let center = ChunkKey::containing(pose.x, pose.z, chunk_size);
    let mut colliders = Vec::new();
    for key in center.with_neighbors() {
        let (cx, cz) = key.unpack();
        let state = match chunk_store.read_chunk(world_id, cx, cz).await {
            Ok(state) => state,
            Err(err) => {
                tracing::warn!(world_id, cx, cz, error = %err, "skipping chunk colliders, backend unavailable");
                continue;
            }
        };
        let seed = grove_world::ChunkSeed::generate(key);
        for (id, x, z) in seed.tree_positions(key, chunk_size) {
            if state.removed_trees.iter().any(|t| t == &id) {
                continue;
            }
            colliders.push(Collider { center: Vector2::new(x, z), radius: TRUNK_RADIUS });
        }
        for placed in &state.placed {
            colliders.push(Collider {
                center: Vector2::new(placed.x, placed.z),
                radius: placed.kind.min_spacing_m() / 2.0 + PLAYER_RADIUS,
            });
        }
    }
    colliders
}

/// Broadcasts a `snapshot` of every connected player's pose to every session in the same world,
/// at `hz`, until `cancel` fires (§4.9, §6.1).
pub async fn run_snapshot_loop(sessions: Arc<SessionRegistry>, hz: u32, cancel: CancellationToken) {
    let hz = hz.max(1);
    let mut ticker = tokio::time::interval(Duration::from_millis(1000 / u64::from(hz)));
    loop {
        tokio::select! {
            () = cancel.cancelled() => {
                tracing::info!("snapshot loop shutting down");
                break;
            }
            _ = ticker.tick() => {
                for world_id in sessions.active_worlds() {
                    let in_world = sessions.sessions_in(&world_id);
                    if in_world.is_empty() {
                        continue;
                    }
                    let players = in_world.iter().map(|s| s.wire_pose()).collect();
                    let frame = ServerMessage::Snapshot { players };
                    for session in &in_world {
                        session.send(frame.clone());
                    }
                }
            }
        }
    }
}

/// Drains every chunk respawn due across every world and broadcasts the results, until `cancel`
/// fires (§4.2 respawn timers).
pub async fn run_respawn_loop<CS: ChestStateStore + ChunkStateStore>(
    gateway: Arc<GatewayState<CS>>,
    cancel: CancellationToken,
) {
    let mut ticker = tokio::time::interval(Duration::from_millis(1000 / RESPAWN_SCAN_HZ));
    loop {
        tokio::select! {
            () = cancel.cancelled() => {
                tracing::info!("respawn loop shutting down");
                break;
            }
            _ = ticker.tick() => {
                let now_ms = gateway.clock.now_ms();
                for broadcast in gateway.arbiter.drain_due_respawns(now_ms).await {
                    gateway.broadcast_chunk(&broadcast);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::movement::WALK_SPEED;
    use grove_protocol::inbound::InputKeys;
    use grove_world::chunk_store::ChunkStoreError;
    use std::collections::HashMap as StdHashMap;

    #[derive(Default)]
    struct FakeChunkStore {
        rows: grove_utils::SyncMutex<StdHashMap<(String, i32, i32), grove_protocol::domain::ChunkState>>,
    }

    impl ChunkStateStore for FakeChunkStore {
        async fn get(
            &self,
            world_id: &str,
            cx: i32,
            cz: i32,
        ) -> Result<Option<grove_protocol::domain::ChunkState>, ChunkStoreError> {
            Ok(self.rows.lock().get(&(world_id.to_string(), cx, cz)).cloned())
        }

        async fn put(
            &self,
            world_id: &str,
            cx: i32,
            cz: i32,
            state: &grove_protocol::domain::ChunkState,
        ) -> Result<(), ChunkStoreError> {
            self.rows.lock().insert((world_id.to_string(), cx, cz), state.clone());
            Ok(())
        }
    }

    #[tokio::test]
    async fn integrate_session_consumes_queued_input() {
        let (session, _rx) = Session::new(1, "g1".into(), "world-1".into(), Pose::spawn(0.0, 1.65, 0.0), 8, 0);
        session.enqueue_input(
            InputSample { keys: InputKeys { w: true, ..InputKeys::default() }, yaw: 0.0, dt: 0.1 },
            1,
            0,
        );
        let chunk_store = ChunkStore::new(Arc::new(FakeChunkStore::default()));
        integrate_session(&session, &chunk_store, "world-1", 32).await;
        let moved = session.pose();
        assert!(moved.z > 0.0, "forward input at yaw=0 should move +z");
        assert!(moved.z <= WALK_SPEED * 0.1 + 1e-6);
    }

    #[tokio::test]
    async fn integrate_session_is_noop_with_no_queued_input() {
        let spawn = Pose::spawn(1.0, 1.65, 2.0);
        let (session, _rx) = Session::new(1, "g1".into(), "world-1".into(), spawn, 8, 0);
        let chunk_store = ChunkStore::new(Arc::new(FakeChunkStore::default()));
        integrate_session(&session, &chunk_store, "world-1", 32).await;
        assert_eq!(session.pose(), spawn);
    }
}
