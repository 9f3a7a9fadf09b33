//! Per-connection session state and the per-world session registry (§4.8, §5).

use crate::movement::{InputSample, Pose};
use arc_swap::ArcSwap;
use grove_protocol::outbound::PlayerPose;
use grove_protocol::ServerMessage;
use grove_utils::SyncRwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tokio_util::sync::CancellationToken;

/// Capacity of a session's bounded input queue; small since the movement loop drains it every
/// frame and a backlog only means stale input, never unbounded growth.
const INPUT_QUEUE_CAPACITY: usize = 32;

/// One connected player (§4.8).
///
/// Position is an atomically-swapped [`Pose`] so the movement loop (writer) and the snapshot
/// broadcaster (reader) never contend for a lock (§5: "session position — atomic pointer swap of
/// a small struct").
pub struct Session {
    /// Wire id, echoed in `welcome` and used as the `id` in snapshot poses.
    pub id: u64,
    /// The guest this session authenticated as.
    pub guest_id: String,
    /// The world this session joined.
    pub world_id: String,
    pose: ArcSwap<Pose>,
    outbound_tx: mpsc::Sender<ServerMessage>,
    input_tx: mpsc::Sender<InputSample>,
    input_rx: Mutex<mpsc::Receiver<InputSample>>,
    last_seq: AtomicU64,
    last_input_at_ms: AtomicI64,
    rate_window_started_ms: AtomicI64,
    rate_window_count: AtomicU32,
    cancel: CancellationToken,
}

impl Session {
    /// Builds a session and its outbound receiver half, which the gateway's writer task owns.
    #[must_use]
    pub fn new(
        id: u64,
        guest_id: String,
        world_id: String,
        spawn: Pose,
        outbound_buffer: usize,
        now_ms: i64,
    ) -> (Arc<Self>, mpsc::Receiver<ServerMessage>) {
        let (outbound_tx, outbound_rx) = mpsc::channel(outbound_buffer);
        let (input_tx, input_rx) = mpsc::channel(INPUT_QUEUE_CAPACITY);
        let session = Arc::new(Self {
            id,
            guest_id,
            world_id,
            pose: ArcSwap::new(Arc::new(spawn)),
            outbound_tx,
            input_tx,
            input_rx: Mutex::new(input_rx),
            last_seq: AtomicU64::new(0),
            last_input_at_ms: AtomicI64::new(now_ms),
            rate_window_started_ms: AtomicI64::new(now_ms),
            rate_window_count: AtomicU32::new(0),
            cancel: CancellationToken::new(),
        });
        (session, outbound_rx)
    }

    /// The session's current pose.
    #[must_use]
    pub fn pose(&self) -> Pose {
        **self.pose.load()
    }

    /// Publishes a new pose, visible to the next snapshot read.
    pub fn set_pose(&self, pose: Pose) {
        self.pose.store(Arc::new(pose));
    }

    /// The compact wire form of this session's current pose (§6.1 `snapshot`).
    #[must_use]
    pub fn wire_pose(&self) -> PlayerPose {
        let pose = self.pose();
        (self.id, pose.x, pose.y, pose.z, pose.yaw)
    }

    /// Enqueues an input sample for the movement loop to integrate, and records `seq`/`at_ms`.
    /// Drops the sample if the queue is full rather than blocking the inbound reader (§4.8).
    pub fn enqueue_input(&self, sample: InputSample, seq: u64, at_ms: i64) {
        self.last_seq.store(seq, Ordering::Relaxed);
        self.last_input_at_ms.store(at_ms, Ordering::Relaxed);
        let _ = self.input_tx.try_send(sample);
    }

    /// Drains every input sample queued since the last call, in arrival order.
    pub async fn drain_inputs(&self) -> Vec<InputSample> {
        let mut rx = self.input_rx.lock().await;
        let mut out = Vec::new();
        while let Ok(sample) = rx.try_recv() {
            out.push(sample);
        }
        out
    }

    /// Wall-clock time of the last accepted `input`, for the 30 s idle-timeout sweep (§5).
    #[must_use]
    pub fn last_input_at_ms(&self) -> i64 {
        self.last_input_at_ms.load(Ordering::Relaxed)
    }

    /// Whether accepting one more inbound frame at `now_ms` would exceed `max_per_sec` within the
    /// current one-second sliding window (§6.1 `rate_limited`). Only the session's own inbound
    /// reader task calls this, so plain atomics are sufficient.
    pub fn rate_limited(&self, now_ms: i64, max_per_sec: u32) -> bool {
        let window_started = self.rate_window_started_ms.load(Ordering::Relaxed);
        if now_ms - window_started >= 1000 {
            self.rate_window_started_ms.store(now_ms, Ordering::Relaxed);
            self.rate_window_count.store(1, Ordering::Relaxed);
            return false;
        }
        self.rate_window_count.fetch_add(1, Ordering::Relaxed) + 1 > max_per_sec
    }

    /// Pushes a frame onto this session's outbound lane. Closes the session on overflow rather
    /// than blocking the broadcaster or the arbiter (§5 per-session writer lane).
    pub fn send(&self, msg: ServerMessage) {
        if self.outbound_tx.try_send(msg).is_err() {
            tracing::warn!(session_id = self.id, "outbound buffer full, closing session");
            self.cancel.cancel();
        }
    }

    /// The token that closes this session's gateway task, either from an explicit error close or
    /// from outbound backpressure.
    #[must_use]
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }
}

#[derive(Default)]
struct WorldSessions {
    by_id: SyncRwLock<HashMap<u64, Arc<Session>>>,
}

/// Per-world registry of connected sessions (§4.8), mirroring the chunk store's per-world
/// sharding (`grove_world::chunk_store::ChunkStore`).
#[derive(Default)]
pub struct SessionRegistry {
    worlds: scc::HashMap<String, Arc<WorldSessions>>,
    next_id: AtomicU64,
}

impl SessionRegistry {
    /// Builds an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocates the next session id, unique for the process's lifetime.
    pub fn next_session_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed) + 1
    }

    fn world_slot(&self, world_id: &str) -> Arc<WorldSessions> {
        if let Some(slot) = self.worlds.read(world_id, |_, slot| slot.clone()) {
            return slot;
        }
        let slot = Arc::new(WorldSessions::default());
        match self.worlds.insert(world_id.to_string(), slot.clone()) {
            Ok(()) => slot,
            Err((_, existing)) => existing,
        }
    }

    /// Registers `session` in its world.
    pub fn insert(&self, session: Arc<Session>) {
        let slot = self.world_slot(&session.world_id);
        slot.by_id.write().insert(session.id, session);
    }

    /// Removes a session on disconnect.
    pub fn remove(&self, world_id: &str, session_id: u64) {
        if let Some(slot) = self.worlds.read(world_id, |_, slot| slot.clone()) {
            slot.by_id.write().remove(&session_id);
        }
    }

    /// Snapshots every session currently in `world_id`, under a read lock (§5 broadcast fan-out).
    #[must_use]
    pub fn sessions_in(&self, world_id: &str) -> Vec<Arc<Session>> {
        let Some(slot) = self.worlds.read(world_id, |_, slot| slot.clone()) else {
            return Vec::new();
        };
        slot.by_id.read().values().cloned().collect()
    }

    /// Every world id with a registered session slot, for loops that iterate all worlds.
    #[must_use]
    pub fn active_worlds(&self) -> Vec<String> {
        let mut out = Vec::new();
        self.worlds.scan(|world_id, _| out.push(world_id.clone()));
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pose() -> Pose {
        Pose::spawn(0.0, 1.65, 0.0)
    }

    #[test]
    fn insert_then_sessions_in_reflects_membership() {
        let registry = SessionRegistry::new();
        let (session, _rx) = Session::new(1, "g1".into(), "world-1".into(), pose(), 128, 0);
        registry.insert(session);
        let sessions = registry.sessions_in("world-1");
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].id, 1);
    }

    #[test]
    fn remove_drops_the_session() {
        let registry = SessionRegistry::new();
        let (session, _rx) = Session::new(1, "g1".into(), "world-1".into(), pose(), 128, 0);
        registry.insert(session);
        registry.remove("world-1", 1);
        assert!(registry.sessions_in("world-1").is_empty());
    }

    #[test]
    fn unrelated_worlds_do_not_share_sessions() {
        let registry = SessionRegistry::new();
        let (session, _rx) = Session::new(1, "g1".into(), "world-1".into(), pose(), 128, 0);
        registry.insert(session);
        assert!(registry.sessions_in("world-2").is_empty());
    }

    #[tokio::test]
    async fn rate_limited_resets_each_window() {
        let (session, _rx) = Session::new(1, "g1".into(), "world-1".into(), pose(), 128, 0);
        for _ in 0..60 {
            assert!(!session.rate_limited(0, 60));
        }
        assert!(session.rate_limited(0, 60));
        assert!(!session.rate_limited(1_000, 60));
    }

    #[tokio::test]
    async fn queued_inputs_drain_in_order() {
        let (session, _rx) = Session::new(1, "g1".into(), "world-1".into(), pose(), 128, 0);
        let sample = InputSample {
            keys: grove_protocol::inbound::InputKeys::default(),
            yaw: 0.0,
            dt: 0.05,
        };
        session.enqueue_input(sample, 1, 100);
        session.enqueue_input(sample, 2, 200);
        let drained = session.drain_inputs().await;
        assert_eq!(drained.len(), 2);
        assert_eq!(session.last_input_at_ms(), 200);
    }
}
