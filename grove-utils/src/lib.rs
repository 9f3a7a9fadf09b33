//! Small, dependency-light building blocks shared across the `grove-*` crates:
//! time sources, chunk-key interning, locking aliases, and vector math.

/// Monotonic clock abstraction so simulation code never calls `Instant::now`/`SystemTime::now`
/// directly and can be driven by a fake clock in tests.
pub mod clock;
/// Packed chunk-coordinate keys (see the "string-keyed chunks to indexed arenas" redesign note).
pub mod chunk_key;
/// Type aliases over `parking_lot` so call sites read `SyncMutex`/`SyncRwLock` like the rest of
/// the workspace.
pub mod locks;
/// Minimal 2D/3D vector math used by collision resolution and range checks.
pub mod math;
/// Deterministic, per-world seeded RNG for passive respawn jitter.
pub mod rng;

pub use chunk_key::ChunkKey;
pub use clock::{Clock, SystemClock};
pub use locks::{AsyncMutex, SyncMutex, SyncRwLock};
pub use math::Vector2;
