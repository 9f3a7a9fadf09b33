//! The chunk-sharded persistent world model: chunk store with respawn timers (§4.2), the
//! placed-object registry (§4.3), and farm-plot lifecycle helpers used by the arbiter (§4.4).

/// Deterministic per-chunk resource seeding (invariant 1: removed sets are subsets of the
/// world's seeded ids).
pub mod seed;
/// Respawn scheduling: a min-heap of pending respawns per chunk.
pub mod respawn;
/// The chunk store: `readChunk`/`mutateChunk`/`subscribeWorld` (§4.2).
pub mod chunk_store;
/// The placed-object registry (§4.3).
pub mod placements;
/// Pure farm-plot transition helpers used by the arbiter (§4.4, invariant 5).
pub mod farm;

pub use chunk_store::{ChunkDelta, ChunkStateStore, ChunkStore, ChunkStoreError};
pub use placements::{PlacedObjectRegistry, PlacementError, PlacementRecord};
pub use respawn::{ResourceKind, RESPAWN_SECS};
pub use seed::ChunkSeed;
