//! The world-event arbitration pipeline (§4.4): one serial dispatch table per world, plus the
//! background respawn sweep that feeds broadcasts independently of player action.

/// Dispatch table and the serial per-world arbiter type.
pub mod dispatch;

pub use dispatch::{
    ArbiterError, ChunkBroadcast, WorldArbiter, DEFAULT_CHUNK_SIZE, DEFAULT_WORLD_EVENT_RADIUS,
};
