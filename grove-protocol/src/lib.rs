//! The wire protocol and shared domain vocabulary (§6.1, §3.1).
//!
//! ## Design rules
//!
//! 1. Every inbound/outbound frame is `Serialize + Deserialize` with a string tag field so an
//!    unrecognized tag is a deserialization error, never a silently-ignored message (see the
//!    "from dynamic maps to tagged variants" redesign note).
//! 2. Domain value types ([`ItemStack`], [`ChunkState`], [`FurnaceState`], [`ChestState`]) are
//!    the same shape on the wire and at rest — they are what gets persisted as the `state JSON`
//!    column described in §6.3, so there is exactly one definition of each to drift out of sync.
//! 3. No store, lock, or networking logic lives in this crate; it is pure data plus the codec
//!    that rejects malformed frames.

/// Client → server frames (§6.1 inbound).
pub mod inbound;
/// Server → client frames (§6.1 outbound).
pub mod outbound;
/// Shared domain value types: items, chunks, furnaces, chests, farm plots, placements.
pub mod domain;
/// World-event payloads and rejection reasons (§4.4).
pub mod world_event;

pub use domain::{
    ChestState, ChunkState, FarmPlot, FurnaceState, ItemStack, PlacedStructure, PlacementKind,
};
pub use inbound::ClientMessage;
pub use outbound::{ErrorCode, ServerMessage};
pub use world_event::{RejectReason, WorldEvent, WorldEventKind};

/// Protocol version carried on every frame (`v:1`).
pub const PROTOCOL_VERSION: u8 = 1;

/// Fixed world units per chunk edge (§3.1).
pub const CHUNK_SIZE: i32 = 32;

/// Maximum inbound WebSocket frame size, in bytes (§6.1).
pub const MAX_FRAME_BYTES: usize = 16 * 1024;
