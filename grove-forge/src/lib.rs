//! The background furnace simulator (§4.6): a pure `advance` core, an offline catch-up wrapper,
//! and a leader-elected background worker.

/// The pure `advance(state, Δt) -> state'` core.
pub mod advance;
/// Offline catch-up on open.
pub mod catchup;
/// Persistence seam for furnace rows.
pub mod store;
/// The leader-elected background scan worker.
pub mod worker;

pub use advance::advance as advance_furnace;
pub use catchup::catch_up;
pub use store::{ForgeError, ForgeStateStore};
pub use worker::{ForgeWorker, DEFAULT_SCAN_LIMIT, DEFAULT_WORKER_LOCK_TTL};
