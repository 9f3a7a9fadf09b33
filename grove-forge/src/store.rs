//! Persistence seam for furnace state (§4.10 pattern: a narrow trait, one production
//! implementation over the SQL store, swappable for an in-memory fake in tests).

use grove_protocol::domain::FurnaceState;
use std::future::Future;
use thiserror::Error;

/// Errors from the furnace persistence layer.
#[derive(Debug, Error)]
pub enum ForgeError {
    /// No row exists for this `(worldId, forgeId)` yet.
    #[error("forge not found")]
    NotFound,
    /// The backing store could not be reached (maps to `db_unavailable`/503).
    #[error("backend unavailable: {0}")]
    Backend(String),
}

/// Read/write access to persisted furnace rows (§6.3 `forge_state`).
pub trait ForgeStateStore: Send + Sync {
    /// Reads a furnace's state and its last write time. Creates and returns an empty row on first
    /// access rather than failing, matching §3.3's "furnaces persist as soon as accessed".
    fn get(
        &self,
        world_id: &str,
        forge_id: &str,
    ) -> impl Future<Output = Result<(FurnaceState, i64), ForgeError>> + Send;

    /// Persists `state` with `updated_at_ms` as the new write time.
    fn put(
        &self,
        world_id: &str,
        forge_id: &str,
        state: &FurnaceState,
        updated_at_ms: i64,
    ) -> impl Future<Output = Result<(), ForgeError>> + Send;

    /// Lists up to `limit` `(worldId, forgeId)` pairs currently `enabled`, for the background
    /// worker's scan (§4.6 context 2).
    fn list_enabled(
        &self,
        limit: usize,
    ) -> impl Future<Output = Result<Vec<(String, String)>, ForgeError>> + Send;
}
