//! Persistence seam for chest rows (§6.3 `chest_state`).

use grove_protocol::domain::ChestState;
use std::future::Future;
use thiserror::Error;

/// Errors from the chest persistence layer.
#[derive(Debug, Error)]
pub enum ChestStoreError {
    /// No row exists for this `(worldId, chestId)`.
    #[error("chest not found")]
    NotFound,
    /// The backing store could not be reached.
    #[error("backend unavailable: {0}")]
    Backend(String),
}

/// A persisted chest row.
#[derive(Debug, Clone, PartialEq)]
pub struct ChestRow {
    /// The 15 inventory slots.
    pub state: ChestState,
    /// The guest that owns this chest (invariant 3).
    pub owner_id: String,
    /// Last write time, epoch milliseconds.
    pub updated_at_ms: i64,
}

/// Read/write access to persisted chest rows.
pub trait ChestStateStore: Send + Sync {
    /// Reads the chest's current row.
    fn get(
        &self,
        world_id: &str,
        chest_id: &str,
    ) -> impl Future<Output = Result<ChestRow, ChestStoreError>> + Send;

    /// Creates a chest row at placement time, owned by `owner_id` (§3.3).
    fn create(
        &self,
        world_id: &str,
        chest_id: &str,
        owner_id: &str,
        updated_at_ms: i64,
    ) -> impl Future<Output = Result<(), ChestStoreError>> + Send;

    /// Overwrites a chest's slot state.
    fn put_state(
        &self,
        world_id: &str,
        chest_id: &str,
        state: &ChestState,
        updated_at_ms: i64,
    ) -> impl Future<Output = Result<(), ChestStoreError>> + Send;
}
