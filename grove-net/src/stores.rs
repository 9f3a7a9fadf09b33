//! Persistence seams the distilled spec treats as ambient: per-player progress blobs and
//! per-guest client settings (§4.10). Same narrow-trait-plus-SQL-implementation shape as
//! [`grove_forge::store::ForgeStateStore`] and [`grove_chest::store::ChestStateStore`].

use std::future::Future;
use thiserror::Error;

/// Errors from the player-state/settings persistence layer.
#[derive(Debug, Error)]
pub enum BlobStoreError {
    /// No row exists for this key.
    #[error("not found")]
    NotFound,
    /// The backing store could not be reached.
    #[error("backend unavailable: {0}")]
    Backend(String),
}

impl From<BlobStoreError> for crate::error::GatewayError {
    fn from(err: BlobStoreError) -> Self {
        match err {
            BlobStoreError::NotFound => Self::NotFound,
            BlobStoreError::Backend(msg) => Self::DbUnavailable(msg),
        }
    }
}

/// A stored opaque-JSON blob plus its server-stamped write time.
#[derive(Debug, Clone, PartialEq)]
pub struct BlobRow {
    /// Opaque client-defined JSON payload.
    pub state: serde_json::Value,
    /// Last write time, epoch milliseconds.
    pub updated_at_ms: i64,
}

/// Read/write access to per-`(guestId, worldId)` progress blobs (§6.3 `player_state`).
pub trait PlayerStateStore: Send + Sync {
    /// Reads a player's progress blob for one world.
    fn get(
        &self,
        guest_id: &str,
        world_id: &str,
    ) -> impl Future<Output = Result<BlobRow, BlobStoreError>> + Send;

    /// Overwrites a player's progress blob, last-write-wins.
    fn put(
        &self,
        guest_id: &str,
        world_id: &str,
        state: &serde_json::Value,
        updated_at_ms: i64,
    ) -> impl Future<Output = Result<(), BlobStoreError>> + Send;
}

/// Read/write access to per-guest client settings (§6.3 `settings`).
pub trait SettingsStore: Send + Sync {
    /// Reads a guest's settings blob.
    fn get(&self, guest_id: &str) -> impl Future<Output = Result<BlobRow, BlobStoreError>> + Send;

    /// Overwrites a guest's settings blob, last-write-wins.
    fn put(
        &self,
        guest_id: &str,
        state: &serde_json::Value,
        updated_at_ms: i64,
    ) -> impl Future<Output = Result<(), BlobStoreError>> + Send;
}
