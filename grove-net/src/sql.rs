//! Postgres-backed implementations of every store trait this workspace defines (§6.3). One pool,
//! one struct per table family, each wrapping the same `sqlx::PgPool` — the production
//! counterpart to the in-memory fakes each owning crate tests against.

use crate::stores::{BlobRow, BlobStoreError, PlayerStateStore, SettingsStore};
use grove_auth::{AuthStore, AuthStoreError, DeviceGuestLink, UserRecord};
use grove_chest::store::{ChestRow, ChestStateStore, ChestStoreError};
use grove_forge::store::{ForgeError, ForgeStateStore};
use grove_protocol::domain::{ChestState, ChunkState, FurnaceState};
use grove_world::chunk_store::{ChunkStateStore, ChunkStoreError};
use sqlx::types::Json;
use sqlx::PgPool;

/// Shared Postgres-backed store, implementing every persistence trait the gateway depends on.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Wraps an already-connected pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl ChestStateStore for PgStore {
    async fn get(&self, world_id: &str, chest_id: &str) -> Result<ChestRow, ChestStoreError> {
        let row: Option<(Json<ChestState>, String, i64)> = sqlx::query_as(
            "SELECT state, owner_id, updated_at FROM chest_state WHERE world_id = $1 AND chest_id = $2",
        )
        .bind(world_id)
        .bind(chest_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| ChestStoreError::Backend(e.to_string()))?;
        let (state, owner_id, updated_at_ms) = row.ok_or(ChestStoreError::NotFound)?;
        Ok(ChestRow { state: state.0, owner_id, updated_at_ms })
    }

    async fn create(
        &self,
        world_id: &str,
        chest_id: &str,
        owner_id: &str,
        updated_at_ms: i64,
    ) -> Result<(), ChestStoreError> {
        sqlx::query(
            "INSERT INTO chest_state (world_id, chest_id, owner_id, state, updated_at) \
             VALUES ($1, $2, $3, $4, $5) ON CONFLICT (world_id, chest_id) DO NOTHING",
        )
        .bind(world_id)
        .bind(chest_id)
        .bind(owner_id)
        .bind(Json(ChestState::default()))
        .bind(updated_at_ms)
        .execute(&self.pool)
        .await
        .map_err(|e| ChestStoreError::Backend(e.to_string()))?;
        Ok(())
    }

    async fn put_state(
        &self,
        world_id: &str,
        chest_id: &str,
        state: &ChestState,
        updated_at_ms: i64,
    ) -> Result<(), ChestStoreError> {
        sqlx::query(
            "UPDATE chest_state SET state = $3, updated_at = $4 WHERE world_id = $1 AND chest_id = $2",
        )
        .bind(world_id)
        .bind(chest_id)
        .bind(Json(state.clone()))
        .bind(updated_at_ms)
        .execute(&self.pool)
        .await
        .map_err(|e| ChestStoreError::Backend(e.to_string()))?;
        Ok(())
    }
}

impl ChunkStateStore for PgStore {
    async fn get(&self, world_id: &str, cx: i32, cz: i32) -> Result<Option<ChunkState>, ChunkStoreError> {
        let row: Option<(Json<ChunkState>,)> = sqlx::query_as(
            "SELECT state FROM world_chunk_state WHERE world_id = $1 AND chunk_x = $2 AND chunk_z = $3",
        )
        .bind(world_id)
        .bind(cx)
        .bind(cz)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| ChunkStoreError::Backend(e.to_string()))?;
        Ok(row.map(|(state,)| state.0))
    }

    async fn put(&self, world_id: &str, cx: i32, cz: i32, state: &ChunkState) -> Result<(), ChunkStoreError> {
        sqlx::query(
            "INSERT INTO world_chunk_state (world_id, chunk_x, chunk_z, state, updated_at) \
             VALUES ($1, $2, $3, $4, (extract(epoch from clock_timestamp()) * 1000)::bigint) \
             ON CONFLICT (world_id, chunk_x, chunk_z) DO UPDATE SET state = $4, \
             updated_at = (extract(epoch from clock_timestamp()) * 1000)::bigint",
        )
        .bind(world_id)
        .bind(cx)
        .bind(cz)
        .bind(Json(state.clone()))
        .execute(&self.pool)
        .await
        .map_err(|e| ChunkStoreError::Backend(e.to_string()))?;
        Ok(())
    }
}

impl ForgeStateStore for PgStore {
    async fn get(&self, world_id: &str, forge_id: &str) -> Result<(FurnaceState, i64), ForgeError> {
        let row: Option<(Json<FurnaceState>, i64)> = sqlx::query_as(
            "SELECT state, updated_at FROM forge_state WHERE world_id = $1 AND forge_id = $2",
        )
        .bind(world_id)
        .bind(forge_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| ForgeError::Backend(e.to_string()))?;
        match row {
            Some((state, updated_at_ms)) => Ok((state.0, updated_at_ms)),
            None => {
                let state = FurnaceState::default();
                sqlx::query(
                    "INSERT INTO forge_state (world_id, forge_id, state, updated_at) \
                     VALUES ($1, $2, $3, 0) ON CONFLICT (world_id, forge_id) DO NOTHING",
                )
                .bind(world_id)
                .bind(forge_id)
                .bind(Json(state.clone()))
                .execute(&self.pool)
                .await
                .map_err(|e| ForgeError::Backend(e.to_string()))?;
                Ok((state, 0))
            }
        }
    }

    async fn put(
        &self,
        world_id: &str,
        forge_id: &str,
        state: &FurnaceState,
        updated_at_ms: i64,
    ) -> Result<(), ForgeError> {
        sqlx::query(
            "INSERT INTO forge_state (world_id, forge_id, state, updated_at) VALUES ($1, $2, $3, $4) \
             ON CONFLICT (world_id, forge_id) DO UPDATE SET state = $3, updated_at = $4",
        )
        .bind(world_id)
        .bind(forge_id)
        .bind(Json(state.clone()))
        .bind(updated_at_ms)
        .execute(&self.pool)
        .await
        .map_err(|e| ForgeError::Backend(e.to_string()))?;
        Ok(())
    }

    async fn list_enabled(&self, limit: usize) -> Result<Vec<(String, String)>, ForgeError> {
        let rows: Vec<(String, String)> = sqlx::query_as(
            "SELECT world_id, forge_id FROM forge_state WHERE (state->>'enabled')::boolean = true LIMIT $1",
        )
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| ForgeError::Backend(e.to_string()))?;
        Ok(rows)
    }
}

impl AuthStore for PgStore {
    async fn find_device_link(&self, device_key: &str) -> Result<Option<DeviceGuestLink>, AuthStoreError> {
        let row: Option<(String, bool)> =
            sqlx::query_as("SELECT guest_id, migrated FROM device_guest_links WHERE device_key = $1")
                .bind(device_key)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| AuthStoreError::Backend(e.to_string()))?;
        Ok(row.map(|(guest_id, migrated)| DeviceGuestLink { guest_id, migrated }))
    }

    async fn create_guest(&self, world_id: &str) -> Result<String, AuthStoreError> {
        let (guest_id,): (String,) =
            sqlx::query_as("INSERT INTO guests (world_id) VALUES ($1) RETURNING id::text")
                .bind(world_id)
                .fetch_one(&self.pool)
                .await
                .map_err(|e| AuthStoreError::Backend(e.to_string()))?;
        Ok(guest_id)
    }

    async fn link_device(&self, device_key: &str, guest_id: &str) -> Result<(), AuthStoreError> {
        sqlx::query(
            "INSERT INTO device_guest_links (device_key, guest_id, migrated) VALUES ($1, $2, false)",
        )
        .bind(device_key)
        .bind(guest_id)
        .execute(&self.pool)
        .await
        .map_err(|e| AuthStoreError::Backend(e.to_string()))?;
        Ok(())
    }

    async fn mark_guest_migrated(&self, guest_id: &str) -> Result<(), AuthStoreError> {
        sqlx::query("UPDATE device_guest_links SET migrated = true WHERE guest_id = $1")
            .bind(guest_id)
            .execute(&self.pool)
            .await
            .map_err(|e| AuthStoreError::Backend(e.to_string()))?;
        Ok(())
    }

    async fn guest_world(&self, guest_id: &str) -> Result<String, AuthStoreError> {
        let (world_id,): (String,) = sqlx::query_as("SELECT world_id FROM guests WHERE id::text = $1")
            .bind(guest_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| AuthStoreError::Backend(e.to_string()))?;
        Ok(world_id)
    }

    async fn find_user(&self, username: &str) -> Result<Option<UserRecord>, AuthStoreError> {
        let row: Option<(String, String, String)> = sqlx::query_as(
            "SELECT id::text, password_hash, guest_id FROM users WHERE username = $1",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AuthStoreError::Backend(e.to_string()))?;
        Ok(row.map(|(user_id, password_hash, guest_id)| UserRecord { user_id, password_hash, guest_id }))
    }

    async fn create_user(
        &self,
        username: &str,
        password_hash: &str,
        guest_id: &str,
    ) -> Result<String, AuthStoreError> {
        let (user_id,): (String,) = sqlx::query_as(
            "INSERT INTO users (username, password_hash, guest_id) VALUES ($1, $2, $3) RETURNING id::text",
        )
        .bind(username)
        .bind(password_hash)
        .bind(guest_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AuthStoreError::Backend(e.to_string()))?;
        Ok(user_id)
    }
}

impl PlayerStateStore for PgStore {
    async fn get(&self, guest_id: &str, world_id: &str) -> Result<BlobRow, BlobStoreError> {
        let row: Option<(Json<serde_json::Value>, i64)> = sqlx::query_as(
            "SELECT state, updated_at FROM player_state WHERE guest_id = $1 AND world_id = $2",
        )
        .bind(guest_id)
        .bind(world_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| BlobStoreError::Backend(e.to_string()))?;
        let (state, updated_at_ms) = row.ok_or(BlobStoreError::NotFound)?;
        Ok(BlobRow { state: state.0, updated_at_ms })
    }

    async fn put(
        &self,
        guest_id: &str,
        world_id: &str,
        state: &serde_json::Value,
        updated_at_ms: i64,
    ) -> Result<(), BlobStoreError> {
        sqlx::query(
            "INSERT INTO player_state (guest_id, world_id, state, updated_at) VALUES ($1, $2, $3, $4) \
             ON CONFLICT (guest_id, world_id) DO UPDATE SET state = $3, updated_at = $4",
        )
        .bind(guest_id)
        .bind(world_id)
        .bind(Json(state.clone()))
        .bind(updated_at_ms)
        .execute(&self.pool)
        .await
        .map_err(|e| BlobStoreError::Backend(e.to_string()))?;
        Ok(())
    }
}

impl SettingsStore for PgStore {
    async fn get(&self, guest_id: &str) -> Result<BlobRow, BlobStoreError> {
        let row: Option<(Json<serde_json::Value>, i64)> =
            sqlx::query_as("SELECT state, updated_at FROM settings WHERE guest_id = $1")
                .bind(guest_id)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| BlobStoreError::Backend(e.to_string()))?;
        let (state, updated_at_ms) = row.ok_or(BlobStoreError::NotFound)?;
        Ok(BlobRow { state: state.0, updated_at_ms })
    }

    async fn put(
        &self,
        guest_id: &str,
        state: &serde_json::Value,
        updated_at_ms: i64,
    ) -> Result<(), BlobStoreError> {
        sqlx::query(
            "INSERT INTO settings (guest_id, state, updated_at) VALUES ($1, $2, $3) \
             ON CONFLICT (guest_id) DO UPDATE SET state = $2, updated_at = $3",
        )
        .bind(guest_id)
        .bind(Json(state.clone()))
        .bind(updated_at_ms)
        .execute(&self.pool)
        .await
        .map_err(|e| BlobStoreError::Backend(e.to_string()))?;
        Ok(())
    }
}
