//! The HTTP control surface (§6.2): auth lifecycle, player-state/settings blobs, and the
//! lock-moderated chest/forge read-modify-write endpoints.

use crate::app::AppState;
use crate::error::GatewayError;
use crate::stores::{PlayerStateStore, SettingsStore};
use axum::extract::{Query, State};
use axum::Json;
use grove_auth::AuthStore;
use grove_chest::store::ChestStateStore;
use grove_forge::store::ForgeStateStore;
use grove_lock::KeyValueStore;
use grove_protocol::domain::{ChestState, FurnaceState};
use serde::{Deserialize, Serialize};
fn forge_lock_key(world_id: &str, forge_id: &str) -> String {
    format!("lock:forge:{world_id}:{forge_id}")
}

/// Advances `forge_id`'s state by however long it sat unobserved, persists, and returns the
/// result (§4.6 context 1). A free function rather than `grove_forge::catch_up` because the
/// latter is generic over a concrete `Clock`, and this handler only has the gateway's
/// `Arc<dyn Clock>` to work with.
async fn catch_up_forge<St: ForgeStateStore>(
    store: &St,
    world_id: &str,
    forge_id: &str,
    now_ms: i64,
) -> Result<FurnaceState, GatewayError> {
    let (state, updated_at_ms) = store.get(world_id, forge_id).await?;
    let dt_secs = (now_ms - updated_at_ms).max(0) as f64 / 1000.0;
    let next = grove_forge::advance_furnace(&state, dt_secs);
    store.put(world_id, forge_id, &next, now_ms).await?;
    Ok(next)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceGuestRequest {
    device_key: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    username: String,
    password: String,
    guest_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    username: String,
    password: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentityResponse {
    guest_id: String,
    world_id: String,
    token: String,
    token_exp_ms: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterResponse {
    user_id: String,
    guest_id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OkResponse {
    ok: bool,
}

/// `POST /api/auth/device/guest`.
pub async fn device_guest<St, Kv>(
    State(state): State<AppState<St, Kv>>,
    Json(req): Json<DeviceGuestRequest>,
) -> Result<Json<IdentityResponse>, GatewayError>
where
    St: AuthStore + Send + Sync + 'static,
    Kv: Send + Sync + 'static,
{
    let now_ms = state.gateway.clock.now_ms();
    let identity = state.auth.device_guest(&req.device_key, now_ms).await?;
    Ok(Json(IdentityResponse {
        guest_id: identity.guest_id,
        world_id: identity.world_id,
        token: identity.token.token,
        token_exp_ms: identity.token.exp_ms,
    }))
}

/// `POST /api/auth/register`.
pub async fn register<St, Kv>(
    State(state): State<AppState<St, Kv>>,
    Json(req): Json<RegisterRequest>,
) -> Result<Json<RegisterResponse>, GatewayError>
where
    St: AuthStore + Send + Sync + 'static,
    Kv: Send + Sync + 'static,
{
    let now_ms = state.gateway.clock.now_ms();
    let registered = state
        .auth
        .register(&req.username, &req.password, req.guest_id.as_deref(), now_ms)
        .await?;
    Ok(Json(RegisterResponse {
        user_id: registered.user_id,
        guest_id: registered.identity.guest_id,
    }))
}

/// `POST /api/auth/login`.
pub async fn login<St, Kv>(
    State(state): State<AppState<St, Kv>>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<IdentityResponse>, GatewayError>
where
    St: AuthStore + Send + Sync + 'static,
    Kv: Send + Sync + 'static,
{
    let now_ms = state.gateway.clock.now_ms();
    let identity = state.auth.login(&req.username, &req.password, now_ms).await?;
    Ok(Json(IdentityResponse {
        guest_id: identity.guest_id,
        world_id: identity.world_id,
        token: identity.token.token,
        token_exp_ms: identity.token.exp_ms,
    }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerStateQuery {
    guest_id: String,
    world_id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BlobResponse {
    state: serde_json::Value,
    updated_at: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PutPlayerStateRequest {
    guest_id: String,
    world_id: String,
    state: serde_json::Value,
}

/// `GET /api/player/state?guestId&worldId`.
pub async fn get_player_state<St, Kv>(
    State(state): State<AppState<St, Kv>>,
    Query(q): Query<PlayerStateQuery>,
) -> Result<Json<BlobResponse>, GatewayError>
where
    St: PlayerStateStore + Send + Sync + 'static,
    Kv: Send + Sync + 'static,
{
    let row = state.player_state.get(&q.guest_id, &q.world_id).await?;
    Ok(Json(BlobResponse { state: row.state, updated_at: row.updated_at_ms }))
}

/// `PUT /api/player/state`.
pub async fn put_player_state<St, Kv>(
    State(state): State<AppState<St, Kv>>,
    Json(req): Json<PutPlayerStateRequest>,
) -> Result<Json<OkResponse>, GatewayError>
where
    St: PlayerStateStore + Send + Sync + 'static,
    Kv: Send + Sync + 'static,
{
    let now_ms = state.gateway.clock.now_ms();
    state.player_state.put(&req.guest_id, &req.world_id, &req.state, now_ms).await?;
    Ok(Json(OkResponse { ok: true }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsQuery {
    guest_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PutSettingsRequest {
    guest_id: String,
    state: serde_json::Value,
}

/// `GET /api/settings?guestId`.
pub async fn get_settings<St, Kv>(
    State(state): State<AppState<St, Kv>>,
    Query(q): Query<SettingsQuery>,
) -> Result<Json<BlobResponse>, GatewayError>
where
    St: SettingsStore + Send + Sync + 'static,
    Kv: Send + Sync + 'static,
{
    let row = state.settings.get(&q.guest_id).await?;
    Ok(Json(BlobResponse { state: row.state, updated_at: row.updated_at_ms }))
}

/// `PUT /api/settings`.
pub async fn put_settings<St, Kv>(
    State(state): State<AppState<St, Kv>>,
    Json(req): Json<PutSettingsRequest>,
) -> Result<Json<OkResponse>, GatewayError>
where
    St: SettingsStore + Send + Sync + 'static,
    Kv: Send + Sync + 'static,
{
    let now_ms = state.gateway.clock.now_ms();
    state.settings.put(&req.guest_id, &req.state, now_ms).await?;
    Ok(Json(OkResponse { ok: true }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForgeStateQuery {
    world_id: String,
    forge_id: String,
    guest_id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ForgeStateResponse {
    state: FurnaceState,
    lock_token: String,
    updated_at: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PutForgeStateRequest {
    world_id: String,
    forge_id: String,
    #[serde(rename = "guestId")]
    _guest_id: String,
    lock_token: String,
    state: FurnaceState,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForgeLockRequest {
    world_id: String,
    forge_id: String,
    #[serde(rename = "guestId")]
    _guest_id: String,
    lock_token: String,
}

/// `GET /api/forge/state?worldId&forgeId&guestId` — acquires the lock, then runs offline
/// catch-up (§4.6, §6.2).
pub async fn get_forge_state<St, Kv>(
    State(state): State<AppState<St, Kv>>,
    Query(q): Query<ForgeStateQuery>,
) -> Result<Json<ForgeStateResponse>, GatewayError>
where
    St: ForgeStateStore + Send + Sync + 'static,
    Kv: KeyValueStore + Send + Sync + 'static,
{
    let key = forge_lock_key(&q.world_id, &q.forge_id);
    let lock_token = state.forge_locks.acquire(&key, &q.guest_id).await?;
    let now_ms = state.gateway.clock.now_ms();
    let furnace = catch_up_forge(state.forge_store.as_ref(), &q.world_id, &q.forge_id, now_ms).await?;
    Ok(Json(ForgeStateResponse { state: furnace, lock_token, updated_at: now_ms }))
}

/// `PUT /api/forge/state` — verifies the lock token, then persists.
pub async fn put_forge_state<St, Kv>(
    State(state): State<AppState<St, Kv>>,
    Json(req): Json<PutForgeStateRequest>,
) -> Result<Json<OkResponse>, GatewayError>
where
    St: ForgeStateStore + Send + Sync + 'static,
    Kv: KeyValueStore + Send + Sync + 'static,
{
    let key = forge_lock_key(&req.world_id, &req.forge_id);
    state.forge_locks.renew(&key, &req.lock_token).await?;
    let now_ms = state.gateway.clock.now_ms();
    state.forge_store.put(&req.world_id, &req.forge_id, &req.state, now_ms).await?;
    Ok(Json(OkResponse { ok: true }))
}

/// `POST /api/forge/lock/renew`.
pub async fn renew_forge_lock<St, Kv>(
    State(state): State<AppState<St, Kv>>,
    Json(req): Json<ForgeLockRequest>,
) -> Result<Json<OkResponse>, GatewayError>
where
    St: Send + Sync + 'static,
    Kv: KeyValueStore + Send + Sync + 'static,
{
    let key = forge_lock_key(&req.world_id, &req.forge_id);
    state.forge_locks.renew(&key, &req.lock_token).await?;
    Ok(Json(OkResponse { ok: true }))
}

/// `POST /api/forge/lock/release`.
pub async fn release_forge_lock<St, Kv>(
    State(state): State<AppState<St, Kv>>,
    Json(req): Json<ForgeLockRequest>,
) -> Result<Json<OkResponse>, GatewayError>
where
    St: Send + Sync + 'static,
    Kv: KeyValueStore + Send + Sync + 'static,
{
    let key = forge_lock_key(&req.world_id, &req.forge_id);
    state.forge_locks.release(&key, &req.lock_token).await?;
    Ok(Json(OkResponse { ok: true }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChestStateQuery {
    world_id: String,
    chest_id: String,
    guest_id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChestStateResponse {
    state: ChestState,
    lock_token: String,
    updated_at: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PutChestStateRequest {
    world_id: String,
    chest_id: String,
    #[serde(rename = "guestId")]
    _guest_id: String,
    lock_token: String,
    state: ChestState,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChestLockReleaseRequest {
    world_id: String,
    chest_id: String,
    lock_token: String,
}

/// `GET /api/chest/state?worldId&chestId&guestId` (§4.7 read path).
pub async fn get_chest_state<St, Kv>(
    State(state): State<AppState<St, Kv>>,
    Query(q): Query<ChestStateQuery>,
) -> Result<Json<ChestStateResponse>, GatewayError>
where
    St: ChestStateStore + Send + Sync + 'static,
    Kv: KeyValueStore + Send + Sync + 'static,
{
    let (slots, lock_token, updated_at) = state.chest.open(&q.world_id, &q.chest_id, &q.guest_id).await?;
    Ok(Json(ChestStateResponse { state: slots, lock_token, updated_at }))
}

/// `PUT /api/chest/state`.
pub async fn put_chest_state<St, Kv>(
    State(state): State<AppState<St, Kv>>,
    Json(req): Json<PutChestStateRequest>,
) -> Result<Json<OkResponse>, GatewayError>
where
    St: ChestStateStore + Send + Sync + 'static,
    Kv: KeyValueStore + Send + Sync + 'static,
{
    let clock = state.gateway.clock.as_ref();
    state
        .chest
        .write(&req.world_id, &req.chest_id, &req.lock_token, &req.state, &DynClock(clock))
        .await?;
    Ok(Json(OkResponse { ok: true }))
}

/// `POST /api/chest/lock/release`.
pub async fn release_chest_lock<St, Kv>(
    State(state): State<AppState<St, Kv>>,
    Json(req): Json<ChestLockReleaseRequest>,
) -> Result<Json<OkResponse>, GatewayError>
where
    St: ChestStateStore + Send + Sync + 'static,
    Kv: KeyValueStore + Send + Sync + 'static,
{
    state.chest.release_lock(&req.world_id, &req.chest_id, &req.lock_token).await?;
    Ok(Json(OkResponse { ok: true }))
}

/// Adapts a borrowed `&dyn Clock` to the sized `Clock` bound [`ChestService::write`] requires.
struct DynClock<'a>(&'a dyn grove_utils::Clock);

impl grove_utils::Clock for DynClock<'_> {
    fn now_ms(&self) -> i64 {
        self.0.now_ms()
    }
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    ok: bool,
    leader: bool,
}

/// Mirrors `grove_forge::worker`'s private `WORKER_IDENTITY`: the lock service's reentrant
/// "guest id" the furnace worker acquires `lock:forge:worker` under.
const FORGE_WORKER_IDENTITY: &str = "forge-worker";

/// `GET /healthz` — liveness, plus whether this replica currently holds the furnace-worker
/// leadership lock (ambient addition, §6.2).
pub async fn healthz<St, Kv>(State(state): State<AppState<St, Kv>>) -> Json<HealthResponse>
where
    St: Send + Sync + 'static,
    Kv: KeyValueStore + Send + Sync + 'static,
{
    let status = state.forge_locks.status("lock:forge:worker", FORGE_WORKER_IDENTITY).await;
    let leader = matches!(status, Ok(grove_lock::LockStatus { locked: true, by_self: true }));
    Json(HealthResponse { ok: true, leader })
}
