//! Wires the gateway, HTTP control surface, and every service they share into one axum
//! `Router` (§6.1, §6.2).

use crate::gateway::{ws_handler, GatewayState};
use crate::http;
use crate::stores::{PlayerStateStore, SettingsStore};
use axum::extract::FromRef;
use axum::routing::{get, post};
use axum::Router;
use grove_auth::AuthStore;
use grove_chest::service::ChestService;
use grove_chest::store::ChestStateStore;
use grove_forge::store::ForgeStateStore;
use grove_lock::{KeyValueStore, LockService};
use grove_world::chunk_store::ChunkStateStore;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Every service the HTTP and WS surfaces share, generic over the persistent store (`St`) and
/// the key-value backend (`Kv`) the lock services run on.
pub struct AppState<St, Kv> {
    /// Session gateway state, shared with the WS upgrade handler.
    pub gateway: Arc<GatewayState<St>>,
    /// Guest/device/registered-user lifecycle.
    pub auth: Arc<grove_auth::AuthService<St>>,
    /// Ownership-gated, lock-moderated chest reads/writes.
    pub chest: Arc<ChestService<St, Kv>>,
    /// Furnace rows, read directly by the HTTP handlers for offline catch-up.
    pub forge_store: Arc<St>,
    /// Locks guarding forge reads/writes, keyed `lock:forge:<worldId>:<forgeId>`.
    pub forge_locks: Arc<LockService<Kv>>,
    /// Per-player progress blobs.
    pub player_state: Arc<St>,
    /// Per-guest client settings.
    pub settings: Arc<St>,
}

impl<St, Kv> Clone for AppState<St, Kv> {
    fn clone(&self) -> Self {
        Self {
            gateway: self.gateway.clone(),
            auth: self.auth.clone(),
            chest: self.chest.clone(),
            forge_store: self.forge_store.clone(),
            forge_locks: self.forge_locks.clone(),
            player_state: self.player_state.clone(),
            settings: self.settings.clone(),
        }
    }
}

impl<St, Kv> FromRef<AppState<St, Kv>> for Arc<GatewayState<St>> {
    fn from_ref(app: &AppState<St, Kv>) -> Self {
        app.gateway.clone()
    }
}

/// Builds the full router: the WS upgrade route plus every `/api/...` handler (§6.1, §6.2),
/// with a tracing layer and permissive CORS over the whole surface.
#[must_use]
pub fn build_router<St, Kv>(state: AppState<St, Kv>) -> Router
where
    St: ChestStateStore
        + ChunkStateStore
        + ForgeStateStore
        + AuthStore
        + PlayerStateStore
        + SettingsStore
        + Send
        + Sync
        + 'static,
    Kv: KeyValueStore + Send + Sync + 'static,
{
    Router::new()
        .route("/ws", get(ws_handler::<St>))
        .route("/api/auth/device/guest", post(http::device_guest::<St, Kv>))
        .route("/api/auth/register", post(http::register::<St, Kv>))
        .route("/api/auth/login", post(http::login::<St, Kv>))
        .route(
            "/api/player/state",
            get(http::get_player_state::<St, Kv>).put(http::put_player_state::<St, Kv>),
        )
        .route(
            "/api/forge/state",
            get(http::get_forge_state::<St, Kv>).put(http::put_forge_state::<St, Kv>),
        )
        .route("/api/forge/lock/renew", post(http::renew_forge_lock::<St, Kv>))
        .route("/api/forge/lock/release", post(http::release_forge_lock::<St, Kv>))
        .route(
            "/api/chest/state",
            get(http::get_chest_state::<St, Kv>).put(http::put_chest_state::<St, Kv>),
        )
        .route("/api/chest/lock/release", post(http::release_chest_lock::<St, Kv>))
        .route(
            "/api/settings",
            get(http::get_settings::<St, Kv>).put(http::put_settings::<St, Kv>),
        )
        .route("/healthz", get(http::healthz::<St, Kv>))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
