//! Boots the gateway: loads configuration, wires every service together, and runs the HTTP/WS
//! listener alongside the background tick loops until asked to shut down.

mod kv;

use crate::kv::AnyKv;
use anyhow::Context;
use grove_arbiter::WorldArbiter;
use grove_auth::{AuthService, TokenCodec};
use grove_chest::ChestService;
use grove_config::Config;
use grove_forge::ForgeWorker;
use grove_lock::{InMemoryKv, LockService, RedisKv};
use grove_net::{loops, AppState, GatewayState, PgStore, SessionRegistry};
use grove_utils::{Clock, SystemClock};
use grove_world::ChunkStore;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = Config::from_env().context("loading configuration from the environment")?;
    grove_config::init(config.clone());

    let pool = PgPoolOptions::new()
        .connect(&config.database_url)
        .await
        .context("connecting to the persistent store")?;
    let store = PgStore::new(pool);

    let kv: Arc<AnyKv> = Arc::new(match &config.shared_redis_url {
        Some(redis_url) => {
            let redis = RedisKv::connect(redis_url).await.context("connecting to the shared lock store")?;
            AnyKv::Redis(redis)
        }
        None => {
            tracing::warn!(
                "SHARED_REDIS_URL not set; running with in-process locks, no furnace worker (§9 Open Question 3)"
            );
            AnyKv::Memory(InMemoryKv::new(Arc::new(SystemClock)))
        }
    });

    let lock_ttl = Duration::from_secs(config.lock_ttl_secs.max(1) as u64);
    let forge_worker_lock_ttl = Duration::from_secs(config.forge_worker_lock_ttl_secs.max(1) as u64);

    let forge_locks = Arc::new(LockService::with_ttl(kv.clone(), lock_ttl));
    let chest_locks = LockService::with_ttl(kv.clone(), lock_ttl);

    let store_arc = Arc::new(store.clone());
    let chunk_store = Arc::new(ChunkStore::new(store_arc.clone()));
    let arbiter = Arc::new(WorldArbiter::with_config(
        chunk_store.clone(),
        store_arc.clone(),
        config.chunk_size,
        config.world_event_radius,
    ));
    let sessions = Arc::new(SessionRegistry::new());
    let tokens = Arc::new(TokenCodec::new(config.ws_auth_secret.clone().into_bytes()));
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    let gateway = Arc::new(GatewayState {
        chunk_store: chunk_store.clone(),
        arbiter: arbiter.clone(),
        sessions: sessions.clone(),
        tokens: tokens.clone(),
        clock: clock.clone(),
        chunk_size: config.chunk_size,
        world_event_radius: config.world_event_radius,
        max_frame_bytes: config.max_ws_frame_bytes,
        max_inbound_msgs_per_sec: config.max_inbound_msgs_per_sec,
        outbound_buffer: config.session_outbound_buffer,
    });

    let auth = Arc::new(AuthService::new(
        store.clone(),
        TokenCodec::new(config.ws_auth_secret.clone().into_bytes()),
        config.token_ttl_secs,
    ));
    let chest = Arc::new(ChestService::new(store.clone(), chest_locks));

    let app_state = AppState {
        gateway: gateway.clone(),
        auth,
        chest,
        forge_store: store_arc.clone(),
        forge_locks,
        player_state: store_arc.clone(),
        settings: store_arc.clone(),
    };

    let cancel = CancellationToken::new();

    if config.shared_redis_url.is_some() {
        let worker_locks = Arc::new(LockService::with_ttl(kv.clone(), forge_worker_lock_ttl));
        let worker = ForgeWorker::with_scan_limit(
            store_arc.clone(),
            worker_locks,
            Arc::new(SystemClock),
            config.forge_worker_scan_limit,
        );
        let worker_cancel = cancel.clone();
        tokio::spawn(async move { worker.run(worker_cancel).await });
    }

    tokio::spawn(loops::run_movement_loop(
        sessions.clone(),
        chunk_store.clone(),
        config.chunk_size,
        cancel.clone(),
    ));
    tokio::spawn(loops::run_snapshot_loop(sessions.clone(), config.snapshot_hz, cancel.clone()));
    tokio::spawn(loops::run_respawn_loop(gateway.clone(), cancel.clone()));

    let router = grove_net::build_router(app_state);
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", config.port))
        .await
        .with_context(|| format!("binding to port {}", config.port))?;
    tracing::info!(port = config.port, "grove-server listening");

    let shutdown_cancel = cancel.clone();
    axum::serve(listener, router)
        .with_graceful_shutdown(async move {
            wait_for_shutdown_signal().await;
            tracing::info!("shutdown signal received");
            shutdown_cancel.cancel();
        })
        .await
        .context("running the HTTP/WS listener")?;

    cancel.cancel();
    Ok(())
}

async fn wait_for_shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c().await.expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
}
