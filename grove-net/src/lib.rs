//! The WebSocket session gateway and its supporting HTTP control surface (§4.8, §6.1, §6.2):
//! wires the arbitration, locking, furnace, and identity crates into one axum service.

/// The boundary error type mapping every domain error to wire-level codes (§7).
pub mod error;
/// The WS upgrade handler and per-connection join/read/write loops.
pub mod gateway;
/// Background per-world tick loops: movement integration and the snapshot broadcaster.
pub mod loops;
/// Server-side movement integration and collision resolution.
pub mod movement;
/// Per-connection session state and the per-world session registry.
pub mod session;
/// Postgres-backed implementations of every store trait in the workspace.
pub mod sql;
/// Ambient persistence seams: player-state and settings blobs.
pub mod stores;
/// The HTTP control surface (§6.2).
pub mod http;
/// The axum `Router`/`AppState` wiring the gateway and HTTP surface together.
pub mod app;

pub use app::{build_router, AppState};
pub use error::GatewayError;
pub use gateway::{ws_handler, GatewayState};
pub use session::{Session, SessionRegistry};
pub use sql::PgStore;
