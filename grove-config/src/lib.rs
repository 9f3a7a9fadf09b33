//! Process-wide configuration (§6.4), loaded once from the environment at startup.
//!
//! A single frozen config value read by every other crate, loaded from the environment with
//! `envy` rather than parsed from a config file, since this server has no on-disk world save to
//! colocate a config file with.

use serde::Deserialize;
use std::sync::OnceLock;
use thiserror::Error;

/// Error produced while loading [`Config`] from the environment.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A required variable was missing or failed to parse.
    #[error("invalid configuration: {0}")]
    Invalid(#[from] envy::Error),
}

fn default_port() -> u16 {
    8080
}
fn default_world_event_radius() -> f64 {
    3.5
}
fn default_snapshot_hz() -> u32 {
    20
}
fn default_forge_worker_scan_limit() -> usize {
    200
}
fn default_chunk_size() -> i32 {
    32
}
fn default_token_ttl_secs() -> i64 {
    3600
}
fn default_lock_ttl_secs() -> i64 {
    10
}
fn default_forge_worker_lock_ttl_secs() -> i64 {
    5
}
fn default_max_ws_frame_bytes() -> usize {
    16 * 1024
}
fn default_max_inbound_msgs_per_sec() -> u32 {
    60
}
fn default_session_outbound_buffer() -> usize {
    128
}

/// Process-wide configuration, loaded from environment variables (see §6.4).
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// TCP port the HTTP/WS listener binds to.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Postgres connection string for the persistent store.
    pub database_url: String,
    /// Redis connection string for the shared lock store and furnace-worker leader election.
    /// Absent means: no shared KV, fall back to in-memory locks and disable the background
    /// furnace worker (§4.6 supplementary detail, §9 Open Question 3).
    pub shared_redis_url: Option<String>,
    /// HMAC-SHA256 secret used to sign and verify session tokens.
    pub ws_auth_secret: String,
    /// Maximum center-to-center distance, in meters, between a session's last known position and
    /// the target of a world event.
    #[serde(default = "default_world_event_radius")]
    pub world_event_radius: f64,
    /// Position-snapshot broadcast rate, in Hz.
    #[serde(default = "default_snapshot_hz")]
    pub snapshot_hz: u32,
    /// Maximum number of enabled furnaces the background worker advances per scan.
    #[serde(default = "default_forge_worker_scan_limit")]
    pub forge_worker_scan_limit: usize,
    /// World units per chunk edge. Fixed at 32; kept as a field (rather than a bare constant)
    /// only so every distance/spacing computation reads it from one place.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: i32,
    /// Session token lifetime, in seconds.
    #[serde(default = "default_token_ttl_secs")]
    pub token_ttl_secs: i64,
    /// Chest/forge lock lease TTL, in seconds.
    #[serde(default = "default_lock_ttl_secs")]
    pub lock_ttl_secs: i64,
    /// Furnace-worker leader lock TTL, in seconds.
    #[serde(default = "default_forge_worker_lock_ttl_secs")]
    pub forge_worker_lock_ttl_secs: i64,
    /// Maximum inbound WebSocket frame size, in bytes.
    #[serde(default = "default_max_ws_frame_bytes")]
    pub max_ws_frame_bytes: usize,
    /// Maximum inbound messages accepted per session per second before `rate_limited`.
    #[serde(default = "default_max_inbound_msgs_per_sec")]
    pub max_inbound_msgs_per_sec: u32,
    /// Capacity of each session's bounded outbound channel.
    #[serde(default = "default_session_outbound_buffer")]
    pub session_outbound_buffer: usize,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// # Errors
    /// Returns [`ConfigError`] if a required variable (`database_url`, `ws_auth_secret`) is
    /// missing, or an optional one fails to parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(envy::from_env::<Self>()?)
    }
}

static GROVE_CONFIG: OnceLock<Config> = OnceLock::new();

/// Initializes the process-wide config. Panics if called more than once.
pub fn init(config: Config) {
    GROVE_CONFIG
        .set(config)
        .unwrap_or_else(|_| panic!("grove-config already initialized"));
}

/// Returns the process-wide config.
///
/// # Panics
/// Panics if [`init`] has not been called yet.
#[must_use]
pub fn get() -> &'static Config {
    GROVE_CONFIG
        .get()
        .expect("grove_config::init must run before grove_config::get")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_when_env_vars_absent() {
        // SAFETY: test-only, single-threaded access to process env within this test.
        unsafe {
            std::env::set_var("DATABASE_URL", "postgres://localhost/grove");
            std::env::set_var("WS_AUTH_SECRET", "test-secret");
            std::env::remove_var("PORT");
            std::env::remove_var("WORLD_EVENT_RADIUS");
        }
        let config = Config::from_env().unwrap();
        assert_eq!(config.port, 8080);
        assert!((config.world_event_radius - 3.5).abs() < f64::EPSILON);
        assert_eq!(config.chunk_size, 32);
    }
}
