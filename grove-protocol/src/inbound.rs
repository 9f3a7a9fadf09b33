use crate::world_event::WorldEvent;
use serde::{Deserialize, Serialize};

/// A spawn position carried on `join` (§6.1).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Spawn {
    /// World X.
    pub x: f64,
    /// World Y.
    pub y: f64,
    /// World Z.
    pub z: f64,
}

/// The held movement keys on an `input` frame (§6.1).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct InputKeys {
    /// Forward.
    pub w: bool,
    /// Strafe left.
    pub a: bool,
    /// Backward.
    pub s: bool,
    /// Strafe right.
    pub d: bool,
    /// Sprint modifier.
    pub shift: bool,
    /// Jump.
    pub space: bool,
}

/// A client → server frame (§6.1).
///
/// Tagged on `t` so a frame with an unrecognized or missing tag is a parse error, rejected at
/// the gateway as `bad_frame` rather than silently dropped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "t", rename_all = "camelCase")]
pub enum ClientMessage {
    /// First frame on every connection: authenticate and register the session.
    Join {
        /// Protocol version, must equal [`crate::PROTOCOL_VERSION`].
        v: u8,
        /// The guest this session claims to be.
        guest_id: String,
        /// The world to join.
        world_id: String,
        /// Session token, verified against `guest_id`.
        token: String,
        /// Initial position.
        spawn: Spawn,
    },
    /// A movement sample, enqueued for the tick loop to integrate (§4.8, §4.9).
    Input {
        /// Protocol version.
        v: u8,
        /// Monotonically increasing client sequence number, for drift analysis only.
        seq: u64,
        /// Seconds elapsed since the previous input sample, as measured by the client.
        dt: f32,
        /// Held movement keys.
        keys: InputKeys,
        /// Camera yaw, radians.
        yaw: f32,
        /// Camera pitch, radians.
        pitch: f32,
        /// Client timestamp, epoch milliseconds.
        at: i64,
    },
    /// An authoritative position reset, e.g. from a client-initiated portal transition.
    Teleport {
        /// Protocol version.
        v: u8,
        /// New world X.
        x: f64,
        /// New world Y.
        y: f64,
        /// New world Z.
        z: f64,
        /// Client timestamp, epoch milliseconds.
        at: i64,
    },
    /// A proposed world effect, forwarded to the per-world arbiter (§4.4).
    WorldEvent {
        /// Protocol version.
        v: u8,
        /// The event itself; flattened so `kind` and its payload sit alongside `t` on the wire.
        #[serde(flatten)]
        event: WorldEvent,
    },
}
