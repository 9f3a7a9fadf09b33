use crate::domain::ChunkState;
use crate::world_event::RejectReason;
use serde::{Deserialize, Serialize};

/// An error code surfaced to a client (§7).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// No `join` was sent before another frame arrived.
    AuthRequired,
    /// The presented token failed signature verification.
    AuthInvalid,
    /// The presented token's `exp` has passed.
    AuthExpired,
    /// The session exceeded the inbound message rate cap.
    RateLimited,
    /// The frame was oversized or not valid JSON/an unrecognized shape.
    BadFrame,
}

/// One player's compact pose, serialized as the 5-element wire tuple `[id, x, y, z, yaw]`
/// (§6.1) rather than a JSON object, so `snapshot` frames stay small at 20 Hz.
pub type PlayerPose = (u64, f64, f64, f64, f32);

/// A server → client frame (§6.1).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "t", rename_all = "camelCase")]
pub enum ServerMessage {
    /// Sent once, after a successful `join`.
    Welcome {
        /// The session's id, used as the `id` in snapshot poses.
        id: u64,
    },
    /// A recoverable or terminal protocol/auth error (§7).
    Error {
        /// The error code.
        code: ErrorCode,
        /// An optional human-readable detail, never parsed by the client.
        #[serde(skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
    /// A full snapshot of one chunk's state, broadcast to every session in the world (§4.4
    /// step 4, invariant per §8).
    WorldChunk {
        /// The chunk's X coordinate.
        chunk_x: i32,
        /// The chunk's Z coordinate.
        chunk_z: i32,
        /// The chunk's full state.
        state: ChunkState,
    },
    /// The outcome of a single `worldEvent`, sent only to the requester.
    WorldEventResult {
        /// Whether the event was accepted.
        ok: bool,
        /// The event kind this result answers (`WorldEvent::kind_str`).
        kind: String,
        /// The event's subject id (`WorldEvent::subject_id`).
        id: String,
        /// Present iff `ok` is `false`.
        #[serde(skip_serializing_if = "Option::is_none")]
        reason: Option<RejectReason>,
    },
    /// A 20 Hz (configurable) snapshot of every player's pose in the world.
    Snapshot {
        /// One entry per connected session.
        players: Vec<PlayerPose>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn welcome_round_trips() {
        let msg = ServerMessage::Welcome { id: 42 };
        let json = serde_json::to_string(&msg).unwrap();
        assert_eq!(json, r#"{"t":"welcome","id":42}"#);
    }

    #[test]
    fn world_event_result_omits_reason_on_success() {
        let msg = ServerMessage::WorldEventResult {
            ok: true,
            kind: "treeCut".into(),
            id: "T42".into(),
            reason: None,
        };
        let json = serde_json::to_string(&msg).unwrap();
        assert!(!json.contains("reason"));
    }

    #[test]
    fn world_event_result_includes_reason_on_failure() {
        let msg = ServerMessage::WorldEventResult {
            ok: false,
            kind: "place".into(),
            id: "P1".into(),
            reason: Some(RejectReason::OutOfRange),
        };
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains("\"reason\":\"out_of_range\""));
    }

    #[test]
    fn snapshot_poses_serialize_as_tuples() {
        let msg = ServerMessage::Snapshot {
            players: vec![(1, 1.0, 2.0, 3.0, 0.5)],
        };
        let json = serde_json::to_string(&msg).unwrap();
        assert_eq!(json, r#"{"t":"snapshot","players":[[1,1.0,2.0,3.0,0.5]]}"#);
    }
}
