//! The WebSocket session gateway (§4.8, §6.1): join handshake, per-connection inbound/outbound
//! lanes, and the idle-session sweep.

use crate::error::{arbiter_reject_reason, GatewayError};
use crate::movement::{InputSample, Pose};
use crate::session::{Session, SessionRegistry};
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::Response;
use futures::{Sink, SinkExt, Stream, StreamExt};
use grove_arbiter::{ChunkBroadcast, WorldArbiter};
use grove_auth::TokenCodec;
use grove_chest::ChestStateStore;
use grove_protocol::inbound::ClientMessage;
use grove_protocol::outbound::ErrorCode;
use grove_protocol::{ServerMessage, PROTOCOL_VERSION};
use grove_utils::{ChunkKey, Clock};
use grove_world::chunk_store::{ChunkStateStore, ChunkStore};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;

/// How long the gateway waits for a `join` frame before closing the socket.
const JOIN_TIMEOUT: Duration = Duration::from_secs(10);
/// A session idle for longer than this (no accepted `input`) is dropped (§5).
const IDLE_TIMEOUT_MS: i64 = 30_000;

/// Everything the gateway needs to admit and run a session, independent of the HTTP control
/// surface built on top of the same services.
pub struct GatewayState<CS> {
    /// Authoritative per-chunk world state.
    pub chunk_store: Arc<ChunkStore<CS>>,
    /// The world-event dispatch pipeline.
    pub arbiter: Arc<WorldArbiter<CS>>,
    /// Connected sessions, by world.
    pub sessions: Arc<SessionRegistry>,
    /// Verifies session tokens presented on `join`.
    pub tokens: Arc<TokenCodec>,
    /// Wall clock, substitutable in tests.
    pub clock: Arc<dyn Clock>,
    /// World units per chunk edge.
    pub chunk_size: i32,
    /// Maximum center-to-center distance accepted between a session and a world event's target.
    pub world_event_radius: f64,
    /// Oversized frames are rejected before JSON parsing.
    pub max_frame_bytes: usize,
    /// Inbound rate cap, frames per second.
    pub max_inbound_msgs_per_sec: u32,
    /// Capacity of each session's outbound lane.
    pub outbound_buffer: usize,
}

impl<CS> Clone for GatewayState<CS> {
    fn clone(&self) -> Self {
        Self {
            chunk_store: self.chunk_store.clone(),
            arbiter: self.arbiter.clone(),
            sessions: self.sessions.clone(),
            tokens: self.tokens.clone(),
            clock: self.clock.clone(),
            chunk_size: self.chunk_size,
            world_event_radius: self.world_event_radius,
            max_frame_bytes: self.max_frame_bytes,
            max_inbound_msgs_per_sec: self.max_inbound_msgs_per_sec,
            outbound_buffer: self.outbound_buffer,
        }
    }
}

/// The axum handler mounted at the WS upgrade route.
pub async fn ws_handler<CS>(
    State(state): State<Arc<GatewayState<CS>>>,
    ws: WebSocketUpgrade,
) -> Response
where
    CS: ChestStateStore + ChunkStateStore + 'static,
{
    ws.on_upgrade(move |socket| async move {
        if let Err(err) = run_session(socket, state).await {
            tracing::debug!(error = %err, "session ended with error");
        }
    })
}

async fn run_session<CS>(socket: WebSocket, state: Arc<GatewayState<CS>>) -> Result<(), GatewayError>
where
    CS: ChestStateStore + ChunkStateStore + 'static,
{
    let (mut sink, mut stream) = socket.split();

    let join_frame = match timeout(JOIN_TIMEOUT, stream.next()).await {
        Ok(Some(Ok(Message::Text(text)))) => text,
        _ => {
            let _ = sink.close().await;
            return Err(GatewayError::AuthRequired);
        }
    };

    let (session, mut outbound_rx) = match admit(&state, &join_frame) {
        Ok(admitted) => admitted,
        Err(err) => {
            if let Some(code) = err.ws_code() {
                let frame = ServerMessage::Error { code, message: Some(err.to_string()) };
                let _ = send_frame(&mut sink, &frame).await;
            }
            let _ = sink.close().await;
            return Err(err);
        }
    };

    tracing::info!(session_id = session.id, world_id = %session.world_id, "session joined");
    state.sessions.insert(session.clone());

    send_frame(&mut sink, &ServerMessage::Welcome { id: session.id }).await?;
    for chunk in initial_chunks(&session, state.chunk_size) {
        let (cx, cz) = chunk.unpack();
        let chunk_state = state
            .chunk_store
            .read_chunk(&session.world_id, cx, cz)
            .await
            .map_err(|err| GatewayError::DbUnavailable(err.to_string()))?;
        let frame = ServerMessage::WorldChunk { chunk_x: cx, chunk_z: cz, state: chunk_state };
        send_frame(&mut sink, &frame).await?;
    }

    let cancel = session.cancel_token();
    let writer_cancel = cancel.clone();
    let writer = tokio::spawn(async move {
        loop {
            tokio::select! {
                () = writer_cancel.cancelled() => break,
                msg = outbound_rx.recv() => {
                    let Some(msg) = msg else { break };
                    if send_frame(&mut sink, &msg).await.is_err() {
                        break;
                    }
                }
            }
        }
        let _ = sink.close().await;
    });

    let reader = read_loop(&mut stream, &state, &session, cancel.clone());
    tokio::select! {
        () = cancel.cancelled() => {}
        _ = reader => {}
    }
    cancel.cancel();
    let _ = writer.await;

    state.sessions.remove(&session.world_id, session.id);
    tracing::info!(session_id = session.id, "session closed");
    Ok(())
}

fn admit<CS>(
    state: &GatewayState<CS>,
    join_frame: &str,
) -> Result<(Arc<Session>, tokio::sync::mpsc::Receiver<ServerMessage>), GatewayError> {
    let msg: ClientMessage = serde_json::from_str(join_frame).map_err(|_| GatewayError::AuthInvalid)?;
    let ClientMessage::Join { v, guest_id, world_id, token, spawn } = msg else {
        return Err(GatewayError::AuthRequired);
    };
    if v != PROTOCOL_VERSION {
        return Err(GatewayError::AuthInvalid);
    }
    let now_ms = state.clock.now_ms();
    let verified_guest = state.tokens.verify(&token, now_ms)?;
    if verified_guest != guest_id {
        return Err(GatewayError::AuthInvalid);
    }
    let id = state.sessions.next_session_id();
    let pose = Pose::spawn(spawn.x, spawn.y, spawn.z);
    let (session, outbound_rx) = Session::new(id, guest_id, world_id, pose, state.outbound_buffer, now_ms);
    Ok((session, outbound_rx))
}

fn initial_chunks(session: &Session, chunk_size: i32) -> [ChunkKey; 9] {
    let pose = session.pose();
    ChunkKey::containing(pose.x, pose.z, chunk_size).with_neighbors()
}

async fn send_frame(
    sink: &mut (impl Sink<Message, Error = axum::Error> + Unpin),
    msg: &ServerMessage,
) -> Result<(), GatewayError> {
    let text = serde_json::to_string(msg).map_err(|_| GatewayError::InvalidBody("encode failed".to_string()))?;
    sink.send(Message::Text(text.into()))
        .await
        .map_err(|_| GatewayError::InvalidBody("send failed".to_string()))
}

async fn read_loop<CS>(
    stream: &mut (impl Stream<Item = Result<Message, axum::Error>> + Unpin),
    state: &GatewayState<CS>,
    session: &Arc<Session>,
    cancel: tokio_util::sync::CancellationToken,
) where
    CS: ChestStateStore + ChunkStateStore,
{
    while let Some(frame) = stream.next().await {
        let Ok(frame) = frame else { break };
        match frame {
            Message::Text(text) => {
                if text.len() > state.max_frame_bytes {
                    session.send(ServerMessage::Error {
                        code: ErrorCode::BadFrame,
                        message: Some("frame too large".to_string()),
                    });
                    break;
                }
                let now_ms = state.clock.now_ms();
                if session.rate_limited(now_ms, state.max_inbound_msgs_per_sec) {
                    session.send(ServerMessage::Error { code: ErrorCode::RateLimited, message: None });
                    continue;
                }
                if handle_inbound(state, session, &text, now_ms).await.is_err() {
                    break;
                }
            }
            Message::Close(_) => break,
            _ => {}
        }
        if cancel.is_cancelled() {
            break;
        }
        if now_minus(state, session) > IDLE_TIMEOUT_MS {
            tracing::info!(session_id = session.id, "session idle timeout");
            break;
        }
    }
}

fn now_minus<CS>(state: &GatewayState<CS>, session: &Session) -> i64 {
    state.clock.now_ms() - session.last_input_at_ms()
}

impl<CS> GatewayState<CS> {
    /// Fans a mutated chunk's full state out to every session in the world it belongs to (§4.4
    /// step 4, §6.1 `worldChunk`), including the session that triggered it. Also used by the
    /// respawn ticker, whose broadcasts have no single triggering session.
    pub fn broadcast_chunk(&self, broadcast: &ChunkBroadcast) {
        let frame = ServerMessage::WorldChunk {
            chunk_x: broadcast.chunk_x,
            chunk_z: broadcast.chunk_z,
            state: broadcast.state.clone(),
        };
        for session in self.sessions.sessions_in(&broadcast.world_id) {
            session.send(frame.clone());
        }
    }
}

async fn handle_inbound<CS>(
    state: &GatewayState<CS>,
    session: &Arc<Session>,
    text: &str,
    now_ms: i64,
) -> Result<(), ()>
where
    CS: ChestStateStore + ChunkStateStore,
{
    let Ok(msg) = serde_json::from_str::<ClientMessage>(text) else {
        session.send(ServerMessage::Error { code: ErrorCode::BadFrame, message: None });
        return Ok(());
    };
    match msg {
        ClientMessage::Join { .. } => {
            session.send(ServerMessage::Error {
                code: ErrorCode::BadFrame,
                message: Some("already joined".to_string()),
            });
        }
        ClientMessage::Input { seq, dt, keys, yaw, .. } => {
            session.enqueue_input(InputSample { keys, yaw, dt }, seq, now_ms);
        }
        ClientMessage::Teleport { x, y, z, .. } => {
            session.set_pose(Pose::teleported(x, y, z, session.pose().yaw));
        }
        ClientMessage::WorldEvent { event, .. } => {
            let pose = session.pose();
            let result = state
                .arbiter
                .dispatch(&session.world_id, &session.guest_id, (pose.x, pose.z), &event, now_ms)
                .await;
            let broadcast = match result {
                Ok(broadcast) => {
                    session.send(ServerMessage::WorldEventResult {
                        ok: true,
                        kind: event.kind_str().to_string(),
                        id: event.subject_id().to_string(),
                        reason: None,
                    });
                    Some(broadcast)
                }
                Err(err) => {
                    session.send(ServerMessage::WorldEventResult {
                        ok: false,
                        kind: event.kind_str().to_string(),
                        id: event.subject_id().to_string(),
                        reason: arbiter_reject_reason(&err),
                    });
                    None
                }
            };
            if let Some(broadcast) = broadcast {
                state.broadcast_chunk(&broadcast);
            }
        }
    }
    Ok(())
}
