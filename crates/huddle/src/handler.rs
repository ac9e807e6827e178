//! Per-connection handler: read loop, dispatch, and disconnect cleanup.
//!
//! Each accepted connection gets its own Tokio task running this
//! handler, plus a writer task that drains the connection's outbound
//! channel. The flow is:
//!   1. Split the stream; spawn the writer task.
//!   2. Loop: decode frames → dispatch by message type.
//!   3. On EOF, read error, protocol violation, or forced close:
//!      leave whatever session the connection was in.
//!
//! Dispatch policy:
//! - create/join while already in a session is a logged no-op — a
//!   connection is in at most one session at a time, and membership
//!   lasts until the connection closes;
//! - unknown message types are ignored (permissive dispatch);
//! - session-level rejections are silent on the wire; successes are
//!   acknowledged with CreatedSession/JoinedSession frames.

use std::sync::Arc;

use bytes::Bytes;
use futures_util::StreamExt;
use huddle_protocol::{
    ClientMessageKind, Frame, FrameCodec, ProtocolError, ServerMessageKind,
    encode_server_frame,
};
use huddle_session::{ConnectionId, Departure, Member};
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::net::tcp::OwnedWriteHalf;
use tokio::sync::mpsc;
use tokio_util::codec::FramedRead;

use crate::HuddleError;
use crate::broadcast::broadcast_to_session;
use crate::server::ServerState;

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection(
    stream: TcpStream,
    id: ConnectionId,
    state: Arc<ServerState>,
) -> Result<(), HuddleError> {
    tracing::info!(%id, "serving new client");

    let (read_half, write_half) = stream.into_split();
    let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
    let member = Member::new(id, outbound_tx);
    tokio::spawn(write_outbound(id, write_half, outbound_rx));

    let mut frames = FramedRead::new(read_half, FrameCodec::server());

    // The session this connection created or joined, if any. This is the
    // connection's only session: create/join while it is `Some` is
    // rejected, so no stale membership can be left behind.
    let mut current_session: Option<String> = None;

    let result = loop {
        tokio::select! {
            next = frames.next() => match next {
                Some(Ok(frame)) => {
                    dispatch(&state, &member, &mut current_session, frame)
                        .await;
                }
                Some(Err(e)) => {
                    match &e {
                        ProtocolError::Io(io_err) => {
                            tracing::debug!(%id, error = %io_err, "read failed");
                        }
                        _ => {
                            tracing::warn!(
                                %id,
                                error = %e,
                                "protocol violation, disconnecting"
                            );
                        }
                    }
                    break Err(HuddleError::from(e));
                }
                None => {
                    tracing::info!(%id, "connection closed by client");
                    break Ok(());
                }
            },
            _ = member.closed() => {
                tracing::info!(%id, "force-closed by session teardown");
                break Ok(());
            }
        }
    };

    if let Some(name) = current_session {
        let mut registry = state.registry.lock().await;
        match registry.remove_member(&name, id) {
            // Successful removals are logged by the registry itself.
            Departure::SessionTornDown { .. } | Departure::MemberRemoved => {}
            Departure::SessionNotFound | Departure::NotAMember => {
                // Normal after a teardown evicted us first.
                tracing::debug!(
                    %id,
                    session = %name,
                    "nothing to leave, session already gone"
                );
            }
        }
    }

    tracing::info!(%id, "client disconnected");
    result
}

/// Dispatches one decoded frame by message type.
async fn dispatch(
    state: &Arc<ServerState>,
    member: &Member,
    current_session: &mut Option<String>,
    frame: Frame,
) {
    match ClientMessageKind::from_wire(frame.kind) {
        Some(ClientMessageKind::CreateSession) => {
            handle_create(state, member, current_session, frame.payload)
                .await;
        }
        Some(ClientMessageKind::JoinSession) => {
            handle_join(state, member, current_session, frame.payload).await;
        }
        Some(ClientMessageKind::Broadcast) => {
            let Some(name) = current_session.clone() else {
                tracing::debug!(
                    id = %member.id(),
                    "broadcast from a connection not in a session, dropping"
                );
                return;
            };
            // Fire-and-forget: fan-out must never block this read loop.
            tokio::spawn(broadcast_to_session(
                Arc::clone(state),
                name,
                member.id(),
                frame.payload,
            ));
        }
        None => {
            tracing::debug!(
                id = %member.id(),
                kind = frame.kind,
                "ignoring unknown message type"
            );
        }
    }
}

async fn handle_create(
    state: &Arc<ServerState>,
    member: &Member,
    current_session: &mut Option<String>,
    payload: Bytes,
) {
    let Some(name) = session_name(&payload, member.id()) else {
        return;
    };
    if let Some(existing) = current_session {
        tracing::warn!(
            id = %member.id(),
            session = %existing,
            requested = %name,
            "already in a session, ignoring create"
        );
        return;
    }

    let result = {
        let mut registry = state.registry.lock().await;
        registry.create_session(&name, member.clone())
    };

    match result {
        Ok(()) => {
            acknowledge(member, ServerMessageKind::CreatedSession, &name);
            *current_session = Some(name);
        }
        Err(e) => {
            tracing::warn!(id = %member.id(), error = %e, "create rejected");
        }
    }
}

async fn handle_join(
    state: &Arc<ServerState>,
    member: &Member,
    current_session: &mut Option<String>,
    payload: Bytes,
) {
    let Some(name) = session_name(&payload, member.id()) else {
        return;
    };
    if let Some(existing) = current_session {
        tracing::warn!(
            id = %member.id(),
            session = %existing,
            requested = %name,
            "already in a session, ignoring join"
        );
        return;
    }

    let result = {
        let mut registry = state.registry.lock().await;
        registry.join_session(&name, member.clone())
    };

    match result {
        Ok(()) => {
            acknowledge(member, ServerMessageKind::JoinedSession, &name);
            *current_session = Some(name);
        }
        Err(e) => {
            tracing::warn!(id = %member.id(), error = %e, "join rejected");
        }
    }
}

/// Parses a create/join payload as a UTF-8 session name.
///
/// An invalid name is an application-level rejection like any other:
/// logged, no-op, connection stays open.
fn session_name(payload: &Bytes, id: ConnectionId) -> Option<String> {
    match std::str::from_utf8(payload) {
        Ok(name) => Some(name.to_string()),
        Err(_) => {
            tracing::warn!(%id, "session name is not valid UTF-8, ignoring");
            None
        }
    }
}

/// Queues a CreatedSession/JoinedSession success reply carrying the
/// session name.
fn acknowledge(member: &Member, kind: ServerMessageKind, name: &str) {
    match encode_server_frame(kind, Bytes::copy_from_slice(name.as_bytes())) {
        Ok(frame) => {
            if !member.deliver(frame) {
                tracing::debug!(
                    id = %member.id(),
                    "writer gone, dropping acknowledgment"
                );
            }
        }
        Err(e) => {
            tracing::warn!(
                id = %member.id(),
                error = %e,
                "failed to encode acknowledgment"
            );
        }
    }
}

/// Drains the connection's outbound channel onto the socket.
///
/// Runs as its own task so one peer's slow socket backs up only this
/// queue, never another connection's read loop or the broadcaster. A
/// write failure is logged and ends delivery to this peer only. The
/// task exits when every `Member` handle for the connection is dropped
/// (registry removal + handler exit), which closes the write half.
async fn write_outbound(
    id: ConnectionId,
    mut write_half: OwnedWriteHalf,
    mut outbound: mpsc::UnboundedReceiver<Bytes>,
) {
    while let Some(frame) = outbound.recv().await {
        if let Err(e) = write_half.write_all(&frame).await {
            tracing::warn!(%id, error = %e, "failed to deliver frame");
            break;
        }
    }
    let _ = write_half.shutdown().await;
}
