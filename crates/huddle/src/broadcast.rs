//! Fan-out of a broadcast payload to the sender's fellow members.

use std::sync::Arc;

use bytes::Bytes;
use huddle_protocol::{ServerMessageKind, encode_server_frame};
use huddle_session::ConnectionId;

use crate::server::ServerState;

/// Delivers `payload` to every member of `name` except the sender.
///
/// The BroadcastCommand frame is encoded exactly once; the refcounted
/// bytes are then pushed into each recipient's outbound channel.
/// Recipient handles are collected under the registry lock but actual
/// socket writes happen on each recipient's own writer task, so a slow
/// or dead peer delays nobody — including the sender, which spawned
/// this as a fire-and-forget task.
///
/// A session that vanished between dispatch and delivery (master
/// disconnected in the gap) is a logged no-op. So is a sender that is
/// no longer a member of the session registered under `name`: fan-out
/// is fire-and-forget, so by the time it runs, the sender's session may
/// have been torn down and the name re-registered by a fresh master.
/// Membership in the *current* session is what authorizes delivery.
pub(crate) async fn broadcast_to_session(
    state: Arc<ServerState>,
    name: String,
    sender: ConnectionId,
    payload: Bytes,
) {
    let frame = match encode_server_frame(
        ServerMessageKind::BroadcastCommand,
        payload,
    ) {
        Ok(frame) => frame,
        Err(e) => {
            tracing::warn!(
                %sender,
                error = %e,
                "failed to encode broadcast frame"
            );
            return;
        }
    };

    let recipients = {
        let registry = state.registry.lock().await;
        match registry.lookup(&name) {
            Some(session) if session.contains(sender) => {
                session.recipients_except(sender)
            }
            Some(_) => {
                // The name matched a session the sender is not in: its
                // own session was torn down and the name was reused.
                tracing::debug!(
                    session = %name,
                    %sender,
                    "broadcast from a non-member, dropping"
                );
                return;
            }
            None => {
                tracing::debug!(
                    session = %name,
                    %sender,
                    "broadcast for a session that no longer exists, dropping"
                );
                return;
            }
        }
    };

    for member in recipients {
        if !member.deliver(frame.clone()) {
            tracing::debug!(
                session = %name,
                recipient = %member.id(),
                "recipient writer gone, skipping"
            );
        }
    }
}
