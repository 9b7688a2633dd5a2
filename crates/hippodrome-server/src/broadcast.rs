use axum::extract::ws::Utf8Bytes;

use hippodrome_core::net::messages::ServerMessage;
use hippodrome_core::net::protocol::encode_server_message;

use crate::registry::ConnectionId;
use crate::state::SharedRegistry;

/// Encode once, fan out to every live connection in the room. Encoding
/// failures are logged and swallowed; delivery failures are handled inside
/// the registry and never reach callers.
pub async fn broadcast(registry: &SharedRegistry, session_id: &str, msg: &ServerMessage) {
    let Some(frame) = encode(msg) else { return };
    registry.read().await.broadcast(session_id, &frame);
}

/// Broadcast with echo suppression for the originating connection.
pub async fn broadcast_except(
    registry: &SharedRegistry,
    session_id: &str,
    msg: &ServerMessage,
    excluded: ConnectionId,
) {
    let Some(frame) = encode(msg) else { return };
    registry
        .read()
        .await
        .broadcast_except(session_id, &frame, excluded);
}

/// Send a message to a single connection (direct replies, error frames).
pub async fn send_to(registry: &SharedRegistry, id: ConnectionId, msg: &ServerMessage) {
    let Some(frame) = encode(msg) else { return };
    registry.read().await.send_to(id, &frame);
}

fn encode(msg: &ServerMessage) -> Option<Utf8Bytes> {
    match encode_server_message(msg) {
        Ok(text) => Some(Utf8Bytes::from(text)),
        Err(e) => {
            tracing::error!(message_type = msg.message_type(), error = %e, "Failed to encode broadcast");
            None
        },
    }
}
