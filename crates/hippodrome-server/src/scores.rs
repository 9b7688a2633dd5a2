use std::collections::HashMap;

use hippodrome_core::net::messages::{ScoreUpdateMsg, ServerMessage};
use hippodrome_core::player::UserId;

use crate::broadcast;
use crate::error::SessionError;
use crate::state::AppState;

/// Apply a score delta for a player and broadcast the full snapshot to the
/// room. Totals never go below zero unless the session's mode permits
/// penalties. Returns the player's new total.
pub async fn record_event(
    state: &AppState,
    code: &str,
    user_id: &str,
    delta: i64,
) -> Result<i64, SessionError> {
    let session_arc = state
        .sessions
        .get(code)
        .await
        .ok_or_else(|| SessionError::NotFound(format!("unknown session: {code}")))?;
    let mut session = session_arc.lock().await;

    if session.player(user_id).is_none() {
        return Err(SessionError::NotFound(format!("unknown player: {user_id}")));
    }

    let allow_negative = state.config.modes.rules(session.mode).allow_negative;
    let total = session.record_score(user_id, delta, allow_negative);

    let msg = ServerMessage::ScoreUpdateBroadcast(ScoreUpdateMsg {
        scores: session.scores.clone(),
    });
    broadcast::broadcast(&state.registry, code, &msg).await;
    Ok(total)
}

/// Current score snapshot for a session.
pub async fn snapshot(state: &AppState, code: &str) -> Result<HashMap<UserId, i64>, SessionError> {
    let session_arc = state
        .sessions
        .get(code)
        .await
        .ok_or_else(|| SessionError::NotFound(format!("unknown session: {code}")))?;
    let session = session_arc.lock().await;
    Ok(session.scores.clone())
}
