use std::sync::Arc;

use tokio::sync::Mutex;

use hippodrome_core::net::messages::{
    GameOverMsg, ResetGameBroadcastMsg, ServerMessage, StartGameBroadcastMsg,
};
use hippodrome_core::session::{GameMode, LifecycleState};

use crate::broadcast;
use crate::error::SessionError;
use crate::session::Session;
use crate::state::{AppState, SharedRegistry};
use crate::timer;

/// Lobby → Playing. Rejected unless the room holds at least one hippo player
/// and one AAC user; on success scores are zeroed, the round broadcast goes
/// out, and the countdown starts from the mode's duration.
pub async fn start_game(state: &AppState, code: &str, mode: GameMode) -> Result<(), SessionError> {
    let session_arc = get_session(state, code).await?;
    let mut session = session_arc.lock().await;

    if session.state != LifecycleState::Lobby {
        return Err(SessionError::InvalidTransition(format!(
            "cannot start game from {:?}",
            session.state
        )));
    }
    if !session.can_start() {
        return Err(SessionError::InvalidTransition(
            "starting requires at least one hippo player and one AAC user".to_string(),
        ));
    }

    let rules = state.config.modes.rules(mode);
    session.mode = mode;
    session.state = LifecycleState::Playing;
    session.zero_scores();
    tracing::info!(session = %code, ?mode, duration_secs = rules.duration_secs, "Game started");

    let msg = ServerMessage::StartGameBroadcast(StartGameBroadcastMsg {
        mode,
        duration_seconds: rules.duration_secs,
    });
    broadcast::broadcast(&state.registry, code, &msg).await;

    timer::start(
        &mut session,
        Arc::clone(&session_arc),
        Arc::clone(&state.registry),
        rules.duration_secs,
    );
    Ok(())
}

/// Restart the countdown mid-round, optionally switching mode. Replaces any
/// running timer; idempotent with respect to duplicate terminal events.
pub async fn start_timer(
    state: &AppState,
    code: &str,
    mode: Option<GameMode>,
) -> Result<(), SessionError> {
    let session_arc = get_session(state, code).await?;
    let mut session = session_arc.lock().await;

    if session.state != LifecycleState::Playing {
        return Err(SessionError::InvalidTransition(
            "the timer only runs while a game is playing".to_string(),
        ));
    }
    if let Some(mode) = mode {
        session.mode = mode;
    }
    let rules = state.config.modes.rules(session.mode);
    timer::start(
        &mut session,
        Arc::clone(&session_arc),
        Arc::clone(&state.registry),
        rules.duration_secs,
    );
    Ok(())
}

/// Playing → GameOver by explicit signal (e.g. all required food consumed),
/// restricted to a controlling role.
pub async fn end_game(state: &AppState, code: &str, requester: &str) -> Result<(), SessionError> {
    let session_arc = get_session(state, code).await?;
    let mut session = session_arc.lock().await;

    require_controlling(&session, requester)?;
    if session.state != LifecycleState::Playing {
        return Err(SessionError::InvalidTransition(format!(
            "cannot end game from {:?}",
            session.state
        )));
    }
    finish(&mut session, &state.registry).await;
    Ok(())
}

/// Terminal transition fired by the countdown task. A no-op when the round
/// already ended or the timer was replaced since this task was spawned.
pub async fn game_over_from_timer(
    registry: &SharedRegistry,
    session_arc: &Arc<Mutex<Session>>,
    epoch: u64,
) {
    let mut session = session_arc.lock().await;
    if session.state != LifecycleState::Playing || session.timer_epoch != epoch {
        return;
    }
    finish(&mut session, registry).await;
}

/// GameOver → Lobby. Scores are cleared; players keep their roles and
/// colors, so no re-selection is needed for the next round.
pub async fn reset_game(state: &AppState, code: &str, requester: &str) -> Result<(), SessionError> {
    let session_arc = get_session(state, code).await?;
    let mut session = session_arc.lock().await;

    require_controlling(&session, requester)?;
    if session.state != LifecycleState::GameOver {
        return Err(SessionError::InvalidTransition(format!(
            "cannot reset from {:?}",
            session.state
        )));
    }

    session.cancel_timer();
    session.clear_scores();
    session.state = LifecycleState::Lobby;
    tracing::info!(session = %code, "Game reset to lobby");

    let msg = ServerMessage::ResetGameBroadcast(ResetGameBroadcastMsg {});
    broadcast::broadcast(&state.registry, code, &msg).await;
    Ok(())
}

async fn finish(session: &mut Session, registry: &SharedRegistry) {
    session.cancel_timer();
    session.state = LifecycleState::GameOver;
    tracing::info!(session = %session.code, "Game over");

    let msg = ServerMessage::GameOver(GameOverMsg {
        scores: session.scores.clone(),
        colors: session.color_map(),
    });
    broadcast::broadcast(registry, &session.code, &msg).await;
}

async fn get_session(
    state: &AppState,
    code: &str,
) -> Result<Arc<Mutex<Session>>, SessionError> {
    state
        .sessions
        .get(code)
        .await
        .ok_or_else(|| SessionError::NotFound(format!("unknown session: {code}")))
}

fn require_controlling(session: &Session, user_id: &str) -> Result<(), SessionError> {
    let player = session
        .player(user_id)
        .ok_or_else(|| SessionError::NotFound(format!("unknown player: {user_id}")))?;
    match player.role {
        Some(role) if role.is_controlling() => Ok(()),
        _ => Err(SessionError::InvalidTransition(
            "requires a controlling role (presenter or spectator)".to_string(),
        )),
    }
}
