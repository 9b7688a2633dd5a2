use std::sync::Arc;

use tokio::sync::Mutex;

use hippodrome_core::net::messages::{
    AacFoodSelectedMsg, ClientMessage, ColorUpdateMsg, FoodConsumedBroadcastMsg, FoodConsumedMsg,
    FoodSelectedBroadcastMsg, HippoMoveBroadcastMsg, HippoMoveMsg, PlayerJoinMsg, PlayerJoinedMsg,
    RoleUpdatedMsg, ServerMessage, SessionCreatedMsg, SessionValidatedMsg, UpdateRoleMsg,
    UsersListMsg,
};
use hippodrome_core::session::is_valid_session_code;

use crate::broadcast;
use crate::error::SessionError;
use crate::lifecycle;
use crate::registry::ConnectionId;
use crate::scores;
use crate::session::Session;
use crate::state::AppState;

/// Route one decoded client message to its handler. Returns the direct reply
/// for request/response messages; broadcasts happen inside the handlers.
/// Errors are surfaced to the requesting connection only.
pub async fn handle_message(
    msg: ClientMessage,
    conn_id: ConnectionId,
    state: &AppState,
) -> Result<Option<ServerMessage>, SessionError> {
    match msg {
        ClientMessage::ValidateSession(m) => {
            let is_valid =
                is_valid_session_code(&m.game_code) && state.sessions.validate(&m.game_code).await;
            Ok(Some(ServerMessage::SessionValidated(SessionValidatedMsg {
                is_valid,
                game_code: m.game_code,
            })))
        },

        ClientMessage::CreateSession(_) => {
            let (code, _session) = state.sessions.create_session().await;
            tracing::info!(session = %code, "Session created");
            Ok(Some(ServerMessage::SessionCreated(SessionCreatedMsg {
                session_id: code,
            })))
        },

        ClientMessage::PlayerJoin(m) => handle_player_join(m, conn_id, state).await,

        ClientMessage::UpdateRole(m) => handle_update_role(m, conn_id, state).await,

        ClientMessage::SelectColor(m) => {
            let session_arc = get_session(state, &m.session_id).await?;
            session_arc
                .lock()
                .await
                .select_color(&m.user_id, m.color)?;
            let update = ServerMessage::ColorUpdate(ColorUpdateMsg {
                user_id: m.user_id,
                color: m.color,
            });
            broadcast::broadcast(&state.registry, &m.session_id, &update).await;
            Ok(None)
        },

        ClientMessage::StartGame(m) => {
            lifecycle::start_game(state, &m.session_id, m.mode).await?;
            Ok(None)
        },

        ClientMessage::StartTimer(m) => {
            lifecycle::start_timer(state, &m.session_id, m.mode).await?;
            Ok(None)
        },

        ClientMessage::AacFoodSelected(m) => handle_food_selected(m, state).await,

        ClientMessage::HippoMove(m) => handle_hippo_move(m, conn_id, state).await,

        ClientMessage::FoodConsumed(m) => handle_food_consumed(m, conn_id, state).await,

        ClientMessage::EndGame(m) => {
            let requester = require_member(state, conn_id, &m.session_id).await?;
            lifecycle::end_game(state, &m.session_id, &requester).await?;
            Ok(None)
        },

        ClientMessage::ResetGame(m) => {
            let requester = require_member(state, conn_id, &m.session_id).await?;
            lifecycle::reset_game(state, &m.session_id, &requester).await?;
            Ok(None)
        },
    }
}

async fn handle_player_join(
    m: PlayerJoinMsg,
    conn_id: ConnectionId,
    state: &AppState,
) -> Result<Option<ServerMessage>, SessionError> {
    let session_arc = get_session(state, &m.session_id).await?;

    let (users, bound_role) = {
        let mut session = session_arc.lock().await;
        let rejoining = session.player(&m.user_id).is_some();

        let requested_color = {
            let player = session.get_or_create_player(&m.user_id);
            player.connected = true;
            // A rejoin keeps whatever role/color were set before the drop
            if player.role.is_none() {
                player.role = m.role;
            }
            if player.color.is_none() { m.color } else { None }
        };

        // First-come color request; a taken color is left unassigned for an
        // explicit SELECT_COLOR rather than failing the join.
        if let Some(color) = requested_color {
            if session.color_taken(color, &m.user_id) {
                tracing::debug!(
                    session = %m.session_id,
                    user = %m.user_id,
                    "Requested color already taken, joining without one"
                );
            } else if let Some(player) = session.player_mut(&m.user_id) {
                player.color = Some(color);
            }
        }

        session.empty_since = None;
        let bound_role = session.player(&m.user_id).and_then(|p| p.role);

        if rejoining || m.is_reconnecting {
            tracing::info!(session = %m.session_id, user = %m.user_id, "Player rejoined");
        } else {
            tracing::info!(session = %m.session_id, user = %m.user_id, "Player joined");
        }
        (session.roster(), bound_role)
    };

    state
        .registry
        .write()
        .await
        .bind(conn_id, &m.session_id, &m.user_id, bound_role);

    let joined = ServerMessage::PlayerJoinedBroadcast(PlayerJoinedMsg {
        user_id: m.user_id,
    });
    broadcast::broadcast(&state.registry, &m.session_id, &joined).await;
    let roster = ServerMessage::UsersListUpdate(UsersListMsg { users });
    broadcast::broadcast(&state.registry, &m.session_id, &roster).await;
    Ok(None)
}

async fn handle_update_role(
    m: UpdateRoleMsg,
    conn_id: ConnectionId,
    state: &AppState,
) -> Result<Option<ServerMessage>, SessionError> {
    let session_arc = get_session(state, &m.session_id).await?;
    session_arc.lock().await.update_role(&m.user_id, m.role)?;

    // Keep the binding's role in sync when a player changes their own role
    {
        let mut registry = state.registry.write().await;
        if let Some(binding) = registry.binding(conn_id)
            && binding.session_id == m.session_id
            && binding.user_id == m.user_id
        {
            registry.bind(conn_id, &m.session_id, &m.user_id, Some(m.role));
        }
    }

    let update = ServerMessage::RoleUpdatedBroadcast(RoleUpdatedMsg {
        user_id: m.user_id,
        role: m.role,
    });
    broadcast::broadcast(&state.registry, &m.session_id, &update).await;
    Ok(None)
}

async fn handle_food_selected(
    m: AacFoodSelectedMsg,
    state: &AppState,
) -> Result<Option<ServerMessage>, SessionError> {
    get_session(state, &m.session_id).await?;
    let selected = ServerMessage::FoodSelectedBroadcast(FoodSelectedBroadcastMsg {
        user_id: m.user_id,
        food: m.food,
        effect: m.effect,
    });
    broadcast::broadcast(&state.registry, &m.session_id, &selected).await;
    Ok(None)
}

async fn handle_hippo_move(
    m: HippoMoveMsg,
    conn_id: ConnectionId,
    state: &AppState,
) -> Result<Option<ServerMessage>, SessionError> {
    get_session(state, &m.session_id).await?;
    let moved = ServerMessage::HippoMoveBroadcast(HippoMoveBroadcastMsg {
        user_id: m.user_id,
        x: m.x,
        y: m.y,
        direction: m.direction,
    });
    // The sender animates locally; echoing its own movement back would jitter
    broadcast::broadcast_except(&state.registry, &m.session_id, &moved, conn_id).await;
    Ok(None)
}

async fn handle_food_consumed(
    m: FoodConsumedMsg,
    conn_id: ConnectionId,
    state: &AppState,
) -> Result<Option<ServerMessage>, SessionError> {
    {
        let session_arc = get_session(state, &m.session_id).await?;
        let session = session_arc.lock().await;
        if session.player(&m.user_id).is_none() {
            return Err(SessionError::NotFound(format!(
                "unknown player: {}",
                m.user_id
            )));
        }
    }

    let consumed = ServerMessage::FoodConsumedBroadcast(FoodConsumedBroadcastMsg {
        user_id: m.user_id.clone(),
        food: m.food,
        points: m.points,
    });
    broadcast::broadcast_except(&state.registry, &m.session_id, &consumed, conn_id).await;

    scores::record_event(state, &m.session_id, &m.user_id, m.points).await?;
    Ok(None)
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

/// Resolve the requesting connection's user within `session_id`. Lifecycle
/// control messages carry no user id of their own; the binding is the
/// authority on who is asking.
async fn require_member(
    state: &AppState,
    conn_id: ConnectionId,
    session_id: &str,
) -> Result<String, SessionError> {
    let binding = state.registry.read().await.binding(conn_id);
    match binding {
        Some(b) if b.session_id == session_id => Ok(b.user_id),
        _ => Err(SessionError::NotFound(
            "connection is not joined to this session".to_string(),
        )),
    }
}
