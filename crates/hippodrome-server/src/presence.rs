use std::time::Duration;

use hippodrome_core::net::messages::{ServerMessage, UsersListMsg};

use crate::broadcast;
use crate::state::AppState;

/// Broadcast a roster update after connection churn, debounced per session.
/// A burst of closes (page navigation) collapses into a single
/// USERS_LIST_UPDATE at the end of the window instead of one per socket.
pub fn schedule_presence_update(state: AppState, code: String) {
    tokio::spawn(async move {
        let Some(session_arc) = state.sessions.get(&code).await else {
            return;
        };
        {
            let mut session = session_arc.lock().await;
            if session.presence_pending {
                return;
            }
            session.presence_pending = true;
        }

        let window = Duration::from_millis(state.config.sessions.presence_debounce_ms);
        tokio::time::sleep(window).await;

        let users = {
            let mut session = session_arc.lock().await;
            session.presence_pending = false;
            session.roster()
        };
        let msg = ServerMessage::UsersListUpdate(UsersListMsg { users });
        broadcast::broadcast(&state.registry, &code, &msg).await;
    });
}
