use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use hippodrome_core::net::messages::{ServerMessage, TimerUpdateMsg};

use crate::broadcast;
use crate::lifecycle;
use crate::session::Session;
use crate::state::SharedRegistry;

/// Start (or replace) the countdown for a session. The caller holds the
/// session lock; the spawned tick task never does, except briefly at the
/// terminal transition. Replacing cancels the old task first, so at most one
/// countdown runs per session and exactly one terminal event fires.
pub fn start(
    session: &mut Session,
    session_arc: Arc<Mutex<Session>>,
    registry: SharedRegistry,
    duration_secs: u32,
) {
    session.cancel_timer();
    let token = CancellationToken::new();
    session.timer = Some(token.clone());
    let epoch = session.timer_epoch;
    let code = session.code.clone();
    tracing::debug!(session = %code, duration_secs, "Timer started");
    tokio::spawn(run_countdown(
        registry,
        session_arc,
        code,
        duration_secs,
        token,
        epoch,
    ));
}

async fn run_countdown(
    registry: SharedRegistry,
    session_arc: Arc<Mutex<Session>>,
    code: String,
    duration_secs: u32,
    token: CancellationToken,
    epoch: u64,
) {
    let mut remaining = duration_secs;
    let mut interval = tokio::time::interval(Duration::from_secs(1));
    loop {
        tokio::select! {
            _ = token.cancelled() => return,
            _ = interval.tick() => {
                let update = ServerMessage::TimerUpdate(TimerUpdateMsg {
                    seconds_left: remaining,
                });
                broadcast::broadcast(&registry, &code, &update).await;
                if remaining == 0 {
                    lifecycle::game_over_from_timer(&registry, &session_arc, epoch).await;
                    return;
                }
                remaining -= 1;
            }
        }
    }
}
