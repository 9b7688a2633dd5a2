use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, RwLock};

use hippodrome_core::player::{HippoColor, Role, UserId};
use hippodrome_core::session::{generate_session_code, GameMode, LifecycleState};

use crate::session::{PlayerRecord, Session};

/// Serializable record of a session, for the explicit snapshot/restore
/// interface. Connections and timers are runtime-only and not captured.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub code: String,
    pub created_at: String,
    pub state: LifecycleState,
    pub mode: GameMode,
    pub players: Vec<PlayerSnapshot>,
    pub scores: HashMap<UserId, i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerSnapshot {
    pub user_id: UserId,
    pub role: Option<Role>,
    pub color: Option<HippoColor>,
}

/// Owns every active session and hands out per-session mutexes. The outer
/// map lock is held only for lookups and inserts; all session mutation goes
/// through the per-session mutex so rooms never contend with each other.
pub struct SessionDirectory {
    sessions: RwLock<HashMap<String, Arc<Mutex<Session>>>>,
}

impl Default for SessionDirectory {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionDirectory {
    pub fn new() -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Create a new empty session under a fresh code. Codes are collision
    /// checked against active sessions only; reuse after teardown is fine
    /// given the small code space.
    pub async fn create_session(&self) -> (String, Arc<Mutex<Session>>) {
        let mut sessions = self.sessions.write().await;
        let code = loop {
            let candidate = generate_session_code();
            if !sessions.contains_key(&candidate) {
                break candidate;
            }
        };
        let session = Arc::new(Mutex::new(Session::new(code.clone())));
        sessions.insert(code.clone(), Arc::clone(&session));
        (code, session)
    }

    /// True iff the session exists and is active.
    pub async fn validate(&self, code: &str) -> bool {
        self.sessions.read().await.contains_key(code)
    }

    pub async fn get(&self, code: &str) -> Option<Arc<Mutex<Session>>> {
        self.sessions.read().await.get(code).map(Arc::clone)
    }

    /// Explicit teardown. Cancels any running timer so no countdown task
    /// outlives its session.
    pub async fn remove_session(&self, code: &str) -> bool {
        let removed = self.sessions.write().await.remove(code);
        match removed {
            Some(session) => {
                session.lock().await.cancel_timer();
                true
            },
            None => false,
        }
    }

    pub async fn active_count(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// (active sessions, known players across them) for health reporting.
    pub async fn stats(&self) -> (usize, usize) {
        let sessions = self.sessions.read().await;
        let mut players = 0;
        for session in sessions.values() {
            players += session.lock().await.players.len();
        }
        (sessions.len(), players)
    }

    /// Remove sessions whose last live connection went away more than
    /// `grace` ago. Returns the number reaped.
    pub async fn reap_empty(&self, grace: Duration) -> usize {
        let expired: Vec<String> = {
            let sessions = self.sessions.read().await;
            let mut codes = Vec::new();
            for (code, session) in sessions.iter() {
                let session = session.lock().await;
                if let Some(empty_since) = session.empty_since
                    && empty_since.elapsed() >= grace
                {
                    codes.push(code.clone());
                }
            }
            codes
        };

        let mut reaped = 0;
        for code in expired {
            if self.remove_session(&code).await {
                tracing::info!(session = %code, "Reaped empty session");
                reaped += 1;
            }
        }
        reaped
    }

    /// Close every active session, cancelling their timers. Used at process
    /// shutdown.
    pub async fn teardown(&self) {
        let sessions: Vec<_> = {
            let mut map = self.sessions.write().await;
            map.drain().map(|(_, session)| session).collect()
        };
        for session in sessions {
            session.lock().await.cancel_timer();
        }
    }

    /// Capture all active sessions for persistence.
    pub async fn snapshot(&self) -> Vec<SessionSnapshot> {
        let sessions = self.sessions.read().await;
        let mut out = Vec::with_capacity(sessions.len());
        for session in sessions.values() {
            let session = session.lock().await;
            out.push(SessionSnapshot {
                code: session.code.clone(),
                created_at: session.created_at.clone(),
                state: session.state,
                mode: session.mode,
                players: session
                    .players
                    .iter()
                    .map(|p| PlayerSnapshot {
                        user_id: p.user_id.clone(),
                        role: p.role,
                        color: p.color,
                    })
                    .collect(),
                scores: session.scores.clone(),
            });
        }
        out
    }

    /// Rebuild sessions from snapshots. Restored players start disconnected
    /// and timers are not resurrected; a restored `Playing` session waits
    /// for a new START_TIMER.
    pub async fn restore(&self, snapshots: Vec<SessionSnapshot>) {
        let mut sessions = self.sessions.write().await;
        for snap in snapshots {
            let mut session = Session::new(snap.code.clone());
            session.created_at = snap.created_at;
            session.state = snap.state;
            session.mode = snap.mode;
            session.players = snap
                .players
                .into_iter()
                .map(|p| PlayerRecord {
                    user_id: p.user_id,
                    role: p.role,
                    color: p.color,
                    connected: false,
                })
                .collect();
            session.scores = snap.scores;
            sessions.insert(snap.code, Arc::new(Mutex::new(session)));
        }
    }
}
