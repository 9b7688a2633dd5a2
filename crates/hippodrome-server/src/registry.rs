use std::collections::{HashMap, HashSet};

use axum::extract::ws::Utf8Bytes;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use hippodrome_core::player::{Role, UserId};

/// Per-connection sender for outbound WebSocket text frames.
/// Bounded so a slow client cannot exhaust memory; overflow cancels the
/// connection instead of stalling the room's broadcast.
pub type ConnectionSender = mpsc::Sender<Utf8Bytes>;

pub type ConnectionId = Uuid;

/// What a connection is currently bound to. A connection holds at most one
/// binding at a time; rebinding replaces the previous one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding {
    pub session_id: String,
    pub user_id: UserId,
    pub role: Option<Role>,
}

struct ConnectionEntry {
    sender: ConnectionSender,
    cancel: CancellationToken,
    binding: Option<Binding>,
}

/// Process-wide bookkeeping of live connections and their session bindings.
/// Pure bookkeeping: no business logic, guarded by its own lock in AppState.
pub struct ConnectionRegistry {
    connections: HashMap<ConnectionId, ConnectionEntry>,
    by_session: HashMap<String, HashSet<ConnectionId>>,
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self {
            connections: HashMap::new(),
            by_session: HashMap::new(),
        }
    }

    pub fn register(&mut self, id: ConnectionId, sender: ConnectionSender, cancel: CancellationToken) {
        self.connections.insert(
            id,
            ConnectionEntry {
                sender,
                cancel,
                binding: None,
            },
        );
    }

    /// Bind a connection to a (session, user) pair. Rebinding first removes
    /// the old association, so a connection is never indexed under two
    /// sessions.
    pub fn bind(&mut self, id: ConnectionId, session_id: &str, user_id: &str, role: Option<Role>) {
        self.detach_from_session(id);
        if let Some(entry) = self.connections.get_mut(&id) {
            entry.binding = Some(Binding {
                session_id: session_id.to_string(),
                user_id: user_id.to_string(),
                role,
            });
            self.by_session
                .entry(session_id.to_string())
                .or_default()
                .insert(id);
        }
    }

    pub fn unbind(&mut self, id: ConnectionId) -> Option<Binding> {
        self.detach_from_session(id);
        self.connections.get_mut(&id)?.binding.take()
    }

    /// Drop a connection entirely. Returns its binding, if it had one, so
    /// the caller can mark the player disconnected in the directory.
    pub fn remove(&mut self, id: ConnectionId) -> Option<Binding> {
        self.detach_from_session(id);
        self.connections.remove(&id)?.binding
    }

    fn detach_from_session(&mut self, id: ConnectionId) {
        if let Some(entry) = self.connections.get(&id)
            && let Some(ref binding) = entry.binding
            && let Some(set) = self.by_session.get_mut(&binding.session_id)
        {
            set.remove(&id);
            if set.is_empty() {
                self.by_session.remove(&binding.session_id);
            }
        }
    }

    pub fn binding(&self, id: ConnectionId) -> Option<Binding> {
        self.connections.get(&id)?.binding.clone()
    }

    /// Number of live connections bound to a session.
    pub fn live_count(&self, session_id: &str) -> usize {
        self.by_session.get(session_id).map_or(0, HashSet::len)
    }

    /// True when at least one live connection is bound to (session, user).
    /// A rejoin can briefly leave two connections on the same player; the
    /// older one closing must not mark the player offline.
    pub fn user_connected(&self, session_id: &str, user_id: &str) -> bool {
        self.by_session.get(session_id).is_some_and(|ids| {
            ids.iter().any(|id| {
                self.connections
                    .get(id)
                    .and_then(|e| e.binding.as_ref())
                    .is_some_and(|b| b.user_id == user_id)
            })
        })
    }

    pub fn total(&self) -> usize {
        self.connections.len()
    }

    /// Send a frame to one connection. Send failures are non-fatal: a full
    /// buffer cancels the connection as unresponsive, a closed channel is
    /// left for its own close handler to clean up.
    pub fn send_to(&self, id: ConnectionId, frame: &Utf8Bytes) {
        if let Some(entry) = self.connections.get(&id) {
            deliver(id, entry, frame);
        }
    }

    /// Fan a frame out to every live connection in a session. Delivery order
    /// across recipients is unspecified; per-recipient order is preserved by
    /// the single writer task per connection.
    pub fn broadcast(&self, session_id: &str, frame: &Utf8Bytes) {
        let Some(ids) = self.by_session.get(session_id) else {
            return;
        };
        for &id in ids {
            if let Some(entry) = self.connections.get(&id) {
                deliver(id, entry, frame);
            }
        }
    }

    /// Broadcast with echo suppression for the originating connection.
    pub fn broadcast_except(&self, session_id: &str, frame: &Utf8Bytes, excluded: ConnectionId) {
        let Some(ids) = self.by_session.get(session_id) else {
            return;
        };
        for &id in ids {
            if id == excluded {
                continue;
            }
            if let Some(entry) = self.connections.get(&id) {
                deliver(id, entry, frame);
            }
        }
    }
}

fn deliver(id: ConnectionId, entry: &ConnectionEntry, frame: &Utf8Bytes) {
    match entry.sender.try_send(frame.clone()) {
        Ok(()) => {},
        Err(mpsc::error::TrySendError::Full(_)) => {
            tracing::warn!(connection = %id, "Outbound buffer full, dropping unresponsive connection");
            entry.cancel.cancel();
        },
        Err(mpsc::error::TrySendError::Closed(_)) => {
            tracing::debug!(connection = %id, "Skipping send to closed connection");
        },
    }
}
