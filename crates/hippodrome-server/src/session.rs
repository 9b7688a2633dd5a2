use std::collections::HashMap;
use std::time::Instant;

use tokio_util::sync::CancellationToken;

use hippodrome_core::player::{HippoColor, PlayerInfo, Role, UserId};
use hippodrome_core::session::{GameMode, LifecycleState};
use hippodrome_core::time::timestamp_now;

use crate::error::SessionError;

/// A participant known to a session. Survives disconnects so a refreshed
/// client can rejoin under the same user id with role, color, and score
/// intact. Removed only by session teardown, never by a socket close.
#[derive(Debug, Clone)]
pub struct PlayerRecord {
    pub user_id: UserId,
    pub role: Option<Role>,
    pub color: Option<HippoColor>,
    pub connected: bool,
}

/// One game room. All mutation happens behind the directory's per-session
/// mutex; nothing here is shared across sessions.
pub struct Session {
    pub code: String,
    pub created_at: String,
    pub state: LifecycleState,
    pub mode: GameMode,
    /// Participants in join order.
    pub players: Vec<PlayerRecord>,
    pub scores: HashMap<UserId, i64>,
    /// Running countdown, if any. Replaced wholesale on restart.
    pub timer: Option<CancellationToken>,
    /// Bumped on every timer cancel/replace so a stale countdown task can
    /// never fire a second terminal event.
    pub timer_epoch: u64,
    /// Set when the last live connection goes away; cleared on bind.
    pub empty_since: Option<Instant>,
    /// True while a debounced roster update is already scheduled.
    pub presence_pending: bool,
}

impl Session {
    pub fn new(code: String) -> Self {
        Self {
            code,
            created_at: timestamp_now(),
            state: LifecycleState::Lobby,
            mode: GameMode::default(),
            players: Vec::new(),
            scores: HashMap::new(),
            timer: None,
            timer_epoch: 0,
            empty_since: Some(Instant::now()),
            presence_pending: false,
        }
    }

    pub fn player(&self, user_id: &str) -> Option<&PlayerRecord> {
        self.players.iter().find(|p| p.user_id == user_id)
    }

    pub fn player_mut(&mut self, user_id: &str) -> Option<&mut PlayerRecord> {
        self.players.iter_mut().find(|p| p.user_id == user_id)
    }

    /// Fetch the player for `user_id`, creating an empty record on first
    /// join. Rejoining with a known id returns the existing record.
    pub fn get_or_create_player(&mut self, user_id: &str) -> &mut PlayerRecord {
        if let Some(idx) = self.players.iter().position(|p| p.user_id == user_id) {
            return &mut self.players[idx];
        }
        self.players.push(PlayerRecord {
            user_id: user_id.to_string(),
            role: None,
            color: None,
            connected: false,
        });
        self.players.last_mut().expect("just pushed")
    }

    pub fn update_role(&mut self, user_id: &str, role: Role) -> Result<(), SessionError> {
        let player = self
            .player_mut(user_id)
            .ok_or_else(|| SessionError::NotFound(format!("unknown player: {user_id}")))?;
        player.role = Some(role);
        Ok(())
    }

    /// True when another active hippo player already holds `color`.
    pub fn color_taken(&self, color: HippoColor, requester: &str) -> bool {
        self.players.iter().any(|p| {
            p.user_id != requester && p.role == Some(Role::HippoPlayer) && p.color == Some(color)
        })
    }

    pub fn select_color(&mut self, user_id: &str, color: HippoColor) -> Result<(), SessionError> {
        if self.player(user_id).is_none() {
            return Err(SessionError::NotFound(format!("unknown player: {user_id}")));
        }
        if self.color_taken(color, user_id) {
            return Err(SessionError::Conflict(format!(
                "color {color:?} is already taken"
            )));
        }
        if let Some(player) = self.player_mut(user_id) {
            player.color = Some(color);
        }
        Ok(())
    }

    pub fn role_count(&self, role: Role) -> usize {
        self.players.iter().filter(|p| p.role == Some(role)).count()
    }

    /// Start precondition: at least one hippo player and one AAC user among
    /// known participants (live or rejoinable).
    pub fn can_start(&self) -> bool {
        self.role_count(Role::HippoPlayer) >= 1 && self.role_count(Role::AacUser) >= 1
    }

    pub fn roster(&self) -> Vec<PlayerInfo> {
        self.players
            .iter()
            .map(|p| PlayerInfo {
                user_id: p.user_id.clone(),
                role: p.role,
                color: p.color,
                connected: p.connected,
            })
            .collect()
    }

    /// Color assignments of active hippo players, for the game-over summary.
    pub fn color_map(&self) -> HashMap<UserId, HippoColor> {
        self.players
            .iter()
            .filter(|p| p.role == Some(Role::HippoPlayer))
            .filter_map(|p| p.color.map(|c| (p.user_id.clone(), c)))
            .collect()
    }

    /// Reset every known player's score to zero (round start).
    pub fn zero_scores(&mut self) {
        self.scores = self.players.iter().map(|p| (p.user_id.clone(), 0)).collect();
    }

    pub fn clear_scores(&mut self) {
        self.scores.clear();
    }

    /// Apply a score delta, clamping at zero unless the mode permits
    /// penalties. Returns the new total.
    pub fn record_score(&mut self, user_id: &str, delta: i64, allow_negative: bool) -> i64 {
        let entry = self.scores.entry(user_id.to_string()).or_insert(0);
        *entry += delta;
        if !allow_negative && *entry < 0 {
            *entry = 0;
        }
        *entry
    }

    /// Cancel any running countdown and invalidate in-flight timer tasks.
    pub fn cancel_timer(&mut self) {
        if let Some(token) = self.timer.take() {
            token.cancel();
        }
        self.timer_epoch += 1;
    }
}
