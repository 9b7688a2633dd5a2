use rand::Rng;
use serde::{Deserialize, Serialize};

/// Session codes are exactly this many characters from `[A-Z0-9]`.
pub const SESSION_CODE_LEN: usize = 5;

const CODE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Generate a candidate session code. Callers must collision-check against
/// the set of currently active sessions and retry; codes may be reused after
/// a session ends.
pub fn generate_session_code() -> String {
    let mut rng = rand::rng();
    (0..SESSION_CODE_LEN)
        .map(|_| CODE_ALPHABET[rng.random_range(0..CODE_ALPHABET.len())] as char)
        .collect()
}

/// Check the format of a client-supplied session code before lookup.
pub fn is_valid_session_code(code: &str) -> bool {
    code.len() == SESSION_CODE_LEN
        && code
            .bytes()
            .all(|b| b.is_ascii_uppercase() || b.is_ascii_digit())
}

/// Current phase of a session. Reset is a transition back to `Lobby`, not a
/// resting state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LifecycleState {
    Lobby,
    Playing,
    GameOver,
}

/// Difficulty mode selected when starting a round. Drives the round duration
/// and whether penalty events may push a score below zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GameMode {
    Easy,
    Classic,
    Frenzy,
}

impl Default for GameMode {
    fn default() -> Self {
        GameMode::Classic
    }
}

impl GameMode {
    /// Built-in round duration, overridable via server config.
    pub fn default_duration_secs(self) -> u32 {
        match self {
            GameMode::Easy => 90,
            GameMode::Classic => 60,
            GameMode::Frenzy => 45,
        }
    }

    /// Whether negative score totals are permitted in this mode.
    pub fn default_allow_negative(self) -> bool {
        matches!(self, GameMode::Frenzy)
    }
}
