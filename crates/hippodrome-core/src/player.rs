use serde::{Deserialize, Serialize};

/// Client-generated participant handle. Unique within a session, not globally.
pub type UserId = String;

/// A participant's function within a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    #[serde(rename = "presenter")]
    Presenter,
    #[serde(rename = "hippoPlayer")]
    HippoPlayer,
    #[serde(rename = "aacUser")]
    AacUser,
    #[serde(rename = "spectator")]
    Spectator,
}

impl Role {
    /// Roles allowed to drive lifecycle transitions (reset, explicit end).
    pub fn is_controlling(self) -> bool {
        matches!(self, Role::Presenter | Role::Spectator)
    }
}

/// Hippo avatar color, drawn from a fixed palette. Unique among active
/// hippo players within a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HippoColor {
    Red,
    Teal,
    Yellow,
    Purple,
    Green,
    Orange,
    Blue,
    Pink,
}

impl HippoColor {
    /// Predefined palette, in selection order.
    pub const PALETTE: &[HippoColor] = &[
        HippoColor::Red,
        HippoColor::Teal,
        HippoColor::Yellow,
        HippoColor::Purple,
        HippoColor::Green,
        HippoColor::Orange,
        HippoColor::Blue,
        HippoColor::Pink,
    ];
}

/// Wire view of a session participant, sent in roster updates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerInfo {
    pub user_id: UserId,
    pub role: Option<Role>,
    pub color: Option<HippoColor>,
    pub connected: bool,
}
