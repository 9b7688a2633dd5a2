use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::player::{HippoColor, PlayerInfo, Role, UserId};
use crate::session::GameMode;

/// Session code lookup before navigating to the join screen.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidateSessionMsg {
    pub game_code: String,
}

/// Presenter request for a fresh session. Carries no fields; the payload is
/// still present on the wire as an empty object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateSessionMsg {}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerJoinMsg {
    pub session_id: String,
    pub user_id: UserId,
    #[serde(default)]
    pub role: Option<Role>,
    #[serde(default)]
    pub color: Option<HippoColor>,
    #[serde(default)]
    pub is_reconnecting: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRoleMsg {
    pub session_id: String,
    pub user_id: UserId,
    pub role: Role,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectColorMsg {
    pub session_id: String,
    pub user_id: UserId,
    pub color: HippoColor,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartGameMsg {
    pub session_id: String,
    #[serde(default)]
    pub mode: GameMode,
}

/// Restart the countdown mid-round. Omitting `mode` keeps the session's
/// current mode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartTimerMsg {
    pub session_id: String,
    #[serde(default)]
    pub mode: Option<GameMode>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AacFoodSelectedMsg {
    pub session_id: String,
    pub user_id: UserId,
    #[serde(default)]
    pub role: Option<Role>,
    pub food: String,
    #[serde(default)]
    pub effect: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HippoMoveMsg {
    pub session_id: String,
    pub user_id: UserId,
    pub x: f32,
    pub y: f32,
    #[serde(default)]
    pub direction: Option<String>,
}

fn default_points() -> i64 {
    1
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FoodConsumedMsg {
    pub session_id: String,
    pub user_id: UserId,
    pub food: String,
    /// Score delta for this consumption; negative for penalty foods.
    #[serde(default = "default_points")]
    pub points: i64,
}

/// Explicit end-of-round signal (e.g. all required food consumed), sent by a
/// controlling role.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EndGameMsg {
    pub session_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetGameMsg {
    pub session_id: String,
}

/// Every message a client may send. The wire form is
/// `{"type": "<VARIANT>", "payload": {…}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClientMessage {
    ValidateSession(ValidateSessionMsg),
    CreateSession(CreateSessionMsg),
    PlayerJoin(PlayerJoinMsg),
    UpdateRole(UpdateRoleMsg),
    SelectColor(SelectColorMsg),
    StartGame(StartGameMsg),
    StartTimer(StartTimerMsg),
    AacFoodSelected(AacFoodSelectedMsg),
    HippoMove(HippoMoveMsg),
    FoodConsumed(FoodConsumedMsg),
    EndGame(EndGameMsg),
    ResetGame(ResetGameMsg),
}

impl ClientMessage {
    /// Wire type tag, for logging.
    pub fn message_type(&self) -> &'static str {
        match self {
            ClientMessage::ValidateSession(_) => "VALIDATE_SESSION",
            ClientMessage::CreateSession(_) => "CREATE_SESSION",
            ClientMessage::PlayerJoin(_) => "PLAYER_JOIN",
            ClientMessage::UpdateRole(_) => "UPDATE_ROLE",
            ClientMessage::SelectColor(_) => "SELECT_COLOR",
            ClientMessage::StartGame(_) => "START_GAME",
            ClientMessage::StartTimer(_) => "START_TIMER",
            ClientMessage::AacFoodSelected(_) => "AAC_FOOD_SELECTED",
            ClientMessage::HippoMove(_) => "HIPPO_MOVE",
            ClientMessage::FoodConsumed(_) => "FOOD_CONSUMED",
            ClientMessage::EndGame(_) => "END_GAME",
            ClientMessage::ResetGame(_) => "RESET_GAME",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionValidatedMsg {
    pub is_valid: bool,
    pub game_code: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionCreatedMsg {
    pub session_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerJoinedMsg {
    pub user_id: UserId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsersListMsg {
    pub users: Vec<PlayerInfo>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleUpdatedMsg {
    pub user_id: UserId,
    pub role: Role,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColorUpdateMsg {
    pub user_id: UserId,
    pub color: HippoColor,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartGameBroadcastMsg {
    pub mode: GameMode,
    pub duration_seconds: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerUpdateMsg {
    pub seconds_left: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FoodSelectedBroadcastMsg {
    pub user_id: UserId,
    pub food: String,
    #[serde(default)]
    pub effect: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HippoMoveBroadcastMsg {
    pub user_id: UserId,
    pub x: f32,
    pub y: f32,
    #[serde(default)]
    pub direction: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FoodConsumedBroadcastMsg {
    pub user_id: UserId,
    pub food: String,
    pub points: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreUpdateMsg {
    pub scores: HashMap<UserId, i64>,
}

/// Final standings, pushed once per round when the timer reaches zero or a
/// controlling role ends the game.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameOverMsg {
    pub scores: HashMap<UserId, i64>,
    pub colors: HashMap<UserId, HippoColor>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResetGameBroadcastMsg {}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorMessageMsg {
    pub code: String,
    pub message: String,
}

/// Every message the server may send.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ServerMessage {
    SessionValidated(SessionValidatedMsg),
    SessionCreated(SessionCreatedMsg),
    PlayerJoinedBroadcast(PlayerJoinedMsg),
    UsersListUpdate(UsersListMsg),
    RoleUpdatedBroadcast(RoleUpdatedMsg),
    ColorUpdate(ColorUpdateMsg),
    StartGameBroadcast(StartGameBroadcastMsg),
    TimerUpdate(TimerUpdateMsg),
    FoodSelectedBroadcast(FoodSelectedBroadcastMsg),
    HippoMoveBroadcast(HippoMoveBroadcastMsg),
    FoodConsumedBroadcast(FoodConsumedBroadcastMsg),
    ScoreUpdateBroadcast(ScoreUpdateMsg),
    GameOver(GameOverMsg),
    ResetGameBroadcast(ResetGameBroadcastMsg),
    ErrorMessage(ErrorMessageMsg),
}

impl ServerMessage {
    /// Wire type tag, for logging.
    pub fn message_type(&self) -> &'static str {
        match self {
            ServerMessage::SessionValidated(_) => "SESSION_VALIDATED",
            ServerMessage::SessionCreated(_) => "SESSION_CREATED",
            ServerMessage::PlayerJoinedBroadcast(_) => "PLAYER_JOINED_BROADCAST",
            ServerMessage::UsersListUpdate(_) => "USERS_LIST_UPDATE",
            ServerMessage::RoleUpdatedBroadcast(_) => "ROLE_UPDATED_BROADCAST",
            ServerMessage::ColorUpdate(_) => "COLOR_UPDATE",
            ServerMessage::StartGameBroadcast(_) => "START_GAME_BROADCAST",
            ServerMessage::TimerUpdate(_) => "TIMER_UPDATE",
            ServerMessage::FoodSelectedBroadcast(_) => "FOOD_SELECTED_BROADCAST",
            ServerMessage::HippoMoveBroadcast(_) => "HIPPO_MOVE_BROADCAST",
            ServerMessage::FoodConsumedBroadcast(_) => "FOOD_CONSUMED_BROADCAST",
            ServerMessage::ScoreUpdateBroadcast(_) => "SCORE_UPDATE_BROADCAST",
            ServerMessage::GameOver(_) => "GAME_OVER",
            ServerMessage::ResetGameBroadcast(_) => "RESET_GAME_BROADCAST",
            ServerMessage::ErrorMessage(_) => "ERROR_MESSAGE",
        }
    }
}
