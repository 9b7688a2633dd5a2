use hippodrome_core::net::messages::{ErrorMessageMsg, ServerMessage};

/// Domain errors surfaced to the requesting connection only, as an
/// ERROR_MESSAGE frame with a stable code. Never broadcast to the room.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    NotFound(String),
    Conflict(String),
    InvalidTransition(String),
    MalformedMessage(String),
}

impl SessionError {
    /// Stable wire code for the ERROR_MESSAGE frame.
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "NOT_FOUND",
            Self::Conflict(_) => "CONFLICT",
            Self::InvalidTransition(_) => "INVALID_TRANSITION",
            Self::MalformedMessage(_) => "MALFORMED_MESSAGE",
        }
    }

    /// Build the ERROR_MESSAGE frame sent back to the requester.
    pub fn to_message(&self) -> ServerMessage {
        ServerMessage::ErrorMessage(ErrorMessageMsg {
            code: self.code().to_string(),
            message: self.to_string(),
        })
    }
}

impl std::fmt::Display for SessionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound(m)
            | Self::Conflict(m)
            | Self::InvalidTransition(m)
            | Self::MalformedMessage(m) => write!(f, "{m}"),
        }
    }
}

impl std::error::Error for SessionError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_stable() {
        assert_eq!(SessionError::NotFound("x".into()).code(), "NOT_FOUND");
        assert_eq!(SessionError::Conflict("x".into()).code(), "CONFLICT");
        assert_eq!(
            SessionError::InvalidTransition("x".into()).code(),
            "INVALID_TRANSITION"
        );
        assert_eq!(
            SessionError::MalformedMessage("x".into()).code(),
            "MALFORMED_MESSAGE"
        );
    }

    #[test]
    fn to_message_carries_code_and_text() {
        let err = SessionError::Conflict("color already taken".into());
        match err.to_message() {
            ServerMessage::ErrorMessage(e) => {
                assert_eq!(e.code, "CONFLICT");
                assert_eq!(e.message, "color already taken");
            },
            other => panic!("Expected ErrorMessage, got: {other:?}"),
        }
    }
}
