//! Error types for the signaling server
//!
//! Defines application-level errors and message send errors.
//! Uses thiserror for ergonomic error definitions.

use thiserror::Error;

/// Application-level errors
///
/// Covers both fatal errors (connection termination) and
/// routing errors (send error message back to the client).
#[derive(Debug, Error)]
pub enum AppError {
    /// WebSocket protocol error (fatal for the connection)
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// Malformed message envelope or payload
    #[error("malformed message: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error (fatal for the connection)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Channel send error (fatal - internal channel broken)
    #[error("Channel send error")]
    ChannelSend,

    /// Room has reached the capacity for its kind
    #[error("room {0} is at capacity")]
    CapacityExceeded(String),

    /// User is already a member of the room
    #[error("already a member of room {0}")]
    AlreadyMember(String),

    /// User is a member of a different room
    #[error("already in another room: {0}")]
    AlreadyInAnotherRoom(String),

    /// No room with the given id, or the referenced user has no membership
    #[error("room not found: {0}")]
    RoomNotFound(String),

    /// Bearer token did not resolve to a user
    #[error("invalid access token")]
    InvalidToken,

    /// No user with the given id or username
    #[error("user not found: {0}")]
    UserNotFound(String),

    /// Username is already registered
    #[error("username already taken: {0}")]
    UsernameTaken(String),

    /// Username failed validation
    #[error("invalid username: {0}")]
    InvalidUsername(String),
}

impl AppError {
    /// Whether the error should be reported back to the sending client
    /// as an `error` envelope instead of tearing anything down.
    pub fn is_routing_error(&self) -> bool {
        matches!(
            self,
            AppError::Json(_)
                | AppError::CapacityExceeded(_)
                | AppError::AlreadyMember(_)
                | AppError::AlreadyInAnotherRoom(_)
                | AppError::RoomNotFound(_)
        )
    }
}

/// Message send errors
///
/// Occurs when attempting to send messages through closed channels.
#[derive(Debug, Error)]
pub enum SendError {
    /// The receiving end of the channel has been closed
    #[error("Channel closed")]
    ChannelClosed,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_routing_errors_are_reported_not_fatal() {
        assert!(AppError::RoomNotFound("r1".into()).is_routing_error());
        assert!(AppError::CapacityExceeded("r1".into()).is_routing_error());
        assert!(AppError::AlreadyMember("r1".into()).is_routing_error());
        assert!(AppError::AlreadyInAnotherRoom("r2".into()).is_routing_error());
        assert!(!AppError::ChannelSend.is_routing_error());
        assert!(!AppError::InvalidToken.is_routing_error());
    }

    #[test]
    fn test_error_messages_are_human_readable() {
        let err = AppError::AlreadyInAnotherRoom("r2".into());
        assert_eq!(err.to_string(), "already in another room: r2");

        let err = AppError::RoomNotFound("nope".into());
        assert_eq!(err.to_string(), "room not found: nope");
    }
}
