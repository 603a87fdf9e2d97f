//! Basic type definitions for the signaling server
//!
//! Provides newtype wrappers for type safety:
//! - `UserId`: numeric user identifier assigned by the user store
//! - `RoomId`: caller-assigned room identifier

use serde::{Deserialize, Serialize};

/// Unique user identifier (newtype pattern)
///
/// Wraps the numeric id assigned by the user store. The store starts
/// numbering at 1, so id 0 never refers to a real user.
/// Implements Hash and Eq for use as HashMap keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(pub u64);

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Room identifier
///
/// Rooms are keyed by a string the caller supplies in CREATE_OR_JOIN;
/// the server never generates or normalizes room ids.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RoomId(pub String);

impl RoomId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for RoomId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl std::fmt::Display for RoomId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_id_as_json_number() {
        let json = serde_json::to_string(&UserId(7)).unwrap();
        assert_eq!(json, "7");

        let id: UserId = serde_json::from_str("42").unwrap();
        assert_eq!(id, UserId(42));
    }

    #[test]
    fn test_room_id_kept_verbatim() {
        let id = RoomId::from("My-Room.01");
        assert_eq!(id.as_str(), "My-Room.01");
        assert_eq!(id.to_string(), "My-Room.01");
    }

    #[test]
    fn test_room_id_as_json_string() {
        let json = serde_json::to_string(&RoomId::from("r1")).unwrap();
        assert_eq!(json, "\"r1\"");
    }
}
