//! Room struct definition
//!
//! Represents one call: a capacity-bounded set of members keyed by
//! user id. Rooms are created lazily on the first join and evicted by
//! the coordinator the moment they become empty.

use std::collections::HashMap;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::types::{RoomId, UserId};
use crate::user::User;

/// What kind of call a room carries; determines its member capacity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoomKind {
    #[serde(rename = "AUDIO")]
    Audio,
    #[serde(rename = "AUDIO_VIDEO")]
    AudioVideo,
}

/// A call room
///
/// Membership lives behind a mutex so a broadcast can iterate a snapshot
/// while a mutation is in flight. The coordinator already serializes all
/// mutation, so the mutex is a secondary invariant, not the primary
/// correctness mechanism.
#[derive(Debug)]
pub struct Room {
    /// Caller-assigned identifier
    pub id: RoomId,
    /// Kind of call; fixed at creation
    pub kind: RoomKind,
    /// Member limit; fixed at creation from the config capacity table
    capacity: usize,
    /// Members keyed by user id
    members: Mutex<HashMap<UserId, User>>,
}

impl Room {
    /// Create a new empty room with the given capacity.
    pub fn new(id: RoomId, kind: RoomKind, capacity: usize) -> Self {
        Self {
            id,
            kind,
            capacity,
            members: Mutex::new(HashMap::new()),
        }
    }

    /// Add a user to the room.
    ///
    /// Fails when the room is at capacity or the user is already a member.
    pub fn add_member(&self, user: User) -> Result<(), AppError> {
        let mut members = self.members.lock().expect("room members lock poisoned");

        if members.len() >= self.capacity {
            return Err(AppError::CapacityExceeded(self.id.to_string()));
        }
        if members.contains_key(&user.id) {
            return Err(AppError::AlreadyMember(self.id.to_string()));
        }

        members.insert(user.id, user);
        Ok(())
    }

    /// Remove a user from the room. Removing a non-member is a no-op.
    pub fn remove_member(&self, user_id: UserId) {
        let mut members = self.members.lock().expect("room members lock poisoned");
        members.remove(&user_id);
    }

    /// Snapshot of the current members, for broadcast iteration.
    pub fn members(&self) -> Vec<User> {
        let members = self.members.lock().expect("room members lock poisoned");
        members.values().cloned().collect()
    }

    /// Whether the user is currently a member.
    pub fn contains(&self, user_id: UserId) -> bool {
        let members = self.members.lock().expect("room members lock poisoned");
        members.contains_key(&user_id)
    }

    /// Number of current members.
    pub fn len(&self) -> usize {
        let members = self.members.lock().expect("room members lock poisoned");
        members.len()
    }

    /// Whether the room has no members left.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(id: u64) -> User {
        User::new(UserId(id), format!("user{id}"))
    }

    #[test]
    fn test_room_creation() {
        let room = Room::new(RoomId::from("r1"), RoomKind::AudioVideo, 4);

        assert_eq!(room.id, RoomId::from("r1"));
        assert_eq!(room.kind, RoomKind::AudioVideo);
        assert!(room.is_empty());
        assert_eq!(room.len(), 0);
    }

    #[test]
    fn test_add_member() {
        let room = Room::new(RoomId::from("r1"), RoomKind::AudioVideo, 4);

        room.add_member(user(1)).unwrap();
        room.add_member(user(2)).unwrap();

        assert_eq!(room.len(), 2);
        assert!(room.contains(UserId(1)));
        assert!(room.contains(UserId(2)));
        assert!(!room.contains(UserId(3)));
    }

    #[test]
    fn test_add_member_rejects_duplicate() {
        let room = Room::new(RoomId::from("r1"), RoomKind::Audio, 20);
        room.add_member(user(1)).unwrap();

        let err = room.add_member(user(1)).unwrap_err();
        assert!(matches!(err, AppError::AlreadyMember(_)));
        assert_eq!(room.len(), 1);
    }

    #[test]
    fn test_add_member_rejects_over_capacity() {
        let room = Room::new(RoomId::from("r1"), RoomKind::AudioVideo, 4);
        for id in 1..=4 {
            room.add_member(user(id)).unwrap();
        }

        let err = room.add_member(user(5)).unwrap_err();
        assert!(matches!(err, AppError::CapacityExceeded(_)));
        assert_eq!(room.len(), 4);
    }

    #[test]
    fn test_remove_member_is_idempotent() {
        let room = Room::new(RoomId::from("r1"), RoomKind::Audio, 20);
        room.add_member(user(1)).unwrap();

        room.remove_member(UserId(1));
        assert!(room.is_empty());

        // removing again is a no-op
        room.remove_member(UserId(1));
        assert!(room.is_empty());
    }

    #[test]
    fn test_members_snapshot() {
        let room = Room::new(RoomId::from("r1"), RoomKind::Audio, 20);
        room.add_member(user(1)).unwrap();
        room.add_member(user(2)).unwrap();

        let mut names: Vec<String> = room.members().into_iter().map(|u| u.username).collect();
        names.sort();
        assert_eq!(names, vec!["user1", "user2"]);
    }

    #[test]
    fn test_room_kind_wire_names() {
        assert_eq!(serde_json::to_string(&RoomKind::Audio).unwrap(), "\"AUDIO\"");
        assert_eq!(
            serde_json::to_string(&RoomKind::AudioVideo).unwrap(),
            "\"AUDIO_VIDEO\""
        );
        let kind: RoomKind = serde_json::from_str("\"AUDIO_VIDEO\"").unwrap();
        assert_eq!(kind, RoomKind::AudioVideo);
    }
}
