//! User identity
//!
//! The identity attached to a connection after authentication. The core
//! only reads it; creation and lookup live in the user store.

use serde::{Deserialize, Serialize};

use crate::types::UserId;

/// An authenticated user.
///
/// Immutable for the lifetime of a connection. Embedded verbatim in
/// ROOM_JOIN events so peers learn who joined.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
}

impl User {
    pub fn new(id: UserId, username: impl Into<String>) -> Self {
        Self {
            id,
            username: username.into(),
        }
    }
}

impl std::fmt::Display for User {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} (#{})", self.username, self.id)
    }
}
