//! User storage
//!
//! The signaling core never talks to the store directly; only the auth
//! layer does. The trait is the seam where a database-backed
//! implementation would plug in; the in-memory variant backs tests and
//! deployments that register users elsewhere.

use std::collections::HashMap;
use std::sync::Mutex;

use crate::error::AppError;
use crate::types::UserId;
use crate::user::User;

/// Interface for user storage.
pub trait UserRepository: Send + Sync {
    /// Create a user with the given username and a freshly assigned id.
    fn create_user(&self, username: &str) -> Result<User, AppError>;

    /// Look a user up by id.
    fn find_by_id(&self, id: UserId) -> Result<User, AppError>;

    /// Look a user up by username.
    fn find_by_username(&self, username: &str) -> Result<User, AppError>;
}

#[derive(Debug, Default)]
struct StoreInner {
    users: HashMap<UserId, User>,
    by_username: HashMap<String, UserId>,
    next_id: u64,
}

/// In-memory `UserRepository`.
///
/// Ids are assigned sequentially starting at 1; id 0 is never handed out,
/// so a zero target_user_id on the wire can never address a real user.
#[derive(Debug, Default)]
pub struct MemoryUserStore {
    inner: Mutex<StoreInner>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl UserRepository for MemoryUserStore {
    fn create_user(&self, username: &str) -> Result<User, AppError> {
        let username = username.trim();
        if username.is_empty() {
            return Err(AppError::InvalidUsername(
                "username can not be left blank".to_string(),
            ));
        }

        let mut inner = self.inner.lock().expect("user store lock poisoned");
        if inner.by_username.contains_key(username) {
            return Err(AppError::UsernameTaken(username.to_string()));
        }

        inner.next_id += 1;
        let user = User::new(UserId(inner.next_id), username);
        inner.by_username.insert(username.to_string(), user.id);
        inner.users.insert(user.id, user.clone());
        Ok(user)
    }

    fn find_by_id(&self, id: UserId) -> Result<User, AppError> {
        let inner = self.inner.lock().expect("user store lock poisoned");
        inner
            .users
            .get(&id)
            .cloned()
            .ok_or_else(|| AppError::UserNotFound(id.to_string()))
    }

    fn find_by_username(&self, username: &str) -> Result<User, AppError> {
        let inner = self.inner.lock().expect("user store lock poisoned");
        inner
            .by_username
            .get(username)
            .and_then(|id| inner.users.get(id))
            .cloned()
            .ok_or_else(|| AppError::UserNotFound(username.to_string()))
    }
}
