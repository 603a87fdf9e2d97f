//! Token authentication
//!
//! Issues opaque bearer tokens and resolves them back to users. The
//! WebSocket handshake callback in the handler is the enforcement point:
//! a request that does not carry a valid token never reaches the core.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use rand::Rng;

use crate::error::AppError;
use crate::store::UserRepository;
use crate::types::UserId;
use crate::user::User;

/// Length of generated bearer tokens
const TOKEN_LENGTH: usize = 32;

/// Issues and verifies bearer tokens against the user store.
pub struct Authenticator {
    store: Arc<dyn UserRepository>,
    tokens: Mutex<HashMap<String, UserId>>,
}

impl Authenticator {
    pub fn new(store: Arc<dyn UserRepository>) -> Self {
        Self {
            store,
            tokens: Mutex::new(HashMap::new()),
        }
    }

    /// Issue a fresh bearer token for the user.
    pub fn issue_token(&self, user: &User) -> String {
        let token: String = rand::thread_rng()
            .sample_iter(&rand::distributions::Alphanumeric)
            .take(TOKEN_LENGTH)
            .map(char::from)
            .collect();

        let mut tokens = self.tokens.lock().expect("token table lock poisoned");
        tokens.insert(token.clone(), user.id);
        token
    }

    /// Resolve a bearer token to the user it was issued for.
    pub fn verify_token(&self, token: &str) -> Result<User, AppError> {
        let user_id = {
            let tokens = self.tokens.lock().expect("token table lock poisoned");
            tokens.get(token).copied()
        };

        let user_id = user_id.ok_or(AppError::InvalidToken)?;
        self.store
            .find_by_id(user_id)
            .map_err(|_| AppError::InvalidToken)
    }

    /// Register a new user and hand back their first token.
    pub fn register(&self, username: &str) -> Result<(User, String), AppError> {
        let user = self.store.create_user(username)?;
        let token = self.issue_token(&user);
        Ok((user, token))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryUserStore;

    fn authenticator() -> Authenticator {
        Authenticator::new(Arc::new(MemoryUserStore::new()))
    }

    #[test]
    fn test_issue_and_verify_roundtrip() {
        let auth = authenticator();
        let (user, token) = auth.register("alice").unwrap();

        assert_eq!(token.len(), TOKEN_LENGTH);
        assert_eq!(auth.verify_token(&token).unwrap(), user);
    }

    #[test]
    fn test_unknown_token_rejected() {
        let auth = authenticator();
        assert!(matches!(
            auth.verify_token("not-a-token"),
            Err(AppError::InvalidToken)
        ));
    }

    #[test]
    fn test_tokens_are_unique_per_issue() {
        let auth = authenticator();
        let (user, first) = auth.register("alice").unwrap();
        let second = auth.issue_token(&user);

        assert_ne!(first, second);
        // both stay valid
        assert_eq!(auth.verify_token(&first).unwrap().id, user.id);
        assert_eq!(auth.verify_token(&second).unwrap().id, user.id);
    }

    #[test]
    fn test_duplicate_registration_rejected() {
        let auth = authenticator();
        auth.register("alice").unwrap();
        assert!(matches!(
            auth.register("alice"),
            Err(AppError::UsernameTaken(_))
        ));
    }
}
