//! Client struct definition
//!
//! The coordinator-side handle for one live connection: the authenticated
//! user, a connection id for log correlation, and the sender half of the
//! connection's outbound queue. The coordinator holds the only sender, so
//! dropping a `Client` closes the queue and stops the writer task.

use tokio::sync::mpsc;
use uuid::Uuid;

use crate::error::SendError;
use crate::message::ServerEnvelope;
use crate::user::User;

/// A registered connection
#[derive(Debug)]
pub struct Client {
    /// Identity resolved during the connection handshake
    pub user: User,
    /// Distinguishes successive connections of the same user in logs
    pub conn_id: Uuid,
    /// Coordinator → writer task channel
    sender: mpsc::Sender<ServerEnvelope>,
}

impl Client {
    /// Create a new client handle around a connection's outbound queue.
    pub fn new(user: User, conn_id: Uuid, sender: mpsc::Sender<ServerEnvelope>) -> Self {
        Self {
            user,
            conn_id,
            sender,
        }
    }

    /// Queue an envelope for delivery to this connection.
    ///
    /// Returns an error if the queue is closed (connection going away).
    pub async fn send(&self, msg: ServerEnvelope) -> Result<(), SendError> {
        self.sender
            .send(msg)
            .await
            .map_err(|_| SendError::ChannelClosed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::UserId;

    #[tokio::test]
    async fn test_client_send() {
        let (tx, mut rx) = mpsc::channel(32);
        let client = Client::new(User::new(UserId(1), "alice"), Uuid::new_v4(), tx);

        client
            .send(ServerEnvelope::Error("boom".to_string()))
            .await
            .unwrap();

        match rx.recv().await {
            Some(ServerEnvelope::Error(msg)) => assert_eq!(msg, "boom"),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_send_on_closed_queue_fails() {
        let (tx, rx) = mpsc::channel(32);
        let client = Client::new(User::new(UserId(1), "alice"), Uuid::new_v4(), tx);
        drop(rx);

        let err = client
            .send(ServerEnvelope::Error("boom".to_string()))
            .await
            .unwrap_err();
        assert!(matches!(err, SendError::ChannelClosed));
    }
}
