//! WebRTC Signaling Relay Library
//!
//! A signaling server for peer-to-peer audio/video calls built with
//! tokio-tungstenite, using the Actor pattern for state management.
//! Clients hold a persistent WebSocket connection, join a named room,
//! and exchange offer/answer/ICE negotiation messages which the server
//! relays without inspecting. No media bytes pass through it.
//!
//! # Features
//! - Token-authenticated WebSocket upgrade
//! - Create-or-join rooms with per-kind capacity (audio / audio+video)
//! - Offer and ICE candidate relay to room peers
//! - Targeted answer delivery
//! - Hangup and disconnect cleanup with room eviction
//! - Keepalive pings with read/write deadlines
//!
//! # Architecture
//! Uses the Actor pattern with `mpsc` channels:
//! - `SignalServer` is the central actor owning all room and client state
//! - Each connection has a reader and a writer task; the reader feeds the
//!   actor, the writer drains the connection's private outbound queue
//! - No locks needed - all state mutation goes through message passing
//!
//! # Example
//! ```ignore
//! use std::sync::Arc;
//! use tokio::net::TcpListener;
//! use tokio::sync::mpsc;
//! use huddle::{handle_connection, Authenticator, Config, MemoryUserStore, SignalServer};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = Arc::new(Config::default());
//!     let store = Arc::new(MemoryUserStore::new());
//!     let auth = Arc::new(Authenticator::new(store));
//!
//!     let listener = TcpListener::bind(&config.bind_addr).await.unwrap();
//!     let (cmd_tx, cmd_rx) = mpsc::channel(256);
//!
//!     tokio::spawn(SignalServer::new(config.clone(), cmd_rx).run());
//!
//!     while let Ok((stream, _)) = listener.accept().await {
//!         tokio::spawn(handle_connection(
//!             stream,
//!             cmd_tx.clone(),
//!             auth.clone(),
//!             config.clone(),
//!         ));
//!     }
//! }
//! ```

pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod handler;
pub mod message;
pub mod room;
pub mod server;
pub mod store;
pub mod types;
pub mod user;

// Re-export main types for convenience
pub use auth::Authenticator;
pub use client::Client;
pub use config::Config;
pub use error::{AppError, SendError};
pub use handler::handle_connection;
pub use message::{BroadcastMessage, ClientEnvelope, ServerEnvelope};
pub use room::{Room, RoomKind};
pub use server::{ServerCommand, SignalServer};
pub use store::{MemoryUserStore, UserRepository};
pub use types::{RoomId, UserId};
pub use user::User;
