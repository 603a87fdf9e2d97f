//! WebRTC Signaling Relay - Entry Point
//!
//! Starts the TCP listener and SignalServer actor, accepting connections.

use std::env;
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use huddle::{handle_connection, Authenticator, Config, MemoryUserStore, SignalServer};

/// Channel buffer size for server commands
const CHANNEL_BUFFER_SIZE: usize = 256;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging with environment filter
    // Use RUST_LOG env var to control log level
    // e.g., RUST_LOG=debug or RUST_LOG=huddle=trace
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("huddle=info")),
        )
        .init();

    let config = Arc::new(Config::from_env());

    // Registration and login live in an external service; the store and
    // authenticator here are the seam it would plug into.
    let store = Arc::new(MemoryUserStore::new());
    let auth = Arc::new(Authenticator::new(store));
    seed_users(&auth);

    // Start TCP listener
    let listener = TcpListener::bind(&config.bind_addr).await?;
    info!("Signaling server listening on {}", config.bind_addr);

    // Create SignalServer actor channel and start
    let (cmd_tx, cmd_rx) = mpsc::channel(CHANNEL_BUFFER_SIZE);
    let server = SignalServer::new(config.clone(), cmd_rx);
    tokio::spawn(server.run());

    info!("SignalServer actor started");

    // Connection accept loop
    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                info!("New connection from {}", addr);
                let cmd_tx = cmd_tx.clone();
                let auth = auth.clone();
                let config = config.clone();

                // Spawn handler task for each connection
                tokio::spawn(async move {
                    if let Err(e) = handle_connection(stream, cmd_tx, auth, config).await {
                        error!("Connection handler error: {}", e);
                    }
                });
            }
            Err(e) => {
                error!("Failed to accept connection: {}", e);
            }
        }
    }
}

/// Register the usernames listed in `HUDDLE_SEED_USERS` (comma-separated)
/// and log their bearer tokens, so the server can be exercised without
/// the external login service.
fn seed_users(auth: &Authenticator) {
    let Ok(seed) = env::var("HUDDLE_SEED_USERS") else {
        return;
    };

    for username in seed.split(',').map(str::trim).filter(|u| !u.is_empty()) {
        match auth.register(username) {
            Ok((user, token)) => info!("Seeded user {} with token {}", user, token),
            Err(e) => warn!("Could not seed user '{}': {}", username, e),
        }
    }
}
