//! WebSocket connection handler
//!
//! Owns one physical connection: authenticates the upgrade request,
//! then runs a reader task and a writer task so at most one side ever
//! touches each half of the socket. The reader forwards inbound frames
//! to the coordinator; the writer drains the connection's outbound
//! queue and emits keepalive pings.

use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::time::{interval_at, timeout, Instant};
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::http::StatusCode;
use tokio_tungstenite::tungstenite::protocol::WebSocketConfig;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::auth::Authenticator;
use crate::client::Client;
use crate::config::Config;
use crate::error::AppError;
use crate::message::{BroadcastMessage, ServerEnvelope};
use crate::server::ServerCommand;
use crate::user::User;

/// Outbound queue capacity per connection
const OUTBOUND_QUEUE_SIZE: usize = 32;

/// Handle a new TCP connection
///
/// Authenticates during the WebSocket handshake, registers the
/// connection with the coordinator, and runs the reader and writer
/// until the connection dies. The reader is the only path that
/// triggers deregistration.
pub async fn handle_connection(
    stream: TcpStream,
    cmd_tx: mpsc::Sender<ServerCommand>,
    auth: Arc<Authenticator>,
    config: Arc<Config>,
) -> Result<(), AppError> {
    let peer_addr = stream
        .peer_addr()
        .map(|a| a.to_string())
        .unwrap_or_else(|_| "unknown".to_string());

    debug!("New TCP connection from {}", peer_addr);

    let mut ws_config = WebSocketConfig::default();
    ws_config.max_message_size = Some(config.max_frame_bytes);
    ws_config.max_frame_size = Some(config.max_frame_bytes);

    // The handshake callback is the auth middleware: no valid bearer
    // token, no upgrade.
    let mut authed: Option<User> = None;
    let ws_stream = tokio_tungstenite::accept_hdr_async_with_config(
        stream,
        |request: &Request, response: Response| {
            let Some(token) = bearer_token(request) else {
                return Err(unauthorized("missing access token"));
            };
            match auth.verify_token(&token) {
                Ok(user) => {
                    authed = Some(user);
                    Ok(response)
                }
                Err(err) => Err(unauthorized(&err.to_string())),
            }
        },
        Some(ws_config),
    )
    .await?;

    let Some(user) = authed else {
        // the callback rejects before this can happen
        return Err(AppError::InvalidToken);
    };

    let conn_id = Uuid::new_v4();
    info!("User {} connected from {} (conn {})", user, peer_addr, conn_id);

    let (mut ws_sender, mut ws_receiver) = ws_stream.split();

    // Outbound queue; the coordinator holds the only sender after
    // registration, so a closed queue means we were deregistered.
    let (msg_tx, mut msg_rx) = mpsc::channel::<ServerEnvelope>(OUTBOUND_QUEUE_SIZE);

    if cmd_tx
        .send(ServerCommand::Register {
            client: Client::new(user.clone(), conn_id, msg_tx),
        })
        .await
        .is_err()
    {
        error!("Failed to register user {} - server closed", user.id);
        return Err(AppError::ChannelSend);
    }

    let cmd_tx_read = cmd_tx.clone();
    let read_idle_timeout = config.read_idle_timeout;
    let reader_user = user.clone();

    // Reader: WebSocket -> coordinator. Every received frame renews the
    // idle deadline; pongs are the liveness acknowledgments that keep a
    // silent connection alive.
    let read_task = tokio::spawn(async move {
        loop {
            let frame = match timeout(read_idle_timeout, ws_receiver.next()).await {
                Err(_) => {
                    warn!("Read deadline expired for user {}", reader_user.id);
                    break;
                }
                Ok(None) => break,
                Ok(Some(Err(e))) => {
                    error!("WebSocket error for user {}: {}", reader_user.id, e);
                    break;
                }
                Ok(Some(Ok(frame))) => frame,
            };

            match frame {
                Message::Text(text) => {
                    let message = BroadcastMessage {
                        user: reader_user.clone(),
                        payload: normalize_frame(&text),
                    };
                    if cmd_tx_read
                        .send(ServerCommand::Inbound { message })
                        .await
                        .is_err()
                    {
                        debug!("Server closed, ending read task for user {}", reader_user.id);
                        break;
                    }
                }
                Message::Close(frame) => {
                    debug!("User {} sent close frame: {:?}", reader_user.id, frame);
                    break;
                }
                Message::Ping(_) | Message::Pong(_) => {
                    // deadline renewed above; pong replies are automatic
                }
                _ => {
                    // binary frames are not part of the protocol
                }
            }
        }

        // the reader is the single deregistration path
        let _ = cmd_tx_read
            .send(ServerCommand::Deregister {
                user_id: reader_user.id,
            })
            .await;
        debug!("Read task ended for user {}", reader_user.id);
    });

    let ping_period = config.ping_period();
    let write_timeout = config.write_timeout;

    // Writer: outbound queue -> WebSocket, plus keepalive pings at 9/10
    // of the peer's read-idle timeout.
    let write_task = tokio::spawn(async move {
        let mut keepalive = interval_at(Instant::now() + ping_period, ping_period);
        loop {
            tokio::select! {
                maybe_msg = msg_rx.recv() => {
                    let Some(msg) = maybe_msg else {
                        // queue closed by the coordinator: say goodbye
                        let _ = ws_sender.close().await;
                        break;
                    };
                    let json = match serde_json::to_string(&msg) {
                        Ok(json) => json,
                        Err(e) => {
                            error!("Failed to serialize envelope: {}", e);
                            continue;
                        }
                    };
                    match timeout(write_timeout, ws_sender.send(Message::Text(json.into()))).await {
                        Ok(Ok(())) => {}
                        Ok(Err(e)) => {
                            debug!("WebSocket send failed, ending write task: {}", e);
                            break;
                        }
                        Err(_) => {
                            warn!("Write deadline expired, ending write task");
                            break;
                        }
                    }
                }
                _ = keepalive.tick() => {
                    match timeout(write_timeout, ws_sender.send(Message::Ping(Vec::new()))).await {
                        Ok(Ok(())) => {}
                        _ => {
                            debug!("Keepalive ping failed, ending write task");
                            break;
                        }
                    }
                }
            }
        }
        debug!("Write task ended");
    });

    // Each task owns one half of the socket; the connection is fully
    // closed once both have returned.
    let _ = tokio::join!(read_task, write_task);

    info!("User {} disconnected (conn {})", user, conn_id);

    Ok(())
}

/// Collapse embedded newlines to single spaces and trim surrounding
/// whitespace, so one inbound frame is always one logical message.
fn normalize_frame(text: &str) -> String {
    text.replace('\n', " ").trim().to_string()
}

/// Pull a bearer token out of the upgrade request: `Authorization`
/// header (with or without the `Bearer` prefix) or a `token` query
/// parameter.
fn bearer_token(request: &Request) -> Option<String> {
    if let Some(value) = request.headers().get("Authorization") {
        if let Ok(value) = value.to_str() {
            let token = value.strip_prefix("Bearer ").unwrap_or(value).trim();
            if !token.is_empty() {
                return Some(token.to_string());
            }
        }
    }

    request
        .uri()
        .query()?
        .split('&')
        .find_map(|pair| pair.strip_prefix("token="))
        .filter(|token| !token.is_empty())
        .map(|token| token.to_string())
}

fn unauthorized(reason: &str) -> ErrorResponse {
    let body = serde_json::json!({ "error": reason }).to_string();
    let mut response = ErrorResponse::new(Some(body));
    *response.status_mut() = StatusCode::UNAUTHORIZED;
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_frame() {
        assert_eq!(normalize_frame("  hello  "), "hello");
        assert_eq!(normalize_frame("a\nb\nc"), "a b c");
        assert_eq!(normalize_frame("\n{\"type\":\"HANGUP\"}\n"), "{\"type\":\"HANGUP\"}");
        assert_eq!(normalize_frame(""), "");
    }

    #[test]
    fn test_bearer_token_from_header() {
        let request = Request::builder()
            .uri("/ws")
            .header("Authorization", "Bearer abc123")
            .body(())
            .unwrap();
        assert_eq!(bearer_token(&request), Some("abc123".to_string()));

        // bare token without the scheme prefix
        let request = Request::builder()
            .uri("/ws")
            .header("Authorization", "abc123")
            .body(())
            .unwrap();
        assert_eq!(bearer_token(&request), Some("abc123".to_string()));
    }

    #[test]
    fn test_bearer_token_from_query() {
        let request = Request::builder()
            .uri("/ws?token=abc123&x=1")
            .body(())
            .unwrap();
        assert_eq!(bearer_token(&request), Some("abc123".to_string()));
    }

    #[test]
    fn test_bearer_token_missing() {
        let request = Request::builder().uri("/ws").body(()).unwrap();
        assert_eq!(bearer_token(&request), None);

        let request = Request::builder().uri("/ws?token=").body(()).unwrap();
        assert_eq!(bearer_token(&request), None);
    }

    #[test]
    fn test_unauthorized_response() {
        let response = unauthorized("invalid access token");
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(response.body().as_deref().unwrap().contains("invalid access token"));
    }
}
