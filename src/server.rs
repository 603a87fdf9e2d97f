//! SignalServer actor implementation
//!
//! The central actor that owns all shared state: the client registry, the
//! room registry, and the client-room membership map. Every mutation goes
//! through its command channel, so events from all connections are
//! processed in one total order and no locking is needed.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::client::Client;
use crate::config::Config;
use crate::error::AppError;
use crate::message::{
    BroadcastMessage, CandidatePayload, ClientEnvelope, CreateOrJoinRoom, HangupPayload,
    RoomJoined, SdpPayload, ServerEnvelope,
};
use crate::room::Room;
use crate::types::{RoomId, UserId};
use crate::user::User;

/// Commands sent from connection tasks to the SignalServer actor
#[derive(Debug)]
pub enum ServerCommand {
    /// New connection finished its handshake
    Register { client: Client },
    /// A connection's reader terminated
    Deregister { user_id: UserId },
    /// One inbound frame, wrapped with the sender's identity
    Inbound { message: BroadcastMessage },
}

/// The signaling coordinator actor
///
/// Routes CREATE_OR_JOIN / OFFER / ANSWER / ICE_CANDIDATE / HANGUP
/// between room members. Routing errors go back to the sender as an
/// `error` envelope and never abort the actor.
pub struct SignalServer {
    /// Fixed runtime configuration (capacity table)
    config: Arc<Config>,
    /// All registered connections: UserId -> Client
    clients: HashMap<UserId, Client>,
    /// All live rooms: RoomId -> Room
    rooms: HashMap<RoomId, Room>,
    /// Membership map: UserId -> RoomId (a user is in at most one room)
    client_rooms: HashMap<UserId, RoomId>,
    /// Command receiver channel
    receiver: mpsc::Receiver<ServerCommand>,
}

impl SignalServer {
    /// Create a new SignalServer with the given command receiver.
    pub fn new(config: Arc<Config>, receiver: mpsc::Receiver<ServerCommand>) -> Self {
        Self {
            config,
            clients: HashMap::new(),
            rooms: HashMap::new(),
            client_rooms: HashMap::new(),
            receiver,
        }
    }

    /// Run the SignalServer event loop
    ///
    /// Continuously receives and processes commands until all senders are
    /// dropped. One command runs to completion before the next is taken.
    pub async fn run(mut self) {
        info!("SignalServer started");

        while let Some(cmd) = self.receiver.recv().await {
            self.handle_command(cmd).await;
        }

        info!("SignalServer shutting down");
    }

    /// Process a single command
    async fn handle_command(&mut self, cmd: ServerCommand) {
        match cmd {
            ServerCommand::Register { client } => self.handle_register(client),
            ServerCommand::Deregister { user_id } => self.handle_deregister(user_id).await,
            ServerCommand::Inbound { message } => self.handle_inbound(message).await,
        }
    }

    /// Register a connection. A duplicate user id replaces the previous
    /// entry (a user holds at most one live connection by auth policy).
    fn handle_register(&mut self, client: Client) {
        info!(
            "Registering client for user {} (conn {})",
            client.user, client.conn_id
        );
        if let Some(old) = self.clients.insert(client.user.id, client) {
            debug!(
                "Replaced stale connection {} for user {}",
                old.conn_id, old.user
            );
        }
        debug!(
            "Total clients: {}, Total rooms: {}",
            self.clients.len(),
            self.rooms.len()
        );
    }

    /// Deregister a connection: clean up its room membership, then drop
    /// the registry entry. Dropping the entry closes the connection's
    /// outbound queue, which is the writer task's signal to terminate.
    async fn handle_deregister(&mut self, user_id: UserId) {
        info!("Removing client for user id {}", user_id);

        self.remove_from_room(user_id, user_id).await;
        self.clients.remove(&user_id);

        debug!(
            "Total clients: {}, Total rooms: {}",
            self.clients.len(),
            self.rooms.len()
        );
    }

    /// Decode and dispatch one inbound frame. Any routing error is
    /// delivered back to the sender alone as an `error` envelope.
    async fn handle_inbound(&mut self, message: BroadcastMessage) {
        if let Err(err) = self.dispatch(&message).await {
            if !err.is_routing_error() {
                warn!("Internal error for user {}: {}", message.user, err);
                return;
            }
            debug!("Routing error for user {}: {}", message.user, err);
            if let Some(client) = self.clients.get(&message.user.id) {
                if client.send(ServerEnvelope::from(&err)).await.is_err() {
                    debug!("Could not report error to user {}", message.user.id);
                }
            }
        }
    }

    async fn dispatch(&mut self, message: &BroadcastMessage) -> Result<(), AppError> {
        let envelope: ClientEnvelope = serde_json::from_str(&message.payload)?;

        match envelope {
            ClientEnvelope::CreateOrJoin(payload) => {
                self.create_or_join_room(&message.user, payload).await
            }
            ClientEnvelope::Offer(payload) => self.propagate_offer(payload).await,
            ClientEnvelope::Answer(payload) => self.send_answer(payload).await,
            ClientEnvelope::IceCandidate(payload) => self.propagate_candidate(payload).await,
            ClientEnvelope::Hangup(payload) => self.handle_hangup(&message.user, payload).await,
        }
    }

    /// Create the room if it does not exist (the caller becomes the
    /// initiator) or join it, then announce the join to every member,
    /// the joiner included.
    async fn create_or_join_room(
        &mut self,
        user: &User,
        payload: CreateOrJoinRoom,
    ) -> Result<(), AppError> {
        if let Some(current) = self.client_rooms.get(&user.id) {
            if *current != payload.room_id {
                return Err(AppError::AlreadyInAnotherRoom(current.to_string()));
            }
        }

        let is_initiator = !self.rooms.contains_key(&payload.room_id);
        if is_initiator {
            let capacity = self.config.capacity(payload.room_type);
            self.rooms.insert(
                payload.room_id.clone(),
                Room::new(payload.room_id.clone(), payload.room_type, capacity),
            );
            info!("Created room {} ({:?})", payload.room_id, payload.room_type);
        }

        let add_result = match self.rooms.get(&payload.room_id) {
            Some(room) => room.add_member(user.clone()),
            None => Err(AppError::RoomNotFound(payload.room_id.to_string())),
        };
        if let Err(err) = add_result {
            // a join that failed must not leave an empty room behind
            if self
                .rooms
                .get(&payload.room_id)
                .is_some_and(|room| room.is_empty())
            {
                self.rooms.remove(&payload.room_id);
            }
            return Err(err);
        }

        self.client_rooms.insert(user.id, payload.room_id.clone());
        info!(
            "User {} joined room {} (initiator: {})",
            user, payload.room_id, is_initiator
        );

        let event = ServerEnvelope::RoomJoined(RoomJoined {
            room_id: payload.room_id.clone(),
            user: user.clone(),
            is_initiator,
        });
        if let Some(room) = self.rooms.get(&payload.room_id) {
            self.broadcast_to_room(room, &event, None).await;
        }
        Ok(())
    }

    /// Relay an offer to every room member except the sender.
    async fn propagate_offer(&self, payload: SdpPayload) -> Result<(), AppError> {
        let sender = payload.user_id;
        let room = self.room(&payload.room_id)?;
        let event = ServerEnvelope::Offer(payload);
        self.broadcast_to_room(room, &event, Some(sender)).await;
        Ok(())
    }

    /// Relay a network candidate to every room member except the sender.
    async fn propagate_candidate(&self, payload: CandidatePayload) -> Result<(), AppError> {
        let sender = payload.user_id;
        let room = self.room(&payload.room_id)?;
        let event = ServerEnvelope::IceCandidate(payload);
        self.broadcast_to_room(room, &event, Some(sender)).await;
        Ok(())
    }

    /// Deliver an answer to the targeted member only. An answer without
    /// a target goes nowhere.
    async fn send_answer(&self, payload: SdpPayload) -> Result<(), AppError> {
        let room = self.room(&payload.room_id)?;

        let Some(target) = payload.target_user_id else {
            debug!("Answer for room {} has no target, dropped", payload.room_id);
            return Ok(());
        };
        if !room.contains(target) {
            debug!(
                "Answer target {} is not in room {}, dropped",
                target, payload.room_id
            );
            return Ok(());
        }

        if let Some(client) = self.clients.get(&target) {
            if client.send(ServerEnvelope::Answer(payload)).await.is_err() {
                debug!("Dropping answer for user {}: outbound queue closed", target);
            }
        }
        Ok(())
    }

    /// Hang up the user named in the payload. The room is resolved
    /// through that user's membership; remaining members are notified,
    /// except the requesting sender.
    async fn handle_hangup(&mut self, sender: &User, payload: HangupPayload) -> Result<(), AppError> {
        if !self.client_rooms.contains_key(&payload.user_id) {
            return Err(AppError::RoomNotFound(payload.room_id.to_string()));
        }

        self.remove_from_room(payload.user_id, sender.id).await;
        Ok(())
    }

    /// Remove a user's room membership, evict the room if it became
    /// empty, and otherwise notify the remaining members with a HANGUP
    /// event (skipping `exclude`).
    async fn remove_from_room(&mut self, user_id: UserId, exclude: UserId) {
        let Some(room_id) = self.client_rooms.remove(&user_id) else {
            return;
        };

        let now_empty = match self.rooms.get(&room_id) {
            Some(room) => {
                room.remove_member(user_id);
                room.is_empty()
            }
            None => return,
        };

        info!("User {} left room {}", user_id, room_id);

        if now_empty {
            self.rooms.remove(&room_id);
            debug!("Room {} evicted (empty)", room_id);
            return;
        }

        let event = ServerEnvelope::Hangup(HangupPayload {
            room_id: room_id.clone(),
            user_id,
        });
        if let Some(room) = self.rooms.get(&room_id) {
            self.broadcast_to_room(room, &event, Some(exclude)).await;
        }
    }

    /// Queue an envelope for every member of the room, skipping `exclude`.
    async fn broadcast_to_room(&self, room: &Room, event: &ServerEnvelope, exclude: Option<UserId>) {
        for member in room.members() {
            if exclude == Some(member.id) {
                continue;
            }
            let Some(client) = self.clients.get(&member.id) else {
                debug!("No live connection for room member {}", member.id);
                continue;
            };
            if client.send(event.clone()).await.is_err() {
                debug!(
                    "Dropping message for user {}: outbound queue closed",
                    member.id
                );
            }
        }
    }

    fn room(&self, room_id: &RoomId) -> Result<&Room, AppError> {
        self.rooms
            .get(room_id)
            .ok_or_else(|| AppError::RoomNotFound(room_id.to_string()))
    }
}
