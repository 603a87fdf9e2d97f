//! Message protocol definitions
//!
//! JSON-based bidirectional message protocol using Serde's tagged enum
//! for type-safe serialization/deserialization. Every frame is an
//! envelope `{"type": ..., "payload": ...}`; the payload shape depends
//! on the type tag. SDP and candidate blobs are relayed opaquely.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::AppError;
use crate::room::RoomKind;
use crate::types::{RoomId, UserId};
use crate::user::User;

/// Client → Server envelope
///
/// All messages a client may send. The tag/content attributes map the
/// enum onto the wire envelope.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum ClientEnvelope {
    /// Create the named room, or join it if it already exists
    #[serde(rename = "CREATE_OR_JOIN")]
    CreateOrJoin(CreateOrJoinRoom),
    /// Session description offered to the other room members
    #[serde(rename = "OFFER")]
    Offer(SdpPayload),
    /// Session description answered to one specific member
    #[serde(rename = "ANSWER")]
    Answer(SdpPayload),
    /// Network candidate for establishing the direct media path
    #[serde(rename = "ICE_CANDIDATE")]
    IceCandidate(CandidatePayload),
    /// Leave the call
    #[serde(rename = "HANGUP")]
    Hangup(HangupPayload),
}

/// Payload for CREATE_OR_JOIN
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateOrJoinRoom {
    pub room_id: RoomId,
    pub room_type: RoomKind,
}

/// Payload for OFFER and ANSWER
///
/// `user_id` names the sender; an offer is relayed to everyone in the
/// room except that user. `target_user_id` addresses one member and is
/// only honored for answers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SdpPayload {
    pub room_id: RoomId,
    pub user_id: UserId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_user_id: Option<UserId>,
    pub sdp: Value,
}

/// Payload for ICE_CANDIDATE
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidatePayload {
    pub room_id: RoomId,
    pub user_id: UserId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_user_id: Option<UserId>,
    pub candidate: Value,
}

/// Payload for HANGUP
///
/// `user_id` names the user being hung up; the room is resolved through
/// that user's membership, not through the sender's.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HangupPayload {
    pub room_id: RoomId,
    pub user_id: UserId,
}

/// Server → Client envelope
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "payload")]
pub enum ServerEnvelope {
    /// A user joined the room (sent to every member, joiner included)
    #[serde(rename = "ROOM_JOIN")]
    RoomJoined(RoomJoined),
    /// Relayed offer
    #[serde(rename = "OFFER")]
    Offer(SdpPayload),
    /// Relayed answer
    #[serde(rename = "ANSWER")]
    Answer(SdpPayload),
    /// Relayed candidate
    #[serde(rename = "ICE_CANDIDATE")]
    IceCandidate(CandidatePayload),
    /// A user left the room
    #[serde(rename = "HANGUP")]
    Hangup(HangupPayload),
    /// Routing or decode failure, reported only to the sender
    #[serde(rename = "error")]
    Error(String),
}

/// Payload for ROOM_JOIN events
#[derive(Debug, Clone, Serialize)]
pub struct RoomJoined {
    pub room_id: RoomId,
    pub user: User,
    pub is_initiator: bool,
}

/// An inbound frame wrapped with the identity of the connection that
/// produced it, as handed from a reader task to the coordinator.
#[derive(Debug, Clone)]
pub struct BroadcastMessage {
    /// User from whom we got the frame
    pub user: User,
    /// The raw frame text, still undecoded
    pub payload: String,
}

/// Convert a routing error into the wire `error` envelope.
impl From<&AppError> for ServerEnvelope {
    fn from(err: &AppError) -> Self {
        ServerEnvelope::Error(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_create_or_join_deserialize() {
        let json = r#"{"type":"CREATE_OR_JOIN","payload":{"room_id":"r1","room_type":"AUDIO_VIDEO"}}"#;
        let msg: ClientEnvelope = serde_json::from_str(json).unwrap();
        match msg {
            ClientEnvelope::CreateOrJoin(p) => {
                assert_eq!(p.room_id, RoomId::from("r1"));
                assert_eq!(p.room_type, RoomKind::AudioVideo);
            }
            _ => panic!("Wrong variant"),
        }
    }

    #[test]
    fn test_offer_deserialize_keeps_sdp_opaque() {
        let json = r#"{"type":"OFFER","payload":{"room_id":"r1","user_id":1,"sdp":{"type":"offer","sdp":"v=0..."}}}"#;
        let msg: ClientEnvelope = serde_json::from_str(json).unwrap();
        match msg {
            ClientEnvelope::Offer(p) => {
                assert_eq!(p.user_id, UserId(1));
                assert!(p.target_user_id.is_none());
                assert_eq!(p.sdp["type"], "offer");
            }
            _ => panic!("Wrong variant"),
        }
    }

    #[test]
    fn test_answer_deserialize_with_target() {
        let json =
            r#"{"type":"ANSWER","payload":{"room_id":"r1","user_id":2,"target_user_id":1,"sdp":"x"}}"#;
        let msg: ClientEnvelope = serde_json::from_str(json).unwrap();
        match msg {
            ClientEnvelope::Answer(p) => assert_eq!(p.target_user_id, Some(UserId(1))),
            _ => panic!("Wrong variant"),
        }
    }

    #[test]
    fn test_hangup_deserialize() {
        let json = r#"{"type":"HANGUP","payload":{"room_id":"r1","user_id":1}}"#;
        let msg: ClientEnvelope = serde_json::from_str(json).unwrap();
        match msg {
            ClientEnvelope::Hangup(p) => {
                assert_eq!(p.room_id, RoomId::from("r1"));
                assert_eq!(p.user_id, UserId(1));
            }
            _ => panic!("Wrong variant"),
        }
    }

    #[test]
    fn test_unknown_type_is_rejected() {
        let json = r#"{"type":"DANCE","payload":{}}"#;
        assert!(serde_json::from_str::<ClientEnvelope>(json).is_err());
    }

    #[test]
    fn test_room_joined_serialize() {
        let msg = ServerEnvelope::RoomJoined(RoomJoined {
            room_id: RoomId::from("r1"),
            user: User::new(UserId(1), "alice"),
            is_initiator: true,
        });
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(
            value,
            json!({
                "type": "ROOM_JOIN",
                "payload": {
                    "room_id": "r1",
                    "user": {"id": 1, "username": "alice"},
                    "is_initiator": true
                }
            })
        );
    }

    #[test]
    fn test_error_envelope_serialize() {
        let err = AppError::RoomNotFound("r9".into());
        let msg = ServerEnvelope::from(&err);
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(
            value,
            json!({"type": "error", "payload": "room not found: r9"})
        );
    }

    #[test]
    fn test_relayed_offer_roundtrip() {
        let payload = SdpPayload {
            room_id: RoomId::from("r1"),
            user_id: UserId(1),
            target_user_id: None,
            sdp: json!({"sdp": "v=0..."}),
        };
        let value = serde_json::to_value(ServerEnvelope::Offer(payload)).unwrap();
        assert_eq!(value["type"], "OFFER");
        assert_eq!(value["payload"]["sdp"]["sdp"], "v=0...");
        // absent target stays absent on the wire
        assert!(value["payload"].get("target_user_id").is_none());
    }
}
