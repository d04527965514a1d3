//! JSON messages exchanged over the relay's WebSocket (spec §4.7).
//!
//! The relay and the endpoint's peer fabric share this module so that both
//! sides of the wire agree on field names and the message-type tag without
//! duplicating the schema.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// WebSocket close codes that are part of the relay contract (spec §6).
pub mod close_code {
    pub const EXPECTED: u16 = 1000;
    pub const UNEXPECTED: u16 = 1001;
    pub const UNKNOWN_MESSAGE_TYPE: u16 = 4000;
    pub const UNAUTHENTICATED: u16 = 4001;
    pub const FORBIDDEN: u16 = 4002;
    pub const MESSAGE_TOO_LARGE: u16 = 4003;
}

/// `"offer"` or `"answer"`, matching a WebRTC session description's kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DescriptionType {
    Offer,
    Answer,
}

/// Sent by a client to claim a `uuid` under its authenticated user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayRegistrationRequest {
    pub name: String,
    pub uuid: Uuid,
}

/// The relay's reply to a registration attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RelayResponse {
    pub fn ok() -> Self {
        Self {
            success: true,
            message: None,
            error: None,
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            message: None,
            error: Some(error.into()),
        }
    }
}

/// A WebRTC session description forwarded between two same-user clients.
///
/// Sent by the source client to the relay with `error: None`; the relay
/// either forwards it verbatim to the target, or (if the target is unknown
/// or belongs to a different user) stamps `error` and echoes it back to
/// the *sender* rather than closing the connection (spec §4.7 step 3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeerConnectionRequest {
    pub source_uuid: Uuid,
    pub source_name: String,
    pub peer_uuid: Uuid,
    pub description_type: DescriptionType,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PeerConnectionRequest {
    /// Return a copy of this request stamped with an error, for replying
    /// to the sender without mutating the original.
    pub fn with_error(&self, error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
            ..self.clone()
        }
    }
}

/// The tagged union of every message type that can appear on the relay's
/// WebSocket, dispatched on a `"type"` field.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum RelayMessage {
    RelayRegistrationRequest(RelayRegistrationRequest),
    RelayResponse(RelayResponse),
    PeerConnectionRequest(PeerConnectionRequest),
}

impl RelayMessage {
    pub fn to_json(&self) -> crate::error::NetworkResult<String> {
        serde_json::to_string(self).map_err(|e| crate::error::NetworkError::RelayEncode(e.to_string()))
    }

    pub fn from_json(s: &str) -> crate::error::NetworkResult<Self> {
        serde_json::from_str(s).map_err(|e| crate::error::NetworkError::RelayDecode(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registration_round_trips_through_json() {
        let uuid = Uuid::new_v4();
        let msg = RelayMessage::RelayRegistrationRequest(RelayRegistrationRequest {
            name: "client-a".into(),
            uuid,
        });
        let json = msg.to_json().unwrap();
        assert!(json.contains("\"type\":\"RelayRegistrationRequest\""));
        let back = RelayMessage::from_json(&json).unwrap();
        match back {
            RelayMessage::RelayRegistrationRequest(r) => {
                assert_eq!(r.name, "client-a");
                assert_eq!(r.uuid, uuid);
            }
            other => panic!("unexpected variant: {other:?}"),
        }
    }

    #[test]
    fn peer_connection_request_with_error_preserves_original_fields() {
        let req = PeerConnectionRequest {
            source_uuid: Uuid::new_v4(),
            source_name: "c1".into(),
            peer_uuid: Uuid::new_v4(),
            description_type: DescriptionType::Offer,
            description: "sdp-blob".into(),
            error: None,
        };
        let errored = req.with_error("unknown peer");
        assert_eq!(errored.source_name, req.source_name);
        assert_eq!(errored.description, req.description);
        assert_eq!(errored.error.as_deref(), Some("unknown peer"));
    }

    #[test]
    fn decode_failure_is_a_relay_decode_error() {
        let err = RelayMessage::from_json("not json").unwrap_err();
        assert!(matches!(err, crate::error::NetworkError::RelayDecode(_)));
    }
}
