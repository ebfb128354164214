use crate::domain::{ParticipantId, PresenceBeacon, Timestamp};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque SDP blob produced and consumed by the media transport
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct SessionDescription(String);

impl SessionDescription {
    pub fn new(sdp: impl Into<String>) -> Self {
        Self(sdp.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionDescription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Opaque ICE candidate blob
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct IceCandidate {
    pub candidate: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sdp_mid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sdp_mline_index: Option<u16>,
}

impl IceCandidate {
    pub fn new(candidate: impl Into<String>) -> Self {
        Self {
            candidate: candidate.into(),
            sdp_mid: None,
            sdp_mline_index: None,
        }
    }
}

/// Signaling payloads exchanged over the presence channel
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SignalKind {
    /// Searching announcement with matchable attributes
    Presence {
        language: Option<String>,
        interests: Vec<String>,
        timestamp: Timestamp,
    },

    /// Proposal to pair with the recipient
    MatchRequest {
        language: Option<String>,
        interests: Vec<String>,
    },

    /// Acceptance of a proposal; commits the pairing
    MatchAccept {
        language: Option<String>,
        interests: Vec<String>,
    },

    Offer {
        sdp: SessionDescription,
    },

    Answer {
        sdp: SessionDescription,
    },

    IceCandidate {
        candidate: IceCandidate,
    },

    /// Sender is ready to reveal video for the current pairing
    ///
    /// A `reply` answers a Ready from the peer and is never answered itself.
    Ready {
        #[serde(default)]
        reply: bool,
    },

    Chat {
        text: String,
    },

    /// Sender left the pairing
    Leave,
}

impl SignalKind {
    /// Short name for log lines
    pub fn name(&self) -> &'static str {
        match self {
            SignalKind::Presence { .. } => "presence",
            SignalKind::MatchRequest { .. } => "match_request",
            SignalKind::MatchAccept { .. } => "match_accept",
            SignalKind::Offer { .. } => "offer",
            SignalKind::Answer { .. } => "answer",
            SignalKind::IceCandidate { .. } => "ice_candidate",
            SignalKind::Ready { .. } => "ready",
            SignalKind::Chat { .. } => "chat",
            SignalKind::Leave => "leave",
        }
    }
}

/// Envelope carried by the presence channel
///
/// Delivery is at-most-once. Only messages from the same sender keep their
/// relative order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct SignalingMessage {
    pub from: ParticipantId,

    /// Recipient; `None` means broadcast
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<ParticipantId>,

    #[serde(flatten)]
    pub kind: SignalKind,
}

impl SignalingMessage {
    pub fn broadcast(from: ParticipantId, kind: SignalKind) -> Self {
        Self {
            from,
            to: None,
            kind,
        }
    }

    pub fn direct(from: ParticipantId, to: ParticipantId, kind: SignalKind) -> Self {
        Self {
            from,
            to: Some(to),
            kind,
        }
    }

    /// Build a presence broadcast from a beacon
    pub fn presence(beacon: &PresenceBeacon) -> Self {
        Self::broadcast(
            beacon.participant_id,
            SignalKind::Presence {
                language: beacon.language.clone(),
                interests: beacon.interests.clone(),
                timestamp: beacon.timestamp,
            },
        )
    }

    /// True for broadcasts and for messages addressed to `id`
    pub fn is_addressed_to(&self, id: &ParticipantId) -> bool {
        match self.to {
            None => true,
            Some(to) => to == *id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_shape_is_flat_and_tagged() {
        let from = ParticipantId::new();
        let to = ParticipantId::new();
        let msg = SignalingMessage::direct(
            from,
            to,
            SignalKind::Chat {
                text: "hello".to_string(),
            },
        );

        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(value["type"], "chat");
        assert_eq!(value["text"], "hello");
        assert_eq!(value["from"], from.to_string());
        assert_eq!(value["to"], to.to_string());
    }

    #[test]
    fn test_broadcast_omits_recipient() {
        let msg = SignalingMessage::broadcast(ParticipantId::new(), SignalKind::Leave);
        let value = serde_json::to_value(&msg).unwrap();

        assert!(value.get("to").is_none());
        assert_eq!(value["type"], "leave");
    }

    #[test]
    fn test_decode_ready_without_reply_flag() {
        let from = ParticipantId::new();
        let json = format!(r#"{{"from":"{}","type":"ready"}}"#, from);

        let msg: SignalingMessage = serde_json::from_str(&json).unwrap();
        assert_eq!(msg.kind, SignalKind::Ready { reply: false });
        assert_eq!(msg.to, None);
    }

    #[test]
    fn test_unknown_type_is_rejected() {
        let json = format!(r#"{{"from":"{}","type":"teleport"}}"#, ParticipantId::new());
        assert!(serde_json::from_str::<SignalingMessage>(&json).is_err());
    }

    #[test]
    fn test_addressing() {
        let me = ParticipantId::new();
        let other = ParticipantId::new();
        let sender = ParticipantId::new();

        assert!(SignalingMessage::broadcast(sender, SignalKind::Leave).is_addressed_to(&me));
        let ready = SignalKind::Ready { reply: false };

        assert!(SignalingMessage::direct(sender, me, ready.clone()).is_addressed_to(&me));
        assert!(!SignalingMessage::direct(sender, other, ready).is_addressed_to(&me));
    }

    #[test]
    fn test_kind_names() {
        assert_eq!(SignalKind::Ready { reply: true }.name(), "ready");
        assert_eq!(
            SignalKind::Offer {
                sdp: SessionDescription::new("v=0")
            }
            .name(),
            "offer"
        );
    }
}
