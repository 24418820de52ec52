//! Signaling message types
//!
//! Every message on the signaling channel is a JSON object of the form
//! `{"type": ..., "data": ...}`:
//!
//! | type        | direction | data                                   |
//! |-------------|-----------|----------------------------------------|
//! | `offer`     | in        | session description                    |
//! | `answer`    | out       | session description                    |
//! | `candidate` | in / out  | ICE candidate                          |
//! | `text`      | out       | `{"message": ...}` inference result    |

use serde::{Deserialize, Serialize};

use crate::error::SignalingError;

/// SDP message type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SdpType {
    Offer,
    Pranswer,
    Answer,
    Rollback,
}

/// Session description as exchanged with browsers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionDescription {
    #[serde(rename = "type")]
    pub sdp_type: SdpType,
    pub sdp: String,
}

impl SessionDescription {
    pub fn offer(sdp: impl Into<String>) -> Self {
        Self {
            sdp_type: SdpType::Offer,
            sdp: sdp.into(),
        }
    }

    pub fn answer(sdp: impl Into<String>) -> Self {
        Self {
            sdp_type: SdpType::Answer,
            sdp: sdp.into(),
        }
    }
}

/// ICE candidate in the browser's `RTCIceCandidateInit` shape
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IceCandidateInit {
    pub candidate: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sdp_mid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sdp_m_line_index: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username_fragment: Option<String>,
}

/// Payload of a `text` message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextPayload {
    pub message: String,
}

/// A signaling message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "lowercase")]
pub enum SignalMessage {
    /// Remote offer
    Offer(SessionDescription),
    /// Local answer
    Answer(SessionDescription),
    /// ICE candidate, either direction
    Candidate(IceCandidateInit),
    /// Inference result for the client
    Text(TextPayload),
}

impl SignalMessage {
    /// Build a `text` message
    pub fn text(message: impl Into<String>) -> Self {
        SignalMessage::Text(TextPayload {
            message: message.into(),
        })
    }

    /// Parse an inbound message
    ///
    /// Malformed JSON, unknown types and bad `data` shapes all map to
    /// [`SignalingError::InvalidMessage`].
    pub fn parse(text: &str) -> Result<Self, SignalingError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Serialize for the wire
    pub fn to_json(&self) -> Result<String, SignalingError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Message type as it appears on the wire
    pub fn kind(&self) -> &'static str {
        match self {
            SignalMessage::Offer(_) => "offer",
            SignalMessage::Answer(_) => "answer",
            SignalMessage::Candidate(_) => "candidate",
            SignalMessage::Text(_) => "text",
        }
    }
}
