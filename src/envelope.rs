//! Wire format of the messages exchanged over a relay connection.
//!
//! Every websocket text frame carries exactly one JSON envelope. Inbound
//! envelopes are tagged by their `type` field; anything the relay does not
//! know decodes to [`Inbound::Unknown`] and is ignored by the router.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Sender name used for notices generated by the relay itself.
pub const SYSTEM: &str = "System";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Inbound {
    Direct {
        #[serde(default)]
        to: String,
        #[serde(default)]
        message: String,
    },
    Room {
        #[serde(default)]
        to: String,
        #[serde(default)]
        message: String,
    },
    Join {
        #[serde(default)]
        to: String,
    },
    Leave {
        #[serde(default)]
        to: String,
    },
    WebrtcSignal {
        #[serde(default)]
        to: String,
        #[serde(default)]
        signal: Value,
    },
    StartRoomCall {
        #[serde(default)]
        to: String,
    },
    EndRoomCall {
        #[serde(default)]
        to: String,
    },
    #[serde(other)]
    Unknown,
}

impl Inbound {
    pub fn decode(text: &str) -> Result<Inbound, serde_json::Error> {
        serde_json::from_str(text)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutboundKind {
    #[serde(rename = "New User")]
    NewUser,
    Chat,
    Leave,
    #[serde(rename = "webrtc_signal")]
    WebrtcSignal,
    #[serde(rename = "start_room_call")]
    StartRoomCall,
    #[serde(rename = "end_room_call")]
    EndRoomCall,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Outbound {
    pub from: String,
    #[serde(rename = "type")]
    pub kind: OutboundKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signal: Option<Value>,
}

impl Outbound {
    fn notice(from: &str, kind: OutboundKind, message: String) -> Outbound {
        Outbound {
            from: from.to_owned(),
            kind,
            message: Some(message),
            signal: None,
        }
    }

    pub fn user_connected(username: &str) -> Outbound {
        Outbound::notice(
            SYSTEM,
            OutboundKind::NewUser,
            format!("{} has joined the chat", username),
        )
    }

    pub fn joined_room(username: &str) -> Outbound {
        Outbound::notice(
            username,
            OutboundKind::NewUser,
            format!("{} joined the room", username),
        )
    }

    pub fn left_room(username: &str) -> Outbound {
        Outbound::notice(
            username,
            OutboundKind::Leave,
            format!("{} left the room", username),
        )
    }

    /// An empty chat text is left off the wire entirely.
    pub fn chat(from: &str, message: String) -> Outbound {
        Outbound {
            from: from.to_owned(),
            kind: OutboundKind::Chat,
            message: Some(message).filter(|m| !m.is_empty()),
            signal: None,
        }
    }

    /// A missing or `null` signal is left off the wire entirely.
    pub fn signal(from: &str, signal: Value) -> Outbound {
        Outbound {
            from: from.to_owned(),
            kind: OutboundKind::WebrtcSignal,
            message: None,
            signal: Some(signal).filter(|s| !s.is_null()),
        }
    }

    pub fn call_started(from: &str) -> Outbound {
        Outbound::notice(
            from,
            OutboundKind::StartRoomCall,
            format!("{} started a call in the room", from),
        )
    }

    pub fn call_ended(from: &str) -> Outbound {
        Outbound::notice(
            from,
            OutboundKind::EndRoomCall,
            format!("{} ended the call in the room", from),
        )
    }
}
