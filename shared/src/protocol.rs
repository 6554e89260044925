//! Websocket frames.
//!
//! Every frame is one JSON object tagged by its `type` field. Decoding first
//! looks at the tag so an unknown or missing tag is reported separately from a
//! known tag with a broken payload.

use crate::movement::Position;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The username a session runs under.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Identity(String);

impl Identity {
    /// Returns `None` for a blank username.
    pub fn new(username: impl Into<String>) -> Option<Self> {
        let username = username.into();
        if username.trim().is_empty() {
            None
        } else {
            Some(Self(username))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for Identity {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<String> for Identity {
    fn eq(&self, other: &String) -> bool {
        &self.0 == other
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProximityAction {
    Approach,
    Leave,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum WireMessage {
    Position {
        username: String,
        row: i32,
        col: i32,
    },
    Proximity {
        username: String,
        target: String,
        action: ProximityAction,
    },
    Chat {
        recipient: String,
        message: String,
        sender: String,
    },
}

impl WireMessage {
    pub const TAGS: [&'static str; 3] = ["position", "proximity", "chat"];

    pub fn position(username: &Identity, pos: Position) -> Self {
        WireMessage::Position {
            username: username.as_str().to_string(),
            row: pos.row,
            col: pos.col,
        }
    }

    pub fn proximity(username: &str, target: &str, action: ProximityAction) -> Self {
        WireMessage::Proximity {
            username: username.to_string(),
            target: target.to_string(),
            action,
        }
    }

    pub fn chat(sender: &Identity, recipient: &str, message: &str) -> Self {
        WireMessage::Chat {
            recipient: recipient.to_string(),
            message: message.to_string(),
            sender: sender.as_str().to_string(),
        }
    }

    pub fn tag(&self) -> &'static str {
        match self {
            WireMessage::Position { .. } => "position",
            WireMessage::Proximity { .. } => "proximity",
            WireMessage::Chat { .. } => "chat",
        }
    }
}

#[derive(Debug)]
pub enum ProtocolError {
    MissingType,
    UnknownType(String),
    Malformed(serde_json::Error),
}

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProtocolError::MissingType => write!(f, "frame has no type tag"),
            ProtocolError::UnknownType(tag) => write!(f, "unknown frame type {}", tag),
            ProtocolError::Malformed(err) => write!(f, "malformed frame: {}", err),
        }
    }
}

impl std::error::Error for ProtocolError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ProtocolError::Malformed(err) => Some(err),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for ProtocolError {
    fn from(err: serde_json::Error) -> Self {
        ProtocolError::Malformed(err)
    }
}

pub fn encode(message: &WireMessage) -> Result<String, ProtocolError> {
    Ok(serde_json::to_string(message)?)
}

pub fn decode(frame: &str) -> Result<WireMessage, ProtocolError> {
    let value: serde_json::Value = serde_json::from_str(frame)?;

    match value.get("type") {
        None | Some(serde_json::Value::Null) => return Err(ProtocolError::MissingType),
        Some(serde_json::Value::String(tag)) => {
            if !WireMessage::TAGS.contains(&tag.as_str()) {
                return Err(ProtocolError::UnknownType(tag.clone()));
            }
        }
        Some(other) => return Err(ProtocolError::UnknownType(other.to_string())),
    }

    Ok(serde_json::from_value(value)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alice() -> Identity {
        Identity::new("alice").unwrap()
    }

    #[test]
    fn test_identity() {
        assert!(Identity::new("").is_none());
        assert!(Identity::new("   ").is_none());

        let id = alice();
        assert_eq!(id.as_str(), "alice");
        assert_eq!(id.to_string(), "alice");
        assert!(id == *"alice");
        assert!(id == "alice".to_string());
    }

    #[test]
    fn test_position_frame_shape() {
        let frame = encode(&WireMessage::position(&alice(), Position::new(3, 4))).unwrap();
        let value: serde_json::Value = serde_json::from_str(&frame).unwrap();

        assert_eq!(value["type"], "position");
        assert_eq!(value["username"], "alice");
        assert_eq!(value["row"], 3);
        assert_eq!(value["col"], 4);
    }

    #[test]
    fn test_chat_frame_shape() {
        let frame = encode(&WireMessage::chat(&alice(), "bob", "hello")).unwrap();
        let value: serde_json::Value = serde_json::from_str(&frame).unwrap();

        assert_eq!(value["type"], "chat");
        assert_eq!(value["recipient"], "bob");
        assert_eq!(value["message"], "hello");
        assert_eq!(value["sender"], "alice");
    }

    #[test]
    fn test_decode_proximity_from_server() {
        let msg = decode(r#"{"type":"proximity","username":"bob","target":"alice","action":"leave"}"#)
            .unwrap();
        assert_eq!(msg, WireMessage::proximity("bob", "alice", ProximityAction::Leave));
        assert_eq!(msg.tag(), "proximity");
    }

    #[test]
    fn test_decode_ignores_extra_fields() {
        let msg = decode(
            r#"{"type":"chat","username":"","row":0,"col":0,"sender":"bob","recipient":"alice","message":"hi"}"#,
        )
        .unwrap();
        assert_eq!(
            msg,
            WireMessage::Chat {
                recipient: "alice".to_string(),
                message: "hi".to_string(),
                sender: "bob".to_string(),
            }
        );
    }

    #[test]
    fn test_decode_missing_type() {
        assert!(matches!(
            decode(r#"{"username":"bob","row":1,"col":2}"#),
            Err(ProtocolError::MissingType)
        ));
        assert!(matches!(
            decode(r#"{"type":null}"#),
            Err(ProtocolError::MissingType)
        ));
    }

    #[test]
    fn test_decode_unknown_type() {
        match decode(r#"{"type":"teleport","username":"bob"}"#) {
            Err(ProtocolError::UnknownType(tag)) => assert_eq!(tag, "teleport"),
            other => panic!("unexpected result: {:?}", other),
        }
        assert!(matches!(
            decode(r#"{"type":7}"#),
            Err(ProtocolError::UnknownType(_))
        ));
    }

    #[test]
    fn test_decode_malformed() {
        assert!(matches!(decode("not json"), Err(ProtocolError::Malformed(_))));
        assert!(matches!(decode("[1,2,3]"), Err(ProtocolError::MissingType)));
        assert!(matches!(
            decode(r#"{"type":"position","username":"bob","row":"x","col":2}"#),
            Err(ProtocolError::Malformed(_))
        ));
        assert!(matches!(
            decode(r#"{"type":"proximity","username":"bob","target":"alice","action":"wave"}"#),
            Err(ProtocolError::Malformed(_))
        ));
    }
}
