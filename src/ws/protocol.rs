//! WebSocket protocol message definitions
//! These are the wire types for client-server communication

use serde::{Deserialize, Serialize};

use crate::game::grid::Cell;
use crate::game::PlayerId;

/// Generic wire envelope shared by both directions.
///
/// Every outbound message carries all four fields; fields a message kind
/// does not use are sent as `""` / `0`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    /// Message kind
    #[serde(rename = "t", default)]
    pub kind: String,
    /// Player id the message refers to
    #[serde(rename = "i", default)]
    pub id: String,
    #[serde(default)]
    pub x: i64,
    #[serde(default)]
    pub y: i64,
}

/// Messages sent from server to client
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(into = "Envelope")]
pub enum ServerMsg {
    /// The receiving player's own spawn (or corrected) position
    MySpawn { id: PlayerId, x: i32, y: i32 },

    /// Another player's presence and position
    Spawn { id: PlayerId, x: i32, y: i32 },

    /// Another player's new position
    Move { id: PlayerId, x: i32, y: i32 },

    /// The receiving player was eliminated
    MyDeath,

    /// Another player was eliminated or left
    Death { id: PlayerId },

    /// A platform was destroyed
    Blown { cell: Cell },

    /// All platforms were restored for a new round
    RestoreGrid,
}

impl ServerMsg {
    /// Wire tag for this message kind
    pub fn kind(&self) -> &'static str {
        match self {
            ServerMsg::MySpawn { .. } => "ms",
            ServerMsg::Spawn { .. } => "s",
            ServerMsg::Move { .. } => "m",
            ServerMsg::MyDeath => "md",
            ServerMsg::Death { .. } => "d",
            ServerMsg::Blown { .. } => "b",
            ServerMsg::RestoreGrid => "rg",
        }
    }

    /// Serialize to a JSON text frame
    pub fn encode(&self) -> Result<String, ProtocolError> {
        serde_json::to_string(self).map_err(ProtocolError::Encode)
    }
}

impl From<ServerMsg> for Envelope {
    fn from(msg: ServerMsg) -> Self {
        let kind = msg.kind().to_string();
        match msg {
            ServerMsg::MySpawn { id, x, y }
            | ServerMsg::Spawn { id, x, y }
            | ServerMsg::Move { id, x, y } => Envelope {
                kind,
                id: id.to_string(),
                x: x.into(),
                y: y.into(),
            },
            ServerMsg::Death { id } => Envelope {
                kind,
                id: id.to_string(),
                ..Default::default()
            },
            ServerMsg::Blown { cell } => Envelope {
                kind,
                x: cell.col().into(),
                y: cell.row().into(),
                ..Default::default()
            },
            ServerMsg::MyDeath | ServerMsg::RestoreGrid => Envelope {
                kind,
                ..Default::default()
            },
        }
    }
}

/// A movement request from a client.
///
/// Only the coordinates of the inbound envelope are meaningful; the kind
/// and id fields are ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoveRequest {
    pub x: i64,
    pub y: i64,
}

impl MoveRequest {
    /// Parse an inbound text frame
    pub fn parse(text: &str) -> Result<Self, ProtocolError> {
        let envelope: Envelope = serde_json::from_str(text).map_err(ProtocolError::Malformed)?;
        Ok(Self {
            x: envelope.x,
            y: envelope.y,
        })
    }
}

/// Protocol errors
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("Malformed client message: {0}")]
    Malformed(#[source] serde_json::Error),

    #[error("Failed to encode server message: {0}")]
    Encode(#[source] serde_json::Error),
}
