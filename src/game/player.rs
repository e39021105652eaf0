//! Per-connection player entity and its outbound message helpers

use std::fmt;
use std::sync::Arc;

use base64::{engine::general_purpose::STANDARD, Engine};
use rand::RngCore;
use tokio::sync::broadcast;
use tracing::debug;

use crate::util::entropy;
use crate::ws::protocol::ServerMsg;

use super::grid::Cell;

/// Random bytes per player id
const ID_BYTES: usize = 10;

/// Opaque player identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PlayerId(Arc<str>);

impl PlayerId {
    /// Draw a fresh random id (base64 of 10 random bytes)
    pub fn generate(rng: &mut dyn RngCore) -> Self {
        let mut buf = [0u8; ID_BYTES];
        entropy::fill_bytes(rng, &mut buf);
        Self(STANDARD.encode(buf).into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for PlayerId {
    fn from(s: &str) -> Self {
        Self(s.into())
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Sending half of a player's outbound queue
pub type Outbound = broadcast::Sender<ServerMsg>;

/// A connected player (authoritative)
#[derive(Debug)]
pub struct Player {
    pub id: PlayerId,
    pub x: i32,
    pub y: i32,
    /// Dead players are spectators until the next round starts
    pub dead: bool,
    outbound: Outbound,
}

impl Player {
    /// New players wait at the origin as spectators
    pub fn new(id: PlayerId, outbound: Outbound) -> Self {
        Self {
            id,
            x: 0,
            y: 0,
            dead: true,
            outbound,
        }
    }

    pub fn is_alive(&self) -> bool {
        !self.dead
    }

    /// Queue a message for this player's connection.
    ///
    /// Never blocks: a slow connection loses its oldest queued messages and
    /// a closed one just drops the message.
    pub fn send(&self, msg: ServerMsg) {
        if let Err(e) = self.outbound.send(msg) {
            debug!(player_id = %self.id, kind = e.0.kind(), "Outbound channel closed, dropping message");
        }
    }

    pub fn send_my_spawn(&self) {
        self.send(ServerMsg::MySpawn {
            id: self.id.clone(),
            x: self.x,
            y: self.y,
        });
    }

    pub fn send_spawn(&self, other: &Player) {
        self.send(ServerMsg::Spawn {
            id: other.id.clone(),
            x: other.x,
            y: other.y,
        });
    }

    pub fn send_move(&self, other: &Player) {
        self.send(ServerMsg::Move {
            id: other.id.clone(),
            x: other.x,
            y: other.y,
        });
    }

    pub fn send_my_death(&self) {
        self.send(ServerMsg::MyDeath);
    }

    pub fn send_death(&self, id: &PlayerId) {
        self.send(ServerMsg::Death { id: id.clone() });
    }

    pub fn send_blown(&self, cell: Cell) {
        self.send(ServerMsg::Blown { cell });
    }

    pub fn send_restore_grid(&self) {
        self.send(ServerMsg::RestoreGrid);
    }
}
