//! The world task and its command queue

use tokio::sync::{broadcast, mpsc, oneshot};
use tracing::{debug, info};

use crate::config::GameSettings;
use crate::ws::protocol::ServerMsg;

use super::player::{Outbound, PlayerId};
use super::round::TickOutcome;
use super::world::{MoveOutcome, World, WorldError, WorldStatus};

/// Commands queued ahead of the world task
const COMMAND_QUEUE_CAPACITY: usize = 1024;

/// Everything that may change the world
#[derive(Debug)]
pub enum Command {
    Join {
        outbound: Outbound,
        reply: oneshot::Sender<Result<PlayerId, WorldError>>,
    },
    Move {
        id: PlayerId,
        x: i64,
        y: i64,
    },
    Leave {
        id: PlayerId,
    },
    /// One round-driver tick
    Tick,
    Status {
        reply: oneshot::Sender<WorldStatus>,
    },
}

/// A registered connection: its id and the receiving half of its queue
pub struct Session {
    pub id: PlayerId,
    pub outbound: broadcast::Receiver<ServerMsg>,
}

/// Cloneable handle for sending commands to the world task
#[derive(Clone)]
pub struct WorldHandle {
    commands: mpsc::Sender<Command>,
    outbound_capacity: usize,
}

impl WorldHandle {
    /// Register a new player and return its session
    pub async fn join(&self) -> Result<Session, WorldError> {
        let (outbound, receiver) = broadcast::channel(self.outbound_capacity);
        let (reply, response) = oneshot::channel();
        self.send(Command::Join { outbound, reply }).await?;
        let id = response.await.map_err(|_| WorldError::Closed)??;
        Ok(Session {
            id,
            outbound: receiver,
        })
    }

    pub async fn move_to(&self, id: &PlayerId, x: i64, y: i64) -> Result<(), WorldError> {
        self.send(Command::Move {
            id: id.clone(),
            x,
            y,
        })
        .await
    }

    pub async fn leave(&self, id: &PlayerId) -> Result<(), WorldError> {
        self.send(Command::Leave { id: id.clone() }).await
    }

    pub async fn tick(&self) -> Result<(), WorldError> {
        self.send(Command::Tick).await
    }

    pub async fn status(&self) -> Result<WorldStatus, WorldError> {
        let (reply, response) = oneshot::channel();
        self.send(Command::Status { reply }).await?;
        response.await.map_err(|_| WorldError::Closed)
    }

    async fn send(&self, command: Command) -> Result<(), WorldError> {
        self.commands
            .send(command)
            .await
            .map_err(|_| WorldError::Closed)
    }
}

/// Owns the world and applies commands one at a time
pub struct WorldTask {
    world: World,
    commands: mpsc::Receiver<Command>,
}

impl WorldTask {
    pub fn new(world: World, settings: &GameSettings) -> (Self, WorldHandle) {
        let (tx, rx) = mpsc::channel(COMMAND_QUEUE_CAPACITY);
        let handle = WorldHandle {
            commands: tx,
            outbound_capacity: settings.outbound_capacity,
        };
        (
            Self {
                world,
                commands: rx,
            },
            handle,
        )
    }

    /// Run until every handle is dropped
    pub async fn run(mut self) {
        info!("World task started");
        while let Some(command) = self.commands.recv().await {
            self.apply(command);
        }
        info!("World task stopped");
    }

    fn apply(&mut self, command: Command) {
        match command {
            Command::Join { outbound, reply } => {
                let _ = reply.send(self.world.join(outbound));
            }
            Command::Move { id, x, y } => match self.world.move_player(&id, x, y) {
                MoveOutcome::Corrected => {
                    debug!(player_id = %id, x, y, "Rejected move onto destroyed platform");
                }
                MoveOutcome::OutOfBounds => {
                    debug!(player_id = %id, x, y, "Dropped out-of-bounds move");
                }
                _ => {}
            },
            Command::Leave { id } => {
                self.world.leave(&id);
            }
            Command::Tick => {
                if let TickOutcome::Destroyed { cell, eliminated } = self.world.tick() {
                    for id in &eliminated {
                        info!(player_id = %id, col = cell.col(), row = cell.row(), "Player eliminated");
                    }
                }
            }
            Command::Status { reply } => {
                let _ = reply.send(self.world.status());
            }
        }
    }
}
