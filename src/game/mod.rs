//! Game engine: world state, round lifecycle and the tasks that drive them

pub mod driver;
pub mod grid;
pub mod player;
pub mod registry;
pub mod round;
pub mod task;
pub mod world;

pub use driver::RoundDriver;
pub use player::{Player, PlayerId};
pub use registry::PlayerRegistry;
pub use round::{RoundPhase, RoundState, TickOutcome};
pub use task::{Session, WorldHandle, WorldTask};
pub use world::{MoveOutcome, World, WorldError, WorldStatus};

use crate::config::GameSettings;

/// Spawn the world task and its round driver, returning the handle
/// connection sessions talk to
pub fn spawn(settings: &GameSettings) -> WorldHandle {
    let (task, handle) = WorldTask::new(World::with_os_rng(settings.max_players), settings);
    tokio::spawn(task.run());
    tokio::spawn(RoundDriver::new(handle.clone(), settings.tick_interval).run());
    handle
}
