//! The authoritative world: players, grid and round counters

use rand::rngs::OsRng;
use rand::RngCore;
use tracing::{debug, info};

use super::grid::{Cell, Grid, ARENA_EXTENT};
use super::player::{Outbound, PlayerId};
use super::registry::PlayerRegistry;
use super::round::{RoundPhase, RoundState};

/// World errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum WorldError {
    #[error("World task has stopped")]
    Closed,

    #[error("Arena is full")]
    Full,
}

/// Result of a movement request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveOutcome {
    /// No such player
    Unknown,
    /// Player is a spectator; input ignored
    Dead,
    /// Coordinates outside the arena; silently dropped
    OutOfBounds,
    /// Target platform is destroyed; player was sent their last position
    Corrected,
    Moved,
}

/// Point-in-time summary of the world
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorldStatus {
    pub players: usize,
    pub alive: usize,
    pub phase: RoundPhase,
    pub blown: usize,
}

/// All shared game state. Owned by exactly one task.
pub struct World {
    pub(super) registry: PlayerRegistry,
    pub(super) grid: Grid,
    pub(super) round: RoundState,
    pub(super) rng: Box<dyn RngCore + Send>,
    max_players: usize,
}

impl World {
    pub fn new(rng: Box<dyn RngCore + Send>, max_players: usize) -> Self {
        Self {
            registry: PlayerRegistry::new(),
            grid: Grid::new(),
            round: RoundState::default(),
            rng,
            max_players,
        }
    }

    /// World drawing ids and cells from the operating system
    pub fn with_os_rng(max_players: usize) -> Self {
        Self::new(Box::new(OsRng), max_players)
    }

    pub fn status(&self) -> WorldStatus {
        WorldStatus {
            players: self.registry.len(),
            alive: self.round.alive_count,
            phase: self.round.phase(),
            blown: self.round.blown_count,
        }
    }

    /// Register a new spectator and bring it up to date.
    ///
    /// Alive players learn about the newcomer. The newcomer learns about
    /// the alive players, or about everyone while no round is running, and
    /// receives every platform already destroyed this round.
    pub fn join(&mut self, outbound: Outbound) -> Result<PlayerId, WorldError> {
        if self.registry.len() >= self.max_players {
            return Err(WorldError::Full);
        }

        let rng = &mut self.rng;
        let id = self
            .registry
            .register(|| PlayerId::generate(&mut **rng), outbound)
            .id
            .clone();

        if let Some(newcomer) = self.registry.get(&id) {
            let round_active = self.round.active;
            self.registry.for_each_except(&id, |existing| {
                if existing.is_alive() {
                    existing.send_spawn(newcomer);
                }
                if !round_active || existing.is_alive() {
                    newcomer.send_spawn(existing);
                }
            });

            for cell in self.grid.blown_cells() {
                newcomer.send_blown(cell);
            }
        }

        debug!(player_id = %id, players = self.registry.len(), "Player registered");
        Ok(id)
    }

    /// Apply a movement request from a player's connection
    pub fn move_player(&mut self, id: &PlayerId, x: i64, y: i64) -> MoveOutcome {
        let Some(player) = self.registry.get_mut(id) else {
            return MoveOutcome::Unknown;
        };
        if player.dead {
            return MoveOutcome::Dead;
        }

        let extent = i64::from(ARENA_EXTENT);
        if !(0..=extent).contains(&x) || !(0..=extent).contains(&y) {
            return MoveOutcome::OutOfBounds;
        }
        let (x, y) = (x as i32, y as i32);

        if self.grid.is_blown(Cell::containing(x, y)) {
            player.send_my_spawn();
            return MoveOutcome::Corrected;
        }

        player.x = x;
        player.y = y;

        if let Some(player) = self.registry.get(id) {
            self.registry
                .for_each_except(id, |other| other.send_move(player));
        }
        MoveOutcome::Moved
    }

    /// Remove a disconnected player. Returns false if it was not registered.
    pub fn leave(&mut self, id: &PlayerId) -> bool {
        let Some(player) = self.registry.unregister(id) else {
            return false;
        };

        self.registry.for_each(|other| other.send_death(&player.id));

        if player.is_alive() {
            self.round.alive_count = self.round.alive_count.saturating_sub(1);
        }
        debug!(player_id = %player.id, players = self.registry.len(), "Player unregistered");

        self.finish_round_if_empty();
        true
    }

    /// End the round once nobody is left alive
    pub(super) fn finish_round_if_empty(&mut self) {
        if self.round.active && self.round.alive_count == 0 {
            self.round.active = false;
            info!(blown = self.round.blown_count, "Round ended");
        }
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use crate::ws::protocol::ServerMsg;

    #[test]
    fn join_replays_lobby_and_grid() {
        let mut world = seeded_world(1);
        let (first, mut first_rx) = join(&mut world);
        let (second, mut second_rx) = join(&mut world);

        // Nobody is alive in the lobby, so only the newcomer hears about others
        assert!(drain(&mut first_rx).is_empty());
        assert_eq!(
            drain(&mut second_rx),
            vec![ServerMsg::Spawn { id: first, x: 0, y: 0 }]
        );
        assert_ne!(second, PlayerId::from(""));
    }

    #[test]
    fn mid_round_joiner_is_a_spectator() {
        let mut world = seeded_world(2);
        let (alive, mut alive_rx) = join(&mut world);
        world.start_round();
        let cell = Cell::from_index(15).unwrap();
        world.destroy_cell(cell);
        drain(&mut alive_rx);

        let (late, mut late_rx) = join(&mut world);
        assert_eq!(
            drain(&mut alive_rx),
            vec![ServerMsg::Spawn { id: late.clone(), x: 0, y: 0 }]
        );
        assert_eq!(
            drain(&mut late_rx),
            vec![
                ServerMsg::Spawn { id: alive, x: 0, y: 0 },
                ServerMsg::Blown { cell },
            ]
        );
        assert_eq!(world.round.alive_count, 1);
        assert_eq!(world.move_player(&late, 300, 300), MoveOutcome::Dead);
        assert_consistent(&world);
    }

    #[test]
    fn join_refused_when_full() {
        let mut world = World::new(Box::new(OsRng), 1);
        let (tx, _rx) = tokio::sync::broadcast::channel(4);
        assert!(world.join(tx.clone()).is_ok());
        assert_eq!(world.join(tx), Err(WorldError::Full));
        assert_eq!(world.registry.len(), 1);
    }

    #[test]
    fn move_is_broadcast_to_others_only() {
        let mut world = seeded_world(3);
        let (mover, mut mover_rx) = join(&mut world);
        let (_watcher, mut watcher_rx) = join(&mut world);
        world.start_round();
        drain(&mut mover_rx);
        drain(&mut watcher_rx);

        assert_eq!(world.move_player(&mover, 200, 300), MoveOutcome::Moved);
        assert!(drain(&mut mover_rx).is_empty());
        assert_eq!(
            drain(&mut watcher_rx),
            vec![ServerMsg::Move { id: mover, x: 200, y: 300 }]
        );
    }

    #[test]
    fn out_of_bounds_moves_are_dropped_silently() {
        let mut world = seeded_world(4);
        let (mover, mut mover_rx) = join(&mut world);
        let (_watcher, mut watcher_rx) = join(&mut world);
        world.start_round();
        drain(&mut mover_rx);
        drain(&mut watcher_rx);

        for (x, y) in [(-1, 0), (0, 513), (i64::MAX, 5)] {
            assert_eq!(world.move_player(&mover, x, y), MoveOutcome::OutOfBounds);
        }
        assert_eq!(world.move_player(&mover, 512, 512), MoveOutcome::Moved);
        assert!(drain(&mut mover_rx).is_empty());
        assert_eq!(drain(&mut watcher_rx).len(), 1);
    }

    #[test]
    fn move_onto_blown_cell_is_corrected() {
        let mut world = seeded_world(5);
        let (mover, mut mover_rx) = join(&mut world);
        let (_watcher, mut watcher_rx) = join(&mut world);
        world.start_round();
        world.move_player(&mover, 10, 10);
        world.destroy_cell(Cell::containing(300, 300));
        drain(&mut mover_rx);
        drain(&mut watcher_rx);

        assert_eq!(world.move_player(&mover, 300, 300), MoveOutcome::Corrected);
        assert_eq!(
            drain(&mut mover_rx),
            vec![ServerMsg::MySpawn { id: mover.clone(), x: 10, y: 10 }]
        );
        assert!(drain(&mut watcher_rx).is_empty());
        let player = world.registry.get(&mover).unwrap();
        assert_eq!((player.x, player.y), (10, 10));
    }

    #[test]
    fn dead_players_cannot_move() {
        let mut world = seeded_world(6);
        let (spectator, _rx) = join(&mut world);
        let (_other, mut other_rx) = join(&mut world);
        drain(&mut other_rx);

        assert_eq!(world.move_player(&spectator, 100, 100), MoveOutcome::Dead);
        assert!(drain(&mut other_rx).is_empty());
        assert_eq!(world.move_player(&PlayerId::from("ghost"), 1, 1), MoveOutcome::Unknown);
    }

    #[test]
    fn leave_announces_death_and_updates_alive_count() {
        let mut world = seeded_world(7);
        let (leaver, _leaver_rx) = join(&mut world);
        let (_stayer, mut stayer_rx) = join(&mut world);
        world.start_round();
        drain(&mut stayer_rx);

        assert!(world.leave(&leaver));
        assert!(!world.leave(&leaver));
        assert_eq!(drain(&mut stayer_rx), vec![ServerMsg::Death { id: leaver }]);
        assert_eq!(world.round.alive_count, 1);
        assert!(world.round.active);
        assert_consistent(&world);
    }

    #[test]
    fn status_reflects_round() {
        let mut world = seeded_world(8);
        join(&mut world);
        assert_eq!(world.status().phase, RoundPhase::Idle);
        world.start_round();
        let status = world.status();
        assert_eq!(status.phase, RoundPhase::Active);
        assert_eq!((status.players, status.alive, status.blown), (1, 1, 0));
    }
}
