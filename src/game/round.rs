//! Round lifecycle: start, platform destruction, elimination

use serde::Serialize;
use tracing::{debug, info};

use crate::util::entropy;

use super::grid::{Cell, CELL_COUNT};
use super::player::PlayerId;
use super::world::World;

/// Round phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RoundPhase {
    /// No round running
    Idle,
    /// Platforms are being destroyed
    Active,
}

/// Round counters
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoundState {
    pub active: bool,
    /// Platforms destroyed this round
    pub blown_count: usize,
    /// Players with `dead == false`
    pub alive_count: usize,
}

impl RoundState {
    pub fn phase(&self) -> RoundPhase {
        if self.active {
            RoundPhase::Active
        } else {
            RoundPhase::Idle
        }
    }

    /// Whether the next tick may destroy a platform
    pub fn can_destroy(&self) -> bool {
        self.blown_count < CELL_COUNT && self.alive_count > 0
    }
}

/// What a round-driver tick did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// Idle with nobody connected
    Waiting,
    /// A new round started
    Started,
    /// One platform destroyed, with the players it eliminated
    Destroyed {
        cell: Cell,
        eliminated: Vec<PlayerId>,
    },
    /// Round active but nothing left to destroy
    Stalled,
}

impl World {
    /// Advance the round by one driver tick
    pub fn tick(&mut self) -> TickOutcome {
        if !self.round.active {
            if self.registry.is_empty() {
                return TickOutcome::Waiting;
            }
            self.start_round();
            return TickOutcome::Started;
        }

        if !self.round.can_destroy() {
            return TickOutcome::Stalled;
        }
        let Some(cell) = self.pick_intact_cell() else {
            return TickOutcome::Stalled;
        };
        let eliminated = self.destroy_cell(cell);
        TickOutcome::Destroyed { cell, eliminated }
    }

    /// Restore the grid, revive everyone and announce all positions
    pub fn start_round(&mut self) {
        self.grid.reset();
        self.round.blown_count = 0;

        for player in self.registry.iter_mut() {
            player.dead = false;
        }
        for player in self.registry.iter() {
            player.send_my_spawn();
            player.send_restore_grid();
            self.registry
                .for_each_except(&player.id, |other| player.send_spawn(other));
        }

        self.round.alive_count = self.registry.len();
        self.round.active = true;
        info!(players = self.round.alive_count, "Round started");
    }

    /// Destroy `cell` and eliminate every alive player standing on it.
    ///
    /// Everyone hears about the platform before anyone hears about the
    /// deaths it caused. Destroying an already destroyed cell is a no-op.
    pub fn destroy_cell(&mut self, cell: Cell) -> Vec<PlayerId> {
        if !self.grid.blow(cell) {
            return Vec::new();
        }

        self.registry.for_each(|player| player.send_blown(cell));

        let mut eliminated = Vec::new();
        for player in self.registry.iter_mut() {
            if player.is_alive() && cell.contains(player.x, player.y) {
                player.dead = true;
                player.send_my_death();
                eliminated.push(player.id.clone());
            }
        }
        self.round.alive_count = self.round.alive_count.saturating_sub(eliminated.len());

        for id in &eliminated {
            self.registry.for_each_except(id, |player| player.send_death(id));
        }

        self.round.blown_count += 1;
        debug!(
            col = cell.col(),
            row = cell.row(),
            eliminated = eliminated.len(),
            alive = self.round.alive_count,
            "Platform destroyed"
        );

        self.finish_round_if_empty();
        eliminated
    }

    /// Uniformly pick a platform that is still standing, by redrawing
    /// until an intact one comes up
    fn pick_intact_cell(&mut self) -> Option<Cell> {
        if self.grid.is_fully_blown() {
            return None;
        }
        loop {
            let index = usize::from(entropy::random_byte(&mut *self.rng)) % CELL_COUNT;
            let cell = Cell::from_index(index)?;
            if !self.grid.is_blown(cell) {
                return Some(cell);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::world::test_support::*;
    use crate::game::world::MoveOutcome;
    use crate::ws::protocol::ServerMsg;

    #[test]
    fn idle_world_waits_for_players() {
        let mut world = seeded_world(1);
        assert_eq!(world.tick(), TickOutcome::Waiting);
        assert_eq!(world.round.phase(), RoundPhase::Idle);
    }

    #[test]
    fn first_player_starts_a_round_within_one_tick() {
        let mut world = seeded_world(2);
        let (id, mut rx) = join(&mut world);

        assert_eq!(world.tick(), TickOutcome::Started);
        assert_eq!(world.round.phase(), RoundPhase::Active);
        assert_eq!(
            drain(&mut rx),
            vec![
                ServerMsg::MySpawn { id, x: 0, y: 0 },
                ServerMsg::RestoreGrid,
            ]
        );
        assert_consistent(&world);
    }

    #[test]
    fn round_start_introduces_everyone() {
        let mut world = seeded_world(3);
        let (a, mut a_rx) = join(&mut world);
        let (b, mut b_rx) = join(&mut world);
        drain(&mut a_rx);
        drain(&mut b_rx);

        world.start_round();
        assert_eq!(
            drain(&mut a_rx),
            vec![
                ServerMsg::MySpawn { id: a.clone(), x: 0, y: 0 },
                ServerMsg::RestoreGrid,
                ServerMsg::Spawn { id: b.clone(), x: 0, y: 0 },
            ]
        );
        assert!(drain(&mut b_rx).contains(&ServerMsg::Spawn { id: a, x: 0, y: 0 }));
        assert_eq!(world.round.alive_count, 2);
        assert_consistent(&world);
    }

    #[test]
    fn destroying_occupied_cell_eliminates_its_players() {
        let mut world = seeded_world(4);
        let (p1, mut p1_rx) = join(&mut world);
        let (p2, mut p2_rx) = join(&mut world);
        world.start_round();
        assert_eq!(world.move_player(&p1, 200, 200), MoveOutcome::Moved);
        assert_eq!(world.move_player(&p2, 450, 20), MoveOutcome::Moved);
        drain(&mut p1_rx);
        drain(&mut p2_rx);

        let cell = Cell::containing(200, 200);
        assert_eq!((cell.col(), cell.row()), (1, 1));
        assert_eq!(world.destroy_cell(cell), vec![p1.clone()]);

        assert_eq!(
            drain(&mut p1_rx),
            vec![ServerMsg::Blown { cell }, ServerMsg::MyDeath]
        );
        assert_eq!(
            drain(&mut p2_rx),
            vec![ServerMsg::Blown { cell }, ServerMsg::Death { id: p1 }]
        );
        assert_eq!(world.round.alive_count, 1);
        assert!(world.round.active);
        assert_consistent(&world);
    }

    #[test]
    fn dead_players_hear_about_platforms_and_deaths() {
        let mut world = seeded_world(5);
        let (alive, _alive_rx) = join(&mut world);
        world.start_round();
        let (_spectator, mut spectator_rx) = join(&mut world);
        drain(&mut spectator_rx);

        let cell = Cell::containing(0, 0);
        world.destroy_cell(cell);
        assert_eq!(
            drain(&mut spectator_rx),
            vec![ServerMsg::Blown { cell }, ServerMsg::Death { id: alive }]
        );
    }

    #[test]
    fn last_elimination_ends_the_round() {
        let mut world = seeded_world(6);
        let (_p, _rx) = join(&mut world);
        world.start_round();

        world.destroy_cell(Cell::containing(0, 0));
        assert_eq!(world.round.phase(), RoundPhase::Idle);
        assert_eq!(world.round.alive_count, 0);
        assert_consistent(&world);
    }

    #[test]
    fn destroyed_cells_stay_destroyed_until_restart() {
        let mut world = seeded_world(7);
        let (p, _rx) = join(&mut world);
        world.start_round();
        world.move_player(&p, 500, 500);

        let mut destroyed = Vec::new();
        for _ in 0..5 {
            match world.tick() {
                TickOutcome::Destroyed { cell, .. } => destroyed.push(cell),
                other => panic!("unexpected tick outcome {other:?}"),
            }
            if !world.round.active {
                break;
            }
            assert!(destroyed.iter().all(|cell| world.grid.is_blown(*cell)));
            assert_consistent(&world);
        }

        let unique: std::collections::HashSet<_> = destroyed.iter().collect();
        assert_eq!(unique.len(), destroyed.len());
    }

    #[test]
    fn last_intact_cell_is_found_and_destroyed() {
        let mut world = seeded_world(8);
        let (p, _rx) = join(&mut world);
        world.start_round();
        assert_eq!(world.move_player(&p, 200, 200), MoveOutcome::Moved);
        let safe = Cell::containing(200, 200);

        for cell in Cell::all().filter(|cell| *cell != safe) {
            assert!(world.destroy_cell(cell).is_empty());
            assert_consistent(&world);
        }
        assert_eq!(world.round.blown_count, CELL_COUNT - 1);
        assert_eq!(world.round.phase(), RoundPhase::Active);

        assert_eq!(
            world.tick(),
            TickOutcome::Destroyed {
                cell: safe,
                eliminated: vec![p],
            }
        );
        assert!(world.grid.is_fully_blown());
        assert_eq!(world.round.phase(), RoundPhase::Idle);
        assert_consistent(&world);
    }

    #[test]
    fn no_destruction_step_past_sixteen() {
        // Every position lies on some cell, so a full grid with someone
        // alive only arises from these counters being set directly
        let full = RoundState {
            active: true,
            blown_count: CELL_COUNT,
            alive_count: 1,
        };
        assert!(!full.can_destroy());
        assert!(RoundState { blown_count: CELL_COUNT - 1, ..full.clone() }.can_destroy());
        assert!(!RoundState { alive_count: 0, blown_count: 0, ..full }.can_destroy());
    }

    #[test]
    fn restart_after_empty_round_restores_grid() {
        let mut world = seeded_world(9);
        let (first, _rx) = join(&mut world);
        world.start_round();
        world.destroy_cell(Cell::containing(300, 300));
        world.leave(&first);
        assert_eq!(world.round.phase(), RoundPhase::Idle);
        assert_eq!(world.tick(), TickOutcome::Waiting);

        let (second, mut second_rx) = join(&mut world);
        let replay = drain(&mut second_rx);
        assert_eq!(replay.len(), 1);

        assert_eq!(world.tick(), TickOutcome::Started);
        assert_eq!(world.grid.blown_cells().count(), 0);
        assert_eq!(world.round.blown_count, 0);
        assert_eq!(
            drain(&mut second_rx),
            vec![
                ServerMsg::MySpawn { id: second, x: 0, y: 0 },
                ServerMsg::RestoreGrid,
            ]
        );
        assert_consistent(&world);
    }
}
