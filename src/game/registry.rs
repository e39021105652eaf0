//! Registry of connected players

use std::collections::HashMap;

use super::player::{Outbound, Player, PlayerId};

/// Mapping of player id to player; the source of truth for who is connected
#[derive(Debug, Default)]
pub struct PlayerRegistry {
    players: HashMap<PlayerId, Player>,
}

impl PlayerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new player under the first id from `next_id` that is not
    /// already taken.
    pub fn register(
        &mut self,
        mut next_id: impl FnMut() -> PlayerId,
        outbound: Outbound,
    ) -> &Player {
        let id = loop {
            let candidate = next_id();
            if !self.players.contains_key(&candidate) {
                break candidate;
            }
        };
        self.players
            .entry(id.clone())
            .or_insert_with(|| Player::new(id, outbound))
    }

    /// Remove a player, returning it if it was registered
    pub fn unregister(&mut self, id: &PlayerId) -> Option<Player> {
        self.players.remove(id)
    }

    pub fn get(&self, id: &PlayerId) -> Option<&Player> {
        self.players.get(id)
    }

    pub fn get_mut(&mut self, id: &PlayerId) -> Option<&mut Player> {
        self.players.get_mut(id)
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Player> {
        self.players.values()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Player> {
        self.players.values_mut()
    }

    pub fn for_each(&self, f: impl FnMut(&Player)) {
        self.players.values().for_each(f);
    }

    /// Visit every player other than `id`
    pub fn for_each_except(&self, id: &PlayerId, mut f: impl FnMut(&Player)) {
        for player in self.players.values().filter(|p| &p.id != id) {
            f(player);
        }
    }

    /// Number of players currently alive
    pub fn alive_count(&self) -> usize {
        self.players.values().filter(|p| p.is_alive()).count()
    }
}
