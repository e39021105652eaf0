//! Application state shared across routes

use std::sync::Arc;

use crate::config::Config;
use crate::game::{self, WorldHandle};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub world: WorldHandle,
}

impl AppState {
    /// Spawns the world and round driver; must be called inside a runtime
    pub fn new(config: Config) -> Self {
        let config = Arc::new(config);
        let world = game::spawn(&config.game);

        Self { config, world }
    }
}
