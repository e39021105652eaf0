//! Background task that paces the round

use std::time::Duration;

use tokio::time::{interval, MissedTickBehavior};
use tracing::info;

use super::task::WorldHandle;

/// Emits one tick into the world's command queue per interval
pub struct RoundDriver {
    world: WorldHandle,
    period: Duration,
}

impl RoundDriver {
    pub fn new(world: WorldHandle, period: Duration) -> Self {
        Self { world, period }
    }

    pub async fn run(self) {
        info!(period_ms = self.period.as_millis() as u64, "Round driver started");

        let mut ticker = interval(self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            ticker.tick().await;
            if self.world.tick().await.is_err() {
                info!("World task gone, round driver stopping");
                break;
            }
        }
    }
}
