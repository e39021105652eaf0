//! Rate limiting utilities

use governor::{
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter,
};
use std::num::NonZeroU32;

/// Rate limiter type alias
pub type Limiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Default cap on inbound messages per connection per second
pub const MOVE_RATE_LIMIT: u32 = 60;

/// Result of offering one inbound message to the limiter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Allowed,
    /// Dropped; `first` is set only for the first drop of a burst
    Throttled { first: bool },
}

/// Per-connection inbound message limiter
pub struct PlayerRateLimiter {
    input_limiter: Limiter,
    throttling: bool,
}

impl PlayerRateLimiter {
    pub fn new(messages_per_second: u32) -> Self {
        let quota =
            Quota::per_second(NonZeroU32::new(messages_per_second).unwrap_or(NonZeroU32::MIN));
        Self {
            input_limiter: RateLimiter::direct(quota),
            throttling: false,
        }
    }

    /// Check if an input message is allowed (returns true if allowed)
    pub fn check_input(&self) -> bool {
        self.input_limiter.check().is_ok()
    }

    /// Like `check_input`, but tracks bursts so callers can report each
    /// burst once instead of every dropped message
    pub fn admit(&mut self) -> Admission {
        if self.check_input() {
            self.throttling = false;
            Admission::Allowed
        } else {
            let first = !self.throttling;
            self.throttling = true;
            Admission::Throttled { first }
        }
    }
}
