//! Rate limiting utilities

use governor::{
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter,
};
use std::num::NonZeroU32;
use std::sync::Arc;

use crate::game::Command;

/// Rate limiter type alias
pub type Limiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Create a rate limiter with the specified requests per second
pub fn create_limiter(requests_per_second: u32) -> Arc<Limiter> {
    let quota = Quota::per_second(NonZeroU32::new(requests_per_second).unwrap_or(NonZeroU32::MIN));
    Arc::new(RateLimiter::direct(quota))
}

/// Per-connection limiter for facing updates
#[derive(Clone)]
pub struct PlayerRateLimiter {
    angle_limiter: Arc<Limiter>,
}

impl PlayerRateLimiter {
    pub fn new(angles_per_second: u32) -> Self {
        Self {
            angle_limiter: create_limiter(angles_per_second),
        }
    }

    /// Whether `command` may be forwarded to the simulation.
    /// Only commands that report `is_rate_limited` draw from the quota.
    pub fn allows(&self, command: &Command) -> bool {
        !command.is_rate_limited() || self.angle_limiter.check().is_ok()
    }
}
