//! Time utilities

use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

/// Get current Unix timestamp in milliseconds
pub fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::ZERO)
        .as_millis() as u64
}

/// Process start time for uptime reporting
#[derive(Debug, Clone, Copy)]
pub struct Uptime {
    started: Instant,
}

impl Uptime {
    pub fn start() -> Self {
        Self {
            started: Instant::now(),
        }
    }

    pub fn secs(&self) -> u64 {
        self.started.elapsed().as_secs()
    }
}

impl Default for Uptime {
    fn default() -> Self {
        Self::start()
    }
}
