//! Application state shared across routes

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::config::Config;
use crate::game::{ConnectionId, SimulationHandle};
use crate::util::time::Uptime;

/// Shared application state, passed explicitly to every handler
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub simulation: SimulationHandle,
    pub uptime: Uptime,
    next_connection_id: Arc<AtomicU64>,
}

impl AppState {
    pub fn new(config: Config, simulation: SimulationHandle) -> Self {
        Self {
            config: Arc::new(config),
            simulation,
            uptime: Uptime::start(),
            next_connection_id: Arc::new(AtomicU64::new(1)),
        }
    }

    /// Ids increase in accept order; the registry relies on this for its iteration order
    pub fn next_connection_id(&self) -> ConnectionId {
        ConnectionId(self.next_connection_id.fetch_add(1, Ordering::Relaxed))
    }
}
