//! Interest sets and per-player update frames

use super::player::{ConnectionId, Player};
use super::registry::ConnectionRegistry;

/// Position of one player as seen by another
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlayerSnapshot {
    pub id: ConnectionId,
    pub x: f32,
    pub y: f32,
}

impl From<&Player> for PlayerSnapshot {
    fn from(p: &Player) -> Self {
        Self {
            id: p.id,
            x: p.x,
            y: p.y,
        }
    }
}

/// Everything one player receives for one tick
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateFrame {
    pub tick: u64,
    pub own_x: f32,
    pub own_y: f32,
    /// Other alive players within the update radius, in registry order
    pub nearby: Vec<PlayerSnapshot>,
}

/// Builds update frames from the registry
pub struct InterestBuilder {
    radius: f32,
}

impl InterestBuilder {
    pub fn new(radius: f32) -> Self {
        Self { radius }
    }

    /// Frame for `player` at `tick`. Call only after every player has moved this tick.
    pub fn build(&self, tick: u64, registry: &ConnectionRegistry, player: &Player) -> UpdateFrame {
        let nearby = registry
            .nearby(player, self.radius)
            .into_iter()
            .map(PlayerSnapshot::from)
            .collect();

        UpdateFrame {
            tick,
            own_x: player.x,
            own_y: player.y,
            nearby,
        }
    }
}
