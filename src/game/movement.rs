//! Movement resolution and per-region speed policy

use super::player::{HorizontalDir, Player, VerticalDir};

/// How many units a player moves per tick at a given position
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SpeedPolicy {
    /// Same speed everywhere
    Uniform(f32),
    /// `biome` speed while `y < boundary_y`, `base` speed elsewhere
    Biome {
        base: f32,
        biome: f32,
        boundary_y: f32,
    },
}

impl SpeedPolicy {
    /// Speed for a player standing at `(x, y)` at the start of the tick.
    /// Both axes move at the returned speed.
    pub fn speed_for(&self, _x: f32, y: f32) -> f32 {
        match *self {
            SpeedPolicy::Uniform(speed) => speed,
            SpeedPolicy::Biome {
                base,
                biome,
                boundary_y,
            } => {
                if y < boundary_y {
                    biome
                } else {
                    base
                }
            }
        }
    }
}

/// Movement system for per-tick position updates
pub struct MovementSystem;

impl MovementSystem {
    /// A coordinate is valid iff `0 <= c <= map_size`
    pub fn in_bounds(c: f32, map_size: f32) -> bool {
        (0.0..=map_size).contains(&c)
    }

    /// Candidate horizontal position, or None when the axis does not move
    pub fn candidate_x(player: &Player, speed: f32) -> Option<f32> {
        if !player.down_x {
            return None;
        }
        match player.dir_x {
            HorizontalDir::Left => Some(player.x - speed),
            HorizontalDir::Right => Some(player.x + speed),
            HorizontalDir::None => None,
        }
    }

    /// Candidate vertical position, or None when the axis does not move
    pub fn candidate_y(player: &Player, speed: f32) -> Option<f32> {
        if !player.down_y {
            return None;
        }
        match player.dir_y {
            VerticalDir::Up => Some(player.y - speed),
            VerticalDir::Down => Some(player.y + speed),
            VerticalDir::None => None,
        }
    }

    /// Advance one player by one tick. Each axis is resolved independently; a candidate
    /// outside the map is dropped and that axis keeps its current value.
    pub fn step(player: &mut Player, policy: &SpeedPolicy, map_size: f32) {
        if !player.alive {
            return;
        }

        let speed = policy.speed_for(player.x, player.y);

        if let Some(x) = Self::candidate_x(player, speed) {
            if Self::in_bounds(x, map_size) {
                player.x = x;
            }
        }
        if let Some(y) = Self::candidate_y(player, speed) {
            if Self::in_bounds(y, map_size) {
                player.y = y;
            }
        }
    }
}
