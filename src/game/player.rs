//! Player entity and movement intent

use serde::{Deserialize, Serialize};

/// Stable identifier assigned to a connection when the transport accepts it.
/// A spawned player carries the id of the connection that owns it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionId(pub u64);

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Movement keys a client can press or release
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MoveKey {
    Up,
    Down,
    Left,
    Right,
}

/// Last direction seen on the horizontal axis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HorizontalDir {
    #[default]
    None,
    Left,
    Right,
}

/// Last direction seen on the vertical axis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VerticalDir {
    #[default]
    None,
    Up,
    Down,
}

/// Authoritative player state, owned by its connection's registry entry
#[derive(Debug, Clone)]
pub struct Player {
    pub id: ConnectionId,
    pub name: String,

    // Position, always within [0, map_size] on both axes
    pub x: f32,
    pub y: f32,
    /// Facing in radians, normalized to [0, 2π)
    pub angle: f32,
    pub alive: bool,

    // Movement intent
    pub down_x: bool,
    pub down_y: bool,
    pub dir_x: HorizontalDir,
    pub dir_y: VerticalDir,
}

impl Player {
    pub fn new(id: ConnectionId, name: String, x: f32, y: f32) -> Self {
        Self {
            id,
            name,
            x,
            y,
            angle: 0.0,
            alive: false,
            down_x: false,
            down_y: false,
            dir_x: HorizontalDir::None,
            dir_y: VerticalDir::None,
        }
    }

    /// Apply a key press or release.
    ///
    /// The key always sets the direction of its axis; `pressed` only toggles whether
    /// the axis moves. Releasing a key leaves its direction in place.
    pub fn apply_key(&mut self, key: MoveKey, pressed: bool) {
        match key {
            MoveKey::Left => {
                self.dir_x = HorizontalDir::Left;
                self.down_x = pressed;
            }
            MoveKey::Right => {
                self.dir_x = HorizontalDir::Right;
                self.down_x = pressed;
            }
            MoveKey::Up => {
                self.dir_y = VerticalDir::Up;
                self.down_y = pressed;
            }
            MoveKey::Down => {
                self.dir_y = VerticalDir::Down;
                self.down_y = pressed;
            }
        }
    }

    pub fn set_angle(&mut self, angle: f32) {
        self.angle = angle.rem_euclid(std::f32::consts::TAU);
    }

    pub fn distance_sq(&self, other: &Player) -> f32 {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        dx * dx + dy * dy
    }
}
