//! WebSocket protocol message definitions
//! These are the wire types for client-server communication

use serde::{Deserialize, Serialize};

use crate::game::player::{ConnectionId, MoveKey};

/// Messages sent from client to server as JSON text frames
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMsg {
    /// Spawn, or respawn, a controllable player
    Spawn {
        /// Display name, replaced by the configured default when absent
        #[serde(default)]
        name: Option<String>,
    },

    /// Update facing direction
    Angle {
        /// Radians
        angle: f32,
    },

    /// Movement key pressed or released
    Move { key: MoveKey, pressed: bool },
}

/// Named events sent from server to client as JSON text frames.
/// Position updates use the binary frame in `ws::frame` instead.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMsg {
    /// Sent once the connection is registered
    Welcome {
        id: ConnectionId,
        map_size: f32,
        tick_interval_ms: u64,
    },

    /// Sent after every successful spawn or respawn
    Spawned {
        id: ConnectionId,
        name: String,
        x: f32,
        y: f32,
    },
}
