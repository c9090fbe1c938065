//! Packet router: decodes client frames into commands and applies the per-connection
//! state machine (`Connected -> Spawned -> Disconnected`).

use tracing::{debug, info};

use super::player::{ConnectionId, MoveKey};
use super::registry::{ConnectionRegistry, SpawnRequest};
use crate::ws::connection::ConnectionHandle;
use crate::ws::protocol::ClientMsg;

/// Lifecycle of one connection as seen by the registry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Registered, no player yet
    Connected,
    /// Has an alive player
    Spawned,
    /// Gone (or never registered)
    Disconnected,
}

/// Typed client command, decoded once at the transport boundary
#[derive(Debug, Clone)]
pub enum Command {
    Spawn(SpawnRequest),
    SetAngle(f32),
    MoveKey { key: MoveKey, pressed: bool },
}

impl Command {
    /// Facing updates are the only high-frequency command and the only one that may be
    /// dropped by the per-connection limiter. Key events and spawns always get through.
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Command::SetAngle(_))
    }

    fn name(&self) -> &'static str {
        match self {
            Command::Spawn(_) => "spawn",
            Command::SetAngle(_) => "angle",
            Command::MoveKey { .. } => "move",
        }
    }
}

/// Everything the transport delivers to the simulation inbox
#[derive(Debug)]
pub enum Inbound {
    Open(ConnectionHandle),
    Command { id: ConnectionId, command: Command },
    Close(ConnectionId),
}

/// Result of a successfully applied inbound event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Opened(ConnectionId),
    Spawned(ConnectionId),
    Closed(ConnectionId),
    /// Applied without a state change (input update, duplicate open, repeated close)
    Unchanged,
}

/// Per-command errors. The command is dropped; the connection stays open.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("malformed message: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("invalid {field}: {reason}")]
    InvalidField {
        field: &'static str,
        reason: &'static str,
    },

    #[error("{command} from connection {id} before spawn")]
    NotSpawned { id: ConnectionId, command: &'static str },

    #[error("connection {0} is not registered")]
    UnknownConnection(ConnectionId),

    #[error("input rate limit exceeded")]
    RateLimited,
}

pub struct PacketRouter;

impl PacketRouter {
    /// Decode one JSON text frame
    pub fn decode(text: &str) -> Result<Command, ProtocolError> {
        let msg: ClientMsg = serde_json::from_str(text)?;
        Command::try_from(msg)
    }

    /// Apply one inbound event to the registry
    pub fn dispatch(
        registry: &mut ConnectionRegistry,
        inbound: Inbound,
    ) -> Result<Transition, ProtocolError> {
        match inbound {
            Inbound::Open(handle) => {
                let id = handle.id();
                if registry.add(handle) {
                    info!(conn_id = %id, "Connection registered");
                    Ok(Transition::Opened(id))
                } else {
                    debug!(conn_id = %id, "Connection already registered");
                    Ok(Transition::Unchanged)
                }
            }
            Inbound::Command { id, command } => Self::apply_command(registry, id, command),
            Inbound::Close(id) => {
                if registry.remove(id) {
                    info!(conn_id = %id, "Connection removed");
                    Ok(Transition::Closed(id))
                } else {
                    Ok(Transition::Unchanged)
                }
            }
        }
    }

    fn apply_command(
        registry: &mut ConnectionRegistry,
        id: ConnectionId,
        command: Command,
    ) -> Result<Transition, ProtocolError> {
        match registry.state(id) {
            ConnectionState::Disconnected => return Err(ProtocolError::UnknownConnection(id)),
            ConnectionState::Connected if !matches!(command, Command::Spawn(_)) => {
                return Err(ProtocolError::NotSpawned {
                    id,
                    command: command.name(),
                });
            }
            _ => {}
        }

        match command {
            Command::Spawn(request) => match registry.spawn(id, request) {
                Some(player) => {
                    info!(
                        conn_id = %id,
                        name = %player.name,
                        x = player.x,
                        y = player.y,
                        "Player spawned"
                    );
                    Ok(Transition::Spawned(id))
                }
                None => Err(ProtocolError::UnknownConnection(id)),
            },
            Command::SetAngle(angle) => {
                if let Some(player) = registry.player_mut(id) {
                    player.set_angle(angle);
                }
                Ok(Transition::Unchanged)
            }
            Command::MoveKey { key, pressed } => {
                if let Some(player) = registry.player_mut(id) {
                    player.apply_key(key, pressed);
                }
                Ok(Transition::Unchanged)
            }
        }
    }
}

impl TryFrom<ClientMsg> for Command {
    type Error = ProtocolError;

    fn try_from(msg: ClientMsg) -> Result<Self, Self::Error> {
        match msg {
            ClientMsg::Spawn { name } => Ok(Command::Spawn(SpawnRequest {
                name,
                position: None,
            })),
            ClientMsg::Angle { angle } => {
                if !angle.is_finite() {
                    return Err(ProtocolError::InvalidField {
                        field: "angle",
                        reason: "not a finite number",
                    });
                }
                Ok(Command::SetAngle(angle))
            }
            ClientMsg::Move { key, pressed } => Ok(Command::MoveKey { key, pressed }),
        }
    }
}
