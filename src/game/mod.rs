//! Game simulation modules

pub mod interest;
pub mod movement;
pub mod player;
pub mod registry;
pub mod router;
pub mod simulation;

pub use player::{ConnectionId, MoveKey, Player};
pub use registry::{ConnectionRegistry, SpawnRequest};
pub use router::{Command, ConnectionState, Inbound, PacketRouter, ProtocolError};
pub use simulation::{
    ClockState, RunningSimulation, Simulation, SimulationHandle, World, WorldParams, WorldStats,
};
