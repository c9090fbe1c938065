#![allow(dead_code)]

use std::time::Duration;

use world_server::game::movement::SpeedPolicy;
use world_server::game::{ConnectionId, Inbound, PacketRouter, SimulationHandle, WorldParams};
use world_server::ws::connection::{ConnectionHandle, ConnectionOutbox};

pub const TICK: Duration = Duration::from_millis(100);

/// Small map from the reference scenario: size 100, radius 10, speed 5
pub fn scenario_params() -> WorldParams {
    WorldParams {
        map_size: 100.0,
        update_radius: 10.0,
        speed: SpeedPolicy::Uniform(5.0),
        unknown_name: "unknown".to_string(),
        tick_interval: TICK,
        spawn_seed: 9,
    }
}

/// Register a connection and send it JSON commands through the router
pub async fn connect(sim: &SimulationHandle, id: u64) -> (ConnectionId, ConnectionOutbox) {
    let id = ConnectionId(id);
    let (handle, outbox) = ConnectionHandle::new(id);
    sim.submit(Inbound::Open(handle)).await.expect("simulation running");
    (id, outbox)
}

pub async fn send_json(sim: &SimulationHandle, id: ConnectionId, text: &str) {
    let command = PacketRouter::decode(text).expect("valid command");
    sim.submit(Inbound::Command { id, command })
        .await
        .expect("simulation running");
}
