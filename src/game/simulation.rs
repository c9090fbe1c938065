//! World state and the authoritative tick loop

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::RwLock;
use serde::Serialize;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::ws::connection::ConnectionHandle;
use crate::ws::frame;
use crate::ws::protocol::ServerMsg;

use super::interest::{InterestBuilder, UpdateFrame};
use super::movement::{MovementSystem, SpeedPolicy};
use super::registry::{ConnectionRegistry, Spawner};
use super::router::{Inbound, PacketRouter, ProtocolError, Transition};

/// Inbound events buffered between ticks. Senders wait for room; nothing is dropped.
pub const INBOX_CAPACITY: usize = 1024;

/// Simulation clock state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ClockState {
    /// Created, never started
    NotStarted,
    /// Ticking
    Running,
    /// Stopped for good
    Stopped,
}

/// Tunables for a world
#[derive(Debug, Clone)]
pub struct WorldParams {
    pub map_size: f32,
    pub update_radius: f32,
    pub speed: SpeedPolicy,
    pub unknown_name: String,
    pub tick_interval: Duration,
    /// Seed for server-chosen spawn positions
    pub spawn_seed: u64,
}

impl WorldParams {
    pub fn from_config(config: &Config, spawn_seed: u64) -> Self {
        Self {
            map_size: config.map_size,
            update_radius: config.update_radius,
            speed: config.speed_policy(),
            unknown_name: config.unknown_name.clone(),
            tick_interval: config.tick_interval(),
            spawn_seed,
        }
    }
}

/// Read-only view published after every tick
#[derive(Debug, Clone, Serialize)]
pub struct WorldStats {
    pub tick: u64,
    pub connections: usize,
    pub alive_players: usize,
    pub clock: ClockState,
}

/// One position update ready for dispatch
#[derive(Debug)]
pub struct Outbound {
    pub handle: ConnectionHandle,
    pub frame: UpdateFrame,
}

/// The shared world: registry plus tick counter. Owned by exactly one task.
pub struct World {
    registry: ConnectionRegistry,
    interest: InterestBuilder,
    speed: SpeedPolicy,
    map_size: f32,
    tick_interval: Duration,
    tick: u64,
}

impl World {
    pub fn new(params: WorldParams) -> Self {
        let spawner = Spawner::new(params.map_size, params.unknown_name, params.spawn_seed);
        Self {
            registry: ConnectionRegistry::new(spawner),
            interest: InterestBuilder::new(params.update_radius),
            speed: params.speed,
            map_size: params.map_size,
            tick_interval: params.tick_interval,
            tick: 0,
        }
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn registry(&self) -> &ConnectionRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut ConnectionRegistry {
        &mut self.registry
    }

    /// Route one inbound event and send the reliable reply it calls for.
    /// Protocol errors drop the event and are only logged.
    pub fn apply(&mut self, inbound: Inbound) {
        match PacketRouter::dispatch(&mut self.registry, inbound) {
            Ok(Transition::Opened(id)) => {
                if let Some(handle) = self.registry.handle(id) {
                    let welcome = ServerMsg::Welcome {
                        id,
                        map_size: self.map_size,
                        tick_interval_ms: self.tick_interval.as_millis() as u64,
                    };
                    if let Err(e) = handle.send_event(welcome) {
                        debug!(error = %e, "Welcome not delivered");
                    }
                }
            }
            Ok(Transition::Spawned(id)) => {
                if let (Some(handle), Some(player)) =
                    (self.registry.handle(id), self.registry.player(id))
                {
                    let spawned = ServerMsg::Spawned {
                        id,
                        name: player.name.clone(),
                        x: player.x,
                        y: player.y,
                    };
                    if let Err(e) = handle.send_event(spawned) {
                        debug!(error = %e, "Spawn reply not delivered");
                    }
                }
            }
            Ok(Transition::Closed(_)) | Ok(Transition::Unchanged) => {}
            Err(e @ ProtocolError::NotSpawned { .. }) => {
                debug!(error = %e, "Command ignored");
            }
            Err(e) => {
                warn!(error = %e, "Command dropped");
            }
        }
    }

    /// Advance one tick: move every alive player, then build every alive player's
    /// update from the post-move positions, then bump the tick counter.
    pub fn step(&mut self) -> Vec<Outbound> {
        for player in self.registry.players_mut() {
            MovementSystem::step(player, &self.speed, self.map_size);
        }

        let outbox = self
            .registry
            .all()
            .filter(|(_, p)| p.alive)
            .map(|(handle, player)| Outbound {
                handle: handle.clone(),
                frame: self.interest.build(self.tick, &self.registry, player),
            })
            .collect();

        self.tick += 1;
        outbox
    }

    pub fn stats(&self, clock: ClockState) -> WorldStats {
        WorldStats {
            tick: self.tick,
            connections: self.registry.len(),
            alive_players: self.registry.alive_count(),
            clock,
        }
    }
}

/// Encode and send every frame. A closed connection only costs a log line.
pub fn dispatch(outbox: Vec<Outbound>) {
    for Outbound { handle, frame } in outbox {
        if let Err(e) = handle.send_frame(frame::encode(&frame)) {
            debug!(error = %e, "Position frame dropped");
        }
    }
}

/// Returned when the simulation is no longer accepting events
#[derive(Debug, thiserror::Error)]
#[error("simulation is stopped")]
pub struct SimulationStopped;

/// Handle for feeding the simulation and reading its stats
#[derive(Clone)]
pub struct SimulationHandle {
    inbox_tx: mpsc::Sender<Inbound>,
    stats: Arc<RwLock<WorldStats>>,
}

impl SimulationHandle {
    /// Queue an event for the next tick. Waits while the inbox is full.
    pub async fn submit(&self, inbound: Inbound) -> Result<(), SimulationStopped> {
        self.inbox_tx
            .send(inbound)
            .await
            .map_err(|_| SimulationStopped)
    }

    pub fn stats(&self) -> WorldStats {
        self.stats.read().clone()
    }
}

/// The authoritative simulation, before it is started
pub struct Simulation {
    world: World,
    inbox_rx: mpsc::Receiver<Inbound>,
    stats: Arc<RwLock<WorldStats>>,
    tick_interval: Duration,
}

impl Simulation {
    pub fn new(params: WorldParams) -> (Self, SimulationHandle) {
        let (inbox_tx, inbox_rx) = mpsc::channel(INBOX_CAPACITY);
        let tick_interval = params.tick_interval;
        let world = World::new(params);
        let stats = Arc::new(RwLock::new(world.stats(ClockState::NotStarted)));

        let handle = SimulationHandle {
            inbox_tx,
            stats: stats.clone(),
        };
        let simulation = Self {
            world,
            inbox_rx,
            stats,
            tick_interval,
        };
        (simulation, handle)
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    /// One full tick: drain the inbox, step the world, dispatch frames, publish stats.
    pub fn run_tick(&mut self, clock: ClockState) {
        while let Ok(inbound) = self.inbox_rx.try_recv() {
            self.world.apply(inbound);
        }

        let outbox = self.world.step();
        dispatch(outbox);

        *self.stats.write() = self.world.stats(clock);
    }

    /// Spawn the tick loop on the current runtime.
    pub fn start(self) -> RunningSimulation {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let stats = self.stats.clone();
        *stats.write() = self.world.stats(ClockState::Running);

        let task = tokio::spawn(self.run(shutdown_rx));
        RunningSimulation {
            shutdown_tx,
            stats,
            task,
        }
    }

    async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        info!(tick_interval_ms = self.tick_interval.as_millis() as u64, "Simulation started");

        let mut ticker = interval(self.tick_interval);
        // A slow tick delays the next one; missed ticks are not replayed.
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                biased;
                _ = shutdown.changed() => break,
                _ = ticker.tick() => {}
            }

            let started = Instant::now();
            self.run_tick(ClockState::Running);
            self.report_overrun(started.elapsed());
        }

        *self.stats.write() = self.world.stats(ClockState::Stopped);
        info!(tick = self.world.tick(), "Simulation stopped");
    }

    /// Warn when a tick took longer than the interval. Returns whether it did.
    fn report_overrun(&self, elapsed: Duration) -> bool {
        if elapsed <= self.tick_interval {
            return false;
        }
        warn!(
            tick = self.world.tick(),
            elapsed_ms = elapsed.as_millis() as u64,
            interval_ms = self.tick_interval.as_millis() as u64,
            "Tick overran its interval"
        );
        true
    }
}

/// A started simulation. Stopping consumes it, so the clock cannot restart.
pub struct RunningSimulation {
    shutdown_tx: watch::Sender<bool>,
    stats: Arc<RwLock<WorldStats>>,
    task: JoinHandle<()>,
}

impl RunningSimulation {
    /// Stop ticking. Waits for an in-flight tick to finish; no tick fires afterwards.
    pub async fn stop(self) -> WorldStats {
        let _ = self.shutdown_tx.send(true);
        if let Err(e) = self.task.await {
            error!(error = %e, "Simulation task failed");
        }

        let mut stats = self.stats.write();
        stats.clock = ClockState::Stopped;
        stats.clone()
    }
}
