//! Connection registry: live connections, their players, and proximity queries

use std::collections::BTreeMap;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use super::movement::MovementSystem;
use super::player::{ConnectionId, Player};
use super::router::ConnectionState;
use crate::ws::connection::ConnectionHandle;

/// Longest display name kept, in characters
pub const MAX_NAME_CHARS: usize = 16;

/// What a client asked for when spawning
#[derive(Debug, Clone, Default)]
pub struct SpawnRequest {
    pub name: Option<String>,
    /// Requested start position. Ignored unless inside the map.
    pub position: Option<(f32, f32)>,
}

/// Chooses names and start positions for new players
pub struct Spawner {
    map_size: f32,
    unknown_name: String,
    rng: ChaCha8Rng,
}

impl Spawner {
    pub fn new(map_size: f32, unknown_name: String, seed: u64) -> Self {
        Self {
            map_size,
            unknown_name,
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    pub fn name_for(&self, requested: Option<&str>) -> String {
        let name: String = requested
            .map(str::trim)
            .unwrap_or_default()
            .chars()
            .take(MAX_NAME_CHARS)
            .collect();
        if name.is_empty() {
            self.unknown_name.clone()
        } else {
            name
        }
    }

    pub fn position_for(&mut self, requested: Option<(f32, f32)>) -> (f32, f32) {
        match requested {
            Some((x, y))
                if MovementSystem::in_bounds(x, self.map_size)
                    && MovementSystem::in_bounds(y, self.map_size) =>
            {
                (x, y)
            }
            _ => (
                self.rng.gen_range(0.0..=self.map_size),
                self.rng.gen_range(0.0..=self.map_size),
            ),
        }
    }
}

struct ConnectionEntry {
    handle: ConnectionHandle,
    player: Option<Player>,
}

/// Owns every live connection and the player attached to it.
///
/// Iteration order is connection id order. Ids are handed out in accept order, so
/// this is also registration order.
pub struct ConnectionRegistry {
    entries: BTreeMap<ConnectionId, ConnectionEntry>,
    spawner: Spawner,
}

impl ConnectionRegistry {
    pub fn new(spawner: Spawner) -> Self {
        Self {
            entries: BTreeMap::new(),
            spawner,
        }
    }

    /// Register a connection with no player. Returns false if it was already registered.
    pub fn add(&mut self, handle: ConnectionHandle) -> bool {
        let id = handle.id();
        if self.entries.contains_key(&id) {
            return false;
        }
        self.entries.insert(
            id,
            ConnectionEntry {
                handle,
                player: None,
            },
        );
        true
    }

    /// Create a fresh player for `id`, replacing any existing one.
    /// Returns None if the connection is not registered.
    pub fn spawn(&mut self, id: ConnectionId, request: SpawnRequest) -> Option<&Player> {
        let entry = self.entries.get_mut(&id)?;

        let name = self.spawner.name_for(request.name.as_deref());
        let (x, y) = self.spawner.position_for(request.position);
        let mut player = Player::new(id, name, x, y);
        player.alive = true;

        entry.player = Some(player);
        entry.player.as_ref()
    }

    /// Deregister a connection, destroying its player. Returns false if unknown.
    pub fn remove(&mut self, id: ConnectionId) -> bool {
        self.entries.remove(&id).is_some()
    }

    pub fn state(&self, id: ConnectionId) -> ConnectionState {
        match self.entries.get(&id) {
            Some(ConnectionEntry {
                player: Some(_), ..
            }) => ConnectionState::Spawned,
            Some(_) => ConnectionState::Connected,
            None => ConnectionState::Disconnected,
        }
    }

    pub fn handle(&self, id: ConnectionId) -> Option<&ConnectionHandle> {
        self.entries.get(&id).map(|e| &e.handle)
    }

    pub fn player(&self, id: ConnectionId) -> Option<&Player> {
        self.entries.get(&id).and_then(|e| e.player.as_ref())
    }

    pub fn player_mut(&mut self, id: ConnectionId) -> Option<&mut Player> {
        self.entries.get_mut(&id).and_then(|e| e.player.as_mut())
    }

    /// Every other alive player within `radius` of `player` (inclusive), in registry order.
    pub fn nearby(&self, player: &Player, radius: f32) -> Vec<&Player> {
        let radius_sq = radius * radius;
        self.entries
            .values()
            .filter_map(|e| e.player.as_ref())
            .filter(|other| other.alive && other.id != player.id)
            .filter(|other| player.distance_sq(other) <= radius_sq)
            .collect()
    }

    /// Connections with a player attached, in registry order.
    ///
    /// The borrow prevents registry changes while the iterator is alive; call again to restart.
    pub fn all(&self) -> impl Iterator<Item = (&ConnectionHandle, &Player)> + '_ {
        self.entries
            .values()
            .filter_map(|e| e.player.as_ref().map(|p| (&e.handle, p)))
    }

    pub fn players_mut(&mut self) -> impl Iterator<Item = &mut Player> + '_ {
        self.entries.values_mut().filter_map(|e| e.player.as_mut())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn alive_count(&self) -> usize {
        self.all().filter(|(_, p)| p.alive).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> ConnectionRegistry {
        ConnectionRegistry::new(Spawner::new(100.0, "unknown".to_string(), 7))
    }

    fn connect(registry: &mut ConnectionRegistry, id: u64) -> ConnectionId {
        let id = ConnectionId(id);
        let (handle, _outbox) = ConnectionHandle::new(id);
        assert!(registry.add(handle));
        id
    }

    fn spawn_at(registry: &mut ConnectionRegistry, id: ConnectionId, x: f32, y: f32) {
        registry.spawn(
            id,
            SpawnRequest {
                name: None,
                position: Some((x, y)),
            },
        );
    }

    #[test]
    fn test_add_is_idempotent() {
        let mut registry = registry();
        let id = connect(&mut registry, 1);
        let (dup, _outbox) = ConnectionHandle::new(id);

        assert!(!registry.add(dup));
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.state(id), ConnectionState::Connected);
    }

    #[test]
    fn test_spawn_attaches_alive_player() {
        let mut registry = registry();
        let id = connect(&mut registry, 1);

        let player = registry
            .spawn(
                id,
                SpawnRequest {
                    name: Some("  ada  ".to_string()),
                    position: Some((10.0, 20.0)),
                },
            )
            .unwrap();

        assert!(player.alive);
        assert_eq!(player.id, id);
        assert_eq!(player.name, "ada");
        assert_eq!((player.x, player.y), (10.0, 20.0));
        assert_eq!(registry.state(id), ConnectionState::Spawned);
    }

    #[test]
    fn test_spawn_unknown_connection() {
        let mut registry = registry();
        assert!(registry
            .spawn(ConnectionId(5), SpawnRequest::default())
            .is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_respawn_replaces_player() {
        let mut registry = registry();
        let id = connect(&mut registry, 1);
        spawn_at(&mut registry, id, 10.0, 10.0);
        registry
            .player_mut(id)
            .unwrap()
            .apply_key(crate::game::player::MoveKey::Left, true);

        spawn_at(&mut registry, id, 70.0, 80.0);

        let player = registry.player(id).unwrap();
        assert!(player.alive);
        assert_eq!((player.x, player.y), (70.0, 80.0));
        assert!(!player.down_x);
    }

    #[test]
    fn test_default_name_and_server_position() {
        let mut registry = registry();
        let id = connect(&mut registry, 1);
        let player = registry.spawn(id, SpawnRequest::default()).unwrap();

        assert_eq!(player.name, "unknown");
        assert!(MovementSystem::in_bounds(player.x, 100.0));
        assert!(MovementSystem::in_bounds(player.y, 100.0));
    }

    #[test]
    fn test_out_of_bounds_request_is_replaced() {
        let mut registry = registry();
        let id = connect(&mut registry, 1);
        spawn_at(&mut registry, id, -5.0, 500.0);

        let player = registry.player(id).unwrap();
        assert!(MovementSystem::in_bounds(player.x, 100.0));
        assert!(MovementSystem::in_bounds(player.y, 100.0));
    }

    #[test]
    fn test_long_names_are_capped() {
        let spawner = Spawner::new(1.0, "unknown".to_string(), 0);
        let name = spawner.name_for(Some("abcdefghijklmnopqrstuvwxyz"));
        assert_eq!(name.chars().count(), MAX_NAME_CHARS);
        assert_eq!(spawner.name_for(Some("   ")), "unknown");
    }

    #[test]
    fn test_remove() {
        let mut registry = registry();
        let id = connect(&mut registry, 1);
        spawn_at(&mut registry, id, 1.0, 1.0);

        assert!(registry.remove(id));
        assert!(!registry.remove(id));
        assert!(registry.player(id).is_none());
        assert_eq!(registry.state(id), ConnectionState::Disconnected);
    }

    #[test]
    fn test_nearby_contract() {
        let mut registry = registry();
        let a = connect(&mut registry, 1);
        let b = connect(&mut registry, 2);
        let c = connect(&mut registry, 3);
        let d = connect(&mut registry, 4);
        let unspawned = connect(&mut registry, 5);
        spawn_at(&mut registry, a, 50.0, 50.0);
        spawn_at(&mut registry, b, 60.0, 50.0); // exactly on the radius
        spawn_at(&mut registry, c, 50.0, 60.001);
        spawn_at(&mut registry, d, 45.0, 45.0);
        registry.player_mut(d).unwrap().alive = false;

        let me = registry.player(a).unwrap().clone();
        let ids: Vec<ConnectionId> = registry.nearby(&me, 10.0).iter().map(|p| p.id).collect();

        assert_eq!(ids, vec![b]);
        assert!(!ids.contains(&a));
        assert!(!ids.contains(&unspawned));
    }

    #[test]
    fn test_nearby_order_is_registry_order() {
        let mut registry = registry();
        let ids: Vec<ConnectionId> = (1..=5).map(|i| connect(&mut registry, i)).collect();
        for (i, id) in ids.iter().enumerate() {
            spawn_at(&mut registry, *id, 50.0 + i as f32, 50.0);
        }

        let me = registry.player(ids[2]).unwrap().clone();
        let first: Vec<ConnectionId> = registry.nearby(&me, 10.0).iter().map(|p| p.id).collect();
        let second: Vec<ConnectionId> = registry.nearby(&me, 10.0).iter().map(|p| p.id).collect();

        assert_eq!(first, vec![ids[0], ids[1], ids[3], ids[4]]);
        assert_eq!(first, second);
    }

    #[test]
    fn test_all_skips_unspawned() {
        let mut registry = registry();
        let a = connect(&mut registry, 1);
        let _b = connect(&mut registry, 2);
        spawn_at(&mut registry, a, 1.0, 1.0);

        let listed: Vec<ConnectionId> = registry.all().map(|(h, _)| h.id()).collect();
        assert_eq!(listed, vec![a]);
        assert_eq!(registry.all().count(), 1);
        assert_eq!(registry.alive_count(), 1);
    }
}
