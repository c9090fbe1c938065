//! Configuration module - environment variable parsing

use std::env;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

use crate::game::movement::SpeedPolicy;

pub const DEFAULT_TICK_INTERVAL_MS: u64 = 100;
pub const DEFAULT_MAP_SIZE: f32 = 12_000.0;
pub const DEFAULT_UPDATE_RADIUS: f32 = 500.0;
pub const DEFAULT_PLAYER_SPEED: f32 = 50.0;
pub const DEFAULT_BIOME_BOUNDARY_Y: f32 = 2_400.0;
pub const DEFAULT_UNKNOWN_NAME: &str = "unknown";
pub const DEFAULT_INPUT_RATE_LIMIT: u32 = 30;

/// Application configuration loaded from environment variables
#[derive(Clone, Debug)]
pub struct Config {
    /// Listening port (required)
    pub port: u16,
    /// Interface to bind
    pub host: IpAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,

    /// Wall-clock time between simulation ticks
    pub tick_interval_ms: u64,
    /// Both axes span `[0, map_size]`
    pub map_size: f32,
    /// Interest radius for position updates
    pub update_radius: f32,
    /// Units moved per tick outside the biome
    pub player_speed: f32,
    /// Units moved per tick inside the biome
    pub biome_speed: f32,
    /// Players with `y` below this value are inside the biome
    pub biome_boundary_y: f32,
    /// Display name for players that spawn without one
    pub unknown_name: String,

    /// Max move/angle commands per second per connection
    pub input_rate_limit: u32,
}

impl Config {
    /// Defaults for everything except the port.
    pub fn new(port: u16) -> Self {
        Self {
            port,
            host: IpAddr::from([0, 0, 0, 0]),
            log_level: "info".to_string(),
            tick_interval_ms: DEFAULT_TICK_INTERVAL_MS,
            map_size: DEFAULT_MAP_SIZE,
            update_radius: DEFAULT_UPDATE_RADIUS,
            player_speed: DEFAULT_PLAYER_SPEED,
            biome_speed: DEFAULT_PLAYER_SPEED / 2.0,
            biome_boundary_y: DEFAULT_BIOME_BOUNDARY_Y,
            unknown_name: DEFAULT_UNKNOWN_NAME.to_string(),
            input_rate_limit: DEFAULT_INPUT_RATE_LIMIT,
        }
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Parse configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let port = match lookup("PORT") {
            Some(raw) => match raw.trim().parse::<u16>() {
                Ok(port) if port > 0 => port,
                _ => return Err(ConfigError::InvalidPort(raw)),
            },
            None => return Err(ConfigError::Missing("PORT")),
        };

        let mut config = Self::new(port);

        if let Some(host) = lookup("BIND_HOST") {
            config.host = host
                .trim()
                .parse()
                .map_err(|_| ConfigError::invalid("BIND_HOST", &host))?;
        }
        if let Some(level) = lookup("LOG_LEVEL") {
            config.log_level = level;
        }

        if let Some(ms) = parse_key::<u64, _>(&lookup, "TICK_INTERVAL_MS")? {
            config.tick_interval_ms = ms;
        }
        if let Some(size) = parse_key::<f32, _>(&lookup, "MAP_SIZE")? {
            config.map_size = size;
        }
        if let Some(radius) = parse_key::<f32, _>(&lookup, "UPDATE_RADIUS")? {
            config.update_radius = radius;
        }
        if let Some(speed) = parse_key::<f32, _>(&lookup, "PLAYER_SPEED")? {
            config.player_speed = speed;
        }
        // Derived from the resolved player speed unless set explicitly.
        config.biome_speed = match parse_key::<f32, _>(&lookup, "BIOME_SPEED")? {
            Some(speed) => speed,
            None => config.player_speed / 2.0,
        };
        if let Some(boundary) = parse_key::<f32, _>(&lookup, "BIOME_BOUNDARY_Y")? {
            config.biome_boundary_y = boundary;
        }
        if let Some(name) = lookup("UNKNOWN_NAME") {
            let name = name.trim();
            if !name.is_empty() {
                config.unknown_name = name.to_string();
            }
        }
        if let Some(limit) = parse_key::<u32, _>(&lookup, "INPUT_RATE_LIMIT")? {
            config.input_rate_limit = limit;
        }

        config.validate()?;
        Ok(config)
    }

    /// Check value ranges. Called by the loaders; call it again after editing fields by hand.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.port == 0 {
            return Err(ConfigError::InvalidPort(self.port.to_string()));
        }
        if self.tick_interval_ms == 0 {
            return Err(ConfigError::invalid("TICK_INTERVAL_MS", self.tick_interval_ms));
        }
        if !(self.map_size.is_finite() && self.map_size > 0.0) {
            return Err(ConfigError::invalid("MAP_SIZE", self.map_size));
        }
        if !(self.update_radius.is_finite() && self.update_radius >= 0.0) {
            return Err(ConfigError::invalid("UPDATE_RADIUS", self.update_radius));
        }
        if !(self.player_speed.is_finite() && self.player_speed > 0.0) {
            return Err(ConfigError::invalid("PLAYER_SPEED", self.player_speed));
        }
        if !(self.biome_speed.is_finite() && self.biome_speed >= 0.0) {
            return Err(ConfigError::invalid("BIOME_SPEED", self.biome_speed));
        }
        if !(self.biome_boundary_y.is_finite() && self.biome_boundary_y >= 0.0) {
            return Err(ConfigError::invalid("BIOME_BOUNDARY_Y", self.biome_boundary_y));
        }
        Ok(())
    }

    pub fn server_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    pub fn speed_policy(&self) -> SpeedPolicy {
        SpeedPolicy::Biome {
            base: self.player_speed,
            biome: self.biome_speed,
            boundary_y: self.biome_boundary_y,
        }
    }
}

fn parse_key<T, F>(lookup: &F, key: &'static str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| ConfigError::invalid(key, &raw)),
        None => Ok(None),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid port: {0:?}")]
    InvalidPort(String),

    #[error("Invalid value for {key}: {value:?}")]
    Invalid { key: &'static str, value: String },
}

impl ConfigError {
    fn invalid(key: &'static str, value: impl ToString) -> Self {
        Self::Invalid {
            key,
            value: value.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_applied_when_absent() {
        let config = Config::from_lookup(lookup_from(&[("PORT", "5000")])).unwrap();

        assert_eq!(config.port, 5000);
        assert_eq!(config.tick_interval_ms, 100);
        assert_eq!(config.map_size, 12_000.0);
        assert_eq!(config.update_radius, 500.0);
        assert_eq!(config.player_speed, 50.0);
        assert_eq!(config.biome_speed, 25.0);
        assert_eq!(config.biome_boundary_y, 2_400.0);
        assert_eq!(config.unknown_name, "unknown");
    }

    #[test]
    fn test_missing_port_is_fatal() {
        let err = Config::from_lookup(lookup_from(&[])).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("PORT")));
    }

    #[test]
    fn test_non_numeric_port_is_fatal() {
        let err = Config::from_lookup(lookup_from(&[("PORT", "eighty")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidPort(_)));

        let err = Config::from_lookup(lookup_from(&[("PORT", "0")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidPort(_)));
    }

    #[test]
    fn test_biome_speed_follows_player_speed() {
        let config =
            Config::from_lookup(lookup_from(&[("PORT", "1"), ("PLAYER_SPEED", "80")])).unwrap();
        assert_eq!(config.biome_speed, 40.0);

        let config = Config::from_lookup(lookup_from(&[
            ("PORT", "1"),
            ("PLAYER_SPEED", "80"),
            ("BIOME_SPEED", "10"),
        ]))
        .unwrap();
        assert_eq!(config.biome_speed, 10.0);
    }

    #[test]
    fn test_speed_policy_uses_configured_fields() {
        let config = Config::from_lookup(lookup_from(&[
            ("PORT", "1"),
            ("PLAYER_SPEED", "60"),
            ("BIOME_SPEED", "15"),
            ("BIOME_BOUNDARY_Y", "300"),
        ]))
        .unwrap();

        assert_eq!(
            config.speed_policy(),
            SpeedPolicy::Biome {
                base: 60.0,
                biome: 15.0,
                boundary_y: 300.0,
            }
        );
        assert_eq!(config.speed_policy().speed_for(0.0, 299.0), 15.0);
        assert_eq!(config.speed_policy().speed_for(0.0, 300.0), 60.0);
    }

    #[test]
    fn test_invalid_numbers_rejected() {
        let err = Config::from_lookup(lookup_from(&[("PORT", "1"), ("MAP_SIZE", "big")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "MAP_SIZE", .. }));

        let err = Config::from_lookup(lookup_from(&[("PORT", "1"), ("TICK_INTERVAL_MS", "0")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "TICK_INTERVAL_MS", .. }));

        let err = Config::from_lookup(lookup_from(&[("PORT", "1"), ("UPDATE_RADIUS", "-1")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "UPDATE_RADIUS", .. }));
    }

    #[test]
    fn test_blank_unknown_name_keeps_default() {
        let config =
            Config::from_lookup(lookup_from(&[("PORT", "1"), ("UNKNOWN_NAME", "   ")])).unwrap();
        assert_eq!(config.unknown_name, DEFAULT_UNKNOWN_NAME);
    }
}
