//! Configuration system.
//!
//! Loads client configuration from JSON strings/files (file IO left to app).
//! Gameplay constants live in [`Tuning`], kept apart from runtime settings
//! such as the server address and tick rate.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{net::Millis, physics::PlayArea};

/// Root client configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Server address, e.g. `127.0.0.1:5001`.
    pub server_addr: String,
    /// Ticks per second; nominally the display refresh rate.
    pub tick_hz: u32,
    #[serde(default)]
    pub play_area: PlayArea,
    #[serde(default)]
    pub hit_reporting: HitReporting,
    #[serde(default)]
    pub tuning: Tuning,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_addr: "127.0.0.1:5001".to_string(),
            tick_hz: 60,
            play_area: PlayArea::default(),
            hit_reporting: HitReporting::default(),
            tuning: Tuning::default(),
        }
    }
}

impl ClientConfig {
    /// Parses config from JSON.
    pub fn from_json_str(s: &str) -> serde_json::Result<Self> {
        serde_json::from_str(s)
    }

    /// Rejects values the simulation cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tick_hz == 0 {
            return Err(ConfigError::ZeroTickRate);
        }
        if !(self.play_area.width > 0.0 && self.play_area.height > 0.0) {
            return Err(ConfigError::EmptyPlayArea);
        }
        self.tuning.validate()
    }
}

/// Which collisions a client turns into outbound hit reports.
///
/// Every client simulates every projectile, so every client sees every hit.
/// The authority applies damage per report it receives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum HitReporting {
    /// Report only hits scored by projectiles this client fired.
    #[default]
    Shooter,
    /// Report every locally detected hit.
    All,
}

/// Gameplay tuning shared by the local player and the projectile simulator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tuning {
    /// Movement per tick per held axis.
    pub player_speed: f32,
    pub player_radius: f32,
    pub projectile_radius: f32,
    /// Projectile travel per tick.
    pub projectile_speed: f32,
    pub base_damage: f32,
    /// Damage multiplier added per upgrade tier.
    pub damage_per_tier: f32,
    pub fire_cooldown_ms: Millis,
    pub block_duration_ms: Millis,
    pub block_cooldown_ms: Millis,
    /// Horizontal offset of the target used by the fire key.
    pub default_fire_offset: f32,
    pub max_health: u8,
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            player_speed: 5.0,
            player_radius: 20.0,
            projectile_radius: 5.0,
            projectile_speed: 10.0,
            base_damage: 10.0,
            damage_per_tier: 0.1,
            fire_cooldown_ms: 500,
            block_duration_ms: 2000,
            block_cooldown_ms: 5000,
            default_fire_offset: 100.0,
            max_health: 100,
        }
    }
}

impl Tuning {
    /// Damage dealt by a projectile fired at the given upgrade tier.
    pub fn damage_for_tier(&self, tier: u32) -> f32 {
        // f64 keeps tier 3 at exactly 13.0 after narrowing.
        let multiplier = 1.0 + f64::from(tier) * f64::from(self.damage_per_tier);
        (f64::from(self.base_damage) * multiplier) as f32
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let checks = [
            ("player_speed", self.player_speed),
            ("player_radius", self.player_radius),
            ("projectile_radius", self.projectile_radius),
            ("projectile_speed", self.projectile_speed),
            ("base_damage", self.base_damage),
            ("damage_per_tier", self.damage_per_tier),
        ];
        for (field, value) in checks {
            if !(value >= 0.0) {
                return Err(ConfigError::Negative(field));
            }
        }
        if self.max_health == 0 {
            return Err(ConfigError::ZeroHealth);
        }
        Ok(())
    }
}

/// Configuration validation errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    ZeroTickRate,
    EmptyPlayArea,
    ZeroHealth,
    /// A tuning value that must be non-negative was not.
    Negative(&'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::ZeroTickRate => write!(f, "tick_hz must be at least 1"),
            ConfigError::EmptyPlayArea => write!(f, "play area must have positive width and height"),
            ConfigError::ZeroHealth => write!(f, "max_health must be at least 1"),
            ConfigError::Negative(field) => write!(f, "tuning.{field} must not be negative"),
        }
    }
}

impl std::error::Error for ConfigError {}
