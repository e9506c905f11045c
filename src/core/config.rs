//! Simulation configuration with documented constants
//!
//! All tunable numbers are collected here. Every section has a `Default`
//! matching the values the office scene was tuned with, and the whole
//! config can be loaded from TOML with any subset of keys present.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::core::error::{Result, SimError};
use crate::core::types::Vec2;

/// Top-level configuration for the office simulation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub world: WorldConfig,
    pub pathfinding: PathfindingConfig,
    pub movement: MovementConfig,
    pub dialogue: DialogueConfig,
    pub schedule: ScheduleConfig,
    pub interaction: InteractionConfig,
    pub wander: WanderConfig,

    /// Seed for every RNG the simulation owns
    pub seed: u64,
}

// === WORLD / GRID ===

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    /// World width in pixels
    pub width: f32,
    /// World height in pixels
    pub height: f32,
    /// Size of one pathfinding cell (world units)
    ///
    /// Smaller cells give more precise routes around furniture at the cost
    /// of a larger search space. 8px was small enough for NPCs to walk
    /// between desk rows.
    pub cell_size: f32,
    /// Where arriving agents appear
    pub entry_point: Vec2,
    /// Where departing agents walk to before being removed
    pub exit_point: Vec2,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            width: 1600.0,
            height: 900.0,
            cell_size: 8.0,
            entry_point: Vec2::new(800.0, 194.0),
            exit_point: Vec2::new(731.0, 194.0),
        }
    }
}

// === PATHFINDING ===

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathfindingConfig {
    /// Probability of expanding the second-best open node instead of the best
    ///
    /// At 0.2 routes bend occasionally instead of hugging the optimal line.
    pub suboptimal_chance: f64,
    /// Priority added per occupied neighbour cell (discourages wall hugging)
    pub obstacle_penalty: u32,
}

impl Default for PathfindingConfig {
    fn default() -> Self {
        Self {
            suboptimal_chance: 0.2,
            obstacle_penalty: 5,
        }
    }
}

// === MOVEMENT ===

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MovementConfig {
    /// Walking speed in world units per second
    pub speed: f32,
    /// Segments shorter than this are skipped instead of animated
    pub min_segment_length: f32,
}

impl Default for MovementConfig {
    fn default() -> Self {
        Self {
            speed: 120.0,
            min_segment_length: 1.0,
        }
    }
}

// === DIALOGUE ===

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DialogueConfig {
    /// Simulated reading speed used to pace line release
    pub chars_per_second: f32,
    /// Maximum characters shown in one speech bubble
    pub chunk_size: usize,
    /// Lower bound for how long a bubble stays up
    pub min_chunk_duration_ms: u64,
    /// Display time per character of a bubble
    pub ms_per_char: u64,
    /// Cooldown between rounds is drawn uniformly from this range
    pub cooldown_min_ms: u64,
    pub cooldown_max_ms: u64,
}

impl Default for DialogueConfig {
    fn default() -> Self {
        Self {
            chars_per_second: 15.0,
            chunk_size: 100,
            min_chunk_duration_ms: 1500,
            ms_per_char: 60,
            cooldown_min_ms: 30_000,
            cooldown_max_ms: 60_000,
        }
    }
}

// === DAY SCHEDULE ===

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    /// Host milliseconds per simulated minute
    pub ms_per_game_minute: u64,
    /// Clock time when the simulation starts
    pub start_hour: u32,
    /// Agents trickle in between these hours
    pub arrival_start_hour: u32,
    pub arrival_end_hour: u32,
    /// Agents may leave between these hours (wraps past midnight)
    pub departure_start_hour: u32,
    pub departure_end_hour: u32,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            ms_per_game_minute: 100,
            start_hour: 6,
            arrival_start_hour: 6,
            arrival_end_hour: 11,
            departure_start_hour: 22,
            departure_end_hour: 4,
        }
    }
}

// === PLAYER INTERACTION ===

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InteractionConfig {
    /// How close the player must stand to talk to an NPC
    pub distance: f32,
}

impl Default for InteractionConfig {
    fn default() -> Self {
        Self { distance: 50.0 }
    }
}

// === AMBIENT WANDERERS ===

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WanderConfig {
    pub min_speed: f32,
    pub max_speed: f32,
    pub min_idle_ms: u64,
    pub max_idle_ms: u64,
    pub min_bubble_interval_ms: u64,
    pub max_bubble_interval_ms: u64,
    pub bubble_duration_ms: u64,
}

impl Default for WanderConfig {
    fn default() -> Self {
        Self {
            min_speed: 40.0,
            max_speed: 70.0,
            min_idle_ms: 3000,
            max_idle_ms: 7000,
            min_bubble_interval_ms: 5000,
            max_bubble_interval_ms: 15_000,
            bubble_duration_ms: 2000,
        }
    }
}

impl SimulationConfig {
    /// Create a new config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a TOML document; missing keys keep their defaults
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: SimulationConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML config file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Validate configuration for internal consistency
    pub fn validate(&self) -> Result<()> {
        let w = &self.world;
        if !(w.cell_size.is_finite() && w.cell_size > 0.0) {
            return Err(SimError::InvalidConfig(format!(
                "cell_size must be positive, got {}",
                w.cell_size
            )));
        }
        if !(w.width > 0.0 && w.height > 0.0) {
            return Err(SimError::InvalidConfig(format!(
                "world must have a positive size, got {}x{}",
                w.width, w.height
            )));
        }

        if !(0.0..=1.0).contains(&self.pathfinding.suboptimal_chance) {
            return Err(SimError::InvalidConfig(format!(
                "suboptimal_chance ({}) must be within [0, 1]",
                self.pathfinding.suboptimal_chance
            )));
        }

        if self.movement.speed <= 0.0 {
            return Err(SimError::InvalidConfig("movement speed must be positive".into()));
        }

        let d = &self.dialogue;
        if d.chunk_size == 0 || d.chars_per_second <= 0.0 {
            return Err(SimError::InvalidConfig(
                "chunk_size and chars_per_second must be positive".into(),
            ));
        }
        if d.cooldown_min_ms > d.cooldown_max_ms {
            return Err(SimError::InvalidConfig(format!(
                "cooldown_min_ms ({}) should be <= cooldown_max_ms ({})",
                d.cooldown_min_ms, d.cooldown_max_ms
            )));
        }

        let s = &self.schedule;
        if s.ms_per_game_minute == 0 {
            return Err(SimError::InvalidConfig("ms_per_game_minute must be positive".into()));
        }
        if s.arrival_start_hour >= s.arrival_end_hour || s.arrival_end_hour > 24 {
            return Err(SimError::InvalidConfig(format!(
                "arrival window {}..{} is empty",
                s.arrival_start_hour, s.arrival_end_hour
            )));
        }
        if s.start_hour >= 24 || s.departure_start_hour >= 24 || s.departure_end_hour >= 24 {
            return Err(SimError::InvalidConfig("schedule hours must be below 24".into()));
        }

        let wd = &self.wander;
        if wd.min_speed <= 0.0 || wd.min_speed > wd.max_speed {
            return Err(SimError::InvalidConfig("wander speed range is invalid".into()));
        }
        if wd.min_idle_ms > wd.max_idle_ms || wd.min_bubble_interval_ms > wd.max_bubble_interval_ms {
            return Err(SimError::InvalidConfig("wander timing ranges are inverted".into()));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(SimulationConfig::default().validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = SimulationConfig::from_toml_str(
            r#"
            seed = 7

            [world]
            cell_size = 10.0

            [dialogue]
            chars_per_second = 20.0
            "#,
        )
        .unwrap();

        assert_eq!(config.seed, 7);
        assert_eq!(config.world.cell_size, 10.0);
        assert_eq!(config.world.width, 1600.0);
        assert_eq!(config.dialogue.chars_per_second, 20.0);
        assert_eq!(config.dialogue.chunk_size, 100);
        assert_eq!(config.movement.speed, 120.0);
    }

    #[test]
    fn test_demo_config_file() {
        let config = SimulationConfig::from_toml_str(include_str!("../../data/office.toml")).unwrap();
        assert_eq!(config.seed, 7);
        assert_eq!(config.world.exit_point, Vec2::new(731.0, 194.0));
        assert_eq!(config.schedule, ScheduleConfig::default());
    }

    #[test]
    fn test_non_positive_cell_size_rejected() {
        let mut config = SimulationConfig::default();
        config.world.cell_size = 0.0;
        assert!(matches!(config.validate(), Err(SimError::InvalidConfig(_))));

        config.world.cell_size = -4.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_inverted_cooldown_rejected() {
        let mut config = SimulationConfig::default();
        config.dialogue.cooldown_min_ms = 90_000;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_malformed_toml_is_error() {
        let result = SimulationConfig::from_toml_str("[world\ncell_size = ");
        assert!(matches!(result, Err(SimError::TomlError(_))));
    }
}
