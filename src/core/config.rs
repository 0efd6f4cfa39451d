//! Movement configuration with documented constants
//!
//! Every tunable number used by the adjacency evaluator, the mission state
//! machine and the tick loop lives here. Values can be overridden from TOML.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::core::error::{Result, TacticalError};

/// Configuration for movement and mission resolution
///
/// Defaults reproduce the classic tactical ruleset. Changing them alters
/// pacing: TU costs, patience and backoff durations all interact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MovementConfig {
    // === ADJACENCY ===
    /// Minimum obstruction height at the origin needed to climb one level
    ///
    /// Heights are normalized to a full tile. Anything at or above this
    /// lets a unit step up onto the next level without a lift.
    pub ascend_height: f32,

    // === PATH PLANNING ===
    /// Node expansions the planner may spend on a single request
    ///
    /// When exhausted the planner returns a partial route toward the goal.
    pub path_iteration_budget: usize,

    /// Whether GotoLocation may drop intermediate nodes it can cut across
    pub allow_skip_nodes: bool,

    // === GIVE WAY ===
    /// Default patience: how many times a unit asks a blocker to move aside
    pub give_way_attempts: u32,

    /// Ticks to wait after asking another unit to give way
    pub give_way_snooze_ticks: u32,

    /// Ticks a yielding unit waits aside before returning to its tile
    pub give_way_return_ticks: u32,

    /// Ticks to wait when a closed door blocks the next step
    pub door_snooze_ticks: u32,

    // === TIME UNIT COSTS ===
    /// Running divides the step cost by this
    pub running_cost_divisor: f32,

    /// Moving prone multiplies the step cost by this
    pub prone_cost_multiplier: f32,

    /// TU per facing step when the turn was not prepaid
    pub turn_cost: u32,

    /// Throwing costs this percentage of the unit's maximum TU
    pub throw_cost_percent: u32,

    /// Teleporting costs this percentage of the unit's maximum TU
    pub teleport_cost_percent: u32,

    /// Let a throw start instantly standing and facing the target
    ///
    /// Placeholder user option; off by default.
    pub allow_instant_throws: bool,

    // === TICK LOOP ===
    /// TU regained by every unit each tick, capped at its maximum
    pub time_unit_regen_per_tick: u32,

    /// Distance a walking unit covers per tick (tiles). Running doubles it.
    pub movement_speed: f32,

    /// Throw trajectory knobs
    pub throw: ThrowConfig,
}

/// Throw velocity knobs
///
/// Units: tiles per tick for speed, tiles for range, tiles per tick² for
/// gravity. The tuning of these was never settled; defaults are documented
/// guesses, not reference values.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThrowConfig {
    pub speed: f32,
    pub max_range: f32,
    pub gravity: f32,
}

impl Default for ThrowConfig {
    fn default() -> Self {
        Self {
            speed: 1.0,
            max_range: 20.0,
            gravity: 0.05,
        }
    }
}

impl Default for MovementConfig {
    fn default() -> Self {
        Self {
            // Adjacency
            ascend_height: 0.675,

            // Planning
            path_iteration_budget: 1000,
            allow_skip_nodes: true,

            // Give way / backoff
            give_way_attempts: 20,
            give_way_snooze_ticks: 16,
            give_way_return_ticks: 32,
            door_snooze_ticks: 8,

            // TU costs
            running_cost_divisor: 2.0,
            prone_cost_multiplier: 1.5,
            turn_cost: 1,
            throw_cost_percent: 18,
            teleport_cost_percent: 55,
            allow_instant_throws: false,

            // Tick loop
            time_unit_regen_per_tick: 1,
            movement_speed: 0.5,

            throw: ThrowConfig::default(),
        }
    }
}

impl MovementConfig {
    /// Create a new config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a config from TOML; missing keys keep their defaults
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: MovementConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a config file from disk
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Validate configuration for internal consistency
    pub fn validate(&self) -> Result<()> {
        if !(self.ascend_height > 0.0 && self.ascend_height <= 1.0) {
            return Err(TacticalError::InvalidConfig(format!(
                "ascend_height ({}) must be within (0, 1]",
                self.ascend_height
            )));
        }

        if self.path_iteration_budget == 0 {
            return Err(TacticalError::InvalidConfig(
                "path_iteration_budget must be positive".into(),
            ));
        }

        if self.running_cost_divisor <= 0.0 || self.prone_cost_multiplier <= 0.0 {
            return Err(TacticalError::InvalidConfig(
                "cost modifiers must be positive".into(),
            ));
        }

        if self.throw_cost_percent > 100 || self.teleport_cost_percent > 100 {
            return Err(TacticalError::InvalidConfig(format!(
                "percentages must not exceed 100 (throw {}, teleport {})",
                self.throw_cost_percent, self.teleport_cost_percent
            )));
        }

        if self.movement_speed <= 0.0 || self.throw.speed <= 0.0 {
            return Err(TacticalError::InvalidConfig(
                "speeds must be positive".into(),
            ));
        }

        Ok(())
    }
}
