//! Planner configuration.

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use kinoplan_core::Piece;

/// Main planner configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlannerConfig {
    /// Dynamic feasibility bounds
    pub limits: DynamicLimits,
    /// Search behavior
    pub search: SearchConfig,
    /// Sampling volume
    pub world: WorldConfig,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            limits: DynamicLimits::default(),
            search: SearchConfig::default(),
            world: WorldConfig::default(),
        }
    }
}

/// Per-axis dynamic bounds applied to every candidate edge.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct DynamicLimits {
    /// Velocity magnitude drawn for sampled states [m/s]
    pub v_mag_sample: f64,
    /// Per-axis velocity bound [m/s]
    pub vel_limit: f64,
    /// Per-axis acceleration bound [m/s²]
    pub acc_limit: f64,
    /// Per-axis jerk bound [m/s³]
    pub jerk_limit: f64,
}

impl Default for DynamicLimits {
    fn default() -> Self {
        Self {
            v_mag_sample: 2.0,
            vel_limit: 3.0,
            acc_limit: 6.0,
            jerk_limit: 30.0,
        }
    }
}

impl DynamicLimits {
    /// True when the segment stays within all three rate bounds.
    pub fn admits(&self, piece: &Piece) -> bool {
        piece.max_vel_rate() <= self.vel_limit
            && piece.max_acc_rate() <= self.acc_limit
            && piece.max_jerk_rate() <= self.jerk_limit
    }
}

/// Search-loop parameters.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Time weight ρ in the edge cost `ρτ + ∫‖u‖²` (> 0)
    pub rho: f64,
    /// Cost-ball cap for the extend/rewire neighborhoods
    pub radius_cost_between_two_states: f64,
    /// Cost-ball cap for cross-tree bridging queries
    pub bridge_radius_cost: f64,
    /// Probability of emitting the goal state from the sampler
    pub goal_bias: f64,
    /// Re-parent near nodes through cheaper new nodes
    pub rewire: bool,
    /// Repair colliding edges through free corridors
    pub use_regional_opt: bool,
    /// Regional repair attempts per extension
    pub regional_attempts_per_iter: usize,
    /// Accept a near-goal terminal when no exact bridge exists
    pub allow_close_goal: bool,
    /// Position tolerance for the near-goal terminal [m]
    pub close_goal_tolerance: f64,
    /// Return as soon as any solution is found
    pub stop_after_first_traj_found: bool,
    /// Record every improving solution with its cost and wall time
    pub test_convergency: bool,
    /// Node pool capacity shared by both trees
    pub tree_node_nums: usize,
    /// Sampler seed; a fixed seed reproduces the whole search
    pub seed: u64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            rho: 1.0,
            radius_cost_between_two_states: 4.0,
            bridge_radius_cost: 2.5,
            goal_bias: 0.1,
            rewire: true,
            use_regional_opt: true,
            regional_attempts_per_iter: 3,
            allow_close_goal: false,
            close_goal_tolerance: 1.0,
            stop_after_first_traj_found: false,
            test_convergency: false,
            tree_node_nums: 10_000,
            seed: 0,
        }
    }
}

/// Axis-aligned sampling volume.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct WorldConfig {
    pub lower: Vector3<f64>,
    pub upper: Vector3<f64>,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            lower: Vector3::new(-20.0, -20.0, -5.0),
            upper: Vector3::new(20.0, 20.0, 5.0),
        }
    }
}

/// Rejected configurations, surfaced at planner construction.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("rho must be positive, got {0}")]
    NonPositiveRho(f64),
    #[error("dynamic limit must be positive: {0}")]
    NonPositiveLimit(&'static str),
    #[error("v_mag_sample {0} exceeds vel_limit {1}")]
    SampleSpeedAboveLimit(f64, f64),
    #[error("neighborhood cost cap must be positive: {0}")]
    NonPositiveRadiusCost(&'static str),
    #[error("goal_bias must lie in [0, 1), got {0}")]
    GoalBiasOutOfRange(f64),
    #[error("close_goal_tolerance must be positive, got {0}")]
    NonPositiveTolerance(f64),
    #[error("tree_node_nums must be at least 2, got {0}")]
    PoolTooSmall(usize),
    #[error("world lower bound must be below upper bound on every axis")]
    EmptyWorld,
}

impl PlannerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.search.rho <= 0.0 {
            return Err(ConfigError::NonPositiveRho(self.search.rho));
        }
        for (name, v) in [
            ("v_mag_sample", self.limits.v_mag_sample),
            ("vel_limit", self.limits.vel_limit),
            ("acc_limit", self.limits.acc_limit),
            ("jerk_limit", self.limits.jerk_limit),
        ] {
            if v <= 0.0 {
                return Err(ConfigError::NonPositiveLimit(name));
            }
        }
        if self.limits.v_mag_sample > self.limits.vel_limit {
            return Err(ConfigError::SampleSpeedAboveLimit(
                self.limits.v_mag_sample,
                self.limits.vel_limit,
            ));
        }
        if self.search.radius_cost_between_two_states <= 0.0 {
            return Err(ConfigError::NonPositiveRadiusCost(
                "radius_cost_between_two_states",
            ));
        }
        if self.search.bridge_radius_cost <= 0.0 {
            return Err(ConfigError::NonPositiveRadiusCost("bridge_radius_cost"));
        }
        if !(0.0..1.0).contains(&self.search.goal_bias) {
            return Err(ConfigError::GoalBiasOutOfRange(self.search.goal_bias));
        }
        if self.search.close_goal_tolerance <= 0.0 {
            return Err(ConfigError::NonPositiveTolerance(
                self.search.close_goal_tolerance,
            ));
        }
        if self.search.tree_node_nums < 2 {
            return Err(ConfigError::PoolTooSmall(self.search.tree_node_nums));
        }
        if self.world.lower.x >= self.world.upper.x
            || self.world.lower.y >= self.world.upper.y
            || self.world.lower.z >= self.world.upper.z
        {
            return Err(ConfigError::EmptyWorld);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(PlannerConfig::default().validate().is_ok());
    }

    #[test]
    fn test_rejects_bad_rho() {
        let mut cfg = PlannerConfig::default();
        cfg.search.rho = 0.0;
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::NonPositiveRho(_))
        ));
    }

    #[test]
    fn test_rejects_fast_samples() {
        let mut cfg = PlannerConfig::default();
        cfg.limits.v_mag_sample = 10.0;
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::SampleSpeedAboveLimit(_, _))
        ));
    }

    #[test]
    fn test_rejects_tiny_pool() {
        let mut cfg = PlannerConfig::default();
        cfg.search.tree_node_nums = 1;
        assert!(matches!(cfg.validate(), Err(ConfigError::PoolTooSmall(1))));
    }

    #[test]
    fn test_rejects_inverted_world() {
        let mut cfg = PlannerConfig::default();
        cfg.world.upper.z = cfg.world.lower.z;
        assert!(matches!(cfg.validate(), Err(ConfigError::EmptyWorld)));
    }
}
