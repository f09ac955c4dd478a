//! Canned planning worlds.
//!
//! Small, fully specified environments used by the integration tests and
//! the demo binaries: an empty corridor, a single blocking wall, and a wall
//! pierced by a narrow slot that only regional repair threads reliably.

use std::sync::Arc;

use nalgebra::Vector3;

use kinoplan_core::{StatePVA, VoxelGrid};

use crate::config::PlannerConfig;
use crate::poly_opt::CorridorFitOptimizer;
use crate::pos_check::GridChecker;
use crate::search::GridSearcher;

/// Collision-check stepping used by every scenario [s].
pub const CHECK_DT: f64 = 0.02;

#[derive(Debug, Clone)]
pub struct Scenario {
    pub grid: Arc<VoxelGrid>,
    pub start: StatePVA,
    pub goal: StatePVA,
    pub config: PlannerConfig,
}

impl Scenario {
    pub fn checker(&self) -> Arc<GridChecker> {
        Arc::new(GridChecker::new(self.grid.clone(), CHECK_DT))
    }

    pub fn searcher(&self, clearance_cells: usize) -> Arc<GridSearcher> {
        Arc::new(GridSearcher::new(self.grid.clone()).with_clearance(clearance_cells))
    }

    pub fn optimizer(&self) -> Arc<CorridorFitOptimizer> {
        Arc::new(CorridorFitOptimizer::default())
    }
}

fn base_config(grid: &VoxelGrid) -> PlannerConfig {
    let mut config = PlannerConfig::default();
    config.world.lower = grid.lower();
    config.world.upper = grid.upper();
    config
}

/// Flat 10 m hop with nothing in the way.
pub fn empty_world() -> Scenario {
    let grid = Arc::new(VoxelGrid::new(
        Vector3::new(-2.0, -6.0, -3.0),
        Vector3::new(14.0, 6.0, 3.0),
        0.2,
    ));
    let config = base_config(&grid);
    Scenario {
        start: StatePVA::at_rest(Vector3::new(0.0, 0.0, 0.0)),
        goal: StatePVA::at_rest(Vector3::new(10.0, 0.0, 0.0)),
        config,
        grid,
    }
}

/// A 3×3×3 m box centered on the straight line at x = 5.
pub fn single_wall() -> Scenario {
    let mut grid = VoxelGrid::new(
        Vector3::new(-2.0, -6.0, -3.0),
        Vector3::new(14.0, 6.0, 3.0),
        0.2,
    );
    grid.set_box(
        Vector3::new(3.5, -1.5, -1.5),
        Vector3::new(6.5, 1.5, 1.5),
        true,
    );
    let grid = Arc::new(grid);
    let config = base_config(&grid);
    Scenario {
        start: StatePVA::at_rest(Vector3::new(0.0, 0.0, 0.0)),
        goal: StatePVA::at_rest(Vector3::new(10.0, 0.0, 0.0)),
        config,
        grid,
    }
}

/// A thin wall closing the whole cross-section except a 0.5 m slot at
/// (5, 2, 0), off the straight line.
///
/// The grid is fine enough (0.125 m) that a one-cell clearance corridor
/// still fits through the slot, and the dynamic limits leave room for the
/// sharper maneuver the slot demands.
pub fn narrow_slot() -> Scenario {
    let mut grid = VoxelGrid::new(
        Vector3::new(-2.0, -4.0, -1.5),
        Vector3::new(12.0, 4.0, 1.5),
        0.125,
    );
    grid.set_box(
        Vector3::new(4.75, -4.0, -1.5),
        Vector3::new(5.25, 4.0, 1.5),
        true,
    );
    grid.set_box(
        Vector3::new(4.75, 1.75, -0.25),
        Vector3::new(5.25, 2.25, 0.25),
        false,
    );
    let grid = Arc::new(grid);
    let mut config = base_config(&grid);
    config.limits.v_mag_sample = 2.5;
    config.limits.vel_limit = 5.0;
    config.limits.acc_limit = 8.0;
    config.limits.jerk_limit = 60.0;
    Scenario {
        start: StatePVA::at_rest(Vector3::new(0.0, 0.0, 0.0)),
        goal: StatePVA::at_rest(Vector3::new(10.0, 0.0, 0.0)),
        config,
        grid,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scenario_configs_validate() {
        for scenario in [empty_world(), single_wall(), narrow_slot()] {
            assert!(scenario.config.validate().is_ok());
            assert!(scenario.grid.is_free(&scenario.start.pos));
            assert!(scenario.grid.is_free(&scenario.goal.pos));
        }
    }

    #[test]
    fn test_single_wall_blocks_straight_line() {
        let scenario = single_wall();
        assert!(!scenario.grid.is_free(&Vector3::new(5.0, 0.0, 0.0)));
    }

    #[test]
    fn test_narrow_slot_is_open() {
        let scenario = narrow_slot();
        assert!(!scenario.grid.is_free(&Vector3::new(5.0, 0.0, 0.0)));
        assert!(scenario.grid.is_free(&Vector3::new(5.0, 2.0, 0.0)));
    }
}
