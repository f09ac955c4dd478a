//! Collaborator contracts.
//!
//! The planner core depends on an environment through these traits; the
//! bundled grid-backed implementations live in [`crate::pos_check`],
//! [`crate::search`] and [`crate::poly_opt`], but any conforming
//! implementation can be bound at init time.

use nalgebra::Vector3;

use kinoplan_core::{Piece, StatePVA, Trajectory};

/// Outcome of checking a segment against the environment.
#[derive(Debug, Clone, PartialEq)]
pub enum CheckResult {
    Clear,
    /// First entry and last exit of the occupied region along the segment,
    /// as times into the piece and world-space points.
    Collides {
        t_first: f64,
        t_last: f64,
        p_first: Vector3<f64>,
        p_last: Vector3<f64>,
    },
}

impl CheckResult {
    pub fn is_clear(&self) -> bool {
        matches!(self, CheckResult::Clear)
    }
}

/// Collision oracle over positions and segments.
pub trait PositionChecker {
    /// True when the position lies in free space.
    fn check_state(&self, pos: &Vector3<f64>) -> bool;

    /// Check the whole segment over `[0, duration]`.
    fn check_piece(&self, piece: &Piece) -> CheckResult;
}

/// Supplies an obstacle-free corridor of waypoints between two points.
///
/// Deterministic for a fixed environment.
pub trait GridPathSearcher {
    fn search(&self, from: &Vector3<f64>, to: &Vector3<f64>) -> Option<Vec<Vector3<f64>>>;
}

/// Reshapes a segment through a corridor.
///
/// The returned piece must span the same duration as `original` and match
/// its boundary states at `t = 0` and `t = τ`; the corridor waypoints are
/// to be honored inside the `window` sub-interval.
pub trait PolynomialOptimizer {
    fn optimize(
        &self,
        original: &Piece,
        waypoints: &[Vector3<f64>],
        window: (f64, f64),
    ) -> Option<Piece>;
}

/// Diagnostic sink; nothing returned from it affects planning.
pub trait Visualizer {
    fn edge(&self, _from: &StatePVA, _to: &StatePVA) {}
    fn trajectory(&self, _traj: &Trajectory) {}
}

/// Discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullVisualizer;

impl Visualizer for NullVisualizer {}
