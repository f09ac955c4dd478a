//! Vehicle state representation.

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

/// Full kinodynamic state of the point-mass vehicle.
///
/// Nine real numbers: position, velocity and acceleration, one 3-vector
/// each. Position is what spatial indices key on; velocity and
/// acceleration enter boundary-value costs and reachability radii.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StatePVA {
    /// Position [m] (world frame)
    pub pos: Vector3<f64>,
    /// Velocity [m/s]
    pub vel: Vector3<f64>,
    /// Acceleration [m/s²]
    pub acc: Vector3<f64>,
}

impl StatePVA {
    pub fn new(pos: Vector3<f64>, vel: Vector3<f64>, acc: Vector3<f64>) -> Self {
        Self { pos, vel, acc }
    }

    /// State at a fixed position with zero velocity and acceleration.
    pub fn at_rest(pos: Vector3<f64>) -> Self {
        Self {
            pos,
            vel: Vector3::zeros(),
            acc: Vector3::zeros(),
        }
    }

    pub fn zeros() -> Self {
        Self::at_rest(Vector3::zeros())
    }

    /// True when every component of every block is within `tol` of `other`.
    pub fn close_to(&self, other: &Self, tol: f64) -> bool {
        (self.pos - other.pos).amax() <= tol
            && (self.vel - other.vel).amax() <= tol
            && (self.acc - other.acc).amax() <= tol
    }
}
