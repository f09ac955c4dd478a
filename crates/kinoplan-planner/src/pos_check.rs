//! Grid-backed collision checking.

use std::sync::Arc;

use nalgebra::Vector3;

use kinoplan_core::{Piece, VoxelGrid};

use crate::interfaces::{CheckResult, PositionChecker};

/// [`PositionChecker`] over a [`VoxelGrid`].
///
/// Pieces are checked by stepping the polynomial at a fixed time
/// resolution; the first and last occupied samples delimit the collision
/// interval handed to the regional repair.
#[derive(Debug, Clone)]
pub struct GridChecker {
    grid: Arc<VoxelGrid>,
    dt: f64,
}

impl GridChecker {
    pub fn new(grid: Arc<VoxelGrid>, dt: f64) -> Self {
        Self { grid, dt }
    }

    pub fn grid(&self) -> &VoxelGrid {
        &self.grid
    }
}

impl PositionChecker for GridChecker {
    fn check_state(&self, pos: &Vector3<f64>) -> bool {
        self.grid.is_free(pos)
    }

    fn check_piece(&self, piece: &Piece) -> CheckResult {
        let tau = piece.duration();
        let steps = ((tau / self.dt).ceil() as usize).max(2);
        let mut first: Option<(f64, Vector3<f64>)> = None;
        let mut last: Option<(f64, Vector3<f64>)> = None;
        for i in 0..=steps {
            let t = tau * i as f64 / steps as f64;
            let p = piece.pos(t);
            if !self.grid.is_free(&p) {
                if first.is_none() {
                    first = Some((t, p));
                }
                last = Some((t, p));
            }
        }
        match (first, last) {
            (Some((t_first, p_first)), Some((t_last, p_last))) => CheckResult::Collides {
                t_first,
                t_last,
                p_first,
                p_last,
            },
            _ => CheckResult::Clear,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::Matrix3xX;

    fn walled_grid() -> Arc<VoxelGrid> {
        let mut g = VoxelGrid::new(
            Vector3::new(-1.0, -5.0, -5.0),
            Vector3::new(11.0, 5.0, 5.0),
            0.2,
        );
        g.set_box(
            Vector3::new(4.0, -5.0, -5.0),
            Vector3::new(6.0, 5.0, 5.0),
            true,
        );
        Arc::new(g)
    }

    /// x sweeps 0 → 10 over one second through the wall at x ∈ [4, 6].
    fn crossing_piece() -> Piece {
        let mut coeffs = Matrix3xX::zeros(2);
        coeffs[(0, 1)] = 10.0;
        Piece::new(coeffs, 1.0)
    }

    #[test]
    fn test_check_state() {
        let checker = GridChecker::new(walled_grid(), 0.01);
        assert!(checker.check_state(&Vector3::new(0.0, 0.0, 0.0)));
        assert!(!checker.check_state(&Vector3::new(5.0, 0.0, 0.0)));
        // outside the grid counts as occupied
        assert!(!checker.check_state(&Vector3::new(100.0, 0.0, 0.0)));
    }

    #[test]
    fn test_collision_interval() {
        let checker = GridChecker::new(walled_grid(), 0.01);
        match checker.check_piece(&crossing_piece()) {
            CheckResult::Collides {
                t_first,
                t_last,
                p_first,
                p_last,
            } => {
                assert_relative_eq!(t_first, 0.4, epsilon = 0.02);
                assert_relative_eq!(t_last, 0.6, epsilon = 0.02);
                assert_relative_eq!(p_first.x, 4.0, epsilon = 0.2);
                assert_relative_eq!(p_last.x, 6.0, epsilon = 0.2);
            }
            CheckResult::Clear => panic!("expected a collision"),
        }
    }

    #[test]
    fn test_clear_piece() {
        let checker = GridChecker::new(walled_grid(), 0.01);
        // y sweep at x = 0 stays in free space
        let mut coeffs = Matrix3xX::zeros(2);
        coeffs[(1, 1)] = 4.0;
        let piece = Piece::new(coeffs, 1.0);
        assert!(checker.check_piece(&piece).is_clear());
    }
}
