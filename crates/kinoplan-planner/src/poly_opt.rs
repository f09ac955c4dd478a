//! Corridor-fitting polynomial optimizer.
//!
//! Replaces a colliding segment with a single higher-degree polynomial that
//! keeps the original boundary states and duration while interpolating a
//! handful of corridor waypoints. Only the middle of the corridor is pinned
//! (its ends hug the obstacle surface where the collision was detected),
//! and the pin times are spread over a widened copy of the collision window
//! so the detour gets enough time to stay dynamically feasible. The fit is
//! a dense linear solve per axis in normalized time.

use nalgebra::{DMatrix, DVector, Matrix3xX, Vector3};

use kinoplan_core::Piece;

use crate::interfaces::PolynomialOptimizer;

#[derive(Debug, Clone, Copy)]
pub struct CorridorFitOptimizer {
    max_waypoints: usize,
}

impl Default for CorridorFitOptimizer {
    // odd count, so the corridor midpoint is always pinned
    fn default() -> Self {
        Self { max_waypoints: 5 }
    }
}

impl CorridorFitOptimizer {
    pub fn new(max_waypoints: usize) -> Self {
        Self {
            max_waypoints: max_waypoints.max(1),
        }
    }
}

/// The middle portion of the corridor, evenly subsampled to at most `k`
/// points. The leading and trailing quarters sit against the obstacle and
/// are dropped.
fn pick_waypoints(waypoints: &[Vector3<f64>], k: usize) -> Vec<Vector3<f64>> {
    let len = waypoints.len();
    let inner = &waypoints[len / 4..len - len / 4];
    if inner.len() <= k {
        return inner.to_vec();
    }
    (0..k)
        .map(|i| {
            let f = (i as f64 + 0.5) / k as f64;
            inner[(f * inner.len() as f64) as usize]
        })
        .collect()
}

impl PolynomialOptimizer for CorridorFitOptimizer {
    fn optimize(
        &self,
        original: &Piece,
        waypoints: &[Vector3<f64>],
        window: (f64, f64),
    ) -> Option<Piece> {
        let tau = original.duration();
        let (t_s, t_e) = window;
        if waypoints.is_empty() || !(0.0..=tau).contains(&t_s) || t_e <= t_s || t_e > tau {
            return None;
        }
        let wp = pick_waypoints(waypoints, self.max_waypoints);
        if wp.is_empty() {
            return None;
        }
        let k = wp.len();
        let n = 6 + k;

        // widened pin window; thin obstacles produce collision intervals far
        // too short for the detour, so a floor relative to τ applies
        let half = (1.5 * (t_e - t_s)).max(0.25 * tau);
        let t_lo = (t_s - half).max(0.08 * tau);
        let t_hi = (t_e + half).min(0.92 * tau);
        if t_hi <= t_lo {
            return None;
        }
        let s_wp: Vec<f64> = (0..k)
            .map(|i| {
                let t = t_lo + (i as f64 + 1.0) / (k as f64 + 1.0) * (t_hi - t_lo);
                t / tau
            })
            .collect();

        let mut a = DMatrix::zeros(n, n);
        for j in 0..n {
            let jf = j as f64;
            // boundary rows at s = 0
            a[(0, j)] = if j == 0 { 1.0 } else { 0.0 };
            a[(1, j)] = if j == 1 { 1.0 } else { 0.0 };
            a[(2, j)] = if j == 2 { 2.0 } else { 0.0 };
            // boundary rows at s = 1
            a[(3, j)] = 1.0;
            a[(4, j)] = jf;
            a[(5, j)] = jf * (jf - 1.0);
            for (w, &s) in s_wp.iter().enumerate() {
                a[(6 + w, j)] = s.powi(j as i32);
            }
        }
        let lu = a.lu();

        let head = original.head();
        let tail = original.tail();
        let mut coeffs = Matrix3xX::zeros(n);
        for axis in 0..3 {
            let mut rhs = DVector::zeros(n);
            rhs[0] = head.pos[axis];
            rhs[1] = head.vel[axis] * tau;
            rhs[2] = head.acc[axis] * tau * tau;
            rhs[3] = tail.pos[axis];
            rhs[4] = tail.vel[axis] * tau;
            rhs[5] = tail.acc[axis] * tau * tau;
            for (w, p) in wp.iter().enumerate() {
                rhs[6 + w] = p[axis];
            }
            let b = lu.solve(&rhs)?;
            // back to unnormalized time
            for j in 0..n {
                coeffs[(axis, j)] = b[j] / tau.powi(j as i32);
            }
        }
        Some(Piece::new(coeffs, tau))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use kinoplan_core::StatePVA;
    use nalgebra::Vector3;

    use crate::bvp::BvpSolver;

    fn base_piece() -> Piece {
        let solver = BvpSolver::new(1.0);
        let x0 = StatePVA::at_rest(Vector3::new(0.0, 0.0, 0.0));
        let x1 = StatePVA::at_rest(Vector3::new(10.0, 0.0, 0.0));
        solver.solve(&x0, &x1).unwrap().piece
    }

    /// Distance from the repaired curve to `p`, minimized over a dense
    /// time sweep.
    fn min_distance(piece: &Piece, p: &Vector3<f64>) -> f64 {
        (0..=1000)
            .map(|i| {
                let t = piece.duration() * i as f64 / 1000.0;
                (piece.pos(t) - p).norm()
            })
            .fold(f64::INFINITY, f64::min)
    }

    #[test]
    fn test_preserves_boundary_and_duration() {
        let original = base_piece();
        let tau = original.duration();
        let waypoints = vec![
            Vector3::new(4.0, 1.5, 0.0),
            Vector3::new(4.5, 1.8, 0.0),
            Vector3::new(5.0, 2.0, 0.0),
            Vector3::new(5.5, 1.8, 0.0),
            Vector3::new(6.0, 1.5, 0.0),
        ];
        let opt = CorridorFitOptimizer::default();
        let repaired = opt
            .optimize(&original, &waypoints, (0.4 * tau, 0.6 * tau))
            .unwrap();
        assert_relative_eq!(repaired.duration(), tau);
        assert!(repaired.head().close_to(&original.head(), 1e-6));
        assert!(repaired.tail().close_to(&original.tail(), 1e-6));
    }

    #[test]
    fn test_passes_near_corridor_apex() {
        let original = base_piece();
        let tau = original.duration();
        // corridor arching over y = 2; the middle point must be visited
        let waypoints: Vec<_> = (0..=20)
            .map(|i| {
                let f = i as f64 / 20.0;
                Vector3::new(
                    4.0 + 2.0 * f,
                    2.0 * (std::f64::consts::PI * f).sin().max(0.3),
                    0.0,
                )
            })
            .collect();
        let opt = CorridorFitOptimizer::default();
        let repaired = opt
            .optimize(&original, &waypoints, (0.4 * tau, 0.6 * tau))
            .unwrap();
        let apex = Vector3::new(5.0, 2.0, 0.0);
        assert!(min_distance(&repaired, &apex) < 0.3);
    }

    #[test]
    fn test_degree_stays_bounded() {
        let original = base_piece();
        let tau = original.duration();
        let waypoints: Vec<_> = (0..40)
            .map(|i| Vector3::new(4.0 + 0.05 * i as f64, 1.0, 0.0))
            .collect();
        let opt = CorridorFitOptimizer::default();
        let repaired = opt
            .optimize(&original, &waypoints, (0.3 * tau, 0.7 * tau))
            .unwrap();
        assert!(repaired.degree() <= 10);
    }

    #[test]
    fn test_rejects_bad_window() {
        let original = base_piece();
        let tau = original.duration();
        let waypoints = vec![Vector3::new(5.0, 2.0, 0.0)];
        let opt = CorridorFitOptimizer::default();
        assert!(opt
            .optimize(&original, &waypoints, (0.7 * tau, 0.3 * tau))
            .is_none());
        assert!(opt.optimize(&original, &[], (0.3 * tau, 0.7 * tau)).is_none());
    }
}
