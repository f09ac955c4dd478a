//! Two-point boundary-value solver.
//!
//! Closed-form optimal connection between two full states of the
//! jerk-controlled triple integrator, minimizing `ρτ + ∫‖u‖²` with both
//! endpoints fixed and the duration free.
//!
//! For a fixed duration τ the per-axis optimum is the quintic
//!
//! ```text
//! p(t) = α/120·t⁵ + β/24·t⁴ + γ/6·t³ + a₀/2·t² + v₀·t + p₀
//! ```
//!
//! and the effort integral collapses to `q(τ)/τ⁵` with `q` an explicit
//! quartic in τ. Setting `dJ/dτ = 0` and clearing denominators leaves a
//! degree-6 polynomial; the smallest positive real root is the optimal
//! duration (the cost decreases toward it from the left and increases past
//! it, so the first stationary point is a minimum).

use nalgebra::Matrix3xX;

use kinoplan_core::{math, Piece, StatePVA};

/// Solved connection: duration, cost and the segment itself.
#[derive(Debug, Clone)]
pub struct BvpSolution {
    pub tau: f64,
    pub cost: f64,
    pub piece: Piece,
}

#[derive(Debug, Clone, Copy)]
pub struct BvpSolver {
    rho: f64,
}

impl BvpSolver {
    pub fn new(rho: f64) -> Self {
        Self { rho }
    }

    pub fn rho(&self) -> f64 {
        self.rho
    }

    /// Optimal connection from `x0` to `x1`, or `None` when no positive
    /// stationary duration exists (the edge is then simply infeasible).
    pub fn solve(&self, x0: &StatePVA, x1: &StatePVA) -> Option<BvpSolution> {
        let d = cost_numerator(x0, x1);
        // ρτ⁶ − d₄τ⁴ − 2d₃τ³ − 3d₂τ² − 4d₁τ − 5d₀ = 0, ascending coefficients
        let stationarity = [
            -5.0 * d[0],
            -4.0 * d[1],
            -3.0 * d[2],
            -2.0 * d[3],
            -d[4],
            0.0,
            self.rho,
        ];
        let tau = math::real_roots(&stationarity)
            .into_iter()
            .filter(|r| *r > 1e-9)
            .fold(f64::INFINITY, f64::min);
        if !tau.is_finite() {
            return None;
        }
        let cost = self.rho * tau + math::polyval(&d, tau) / tau.powi(5);
        let piece = piece_for_tau(x0, x1, tau);
        Some(BvpSolution { tau, cost, piece })
    }

    /// Cost of the fixed-duration optimal connection.
    pub fn cost_for_tau(&self, x0: &StatePVA, x1: &StatePVA, tau: f64) -> f64 {
        let d = cost_numerator(x0, x1);
        self.rho * tau + math::polyval(&d, tau) / tau.powi(5)
    }

    /// Largest position displacement any trajectory of cost at most `cost`
    /// can achieve on one axis: with effort budget `E = cost − ρτ` and free
    /// terminal velocity/acceleration the reach in time τ is
    /// `√(E·τ⁵/20)`, maximized at `τ = 5·cost/(6ρ)`.
    pub fn forward_radius(&self, cost: f64) -> f64 {
        let tau = 5.0 * cost / (6.0 * self.rho);
        ((cost - self.rho * tau) * tau.powi(5) / 20.0).sqrt()
    }

    /// Same bound for the goal-rooted tree; the reachable position set of
    /// the triple integrator is symmetric under time reversal.
    pub fn backward_radius(&self, cost: f64) -> f64 {
        self.forward_radius(cost)
    }
}

/// Coefficients of the quartic `Σ_axis q_axis(τ)` whose value over τ⁵ is the
/// effort integral of the fixed-duration optimum.
fn cost_numerator(x0: &StatePVA, x1: &StatePVA) -> [f64; 5] {
    let mut d = [0.0; 5];
    for i in 0..3 {
        let q = axis_quartic(
            x0.pos[i], x0.vel[i], x0.acc[i], x1.pos[i], x1.vel[i], x1.acc[i],
        );
        for (dst, src) in d.iter_mut().zip(q) {
            *dst += src;
        }
    }
    d
}

fn axis_quartic(p0: f64, v0: f64, a0: f64, p1: f64, v1: f64, a1: f64) -> [f64; 5] {
    let dp = p1 - p0;
    // numerators of α·τ⁵, β·τ⁴, γ·τ³ as quadratics in τ
    let qa = [720.0 * dp, -360.0 * (v0 + v1), 60.0 * (a1 - a0)];
    let qb = [
        -360.0 * dp,
        192.0 * v0 + 168.0 * v1,
        36.0 * a0 - 24.0 * a1,
    ];
    let qc = [60.0 * dp, -(36.0 * v0 + 24.0 * v1), 3.0 * a1 - 9.0 * a0];

    // q = qc² + qb·qc + (qb² + qa·qc)/3 + qa·qb/4 + qa²/20
    let mut q = [0.0; 5];
    accumulate(&mut q, &quad_mul(&qc, &qc), 1.0);
    accumulate(&mut q, &quad_mul(&qb, &qc), 1.0);
    accumulate(&mut q, &quad_mul(&qb, &qb), 1.0 / 3.0);
    accumulate(&mut q, &quad_mul(&qa, &qc), 1.0 / 3.0);
    accumulate(&mut q, &quad_mul(&qa, &qb), 1.0 / 4.0);
    accumulate(&mut q, &quad_mul(&qa, &qa), 1.0 / 20.0);
    q
}

fn quad_mul(a: &[f64; 3], b: &[f64; 3]) -> [f64; 5] {
    [
        a[0] * b[0],
        a[0] * b[1] + a[1] * b[0],
        a[0] * b[2] + a[1] * b[1] + a[2] * b[0],
        a[1] * b[2] + a[2] * b[1],
        a[2] * b[2],
    ]
}

fn accumulate(dst: &mut [f64; 5], src: &[f64; 5], scale: f64) {
    for (d, s) in dst.iter_mut().zip(src) {
        *d += s * scale;
    }
}

/// The fixed-duration optimal quintic from `x0` to `x1`.
fn piece_for_tau(x0: &StatePVA, x1: &StatePVA, tau: f64) -> Piece {
    let t = tau;
    let t2 = t * t;
    let t3 = t2 * t;
    let t4 = t3 * t;
    let t5 = t4 * t;
    let mut coeffs = Matrix3xX::zeros(6);
    for i in 0..3 {
        let (p0, v0, a0) = (x0.pos[i], x0.vel[i], x0.acc[i]);
        let (p1, v1, a1) = (x1.pos[i], x1.vel[i], x1.acc[i]);
        let dp = p1 - p0 - v0 * t - 0.5 * a0 * t2;
        let dv = v1 - v0 - a0 * t;
        let da = a1 - a0;
        let alpha = (720.0 * dp - 360.0 * t * dv + 60.0 * t2 * da) / t5;
        let beta = (-360.0 * t * dp + 168.0 * t2 * dv - 24.0 * t3 * da) / t5;
        let gamma = (60.0 * t2 * dp - 24.0 * t3 * dv + 3.0 * t4 * da) / t5;
        coeffs[(i, 0)] = p0;
        coeffs[(i, 1)] = v0;
        coeffs[(i, 2)] = a0 / 2.0;
        coeffs[(i, 3)] = gamma / 6.0;
        coeffs[(i, 4)] = beta / 24.0;
        coeffs[(i, 5)] = alpha / 120.0;
    }
    Piece::new(coeffs, tau)
}
