//! Polynomial trajectory segment.

use nalgebra::{Matrix3xX, Vector3};

use crate::math;
use crate::state::StatePVA;

/// A single polynomial segment with fixed duration.
///
/// Row `i` of the coefficient matrix holds the polynomial for axis `i` in
/// ascending powers of `t`: column `j` multiplies `t^j`. The segment is
/// defined on `t ∈ [0, duration]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Piece {
    coeffs: Matrix3xX<f64>,
    duration: f64,
}

impl Piece {
    pub fn new(coeffs: Matrix3xX<f64>, duration: f64) -> Self {
        Self { coeffs, duration }
    }

    pub fn duration(&self) -> f64 {
        self.duration
    }

    /// Polynomial degree per axis.
    pub fn degree(&self) -> usize {
        self.coeffs.ncols().saturating_sub(1)
    }

    pub fn coeffs(&self) -> &Matrix3xX<f64> {
        &self.coeffs
    }

    fn axis(&self, i: usize) -> Vec<f64> {
        self.coeffs.row(i).iter().copied().collect()
    }

    fn eval(&self, t: f64, order: u32) -> Vector3<f64> {
        let mut out = Vector3::zeros();
        for i in 0..3 {
            let mut v = 0.0;
            for j in (order as usize..self.coeffs.ncols()).rev() {
                let mut fac = 1.0;
                for d in 0..order as usize {
                    fac *= (j - d) as f64;
                }
                v = v * t + fac * self.coeffs[(i, j)];
            }
            out[i] = v;
        }
        out
    }

    pub fn pos(&self, t: f64) -> Vector3<f64> {
        self.eval(t, 0)
    }

    pub fn vel(&self, t: f64) -> Vector3<f64> {
        self.eval(t, 1)
    }

    pub fn acc(&self, t: f64) -> Vector3<f64> {
        self.eval(t, 2)
    }

    pub fn jerk(&self, t: f64) -> Vector3<f64> {
        self.eval(t, 3)
    }

    pub fn state(&self, t: f64) -> StatePVA {
        StatePVA::new(self.pos(t), self.vel(t), self.acc(t))
    }

    /// Boundary state at `t = 0`.
    pub fn head(&self) -> StatePVA {
        self.state(0.0)
    }

    /// Boundary state at `t = duration`.
    pub fn tail(&self) -> StatePVA {
        self.state(self.duration)
    }

    /// Largest per-axis |velocity| over the whole segment.
    pub fn max_vel_rate(&self) -> f64 {
        self.max_abs_derivative(1)
    }

    /// Largest per-axis |acceleration| over the whole segment.
    pub fn max_acc_rate(&self) -> f64 {
        self.max_abs_derivative(2)
    }

    /// Largest per-axis |jerk| over the whole segment.
    pub fn max_jerk_rate(&self) -> f64 {
        self.max_abs_derivative(3)
    }

    /// `∫₀^τ ‖jerk‖² dt`, the control-effort part of the edge cost.
    pub fn jerk_energy(&self) -> f64 {
        self.derivative_energy(3)
    }

    /// `∫₀^τ ‖acc‖² dt`.
    pub fn acc_energy(&self) -> f64 {
        self.derivative_energy(2)
    }

    fn derivative_energy(&self, order: u32) -> f64 {
        let mut total = 0.0;
        for i in 0..3 {
            let mut c = self.axis(i);
            for _ in 0..order {
                c = math::polyder(&c);
            }
            total += math::poly_sq_integral(&c, self.duration);
        }
        total
    }

    /// Extrema of each axis polynomial are found from the real roots of the
    /// next derivative, so the bound is exact rather than sampled.
    fn max_abs_derivative(&self, order: u32) -> f64 {
        let mut worst = 0.0f64;
        for i in 0..3 {
            let mut c = self.axis(i);
            for _ in 0..order {
                c = math::polyder(&c);
            }
            worst = worst.max(math::polyval(&c, 0.0).abs());
            worst = worst.max(math::polyval(&c, self.duration).abs());
            for t in math::real_roots_in(&math::polyder(&c), 0.0, self.duration) {
                worst = worst.max(math::polyval(&c, t).abs());
            }
        }
        worst
    }
}
