//! Piecewise-polynomial trajectory.

use serde::{Deserialize, Serialize};

use crate::piece::Piece;
use crate::state::StatePVA;

/// An ordered sequence of [`Piece`]s with C²-continuous joins.
///
/// The state at the end of piece `i` equals the state at the start of
/// piece `i + 1`; the planner guarantees this by construction.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Trajectory {
    pieces: Vec<Piece>,
}

/// Aggregate figures for a finished trajectory.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrajStats {
    /// Total duration [s]
    pub duration: f64,
    /// Arc length [m]
    pub length: f64,
    /// Number of polynomial segments
    pub segments: usize,
    /// `∫ ‖acc‖² dt` over the whole trajectory
    pub acc_integral: f64,
    /// `∫ ‖jerk‖² dt` over the whole trajectory
    pub jerk_integral: f64,
}

impl Trajectory {
    pub fn new(pieces: Vec<Piece>) -> Self {
        Self { pieces }
    }

    /// A trajectory with no pieces and zero duration.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.pieces.is_empty()
    }

    pub fn len(&self) -> usize {
        self.pieces.len()
    }

    pub fn pieces(&self) -> &[Piece] {
        &self.pieces
    }

    pub fn push(&mut self, piece: Piece) {
        self.pieces.push(piece);
    }

    pub fn duration(&self) -> f64 {
        self.pieces.iter().map(Piece::duration).sum()
    }

    /// State at global time `t`, clamped to `[0, duration]`.
    ///
    /// Returns `None` for an empty trajectory.
    pub fn state_at(&self, t: f64) -> Option<StatePVA> {
        let (piece, local) = self.locate(t)?;
        Some(piece.state(local))
    }

    /// Position at global time `t`, clamped to `[0, duration]`.
    pub fn pos_at(&self, t: f64) -> Option<nalgebra::Vector3<f64>> {
        let (piece, local) = self.locate(t)?;
        Some(piece.pos(local))
    }

    fn locate(&self, t: f64) -> Option<(&Piece, f64)> {
        let last = self.pieces.last()?;
        let mut remaining = t.max(0.0);
        for piece in &self.pieces {
            if remaining <= piece.duration() {
                return Some((piece, remaining));
            }
            remaining -= piece.duration();
        }
        Some((last, last.duration()))
    }

    /// States sampled every `dt` seconds, always including the final state.
    pub fn sample(&self, dt: f64) -> Vec<StatePVA> {
        let total = self.duration();
        if self.is_empty() || dt <= 0.0 {
            return Vec::new();
        }
        let steps = (total / dt).ceil() as usize;
        let mut out = Vec::with_capacity(steps + 1);
        for i in 0..=steps {
            let t = (i as f64 * dt).min(total);
            if let Some(s) = self.state_at(t) {
                out.push(s);
            }
        }
        out
    }

    /// Duration, arc length, segment count and control integrals.
    pub fn stats(&self) -> TrajStats {
        let duration = self.duration();
        let mut length = 0.0;
        for piece in &self.pieces {
            // trapezoid on |v| over a fixed subdivision per piece
            let n = 100;
            let h = piece.duration() / n as f64;
            for i in 0..n {
                let v0 = piece.vel(i as f64 * h).norm();
                let v1 = piece.vel((i + 1) as f64 * h).norm();
                length += 0.5 * (v0 + v1) * h;
            }
        }
        TrajStats {
            duration,
            length,
            segments: self.pieces.len(),
            acc_integral: self.pieces.iter().map(Piece::acc_energy).sum(),
            jerk_integral: self.pieces.iter().map(Piece::jerk_energy).sum(),
        }
    }

    /// Control-effort + time cost of the whole trajectory.
    pub fn cost(&self, rho: f64) -> f64 {
        rho * self.duration() + self.pieces.iter().map(Piece::jerk_energy).sum::<f64>()
    }
}
