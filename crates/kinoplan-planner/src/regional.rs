//! Regional trajectory repair.
//!
//! A candidate edge that collides is not discarded outright: the collision
//! interval is bridged by a corridor of free cells from the grid searcher,
//! and the polynomial optimizer reshapes the segment through that corridor
//! with duration and boundary states held fixed. Candidates are tried in
//! ascending order of their would-be path cost.

use std::cmp::Ordering;

use nalgebra::Vector3;

use kinoplan_core::Piece;

use crate::config::DynamicLimits;
use crate::interfaces::{GridPathSearcher, PolynomialOptimizer, PositionChecker};
use crate::tree::NodeId;

/// A colliding edge waiting for repair, ordered smallest heuristic first.
#[derive(Debug, Clone)]
pub struct RegionalCandidate {
    /// Parent the edge extends from.
    pub parent: NodeId,
    /// The colliding segment.
    pub piece: Piece,
    /// Edge cost of the colliding segment.
    pub cost: f64,
    /// First entry and last exit times of the occupied region.
    pub collide_ts: (f64, f64),
    /// World-space points at those times.
    pub collide_pts: (Vector3<f64>, Vector3<f64>),
    /// `cost_from_start(parent) + edge cost`.
    pub heu: f64,
}

impl PartialEq for RegionalCandidate {
    fn eq(&self, other: &Self) -> bool {
        self.heu == other.heu
    }
}

impl Eq for RegionalCandidate {}

impl PartialOrd for RegionalCandidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for RegionalCandidate {
    fn cmp(&self, other: &Self) -> Ordering {
        // reversed so a max-heap pops the cheapest candidate
        other
            .heu
            .partial_cmp(&self.heu)
            .unwrap_or(Ordering::Equal)
    }
}

/// One repair attempt. Returns the replacement segment when the corridor
/// search, the fit and the full re-validation all succeed.
pub fn repair(
    candidate: &RegionalCandidate,
    searcher: &dyn GridPathSearcher,
    optimizer: &dyn PolynomialOptimizer,
    checker: &dyn PositionChecker,
    limits: &DynamicLimits,
) -> Option<Piece> {
    let corridor = searcher.search(&candidate.collide_pts.0, &candidate.collide_pts.1)?;
    let repaired = optimizer.optimize(&candidate.piece, &corridor, candidate.collide_ts)?;
    if (repaired.duration() - candidate.piece.duration()).abs() > 1e-9 {
        return None;
    }
    if !limits.admits(&repaired) {
        return None;
    }
    if !checker.check_piece(&repaired).is_clear() {
        return None;
    }
    Some(repaired)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BinaryHeap;

    use nalgebra::Matrix3xX;

    fn candidate(heu: f64) -> RegionalCandidate {
        RegionalCandidate {
            parent: 0,
            piece: Piece::new(Matrix3xX::zeros(6), 1.0),
            cost: heu,
            collide_ts: (0.2, 0.8),
            collide_pts: (Vector3::zeros(), Vector3::zeros()),
            heu,
        }
    }

    #[test]
    fn test_heap_pops_cheapest_first() {
        let mut heap = BinaryHeap::new();
        for heu in [5.0, 1.0, 3.0, 2.0, 4.0] {
            heap.push(candidate(heu));
        }
        let order: Vec<f64> = std::iter::from_fn(|| heap.pop()).map(|c| c.heu).collect();
        assert_eq!(order, vec![1.0, 2.0, 3.0, 4.0, 5.0]);
    }
}
