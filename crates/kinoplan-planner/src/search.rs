//! Grid path search.
//!
//! A* over the voxel grid, used by the regional repair to find a free-cell
//! corridor between the entry and exit points of a collision interval.
//! Expansion order is fully deterministic: ties in the f-cost are broken by
//! insertion sequence.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::sync::Arc;

use nalgebra::Vector3;

use kinoplan_core::VoxelGrid;

use crate::interfaces::GridPathSearcher;

const NEIGHBORS: [[i64; 3]; 26] = neighbor_offsets();

const fn neighbor_offsets() -> [[i64; 3]; 26] {
    let mut out = [[0i64; 3]; 26];
    let mut n = 0;
    let mut dx = -1i64;
    while dx <= 1 {
        let mut dy = -1i64;
        while dy <= 1 {
            let mut dz = -1i64;
            while dz <= 1 {
                if !(dx == 0 && dy == 0 && dz == 0) {
                    out[n] = [dx, dy, dz];
                    n += 1;
                }
                dz += 1;
            }
            dy += 1;
        }
        dx += 1;
    }
    out
}

/// [`GridPathSearcher`] over a [`VoxelGrid`].
///
/// The obstacle set, dilated by the requested clearance, is rasterized once
/// at construction; each search then costs one bit per cell probe.
#[derive(Debug, Clone)]
pub struct GridSearcher {
    grid: Arc<VoxelGrid>,
    blocked: Vec<bool>,
}

impl GridSearcher {
    pub fn new(grid: Arc<VoxelGrid>) -> Self {
        let blocked = dilate(&grid, 0);
        Self { grid, blocked }
    }

    /// Treat cells within this Chebyshev distance of an obstacle as blocked,
    /// keeping corridors away from surfaces.
    pub fn with_clearance(mut self, cells: usize) -> Self {
        self.blocked = dilate(&self.grid, cells);
        self
    }

    fn dims(&self) -> [usize; 3] {
        self.grid.dims()
    }

    fn linear(&self, c: [usize; 3]) -> usize {
        let d = self.dims();
        (c[2] * d[1] + c[1]) * d[0] + c[0]
    }

    fn blocked(&self, c: [usize; 3]) -> bool {
        self.blocked[self.linear(c)]
    }

    /// Cell containing `pos`, or the closest unblocked cell within a few
    /// shells of it. Collision-interval endpoints sit on obstacle surfaces,
    /// so the exact cell is often blocked.
    fn anchor_cell(&self, pos: &Vector3<f64>) -> Option<[usize; 3]> {
        let d = self.dims();
        let lower = self.grid.lower();
        let res = self.grid.resolution();
        let clamped = [
            ((pos.x - lower.x) / res).floor().clamp(0.0, (d[0] - 1) as f64) as usize,
            ((pos.y - lower.y) / res).floor().clamp(0.0, (d[1] - 1) as f64) as usize,
            ((pos.z - lower.z) / res).floor().clamp(0.0, (d[2] - 1) as f64) as usize,
        ];
        if !self.blocked(clamped) {
            return Some(clamped);
        }
        for shell in 1..=8i64 {
            for dx in -shell..=shell {
                for dy in -shell..=shell {
                    for dz in -shell..=shell {
                        if dx.abs().max(dy.abs()).max(dz.abs()) != shell {
                            continue;
                        }
                        let n = [
                            clamped[0] as i64 + dx,
                            clamped[1] as i64 + dy,
                            clamped[2] as i64 + dz,
                        ];
                        if n[0] < 0
                            || n[1] < 0
                            || n[2] < 0
                            || n[0] >= d[0] as i64
                            || n[1] >= d[1] as i64
                            || n[2] >= d[2] as i64
                        {
                            continue;
                        }
                        let c = [n[0] as usize, n[1] as usize, n[2] as usize];
                        if !self.blocked(c) {
                            return Some(c);
                        }
                    }
                }
            }
        }
        None
    }
}

fn dilate(grid: &VoxelGrid, clearance: usize) -> Vec<bool> {
    let d = grid.dims();
    let linear = |c: [usize; 3]| (c[2] * d[1] + c[1]) * d[0] + c[0];
    let mut blocked = vec![false; d[0] * d[1] * d[2]];
    let r = clearance as i64;
    for k in 0..d[2] {
        for j in 0..d[1] {
            for i in 0..d[0] {
                if grid.cell_is_free([i, j, k]) {
                    continue;
                }
                for dx in -r..=r {
                    for dy in -r..=r {
                        for dz in -r..=r {
                            let n = [i as i64 + dx, j as i64 + dy, k as i64 + dz];
                            if n[0] < 0
                                || n[1] < 0
                                || n[2] < 0
                                || n[0] >= d[0] as i64
                                || n[1] >= d[1] as i64
                                || n[2] >= d[2] as i64
                            {
                                continue;
                            }
                            blocked[linear([n[0] as usize, n[1] as usize, n[2] as usize])] = true;
                        }
                    }
                }
            }
        }
    }
    blocked
}

#[derive(Debug)]
struct OpenEntry {
    f: f64,
    seq: u64,
    cell: [usize; 3],
}

impl PartialEq for OpenEntry {
    fn eq(&self, other: &Self) -> bool {
        self.f == other.f && self.seq == other.seq
    }
}

impl Eq for OpenEntry {}

impl PartialOrd for OpenEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for OpenEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // reversed: BinaryHeap pops the smallest f first
        other
            .f
            .partial_cmp(&self.f)
            .unwrap_or(Ordering::Equal)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl GridPathSearcher for GridSearcher {
    fn search(&self, from: &Vector3<f64>, to: &Vector3<f64>) -> Option<Vec<Vector3<f64>>> {
        let start = self.anchor_cell(from)?;
        let goal = self.anchor_cell(to)?;
        if start == goal {
            return Some(vec![self.grid.cell_center(start)]);
        }

        let d = self.dims();
        let total = d[0] * d[1] * d[2];
        let res = self.grid.resolution();
        let goal_center = self.grid.cell_center(goal);

        let mut g = vec![f64::INFINITY; total];
        let mut came_from = vec![usize::MAX; total];
        let mut closed = vec![false; total];
        let mut open = BinaryHeap::new();
        let mut seq = 0u64;

        let h = |c: [usize; 3]| (self.grid.cell_center(c) - goal_center).norm();

        g[self.linear(start)] = 0.0;
        open.push(OpenEntry {
            f: h(start),
            seq,
            cell: start,
        });

        while let Some(entry) = open.pop() {
            let cur = entry.cell;
            let cur_lin = self.linear(cur);
            if closed[cur_lin] {
                continue;
            }
            closed[cur_lin] = true;
            if cur == goal {
                let mut cells = vec![cur];
                let mut lin = cur_lin;
                while came_from[lin] != usize::MAX {
                    lin = came_from[lin];
                    let k = lin / (d[0] * d[1]);
                    let j = (lin / d[0]) % d[1];
                    let i = lin % d[0];
                    cells.push([i, j, k]);
                }
                cells.reverse();
                return Some(cells.iter().map(|&c| self.grid.cell_center(c)).collect());
            }

            for off in NEIGHBORS {
                let n = [
                    cur[0] as i64 + off[0],
                    cur[1] as i64 + off[1],
                    cur[2] as i64 + off[2],
                ];
                if n[0] < 0
                    || n[1] < 0
                    || n[2] < 0
                    || n[0] >= d[0] as i64
                    || n[1] >= d[1] as i64
                    || n[2] >= d[2] as i64
                {
                    continue;
                }
                let nc = [n[0] as usize, n[1] as usize, n[2] as usize];
                let n_lin = self.linear(nc);
                if closed[n_lin] || self.blocked(nc) {
                    continue;
                }
                let step = res
                    * ((off[0] * off[0] + off[1] * off[1] + off[2] * off[2]) as f64).sqrt();
                let tentative = g[cur_lin] + step;
                if tentative < g[n_lin] {
                    g[n_lin] = tentative;
                    came_from[n_lin] = cur_lin;
                    seq += 1;
                    open.push(OpenEntry {
                        f: tentative + h(nc),
                        seq,
                        cell: nc,
                    });
                }
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn walled_grid() -> Arc<VoxelGrid> {
        let mut g = VoxelGrid::new(
            Vector3::new(-1.0, -3.0, -2.0),
            Vector3::new(11.0, 3.0, 2.0),
            0.2,
        );
        // wall at x ∈ [4, 6] with a hole around y = 2
        g.set_box(
            Vector3::new(4.0, -3.0, -2.0),
            Vector3::new(6.0, 3.0, 2.0),
            true,
        );
        g.set_box(
            Vector3::new(4.0, 1.6, -0.6),
            Vector3::new(6.0, 2.4, 0.6),
            false,
        );
        Arc::new(g)
    }

    #[test]
    fn test_path_through_hole() {
        let searcher = GridSearcher::new(walled_grid());
        let path = searcher
            .search(&Vector3::new(0.0, 0.0, 0.0), &Vector3::new(10.0, 0.0, 0.0))
            .expect("hole is reachable");
        assert!(path.len() > 2);
        // the corridor must pass through the hole region
        let through = path
            .iter()
            .any(|p| p.x > 4.0 && p.x < 6.0 && p.y > 1.0 && p.y < 3.0);
        assert!(through);
        // every waypoint is a free cell center
        let g = walled_grid();
        for p in &path {
            assert!(g.is_free(p));
        }
    }

    #[test]
    fn test_no_path_when_sealed() {
        let mut g = VoxelGrid::new(
            Vector3::new(-1.0, -1.0, -1.0),
            Vector3::new(3.0, 1.0, 1.0),
            0.2,
        );
        g.set_box(
            Vector3::new(1.0, -1.0, -1.0),
            Vector3::new(1.6, 1.0, 1.0),
            true,
        );
        let searcher = GridSearcher::new(Arc::new(g));
        assert!(searcher
            .search(&Vector3::new(0.0, 0.0, 0.0), &Vector3::new(2.5, 0.0, 0.0))
            .is_none());
    }

    #[test]
    fn test_anchor_escapes_occupied_endpoint() {
        let searcher = GridSearcher::new(walled_grid());
        // endpoint inside the wall still yields a corridor
        let path = searcher
            .search(&Vector3::new(4.1, 0.0, 0.0), &Vector3::new(10.0, 0.0, 0.0))
            .expect("anchor should step off the wall");
        assert!(!path.is_empty());
    }

    #[test]
    fn test_deterministic() {
        let searcher = GridSearcher::new(walled_grid());
        let a = searcher.search(&Vector3::new(0.0, 0.0, 0.0), &Vector3::new(10.0, 0.0, 0.0));
        let b = searcher.search(&Vector3::new(0.0, 0.0, 0.0), &Vector3::new(10.0, 0.0, 0.0));
        assert_eq!(a, b);
    }

    #[test]
    fn test_clearance_blocks_tight_hole() {
        // the 0.8 m hole is ~4 cells; clearance 3 seals it
        let searcher = GridSearcher::new(walled_grid()).with_clearance(3);
        assert!(searcher
            .search(&Vector3::new(0.0, 0.0, 0.0), &Vector3::new(10.0, 0.0, 0.0))
            .is_none());
    }
}
