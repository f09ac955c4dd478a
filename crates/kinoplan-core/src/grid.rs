//! Voxel occupancy grid.
//!
//! A dense boolean grid over an axis-aligned world box. Positions outside
//! the box are reported occupied, so the box doubles as the flight volume.

use nalgebra::Vector3;

#[derive(Debug, Clone)]
pub struct VoxelGrid {
    origin: Vector3<f64>,
    resolution: f64,
    dims: [usize; 3],
    cells: Vec<bool>,
}

impl VoxelGrid {
    /// An all-free grid covering `[lower, upper]` at the given cell size.
    pub fn new(lower: Vector3<f64>, upper: Vector3<f64>, resolution: f64) -> Self {
        let extent = upper - lower;
        let dims = [
            (extent.x / resolution).ceil().max(1.0) as usize,
            (extent.y / resolution).ceil().max(1.0) as usize,
            (extent.z / resolution).ceil().max(1.0) as usize,
        ];
        let cells = vec![false; dims[0] * dims[1] * dims[2]];
        Self {
            origin: lower,
            resolution,
            dims,
            cells,
        }
    }

    pub fn lower(&self) -> Vector3<f64> {
        self.origin
    }

    pub fn upper(&self) -> Vector3<f64> {
        self.origin
            + Vector3::new(
                self.dims[0] as f64 * self.resolution,
                self.dims[1] as f64 * self.resolution,
                self.dims[2] as f64 * self.resolution,
            )
    }

    pub fn resolution(&self) -> f64 {
        self.resolution
    }

    pub fn dims(&self) -> [usize; 3] {
        self.dims
    }

    /// Cell containing `pos`, or `None` outside the grid.
    pub fn cell_index(&self, pos: &Vector3<f64>) -> Option<[usize; 3]> {
        let rel = (pos - self.origin) / self.resolution;
        if rel.x < 0.0 || rel.y < 0.0 || rel.z < 0.0 {
            return None;
        }
        let idx = [rel.x as usize, rel.y as usize, rel.z as usize];
        if idx[0] >= self.dims[0] || idx[1] >= self.dims[1] || idx[2] >= self.dims[2] {
            return None;
        }
        Some(idx)
    }

    fn linear(&self, idx: [usize; 3]) -> usize {
        (idx[2] * self.dims[1] + idx[1]) * self.dims[0] + idx[0]
    }

    pub fn cell_center(&self, idx: [usize; 3]) -> Vector3<f64> {
        self.origin
            + Vector3::new(
                (idx[0] as f64 + 0.5) * self.resolution,
                (idx[1] as f64 + 0.5) * self.resolution,
                (idx[2] as f64 + 0.5) * self.resolution,
            )
    }

    pub fn cell_is_free(&self, idx: [usize; 3]) -> bool {
        !self.cells[self.linear(idx)]
    }

    /// Free-space test; outside the grid counts as occupied.
    pub fn is_free(&self, pos: &Vector3<f64>) -> bool {
        match self.cell_index(pos) {
            Some(idx) => self.cell_is_free(idx),
            None => false,
        }
    }

    /// Mark every cell overlapping `[lower, upper]` occupied or free.
    pub fn set_box(&mut self, lower: Vector3<f64>, upper: Vector3<f64>, occupied: bool) {
        let lo = (lower - self.origin) / self.resolution;
        let hi = (upper - self.origin) / self.resolution;
        let start = [
            lo.x.floor().max(0.0) as usize,
            lo.y.floor().max(0.0) as usize,
            lo.z.floor().max(0.0) as usize,
        ];
        let end = [
            (hi.x.ceil() as usize).min(self.dims[0]),
            (hi.y.ceil() as usize).min(self.dims[1]),
            (hi.z.ceil() as usize).min(self.dims[2]),
        ];
        for k in start[2]..end[2] {
            for j in start[1]..end[1] {
                for i in start[0]..end[0] {
                    let lin = self.linear([i, j, k]);
                    self.cells[lin] = occupied;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid() -> VoxelGrid {
        VoxelGrid::new(
            Vector3::new(0.0, 0.0, 0.0),
            Vector3::new(10.0, 10.0, 10.0),
            0.5,
        )
    }

    #[test]
    fn test_dims() {
        assert_eq!(grid().dims(), [20, 20, 20]);
    }

    #[test]
    fn test_outside_is_occupied() {
        let g = grid();
        assert!(!g.is_free(&Vector3::new(-0.1, 5.0, 5.0)));
        assert!(!g.is_free(&Vector3::new(5.0, 10.1, 5.0)));
        assert!(g.is_free(&Vector3::new(5.0, 5.0, 5.0)));
    }

    #[test]
    fn test_set_box() {
        let mut g = grid();
        g.set_box(
            Vector3::new(2.0, 2.0, 2.0),
            Vector3::new(4.0, 4.0, 4.0),
            true,
        );
        assert!(!g.is_free(&Vector3::new(3.0, 3.0, 3.0)));
        assert!(g.is_free(&Vector3::new(5.0, 5.0, 5.0)));
        // carve part of it free again
        g.set_box(
            Vector3::new(2.5, 2.5, 2.5),
            Vector3::new(3.5, 3.5, 3.5),
            false,
        );
        assert!(g.is_free(&Vector3::new(3.0, 3.0, 3.0)));
        assert!(!g.is_free(&Vector3::new(2.2, 2.2, 2.2)));
    }

    #[test]
    fn test_cell_center_roundtrip() {
        let g = grid();
        let idx = g.cell_index(&Vector3::new(7.3, 0.2, 9.9)).unwrap();
        let center = g.cell_center(idx);
        assert_eq!(g.cell_index(&center).unwrap(), idx);
    }
}
