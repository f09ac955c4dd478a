//! # Kinoplan Core
//!
//! Core library for the kinoplan kinodynamic motion planner.
//!
//! Holds the domain types shared by the planner and any consumer of its
//! output trajectories:
//!
//! - [`state`]: the point-mass vehicle state (position, velocity, acceleration)
//! - [`piece`]: a single polynomial trajectory segment with fixed duration
//! - [`trajectory`]: a piecewise-polynomial trajectory with C² joins
//! - [`math`]: polynomial evaluation and real-root extraction
//! - [`grid`]: a voxel occupancy grid for collision queries

pub mod grid;
pub mod math;
pub mod piece;
pub mod state;
pub mod trajectory;

pub use grid::VoxelGrid;
pub use piece::Piece;
pub use state::StatePVA;
pub use trajectory::{TrajStats, Trajectory};

use nalgebra::{Matrix3, Vector3};

/// 3D vector type
pub type Vec3 = Vector3<f64>;

/// 3x3 matrix type
pub type Mat3 = Matrix3<f64>;
