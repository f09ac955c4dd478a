//! # Kinoplan Planner
//!
//! Bidirectional, rewiring, sampling-based kinodynamic motion planner for a
//! point-mass vehicle with bounded velocity, acceleration and jerk.
//!
//! Two trees grow toward each other, one rooted at the start state and one
//! at the goal state. Candidate edges are closed-form optimal connections of
//! the jerk-controlled triple integrator, minimizing
//!
//! ```text
//! J(τ) = ρ·τ + ∫₀^τ ‖u(t)‖² dt
//! ```
//!
//! Edges that collide are not always discarded: a regional repair step
//! reroutes the segment through a corridor of free cells supplied by a grid
//! path search and reshapes it with a polynomial optimizer.
//!
//! # Components
//!
//! - [`config`]: planner configuration and validation
//! - [`bvp`]: two-point boundary-value solver over the triple integrator
//! - [`sampler`]: uniform / informed / goal-biased state sampling
//! - [`kdtree`]: spatial index over tree-node positions
//! - [`tree`]: pool-allocated node storage for both trees
//! - [`planner`]: the search loop and public planning API
//! - [`regional`]: collision-interval repair through free corridors
//! - [`interfaces`]: collaborator contracts (collision checking, corridor
//!   search, polynomial optimization, visualization)
//! - [`pos_check`], [`search`], [`poly_opt`]: grid-backed implementations of
//!   those contracts
//! - [`scenarios`]: canned worlds for tests and demos

pub mod bvp;
pub mod config;
pub mod interfaces;
pub mod kdtree;
pub mod planner;
pub mod poly_opt;
pub mod pos_check;
pub mod regional;
pub mod sampler;
pub mod scenarios;
pub mod search;
pub mod tree;

pub use config::PlannerConfig;
pub use interfaces::{
    CheckResult, GridPathSearcher, PolynomialOptimizer, PositionChecker, Visualizer,
};
pub use planner::{KinoPlanner, PlanStatus, PlannerError};
