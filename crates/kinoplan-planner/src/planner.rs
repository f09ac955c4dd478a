//! Bidirectional kinodynamic search.
//!
//! Two trees grow from the start and the goal state. Each iteration draws a
//! biased sample, connects it to the cheapest reachable parent in the
//! active tree (repairing colliding edges through free corridors when
//! enabled), optionally rewires the neighborhood through the new node, and
//! then tries to bridge to the opposite tree. The best bridge found within
//! the time budget is stitched into the output trajectory.

use std::collections::BinaryHeap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use thiserror::Error;

use kinoplan_core::{Piece, StatePVA, Trajectory};

use crate::bvp::{BvpSolution, BvpSolver};
use crate::config::{ConfigError, PlannerConfig};
use crate::interfaces::{
    CheckResult, GridPathSearcher, PolynomialOptimizer, PositionChecker, Visualizer,
};
use crate::kdtree::KdTree;
use crate::regional::{self, RegionalCandidate};
use crate::sampler::BiasSampler;
use crate::tree::{NodeId, NodePool, TreeId};

/// Outcome of a planning query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanStatus {
    Failure,
    Success,
    /// Budget expired without an exact bridge, but a node within the
    /// close-goal tolerance was accepted as terminal.
    SuccessCloseGoal,
}

/// Planner lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlannerState {
    Idle,
    Planning,
    Solved,
    SolvedCloseGoal,
    Failed,
}

/// Planner errors; all of them surface at or before the search starts.
#[derive(Debug, Error)]
pub enum PlannerError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("no position checker bound")]
    MissingChecker,
}

/// One improving solution, kept when `test_convergency` is on.
#[derive(Debug, Clone)]
pub struct ConvergenceRecord {
    pub cost: f64,
    pub wall_time: f64,
    pub trajectory: Trajectory,
}

/// A bridge between the trees: forward-tree leaf, optional bridging piece
/// and backward-tree leaf (absent when the leaves coincide in state).
#[derive(Debug, Clone)]
struct Solution {
    cost: f64,
    forward: NodeId,
    backward: Option<NodeId>,
    bridge: Option<Piece>,
}

#[derive(Debug, Clone, Copy)]
struct CloseGoal {
    node: NodeId,
    cost: f64,
}

pub struct KinoPlanner {
    config: PlannerConfig,
    bvp: BvpSolver,
    sampler: BiasSampler,
    pool: NodePool,
    kd_forward: KdTree,
    kd_backward: KdTree,
    checker: Option<Arc<dyn PositionChecker>>,
    searcher: Option<Arc<dyn GridPathSearcher>>,
    optimizer: Option<Arc<dyn PolynomialOptimizer>>,
    visualizer: Option<Arc<dyn Visualizer>>,
    state: PlannerState,
    goal_state: StatePVA,
    best: Option<Solution>,
    close_goal: Option<CloseGoal>,
    traj: Option<Trajectory>,
    first_traj: Option<Trajectory>,
    first_traj_use_time: Option<f64>,
    final_traj_use_time: Option<f64>,
    valid_sample_count: usize,
    convergence: Vec<ConvergenceRecord>,
}

impl KinoPlanner {
    /// Validate the configuration and allocate the node pool.
    pub fn new(config: PlannerConfig) -> Result<Self, PlannerError> {
        config.validate()?;
        let bvp = BvpSolver::new(config.search.rho);
        let sampler = BiasSampler::new(&config);
        let pool = NodePool::new(config.search.tree_node_nums);
        Ok(Self {
            config,
            bvp,
            sampler,
            pool,
            kd_forward: KdTree::new(),
            kd_backward: KdTree::new(),
            checker: None,
            searcher: None,
            optimizer: None,
            visualizer: None,
            state: PlannerState::Idle,
            goal_state: StatePVA::zeros(),
            best: None,
            close_goal: None,
            traj: None,
            first_traj: None,
            first_traj_use_time: None,
            final_traj_use_time: None,
            valid_sample_count: 0,
            convergence: Vec::new(),
        })
    }

    pub fn set_position_checker(&mut self, checker: Arc<dyn PositionChecker>) {
        self.checker = Some(checker);
    }

    pub fn set_grid_searcher(&mut self, searcher: Arc<dyn GridPathSearcher>) {
        self.searcher = Some(searcher);
    }

    pub fn set_optimizer(&mut self, optimizer: Arc<dyn PolynomialOptimizer>) {
        self.optimizer = Some(optimizer);
    }

    pub fn set_visualizer(&mut self, visualizer: Arc<dyn Visualizer>) {
        self.visualizer = Some(visualizer);
    }

    /// Clear all search state; the node pool keeps its allocation.
    pub fn reset(&mut self) {
        self.pool.reset();
        self.kd_forward.clear();
        self.kd_backward.clear();
        self.best = None;
        self.close_goal = None;
        self.traj = None;
        self.first_traj = None;
        self.first_traj_use_time = None;
        self.final_traj_use_time = None;
        self.valid_sample_count = 0;
        self.convergence.clear();
        self.state = PlannerState::Idle;
    }

    /// Search for a trajectory from `start` to `goal` within `time_budget`.
    pub fn plan(
        &mut self,
        start: StatePVA,
        goal: StatePVA,
        time_budget: Duration,
    ) -> Result<PlanStatus, PlannerError> {
        let checker = self.checker.clone().ok_or(PlannerError::MissingChecker)?;
        let searcher = self.searcher.clone();
        let optimizer = self.optimizer.clone();

        self.reset();
        self.state = PlannerState::Planning;
        self.goal_state = goal;
        let clock = Instant::now();

        if start.close_to(&goal, 1e-9) {
            self.traj = Some(Trajectory::empty());
            self.first_traj = Some(Trajectory::empty());
            self.first_traj_use_time = Some(0.0);
            self.final_traj_use_time = Some(0.0);
            self.state = PlannerState::Solved;
            return Ok(PlanStatus::Success);
        }
        if !checker.check_state(&start.pos) || !checker.check_state(&goal.pos) {
            log::debug!("start or goal state is occupied");
            self.state = PlannerState::Failed;
            return Ok(PlanStatus::Failure);
        }

        self.sampler.reset(&start, &goal);
        let (start_id, goal_id) = match (
            self.pool.add_root(start, TreeId::Forward),
            self.pool.add_root(goal, TreeId::Backward),
        ) {
            (Some(s), Some(g)) => (s, g),
            _ => {
                self.state = PlannerState::Failed;
                return Ok(PlanStatus::Failure);
            }
        };
        self.kd_forward.insert(&start.pos, start_id);
        self.kd_backward.insert(&goal.pos, goal_id);

        if clock.elapsed() < time_budget {
            self.try_direct_connect(
                start_id,
                goal_id,
                &*checker,
                searcher.as_deref(),
                optimizer.as_deref(),
                &clock,
            );
        }

        let mut iter: u64 = 0;
        loop {
            if clock.elapsed() >= time_budget {
                break;
            }
            if self.config.search.stop_after_first_traj_found && self.best.is_some() {
                break;
            }
            if self.pool.is_full() {
                // treated like budget expiry
                log::debug!("node pool exhausted after {} samples", self.valid_sample_count);
                break;
            }
            let tree = if iter % 2 == 0 {
                TreeId::Forward
            } else {
                TreeId::Backward
            };
            iter += 1;

            let x = self.sampler.sample();
            if !checker.check_state(&x.pos) {
                continue;
            }
            let Some(new_id) = self.extend(
                tree,
                x,
                &*checker,
                searcher.as_deref(),
                optimizer.as_deref(),
            ) else {
                continue;
            };
            self.valid_sample_count += 1;
            if self.config.search.rewire {
                self.rewire(tree, new_id, &*checker);
            }
            self.try_bridge(tree, new_id, &*checker, &clock);
            self.update_close_goal(new_id);
        }

        if self.best.is_some() {
            self.state = PlannerState::Solved;
            log::info!(
                "planning solved: cost {:.4}, {} nodes, {} samples",
                self.best.as_ref().map(|b| b.cost).unwrap_or(f64::NAN),
                self.pool.len(),
                self.valid_sample_count
            );
            Ok(PlanStatus::Success)
        } else if let Some(cg) = self.close_goal.filter(|_| self.config.search.allow_close_goal) {
            let traj = self.fill_traj(cg.node, None, None);
            self.final_traj_use_time = Some(clock.elapsed().as_secs_f64());
            self.traj = Some(traj);
            self.state = PlannerState::SolvedCloseGoal;
            log::info!("accepting close-goal terminal at cost {:.4}", cg.cost);
            Ok(PlanStatus::SuccessCloseGoal)
        } else {
            self.state = PlannerState::Failed;
            Ok(PlanStatus::Failure)
        }
    }

    /// Best trajectory found by the last `plan` call.
    pub fn trajectory(&self) -> Option<&Trajectory> {
        self.traj.as_ref()
    }

    /// First trajectory found by the last `plan` call.
    pub fn first_trajectory(&self) -> Option<&Trajectory> {
        self.first_traj.as_ref()
    }

    /// Wall time at which the first solution appeared [s].
    pub fn first_traj_use_time(&self) -> Option<f64> {
        self.first_traj_use_time
    }

    /// Wall time at which the final solution appeared [s].
    pub fn final_traj_use_time(&self) -> Option<f64> {
        self.final_traj_use_time
    }

    /// Nodes currently held by both trees together.
    pub fn tree_node_count(&self) -> usize {
        self.pool.len()
    }

    /// Samples that became tree nodes during the last `plan` call.
    pub fn valid_sample_count(&self) -> usize {
        self.valid_sample_count
    }

    /// Improving solutions recorded when `test_convergency` is on.
    pub fn convergence(&self) -> &[ConvergenceRecord] {
        &self.convergence
    }

    pub fn state(&self) -> PlannerState {
        self.state
    }

    pub fn config(&self) -> &PlannerConfig {
        &self.config
    }

    /// Single-shot attempt at the straight BVP edge start → goal, with a
    /// regional repair if it collides. Guarantees that a feasible direct
    /// connection is found before any sampling happens.
    fn try_direct_connect(
        &mut self,
        start_id: NodeId,
        goal_id: NodeId,
        checker: &dyn PositionChecker,
        searcher: Option<&dyn GridPathSearcher>,
        optimizer: Option<&dyn PolynomialOptimizer>,
        clock: &Instant,
    ) {
        let s = self.pool.node(start_id).state;
        let g = self.pool.node(goal_id).state;
        let Some(sol) = self.bvp.solve(&s, &g) else {
            return;
        };
        if !self.config.limits.admits(&sol.piece) {
            return;
        }
        match checker.check_piece(&sol.piece) {
            CheckResult::Clear => {
                self.record_solution(
                    Solution {
                        cost: sol.cost,
                        forward: start_id,
                        backward: Some(goal_id),
                        bridge: Some(sol.piece),
                    },
                    clock,
                );
            }
            CheckResult::Collides {
                t_first,
                t_last,
                p_first,
                p_last,
            } if self.config.search.use_regional_opt => {
                let (Some(searcher), Some(optimizer)) = (searcher, optimizer) else {
                    return;
                };
                let candidate = RegionalCandidate {
                    parent: start_id,
                    heu: sol.cost,
                    cost: sol.cost,
                    piece: sol.piece,
                    collide_ts: (t_first, t_last),
                    collide_pts: (p_first, p_last),
                };
                if let Some(repaired) =
                    regional::repair(&candidate, searcher, optimizer, checker, &self.config.limits)
                {
                    let cost = self.bvp.rho() * repaired.duration() + repaired.jerk_energy();
                    self.record_solution(
                        Solution {
                            cost,
                            forward: start_id,
                            backward: Some(goal_id),
                            bridge: Some(repaired),
                        },
                        clock,
                    );
                }
            }
            CheckResult::Collides { .. } => {}
        }
    }

    /// Connect the sample to its cheapest reachable parent in the active
    /// tree. Colliding candidates queue up for regional repair, cheapest
    /// heuristic first, bounded per call.
    fn extend(
        &mut self,
        tree: TreeId,
        x: StatePVA,
        checker: &dyn PositionChecker,
        searcher: Option<&dyn GridPathSearcher>,
        optimizer: Option<&dyn PolynomialOptimizer>,
    ) -> Option<NodeId> {
        let radius_cost = self.config.search.radius_cost_between_two_states;
        let radius = match tree {
            TreeId::Forward => self.bvp.forward_radius(radius_cost),
            TreeId::Backward => self.bvp.backward_radius(radius_cost),
        };
        let kd = match tree {
            TreeId::Forward => &self.kd_forward,
            TreeId::Backward => &self.kd_backward,
        };
        let neighbors = kd.radius_query(&x.pos, radius);

        let mut best: Option<(NodeId, BvpSolution, f64)> = None;
        let mut colliding: BinaryHeap<RegionalCandidate> = BinaryHeap::new();
        for id in neighbors {
            let (n_state, n_cost) = {
                let n = self.pool.node(id);
                (n.state, n.cost_from_start)
            };
            if n_state.close_to(&x, 1e-9) {
                continue;
            }
            let sol = match tree {
                TreeId::Forward => self.bvp.solve(&n_state, &x),
                TreeId::Backward => self.bvp.solve(&x, &n_state),
            };
            let Some(sol) = sol else {
                continue;
            };
            if !self.config.limits.admits(&sol.piece) {
                continue;
            }
            let total = n_cost + sol.cost;
            match checker.check_piece(&sol.piece) {
                CheckResult::Clear => {
                    if best.as_ref().map_or(true, |(_, _, t)| total < *t) {
                        best = Some((id, sol, total));
                    }
                }
                CheckResult::Collides {
                    t_first,
                    t_last,
                    p_first,
                    p_last,
                } => {
                    if self.config.search.use_regional_opt {
                        colliding.push(RegionalCandidate {
                            parent: id,
                            heu: total,
                            cost: sol.cost,
                            piece: sol.piece,
                            collide_ts: (t_first, t_last),
                            collide_pts: (p_first, p_last),
                        });
                    }
                }
            }
        }

        if let Some((parent, sol, _)) = best {
            return self.insert_node(tree, parent, x, sol.piece, sol.cost, sol.tau);
        }

        if self.config.search.use_regional_opt {
            if let (Some(searcher), Some(optimizer)) = (searcher, optimizer) {
                for _ in 0..self.config.search.regional_attempts_per_iter {
                    let Some(candidate) = colliding.pop() else {
                        break;
                    };
                    if let Some(repaired) = regional::repair(
                        &candidate,
                        searcher,
                        optimizer,
                        checker,
                        &self.config.limits,
                    ) {
                        let tau = repaired.duration();
                        let cost = self.bvp.rho() * tau + repaired.jerk_energy();
                        return self.insert_node(tree, candidate.parent, x, repaired, cost, tau);
                    }
                }
            }
        }
        None
    }

    fn insert_node(
        &mut self,
        tree: TreeId,
        parent: NodeId,
        state: StatePVA,
        piece: Piece,
        cost: f64,
        tau: f64,
    ) -> Option<NodeId> {
        let id = self.pool.add_node(parent, state, piece, cost, tau)?;
        match tree {
            TreeId::Forward => self.kd_forward.insert(&state.pos, id),
            TreeId::Backward => self.kd_backward.insert(&state.pos, id),
        }
        if let Some(vis) = &self.visualizer {
            vis.edge(&self.pool.node(parent).state, &state);
        }
        Some(id)
    }

    /// Re-parent neighborhood nodes through the new node where that lowers
    /// their cost-from-root; cumulative values propagate to each rewired
    /// subtree before this returns.
    fn rewire(&mut self, tree: TreeId, new_id: NodeId, checker: &dyn PositionChecker) {
        let radius = self
            .bvp
            .backward_radius(self.config.search.radius_cost_between_two_states);
        let (x_new, new_cost) = {
            let n = self.pool.node(new_id);
            (n.state, n.cost_from_start)
        };
        let candidates = match tree {
            TreeId::Forward => self.kd_forward.radius_query(&x_new.pos, radius),
            TreeId::Backward => self.kd_backward.radius_query(&x_new.pos, radius),
        };
        for id in candidates {
            if id == new_id {
                continue;
            }
            let (c_state, c_cost, is_root) = {
                let c = self.pool.node(id);
                (c.state, c.cost_from_start, c.parent.is_none())
            };
            if is_root {
                continue;
            }
            let sol = match tree {
                TreeId::Forward => self.bvp.solve(&x_new, &c_state),
                TreeId::Backward => self.bvp.solve(&c_state, &x_new),
            };
            let Some(sol) = sol else {
                continue;
            };
            // edge costs are strictly positive, so an ancestor of the new
            // node can never pass this test and no cycle can form
            if new_cost + sol.cost >= c_cost {
                continue;
            }
            if !self.config.limits.admits(&sol.piece) {
                continue;
            }
            if !checker.check_piece(&sol.piece).is_clear() {
                continue;
            }
            self.pool.change_parent(id, new_id, sol.piece, sol.cost, sol.tau);
        }
    }

    /// Try to join the new node with the opposite tree; every feasible pair
    /// is a candidate solution and strictly better ones replace the best.
    fn try_bridge(
        &mut self,
        tree: TreeId,
        new_id: NodeId,
        checker: &dyn PositionChecker,
        clock: &Instant,
    ) {
        let radius = self
            .bvp
            .forward_radius(self.config.search.bridge_radius_cost);
        let (x, x_cost) = {
            let n = self.pool.node(new_id);
            (n.state, n.cost_from_start)
        };
        let partners = match tree {
            TreeId::Forward => self.kd_backward.radius_query(&x.pos, radius),
            TreeId::Backward => self.kd_forward.radius_query(&x.pos, radius),
        };
        for id in partners {
            let (m_state, m_cost) = {
                let m = self.pool.node(id);
                (m.state, m.cost_from_start)
            };
            let (bridge, bridge_cost) = if x.close_to(&m_state, 1e-9) {
                // the leaves coincide, the chains join directly
                (None, 0.0)
            } else {
                let sol = match tree {
                    TreeId::Forward => self.bvp.solve(&x, &m_state),
                    TreeId::Backward => self.bvp.solve(&m_state, &x),
                };
                let Some(sol) = sol else {
                    continue;
                };
                if !self.config.limits.admits(&sol.piece) {
                    continue;
                }
                if !checker.check_piece(&sol.piece).is_clear() {
                    continue;
                }
                (Some(sol.piece), sol.cost)
            };
            let total = x_cost + bridge_cost + m_cost;
            if self.best.as_ref().map_or(true, |b| total < b.cost) {
                let (forward, backward) = match tree {
                    TreeId::Forward => (new_id, id),
                    TreeId::Backward => (id, new_id),
                };
                self.record_solution(
                    Solution {
                        cost: total,
                        forward,
                        backward: Some(backward),
                        bridge,
                    },
                    clock,
                );
            }
        }
    }

    fn update_close_goal(&mut self, id: NodeId) {
        let node = self.pool.node(id);
        if node.tree_id != TreeId::Forward {
            return;
        }
        let dist = (node.state.pos - self.goal_state.pos).norm();
        if dist > self.config.search.close_goal_tolerance {
            return;
        }
        let cost = node.cost_from_start;
        if self.close_goal.map_or(true, |cg| cost < cg.cost) {
            self.close_goal = Some(CloseGoal { node: id, cost });
        }
    }

    fn record_solution(&mut self, solution: Solution, clock: &Instant) {
        let traj = self.fill_traj(solution.forward, solution.bridge.as_ref(), solution.backward);
        let elapsed = clock.elapsed().as_secs_f64();
        log::info!(
            "solution improved: cost {:.4} after {:.3} s ({} segments)",
            solution.cost,
            elapsed,
            traj.len()
        );
        self.sampler.note_solution_cost(solution.cost);
        if self.first_traj.is_none() {
            self.first_traj = Some(traj.clone());
            self.first_traj_use_time = Some(elapsed);
        }
        if self.config.search.test_convergency {
            self.convergence.push(ConvergenceRecord {
                cost: solution.cost,
                wall_time: elapsed,
                trajectory: traj.clone(),
            });
        }
        if let Some(vis) = &self.visualizer {
            vis.trajectory(&traj);
        }
        self.final_traj_use_time = Some(elapsed);
        self.traj = Some(traj);
        self.best = Some(solution);
    }

    /// Stitch root→leaf pieces of the forward tree, the bridging piece, and
    /// the leaf→root pieces of the backward tree into one trajectory.
    fn fill_traj(
        &self,
        forward: NodeId,
        bridge: Option<&Piece>,
        backward: Option<NodeId>,
    ) -> Trajectory {
        let mut pieces = Vec::new();
        for id in self.pool.path_from_root(forward) {
            if let Some(p) = &self.pool.node(id).piece_from_parent {
                pieces.push(p.clone());
            }
        }
        if let Some(b) = bridge {
            pieces.push(b.clone());
        }
        if let Some(leaf) = backward {
            let mut cur = leaf;
            loop {
                let node = self.pool.node(cur);
                match (&node.piece_from_parent, node.parent) {
                    (Some(p), Some(parent)) => {
                        pieces.push(p.clone());
                        cur = parent;
                    }
                    _ => break,
                }
            }
        }
        Trajectory::new(pieces)
    }
}
