//! Biased state sampling.
//!
//! Three modes, chosen per call: uniform over the world box, informed
//! (restricted to the prolate spheroid that can still improve the best
//! known solution) and goal-biased (the goal state verbatim, with small
//! probability). The stream is driven by a seeded ChaCha generator so a
//! fixed seed reproduces the whole sample sequence.

use nalgebra::{Rotation3, Vector3};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::UnitSphere;

use kinoplan_core::StatePVA;

use crate::config::PlannerConfig;

#[derive(Debug, Clone)]
pub struct BiasSampler {
    rng: ChaCha8Rng,
    seed: u64,
    lower: Vector3<f64>,
    upper: Vector3<f64>,
    v_mag_sample: f64,
    vel_limit: f64,
    rho: f64,
    goal_bias: f64,
    start: StatePVA,
    goal: StatePVA,
    best_cost: Option<f64>,
}

impl BiasSampler {
    pub fn new(config: &PlannerConfig) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(config.search.seed),
            seed: config.search.seed,
            lower: config.world.lower,
            upper: config.world.upper,
            v_mag_sample: config.limits.v_mag_sample,
            vel_limit: config.limits.vel_limit,
            rho: config.search.rho,
            goal_bias: config.search.goal_bias,
            start: StatePVA::zeros(),
            goal: StatePVA::zeros(),
            best_cost: None,
        }
    }

    /// Rewind the stream and bind the endpoints of a fresh query.
    pub fn reset(&mut self, start: &StatePVA, goal: &StatePVA) {
        self.rng = ChaCha8Rng::seed_from_u64(self.seed);
        self.start = *start;
        self.goal = *goal;
        self.best_cost = None;
    }

    /// Switch to informed sampling once a solution of this cost exists.
    pub fn note_solution_cost(&mut self, cost: f64) {
        self.best_cost = Some(cost);
    }

    pub fn sample(&mut self) -> StatePVA {
        if self.rng.gen::<f64>() < self.goal_bias {
            return self.goal;
        }
        let pos = match self.best_cost {
            Some(c) => self.informed_position(c),
            None => self.uniform_position(),
        };
        let dir: [f64; 3] = self.rng.sample(UnitSphere);
        let mag = self.rng.gen_range(0.0..=self.v_mag_sample);
        StatePVA::new(
            pos,
            Vector3::new(dir[0], dir[1], dir[2]) * mag,
            Vector3::zeros(),
        )
    }

    fn uniform_position(&mut self) -> Vector3<f64> {
        Vector3::new(
            self.rng.gen_range(self.lower.x..=self.upper.x),
            self.rng.gen_range(self.lower.y..=self.upper.y),
            self.rng.gen_range(self.lower.z..=self.upper.z),
        )
    }

    /// Uniform draw from the spheroid with foci at the start and goal
    /// positions whose interior contains every position a trajectory of
    /// cost below `c` can visit (distance budget `vel_limit·c/ρ`).
    fn informed_position(&mut self, c: f64) -> Vector3<f64> {
        let chord = self.goal.pos - self.start.pos;
        let c_min = chord.norm();
        let d_max = self.vel_limit * c / self.rho;
        if c_min < 1e-9 || d_max <= c_min {
            return self.uniform_position();
        }
        let a = d_max / 2.0;
        let b = (d_max * d_max - c_min * c_min).sqrt() / 2.0;

        let dir: [f64; 3] = self.rng.sample(UnitSphere);
        let radius = self.rng.gen::<f64>().cbrt();
        let ball = Vector3::new(dir[0], dir[1], dir[2]) * radius;
        let scaled = Vector3::new(a * ball.x, b * ball.y, b * ball.z);

        let axis = chord / c_min;
        let rot = Rotation3::rotation_between(&Vector3::x(), &axis)
            .unwrap_or_else(|| Rotation3::from_axis_angle(&Vector3::y_axis(), std::f64::consts::PI));
        let center = (self.start.pos + self.goal.pos) / 2.0;
        let p = rot * scaled + center;

        // stay inside the sampling volume
        Vector3::new(
            p.x.clamp(self.lower.x, self.upper.x),
            p.y.clamp(self.lower.y, self.upper.y),
            p.z.clamp(self.lower.z, self.upper.z),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sampler_with_seed(seed: u64) -> BiasSampler {
        let mut config = PlannerConfig::default();
        config.search.seed = seed;
        config.search.goal_bias = 0.1;
        let mut s = BiasSampler::new(&config);
        let start = StatePVA::at_rest(Vector3::new(0.0, 0.0, 0.0));
        let goal = StatePVA::at_rest(Vector3::new(10.0, 0.0, 0.0));
        s.reset(&start, &goal);
        s
    }

    #[test]
    fn test_same_seed_same_sequence() {
        let mut a = sampler_with_seed(42);
        let mut b = sampler_with_seed(42);
        for _ in 0..500 {
            assert_eq!(a.sample(), b.sample());
        }
    }

    #[test]
    fn test_different_seeds_differ() {
        let mut a = sampler_with_seed(1);
        let mut b = sampler_with_seed(2);
        let same = (0..100).filter(|_| a.sample() == b.sample()).count();
        assert!(same < 100);
    }

    #[test]
    fn test_reset_rewinds_stream() {
        let mut s = sampler_with_seed(9);
        let first: Vec<StatePVA> = (0..50).map(|_| s.sample()).collect();
        let start = StatePVA::at_rest(Vector3::zeros());
        let goal = StatePVA::at_rest(Vector3::new(10.0, 0.0, 0.0));
        s.reset(&start, &goal);
        let second: Vec<StatePVA> = (0..50).map(|_| s.sample()).collect();
        assert_eq!(first, second);
    }

    #[test]
    fn test_samples_respect_bounds() {
        let mut s = sampler_with_seed(5);
        for _ in 0..1000 {
            let x = s.sample();
            assert!(x.pos.x >= -20.0 && x.pos.x <= 20.0);
            assert!(x.pos.y >= -20.0 && x.pos.y <= 20.0);
            assert!(x.pos.z >= -5.0 && x.pos.z <= 5.0);
            assert!(x.vel.norm() <= 2.0 + 1e-9);
            assert_eq!(x.acc, Vector3::zeros());
        }
    }

    #[test]
    fn test_goal_bias_emits_goal() {
        let mut s = sampler_with_seed(11);
        let goal = StatePVA::at_rest(Vector3::new(10.0, 0.0, 0.0));
        let hits = (0..1000).filter(|_| s.sample() == goal).count();
        // expectation is 100 of 1000; allow a generous band
        assert!(hits > 30 && hits < 300, "goal emitted {} times", hits);
    }

    #[test]
    fn test_informed_positions_stay_in_spheroid() {
        let mut s = sampler_with_seed(17);
        // any solution below this cost can cover at most 15 m of path
        s.note_solution_cost(5.0);
        let start = Vector3::new(0.0, 0.0, 0.0);
        let goal = Vector3::new(10.0, 0.0, 0.0);
        let d_max = 3.0 * 5.0 / 1.0;
        for _ in 0..1000 {
            let x = s.sample();
            if x.pos == goal {
                continue; // goal-biased draw
            }
            let sum = (x.pos - start).norm() + (x.pos - goal).norm();
            assert!(
                sum <= d_max + 1e-6,
                "sample outside the informed spheroid: {}",
                sum
            );
        }
    }
}
