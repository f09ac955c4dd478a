//! Plans through the single-wall scenario and prints the result.
//!
//! Run with `RUST_LOG=info` to watch the solution improve.

use std::time::Duration;

use kinoplan_planner::scenarios;
use kinoplan_planner::{KinoPlanner, PlanStatus};

fn main() {
    env_logger::init();

    let scenario = scenarios::single_wall();
    let mut planner = match KinoPlanner::new(scenario.config.clone()) {
        Ok(p) => p,
        Err(e) => {
            println!("Planner creation failed: {:?}", e);
            return;
        }
    };
    planner.set_position_checker(scenario.checker());
    planner.set_grid_searcher(scenario.searcher(2));
    planner.set_optimizer(scenario.optimizer());

    let status = match planner.plan(scenario.start, scenario.goal, Duration::from_secs(2)) {
        Ok(s) => s,
        Err(e) => {
            println!("Planning failed: {:?}", e);
            return;
        }
    };
    match status {
        PlanStatus::Failure => println!("no trajectory found"),
        PlanStatus::Success | PlanStatus::SuccessCloseGoal => {
            let traj = planner.trajectory().expect("solved");
            let stats = traj.stats();
            println!("status:        {:?}", status);
            println!("segments:      {}", stats.segments);
            println!("duration:      {:.2} s", stats.duration);
            println!("length:        {:.2} m", stats.length);
            println!("jerk integral: {:.2}", stats.jerk_integral);
            println!("tree nodes:    {}", planner.tree_node_count());
            if let Some(t) = planner.first_traj_use_time() {
                println!("first found:   {:.3} s", t);
            }
            if let Some(t) = planner.final_traj_use_time() {
                println!("final found:   {:.3} s", t);
            }
        }
    }
}
