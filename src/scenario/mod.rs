//! Scenario runner
//!
//! Reads YAML scenarios, turns each step into guarded actions and runs
//! them in order against one remote session, reporting a Success, Skipped
//! or Failed outcome per step.

mod config;
mod plan;
mod report;
mod runner;
mod template;

pub use config::*;
pub use plan::{plan, PlanError, PlanItem};
pub use report::{print_step, print_summary, ScenarioResult, StepReport};
pub use runner::{open_session, run_scenario, RunOptions, ScenarioRunner};
pub use template::{render, render_json, Captures};
