//! A declarative, resource-constrained scheduling engine backed by an SMT
//! optimizer.
//!
//! Callers build a [`Problem`](problem::Problem) out of tasks, resources,
//! constraints, indicators, objectives and buffers, then hand it to a
//! [`Solver`](solver::Solver) to produce a [`Solution`](solution::Solution).
//! Every builder method takes `&mut Problem` explicitly and returns the
//! entity's name; there is no implicit global "active problem" (see
//! DESIGN.md).

pub mod binding;
pub mod buffer;
pub mod config;
pub mod constraint;
pub mod cost;
pub mod error;
pub mod indicator;
pub mod json;
pub mod objective;
pub mod problem;
pub mod resource;
pub mod solution;
pub mod solver;
pub mod symbol;
pub mod task;
pub mod telemetry;
mod util;

pub use binding::{BindingOptions, ResourceRef};
pub use buffer::{Buffer, BufferKind};
pub use config::SolverConfig;
pub use constraint::{Constraint, ConstraintSpec};
pub use cost::CostFunction;
pub use error::{SchedexError, SchedexResult};
pub use indicator::{Indicator, IndicatorSpec};
pub use objective::{Direction, Objective, ObjectiveTarget};
pub use problem::{Horizon, Problem};
pub use resource::{CumulativeWorker, SelectWorkers, Worker};
pub use solution::Solution;
pub use solver::{ObjectivePolicy, Solver};
pub use symbol::CardinalityKind;
pub use task::{Task, TaskKind, TaskSpec};
