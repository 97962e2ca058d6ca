//! Objectives: a named direction over either an [`Indicator`](crate::indicator::Indicator)
//! or the problem's horizon (spec §4.7). An objective is pure bookkeeping —
//! it names its target rather than holding a z3 term — so it carries no
//! `'ctx` lifetime; the solver resolves the target term and composes the
//! objective list into one optimization run according to its policy.

use crate::error::{SchedexError, SchedexResult};
use crate::problem::Problem;

/// What an objective optimizes.
#[derive(Debug, Clone)]
pub enum ObjectiveTarget {
    Indicator(String),
    Horizon,
}

/// The optimization direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Minimize,
    Maximize,
}

/// One entry in the problem's optimization goal.
#[derive(Debug, Clone)]
pub struct Objective {
    pub name: String,
    pub target: ObjectiveTarget,
    pub direction: Direction,
    /// Relative weight under `ObjectivePolicy::WeightedSum`; ignored by
    /// every other policy.
    pub weight: f64,
}

impl<'ctx> Problem<'ctx> {
    /// Register an objective over an existing indicator.
    pub fn add_objective_over_indicator(
        &mut self,
        name: Option<String>,
        indicator_name: &str,
        direction: Direction,
        weight: f64,
    ) -> SchedexResult<String> {
        self.indicators
            .get(indicator_name)
            .ok_or_else(|| SchedexError::UnknownEntity {
                kind: "Indicator",
                name: indicator_name.to_string(),
            })?;
        self.add_objective(
            name,
            ObjectiveTarget::Indicator(indicator_name.to_string()),
            direction,
            weight,
        )
    }

    /// Register an objective over the problem's horizon (the usual
    /// "minimize makespan" case when the horizon is free).
    pub fn add_objective_over_horizon(
        &mut self,
        name: Option<String>,
        direction: Direction,
        weight: f64,
    ) -> SchedexResult<String> {
        self.add_objective(name, ObjectiveTarget::Horizon, direction, weight)
    }

    fn add_objective(
        &mut self,
        name: Option<String>,
        target: ObjectiveTarget,
        direction: Direction,
        weight: f64,
    ) -> SchedexResult<String> {
        let name = name.unwrap_or_else(|| self.generate_name("Objective"));
        let objective = Objective {
            name: name.clone(),
            target,
            direction,
            weight,
        };
        self.register_objective(objective)?;
        Ok(name)
    }
}
