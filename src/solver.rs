//! Assembling a [`Problem`] into one z3 query and driving it: single-shot
//! `check`, multi-objective optimization, alternative-solution enumeration,
//! and SMT-LIB2 export (spec §4.7, §4.9).

use std::time::Duration as StdDuration;

use tracing::{debug, info, instrument, warn};
use z3::ast::{Ast, Int};
use z3::{Config as Z3Config, Context, Optimize, SatResult};

use crate::binding::{BindingOptions, ResourceRef};
use crate::buffer::buffer_assertions;
use crate::config::SolverConfig;
use crate::error::{SchedexError, SchedexResult};
use crate::objective::{Direction, ObjectiveTarget};
use crate::problem::Problem;
use crate::solution::Solution;
use crate::symbol::int_lit;

/// How a problem's [`Objective`](crate::objective::Objective) list combines
/// into one optimization run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ObjectivePolicy {
    /// Exactly one objective is present; optimize it directly.
    #[default]
    Single,
    /// Optimize objectives in declaration order, freezing each one's optimal
    /// value before moving to the next (z3's native `minimize`/`maximize`
    /// priority queue already does this).
    Lexicographic,
    /// Optimize `sum(weight_i * term_i)` as a single linear objective.
    WeightedSum,
    /// Ask z3's optimizer for a Pareto-optimal assignment.
    Pareto,
}

/// Create a fresh [`Context`] for one solve. Exposed so callers can share a
/// single context across several `Problem`s built against the same solver
/// settings.
pub fn new_context(config: &SolverConfig) -> Context {
    let mut z3_config = Z3Config::new();
    if let Some(timeout) = config.timeout_ms {
        z3_config.set_timeout_msec(timeout);
    }
    Context::new(&z3_config)
}

/// Flatten every registered entity's assertions into one list, in
/// registration order (spec §4.7 "assembly").
fn collect_assertions<'ctx>(problem: &Problem<'ctx>) -> SchedexResult<Vec<z3::ast::Bool<'ctx>>> {
    let ctx = problem.ctx();
    let mut out = problem.horizon_assertions();

    for (_, task) in problem.tasks.iter() {
        out.extend(task.assertions.clone());
    }
    for (_, constraint) in problem.constraints.iter() {
        out.extend(constraint.assertions.clone());
    }
    for (_, indicator) in problem.indicators.iter() {
        out.extend(indicator.assertions.clone());
    }
    for (name, _) in problem.buffers.iter() {
        out.extend(buffer_assertions(problem, name)?);
    }
    out.extend(mutual_exclusion_assertions(problem));
    out.extend(work_amount_assertions(problem)?);

    debug!(count = out.len(), "assembled theory assertions");
    let _ = ctx;
    Ok(out)
}

/// No two of a worker's busy intervals may overlap (spec §4.3): for each
/// worker, assert pairwise disjunction over every pair of its busy
/// intervals. Sentinel-parked intervals (negative) never overlap a real one,
/// so no special-casing is needed here.
fn mutual_exclusion_assertions<'ctx>(problem: &Problem<'ctx>) -> Vec<z3::ast::Bool<'ctx>> {
    let ctx = problem.ctx();
    let mut out = Vec::new();
    for (_, worker) in problem.workers.iter() {
        let intervals = worker.busy_intervals();
        for i in 0..intervals.len() {
            for j in (i + 1)..intervals.len() {
                let (_, (start_i, end_i)) = &intervals[i];
                let (_, (start_j, end_j)) = &intervals[j];
                out.push(z3::ast::Bool::or(
                    ctx,
                    &[&end_i.le(start_j), &end_j.le(start_i)],
                ));
            }
        }
    }
    out
}

/// For every task with a positive `work_amount`, the productivity
/// contributed by each required worker over its actual busy-interval width
/// `(busy_end - busy_start)` must cover it (spec §4.7 step 3,
/// `Σ_r productivity_r · (be_r − bs_r) ≥ work_amount`). A `SelectWorkers`
/// candidate that isn't picked is parked with `busy_start == busy_end` (see
/// `binding::bind_select_workers`), so its width — and contribution — is
/// zero without any extra gating.
fn work_amount_assertions<'ctx>(problem: &Problem<'ctx>) -> SchedexResult<Vec<z3::ast::Bool<'ctx>>> {
    let ctx = problem.ctx();
    let mut out = Vec::new();
    for (task_name, task) in problem.tasks.iter() {
        if task.work_amount <= 0 {
            continue;
        }
        let mut contributions = Vec::new();
        for worker_name in task.required_resources() {
            let worker = problem.worker(worker_name)?;
            let (_, (busy_start, busy_end)) = worker
                .busy_intervals()
                .iter()
                .find(|(t, _)| t == task_name)
                .ok_or_else(|| {
                    SchedexError::Unknown(format!(
                        "worker '{worker_name}' has no busy interval for task '{task_name}'"
                    ))
                })?;
            let width = Int::sub(ctx, &[busy_end, busy_start]);
            let productivity = int_lit(ctx, worker.productivity);
            contributions.push(Int::mul(ctx, &[&productivity, &width]));
        }
        if contributions.is_empty() {
            return Err(SchedexError::InvalidParameter(format!(
                "task '{task_name}' has a work_amount but no required resources"
            )));
        }
        let refs: Vec<&Int<'ctx>> = contributions.iter().collect();
        let total = Int::add(ctx, &refs);
        out.push(total.ge(&int_lit(ctx, task.work_amount)));
    }
    Ok(out)
}

/// Resolve an objective's target to its z3 term.
fn resolve_target<'ctx>(problem: &Problem<'ctx>, target: &ObjectiveTarget) -> SchedexResult<Int<'ctx>> {
    match target {
        ObjectiveTarget::Horizon => Ok(problem.horizon_var().clone()),
        ObjectiveTarget::Indicator(name) => Ok(problem
            .indicators
            .get(name)
            .ok_or_else(|| SchedexError::UnknownEntity {
                kind: "Indicator",
                name: name.clone(),
            })?
            .value
            .clone()),
    }
}

/// Drives one [`Problem`] through z3's optimizer.
pub struct Solver<'ctx> {
    config: SolverConfig,
    optimize: Optimize<'ctx>,
}

impl<'ctx> Solver<'ctx> {
    /// Build a solver over `problem`, assembling every assertion and
    /// registering its objectives under `policy`.
    #[instrument(skip(problem), fields(problem = problem.name()))]
    pub fn new(problem: &Problem<'ctx>, config: SolverConfig) -> SchedexResult<Self> {
        let ctx = problem.ctx();
        let optimize = Optimize::new(ctx);

        for assertion in collect_assertions(problem)? {
            optimize.assert(&assertion);
        }

        let policy = config.objective_policy;
        let objectives = &problem.objectives;
        match policy {
            ObjectivePolicy::Single | ObjectivePolicy::Lexicographic => {
                for objective in objectives {
                    let term = resolve_target(problem, &objective.target)?;
                    match objective.direction {
                        Direction::Minimize => {
                            optimize.minimize(&term);
                        }
                        Direction::Maximize => {
                            optimize.maximize(&term);
                        }
                    }
                }
            }
            ObjectivePolicy::WeightedSum => {
                if !objectives.is_empty() {
                    let mut terms = Vec::with_capacity(objectives.len());
                    for objective in objectives {
                        let term = resolve_target(problem, &objective.target)?;
                        let signed = match objective.direction {
                            Direction::Minimize => term,
                            Direction::Maximize => Int::mul(ctx, &[&int_lit(ctx, -1), &term]),
                        };
                        let scaled = Int::mul(ctx, &[&int_lit(ctx, objective.weight.round() as i64), &signed]);
                        terms.push(scaled);
                    }
                    let refs: Vec<&Int<'ctx>> = terms.iter().collect();
                    let combined = Int::add(ctx, &refs);
                    optimize.minimize(&combined);
                }
            }
            ObjectivePolicy::Pareto => {
                for objective in objectives {
                    let term = resolve_target(problem, &objective.target)?;
                    match objective.direction {
                        Direction::Minimize => {
                            optimize.minimize(&term);
                        }
                        Direction::Maximize => {
                            optimize.maximize(&term);
                        }
                    }
                }
            }
        }

        if let Some(seed) = config.random_seed {
            let mut params = z3::Params::new(ctx);
            params.set_u32("random_seed", seed);
            optimize.set_params(&params);
        }

        Ok(Solver { config, optimize })
    }

    /// Run the optimizer and report the outcome.
    #[instrument(skip(self, problem), fields(problem = problem.name()))]
    pub fn check(&self, problem: &Problem<'ctx>) -> SchedexResult<Solution> {
        let timeout = self.config.timeout_ms.map(StdDuration::from_millis);
        let _ = timeout; // timeout is configured on the Context (see `new_context`), kept here for log context only
        match self.optimize.check(&[]) {
            SatResult::Sat => {
                info!("solution found");
                let model = self.optimize.get_model().ok_or_else(|| {
                    SchedexError::Unknown("solver reported sat but produced no model".into())
                })?;
                Solution::from_model(problem, &model)
            }
            SatResult::Unsat => {
                warn!("problem is unsatisfiable");
                Err(SchedexError::Unsat)
            }
            SatResult::Unknown => {
                let reason = self.optimize.get_reason_unknown().unwrap_or_default();
                warn!(reason, "solver returned unknown");
                Err(SchedexError::Unknown(reason))
            }
        }
    }

    /// Re-solve after excluding the exact assignment of `previous`, to
    /// enumerate a distinct schedule (spec §4.9).
    #[instrument(skip(self, problem, previous), fields(problem = problem.name()))]
    pub fn find_another_solution(
        &self,
        problem: &Problem<'ctx>,
        previous: &Solution,
    ) -> SchedexResult<Solution> {
        let ctx = problem.ctx();
        let mut diffs = Vec::new();
        for (task_name, task) in problem.tasks.iter() {
            if let Some(prior_start) = previous.task_starts.get(task_name) {
                diffs.push(task.start.ge(&int_lit(ctx, prior_start + 1)));
                diffs.push(task.start.le(&int_lit(ctx, prior_start - 1)));
            }
        }
        if diffs.is_empty() {
            return Err(SchedexError::InvalidParameter(
                "find_another_solution needs at least one scheduled task to differ from".into(),
            ));
        }
        let refs: Vec<&z3::ast::Bool<'ctx>> = diffs.iter().collect();
        self.optimize.assert(&z3::ast::Bool::or(ctx, &refs));
        self.check(problem)
    }

    /// Render the assembled problem (assertions plus optimization goals) as
    /// SMT-LIB2 text, for external inspection or replay.
    pub fn export_to_smt2(&self) -> String {
        self.optimize.to_string()
    }
}
