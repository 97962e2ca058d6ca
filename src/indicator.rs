//! Derived integer metrics over a problem: flow time, makespan, utilization,
//! cost, tardiness and friends (spec §4.5). Each indicator compiles to one
//! integer term plus the assertions defining it, and optionally carries
//! `[lo, hi]` bounds that become ordinary theory assertions on that term.

use z3::ast::{Ast, Int};

use crate::error::{SchedexError, SchedexResult};
use crate::problem::{Horizon, Problem};
use crate::symbol::{fresh_int, int_lit, positive_part, sum, BoolVar, IntVar};
use crate::util::{assert_maximum, assert_minimum, sort_no_duplicates};

/// A very negative placeholder so an unscheduled optional task never wins a
/// `max` over its peers (spec §4.5, `MaximumLateness`).
const NEVER_WINS_MAX: i64 = i64::MIN / 2;

/// The declarative shape of one indicator.
pub enum IndicatorSpec {
    Flowtime { tasks: Vec<String> },
    Makespan { tasks: Vec<String> },
    Utilization { resource: String },
    ResourceCost { resource: String },
    NumberTasksAssigned { resource: String },
    Tardiness { task: String },
    Earliness { task: String },
    NumberOfTardyTasks { tasks: Vec<String> },
    MaximumLateness { tasks: Vec<String> },
    ResourceIdle { resource: String },
    MaxBufferLevel { buffer: String },
    MinBufferLevel { buffer: String },
}

/// A compiled indicator: its value term, the assertions defining it, and
/// optional bounds.
pub struct Indicator<'ctx> {
    pub label: &'static str,
    pub value: IntVar<'ctx>,
    pub lower_bound: Option<i64>,
    pub upper_bound: Option<i64>,
    pub(crate) assertions: Vec<BoolVar<'ctx>>,
}

fn label_of(spec: &IndicatorSpec) -> &'static str {
    match spec {
        IndicatorSpec::Flowtime { .. } => "Flowtime",
        IndicatorSpec::Makespan { .. } => "Makespan",
        IndicatorSpec::Utilization { .. } => "Utilization",
        IndicatorSpec::ResourceCost { .. } => "ResourceCost",
        IndicatorSpec::NumberTasksAssigned { .. } => "NumberTasksAssigned",
        IndicatorSpec::Tardiness { .. } => "Tardiness",
        IndicatorSpec::Earliness { .. } => "Earliness",
        IndicatorSpec::NumberOfTardyTasks { .. } => "NumberOfTardyTasks",
        IndicatorSpec::MaximumLateness { .. } => "MaximumLateness",
        IndicatorSpec::ResourceIdle { .. } => "ResourceIdle",
        IndicatorSpec::MaxBufferLevel { .. } => "MaxBufferLevel",
        IndicatorSpec::MinBufferLevel { .. } => "MinBufferLevel",
    }
}

/// `1` if `flag` holds, `0` otherwise, as an integer term.
fn indicator_bool<'ctx>(ctx: &'ctx z3::Context, flag: &BoolVar<'ctx>) -> IntVar<'ctx> {
    flag.ite(&int_lit(ctx, 1), &int_lit(ctx, 0))
}

fn due_date_or_err(problem: &Problem<'_>, task_name: &str) -> SchedexResult<i64> {
    let task = problem.task(task_name)?;
    task.due_date.ok_or_else(|| {
        SchedexError::InvalidParameter(format!("task '{task_name}' has no due_date"))
    })
}

impl<'ctx> Problem<'ctx> {
    /// Compile and register an indicator, returning its name.
    pub fn add_indicator(
        &mut self,
        name: Option<String>,
        spec: IndicatorSpec,
        lower_bound: Option<i64>,
        upper_bound: Option<i64>,
    ) -> SchedexResult<String> {
        let label = label_of(&spec);
        let (value, mut assertions) = self.compile_indicator(&spec)?;

        let ctx = self.ctx();
        if let Some(lo) = lower_bound {
            assertions.push(value.ge(&int_lit(ctx, lo)));
        }
        if let Some(hi) = upper_bound {
            assertions.push(value.le(&int_lit(ctx, hi)));
        }

        let name = name.unwrap_or_else(|| self.generate_name(label));
        let indicator = Indicator {
            label,
            value,
            lower_bound,
            upper_bound,
            assertions,
        };
        self.register_indicator(name.clone(), indicator)?;
        Ok(name)
    }

    fn compile_indicator(
        &mut self,
        spec: &IndicatorSpec,
    ) -> SchedexResult<(IntVar<'ctx>, Vec<BoolVar<'ctx>>)> {
        let ctx = self.ctx();
        match spec {
            IndicatorSpec::Flowtime { tasks } => {
                let mut terms = Vec::with_capacity(tasks.len());
                for t in tasks {
                    terms.push(self.task(t)?.end.clone());
                }
                let value = fresh_int(ctx, "Flowtime");
                Ok((value.clone(), vec![value._eq(&sum(ctx, &terms))]))
            }
            IndicatorSpec::Makespan { tasks } => {
                let ends: Vec<_> = tasks
                    .iter()
                    .map(|t| self.task(t).map(|task| task.end.clone()))
                    .collect::<SchedexResult<_>>()?;
                let value = fresh_int(ctx, "Makespan");
                Ok((value.clone(), assert_maximum(ctx, &value, &ends)))
            }
            IndicatorSpec::Utilization { resource } => {
                let busy: Vec<IntVar<'ctx>> = self
                    .worker(resource)?
                    .busy_intervals()
                    .iter()
                    .map(|(_, (s, e))| Int::sub(ctx, &[e, s]))
                    .collect();
                let total_busy = sum(ctx, &busy);
                let scaled = Int::mul(ctx, &[&int_lit(ctx, 100), &total_busy]);
                let denominator = match self.horizon() {
                    Horizon::Fixed(bound) => int_lit(ctx, bound),
                    Horizon::Free => self.horizon_var().clone(),
                };
                let value = fresh_int(ctx, "Utilization");
                let quotient = &scaled / &denominator;
                Ok((value.clone(), vec![value._eq(&quotient)]))
            }
            IndicatorSpec::ResourceCost { resource } => {
                let worker = self.worker(resource)?;
                let cost = worker.cost.clone();
                let busy = worker.busy_intervals().to_vec();
                let mut terms = Vec::with_capacity(busy.len());
                if let Some(cost) = cost {
                    for (_, (start, end)) in &busy {
                        let duration = Int::sub(ctx, &[end, start]);
                        if cost.is_constant() {
                            let per_period = cost.evaluate(ctx, start);
                            let doubled = Int::mul(ctx, &[&int_lit(ctx, 2), &per_period]);
                            terms.push(Int::mul(ctx, &[&doubled, &duration]));
                        } else {
                            let at_start = cost.evaluate(ctx, start);
                            let at_end = cost.evaluate(ctx, end);
                            let trapezoid = Int::add(ctx, &[&at_start, &at_end]);
                            terms.push(Int::mul(ctx, &[&trapezoid, &duration]));
                        }
                    }
                }
                let value = fresh_int(ctx, "ResourceCost");
                Ok((value.clone(), vec![value._eq(&sum(ctx, &terms))]))
            }
            IndicatorSpec::NumberTasksAssigned { resource } => {
                let flags: Vec<IntVar<'ctx>> = self
                    .worker(resource)?
                    .busy_intervals()
                    .iter()
                    .map(|(_, (s, _))| indicator_bool(ctx, &s.ge(&int_lit(ctx, 0))))
                    .collect();
                let value = fresh_int(ctx, "NumberTasksAssigned");
                Ok((value.clone(), vec![value._eq(&sum(ctx, &flags))]))
            }
            IndicatorSpec::Tardiness { task } => {
                let due = due_date_or_err(self, task)?;
                let end = self.task(task)?.end.clone();
                let value = fresh_int(ctx, "Tardiness");
                let diff = Int::sub(ctx, &[&end, &int_lit(ctx, due)]);
                Ok((value.clone(), vec![value._eq(&positive_part(ctx, &diff))]))
            }
            IndicatorSpec::Earliness { task } => {
                let due = due_date_or_err(self, task)?;
                let end = self.task(task)?.end.clone();
                let value = fresh_int(ctx, "Earliness");
                let diff = Int::sub(ctx, &[&int_lit(ctx, due), &end]);
                Ok((value.clone(), vec![value._eq(&positive_part(ctx, &diff))]))
            }
            IndicatorSpec::NumberOfTardyTasks { tasks } => {
                let mut flags = Vec::with_capacity(tasks.len());
                for t in tasks {
                    let due = due_date_or_err(self, t)?;
                    let end = self.task(t)?.end.clone();
                    flags.push(indicator_bool(ctx, &end.gt(&int_lit(ctx, due))));
                }
                let value = fresh_int(ctx, "NumberOfTardyTasks");
                Ok((value.clone(), vec![value._eq(&sum(ctx, &flags))]))
            }
            IndicatorSpec::MaximumLateness { tasks } => {
                let mut terms = Vec::with_capacity(tasks.len());
                for t in tasks {
                    let due = due_date_or_err(self, t)?;
                    let task = self.task(t)?;
                    let lateness = Int::sub(ctx, &[&task.end, &int_lit(ctx, due)]);
                    let term = if task.optional {
                        task.scheduled.ite(&lateness, &int_lit(ctx, NEVER_WINS_MAX))
                    } else {
                        lateness
                    };
                    terms.push(term);
                }
                let value = fresh_int(ctx, "MaximumLateness");
                Ok((value.clone(), assert_maximum(ctx, &value, &terms)))
            }
            IndicatorSpec::ResourceIdle { resource } => {
                let busy: Vec<(IntVar<'ctx>, IntVar<'ctx>)> = self
                    .worker(resource)?
                    .busy_intervals()
                    .iter()
                    .map(|(_, iv)| iv.clone())
                    .collect();
                let starts: Vec<IntVar<'ctx>> = busy.iter().map(|(s, _)| s.clone()).collect();
                let ends: Vec<IntVar<'ctx>> = busy.iter().map(|(_, e)| e.clone()).collect();
                let (sorted_starts, c1) = sort_no_duplicates(ctx, &starts);
                let (sorted_ends, c2) = sort_no_duplicates(ctx, &ends);
                let mut assertions = c1;
                assertions.extend(c2);

                let mut gaps = Vec::with_capacity(sorted_starts.len().saturating_sub(1));
                for i in 1..sorted_starts.len() {
                    let both_real = z3::ast::Bool::and(
                        ctx,
                        &[
                            &sorted_ends[i - 1].ge(&int_lit(ctx, 0)),
                            &sorted_starts[i].ge(&int_lit(ctx, 0)),
                        ],
                    );
                    let gap = Int::sub(ctx, &[&sorted_starts[i], &sorted_ends[i - 1]]);
                    gaps.push(both_real.ite(&gap, &int_lit(ctx, 0)));
                }
                let value = fresh_int(ctx, "ResourceIdle");
                assertions.push(value._eq(&sum(ctx, &gaps)));
                Ok((value, assertions))
            }
            IndicatorSpec::MaxBufferLevel { buffer } => {
                let (levels, _, mut assertions) = crate::buffer::level_trace(self, buffer)?;
                let value = fresh_int(ctx, "MaxBufferLevel");
                assertions.extend(assert_maximum(ctx, &value, &levels));
                Ok((value, assertions))
            }
            IndicatorSpec::MinBufferLevel { buffer } => {
                let (levels, _, mut assertions) = crate::buffer::level_trace(self, buffer)?;
                let value = fresh_int(ctx, "MinBufferLevel");
                assertions.extend(assert_minimum(ctx, &value, &levels));
                Ok((value, assertions))
            }
        }
    }
}
