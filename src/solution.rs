//! Solution reconstruction: reading a satisfying z3 [`Model`] back into the
//! JSON-friendly shape described in spec §6, with wall-clock projection
//! applied only at this output boundary.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use z3::Model;

use crate::error::{SchedexError, SchedexResult};
use crate::problem::{Horizon, Problem};
use crate::symbol::IntVar;

fn eval_int<'ctx>(model: &Model<'ctx>, value: &IntVar<'ctx>) -> SchedexResult<i64> {
    model
        .eval(value, true)
        .and_then(|v| v.as_i64())
        .ok_or_else(|| SchedexError::Unknown("model did not assign an integer value".into()))
}

fn eval_bool<'ctx>(model: &Model<'ctx>, value: &z3::ast::Bool<'ctx>) -> SchedexResult<bool> {
    model
        .eval(value, true)
        .and_then(|v| v.as_bool())
        .ok_or_else(|| SchedexError::Unknown("model did not assign a boolean value".into()))
}

/// One task's reconstructed schedule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskSolution {
    pub name: String,
    pub scheduled: bool,
    pub start: i64,
    pub end: i64,
    pub duration: i64,
    pub assigned_resources: Vec<String>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
}

/// One worker's reconstructed busy schedule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceSolution {
    pub name: String,
    /// `(task_name, busy_start, busy_end)`, only for intervals actually
    /// realized (not parked at a sentinel).
    pub busy_intervals: Vec<(String, i64, i64)>,
}

/// One buffer's reconstructed level trace.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BufferSolution {
    pub name: String,
    pub levels: Vec<i64>,
    pub change_times: Vec<i64>,
}

/// One indicator's reconstructed value.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndicatorSolution {
    pub name: String,
    pub value: i64,
}

/// Top-level problem metadata carried alongside the solution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProblemProperties {
    pub name: String,
    pub horizon_is_fixed: bool,
    /// The wall-clock period length (`problem.with_wall_clock`'s `period`),
    /// in seconds; `None` when the problem has no wall-clock origin.
    pub problem_timedelta: Option<i64>,
    pub problem_start_time: Option<DateTime<Utc>>,
    pub problem_end_time: Option<DateTime<Utc>>,
}

/// A fully reconstructed schedule (spec §6), with every entity collection
/// keyed by entity name rather than positionally indexed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Solution {
    pub horizon: i64,
    pub problem_properties: ProblemProperties,
    pub tasks: HashMap<String, TaskSolution>,
    pub resources: HashMap<String, ResourceSolution>,
    pub buffers: HashMap<String, BufferSolution>,
    pub indicators: HashMap<String, IndicatorSolution>,

    /// Internal index used by `find_another_solution` to exclude the exact
    /// prior assignment; not meant as a stable public surface of the JSON
    /// shape beyond what `tasks` already carries.
    pub(crate) task_starts: HashMap<String, i64>,
}

impl Solution {
    /// Read every entity's value out of a satisfying model.
    pub(crate) fn from_model<'ctx>(problem: &Problem<'ctx>, model: &Model<'ctx>) -> SchedexResult<Solution> {
        let horizon = eval_int(model, problem.horizon_var())?;
        let wall_clock = problem.wall_clock();

        let mut tasks = HashMap::new();
        let mut task_starts = HashMap::new();
        for task_name in problem.task_names().cloned().collect::<Vec<_>>() {
            let task = problem.task(&task_name)?;
            let scheduled = eval_bool(model, &task.scheduled)?;
            let start = eval_int(model, &task.start)?;
            let end = eval_int(model, &task.end)?;
            let duration = end - start;

            let mut assigned_resources = Vec::new();
            for worker_name in task.required_resources() {
                let worker = problem.worker(worker_name)?;
                if let Some((_, (busy_start, busy_end))) = worker
                    .busy_intervals()
                    .iter()
                    .find(|(t, _)| t == &task_name)
                {
                    let evaluated_start = eval_int(model, busy_start)?;
                    let evaluated_end = eval_int(model, busy_end)?;
                    if evaluated_start == start && evaluated_end == end {
                        assigned_resources.push(worker_name.clone());
                    }
                }
            }

            let (start_time, end_time) = match wall_clock {
                Some((origin, period)) if scheduled => (
                    Some(origin + period * start as i32),
                    Some(origin + period * end as i32),
                ),
                _ => (None, None),
            };

            task_starts.insert(task_name.clone(), start);
            tasks.insert(
                task_name.clone(),
                TaskSolution {
                    name: task_name,
                    scheduled,
                    start,
                    end,
                    duration,
                    assigned_resources,
                    start_time,
                    end_time,
                },
            );
        }

        let mut resources = HashMap::new();
        for worker_name in problem.worker_names().cloned().collect::<Vec<_>>() {
            let worker = problem.worker(&worker_name)?;
            let mut busy_intervals = Vec::new();
            for (task_name, (busy_start, busy_end)) in worker.busy_intervals() {
                let start = eval_int(model, busy_start)?;
                let end = eval_int(model, busy_end)?;
                if start >= 0 {
                    busy_intervals.push((task_name.clone(), start, end));
                }
            }
            resources.insert(
                worker_name.clone(),
                ResourceSolution {
                    name: worker_name,
                    busy_intervals,
                },
            );
        }

        let mut buffers = HashMap::new();
        for (buffer_name, _) in problem.buffers.iter() {
            let (level_vars, time_vars, _) = crate::buffer::level_trace(problem, buffer_name)?;
            let mut levels = Vec::with_capacity(level_vars.len());
            for v in &level_vars {
                levels.push(eval_int(model, v)?);
            }
            let mut change_times = Vec::with_capacity(time_vars.len());
            for v in &time_vars {
                change_times.push(eval_int(model, v)?);
            }
            let (levels, change_times) = crate::util::collapse_buffer_trace(&levels, &change_times);
            buffers.insert(
                buffer_name.clone(),
                BufferSolution {
                    name: buffer_name.clone(),
                    levels,
                    change_times,
                },
            );
        }

        let mut indicators = HashMap::new();
        for (indicator_name, indicator) in problem.indicators.iter() {
            indicators.insert(
                indicator_name.clone(),
                IndicatorSolution {
                    name: indicator_name.clone(),
                    value: eval_int(model, &indicator.value)?,
                },
            );
        }

        let (problem_timedelta, problem_start_time, problem_end_time) = match wall_clock {
            Some((origin, period)) => (
                Some(period.num_seconds()),
                Some(origin),
                Some(origin + period * horizon as i32),
            ),
            None => (None, None, None),
        };

        Ok(Solution {
            horizon,
            problem_properties: ProblemProperties {
                name: problem.name().to_string(),
                horizon_is_fixed: matches!(problem.horizon(), Horizon::Fixed(_)),
                problem_timedelta,
                problem_start_time,
                problem_end_time,
            },
            tasks,
            resources,
            buffers,
            indicators,
            task_starts,
        })
    }

    /// Serialize to pretty-printed JSON (spec §6).
    pub fn to_json(&self) -> SchedexResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
