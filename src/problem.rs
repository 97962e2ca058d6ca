//! The entity registry: [`Problem`] owns every task, resource, constraint,
//! indicator, objective and buffer by name, and is the explicit handle every
//! builder method in this crate takes instead of an implicit global context
//! (see DESIGN.md, "active problem").

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use z3::ast::Bool;
use z3::Context;

use crate::buffer::Buffer;
use crate::error::{SchedexError, SchedexResult};
use crate::objective::Objective;
use crate::resource::{CumulativeWorker, SelectWorkers, Worker};
use crate::symbol::{int_lit, named_int, BoolVar, IntVar};
use crate::task::Task;

/// An insertion-ordered, name-keyed registry. Serialization and solution
/// reconstruction both depend on this order (spec §4.1).
#[derive(Debug, Default)]
pub(crate) struct OrderedMap<T> {
    order: Vec<String>,
    entries: HashMap<String, T>,
}

impl<T> OrderedMap<T> {
    fn new() -> Self {
        OrderedMap {
            order: Vec::new(),
            entries: HashMap::new(),
        }
    }

    pub(crate) fn insert(&mut self, name: String, value: T) {
        if !self.entries.contains_key(&name) {
            self.order.push(name.clone());
        }
        self.entries.insert(name, value);
    }

    pub(crate) fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub(crate) fn get(&self, name: &str) -> Option<&T> {
        self.entries.get(name)
    }

    pub(crate) fn get_mut(&mut self, name: &str) -> Option<&mut T> {
        self.entries.get_mut(name)
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = (&String, &T)> {
        self.order.iter().map(move |k| (k, &self.entries[k]))
    }

    pub(crate) fn values(&self) -> impl Iterator<Item = &T> {
        self.order.iter().map(move |k| &self.entries[k])
    }

    pub(crate) fn len(&self) -> usize {
        self.order.len()
    }
}

/// The scheduling horizon: either a caller-fixed upper bound, or a free
/// variable left for a makespan objective to minimize.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Horizon {
    Fixed(i64),
    Free,
}

/// A declarative scheduling problem bound to one z3 [`Context`].
///
/// All builder methods (`add_task`, `add_worker`, `add_constraint`, ...) take
/// `&mut Problem` and return the entity's (possibly auto-generated) name,
/// which is the handle used to refer back to it from later builder calls.
pub struct Problem<'ctx> {
    ctx: &'ctx Context,
    name: String,
    horizon: Horizon,
    horizon_var: IntVar<'ctx>,
    start_time: Option<DateTime<Utc>>,
    delta_time: Option<Duration>,

    pub(crate) tasks: OrderedMap<Task<'ctx>>,
    pub(crate) workers: OrderedMap<Worker<'ctx>>,
    pub(crate) cumulative_workers: OrderedMap<CumulativeWorker>,
    pub(crate) select_workers: OrderedMap<SelectWorkers<'ctx>>,
    pub(crate) constraints: OrderedMap<crate::constraint::Constraint<'ctx>>,
    pub(crate) indicators: OrderedMap<crate::indicator::Indicator<'ctx>>,
    pub(crate) objectives: Vec<Objective>,
    pub(crate) buffers: OrderedMap<Buffer>,

    next_uid: u64,
    next_optional_task_rank: i64,
    next_sentinel: i64,
}

impl<'ctx> Problem<'ctx> {
    /// Create a new problem bound to `ctx`, with the given scheduling
    /// horizon.
    pub fn new(ctx: &'ctx Context, name: impl Into<String>, horizon: Horizon) -> Self {
        let horizon_var = named_int(ctx, "horizon");
        Problem {
            ctx,
            name: name.into(),
            horizon,
            horizon_var,
            start_time: None,
            delta_time: None,
            tasks: OrderedMap::new(),
            workers: OrderedMap::new(),
            cumulative_workers: OrderedMap::new(),
            select_workers: OrderedMap::new(),
            constraints: OrderedMap::new(),
            indicators: OrderedMap::new(),
            objectives: Vec::new(),
            buffers: OrderedMap::new(),
            next_uid: 1,
            next_optional_task_rank: 0,
            next_sentinel: -1,
        }
    }

    /// Attach a wall-clock origin and period length, used only to render
    /// solutions into ISO-8601 timestamps at the output boundary (spec §4.8).
    pub fn with_wall_clock(mut self, start_time: DateTime<Utc>, period: Duration) -> Self {
        self.start_time = Some(start_time);
        self.delta_time = Some(period);
        self
    }

    pub fn ctx(&self) -> &'ctx Context {
        self.ctx
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn horizon(&self) -> Horizon {
        self.horizon
    }

    pub fn horizon_var(&self) -> &IntVar<'ctx> {
        &self.horizon_var
    }

    pub fn wall_clock(&self) -> Option<(DateTime<Utc>, Duration)> {
        match (self.start_time, self.delta_time) {
            (Some(s), Some(d)) => Some((s, d)),
            _ => None,
        }
    }

    /// The `horizon >= 0` / `horizon <= fixed_value` assertion implied by the
    /// problem's horizon setting.
    pub(crate) fn horizon_assertions(&self) -> Vec<BoolVar<'ctx>> {
        let mut out = vec![self.horizon_var.ge(&int_lit(self.ctx, 0))];
        if let Horizon::Fixed(v) = self.horizon {
            out.push(self.horizon_var.le(&int_lit(self.ctx, v)));
        }
        out
    }

    /// Generate `<TypeTag>_<8-hex-from-uid>` for an entity created without an
    /// explicit name (spec §4.1).
    pub(crate) fn generate_name(&mut self, type_tag: &str) -> String {
        let uid = self.next_uid;
        self.next_uid += 1;
        format!("{type_tag}_{uid:08x}")
    }

    /// A fresh, process-wide monotonically decreasing negative sentinel, used
    /// to park unselected `SelectWorkers` candidates (spec §3 "Busy
    /// interval").
    pub(crate) fn fresh_sentinel(&mut self) -> i64 {
        let value = self.next_sentinel;
        self.next_sentinel -= 1;
        value
    }

    /// The 1-based creation rank of the next optional task, used as its
    /// "moved to the past" sentinel point (spec §4.2).
    pub(crate) fn next_optional_rank(&mut self) -> i64 {
        self.next_optional_task_rank += 1;
        self.next_optional_task_rank
    }

    fn check_duplicate(&self, kind: &'static str, name: &str) -> SchedexResult<()> {
        let exists = match kind {
            "Task" => self.tasks.contains(name),
            "Worker" => self.workers.contains(name),
            "CumulativeWorker" => self.cumulative_workers.contains(name),
            "SelectWorkers" => self.select_workers.contains(name),
            "Constraint" => self.constraints.contains(name),
            "Indicator" => self.indicators.contains(name),
            "Objective" => self.objectives.iter().any(|o| o.name == name),
            "Buffer" => self.buffers.contains(name),
            _ => false,
        };
        if exists {
            Err(SchedexError::DuplicateName {
                kind,
                name: name.to_string(),
            })
        } else {
            Ok(())
        }
    }

    pub(crate) fn register_task(&mut self, name: String, task: Task<'ctx>) -> SchedexResult<()> {
        self.check_duplicate("Task", &name)?;
        self.tasks.insert(name, task);
        Ok(())
    }

    pub(crate) fn register_worker(
        &mut self,
        name: String,
        worker: Worker<'ctx>,
    ) -> SchedexResult<()> {
        self.check_duplicate("Worker", &name)?;
        self.workers.insert(name, worker);
        Ok(())
    }

    pub(crate) fn register_cumulative_worker(
        &mut self,
        name: String,
        worker: CumulativeWorker,
    ) -> SchedexResult<()> {
        self.check_duplicate("CumulativeWorker", &name)?;
        self.cumulative_workers.insert(name, worker);
        Ok(())
    }

    pub(crate) fn register_select_workers(
        &mut self,
        name: String,
        select: SelectWorkers<'ctx>,
    ) -> SchedexResult<()> {
        self.check_duplicate("SelectWorkers", &name)?;
        self.select_workers.insert(name, select);
        Ok(())
    }

    pub(crate) fn register_constraint(
        &mut self,
        name: String,
        constraint: crate::constraint::Constraint<'ctx>,
    ) -> SchedexResult<()> {
        self.check_duplicate("Constraint", &name)?;
        self.constraints.insert(name, constraint);
        Ok(())
    }

    pub(crate) fn register_indicator(
        &mut self,
        name: String,
        indicator: crate::indicator::Indicator<'ctx>,
    ) -> SchedexResult<()> {
        self.check_duplicate("Indicator", &name)?;
        self.indicators.insert(name, indicator);
        Ok(())
    }

    pub(crate) fn register_objective(&mut self, objective: Objective) -> SchedexResult<()> {
        self.check_duplicate("Objective", &objective.name)?;
        self.objectives.push(objective);
        Ok(())
    }

    pub(crate) fn register_buffer(&mut self, name: String, buffer: Buffer) -> SchedexResult<()> {
        self.check_duplicate("Buffer", &name)?;
        self.buffers.insert(name, buffer);
        Ok(())
    }

    pub fn task(&self, name: &str) -> SchedexResult<&Task<'ctx>> {
        self.tasks.get(name).ok_or_else(|| SchedexError::UnknownEntity {
            kind: "Task",
            name: name.to_string(),
        })
    }

    pub fn worker(&self, name: &str) -> SchedexResult<&Worker<'ctx>> {
        self.workers
            .get(name)
            .ok_or_else(|| SchedexError::UnknownEntity {
                kind: "Worker",
                name: name.to_string(),
            })
    }

    pub fn buffer(&self, name: &str) -> SchedexResult<&Buffer> {
        self.buffers
            .get(name)
            .ok_or_else(|| SchedexError::UnknownEntity {
                kind: "Buffer",
                name: name.to_string(),
            })
    }

    pub fn task_names(&self) -> impl Iterator<Item = &String> {
        self.tasks.iter().map(|(k, _)| k)
    }

    pub fn worker_names(&self) -> impl Iterator<Item = &String> {
        self.workers.iter().map(|(k, _)| k)
    }

    /// `true` if the constant literal is already the "scheduled" value z3
    /// uses for mandatory tasks, used by a handful of call sites that need to
    /// special-case the always-true case instead of emitting a tautological
    /// assertion.
    pub(crate) fn const_true(&self) -> Bool<'ctx> {
        Bool::from_bool(self.ctx, true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use z3::Config;

    #[test]
    fn generated_names_are_unique_and_tagged() {
        let cfg = Config::new();
        let ctx = Context::new(&cfg);
        let mut problem = Problem::new(&ctx, "p", Horizon::Fixed(10));
        let a = problem.generate_name("Task");
        let b = problem.generate_name("Task");
        assert_ne!(a, b);
        assert!(a.starts_with("Task_"));
        assert!(b.starts_with("Task_"));
    }

    #[test]
    fn sentinels_strictly_decrease() {
        let cfg = Config::new();
        let ctx = Context::new(&cfg);
        let mut problem = Problem::new(&ctx, "p", Horizon::Free);
        let a = problem.fresh_sentinel();
        let b = problem.fresh_sentinel();
        assert!(b < a);
        assert!(a < 0);
    }
}
