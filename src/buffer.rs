//! Buffers: a running stock level driven by the tasks that load and unload
//! it (spec §4.6). A [`Buffer`] itself is plain bookkeeping — it carries no
//! `'ctx` state, only the (task, quantity) pairs registered against it by
//! `TaskLoadBuffer`/`TaskUnloadBuffer` — because those registrations can
//! keep arriving after the buffer is created. The level trace and its
//! theory assertions are therefore compiled on demand, by the solver's
//! assembly step and by the buffer-level indicators, not eagerly at
//! construction time like every other entity in this crate.

use z3::ast::{Ast, Bool};
use z3::Context;

use crate::error::{SchedexError, SchedexResult};
use crate::problem::Problem;
use crate::symbol::{fresh_int, int_lit, BoolVar, IntVar};

/// Whether two events of the buffer may land on the same instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferKind {
    /// No two load/unload events may coincide.
    NonConcurrent,
    /// Simultaneous load/unload events are allowed.
    Concurrent,
}

/// A stock level driven by the tasks bound to it via `TaskLoadBuffer`
/// (adds at the task's end) and `TaskUnloadBuffer` (removes at the task's
/// start).
pub struct Buffer {
    pub kind: BufferKind,
    pub initial_level: i64,
    pub final_level: Option<i64>,
    pub lower_bound: Option<i64>,
    pub upper_bound: Option<i64>,
    pub(crate) loading_tasks: Vec<(String, i64)>,
    pub(crate) unloading_tasks: Vec<(String, i64)>,
}

impl Buffer {
    pub(crate) fn add_loading_task(&mut self, task: String, quantity: i64) -> SchedexResult<()> {
        if self.loading_tasks.iter().any(|(t, q)| *t == task && *q == quantity) {
            return Err(SchedexError::DuplicateAssertion(task));
        }
        self.loading_tasks.push((task, quantity));
        Ok(())
    }

    pub(crate) fn add_unloading_task(&mut self, task: String, quantity: i64) -> SchedexResult<()> {
        if self.unloading_tasks.iter().any(|(t, q)| *t == task && *q == quantity) {
            return Err(SchedexError::DuplicateAssertion(task));
        }
        self.unloading_tasks.push((task, quantity));
        Ok(())
    }
}

impl<'ctx> Problem<'ctx> {
    /// Add a buffer. `lower_bound`/`upper_bound` constrain every level in
    /// the trace (including the initial one); `final_level` pins the level
    /// after the last event.
    pub fn add_buffer(
        &mut self,
        name: Option<String>,
        kind: BufferKind,
        initial_level: i64,
        lower_bound: Option<i64>,
        upper_bound: Option<i64>,
        final_level: Option<i64>,
    ) -> SchedexResult<String> {
        if let (Some(lo), Some(hi)) = (lower_bound, upper_bound) {
            if lo > hi {
                return Err(SchedexError::InvalidParameter(
                    "buffer lower_bound must not exceed upper_bound".into(),
                ));
            }
        }
        let name = name.unwrap_or_else(|| self.generate_name("Buffer"));
        let buffer = Buffer {
            kind,
            initial_level,
            final_level,
            lower_bound,
            upper_bound,
            loading_tasks: Vec::new(),
            unloading_tasks: Vec::new(),
        };
        self.register_buffer(name.clone(), buffer)?;
        Ok(name)
    }
}

/// One raw `(event_time, signed_quantity)` pair: positive for a load (at the
/// task's end), negative for an unload (at the task's start).
fn buffer_events<'ctx>(
    problem: &Problem<'ctx>,
    buffer_name: &str,
) -> SchedexResult<Vec<(IntVar<'ctx>, i64)>> {
    let buffer = problem.buffer(buffer_name)?;
    let mut events = Vec::new();
    for (task_name, quantity) in &buffer.loading_tasks {
        events.push((problem.task(task_name)?.end.clone(), *quantity));
    }
    for (task_name, quantity) in &buffer.unloading_tasks {
        events.push((problem.task(task_name)?.start.clone(), -*quantity));
    }
    Ok(events)
}

/// Sort `(time, delta)` pairs by `time`, carrying `delta` along through the
/// same swap network (extends [`crate::util::sort_allow_duplicates`] with a
/// payload, since a buffer's deltas are constants that must move with their
/// event time).
fn sort_events_by_time<'ctx>(
    ctx: &'ctx Context,
    times: &[IntVar<'ctx>],
    deltas: &[i64],
) -> (Vec<IntVar<'ctx>>, Vec<IntVar<'ctx>>, Vec<BoolVar<'ctx>>) {
    let n = times.len();
    let mut t = times.to_vec();
    let mut d: Vec<IntVar<'ctx>> = deltas.iter().map(|v| int_lit(ctx, *v)).collect();
    let mut assertions = Vec::new();

    for _ in 0..n {
        let mut next_t = t.clone();
        let mut next_d = d.clone();
        for i in 0..n.saturating_sub(1) {
            let in_order = t[i].le(&t[i + 1]);
            let t1 = fresh_int(ctx, "buffer_sort_t_lo");
            let t2 = fresh_int(ctx, "buffer_sort_t_hi");
            let d1 = fresh_int(ctx, "buffer_sort_d_lo");
            let d2 = fresh_int(ctx, "buffer_sort_d_hi");
            let kept = Bool::and(
                ctx,
                &[&t1._eq(&t[i]), &t2._eq(&t[i + 1]), &d1._eq(&d[i]), &d2._eq(&d[i + 1])],
            );
            let swapped = Bool::and(
                ctx,
                &[&t1._eq(&t[i + 1]), &t2._eq(&t[i]), &d1._eq(&d[i + 1]), &d2._eq(&d[i])],
            );
            assertions.push(in_order.ite(&kept, &swapped));
            next_t[i] = t1;
            next_t[i + 1] = t2;
            next_d[i] = d1;
            next_d[i + 1] = d2;
        }
        t = next_t;
        d = next_d;
    }
    (t, d, assertions)
}

/// The running level trace: `levels[0]` is the initial level, `levels[k]`
/// the level after the `k`-th event in time order. Also returns the sorted
/// event times (for the non-concurrency check) and the assertions tying the
/// trace to the underlying task variables.
pub(crate) fn level_trace<'ctx>(
    problem: &Problem<'ctx>,
    buffer_name: &str,
) -> SchedexResult<(Vec<IntVar<'ctx>>, Vec<IntVar<'ctx>>, Vec<BoolVar<'ctx>>)> {
    let ctx = problem.ctx();
    let buffer = problem.buffer(buffer_name)?;
    let events = buffer_events(problem, buffer_name)?;

    if events.is_empty() {
        return Ok((vec![int_lit(ctx, buffer.initial_level)], Vec::new(), Vec::new()));
    }

    let times: Vec<IntVar<'ctx>> = events.iter().map(|(t, _)| t.clone()).collect();
    let deltas: Vec<i64> = events.iter().map(|(_, d)| *d).collect();
    let (sorted_times, sorted_deltas, mut assertions) = sort_events_by_time(ctx, &times, &deltas);

    let mut levels = vec![int_lit(ctx, buffer.initial_level)];
    let mut running = int_lit(ctx, buffer.initial_level);
    for delta in &sorted_deltas {
        running = z3::ast::Int::add(ctx, &[&running, delta]);
        levels.push(running.clone());
    }

    if buffer.kind == BufferKind::NonConcurrent {
        for i in 0..sorted_times.len().saturating_sub(1) {
            assertions.push(sorted_times[i].lt(&sorted_times[i + 1]));
        }
    }

    Ok((levels, sorted_times, assertions))
}

/// The buffer's own bound and final-level assertions (spec §4.6), assembled
/// by the solver alongside every other entity's assertions.
pub(crate) fn buffer_assertions<'ctx>(
    problem: &Problem<'ctx>,
    buffer_name: &str,
) -> SchedexResult<Vec<BoolVar<'ctx>>> {
    let ctx = problem.ctx();
    let buffer = problem.buffer(buffer_name)?;
    let (levels, _, mut assertions) = level_trace(problem, buffer_name)?;

    if let Some(lower) = buffer.lower_bound {
        for level in &levels {
            assertions.push(level.ge(&int_lit(ctx, lower)));
        }
    }
    if let Some(upper) = buffer.upper_bound {
        for level in &levels {
            assertions.push(level.le(&int_lit(ctx, upper)));
        }
    }
    if let Some(final_level) = buffer.final_level {
        assertions.push(levels.last().unwrap()._eq(&int_lit(ctx, final_level)));
    }

    Ok(assertions)
}
