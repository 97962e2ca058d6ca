//! The constraint library (spec §4.4): a flat enumeration of constraint
//! kinds, each carrying exactly its fields, compiled into theory assertions
//! against the owning [`Problem`] at construction time. This collapses the
//! deep `Constraint -> TaskConstraint/ResourceConstraint -> concrete` class
//! hierarchy of the source into tagged data plus one dispatch (spec §9).

use z3::ast::{Ast, Int};

use crate::error::{SchedexError, SchedexResult};
use crate::problem::Problem;
use crate::symbol::{cardinality, int_lit, named_bool, overlap, sum, BoolVar, CardinalityKind};
use crate::util::sort_no_duplicates;

/// Shared strictness for precedence-like relations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ordering {
    Lax,
    Strict,
    Tight,
}

/// Strictness for single-endpoint comparisons (`StartAfter`, `EndBefore`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strictness {
    Lax,
    Strict,
}

/// Direction for `ResourceTasksDistance`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DistanceMode {
    Exact,
    AtMost,
    AtLeast,
}

/// A group time bound: either explicit `[lower, upper]`, or a maximum span.
#[derive(Debug, Clone, Copy)]
pub enum GroupBound {
    Interval(i64, i64),
    Span(i64),
}

/// A per-interval bound on a `WorkLoad` sum.
#[derive(Debug, Clone, Copy)]
pub enum Bound {
    AtMost(i64),
    AtLeast(i64),
    Exact(i64),
}

/// The declarative shape of one constraint; compiled immediately by
/// [`Problem::add_constraint`].
pub enum ConstraintSpec {
    Precedence {
        before: String,
        after: String,
        offset: i64,
        kind: Ordering,
    },
    TasksStartSynced {
        task_1: String,
        task_2: String,
    },
    TasksEndSynced {
        task_1: String,
        task_2: String,
    },
    TasksDontOverlap {
        task_1: String,
        task_2: String,
    },
    TasksContiguous {
        tasks: Vec<String>,
    },
    TaskStartAt {
        task: String,
        value: i64,
    },
    TaskStartAfter {
        task: String,
        value: i64,
        kind: Strictness,
    },
    TaskEndAt {
        task: String,
        value: i64,
    },
    TaskEndBefore {
        task: String,
        value: i64,
        kind: Strictness,
    },
    UnorderedTaskGroup {
        tasks: Vec<String>,
        bound: Option<GroupBound>,
    },
    OrderedTaskGroup {
        tasks: Vec<String>,
        bound: Option<GroupBound>,
        kind: Ordering,
    },
    ForceScheduleNOptionalTasks {
        tasks: Vec<String>,
        n: i64,
        kind: CardinalityKind,
    },
    ForceApplyNOptionalConstraints {
        constraints: Vec<String>,
        n: i64,
        kind: CardinalityKind,
    },
    ScheduleNTasksInTimeIntervals {
        tasks: Vec<String>,
        n: i64,
        intervals: Vec<(i64, i64)>,
        kind: CardinalityKind,
    },
    WorkLoad {
        resource: String,
        bounds: Vec<((i64, i64), Bound)>,
    },
    ResourceUnavailable {
        resource: String,
        intervals: Vec<(i64, i64)>,
    },
    ResourcePeriodicallyUnavailable {
        resource: String,
        intervals: Vec<(i64, i64)>,
        period: i64,
        offset: i64,
        start: i64,
        end: i64,
    },
    ResourceInterrupted {
        resource: String,
        intervals: Vec<(i64, i64)>,
    },
    ResourceTasksDistance {
        resource: String,
        distance: i64,
        mode: DistanceMode,
        intervals: Option<Vec<(i64, i64)>>,
    },
    TaskLoadBuffer {
        task: String,
        buffer: String,
        quantity: i64,
    },
    TaskUnloadBuffer {
        task: String,
        buffer: String,
        quantity: i64,
    },
    Not {
        constraint: String,
    },
    Or {
        constraints: Vec<String>,
    },
    And {
        constraints: Vec<String>,
    },
    Xor {
        constraint_1: String,
        constraint_2: String,
    },
    Implies {
        antecedent: String,
        consequent: String,
    },
    IfThenElse {
        condition: String,
        then_branch: String,
        else_branch: String,
    },
}

/// A compiled constraint: its theory-assertion body, plus the optional
/// `applied` guard boolean (spec §3 "Constraint").
pub struct Constraint<'ctx> {
    pub label: &'static str,
    pub optional: bool,
    pub applied: Option<BoolVar<'ctx>>,
    pub assertions: Vec<BoolVar<'ctx>>,
}

fn label_of(spec: &ConstraintSpec) -> &'static str {
    match spec {
        ConstraintSpec::Precedence { .. } => "Precedence",
        ConstraintSpec::TasksStartSynced { .. } => "TasksStartSynced",
        ConstraintSpec::TasksEndSynced { .. } => "TasksEndSynced",
        ConstraintSpec::TasksDontOverlap { .. } => "TasksDontOverlap",
        ConstraintSpec::TasksContiguous { .. } => "TasksContiguous",
        ConstraintSpec::TaskStartAt { .. } => "TaskStartAt",
        ConstraintSpec::TaskStartAfter { .. } => "TaskStartAfter",
        ConstraintSpec::TaskEndAt { .. } => "TaskEndAt",
        ConstraintSpec::TaskEndBefore { .. } => "TaskEndBefore",
        ConstraintSpec::UnorderedTaskGroup { .. } => "UnorderedTaskGroup",
        ConstraintSpec::OrderedTaskGroup { .. } => "OrderedTaskGroup",
        ConstraintSpec::ForceScheduleNOptionalTasks { .. } => "ForceScheduleNOptionalTasks",
        ConstraintSpec::ForceApplyNOptionalConstraints { .. } => "ForceApplyNOptionalConstraints",
        ConstraintSpec::ScheduleNTasksInTimeIntervals { .. } => "ScheduleNTasksInTimeIntervals",
        ConstraintSpec::WorkLoad { .. } => "WorkLoad",
        ConstraintSpec::ResourceUnavailable { .. } => "ResourceUnavailable",
        ConstraintSpec::ResourcePeriodicallyUnavailable { .. } => "ResourcePeriodicallyUnavailable",
        ConstraintSpec::ResourceInterrupted { .. } => "ResourceInterrupted",
        ConstraintSpec::ResourceTasksDistance { .. } => "ResourceTasksDistance",
        ConstraintSpec::TaskLoadBuffer { .. } => "TaskLoadBuffer",
        ConstraintSpec::TaskUnloadBuffer { .. } => "TaskUnloadBuffer",
        ConstraintSpec::Not { .. } => "Not",
        ConstraintSpec::Or { .. } => "Or",
        ConstraintSpec::And { .. } => "And",
        ConstraintSpec::Xor { .. } => "Xor",
        ConstraintSpec::Implies { .. } => "Implies",
        ConstraintSpec::IfThenElse { .. } => "IfThenElse",
    }
}

impl<'ctx> Problem<'ctx> {
    /// Compile and register a constraint. `optional` introduces a fresh
    /// `applied` guard and wraps the body in `applied ⇒ body`.
    pub fn add_constraint(
        &mut self,
        name: Option<String>,
        optional: bool,
        spec: ConstraintSpec,
    ) -> SchedexResult<String> {
        let label = label_of(&spec);
        let body = self.compile_constraint(&spec)?;

        let ctx = self.ctx();
        let name = name.unwrap_or_else(|| self.generate_name(label));

        let (applied, assertions) = if optional {
            let applied = named_bool(ctx, &format!("{name}_applied"));
            let refs: Vec<&BoolVar<'ctx>> = body.iter().collect();
            let conjunction = BoolVar::and(ctx, &refs);
            (Some(applied.clone()), vec![applied.implies(&conjunction)])
        } else {
            (None, body)
        };

        let constraint = Constraint {
            label,
            optional,
            applied,
            assertions,
        };
        self.register_constraint(name.clone(), constraint)?;
        Ok(name)
    }

    /// `⋀(referenced.scheduled) ⇒ body`, only introduced when at least one
    /// referenced task is optional (spec §4.4).
    fn guard_by_scheduled(&self, body: BoolVar<'ctx>, task_names: &[&str]) -> SchedexResult<BoolVar<'ctx>> {
        let ctx = self.ctx();
        let mut scheduled_flags = Vec::new();
        for name in task_names {
            let task = self.task(name)?;
            if task.optional {
                scheduled_flags.push(task.scheduled.clone());
            }
        }
        if scheduled_flags.is_empty() {
            Ok(body)
        } else {
            let refs: Vec<&BoolVar<'ctx>> = scheduled_flags.iter().collect();
            let guard = BoolVar::and(ctx, &refs);
            Ok(guard.implies(&body))
        }
    }

    fn compile_constraint(&mut self, spec: &ConstraintSpec) -> SchedexResult<Vec<BoolVar<'ctx>>> {
        let ctx = self.ctx();
        match spec {
            ConstraintSpec::Precedence {
                before,
                after,
                offset,
                kind,
            } => {
                let t_before = self.task(before)?;
                let lower = if *offset > 0 {
                    Int::add(ctx, &[&t_before.end, &int_lit(ctx, *offset)])
                } else {
                    t_before.end.clone()
                };
                let upper = self.task(after)?.start.clone();
                let rel = match kind {
                    Ordering::Lax => lower.le(&upper),
                    Ordering::Strict => lower.lt(&upper),
                    Ordering::Tight => lower._eq(&upper),
                };
                let guarded = self.guard_by_scheduled(rel, &[before, after])?;
                Ok(vec![guarded])
            }
            ConstraintSpec::TasksStartSynced { task_1, task_2 } => {
                let rel = self.task(task_1)?.start.clone()._eq(&self.task(task_2)?.start);
                let guarded = self.guard_by_scheduled(rel, &[task_1, task_2])?;
                Ok(vec![guarded])
            }
            ConstraintSpec::TasksEndSynced { task_1, task_2 } => {
                let rel = self.task(task_1)?.end.clone()._eq(&self.task(task_2)?.end);
                let guarded = self.guard_by_scheduled(rel, &[task_1, task_2])?;
                Ok(vec![guarded])
            }
            ConstraintSpec::TasksDontOverlap { task_1, task_2 } => {
                let t1 = self.task(task_1)?;
                let t2 = self.task(task_2)?;
                let a = t2.start.ge(&t1.end);
                let b = t1.start.ge(&t2.end);
                let rel = a.xor(&b);
                let guarded = self.guard_by_scheduled(rel, &[task_1, task_2])?;
                Ok(vec![guarded])
            }
            ConstraintSpec::TasksContiguous { tasks } => {
                let starts: Vec<_> = tasks
                    .iter()
                    .map(|t| self.task(t).map(|task| task.start.clone()))
                    .collect::<SchedexResult<_>>()?;
                let ends: Vec<_> = tasks
                    .iter()
                    .map(|t| self.task(t).map(|task| task.end.clone()))
                    .collect::<SchedexResult<_>>()?;
                let (sorted_starts, c1) = sort_no_duplicates(ctx, &starts);
                let (sorted_ends, c2) = sort_no_duplicates(ctx, &ends);
                let mut out = c1;
                out.extend(c2);
                for i in 1..sorted_starts.len() {
                    let eq = sorted_starts[i]._eq(&sorted_ends[i - 1]);
                    let both_scheduled =
                        z3::ast::Bool::and(ctx, &[&sorted_ends[i - 1].ge(&int_lit(ctx, 0)), &sorted_starts[i].ge(&int_lit(ctx, 0))]);
                    out.push(both_scheduled.implies(&eq));
                }
                Ok(out)
            }
            ConstraintSpec::TaskStartAt { task, value } => {
                let rel = self.task(task)?.start.clone()._eq(&int_lit(ctx, *value));
                let guarded = self.guard_by_scheduled(rel, &[task])?;
                Ok(vec![guarded])
            }
            ConstraintSpec::TaskStartAfter { task, value, kind } => {
                let start = self.task(task)?.start.clone();
                let rel = match kind {
                    Strictness::Lax => start.ge(&int_lit(ctx, *value)),
                    Strictness::Strict => start.gt(&int_lit(ctx, *value)),
                };
                let guarded = self.guard_by_scheduled(rel, &[task])?;
                Ok(vec![guarded])
            }
            ConstraintSpec::TaskEndAt { task, value } => {
                let rel = self.task(task)?.end.clone()._eq(&int_lit(ctx, *value));
                let guarded = self.guard_by_scheduled(rel, &[task])?;
                Ok(vec![guarded])
            }
            ConstraintSpec::TaskEndBefore { task, value, kind } => {
                let end = self.task(task)?.end.clone();
                let rel = match kind {
                    Strictness::Lax => end.le(&int_lit(ctx, *value)),
                    Strictness::Strict => end.lt(&int_lit(ctx, *value)),
                };
                let guarded = self.guard_by_scheduled(rel, &[task])?;
                Ok(vec![guarded])
            }
            ConstraintSpec::UnorderedTaskGroup { tasks, bound } => {
                self.compile_task_group(tasks, bound, None)
            }
            ConstraintSpec::OrderedTaskGroup { tasks, bound, kind } => {
                self.compile_task_group(tasks, bound, Some(*kind))
            }
            ConstraintSpec::ForceScheduleNOptionalTasks { tasks, n, kind } => {
                let mut flags = Vec::with_capacity(tasks.len());
                for t in tasks {
                    let task = self.task(t)?;
                    if !task.optional {
                        return Err(SchedexError::NonOptionalMember(t.clone()));
                    }
                    flags.push(task.scheduled.clone());
                }
                Ok(vec![cardinality(ctx, &flags, *n as i32, *kind)])
            }
            ConstraintSpec::ForceApplyNOptionalConstraints { constraints, n, kind } => {
                let mut flags = Vec::with_capacity(constraints.len());
                for c in constraints {
                    let constraint = self
                        .constraints
                        .get(c)
                        .ok_or_else(|| SchedexError::UnknownEntity {
                            kind: "Constraint",
                            name: c.clone(),
                        })?;
                    if !constraint.optional {
                        return Err(SchedexError::NonOptionalMember(c.clone()));
                    }
                    flags.push(constraint.applied.clone().expect("optional constraint has applied"));
                }
                Ok(vec![cardinality(ctx, &flags, *n as i32, *kind)])
            }
            ConstraintSpec::ScheduleNTasksInTimeIntervals {
                tasks,
                n,
                intervals,
                kind,
            } => self.compile_schedule_n_in_intervals(tasks, *n, intervals, *kind),
            ConstraintSpec::WorkLoad { resource, bounds } => self.compile_workload(resource, bounds),
            ConstraintSpec::ResourceUnavailable { resource, intervals } => {
                self.compile_resource_unavailable(resource, intervals)
            }
            ConstraintSpec::ResourcePeriodicallyUnavailable {
                resource,
                intervals,
                period,
                offset,
                start,
                end,
            } => self.compile_periodically_unavailable(resource, intervals, *period, *offset, *start, *end),
            ConstraintSpec::ResourceInterrupted { resource, intervals } => {
                self.compile_resource_interrupted(resource, intervals)
            }
            ConstraintSpec::ResourceTasksDistance {
                resource,
                distance,
                mode,
                intervals,
            } => self.compile_tasks_distance(resource, *distance, *mode, intervals.as_deref()),
            ConstraintSpec::TaskLoadBuffer { task, buffer, quantity } => {
                self.task(task)?;
                let buf = self
                    .buffers
                    .get_mut(buffer)
                    .ok_or_else(|| SchedexError::UnknownEntity {
                        kind: "Buffer",
                        name: buffer.clone(),
                    })?;
                buf.add_loading_task(task.clone(), *quantity)?;
                Ok(Vec::new())
            }
            ConstraintSpec::TaskUnloadBuffer { task, buffer, quantity } => {
                self.task(task)?;
                let buf = self
                    .buffers
                    .get_mut(buffer)
                    .ok_or_else(|| SchedexError::UnknownEntity {
                        kind: "Buffer",
                        name: buffer.clone(),
                    })?;
                buf.add_unloading_task(task.clone(), *quantity)?;
                Ok(Vec::new())
            }
            ConstraintSpec::Not { constraint } => {
                let body = self.assertions_of(constraint)?;
                let refs: Vec<&BoolVar<'ctx>> = body.iter().collect();
                Ok(vec![BoolVar::and(ctx, &refs).not()])
            }
            ConstraintSpec::Or { constraints } => {
                let mut flattened = Vec::new();
                for c in constraints {
                    flattened.extend(self.assertions_of(c)?);
                }
                let refs: Vec<&BoolVar<'ctx>> = flattened.iter().collect();
                Ok(vec![BoolVar::or(ctx, &refs)])
            }
            ConstraintSpec::And { constraints } => {
                let mut flattened = Vec::new();
                for c in constraints {
                    flattened.extend(self.assertions_of(c)?);
                }
                let refs: Vec<&BoolVar<'ctx>> = flattened.iter().collect();
                Ok(vec![BoolVar::and(ctx, &refs)])
            }
            ConstraintSpec::Xor { constraint_1, constraint_2 } => {
                let a = self.assertions_of(constraint_1)?;
                let b = self.assertions_of(constraint_2)?;
                let a_refs: Vec<&BoolVar<'ctx>> = a.iter().collect();
                let b_refs: Vec<&BoolVar<'ctx>> = b.iter().collect();
                let lhs = BoolVar::and(ctx, &a_refs);
                let rhs = BoolVar::and(ctx, &b_refs);
                Ok(vec![lhs.xor(&rhs)])
            }
            ConstraintSpec::Implies { antecedent, consequent } => {
                let a = self.assertions_of(antecedent)?;
                let b = self.assertions_of(consequent)?;
                let a_refs: Vec<&BoolVar<'ctx>> = a.iter().collect();
                let b_refs: Vec<&BoolVar<'ctx>> = b.iter().collect();
                let lhs = BoolVar::and(ctx, &a_refs);
                let rhs = BoolVar::and(ctx, &b_refs);
                Ok(vec![lhs.implies(&rhs)])
            }
            ConstraintSpec::IfThenElse {
                condition,
                then_branch,
                else_branch,
            } => {
                let cond = self.assertions_of(condition)?;
                let then_body = self.assertions_of(then_branch)?;
                let else_body = self.assertions_of(else_branch)?;
                let cond_refs: Vec<&BoolVar<'ctx>> = cond.iter().collect();
                let then_refs: Vec<&BoolVar<'ctx>> = then_body.iter().collect();
                let else_refs: Vec<&BoolVar<'ctx>> = else_body.iter().collect();
                let cond_term = BoolVar::and(ctx, &cond_refs);
                let then_term = BoolVar::and(ctx, &then_refs);
                let else_term = BoolVar::and(ctx, &else_refs);
                Ok(vec![cond_term.ite(&then_term, &else_term)])
            }
        }
    }

    fn assertions_of(&self, constraint_name: &str) -> SchedexResult<Vec<BoolVar<'ctx>>> {
        Ok(self
            .constraints
            .get(constraint_name)
            .ok_or_else(|| SchedexError::UnknownEntity {
                kind: "Constraint",
                name: constraint_name.to_string(),
            })?
            .assertions
            .clone())
    }

    fn compile_task_group(
        &mut self,
        tasks: &[String],
        bound: &Option<GroupBound>,
        order: Option<Ordering>,
    ) -> SchedexResult<Vec<BoolVar<'ctx>>> {
        let ctx = self.ctx();
        let group_start = crate::symbol::fresh_int(ctx, "task_group_start");
        let group_end = crate::symbol::fresh_int(ctx, "task_group_end");

        let mut body = Vec::new();
        match bound {
            Some(GroupBound::Interval(lower, upper)) => {
                body.push(group_start.ge(&int_lit(ctx, *lower)));
                body.push(group_end.le(&int_lit(ctx, *upper)));
            }
            Some(GroupBound::Span(length)) => {
                body.push(group_end.le(&Int::add(ctx, &[&group_start, &int_lit(ctx, *length)])));
            }
            None => {}
        }

        let members: Vec<_> = tasks
            .iter()
            .map(|t| self.task(t).cloned_ends())
            .collect::<SchedexResult<Vec<_>>>()?;
        for (start, end) in &members {
            body.push(start.ge(&group_start));
            body.push(end.le(&group_end));
        }

        if let Some(kind) = order {
            for i in 0..members.len().saturating_sub(1) {
                let (_, end_i) = &members[i];
                let (start_next, _) = &members[i + 1];
                let rel = match kind {
                    Ordering::Lax => end_i.le(start_next),
                    Ordering::Strict => end_i.lt(start_next),
                    Ordering::Tight => end_i._eq(start_next),
                };
                body.push(rel);
            }
        }
        Ok(body)
    }

    fn compile_schedule_n_in_intervals(
        &mut self,
        tasks: &[String],
        n: i64,
        intervals: &[(i64, i64)],
        kind: CardinalityKind,
    ) -> SchedexResult<Vec<BoolVar<'ctx>>> {
        let ctx = self.ctx();
        let mut assertions = Vec::new();
        let mut all_bools = Vec::new();

        for task_name in tasks {
            let task = self.task(task_name)?;
            let (start, end) = (task.start.clone(), task.end.clone());
            let mut bools_for_task = Vec::new();
            for (k, (lower, upper)) in intervals.iter().enumerate() {
                let flag = named_bool(ctx, &format!("InTimeIntervalTask_{task_name}_{k}"));
                let no_overlap_start =
                    z3::ast::Bool::and(ctx, &[&start.lt(&int_lit(ctx, *lower)), &end.gt(&int_lit(ctx, *lower))])
                        .not();
                let no_overlap_end =
                    z3::ast::Bool::and(ctx, &[&start.lt(&int_lit(ctx, *upper)), &end.gt(&int_lit(ctx, *upper))])
                        .not();
                let no_full_overlap =
                    z3::ast::Bool::and(ctx, &[&start.lt(&int_lit(ctx, *lower)), &end.gt(&int_lit(ctx, *upper))])
                        .not();
                let body = z3::ast::Bool::and(
                    ctx,
                    &[
                        &start.ge(&int_lit(ctx, *lower)),
                        &end.le(&int_lit(ctx, *upper)),
                        &no_overlap_start,
                        &no_overlap_end,
                        &no_full_overlap,
                    ],
                );
                assertions.push(flag.implies(&body));
                bools_for_task.push(flag);
            }
            assertions.push(cardinality(ctx, &bools_for_task, 1, CardinalityKind::Max));
            all_bools.extend(bools_for_task);
        }
        assertions.push(cardinality(ctx, &all_bools, n as i32, kind));
        Ok(assertions)
    }

    fn compile_workload(
        &mut self,
        resource: &str,
        bounds: &[((i64, i64), Bound)],
    ) -> SchedexResult<Vec<BoolVar<'ctx>>> {
        let ctx = self.ctx();
        let busy: Vec<(crate::symbol::IntVar<'ctx>, crate::symbol::IntVar<'ctx>)> = self
            .worker(resource)?
            .busy_intervals()
            .iter()
            .map(|(_, interval)| interval.clone())
            .collect();

        let mut assertions = Vec::new();
        for ((lower, upper), bound) in bounds {
            let overlaps: Vec<_> = busy
                .iter()
                .map(|(bs, be)| overlap(ctx, bs, be, &int_lit(ctx, *lower), &int_lit(ctx, *upper)))
                .collect();
            let total = sum(ctx, &overlaps);
            let rel = match bound {
                Bound::AtMost(v) => total.le(&int_lit(ctx, *v)),
                Bound::AtLeast(v) => total.ge(&int_lit(ctx, *v)),
                Bound::Exact(v) => total._eq(&int_lit(ctx, *v)),
            };
            assertions.push(rel);
        }
        Ok(assertions)
    }

    fn compile_resource_unavailable(
        &mut self,
        resource: &str,
        intervals: &[(i64, i64)],
    ) -> SchedexResult<Vec<BoolVar<'ctx>>> {
        self.worker(resource)?;
        let mut assertions = Vec::new();
        for (k, (lower, upper)) in intervals.iter().enumerate() {
            let task_name = format!("{resource}NotAvailable{k}");
            let spec = crate::task::TaskSpec::new().named(task_name.clone());
            self.add_fixed_duration_task(spec, upper - lower)?;
            assertions.push(self.task(&task_name)?.start.clone()._eq(&int_lit(self.ctx(), *lower)));
            assertions.push(self.task(&task_name)?.end.clone()._eq(&int_lit(self.ctx(), *upper)));
            self.add_required_resource(
                &task_name,
                crate::binding::ResourceRef::Worker(resource.to_string()),
                crate::binding::BindingOptions::default(),
            )?;
        }
        Ok(assertions)
    }

    fn compile_periodically_unavailable(
        &mut self,
        resource: &str,
        intervals: &[(i64, i64)],
        period: i64,
        offset: i64,
        start: i64,
        end: i64,
    ) -> SchedexResult<Vec<BoolVar<'ctx>>> {
        for (lower, upper) in intervals {
            if *upper - *lower > period {
                return Err(SchedexError::IntervalExceedsPeriod {
                    lower: *lower,
                    upper: *upper,
                    period,
                });
            }
        }
        let max_k = if period > 0 { (end - offset) / period + 1 } else { 0 };
        let mut expanded = Vec::new();
        for k in 0..=max_k.max(0) {
            for (lower, upper) in intervals {
                let window_lower = lower + k * period + offset;
                let window_upper = upper + k * period + offset;
                if window_lower >= start && window_upper <= end {
                    expanded.push((window_lower, window_upper));
                }
            }
        }
        self.compile_resource_unavailable(resource, &expanded)
    }

    fn compile_resource_interrupted(
        &mut self,
        resource: &str,
        intervals: &[(i64, i64)],
    ) -> SchedexResult<Vec<BoolVar<'ctx>>> {
        let ctx = self.ctx();
        let task_names: Vec<String> = self
            .worker(resource)?
            .busy_intervals()
            .iter()
            .map(|(t, _)| t.clone())
            .collect();
        let mut assertions = Vec::new();
        for task_name in &task_names {
            let task = self.task(task_name)?;
            for (lower, upper) in intervals {
                let not_straddling = z3::ast::Bool::or(
                    ctx,
                    &[&task.end.le(&int_lit(ctx, *lower)), &task.start.ge(&int_lit(ctx, *upper))],
                );
                assertions.push(not_straddling);
            }
        }
        Ok(assertions)
    }

    fn compile_tasks_distance(
        &mut self,
        resource: &str,
        distance: i64,
        mode: DistanceMode,
        intervals: Option<&[(i64, i64)]>,
    ) -> SchedexResult<Vec<BoolVar<'ctx>>> {
        let ctx = self.ctx();
        let busy: Vec<(crate::symbol::IntVar<'ctx>, crate::symbol::IntVar<'ctx>)> = self
            .worker(resource)?
            .busy_intervals()
            .iter()
            .map(|(_, interval)| interval.clone())
            .collect();
        if busy.len() < 2 {
            return Err(SchedexError::InvalidParameter(
                "ResourceTasksDistance needs at least two tasks bound to the resource".into(),
            ));
        }
        let starts: Vec<_> = busy.iter().map(|(s, _)| s.clone()).collect();
        let ends: Vec<_> = busy.iter().map(|(_, e)| e.clone()).collect();
        let (sorted_starts, c1) = sort_no_duplicates(ctx, &starts);
        let (sorted_ends, c2) = sort_no_duplicates(ctx, &ends);
        let mut assertions = c1;
        assertions.extend(c2);

        for i in 1..sorted_starts.len() {
            let gap = Int::sub(ctx, &[&sorted_starts[i], &sorted_ends[i - 1]]);
            let rel = match mode {
                DistanceMode::Exact => gap._eq(&int_lit(ctx, distance)),
                DistanceMode::AtMost => gap.le(&int_lit(ctx, distance)),
                DistanceMode::AtLeast => gap.ge(&int_lit(ctx, distance)),
            };
            let guard = match intervals {
                None => sorted_ends[i - 1].ge(&int_lit(ctx, 0)),
                Some(windows) => {
                    let mut in_window = Vec::new();
                    for (lower, upper) in windows {
                        in_window.push(z3::ast::Bool::and(
                            ctx,
                            &[
                                &sorted_ends[i - 1].ge(&int_lit(ctx, *lower)),
                                &sorted_starts[i].le(&int_lit(ctx, *upper)),
                            ],
                        ));
                    }
                    let refs: Vec<&BoolVar<'ctx>> = in_window.iter().collect();
                    z3::ast::Bool::or(ctx, &refs)
                }
            };
            assertions.push(guard.implies(&rel));
        }
        Ok(assertions)
    }
}

trait ClonedEnds<'ctx> {
    fn cloned_ends(self) -> SchedexResult<(crate::symbol::IntVar<'ctx>, crate::symbol::IntVar<'ctx>)>;
}

impl<'ctx> ClonedEnds<'ctx> for SchedexResult<&crate::task::Task<'ctx>> {
    fn cloned_ends(self) -> SchedexResult<(crate::symbol::IntVar<'ctx>, crate::symbol::IntVar<'ctx>)> {
        self.map(|t| (t.start.clone(), t.end.clone()))
    }
}
