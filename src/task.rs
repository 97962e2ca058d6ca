//! The task model: the three duration variants, optionality, and the
//! sentinel sequencing used when an optional task goes unscheduled.

use z3::ast::{Ast, Int};

use crate::error::{SchedexError, SchedexResult};
use crate::problem::Problem;
use crate::symbol::{int_lit, named_bool, named_int, BoolVar, IntVar};

/// The three duration disciplines a task can have (spec §3 "Task").
#[derive(Debug, Clone)]
pub enum TaskKind {
    ZeroDuration,
    FixedDuration {
        duration: i64,
    },
    VariableDuration {
        min_duration: i64,
        max_duration: Option<i64>,
        allowed_durations: Option<Vec<i64>>,
    },
}

/// Parameters shared by every task variant, used as the constructor argument
/// to `Problem::add_*_task`.
#[derive(Debug, Clone, Default)]
pub struct TaskSpec {
    pub name: Option<String>,
    pub optional: bool,
    pub work_amount: i64,
    pub release_date: Option<i64>,
    pub due_date: Option<i64>,
    pub due_date_is_deadline: bool,
    pub priority: i64,
}

impl TaskSpec {
    pub fn new() -> Self {
        TaskSpec {
            due_date_is_deadline: true,
            priority: 1,
            ..Default::default()
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    pub fn work_amount(mut self, amount: i64) -> Self {
        self.work_amount = amount;
        self
    }

    pub fn release_date(mut self, date: i64) -> Self {
        self.release_date = Some(date);
        self
    }

    pub fn due_date(mut self, date: i64, is_deadline: bool) -> Self {
        self.due_date = Some(date);
        self.due_date_is_deadline = is_deadline;
        self
    }

    pub fn priority(mut self, priority: i64) -> Self {
        self.priority = priority;
        self
    }
}

/// A scheduled unit of work: its own `start`/`end`/(`duration`) integer
/// variables, a `scheduled` boolean, and the list of workers it requires.
pub struct Task<'ctx> {
    pub kind: TaskKind,
    pub optional: bool,
    pub work_amount: i64,
    pub release_date: Option<i64>,
    pub due_date: Option<i64>,
    pub due_date_is_deadline: bool,
    pub priority: i64,

    pub start: IntVar<'ctx>,
    pub end: IntVar<'ctx>,
    pub duration: Option<IntVar<'ctx>>,
    pub scheduled: BoolVar<'ctx>,

    /// 1-based creation rank among *optional* tasks; used as the sentinel
    /// point in the past when the task goes unscheduled.
    pub(crate) optional_rank: i64,
    pub(crate) required_resources: Vec<String>,
    pub(crate) assertions: Vec<BoolVar<'ctx>>,
}

impl<'ctx> Task<'ctx> {
    /// The integer "duration" of this task, for variants that don't carry
    /// their own free `duration` variable.
    pub fn duration_value(&self) -> Option<i64> {
        match self.kind {
            TaskKind::ZeroDuration => Some(0),
            TaskKind::FixedDuration { duration } => Some(duration),
            TaskKind::VariableDuration { .. } => None,
        }
    }

    pub(crate) fn required_resources(&self) -> &[String] {
        &self.required_resources
    }
}

fn add_task<'ctx>(
    problem: &mut Problem<'ctx>,
    type_tag: &'static str,
    spec: TaskSpec,
    kind: TaskKind,
) -> SchedexResult<String> {
    if spec.priority < 0 {
        return Err(SchedexError::InvalidParameter(
            "task priority must be non-negative".into(),
        ));
    }
    if spec.work_amount < 0 {
        return Err(SchedexError::InvalidParameter(
            "task work_amount must be non-negative".into(),
        ));
    }

    let ctx = problem.ctx();
    let name = match spec.name {
        Some(n) => n,
        None => problem.generate_name(type_tag),
    };

    let start = named_int(ctx, &format!("{name}_start"));
    let end = named_int(ctx, &format!("{name}_end"));
    let duration = match &kind {
        TaskKind::VariableDuration { .. } => Some(named_int(ctx, &format!("{name}_duration"))),
        _ => None,
    };
    let horizon_var = problem.horizon_var().clone();

    let mut own_assertions = vec![end.le(&horizon_var)];

    match &kind {
        TaskKind::ZeroDuration => {
            own_assertions.push(start._eq(&end));
        }
        TaskKind::FixedDuration { duration } => {
            if *duration < 0 {
                return Err(SchedexError::InvalidParameter(
                    "fixed task duration must be non-negative".into(),
                ));
            }
            own_assertions.push(Int::sub(ctx, &[&end, &start])._eq(&int_lit(ctx, *duration)));
            own_assertions.push(start.ge(&int_lit(ctx, 0)));
        }
        TaskKind::VariableDuration {
            min_duration,
            max_duration,
            allowed_durations,
        } => {
            let dur = duration.as_ref().unwrap();
            own_assertions.push(Int::add(ctx, &[&start, dur])._eq(&end));
            own_assertions.push(start.ge(&int_lit(ctx, 0)));
            own_assertions.push(dur.ge(&int_lit(ctx, *min_duration)));
            if let Some(allowed) = allowed_durations {
                let options: Vec<BoolVar<'ctx>> =
                    allowed.iter().map(|v| dur._eq(&int_lit(ctx, *v))).collect();
                let refs: Vec<&BoolVar<'ctx>> = options.iter().collect();
                own_assertions.push(BoolVar::or(ctx, &refs));
            }
            if let Some(max) = max_duration {
                own_assertions.push(dur.le(&int_lit(ctx, *max)));
            }
        }
    }

    if let Some(release) = spec.release_date {
        if release > 0 {
            own_assertions.push(start.ge(&int_lit(ctx, release)));
        }
    }
    if let Some(due) = spec.due_date {
        if spec.due_date_is_deadline {
            own_assertions.push(end.le(&int_lit(ctx, due)));
        }
    }

    let (scheduled, optional_rank) = if spec.optional {
        let rank = problem.next_optional_rank();
        let scheduled = named_bool(ctx, &format!("{name}_scheduled"));
        let point_in_past = int_lit(ctx, -rank);
        let mut unscheduled = vec![start._eq(&point_in_past), end._eq(&point_in_past)];
        if let Some(dur) = &duration {
            unscheduled.push(dur._eq(&int_lit(ctx, 0)));
        }
        let refs: Vec<&BoolVar<'ctx>> = unscheduled.iter().collect();
        let not_scheduled_assertion = BoolVar::and(ctx, &refs);

        let scheduled_assertion_refs: Vec<&BoolVar<'ctx>> = own_assertions.iter().collect();
        let scheduled_assertion = BoolVar::and(ctx, &scheduled_assertion_refs);
        own_assertions = vec![scheduled.ite(&scheduled_assertion, &not_scheduled_assertion)];
        (scheduled, rank)
    } else {
        (problem.const_true(), 0)
    };

    let task = Task {
        kind,
        optional: spec.optional,
        work_amount: spec.work_amount,
        release_date: spec.release_date,
        due_date: spec.due_date,
        due_date_is_deadline: spec.due_date_is_deadline,
        priority: spec.priority,
        start,
        end,
        duration,
        scheduled,
        optional_rank,
        required_resources: Vec::new(),
        assertions: own_assertions,
    };

    problem.register_task(name.clone(), task)?;
    Ok(name)
}

impl<'ctx> Problem<'ctx> {
    /// Add a zero-duration task (`start = end`).
    pub fn add_zero_duration_task(&mut self, spec: TaskSpec) -> SchedexResult<String> {
        add_task(self, "ZeroDurationTask", spec, TaskKind::ZeroDuration)
    }

    /// Add a task whose duration is a fixed number of periods.
    pub fn add_fixed_duration_task(
        &mut self,
        spec: TaskSpec,
        duration: i64,
    ) -> SchedexResult<String> {
        add_task(
            self,
            "FixedDurationTask",
            spec,
            TaskKind::FixedDuration { duration },
        )
    }

    /// Add a task whose duration is a free variable within the given bounds.
    pub fn add_variable_duration_task(
        &mut self,
        spec: TaskSpec,
        min_duration: i64,
        max_duration: Option<i64>,
        allowed_durations: Option<Vec<i64>>,
    ) -> SchedexResult<String> {
        add_task(
            self,
            "VariableDurationTask",
            spec,
            TaskKind::VariableDuration {
                min_duration,
                max_duration,
                allowed_durations,
            },
        )
    }
}
