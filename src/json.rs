//! JSON round-trip for the entity shapes a caller is expected to build
//! problems from declaratively (spec §6): a tagged union deserialized then
//! dispatched to the matching `Problem::add_*` builder.

use serde::{Deserialize, Serialize};

use crate::cost::CostFunction;
use crate::error::{SchedexError, SchedexResult};
use crate::problem::Problem;
use crate::symbol::CardinalityKind;
use crate::task::TaskSpec;

/// A JSON-serializable cost function, mirroring [`CostFunction`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum CostFunctionJson {
    Constant { value: i64 },
    Linear { slope: i64, intercept: i64 },
    Polynomial { coefficients: Vec<i64> },
}

impl From<CostFunctionJson> for CostFunction {
    fn from(json: CostFunctionJson) -> Self {
        match json {
            CostFunctionJson::Constant { value } => CostFunction::Constant(value),
            CostFunctionJson::Linear { slope, intercept } => CostFunction::Linear { slope, intercept },
            CostFunctionJson::Polynomial { coefficients } => CostFunction::Polynomial(coefficients),
        }
    }
}

/// Shared task fields, common to every task JSON variant. Not deserialized
/// directly (each `EntityJson` task variant inlines these so the enum's
/// `deny_unknown_fields` can see the whole object at once — serde doesn't
/// support `flatten` and `deny_unknown_fields` together) but kept as one
/// place to turn them into a [`TaskSpec`].
#[derive(Debug, Clone)]
struct TaskFieldsJson {
    name: Option<String>,
    optional: bool,
    work_amount: i64,
    release_date: Option<i64>,
    due_date: Option<i64>,
    due_date_is_deadline: bool,
    priority: i64,
}

fn default_true() -> bool {
    true
}

fn default_priority() -> i64 {
    1
}

impl From<TaskFieldsJson> for TaskSpec {
    fn from(json: TaskFieldsJson) -> Self {
        let mut spec = TaskSpec::new().work_amount(json.work_amount).priority(json.priority);
        if let Some(name) = json.name {
            spec = spec.named(name);
        }
        if json.optional {
            spec = spec.optional();
        }
        if let Some(release) = json.release_date {
            spec = spec.release_date(release);
        }
        if let Some(due) = json.due_date {
            spec = spec.due_date(due, json.due_date_is_deadline);
        }
        spec
    }
}

/// The JSON-serializable entity union accepted by
/// [`Problem::add_from_json`]. Every variant is checked whole: an
/// unrecognized key anywhere in the object is rejected rather than ignored.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", deny_unknown_fields)]
pub enum EntityJson {
    ZeroDurationTask {
        name: Option<String>,
        #[serde(default)]
        optional: bool,
        #[serde(default)]
        work_amount: i64,
        release_date: Option<i64>,
        due_date: Option<i64>,
        #[serde(default = "default_true")]
        due_date_is_deadline: bool,
        #[serde(default = "default_priority")]
        priority: i64,
    },
    FixedDurationTask {
        name: Option<String>,
        #[serde(default)]
        optional: bool,
        #[serde(default)]
        work_amount: i64,
        release_date: Option<i64>,
        due_date: Option<i64>,
        #[serde(default = "default_true")]
        due_date_is_deadline: bool,
        #[serde(default = "default_priority")]
        priority: i64,
        duration: i64,
    },
    VariableDurationTask {
        name: Option<String>,
        #[serde(default)]
        optional: bool,
        #[serde(default)]
        work_amount: i64,
        release_date: Option<i64>,
        due_date: Option<i64>,
        #[serde(default = "default_true")]
        due_date_is_deadline: bool,
        #[serde(default = "default_priority")]
        priority: i64,
        min_duration: i64,
        max_duration: Option<i64>,
        allowed_durations: Option<Vec<i64>>,
    },
    Worker {
        name: Option<String>,
        #[serde(default = "default_productivity")]
        productivity: i64,
        cost: Option<CostFunctionJson>,
    },
    CumulativeWorker {
        name: Option<String>,
        size: i64,
        #[serde(default = "default_productivity")]
        productivity: i64,
        cost: Option<CostFunctionJson>,
    },
    SelectWorkers {
        name: Option<String>,
        candidates: Vec<String>,
        nb_to_select: i64,
        #[serde(default)]
        kind: CardinalityKindJson,
    },
}

fn default_productivity() -> i64 {
    1
}

/// JSON mirror of [`CardinalityKind`], defaulting to `min` (the common "at
/// least one" case for `SelectWorkers`).
#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CardinalityKindJson {
    Exact,
    #[default]
    Min,
    Max,
}

impl From<CardinalityKindJson> for CardinalityKind {
    fn from(json: CardinalityKindJson) -> Self {
        match json {
            CardinalityKindJson::Exact => CardinalityKind::Exact,
            CardinalityKindJson::Min => CardinalityKind::Min,
            CardinalityKindJson::Max => CardinalityKind::Max,
        }
    }
}

impl<'ctx> Problem<'ctx> {
    /// Parse one JSON entity object and add it to this problem, returning
    /// its (possibly auto-generated) name.
    pub fn add_from_json(&mut self, json: &str) -> SchedexResult<String> {
        let entity: EntityJson = serde_json::from_str(json).map_err(|e| {
            // A tag the `type` enum doesn't recognize surfaces as a data
            // error from serde; re-report it as our own catalogued variant.
            if e.to_string().contains("unknown variant") {
                SchedexError::UnknownEntityType(e.to_string())
            } else {
                SchedexError::Json(e)
            }
        })?;

        match entity {
            EntityJson::ZeroDurationTask {
                name,
                optional,
                work_amount,
                release_date,
                due_date,
                due_date_is_deadline,
                priority,
            } => self.add_zero_duration_task(
                TaskFieldsJson {
                    name,
                    optional,
                    work_amount,
                    release_date,
                    due_date,
                    due_date_is_deadline,
                    priority,
                }
                .into(),
            ),
            EntityJson::FixedDurationTask {
                name,
                optional,
                work_amount,
                release_date,
                due_date,
                due_date_is_deadline,
                priority,
                duration,
            } => self.add_fixed_duration_task(
                TaskFieldsJson {
                    name,
                    optional,
                    work_amount,
                    release_date,
                    due_date,
                    due_date_is_deadline,
                    priority,
                }
                .into(),
                duration,
            ),
            EntityJson::VariableDurationTask {
                name,
                optional,
                work_amount,
                release_date,
                due_date,
                due_date_is_deadline,
                priority,
                min_duration,
                max_duration,
                allowed_durations,
            } => self.add_variable_duration_task(
                TaskFieldsJson {
                    name,
                    optional,
                    work_amount,
                    release_date,
                    due_date,
                    due_date_is_deadline,
                    priority,
                }
                .into(),
                min_duration,
                max_duration,
                allowed_durations,
            ),
            EntityJson::Worker { name, productivity, cost } => {
                self.add_worker(name, productivity, cost.map(Into::into))
            }
            EntityJson::CumulativeWorker {
                name,
                size,
                productivity,
                cost,
            } => self.add_cumulative_worker(name, size, productivity, cost.map(Into::into)),
            EntityJson::SelectWorkers {
                name,
                candidates,
                nb_to_select,
                kind,
            } => self.add_select_workers(name, candidates, nb_to_select, kind.into()),
        }
    }
}
