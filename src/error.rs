//! Error types for the scheduling engine.

use thiserror::Error;

/// Result type used across the crate.
pub type SchedexResult<T> = Result<T, SchedexError>;

/// Comprehensive error catalogue for problem construction and solving.
///
/// Every modeling error is reported as early as possible: at entity
/// construction or assertion-attachment time, never deferred to solve time.
#[derive(Error, Debug)]
pub enum SchedexError {
    /// An entity constructor was invoked without a live problem handle.
    ///
    /// schedex's core API takes an explicit `&mut Problem` receiver rather
    /// than an implicit global/thread-local active problem (see DESIGN.md),
    /// so this variant is not raised by the core API itself. It is kept in
    /// the public error vocabulary for embedders layering a global-context
    /// convenience on top of [`Problem`](crate::problem::Problem), and for
    /// parity with the specification's error catalogue.
    #[error("no active problem")]
    NoActiveProblem,

    /// A duplicate name was used for an entity of a given kind.
    #[error("a {kind} named '{name}' already exists")]
    DuplicateName {
        /// The entity kind (e.g. "Task", "Worker").
        kind: &'static str,
        /// The duplicated name.
        name: String,
    },

    /// The same worker was added twice as a requirement of a single task.
    #[error("worker '{worker}' is already a required resource of task '{task}'")]
    DuplicateRequirement {
        /// The task name.
        task: String,
        /// The worker name.
        worker: String,
    },

    /// The identical theory assertion was added twice to one entity.
    #[error("assertion already present on '{0}'")]
    DuplicateAssertion(String),

    /// A non-optional task or constraint was handed to an optional-only
    /// combinator (e.g. [`ForceScheduleNOptionalTasks`](crate::constraint)).
    #[error("'{0}' must be optional to be used here")]
    NonOptionalMember(String),

    /// A parameter violates an invariant (range, cardinality, sign, ...).
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// A periodic-unavailability window is wider than its period.
    #[error("interval [{lower}, {upper}] exceeds period {period}")]
    IntervalExceedsPeriod {
        /// Lower bound of the offending interval.
        lower: i64,
        /// Upper bound of the offending interval.
        upper: i64,
        /// The period length it was checked against.
        period: i64,
    },

    /// A referenced entity does not exist in the problem's registry.
    #[error("unknown {kind} '{name}'")]
    UnknownEntity {
        /// The entity kind (e.g. "Task", "Worker", "Buffer").
        kind: &'static str,
        /// The name that could not be resolved.
        name: String,
    },

    /// The decision procedure reported infeasibility. This is the normal
    /// negative answer to modeling, not an exceptional condition.
    #[error("problem is unsatisfiable")]
    Unsat,

    /// The decision procedure returned `unknown`, typically due to a timeout.
    #[error("solver returned unknown: {0}")]
    Unknown(String),

    /// JSON (de)serialization failure on the entity or solution surfaces.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// An unrecognized `type` tag was seen while dispatching entity JSON.
    #[error("unknown entity type tag '{0}'")]
    UnknownEntityType(String),
}
