//! The symbol layer: thin wrappers over the backend's integer/boolean
//! variables and arithmetic expressions.
//!
//! Everything above this module talks in terms of [`IntVar`] and [`BoolVar`]
//! rather than directly naming the z3 crate, so a future backend swap is
//! localized here.

use z3::ast::{Ast, Bool, Int};
use z3::Context;

/// An integer-sorted term (a variable or a compound expression).
pub type IntVar<'ctx> = Int<'ctx>;

/// A boolean-sorted term.
pub type BoolVar<'ctx> = Bool<'ctx>;

/// Allocate a fresh, uniquely-named integer variable.
pub fn fresh_int<'ctx>(ctx: &'ctx Context, prefix: &str) -> IntVar<'ctx> {
    Int::fresh_const(ctx, prefix)
}

/// Allocate a fresh, uniquely-named boolean variable.
pub fn fresh_bool<'ctx>(ctx: &'ctx Context, prefix: &str) -> BoolVar<'ctx> {
    Bool::fresh_const(ctx, prefix)
}

/// Allocate an integer variable with an explicit, stable name.
pub fn named_int<'ctx>(ctx: &'ctx Context, name: &str) -> IntVar<'ctx> {
    Int::new_const(ctx, name)
}

/// Allocate a boolean variable with an explicit, stable name.
pub fn named_bool<'ctx>(ctx: &'ctx Context, name: &str) -> BoolVar<'ctx> {
    Bool::new_const(ctx, name)
}

/// An integer literal.
pub fn int_lit(ctx: &Context, value: i64) -> IntVar<'_> {
    Int::from_i64(ctx, value)
}

/// Pseudo-boolean cardinality kinds shared by `SelectWorkers`,
/// `ForceScheduleNOptionalTasks`, `ForceApplyNOptionalConstraints` and
/// `ScheduleNTasksInTimeIntervals`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CardinalityKind {
    /// Exactly `n` literals are true.
    Exact,
    /// At least `n` literals are true.
    Min,
    /// At most `n` literals are true.
    Max,
}

/// Build the pseudo-boolean cardinality assertion `kind(n)` over `literals`,
/// each contributing weight 1.
pub fn cardinality<'ctx>(
    ctx: &'ctx Context,
    literals: &[BoolVar<'ctx>],
    n: i32,
    kind: CardinalityKind,
) -> BoolVar<'ctx> {
    let refs: Vec<&Bool<'ctx>> = literals.iter().collect();
    let pairs: Vec<(&Bool<'ctx>, i32)> = refs.iter().map(|b| (*b, 1)).collect();
    match kind {
        CardinalityKind::Exact => Bool::pb_eq(ctx, &pairs, n),
        CardinalityKind::Min => Bool::pb_ge(ctx, &pairs, n),
        CardinalityKind::Max => Bool::pb_le(ctx, &pairs, n),
    }
}

/// `max(0, value)`, encoded as an if-then-else.
pub fn positive_part<'ctx>(ctx: &'ctx Context, value: &IntVar<'ctx>) -> IntVar<'ctx> {
    let zero = int_lit(ctx, 0);
    value.ge(&zero).ite(value, &zero)
}

/// `max(0, min(a_end, b_end) - max(a_start, b_start))`: the overlap duration
/// of two closed-open intervals, encoded with if-then-else over the signs as
/// required by `WorkLoad` (spec §4.4) and `MaxBufferLevel`-style overlap math.
pub fn overlap<'ctx>(
    ctx: &'ctx Context,
    a_start: &IntVar<'ctx>,
    a_end: &IntVar<'ctx>,
    b_start: &IntVar<'ctx>,
    b_end: &IntVar<'ctx>,
) -> IntVar<'ctx> {
    let lower = a_start.gt(b_start).ite(a_start, b_start);
    let upper = a_end.lt(b_end).ite(a_end, b_end);
    let diff = Int::sub(ctx, &[&upper, &lower]);
    positive_part(ctx, &diff)
}

/// Sum a list of integer terms, treating an empty list as `0`.
pub fn sum<'ctx>(ctx: &'ctx Context, terms: &[IntVar<'ctx>]) -> IntVar<'ctx> {
    if terms.is_empty() {
        return int_lit(ctx, 0);
    }
    let refs: Vec<&Int<'ctx>> = terms.iter().collect();
    Int::add(ctx, &refs)
}
