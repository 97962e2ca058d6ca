//! Cost functions attached to workers, used by [`crate::indicator::IndicatorKind::ResourceCost`].

use crate::symbol::{int_lit, IntVar};
use z3::ast::Int;
use z3::Context;

/// A cost-per-period function evaluated at a busy-interval endpoint.
///
/// `Constant` is the common case and is evaluated exactly (no division).
/// `Linear` and `Polynomial` introduce a genuine per-period variation and are
/// integrated as a trapezoid by [`crate::indicator`], which doubles the
/// constant contribution rather than dividing the variable one by two (see
/// DESIGN.md, "cost trapezoid").
#[derive(Debug, Clone)]
pub enum CostFunction {
    /// `f(x) = value`
    Constant(i64),
    /// `f(x) = slope * x + intercept`
    Linear { slope: i64, intercept: i64 },
    /// `f(x) = coefficients[0] + coefficients[1]*x + coefficients[2]*x^2 + ...`
    Polynomial(Vec<i64>),
}

impl CostFunction {
    /// True for [`CostFunction::Constant`]; callers use this to choose the
    /// cheap, division-free accumulation path.
    pub fn is_constant(&self) -> bool {
        matches!(self, CostFunction::Constant(_))
    }

    /// Evaluate the function at an integer-literal point, producing a z3 term.
    pub fn evaluate<'ctx>(&self, ctx: &'ctx Context, x: &IntVar<'ctx>) -> IntVar<'ctx> {
        match self {
            CostFunction::Constant(v) => int_lit(ctx, *v),
            CostFunction::Linear { slope, intercept } => {
                let term = Int::mul(ctx, &[&int_lit(ctx, *slope), x]);
                Int::add(ctx, &[&term, &int_lit(ctx, *intercept)])
            }
            CostFunction::Polynomial(coefficients) => {
                let mut result = int_lit(ctx, *coefficients.last().unwrap_or(&0));
                let mut power = x.clone();
                for (i, coeff) in coefficients.iter().enumerate().rev().skip(1) {
                    if *coeff != 0 {
                        let term = Int::mul(ctx, &[&int_lit(ctx, *coeff), &power]);
                        result = Int::add(ctx, &[&result, &term]);
                    }
                    if i > 0 {
                        power = Int::mul(ctx, &[&power, x]);
                    }
                }
                result
            }
        }
    }

    /// Evaluate at a constant integer argument without going through z3 at
    /// all, used when distributing a `CumulativeWorker`'s constant cost over
    /// its fanned-out atomic workers.
    pub fn evaluate_i64(&self, x: i64) -> i64 {
        match self {
            CostFunction::Constant(v) => *v,
            CostFunction::Linear { slope, intercept } => slope * x + intercept,
            CostFunction::Polynomial(coefficients) => {
                let mut result = *coefficients.last().unwrap_or(&0);
                let mut power = x;
                for (i, coeff) in coefficients.iter().enumerate().rev().skip(1) {
                    result += coeff * power;
                    if i > 0 {
                        power *= x;
                    }
                }
                result
            }
        }
    }
}
