//! Shared encoding utilities: sorting networks, min/max encodings, a
//! three-point parabola fit, and the buffer-trace duplicate collapse used by
//! [`crate::buffer`].

use crate::symbol::{fresh_int, IntVar};
use z3::ast::Ast;
use z3::Context;

/// Sort `values` with a bubble-sort network, allowing duplicate values.
///
/// Returns the freshly-named sorted variables together with the ordering
/// assertions that tie them to the input (spec §4.4 "Contiguity").
pub fn sort_allow_duplicates<'ctx>(
    ctx: &'ctx Context,
    values: &[IntVar<'ctx>],
) -> (Vec<IntVar<'ctx>>, Vec<z3::ast::Bool<'ctx>>) {
    let mut arr = values.to_vec();
    let mut assertions = Vec::new();

    for _ in 0..arr.len() {
        let mut next = arr.clone();
        for i in 0..arr.len().saturating_sub(1) {
            let x = &arr[i];
            let y = &arr[i + 1];
            let x1 = fresh_int(ctx, "sort_lo");
            let y1 = fresh_int(ctx, "sort_hi");
            let in_order = x.le(y);
            let swapped = z3::ast::Bool::and(ctx, &[&x1._eq(y), &y1._eq(x)]);
            let kept = z3::ast::Bool::and(ctx, &[&x1._eq(x), &y1._eq(y)]);
            assertions.push(in_order.ite(&kept, &swapped));
            next[i] = x1;
            next[i + 1] = y1;
        }
        arr = next;
    }
    (arr, assertions)
}

/// Sort `values` assuming all values end up distinct, using the compact
/// "permutation + strict order" encoding rather than a full sorting network.
pub fn sort_no_duplicates<'ctx>(
    ctx: &'ctx Context,
    values: &[IntVar<'ctx>],
) -> (Vec<IntVar<'ctx>>, Vec<z3::ast::Bool<'ctx>>) {
    let n = values.len();
    let sorted: Vec<IntVar<'ctx>> = (0..n).map(|_| fresh_int(ctx, "sorted")).collect();

    let mut assertions = Vec::with_capacity(n + 1);
    for a in &sorted {
        let options: Vec<z3::ast::Bool<'ctx>> = values.iter().map(|v| a._eq(v)).collect();
        let refs: Vec<&z3::ast::Bool<'ctx>> = options.iter().collect();
        assertions.push(z3::ast::Bool::or(ctx, &refs));
    }
    if n > 1 {
        let strict: Vec<z3::ast::Bool<'ctx>> =
            (0..n - 1).map(|i| sorted[i].lt(&sorted[i + 1])).collect();
        let refs: Vec<&z3::ast::Bool<'ctx>> = strict.iter().collect();
        assertions.push(z3::ast::Bool::and(ctx, &refs));
    }
    (sorted, assertions)
}

/// Build the assertions constraining `target` to be the maximum of
/// `values`: it equals one of them and dominates all of them.
///
/// Panics on an empty `values`, mirroring the source's `AssertionError` —
/// callers only ever reach this with at least one contributing term (a
/// buffer or resource with no events is never indicator-wrapped).
pub fn assert_maximum<'ctx>(
    ctx: &'ctx Context,
    target: &IntVar<'ctx>,
    values: &[IntVar<'ctx>],
) -> Vec<z3::ast::Bool<'ctx>> {
    assert!(!values.is_empty(), "get_maximum of an empty list");
    let equalities: Vec<z3::ast::Bool<'ctx>> = values.iter().map(|v| target._eq(v)).collect();
    let refs: Vec<&z3::ast::Bool<'ctx>> = equalities.iter().collect();
    let mut out = vec![z3::ast::Bool::or(ctx, &refs)];
    out.extend(values.iter().map(|v| target.ge(v)));
    out
}

/// Build the assertions constraining `target` to be the minimum of `values`.
pub fn assert_minimum<'ctx>(
    ctx: &'ctx Context,
    target: &IntVar<'ctx>,
    values: &[IntVar<'ctx>],
) -> Vec<z3::ast::Bool<'ctx>> {
    assert!(!values.is_empty(), "get_minimum of an empty list");
    let equalities: Vec<z3::ast::Bool<'ctx>> = values.iter().map(|v| target._eq(v)).collect();
    let refs: Vec<&z3::ast::Bool<'ctx>> = equalities.iter().collect();
    let mut out = vec![z3::ast::Bool::or(ctx, &refs)];
    out.extend(values.iter().map(|v| target.le(v)));
    out
}

/// Fit `y = a*x^2 + b*x + c` through three distinct points, returning
/// `(a, b, c)` as floats (used only for off-line parameter estimation, never
/// inside an assertion).
pub fn fit_parabola(xs: [f64; 3], ys: [f64; 3]) -> (f64, f64, f64) {
    let [x1, x2, x3] = xs;
    let [y1, y2, y3] = ys;
    let denom = (x1 - x2) * (x1 - x3) * (x2 - x3);
    let a = (x3 * (y2 - y1) + x2 * (y1 - y3) + x1 * (y3 - y2)) / denom;
    let b =
        (x3 * x3 * (y1 - y2) + x2 * x2 * (y3 - y1) + x1 * x1 * (y2 - y3)) / denom;
    let c = (x2 * x3 * (x2 - x3) * y1 + x3 * x1 * (x3 - x1) * y2 + x1 * x2 * (x1 - x2) * y3)
        / denom;
    (a, b, c)
}

/// Collapse a buffer's `(levels, change_times)` trace by dropping repeated
/// change times, keeping the first level observed at each distinct time
/// (spec §4.8 step 6). `levels` must have exactly one more entry than
/// `change_times` (the leading entry is the initial level).
pub fn collapse_buffer_trace(levels: &[i64], change_times: &[i64]) -> (Vec<i64>, Vec<i64>) {
    assert_eq!(
        levels.len(),
        change_times.len() + 1,
        "buffer levels must have exactly one more element than change times"
    );
    let mut out_levels = vec![levels[0]];
    let mut out_times = Vec::new();
    for (&level, &time) in levels[1..].iter().zip(change_times.iter()) {
        if !out_times.contains(&time) {
            out_levels.push(level);
            out_times.push(time);
        }
    }
    (out_levels, out_times)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parabola_through_known_points() {
        // y = 2x^2 - 3x + 1 at x = 0, 1, 2
        let (a, b, c) = fit_parabola([0.0, 1.0, 2.0], [1.0, 0.0, 3.0]);
        assert!((a - 2.0).abs() < 1e-9);
        assert!((b + 3.0).abs() < 1e-9);
        assert!((c - 1.0).abs() < 1e-9);
    }

    #[test]
    fn collapse_drops_repeated_times() {
        let (levels, times) = collapse_buffer_trace(&[10, 7, 7, 4], &[5, 5, 9]);
        assert_eq!(levels, vec![10, 7, 4]);
        assert_eq!(times, vec![5, 9]);
    }

    #[test]
    fn collapse_keeps_first_level_at_each_time() {
        let (levels, times) = collapse_buffer_trace(&[10, 6, 7], &[5, 5]);
        assert_eq!(levels, vec![10, 6]);
        assert_eq!(times, vec![5]);
    }
}
