//! Isolating a variable in a condition.
//!
//! [`solve_expression`] rewrites linear comparisons so the variable appears
//! once, alone on the left. [`solve_for_outer_interval`] reads the solved
//! comparisons as half-lines and combines them into an interval outside of
//! which the condition cannot hold.

use tracing::trace;

use super::{simplify, Linear};
use crate::ir::{expr_uses_var, substitute, CmpOp, Expr, Interval};

/// Rewrites `e` so every comparison that mentions `var` has `var` alone on
/// its left-hand side. `None` when `var` occurs in a way that cannot be
/// isolated (inside a non-linear term, a select, a load, a call, ...).
pub fn solve_expression(e: &Expr, var: &str) -> Option<Expr> {
    if !expr_uses_var(e, var) {
        return Some(e.clone());
    }
    match e {
        Expr::And(a, b) => Some(Expr::and(solve_expression(a, var)?, solve_expression(b, var)?)),
        Expr::Or(a, b) => Some(Expr::or(solve_expression(a, var)?, solve_expression(b, var)?)),
        Expr::Not(a) => Some(Expr::not(solve_expression(a, var)?)),
        Expr::Let { name, value, body } => {
            solve_expression(&substitute(name, value, body), var)
        }
        Expr::Cmp { op, a, b } => solve_comparison(*op, a, b, var),
        _ => None,
    }
}

fn solve_comparison(op: CmpOp, a: &Expr, b: &Expr, var: &str) -> Option<Expr> {
    let mut d = Linear::difference(a, b)?;
    let ty = d.ty;
    let (atom, k) = d
        .terms
        .iter()
        .find(|(atom, _)| atom.as_var() == Some(var))
        .map(|(atom, k)| (atom.clone(), *k))
        .unwrap_or((Expr::var_of(ty, var), 0));
    d.remove_term(&atom);
    if d.terms.keys().any(|t| expr_uses_var(t, var)) {
        return None;
    }
    if k == 0 {
        return Some(simplify(&Expr::compare(op, a.clone(), b.clone())));
    }

    // k·v + d op 0  <=>  k·v op -d
    let (k, op, rhs) = if k > 0 {
        (k, op, d.negated())
    } else {
        (-k, op.flip(), d)
    };
    let r = rhs.to_expr();
    let c = |v: i64| Expr::int_of(ty, v);
    let solved = if k == 1 {
        Expr::compare(op, atom, r)
    } else {
        let kk = c(k);
        match op {
            // k·v < r  <=>  v <= floor((r - 1) / k)
            CmpOp::Lt => Expr::le(atom, Expr::div(Expr::sub(r, c(1)), kk)),
            CmpOp::Le => Expr::le(atom, Expr::div(r, kk)),
            // k·v > r  <=>  v >= floor(r / k) + 1
            CmpOp::Gt => Expr::ge(atom, Expr::div(Expr::add(r, kk.clone()), kk)),
            // k·v >= r  <=>  v >= ceil(r / k)
            CmpOp::Ge => Expr::ge(atom, Expr::div(Expr::add(r, c(k - 1)), kk)),
            CmpOp::Eq | CmpOp::Ne => Expr::compare(op, Expr::mul(atom, kk), r),
        }
    };
    match solved {
        Expr::Cmp { op, a, b } => Some(Expr::compare(op, *a, simplify(&b))),
        other => Some(other),
    }
}

/// An interval of `var` outside of which `cond` is false. Unbounded sides
/// mean nothing is known in that direction.
pub fn solve_for_outer_interval(cond: &Expr, var: &str) -> Interval {
    let interval = outer_interval(cond, var).map(|e| simplify(&e));
    trace!(%cond, var, min = ?interval.min, max = ?interval.max, "outer interval");
    interval
}

fn outer_interval(cond: &Expr, var: &str) -> Interval {
    if !expr_uses_var(cond, var) {
        return Interval::everything();
    }
    match cond {
        Expr::And(a, b) => outer_interval(a, var).intersect(outer_interval(b, var)),
        Expr::Or(a, b) => outer_interval(a, var).union(outer_interval(b, var)),
        Expr::Not(_) => match simplify(cond) {
            Expr::Not(_) => Interval::everything(),
            other => outer_interval(&other, var),
        },
        Expr::Let { name, value, body } => outer_interval(&substitute(name, value, body), var),
        Expr::Cmp { .. } => match solve_expression(cond, var) {
            Some(Expr::Cmp { op, a, b }) if a.as_var() == Some(var) && !expr_uses_var(&b, var) => {
                let b = *b;
                match op {
                    CmpOp::Lt => Interval::new(None, Some(b.plus(-1))),
                    CmpOp::Le => Interval::new(None, Some(b)),
                    CmpOp::Gt => Interval::new(Some(b.plus(1)), None),
                    CmpOp::Ge => Interval::new(Some(b), None),
                    CmpOp::Eq => Interval::single_point(b),
                    CmpOp::Ne => Interval::everything(),
                }
            }
            _ => Interval::everything(),
        },
        _ => Interval::everything(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_expr;

    fn solve(src: &str) -> Option<String> {
        solve_expression(&parse_expr(src).unwrap(), "i").map(|e| e.to_string())
    }

    fn outer(src: &str) -> (Option<String>, Option<String>) {
        let i = solve_for_outer_interval(&parse_expr(src).unwrap(), "i");
        (i.min.map(|e| e.to_string()), i.max.map(|e| e.to_string()))
    }

    #[test]
    fn isolates_unit_coefficients() {
        assert_eq!(solve("i + 3 < n").as_deref(), Some("i < n - 3"));
        assert_eq!(solve("n - i >= 2").as_deref(), Some("i <= n - 2"));
        assert_eq!(solve("x < 4").as_deref(), Some("x < 4"));
    }

    #[test]
    fn divides_with_floor_and_ceiling() {
        assert_eq!(solve("i * 2 < 7").as_deref(), Some("i <= 3"));
        assert_eq!(solve("i * 2 <= 7").as_deref(), Some("i <= 3"));
        assert_eq!(solve("i * 2 > 7").as_deref(), Some("i >= 4"));
        assert_eq!(solve("i * 2 >= 7").as_deref(), Some("i >= 4"));
        assert_eq!(solve("i * 3 >= -7").as_deref(), Some("i >= -2"));
        assert_eq!(solve("i * 2 == 6").as_deref(), Some("i * 2 == 6"));
    }

    #[test]
    fn non_linear_occurrences_fail() {
        assert_eq!(solve("i * i < 4"), None);
        assert_eq!(solve("a[i] < 4"), None);
        assert_eq!(solve("min(i, 3) < 4"), None);
    }

    #[test]
    fn connectives_are_solved_recursively() {
        assert_eq!(
            solve("i + 1 > 3 && !(i - 2 == n)").as_deref(),
            Some("i > 2 && !(i == n + 2)")
        );
    }

    #[test]
    fn outer_intervals() {
        let some = |s: &str| Some(s.to_string());
        assert_eq!(outer("i < 50"), (None, some("49")));
        assert_eq!(outer("i >= 50"), (some("50"), None));
        assert_eq!(outer("!(i >= 50)"), (None, some("49")));
        assert_eq!(outer("i >= 10 && i < n"), (some("10"), some("n - 1")));
        assert_eq!(outer("i == 5 || i == 7"), (some("5"), some("7")));
        assert_eq!(outer("i < 3 || i > 7"), (None, None));
        assert_eq!(outer("i != 4"), (None, None));
        assert_eq!(outer("a[i] == 0"), (None, None));
    }
}
