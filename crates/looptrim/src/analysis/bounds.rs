//! Symbolic interval arithmetic.
//!
//! [`bounds_of_expr_in_scope`] computes expressions bounding the value of an
//! expression while the variables of a scope range over their intervals.
//! Boolean results are bounded with `false < true`: the lower bound implies
//! the condition everywhere in the domain, and the condition anywhere in the
//! domain implies the upper bound.
//!
//! Arithmetic rules only apply to integer types that cannot overflow; any
//! other expression mentioning a scope variable is unbounded.

use crate::ir::{free_vars, substitute, BinOp, CmpOp, Expr, Interval, Scope};

use super::simplify;

/// Bounds of `e` over every assignment of the scope's variables.
pub fn bounds_of_expr_in_scope(e: &Expr, scope: &Scope<Interval>) -> Interval {
    if free_vars(e).iter().all(|v| !scope.contains(v)) {
        return Interval::single_point(e.clone());
    }
    match e {
        Expr::Var { name, .. } => scope.get(name).cloned().unwrap_or_else(Interval::everything),
        Expr::Binary { op, a, b } if e.ty().is_no_overflow_int() => {
            arithmetic_bounds(*op, a, b, scope)
        }
        Expr::Cmp { op, a, b } => comparison_bounds(*op, a, b, scope),
        Expr::And(a, b) => {
            let (a, b) = (
                bounds_of_expr_in_scope(a, scope),
                bounds_of_expr_in_scope(b, scope),
            );
            Interval::bounded(
                Expr::and(lower(a.min), lower(b.min)),
                Expr::and(upper(a.max), upper(b.max)),
            )
        }
        Expr::Or(a, b) => {
            let (a, b) = (
                bounds_of_expr_in_scope(a, scope),
                bounds_of_expr_in_scope(b, scope),
            );
            Interval::bounded(
                Expr::or(lower(a.min), lower(b.min)),
                Expr::or(upper(a.max), upper(b.max)),
            )
        }
        Expr::Not(a) => {
            let a = bounds_of_expr_in_scope(a, scope);
            Interval::new(a.max.map(Expr::not), a.min.map(Expr::not))
        }
        Expr::Select { cond, t, f } => {
            let c = bounds_of_expr_in_scope(cond, scope);
            if c.min.as_ref().map(simplify).is_some_and(|c| c.is_one()) {
                return bounds_of_expr_in_scope(t, scope);
            }
            if c.max.as_ref().map(simplify).is_some_and(|c| c.is_zero()) {
                return bounds_of_expr_in_scope(f, scope);
            }
            let (bt, bf) = (
                bounds_of_expr_in_scope(t, scope),
                bounds_of_expr_in_scope(f, scope),
            );
            if t.ty().is_bool() {
                Interval::bounded(
                    Expr::and(lower(bt.min), lower(bf.min)),
                    Expr::or(upper(bt.max), upper(bf.max)),
                )
            } else {
                bt.union(bf)
            }
        }
        Expr::Let { name, value, body } => {
            bounds_of_expr_in_scope(&substitute(name, value, body), scope)
        }
        _ => Interval::everything(),
    }
}

/// A missing lower bound of a condition is `false`.
fn lower(b: Option<Expr>) -> Expr {
    b.unwrap_or_else(Expr::const_false)
}

/// A missing upper bound of a condition is `true`.
fn upper(b: Option<Expr>) -> Expr {
    b.unwrap_or_else(Expr::const_true)
}

fn both(a: Option<Expr>, b: Option<Expr>, f: impl FnOnce(Expr, Expr) -> Expr) -> Option<Expr> {
    Some(f(a?, b?))
}

fn arithmetic_bounds(op: BinOp, a: &Expr, b: &Expr, scope: &Scope<Interval>) -> Interval {
    let ba = bounds_of_expr_in_scope(a, scope);
    let bb = bounds_of_expr_in_scope(b, scope);
    match op {
        BinOp::Add => Interval::new(
            both(ba.min, bb.min, Expr::add),
            both(ba.max, bb.max, Expr::add),
        ),
        BinOp::Sub => Interval::new(
            both(ba.min, bb.max, Expr::sub),
            both(ba.max, bb.min, Expr::sub),
        ),
        BinOp::Mul => match (a.as_int(), b.as_int()) {
            (_, Some(k)) => scale(ba, b, k, Expr::mul),
            (Some(k), _) => scale(bb, a, k, |x, k| Expr::mul(k, x)),
            _ => Interval::everything(),
        },
        BinOp::Div => match b.as_int() {
            Some(k) if k != 0 => scale(ba, b, k, Expr::div),
            _ => Interval::everything(),
        },
        BinOp::Mod => match b.as_int() {
            Some(k) if k != 0 => {
                let ty = b.ty();
                Interval::bounded(
                    Expr::make_zero(ty),
                    Expr::int_of(ty, k.unsigned_abs() as i64 - 1),
                )
            }
            _ => Interval::everything(),
        },
        BinOp::Min => Interval::new(
            both(ba.min, bb.min, Expr::min),
            match (ba.max, bb.max) {
                (Some(x), Some(y)) => Some(Expr::min(x, y)),
                (x, y) => x.or(y),
            },
        ),
        BinOp::Max => Interval::new(
            match (ba.min, bb.min) {
                (Some(x), Some(y)) => Some(Expr::max(x, y)),
                (x, y) => x.or(y),
            },
            both(ba.max, bb.max, Expr::max),
        ),
    }
}

/// Applies a monotonic map by the constant `k`; negative constants swap the
/// bounds.
fn scale(b: Interval, k_expr: &Expr, k: i64, f: impl Fn(Expr, Expr) -> Expr) -> Interval {
    if k == 0 {
        return Interval::single_point(Expr::make_zero(k_expr.ty()));
    }
    let lo = b.min.map(|x| f(x, k_expr.clone()));
    let hi = b.max.map(|x| f(x, k_expr.clone()));
    if k > 0 {
        Interval::new(lo, hi)
    } else {
        Interval::new(hi, lo)
    }
}

fn comparison_bounds(op: CmpOp, a: &Expr, b: &Expr, scope: &Scope<Interval>) -> Interval {
    let (lo_parts, hi_parts): (Vec<Option<Expr>>, Vec<Option<Expr>>) =
        if a.ty().is_no_overflow_int() {
            // Compare the difference against zero, so shared terms cancel.
            let d = bounds_of_expr_in_scope(&simplify(&Expr::sub(a.clone(), b.clone())), scope);
            let zero = Expr::make_zero(a.ty());
            let cmp = |op: CmpOp, x: &Option<Expr>| {
                x.clone().map(|x| Expr::compare(op, x, zero.clone()))
            };
            match op {
                CmpOp::Lt | CmpOp::Le | CmpOp::Gt | CmpOp::Ge => {
                    let (for_lo, for_hi) = if matches!(op, CmpOp::Lt | CmpOp::Le) {
                        (&d.max, &d.min)
                    } else {
                        (&d.min, &d.max)
                    };
                    (vec![cmp(op, for_lo)], vec![cmp(op, for_hi)])
                }
                CmpOp::Eq => (
                    vec![cmp(CmpOp::Eq, &d.min), cmp(CmpOp::Eq, &d.max)],
                    vec![cmp(CmpOp::Le, &d.min), cmp(CmpOp::Ge, &d.max)],
                ),
                CmpOp::Ne => {
                    let lo = match (cmp(CmpOp::Gt, &d.min), cmp(CmpOp::Lt, &d.max)) {
                        (Some(x), Some(y)) => Some(Expr::or(x, y)),
                        (x, y) => x.or(y),
                    };
                    (vec![lo], vec![])
                }
            }
        } else {
            let ba = bounds_of_expr_in_scope(a, scope);
            let bb = bounds_of_expr_in_scope(b, scope);
            let cmp = |op: CmpOp, x: &Option<Expr>, y: &Option<Expr>| {
                both(x.clone(), y.clone(), |x, y| Expr::compare(op, x, y))
            };
            match op {
                CmpOp::Lt | CmpOp::Le => (
                    vec![cmp(op, &ba.max, &bb.min)],
                    vec![cmp(op, &ba.min, &bb.max)],
                ),
                CmpOp::Gt | CmpOp::Ge => (
                    vec![cmp(op, &ba.min, &bb.max)],
                    vec![cmp(op, &ba.max, &bb.min)],
                ),
                CmpOp::Eq => (
                    vec![
                        cmp(CmpOp::Eq, &ba.min, &ba.max),
                        cmp(CmpOp::Eq, &bb.min, &bb.max),
                        cmp(CmpOp::Eq, &ba.min, &bb.min),
                    ],
                    vec![
                        cmp(CmpOp::Le, &ba.min, &bb.max),
                        cmp(CmpOp::Le, &bb.min, &ba.max),
                    ],
                ),
                CmpOp::Ne => {
                    let lo = match (cmp(CmpOp::Lt, &ba.max, &bb.min), cmp(CmpOp::Lt, &bb.max, &ba.min)) {
                        (Some(x), Some(y)) => Some(Expr::or(x, y)),
                        (x, y) => x.or(y),
                    };
                    (vec![lo], vec![])
                }
            }
        };

    // Every lower-bound part must hold; an unknown part cannot be relied on.
    let lo = lo_parts
        .into_iter()
        .map(lower)
        .reduce(Expr::and)
        .unwrap_or_else(Expr::const_false);
    let hi = hi_parts
        .into_iter()
        .map(upper)
        .reduce(Expr::and)
        .unwrap_or_else(Expr::const_true);
    Interval::bounded(lo, hi)
}
