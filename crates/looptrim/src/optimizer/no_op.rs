//! No-op condition inference.
//!
//! Computes a boolean condition under which a statement has no observable
//! effect. The condition is sufficient, not necessary: when it is true the
//! statement may be skipped, when it is false nothing is known.
//!
//! ## Rules
//!
//! - A store is a no-op when the location already holds the value.
//! - A loop is a no-op when its body is a no-op for every iteration (the
//!   body's condition relaxed over the loop domain), or when it runs zero
//!   times.
//! - A branch is a no-op when it is not taken or its body is a no-op.
//! - Calls to effectful intrinsics are never no-ops.
//!
//! The returned condition only mentions variables that are in scope at the
//! statement itself: loop variables are relaxed away and names bound by
//! `let`s inside the statement are re-bound around the condition.

use tracing::{debug, trace};

use super::strip_identities::strip_identities;
use crate::analysis::{
    and_condition_over_domain, common_subexpression_elimination, has_side_effects, simplify,
};
use crate::ir::{expr_uses_var, intrinsics, CallType, Expr, Interval, Scope, Stmt};

/// Condition under which executing `s` has no observable effect.
pub fn no_op_condition(s: &Stmt) -> Expr {
    IsNoOp.stmt(s, Expr::const_true())
}

fn make_and(a: Expr, b: Expr) -> Expr {
    match (a.as_bool(), b.as_bool()) {
        (Some(false), _) | (_, Some(true)) => a,
        (_, Some(false)) | (Some(true), _) => b,
        _ => Expr::and(a, b),
    }
}

fn make_or(a: Expr, b: Expr) -> Expr {
    match (a.as_bool(), b.as_bool()) {
        (Some(true), _) | (_, Some(false)) => a,
        (_, Some(true)) | (Some(false), _) => b,
        _ => Expr::or(a, b),
    }
}

fn make_not(a: Expr) -> Expr {
    match a.as_bool() {
        Some(v) => Expr::bool(!v),
        None => Expr::not(a),
    }
}

/// Re-binds `name` around `cond` if the condition still refers to it.
fn rebind(name: &str, value: &Expr, cond: Expr) -> Expr {
    if expr_uses_var(&cond, name) {
        Expr::let_in(name, value.clone(), cond)
    } else {
        cond
    }
}

struct IsNoOp;

impl IsNoOp {
    fn stmt(&mut self, s: &Stmt, cond: Expr) -> Expr {
        if cond.as_bool() == Some(false) {
            return cond;
        }
        match s {
            Stmt::Store { name, index, value } => {
                if value.ty().is_handle() || has_side_effects(index) || has_side_effects(value) {
                    return Expr::const_false();
                }
                let loaded = Expr::load(value.ty(), name.clone(), index.clone());
                let unchanged = strip_identities(&Expr::eq(loaded, value.clone()));
                let unchanged = and_condition_over_domain(&unchanged, &Scope::new());
                trace!(store = %name, condition = %unchanged, "store no-op condition");
                make_and(cond, unchanged)
            }
            Stmt::For {
                name,
                min,
                extent,
                body,
                ..
            } => {
                let cond = self.expr(min, cond);
                let cond = self.expr(extent, cond);
                let body_cond = self.stmt(body, Expr::const_true());
                let body_cond = simplify(&common_subexpression_elimination(&body_cond));
                let last = Expr::add(min.clone(), extent.clone()).plus(-1);
                let max = simplify(&last);
                let mut scope = Scope::new();
                scope.push(name.clone(), Interval::bounded(min.clone(), max));
                let relaxed = and_condition_over_domain(&body_cond, &scope);
                debug!(loop_var = %name, body = %body_cond, %relaxed, "relaxed loop body condition");
                let no_iterations = simplify(&Expr::le(extent.clone(), Expr::make_zero(extent.ty())));
                make_and(cond, make_or(relaxed, no_iterations))
            }
            Stmt::IfThenElse {
                cond: c,
                then_case,
                else_case,
            } => {
                let cond = self.expr(c, cond);
                let then_cond = self.stmt(then_case, Expr::const_true());
                let mut cond = make_and(cond, make_or(make_not(c.clone()), then_cond));
                if let Some(else_case) = else_case {
                    let else_cond = self.stmt(else_case, Expr::const_true());
                    cond = make_and(cond, make_or(c.clone(), else_cond));
                }
                cond
            }
            Stmt::LetStmt { name, value, body } => {
                let cond = self.expr(value, cond);
                let body_cond = self.stmt(body, Expr::const_true());
                make_and(cond, rebind(name, value, body_cond))
            }
            Stmt::Evaluate(e) => self.expr(e, cond),
            Stmt::Block(stmts) => stmts.iter().fold(cond, |cond, s| self.stmt(s, cond)),
        }
    }

    fn expr(&mut self, e: &Expr, cond: Expr) -> Expr {
        if cond.as_bool() == Some(false) {
            return cond;
        }
        match e {
            Expr::Call {
                name,
                call_type: CallType::Intrinsic,
                ..
            } if intrinsics::is_effectful(name) => Expr::const_false(),
            Expr::Let { name, value, body } => {
                let cond = self.expr(value, cond);
                let body_cond = self.expr(body, Expr::const_true());
                make_and(cond, rebind(name, value, body_cond))
            }
            _ => e
                .children()
                .into_iter()
                .fold(cond, |cond, child| self.expr(child, cond)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_stmt;

    fn cond(src: &str) -> String {
        simplify(&no_op_condition(&parse_stmt(src).unwrap())).to_string()
    }

    #[test]
    fn store_of_loaded_value_is_a_no_op() {
        assert_eq!(cond("a[i] = a[i]"), "true");
        assert_eq!(cond("a[i] = likely(a[i])"), "true");
        assert_eq!(cond("a[i] = 1"), "a[i] == 1");
    }

    #[test]
    fn handle_stores_and_effectful_calls_have_effects() {
        assert_eq!(cond("a[0] = h:handle"), "false");
        assert_eq!(cond("image_store(a, 0, 1)"), "false");
        assert_eq!(cond("a[0] = f(copy_memory(0, 1))"), "false");
    }

    #[test]
    fn pure_evaluates_are_no_ops() {
        assert_eq!(cond("f(x) + 1"), "true");
    }

    #[test]
    fn loop_conditions_drop_the_loop_variable() {
        assert_eq!(cond("for (i, 0, 10) { a[0] = 1 }"), "a[0] == 1");
        assert_eq!(cond("for (i, 0, 10) { a[i] = 1 }"), "false");
        assert_eq!(cond("for (i, 0, 10) { if (i > n) { a[i] = 1 } }"), "n >= 9");
    }

    #[test]
    fn zero_trip_loops_are_no_ops() {
        assert_eq!(cond("for (i, 0, n) { a[i] = 1 }"), "n <= 0");
    }

    #[test]
    fn branches_contribute_guarded_conditions() {
        assert_eq!(cond("if (x < 3) { a[0] = 1 }"), "x >= 3 || a[0] == 1");
        assert_eq!(cond("if (x < 3) { 0 } else { image_store(0) }"), "x < 3");
    }

    #[test]
    fn inner_lets_are_rebound() {
        assert_eq!(cond("let t = f(x)\na[0] = t"), "(let t = f(x) in a[0] == t)");
        assert_eq!(cond("let t = f(x)\nb[0] = 2"), "b[0] == 2");
    }

    #[test]
    fn loop_variable_never_escapes() {
        let c = no_op_condition(
            &parse_stmt("for (i, 0, n) { let j = i * 2\n if (j > 4) { a[0] = j } }").unwrap(),
        );
        assert!(!expr_uses_var(&c, "i"), "{c}");
        assert!(!expr_uses_var(&c, "j"), "{c}");
    }
}
