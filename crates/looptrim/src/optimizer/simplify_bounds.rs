//! Simplification using the ranges of enclosing loops.
//!
//! # What it does
//!
//! Tracks the loops and `let`s enclosing each expression. A comparison that
//! holds (or fails) for every value the enclosing variables can take is
//! replaced by `true` (or `false`), and a `min`/`max` whose operands are
//! ordered over that domain is replaced by the smaller/larger operand.
//!
//! # Algorithm
//!
//! To prove a condition the enclosing variables are eliminated innermost
//! first. A `let` binding is substituted. A loop variable is isolated with
//! [`solve_expression`] and then relaxed over the loop's range with
//! [`and_condition_over_domain`]. The condition is proven when what remains
//! simplifies to `true`.

use tracing::trace;

use crate::analysis::{and_condition_over_domain, simplify, solve_expression};
use crate::ir::{
    expr_uses_var, substitute, walk_expr, walk_stmt, BinOp, Expr, Interval, Mutator, Scope, Stmt,
};

struct ContainingLoop {
    var: String,
    interval: Interval,
}

/// Bounds-aware simplifier. See the module documentation.
#[derive(Default)]
pub struct SimplifyUsingBounds {
    containing_loops: Vec<ContainingLoop>,
}

impl SimplifyUsingBounds {
    pub fn new() -> Self {
        Self::default()
    }

    /// A simplifier that already knows `var` ranges over `interval`.
    pub fn seeded(var: impl Into<String>, interval: Interval) -> Self {
        let mut s = Self::new();
        s.push(var.into(), interval);
        s
    }

    fn push(&mut self, var: String, interval: Interval) {
        self.containing_loops.push(ContainingLoop { var, interval });
    }

    fn pop(&mut self) {
        self.containing_loops.pop();
    }

    fn provably_true_over_domain(&self, test: &Expr) -> bool {
        let mut test = simplify(test);
        for lp in self.containing_loops.iter().rev() {
            if test.is_const() {
                break;
            }
            if !expr_uses_var(&test, &lp.var) {
                continue;
            }
            if lp.interval.is_single_point() {
                if let Some(value) = &lp.interval.min {
                    test = substitute(&lp.var, value, &test);
                }
            } else {
                if let Some(solved) = solve_expression(&test, &lp.var) {
                    test = solved;
                }
                let mut scope = Scope::new();
                scope.push(lp.var.clone(), lp.interval.clone());
                test = and_condition_over_domain(&test, &scope);
            }
            test = simplify(&test);
        }
        trace!(%test, "proof attempt");
        test.as_bool() == Some(true)
    }
}

impl Mutator for SimplifyUsingBounds {
    fn mutate_expr(&mut self, e: &Expr) -> Expr {
        match e {
            Expr::Binary {
                op: op @ (BinOp::Min | BinOp::Max),
                a,
                b,
            } if e.ty().is_int() && e.ty().bits() >= 32 => {
                let a = self.mutate_expr(a);
                let b = self.mutate_expr(b);
                let (keeps_a, keeps_b) = match op {
                    BinOp::Min => (Expr::le(a.clone(), b.clone()), Expr::le(b.clone(), a.clone())),
                    _ => (Expr::ge(a.clone(), b.clone()), Expr::ge(b.clone(), a.clone())),
                };
                if self.provably_true_over_domain(&keeps_a) {
                    a
                } else if self.provably_true_over_domain(&keeps_b) {
                    b
                } else {
                    Expr::binary(*op, a, b)
                }
            }
            Expr::Cmp { op, a, b } => {
                let cmp = Expr::compare(*op, self.mutate_expr(a), self.mutate_expr(b));
                if self.provably_true_over_domain(&cmp) {
                    Expr::const_true()
                } else if self.provably_true_over_domain(&Expr::not(cmp.clone())) {
                    Expr::const_false()
                } else {
                    cmp
                }
            }
            Expr::Let { name, value, body } => {
                let value = self.mutate_expr(value);
                self.push(name.clone(), Interval::single_point(value.clone()));
                let body = self.mutate_expr(body);
                self.pop();
                Expr::let_in(name.clone(), value, body)
            }
            _ => walk_expr(self, e),
        }
    }

    fn mutate_stmt(&mut self, s: &Stmt) -> Stmt {
        match s {
            Stmt::For {
                name,
                min,
                extent,
                for_type,
                device_api,
                body,
            } => {
                let min = self.mutate_expr(min);
                let extent = self.mutate_expr(extent);
                let max = simplify(&Expr::sub(
                    Expr::add(min.clone(), extent.clone()),
                    Expr::make_one(extent.ty()),
                ));
                self.push(name.clone(), Interval::bounded(min.clone(), max));
                let body = self.mutate_stmt(body);
                self.pop();
                Stmt::For {
                    name: name.clone(),
                    min,
                    extent,
                    for_type: *for_type,
                    device_api: *device_api,
                    body: Box::new(body),
                }
            }
            Stmt::LetStmt { name, value, body } => {
                let value = self.mutate_expr(value);
                self.push(name.clone(), Interval::single_point(value.clone()));
                let body = self.mutate_stmt(body);
                self.pop();
                Stmt::let_stmt(name.clone(), value, body)
            }
            _ => walk_stmt(self, s),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{parse_expr, parse_stmt};

    fn in_range(src: &str, var: &str, min: i64, max: i64) -> String {
        let interval = Interval::bounded(Expr::int(min), Expr::int(max));
        let e = parse_expr(src).unwrap();
        simplify(&SimplifyUsingBounds::seeded(var, interval).mutate_expr(&e)).to_string()
    }

    #[test]
    fn comparisons_decided_by_the_range() {
        assert_eq!(in_range("i >= 50", "i", 50, 99), "true");
        assert_eq!(in_range("i < 50", "i", 50, 99), "false");
        assert_eq!(in_range("i < 70", "i", 50, 99), "i < 70");
    }

    #[test]
    fn min_and_max_pick_the_ordered_operand() {
        assert_eq!(in_range("min(i, 10)", "i", 0, 9), "i");
        assert_eq!(in_range("max(i, 10)", "i", 0, 9), "10");
        assert_eq!(in_range("min(i, 5)", "i", 0, 9), "min(i, 5)");
    }

    #[test]
    fn narrow_types_are_left_alone() {
        assert_eq!(in_range("min(i:i16, 10:i16)", "i", 0, 9), "min(i:i16, 10i16)");
    }

    #[test]
    fn unbounded_sides_still_prove_the_known_side() {
        let interval = Interval::new(Some(Expr::int(50)), None);
        let e = parse_expr("i >= 50 && i < 100").unwrap();
        let out = simplify(&SimplifyUsingBounds::seeded("i", interval).mutate_expr(&e));
        assert_eq!(out.to_string(), "i < 100");
    }

    #[test]
    fn nested_loops_and_lets_are_tracked() {
        let s = parse_stmt(
            "for (y, 0, 4) { for (x, 0, 8) { let t = x + y\n if (t < 11) { a[x] = min(t, 12) } } }",
        )
        .unwrap();
        let out = SimplifyUsingBounds::new().mutate_stmt(&s);
        assert_eq!(
            out.to_string(),
            "for (y, 0, 4) {\n  for (x, 0, 8) {\n    let t = x + y\n    if (true) {\n      a[x] = t\n    }\n  }\n}\n"
        );
    }
}
