//! Algebraic simplifier.
//!
//! # What it does
//!
//! Rewrites expressions and statements into a canonical, smaller form:
//!
//! - constant folding for every scalar type (integers wrap to their width)
//! - signed integers of 32 bits and more are put in linear form
//!   ([`Linear`]), which also canonicalizes comparisons between them to
//!   `P op N + k`, `P op k` or `N op k`
//! - min/max of constants or of operands that differ by a constant
//! - boolean short-circuits, double negation, De Morgan, negated comparisons
//! - cheap `let` values are substituted, unused ones dropped
//! - statements that can do nothing become the canonical no-op
//!
//! Applying [`simplify`] to its own output returns the output unchanged.
//!
//! Rewrites never drop a sub-expression that calls an effectful intrinsic.

use crate::analysis::{has_side_effects, Linear};
use crate::ir::*;

/// Simplifies an expression.
pub fn simplify(e: &Expr) -> Expr {
    Simplifier.mutate_expr(e)
}

/// Simplifies a statement tree.
pub fn simplify_stmt(s: &Stmt) -> Stmt {
    Simplifier.mutate_stmt(s)
}

struct Simplifier;

impl Mutator for Simplifier {
    fn mutate_expr(&mut self, e: &Expr) -> Expr {
        match e {
            Expr::Binary { op, a, b } => {
                simplify_binary(*op, self.mutate_expr(a), self.mutate_expr(b))
            }
            Expr::Cmp { op, a, b } => simplify_cmp(*op, self.mutate_expr(a), self.mutate_expr(b)),
            Expr::And(a, b) => simplify_and(self.mutate_expr(a), self.mutate_expr(b)),
            Expr::Or(a, b) => simplify_or(self.mutate_expr(a), self.mutate_expr(b)),
            Expr::Not(a) => simplify_not(self.mutate_expr(a)),
            Expr::Select { cond, t, f } => {
                simplify_select(self.mutate_expr(cond), self.mutate_expr(t), self.mutate_expr(f))
            }
            Expr::Let { name, value, body } => {
                let value = self.mutate_expr(value);
                if is_cheap(&value) {
                    return self.mutate_expr(&substitute(name, &value, body));
                }
                let body = self.mutate_expr(body);
                if !expr_uses_var(&body, name) && !has_side_effects(&value) {
                    body
                } else {
                    Expr::let_in(name.clone(), value, body)
                }
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
                if extent.as_int().is_some_and(|n| n <= 0) {
                    return Stmt::no_op();
                }
                let body = self.mutate_stmt(body);
                if body.is_no_op() {
                    return Stmt::no_op();
                }
                if extent.is_one() && *device_api == DeviceApi::Host {
                    return self.mutate_stmt(&Stmt::let_stmt(name.clone(), min, body));
                }
                Stmt::For {
                    name: name.clone(),
                    min,
                    extent,
                    for_type: *for_type,
                    device_api: *device_api,
                    body: Box::new(body),
                }
            }
            Stmt::IfThenElse {
                cond,
                then_case,
                else_case,
            } => {
                let cond = self.mutate_expr(cond);
                match cond.as_bool() {
                    Some(true) => return self.mutate_stmt(then_case),
                    Some(false) => {
                        return else_case
                            .as_ref()
                            .map_or_else(Stmt::no_op, |e| self.mutate_stmt(e))
                    }
                    None => {}
                }
                let then_case = self.mutate_stmt(then_case);
                let else_case = else_case
                    .as_ref()
                    .map(|e| self.mutate_stmt(e))
                    .filter(|e| !e.is_no_op());
                match (then_case.is_no_op(), else_case) {
                    (true, None) if !has_side_effects(&cond) => Stmt::no_op(),
                    (true, Some(else_case)) => Stmt::if_then(simplify_not(cond), else_case),
                    (_, else_case) => Stmt::IfThenElse {
                        cond,
                        then_case: Box::new(then_case),
                        else_case: else_case.map(Box::new),
                    },
                }
            }
            Stmt::LetStmt { name, value, body } => {
                let value = self.mutate_expr(value);
                if is_cheap(&value) {
                    return self.mutate_stmt(&substitute_stmt(name, &value, body));
                }
                let body = self.mutate_stmt(body);
                if !stmt_uses_var(&body, name) && !has_side_effects(&value) {
                    body
                } else {
                    Stmt::let_stmt(name.clone(), value, body)
                }
            }
            Stmt::Evaluate(e) => {
                let e = self.mutate_expr(e);
                if e.is_const() {
                    Stmt::no_op()
                } else {
                    Stmt::Evaluate(e)
                }
            }
            Stmt::Block(stmts) => {
                let mut out = Vec::with_capacity(stmts.len());
                for s in stmts {
                    match self.mutate_stmt(s) {
                        Stmt::Block(inner) => out.extend(inner),
                        s if s.is_no_op() => {}
                        s => out.push(s),
                    }
                }
                Stmt::block(out)
            }
            Stmt::Store { .. } => walk_stmt(self, s),
        }
    }
}

/// Values worth substituting into every use: constants, variables, and a
/// variable plus a constant.
fn is_cheap(e: &Expr) -> bool {
    match e {
        _ if e.is_const() => true,
        Expr::Var { .. } => true,
        Expr::Binary {
            op: BinOp::Add | BinOp::Sub,
            a,
            b,
        } => matches!(**a, Expr::Var { .. }) && b.is_const(),
        _ => false,
    }
}

// ── Arithmetic ───────────────────────────────────────────────────────────────

fn fold_binary(op: BinOp, a: &Expr, b: &Expr) -> Option<Expr> {
    match (a, b) {
        (Expr::IntImm { ty, value: x }, Expr::IntImm { value: y, .. }) => {
            let (x, y) = (*x, *y);
            let v = match op {
                BinOp::Add => x.wrapping_add(y),
                BinOp::Sub => x.wrapping_sub(y),
                BinOp::Mul => x.wrapping_mul(y),
                BinOp::Div => div_euclid_or_zero(x, y),
                BinOp::Mod => mod_euclid_or_zero(x, y),
                BinOp::Min => x.min(y),
                BinOp::Max => x.max(y),
            };
            Some(Expr::int_of(*ty, v))
        }
        (Expr::UIntImm { ty, value: x }, Expr::UIntImm { value: y, .. }) => {
            let (x, y) = (*x, *y);
            let v = match op {
                BinOp::Add => x.wrapping_add(y),
                BinOp::Sub => x.wrapping_sub(y),
                BinOp::Mul => x.wrapping_mul(y),
                BinOp::Div => x.checked_div(y).unwrap_or(0),
                BinOp::Mod => x.checked_rem(y).unwrap_or(0),
                BinOp::Min => x.min(y),
                BinOp::Max => x.max(y),
            };
            Some(Expr::uint_of(*ty, v))
        }
        (Expr::FloatImm { ty, bits: x }, Expr::FloatImm { bits: y, .. }) => {
            let (x, y) = (f64::from_bits(*x), f64::from_bits(*y));
            let v = match op {
                BinOp::Add => x + y,
                BinOp::Sub => x - y,
                BinOp::Mul => x * y,
                BinOp::Div => x / y,
                BinOp::Mod => x.rem_euclid(y),
                BinOp::Min => x.min(y),
                BinOp::Max => x.max(y),
            };
            Some(Expr::float_of(*ty, v))
        }
        _ => None,
    }
}

fn simplify_binary(op: BinOp, a: Expr, b: Expr) -> Expr {
    if let Some(folded) = fold_binary(op, &a, &b) {
        return folded;
    }
    let ty = a.ty();
    let linear = ty.is_no_overflow_int() && !has_side_effects(&a) && !has_side_effects(&b);
    match op {
        BinOp::Min | BinOp::Max => return simplify_min_max(op, a, b),
        BinOp::Add | BinOp::Sub | BinOp::Mul if linear => {
            if op == BinOp::Mul && a.as_int().is_none() && b.as_int().is_none() {
                return if a <= b {
                    Expr::mul(a, b)
                } else {
                    Expr::mul(b, a)
                };
            }
            if let Some(lin) = Linear::from_expr(&Expr::binary(op, a.clone(), b.clone())) {
                return lin.to_expr();
            }
        }
        BinOp::Div | BinOp::Mod if linear => {
            if let (Some(lin), Some(k)) = (Linear::from_expr(&a), b.as_int()) {
                if k > 0 && lin.divisible_by(k) {
                    return if op == BinOp::Div {
                        lin.divided_by(k).to_expr()
                    } else {
                        Expr::make_zero(ty)
                    };
                }
                if k > 0 && op == BinOp::Mod && lin.terms.values().all(|c| c % k == 0) {
                    return Expr::int_of(ty, mod_euclid_or_zero(lin.constant, k));
                }
            }
        }
        _ => {}
    }

    let integral = ty.is_int() || ty.is_uint();
    if !integral {
        return Expr::binary(op, a, b);
    }
    // Constants go on the right of commutative operators.
    let (a, b) = if op.is_commutative() && a.is_const() && !b.is_const() {
        (b, a)
    } else {
        (a, b)
    };
    match op {
        BinOp::Add | BinOp::Sub if b.is_zero() => a,
        BinOp::Sub if a == b && !has_side_effects(&a) => Expr::make_zero(ty),
        BinOp::Mul | BinOp::Div if b.is_one() => a,
        BinOp::Mul if b.is_zero() && !has_side_effects(&a) => b,
        BinOp::Mod if b.is_one() && !has_side_effects(&a) => Expr::make_zero(ty),
        BinOp::Div | BinOp::Mod if b.is_zero() && !has_side_effects(&a) => Expr::make_zero(ty),
        _ => Expr::binary(op, a, b),
    }
}

fn simplify_min_max(op: BinOp, a: Expr, b: Expr) -> Expr {
    let is_min = op == BinOp::Min;
    let pure = !has_side_effects(&a) && !has_side_effects(&b);
    if a == b && pure {
        return a;
    }
    if let Some(d) = pure
        .then(|| Linear::difference(&a, &b))
        .flatten()
        .and_then(|d| d.as_constant())
    {
        // `a - b` is known, so the smaller side is too.
        let a_smaller = d <= 0;
        return if a_smaller == is_min { a } else { b };
    }
    let (a, b) = if a.is_const() || (!b.is_const() && a > b) {
        (b, a)
    } else {
        (a, b)
    };
    // min(min(x, c1), c2) -> min(x, min(c1, c2))
    if b.is_const() {
        if let Expr::Binary {
            op: inner,
            a: x,
            b: c1,
        } = &a
        {
            if *inner == op && c1.is_const() {
                if let Some(c) = fold_binary(op, c1, &b) {
                    return Expr::binary(op, (**x).clone(), c);
                }
            }
        }
    }
    Expr::binary(op, a, b)
}

// ── Comparisons ──────────────────────────────────────────────────────────────

fn fold_cmp(op: CmpOp, a: &Expr, b: &Expr) -> Option<bool> {
    match (a, b) {
        (Expr::IntImm { value: x, .. }, Expr::IntImm { value: y, .. }) => Some(op.eval(x, y)),
        (Expr::UIntImm { value: x, .. }, Expr::UIntImm { value: y, .. }) => Some(op.eval(x, y)),
        (Expr::FloatImm { bits: x, .. }, Expr::FloatImm { bits: y, .. }) => {
            Some(op.eval(f64::from_bits(*x), f64::from_bits(*y)))
        }
        (Expr::BoolImm(x), Expr::BoolImm(y)) => Some(op.eval(x, y)),
        _ => None,
    }
}

pub(crate) fn simplify_cmp(op: CmpOp, a: Expr, b: Expr) -> Expr {
    if let Some(v) = fold_cmp(op, &a, &b) {
        return Expr::bool(v);
    }
    if has_side_effects(&a) || has_side_effects(&b) {
        return Expr::compare(op, a, b);
    }
    let ty = a.ty();
    if a == b && !ty.is_float() {
        return Expr::bool(matches!(op, CmpOp::Eq | CmpOp::Le | CmpOp::Ge));
    }
    let Some(mut d) = Linear::difference(&a, &b) else {
        return Expr::compare(op, a, b);
    };
    if let Some(c) = d.as_constant() {
        return Expr::bool(op.eval(c, 0));
    }
    // a op b  <=>  pos - neg + c op 0  <=>  pos op neg - c
    let k = d.constant.wrapping_neg();
    d.constant = 0;
    let (pos, mut neg) = d.split_signs();
    if pos.terms.is_empty() {
        // -neg op k  <=>  neg flip(op) -k
        return Expr::compare(op.flip(), neg.to_expr(), Expr::int_of(ty, k.wrapping_neg()));
    }
    neg.constant = k;
    Expr::compare(op, pos.to_expr(), neg.to_expr())
}

// ── Booleans ─────────────────────────────────────────────────────────────────

fn is_negation_of(a: &Expr, b: &Expr) -> bool {
    matches!(a, Expr::Not(x) if **x == *b) || matches!(b, Expr::Not(x) if **x == *a)
}

pub(crate) fn simplify_and(a: Expr, b: Expr) -> Expr {
    match (a.as_bool(), b.as_bool()) {
        (Some(false), _) => a,
        (_, Some(false)) if !has_side_effects(&a) => b,
        (Some(true), _) => b,
        (_, Some(true)) => a,
        _ if a == b => a,
        _ if is_negation_of(&a, &b) && !has_side_effects(&a) => Expr::const_false(),
        _ => Expr::and(a, b),
    }
}

pub(crate) fn simplify_or(a: Expr, b: Expr) -> Expr {
    match (a.as_bool(), b.as_bool()) {
        (Some(true), _) => a,
        (_, Some(true)) if !has_side_effects(&a) => b,
        (Some(false), _) => b,
        (_, Some(false)) => a,
        _ if a == b => a,
        _ if is_negation_of(&a, &b) && !has_side_effects(&a) => Expr::const_true(),
        _ => Expr::or(a, b),
    }
}

pub(crate) fn simplify_not(a: Expr) -> Expr {
    match a {
        Expr::BoolImm(v) => Expr::bool(!v),
        Expr::Not(x) => *x,
        Expr::Cmp { op, a, b } if !a.ty().is_float() => simplify_cmp(op.negate(), *a, *b),
        Expr::And(x, y) => simplify_or(simplify_not(*x), simplify_not(*y)),
        Expr::Or(x, y) => simplify_and(simplify_not(*x), simplify_not(*y)),
        other => Expr::not(other),
    }
}

fn simplify_select(cond: Expr, t: Expr, f: Expr) -> Expr {
    match cond.as_bool() {
        Some(true) if !has_side_effects(&f) => return t,
        Some(false) if !has_side_effects(&t) => return f,
        _ => {}
    }
    if t == f && !has_side_effects(&cond) {
        return t;
    }
    match (t.as_bool(), f.as_bool()) {
        (Some(true), Some(false)) => cond,
        (Some(false), Some(true)) => simplify_not(cond),
        _ => Expr::select(cond, t, f),
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{parse_expr, parse_stmt};

    fn s(src: &str) -> String {
        simplify(&parse_expr(src).unwrap()).to_string()
    }

    fn st(src: &str) -> String {
        simplify_stmt(&parse_stmt(src).unwrap()).to_string()
    }

    // ── Arithmetic ──

    #[test]
    fn folds_constants_per_type() {
        assert_eq!(s("3 + 4 * 2"), "11");
        assert_eq!(s("-7 / 2"), "-4");
        assert_eq!(s("-7 % 2"), "1");
        assert_eq!(s("5 / 0"), "0");
        assert_eq!(s("250u8 + 10u8"), "4u8");
        assert_eq!(s("1.5f32 * 2.0f32"), "3.0f32");
        assert_eq!(s("100i8 + 100i8"), "-56i8");
    }

    #[test]
    fn collects_linear_terms() {
        assert_eq!(s("x + 1 - x"), "1");
        assert_eq!(s("(x + 3) * 2 - x"), "x + 6");
        assert_eq!(s("y + x - 2"), "x + y - 2");
        assert_eq!(s("1 - x"), "1 - x");
        assert_eq!(s("x - y * 3"), "x - y * 3");
        assert_eq!(s("(x * 4 + 8) / 4"), "x + 2");
        assert_eq!(s("(x * 4 + 9) % 4"), "1");
    }

    #[test]
    fn narrow_integers_keep_their_shape() {
        assert_eq!(s("b:i8 + 1 - b:i8"), "b:i8 + 1i8 - b:i8");
        assert_eq!(s("0u8 + u:u8"), "u:u8");
    }

    #[test]
    fn min_max_resolve_constant_differences() {
        assert_eq!(s("min(x, x + 1)"), "x");
        assert_eq!(s("max(x - 2, x)"), "x");
        assert_eq!(s("min(3, x)"), "min(x, 3)");
        assert_eq!(s("min(min(x, 5), 3)"), "min(x, 3)");
        assert_eq!(s("max(y, x)"), "max(x, y)");
        assert_eq!(s("min(x, y)"), "min(x, y)");
    }

    // ── Comparisons and booleans ──

    #[test]
    fn canonical_comparisons() {
        assert_eq!(s("50 <= i"), "i >= 50");
        assert_eq!(s("i + 1 > i"), "true");
        assert_eq!(s("x - y < 3"), "x < y + 3");
        assert_eq!(s("0 - x < 3"), "x > -3");
        assert_eq!(s("!(i < 50)"), "i >= 50");
    }

    #[test]
    fn float_self_comparison_is_kept() {
        assert_eq!(s("f:f32 == f:f32"), "f:f32 == f:f32");
        assert_eq!(s("u:u8 == u:u8"), "true");
    }

    #[test]
    fn boolean_short_circuits() {
        assert_eq!(s("c:bool && true"), "c:bool");
        assert_eq!(s("c:bool || true"), "true");
        assert_eq!(s("c:bool && !c:bool"), "false");
        assert_eq!(s("!!c:bool"), "c:bool");
        assert_eq!(s("!(x < 1 && y < 2)"), "x >= 1 || y >= 2");
        assert_eq!(s("select(true, x, y)"), "x");
        assert_eq!(s("select(c:bool, true, false)"), "c:bool");
    }

    #[test]
    fn effectful_operands_survive() {
        assert_eq!(s("image_store(0, 1) * 0"), "image_store(0, 1) * 0");
    }

    #[test]
    fn lets_substitute_cheap_values() {
        assert_eq!(s("(let t = x + 1 in t * t)"), "(x + 1) * (x + 1)");
        assert_eq!(s("(let t = f(x) in 3)"), "3");
        assert_eq!(s("(let t = f(x) in t * t)"), "(let t = f(x) in t * t)");
    }

    // ── Statements ──

    #[test]
    fn dead_statements_become_no_ops() {
        assert_eq!(st("for (i, 0, 0) { a[i] = 1 }"), "0\n");
        assert_eq!(st("for (i, 0, n) { 5 }"), "0\n");
        assert_eq!(st("if (1 < 0) { a[0] = 1 }"), "0\n");
        assert_eq!(st("for (i, 3, 1) { a[i] = i }"), "a[3] = 3\n");
    }

    #[test]
    fn if_with_empty_then_is_inverted() {
        assert_eq!(
            st("if (x < 3) { 0 } else { a[0] = 1 }"),
            "if (x >= 3) {\n  a[0] = 1\n}\n"
        );
    }

    #[test]
    fn blocks_flatten() {
        let out = st("{ a[0] = 1; 0 } { b[0] = 2 } 7");
        assert_eq!(out, "a[0] = 1\nb[0] = 2\n");
    }

    #[test]
    fn simplify_is_idempotent_on_samples() {
        for src in [
            "x * 3 - (y - x) * 2 + 1 < z - 4",
            "min(x + y, y + x + 1) + max(2, 3 - x)",
            "!(a:bool || x == y) && (z != 3 || !b:bool)",
            "(let t = f(x) in t + (let u = g(t) in u * t))",
        ] {
            let once = simplify(&parse_expr(src).unwrap());
            assert_eq!(simplify(&once), once, "not idempotent for {src}");
        }
    }
}
