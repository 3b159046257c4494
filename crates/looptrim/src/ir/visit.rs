//! Tree traversal: rebuilding mutators, read-only visitors, and the
//! variable queries and substitutions built on them.
//!
//! Passes implement [`Mutator`] and override the hooks for the nodes they
//! care about; every other node is rebuilt from its mutated children by
//! [`walk_expr`] / [`walk_stmt`]. Both walks match exhaustively, so adding an
//! IR variant forces every default traversal to be revisited.

use std::collections::BTreeSet;

use super::names::unique_name;
use super::types::*;

// ── Mutator ──────────────────────────────────────────────────────────────────

/// Rewrites a tree bottom-up into a new tree.
pub trait Mutator {
    fn mutate_expr(&mut self, e: &Expr) -> Expr {
        walk_expr(self, e)
    }

    fn mutate_stmt(&mut self, s: &Stmt) -> Stmt {
        walk_stmt(self, s)
    }
}

/// Rebuilds `e` with every child passed through `m`.
pub fn walk_expr<M: Mutator + ?Sized>(m: &mut M, e: &Expr) -> Expr {
    match e {
        Expr::IntImm { .. }
        | Expr::UIntImm { .. }
        | Expr::FloatImm { .. }
        | Expr::BoolImm(_)
        | Expr::Var { .. } => e.clone(),
        Expr::Binary { op, a, b } => Expr::binary(*op, m.mutate_expr(a), m.mutate_expr(b)),
        Expr::Cmp { op, a, b } => Expr::compare(*op, m.mutate_expr(a), m.mutate_expr(b)),
        Expr::And(a, b) => Expr::and(m.mutate_expr(a), m.mutate_expr(b)),
        Expr::Or(a, b) => Expr::or(m.mutate_expr(a), m.mutate_expr(b)),
        Expr::Not(a) => Expr::not(m.mutate_expr(a)),
        Expr::Select { cond, t, f } => {
            Expr::select(m.mutate_expr(cond), m.mutate_expr(t), m.mutate_expr(f))
        }
        Expr::Load { ty, name, index } => Expr::load(*ty, name.clone(), m.mutate_expr(index)),
        Expr::Call {
            ty,
            name,
            args,
            call_type,
        } => Expr::call(
            *ty,
            name.clone(),
            args.iter().map(|a| m.mutate_expr(a)).collect(),
            *call_type,
        ),
        Expr::Let { name, value, body } => {
            Expr::let_in(name.clone(), m.mutate_expr(value), m.mutate_expr(body))
        }
    }
}

/// Rebuilds `s` with every child expression and statement passed through `m`.
pub fn walk_stmt<M: Mutator + ?Sized>(m: &mut M, s: &Stmt) -> Stmt {
    match s {
        Stmt::Store { name, index, value } => {
            Stmt::store(name.clone(), m.mutate_expr(index), m.mutate_expr(value))
        }
        Stmt::For {
            name,
            min,
            extent,
            for_type,
            device_api,
            body,
        } => Stmt::For {
            name: name.clone(),
            min: m.mutate_expr(min),
            extent: m.mutate_expr(extent),
            for_type: *for_type,
            device_api: *device_api,
            body: Box::new(m.mutate_stmt(body)),
        },
        Stmt::IfThenElse {
            cond,
            then_case,
            else_case,
        } => Stmt::IfThenElse {
            cond: m.mutate_expr(cond),
            then_case: Box::new(m.mutate_stmt(then_case)),
            else_case: else_case.as_ref().map(|e| Box::new(m.mutate_stmt(e))),
        },
        Stmt::LetStmt { name, value, body } => {
            Stmt::let_stmt(name.clone(), m.mutate_expr(value), m.mutate_stmt(body))
        }
        Stmt::Evaluate(e) => Stmt::Evaluate(m.mutate_expr(e)),
        Stmt::Block(stmts) => Stmt::Block(stmts.iter().map(|s| m.mutate_stmt(s)).collect()),
    }
}

// ── Visitor ──────────────────────────────────────────────────────────────────

/// Read-only traversal.
pub trait Visitor {
    fn visit_expr(&mut self, e: &Expr) {
        visit_expr_children(self, e)
    }

    fn visit_stmt(&mut self, s: &Stmt) {
        visit_stmt_children(self, s)
    }
}

pub fn visit_expr_children<V: Visitor + ?Sized>(v: &mut V, e: &Expr) {
    for child in e.children() {
        v.visit_expr(child);
    }
}

pub fn visit_stmt_children<V: Visitor + ?Sized>(v: &mut V, s: &Stmt) {
    match s {
        Stmt::Store { index, value, .. } => {
            v.visit_expr(index);
            v.visit_expr(value);
        }
        Stmt::For {
            min, extent, body, ..
        } => {
            v.visit_expr(min);
            v.visit_expr(extent);
            v.visit_stmt(body);
        }
        Stmt::IfThenElse {
            cond,
            then_case,
            else_case,
        } => {
            v.visit_expr(cond);
            v.visit_stmt(then_case);
            if let Some(e) = else_case {
                v.visit_stmt(e);
            }
        }
        Stmt::LetStmt { value, body, .. } => {
            v.visit_expr(value);
            v.visit_stmt(body);
        }
        Stmt::Evaluate(e) => v.visit_expr(e),
        Stmt::Block(stmts) => {
            for s in stmts {
                v.visit_stmt(s);
            }
        }
    }
}

// ── Variable queries ─────────────────────────────────────────────────────────

/// Whether `e` reads the variable `name` (occurrences under a binder that
/// shadows `name` do not count).
pub fn expr_uses_var(e: &Expr, name: &str) -> bool {
    match e {
        Expr::Var { name: n, .. } => n == name,
        Expr::Let {
            name: n,
            value,
            body,
        } => expr_uses_var(value, name) || (n != name && expr_uses_var(body, name)),
        _ => e.children().into_iter().any(|c| expr_uses_var(c, name)),
    }
}

/// Statement counterpart of [`expr_uses_var`].
pub fn stmt_uses_var(s: &Stmt, name: &str) -> bool {
    match s {
        Stmt::Store { index, value, .. } => {
            expr_uses_var(index, name) || expr_uses_var(value, name)
        }
        Stmt::For {
            name: n,
            min,
            extent,
            body,
            ..
        } => {
            expr_uses_var(min, name)
                || expr_uses_var(extent, name)
                || (n != name && stmt_uses_var(body, name))
        }
        Stmt::IfThenElse {
            cond,
            then_case,
            else_case,
        } => {
            expr_uses_var(cond, name)
                || stmt_uses_var(then_case, name)
                || else_case.as_ref().is_some_and(|e| stmt_uses_var(e, name))
        }
        Stmt::LetStmt {
            name: n,
            value,
            body,
        } => expr_uses_var(value, name) || (n != name && stmt_uses_var(body, name)),
        Stmt::Evaluate(e) => expr_uses_var(e, name),
        Stmt::Block(stmts) => stmts.iter().any(|s| stmt_uses_var(s, name)),
    }
}

#[derive(Default)]
struct FreeVars {
    bound: Vec<String>,
    found: BTreeSet<String>,
}

impl FreeVars {
    fn note(&mut self, name: &str) {
        if !self.bound.iter().any(|b| b == name) {
            self.found.insert(name.to_string());
        }
    }
}

impl Visitor for FreeVars {
    fn visit_expr(&mut self, e: &Expr) {
        match e {
            Expr::Var { name, .. } => self.note(name),
            Expr::Let { name, value, body } => {
                self.visit_expr(value);
                self.bound.push(name.clone());
                self.visit_expr(body);
                self.bound.pop();
            }
            _ => visit_expr_children(self, e),
        }
    }

    fn visit_stmt(&mut self, s: &Stmt) {
        match s {
            Stmt::For {
                name,
                min,
                extent,
                body,
                ..
            } => {
                self.visit_expr(min);
                self.visit_expr(extent);
                self.bound.push(name.clone());
                self.visit_stmt(body);
                self.bound.pop();
            }
            Stmt::LetStmt { name, value, body } => {
                self.visit_expr(value);
                self.bound.push(name.clone());
                self.visit_stmt(body);
                self.bound.pop();
            }
            _ => visit_stmt_children(self, s),
        }
    }
}

/// Variables read by `e` that are not bound inside it.
pub fn free_vars(e: &Expr) -> BTreeSet<String> {
    let mut v = FreeVars::default();
    v.visit_expr(e);
    v.found
}

pub fn free_vars_stmt(s: &Stmt) -> BTreeSet<String> {
    let mut v = FreeVars::default();
    v.visit_stmt(s);
    v.found
}

/// Whether any node of `e` satisfies `pred`.
pub fn expr_contains(e: &Expr, pred: &mut impl FnMut(&Expr) -> bool) -> bool {
    pred(e) || e.children().into_iter().any(|c| expr_contains(c, pred))
}

// ── Substitution ─────────────────────────────────────────────────────────────

struct Rename<'a> {
    from: &'a str,
    to: &'a str,
}

impl Mutator for Rename<'_> {
    fn mutate_expr(&mut self, e: &Expr) -> Expr {
        match e {
            Expr::Var { ty, name } if name == self.from => Expr::var_of(*ty, self.to),
            Expr::Let { name, value, body } if name == self.from => {
                Expr::let_in(name.clone(), self.mutate_expr(value), (**body).clone())
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
            } if name == self.from => Stmt::For {
                name: name.clone(),
                min: self.mutate_expr(min),
                extent: self.mutate_expr(extent),
                for_type: *for_type,
                device_api: *device_api,
                body: body.clone(),
            },
            Stmt::LetStmt { name, value, body } if name == self.from => {
                Stmt::let_stmt(name.clone(), self.mutate_expr(value), (**body).clone())
            }
            _ => walk_stmt(self, s),
        }
    }
}

struct Substitute<'a> {
    name: &'a str,
    replacement: &'a Expr,
    replacement_vars: BTreeSet<String>,
}

impl Substitute<'_> {
    /// A fresh name for `binder` if keeping it would capture a variable of
    /// the replacement.
    fn fresh_binder(&self, binder: &str, body_uses_target: bool) -> Option<String> {
        if body_uses_target && self.replacement_vars.contains(binder) {
            Some(unique_name(binder))
        } else {
            None
        }
    }
}

impl Mutator for Substitute<'_> {
    fn mutate_expr(&mut self, e: &Expr) -> Expr {
        match e {
            Expr::Var { name, .. } if name == self.name => self.replacement.clone(),
            Expr::Let { name, value, body } => {
                let value = self.mutate_expr(value);
                if name == self.name {
                    return Expr::let_in(name.clone(), value, (**body).clone());
                }
                match self.fresh_binder(name, expr_uses_var(body, self.name)) {
                    Some(fresh) => {
                        let body = Rename {
                            from: name,
                            to: &fresh,
                        }
                        .mutate_expr(body);
                        Expr::let_in(fresh, value, self.mutate_expr(&body))
                    }
                    None => Expr::let_in(name.clone(), value, self.mutate_expr(body)),
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
                let (name, body) = if name == self.name {
                    (name.clone(), (**body).clone())
                } else {
                    match self.fresh_binder(name, stmt_uses_var(body, self.name)) {
                        Some(fresh) => {
                            let body = Rename {
                                from: name,
                                to: &fresh,
                            }
                            .mutate_stmt(body);
                            let body = self.mutate_stmt(&body);
                            (fresh, body)
                        }
                        None => (name.clone(), self.mutate_stmt(body)),
                    }
                };
                Stmt::For {
                    name,
                    min,
                    extent,
                    for_type: *for_type,
                    device_api: *device_api,
                    body: Box::new(body),
                }
            }
            Stmt::LetStmt { name, value, body } => {
                let value = self.mutate_expr(value);
                if name == self.name {
                    return Stmt::let_stmt(name.clone(), value, (**body).clone());
                }
                match self.fresh_binder(name, stmt_uses_var(body, self.name)) {
                    Some(fresh) => {
                        let body = Rename {
                            from: name,
                            to: &fresh,
                        }
                        .mutate_stmt(body);
                        Stmt::let_stmt(fresh, value, self.mutate_stmt(&body))
                    }
                    None => Stmt::let_stmt(name.clone(), value, self.mutate_stmt(body)),
                }
            }
            _ => walk_stmt(self, s),
        }
    }
}

/// Replaces free occurrences of `name` in `e` by `replacement`, renaming
/// binders that would otherwise capture a variable of `replacement`.
pub fn substitute(name: &str, replacement: &Expr, e: &Expr) -> Expr {
    Substitute {
        name,
        replacement,
        replacement_vars: free_vars(replacement),
    }
    .mutate_expr(e)
}

pub fn substitute_stmt(name: &str, replacement: &Expr, s: &Stmt) -> Stmt {
    Substitute {
        name,
        replacement,
        replacement_vars: free_vars(replacement),
    }
    .mutate_stmt(s)
}

/// Removes every `Let` in `e` by substituting its value into its body.
pub fn substitute_in_all_lets(e: &Expr) -> Expr {
    struct Inline;
    impl Mutator for Inline {
        fn mutate_expr(&mut self, e: &Expr) -> Expr {
            match e {
                Expr::Let { name, value, body } => {
                    let value = self.mutate_expr(value);
                    let body = self.mutate_expr(body);
                    substitute(name, &value, &body)
                }
                _ => walk_expr(self, e),
            }
        }
    }
    Inline.mutate_expr(e)
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn x() -> Expr {
        Expr::var("x")
    }

    fn y() -> Expr {
        Expr::var("y")
    }

    #[test]
    fn uses_var_respects_shadowing() {
        let e = Expr::let_in("x", Expr::int(1), Expr::add(x(), y()));
        assert!(!expr_uses_var(&e, "x"));
        assert!(expr_uses_var(&e, "y"));

        let s = Stmt::for_loop("i", Expr::int(0), x(), Stmt::evaluate(Expr::var("i")));
        assert!(stmt_uses_var(&s, "x"));
        assert!(!stmt_uses_var(&s, "i"));
    }

    #[test]
    fn free_vars_skip_bound_names() {
        let s = Stmt::let_stmt(
            "a",
            x(),
            Stmt::store("buf", Expr::var("a"), Expr::add(y(), Expr::var("a"))),
        );
        let vars: Vec<_> = free_vars_stmt(&s).into_iter().collect();
        assert_eq!(vars, vec!["x".to_string(), "y".to_string()]);
    }

    #[test]
    fn substitute_replaces_free_occurrences_only() {
        let e = Expr::add(x(), Expr::let_in("x", Expr::int(2), x()));
        let out = substitute("x", &Expr::int(7), &e);
        assert_eq!(
            out,
            Expr::add(Expr::int(7), Expr::let_in("x", Expr::int(2), x()))
        );
    }

    #[test]
    fn substitute_renames_capturing_binder() {
        // let y = 1 in x + y, with x := y
        let e = Expr::let_in("y", Expr::int(1), Expr::add(x(), y()));
        let out = substitute("x", &y(), &e);
        match out {
            Expr::Let { name, body, .. } => {
                assert_ne!(name, "y", "binder should have been renamed");
                assert_eq!(*body, Expr::add(y(), Expr::var(name)));
            }
            other => panic!("expected a let, got {other:?}"),
        }
    }

    #[test]
    fn substitute_in_all_lets_removes_lets() {
        let e = Expr::let_in(
            "a",
            Expr::add(x(), Expr::int(1)),
            Expr::let_in("b", Expr::var("a"), Expr::mul(Expr::var("b"), Expr::var("a"))),
        );
        let x1 = Expr::add(x(), Expr::int(1));
        assert_eq!(substitute_in_all_lets(&e), Expr::mul(x1.clone(), x1));
    }

    #[test]
    fn default_walk_rebuilds_identically() {
        struct Identity;
        impl Mutator for Identity {}
        let s = Stmt::if_then_else(
            Expr::lt(x(), Expr::int(3)),
            Stmt::store("a", x(), Expr::select(Expr::const_true(), x(), y())),
            Stmt::block(vec![Stmt::no_op(), Stmt::evaluate(y())]),
        );
        assert_eq!(Identity.mutate_stmt(&s), s);
    }
}
