//! Common-subexpression elimination.
//!
//! # Algorithm
//!
//! 1. Inline every `let`, so equal computations are spelled the same way.
//! 2. Count non-leaf, side-effect-free sub-expressions top-down. A node that
//!    was already seen is not descended into again, so the parts of a
//!    repeated expression are not counted once per repetition.
//! 3. Every expression seen at least twice is bound to a fresh `t` name.
//!    Smaller expressions are bound first (outermost), and larger ones are
//!    rewritten in terms of them.

use std::collections::HashMap;

use tracing::trace;

use super::has_side_effects;
use crate::ir::{names::unique_name, substitute_in_all_lets, walk_expr, Expr, Mutator};

fn is_leaf(e: &Expr) -> bool {
    e.is_const() || matches!(e, Expr::Var { .. })
}

fn count(e: &Expr, counts: &mut HashMap<Expr, usize>) {
    if is_leaf(e) {
        return;
    }
    if has_side_effects(e) {
        for child in e.children() {
            count(child, counts);
        }
        return;
    }
    let seen = counts.entry(e.clone()).or_insert(0);
    *seen += 1;
    if *seen == 1 {
        for child in e.children() {
            count(child, counts);
        }
    }
}

struct Replace<'a> {
    target: &'a Expr,
    with: &'a Expr,
}

impl Mutator for Replace<'_> {
    fn mutate_expr(&mut self, e: &Expr) -> Expr {
        if e == self.target {
            self.with.clone()
        } else {
            walk_expr(self, e)
        }
    }
}

/// Binds repeated sub-expressions of `e` to fresh names.
pub fn common_subexpression_elimination(e: &Expr) -> Expr {
    let mut body = substitute_in_all_lets(e);

    let mut counts = HashMap::new();
    count(&body, &mut counts);
    let mut repeated: Vec<Expr> = counts
        .into_iter()
        .filter(|(_, n)| *n >= 2)
        .map(|(e, _)| e)
        .collect();
    if repeated.is_empty() {
        return body;
    }
    repeated.sort_by(|a, b| a.node_count().cmp(&b.node_count()).then_with(|| a.cmp(b)));

    let mut bindings = Vec::with_capacity(repeated.len());
    for i in 0..repeated.len() {
        let value = repeated[i].clone();
        let name = unique_name("t");
        let var = Expr::var_of(value.ty(), name.clone());
        let mut replace = Replace {
            target: &value,
            with: &var,
        };
        body = replace.mutate_expr(&body);
        for later in &mut repeated[i + 1..] {
            *later = replace.mutate_expr(later);
        }
        trace!(name = %name, value = %value, "cse binding");
        bindings.push((name, value));
    }

    bindings
        .into_iter()
        .rev()
        .fold(body, |body, (name, value)| Expr::let_in(name, value, body))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_expr;

    fn cse(src: &str) -> Expr {
        common_subexpression_elimination(&parse_expr(src).unwrap())
    }

    fn let_names(mut e: &Expr) -> Vec<(String, Expr)> {
        let mut out = Vec::new();
        while let Expr::Let { name, value, body } = e {
            out.push((name.clone(), (**value).clone()));
            e = body;
        }
        out
    }

    #[test]
    fn nothing_repeated_is_unchanged() {
        let e = parse_expr("x + y * z").unwrap();
        assert_eq!(common_subexpression_elimination(&e), e);
    }

    #[test]
    fn repeated_term_is_bound_once() {
        let out = cse("(x + y) * (x + y) + f(x + y)");
        let lets = let_names(&out);
        assert_eq!(lets.len(), 1);
        assert_eq!(lets[0].1, parse_expr("x + y").unwrap());
    }

    #[test]
    fn parts_of_repeated_terms_are_not_counted_twice() {
        let out = cse("(a + b) * c < (a + b) * c + 1");
        let lets = let_names(&out);
        assert_eq!(lets.len(), 1, "only the whole product repeats: {out}");
        assert_eq!(lets[0].1, parse_expr("(a + b) * c").unwrap());
    }

    #[test]
    fn smaller_bindings_are_outermost() {
        let out = cse("g(x + 1, (x + 1) * 2, (x + 1) * 2) + (x + 1)");
        let lets = let_names(&out);
        assert_eq!(lets.len(), 2, "{out}");
        let (outer, _) = &lets[0];
        assert_eq!(lets[0].1, parse_expr("x + 1").unwrap());
        assert_eq!(lets[1].1, Expr::mul(Expr::var(outer.as_str()), Expr::int(2)));
    }

    #[test]
    fn effectful_calls_are_not_shared() {
        let out = cse("image_store(0, 1) + image_store(0, 1)");
        assert!(let_names(&out).is_empty());
    }

    #[test]
    fn lets_are_inlined_first() {
        let out = cse("(let a = x * y in a + x * y)");
        let lets = let_names(&out);
        assert_eq!(lets.len(), 1);
        assert_eq!(lets[0].1, parse_expr("x * y").unwrap());
    }
}
