//! Tree IR for loop nests.
//!
//! Expressions and statements are plain enums ([`Expr`], [`Stmt`]) that are
//! never mutated in place; passes implement [`Mutator`] and return new trees.

mod types;
pub use types::*;

pub mod intrinsics;
pub mod names;

mod interval;
pub use interval::{Interval, Scope};

mod ops;
pub use ops::{div_euclid_or_zero, mod_euclid_or_zero, wrap_int, wrap_uint};

mod printer;

mod visit;
pub use visit::{
    expr_contains, expr_uses_var, free_vars, free_vars_stmt, stmt_uses_var, substitute,
    substitute_in_all_lets, substitute_stmt, visit_expr_children, visit_stmt_children,
    walk_expr, walk_stmt, Mutator, Visitor,
};
