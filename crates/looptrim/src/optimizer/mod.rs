//! Loop trimming pass.
//!
//! Removes loop iterations that provably do nothing. Each piece is a
//! self-contained sub-module; [`trim_no_ops`] and [`trim_no_ops_with`] run
//! the whole pass over a statement.

use crate::ir::{Mutator, Stmt};
use crate::TrimOptions;

// ── Passes ───────────────────────────────────────────────────────────────────
mod no_op;
mod simplify_bounds;
mod strip_identities;
mod trim_no_ops;

pub use no_op::no_op_condition;
pub use simplify_bounds::SimplifyUsingBounds;
pub use strip_identities::strip_identities;

/// Trims no-op iterations from every loop in `s` with default options.
pub fn trim_no_ops(s: &Stmt) -> Stmt {
    trim_no_ops_with(s, &TrimOptions::default())
}

/// Trims no-op iterations from every loop in `s`.
pub fn trim_no_ops_with(s: &Stmt, options: &TrimOptions) -> Stmt {
    trim_no_ops::TrimNoOps::new(options).mutate_stmt(s)
}

// ── trim_no_ops integration tests ────────────────────────────────────────────
