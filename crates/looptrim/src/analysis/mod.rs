//! Expression analyses the loop passes are built on: simplification,
//! common-subexpression elimination, symbolic bounds, domain relaxation and
//! the variable solver.

mod bounds;
mod cse;
mod linear;
mod relax;
mod simplify;
mod solve;

pub use bounds::bounds_of_expr_in_scope;
pub use cse::common_subexpression_elimination;
pub use linear::Linear;
pub use relax::and_condition_over_domain;
pub use simplify::{simplify, simplify_stmt};
pub use solve::{solve_expression, solve_for_outer_interval};

use crate::ir::{expr_contains, intrinsics, CallType, Expr};

/// Whether evaluating `e` may call an effectful intrinsic.
pub fn has_side_effects(e: &Expr) -> bool {
    expr_contains(e, &mut |e| {
        matches!(
            e,
            Expr::Call { name, call_type: CallType::Intrinsic, .. } if intrinsics::is_effectful(name)
        )
    })
}
