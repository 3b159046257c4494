//! Domain relaxation of conditions.

use tracing::trace;

use super::{bounds_of_expr_in_scope, simplify};
use crate::ir::{substitute_in_all_lets, Expr, Interval, Scope};

/// A condition that no longer mentions the scope's variables and that, when
/// true, guarantees `cond` holds at every point of the domain. Falls back to
/// `false` when nothing can be guaranteed.
pub fn and_condition_over_domain(cond: &Expr, scope: &Scope<Interval>) -> Expr {
    let cond = simplify(&substitute_in_all_lets(cond));
    let relaxed = bounds_of_expr_in_scope(&cond, scope)
        .min
        .map_or_else(Expr::const_false, |lo| simplify(&lo));
    trace!(%cond, %relaxed, "relaxed over domain");
    relaxed
}
