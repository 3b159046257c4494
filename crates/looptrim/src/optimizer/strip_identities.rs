//! Removal of pass-through wrapper calls.
//!
//! `trace_expr`, `return_second` and `likely` all evaluate to one of their
//! arguments. Before two values are compared for equality the wrappers are
//! peeled off, so `a[i] = likely(a[i])` is seen as storing the loaded value.

use crate::ir::intrinsics::{LIKELY, RETURN_SECOND, TRACE_EXPR, TRACE_VALUE_ARG};
use crate::ir::{walk_expr, CallType, Expr, Mutator};

struct StripIdentities;

impl Mutator for StripIdentities {
    fn mutate_expr(&mut self, e: &Expr) -> Expr {
        if let Expr::Call {
            name,
            args,
            call_type: CallType::Intrinsic,
            ..
        } = e
        {
            let passed = match name.as_str() {
                TRACE_EXPR if args.len() > TRACE_VALUE_ARG => args.get(TRACE_VALUE_ARG),
                RETURN_SECOND | LIKELY => args.last(),
                _ => None,
            };
            if let Some(inner) = passed {
                return self.mutate_expr(inner);
            }
        }
        walk_expr(self, e)
    }
}

/// Replaces every pass-through wrapper in `e` by the argument it returns.
pub fn strip_identities(e: &Expr) -> Expr {
    StripIdentities.mutate_expr(e)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_expr;

    fn strip(src: &str) -> String {
        strip_identities(&parse_expr(src).unwrap()).to_string()
    }

    #[test]
    fn unwraps_pass_through_calls() {
        assert_eq!(strip("likely(x)"), "x");
        assert_eq!(strip("return_second(f(y), x + 1)"), "x + 1");
        assert_eq!(strip("trace_expr(0, 1, 2, 3, a[i], 5)"), "a[i]");
    }

    #[test]
    fn nested_wrappers_are_all_removed() {
        assert_eq!(strip("likely(return_second(y, likely(x))) + 1"), "x + 1");
    }

    #[test]
    fn short_trace_and_other_calls_are_kept() {
        assert_eq!(strip("trace_expr(0, 1, likely(x))"), "trace_expr(0, 1, x)");
        assert_eq!(strip("f(likely(x))"), "f(x)");
    }
}
