//! Loop trimming.
//!
//! # What it does
//!
//! Visits loops bottom-up. For each loop it infers the condition under which
//! one iteration of the (already trimmed) body does nothing:
//!
//! - always a no-op, or an extent that is never positive → the loop is
//!   deleted;
//! - never provably a no-op → the loop is kept;
//! - a no-op outside an interval of the loop variable → the loop is narrowed
//!   to that interval, and its body is simplified knowing the variable lies
//!   inside it.
//!
//! # Example
//!
//! ```text
//! for (i, 0, 100) {            for (i, 50, 50) {
//!   if (i >= 50) {       →       a[i] = 1
//!     a[i] = 1                 }
//!   }
//! }
//! ```

use tracing::debug;

use super::no_op::no_op_condition;
use super::simplify_bounds::SimplifyUsingBounds;
use crate::analysis::{
    common_subexpression_elimination, simplify, simplify_stmt, solve_for_outer_interval,
};
use crate::ir::{names::unique_name, walk_stmt, Expr, Mutator, Stmt};
use crate::TrimOptions;

pub(super) struct TrimNoOps<'a> {
    options: &'a TrimOptions,
}

impl<'a> TrimNoOps<'a> {
    pub(super) fn new(options: &'a TrimOptions) -> Self {
        Self { options }
    }
}

impl Mutator for TrimNoOps<'_> {
    fn mutate_stmt(&mut self, s: &Stmt) -> Stmt {
        let Stmt::For {
            name,
            min,
            extent,
            for_type,
            device_api,
            body,
        } = s
        else {
            if let Stmt::Block(stmts) = s {
                // Drop the loops deleted below.
                return Stmt::block(
                    stmts
                        .iter()
                        .map(|s| self.mutate_stmt(s))
                        .filter(|s| !s.is_no_op())
                        .collect(),
                );
            }
            return walk_stmt(self, s);
        };

        let runs_zero_times = simplify(&Expr::le(extent.clone(), Expr::make_zero(extent.ty())));
        if runs_zero_times.as_bool() == Some(true) {
            debug!(loop_var = %name, %extent, "removing loop that never runs");
            return Stmt::no_op();
        }

        let body = self.mutate_stmt(body);
        let rebuild = |min: Expr, extent: Expr, body: Stmt| Stmt::For {
            name: name.clone(),
            min,
            extent,
            for_type: *for_type,
            device_api: *device_api,
            body: Box::new(body),
        };

        let is_no_op = simplify(&simplify(&common_subexpression_elimination(
            &no_op_condition(&body),
        )));
        debug!(loop_var = %name, condition = %is_no_op, "loop no-op condition");

        match is_no_op.as_bool() {
            Some(true) => {
                debug!(loop_var = %name, "removing no-op loop");
                return Stmt::no_op();
            }
            Some(false) => return rebuild(min.clone(), extent.clone(), body),
            None => {}
        }

        if !self.options.narrow_loops || (for_type.is_gpu() && !self.options.narrow_device_loops) {
            return rebuild(min.clone(), extent.clone(), body);
        }

        let interval = solve_for_outer_interval(&Expr::not(is_no_op), name);
        if interval.is_everything() {
            return rebuild(min.clone(), extent.clone(), body);
        }
        debug!(loop_var = %name, min = ?interval.min, max = ?interval.max, "loop does work only in");

        let body = SimplifyUsingBounds::seeded(name.clone(), interval.clone()).mutate_stmt(&body);
        let body = simplify_stmt(&body);

        let ty = min.ty();
        let old_max_name = unique_name(&format!("{name}.old_max"));
        let new_min_name = unique_name(&format!("{name}.new_min"));
        let new_max_name = unique_name(&format!("{name}.new_max"));
        let old_max_var = Expr::var_of(ty, old_max_name.clone());
        let new_min_var = Expr::var_of(ty, new_min_name.clone());
        let new_max_var = Expr::var_of(ty, new_max_name.clone());

        let old_max = Expr::add(min.clone(), extent.clone());
        let new_min = match interval.min {
            Some(lo) => Expr::clamp(lo, min.clone(), old_max_var.clone()),
            None => min.clone(),
        };
        let new_max = match interval.max {
            Some(hi) => Expr::clamp(hi.plus(1), new_min_var.clone(), old_max_var),
            None => old_max_var,
        };

        let new_extent = Expr::sub(new_max_var, new_min_var.clone());
        let narrowed = rebuild(new_min_var, new_extent, body);
        let narrowed = Stmt::let_stmt(new_max_name, new_max, narrowed);
        let narrowed = Stmt::let_stmt(new_min_name, new_min, narrowed);
        let narrowed = Stmt::let_stmt(old_max_name, old_max, narrowed);
        let narrowed = if self.options.final_simplify {
            simplify_stmt(&narrowed)
        } else {
            narrowed
        };

        debug!(old = %s, new = %narrowed, "narrowed loop");
        narrowed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_stmt;

    fn trim_with(src: &str, options: &TrimOptions) -> String {
        TrimNoOps::new(options)
            .mutate_stmt(&parse_stmt(src).unwrap())
            .to_string()
    }

    fn trim(src: &str) -> String {
        trim_with(src, &TrimOptions::default())
    }

    #[test]
    fn upper_half_guard_narrows_loop() {
        assert_eq!(
            trim("for (i, 0, 100) { if (i >= 50) { a[i] = 1 } }"),
            "for (i, 50, 50) {\n  a[i] = 1\n}\n"
        );
    }

    #[test]
    fn lower_half_guard_narrows_loop() {
        assert_eq!(
            trim("for (i, 0, 100) { if (i < 10) { a[i] = 1 } }"),
            "for (i, 0, 10) {\n  a[i] = 1\n}\n"
        );
    }

    #[test]
    fn self_stores_are_deleted() {
        assert_eq!(trim("for (i, 0, n) { a[i] = a[i] }"), "0\n");
    }

    #[test]
    fn unprovable_loops_are_kept() {
        let src = "for (i, 0, n) {\n  a[i] = f(i)\n}\n";
        assert_eq!(trim(src), src);
    }

    #[test]
    fn symbolic_bounds_keep_clamps() {
        let out = trim("for (i, 0, n) { if (i >= m) { a[i] = 1 } }");
        assert!(out.contains("max(min(m, n), 0)"), "{out}");
        assert!(!out.contains("if"), "{out}");
    }

    #[test]
    fn narrowing_can_be_disabled() {
        let src = "for (i, 0, 100) {\n  if (i >= 50) {\n    a[i] = 1\n  }\n}\n";
        let options = TrimOptions {
            narrow_loops: false,
            ..TrimOptions::default()
        };
        assert_eq!(trim_with(src, &options), src);
    }

    #[test]
    fn gpu_loops_are_narrowed_only_on_request() {
        let src = "gpu_thread for (i, 0, 100) {\n  if (i >= 50) {\n    a[i] = 1\n  }\n}\n";
        assert_eq!(trim(src), src);
        let options = TrimOptions {
            narrow_device_loops: true,
            ..TrimOptions::default()
        };
        assert_eq!(
            trim_with(src, &options),
            "gpu_thread for (i, 50, 50) {\n  a[i] = 1\n}\n"
        );
    }

    #[test]
    fn without_final_simplify_the_bounds_stay_bound() {
        let options = TrimOptions {
            final_simplify: false,
            ..TrimOptions::default()
        };
        let out = trim_with("for (i, 0, 100) { if (i >= 50) { a[i] = 1 } }", &options);
        assert!(out.starts_with("let i.old_max$"), "{out}");
        assert!(!out.contains("if"), "{out}");
    }

    #[test]
    fn narrowed_body_is_simplified_without_final_simplify() {
        let options = TrimOptions {
            final_simplify: false,
            ..TrimOptions::default()
        };
        let out = trim_with(
            "for (i, 0, 100) { if (i >= 50 && i < 100) { a[i] = min(i, 200) } }",
            &options,
        );
        assert!(out.contains("{\n  a[i] = i\n}"), "{out}");
        assert!(!out.contains("if"), "{out}");
    }
}
