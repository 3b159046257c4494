//! Behavior of the trimming pass on hand-written loop nests.
//!
//! These tests check the rewrites the pass promises: deleting loops that do
//! nothing, shrinking guarded loops to the range where the guard holds, and
//! leaving everything it cannot prove alone.

use looptrim::ir::Stmt;
use looptrim::parser::parse_stmt;
use looptrim::{trim_no_ops, trim_no_ops_with, TrimOptions};
use looptrim_tests::observe;

fn make_stmt(src: &str) -> Stmt {
    parse_stmt(src).unwrap_or_else(|e| panic!("failed to parse test program: {e:#}"))
}

fn trimmed(src: &str) -> String {
    trim_no_ops(&make_stmt(src)).to_string()
}

// ── Dead loops ───────────────────────────────────────────────────────────────

#[test]
fn test_loop_of_self_copies_is_removed() {
    assert_eq!(trimmed("for (i, 0, n) { a[i] = a[i] }"), "0\n");
}

#[test]
fn test_loop_of_pure_evaluates_is_removed() {
    assert_eq!(trimmed("for (i, 0, n) { f(i) + 1 }"), "0\n");
}

#[test]
fn test_loop_whose_guard_never_holds_is_removed() {
    assert_eq!(
        trimmed("for (i, 0, 10) { if (i > 20) { a[i] = 1 } }"),
        "0\n"
    );
}

#[test]
fn test_dead_inner_loop_leaves_live_siblings() {
    let out = trimmed("for (y, 0, 4) {\n  for (x, 0, 4) { a[x] = a[x] }\n  b[y] = 1\n}");
    assert_eq!(out, "for (y, 0, 4) {\n  b[y] = 1\n}\n");
}

// ── Zero extent ──────────────────────────────────────────────────────────────

#[test]
fn test_zero_extent_loop_is_removed_whatever_its_body() {
    assert_eq!(trimmed("for (i, 0, 0) { image_store(i, 1) }"), "0\n");
    assert_eq!(trimmed("for (i, 0, n - n) { a[i] = 1 }"), "0\n");
    assert_eq!(trimmed("for (i, 5, -3) { copy_memory(i) }"), "0\n");
}

// ── Narrowing ────────────────────────────────────────────────────────────────

#[test]
fn test_guard_on_upper_half_is_hoisted_into_bounds() {
    assert_eq!(
        trimmed("for (i, 0, 100) { if (i >= 50) { a[i] = 1 } }"),
        "for (i, 50, 50) {\n  a[i] = 1\n}\n"
    );
}

#[test]
fn test_two_sided_guard_narrows_both_ends() {
    assert_eq!(
        trimmed("for (i, 0, 100) { if (i >= 10 && i < 20) { a[i] = 1 } }"),
        "for (i, 10, 10) {\n  a[i] = 1\n}\n"
    );
}

#[test]
fn test_scaled_guard_rounds_inwards() {
    // 3*i >= 10 first holds at i = 4
    assert_eq!(
        trimmed("for (i, 0, 10) { if (i * 3 >= 10) { a[i] = 1 } }"),
        "for (i, 4, 6) {\n  a[i] = 1\n}\n"
    );
}

#[test]
fn test_guard_beyond_range_is_clamped() {
    // Work only for i >= 50 in a loop that stops at 20: nothing is left.
    let out = trimmed("for (i, 0, 20) { if (i >= 50) { a[i] = 1 } }");
    assert_eq!(out, "0\n");
}

#[test]
fn test_outer_loop_narrowed_by_inner_guard() {
    let out = trimmed("for (y, 0, 8) { for (x, 0, 8) { if (y < 2) { a[x + y * 8] = 1 } } }");
    assert_eq!(
        out,
        "for (y, 0, 2) {\n  for (x, 0, 8) {\n    a[x + y * 8] = 1\n  }\n}\n"
    );
}

#[test]
fn test_narrowed_loop_behaves_like_original() {
    let src = "for (i, 0, n) { if (i >= m && i < m + 3) { a[i] = i } }";
    let original = make_stmt(src);
    let trimmed = trim_no_ops(&original);
    assert!(!trimmed.to_string().contains("if"), "{trimmed}");
    for env in 0..32 {
        assert_eq!(observe(&original, env), observe(&trimmed, env), "env {env}");
    }
}

// ── Unprovable loops ─────────────────────────────────────────────────────────

#[test]
fn test_unprovable_loops_are_unchanged() {
    for src in [
        "for (i, 0, n) {\n  a[i] = src[i]\n}\n",
        "for (i, 0, n) {\n  if (src[i] > 3) {\n    a[i] = 1\n  }\n}\n",
        "for (i, 0, n) {\n  if (i < 3 || i > 7) {\n    a[i] = 1\n  }\n}\n",
        "for (i, 0, n) {\n  image_store(i, 0)\n}\n",
    ] {
        assert_eq!(trimmed(src), src);
    }
}

#[test]
fn test_disabled_narrowing_still_removes_dead_loops() {
    let options = TrimOptions {
        narrow_loops: false,
        ..TrimOptions::default()
    };
    let dead = make_stmt("for (i, 0, n) { a[i] = a[i] }");
    assert_eq!(trim_no_ops_with(&dead, &options).to_string(), "0\n");
    let guarded = make_stmt("for (i, 0, 100) { if (i >= 50) { a[i] = 1 } }");
    assert_eq!(trim_no_ops_with(&guarded, &options), guarded);
}

// ── Min/max resolution ───────────────────────────────────────────────────────

#[test]
fn test_min_resolved_inside_loop_domain() {
    let out = trimmed("for (i, 0, 10) { if (i < 10) { a[i] = min(i, 10) } }");
    assert_eq!(out, "for (i, 0, 10) {\n  a[i] = i\n}\n");
}

#[test]
fn test_min_unresolved_outside_loop_domain() {
    let src = "a[0] = min(i, 10)\n";
    assert_eq!(trimmed(src), src);
}

// ── Idempotence ──────────────────────────────────────────────────────────────

#[test]
fn test_second_trim_changes_nothing() {
    for src in [
        "for (i, 0, 100) { if (i >= 50) { a[i] = 1 } }",
        "for (i, 0, n) { if (i >= m) { a[i] = 1 } }",
        "for (i, 0, n) { if (i < m) { a[i] = 1 } else { b[i] = 2 } }",
        "for (y, 0, h) { for (x, 0, w) { if (x > 3 && y < 7) { a[x + y * w] = x } } }",
        "for (i, 0, n) { a[i] = a[i]\n b[i] = src[i] }",
    ] {
        let once = trim_no_ops(&make_stmt(src));
        let twice = trim_no_ops(&once);
        assert_eq!(once, twice, "second trim changed the result of {src}");
    }
}
