//! Text format round trips.
//!
//! Printed programs must parse back to the same tree, so trimmed output can
//! be fed to the tool again.

use looptrim::ir::{Expr, Stmt, Type};
use looptrim::parser::{parse_expr, parse_stmt};

fn assert_round_trips(src: &str) {
    let stmt = parse_stmt(src).unwrap_or_else(|e| panic!("{src}: {e:#}"));
    let printed = stmt.to_string();
    let reparsed = parse_stmt(&printed).unwrap_or_else(|e| panic!("{printed}: {e:#}"));
    assert_eq!(stmt, reparsed, "printed form:\n{printed}");
}

#[test]
fn test_statements_round_trip() {
    for src in [
        "for (i, 0, n) { a[i] = 1 }",
        "parallel for (y, 0, h) { vectorized for (x, 0, 8) { a[x + y * 8] = src[x] } }",
        "gpu_block for (b, 0, 4) { gpu_thread for (t, 0, 32) { image_store(b, t) } }",
        "if (x < 3) { a[0] = 1 } else if (x < 5) { a[0] = 2 } else { a[0] = 3 }",
        "let t = f(x)\nb[t] = t * 2\nc[0] = t",
        "a[0] = 1; b[0] = 2; 0",
    ] {
        assert_round_trips(src);
    }
}

#[test]
fn test_expressions_round_trip() {
    for src in [
        "a - (b - c)",
        "(a + b) * c",
        "!(a < b) || c > 0 && d <= 1",
        "select(x == 0, -1, max(x, 2) / 3 % 4)",
        "(let y = x + 1 in y * y)",
        "0 - x * -2",
        "q:i64 + 5i64",
        "v:u8 * 3u8",
        "s:f64 * 1.5f64",
        "likely(a[i]) + trace_expr(0, 1, 2, 3, b[i])",
    ] {
        let e = parse_expr(src).unwrap_or_else(|e| panic!("{src}: {e:#}"));
        let printed = e.to_string();
        let reparsed = parse_expr(&printed).unwrap_or_else(|e| panic!("{printed}: {e:#}"));
        assert_eq!(e, reparsed, "{src} printed as {printed}");
    }
}

#[test]
fn test_annotations_set_types() {
    let e = parse_expr("a[i]:u16 + 1u16").unwrap();
    assert_eq!(e.ty(), Type::uint(16));
    let s = parse_stmt("out[0] = h:handle").unwrap();
    assert!(matches!(
        s,
        Stmt::Store { value: Expr::Var { ty, .. }, .. } if ty.is_handle()
    ));
}

#[test]
fn test_generated_names_survive_printing() {
    let src = "let i.new_min$7 = max(n, 0)\nfor (i, i.new_min$7, n - i.new_min$7) { a[i] = 1 }";
    assert_round_trips(src);
    let fresh = looptrim::ir::names::unique_name("i.new_min");
    assert_ne!(fresh, "i.new_min$7");
}
