//! Text form of the IR.
//!
//! The output is accepted by [`crate::parser`], so printing and re-parsing a
//! tree gives back the same tree. Parentheses are only emitted where
//! precedence requires them.

use std::fmt;

use super::intrinsics;
use super::types::*;

const PREC_OR: u8 = 1;
const PREC_AND: u8 = 2;
const PREC_CMP: u8 = 4;
const PREC_ADD: u8 = 5;
const PREC_MUL: u8 = 6;
const PREC_UNARY: u8 = 7;
const PREC_ATOM: u8 = 8;

fn precedence(e: &Expr) -> u8 {
    match e {
        Expr::Or(..) => PREC_OR,
        Expr::And(..) => PREC_AND,
        Expr::Cmp { .. } => PREC_CMP,
        Expr::Binary { op, .. } => match op {
            BinOp::Add | BinOp::Sub => PREC_ADD,
            BinOp::Mul | BinOp::Div | BinOp::Mod => PREC_MUL,
            BinOp::Min | BinOp::Max => PREC_ATOM,
        },
        Expr::Not(_) => PREC_UNARY,
        Expr::IntImm { value, .. } if *value < 0 => PREC_UNARY,
        Expr::FloatImm { bits, .. } if f64::from_bits(*bits).is_sign_negative() => PREC_UNARY,
        _ => PREC_ATOM,
    }
}

fn binop_symbol(op: BinOp) -> &'static str {
    match op {
        BinOp::Add => "+",
        BinOp::Sub => "-",
        BinOp::Mul => "*",
        BinOp::Div => "/",
        BinOp::Mod => "%",
        BinOp::Min => "min",
        BinOp::Max => "max",
    }
}

struct Child<'a>(&'a Expr, u8);

impl fmt::Display for Child<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if precedence(self.0) < self.1 {
            write!(f, "({})", self.0)
        } else {
            write!(f, "{}", self.0)
        }
    }
}

fn write_type_suffix(f: &mut fmt::Formatter<'_>, ty: Type, default: Type) -> fmt::Result {
    if ty != default {
        write!(f, ":{ty}")?;
    }
    Ok(())
}

fn write_args(f: &mut fmt::Formatter<'_>, args: &[&Expr]) -> fmt::Result {
    for (i, a) in args.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{a}")?;
    }
    Ok(())
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::IntImm { ty, value } => match ty.code {
                TypeCode::Int if *ty == Type::int(32) => write!(f, "{value}"),
                TypeCode::Int => write!(f, "{value}{ty}"),
                _ => write!(f, "{value}:{ty}"),
            },
            Expr::UIntImm { ty, value } => write!(f, "{value}{ty}"),
            Expr::FloatImm { ty, bits } => {
                let v = f64::from_bits(*bits);
                if ty.bits == 32 {
                    write!(f, "{:?}{ty}", v as f32)
                } else {
                    write!(f, "{v:?}{ty}")
                }
            }
            Expr::BoolImm(b) => write!(f, "{b}"),
            Expr::Var { ty, name } => {
                write!(f, "{name}")?;
                write_type_suffix(f, *ty, Type::int(32))
            }
            Expr::Binary { op, a, b } => match op {
                BinOp::Min | BinOp::Max => write!(f, "{}({a}, {b})", binop_symbol(*op)),
                _ => {
                    let p = precedence(self);
                    write!(
                        f,
                        "{} {} {}",
                        Child(a, p),
                        binop_symbol(*op),
                        Child(b, p + 1)
                    )
                }
            },
            Expr::Cmp { op, a, b } => write!(
                f,
                "{} {} {}",
                Child(a, PREC_CMP + 1),
                op.symbol(),
                Child(b, PREC_CMP + 1)
            ),
            Expr::And(a, b) => write!(f, "{} && {}", Child(a, PREC_AND), Child(b, PREC_AND + 1)),
            Expr::Or(a, b) => write!(f, "{} || {}", Child(a, PREC_OR), Child(b, PREC_OR + 1)),
            Expr::Not(a) => write!(f, "!{}", Child(a, PREC_ATOM)),
            Expr::Select { cond, t, f: fv } => write!(f, "select({cond}, {t}, {fv})"),
            Expr::Load { ty, name, index } => {
                write!(f, "{name}[{index}]")?;
                write_type_suffix(f, *ty, Type::int(32))
            }
            Expr::Call { ty, name, args, .. } => {
                write!(f, "{name}(")?;
                write_args(f, &args.iter().collect::<Vec<_>>())?;
                write!(f, ")")?;
                write_type_suffix(f, *ty, intrinsics::default_call_type(name, args))
            }
            Expr::Let { name, value, body } => write!(f, "(let {name} = {value} in {body})"),
        }
    }
}

// ── Statements ───────────────────────────────────────────────────────────────

fn indent(f: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
    write!(f, "{:width$}", "", width = depth * 2)
}

fn write_body(f: &mut fmt::Formatter<'_>, s: &Stmt, depth: usize) -> fmt::Result {
    match s {
        Stmt::Block(stmts) => write_seq(f, stmts, depth),
        _ => write_stmt(f, s, depth),
    }
}

/// Statements in sequence. A `let` that is not last would swallow its
/// successors on re-parse, and a nested block would be flattened, so both
/// get their own braces.
fn write_seq(f: &mut fmt::Formatter<'_>, stmts: &[Stmt], depth: usize) -> fmt::Result {
    for (i, s) in stmts.iter().enumerate() {
        let last = i + 1 == stmts.len();
        let braced = matches!(s, Stmt::Block(_)) || (!last && matches!(s, Stmt::LetStmt { .. }));
        if braced {
            indent(f, depth)?;
            writeln!(f, "{{")?;
            write_body(f, s, depth + 1)?;
            indent(f, depth)?;
            writeln!(f, "}}")?;
        } else {
            write_stmt(f, s, depth)?;
        }
    }
    Ok(())
}

fn write_stmt(f: &mut fmt::Formatter<'_>, s: &Stmt, depth: usize) -> fmt::Result {
    match s {
        Stmt::Store { name, index, value } => {
            indent(f, depth)?;
            writeln!(f, "{name}[{index}] = {value}")
        }
        Stmt::For {
            name,
            min,
            extent,
            for_type,
            body,
            ..
        } => {
            indent(f, depth)?;
            if let Some(kw) = for_type.keyword() {
                write!(f, "{kw} ")?;
            }
            writeln!(f, "for ({name}, {min}, {extent}) {{")?;
            write_body(f, body, depth + 1)?;
            indent(f, depth)?;
            writeln!(f, "}}")
        }
        Stmt::IfThenElse {
            cond,
            then_case,
            else_case,
        } => {
            indent(f, depth)?;
            writeln!(f, "if ({cond}) {{")?;
            write_body(f, then_case, depth + 1)?;
            if let Some(e) = else_case {
                indent(f, depth)?;
                writeln!(f, "}} else {{")?;
                write_body(f, e, depth + 1)?;
            }
            indent(f, depth)?;
            writeln!(f, "}}")
        }
        Stmt::LetStmt { name, value, body } => {
            indent(f, depth)?;
            writeln!(f, "let {name} = {value}")?;
            write_body(f, body, depth)
        }
        Stmt::Evaluate(e) => {
            indent(f, depth)?;
            writeln!(f, "{e}")
        }
        Stmt::Block(stmts) => write_seq(f, stmts, depth),
    }
}

impl fmt::Display for Stmt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_stmt(f, self, 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn x() -> Expr {
        Expr::var("x")
    }

    #[test]
    fn arithmetic_parenthesizes_by_precedence() {
        let e = Expr::mul(Expr::add(x(), Expr::int(1)), Expr::int(2));
        assert_eq!(e.to_string(), "(x + 1) * 2");
        let e = Expr::sub(x(), Expr::sub(Expr::var("y"), Expr::int(1)));
        assert_eq!(e.to_string(), "x - (y - 1)");
        let e = Expr::sub(Expr::sub(x(), Expr::var("y")), Expr::int(1));
        assert_eq!(e.to_string(), "x - y - 1");
    }

    #[test]
    fn booleans_and_comparisons() {
        let e = Expr::or(
            Expr::and(Expr::lt(x(), Expr::int(0)), Expr::var_of(Type::bool(), "c")),
            Expr::not(Expr::ge(x(), Expr::int(-3))),
        );
        assert_eq!(e.to_string(), "x < 0 && c:bool || !(x >= -3)");
    }

    #[test]
    fn literals_carry_type_suffixes() {
        assert_eq!(Expr::int_of(Type::int(64), -5).to_string(), "-5i64");
        assert_eq!(Expr::uint_of(Type::uint(8), 3).to_string(), "3u8");
        assert_eq!(Expr::float(1.5).to_string(), "1.5f32");
        assert_eq!(Expr::const_false().to_string(), "false");
    }

    #[test]
    fn calls_annotate_unusual_types() {
        let v = Expr::var_of(Type::int(64), "v");
        let e = Expr::intrinsic(Type::int(64), intrinsics::LIKELY, vec![v]);
        assert_eq!(e.to_string(), "likely(v:i64)");
        let e = Expr::call(Type::float(32), "f", vec![x()], CallType::Extern);
        assert_eq!(e.to_string(), "f(x):f32");
    }

    #[test]
    fn loop_nest_layout() {
        let s = Stmt::for_loop(
            "i",
            Expr::int(0),
            Expr::int(100),
            Stmt::if_then(
                Expr::ge(Expr::var("i"), Expr::int(50)),
                Stmt::store("a", Expr::var("i"), Expr::int(1)),
            ),
        );
        assert_eq!(
            s.to_string(),
            "for (i, 0, 100) {\n  if (i >= 50) {\n    a[i] = 1\n  }\n}\n"
        );
    }

    #[test]
    fn non_final_let_is_braced() {
        let s = Stmt::Block(vec![
            Stmt::let_stmt("t", x(), Stmt::store("a", Expr::int(0), Expr::var("t"))),
            Stmt::store("b", Expr::int(0), x()),
        ]);
        assert_eq!(
            s.to_string(),
            "{\n  let t = x\n  a[0] = t\n}\nb[0] = x\n"
        );
    }
}
