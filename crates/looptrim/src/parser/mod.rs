//! Parser for the text form of the IR.
//!
//! The grammar mirrors what `Display` prints for [`Stmt`] and [`Expr`]:
//!
//! ```text
//! stmt  := [kind] "for" "(" name "," expr "," expr ")" "{" stmts "}"
//!        | "if" "(" expr ")" "{" stmts "}" ["else" ("{" stmts "}" | if)]
//!        | "let" name "=" expr          (scopes over the rest of the list)
//!        | "{" stmts "}"
//!        | expr ["=" expr]              (store when the left side is a load)
//! expr  := or; precedence from loosest: || && comparisons + - * / % unary
//! ```
//!
//! Variables bound by `let` and `for` take the type of their value; free
//! variables are `i32` unless annotated with `:type`. An unsuffixed literal
//! next to an operand of another type takes that operand's type.

pub mod lexer;

use std::ops::Range;

use anyhow::{Context, Result};
use logos::Logos;

use crate::ir::{intrinsics, names, BinOp, CallType, CmpOp, Expr, ForType, Scope, Stmt, Type};
use lexer::Token;

/// Parses a sequence of statements.
pub fn parse_stmt(src: &str) -> Result<Stmt> {
    let mut p = Parser::new(src)?;
    let stmt = p.stmt_list()?;
    p.expect_end()?;
    Ok(stmt)
}

/// Parses a single expression.
pub fn parse_expr(src: &str) -> Result<Expr> {
    let mut p = Parser::new(src)?;
    let expr = p.expr()?;
    p.expect_end()?;
    Ok(expr)
}

struct Parser {
    tokens: Vec<(Token, Range<usize>)>,
    pos: usize,
    end: usize,
    /// Types of the variables bound by enclosing `let`s and loops.
    symbols: Scope<Type>,
}

impl Parser {
    fn new(src: &str) -> Result<Self> {
        let mut tokens = Vec::new();
        for (tok, span) in Token::lexer(src).spanned() {
            match tok {
                Ok(tok) => tokens.push((tok, span)),
                Err(()) => anyhow::bail!(
                    "unexpected input {:?} at byte {}",
                    &src[span.clone()],
                    span.start
                ),
            }
        }
        Ok(Self {
            tokens,
            pos: 0,
            end: src.len(),
            symbols: Scope::new(),
        })
    }

    // ── Token plumbing ──

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|(t, _)| t)
    }

    fn peek_at(&self, ahead: usize) -> Option<&Token> {
        self.tokens.get(self.pos + ahead).map(|(t, _)| t)
    }

    fn offset(&self) -> usize {
        self.tokens.get(self.pos).map_or(self.end, |(_, s)| s.start)
    }

    fn eat(&mut self, tok: &Token) -> bool {
        if self.peek() == Some(tok) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn unexpected(&self, wanted: &str) -> anyhow::Error {
        match self.peek() {
            Some(tok) => anyhow::anyhow!(
                "expected {wanted}, found {tok} at byte {}",
                self.offset()
            ),
            None => anyhow::anyhow!("expected {wanted}, found end of input"),
        }
    }

    fn expect(&mut self, tok: Token) -> Result<()> {
        if self.eat(&tok) {
            Ok(())
        } else {
            Err(self.unexpected(&tok.to_string()))
        }
    }

    fn expect_end(&self) -> Result<()> {
        match self.peek() {
            None => Ok(()),
            Some(_) => Err(self.unexpected("end of input")),
        }
    }

    fn ident(&mut self) -> Result<String> {
        match self.peek() {
            Some(Token::Ident(name)) => {
                let name = name.clone();
                self.pos += 1;
                names::reserve(&name);
                Ok(name)
            }
            _ => Err(self.unexpected("a name")),
        }
    }

    fn ty(&mut self) -> Result<Type> {
        let at = self.offset();
        let name = match self.peek() {
            Some(Token::Ident(name)) => name.clone(),
            _ => return Err(self.unexpected("a type")),
        };
        self.pos += 1;
        Type::from_name(&name).with_context(|| format!("unknown type `{name}` at byte {at}"))
    }

    // ── Statements ──

    fn stmt_list(&mut self) -> Result<Stmt> {
        let mut stmts = Vec::new();
        loop {
            while self.eat(&Token::Semi) {}
            match self.peek() {
                None | Some(Token::RBrace) => break,
                Some(Token::Let) => {
                    stmts.push(self.let_stmt()?);
                    break;
                }
                Some(_) => stmts.push(self.stmt()?),
            }
        }
        Ok(Stmt::block(stmts))
    }

    fn let_stmt(&mut self) -> Result<Stmt> {
        self.expect(Token::Let)?;
        let name = self.ident()?;
        self.expect(Token::Assign)?;
        let value = self.expr()?;
        self.symbols.push(name.clone(), value.ty());
        let body = self.stmt_list();
        self.symbols.pop(&name);
        Ok(Stmt::let_stmt(name, value, body?))
    }

    fn braced(&mut self) -> Result<Stmt> {
        self.expect(Token::LBrace)?;
        let body = self.stmt_list()?;
        self.expect(Token::RBrace)?;
        Ok(body)
    }

    fn stmt(&mut self) -> Result<Stmt> {
        let kind = match self.peek() {
            Some(Token::Parallel) => Some(ForType::Parallel),
            Some(Token::Vectorized) => Some(ForType::Vectorized),
            Some(Token::Unrolled) => Some(ForType::Unrolled),
            Some(Token::GpuBlock) => Some(ForType::GpuBlock),
            Some(Token::GpuThread) => Some(ForType::GpuThread),
            _ => None,
        };
        if let Some(kind) = kind {
            self.pos += 1;
            return self.for_loop(kind);
        }
        match self.peek() {
            Some(Token::For) => self.for_loop(ForType::Serial),
            Some(Token::If) => self.if_stmt(),
            Some(Token::LBrace) => self.braced(),
            _ => self.store_or_evaluate(),
        }
    }

    fn for_loop(&mut self, kind: ForType) -> Result<Stmt> {
        self.expect(Token::For)?;
        self.expect(Token::LParen)?;
        let name = self.ident()?;
        self.expect(Token::Comma)?;
        let min = self.expr()?;
        self.expect(Token::Comma)?;
        let extent = self.expr()?;
        self.expect(Token::RParen)?;
        let (min, extent) = unify(min, extent);
        self.symbols.push(name.clone(), min.ty());
        let body = self.braced();
        self.symbols.pop(&name);
        Ok(Stmt::for_kind(name, min, extent, kind, body?))
    }

    fn if_stmt(&mut self) -> Result<Stmt> {
        self.expect(Token::If)?;
        self.expect(Token::LParen)?;
        let cond = self.expr()?;
        self.expect(Token::RParen)?;
        let then_case = self.braced()?;
        if !self.eat(&Token::Else) {
            return Ok(Stmt::if_then(cond, then_case));
        }
        let else_case = if self.peek() == Some(&Token::If) {
            self.if_stmt()?
        } else {
            self.braced()?
        };
        Ok(Stmt::if_then_else(cond, then_case, else_case))
    }

    fn store_or_evaluate(&mut self) -> Result<Stmt> {
        let at = self.offset();
        let lhs = self.expr()?;
        if !self.eat(&Token::Assign) {
            return Ok(Stmt::evaluate(lhs));
        }
        let value = self.expr()?;
        match lhs {
            Expr::Load { ty, name, index } => {
                let value = if is_plain_literal(&value) && ty != Type::int(32) {
                    retype_literal(value, ty)
                } else {
                    value
                };
                Ok(Stmt::store(name, *index, value))
            }
            other => anyhow::bail!("cannot assign to `{other}` at byte {at}"),
        }
    }

    // ── Expressions ──

    fn expr(&mut self) -> Result<Expr> {
        let mut e = self.and_expr()?;
        while self.eat(&Token::OrOr) {
            e = Expr::or(e, self.and_expr()?);
        }
        Ok(e)
    }

    fn and_expr(&mut self) -> Result<Expr> {
        let mut e = self.cmp_expr()?;
        while self.eat(&Token::AndAnd) {
            e = Expr::and(e, self.cmp_expr()?);
        }
        Ok(e)
    }

    fn cmp_expr(&mut self) -> Result<Expr> {
        let a = self.add_expr()?;
        let op = match self.peek() {
            Some(Token::EqEq) => CmpOp::Eq,
            Some(Token::NotEq) => CmpOp::Ne,
            Some(Token::Lt) => CmpOp::Lt,
            Some(Token::Le) => CmpOp::Le,
            Some(Token::Gt) => CmpOp::Gt,
            Some(Token::Ge) => CmpOp::Ge,
            _ => return Ok(a),
        };
        self.pos += 1;
        let b = self.add_expr()?;
        let (a, b) = unify(a, b);
        Ok(Expr::compare(op, a, b))
    }

    fn add_expr(&mut self) -> Result<Expr> {
        let mut e = self.mul_expr()?;
        loop {
            let op = match self.peek() {
                Some(Token::Plus) => BinOp::Add,
                Some(Token::Minus) => BinOp::Sub,
                _ => return Ok(e),
            };
            self.pos += 1;
            let (a, b) = unify(e, self.mul_expr()?);
            e = Expr::binary(op, a, b);
        }
    }

    fn mul_expr(&mut self) -> Result<Expr> {
        let mut e = self.unary()?;
        loop {
            let op = match self.peek() {
                Some(Token::Star) => BinOp::Mul,
                Some(Token::Slash) => BinOp::Div,
                Some(Token::Percent) => BinOp::Mod,
                _ => return Ok(e),
            };
            self.pos += 1;
            let (a, b) = unify(e, self.unary()?);
            e = Expr::binary(op, a, b);
        }
    }

    fn unary(&mut self) -> Result<Expr> {
        if self.eat(&Token::Bang) {
            return Ok(Expr::not(self.unary()?));
        }
        if self.eat(&Token::Minus) {
            let e = self.unary()?;
            return Ok(match e {
                Expr::IntImm { ty, value } => Expr::int_of(ty, value.wrapping_neg()),
                Expr::UIntImm { ty, value } => Expr::uint_of(ty, value.wrapping_neg()),
                Expr::FloatImm { ty, bits } => Expr::float_of(ty, -f64::from_bits(bits)),
                other => Expr::sub(Expr::make_zero(other.ty()), other),
            });
        }
        self.postfix()
    }

    fn postfix(&mut self) -> Result<Expr> {
        let at = self.offset();
        let e = self.primary()?;
        if !self.eat(&Token::Colon) {
            return Ok(e);
        }
        let ty = self.ty()?;
        Ok(match e {
            Expr::Var { name, .. } => Expr::var_of(ty, name),
            Expr::Load { name, index, .. } => Expr::Load { ty, name, index },
            Expr::Call {
                name,
                args,
                call_type,
                ..
            } => Expr::call(ty, name, args, call_type),
            e @ (Expr::IntImm { .. } | Expr::UIntImm { .. } | Expr::FloatImm { .. }) => {
                retype_literal(e, ty)
            }
            other => anyhow::bail!("cannot annotate `{other}` with a type at byte {at}"),
        })
    }

    fn call_args(&mut self) -> Result<Vec<Expr>> {
        self.expect(Token::LParen)?;
        let mut args = Vec::new();
        if self.eat(&Token::RParen) {
            return Ok(args);
        }
        loop {
            args.push(self.expr()?);
            if self.eat(&Token::RParen) {
                return Ok(args);
            }
            self.expect(Token::Comma)?;
        }
    }

    fn fixed_args<const N: usize>(&mut self, what: &str) -> Result<[Expr; N]> {
        let at = self.offset();
        let args = self.call_args()?;
        let found = args.len();
        args.try_into()
            .map_err(|_| anyhow::anyhow!("`{what}` takes {N} arguments, found {found} at byte {at}"))
    }

    fn primary(&mut self) -> Result<Expr> {
        let Some(tok) = self.peek().cloned() else {
            return Err(self.unexpected("an expression"));
        };
        match tok {
            Token::Int((value, ty)) => {
                self.pos += 1;
                Ok(match ty {
                    Some(ty) if ty.is_uint() => Expr::uint_of(ty, value),
                    Some(ty) => Expr::int_of(ty, value as i64),
                    None => Expr::int(value as i64),
                })
            }
            Token::Float((value, ty)) => {
                self.pos += 1;
                Ok(Expr::float_of(ty, value))
            }
            Token::True | Token::False => {
                self.pos += 1;
                Ok(Expr::bool(tok == Token::True))
            }
            Token::LParen if self.peek_at(1) == Some(&Token::Let) => {
                self.pos += 2;
                let name = self.ident()?;
                self.expect(Token::Assign)?;
                let value = self.expr()?;
                self.expect(Token::In)?;
                self.symbols.push(name.clone(), value.ty());
                let body = self.expr();
                self.symbols.pop(&name);
                let body = body?;
                self.expect(Token::RParen)?;
                Ok(Expr::let_in(name, value, body))
            }
            Token::LParen => {
                self.pos += 1;
                let e = self.expr()?;
                self.expect(Token::RParen)?;
                Ok(e)
            }
            Token::Min | Token::Max => {
                self.pos += 1;
                let op = if tok == Token::Min { BinOp::Min } else { BinOp::Max };
                let [a, b] = self.fixed_args(if op == BinOp::Min { "min" } else { "max" })?;
                let (a, b) = unify(a, b);
                Ok(Expr::binary(op, a, b))
            }
            Token::Select => {
                self.pos += 1;
                let [cond, t, f] = self.fixed_args("select")?;
                let (t, f) = unify(t, f);
                Ok(Expr::select(cond, t, f))
            }
            Token::Ident(_) => {
                let name = self.ident()?;
                match self.peek() {
                    Some(Token::LParen) => {
                        let args = self.call_args()?;
                        let ty = intrinsics::default_call_type(&name, &args);
                        let call_type = if intrinsics::is_known(&name) {
                            CallType::Intrinsic
                        } else {
                            CallType::Extern
                        };
                        Ok(Expr::call(ty, name, args, call_type))
                    }
                    Some(Token::LBracket) => {
                        self.pos += 1;
                        let index = self.expr()?;
                        self.expect(Token::RBracket)?;
                        Ok(Expr::load(Type::int(32), name, index))
                    }
                    _ => {
                        let ty = self.symbols.get(&name).copied().unwrap_or(Type::int(32));
                        Ok(Expr::var_of(ty, name))
                    }
                }
            }
            _ => Err(self.unexpected("an expression")),
        }
    }
}

/// Whether `e` is a literal that was written without a type suffix.
fn is_plain_literal(e: &Expr) -> bool {
    match e {
        Expr::IntImm { ty, .. } => *ty == Type::int(32),
        Expr::FloatImm { ty, .. } => *ty == Type::float(32),
        _ => false,
    }
}

/// Converts a literal to `ty`; anything else is returned unchanged.
fn retype_literal(e: Expr, ty: Type) -> Expr {
    match e {
        Expr::IntImm { value, .. } if ty.is_uint() => Expr::uint_of(ty, value as u64),
        Expr::IntImm { value, .. } => Expr::make_const(ty, value),
        Expr::UIntImm { value, .. } if ty.is_uint() => Expr::uint_of(ty, value),
        Expr::UIntImm { value, .. } => Expr::make_const(ty, value as i64),
        Expr::FloatImm { bits, .. } if ty.is_float() => Expr::float_of(ty, f64::from_bits(bits)),
        Expr::FloatImm { bits, .. } => Expr::make_const(ty, f64::from_bits(bits) as i64),
        other => other,
    }
}

/// Gives an unsuffixed literal operand the type of the other operand.
fn unify(a: Expr, b: Expr) -> (Expr, Expr) {
    let (ta, tb) = (a.ty(), b.ty());
    if ta == tb || ta.is_bool() || tb.is_bool() {
        (a, b)
    } else if is_plain_literal(&a) && !is_plain_literal(&b) {
        (retype_literal(a, tb), b)
    } else if is_plain_literal(&b) && !is_plain_literal(&a) {
        (a, retype_literal(b, ta))
    } else {
        (a, b)
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────
