//! Tokens of the text format.

use std::fmt;

use logos::{Lexer, Logos};

use crate::ir::Type;

#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\r\n]+")]
#[logos(skip r"//[^\n]*")]
pub enum Token {
    // ── Keywords ──
    #[token("for")]
    For,
    #[token("parallel")]
    Parallel,
    #[token("vectorized")]
    Vectorized,
    #[token("unrolled")]
    Unrolled,
    #[token("gpu_block")]
    GpuBlock,
    #[token("gpu_thread")]
    GpuThread,
    #[token("if")]
    If,
    #[token("else")]
    Else,
    #[token("let")]
    Let,
    #[token("in")]
    In,
    #[token("min")]
    Min,
    #[token("max")]
    Max,
    #[token("select")]
    Select,
    #[token("true")]
    True,
    #[token("false")]
    False,

    // ── Punctuation ──
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
    #[token(",")]
    Comma,
    #[token(";")]
    Semi,
    #[token(":")]
    Colon,
    #[token("=")]
    Assign,

    // ── Operators ──
    #[token("==")]
    EqEq,
    #[token("!=")]
    NotEq,
    #[token("<")]
    Lt,
    #[token("<=")]
    Le,
    #[token(">")]
    Gt,
    #[token(">=")]
    Ge,
    #[token("&&")]
    AndAnd,
    #[token("||")]
    OrOr,
    #[token("!")]
    Bang,
    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Star,
    #[token("/")]
    Slash,
    #[token("%")]
    Percent,

    // ── Literals and names ──
    /// Unsigned digits with an optional type suffix (`5`, `5i64`, `3u8`).
    #[regex(r"[0-9]+(i8|i16|i32|i64|u8|u16|u32|u64)?", int_literal)]
    Int((u64, Option<Type>)),

    /// `1.5`, `1e-7`, `1.5f64`, `2f32`. Unsuffixed floats are `f32`.
    #[regex(r"[0-9]+\.[0-9]+([eE][+-]?[0-9]+)?(f32|f64)?", float_literal)]
    #[regex(r"[0-9]+[eE][+-]?[0-9]+(f32|f64)?", float_literal)]
    #[regex(r"[0-9]+(f32|f64)", float_literal)]
    Float((f64, Type)),

    /// Names may contain `.` and `$`, which generated names use.
    #[regex(r"[A-Za-z_][A-Za-z0-9_.$]*", |lex| lex.slice().to_string())]
    Ident(String),
}

fn split_suffix(s: &str, is_body: impl Fn(char) -> bool) -> (&str, &str) {
    let at = s.find(|c: char| !is_body(c)).unwrap_or(s.len());
    s.split_at(at)
}

fn int_literal(lex: &mut Lexer<Token>) -> Option<(u64, Option<Type>)> {
    let (digits, suffix) = split_suffix(lex.slice(), |c| c.is_ascii_digit());
    let value = digits.parse::<u64>().ok()?;
    if suffix.is_empty() {
        Some((value, None))
    } else {
        Some((value, Some(Type::from_name(suffix)?)))
    }
}

fn float_literal(lex: &mut Lexer<Token>) -> Option<(f64, Type)> {
    let s = lex.slice();
    let (body, ty) = match s.strip_suffix("f64") {
        Some(body) => (body, Type::float(64)),
        None => (s.strip_suffix("f32").unwrap_or(s), Type::float(32)),
    };
    Some((body.parse::<f64>().ok()?, ty))
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Token::For => "for",
            Token::Parallel => "parallel",
            Token::Vectorized => "vectorized",
            Token::Unrolled => "unrolled",
            Token::GpuBlock => "gpu_block",
            Token::GpuThread => "gpu_thread",
            Token::If => "if",
            Token::Else => "else",
            Token::Let => "let",
            Token::In => "in",
            Token::Min => "min",
            Token::Max => "max",
            Token::Select => "select",
            Token::True => "true",
            Token::False => "false",
            Token::LParen => "(",
            Token::RParen => ")",
            Token::LBrace => "{",
            Token::RBrace => "}",
            Token::LBracket => "[",
            Token::RBracket => "]",
            Token::Comma => ",",
            Token::Semi => ";",
            Token::Colon => ":",
            Token::Assign => "=",
            Token::EqEq => "==",
            Token::NotEq => "!=",
            Token::Lt => "<",
            Token::Le => "<=",
            Token::Gt => ">",
            Token::Ge => ">=",
            Token::AndAnd => "&&",
            Token::OrOr => "||",
            Token::Bang => "!",
            Token::Plus => "+",
            Token::Minus => "-",
            Token::Star => "*",
            Token::Slash => "/",
            Token::Percent => "%",
            Token::Int((v, Some(ty))) => return write!(f, "{v}{ty}"),
            Token::Int((v, None)) => return write!(f, "{v}"),
            Token::Float((v, ty)) => return write!(f, "{v:?}{ty}"),
            Token::Ident(name) => return write!(f, "`{name}`"),
        };
        write!(f, "`{s}`")
    }
}
