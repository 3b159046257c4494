//! Constructors and queries for IR nodes.

use super::types::*;

// ── Integer helpers ──────────────────────────────────────────────────────────

/// Sign-extends the low `bits` bits of `value`.
pub fn wrap_int(bits: u8, value: i64) -> i64 {
    if bits >= 64 || bits == 0 {
        value
    } else {
        let shift = 64 - u32::from(bits);
        (value << shift) >> shift
    }
}

/// Keeps the low `bits` bits of `value`.
pub fn wrap_uint(bits: u8, value: u64) -> u64 {
    if bits >= 64 {
        value
    } else {
        value & ((1u64 << bits) - 1)
    }
}

/// Euclidean division; division by zero yields zero.
pub fn div_euclid_or_zero(a: i64, b: i64) -> i64 {
    if b == 0 {
        0
    } else {
        a.wrapping_div_euclid(b)
    }
}

/// Euclidean remainder; modulo zero yields zero.
pub fn mod_euclid_or_zero(a: i64, b: i64) -> i64 {
    if b == 0 {
        0
    } else {
        a.wrapping_rem_euclid(b)
    }
}

// ── Expressions ──────────────────────────────────────────────────────────────

impl Expr {
    /// 32-bit signed integer constant.
    pub fn int(value: i64) -> Self {
        Self::int_of(Type::int(32), value)
    }

    pub fn int_of(ty: Type, value: i64) -> Self {
        Expr::IntImm {
            ty,
            value: wrap_int(ty.bits, value),
        }
    }

    pub fn uint_of(ty: Type, value: u64) -> Self {
        Expr::UIntImm {
            ty,
            value: wrap_uint(ty.bits, value),
        }
    }

    /// 32-bit float constant.
    pub fn float(value: f64) -> Self {
        Self::float_of(Type::float(32), value)
    }

    pub fn float_of(ty: Type, value: f64) -> Self {
        let value = if ty.bits == 32 {
            value as f32 as f64
        } else {
            value
        };
        Expr::FloatImm {
            ty,
            bits: value.to_bits(),
        }
    }

    pub fn bool(value: bool) -> Self {
        Expr::BoolImm(value)
    }

    pub fn const_true() -> Self {
        Expr::BoolImm(true)
    }

    pub fn const_false() -> Self {
        Expr::BoolImm(false)
    }

    /// Constant of type `ty` holding `value`, converted to that type.
    pub fn make_const(ty: Type, value: i64) -> Self {
        match ty.code {
            TypeCode::Int | TypeCode::Handle => Self::int_of(ty, value),
            TypeCode::UInt => Self::uint_of(ty, value as u64),
            TypeCode::Float => Self::float_of(ty, value as f64),
            TypeCode::Bool => Self::bool(value != 0),
        }
    }

    pub fn make_one(ty: Type) -> Self {
        Self::make_const(ty, 1)
    }

    pub fn make_zero(ty: Type) -> Self {
        Self::make_const(ty, 0)
    }

    /// 32-bit signed integer variable.
    pub fn var(name: impl Into<String>) -> Self {
        Self::var_of(Type::int(32), name)
    }

    pub fn var_of(ty: Type, name: impl Into<String>) -> Self {
        Expr::Var {
            ty,
            name: name.into(),
        }
    }

    pub fn load(ty: Type, name: impl Into<String>, index: Expr) -> Self {
        Expr::Load {
            ty,
            name: name.into(),
            index: Box::new(index),
        }
    }

    pub fn call(ty: Type, name: impl Into<String>, args: Vec<Expr>, call_type: CallType) -> Self {
        Expr::Call {
            ty,
            name: name.into(),
            args,
            call_type,
        }
    }

    pub fn intrinsic(ty: Type, name: impl Into<String>, args: Vec<Expr>) -> Self {
        Self::call(ty, name, args, CallType::Intrinsic)
    }

    pub fn binary(op: BinOp, a: Expr, b: Expr) -> Self {
        Expr::Binary {
            op,
            a: Box::new(a),
            b: Box::new(b),
        }
    }

    pub fn add(a: Expr, b: Expr) -> Self {
        Self::binary(BinOp::Add, a, b)
    }

    pub fn sub(a: Expr, b: Expr) -> Self {
        Self::binary(BinOp::Sub, a, b)
    }

    pub fn mul(a: Expr, b: Expr) -> Self {
        Self::binary(BinOp::Mul, a, b)
    }

    pub fn div(a: Expr, b: Expr) -> Self {
        Self::binary(BinOp::Div, a, b)
    }

    pub fn modulo(a: Expr, b: Expr) -> Self {
        Self::binary(BinOp::Mod, a, b)
    }

    pub fn min(a: Expr, b: Expr) -> Self {
        Self::binary(BinOp::Min, a, b)
    }

    pub fn max(a: Expr, b: Expr) -> Self {
        Self::binary(BinOp::Max, a, b)
    }

    /// `max(min(a, hi), lo)`
    pub fn clamp(a: Expr, lo: Expr, hi: Expr) -> Self {
        Self::max(Self::min(a, hi), lo)
    }

    /// `self + k`, with `k` converted to the type of `self`.
    pub fn plus(self, k: i64) -> Self {
        let ty = self.ty();
        Self::add(self, Self::make_const(ty, k))
    }

    pub fn compare(op: CmpOp, a: Expr, b: Expr) -> Self {
        Expr::Cmp {
            op,
            a: Box::new(a),
            b: Box::new(b),
        }
    }

    pub fn eq(a: Expr, b: Expr) -> Self {
        Self::compare(CmpOp::Eq, a, b)
    }

    pub fn ne(a: Expr, b: Expr) -> Self {
        Self::compare(CmpOp::Ne, a, b)
    }

    pub fn lt(a: Expr, b: Expr) -> Self {
        Self::compare(CmpOp::Lt, a, b)
    }

    pub fn le(a: Expr, b: Expr) -> Self {
        Self::compare(CmpOp::Le, a, b)
    }

    pub fn gt(a: Expr, b: Expr) -> Self {
        Self::compare(CmpOp::Gt, a, b)
    }

    pub fn ge(a: Expr, b: Expr) -> Self {
        Self::compare(CmpOp::Ge, a, b)
    }

    pub fn and(a: Expr, b: Expr) -> Self {
        Expr::And(Box::new(a), Box::new(b))
    }

    pub fn or(a: Expr, b: Expr) -> Self {
        Expr::Or(Box::new(a), Box::new(b))
    }

    pub fn not(a: Expr) -> Self {
        Expr::Not(Box::new(a))
    }

    pub fn select(cond: Expr, t: Expr, f: Expr) -> Self {
        Expr::Select {
            cond: Box::new(cond),
            t: Box::new(t),
            f: Box::new(f),
        }
    }

    pub fn let_in(name: impl Into<String>, value: Expr, body: Expr) -> Self {
        Expr::Let {
            name: name.into(),
            value: Box::new(value),
            body: Box::new(body),
        }
    }

    /// Type of the value this expression produces.
    pub fn ty(&self) -> Type {
        match self {
            Expr::IntImm { ty, .. }
            | Expr::UIntImm { ty, .. }
            | Expr::FloatImm { ty, .. }
            | Expr::Var { ty, .. }
            | Expr::Load { ty, .. }
            | Expr::Call { ty, .. } => *ty,
            Expr::BoolImm(_) => Type::bool(),
            Expr::Binary { a, .. } => a.ty(),
            Expr::Cmp { a, .. } => Type::bool().with_lanes(a.ty().lanes),
            Expr::And(a, _) | Expr::Or(a, _) | Expr::Not(a) => a.ty(),
            Expr::Select { t, .. } => t.ty(),
            Expr::Let { body, .. } => body.ty(),
        }
    }

    pub fn is_const(&self) -> bool {
        matches!(
            self,
            Expr::IntImm { .. } | Expr::UIntImm { .. } | Expr::FloatImm { .. } | Expr::BoolImm(_)
        )
    }

    pub fn is_one(&self) -> bool {
        match self {
            Expr::IntImm { value, .. } => *value == 1,
            Expr::UIntImm { value, .. } => *value == 1,
            Expr::FloatImm { bits, .. } => f64::from_bits(*bits) == 1.0,
            Expr::BoolImm(b) => *b,
            _ => false,
        }
    }

    pub fn is_zero(&self) -> bool {
        match self {
            Expr::IntImm { value, .. } => *value == 0,
            Expr::UIntImm { value, .. } => *value == 0,
            Expr::FloatImm { bits, .. } => f64::from_bits(*bits) == 0.0,
            Expr::BoolImm(b) => !*b,
            _ => false,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Expr::IntImm { value, .. } => Some(*value),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Expr::BoolImm(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_var(&self) -> Option<&str> {
        match self {
            Expr::Var { name, .. } => Some(name),
            _ => None,
        }
    }

    /// Direct sub-expressions, in evaluation order.
    pub fn children(&self) -> Vec<&Expr> {
        match self {
            Expr::IntImm { .. }
            | Expr::UIntImm { .. }
            | Expr::FloatImm { .. }
            | Expr::BoolImm(_)
            | Expr::Var { .. } => vec![],
            Expr::Binary { a, b, .. } | Expr::Cmp { a, b, .. } => vec![a, b],
            Expr::And(a, b) | Expr::Or(a, b) => vec![a, b],
            Expr::Not(a) => vec![a],
            Expr::Select { cond, t, f } => vec![cond, t, f],
            Expr::Load { index, .. } => vec![index],
            Expr::Call { args, .. } => args.iter().collect(),
            Expr::Let { value, body, .. } => vec![value, body],
        }
    }

    /// Number of nodes in the tree.
    pub fn node_count(&self) -> usize {
        1 + self
            .children()
            .into_iter()
            .map(Expr::node_count)
            .sum::<usize>()
    }
}

// ── Statements ───────────────────────────────────────────────────────────────

impl Stmt {
    /// The canonical statement that does nothing: `Evaluate(0)`.
    pub fn no_op() -> Self {
        Stmt::Evaluate(Expr::int(0))
    }

    /// Evaluating a constant has no effect.
    pub fn is_no_op(&self) -> bool {
        matches!(self, Stmt::Evaluate(e) if e.is_const())
    }

    pub fn store(name: impl Into<String>, index: Expr, value: Expr) -> Self {
        Stmt::Store {
            name: name.into(),
            index,
            value,
        }
    }

    /// Serial host loop over `[min, min + extent)`.
    pub fn for_loop(name: impl Into<String>, min: Expr, extent: Expr, body: Stmt) -> Self {
        Self::for_kind(name, min, extent, ForType::Serial, body)
    }

    pub fn for_kind(
        name: impl Into<String>,
        min: Expr,
        extent: Expr,
        for_type: ForType,
        body: Stmt,
    ) -> Self {
        Stmt::For {
            name: name.into(),
            min,
            extent,
            for_type,
            device_api: for_type.default_device(),
            body: Box::new(body),
        }
    }

    pub fn if_then(cond: Expr, then_case: Stmt) -> Self {
        Stmt::IfThenElse {
            cond,
            then_case: Box::new(then_case),
            else_case: None,
        }
    }

    pub fn if_then_else(cond: Expr, then_case: Stmt, else_case: Stmt) -> Self {
        Stmt::IfThenElse {
            cond,
            then_case: Box::new(then_case),
            else_case: Some(Box::new(else_case)),
        }
    }

    pub fn let_stmt(name: impl Into<String>, value: Expr, body: Stmt) -> Self {
        Stmt::LetStmt {
            name: name.into(),
            value,
            body: Box::new(body),
        }
    }

    pub fn evaluate(expr: Expr) -> Self {
        Stmt::Evaluate(expr)
    }

    /// Sequences `stmts`; an empty sequence is a no-op and a single statement
    /// is returned as is.
    pub fn block(mut stmts: Vec<Stmt>) -> Self {
        match stmts.len() {
            0 => Self::no_op(),
            1 => stmts.remove(0),
            _ => Stmt::Block(stmts),
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────
