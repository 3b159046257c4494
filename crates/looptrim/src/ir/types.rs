//! IR type definitions.
//!
//! These types represent a tree-shaped intermediate representation of loop
//! nests. Expressions produce typed values, statements produce effects.
//! Nodes are immutable values: passes build new trees rather than editing
//! old ones in place.

use std::fmt;

/// Scalar category of a [`Type`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TypeCode {
    Int,
    UInt,
    Float,
    Bool,
    /// Opaque pointer-like value. Cannot be compared by value.
    Handle,
}

/// A scalar or vector value type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Type {
    pub code: TypeCode,
    pub bits: u8,
    pub lanes: u16,
}

impl Type {
    pub const fn int(bits: u8) -> Self {
        Self {
            code: TypeCode::Int,
            bits,
            lanes: 1,
        }
    }

    pub const fn uint(bits: u8) -> Self {
        Self {
            code: TypeCode::UInt,
            bits,
            lanes: 1,
        }
    }

    pub const fn float(bits: u8) -> Self {
        Self {
            code: TypeCode::Float,
            bits,
            lanes: 1,
        }
    }

    pub const fn bool() -> Self {
        Self {
            code: TypeCode::Bool,
            bits: 1,
            lanes: 1,
        }
    }

    pub const fn handle() -> Self {
        Self {
            code: TypeCode::Handle,
            bits: 64,
            lanes: 1,
        }
    }

    pub const fn with_lanes(self, lanes: u16) -> Self {
        Self { lanes, ..self }
    }

    /// Signed integer (any width).
    pub fn is_int(&self) -> bool {
        self.code == TypeCode::Int
    }

    pub fn is_uint(&self) -> bool {
        self.code == TypeCode::UInt
    }

    pub fn is_float(&self) -> bool {
        self.code == TypeCode::Float
    }

    pub fn is_bool(&self) -> bool {
        self.code == TypeCode::Bool
    }

    pub fn is_handle(&self) -> bool {
        self.code == TypeCode::Handle
    }

    pub fn is_scalar(&self) -> bool {
        self.lanes == 1
    }

    pub fn bits(&self) -> u8 {
        self.bits
    }

    /// Scalar signed integers at least 32 bits wide.
    ///
    /// Arithmetic on these types is assumed never to overflow, which is what
    /// licenses the simplifier's linear rearrangements of sums and comparisons.
    pub fn is_no_overflow_int(&self) -> bool {
        self.is_int() && self.bits >= 32 && self.is_scalar()
    }
}

impl Type {
    /// Parses the names produced by `Display`: `i32`, `u8`, `f64`, `bool`,
    /// `handle`, optionally followed by `xN` for vectors.
    pub fn from_name(name: &str) -> Option<Self> {
        let (scalar, lanes) = match name.split_once('x') {
            Some((s, l)) => (s, l.parse::<u16>().ok().filter(|l| *l > 0)?),
            None => (name, 1),
        };
        let ty = match scalar {
            "bool" => Type::bool(),
            "handle" => Type::handle(),
            _ => {
                let bits: u8 = scalar.get(1..)?.parse().ok()?;
                if !matches!(bits, 8 | 16 | 32 | 64) {
                    return None;
                }
                match scalar.as_bytes()[0] {
                    b'i' => Type::int(bits),
                    b'u' => Type::uint(bits),
                    b'f' if bits >= 16 => Type::float(bits),
                    _ => return None,
                }
            }
        };
        Some(ty.with_lanes(lanes))
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.code {
            TypeCode::Int => write!(f, "i{}", self.bits)?,
            TypeCode::UInt => write!(f, "u{}", self.bits)?,
            TypeCode::Float => write!(f, "f{}", self.bits)?,
            TypeCode::Bool => write!(f, "bool")?,
            TypeCode::Handle => write!(f, "handle")?,
        }
        if self.lanes > 1 {
            write!(f, "x{}", self.lanes)?;
        }
        Ok(())
    }
}

/// Arithmetic binary operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    /// Euclidean division for integers; division by zero yields zero.
    Div,
    /// Euclidean remainder for integers; modulo zero yields zero.
    Mod,
    Min,
    Max,
}

impl BinOp {
    pub fn is_commutative(&self) -> bool {
        matches!(self, BinOp::Add | BinOp::Mul | BinOp::Min | BinOp::Max)
    }
}

/// Comparison operations. All comparisons produce `bool`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CmpOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl CmpOp {
    /// The comparison that holds exactly when `self` does not.
    pub fn negate(self) -> Self {
        match self {
            CmpOp::Eq => CmpOp::Ne,
            CmpOp::Ne => CmpOp::Eq,
            CmpOp::Lt => CmpOp::Ge,
            CmpOp::Le => CmpOp::Gt,
            CmpOp::Gt => CmpOp::Le,
            CmpOp::Ge => CmpOp::Lt,
        }
    }

    /// The comparison that holds for `(b, a)` exactly when `self` holds for `(a, b)`.
    pub fn flip(self) -> Self {
        match self {
            CmpOp::Eq => CmpOp::Eq,
            CmpOp::Ne => CmpOp::Ne,
            CmpOp::Lt => CmpOp::Gt,
            CmpOp::Le => CmpOp::Ge,
            CmpOp::Gt => CmpOp::Lt,
            CmpOp::Ge => CmpOp::Le,
        }
    }

    pub fn eval<T: PartialOrd>(self, a: T, b: T) -> bool {
        match self {
            CmpOp::Eq => a == b,
            CmpOp::Ne => a != b,
            CmpOp::Lt => a < b,
            CmpOp::Le => a <= b,
            CmpOp::Gt => a > b,
            CmpOp::Ge => a >= b,
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            CmpOp::Eq => "==",
            CmpOp::Ne => "!=",
            CmpOp::Lt => "<",
            CmpOp::Le => "<=",
            CmpOp::Gt => ">",
            CmpOp::Ge => ">=",
        }
    }
}

/// How a call is dispatched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CallType {
    /// Built-in operation understood by the compiler (see [`super::intrinsics`]).
    Intrinsic,
    /// Ordinary function call. Ordinary calls are pure functions of their
    /// arguments; observable effects only flow through stores and the
    /// effectful intrinsics.
    Extern,
}

/// An expression node.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Expr {
    /// Signed integer constant, already wrapped to the width of `ty`.
    IntImm { ty: Type, value: i64 },

    /// Unsigned integer constant, already wrapped to the width of `ty`.
    UIntImm { ty: Type, value: u64 },

    /// Floating point constant, stored as the bit pattern of an `f64`.
    FloatImm { ty: Type, bits: u64 },

    BoolImm(bool),

    Var { ty: Type, name: String },

    Binary {
        op: BinOp,
        a: Box<Expr>,
        b: Box<Expr>,
    },

    Cmp {
        op: CmpOp,
        a: Box<Expr>,
        b: Box<Expr>,
    },

    And(Box<Expr>, Box<Expr>),

    Or(Box<Expr>, Box<Expr>),

    Not(Box<Expr>),

    Select {
        cond: Box<Expr>,
        t: Box<Expr>,
        f: Box<Expr>,
    },

    /// Read of `name[index]`.
    Load {
        ty: Type,
        name: String,
        index: Box<Expr>,
    },

    Call {
        ty: Type,
        name: String,
        args: Vec<Expr>,
        call_type: CallType,
    },

    /// `name` is bound to `value` inside `body` only.
    Let {
        name: String,
        value: Box<Expr>,
        body: Box<Expr>,
    },
}

/// Scheduling of a for loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ForType {
    Serial,
    Parallel,
    Vectorized,
    Unrolled,
    GpuBlock,
    GpuThread,
}

impl ForType {
    pub fn is_gpu(&self) -> bool {
        matches!(self, ForType::GpuBlock | ForType::GpuThread)
    }

    /// Keyword that prefixes `for` in the text format, if any.
    pub fn keyword(&self) -> Option<&'static str> {
        match self {
            ForType::Serial => None,
            ForType::Parallel => Some("parallel"),
            ForType::Vectorized => Some("vectorized"),
            ForType::Unrolled => Some("unrolled"),
            ForType::GpuBlock => Some("gpu_block"),
            ForType::GpuThread => Some("gpu_thread"),
        }
    }

    /// Device a loop of this kind runs on when nothing else is specified.
    pub fn default_device(&self) -> DeviceApi {
        if self.is_gpu() {
            DeviceApi::Gpu
        } else {
            DeviceApi::Host
        }
    }
}

/// Device a loop body executes on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DeviceApi {
    Host,
    Gpu,
}

/// A statement node.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Stmt {
    /// `name[index] = value`
    Store {
        name: String,
        index: Expr,
        value: Expr,
    },

    /// Runs `body` for `name` in `[min, min + extent)`.
    For {
        name: String,
        min: Expr,
        extent: Expr,
        for_type: ForType,
        device_api: DeviceApi,
        body: Box<Stmt>,
    },

    IfThenElse {
        cond: Expr,
        then_case: Box<Stmt>,
        else_case: Option<Box<Stmt>>,
    },

    LetStmt {
        name: String,
        value: Expr,
        body: Box<Stmt>,
    },

    /// Evaluates an expression for its side effects only.
    Evaluate(Expr),

    /// Runs statements in order.
    Block(Vec<Stmt>),
}

impl fmt::Display for ForType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.keyword().unwrap_or("serial"))
    }
}
