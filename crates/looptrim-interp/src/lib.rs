//! `looptrim-interp`: reference interpreter for looptrim IR.
//!
//! Executes a statement against an environment of free variables and a
//! sparse memory, and records what an outside observer could see:
//! - the final contents of every buffer
//! - the ordered log of effectful intrinsic calls
//!
//! Two programs are equivalent when, from the same starting state, both
//! produce the same observations. The test suite uses this to check that
//! trimming never changes behavior.

use looptrim::ir::Type;

mod memory;
pub use memory::{Buffer, Fill, Memory};

pub mod ops;

mod eval;
pub use eval::{Effect, Interpreter};

/// Evaluation errors. Evaluation never panics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvalTrap {
    /// A variable was read outside of any binding.
    UnboundVariable,
    /// An operation received a value of the wrong kind.
    TypeMismatch,
    /// The loop iteration budget ran out.
    FuelExhausted,
    /// An intrinsic call with an unrecognized name.
    UnknownIntrinsic,
}

/// Result type for evaluation: `Result<T, EvalTrap>`.
pub type EvalResult<T> = Result<T, EvalTrap>;

/// A runtime value. Signed and unsigned integers are held in 64 bits and
/// kept wrapped to their type's width where the type requires it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value {
    Int(i64),
    UInt(u64),
    Float(f64),
    Bool(bool),
    Handle(u64),
}

impl Value {
    /// The zero value of `ty`.
    pub fn zero(ty: Type) -> Self {
        Self::from_raw(ty, 0)
    }

    /// Converts raw bits into a value of `ty`, wrapping to its width.
    pub fn from_raw(ty: Type, raw: u64) -> Self {
        use looptrim::ir::TypeCode;
        match ty.code {
            TypeCode::Int => Value::Int(looptrim::ir::wrap_int(ty.bits, raw as i64)),
            TypeCode::UInt => Value::UInt(looptrim::ir::wrap_uint(ty.bits, raw)),
            TypeCode::Float => Value::Float(raw as f64),
            TypeCode::Bool => Value::Bool(raw & 1 == 1),
            TypeCode::Handle => Value::Handle(raw),
        }
    }

    /// Integer payload, for indices and loop bounds.
    pub fn as_i64(self) -> EvalResult<i64> {
        match self {
            Value::Int(v) => Ok(v),
            Value::UInt(v) => Ok(v as i64),
            _ => Err(EvalTrap::TypeMismatch),
        }
    }

    pub fn as_bool(self) -> EvalResult<bool> {
        match self {
            Value::Bool(b) => Ok(b),
            _ => Err(EvalTrap::TypeMismatch),
        }
    }

    /// Bit pattern used to derive deterministic results of opaque calls.
    pub(crate) fn bits(self) -> u64 {
        match self {
            Value::Int(v) => v as u64,
            Value::UInt(v) | Value::Handle(v) => v,
            Value::Float(v) => v.to_bits(),
            Value::Bool(b) => u64::from(b),
        }
    }
}
