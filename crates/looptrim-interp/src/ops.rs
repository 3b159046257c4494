//! Arithmetic and comparison on runtime values.
//!
//! ## Integer width
//!
//! Signed integers of at least 32 bits are computed in 64 bits and never
//! truncated, matching the simplifier's assumption that they do not
//! overflow. Narrower signed integers and all unsigned integers wrap to
//! their width after every operation.
//!
//! ## Division
//!
//! Integer division and modulo are Euclidean: the remainder is never
//! negative. Dividing by zero yields zero rather than trapping.

use looptrim::ir::{div_euclid_or_zero, mod_euclid_or_zero, wrap_int, wrap_uint, BinOp, CmpOp, Type};

use crate::{EvalResult, EvalTrap, Value};

// ── Integers ─────────────────────────────────────────────────────────────────

/// Signed integer operation at width `bits`.
pub fn int_binary(op: BinOp, bits: u8, x: i64, y: i64) -> i64 {
    let v = match op {
        BinOp::Add => x.wrapping_add(y),
        BinOp::Sub => x.wrapping_sub(y),
        BinOp::Mul => x.wrapping_mul(y),
        BinOp::Div => div_euclid_or_zero(x, y),
        BinOp::Mod => mod_euclid_or_zero(x, y),
        BinOp::Min => x.min(y),
        BinOp::Max => x.max(y),
    };
    if bits < 32 {
        wrap_int(bits, v)
    } else {
        v
    }
}

/// Unsigned integer operation at width `bits`.
pub fn uint_binary(op: BinOp, bits: u8, x: u64, y: u64) -> u64 {
    let v = match op {
        BinOp::Add => x.wrapping_add(y),
        BinOp::Sub => x.wrapping_sub(y),
        BinOp::Mul => x.wrapping_mul(y),
        BinOp::Div => x.checked_div(y).unwrap_or(0),
        BinOp::Mod => x.checked_rem(y).unwrap_or(0),
        BinOp::Min => x.min(y),
        BinOp::Max => x.max(y),
    };
    wrap_uint(bits, v)
}

// ── Floats ───────────────────────────────────────────────────────────────────

fn float_binary(op: BinOp, bits: u8, x: f64, y: f64) -> f64 {
    let v = match op {
        BinOp::Add => x + y,
        BinOp::Sub => x - y,
        BinOp::Mul => x * y,
        BinOp::Div => x / y,
        BinOp::Mod => x.rem_euclid(y),
        BinOp::Min => x.min(y),
        BinOp::Max => x.max(y),
    };
    if bits <= 32 {
        v as f32 as f64
    } else {
        v
    }
}

// ── Dispatch ─────────────────────────────────────────────────────────────────

/// Applies `op` to two values of type `ty`.
pub fn binary(op: BinOp, ty: Type, a: Value, b: Value) -> EvalResult<Value> {
    match (a, b) {
        (Value::Int(x), Value::Int(y)) => Ok(Value::Int(int_binary(op, ty.bits, x, y))),
        (Value::UInt(x), Value::UInt(y)) => Ok(Value::UInt(uint_binary(op, ty.bits, x, y))),
        (Value::Float(x), Value::Float(y)) => Ok(Value::Float(float_binary(op, ty.bits, x, y))),
        _ => Err(EvalTrap::TypeMismatch),
    }
}

/// Compares two values of the same kind. Handles only support equality.
pub fn compare(op: CmpOp, a: Value, b: Value) -> EvalResult<bool> {
    match (a, b) {
        (Value::Int(x), Value::Int(y)) => Ok(op.eval(x, y)),
        (Value::UInt(x), Value::UInt(y)) => Ok(op.eval(x, y)),
        (Value::Float(x), Value::Float(y)) => Ok(op.eval(x, y)),
        (Value::Bool(x), Value::Bool(y)) => Ok(op.eval(x, y)),
        (Value::Handle(x), Value::Handle(y)) if matches!(op, CmpOp::Eq | CmpOp::Ne) => {
            Ok(op.eval(x, y))
        }
        _ => Err(EvalTrap::TypeMismatch),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wide_signed_ints_do_not_wrap() {
        let big = i64::from(i32::MAX);
        assert_eq!(int_binary(BinOp::Add, 32, big, 1), big + 1);
    }

    #[test]
    fn narrow_ints_wrap() {
        assert_eq!(int_binary(BinOp::Add, 8, 127, 1), -128);
        assert_eq!(uint_binary(BinOp::Sub, 8, 0, 1), 255);
    }

    #[test]
    fn division_is_euclidean_and_total() {
        assert_eq!(int_binary(BinOp::Div, 32, -7, 2), -4);
        assert_eq!(int_binary(BinOp::Mod, 32, -7, 2), 1);
        assert_eq!(int_binary(BinOp::Div, 32, 5, 0), 0);
        assert_eq!(uint_binary(BinOp::Mod, 16, 5, 0), 0);
    }

    #[test]
    fn mixed_kinds_trap() {
        let i32_ty = Type::int(32);
        assert_eq!(
            binary(BinOp::Add, i32_ty, Value::Int(1), Value::Float(1.0)),
            Err(EvalTrap::TypeMismatch)
        );
        assert_eq!(
            compare(CmpOp::Lt, Value::Handle(1), Value::Handle(2)),
            Err(EvalTrap::TypeMismatch)
        );
        assert_eq!(compare(CmpOp::Ne, Value::Handle(1), Value::Handle(2)), Ok(true));
    }

    #[test]
    fn f32_results_are_rounded() {
        let v = binary(BinOp::Div, Type::float(32), Value::Float(1.0), Value::Float(3.0));
        assert_eq!(v, Ok(Value::Float(f64::from(1.0f32 / 3.0))));
    }
}

// ── Kani proofs ──────────────────────────────────────────────────────────────

#[cfg(kani)]
mod proofs {
    use super::*;

    /// Proof: narrow signed results always fit their width.
    #[kani::proof]
    #[kani::unwind(1)]
    fn i8_results_stay_in_range() {
        let x = i64::from(kani::any::<i8>());
        let y = i64::from(kani::any::<i8>());
        let op = match kani::any::<u8>() % 7 {
            0 => BinOp::Add,
            1 => BinOp::Sub,
            2 => BinOp::Mul,
            3 => BinOp::Div,
            4 => BinOp::Mod,
            5 => BinOp::Min,
            _ => BinOp::Max,
        };
        let v = int_binary(op, 8, x, y);
        kani::assert(v >= -128 && v <= 127, "i8 result must fit in 8 bits");
    }

    /// Proof: unsigned results always fit their width.
    #[kani::proof]
    #[kani::unwind(1)]
    fn u16_results_stay_in_range() {
        let x = u64::from(kani::any::<u16>());
        let y = u64::from(kani::any::<u16>());
        let v = uint_binary(BinOp::Mul, 16, x, y);
        kani::assert(v <= u64::from(u16::MAX), "u16 result must fit in 16 bits");
    }

    /// Proof: the Euclidean remainder is never negative and never panics.
    #[kani::proof]
    #[kani::unwind(1)]
    fn remainder_is_non_negative() {
        let x: i64 = kani::any();
        let y: i64 = kani::any();
        let r = int_binary(BinOp::Mod, 64, x, y);
        kani::assert(r >= 0, "Euclidean remainder must be non-negative");
    }

    /// Proof: wrapping is the identity on values already in range.
    #[kani::proof]
    #[kani::unwind(1)]
    fn wrap_int_preserves_in_range_values() {
        let x = i64::from(kani::any::<i16>());
        kani::assert(wrap_int(16, x) == x, "in-range value must be unchanged");
    }
}
