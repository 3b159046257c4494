//! Names of the intrinsic calls the passes know about.

use super::types::{Expr, Type};

/// `trace_expr(func, event, ..., value, ...)`: emits a trace event and
/// returns argument [`TRACE_VALUE_ARG`].
pub const TRACE_EXPR: &str = "trace_expr";

/// Position of the traced value among the arguments of [`TRACE_EXPR`].
pub const TRACE_VALUE_ARG: usize = 4;

/// `return_second(a, b)`: evaluates `a`, returns `b`.
pub const RETURN_SECOND: &str = "return_second";

/// `likely(x)`: branch hint, returns `x`.
pub const LIKELY: &str = "likely";

/// Re-points a buffer at new storage.
pub const REWRITE_BUFFER: &str = "rewrite_buffer";

/// Writes through an image handle rather than a plain store.
pub const IMAGE_STORE: &str = "image_store";

/// Raw memory copy between buffers.
pub const COPY_MEMORY: &str = "copy_memory";

/// Intrinsics whose memory effects are opaque to the passes.
pub const EFFECTFUL: [&str; 3] = [REWRITE_BUFFER, IMAGE_STORE, COPY_MEMORY];

/// Intrinsics that pass one of their arguments through unchanged.
pub const PASS_THROUGH: [&str; 3] = [TRACE_EXPR, RETURN_SECOND, LIKELY];

pub fn is_effectful(name: &str) -> bool {
    EFFECTFUL.contains(&name)
}

pub fn is_known(name: &str) -> bool {
    is_effectful(name) || PASS_THROUGH.contains(&name)
}

/// Result type a call to `name` has when nothing else is known: the
/// pass-through intrinsics take the type of the argument they return,
/// everything else produces an `i32`.
pub fn default_call_type(name: &str, args: &[Expr]) -> Type {
    let passed = match name {
        TRACE_EXPR => args.get(TRACE_VALUE_ARG),
        RETURN_SECOND | LIKELY => args.last(),
        _ => None,
    };
    passed.map_or(Type::int(32), Expr::ty)
}
