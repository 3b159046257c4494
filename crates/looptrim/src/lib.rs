//! looptrim: removal of no-op loop iterations.
//!
//! This crate provides a loop-nest IR with a small text format, the symbolic
//! analyses the pass relies on (simplification, bounds, solving), and the
//! trimming pass itself.

pub mod analysis;
pub mod ir;
pub mod optimizer;
pub mod parser;

// Re-export key types for convenience
pub use anyhow::{Context, Result};
pub use optimizer::{trim_no_ops, trim_no_ops_with};

/// Configuration options for trimming
#[derive(Debug, Clone)]
pub struct TrimOptions {
    /// Narrow loops that only do work on part of their range. When false,
    /// only loops that never do anything are removed.
    pub narrow_loops: bool,
    /// Also narrow GPU block and thread loops
    pub narrow_device_loops: bool,
    /// Simplify each narrowed loop after rewriting it
    pub final_simplify: bool,
}

impl Default for TrimOptions {
    fn default() -> Self {
        Self {
            narrow_loops: true,
            narrow_device_loops: false,
            final_simplify: true,
        }
    }
}

/// Trim a program given in the text format.
///
/// This is the main entry point for the command-line tool. It parses the
/// program, runs the pass and prints the result in the same format.
///
/// # Example
/// ```
/// use looptrim::{trim_source, TrimOptions};
///
/// let out = trim_source("for (i, 0, 8) { a[i] = a[i] }", &TrimOptions::default()).unwrap();
/// assert_eq!(out, "0\n");
/// ```
pub fn trim_source(src: &str, options: &TrimOptions) -> Result<String> {
    let program = parser::parse_stmt(src).context("failed to parse program")?;
    let trimmed = trim_no_ops_with(&program, options);
    Ok(trimmed.to_string())
}
