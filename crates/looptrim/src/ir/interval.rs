//! Symbolic intervals and name scopes.

use std::collections::HashMap;

use super::types::Expr;

/// A closed range `[min, max]` of symbolic bounds. A missing bound means the
/// range is unbounded in that direction.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Interval {
    pub min: Option<Expr>,
    pub max: Option<Expr>,
}

impl Interval {
    pub fn new(min: Option<Expr>, max: Option<Expr>) -> Self {
        Self { min, max }
    }

    pub fn bounded(min: Expr, max: Expr) -> Self {
        Self::new(Some(min), Some(max))
    }

    pub fn everything() -> Self {
        Self::new(None, None)
    }

    pub fn single_point(e: Expr) -> Self {
        Self::new(Some(e.clone()), Some(e))
    }

    pub fn is_everything(&self) -> bool {
        self.min.is_none() && self.max.is_none()
    }

    /// Both bounds present and structurally identical.
    pub fn is_single_point(&self) -> bool {
        matches!((&self.min, &self.max), (Some(a), Some(b)) if a == b)
    }

    /// The range covered by both intervals.
    pub fn intersect(self, other: Interval) -> Interval {
        let min = match (self.min, other.min) {
            (Some(a), Some(b)) => Some(Expr::max(a, b)),
            (a, b) => a.or(b),
        };
        let max = match (self.max, other.max) {
            (Some(a), Some(b)) => Some(Expr::min(a, b)),
            (a, b) => a.or(b),
        };
        Interval { min, max }
    }

    /// A range covering both intervals.
    pub fn union(self, other: Interval) -> Interval {
        let min = match (self.min, other.min) {
            (Some(a), Some(b)) => Some(Expr::min(a, b)),
            _ => None,
        };
        let max = match (self.max, other.max) {
            (Some(a), Some(b)) => Some(Expr::max(a, b)),
            _ => None,
        };
        Interval { min, max }
    }

    pub fn map(self, mut f: impl FnMut(Expr) -> Expr) -> Interval {
        Interval {
            min: self.min.map(&mut f),
            max: self.max.map(&mut f),
        }
    }
}

/// Name bindings with shadowing: the most recent `push` of a name wins until
/// it is popped.
#[derive(Debug, Clone)]
pub struct Scope<T> {
    bindings: HashMap<String, Vec<T>>,
}

impl<T> Default for Scope<T> {
    fn default() -> Self {
        Self {
            bindings: HashMap::new(),
        }
    }
}

impl<T> Scope<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, name: impl Into<String>, value: T) {
        self.bindings.entry(name.into()).or_default().push(value);
    }

    pub fn pop(&mut self, name: &str) -> Option<T> {
        let stack = self.bindings.get_mut(name)?;
        let value = stack.pop();
        if stack.is_empty() {
            self.bindings.remove(name);
        }
        value
    }

    pub fn get(&self, name: &str) -> Option<&T> {
        self.bindings.get(name).and_then(|s| s.last())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.bindings.contains_key(name)
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}
