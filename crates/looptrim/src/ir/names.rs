//! Fresh name generation.
//!
//! Generated names have the form `base$N`. The counter is shared by the whole
//! process, so two calls never hand out the same name, even across threads.

use std::sync::atomic::{AtomicUsize, Ordering};

static COUNTER: AtomicUsize = AtomicUsize::new(0);

/// Returns a name derived from `base` that has never been returned before
/// and does not collide with any reserved name.
pub fn unique_name(base: &str) -> String {
    let n = COUNTER.fetch_add(1, Ordering::Relaxed);
    format!("{base}${n}")
}

/// Marks a name seen in the input so later calls to [`unique_name`] cannot
/// produce it.
pub fn reserve(name: &str) {
    if let Some(n) = name
        .rsplit_once('$')
        .and_then(|(_, suffix)| suffix.parse::<usize>().ok())
    {
        COUNTER.fetch_max(n.saturating_add(1), Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_are_distinct() {
        let a = unique_name("t");
        let b = unique_name("t");
        assert_ne!(a, b);
        assert!(a.starts_with("t$"));
    }

    #[test]
    fn reserved_suffix_is_skipped() {
        reserve("x$100000");
        let n: usize = unique_name("x")
            .rsplit_once('$')
            .and_then(|(_, s)| s.parse().ok())
            .unwrap();
        assert!(n > 100000);
    }
}
