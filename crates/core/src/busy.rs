//! Shared busy-count context for loading indicators.
//!
//! A [`BusyCounter`] is handed to whoever owns in-flight work. Each unit
//! of work holds a [`BusyGuard`] for its duration; the indicator is on
//! while any guard is alive.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Cloneable counter of in-flight operations. Clones share the count.
#[derive(Debug, Clone, Default)]
pub struct BusyCounter {
    count: Arc<AtomicUsize>,
}

/// Decrements its counter when dropped.
#[derive(Debug)]
#[must_use = "the counter is decremented as soon as the guard is dropped"]
pub struct BusyGuard {
    count: Arc<AtomicUsize>,
}

impl BusyCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark one operation as started.
    pub fn enter(&self) -> BusyGuard {
        self.count.fetch_add(1, Ordering::SeqCst);
        BusyGuard {
            count: Arc::clone(&self.count),
        }
    }

    pub fn count(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }

    pub fn is_busy(&self) -> bool {
        self.count() > 0
    }
}

impl Drop for BusyGuard {
    fn drop(&mut self) {
        self.count.fetch_sub(1, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guards_nest_and_release() {
        let counter = BusyCounter::new();
        assert!(!counter.is_busy());

        let outer = counter.enter();
        let inner = counter.clone().enter();
        assert_eq!(counter.count(), 2);

        drop(inner);
        assert_eq!(counter.count(), 1);
        drop(outer);
        assert!(!counter.is_busy());
    }
}
