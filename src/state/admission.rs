//! Bounded-capacity admission gate.
//!
//! A counted permit pool consulted once per inbound connection, strictly
//! before a session is constructed. The connection path that acquired a
//! permit is responsible for releasing it exactly once.

use std::sync::atomic::{AtomicUsize, Ordering};

/// Counted permit pool bounding concurrent sessions.
pub struct Admission {
    max: usize,
    available: AtomicUsize,
}

impl Admission {
    /// Create a pool with `max` permits available.
    pub fn new(max: usize) -> Self {
        Self {
            max,
            available: AtomicUsize::new(max),
        }
    }

    /// Atomically take one permit. Returns `false`, with no side effect,
    /// when the pool is exhausted.
    pub fn try_admit(&self) -> bool {
        self.available
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1))
            .is_ok()
    }

    /// Return one permit to the pool. Never exceeds the configured maximum.
    pub fn release(&self) {
        let _ = self
            .available
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| {
                if n < self.max {
                    Some(n + 1)
                } else {
                    None
                }
            });
    }

    /// Permits currently available.
    pub fn available(&self) -> usize {
        self.available.load(Ordering::Acquire)
    }
}
