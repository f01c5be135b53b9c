//! Identity-versioned staleness check.
//!
//! Ported from the original's `struct validity_check64`: a worker captures
//! a shared counter's value at submission time; when the result comes back,
//! the main thread compares the captured value against the counter's
//! *current* value. A mismatch means the thing the job was about (a Dir's
//! cache slot, a Preview's cache slot) was dropped or replaced while the
//! job was in flight, and the result must be discarded rather than applied.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

#[derive(Debug, Default)]
pub struct VersionCounter(AtomicU64);

impl VersionCounter {
    pub fn new() -> Self {
        Self(AtomicU64::new(0))
    }

    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Acquire)
    }

    /// Invalidate everything checked against this counter so far.
    pub fn bump(&self) -> u64 {
        self.0.fetch_add(1, Ordering::AcqRel) + 1
    }
}

/// A captured (counter, value) pair a worker carries along with its job and
/// hands back with the result.
#[derive(Debug, Clone)]
pub struct ValidityCheck {
    counter: Arc<VersionCounter>,
    captured: u64,
}

impl ValidityCheck {
    pub fn capture(counter: Arc<VersionCounter>) -> Self {
        let captured = counter.get();
        Self { counter, captured }
    }

    /// True if no one has bumped the counter since this check was captured.
    pub fn is_valid(&self) -> bool {
        self.counter.get() == self.captured
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_until_bumped() {
        let counter = Arc::new(VersionCounter::new());
        let check = ValidityCheck::capture(counter.clone());
        assert!(check.is_valid());
        counter.bump();
        assert!(!check.is_valid());
    }

    #[test]
    fn independent_captures_track_independently() {
        let counter = Arc::new(VersionCounter::new());
        let first = ValidityCheck::capture(counter.clone());
        counter.bump();
        let second = ValidityCheck::capture(counter.clone());
        assert!(!first.is_valid());
        assert!(second.is_valid());
    }
}
