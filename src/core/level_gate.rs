//! Mutable severity threshold shared between routes

use super::level::Level;
use std::sync::atomic::{AtomicU8, Ordering};

const CLOSED: u8 = Level::Fatal as u8 + 1;

/// A severity threshold that can be changed while other threads log.
///
/// A record at level `L` passes a gate at threshold `T` iff `L >= T`.
/// The threshold lives in a single atomic, so `set_threshold` is visible to
/// every subsequent `passes` call on any thread without external locking.
///
/// # Example
///
/// ```
/// use rust_tee_logger::{Level, LevelGate};
///
/// let gate = LevelGate::new(Level::Info);
/// assert!(!gate.passes(Level::Debug));
/// gate.set_threshold(Level::Debug);
/// assert!(gate.passes(Level::Debug));
/// ```
#[derive(Debug)]
pub struct LevelGate {
    threshold: AtomicU8,
}

impl LevelGate {
    pub const fn new(threshold: Level) -> Self {
        Self {
            threshold: AtomicU8::new(threshold as u8),
        }
    }

    #[inline]
    pub fn passes(&self, level: Level) -> bool {
        level.to_u8() >= self.threshold.load(Ordering::Acquire)
    }

    pub fn set_threshold(&self, level: Level) {
        self.threshold.store(level.to_u8(), Ordering::Release);
    }

    /// Current threshold, or `None` while the gate is closed
    pub fn threshold(&self) -> Option<Level> {
        Level::from_u8(self.threshold.load(Ordering::Acquire))
    }

    /// Raise the threshold above `Fatal` so nothing passes.
    pub fn close(&self) {
        self.threshold.store(CLOSED, Ordering::Release);
    }

    pub fn is_closed(&self) -> bool {
        self.threshold.load(Ordering::Acquire) >= CLOSED
    }
}

impl Default for LevelGate {
    fn default() -> Self {
        Self::new(Level::Debug)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_passes_at_and_above_threshold() {
        let gate = LevelGate::new(Level::Warn);
        assert!(!gate.passes(Level::Debug));
        assert!(!gate.passes(Level::Info));
        assert!(gate.passes(Level::Warn));
        assert!(gate.passes(Level::Error));
        assert!(gate.passes(Level::Fatal));
    }

    #[test]
    fn test_nil_threshold_passes_everything() {
        let gate = LevelGate::new(Level::Nil);
        for level in Level::ALL {
            assert!(gate.passes(level));
        }
    }

    #[test]
    fn test_close_blocks_fatal() {
        let gate = LevelGate::new(Level::Debug);
        gate.close();
        assert!(gate.is_closed());
        assert_eq!(gate.threshold(), None);
        assert!(!gate.passes(Level::Fatal));

        gate.set_threshold(Level::Error);
        assert!(!gate.is_closed());
        assert!(gate.passes(Level::Fatal));
    }

    #[test]
    fn test_concurrent_updates_are_visible() {
        let gate = Arc::new(LevelGate::new(Level::Debug));

        let writer = {
            let gate = Arc::clone(&gate);
            thread::spawn(move || gate.set_threshold(Level::Error))
        };
        writer.join().unwrap();

        let reader = {
            let gate = Arc::clone(&gate);
            thread::spawn(move || (gate.passes(Level::Warn), gate.passes(Level::Error)))
        };
        assert_eq!(reader.join().unwrap(), (false, true));
    }
}
