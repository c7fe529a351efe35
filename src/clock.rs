//! Clock Seam
//!
//! The core never reads wall time directly; a clock is injected at network
//! construction. Production uses the host block time, tests use a manually
//! advanced clock.

use std::sync::atomic::{AtomicU32, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// Monotonic, non-decreasing seconds since the UNIX epoch.
pub trait Clock: Send + Sync {
    fn seconds(&self) -> u32;
}

/// Wall-clock implementation for hosts without an injected time source.
#[derive(Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn seconds(&self) -> u32 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs() as u32)
            .unwrap_or(0)
    }
}

/// Manually driven clock for deterministic tests.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicU32,
}

impl ManualClock {
    pub fn starting_at(seconds: u32) -> Self {
        ManualClock { now: AtomicU32::new(seconds) }
    }

    /// Moves the clock forward by `seconds`.
    pub fn advance(&self, seconds: u32) {
        self.now.fetch_add(seconds, Ordering::Relaxed);
    }

    /// Jumps the clock to an absolute timestamp.
    pub fn set(&self, seconds: u32) {
        self.now.store(seconds, Ordering::Relaxed);
    }
}

impl Clock for ManualClock {
    fn seconds(&self) -> u32 {
        self.now.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_clock_advances() {
        let clock = ManualClock::starting_at(100);
        assert_eq!(clock.seconds(), 100);
        clock.advance(50);
        assert_eq!(clock.seconds(), 150);
        clock.set(10);
        assert_eq!(clock.seconds(), 10);
    }
}
