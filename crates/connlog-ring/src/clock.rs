//! Time Sources
//!
//! Records carry a wall-clock and a monotonic capture time, and the delivery
//! throttle runs off wall-clock milliseconds.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// Source of capture and throttle timestamps
pub trait Clock: Send + Sync {
    /// Wall-clock time in microseconds since the Unix epoch
    fn timestamp_us(&self) -> u64;

    /// Monotonic time in microseconds
    fn ktime_us(&self) -> u64;

    /// Wall-clock time in milliseconds
    fn now_ms(&self) -> u64 {
        self.timestamp_us() / 1000
    }
}

/// Clock backed by the system wall clock and a process-local monotonic origin
#[derive(Debug, Clone)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn timestamp_us(&self) -> u64 {
        chrono::Utc::now().timestamp_micros().max(0) as u64
    }

    fn ktime_us(&self) -> u64 {
        self.origin.elapsed().as_micros() as u64
    }
}

/// Manually driven clock for tests and trace replay
#[derive(Debug, Default)]
pub struct ManualClock {
    now_us: AtomicU64,
}

impl ManualClock {
    /// Create a clock reading `start_ms`
    pub fn starting_at_ms(start_ms: u64) -> Self {
        Self {
            now_us: AtomicU64::new(start_ms * 1000),
        }
    }

    /// Move the clock forward
    pub fn advance_ms(&self, ms: u64) {
        self.now_us.fetch_add(ms * 1000, Ordering::SeqCst);
    }

    /// Jump to an absolute time
    pub fn set_ms(&self, ms: u64) {
        self.now_us.store(ms * 1000, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn timestamp_us(&self) -> u64 {
        self.now_us.load(Ordering::SeqCst)
    }

    fn ktime_us(&self) -> u64 {
        self.now_us.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_clock() {
        let clock = ManualClock::starting_at_ms(5_000);
        assert_eq!(clock.now_ms(), 5_000);
        clock.advance_ms(250);
        assert_eq!(clock.now_ms(), 5_250);
        assert_eq!(clock.ktime_us(), 5_250_000);
        clock.set_ms(10);
        assert_eq!(clock.now_ms(), 10);
    }

    #[test]
    fn test_system_clock_is_monotonic() {
        let clock = SystemClock::new();
        let a = clock.ktime_us();
        let b = clock.ktime_us();
        assert!(b >= a);
        assert!(clock.timestamp_us() > 0);
    }
}
