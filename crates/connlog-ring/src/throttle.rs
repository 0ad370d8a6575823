//! Fixed-Window Delivery Throttle
//!
//! Caps how many records leave the ring per one-second wall-clock window.
//! The window is fixed, not sliding: a burst at the end of one window and the
//! start of the next may deliver up to twice the limit within one second.

/// Default records delivered per window
pub const WLAN_RECORDS_PER_SEC: u32 = 20;

/// Window length (ms)
pub const WINDOW_MS: u64 = 1000;

/// Per-window delivery counter
#[derive(Debug, Clone)]
pub struct DeliveryThrottle {
    /// Records per window, 0 disables throttling
    limit: u32,
    /// Records admitted in the current window
    sent: u32,
    /// Window start (wall-clock ms)
    window_start_ms: u64,
}

impl DeliveryThrottle {
    /// Create a throttle admitting `limit` records per window
    pub fn new(limit: u32) -> Self {
        Self {
            limit,
            sent: 0,
            window_start_ms: 0,
        }
    }

    /// Throttle that admits everything
    pub fn unlimited() -> Self {
        Self::new(0)
    }

    /// Decide whether one more record may be delivered at `now_ms`
    pub fn admit(&mut self, now_ms: u64) -> bool {
        if self.limit == 0 {
            return true;
        }

        let delta = now_ms.saturating_sub(self.window_start_ms);

        if delta < WINDOW_MS && self.sent >= self.limit {
            return false;
        }

        if delta >= WINDOW_MS {
            self.sent = 0;
            self.window_start_ms = now_ms;
        }

        self.sent = (self.sent + 1).min(self.limit);
        true
    }

    /// Records admitted in the current window
    pub fn sent_in_window(&self) -> u32 {
        self.sent
    }

    /// Configured per-window limit
    pub fn limit(&self) -> u32 {
        self.limit
    }

    /// Check whether throttling is enabled
    pub fn is_enabled(&self) -> bool {
        self.limit > 0
    }
}

impl Default for DeliveryThrottle {
    fn default() -> Self {
        Self::new(WLAN_RECORDS_PER_SEC)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_limit_within_window() {
        let mut throttle = DeliveryThrottle::new(3);
        let start = 10_000;

        assert!(throttle.admit(start));
        assert!(throttle.admit(start + 10));
        assert!(throttle.admit(start + 20));
        assert!(!throttle.admit(start + 30));
        assert!(!throttle.admit(start + 999));
        assert_eq!(throttle.sent_in_window(), 3);
    }

    #[test]
    fn test_window_reset() {
        let mut throttle = DeliveryThrottle::new(2);
        assert!(throttle.admit(5_000));
        assert!(throttle.admit(5_000));
        assert!(!throttle.admit(5_500));

        // New window once more than a second has elapsed
        assert!(throttle.admit(6_001));
        assert_eq!(throttle.sent_in_window(), 1);
        assert!(throttle.admit(6_002));
        assert!(!throttle.admit(6_003));
    }

    #[test]
    fn test_exact_boundary_opens_new_window() {
        let mut throttle = DeliveryThrottle::new(3);
        for _ in 0..3 {
            assert!(throttle.admit(2_000));
        }
        assert!(!throttle.admit(2_999));

        // The boundary millisecond starts a window that is itself capped
        let admitted = (0..50).filter(|_| throttle.admit(3_000)).count();
        assert_eq!(admitted, 3);
        assert_eq!(throttle.sent_in_window(), 3);
        assert!(!throttle.admit(3_999));
        assert!(throttle.admit(4_000));
    }

    #[test]
    fn test_unlimited() {
        let mut throttle = DeliveryThrottle::unlimited();
        assert!(!throttle.is_enabled());
        for _ in 0..1_000 {
            assert!(throttle.admit(0));
        }
    }

    proptest! {
        // Within a single window nothing beyond the limit is admitted
        #[test]
        fn never_exceeds_limit_in_window(
            limit in 1u32..50,
            offsets in proptest::collection::vec(0u64..1000, 1..200),
        ) {
            let mut throttle = DeliveryThrottle::new(limit);
            let start = 100_000;
            // Open the window
            prop_assert!(throttle.admit(start));
            let mut admitted = 1u32;

            let mut offsets = offsets;
            offsets.sort_unstable();
            for offset in offsets {
                if throttle.admit(start + offset) {
                    admitted += 1;
                }
            }
            prop_assert!(admitted <= limit);
            prop_assert!(throttle.sent_in_window() <= limit);
        }
    }
}
