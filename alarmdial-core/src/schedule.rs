//! Wall-clock cadences for the recurring duties.

use embassy_time::{Duration, Instant};

/// Serving-cell status probe (`AT+CPSI?`), roughly every four weeks.
pub const STATUS_PROBE_PERIOD: Duration = Duration::from_secs(4 * 7 * 24 * 3600);
/// Network registration probe (`AT+CREG?`), every eight hours.
pub const REGISTRATION_PROBE_PERIOD: Duration = Duration::from_secs(8 * 3600);
/// Inbound SMS store cleanup (`AT+CMGD=0,4`), every 24 hours.
pub const STORE_CLEANUP_PERIOD: Duration = Duration::from_secs(24 * 3600);
/// Contact input scan.
pub const INPUT_SCAN_PERIOD: Duration = Duration::from_secs(1);
/// Reset-input debounce cadence and the cool-down between accepted presses.
pub const RESET_CHECK_PERIOD: Duration = Duration::from_secs(1);
pub const RESET_COOLDOWN: Duration = Duration::from_secs(10);

pub struct Cadence {
    period: Duration,
    last: Instant,
}

impl Cadence {
    pub fn new(period: Duration, now: Instant) -> Self {
        Self { period, last: now }
    }

    /// True once per period. Only call when the duty can actually run: the
    /// period restarts from the moment this returns true.
    pub fn due(&mut self, now: Instant) -> bool {
        if now - self.last >= self.period {
            self.last = now;
            true
        } else {
            false
        }
    }
}
