//! Wall-clock timestamps used for latency accounting.
//!
//! Timing signals arrive from two independent sources: the gateway's own clock
//! (transcripts, content, tool events observed on the agent stream) and the tool
//! layer's log entries, which carry the time at which the tool itself finished.
//! Both are expressed as seconds since the UNIX epoch so they can be compared.

use serde::{Deserialize, Serialize};
use std::ops::Sub;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Seconds since the UNIX epoch.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(f64);

impl Timestamp {
    /// Current wall-clock time.
    pub fn now() -> Self {
        let secs = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs_f64();
        Self(secs)
    }

    pub const fn from_secs_f64(secs: f64) -> Self {
        Self(secs)
    }

    pub const fn as_secs_f64(self) -> f64 {
        self.0
    }

    /// Signed number of seconds from `earlier` to `self`.
    ///
    /// Negative when the clocks disagree; callers decide whether to clamp.
    pub fn secs_since(self, earlier: Timestamp) -> f64 {
        self.0 - earlier.0
    }

    /// Elapsed time from `earlier`, saturating at zero.
    pub fn duration_since(self, earlier: Timestamp) -> Duration {
        Duration::try_from_secs_f64(self.secs_since(earlier)).unwrap_or_default()
    }
}

impl Sub<Duration> for Timestamp {
    type Output = Timestamp;

    fn sub(self, rhs: Duration) -> Timestamp {
        Timestamp(self.0 - rhs.as_secs_f64())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_secs_since_is_signed() {
        let a = Timestamp::from_secs_f64(10.0);
        let b = Timestamp::from_secs_f64(12.5);
        assert_eq!(b.secs_since(a), 2.5);
        assert_eq!(a.secs_since(b), -2.5);
    }

    #[test]
    fn test_duration_since_saturates() {
        let a = Timestamp::from_secs_f64(10.0);
        let b = Timestamp::from_secs_f64(9.0);
        assert_eq!(b.duration_since(a), Duration::ZERO);
        assert_eq!(a.duration_since(b), Duration::from_secs(1));
    }

    #[test]
    fn test_subtract_duration() {
        let t = Timestamp::from_secs_f64(10.0) - Duration::from_millis(1500);
        assert_eq!(t.as_secs_f64(), 8.5);
    }

    #[test]
    fn test_serializes_as_plain_number() {
        let json = serde_json::to_string(&Timestamp::from_secs_f64(1.25)).unwrap();
        assert_eq!(json, "1.25");
        let parsed: Timestamp = serde_json::from_str("3.5").unwrap();
        assert_eq!(parsed, Timestamp::from_secs_f64(3.5));
    }

    #[test]
    fn test_now_is_after_epoch() {
        assert!(Timestamp::now().as_secs_f64() > 1_600_000_000.0);
    }
}
