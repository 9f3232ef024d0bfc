//! Global revision tracking
//!
//! Revisions are tick counts (100 ns units since 0001-01-01). The clock keeps
//! the highest accepted revision, the revision presented by the most recent
//! mutation attempt, and when that attempt happened, so hosts can tell when
//! the feed has gone quiet.

use chrono::{NaiveDate, TimeDelta};
use std::time::{Duration, Instant};

/// One consistent read of the clock
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VersionSnapshot {
    pub current: i64,
    pub last_requested: i64,
    pub elapsed_ms: u64,
}

impl VersionSnapshot {
    /// No mutation attempt for at least `window`
    pub fn is_quiet_for(&self, window: Duration) -> bool {
        u128::from(self.elapsed_ms) >= window.as_millis()
    }
}

#[derive(Debug, Clone)]
pub struct VersionClock {
    current: i64,
    last_requested: i64,
    last_request_at: Instant,
}

impl VersionClock {
    pub fn new() -> Self {
        Self {
            current: 0,
            last_requested: 0,
            last_request_at: Instant::now(),
        }
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }

    pub fn current(&self) -> i64 {
        self.current
    }

    /// Record a mutation attempt, accepted or not
    pub fn observe(&mut self, requested: i64) {
        self.last_requested = requested;
        self.last_request_at = Instant::now();
    }

    /// Raise the revision to `version` if higher. Returns whether it moved.
    pub fn advance(&mut self, version: i64) -> bool {
        if version <= self.current {
            return false;
        }
        self.current = version;
        true
    }

    pub fn snapshot(&self) -> VersionSnapshot {
        VersionSnapshot {
            current: self.current,
            last_requested: self.last_requested,
            elapsed_ms: saturating_millis(self.last_request_at.elapsed()),
        }
    }

    /// Render a tick revision as `yyyy-MM-dd HH:mm:ss.fff`
    pub fn time_text(version: i64) -> Option<String> {
        let epoch = NaiveDate::from_ymd_opt(1, 1, 1)?.and_hms_opt(0, 0, 0)?;
        let at = epoch.checked_add_signed(TimeDelta::microseconds(version / 10))?;
        Some(at.format("%Y-%m-%d %H:%M:%S%.3f").to_string())
    }
}

/// Whole milliseconds, pinned at `u64::MAX` for spans that do not fit
fn saturating_millis(elapsed: Duration) -> u64 {
    u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX)
}

impl Default for VersionClock {
    fn default() -> Self {
        Self::new()
    }
}
