//! Wall-clock minute boundaries and the recording windows built on them.

use chrono::{DateTime, TimeDelta, Timelike, Utc};

/// Length of one recording window.
pub(crate) const SEGMENT_LENGTH: TimeDelta = TimeDelta::seconds(60);

/// Returns `now` truncated to the minute, plus one minute.
///
/// An instant that already sits exactly on a minute mark still waits for the
/// following one, so the wait is always in `(0, 60]` seconds.
pub fn next_minute_boundary(now: DateTime<Utc>) -> DateTime<Utc> {
    let into_minute = TimeDelta::seconds(i64::from(now.second()))
        + TimeDelta::nanoseconds(i64::from(now.nanosecond()));
    now - into_minute + SEGMENT_LENGTH
}

/// A half-open `[start, end)` recording window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SegmentWindow {
    /// Boundary at which recording begins.
    pub start: DateTime<Utc>,
    /// Boundary at which the segment is sealed.
    pub end: DateTime<Utc>,
}

impl SegmentWindow {
    /// Window of [`SEGMENT_LENGTH`] beginning at `start`.
    pub fn starting_at(start: DateTime<Utc>) -> Self {
        Self {
            start,
            end: start + SEGMENT_LENGTH,
        }
    }

    /// The window that begins exactly where this one ends.
    pub fn following(&self) -> Self {
        Self::starting_at(self.end)
    }

    /// Length of the window.
    pub fn duration(&self) -> TimeDelta {
        self.end - self.start
    }
}
