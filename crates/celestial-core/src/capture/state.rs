use crate::capture::{SegmentWindow, next_minute_boundary};

use chrono::{DateTime, Utc};

/// Capture scheduler state.
///
/// Each state carries the single wall-clock instant at which it next changes,
/// so the driver never accumulates drift across cycles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    /// Not monitoring. No camera held, nothing scheduled.
    Idle,
    /// Camera acquired, waiting for the first minute mark.
    AwaitingBoundary {
        /// Minute mark at which recording starts.
        boundary: DateTime<Utc>,
    },
    /// A segment is open.
    Recording {
        /// Window of the open segment.
        window: SegmentWindow,
    },
}

impl SchedulerState {
    /// State entered when monitoring starts at `now`.
    pub fn armed_at(now: DateTime<Utc>) -> Self {
        SchedulerState::AwaitingBoundary {
            boundary: next_minute_boundary(now),
        }
    }

    /// Instant at which [`advance`](Self::advance) should next be taken.
    pub fn next_wake(&self) -> Option<DateTime<Utc>> {
        match self {
            SchedulerState::Idle => None,
            SchedulerState::AwaitingBoundary { boundary } => Some(*boundary),
            SchedulerState::Recording { window } => Some(window.end),
        }
    }

    /// Transition taken at the wake time.
    ///
    /// Returns the new state and, when a segment closed, its window. Recording
    /// rolls straight into the following window.
    pub fn advance(self) -> (SchedulerState, Option<SegmentWindow>) {
        match self {
            SchedulerState::Idle => (SchedulerState::Idle, None),
            SchedulerState::AwaitingBoundary { boundary } => (
                SchedulerState::Recording {
                    window: SegmentWindow::starting_at(boundary),
                },
                None,
            ),
            SchedulerState::Recording { window } => (
                SchedulerState::Recording {
                    window: window.following(),
                },
                Some(window),
            ),
        }
    }

    /// Whether the scheduler is stopped.
    pub fn is_idle(&self) -> bool {
        matches!(self, SchedulerState::Idle)
    }

    /// Whether a segment is open.
    pub fn is_recording(&self) -> bool {
        matches!(self, SchedulerState::Recording { .. })
    }
}
