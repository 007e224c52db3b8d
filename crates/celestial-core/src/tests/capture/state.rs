use crate::{SchedulerState, SegmentWindow, tests::support::utc};

/// WHAT: Idle has no wake time and does not advance
/// WHY: A stopped scheduler must never fire timers
#[test]
fn given_idle_when_advancing_then_stays_idle() {
    // Given: Idle state
    let state = SchedulerState::Idle;

    // When: Advancing
    let (next, sealed) = state.advance();

    // Then: Still idle, nothing sealed, nothing scheduled
    assert!(state.next_wake().is_none());
    assert_eq!(next, SchedulerState::Idle);
    assert!(sealed.is_none());
}

/// WHAT: Arming waits for the boundary, then opens the first window
/// WHY: Recording begins exactly at the boundary with end = boundary + 1 minute
#[test]
fn given_armed_state_when_boundary_reached_then_first_window_opens() {
    // Given: Monitoring started at 12:00:30
    let armed = SchedulerState::armed_at(utc(2025, 3, 14, 12, 0, 30));
    assert_eq!(armed.next_wake(), Some(utc(2025, 3, 14, 12, 1, 0)));

    // When: The boundary is reached
    let (next, sealed) = armed.advance();

    // Then: Recording 12:01:00 - 12:02:00, nothing sealed yet
    assert_eq!(
        next,
        SchedulerState::Recording {
            window: SegmentWindow {
                start: utc(2025, 3, 14, 12, 1, 0),
                end: utc(2025, 3, 14, 12, 2, 0),
            }
        }
    );
    assert!(sealed.is_none());
    assert_eq!(next.next_wake(), Some(utc(2025, 3, 14, 12, 2, 0)));
}

/// WHAT: Window end seals the segment and opens the next window immediately
/// WHY: Recording continuity; the next window starts where the last ended
#[test]
fn given_recording_when_window_ends_then_sealed_and_next_window_opens() {
    // Given: Recording 12:01:00 - 12:02:00
    let window = SegmentWindow::starting_at(utc(2025, 3, 14, 12, 1, 0));
    let recording = SchedulerState::Recording { window };

    // When: The window end is reached
    let (next, sealed) = recording.advance();

    // Then: That window is sealed and recording continues 12:02:00 - 12:03:00
    assert_eq!(sealed, Some(window));
    assert!(next.is_recording());
    assert_eq!(next.next_wake(), Some(utc(2025, 3, 14, 12, 3, 0)));
}
