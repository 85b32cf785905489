//! Per-application availability state machine.

use crate::db::enums::AppStatus;

/// Consecutive failed probes after which an application is declared unavailable.
pub const FAILURE_THRESHOLD: i32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeOutcome {
    Reachable,
    Unreachable,
}

/// Result of applying one probe outcome to an application's state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub status: AppStatus,
    pub retry_count: i32,
    /// Set only on the probe where the counter first reaches the threshold.
    pub went_down: bool,
    pub recovered: bool,
}

pub fn next_state(status: AppStatus, retry_count: i32, outcome: ProbeOutcome) -> Transition {
    match outcome {
        ProbeOutcome::Reachable => Transition {
            status: AppStatus::Available,
            retry_count: 0,
            went_down: false,
            recovered: status == AppStatus::Unavailable,
        },
        ProbeOutcome::Unreachable => {
            let retry_count = retry_count.saturating_add(1);
            // Exact equality: failures past the threshold keep counting but never re-fire.
            let went_down = retry_count == FAILURE_THRESHOLD;
            Transition {
                status: if went_down { AppStatus::Unavailable } else { status },
                retry_count,
                went_down,
                recovered: false,
            }
        }
    }
}
