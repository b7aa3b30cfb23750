//! Submission state machine and progress events

use serde::Serialize;

/// Share of overall progress reserved for persisting the order
pub const PERSIST_SHARE: f64 = 20.0;

/// `Idle -> Validating -> Persisting -> Uploading(k/n) -> Done | DoneWithWarnings | Failed`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SubmitState {
    #[default]
    Idle,
    Validating,
    Persisting,
    Uploading { done: usize, total: usize },
    Done,
    DoneWithWarnings,
    Failed,
}

impl SubmitState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::DoneWithWarnings | Self::Failed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageStatus {
    Pending,
    Uploading,
    Success,
    Error,
}

/// Event stream produced while a submission runs
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SubmitEvent {
    State {
        state: SubmitState,
    },
    Image {
        item_index: usize,
        image_index: usize,
        file_name: String,
        status: ImageStatus,
        progress: u8,
    },
    Progress {
        percent: f64,
    },
}

/// Overall progress in percent.
///
/// The first 20% covers persisting; uploads share the remaining 80%, with
/// partial credit for the image in flight.
pub fn overall_progress(done: usize, total: usize, current: u8) -> f64 {
    if total == 0 {
        return 100.0;
    }
    let current = f64::from(current.min(100)) / 100.0;
    let share = (done as f64 + current) / total as f64;
    (PERSIST_SHARE + share * (100.0 - PERSIST_SHARE)).min(100.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_formula() {
        assert_eq!(overall_progress(0, 4, 0), 20.0);
        assert_eq!(overall_progress(2, 4, 0), 60.0);
        assert_eq!(overall_progress(1, 4, 50), 50.0);
        assert_eq!(overall_progress(4, 4, 0), 100.0);
        assert_eq!(overall_progress(0, 0, 0), 100.0);
    }

    #[test]
    fn test_terminal_states() {
        assert!(SubmitState::Done.is_terminal());
        assert!(SubmitState::Failed.is_terminal());
        assert!(!SubmitState::Uploading { done: 1, total: 2 }.is_terminal());
    }
}
