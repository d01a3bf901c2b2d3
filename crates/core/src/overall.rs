//! Derived pipeline-level state.

use crate::step::{ProgressStep, StepStatus};
use serde::{Deserialize, Serialize};

/// State derived from the step list after every mutation.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct OverallState {
    /// Arithmetic mean of all step progress values
    pub overall_progress: f64,

    /// True iff every step is completed
    pub is_complete: bool,
}

/// Recompute the derived state for a step list.
///
/// Progress is not status-weighted: a step at 100 that is still active
/// counts fully towards the mean. An empty list yields the zero state.
pub fn compute_overall_state(steps: &[ProgressStep]) -> OverallState {
    if steps.is_empty() {
        return OverallState::default();
    }

    let total: f64 = steps.iter().map(|s| s.progress).sum();
    OverallState {
        overall_progress: total / steps.len() as f64,
        is_complete: steps.iter().all(|s| s.status == StepStatus::Completed),
    }
}
