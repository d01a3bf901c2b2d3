//! Tracker events - what observers and subscribers receive.

use serde::{Deserialize, Serialize};

/// A transition observed by a tracker.
///
/// Events are produced inside the mutation that caused them and delivered
/// after the tracker has released its state, in mutation order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TrackerEvent {
    /// A step became active
    StepStarted {
        /// Step id
        step_id: String,
        /// Position in the pipeline
        index: usize,
    },

    /// A step's progress changed without a status change
    StepProgress {
        /// Step id
        step_id: String,
        /// New progress value
        progress: f64,
    },

    /// A step completed
    StepCompleted {
        /// Step id
        step_id: String,
    },

    /// A step failed
    StepFailed {
        /// Step id
        step_id: String,
        /// Error message recorded on the tracker
        message: String,
    },

    /// Every step is completed. Emitted once between resets.
    PipelineCompleted,

    /// The tracker was reset to its initial state
    Reset,
}

impl TrackerEvent {
    /// Step id the event refers to, if any.
    pub fn step_id(&self) -> Option<&str> {
        match self {
            TrackerEvent::StepStarted { step_id, .. }
            | TrackerEvent::StepProgress { step_id, .. }
            | TrackerEvent::StepCompleted { step_id }
            | TrackerEvent::StepFailed { step_id, .. } => Some(step_id.as_str()),
            TrackerEvent::PipelineCompleted | TrackerEvent::Reset => None,
        }
    }
}
