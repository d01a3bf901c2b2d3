//! scriptflow core data models.
//!
//! Step definitions, per-step progress state, derived pipeline state and the
//! events a tracker emits. No timing or I/O lives here.

#![warn(missing_docs)]

mod config;
mod error;
mod event;
mod id;
mod overall;
mod step;

pub use config::TrackerConfig;
pub use error::{Result, TrackerError};
pub use event::TrackerEvent;
pub use id::TrackerId;
pub use overall::{compute_overall_state, OverallState};
pub use step::{
    clamp_progress, ProgressStep, StepDefinition, StepStatus, MAX_PROGRESS, MIN_PROGRESS,
};

/// Timestamp type
pub type Time = chrono::DateTime<chrono::Utc>;
