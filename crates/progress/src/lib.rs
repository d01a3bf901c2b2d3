//! Multi-step progress tracking.
//!
//! A [`ProgressTracker`] owns a fixed pipeline of steps, tracks each step's
//! status and progress, derives overall progress, simulates progress for
//! opaque long-running work, and signals completion or failure.

#![warn(missing_docs)]

pub mod bracket;
pub mod observer;
pub mod simulation;
pub mod tracker;

pub use bracket::track;
pub use observer::{Callbacks, TrackerObserver};
pub use tracker::{ProgressSnapshot, ProgressTracker, TrackerBuilder};

pub use scriptflow_core::{
    ProgressStep, StepDefinition, StepStatus, TrackerConfig, TrackerError, TrackerEvent,
    TrackerId,
};
