//! Error types.

/// Result type for tracker operations.
pub type Result<T> = std::result::Result<T, TrackerError>;

/// Errors that can occur while building or driving a tracker.
///
/// Step mutations are total and never fail; only construction and timer
/// scheduling can.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TrackerError {
    /// The pipeline has no steps
    #[error("pipeline must contain at least one step")]
    NoSteps,

    /// A step id is empty
    #[error("step id must not be empty")]
    EmptyStepId,

    /// Two steps share an id
    #[error("duplicate step id: {0}")]
    DuplicateStepId(String),

    /// Simulation requested outside a tokio runtime
    #[error("no tokio runtime available to drive simulated progress")]
    NoRuntime,

    /// Configuration rejected
    #[error("invalid tracker config: {0}")]
    InvalidConfig(String),
}
