//! Step model - one named unit of work in a pipeline.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lowest progress value a step can hold.
pub const MIN_PROGRESS: f64 = 0.0;

/// Highest progress value a step can hold.
pub const MAX_PROGRESS: f64 = 100.0;

/// Caller-supplied step definition. Immutable for the life of a tracker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepDefinition {
    /// Stable identity key, unique within a pipeline
    pub id: String,

    /// Display text, opaque to the engine
    pub label: String,
}

impl StepDefinition {
    /// Create a new step definition.
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
        }
    }
}

/// Step status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    /// Not started, or demoted because another step started
    #[default]
    Pending,
    /// Currently in flight
    Active,
    /// Finished successfully
    Completed,
    /// Failed
    Error,
}

impl StepStatus {
    /// Whether the status can only be left through a reset.
    pub fn is_terminal(&self) -> bool {
        matches!(self, StepStatus::Completed | StepStatus::Error)
    }

    /// Get string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            StepStatus::Pending => "pending",
            StepStatus::Active => "active",
            StepStatus::Completed => "completed",
            StepStatus::Error => "error",
        }
    }
}

impl fmt::Display for StepStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Engine-owned state for one step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressStep {
    /// Step id, copied from the definition
    pub id: String,

    /// Step label, copied from the definition
    pub label: String,

    /// Current status
    pub status: StepStatus,

    /// Progress in [0, 100]
    pub progress: f64,
}

impl ProgressStep {
    /// Fresh pending step for a definition.
    pub fn pending(definition: &StepDefinition) -> Self {
        Self {
            id: definition.id.clone(),
            label: definition.label.clone(),
            status: StepStatus::Pending,
            progress: MIN_PROGRESS,
        }
    }

    /// Set progress, clamped into [0, 100]. NaN is treated as 0.
    pub fn set_progress(&mut self, value: f64) {
        self.progress = clamp_progress(value);
    }
}

/// Clamp a raw progress value into [0, 100].
pub fn clamp_progress(value: f64) -> f64 {
    if value.is_nan() {
        return MIN_PROGRESS;
    }
    value.clamp(MIN_PROGRESS, MAX_PROGRESS)
}
