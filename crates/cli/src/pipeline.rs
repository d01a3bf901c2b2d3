//! Runs stages in order under one tracker.

use crate::stages::{Stage, StageError};
use scriptflow_core::TrackerEvent;
use scriptflow_progress::{track, ProgressTracker, TrackerObserver};
use serde_json::Value;
use tracing::{debug, error, info};

/// Run every stage in order, feeding each the previous output.
///
/// Stops at the first failing stage; its step is left in the error state.
pub async fn run_pipeline(
    tracker: &ProgressTracker,
    stages: &[Box<dyn Stage>],
    input: Value,
) -> Result<Value, StageError> {
    let mut payload = input;
    for stage in stages {
        payload = track(tracker, stage.step_id(), stage.estimate(), stage.run(payload)).await?;
    }
    Ok(payload)
}

/// Logs step transitions.
pub struct LogObserver;

impl TrackerObserver for LogObserver {
    fn on_event(&self, event: &TrackerEvent) {
        match event {
            TrackerEvent::StepStarted { step_id, index } => {
                info!(step = %step_id, index, "Started");
            }
            TrackerEvent::StepProgress { step_id, progress } => {
                debug!(step = %step_id, progress = *progress, "Progress");
            }
            TrackerEvent::StepCompleted { step_id } => info!(step = %step_id, "Completed"),
            TrackerEvent::StepFailed { step_id, message } => {
                error!(step = %step_id, error = %message, "Failed");
            }
            TrackerEvent::PipelineCompleted => info!("All steps completed"),
            TrackerEvent::Reset => debug!("Reset"),
        }
    }
}
