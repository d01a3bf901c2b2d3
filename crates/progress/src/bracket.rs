//! Wrapping opaque remote work with step transitions.

use crate::tracker::ProgressTracker;
use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// Run `work` as step `step_id`.
///
/// Progress is simulated over `duration` while the future runs. On `Ok` the
/// step is completed; on `Err` it is failed with the error's display text.
/// The future's result is returned unchanged.
pub async fn track<T, E, F>(
    tracker: &ProgressTracker,
    step_id: &str,
    duration: Duration,
    work: F,
) -> Result<T, E>
where
    F: Future<Output = Result<T, E>>,
    E: Display,
{
    if let Err(e) = tracker.simulate_progress_for(step_id, duration) {
        warn!(step = step_id, error = %e, "Simulation unavailable, tracking without it");
        tracker.start_step(step_id);
    }

    match work.await {
        Ok(value) => {
            tracker.complete_step(step_id);
            Ok(value)
        }
        Err(e) => {
            tracker.error_step(step_id, e.to_string());
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scriptflow_core::{StepDefinition, StepStatus};

    fn tracker() -> ProgressTracker {
        ProgressTracker::new(vec![
            StepDefinition::new("scrape", "Scraping"),
            StepDefinition::new("generate", "Generating"),
        ])
        .unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn test_track_success_completes_step() {
        let tracker = tracker();
        let result: Result<u32, String> = track(&tracker, "scrape", Duration::from_secs(2), async {
            tokio::time::sleep(Duration::from_millis(1200)).await;
            Ok(7)
        })
        .await;

        assert_eq!(result, Ok(7));
        let step = tracker.step("scrape").unwrap();
        assert_eq!(step.status, StepStatus::Completed);
        assert_eq!(step.progress, 100.0);
        assert!(!tracker.is_simulating());
    }

    #[tokio::test(start_paused = true)]
    async fn test_track_failure_errors_step() {
        let tracker = tracker();
        let result: Result<(), String> =
            track(&tracker, "generate", Duration::from_secs(2), async {
                Err("quota exceeded".to_string())
            })
            .await;

        assert!(result.is_err());
        assert_eq!(tracker.step("generate").unwrap().status, StepStatus::Error);
        assert_eq!(tracker.error().as_deref(), Some("quota exceeded"));
    }

    #[test]
    fn test_track_without_tokio_runtime_still_tracks() {
        let tracker = tracker();
        let result: Result<(), String> = futures::executor::block_on(track(
            &tracker,
            "scrape",
            Duration::from_secs(2),
            async { Ok(()) },
        ));

        assert!(result.is_ok());
        assert_eq!(tracker.step("scrape").unwrap().status, StepStatus::Completed);
    }
}
