//! End-to-end pipeline scenarios.

use scriptflow_progress::{
    ProgressTracker, StepDefinition, StepStatus, TrackerConfig, TrackerEvent,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

fn scrape_generate() -> Vec<StepDefinition> {
    vec![
        StepDefinition::new("scrape", "Scraping reference scripts"),
        StepDefinition::new("generate", "Generating viral script"),
    ]
}

#[tokio::test(start_paused = true)]
async fn test_scrape_then_generate_completes_once() {
    let completes = Arc::new(AtomicUsize::new(0));
    let errors = Arc::new(AtomicUsize::new(0));
    let c = completes.clone();
    let e = errors.clone();

    let tracker = ProgressTracker::builder(scrape_generate())
        .on_complete(move || {
            c.fetch_add(1, Ordering::SeqCst);
        })
        .on_error(move |_| {
            e.fetch_add(1, Ordering::SeqCst);
        })
        .build()
        .unwrap();

    tracker
        .simulate_progress_for("scrape", Duration::from_millis(2000))
        .unwrap();
    tokio::time::sleep(Duration::from_millis(2100)).await;

    let scrape = tracker.step("scrape").unwrap();
    assert_eq!(scrape.status, StepStatus::Active);
    assert!(scrape.progress < 90.0);

    tracker.complete_step("scrape");
    tracker.start_step("generate");
    assert_eq!(tracker.current_step_index(), 1);
    tracker.complete_step("generate");

    assert_eq!(tracker.overall_progress(), 100.0);
    assert!(tracker.is_complete());
    assert!(tracker.error().is_none());
    assert_eq!(completes.load(Ordering::SeqCst), 1);
    assert_eq!(errors.load(Ordering::SeqCst), 0);
}

#[tokio::test(start_paused = true)]
async fn test_failed_generation_surfaces_error() {
    let messages = Arc::new(Mutex::new(Vec::new()));
    let m = messages.clone();
    let tracker = ProgressTracker::builder(scrape_generate())
        .on_error(move |msg| m.lock().unwrap().push(msg.to_string()))
        .build()
        .unwrap();
    let mut rx = tracker.subscribe();

    tracker.simulate_progress_for("scrape", Duration::from_millis(1000)).unwrap();
    tokio::time::sleep(Duration::from_millis(300)).await;
    tracker.complete_step("scrape");

    tracker.simulate_progress("generate").unwrap();
    tokio::time::sleep(Duration::from_millis(1100)).await;
    tracker.error_step("generate", "boom");

    assert_eq!(tracker.error().as_deref(), Some("boom"));
    assert_eq!(*messages.lock().unwrap(), vec!["boom".to_string()]);
    assert!(!tracker.is_complete());
    assert!(!tracker.is_simulating());

    let mut saw_failure = false;
    while let Ok(event) = rx.try_recv() {
        assert_ne!(event, TrackerEvent::PipelineCompleted);
        if let TrackerEvent::StepFailed { step_id, message } = event {
            assert_eq!(step_id, "generate");
            assert_eq!(message, "boom");
            saw_failure = true;
        }
    }
    assert!(saw_failure);
}

#[tokio::test(start_paused = true)]
async fn test_reset_allows_rerun() {
    let completes = Arc::new(AtomicUsize::new(0));
    let c = completes.clone();
    let tracker = ProgressTracker::builder(scrape_generate())
        .on_complete(move || {
            c.fetch_add(1, Ordering::SeqCst);
        })
        .build()
        .unwrap();

    for _ in 0..2 {
        tracker.simulate_progress_for("scrape", Duration::from_millis(2000)).unwrap();
        tokio::time::sleep(Duration::from_millis(600)).await;
        tracker.complete_step("scrape");
        tracker.start_step("generate");
        tracker.update_step_progress("generate", 60.0);
        assert_eq!(tracker.overall_progress(), 80.0);
        tracker.complete_step("generate");
        assert!(tracker.is_complete());
        tracker.reset();
    }

    assert_eq!(completes.load(Ordering::SeqCst), 2);
    assert_eq!(tracker.overall_progress(), 0.0);
}

#[tokio::test(start_paused = true)]
async fn test_track_drives_full_pipeline() {
    let tracker = ProgressTracker::new(scrape_generate()).unwrap();

    let scripts: Result<Vec<String>, String> = scriptflow_progress::track(
        &tracker,
        "scrape",
        Duration::from_secs(5),
        async {
            tokio::time::sleep(Duration::from_secs(1)).await;
            Ok(vec!["transcript".to_string()])
        },
    )
    .await;
    assert_eq!(scripts.unwrap().len(), 1);
    assert_eq!(tracker.overall_progress(), 50.0);

    let script: Result<String, String> = scriptflow_progress::track(
        &tracker,
        "generate",
        Duration::from_secs(30),
        async { Ok("new script".to_string()) },
    )
    .await;
    assert!(script.is_ok());
    assert!(tracker.is_complete());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_subscribers_never_see_ticks_after_completion() {
    let config = TrackerConfig {
        tick_interval_ms: 1,
        default_duration_ms: 1_000,
        ..Default::default()
    };

    for _ in 0..50 {
        let tracker = ProgressTracker::builder(vec![StepDefinition::new("scrape", "Scraping")])
            .config(config.clone())
            .build()
            .unwrap();
        let mut rx = tracker.subscribe();

        tracker.simulate_progress("scrape").unwrap();
        tokio::time::sleep(Duration::from_millis(5)).await;
        tracker.complete_step("scrape");
        drop(tracker);

        let mut completed = false;
        while let Some(event) = rx.recv().await {
            match event {
                TrackerEvent::StepCompleted { .. } => completed = true,
                TrackerEvent::StepProgress { .. } => {
                    assert!(!completed, "tick delivered after completion")
                }
                _ => {}
            }
        }
        assert!(completed);
    }
}
