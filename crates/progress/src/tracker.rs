//! Progress tracker - the step state machine.

use crate::observer::{Callbacks, Dispatcher, TrackerObserver};
use crate::simulation::{self, Simulation};
use chrono::Utc;
use scriptflow_core::{
    compute_overall_state, OverallState, ProgressStep, Result, StepDefinition, StepStatus, Time,
    TrackerConfig, TrackerError, TrackerEvent, TrackerId, MAX_PROGRESS, MIN_PROGRESS,
};
use serde::Serialize;
use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tracing::{debug, info, trace, warn};

/// A point-in-time copy of a tracker's state.
#[derive(Debug, Clone, Serialize)]
pub struct ProgressSnapshot {
    /// Tracker the snapshot was taken from
    pub tracker_id: TrackerId,

    /// When snapshot was taken
    pub timestamp: Time,

    /// Steps in pipeline order
    pub steps: Vec<ProgressStep>,

    /// Mean of all step progress values
    pub overall_progress: f64,

    /// Whether every step is completed
    pub is_complete: bool,

    /// Last recorded error message
    pub error: Option<String>,

    /// Index of the most recently started step
    pub current_step_index: usize,
}

/// Mutable tracker state. Only touched under the tracker's lock.
struct TrackerState {
    tracker_id: TrackerId,
    definitions: Vec<StepDefinition>,
    steps: Vec<ProgressStep>,
    overall: OverallState,
    current_step_index: usize,
    error: Option<String>,
    completion_signaled: bool,
    simulation: Option<Simulation>,
    next_generation: u64,
}

impl TrackerState {
    fn new(tracker_id: TrackerId, definitions: Vec<StepDefinition>) -> Self {
        let steps = definitions.iter().map(ProgressStep::pending).collect();
        Self {
            tracker_id,
            definitions,
            steps,
            overall: OverallState::default(),
            current_step_index: 0,
            error: None,
            completion_signaled: false,
            simulation: None,
            next_generation: 0,
        }
    }

    fn index_of(&self, step_id: &str) -> Option<usize> {
        let index = self.steps.iter().position(|s| s.id == step_id);
        if index.is_none() {
            debug!(tracker = %self.tracker_id, step = step_id, "Ignoring unknown step");
        }
        index
    }

    /// Drop the running simulation, if any. Aborts its timer.
    fn stop_simulation(&mut self) {
        if let Some(sim) = self.simulation.take() {
            trace!(tracker = %self.tracker_id, generation = sim.generation, "Stopping simulation");
        }
    }

    fn stop_simulation_for(&mut self, index: usize) {
        if self.simulation.as_ref().is_some_and(|s| s.step_index == index) {
            self.stop_simulation();
        }
    }

    fn start(&mut self, index: usize, events: &mut Vec<TrackerEvent>) -> bool {
        let status = self.steps[index].status;
        if status.is_terminal() {
            debug!(
                tracker = %self.tracker_id,
                step = %self.steps[index].id,
                %status,
                "Ignoring start of finished step"
            );
            return false;
        }

        // The demoted step, if simulated, is no longer in flight
        self.stop_simulation();

        for (i, step) in self.steps.iter_mut().enumerate() {
            if i != index && step.status == StepStatus::Active {
                step.status = StepStatus::Pending;
            }
        }

        let step = &mut self.steps[index];
        step.status = StepStatus::Active;
        step.progress = MIN_PROGRESS;
        self.current_step_index = index;

        debug!(tracker = %self.tracker_id, step = %step.id, index, "Step started");
        events.push(TrackerEvent::StepStarted {
            step_id: step.id.clone(),
            index,
        });
        true
    }

    fn update(&mut self, index: usize, value: f64, events: &mut Vec<TrackerEvent>) {
        let step = &mut self.steps[index];
        if step.status.is_terminal() {
            return;
        }

        let before = step.progress;
        step.set_progress(value);
        if step.progress != before {
            events.push(TrackerEvent::StepProgress {
                step_id: step.id.clone(),
                progress: step.progress,
            });
        }
    }

    fn complete(&mut self, index: usize, events: &mut Vec<TrackerEvent>) {
        let status = self.steps[index].status;
        if status.is_terminal() {
            debug!(
                tracker = %self.tracker_id,
                step = %self.steps[index].id,
                %status,
                "Ignoring completion of finished step"
            );
            return;
        }

        self.stop_simulation();

        let step = &mut self.steps[index];
        step.status = StepStatus::Completed;
        step.progress = MAX_PROGRESS;

        debug!(tracker = %self.tracker_id, step = %step.id, "Step completed");
        events.push(TrackerEvent::StepCompleted {
            step_id: step.id.clone(),
        });
    }

    fn fail(&mut self, index: usize, message: String, events: &mut Vec<TrackerEvent>) {
        // A failed step may fail again; a completed one stays completed
        if self.steps[index].status == StepStatus::Completed {
            debug!(
                tracker = %self.tracker_id,
                step = %self.steps[index].id,
                error = %message,
                "Ignoring failure of completed step"
            );
            return;
        }

        self.stop_simulation_for(index);

        let step = &mut self.steps[index];
        step.status = StepStatus::Error;
        warn!(tracker = %self.tracker_id, step = %step.id, error = %message, "Step failed");

        events.push(TrackerEvent::StepFailed {
            step_id: step.id.clone(),
            message: message.clone(),
        });
        self.error = Some(message);
    }

    fn reset(&mut self, events: &mut Vec<TrackerEvent>) {
        self.stop_simulation();
        self.steps = self.definitions.iter().map(ProgressStep::pending).collect();
        self.overall = OverallState::default();
        self.current_step_index = 0;
        self.error = None;
        self.completion_signaled = false;

        debug!(tracker = %self.tracker_id, "Tracker reset");
        events.push(TrackerEvent::Reset);
    }

    /// Recompute derived state; signal completion on the first flip.
    fn recompute(&mut self, events: &mut Vec<TrackerEvent>) {
        self.overall = compute_overall_state(&self.steps);
        if self.overall.is_complete && !self.completion_signaled {
            self.completion_signaled = true;
            info!(tracker = %self.tracker_id, steps = self.steps.len(), "Pipeline completed");
            events.push(TrackerEvent::PipelineCompleted);
        }
    }

    fn next_generation(&mut self) -> u64 {
        self.next_generation += 1;
        self.next_generation
    }
}

/// State shared between the tracker and its simulation timer.
struct Shared {
    state: Mutex<TrackerState>,
    dispatcher: Dispatcher,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, TrackerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Apply one simulation tick. Returns false once the timer is stale.
    fn apply_tick(&self, generation: u64) -> bool {
        let events = {
            let mut state = self.lock();
            let Some(sim) = state.simulation.as_ref().filter(|s| s.generation == generation) else {
                return false;
            };
            let (index, increment, cap) = (sim.step_index, sim.increment, sim.cap);

            let step = &mut state.steps[index];
            if step.status != StepStatus::Active {
                return false;
            }

            let next = simulation::next_progress(step.progress, increment, cap);
            if next <= step.progress {
                return true;
            }
            step.progress = next;
            let mut events = vec![TrackerEvent::StepProgress {
                step_id: step.id.clone(),
                progress: next,
            }];
            trace!(tracker = %state.tracker_id, index, progress = next, "Simulation tick");

            state.recompute(&mut events);
            self.dispatcher.publish(&events);
            events
        };

        self.dispatcher.notify(&events);
        true
    }
}

/// Builder for [`ProgressTracker`].
pub struct TrackerBuilder {
    steps: Vec<StepDefinition>,
    config: TrackerConfig,
    callbacks: Callbacks,
    observers: Vec<Arc<dyn TrackerObserver>>,
}

impl TrackerBuilder {
    /// Use a custom configuration.
    pub fn config(mut self, config: TrackerConfig) -> Self {
        self.config = config;
        self
    }

    /// Called once when every step is completed.
    pub fn on_complete(mut self, f: impl Fn() + Send + Sync + 'static) -> Self {
        self.callbacks = self.callbacks.on_complete(f);
        self
    }

    /// Called on every step error with its message.
    pub fn on_error(mut self, f: impl Fn(&str) + Send + Sync + 'static) -> Self {
        self.callbacks = self.callbacks.on_error(f);
        self
    }

    /// Register an observer receiving every event.
    pub fn observer(mut self, observer: Arc<dyn TrackerObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    /// Validate the step list and configuration and build the tracker.
    pub fn build(self) -> Result<ProgressTracker> {
        validate_steps(&self.steps)?;
        self.config.validate()?;

        let mut observers = self.observers;
        if !self.callbacks.is_empty() {
            observers.push(Arc::new(self.callbacks));
        }

        let id = TrackerId::new();
        debug!(tracker = %id, steps = self.steps.len(), "Tracker created");

        Ok(ProgressTracker {
            id,
            config: self.config,
            shared: Arc::new(Shared {
                state: Mutex::new(TrackerState::new(id, self.steps)),
                dispatcher: Dispatcher::new(observers),
            }),
        })
    }
}

fn validate_steps(steps: &[StepDefinition]) -> Result<()> {
    if steps.is_empty() {
        return Err(TrackerError::NoSteps);
    }

    let mut seen = HashSet::new();
    for step in steps {
        if step.id.is_empty() {
            return Err(TrackerError::EmptyStepId);
        }
        if !seen.insert(step.id.as_str()) {
            return Err(TrackerError::DuplicateStepId(step.id.clone()));
        }
    }
    Ok(())
}

/// Tracks status and progress of a fixed, ordered pipeline of steps.
///
/// All operations take `&self` and apply synchronously. Unknown step ids are
/// ignored. Events produced by an operation are queued to subscribers in
/// state-change order, then delivered to observers once the operation has
/// released the tracker state.
///
/// Dropping the tracker stops any running simulation.
pub struct ProgressTracker {
    id: TrackerId,
    config: TrackerConfig,
    shared: Arc<Shared>,
}

impl ProgressTracker {
    /// Create a tracker with default configuration and no callbacks.
    pub fn new(steps: Vec<StepDefinition>) -> Result<Self> {
        Self::builder(steps).build()
    }

    /// Start building a tracker for the given steps.
    pub fn builder(steps: Vec<StepDefinition>) -> TrackerBuilder {
        TrackerBuilder {
            steps,
            config: TrackerConfig::default(),
            callbacks: Callbacks::new(),
            observers: Vec::new(),
        }
    }

    /// Tracker instance id.
    pub fn id(&self) -> TrackerId {
        self.id
    }

    /// Configuration in use.
    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    /// Receive every event emitted from now on.
    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<TrackerEvent> {
        self.shared.dispatcher.subscribe()
    }

    fn mutate<F>(&self, f: F)
    where
        F: FnOnce(&mut TrackerState, &mut Vec<TrackerEvent>),
    {
        let events = {
            let mut state = self.shared.lock();
            let mut events = Vec::new();
            f(&mut state, &mut events);
            if !events.is_empty() {
                state.recompute(&mut events);
            }
            self.shared.dispatcher.publish(&events);
            events
        };
        self.shared.dispatcher.notify(&events);
    }

    /// Mark a step active with progress 0, demoting any other active step
    /// to pending. Ignored for completed or failed steps.
    pub fn start_step(&self, step_id: &str) {
        self.mutate(|state, events| {
            if let Some(index) = state.index_of(step_id) {
                state.start(index, events);
            }
        });
    }

    /// Set a step's progress, clamped into [0, 100]. Status is unchanged.
    pub fn update_step_progress(&self, step_id: &str, value: f64) {
        self.mutate(|state, events| {
            if let Some(index) = state.index_of(step_id) {
                state.update(index, value, events);
            }
        });
    }

    /// Mark a step completed at 100. Stops any running simulation.
    /// Ignored for completed or failed steps.
    pub fn complete_step(&self, step_id: &str) {
        self.mutate(|state, events| {
            if let Some(index) = state.index_of(step_id) {
                state.complete(index, events);
            }
        });
    }

    /// Mark a step failed and record `message` as the tracker error.
    ///
    /// Every call notifies `on_error`, including repeated failures of the
    /// same step. Ignored for completed steps.
    pub fn error_step(&self, step_id: &str, message: impl Into<String>) {
        let message = message.into();
        self.mutate(|state, events| {
            if let Some(index) = state.index_of(step_id) {
                state.fail(index, message, events);
            }
        });
    }

    /// Restore every step to pending/0 and clear error and completion.
    pub fn reset(&self) {
        self.mutate(|state, events| state.reset(events));
    }

    /// Start a step and simulate progress over the default duration.
    pub fn simulate_progress(&self, step_id: &str) -> Result<()> {
        self.simulate_progress_for(step_id, self.config.default_duration())
    }

    /// Start a step and advance its progress on a timer, approaching but
    /// never reaching the simulation cap.
    ///
    /// Replaces any running simulation. Unknown ids and finished steps are
    /// ignored. Fails only when called outside a tokio runtime.
    pub fn simulate_progress_for(&self, step_id: &str, duration: Duration) -> Result<()> {
        let events = {
            let mut state = self.shared.lock();
            let Some(index) = state.index_of(step_id) else {
                return Ok(());
            };
            if state.steps[index].status.is_terminal() {
                return Ok(());
            }
            let runtime = Handle::try_current().map_err(|_| TrackerError::NoRuntime)?;

            let mut events = Vec::new();
            state.start(index, &mut events);

            let generation = state.next_generation();
            let tick = self.config.tick_interval();
            let increment = simulation::tick_increment(duration, tick);
            let shared = Arc::downgrade(&self.shared);
            let handle = simulation::spawn_ticker(&runtime, tick, move || {
                shared
                    .upgrade()
                    .is_some_and(|shared| shared.apply_tick(generation))
            });
            state.simulation = Some(Simulation::new(
                generation,
                index,
                increment,
                self.config.simulation_cap,
                handle,
            ));
            debug!(
                tracker = %self.id,
                step = step_id,
                ?duration,
                increment,
                "Simulating progress"
            );

            state.recompute(&mut events);
            self.shared.dispatcher.publish(&events);
            events
        };

        self.shared.dispatcher.notify(&events);
        Ok(())
    }

    /// Whether a simulation timer is running.
    pub fn is_simulating(&self) -> bool {
        self.shared.lock().simulation.is_some()
    }

    /// All steps in pipeline order.
    pub fn steps(&self) -> Vec<ProgressStep> {
        self.shared.lock().steps.clone()
    }

    /// One step by id.
    pub fn step(&self, step_id: &str) -> Option<ProgressStep> {
        self.shared.lock().steps.iter().find(|s| s.id == step_id).cloned()
    }

    /// The most recently started step.
    pub fn current_step(&self) -> Option<ProgressStep> {
        let state = self.shared.lock();
        state.steps.get(state.current_step_index).cloned()
    }

    /// Index of the most recently started step.
    pub fn current_step_index(&self) -> usize {
        self.shared.lock().current_step_index
    }

    /// Mean progress across all steps.
    pub fn overall_progress(&self) -> f64 {
        self.shared.lock().overall.overall_progress
    }

    /// Whether every step is completed.
    pub fn is_complete(&self) -> bool {
        self.shared.lock().overall.is_complete
    }

    /// Last recorded error message.
    pub fn error(&self) -> Option<String> {
        self.shared.lock().error.clone()
    }

    /// Take a snapshot of the whole state.
    pub fn snapshot(&self) -> ProgressSnapshot {
        let state = self.shared.lock();
        ProgressSnapshot {
            tracker_id: self.id,
            timestamp: Utc::now(),
            steps: state.steps.clone(),
            overall_progress: state.overall.overall_progress,
            is_complete: state.overall.is_complete,
            error: state.error.clone(),
            current_step_index: state.current_step_index,
        }
    }
}

impl Drop for ProgressTracker {
    fn drop(&mut self) {
        self.shared.lock().stop_simulation();
    }
}

impl std::fmt::Debug for ProgressTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressTracker")
            .field("id", &self.id)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
