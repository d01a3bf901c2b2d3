//! Simulated progress for steps whose real work reports nothing until it ends.
//!
//! A simulation is an owned timer handle: dropping it aborts the ticking
//! task. The tracker keeps at most one and drops it on every transition out
//! of the simulated step's active state.

use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

/// Below this gap to the cap, simulated progress stops moving.
const MIN_STEP: f64 = 0.01;

/// Per-tick increment so that linear progress would reach 100 after `duration`.
///
/// Durations shorter than one tick count as a single tick.
pub fn tick_increment(duration: Duration, tick: Duration) -> f64 {
    let ticks = (duration.as_secs_f64() / tick.as_secs_f64()).max(1.0);
    100.0 / ticks
}

/// Next simulated value.
///
/// Advances linearly while that stays below `cap`, then by half the
/// remaining gap. The result is always strictly below `cap` and never below
/// `current`.
pub fn next_progress(current: f64, increment: f64, cap: f64) -> f64 {
    if current >= cap {
        return current;
    }

    let linear = current + increment;
    if linear < cap {
        return linear;
    }

    let gap = cap - current;
    if gap < MIN_STEP {
        return current;
    }
    let next = current + gap / 2.0;
    if next >= cap {
        current
    } else {
        next
    }
}

/// A running simulation timer.
#[derive(Debug)]
pub(crate) struct Simulation {
    pub(crate) generation: u64,
    pub(crate) step_index: usize,
    pub(crate) increment: f64,
    pub(crate) cap: f64,
    handle: JoinHandle<()>,
}

impl Simulation {
    pub(crate) fn new(
        generation: u64,
        step_index: usize,
        increment: f64,
        cap: f64,
        handle: JoinHandle<()>,
    ) -> Self {
        Self {
            generation,
            step_index,
            increment,
            cap,
            handle,
        }
    }
}

impl Drop for Simulation {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Spawn a task calling `on_tick` every `interval`, first after one interval,
/// until it returns false.
pub(crate) fn spawn_ticker<F>(runtime: &Handle, interval: Duration, mut on_tick: F) -> JoinHandle<()>
where
    F: FnMut() -> bool + Send + 'static,
{
    runtime.spawn(async move {
        let mut ticker = interval_at(Instant::now() + interval, interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            if !on_tick() {
                break;
            }
        }
    })
}
