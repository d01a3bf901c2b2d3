//! Event delivery: observers registered at build time and channel subscribers.

use scriptflow_core::TrackerEvent;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::mpsc;

/// Receives every event a tracker emits.
///
/// Called after the tracker has released its state, so an observer may
/// call back into the tracker. Channel subscribers, unlike observers, are
/// fed while the state is still held.
pub trait TrackerObserver: Send + Sync {
    /// Handle one event.
    fn on_event(&self, event: &TrackerEvent);
}

type CompleteFn = Box<dyn Fn() + Send + Sync>;
type ErrorFn = Box<dyn Fn(&str) + Send + Sync>;

/// Closure-based observer for the two pipeline-level signals.
#[derive(Default)]
pub struct Callbacks {
    on_complete: Option<CompleteFn>,
    on_error: Option<ErrorFn>,
}

impl Callbacks {
    /// Empty callback set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Called once when every step is completed.
    pub fn on_complete(mut self, f: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_complete = Some(Box::new(f));
        self
    }

    /// Called on every `error_step`, with the recorded message.
    pub fn on_error(mut self, f: impl Fn(&str) + Send + Sync + 'static) -> Self {
        self.on_error = Some(Box::new(f));
        self
    }

    /// Whether no callback is set.
    pub fn is_empty(&self) -> bool {
        self.on_complete.is_none() && self.on_error.is_none()
    }
}

impl TrackerObserver for Callbacks {
    fn on_event(&self, event: &TrackerEvent) {
        match event {
            TrackerEvent::PipelineCompleted => {
                if let Some(f) = &self.on_complete {
                    f();
                }
            }
            TrackerEvent::StepFailed { message, .. } => {
                if let Some(f) = &self.on_error {
                    f(message);
                }
            }
            _ => {}
        }
    }
}

impl std::fmt::Debug for Callbacks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Callbacks")
            .field("on_complete", &self.on_complete.is_some())
            .field("on_error", &self.on_error.is_some())
            .finish()
    }
}

/// Fans events out to observers and subscribers.
pub(crate) struct Dispatcher {
    observers: Vec<Arc<dyn TrackerObserver>>,
    subscribers: Mutex<Vec<mpsc::UnboundedSender<TrackerEvent>>>,
}

impl Dispatcher {
    pub(crate) fn new(observers: Vec<Arc<dyn TrackerObserver>>) -> Self {
        Self {
            observers,
            subscribers: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn subscribe(&self) -> mpsc::UnboundedReceiver<TrackerEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(tx);
        rx
    }

    /// Queue events to channel subscribers.
    ///
    /// Callers hold the tracker state lock, so subscribers see events in the
    /// order the state changed.
    pub(crate) fn publish(&self, events: &[TrackerEvent]) {
        if events.is_empty() {
            return;
        }

        let mut subscribers = self.subscribers.lock().unwrap_or_else(PoisonError::into_inner);
        // Dropped receivers are pruned on the first failed send
        subscribers.retain(|tx| events.iter().all(|e| tx.send(e.clone()).is_ok()));
    }

    /// Call observers. Must run without the tracker state lock held.
    pub(crate) fn notify(&self, events: &[TrackerEvent]) {
        for event in events {
            for observer in &self.observers {
                observer.on_event(event);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_callbacks_route_events() {
        let completes = Arc::new(AtomicUsize::new(0));
        let errors = Arc::new(Mutex::new(Vec::new()));

        let c = completes.clone();
        let e = errors.clone();
        let callbacks = Callbacks::new()
            .on_complete(move || {
                c.fetch_add(1, Ordering::SeqCst);
            })
            .on_error(move |msg| e.lock().unwrap().push(msg.to_string()));

        callbacks.on_event(&TrackerEvent::StepCompleted {
            step_id: "a".to_string(),
        });
        callbacks.on_event(&TrackerEvent::PipelineCompleted);
        callbacks.on_event(&TrackerEvent::StepFailed {
            step_id: "a".to_string(),
            message: "boom".to_string(),
        });

        assert_eq!(completes.load(Ordering::SeqCst), 1);
        assert_eq!(*errors.lock().unwrap(), vec!["boom".to_string()]);
    }

    #[test]
    fn test_empty_callbacks() {
        assert!(Callbacks::new().is_empty());
        assert!(!Callbacks::new().on_complete(|| {}).is_empty());
    }

    #[test]
    fn test_dispatch_prunes_closed_subscribers() {
        let dispatcher = Dispatcher::new(Vec::new());
        let mut open = dispatcher.subscribe();
        let closed = dispatcher.subscribe();
        drop(closed);

        dispatcher.publish(&[TrackerEvent::Reset]);

        assert_eq!(open.try_recv().unwrap(), TrackerEvent::Reset);
        assert_eq!(dispatcher.subscribers.lock().unwrap().len(), 1);
    }
}
