//! Lifecycle notifications
//!
//! Observers hear about rule definition changes and finished executions.
//! Notifications are best effort: an observer cannot influence or fail the
//! operation that produced the event.

use std::{
    panic::{catch_unwind, AssertUnwindSafe},
    sync::{Arc, RwLock},
};

use tokio::sync::broadcast;
use tracing::{error, trace};

use crate::types::{ExecutionContext, ExecutionResult, Rule};

/// Something that happened to a rule
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    /// A rule was created
    RuleCreated(Rule),

    /// A rule definition changed
    RuleUpdated(Rule),

    /// A rule was deleted
    RuleDeleted {
        /// Id of the deleted rule
        rule_id: String,
    },

    /// A rule finished executing
    RuleExecuted {
        /// The rule as it was dispatched
        rule: Rule,
        /// Context of the triggering event
        context: Arc<ExecutionContext>,
        /// Aggregate result
        result: ExecutionResult,
    },
}

impl EngineEvent {
    /// Short event name (`ruleCreated`, `ruleUpdated`, ...)
    pub fn name(&self) -> &'static str {
        match self {
            EngineEvent::RuleCreated(_) => "ruleCreated",
            EngineEvent::RuleUpdated(_) => "ruleUpdated",
            EngineEvent::RuleDeleted { .. } => "ruleDeleted",
            EngineEvent::RuleExecuted { .. } => "ruleExecuted",
        }
    }
}

/// Receives engine events
pub trait RuleObserver: Send + Sync {
    /// Called synchronously on the thread that produced the event
    fn on_event(&self, event: &EngineEvent);
}

impl<F> RuleObserver for F
where
    F: Fn(&EngineEvent) + Send + Sync,
{
    fn on_event(&self, event: &EngineEvent) {
        self(event)
    }
}

/// Forwards events into a broadcast channel
///
/// Lagging or absent receivers only lose events; sending never blocks.
#[derive(Debug, Clone)]
pub struct ChannelObserver {
    sender: broadcast::Sender<EngineEvent>,
}

impl ChannelObserver {
    /// Create an observer with a channel of the given capacity
    pub fn new(capacity: usize) -> (Self, broadcast::Receiver<EngineEvent>) {
        let (sender, receiver) = broadcast::channel(capacity.max(1));
        (Self { sender }, receiver)
    }

    /// Another receiver for the same channel
    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.sender.subscribe()
    }
}

impl RuleObserver for ChannelObserver {
    fn on_event(&self, event: &EngineEvent) {
        // Err only means nobody is listening right now
        let _ = self.sender.send(event.clone());
    }
}

/// Ordered set of observers
#[derive(Clone, Default)]
pub struct Notifier {
    observers: Arc<RwLock<Vec<Arc<dyn RuleObserver>>>>,
}

impl Notifier {
    /// Create a notifier without observers
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an observer; delivery follows registration order
    pub fn subscribe(&self, observer: Arc<dyn RuleObserver>) {
        match self.observers.write() {
            Ok(mut observers) => observers.push(observer),
            Err(e) => error!(error = %e, "Failed to register observer"),
        }
    }

    /// Number of registered observers
    pub fn len(&self) -> usize {
        self.observers.read().map(|o| o.len()).unwrap_or(0)
    }

    /// Whether no observer is registered
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Deliver an event to every observer
    ///
    /// A panicking observer is logged and skipped.
    pub fn notify(&self, event: &EngineEvent) {
        let observers = match self.observers.read() {
            Ok(observers) => observers.clone(),
            Err(e) => {
                error!(error = %e, "Failed to read observers");
                return;
            }
        };

        trace!(event = event.name(), observers = observers.len(), "Notifying observers");

        for (index, observer) in observers.iter().enumerate() {
            if catch_unwind(AssertUnwindSafe(|| observer.on_event(event))).is_err() {
                error!(
                    event = event.name(),
                    observer = index,
                    "Observer panicked while handling event"
                );
            }
        }
    }
}

impl std::fmt::Debug for Notifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Notifier")
            .field("observers", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    fn deleted(id: &str) -> EngineEvent {
        EngineEvent::RuleDeleted {
            rule_id: id.to_string(),
        }
    }

    #[test]
    fn test_delivery_in_registration_order() {
        let notifier = Notifier::new();
        let seen = Arc::new(Mutex::new(Vec::new()));

        for tag in ["first", "second"] {
            let seen = seen.clone();
            notifier.subscribe(Arc::new(move |_: &EngineEvent| {
                seen.lock().unwrap().push(tag);
            }));
        }

        notifier.notify(&deleted("r1"));
        assert_eq!(*seen.lock().unwrap(), vec!["first", "second"]);
    }

    #[test]
    fn test_panicking_observer_is_isolated() {
        let notifier = Notifier::new();
        let seen = Arc::new(Mutex::new(0));

        notifier.subscribe(Arc::new(|_: &EngineEvent| panic!("observer bug")));
        let counter = seen.clone();
        notifier.subscribe(Arc::new(move |_: &EngineEvent| {
            *counter.lock().unwrap() += 1;
        }));

        notifier.notify(&deleted("r1"));
        notifier.notify(&deleted("r2"));
        assert_eq!(*seen.lock().unwrap(), 2);
    }

    #[tokio::test]
    async fn test_channel_observer() {
        let (observer, mut receiver) = ChannelObserver::new(8);
        let notifier = Notifier::new();
        notifier.subscribe(Arc::new(observer));

        notifier.notify(&deleted("r1"));
        let event = receiver.recv().await.unwrap();
        assert_eq!(event, deleted("r1"));
        assert_eq!(event.name(), "ruleDeleted");
    }

    #[test]
    fn test_channel_observer_without_receivers() {
        let (observer, receiver) = ChannelObserver::new(1);
        drop(receiver);
        observer.on_event(&deleted("r1"));
    }
}
