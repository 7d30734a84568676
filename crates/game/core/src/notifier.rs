//! Fan-out of change events to registered observers.
//!
//! Notification is fire-and-forget. An observer that returns an error or
//! panics is logged and skipped; the mutation path never sees the failure.

use std::panic::{AssertUnwindSafe, catch_unwind};

use tracing::{trace, warn};

use crate::event::ChangeEvent;

/// Failure reported by an observer.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("{observer} rejected change event: {reason}")]
pub struct ObserverError {
    pub observer: &'static str,
    pub reason: String,
}

impl ObserverError {
    pub fn new(observer: &'static str, reason: impl Into<String>) -> Self {
        Self {
            observer,
            reason: reason.into(),
        }
    }
}

/// Receives committed attribute changes (replication, UI, logging).
///
/// Implementations must not block: they run inline on the owning
/// character's simulation step.
pub trait ChangeObserver: Send {
    /// Name used in log lines.
    fn name(&self) -> &'static str;

    fn on_change(&mut self, event: &ChangeEvent) -> Result<(), ObserverError>;
}

/// Observer that records every event through `tracing`.
#[derive(Debug, Default)]
pub struct TracingObserver;

impl ChangeObserver for TracingObserver {
    fn name(&self) -> &'static str {
        "tracing"
    }

    fn on_change(&mut self, event: &ChangeEvent) -> Result<(), ObserverError> {
        tracing::info!(
            target: "vitals::changes",
            attribute = %event.attribute,
            old = event.old_value,
            new = event.new_value,
            "attribute changed"
        );
        Ok(())
    }
}

/// Ordered list of observers.
#[derive(Default)]
pub struct ChangeNotifier {
    observers: Vec<Box<dyn ChangeObserver>>,
    failures: u64,
}

impl ChangeNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, observer: impl ChangeObserver + 'static) {
        self.observers.push(Box::new(observer));
    }

    pub fn len(&self) -> usize {
        self.observers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }

    /// Number of observer failures swallowed so far.
    pub fn failures(&self) -> u64 {
        self.failures
    }

    /// Delivers one event to every observer, in registration order.
    pub fn notify(&mut self, event: &ChangeEvent) {
        for observer in &mut self.observers {
            let name = observer.name();
            match catch_unwind(AssertUnwindSafe(|| observer.on_change(event))) {
                Ok(Ok(())) => trace!(target: "vitals::notifier", observer = name, %event, "delivered"),
                Ok(Err(error)) => {
                    self.failures += 1;
                    warn!(target: "vitals::notifier", observer = name, %error, "observer failed");
                }
                Err(_) => {
                    self.failures += 1;
                    warn!(target: "vitals::notifier", observer = name, %event, "observer panicked");
                }
            }
        }
    }

    pub fn notify_all<'a>(&mut self, events: impl IntoIterator<Item = &'a ChangeEvent>) {
        for event in events {
            self.notify(event);
        }
    }
}

impl core::fmt::Debug for ChangeNotifier {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let names: Vec<_> = self.observers.iter().map(|o| o.name()).collect();
        f.debug_struct("ChangeNotifier")
            .field("observers", &names)
            .field("failures", &self.failures)
            .finish()
    }
}
