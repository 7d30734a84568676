//! Topic-based event bus implementation.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use vitals_core::{ChangeEvent, CharacterId, EffectHandle};

/// Topics for event routing
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub enum Topic {
    /// Committed attribute changes
    Attributes,
    /// Activation, deactivation, death and rejected requests
    Lifecycle,
}

/// A committed change on one character.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AttributeChanged {
    pub character: CharacterId,
    pub change: ChangeEvent,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum LifecycleEvent {
    Activated {
        character: CharacterId,
    },
    Deactivated {
        character: CharacterId,
    },
    /// Health reached zero; regen stays off until re-armed.
    Died {
        character: CharacterId,
    },
    /// The pipeline refused a request. Nothing was mutated.
    Rejected {
        character: CharacterId,
        source: EffectHandle,
        code: String,
        reason: String,
    },
}

impl LifecycleEvent {
    pub fn character(&self) -> CharacterId {
        match self {
            Self::Activated { character }
            | Self::Deactivated { character }
            | Self::Died { character }
            | Self::Rejected { character, .. } => *character,
        }
    }
}

/// Event wrapper that carries the topic and typed event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    Attribute(AttributeChanged),
    Lifecycle(LifecycleEvent),
}

impl Event {
    pub fn topic(&self) -> Topic {
        match self {
            Event::Attribute(_) => Topic::Attributes,
            Event::Lifecycle(_) => Topic::Lifecycle,
        }
    }

    pub fn character(&self) -> CharacterId {
        match self {
            Event::Attribute(changed) => changed.character,
            Event::Lifecycle(event) => event.character(),
        }
    }
}

/// Topic-based event bus
///
/// Consumers subscribe to the topics they care about. Publishing is
/// best-effort: a topic without subscribers drops the event.
#[derive(Clone)]
pub struct EventBus {
    attributes: broadcast::Sender<Event>,
    lifecycle: broadcast::Sender<Event>,
}

impl EventBus {
    pub const DEFAULT_CAPACITY: usize = 256;

    /// Creates a new event bus with default capacity for each topic
    pub fn new() -> Self {
        Self::with_capacity(Self::DEFAULT_CAPACITY)
    }

    /// Creates a new event bus with specified capacity per topic
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            attributes: broadcast::channel(capacity).0,
            lifecycle: broadcast::channel(capacity).0,
        }
    }

    fn sender(&self, topic: Topic) -> &broadcast::Sender<Event> {
        match topic {
            Topic::Attributes => &self.attributes,
            Topic::Lifecycle => &self.lifecycle,
        }
    }

    /// Publish an event to its corresponding topic
    pub fn publish(&self, event: Event) {
        let topic = event.topic();
        if self.sender(topic).send(event).is_err() {
            // No subscribers for this topic - this is normal, not an error
            tracing::trace!("No subscribers for topic {:?}", topic);
        }
    }

    /// Subscribe to a specific topic
    pub fn subscribe(&self, topic: Topic) -> broadcast::Receiver<Event> {
        self.sender(topic).subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("attribute_subscribers", &self.attributes.receiver_count())
            .field("lifecycle_subscribers", &self.lifecycle.receiver_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vitals_core::AttributeKind;

    #[tokio::test]
    async fn events_reach_only_their_topic() {
        let bus = EventBus::with_capacity(8);
        let mut attributes = bus.subscribe(Topic::Attributes);
        let mut lifecycle = bus.subscribe(Topic::Lifecycle);

        let character = CharacterId(3);
        bus.publish(Event::Lifecycle(LifecycleEvent::Died { character }));
        bus.publish(Event::Attribute(AttributeChanged {
            character,
            change: ChangeEvent::new(AttributeKind::Health, 1.0, 0.0),
        }));

        assert_eq!(
            lifecycle.recv().await.unwrap(),
            Event::Lifecycle(LifecycleEvent::Died { character })
        );
        let event = attributes.recv().await.unwrap();
        assert_eq!(event.topic(), Topic::Attributes);
        assert_eq!(event.character(), character);
        assert!(lifecycle.try_recv().is_err());
    }

    #[test]
    fn publishing_without_subscribers_is_silent() {
        let bus = EventBus::new();
        bus.publish(Event::Lifecycle(LifecycleEvent::Activated {
            character: CharacterId(1),
        }));
    }
}
