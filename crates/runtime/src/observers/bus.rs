use vitals_core::{ChangeEvent, ChangeObserver, CharacterId, ObserverError};

use crate::events::{AttributeChanged, Event, EventBus};

/// Forwards every committed change to [`Topic::Attributes`](crate::Topic).
#[derive(Clone, Debug)]
pub struct BusObserver {
    character: CharacterId,
    bus: EventBus,
}

impl BusObserver {
    pub fn new(character: CharacterId, bus: EventBus) -> Self {
        Self { character, bus }
    }
}

impl ChangeObserver for BusObserver {
    fn name(&self) -> &'static str {
        "event_bus"
    }

    fn on_change(&mut self, event: &ChangeEvent) -> Result<(), ObserverError> {
        self.bus.publish(Event::Attribute(AttributeChanged {
            character: self.character,
            change: *event,
        }));
        Ok(())
    }
}
