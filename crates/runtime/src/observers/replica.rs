//! Observer-side copy of a character's attributes.
//!
//! A replica receives only change events. Each event carries the value the
//! authority replaced, so the mirror can tell whether it missed or repeated
//! one: its own copy must equal `old_value` before the event is applied.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::warn;

use vitals_core::{AttributeSnapshot, ChangeEvent, ChangeObserver, CharacterId, ObserverError};

/// Counters kept by a [`ReplicaMirror`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MirrorStats {
    pub applied: u64,
    /// Events whose `old_value` did not match the mirrored value.
    pub mismatches: u64,
    /// Events for attributes the mirror does not hold.
    pub unknown: u64,
}

#[derive(Debug)]
struct MirrorState {
    snapshot: AttributeSnapshot,
    stats: MirrorStats,
}

/// Cloneable replica. One clone is registered on the character; the others
/// read the mirrored state.
#[derive(Clone, Debug)]
pub struct ReplicaMirror {
    character: CharacterId,
    state: Arc<Mutex<MirrorState>>,
}

impl ReplicaMirror {
    /// Starts mirroring from the authority's current snapshot.
    pub fn new(character: CharacterId, initial: AttributeSnapshot) -> Self {
        Self {
            character,
            state: Arc::new(Mutex::new(MirrorState {
                snapshot: initial,
                stats: MirrorStats::default(),
            })),
        }
    }

    pub fn character(&self) -> CharacterId {
        self.character
    }

    pub fn snapshot(&self) -> AttributeSnapshot {
        self.lock().snapshot.clone()
    }

    pub fn stats(&self) -> MirrorStats {
        self.lock().stats
    }

    /// True when the mirror matches `authority` exactly and never saw a
    /// mismatch.
    pub fn is_consistent_with(&self, authority: &AttributeSnapshot) -> bool {
        let state = self.lock();
        state.stats.mismatches == 0 && state.stats.unknown == 0 && state.snapshot == *authority
    }

    // A panic inside `apply` cannot leave the snapshot half-written, so a
    // poisoned lock still guards a usable value.
    fn lock(&self) -> MutexGuard<'_, MirrorState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn apply(&self, event: &ChangeEvent) -> Result<(), ObserverError> {
        let mut state = self.lock();
        match state.snapshot.set_current(event.attribute, event.new_value) {
            Some(previous) if previous == event.old_value => {
                state.stats.applied += 1;
                Ok(())
            }
            Some(previous) => {
                state.stats.applied += 1;
                state.stats.mismatches += 1;
                warn!(
                    target: "runtime::replica",
                    character = %self.character,
                    attribute = %event.attribute,
                    mirrored = previous,
                    expected = event.old_value,
                    "replica out of step, adopting authority value"
                );
                Ok(())
            }
            None => {
                state.stats.unknown += 1;
                Err(ObserverError::new(
                    "replica",
                    format!("{} is not mirrored", event.attribute),
                ))
            }
        }
    }
}

impl ChangeObserver for ReplicaMirror {
    fn name(&self) -> &'static str {
        "replica"
    }

    fn on_change(&mut self, event: &ChangeEvent) -> Result<(), ObserverError> {
        self.apply(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vitals_core::{
        AttributeKind, AttributeSet, EffectHandle, FamilyDefaults, ModificationRequest, StatFamily,
    };

    fn authority() -> AttributeSet {
        AttributeSet::builder()
            .family(StatFamily::Mana, FamilyDefaults::full(50.0, 2.0).with_current(20.0))
            .build()
    }

    #[test]
    fn mirror_tracks_authority() {
        let mut set = authority();
        let mut mirror = ReplicaMirror::new(CharacterId(1), set.snapshot());
        let reader = mirror.clone();

        for request in [
            ModificationRequest::add(AttributeKind::Mana, 15.0, EffectHandle(1)),
            ModificationRequest::set(AttributeKind::MaxMana, 100.0, EffectHandle(2)),
        ] {
            for event in set.apply(&request).unwrap() {
                mirror.on_change(&event).unwrap();
            }
        }

        assert!(reader.is_consistent_with(&set.snapshot()));
        assert_eq!(reader.stats().applied, 3);
    }

    #[test]
    fn missed_event_is_counted() {
        let mut set = authority();
        let mut mirror = ReplicaMirror::new(CharacterId(1), set.snapshot());

        // First change never reaches the mirror.
        set.apply(&ModificationRequest::add(AttributeKind::Mana, 5.0, EffectHandle(1)))
            .unwrap();
        for event in set
            .apply(&ModificationRequest::add(AttributeKind::Mana, 5.0, EffectHandle(1)))
            .unwrap()
        {
            mirror.on_change(&event).unwrap();
        }

        assert_eq!(mirror.stats().mismatches, 1);
        assert_eq!(mirror.snapshot().current(AttributeKind::Mana), Some(30.0));
        assert!(!mirror.is_consistent_with(&set.snapshot()));
    }

    #[test]
    fn unmirrored_attribute_is_an_observer_error() {
        let mut mirror = ReplicaMirror::new(CharacterId(1), authority().snapshot());
        let err = mirror
            .on_change(&ChangeEvent::new(AttributeKind::Health, 1.0, 2.0))
            .unwrap_err();
        assert_eq!(err.observer, "replica");
        assert_eq!(mirror.stats().unknown, 1);
    }
}
