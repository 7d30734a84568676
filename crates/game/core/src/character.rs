//! Per-character owner of the attribute pipeline.
//!
//! A [`Character`] is the single logical owner of one [`AttributeSet`].
//! External requests, batched queues and regen ticks all funnel through
//! `&mut self`, so the set is never touched concurrently.

use core::time::Duration;

use tracing::{debug, info};

use crate::attribute::{AttributeSet, AttributeSnapshot, ChangeEvents, StatFamily};
use crate::config::VitalsConfig;
use crate::error::ModifyError;
use crate::event::ChangeEvent;
use crate::notifier::{ChangeNotifier, ChangeObserver};
use crate::regen::{RegenScheduler, RegenState};
use crate::request::{ModificationRequest, RequestQueue};

/// Stable identifier of a character.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CharacterId(pub u32);

impl core::fmt::Display for CharacterId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "character#{}", self.0)
    }
}

/// Outcome of one batch drained from a [`RequestQueue`].
#[derive(Debug, Default)]
pub struct BatchOutcome {
    /// Events from every accepted request, in processing order.
    pub events: Vec<ChangeEvent>,
    /// Requests the pipeline refused, with the reason.
    pub rejected: Vec<(ModificationRequest, ModifyError)>,
}

#[derive(Debug)]
pub struct Character {
    id: CharacterId,
    attributes: AttributeSet,
    regen: RegenScheduler,
    notifier: ChangeNotifier,
    active: bool,
}

impl Character {
    pub fn new(id: CharacterId, attributes: AttributeSet, regen_interval: Duration) -> Self {
        Self {
            id,
            attributes,
            regen: RegenScheduler::new(regen_interval),
            notifier: ChangeNotifier::new(),
            active: false,
        }
    }

    /// Spawns a character with the configured defaults and rescale policy.
    pub fn from_config(id: CharacterId, config: &VitalsConfig) -> Self {
        let attributes = AttributeSet::from_defaults(&config.defaults, config.rescale_policy);
        Self::new(id, attributes, config.regen_interval())
    }

    pub fn id(&self) -> CharacterId {
        self.id
    }

    pub fn attributes(&self) -> &AttributeSet {
        &self.attributes
    }

    pub fn snapshot(&self) -> AttributeSnapshot {
        self.attributes.snapshot()
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Health is owned and at zero.
    pub fn is_dead(&self) -> bool {
        self.attributes.is_depleted(StatFamily::Health)
    }

    pub fn regen_state(&self) -> RegenState {
        self.regen.state()
    }

    pub fn observe(&mut self, observer: impl ChangeObserver + 'static) {
        self.notifier.register(observer);
    }

    pub fn notifier(&self) -> &ChangeNotifier {
        &self.notifier
    }

    /// Marks the character active and arms regen unless it is dead.
    pub fn activate(&mut self) {
        self.active = true;
        if !self.is_dead() {
            self.regen.arm();
        }
        info!(target: "vitals::character", id = %self.id, regen = %self.regen.state(), "activated");
    }

    pub fn deactivate(&mut self) {
        self.active = false;
        self.regen.disarm();
        info!(target: "vitals::character", id = %self.id, "deactivated");
    }

    /// Explicit re-arm after death. Returns `false` while still dead or
    /// inactive.
    pub fn rearm(&mut self) -> bool {
        if !self.active || self.is_dead() {
            return false;
        }
        self.regen.arm();
        true
    }

    /// Applies one request, then notifies observers of every change.
    pub fn submit(&mut self, request: &ModificationRequest) -> Result<ChangeEvents, ModifyError> {
        let changes = self.attributes.apply(request)?;
        self.notifier.notify_all(&changes);
        self.check_death();
        Ok(changes)
    }

    /// Drains `queue` and submits every request in processing order.
    ///
    /// A rejected request does not stop the batch.
    pub fn submit_batch(&mut self, queue: &mut RequestQueue) -> BatchOutcome {
        let mut outcome = BatchOutcome::default();
        for request in queue.drain() {
            match self.submit(&request) {
                Ok(changes) => outcome.events.extend(changes),
                Err(error) => {
                    debug!(target: "vitals::character", id = %self.id, %error, "request rejected");
                    outcome.rejected.push((request, error));
                }
            }
        }
        outcome
    }

    /// Advances simulated time by `elapsed`, firing due regen ticks.
    pub fn advance(&mut self, elapsed: Duration) -> Vec<ChangeEvent> {
        if !self.active {
            return Vec::new();
        }
        let outcome = self.regen.advance(elapsed, &mut self.attributes);
        self.notifier.notify_all(&outcome.events);
        if outcome.died {
            info!(target: "vitals::character", id = %self.id, "died during regen");
        }
        outcome.events
    }

    fn check_death(&mut self) {
        if self.is_dead() && !self.regen.is_idle() {
            info!(target: "vitals::character", id = %self.id, "died");
            self.regen.on_death();
        }
    }
}
