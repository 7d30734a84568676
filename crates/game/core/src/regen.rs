//! Periodic regeneration.
//!
//! ```text
//! Idle ──arm──▶ Armed ──first tick──▶ Ticking
//!  ▲                                     │
//!  └──────── disarm / death ─────────────┘
//! ```
//!
//! Each tick synthesizes one `Add(rate * interval)` request per owned family
//! with a nonzero rate and submits it through [`AttributeSet::apply`], so
//! regen obeys the same clamps as every other source.

use core::time::Duration;

use tracing::{debug, info};

use crate::attribute::{AttributeSet, StatFamily};
use crate::event::ChangeEvent;
use crate::request::{EffectHandle, ModificationRequest};

/// Scheduler state.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, strum::Display)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[strum(serialize_all = "snake_case")]
pub enum RegenState {
    #[default]
    Idle,
    Armed,
    Ticking,
}

/// Result of advancing the scheduler.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RegenOutcome {
    pub events: Vec<ChangeEvent>,
    /// Number of ticks that fired.
    pub ticks: u32,
    /// The character was found dead; the scheduler went idle.
    pub died: bool,
}

/// Fixed-interval regen driver for one attribute set.
#[derive(Clone, Debug)]
pub struct RegenScheduler {
    state: RegenState,
    interval: Duration,
    accumulated: Duration,
}

impl RegenScheduler {
    /// Creates an idle scheduler. A zero interval is raised to 1 ms.
    pub fn new(interval: Duration) -> Self {
        Self {
            state: RegenState::Idle,
            interval: interval.max(Duration::from_millis(1)),
            accumulated: Duration::ZERO,
        }
    }

    pub fn state(&self) -> RegenState {
        self.state
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn is_idle(&self) -> bool {
        self.state == RegenState::Idle
    }

    /// Idle → Armed. Also the explicit re-arm after death. No effect when
    /// already armed or ticking.
    pub fn arm(&mut self) {
        if self.state == RegenState::Idle {
            self.state = RegenState::Armed;
            self.accumulated = Duration::ZERO;
            debug!(target: "vitals::regen", "armed");
        }
    }

    /// Any state → Idle. Partial interval progress is discarded.
    pub fn disarm(&mut self) {
        if self.state != RegenState::Idle {
            debug!(target: "vitals::regen", from = %self.state, "disarmed");
        }
        self.state = RegenState::Idle;
        self.accumulated = Duration::ZERO;
    }

    /// Advances simulated time, firing one tick per whole interval elapsed.
    ///
    /// Partial intervals carry over to the next call. Ticking stops early
    /// once a tick changes nothing, so arbitrarily long spans stay cheap.
    /// A dead character
    /// (current Health at zero) sends the scheduler to Idle without firing.
    pub fn advance(&mut self, elapsed: Duration, set: &mut AttributeSet) -> RegenOutcome {
        let mut outcome = RegenOutcome::default();
        if self.state == RegenState::Idle {
            return outcome;
        }

        if set.is_depleted(StatFamily::Health) {
            self.on_death();
            outcome.died = true;
            return outcome;
        }

        self.accumulated = self.accumulated.saturating_add(elapsed);
        while self.accumulated >= self.interval {
            self.accumulated -= self.interval;
            self.state = RegenState::Ticking;
            outcome.ticks = outcome.ticks.saturating_add(1);

            let events = Self::tick(self.interval, set);
            if events.is_empty() {
                // The set is at rest; the remaining whole intervals are no-ops.
                self.accumulated = self.remainder();
                break;
            }
            outcome.events.extend(events);

            if set.is_depleted(StatFamily::Health) {
                self.on_death();
                outcome.died = true;
                break;
            }
        }

        outcome
    }

    /// Death transition. Regen stays off until [`arm`](Self::arm).
    pub fn on_death(&mut self) {
        if self.state != RegenState::Idle {
            info!(target: "vitals::regen", "health depleted, regen suspended");
        }
        self.state = RegenState::Idle;
        self.accumulated = Duration::ZERO;
    }

    /// Partial interval left over once every whole interval is consumed.
    fn remainder(&self) -> Duration {
        let nanos = self.accumulated.as_nanos() % self.interval.as_nanos();
        let secs = (nanos / 1_000_000_000) as u64;
        Duration::new(secs, (nanos % 1_000_000_000) as u32)
    }

    fn tick(interval: Duration, set: &mut AttributeSet) -> Vec<ChangeEvent> {
        let seconds = interval.as_secs_f64();
        let mut events = Vec::new();

        for family in set.families().families() {
            let rate = set.value(family.regen()).unwrap_or(0.0);
            if rate == 0.0 {
                continue;
            }
            let request = ModificationRequest::add(family.current(), rate * seconds, EffectHandle::REGEN);
            match set.apply(&request) {
                Ok(changes) => events.extend(changes),
                // Submission failures are no-ops for regen.
                Err(error) => debug!(target: "vitals::regen", %family, %error, "regen request dropped"),
            }
        }

        events
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attribute::AttributeKind;
    use crate::config::FamilyDefaults;

    fn set(health: f64, max: f64, regen: f64) -> AttributeSet {
        AttributeSet::builder()
            .family(StatFamily::Health, FamilyDefaults::full(max, regen).with_current(health))
            .build()
    }

    #[test]
    fn idle_scheduler_does_nothing() {
        let mut attributes = set(50.0, 100.0, 5.0);
        let mut regen = RegenScheduler::new(Duration::from_secs(1));

        let outcome = regen.advance(Duration::from_secs(10), &mut attributes);
        assert_eq!(outcome.ticks, 0);
        assert_eq!(attributes.value(AttributeKind::Health), Some(50.0));
    }

    #[test]
    fn regen_clamps_at_max() {
        let mut attributes = set(90.0, 100.0, 5.0);
        let mut regen = RegenScheduler::new(Duration::from_secs(1));
        regen.arm();
        assert_eq!(regen.state(), RegenState::Armed);

        let outcome = regen.advance(Duration::from_secs(2), &mut attributes);

        assert_eq!(outcome.ticks, 2);
        assert_eq!(attributes.value(AttributeKind::Health), Some(100.0));
        assert_eq!(regen.state(), RegenState::Ticking);
        assert_eq!(
            outcome.events,
            vec![
                ChangeEvent::new(AttributeKind::Health, 90.0, 95.0),
                ChangeEvent::new(AttributeKind::Health, 95.0, 100.0),
            ]
        );
    }

    #[test]
    fn partial_intervals_carry_over() {
        let mut attributes = set(10.0, 100.0, 4.0);
        let mut regen = RegenScheduler::new(Duration::from_millis(500));
        regen.arm();

        assert_eq!(regen.advance(Duration::from_millis(300), &mut attributes).ticks, 0);
        assert_eq!(regen.state(), RegenState::Armed);
        assert_eq!(regen.advance(Duration::from_millis(300), &mut attributes).ticks, 1);
        assert_eq!(attributes.value(AttributeKind::Health), Some(12.0));
    }

    #[test]
    fn decay_to_zero_is_death() {
        let mut attributes = set(3.0, 100.0, -2.0);
        let mut regen = RegenScheduler::new(Duration::from_secs(1));
        regen.arm();

        let outcome = regen.advance(Duration::from_secs(5), &mut attributes);

        assert!(outcome.died);
        assert_eq!(outcome.ticks, 2);
        assert_eq!(attributes.value(AttributeKind::Health), Some(0.0));
        assert!(regen.is_idle());

        // Suppressed until re-armed.
        attributes
            .apply(&ModificationRequest::set(AttributeKind::HealthRegen, 5.0, EffectHandle(1)))
            .unwrap();
        assert_eq!(regen.advance(Duration::from_secs(3), &mut attributes).ticks, 0);
    }

    #[test]
    fn dead_character_goes_idle_without_ticking() {
        let mut attributes = set(0.0, 100.0, 5.0);
        let mut regen = RegenScheduler::new(Duration::from_secs(1));
        regen.arm();

        let outcome = regen.advance(Duration::from_secs(1), &mut attributes);
        assert!(outcome.died);
        assert_eq!(outcome.ticks, 0);
        assert_eq!(attributes.value(AttributeKind::Health), Some(0.0));
    }

    #[test]
    fn zero_rates_submit_nothing() {
        let mut attributes = set(50.0, 100.0, 0.0);
        let mut regen = RegenScheduler::new(Duration::from_secs(1));
        regen.arm();

        let outcome = regen.advance(Duration::from_secs(3), &mut attributes);
        assert_eq!(outcome.ticks, 1);
        assert!(outcome.events.is_empty());
        assert_eq!(regen.state(), RegenState::Ticking);
    }

    #[test]
    fn huge_elapsed_settles_without_overflow() {
        let mut attributes = set(50.0, 100.0, 1.0);
        let mut regen = RegenScheduler::new(Duration::from_secs(1));
        regen.arm();
        regen.advance(Duration::from_millis(300), &mut attributes);

        let outcome = regen.advance(Duration::MAX, &mut attributes);

        // Fifty ticks fill the pool, the fifty-first finds nothing to do.
        assert_eq!(outcome.ticks, 51);
        assert_eq!(outcome.events.len(), 50);
        assert_eq!(attributes.value(AttributeKind::Health), Some(100.0));

        // Only a sub-interval remainder is carried forward.
        let outcome = regen.advance(Duration::from_nanos(1), &mut attributes);
        assert_eq!(outcome.ticks, 1);
    }

    #[test]
    fn disarm_drops_progress() {
        let mut attributes = set(50.0, 100.0, 1.0);
        let mut regen = RegenScheduler::new(Duration::from_secs(1));
        regen.arm();
        regen.advance(Duration::from_millis(900), &mut attributes);
        regen.disarm();
        regen.arm();

        assert_eq!(regen.advance(Duration::from_millis(200), &mut attributes).ticks, 0);
    }
}
