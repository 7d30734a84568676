//! The attribute set: owned stat families and the single mutation entry point.

use arrayvec::ArrayVec;
use tracing::{debug, error};

use super::{Attribute, AttributeKind, AttributeSnapshot, SnapshotEntry, StatFamilies, StatFamily};
use crate::config::{AttributeDefaults, FamilyDefaults};
use crate::error::ModifyError;
use crate::event::ChangeEvent;
use crate::pipeline::{ModificationPipeline, RescalePolicy};
use crate::request::ModificationRequest;

/// Events produced by one request.
///
/// At most one event per attribute, so the capacity is the number of kinds.
pub type ChangeEvents = ArrayVec<ChangeEvent, { AttributeKind::COUNT }>;

/// A character's attributes.
///
/// Owns one [`Attribute`] per member of every owned family and the
/// [`ModificationPipeline`] that guards them. After every call to
/// [`apply`](Self::apply), for every owned family X:
///
/// - `0 <= X <= MaxX`
/// - `MaxX >= 0`
/// - no value is NaN or infinite
#[derive(Clone, Debug)]
pub struct AttributeSet {
    slots: [Option<Attribute>; AttributeKind::COUNT],
    families: StatFamilies,
    pipeline: ModificationPipeline,
}

impl AttributeSet {
    pub fn builder() -> AttributeSetBuilder {
        AttributeSetBuilder::new()
    }

    /// Builds a set owning every family present in `defaults`.
    pub fn from_defaults(defaults: &AttributeDefaults, policy: RescalePolicy) -> Self {
        let mut builder = Self::builder().policy(policy);
        for family in StatFamily::ALL {
            if let Some(values) = defaults.family(family) {
                builder = builder.family(family, *values);
            }
        }
        builder.build()
    }

    pub fn families(&self) -> StatFamilies {
        self.families
    }

    pub fn pipeline(&self) -> &ModificationPipeline {
        &self.pipeline
    }

    pub fn owns(&self, kind: AttributeKind) -> bool {
        self.slots[kind.index()].is_some()
    }

    pub fn get(&self, kind: AttributeKind) -> Option<&Attribute> {
        self.slots[kind.index()].as_ref()
    }

    /// Current value of `kind`, or `None` if the set does not own it.
    pub fn value(&self, kind: AttributeKind) -> Option<f64> {
        self.get(kind).map(Attribute::current)
    }

    /// Current value of `kind`, failing like a request would for a stat the
    /// set does not own.
    pub fn current(&self, kind: AttributeKind) -> Result<f64, ModifyError> {
        self.value(kind).ok_or_else(|| ModifyError::unknown(kind.to_string()))
    }

    /// Owned attributes in storage order.
    pub fn iter(&self) -> impl Iterator<Item = &Attribute> {
        self.slots.iter().flatten()
    }

    pub fn snapshot(&self) -> AttributeSnapshot {
        AttributeSnapshot::from_entries(self.iter().map(SnapshotEntry::from).collect())
    }

    /// True when the family is owned and its current value is zero.
    pub fn is_depleted(&self, family: StatFamily) -> bool {
        self.value(family.current()).is_some_and(|value| value <= 0.0)
    }

    /// Applies one request through the pipeline and commits the result.
    ///
    /// Returns one event per attribute whose value changed: none for a
    /// no-op, one for a plain change, two when a max change re-derives its
    /// current value. Rejected requests mutate nothing.
    pub fn apply(&mut self, request: &ModificationRequest) -> Result<ChangeEvents, ModifyError> {
        let target = request.target;

        if !request.magnitude.is_finite() {
            return Err(ModifyError::invalid_magnitude(target, request.magnitude));
        }
        let old = self.current(target)?;

        let raw = request.op.apply(old, request.magnitude);
        if !raw.is_finite() {
            return Err(ModifyError::invalid_magnitude(target, request.magnitude));
        }

        let pipeline = self.pipeline;
        let mut changes = ChangeEvents::new();

        let new = pipeline.pre_change(self, target, raw);
        self.commit(target, new, &mut changes);

        if let Some((dependent, derived)) = pipeline.post_effect(self, target, old, new) {
            self.commit(dependent, derived, &mut changes);
        }

        self.correct_violations(&mut changes);

        debug!(
            target: "vitals::pipeline",
            attribute = %target,
            op = %request.op,
            magnitude = request.magnitude,
            source = %request.source,
            changes = changes.len(),
            "applied modification"
        );

        Ok(changes)
    }

    /// Audits the whole set and repairs anything out of range.
    ///
    /// A clean set returns no events.
    pub fn enforce_invariants(&mut self) -> ChangeEvents {
        let mut changes = ChangeEvents::new();
        self.correct_violations(&mut changes);
        changes
    }

    fn correct_violations(&mut self, changes: &mut ChangeEvents) {
        let pipeline = self.pipeline;
        for violation in pipeline.audit(self) {
            error!(
                target: "vitals::pipeline",
                attribute = %violation.attribute,
                found = violation.found,
                corrected = violation.corrected,
                "invariant violation detected, re-clamping"
            );
            self.commit(violation.attribute, violation.corrected, changes);
        }
    }

    /// Stores `value` and folds the change into `changes`.
    ///
    /// A second commit to the same attribute updates its existing event, and
    /// drops it if the attribute ends where it started.
    fn commit(&mut self, kind: AttributeKind, value: f64, changes: &mut ChangeEvents) {
        let Some(attribute) = self.slots[kind.index()].as_mut() else {
            return;
        };
        let previous = attribute.current();
        if previous == value {
            return;
        }
        attribute.set_current(value);

        match changes.iter().position(|event| event.attribute == kind) {
            Some(index) if changes[index].old_value == value => {
                changes.remove(index);
            }
            Some(index) => changes[index].new_value = value,
            None => changes.push(ChangeEvent::new(kind, previous, value)),
        }
    }

    #[cfg(test)]
    pub(crate) fn corrupt(&mut self, kind: AttributeKind, value: f64) {
        if let Some(attribute) = self.slots[kind.index()].as_mut() {
            attribute.set_current(value);
        }
    }
}

/// Builder for [`AttributeSet`].
#[derive(Clone, Debug, Default)]
pub struct AttributeSetBuilder {
    families: Vec<(StatFamily, FamilyDefaults)>,
    policy: RescalePolicy,
}

impl AttributeSetBuilder {
    fn new() -> Self {
        Self::default()
    }

    /// Adds (or replaces) a family with its spawn values.
    pub fn family(mut self, family: StatFamily, values: FamilyDefaults) -> Self {
        self.families.retain(|(existing, _)| *existing != family);
        self.families.push((family, values));
        self
    }

    pub fn policy(mut self, policy: RescalePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Builds the set. Spawn values are sanitized, so the result always
    /// satisfies the set invariants.
    pub fn build(self) -> AttributeSet {
        let mut slots = [None; AttributeKind::COUNT];
        let mut families = StatFamilies::empty();

        for (family, values) in self.families {
            let (current, max, regen) = values.sanitized();
            slots[family.current().index()] = Some(Attribute::new(family.current(), current));
            slots[family.max().index()] = Some(Attribute::new(family.max(), max));
            slots[family.regen().index()] = Some(Attribute::new(family.regen(), regen));
            families |= family.flag();
        }

        AttributeSet {
            slots,
            families,
            pipeline: ModificationPipeline::new(self.policy),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::EffectHandle;

    const SRC: EffectHandle = EffectHandle(1);

    fn health(current: f64, max: f64) -> AttributeSet {
        health_with(current, max, RescalePolicy::Proportional)
    }

    fn health_with(current: f64, max: f64, policy: RescalePolicy) -> AttributeSet {
        AttributeSet::builder()
            .family(
                StatFamily::Health,
                FamilyDefaults::full(max, 0.0).with_current(current),
            )
            .policy(policy)
            .build()
    }

    fn assert_invariants(set: &AttributeSet) {
        for family in set.families().families() {
            let current = set.value(family.current()).unwrap();
            let max = set.value(family.max()).unwrap();
            assert!(current.is_finite() && max.is_finite());
            assert!(0.0 <= current && current <= max, "{family}: {current}/{max}");
        }
    }

    #[test]
    fn add_clamps_to_max() {
        let mut set = health(90.0, 100.0);
        let changes = set
            .apply(&ModificationRequest::add(AttributeKind::Health, 25.0, SRC))
            .unwrap();

        assert_eq!(changes.as_slice(), &[ChangeEvent::new(AttributeKind::Health, 90.0, 100.0)]);
        assert_eq!(set.value(AttributeKind::Health), Some(100.0));
    }

    #[test]
    fn damage_clamps_to_zero() {
        let mut set = health(30.0, 100.0);
        set.apply(&ModificationRequest::add(AttributeKind::Health, -45.0, SRC))
            .unwrap();
        assert_eq!(set.value(AttributeKind::Health), Some(0.0));
        assert!(set.is_depleted(StatFamily::Health));
    }

    #[test]
    fn multiply_scales_raw_value() {
        let mut set = health(40.0, 100.0);
        set.apply(&ModificationRequest::multiply(AttributeKind::Health, 1.5, SRC))
            .unwrap();
        assert_eq!(set.value(AttributeKind::Health), Some(60.0));
    }

    #[test]
    fn override_with_own_value_emits_nothing() {
        let mut set = health(73.0, 100.0);
        let changes = set
            .apply(&ModificationRequest::set(AttributeKind::Health, 73.0, SRC))
            .unwrap();
        assert!(changes.is_empty());
    }

    #[test]
    fn clamped_away_change_emits_nothing() {
        let mut set = health(100.0, 100.0);
        let changes = set
            .apply(&ModificationRequest::add(AttributeKind::Health, 10.0, SRC))
            .unwrap();
        assert!(changes.is_empty());
    }

    #[test]
    fn max_increase_rescales_current() {
        let mut set = health(50.0, 100.0);
        let changes = set
            .apply(&ModificationRequest::set(AttributeKind::MaxHealth, 200.0, SRC))
            .unwrap();

        assert_eq!(set.value(AttributeKind::Health), Some(100.0));
        assert_eq!(
            changes.as_slice(),
            &[
                ChangeEvent::new(AttributeKind::MaxHealth, 100.0, 200.0),
                ChangeEvent::new(AttributeKind::Health, 50.0, 100.0),
            ]
        );
    }

    #[test]
    fn max_decrease_preserves_ratio() {
        let mut set = health(80.0, 100.0);
        set.apply(&ModificationRequest::set(AttributeKind::MaxHealth, 50.0, SRC))
            .unwrap();
        assert_eq!(set.value(AttributeKind::Health), Some(40.0));
        assert_invariants(&set);
    }

    #[test]
    fn max_decrease_under_hard_clamp_caps() {
        let mut set = health_with(80.0, 100.0, RescalePolicy::HardClamp);
        set.apply(&ModificationRequest::set(AttributeKind::MaxHealth, 50.0, SRC))
            .unwrap();
        assert_eq!(set.value(AttributeKind::Health), Some(50.0));

        let changes = set
            .apply(&ModificationRequest::set(AttributeKind::MaxHealth, 120.0, SRC))
            .unwrap();
        assert_eq!(set.value(AttributeKind::Health), Some(50.0));
        assert_eq!(changes.len(), 1);
    }

    #[test]
    fn max_clamps_to_zero_and_drains_current() {
        let mut set = health(60.0, 100.0);
        set.apply(&ModificationRequest::add(AttributeKind::MaxHealth, -500.0, SRC))
            .unwrap();
        assert_eq!(set.value(AttributeKind::MaxHealth), Some(0.0));
        assert_eq!(set.value(AttributeKind::Health), Some(0.0));

        set.apply(&ModificationRequest::set(AttributeKind::MaxHealth, 30.0, SRC))
            .unwrap();
        assert_eq!(set.value(AttributeKind::Health), Some(30.0));
    }

    #[test]
    fn order_of_requests_matters() {
        let mut set = health(50.0, 100.0);
        set.apply(&ModificationRequest::add(AttributeKind::Health, -100.0, SRC))
            .unwrap();
        assert_eq!(set.value(AttributeKind::Health), Some(0.0));
        set.apply(&ModificationRequest::add(AttributeKind::Health, 100.0, SRC))
            .unwrap();
        assert_eq!(set.value(AttributeKind::Health), Some(100.0));
    }

    #[test]
    fn unknown_attribute_leaves_set_untouched() {
        let mut set = health(50.0, 100.0);
        let before = set.snapshot();

        let err = set
            .apply(&ModificationRequest::add(AttributeKind::Mana, 10.0, SRC))
            .unwrap_err();

        assert_eq!(err, ModifyError::unknown("mana"));
        assert_eq!(set.snapshot(), before);
    }

    #[test]
    fn non_finite_magnitudes_are_rejected() {
        let mut set = AttributeSet::from_defaults(&AttributeDefaults::default(), RescalePolicy::default());
        let before = set.snapshot();

        for magnitude in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            let err = set
                .apply(&ModificationRequest::add(AttributeKind::Stamina, magnitude, SRC))
                .unwrap_err();
            assert!(matches!(err, ModifyError::InvalidMagnitude { .. }));
        }

        // Finite magnitude, non-finite result.
        let err = set
            .apply(&ModificationRequest::multiply(AttributeKind::MaxMana, f64::MAX, SRC))
            .unwrap_err();
        assert!(matches!(err, ModifyError::InvalidMagnitude { target: AttributeKind::MaxMana, .. }));

        assert_eq!(set.snapshot(), before);
    }

    #[test]
    fn regen_rates_may_go_negative() {
        let mut set = health(50.0, 100.0);
        set.apply(&ModificationRequest::set(AttributeKind::HealthRegen, -2.5, SRC))
            .unwrap();
        assert_eq!(set.value(AttributeKind::HealthRegen), Some(-2.5));
        assert_invariants(&set);
    }

    #[test]
    fn base_follows_committed_value() {
        let mut set = health(50.0, 100.0);
        set.apply(&ModificationRequest::add(AttributeKind::Health, 5.0, SRC))
            .unwrap();
        let attribute = set.get(AttributeKind::Health).unwrap();
        assert_eq!(attribute.base(), 55.0);
        assert_eq!(attribute.current(), 55.0);
    }

    #[test]
    fn corrupted_values_are_re_clamped() {
        let mut set = health(50.0, 100.0);
        set.corrupt(AttributeKind::Health, f64::NAN);
        set.corrupt(AttributeKind::MaxHealth, -10.0);

        let changes = set.enforce_invariants();

        assert_eq!(set.value(AttributeKind::MaxHealth), Some(0.0));
        assert_eq!(set.value(AttributeKind::Health), Some(0.0));
        assert_eq!(changes.len(), 2);
        assert_invariants(&set);
    }

    #[test]
    fn change_undone_by_repair_emits_no_event() {
        // An infinite max lets the heal through, then the audit zeroes both.
        let mut set = health(0.0, 100.0);
        set.corrupt(AttributeKind::MaxHealth, f64::INFINITY);

        let changes = set
            .apply(&ModificationRequest::add(AttributeKind::Health, 30.0, SRC))
            .unwrap();

        assert_eq!(set.value(AttributeKind::Health), Some(0.0));
        assert_eq!(
            changes.as_slice(),
            &[ChangeEvent::new(AttributeKind::MaxHealth, f64::INFINITY, 0.0)]
        );
        assert_invariants(&set);
    }

    #[test]
    fn repeated_commit_folds_into_one_event() {
        let mut set = health(50.0, 100.0);
        let mut changes = ChangeEvents::new();

        set.commit(AttributeKind::Health, 70.0, &mut changes);
        set.commit(AttributeKind::Health, 60.0, &mut changes);
        assert_eq!(changes.as_slice(), &[ChangeEvent::new(AttributeKind::Health, 50.0, 60.0)]);

        set.commit(AttributeKind::Health, 50.0, &mut changes);
        assert!(changes.is_empty());
    }

    #[test]
    fn apply_repairs_unrelated_corruption() {
        let mut set = AttributeSet::from_defaults(&AttributeDefaults::default(), RescalePolicy::default());
        set.corrupt(AttributeKind::Stamina, 500.0);

        let changes = set
            .apply(&ModificationRequest::add(AttributeKind::Mana, -5.0, SRC))
            .unwrap();

        assert_eq!(set.value(AttributeKind::Stamina), Some(100.0));
        assert_eq!(changes.len(), 2);
        assert_invariants(&set);
    }

    #[test]
    fn many_requests_keep_invariants() {
        let mut set = AttributeSet::from_defaults(&AttributeDefaults::default(), RescalePolicy::default());
        let mut value = 17.0_f64;
        for step in 0..500_u32 {
            value = (value * 7.3 + f64::from(step)) % 250.0 - 125.0;
            let target = AttributeKind::ALL[(step as usize) % AttributeKind::COUNT];
            let request = match step % 3 {
                0 => ModificationRequest::add(target, value, SRC),
                1 => ModificationRequest::set(target, value, SRC),
                _ => ModificationRequest::multiply(target, value / 50.0, SRC),
            };
            set.apply(&request).unwrap();
            assert_invariants(&set);
        }
    }

    #[test]
    fn builder_replaces_duplicate_family() {
        let set = AttributeSet::builder()
            .family(StatFamily::Mana, FamilyDefaults::full(10.0, 0.0))
            .family(StatFamily::Mana, FamilyDefaults::full(20.0, 1.0))
            .build();

        assert_eq!(set.value(AttributeKind::MaxMana), Some(20.0));
        assert_eq!(set.iter().count(), 3);
        assert!(!set.owns(AttributeKind::Health));
    }
}
