//! Two-phase modification pipeline.
//!
//! Every proposed value passes through the same stages:
//! `op (Override/Add/Multiply) → pre_change clamp → commit → post_effect derive → audit`
//!
//! The pipeline only computes values. Committing and event bookkeeping belong
//! to [`AttributeSet`], which owns exactly one pipeline.

pub mod rules;

pub use rules::{AttributeRule, ClampRule};

use crate::attribute::{AttributeKind, AttributeRole, AttributeSet};
use crate::error::InvariantViolation;

/// How a current value follows a change of its max.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, strum::Display, strum::EnumString,
)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum RescalePolicy {
    /// Keep the fullness ratio: `current * new_max / old_max`.
    #[default]
    Proportional,
    /// Leave current alone unless it now exceeds the max.
    HardClamp,
}

/// Clamp/derive logic for one attribute set.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ModificationPipeline {
    policy: RescalePolicy,
}

impl ModificationPipeline {
    pub const fn new(policy: RescalePolicy) -> Self {
        Self { policy }
    }

    pub const fn policy(&self) -> RescalePolicy {
        self.policy
    }

    /// Phase 1: clamps a proposed raw value before it is committed.
    ///
    /// Current values are bounded by the present value of their max; max
    /// values are bounded below by zero; regen rates pass through.
    pub fn pre_change(&self, set: &AttributeSet, kind: AttributeKind, proposed: f64) -> f64 {
        let rule = AttributeRule::of(kind);
        let bound = rule.bound().and_then(|max| set.value(max));
        rule.clamp.clamp(proposed, bound)
    }

    /// Phase 2: re-derives the dependent of `kind` after `kind` committed a
    /// change from `old` to `new`.
    ///
    /// Returns the dependent attribute and its new value, or `None` when
    /// nothing depends on `kind` or the value did not change.
    pub fn post_effect(
        &self,
        set: &AttributeSet,
        kind: AttributeKind,
        old: f64,
        new: f64,
    ) -> Option<(AttributeKind, f64)> {
        if old == new {
            return None;
        }
        let dependent = AttributeRule::of(kind).dependent?;
        let current = set.value(dependent)?;

        let derived = if old > 0.0 {
            match self.policy {
                RescalePolicy::Proportional => current * (new / old),
                RescalePolicy::HardClamp => current.min(new),
            }
        } else {
            // An empty max refills to full.
            new
        };

        let derived = AttributeRule::of(dependent).clamp.clamp(derived, Some(new));
        Some((dependent, derived))
    }

    /// Checks every owned family against the set invariants.
    ///
    /// Returned violations are ordered so that max corrections precede the
    /// current-value corrections that depend on them.
    pub fn audit(&self, set: &AttributeSet) -> Vec<InvariantViolation> {
        let mut violations = Vec::new();

        for family in set.families().families() {
            let mut corrected_max = None;
            for kind in [family.max(), family.current(), family.regen()] {
                let Some(found) = set.value(kind) else {
                    continue;
                };

                let corrected = match kind.role() {
                    AttributeRole::Max => sanitize(found).max(0.0),
                    AttributeRole::Current => {
                        let max = corrected_max.or(set.value(family.max())).unwrap_or(0.0);
                        sanitize(found).max(0.0).min(max)
                    }
                    AttributeRole::Regen => sanitize(found),
                };

                if kind.role() == AttributeRole::Max {
                    corrected_max = Some(corrected);
                }

                if corrected != found {
                    violations.push(InvariantViolation {
                        attribute: kind,
                        found,
                        corrected,
                    });
                }
            }
        }

        violations
    }
}

fn sanitize(value: f64) -> f64 {
    if value.is_finite() { value } else { 0.0 }
}
