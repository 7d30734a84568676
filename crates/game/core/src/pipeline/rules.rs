//! Clamp and derive rules, one row per attribute kind.
//!
//! Adding a stat family means adding its enum variants and three rows here;
//! the pipeline itself has no per-stat code.

use crate::attribute::AttributeKind;

/// Range a committed value must fall in.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClampRule {
    /// `[0, current value of the named max]`.
    BoundedBy(AttributeKind),
    /// `[0, +inf)`.
    NonNegative,
    /// Any finite value.
    Unbounded,
}

impl ClampRule {
    /// Clamps `value` into this rule's range, given the bound (if any).
    ///
    /// A missing or negative bound behaves as zero.
    pub fn clamp(self, value: f64, bound: Option<f64>) -> f64 {
        match self {
            Self::BoundedBy(_) => value.max(0.0).min(bound.unwrap_or(0.0).max(0.0)),
            Self::NonNegative => value.max(0.0),
            Self::Unbounded => value,
        }
    }
}

/// Full rule row for one attribute kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AttributeRule {
    pub kind: AttributeKind,
    pub clamp: ClampRule,
    /// Attribute re-derived after this one changes (a max's current value).
    pub dependent: Option<AttributeKind>,
}

impl AttributeRule {
    const fn current(kind: AttributeKind, max: AttributeKind) -> Self {
        Self {
            kind,
            clamp: ClampRule::BoundedBy(max),
            dependent: None,
        }
    }

    const fn max(kind: AttributeKind, current: AttributeKind) -> Self {
        Self {
            kind,
            clamp: ClampRule::NonNegative,
            dependent: Some(current),
        }
    }

    const fn regen(kind: AttributeKind) -> Self {
        Self {
            kind,
            clamp: ClampRule::Unbounded,
            dependent: None,
        }
    }

    /// Rule row for `kind`.
    pub fn of(kind: AttributeKind) -> &'static AttributeRule {
        &RULES[kind.index()]
    }

    /// Bound attribute consulted by the clamp, if any.
    pub const fn bound(&self) -> Option<AttributeKind> {
        match self.clamp {
            ClampRule::BoundedBy(max) => Some(max),
            _ => None,
        }
    }
}

use AttributeKind as K;

/// Indexed by [`AttributeKind::index`].
static RULES: [AttributeRule; AttributeKind::COUNT] = [
    AttributeRule::current(K::Health, K::MaxHealth),
    AttributeRule::max(K::MaxHealth, K::Health),
    AttributeRule::regen(K::HealthRegen),
    AttributeRule::current(K::Mana, K::MaxMana),
    AttributeRule::max(K::MaxMana, K::Mana),
    AttributeRule::regen(K::ManaRegen),
    AttributeRule::current(K::Stamina, K::MaxStamina),
    AttributeRule::max(K::MaxStamina, K::Stamina),
    AttributeRule::regen(K::StaminaRegen),
];

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attribute::{AttributeRole, StatFamily};

    #[test]
    fn table_rows_line_up_with_kinds() {
        for kind in AttributeKind::ALL {
            assert_eq!(AttributeRule::of(kind).kind, kind);
        }
    }

    #[test]
    fn table_encodes_family_relationships() {
        for family in StatFamily::ALL {
            let current = AttributeRule::of(family.current());
            let max = AttributeRule::of(family.max());
            let regen = AttributeRule::of(family.regen());

            assert_eq!(current.bound(), Some(family.max()));
            assert_eq!(max.dependent, Some(family.current()));
            assert_eq!(max.clamp, ClampRule::NonNegative);
            assert_eq!(regen.clamp, ClampRule::Unbounded);
            assert_eq!(family.regen().role(), AttributeRole::Regen);
        }
    }

    #[test]
    fn clamp_ranges() {
        let bounded = ClampRule::BoundedBy(K::MaxMana);
        assert_eq!(bounded.clamp(120.0, Some(100.0)), 100.0);
        assert_eq!(bounded.clamp(-4.0, Some(100.0)), 0.0);
        assert_eq!(bounded.clamp(30.0, None), 0.0);
        assert_eq!(ClampRule::NonNegative.clamp(-1.0, None), 0.0);
        assert_eq!(ClampRule::Unbounded.clamp(-7.5, None), -7.5);
    }
}
