//! Attribute configuration constants and tunable parameters.

use core::time::Duration;

use crate::attribute::StatFamily;
use crate::pipeline::RescalePolicy;

/// Tunables shared by every character's attribute pipeline.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct VitalsConfig {
    /// Fixed regen cadence in milliseconds.
    pub regen_interval_ms: u64,
    /// How a current value follows a change of its max.
    pub rescale_policy: RescalePolicy,
    /// Values a character spawns with.
    pub defaults: AttributeDefaults,
}

impl VitalsConfig {
    // ===== runtime-tunable defaults =====
    pub const DEFAULT_REGEN_INTERVAL_MS: u64 = 1_000;
    /// Shorter intervals are raised to this value.
    pub const MIN_REGEN_INTERVAL_MS: u64 = 1;

    pub fn new() -> Self {
        Self {
            regen_interval_ms: Self::DEFAULT_REGEN_INTERVAL_MS,
            rescale_policy: RescalePolicy::default(),
            defaults: AttributeDefaults::default(),
        }
    }

    pub fn with_regen_interval_ms(mut self, interval_ms: u64) -> Self {
        self.regen_interval_ms = interval_ms;
        self
    }

    pub fn with_rescale_policy(mut self, policy: RescalePolicy) -> Self {
        self.rescale_policy = policy;
        self
    }

    pub fn with_defaults(mut self, defaults: AttributeDefaults) -> Self {
        self.defaults = defaults;
        self
    }

    pub fn regen_interval(&self) -> Duration {
        Duration::from_millis(self.regen_interval_ms.max(Self::MIN_REGEN_INTERVAL_MS))
    }
}

impl Default for VitalsConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Spawn values for one stat family.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FamilyDefaults {
    /// Starting value; `None` spawns full.
    #[cfg_attr(feature = "serde", serde(default))]
    pub current: Option<f64>,
    pub max: f64,
    #[cfg_attr(feature = "serde", serde(default))]
    pub regen: f64,
}

impl FamilyDefaults {
    pub const fn full(max: f64, regen: f64) -> Self {
        Self {
            current: None,
            max,
            regen,
        }
    }

    pub const fn with_current(mut self, current: f64) -> Self {
        self.current = Some(current);
        self
    }

    /// Resolves `(current, max, regen)` so that every value is finite and
    /// `0 <= current <= max`.
    pub fn sanitized(&self) -> (f64, f64, f64) {
        let max = finite_or_zero(self.max).max(0.0);
        let current = self
            .current
            .map(finite_or_zero)
            .unwrap_or(max)
            .max(0.0)
            .min(max);
        let regen = finite_or_zero(self.regen);
        (current, max, regen)
    }
}

fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() { value } else { 0.0 }
}

/// Spawn values for every stat family. A missing family is not owned.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct AttributeDefaults {
    pub health: Option<FamilyDefaults>,
    pub mana: Option<FamilyDefaults>,
    pub stamina: Option<FamilyDefaults>,
}

impl AttributeDefaults {
    /// No families at all.
    pub const fn empty() -> Self {
        Self {
            health: None,
            mana: None,
            stamina: None,
        }
    }

    pub fn family(&self, family: StatFamily) -> Option<&FamilyDefaults> {
        match family {
            StatFamily::Health => self.health.as_ref(),
            StatFamily::Mana => self.mana.as_ref(),
            StatFamily::Stamina => self.stamina.as_ref(),
        }
    }

    pub fn set_family(&mut self, family: StatFamily, defaults: FamilyDefaults) {
        let slot = match family {
            StatFamily::Health => &mut self.health,
            StatFamily::Mana => &mut self.mana,
            StatFamily::Stamina => &mut self.stamina,
        };
        *slot = Some(defaults);
    }
}

impl Default for AttributeDefaults {
    fn default() -> Self {
        Self {
            health: Some(FamilyDefaults::full(100.0, 1.0)),
            mana: Some(FamilyDefaults::full(50.0, 2.0)),
            stamina: Some(FamilyDefaults::full(100.0, 10.0)),
        }
    }
}
