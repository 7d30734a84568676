//! Modification requests submitted by effect sources.
//!
//! A request is transient: an effect source builds it, the attribute set
//! consumes it, and nothing retains it afterwards.

pub mod queue;

pub use queue::{Pending, RequestQueue, Ticket, Tick};

use crate::attribute::AttributeKind;
use crate::error::ModifyError;

/// Opaque handle of the effect that issued a request.
///
/// Handles are only compared, never interpreted. Their ordering breaks ties
/// between requests that arrive on the same tick.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EffectHandle(pub u64);

impl EffectHandle {
    /// Source used for requests synthesized by the regen scheduler.
    pub const REGEN: EffectHandle = EffectHandle(u64::MAX);
}

impl core::fmt::Display for EffectHandle {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        if *self == Self::REGEN {
            f.write_str("effect#regen")
        } else {
            write!(f, "effect#{}", self.0)
        }
    }
}

/// Arithmetic applied to the attribute's raw value before clamping.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, strum::Display, strum::EnumString)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum ModOp {
    Override,
    Add,
    Multiply,
}

impl ModOp {
    /// Raw (unclamped) result of applying `magnitude` to `value`.
    pub fn apply(self, value: f64, magnitude: f64) -> f64 {
        match self {
            Self::Override => magnitude,
            Self::Add => value + magnitude,
            Self::Multiply => value * magnitude,
        }
    }
}

/// A single proposed change to one attribute.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ModificationRequest {
    pub target: AttributeKind,
    pub op: ModOp,
    pub magnitude: f64,
    pub source: EffectHandle,
}

impl ModificationRequest {
    pub const fn new(
        target: AttributeKind,
        op: ModOp,
        magnitude: f64,
        source: EffectHandle,
    ) -> Self {
        Self {
            target,
            op,
            magnitude,
            source,
        }
    }

    pub const fn set(target: AttributeKind, value: f64, source: EffectHandle) -> Self {
        Self::new(target, ModOp::Override, value, source)
    }

    pub const fn add(target: AttributeKind, delta: f64, source: EffectHandle) -> Self {
        Self::new(target, ModOp::Add, delta, source)
    }

    pub const fn multiply(target: AttributeKind, factor: f64, source: EffectHandle) -> Self {
        Self::new(target, ModOp::Multiply, factor, source)
    }

    /// Builds a request whose target arrives as a name, e.g. from data files
    /// or an ability subsystem.
    pub fn named(
        name: &str,
        op: ModOp,
        magnitude: f64,
        source: EffectHandle,
    ) -> Result<Self, ModifyError> {
        let target = AttributeKind::parse(name)?;
        Ok(Self::new(target, op, magnitude, source))
    }
}
