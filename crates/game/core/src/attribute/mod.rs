//! Attribute data model.
//!
//! # Layout
//!
//! ```text
//! [ Attribute (leaf) ]   one stat: current + base value
//!      ↓
//! [ AttributeSet ]       owned families, each a (current, max, regen) triple
//!      ↓
//! [ AttributeSnapshot ]  value copy for observers, diagnostics, replication checks
//! ```
//!
//! Attributes are mutated only through [`AttributeSet::apply`], which routes
//! every change through the modification pipeline.

pub mod kind;
pub mod set;
pub mod snapshot;

pub use kind::{AttributeKind, AttributeRole, StatFamilies, StatFamily};
pub use set::{AttributeSet, AttributeSetBuilder, ChangeEvents};
pub use snapshot::{AttributeSnapshot, SnapshotEntry};

/// A single tracked numeric stat.
///
/// `current` is the live value. `base` is the permanent value that
/// instantaneous effects write through to; every request in this system is
/// instantaneous, so the two move together on commit.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Attribute {
    kind: AttributeKind,
    current: f64,
    base: f64,
}

impl Attribute {
    pub const fn new(kind: AttributeKind, value: f64) -> Self {
        Self {
            kind,
            current: value,
            base: value,
        }
    }

    pub const fn kind(&self) -> AttributeKind {
        self.kind
    }

    pub const fn current(&self) -> f64 {
        self.current
    }

    pub const fn base(&self) -> f64 {
        self.base
    }

    /// Stores a value. No validation happens here; callers are the pipeline.
    pub(crate) fn set_current(&mut self, value: f64) {
        self.current = value;
        self.base = value;
    }
}
