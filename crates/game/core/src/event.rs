//! Change notifications emitted after commit.

use crate::attribute::AttributeKind;

/// "attribute X changed from old to new".
///
/// Emitted exactly once per attribute whose committed value differs from its
/// value before the request, never for a no-op commit.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ChangeEvent {
    pub attribute: AttributeKind,
    pub old_value: f64,
    pub new_value: f64,
}

impl ChangeEvent {
    pub const fn new(attribute: AttributeKind, old_value: f64, new_value: f64) -> Self {
        Self {
            attribute,
            old_value,
            new_value,
        }
    }

    /// Signed change, `new - old`.
    pub fn delta(&self) -> f64 {
        self.new_value - self.old_value
    }
}

impl core::fmt::Display for ChangeEvent {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(
            f,
            "{}: {} -> {}",
            self.attribute, self.old_value, self.new_value
        )
    }
}
