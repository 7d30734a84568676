//! Value copies of an attribute set.

use sha2::{Digest, Sha256};

use super::{Attribute, AttributeKind};

/// One attribute inside a snapshot.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SnapshotEntry {
    pub kind: AttributeKind,
    pub current: f64,
    pub base: f64,
}

impl From<&Attribute> for SnapshotEntry {
    fn from(attribute: &Attribute) -> Self {
        Self {
            kind: attribute.kind(),
            current: attribute.current(),
            base: attribute.base(),
        }
    }
}

/// Every owned attribute, in storage order.
///
/// Snapshots compare by value, which makes "nothing changed" checks a single
/// `assert_eq!` before and after a request.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AttributeSnapshot {
    entries: Vec<SnapshotEntry>,
}

impl AttributeSnapshot {
    pub(crate) fn from_entries(entries: Vec<SnapshotEntry>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[SnapshotEntry] {
        &self.entries
    }

    pub fn get(&self, kind: AttributeKind) -> Option<&SnapshotEntry> {
        self.entries.iter().find(|entry| entry.kind == kind)
    }

    pub fn current(&self, kind: AttributeKind) -> Option<f64> {
        self.get(kind).map(|entry| entry.current)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Overwrites the current value of `kind`, returning the previous value.
    ///
    /// Used by observer-side mirrors; authoritative sets never go through here.
    pub fn set_current(&mut self, kind: AttributeKind, value: f64) -> Option<f64> {
        let entry = self.entries.iter_mut().find(|entry| entry.kind == kind)?;
        let previous = entry.current;
        entry.current = value;
        entry.base = value;
        Some(previous)
    }

    /// SHA-256 over `(kind, current, base)` of every entry.
    ///
    /// Two snapshots with the same digest hold bit-identical values.
    pub fn digest(&self) -> [u8; 32] {
        let mut hasher = Sha256::new();
        for entry in &self.entries {
            hasher.update([entry.kind.index() as u8]);
            hasher.update(entry.current.to_le_bytes());
            hasher.update(entry.base.to_le_bytes());
        }
        hasher.finalize().into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> AttributeSnapshot {
        AttributeSnapshot::from_entries(vec![
            SnapshotEntry::from(&Attribute::new(AttributeKind::Health, 50.0)),
            SnapshotEntry::from(&Attribute::new(AttributeKind::MaxHealth, 100.0)),
        ])
    }

    #[test]
    fn digest_tracks_values() {
        let a = sample();
        let mut b = sample();
        assert_eq!(hex::encode(a.digest()), hex::encode(b.digest()));

        assert_eq!(b.set_current(AttributeKind::Health, 49.0), Some(50.0));
        assert_ne!(a.digest(), b.digest());
    }

    #[test]
    fn lookup_of_missing_kind_is_none() {
        let mut snapshot = sample();
        assert_eq!(snapshot.current(AttributeKind::MaxHealth), Some(100.0));
        assert_eq!(snapshot.current(AttributeKind::Mana), None);
        assert_eq!(snapshot.set_current(AttributeKind::Mana, 1.0), None);
    }
}
