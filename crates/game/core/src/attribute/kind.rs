//! Attribute identity: which stat, which family, which role within the family.
//!
//! Every stat family is a triple `(current, max, regen)`. The triple shares a
//! clamp relationship: the current value is bounded by the max value, and the
//! regen rate feeds the current value on every regen tick.

use core::str::FromStr;

use crate::error::ModifyError;

/// Identifier of a single tracked attribute.
///
/// Parsing is case-insensitive snake_case (`"max_health"`, `"Health"`).
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    strum::Display,
    strum::EnumString,
    strum::AsRefStr,
    strum::EnumIter,
)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum AttributeKind {
    Health,
    MaxHealth,
    HealthRegen,
    Mana,
    MaxMana,
    ManaRegen,
    Stamina,
    MaxStamina,
    StaminaRegen,
}

impl AttributeKind {
    /// Number of attribute kinds.
    pub const COUNT: usize = 9;

    /// All kinds, in storage order.
    pub const ALL: [AttributeKind; Self::COUNT] = [
        Self::Health,
        Self::MaxHealth,
        Self::HealthRegen,
        Self::Mana,
        Self::MaxMana,
        Self::ManaRegen,
        Self::Stamina,
        Self::MaxStamina,
        Self::StaminaRegen,
    ];

    /// Storage slot of this kind inside an attribute set.
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Family this attribute belongs to.
    pub const fn family(self) -> StatFamily {
        match self {
            Self::Health | Self::MaxHealth | Self::HealthRegen => StatFamily::Health,
            Self::Mana | Self::MaxMana | Self::ManaRegen => StatFamily::Mana,
            Self::Stamina | Self::MaxStamina | Self::StaminaRegen => StatFamily::Stamina,
        }
    }

    /// Role of this attribute within its family.
    pub const fn role(self) -> AttributeRole {
        match self {
            Self::Health | Self::Mana | Self::Stamina => AttributeRole::Current,
            Self::MaxHealth | Self::MaxMana | Self::MaxStamina => AttributeRole::Max,
            Self::HealthRegen | Self::ManaRegen | Self::StaminaRegen => AttributeRole::Regen,
        }
    }

    /// Resolves an attribute from an external name.
    ///
    /// Unknown names fail with [`ModifyError::UnknownAttribute`], the same
    /// error an attribute set reports for a stat it does not own.
    pub fn parse(name: &str) -> Result<Self, ModifyError> {
        Self::from_str(name).map_err(|_| ModifyError::unknown(name))
    }
}

/// Role of an attribute inside its stat family.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, strum::Display)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[strum(serialize_all = "snake_case")]
pub enum AttributeRole {
    /// The live value (e.g. current Health).
    Current,
    /// Upper bound of the current value.
    Max,
    /// Change per second applied by the regen scheduler.
    Regen,
}

/// A `(current, max, regen)` triple.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum StatFamily {
    Health,
    Mana,
    Stamina,
}

impl StatFamily {
    pub const ALL: [StatFamily; 3] = [Self::Health, Self::Mana, Self::Stamina];

    pub const fn current(self) -> AttributeKind {
        match self {
            Self::Health => AttributeKind::Health,
            Self::Mana => AttributeKind::Mana,
            Self::Stamina => AttributeKind::Stamina,
        }
    }

    pub const fn max(self) -> AttributeKind {
        match self {
            Self::Health => AttributeKind::MaxHealth,
            Self::Mana => AttributeKind::MaxMana,
            Self::Stamina => AttributeKind::MaxStamina,
        }
    }

    pub const fn regen(self) -> AttributeKind {
        match self {
            Self::Health => AttributeKind::HealthRegen,
            Self::Mana => AttributeKind::ManaRegen,
            Self::Stamina => AttributeKind::StaminaRegen,
        }
    }

    /// The three members of this family, current first.
    pub const fn members(self) -> [AttributeKind; 3] {
        [self.current(), self.max(), self.regen()]
    }

    /// Flag for this family inside a [`StatFamilies`] set.
    pub const fn flag(self) -> StatFamilies {
        match self {
            Self::Health => StatFamilies::HEALTH,
            Self::Mana => StatFamilies::MANA,
            Self::Stamina => StatFamilies::STAMINA,
        }
    }
}

bitflags::bitflags! {
    /// Set of stat families owned by an attribute set.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
    pub struct StatFamilies: u8 {
        const HEALTH = 0b001;
        const MANA = 0b010;
        const STAMINA = 0b100;
    }
}

impl StatFamilies {
    /// Iterates the owned families in declaration order.
    pub fn families(self) -> impl Iterator<Item = StatFamily> {
        StatFamily::ALL
            .into_iter()
            .filter(move |family| self.contains(family.flag()))
    }

    pub fn owns(self, kind: AttributeKind) -> bool {
        self.contains(kind.family().flag())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn storage_order_matches_all() {
        for (index, kind) in AttributeKind::iter().enumerate() {
            assert_eq!(kind.index(), index);
            assert_eq!(AttributeKind::ALL[index], kind);
        }
        assert_eq!(AttributeKind::iter().count(), AttributeKind::COUNT);
    }

    #[test]
    fn families_round_trip_through_members() {
        for family in StatFamily::ALL {
            for kind in family.members() {
                assert_eq!(kind.family(), family);
            }
            assert_eq!(family.current().role(), AttributeRole::Current);
            assert_eq!(family.max().role(), AttributeRole::Max);
            assert_eq!(family.regen().role(), AttributeRole::Regen);
        }
    }

    #[test]
    fn parses_snake_case_names_case_insensitively() {
        assert_eq!(AttributeKind::parse("max_health").unwrap(), AttributeKind::MaxHealth);
        assert_eq!(AttributeKind::parse("Stamina_Regen").unwrap(), AttributeKind::StaminaRegen);
        assert_eq!(AttributeKind::MaxMana.to_string(), "max_mana");
    }

    #[test]
    fn unknown_name_is_unknown_attribute() {
        let err = AttributeKind::parse("armor").unwrap_err();
        assert!(matches!(err, ModifyError::UnknownAttribute { ref name } if name == "armor"));
    }

    #[test]
    fn partial_family_set_ownership() {
        let families = StatFamilies::HEALTH | StatFamilies::STAMINA;
        assert!(families.owns(AttributeKind::MaxHealth));
        assert!(!families.owns(AttributeKind::ManaRegen));
        let owned: Vec<_> = families.families().collect();
        assert_eq!(owned, vec![StatFamily::Health, StatFamily::Stamina]);
    }
}
