//! Element matrix.
//!
//! Every attack carries an element and every combatant has one. The matrix is
//! directional: Fire is strong against Earth, but Earth attacking Fire only
//! deals half damage because Fire appears in Earth's weak list.
//!
//! | Attacker  | Strong against | Weak against |
//! |-----------|----------------|--------------|
//! | Fire      | Earth          | Water        |
//! | Water     | Fire           | Lightning    |
//! | Earth     | Lightning      | Fire         |
//! | Lightning | Water          | Earth        |
//! | Poison    | Water          | Earth        |
//! | Neutral   | -              | -            |

use serde::{Deserialize, Serialize};

/// Multiplier applied when the defender is in the attack element's strong list.
pub const STRONG_MULTIPLIER: f64 = 1.5;

/// Multiplier applied when the defender is in the attack element's weak list.
pub const WEAK_MULTIPLIER: f64 = 0.5;

/// Damage-type tag governing the strong/weak table.
///
/// Data tables may also use the French tags
/// (`feu`, `eau`, `terre`, `foudre`, `neutre`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Element {
    /// Fire.
    #[serde(alias = "feu")]
    Fire,
    /// Water.
    #[serde(alias = "eau")]
    Water,
    /// Earth.
    #[serde(alias = "terre")]
    Earth,
    /// Lightning.
    #[serde(alias = "foudre")]
    Lightning,
    /// Poison.
    Poison,
    /// No element.
    #[default]
    #[serde(alias = "neutre")]
    Neutral,
}

impl Element {
    /// All elements, in table order.
    pub const ALL: [Element; 6] = [
        Self::Fire,
        Self::Water,
        Self::Earth,
        Self::Lightning,
        Self::Poison,
        Self::Neutral,
    ];

    /// Elements this element deals increased damage to.
    #[must_use]
    pub const fn strong_against(self) -> &'static [Element] {
        match self {
            Self::Fire => &[Self::Earth],
            Self::Water => &[Self::Fire],
            Self::Earth => &[Self::Lightning],
            Self::Lightning | Self::Poison => &[Self::Water],
            Self::Neutral => &[],
        }
    }

    /// Elements this element deals reduced damage to.
    #[must_use]
    pub const fn weak_against(self) -> &'static [Element] {
        match self {
            Self::Fire => &[Self::Water],
            Self::Water => &[Self::Lightning],
            Self::Earth => &[Self::Fire],
            Self::Lightning | Self::Poison => &[Self::Earth],
            Self::Neutral => &[],
        }
    }

    /// Looks up how an attack of this element fares against `defender`.
    #[must_use]
    pub fn effectiveness_against(self, defender: Element) -> Effectiveness {
        if self.strong_against().contains(&defender) {
            Effectiveness::Strong
        } else if self.weak_against().contains(&defender) {
            Effectiveness::Weak
        } else {
            Effectiveness::Normal
        }
    }

    /// Display name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Fire => "Fire",
            Self::Water => "Water",
            Self::Earth => "Earth",
            Self::Lightning => "Lightning",
            Self::Poison => "Poison",
            Self::Neutral => "Neutral",
        }
    }
}

impl std::fmt::Display for Element {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Result of an element matrix lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Effectiveness {
    /// Defender is in the strong list.
    Strong,
    /// Defender is in the weak list.
    Weak,
    /// Neither.
    Normal,
}

impl Effectiveness {
    /// Damage multiplier for this outcome.
    #[must_use]
    pub const fn multiplier(self) -> f64 {
        match self {
            Self::Strong => STRONG_MULTIPLIER,
            Self::Weak => WEAK_MULTIPLIER,
            Self::Normal => 1.0,
        }
    }

    /// Message shown to the player, if any.
    #[must_use]
    pub const fn message(self) -> Option<&'static str> {
        match self {
            Self::Strong => Some("It's super effective!"),
            Self::Weak => Some("It's not very effective..."),
            Self::Normal => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fire_beats_earth() {
        let eff = Element::Fire.effectiveness_against(Element::Earth);
        assert_eq!(eff, Effectiveness::Strong);
        assert!((eff.multiplier() - 1.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_earth_into_fire_is_halved() {
        let eff = Element::Earth.effectiveness_against(Element::Fire);
        assert_eq!(eff, Effectiveness::Weak);
        assert!((eff.multiplier() - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_neutral_is_always_normal() {
        for defender in Element::ALL {
            assert_eq!(
                Element::Neutral.effectiveness_against(defender),
                Effectiveness::Normal
            );
        }
    }

    #[test]
    fn test_poison_lists() {
        assert_eq!(Element::Poison.strong_against(), &[Element::Water]);
        assert_eq!(Element::Poison.weak_against(), &[Element::Earth]);
        assert_eq!(Element::Water.strong_against(), &[Element::Fire]);
    }

    #[test]
    fn test_no_element_is_both_strong_and_weak() {
        for attacker in Element::ALL {
            for strong in attacker.strong_against() {
                assert!(!attacker.weak_against().contains(strong));
            }
        }
    }

    #[test]
    fn test_french_tags_deserialize() {
        let earth: Element = serde_json::from_str("\"terre\"").expect("terre parses");
        let fire: Element = serde_json::from_str("\"feu\"").expect("feu parses");
        assert_eq!(earth, Element::Earth);
        assert_eq!(fire, Element::Fire);
    }
}
