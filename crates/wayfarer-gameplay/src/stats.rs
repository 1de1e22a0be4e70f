//! Stat derivation.
//!
//! This module provides:
//! - Base stats (strength, intelligence, speed, dexterity)
//! - Bonus payloads carried by items and equipment sets
//! - Derived combat stats computed from base stats and equipment
//!
//! Derived stats are never edited by hand; they are always recomputed with
//! [`derive_stats`] whenever base stats or equipment change.

use crate::element::Element;
use crate::item::{Item, SetTable};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use wayfarer_common::SetId;

// ============================================================================
// Base Stats
// ============================================================================

/// A base stat name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatKind {
    /// Raises HP, attack and defense.
    #[serde(alias = "force")]
    Strength,
    /// Raises mana.
    Intelligence,
    /// Speed.
    #[serde(alias = "vitesse")]
    Speed,
    /// Dexterity.
    #[serde(alias = "dexterite")]
    Dexterity,
}

impl StatKind {
    /// All stats, in display order.
    pub const ALL: [StatKind; 4] = [
        Self::Strength,
        Self::Intelligence,
        Self::Speed,
        Self::Dexterity,
    ];
}

impl std::str::FromStr for StatKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "strength" | "str" => Ok(Self::Strength),
            "intelligence" | "int" => Ok(Self::Intelligence),
            "speed" | "spd" => Ok(Self::Speed),
            "dexterity" | "dex" => Ok(Self::Dexterity),
            other => Err(format!("unknown stat: {other}")),
        }
    }
}

/// The four base stats of a character.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BaseStats {
    /// Strength.
    pub strength: i32,
    /// Intelligence.
    pub intelligence: i32,
    /// Speed.
    pub speed: i32,
    /// Dexterity.
    pub dexterity: i32,
}

impl Default for BaseStats {
    fn default() -> Self {
        Self::uniform(1)
    }
}

impl BaseStats {
    /// Creates base stats with every stat at the same value.
    #[must_use]
    pub const fn uniform(value: i32) -> Self {
        Self {
            strength: value,
            intelligence: value,
            speed: value,
            dexterity: value,
        }
    }

    /// Set strength.
    #[must_use]
    pub const fn with_strength(mut self, value: i32) -> Self {
        self.strength = value;
        self
    }

    /// Set intelligence.
    #[must_use]
    pub const fn with_intelligence(mut self, value: i32) -> Self {
        self.intelligence = value;
        self
    }

    /// Get a stat by name.
    #[must_use]
    pub const fn get(&self, kind: StatKind) -> i32 {
        match kind {
            StatKind::Strength => self.strength,
            StatKind::Intelligence => self.intelligence,
            StatKind::Speed => self.speed,
            StatKind::Dexterity => self.dexterity,
        }
    }

    /// Add to a stat by name.
    pub fn add(&mut self, kind: StatKind, amount: i32) {
        let slot = match kind {
            StatKind::Strength => &mut self.strength,
            StatKind::Intelligence => &mut self.intelligence,
            StatKind::Speed => &mut self.speed,
            StatKind::Dexterity => &mut self.dexterity,
        };
        *slot += amount;
    }
}

// ============================================================================
// Bonuses
// ============================================================================

/// A passive effect granted by equipment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PassiveKind {
    /// Added to critical hit chance (0.0-1.0).
    CritChance,
    /// Added to evasion chance (0.0-1.0).
    Evasion,
    /// Added to armor penetration.
    ArmorPenetration,
}

/// Bonus payload carried by an item or a completed set.
///
/// Missing maps deserialize as empty and contribute nothing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Bonuses {
    /// Flat additions to base stats.
    pub stats: BTreeMap<StatKind, i32>,
    /// Passive effects.
    pub passives: BTreeMap<PassiveKind, f64>,
    /// Per-element resistances.
    pub resistances: BTreeMap<Element, f64>,
}

impl Bonuses {
    /// Adds a stat bonus.
    #[must_use]
    pub fn with_stat(mut self, kind: StatKind, amount: i32) -> Self {
        *self.stats.entry(kind).or_insert(0) += amount;
        self
    }

    /// Adds a passive effect.
    #[must_use]
    pub fn with_passive(mut self, kind: PassiveKind, amount: f64) -> Self {
        *self.passives.entry(kind).or_insert(0.0) += amount;
        self
    }

    /// Adds an elemental resistance.
    #[must_use]
    pub fn with_resistance(mut self, element: Element, amount: f64) -> Self {
        *self.resistances.entry(element).or_insert(0.0) += amount;
        self
    }

    /// Checks whether this payload contributes anything.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stats.is_empty() && self.passives.is_empty() && self.resistances.is_empty()
    }
}

/// Running totals while walking equipped items.
#[derive(Debug, Default)]
struct Accumulator {
    stats: BaseStats,
    passives: BTreeMap<PassiveKind, f64>,
    resistances: BTreeMap<Element, f64>,
}

impl Accumulator {
    fn apply(&mut self, bonuses: &Bonuses) {
        for (&kind, &amount) in &bonuses.stats {
            self.stats.add(kind, amount);
        }
        for (&kind, &amount) in &bonuses.passives {
            *self.passives.entry(kind).or_insert(0.0) += amount;
        }
        for (&element, &amount) in &bonuses.resistances {
            *self.resistances.entry(element).or_insert(0.0) += amount;
        }
    }

    fn passive(&self, kind: PassiveKind) -> f64 {
        self.passives.get(&kind).copied().unwrap_or(0.0)
    }
}

// ============================================================================
// Derived Stats
// ============================================================================

/// Base critical hit chance before equipment.
pub const BASE_CRIT_CHANCE: f64 = 0.05;

/// Combat statistics derived from base stats and equipment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DerivedStats {
    /// Base stats after item and set bonuses.
    pub effective: BaseStats,
    /// Maximum HP.
    pub max_hp: i32,
    /// Maximum mana.
    pub max_mana: i32,
    /// Attack damage before weapon and skill power.
    pub attack_damage: i32,
    /// Defense subtracted from incoming damage.
    pub defense: f64,
    /// Critical hit chance (0.0-1.0).
    pub crit_chance: f64,
    /// Evasion chance (0.0-1.0).
    pub evasion_chance: f64,
    /// Armor penetration.
    pub armor_penetration: f64,
    /// Per-element resistances.
    pub resistances: BTreeMap<Element, f64>,
}

impl DerivedStats {
    /// Resistance against an element (0.0 when none).
    #[must_use]
    pub fn resistance(&self, element: Element) -> f64 {
        self.resistances.get(&element).copied().unwrap_or(0.0)
    }
}

/// Computes derived stats from base stats, equipped items and set definitions.
///
/// Pure: the same inputs always give the same output. Callers clamp current
/// HP and mana to the new maxima afterwards.
#[must_use]
pub fn derive_stats(base: &BaseStats, equipped: &[&Item], sets: &SetTable) -> DerivedStats {
    let mut acc = Accumulator {
        stats: *base,
        ..Accumulator::default()
    };
    let mut set_pieces: BTreeMap<&SetId, usize> = BTreeMap::new();

    for item in equipped {
        acc.apply(&item.bonuses);
        if let Some(set_id) = &item.set {
            *set_pieces.entry(set_id).or_insert(0) += 1;
        }
    }

    for (set_id, count) in set_pieces {
        if let Some(set) = sets.get(set_id) {
            if !set.pieces.is_empty() && count == set.pieces.len() {
                acc.apply(&set.bonus);
            }
        }
    }

    let strength = acc.stats.strength;
    let intelligence = acc.stats.intelligence;

    DerivedStats {
        effective: acc.stats,
        max_hp: 100 + strength * 10,
        max_mana: 50 + intelligence * 5,
        attack_damage: 5 + strength * 2,
        defense: f64::from(strength) * 1.5,
        crit_chance: BASE_CRIT_CHANCE + acc.passive(PassiveKind::CritChance),
        evasion_chance: acc.passive(PassiveKind::Evasion),
        armor_penetration: acc.passive(PassiveKind::ArmorPenetration),
        resistances: acc.resistances,
    }
}
