//! Damage resolution.
//!
//! One exchange goes through three steps:
//! 1. Element matrix lookup gives the multiplier (1.5, 0.5 or 1.0)
//! 2. Raw damage is `max(0, power * multiplier - defense)`
//! 3. A percentage roll under `crit_chance * 100` multiplies by the crit factor
//!
//! The resolver is side-effect free; callers apply the damage.

use crate::character::Character;
use crate::element::Element;
use crate::item::{EquipSlot, ItemCatalog, ItemKind};
use crate::rng::RandomSource;
use serde::{Deserialize, Serialize};

/// Critical multiplier used when the attacker has no crit damage of its own.
pub const DEFAULT_CRIT_MULTIPLIER: f64 = 1.5;

/// Anything that can attack or be attacked.
pub trait Combatant {
    /// Name shown in combat messages.
    fn name(&self) -> &str;

    /// Element of the combatant itself (used when defending).
    fn element(&self) -> Element;

    /// Defense subtracted from incoming damage.
    fn defense(&self) -> f64;

    /// Critical hit chance (0.0-1.0).
    fn crit_chance(&self) -> f64 {
        0.0
    }

    /// Critical damage multiplier, if the combatant has its own.
    fn crit_damage(&self) -> Option<f64> {
        None
    }
}

/// Result of a single damage resolution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DamageOutcome {
    /// Final damage, rounded and never negative.
    pub damage: u32,
    /// Element multiplier that was applied.
    pub multiplier: f64,
    /// Effectiveness and critical messages (empty when there is nothing to say).
    pub message: String,
    /// Whether the roll was a critical hit.
    pub is_critical: bool,
}

/// Resolves damage between two combatants.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DamageResolver {
    critical_multiplier: f64,
}

impl Default for DamageResolver {
    fn default() -> Self {
        Self::new(DEFAULT_CRIT_MULTIPLIER)
    }
}

impl DamageResolver {
    /// Creates a resolver with the fallback critical multiplier.
    #[must_use]
    pub const fn new(critical_multiplier: f64) -> Self {
        Self {
            critical_multiplier,
        }
    }

    /// Fallback critical multiplier.
    #[must_use]
    pub const fn critical_multiplier(&self) -> f64 {
        self.critical_multiplier
    }

    /// Computes the damage `attacker` deals to `defender`.
    ///
    /// Draws exactly one roll from `rng`.
    pub fn resolve(
        &self,
        attacker: &dyn Combatant,
        defender: &dyn Combatant,
        base_power: f64,
        element: Element,
        rng: &mut dyn RandomSource,
    ) -> DamageOutcome {
        let effectiveness = element.effectiveness_against(defender.element());
        let multiplier = effectiveness.multiplier();
        let mut message = effectiveness.message().unwrap_or_default().to_string();

        let mut raw = (base_power * multiplier - defender.defense()).max(0.0);

        let roll = rng.roll_percent();
        let is_critical = roll < attacker.crit_chance() * 100.0;
        if is_critical {
            raw *= attacker.crit_damage().unwrap_or(self.critical_multiplier);
            if !message.is_empty() {
                message.push(' ');
            }
            message.push_str("Critical hit!");
        }

        DamageOutcome {
            damage: raw.round().max(0.0) as u32,
            multiplier,
            message,
            is_critical,
        }
    }
}

/// Resolves damage with the default critical multiplier.
pub fn resolve_damage(
    attacker: &dyn Combatant,
    defender: &dyn Combatant,
    base_power: f64,
    element: Element,
    rng: &mut dyn RandomSource,
) -> DamageOutcome {
    DamageResolver::default().resolve(attacker, defender, base_power, element, rng)
}

// ============================================================================
// Player view
// ============================================================================

/// A character together with its resolved equipment, as seen by combat.
#[derive(Debug, Clone, Copy)]
pub struct PlayerCombatant<'a> {
    character: &'a Character,
    weapon_attack: i32,
    weapon_element: Option<Element>,
    armor_defense: i32,
    armor_element: Option<Element>,
}

impl<'a> PlayerCombatant<'a> {
    /// Resolves the character's equipment through the catalog.
    #[must_use]
    pub fn new(character: &'a Character, catalog: &ItemCatalog) -> Self {
        let weapon = catalog.equipped(&character.equipment, EquipSlot::Weapon);
        let armor = catalog.equipped(&character.equipment, EquipSlot::Armor);
        Self {
            character,
            weapon_attack: weapon.map_or(0, |item| item.kind.power()),
            weapon_element: weapon.and_then(|item| item.element),
            armor_defense: armor.map_or(0, |item| match item.kind {
                ItemKind::Armor { defense } => defense,
                _ => 0,
            }),
            armor_element: armor.and_then(|item| item.element),
        }
    }

    /// Base power of an attack with the given bonus power.
    #[must_use]
    pub fn attack_power(&self, skill_power: i32) -> f64 {
        f64::from(self.character.stats.attack_damage + self.weapon_attack + skill_power)
    }

    /// Element of a basic attack (the weapon's element, if any).
    #[must_use]
    pub fn weapon_element(&self) -> Element {
        self.weapon_element.unwrap_or_default()
    }
}

impl Combatant for PlayerCombatant<'_> {
    fn name(&self) -> &str {
        &self.character.name
    }

    fn element(&self) -> Element {
        self.armor_element.unwrap_or_default()
    }

    fn defense(&self) -> f64 {
        self.character.stats.defense + f64::from(self.armor_defense)
    }

    fn crit_chance(&self) -> f64 {
        self.character.stats.crit_chance
    }
}
