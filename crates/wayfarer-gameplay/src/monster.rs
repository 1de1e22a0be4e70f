//! Monster templates and spawned instances.

use crate::damage::Combatant;
use crate::element::Element;
use ahash::AHashMap;
use serde::{Deserialize, Serialize};
use wayfarer_common::{CoreError, CoreResult, MonsterKey, ReferenceKind};

/// Per-level growth applied when spawning a scaled monster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScalingRates {
    /// HP per level
    pub hp: i32,
    /// Attack per level
    pub attack: i32,
    /// Defense per level
    pub defense: i32,
    /// Experience reward per level
    pub experience: u64,
    /// Gold reward per level
    pub gold: u64,
}

impl ScalingRates {
    /// Growth used by dungeon scaling.
    pub const STANDARD: Self = Self {
        hp: 5,
        attack: 2,
        defense: 1,
        experience: 10,
        gold: 5,
    };
}

/// A monster definition in the bestiary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonsterTemplate {
    /// Bestiary key
    pub key: MonsterKey,
    /// Display name
    pub name: String,
    /// Element
    #[serde(default)]
    pub element: Element,
    /// Hit points
    pub hp: i32,
    /// Attack power
    pub attack: i32,
    /// Defense
    #[serde(default)]
    pub defense: i32,
    /// Experience reward
    #[serde(default)]
    pub experience: u64,
    /// Gold reward
    #[serde(default)]
    pub gold: u64,
    /// Critical hit chance (0.0-1.0)
    #[serde(default)]
    pub crit_chance: f64,
    /// Tutorial entities never scale
    #[serde(default)]
    pub tutorial: bool,
}

impl MonsterTemplate {
    /// Creates a template with no rewards.
    #[must_use]
    pub fn new(key: impl Into<MonsterKey>, name: impl Into<String>, hp: i32, attack: i32) -> Self {
        Self {
            key: key.into(),
            name: name.into(),
            element: Element::Neutral,
            hp,
            attack,
            defense: 0,
            experience: 0,
            gold: 0,
            crit_chance: 0.0,
            tutorial: false,
        }
    }

    /// Sets the element.
    #[must_use]
    pub const fn with_element(mut self, element: Element) -> Self {
        self.element = element;
        self
    }

    /// Sets defense.
    #[must_use]
    pub const fn with_defense(mut self, defense: i32) -> Self {
        self.defense = defense;
        self
    }

    /// Sets experience and gold rewards.
    #[must_use]
    pub const fn with_rewards(mut self, experience: u64, gold: u64) -> Self {
        self.experience = experience;
        self.gold = gold;
        self
    }

    /// Marks the template as a tutorial entity.
    #[must_use]
    pub const fn tutorial(mut self) -> Self {
        self.tutorial = true;
        self
    }

    /// Spawns a fresh instance scaled by `level_factor`.
    ///
    /// Tutorial templates ignore the factor.
    #[must_use]
    pub fn spawn(&self, level_factor: u32, rates: ScalingRates) -> Monster {
        let factor = if self.tutorial { 0 } else { level_factor };
        let f = i32::try_from(factor).unwrap_or(i32::MAX);
        let hp = self.hp.saturating_add(f.saturating_mul(rates.hp));
        Monster {
            key: self.key.clone(),
            name: self.name.clone(),
            element: self.element,
            hp,
            max_hp: hp,
            attack: self.attack.saturating_add(f.saturating_mul(rates.attack)),
            defense: self.defense.saturating_add(f.saturating_mul(rates.defense)),
            experience: self
                .experience
                .saturating_add(u64::from(factor).saturating_mul(rates.experience)),
            gold: self
                .gold
                .saturating_add(u64::from(factor).saturating_mul(rates.gold)),
            crit_chance: self.crit_chance,
            tutorial: self.tutorial,
        }
    }
}

/// A monster spawned for one encounter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Monster {
    /// Bestiary key it was spawned from
    pub key: MonsterKey,
    /// Display name
    pub name: String,
    /// Element
    pub element: Element,
    /// Current hit points
    pub hp: i32,
    /// Hit points at spawn
    pub max_hp: i32,
    /// Attack power
    pub attack: i32,
    /// Defense
    pub defense: i32,
    /// Experience reward
    pub experience: u64,
    /// Gold reward
    pub gold: u64,
    /// Critical hit chance
    pub crit_chance: f64,
    /// Tutorial entity
    pub tutorial: bool,
}

impl Monster {
    /// Check if the monster is down.
    #[must_use]
    pub const fn is_dead(&self) -> bool {
        self.hp <= 0
    }

    /// Applies damage. HP may go below zero; callers only compare against zero.
    pub fn take_damage(&mut self, amount: u32) {
        self.hp = self.hp.saturating_sub(i32::try_from(amount).unwrap_or(i32::MAX));
    }
}

impl Combatant for Monster {
    fn name(&self) -> &str {
        &self.name
    }

    fn element(&self) -> Element {
        self.element
    }

    fn defense(&self) -> f64 {
        f64::from(self.defense)
    }

    fn crit_chance(&self) -> f64 {
        self.crit_chance
    }
}

/// All monster templates.
#[derive(Debug, Clone, Default)]
pub struct Bestiary {
    templates: AHashMap<MonsterKey, MonsterTemplate>,
}

impl Bestiary {
    /// Creates an empty bestiary.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a template.
    pub fn register(&mut self, template: MonsterTemplate) {
        self.templates.insert(template.key.clone(), template);
    }

    /// Looks up a template.
    #[must_use]
    pub fn get(&self, key: &MonsterKey) -> Option<&MonsterTemplate> {
        self.templates.get(key)
    }

    /// Looks up a template, failing with a missing reference.
    pub fn require(&self, key: &MonsterKey) -> CoreResult<&MonsterTemplate> {
        self.templates
            .get(key)
            .ok_or_else(|| CoreError::missing(ReferenceKind::Monster, key))
    }

    /// Iterates over templates.
    pub fn iter(&self) -> impl Iterator<Item = &MonsterTemplate> + '_ {
        self.templates.values()
    }

    /// Check if a key is registered.
    #[must_use]
    pub fn contains(&self, key: &MonsterKey) -> bool {
        self.templates.contains_key(key)
    }
}
