//! Experience, gold and item rewards, and leveling.

use crate::character::Character;
use crate::item::ItemCatalog;
use crate::notify::{Notifier, Severity};
use serde::{Deserialize, Serialize};
use tracing::info;
use wayfarer_common::ItemId;

/// Default stat points granted per level.
pub const DEFAULT_STAT_POINTS_PER_LEVEL: u32 = 3;

/// Default skill points granted per level.
pub const DEFAULT_SKILL_POINTS_PER_LEVEL: u32 = 1;

/// A bundle of rewards (quest completion, monster kill, cleared dungeon).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RewardBundle {
    /// Experience points
    pub experience: u64,
    /// Gold
    pub gold: u64,
    /// Items added to the inventory
    pub items: Vec<ItemId>,
}

impl RewardBundle {
    /// Creates a bundle of experience and gold.
    #[must_use]
    pub const fn new(experience: u64, gold: u64) -> Self {
        Self {
            experience,
            gold,
            items: Vec::new(),
        }
    }

    /// Adds an item.
    #[must_use]
    pub fn with_item(mut self, item: impl Into<ItemId>) -> Self {
        self.items.push(item.into());
        self
    }

    /// Check if the bundle grants nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.experience == 0 && self.gold == 0 && self.items.is_empty()
    }
}

/// What happened during a call that may have leveled the character.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelUpReport {
    /// Levels gained by this call
    pub levels_gained: u32,
    /// Level after the call
    pub new_level: u32,
    /// Stat points granted
    pub stat_points_gained: u32,
    /// Skill points granted
    pub skill_points_gained: u32,
}

impl LevelUpReport {
    /// Check if at least one level was gained.
    #[must_use]
    pub const fn leveled_up(&self) -> bool {
        self.levels_gained > 0
    }

    /// Tells the player about gained levels, if any.
    pub fn announce(&self, notifier: &dyn Notifier) {
        if self.leveled_up() {
            notifier.notify(
                &format!(
                    "Level up! You are now level {} (+{} stat points, +{} skill points)",
                    self.new_level, self.stat_points_gained, self.skill_points_gained
                ),
                Severity::Success,
            );
        }
    }

    /// Folds another report into this one.
    pub fn merge(&mut self, other: LevelUpReport) {
        self.levels_gained += other.levels_gained;
        self.new_level = self.new_level.max(other.new_level);
        self.stat_points_gained += other.stat_points_gained;
        self.skill_points_gained += other.skill_points_gained;
    }
}

/// Applies rewards and level-ups to characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progression {
    stat_points_per_level: u32,
    skill_points_per_level: u32,
}

impl Default for Progression {
    fn default() -> Self {
        Self::new(DEFAULT_STAT_POINTS_PER_LEVEL, DEFAULT_SKILL_POINTS_PER_LEVEL)
    }
}

impl Progression {
    /// Creates a tracker with the given per-level point grants.
    #[must_use]
    pub const fn new(stat_points_per_level: u32, skill_points_per_level: u32) -> Self {
        Self {
            stat_points_per_level,
            skill_points_per_level,
        }
    }

    /// Threshold for the level after one with threshold `threshold`.
    #[must_use]
    pub const fn next_threshold(threshold: u64) -> u64 {
        threshold.saturating_mul(3) / 2
    }

    /// Adds experience, leveling up as many times as the total allows.
    ///
    /// Each level-up subtracts the current threshold, grows it by 1.5x
    /// (rounded down), grants points, refreshes derived stats and fully
    /// restores HP and mana.
    pub fn grant_experience(
        &self,
        character: &mut Character,
        amount: u64,
        catalog: &ItemCatalog,
    ) -> LevelUpReport {
        let mut report = LevelUpReport {
            new_level: character.level,
            ..LevelUpReport::default()
        };
        if amount == 0 {
            return report;
        }

        character.experience = character.experience.saturating_add(amount);
        // A zero threshold would never stop leveling.
        character.experience_to_next = character.experience_to_next.max(1);

        while character.experience >= character.experience_to_next {
            character.experience -= character.experience_to_next;
            character.experience_to_next = Self::next_threshold(character.experience_to_next).max(1);
            character.level += 1;
            character.stat_points += self.stat_points_per_level;
            character.skill_points += self.skill_points_per_level;

            report.levels_gained += 1;
            report.stat_points_gained += self.stat_points_per_level;
            report.skill_points_gained += self.skill_points_per_level;
        }

        if report.leveled_up() {
            character.refresh_stats(catalog);
            character.restore_fully();
            report.new_level = character.level;
            info!(
                "{} reached level {} (+{} stat points, +{} skill points)",
                character.name, character.level, report.stat_points_gained, report.skill_points_gained
            );
        }

        report
    }

    /// Adds gold.
    pub fn grant_gold(&self, character: &mut Character, amount: u64) {
        character.gold = character.gold.saturating_add(amount);
    }

    /// Appends items to the inventory.
    pub fn grant_items(&self, character: &mut Character, items: &[ItemId]) {
        character.inventory.extend(items.iter().cloned());
    }

    /// Applies a whole reward bundle.
    pub fn apply_rewards(
        &self,
        character: &mut Character,
        rewards: &RewardBundle,
        catalog: &ItemCatalog,
    ) -> LevelUpReport {
        self.grant_gold(character, rewards.gold);
        self.grant_items(character, &rewards.items);
        self.grant_experience(character, rewards.experience, catalog)
    }
}
