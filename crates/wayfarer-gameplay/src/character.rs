//! The player character record.
//!
//! A [`Character`] is plain data owned by the session and passed by
//! reference into every core operation. It is also exactly what the
//! persistence collaborator stores.

use crate::item::{EquipSlot, ItemCatalog, ItemKind};
use crate::stats::{derive_stats, BaseStats, DerivedStats, StatKind};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::debug;
use wayfarer_common::{ClassId, CoreError, CoreResult, GeoPoint, ItemId, QuestId, ReferenceKind, SkillId};

use crate::item::Equipment;

/// Experience needed to go from level 1 to level 2.
pub const STARTING_XP_THRESHOLD: u64 = 100;

/// The quest a character is currently working on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveQuest {
    /// Quest being tracked
    pub id: QuestId,
    /// Objective counter
    pub progress: u32,
}

impl ActiveQuest {
    /// Starts tracking a quest at zero progress.
    #[must_use]
    pub fn new(id: QuestId) -> Self {
        Self { id, progress: 0 }
    }
}

/// Outcome of using a consumable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ItemUse {
    /// HP actually restored
    pub healed: i32,
    /// Mana actually restored
    pub restored_mana: i32,
}

/// A player character.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Character {
    /// Display name
    pub name: String,
    /// Current class
    pub class: ClassId,
    /// Level, starting at 1
    pub level: u32,
    /// Experience toward the next level
    pub experience: u64,
    /// Experience needed for the next level
    pub experience_to_next: u64,
    /// Gold carried
    pub gold: u64,
    /// Base stats before equipment
    pub base_stats: BaseStats,
    /// Stats derived from base stats and equipment
    pub stats: DerivedStats,
    /// Current HP (0..=max_hp)
    pub hp: i32,
    /// Current mana (0..=max_mana)
    pub mana: i32,
    /// Equipped items
    #[serde(default)]
    pub equipment: Equipment,
    /// Carried items
    #[serde(default)]
    pub inventory: Vec<ItemId>,
    /// Unlocked skills, always including the basic attack
    pub skills: BTreeSet<SkillId>,
    /// Unlocked classes
    pub classes: BTreeSet<ClassId>,
    /// Unspent skill points
    #[serde(default)]
    pub skill_points: u32,
    /// Unspent stat points
    #[serde(default)]
    pub stat_points: u32,
    /// Quest in progress
    #[serde(default)]
    pub active_quest: Option<ActiveQuest>,
    /// Quests already completed
    #[serde(default)]
    pub completed_quests: BTreeSet<QuestId>,
    /// Last validated camp location
    #[serde(default)]
    pub camp: Option<GeoPoint>,
}

impl Character {
    /// Creates a level 1 character with every base stat at 1.
    #[must_use]
    pub fn new(name: impl Into<String>, class: impl Into<ClassId>, catalog: &ItemCatalog) -> Self {
        Self::with_base_stats(name, class, BaseStats::default(), catalog)
    }

    /// Creates a level 1 character with the given base stats.
    #[must_use]
    pub fn with_base_stats(
        name: impl Into<String>,
        class: impl Into<ClassId>,
        base_stats: BaseStats,
        catalog: &ItemCatalog,
    ) -> Self {
        let class = class.into();
        let equipment = Equipment::default();
        let stats = derive_stats(&base_stats, &catalog.equipped_items(&equipment), catalog.sets());
        Self {
            name: name.into(),
            classes: BTreeSet::from([class.clone()]),
            class,
            level: 1,
            experience: 0,
            experience_to_next: STARTING_XP_THRESHOLD,
            gold: 0,
            base_stats,
            hp: stats.max_hp,
            mana: stats.max_mana,
            stats,
            equipment,
            inventory: Vec::new(),
            skills: BTreeSet::from([SkillId::fist_attack()]),
            skill_points: 0,
            stat_points: 0,
            active_quest: None,
            completed_quests: BTreeSet::new(),
            camp: None,
        }
    }

    /// Recomputes derived stats and clamps current HP and mana to the new maxima.
    pub fn refresh_stats(&mut self, catalog: &ItemCatalog) {
        self.stats = derive_stats(
            &self.base_stats,
            &catalog.equipped_items(&self.equipment),
            catalog.sets(),
        );
        self.clamp_resources();
    }

    /// Keeps HP and mana within `0..=max`.
    pub fn clamp_resources(&mut self) {
        self.hp = self.hp.clamp(0, self.stats.max_hp.max(0));
        self.mana = self.mana.clamp(0, self.stats.max_mana.max(0));
    }

    /// Fills HP and mana to their maxima.
    pub fn restore_fully(&mut self) {
        self.hp = self.stats.max_hp;
        self.mana = self.stats.max_mana;
    }

    /// Check if HP has reached zero.
    #[must_use]
    pub const fn is_defeated(&self) -> bool {
        self.hp <= 0
    }

    /// Applies damage, flooring HP at zero. Returns HP lost.
    pub fn take_damage(&mut self, amount: u32) -> i32 {
        let amount = i32::try_from(amount).unwrap_or(i32::MAX);
        let lost = amount.min(self.hp.max(0));
        self.hp -= lost;
        lost
    }

    /// Spends mana if enough is available.
    pub fn spend_mana(&mut self, cost: i32) -> CoreResult<()> {
        if cost > self.mana {
            return Err(CoreError::invalid_action(format!(
                "not enough mana: need {cost}, have {}",
                self.mana
            )));
        }
        self.mana -= cost.max(0);
        Ok(())
    }

    /// Check if an item is carried.
    #[must_use]
    pub fn has_item(&self, id: &ItemId) -> bool {
        self.inventory.contains(id)
    }

    /// Check if a quest has been completed.
    #[must_use]
    pub fn has_completed(&self, id: &QuestId) -> bool {
        self.completed_quests.contains(id)
    }

    fn inventory_position(&self, id: &ItemId) -> CoreResult<usize> {
        self.inventory
            .iter()
            .position(|carried| carried == id)
            .ok_or_else(|| CoreError::missing(ReferenceKind::Item, id))
    }

    /// Moves an item from the inventory into its slot.
    ///
    /// Whatever was in the slot goes back to the inventory.
    pub fn equip(&mut self, id: &ItemId, catalog: &ItemCatalog) -> CoreResult<EquipSlot> {
        let index = self.inventory_position(id)?;
        let item = catalog.require(id)?;
        let slot = item
            .kind
            .slot()
            .ok_or_else(|| CoreError::invalid_action(format!("{} cannot be equipped", item.name)))?;

        let item_id = self.inventory.remove(index);
        if let Some(previous) = self.equipment.slot_mut(slot).replace(item_id) {
            self.inventory.push(previous);
        }
        self.refresh_stats(catalog);
        debug!("{} equipped {} in {:?} slot", self.name, id, slot);
        Ok(slot)
    }

    /// Moves the item in a slot back to the inventory.
    pub fn unequip(&mut self, slot: EquipSlot, catalog: &ItemCatalog) -> CoreResult<ItemId> {
        let item_id = self
            .equipment
            .slot_mut(slot)
            .take()
            .ok_or_else(|| CoreError::invalid_action(format!("nothing equipped in {slot:?} slot")))?;
        self.inventory.push(item_id.clone());
        self.refresh_stats(catalog);
        debug!("{} unequipped {}", self.name, item_id);
        Ok(item_id)
    }

    /// Consumes one copy of a consumable from the inventory.
    pub fn use_item(&mut self, id: &ItemId, catalog: &ItemCatalog) -> CoreResult<ItemUse> {
        let index = self.inventory_position(id)?;
        let item = catalog.require(id)?;
        let ItemKind::Consumable { heal, mana } = item.kind else {
            return Err(CoreError::invalid_action(format!("{} cannot be used", item.name)));
        };

        self.inventory.remove(index);
        let before = (self.hp, self.mana);
        self.hp = self.hp.saturating_add(heal.max(0));
        self.mana = self.mana.saturating_add(mana.max(0));
        self.clamp_resources();

        Ok(ItemUse {
            healed: self.hp - before.0,
            restored_mana: self.mana - before.1,
        })
    }

    /// Spends a stat point on a base stat.
    pub fn spend_stat_point(&mut self, stat: StatKind, catalog: &ItemCatalog) -> CoreResult<()> {
        if self.stat_points == 0 {
            return Err(CoreError::InsufficientPoints("stat"));
        }
        self.stat_points -= 1;
        self.base_stats.add(stat, 1);
        self.refresh_stats(catalog);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::Item;
    use crate::stats::Bonuses;

    fn catalog() -> ItemCatalog {
        let mut catalog = ItemCatalog::new();
        catalog.register_item(Item::new("club", "Club", ItemKind::Weapon { attack: 3 }));
        catalog.register_item(Item::new("axe", "Axe", ItemKind::Weapon { attack: 6 }));
        catalog.register_item(Item::new(
            "potion",
            "Potion",
            ItemKind::Consumable { heal: 30, mana: 10 },
        ));
        catalog.register_item(Item::new("letter", "Sealed Letter", ItemKind::QuestItem));
        catalog.register_item(
            Item::new("mail", "Chainmail", ItemKind::Armor { defense: 5 })
                .with_bonuses(Bonuses::default().with_stat(StatKind::Strength, 1)),
        );
        catalog.register_item(
            Item::new("staff", "Ember Staff", ItemKind::Weapon { attack: 5 })
                .with_bonuses(Bonuses::default().with_stat(StatKind::Intelligence, 2)),
        );
        catalog
    }

    fn hero(catalog: &ItemCatalog) -> Character {
        Character::new("Ada", "warrior", catalog)
    }

    #[test]
    fn test_new_character_defaults() {
        let catalog = catalog();
        let c = hero(&catalog);
        assert_eq!(c.level, 1);
        assert_eq!(c.hp, 110);
        assert_eq!(c.mana, 55);
        assert!(c.skills.contains(&SkillId::fist_attack()));
        assert!(c.classes.contains(&ClassId::new("warrior")));
    }

    #[test]
    fn test_equip_swaps_previous_into_inventory() {
        let catalog = catalog();
        let mut c = hero(&catalog);
        c.inventory = vec![ItemId::new("club"), ItemId::new("axe")];

        assert_eq!(c.equip(&ItemId::new("club"), &catalog), Ok(EquipSlot::Weapon));
        assert_eq!(c.inventory, vec![ItemId::new("axe")]);

        c.equip(&ItemId::new("axe"), &catalog).expect("axe equips");
        assert_eq!(c.equipment.weapon, Some(ItemId::new("axe")));
        assert_eq!(c.inventory, vec![ItemId::new("club")]);
    }

    #[test]
    fn test_equip_rejects_without_mutation() {
        let catalog = catalog();
        let mut c = hero(&catalog);
        c.inventory = vec![ItemId::new("letter")];
        let before = c.clone();

        assert!(matches!(
            c.equip(&ItemId::new("letter"), &catalog),
            Err(CoreError::InvalidAction(_))
        ));
        assert!(matches!(
            c.equip(&ItemId::new("club"), &catalog),
            Err(CoreError::MissingReference { .. })
        ));
        assert_eq!(c, before);
    }

    #[test]
    fn test_unequip_returns_item() {
        let catalog = catalog();
        let mut c = hero(&catalog);
        c.inventory = vec![ItemId::new("club")];
        c.equip(&ItemId::new("club"), &catalog).expect("equips");

        let removed = c.unequip(EquipSlot::Weapon, &catalog).expect("unequips");
        assert_eq!(removed, ItemId::new("club"));
        assert!(c.equipment.weapon.is_none());
        assert!(c.unequip(EquipSlot::Weapon, &catalog).is_err());
    }

    #[test]
    fn test_unequip_clamps_hp_to_lower_max() {
        let catalog = catalog();
        let mut c = hero(&catalog);
        c.inventory = vec![ItemId::new("mail")];

        c.equip(&ItemId::new("mail"), &catalog).expect("equips");
        assert_eq!(c.stats.max_hp, 120);
        c.hp = c.stats.max_hp;

        c.unequip(EquipSlot::Armor, &catalog).expect("unequips");
        assert_eq!(c.stats.max_hp, 110);
        assert_eq!(c.hp, 110);
    }

    #[test]
    fn test_unequip_clamps_mana_to_lower_max() {
        let catalog = catalog();
        let mut c = hero(&catalog);
        c.inventory = vec![ItemId::new("staff")];

        c.equip(&ItemId::new("staff"), &catalog).expect("equips");
        assert_eq!(c.stats.max_mana, 65);
        c.mana = c.stats.max_mana;

        c.unequip(EquipSlot::Weapon, &catalog).expect("unequips");
        assert_eq!(c.stats.max_mana, 55);
        assert_eq!(c.mana, 55);
        assert!(c.hp <= c.stats.max_hp);
    }

    #[test]
    fn test_use_item_heals_up_to_max() {
        let catalog = catalog();
        let mut c = hero(&catalog);
        c.inventory = vec![ItemId::new("potion")];
        c.hp = 100;
        c.mana = 0;

        let used = c.use_item(&ItemId::new("potion"), &catalog).expect("usable");
        assert_eq!(used.healed, 10);
        assert_eq!(used.restored_mana, 10);
        assert_eq!(c.hp, c.stats.max_hp);
        assert!(c.inventory.is_empty());
    }

    #[test]
    fn test_use_item_rejects_non_consumable() {
        let catalog = catalog();
        let mut c = hero(&catalog);
        c.inventory = vec![ItemId::new("club")];
        assert!(c.use_item(&ItemId::new("club"), &catalog).is_err());
        assert_eq!(c.inventory.len(), 1);
    }

    #[test]
    fn test_spend_stat_point_refreshes_stats() {
        let catalog = catalog();
        let mut c = hero(&catalog);
        assert_eq!(
            c.spend_stat_point(StatKind::Strength, &catalog),
            Err(CoreError::InsufficientPoints("stat"))
        );

        c.stat_points = 1;
        c.spend_stat_point(StatKind::Strength, &catalog).expect("point spent");
        assert_eq!(c.base_stats.strength, 2);
        assert_eq!(c.stats.max_hp, 120);
        assert_eq!(c.stat_points, 0);
    }

    #[test]
    fn test_take_damage_floors_at_zero() {
        let catalog = catalog();
        let mut c = hero(&catalog);
        assert_eq!(c.take_damage(500), 110);
        assert_eq!(c.hp, 0);
        assert!(c.is_defeated());
    }

    #[test]
    fn test_spend_mana() {
        let catalog = catalog();
        let mut c = hero(&catalog);
        assert!(c.spend_mana(60).is_err());
        assert_eq!(c.mana, 55);
        c.spend_mana(15).expect("enough mana");
        assert_eq!(c.mana, 40);
    }
}
