//! Item definitions, equipment sets and the item catalog.

use crate::element::Element;
use crate::stats::Bonuses;
use ahash::AHashMap;
use serde::{Deserialize, Serialize};
use wayfarer_common::{CoreError, CoreResult, ItemId, ReferenceKind, SetId};

/// Lookup table of equipment sets.
pub type SetTable = AHashMap<SetId, ItemSet>;

/// What an item is and what it contributes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "category", rename_all = "snake_case")]
pub enum ItemKind {
    /// Goes in the weapon slot; attack adds to the power of player attacks.
    Weapon {
        /// Attack contribution
        attack: i32,
    },
    /// Goes in the armor slot; defense adds to the wearer's defense.
    Armor {
        /// Defense contribution
        defense: i32,
    },
    /// Consumed on use.
    Consumable {
        /// HP restored
        #[serde(default)]
        heal: i32,
        /// Mana restored
        #[serde(default)]
        mana: i32,
    },
    /// Carried for quests, no combat use.
    QuestItem,
}

impl ItemKind {
    /// The slot this kind of item is equipped in.
    #[must_use]
    pub const fn slot(&self) -> Option<EquipSlot> {
        match self {
            Self::Weapon { .. } => Some(EquipSlot::Weapon),
            Self::Armor { .. } => Some(EquipSlot::Armor),
            Self::Consumable { .. } | Self::QuestItem => None,
        }
    }

    /// Numeric combat contribution (attack for weapons, defense for armor).
    #[must_use]
    pub const fn power(&self) -> i32 {
        match self {
            Self::Weapon { attack } => *attack,
            Self::Armor { defense } => *defense,
            Self::Consumable { .. } | Self::QuestItem => 0,
        }
    }
}

/// An immutable item definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    /// Unique identifier
    pub id: ItemId,
    /// Display name
    pub name: String,
    /// Category and combat contribution
    #[serde(flatten)]
    pub kind: ItemKind,
    /// Element tag
    #[serde(default)]
    pub element: Option<Element>,
    /// Stat, passive and resistance bonuses while equipped
    #[serde(default)]
    pub bonuses: Bonuses,
    /// Set this item belongs to
    #[serde(default)]
    pub set: Option<SetId>,
}

impl Item {
    /// Creates a new item definition.
    #[must_use]
    pub fn new(id: impl Into<ItemId>, name: impl Into<String>, kind: ItemKind) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            kind,
            element: None,
            bonuses: Bonuses::default(),
            set: None,
        }
    }

    /// Sets the element tag.
    #[must_use]
    pub fn with_element(mut self, element: Element) -> Self {
        self.element = Some(element);
        self
    }

    /// Sets the bonus payload.
    #[must_use]
    pub fn with_bonuses(mut self, bonuses: Bonuses) -> Self {
        self.bonuses = bonuses;
        self
    }

    /// Marks the item as part of a set.
    #[must_use]
    pub fn in_set(mut self, set: impl Into<SetId>) -> Self {
        self.set = Some(set.into());
        self
    }
}

/// A named group of items granting a bonus when all are equipped at once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemSet {
    /// Unique identifier
    pub id: SetId,
    /// Display name
    pub name: String,
    /// Member items
    pub pieces: Vec<ItemId>,
    /// Bonus applied when every piece is equipped
    #[serde(default)]
    pub bonus: Bonuses,
}

impl ItemSet {
    /// Creates an empty set.
    #[must_use]
    pub fn new(id: impl Into<SetId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            pieces: Vec::new(),
            bonus: Bonuses::default(),
        }
    }

    /// Adds a member item.
    #[must_use]
    pub fn with_piece(mut self, item: impl Into<ItemId>) -> Self {
        self.pieces.push(item.into());
        self
    }

    /// Sets the completion bonus.
    #[must_use]
    pub fn with_bonus(mut self, bonus: Bonuses) -> Self {
        self.bonus = bonus;
        self
    }
}

// ============================================================================
// Equipment
// ============================================================================

/// An equipment slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EquipSlot {
    /// Weapon slot.
    Weapon,
    /// Armor slot.
    Armor,
}

impl std::str::FromStr for EquipSlot {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "weapon" => Ok(Self::Weapon),
            "armor" | "armour" => Ok(Self::Armor),
            other => Err(format!("unknown slot: {other}")),
        }
    }
}

/// What a character is wearing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Equipment {
    /// Equipped weapon
    pub weapon: Option<ItemId>,
    /// Equipped armor
    pub armor: Option<ItemId>,
}

impl Equipment {
    /// Item in a slot.
    #[must_use]
    pub const fn get(&self, slot: EquipSlot) -> Option<&ItemId> {
        match slot {
            EquipSlot::Weapon => self.weapon.as_ref(),
            EquipSlot::Armor => self.armor.as_ref(),
        }
    }

    /// Mutable access to a slot.
    pub fn slot_mut(&mut self, slot: EquipSlot) -> &mut Option<ItemId> {
        match slot {
            EquipSlot::Weapon => &mut self.weapon,
            EquipSlot::Armor => &mut self.armor,
        }
    }

    /// Iterates over equipped item ids.
    pub fn iter(&self) -> impl Iterator<Item = &ItemId> + '_ {
        self.weapon.iter().chain(self.armor.iter())
    }
}

// ============================================================================
// Catalog
// ============================================================================

/// Every item and set definition, resolved once at load time.
#[derive(Debug, Clone, Default)]
pub struct ItemCatalog {
    items: AHashMap<ItemId, Item>,
    sets: SetTable,
}

impl ItemCatalog {
    /// Creates an empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an item definition, returning the one it replaced.
    pub fn register_item(&mut self, item: Item) -> Option<Item> {
        self.items.insert(item.id.clone(), item)
    }

    /// Registers a set definition, returning the one it replaced.
    pub fn register_set(&mut self, set: ItemSet) -> Option<ItemSet> {
        self.sets.insert(set.id.clone(), set)
    }

    /// Looks up an item.
    #[must_use]
    pub fn get(&self, id: &ItemId) -> Option<&Item> {
        self.items.get(id)
    }

    /// Looks up an item, failing with a missing reference.
    pub fn require(&self, id: &ItemId) -> CoreResult<&Item> {
        self.items
            .get(id)
            .ok_or_else(|| CoreError::missing(ReferenceKind::Item, id))
    }

    /// All set definitions.
    #[must_use]
    pub const fn sets(&self) -> &SetTable {
        &self.sets
    }

    /// Looks up a set.
    #[must_use]
    pub fn set(&self, id: &SetId) -> Option<&ItemSet> {
        self.sets.get(id)
    }

    /// Resolves equipped item ids, skipping any that are not in the catalog.
    #[must_use]
    pub fn equipped_items(&self, equipment: &Equipment) -> Vec<&Item> {
        equipment.iter().filter_map(|id| self.items.get(id)).collect()
    }

    /// Resolves the item in one slot.
    #[must_use]
    pub fn equipped(&self, equipment: &Equipment, slot: EquipSlot) -> Option<&Item> {
        equipment.get(slot).and_then(|id| self.items.get(id))
    }

    /// Number of registered items.
    #[must_use]
    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    /// Iterates over all items.
    pub fn items(&self) -> impl Iterator<Item = &Item> + '_ {
        self.items.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_item_kind_slots() {
        assert_eq!(ItemKind::Weapon { attack: 3 }.slot(), Some(EquipSlot::Weapon));
        assert_eq!(ItemKind::Armor { defense: 2 }.slot(), Some(EquipSlot::Armor));
        assert_eq!(ItemKind::QuestItem.slot(), None);
        assert_eq!(ItemKind::Armor { defense: 2 }.power(), 2);
    }

    #[test]
    fn test_item_deserializes_from_table_entry() {
        let json = r#"{
            "id": "ember_staff",
            "name": "Ember Staff",
            "category": "weapon",
            "attack": 8,
            "element": "feu",
            "bonuses": { "stats": { "intelligence": 2 } }
        }"#;
        let item: Item = serde_json::from_str(json).expect("valid item");
        assert_eq!(item.kind, ItemKind::Weapon { attack: 8 });
        assert_eq!(item.element, Some(Element::Fire));
        assert_eq!(item.set, None);
        assert!(!item.bonuses.is_empty());
    }

    #[test]
    fn test_catalog_require_reports_missing() {
        let catalog = ItemCatalog::new();
        let err = catalog.require(&ItemId::new("ghost")).expect_err("not registered");
        assert_eq!(err, CoreError::missing(ReferenceKind::Item, "ghost"));
    }

    #[test]
    fn test_equipped_items_skips_unknown() {
        let mut catalog = ItemCatalog::new();
        catalog.register_item(Item::new("club", "Club", ItemKind::Weapon { attack: 2 }));
        let equipment = Equipment {
            weapon: Some(ItemId::new("club")),
            armor: Some(ItemId::new("missing")),
        };
        let items = catalog.equipped_items(&equipment);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].name, "Club");
    }
}
