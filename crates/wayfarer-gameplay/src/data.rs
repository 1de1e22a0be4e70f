//! Game data tables.
//!
//! Items, sets, skills, classes, quests, monsters, dungeon types and points of
//! interest are loaded once from a JSON document and indexed into their
//! registries. [`GameData::validate`] checks every cross-reference so the rest
//! of the core can treat a dangling id as a caller error instead of a data bug.

use crate::dungeon::{DungeonAtlas, DungeonType, PointOfInterest};
use crate::item::{Item, ItemCatalog, ItemSet};
use crate::monster::{Bestiary, MonsterTemplate};
use crate::quest::{Quest, QuestBook, QuestObjective};
use crate::skill::{ClassDef, Skill, SkillRegistry};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;
use tracing::info;
use wayfarer_common::{ClassId, ItemId, MonsterKey, QuestId, ReferenceKind, SchemaVersion, SkillId};

/// The world shipped with the game.
const BUILTIN_WORLD: &str = include_str!("../data/builtin_world.json");

/// Errors found while loading game data.
#[derive(Debug, Error)]
pub enum DataError {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed document
    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Unreadable table version
    #[error("Unsupported game data version {0}")]
    UnsupportedVersion(SchemaVersion),

    /// Same id defined twice
    #[error("Duplicate {kind}: {id}")]
    Duplicate {
        /// Table
        kind: ReferenceKind,
        /// Offending id
        id: String,
    },

    /// Reference to an undefined entry
    #[error("{context} refers to unknown {kind} {id}")]
    Dangling {
        /// Where the reference was found
        context: String,
        /// Table
        kind: ReferenceKind,
        /// Missing id
        id: String,
    },

    /// Structurally invalid entry
    #[error("Invalid entry {context}: {reason}")]
    Invalid {
        /// Offending entry
        context: String,
        /// What is wrong
        reason: String,
    },
}

/// Result type for data loading.
pub type DataResult<T> = Result<T, DataError>;

/// Serialized form of the game data document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameDataFile {
    /// Table format version
    pub version: SchemaVersion,
    /// Class definitions
    #[serde(default)]
    pub classes: Vec<ClassDef>,
    /// Skill definitions
    #[serde(default)]
    pub skills: Vec<Skill>,
    /// Item definitions
    #[serde(default)]
    pub items: Vec<Item>,
    /// Equipment sets
    #[serde(default)]
    pub sets: Vec<ItemSet>,
    /// Quest definitions
    #[serde(default)]
    pub quests: Vec<Quest>,
    /// Quest given to new characters
    #[serde(default)]
    pub first_quest: Option<QuestId>,
    /// Items given to new characters
    #[serde(default)]
    pub starting_items: Vec<ItemId>,
    /// Monster templates
    #[serde(default)]
    pub monsters: Vec<MonsterTemplate>,
    /// Dungeon templates
    #[serde(default)]
    pub dungeon_types: Vec<DungeonType>,
    /// Points of interest
    #[serde(default)]
    pub points_of_interest: Vec<PointOfInterest>,
}

/// All indexed game data.
#[derive(Debug, Clone, Default)]
pub struct GameData {
    /// Items and sets
    pub items: ItemCatalog,
    /// Skills and classes
    pub skills: SkillRegistry,
    /// Quests
    pub quests: QuestBook,
    /// Monsters
    pub bestiary: Bestiary,
    /// Dungeon types and points of interest
    pub atlas: DungeonAtlas,
    /// Items given to new characters
    pub starting_items: Vec<ItemId>,
}

impl GameData {
    /// The built-in world.
    pub fn builtin() -> DataResult<Self> {
        Self::from_json(BUILTIN_WORLD)
    }

    /// Loads and validates a JSON document.
    pub fn from_json(json: &str) -> DataResult<Self> {
        let file: GameDataFile = serde_json::from_str(json)?;
        let data = Self::from_file(file)?;
        data.validate()?;
        Ok(data)
    }

    /// Loads and validates a JSON document from disk.
    pub fn load(path: impl AsRef<Path>) -> DataResult<Self> {
        let path = path.as_ref();
        let data = Self::from_json(&fs::read_to_string(path)?)?;
        info!("Loaded game data from {}", path.display());
        Ok(data)
    }

    /// Indexes a parsed document, rejecting duplicate ids.
    pub fn from_file(file: GameDataFile) -> DataResult<Self> {
        if !SchemaVersion::GAME_DATA.can_read(&file.version) {
            return Err(DataError::UnsupportedVersion(file.version));
        }

        let mut data = Self::default();

        for class in file.classes {
            if data.skills.class(&class.id).is_some() {
                return Err(duplicate(ReferenceKind::Class, &class.id));
            }
            data.skills.register_class(class);
        }
        for skill in file.skills {
            // The basic attack may be redefined once.
            if skill.id != SkillId::fist_attack() && data.skills.get(&skill.id).is_some() {
                return Err(duplicate(ReferenceKind::Skill, &skill.id));
            }
            data.skills.register_skill(skill);
        }
        for item in file.items {
            let id = item.id.clone();
            if data.items.register_item(item).is_some() {
                return Err(duplicate(ReferenceKind::Item, &id));
            }
        }
        for set in file.sets {
            let id = set.id.clone();
            if data.items.register_set(set).is_some() {
                return Err(duplicate(ReferenceKind::Set, &id));
            }
        }
        for quest in file.quests {
            if data.quests.get(&quest.id).is_some() {
                return Err(duplicate(ReferenceKind::Quest, &quest.id));
            }
            data.quests.register(quest);
        }
        if let Some(first) = file.first_quest {
            data.quests.set_first(first);
        }
        for template in file.monsters {
            if data.bestiary.contains(&template.key) {
                return Err(duplicate(ReferenceKind::Monster, &template.key));
            }
            data.bestiary.register(template);
        }
        for dungeon_type in file.dungeon_types {
            if data.atlas.dungeon_type(&dungeon_type.id).is_some() {
                return Err(duplicate(ReferenceKind::DungeonType, &dungeon_type.id));
            }
            data.atlas.register_type(dungeon_type);
        }
        for poi in file.points_of_interest {
            if data.atlas.poi(&poi.id).is_ok() {
                return Err(duplicate(ReferenceKind::Poi, &poi.id));
            }
            data.atlas.register_poi(poi);
        }
        data.starting_items = file.starting_items;

        info!(
            "Indexed {} items, {} skills, {} points of interest",
            data.items.item_count(),
            data.skills.skill_count(),
            data.atlas.pois().len()
        );
        Ok(data)
    }

    /// Checks every cross-reference between tables.
    pub fn validate(&self) -> DataResult<()> {
        self.validate_items()?;
        self.validate_skills()?;
        self.validate_quests()?;
        self.validate_dungeons()?;
        for id in &self.starting_items {
            self.item_ref("starting items", id)?;
        }
        Ok(())
    }

    fn validate_items(&self) -> DataResult<()> {
        for item in self.items.items() {
            if let Some(set) = &item.set {
                if self.items.set(set).is_none() {
                    return Err(dangling(format!("item {}", item.id), ReferenceKind::Set, set));
                }
            }
        }
        for set in self.items.sets().values() {
            if set.pieces.is_empty() {
                return Err(invalid(format!("set {}", set.id), "has no pieces"));
            }
            for piece in &set.pieces {
                let item = self.item_ref(&format!("set {}", set.id), piece)?;
                if item.set.as_ref() != Some(&set.id) {
                    return Err(invalid(
                        format!("set {}", set.id),
                        format!("piece {piece} does not belong to the set"),
                    ));
                }
            }
        }
        Ok(())
    }

    fn validate_skills(&self) -> DataResult<()> {
        if self.skills.get(&SkillId::fist_attack()).is_none() {
            return Err(dangling("skill registry", ReferenceKind::Skill, SkillId::fist_attack()));
        }
        for skill in self.skills.skills() {
            if let Some(class) = &skill.class {
                self.class_ref(&format!("skill {}", skill.id), class)?;
            }
            if skill.mana_cost < 0 {
                return Err(invalid(format!("skill {}", skill.id), "negative mana cost"));
            }
        }
        Ok(())
    }

    fn validate_quests(&self) -> DataResult<()> {
        if let Some(first) = self.quests.first() {
            if self.quests.get(first).is_none() {
                return Err(dangling("first quest", ReferenceKind::Quest, first));
            }
        }
        for quest in self.quests.iter() {
            let context = format!("quest {}", quest.id);
            if let Some(next) = &quest.next {
                if self.quests.get(next).is_none() {
                    return Err(dangling(context, ReferenceKind::Quest, next));
                }
            }
            if quest.objective.required_count() == 0 {
                return Err(invalid(context, "objective requires nothing"));
            }
            match &quest.objective {
                QuestObjective::KillMonster { target, .. } => {
                    self.monster_ref(&context, target)?;
                },
                QuestObjective::UseItem { item, .. } => {
                    self.item_ref(&context, item)?;
                },
                QuestObjective::ReachLevel { .. }
                | QuestObjective::UnlockSkill { .. }
                | QuestObjective::SetLocation { .. } => {},
            }
            for item in &quest.rewards.items {
                self.item_ref(&context, item)?;
            }
        }
        Ok(())
    }

    fn validate_dungeons(&self) -> DataResult<()> {
        for dungeon_type in self.atlas.types() {
            let context = format!("dungeon type {}", dungeon_type.id);
            if dungeon_type.monsters.is_empty() || dungeon_type.bosses.is_empty() {
                return Err(invalid(context, "needs at least one monster and one boss"));
            }
            for key in dungeon_type.monsters.iter().chain(&dungeon_type.bosses) {
                self.monster_ref(&context, key)?;
            }
            for item in &dungeon_type.rewards.items {
                self.item_ref(&context, item)?;
            }
        }
        for poi in self.atlas.pois() {
            let context = format!("point of interest {}", poi.id);
            if self.atlas.dungeon_type(&poi.dungeon_type).is_none() {
                return Err(dangling(context, ReferenceKind::DungeonType, &poi.dungeon_type));
            }
            if !poi.anchor.is_valid() {
                return Err(invalid(context, format!("anchor {} is out of range", poi.anchor)));
            }
            if poi.tutorial {
                self.monster_ref(&context, &MonsterKey::training_dummy())?;
            }
        }
        Ok(())
    }

    fn item_ref(&self, context: &str, id: &ItemId) -> DataResult<&Item> {
        self.items
            .get(id)
            .ok_or_else(|| dangling(context, ReferenceKind::Item, id))
    }

    fn class_ref(&self, context: &str, id: &ClassId) -> DataResult<&ClassDef> {
        self.skills
            .class(id)
            .ok_or_else(|| dangling(context, ReferenceKind::Class, id))
    }

    fn monster_ref(&self, context: &str, key: &MonsterKey) -> DataResult<&MonsterTemplate> {
        self.bestiary
            .get(key)
            .ok_or_else(|| dangling(context, ReferenceKind::Monster, key))
    }
}

fn duplicate(kind: ReferenceKind, id: impl std::fmt::Display) -> DataError {
    DataError::Duplicate {
        kind,
        id: id.to_string(),
    }
}

fn dangling(context: impl Into<String>, kind: ReferenceKind, id: impl std::fmt::Display) -> DataError {
    DataError::Dangling {
        context: context.into(),
        kind,
        id: id.to_string(),
    }
}

fn invalid(context: impl Into<String>, reason: impl Into<String>) -> DataError {
    DataError::Invalid {
        context: context.into(),
        reason: reason.into(),
    }
}
