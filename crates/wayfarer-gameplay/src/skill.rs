//! Skills and classes.
//!
//! Skills are indexed by class once at load time. A skill with no class is
//! available to everyone; the basic `fist_attack` is one of those and every
//! character knows it from the start.

use crate::character::Character;
use crate::element::Element;
use ahash::AHashMap;
use serde::{Deserialize, Serialize};
use tracing::info;
use wayfarer_common::{ClassId, CoreError, CoreResult, ReferenceKind, SkillId};

/// An ability usable in battle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Skill {
    /// Unique identifier
    pub id: SkillId,
    /// Display name
    pub name: String,
    /// Owning class (`None` = available to every class)
    #[serde(default)]
    pub class: Option<ClassId>,
    /// Mana spent per use
    #[serde(default)]
    pub mana_cost: i32,
    /// Power added to the user's attack damage
    #[serde(default)]
    pub power: i32,
    /// Element of the attack (`None` = weapon element)
    #[serde(default)]
    pub element: Option<Element>,
    /// Minimum level to unlock
    #[serde(default = "default_required_level")]
    pub required_level: u32,
    /// Flavor text
    #[serde(default)]
    pub description: String,
}

const fn default_required_level() -> u32 {
    1
}

impl Skill {
    /// Creates a universal skill with no cost.
    #[must_use]
    pub fn new(id: impl Into<SkillId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            class: None,
            mana_cost: 0,
            power: 0,
            element: None,
            required_level: 1,
            description: String::new(),
        }
    }

    /// The basic attack.
    #[must_use]
    pub fn fist_attack() -> Self {
        Self::new(SkillId::fist_attack(), "Fist Attack")
    }

    /// Restricts the skill to a class.
    #[must_use]
    pub fn for_class(mut self, class: impl Into<ClassId>) -> Self {
        self.class = Some(class.into());
        self
    }

    /// Sets mana cost and power.
    #[must_use]
    pub const fn with_cost_and_power(mut self, mana_cost: i32, power: i32) -> Self {
        self.mana_cost = mana_cost;
        self.power = power;
        self
    }

    /// Sets the element.
    #[must_use]
    pub const fn with_element(mut self, element: Element) -> Self {
        self.element = Some(element);
        self
    }

    /// Sets the required level.
    #[must_use]
    pub const fn with_required_level(mut self, level: u32) -> Self {
        self.required_level = level;
        self
    }
}

/// A character class.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassDef {
    /// Unique identifier
    pub id: ClassId,
    /// Display name
    pub name: String,
    /// Minimum level to unlock as an additional class
    #[serde(default = "default_required_level")]
    pub required_level: u32,
    /// Flavor text
    #[serde(default)]
    pub description: String,
}

impl ClassDef {
    /// Creates a class available from level 1.
    #[must_use]
    pub fn new(id: impl Into<ClassId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            required_level: 1,
            description: String::new(),
        }
    }

    /// Sets the unlock level.
    #[must_use]
    pub const fn with_required_level(mut self, level: u32) -> Self {
        self.required_level = level;
        self
    }
}

/// Skills and classes, indexed once at load time.
#[derive(Debug, Clone)]
pub struct SkillRegistry {
    skills: AHashMap<SkillId, Skill>,
    by_class: AHashMap<ClassId, Vec<SkillId>>,
    universal: Vec<SkillId>,
    classes: AHashMap<ClassId, ClassDef>,
}

impl Default for SkillRegistry {
    fn default() -> Self {
        let mut registry = Self {
            skills: AHashMap::new(),
            by_class: AHashMap::new(),
            universal: Vec::new(),
            classes: AHashMap::new(),
        };
        registry.register_skill(Skill::fist_attack());
        registry
    }
}

impl SkillRegistry {
    /// Creates a registry holding only the basic attack.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a class.
    pub fn register_class(&mut self, class: ClassDef) {
        self.classes.insert(class.id.clone(), class);
    }

    /// Registers a skill under its class index, replacing any previous definition.
    pub fn register_skill(&mut self, skill: Skill) {
        let id = skill.id.clone();
        if let Some(previous) = self.skills.insert(id.clone(), skill.clone()) {
            self.unindex(&previous);
        }
        match &skill.class {
            Some(class) => self.by_class.entry(class.clone()).or_default().push(id),
            None => self.universal.push(id),
        }
    }

    fn unindex(&mut self, skill: &Skill) {
        let list = match &skill.class {
            Some(class) => self.by_class.get_mut(class),
            None => Some(&mut self.universal),
        };
        if let Some(list) = list {
            list.retain(|id| id != &skill.id);
        }
    }

    /// Looks up a skill.
    #[must_use]
    pub fn get(&self, id: &SkillId) -> Option<&Skill> {
        self.skills.get(id)
    }

    /// Looks up a class.
    #[must_use]
    pub fn class(&self, id: &ClassId) -> Option<&ClassDef> {
        self.classes.get(id)
    }

    /// Iterates over registered skills.
    pub fn skills(&self) -> impl Iterator<Item = &Skill> + '_ {
        self.skills.values()
    }

    /// Iterates over registered classes.
    pub fn classes(&self) -> impl Iterator<Item = &ClassDef> + '_ {
        self.classes.values()
    }

    /// Skills a member of `class` may learn (class skills plus universal ones).
    pub fn skills_for_class<'a>(&'a self, class: &ClassId) -> impl Iterator<Item = &'a Skill> + 'a {
        self.by_class
            .get(class)
            .into_iter()
            .flatten()
            .chain(self.universal.iter())
            .filter_map(|id| self.skills.get(id))
    }

    /// Returns a skill the character has unlocked.
    pub fn usable(&self, character: &Character, id: &SkillId) -> CoreResult<&Skill> {
        let skill = self
            .skills
            .get(id)
            .ok_or_else(|| CoreError::missing(ReferenceKind::Skill, id))?;
        if !character.skills.contains(id) {
            return Err(CoreError::invalid_action(format!("{} is not unlocked", skill.name)));
        }
        Ok(skill)
    }

    /// Spends a skill point to unlock a skill.
    pub fn unlock_skill<'a>(&'a self, character: &mut Character, id: &SkillId) -> CoreResult<&'a Skill> {
        let skill = self
            .skills
            .get(id)
            .ok_or_else(|| CoreError::missing(ReferenceKind::Skill, id))?;

        if character.skills.contains(id) {
            return Err(CoreError::invalid_action(format!("{} is already unlocked", skill.name)));
        }
        if let Some(class) = &skill.class {
            if !character.classes.contains(class) {
                return Err(CoreError::invalid_action(format!(
                    "{} requires the {class} class",
                    skill.name
                )));
            }
        }
        if character.level < skill.required_level {
            return Err(CoreError::invalid_action(format!(
                "{} requires level {}",
                skill.name, skill.required_level
            )));
        }
        if character.skill_points == 0 {
            return Err(CoreError::InsufficientPoints("skill"));
        }

        character.skill_points -= 1;
        character.skills.insert(id.clone());
        info!("{} unlocked skill {}", character.name, skill.name);
        Ok(skill)
    }

    /// Unlocks an additional class once the character reaches its level.
    pub fn unlock_class<'a>(&'a self, character: &mut Character, id: &ClassId) -> CoreResult<&'a ClassDef> {
        let class = self
            .classes
            .get(id)
            .ok_or_else(|| CoreError::missing(ReferenceKind::Class, id))?;

        if character.classes.contains(id) {
            return Err(CoreError::invalid_action(format!("{} is already unlocked", class.name)));
        }
        if character.level < class.required_level {
            return Err(CoreError::invalid_action(format!(
                "{} requires level {}",
                class.name, class.required_level
            )));
        }

        character.classes.insert(id.clone());
        info!("{} unlocked class {}", character.name, class.name);
        Ok(class)
    }

    /// Switches the character's active class to one already unlocked.
    pub fn switch_class(&self, character: &mut Character, id: &ClassId) -> CoreResult<()> {
        if !self.classes.contains_key(id) {
            return Err(CoreError::missing(ReferenceKind::Class, id));
        }
        if !character.classes.contains(id) {
            return Err(CoreError::invalid_action(format!("class {id} is not unlocked")));
        }
        character.class = id.clone();
        Ok(())
    }

    /// Number of registered skills.
    #[must_use]
    pub fn skill_count(&self) -> usize {
        self.skills.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::ItemCatalog;

    fn registry() -> SkillRegistry {
        let mut registry = SkillRegistry::new();
        registry.register_class(ClassDef::new("warrior", "Warrior"));
        registry.register_class(ClassDef::new("mage", "Mage").with_required_level(3));
        registry.register_skill(
            Skill::new("cleave", "Cleave")
                .for_class("warrior")
                .with_cost_and_power(5, 8),
        );
        registry.register_skill(
            Skill::new("fireball", "Fireball")
                .for_class("mage")
                .with_cost_and_power(10, 15)
                .with_element(Element::Fire),
        );
        registry.register_skill(Skill::new("second_wind", "Second Wind").with_required_level(2));
        registry
    }

    fn warrior() -> Character {
        Character::new("Ada", "warrior", &ItemCatalog::new())
    }

    #[test]
    fn test_skills_for_class_includes_universal() {
        let registry = registry();
        let mut ids: Vec<_> = registry
            .skills_for_class(&ClassId::new("warrior"))
            .map(|s| s.id.as_str().to_string())
            .collect();
        ids.sort();
        assert_eq!(ids, vec!["cleave", "fist_attack", "second_wind"]);
    }

    #[test]
    fn test_unlock_skill_spends_point() {
        let registry = registry();
        let mut c = warrior();
        c.skill_points = 1;

        registry.unlock_skill(&mut c, &SkillId::new("cleave")).expect("unlocks");
        assert!(c.skills.contains(&SkillId::new("cleave")));
        assert_eq!(c.skill_points, 0);
    }

    #[test]
    fn test_unlock_skill_rejections() {
        let registry = registry();
        let mut c = warrior();

        assert_eq!(
            registry.unlock_skill(&mut c, &SkillId::new("cleave")).map(|s| s.id.clone()),
            Err(CoreError::InsufficientPoints("skill"))
        );
        c.skill_points = 5;
        assert!(matches!(
            registry.unlock_skill(&mut c, &SkillId::new("fireball")),
            Err(CoreError::InvalidAction(_))
        ));
        assert!(matches!(
            registry.unlock_skill(&mut c, &SkillId::new("second_wind")),
            Err(CoreError::InvalidAction(_))
        ));
        assert!(matches!(
            registry.unlock_skill(&mut c, &SkillId::new("meteor")),
            Err(CoreError::MissingReference { .. })
        ));
        assert_eq!(c.skill_points, 5);
    }

    #[test]
    fn test_unlock_class_gates_on_level() {
        let registry = registry();
        let mut c = warrior();
        assert!(registry.unlock_class(&mut c, &ClassId::new("mage")).is_err());

        c.level = 3;
        registry.unlock_class(&mut c, &ClassId::new("mage")).expect("unlocks");
        registry.switch_class(&mut c, &ClassId::new("mage")).expect("switches");
        assert_eq!(c.class, ClassId::new("mage"));

        c.skill_points = 1;
        registry.unlock_skill(&mut c, &SkillId::new("fireball")).expect("mage skill");
    }

    #[test]
    fn test_usable_requires_unlock() {
        let registry = registry();
        let c = warrior();
        assert!(registry.usable(&c, &SkillId::fist_attack()).is_ok());
        assert!(registry.usable(&c, &SkillId::new("cleave")).is_err());
    }

    #[test]
    fn test_reregistering_skill_moves_index() {
        let mut registry = registry();
        registry.register_skill(Skill::new("cleave", "Cleave").for_class("mage"));
        assert!(registry
            .skills_for_class(&ClassId::new("warrior"))
            .all(|s| s.id != SkillId::new("cleave")));
        assert_eq!(registry.skill_count(), 4);
    }
}
