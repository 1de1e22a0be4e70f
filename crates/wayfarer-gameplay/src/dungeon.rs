//! Dungeons anchored to real-world points of interest.
//!
//! A point of interest names a dungeon type. Entering it rolls one monster and
//! one boss from the type's pools and scales both to the player's level:
//! `level_factor = max(0, level - 1)`, then each stat grows linearly
//! (see [`ScalingRates::STANDARD`]). Tutorial points always spawn the training
//! dummy, unscaled.

use crate::monster::{Bestiary, Monster, ScalingRates};
use crate::progression::RewardBundle;
use crate::rng::RandomSource;
use ahash::AHashMap;
use serde::{Deserialize, Serialize};
use tracing::info;
use wayfarer_common::{CoreError, CoreResult, DungeonTypeId, GeoPoint, MonsterKey, PoiId, ReferenceKind};

/// Template shared by every point of interest of one kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DungeonType {
    /// Unique identifier
    pub id: DungeonTypeId,
    /// Display name
    pub name: String,
    /// Narrative flavor (crypt, ruins, forest shrine...)
    #[serde(default)]
    pub narrative: String,
    /// Regular monsters to pick from
    pub monsters: Vec<MonsterKey>,
    /// Bosses to pick from
    pub bosses: Vec<MonsterKey>,
    /// Granted when the boss falls
    #[serde(default)]
    pub rewards: RewardBundle,
}

/// A real-world location hosting a dungeon.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointOfInterest {
    /// Unique identifier
    pub id: PoiId,
    /// Display name
    pub name: String,
    /// Geographic anchor
    pub anchor: GeoPoint,
    /// Dungeon type to instantiate
    pub dungeon_type: DungeonTypeId,
    /// Difficulty tier shown to the player
    #[serde(default = "default_difficulty")]
    pub difficulty: u32,
    /// Forces the training dummy
    #[serde(default)]
    pub tutorial: bool,
}

const fn default_difficulty() -> u32 {
    1
}

/// A dungeon instantiated for one visit. Discarded on exit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DungeonInstance {
    /// Point of interest it was created from
    pub poi: PoiId,
    /// Display name
    pub name: String,
    /// Geographic anchor
    pub anchor: GeoPoint,
    /// Difficulty tier
    pub difficulty: u32,
    /// Narrative flavor
    pub narrative: String,
    /// Regular monsters, fought in order
    pub monsters: Vec<Monster>,
    /// Final opponent
    pub boss: Monster,
    /// Granted when the boss falls
    pub rewards: RewardBundle,
}

/// Dungeon types and points of interest.
#[derive(Debug, Clone, Default)]
pub struct DungeonAtlas {
    types: AHashMap<DungeonTypeId, DungeonType>,
    pois: AHashMap<PoiId, PointOfInterest>,
}

impl DungeonAtlas {
    /// Creates an empty atlas.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a dungeon type.
    pub fn register_type(&mut self, dungeon_type: DungeonType) {
        self.types.insert(dungeon_type.id.clone(), dungeon_type);
    }

    /// Registers a point of interest.
    pub fn register_poi(&mut self, poi: PointOfInterest) {
        self.pois.insert(poi.id.clone(), poi);
    }

    /// Looks up a dungeon type.
    #[must_use]
    pub fn dungeon_type(&self, id: &DungeonTypeId) -> Option<&DungeonType> {
        self.types.get(id)
    }

    /// Iterates over dungeon types.
    pub fn types(&self) -> impl Iterator<Item = &DungeonType> + '_ {
        self.types.values()
    }

    /// Looks up a point of interest.
    pub fn poi(&self, id: &PoiId) -> CoreResult<&PointOfInterest> {
        self.pois
            .get(id)
            .ok_or_else(|| CoreError::missing(ReferenceKind::Poi, id))
    }

    /// Points of interest sorted by identifier.
    #[must_use]
    pub fn pois(&self) -> Vec<&PointOfInterest> {
        let mut pois: Vec<_> = self.pois.values().collect();
        pois.sort_by(|a, b| a.id.cmp(&b.id));
        pois
    }

    /// Instantiates the dungeon at `poi` for a player of `player_level`.
    pub fn instantiate(
        &self,
        poi: &PointOfInterest,
        player_level: u32,
        bestiary: &Bestiary,
        rng: &mut dyn RandomSource,
    ) -> CoreResult<DungeonInstance> {
        let template = self
            .types
            .get(&poi.dungeon_type)
            .ok_or_else(|| CoreError::InvalidDungeonType(poi.dungeon_type.to_string()))?;

        let (monster_key, boss_key) = if poi.tutorial {
            (MonsterKey::training_dummy(), MonsterKey::training_dummy())
        } else {
            (
                pick(&template.monsters, rng)?.clone(),
                pick(&template.bosses, rng)?.clone(),
            )
        };

        let level_factor = if poi.tutorial {
            0
        } else {
            player_level.saturating_sub(1)
        };
        let rates = ScalingRates::STANDARD;
        let monster = bestiary.require(&monster_key)?.spawn(level_factor, rates);
        let boss = bestiary.require(&boss_key)?.spawn(level_factor, rates);

        info!(
            "Entered {} at {} (level factor {level_factor}): {} then {}",
            poi.name, poi.anchor, monster.name, boss.name
        );

        Ok(DungeonInstance {
            poi: poi.id.clone(),
            name: poi.name.clone(),
            anchor: poi.anchor,
            difficulty: poi.difficulty,
            narrative: template.narrative.clone(),
            monsters: vec![monster],
            boss,
            rewards: template.rewards.clone(),
        })
    }
}

fn pick<'a>(pool: &'a [MonsterKey], rng: &mut dyn RandomSource) -> CoreResult<&'a MonsterKey> {
    if pool.is_empty() {
        return Err(CoreError::missing(ReferenceKind::Monster, "<empty pool>"));
    }
    let index = rng.pick_index(pool.len());
    pool.get(index)
        .ok_or_else(|| CoreError::missing(ReferenceKind::Monster, index))
}

// ============================================================================
// Dungeon runs
// ============================================================================

/// Which opponent of a dungeon comes next.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DungeonRun {
    instance: DungeonInstance,
    defeated: usize,
}

impl DungeonRun {
    /// Starts a run at the first monster.
    #[must_use]
    pub const fn new(instance: DungeonInstance) -> Self {
        Self {
            instance,
            defeated: 0,
        }
    }

    /// The dungeon being run.
    #[must_use]
    pub const fn instance(&self) -> &DungeonInstance {
        &self.instance
    }

    /// Next opponent, or `None` once the boss is down.
    #[must_use]
    pub fn next_opponent(&self) -> Option<&Monster> {
        let monsters = &self.instance.monsters;
        match self.defeated.cmp(&monsters.len()) {
            std::cmp::Ordering::Less => monsters.get(self.defeated),
            std::cmp::Ordering::Equal => Some(&self.instance.boss),
            std::cmp::Ordering::Greater => None,
        }
    }

    /// Check if the next opponent is the boss.
    #[must_use]
    pub fn at_boss(&self) -> bool {
        self.defeated == self.instance.monsters.len()
    }

    /// Marks the current opponent as defeated.
    pub fn record_victory(&mut self) {
        if !self.is_cleared() {
            self.defeated += 1;
        }
    }

    /// Check if the boss has been defeated.
    #[must_use]
    pub fn is_cleared(&self) -> bool {
        self.defeated > self.instance.monsters.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monster::MonsterTemplate;
    use crate::rng::ScriptedRandom;

    fn bestiary() -> Bestiary {
        let mut b = Bestiary::new();
        b.register(MonsterTemplate::new("rat", "Rat", 20, 4).with_rewards(10, 2));
        b.register(MonsterTemplate::new("wolf", "Wolf", 35, 7).with_defense(2).with_rewards(25, 6));
        b.register(MonsterTemplate::new("troll", "Troll", 120, 14).with_defense(5).with_rewards(150, 60));
        b.register(MonsterTemplate::new("training_dummy", "Training Dummy", 15, 1).tutorial());
        b
    }

    fn atlas() -> DungeonAtlas {
        let mut atlas = DungeonAtlas::new();
        atlas.register_type(DungeonType {
            id: DungeonTypeId::new("forest"),
            name: "Forest Den".into(),
            narrative: "Something stirs beneath the oaks.".into(),
            monsters: vec![MonsterKey::new("rat"), MonsterKey::new("wolf")],
            bosses: vec![MonsterKey::new("troll")],
            rewards: RewardBundle::new(50, 20),
        });
        atlas
    }

    fn poi(dungeon_type: &str, tutorial: bool) -> PointOfInterest {
        PointOfInterest {
            id: PoiId::new("park"),
            name: "City Park".into(),
            anchor: GeoPoint::new(48.85, 2.35),
            dungeon_type: DungeonTypeId::new(dungeon_type),
            difficulty: 1,
            tutorial,
        }
    }

    #[test]
    fn test_instantiate_scales_by_level() {
        let mut rng = ScriptedRandom::new().with_picks([1, 0]);
        let d = atlas()
            .instantiate(&poi("forest", false), 3, &bestiary(), &mut rng)
            .expect("valid dungeon");

        let wolf = &d.monsters[0];
        assert_eq!(wolf.name, "Wolf");
        assert_eq!(wolf.hp, 45);
        assert_eq!(wolf.attack, 11);
        assert_eq!(wolf.defense, 4);
        assert_eq!(wolf.experience, 45);
        assert_eq!(wolf.gold, 16);
        assert_eq!(d.boss.name, "Troll");
        assert_eq!(d.boss.hp, 130);
        assert_eq!(d.rewards, RewardBundle::new(50, 20));
    }

    #[test]
    fn test_level_one_is_unscaled() {
        let mut rng = ScriptedRandom::new();
        let d = atlas()
            .instantiate(&poi("forest", false), 1, &bestiary(), &mut rng)
            .expect("valid dungeon");
        assert_eq!(d.monsters[0].hp, 20);
        assert_eq!(d.boss.hp, 120);
    }

    #[test]
    fn test_tutorial_forces_dummy() {
        let mut rng = ScriptedRandom::new().with_picks([1, 0]);
        let d = atlas()
            .instantiate(&poi("forest", true), 10, &bestiary(), &mut rng)
            .expect("valid dungeon");
        assert_eq!(d.monsters[0].key, MonsterKey::training_dummy());
        assert_eq!(d.boss.key, MonsterKey::training_dummy());
        assert_eq!(d.boss.hp, 15);
    }

    #[test]
    fn test_unknown_dungeon_type() {
        let mut rng = ScriptedRandom::new();
        let err = atlas()
            .instantiate(&poi("volcano", false), 1, &bestiary(), &mut rng)
            .expect_err("no template");
        assert_eq!(err, CoreError::InvalidDungeonType("volcano".into()));
    }

    #[test]
    fn test_run_goes_monster_then_boss() {
        let mut rng = ScriptedRandom::new();
        let d = atlas()
            .instantiate(&poi("forest", false), 1, &bestiary(), &mut rng)
            .expect("valid dungeon");
        let mut run = DungeonRun::new(d);

        assert_eq!(run.next_opponent().map(|m| m.name.as_str()), Some("Rat"));
        assert!(!run.at_boss());
        run.record_victory();
        assert!(run.at_boss());
        assert_eq!(run.next_opponent().map(|m| m.name.as_str()), Some("Troll"));
        run.record_victory();
        assert!(run.is_cleared());
        assert!(run.next_opponent().is_none());
        run.record_victory();
        assert!(run.is_cleared());
    }
}
