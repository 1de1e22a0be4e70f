//! Game session.
//!
//! A [`GameSession`] owns the character and every collaborator, and is the
//! surface the outer application drives. Each operation validates first,
//! mutates only on success, routes world events through the quest book, then
//! saves. A failed save becomes a warning notification; in-memory state stays
//! authoritative.

use crate::battle::{Battle, BattleEnv, BattleEvent, BattleOutcome, PlayerAction};
use crate::character::{Character, ItemUse};
use crate::clock::{Clock, GameTime, SystemClock};
use crate::config::GameConfig;
use crate::damage::DamageResolver;
use crate::data::GameData;
use crate::dungeon::{DungeonInstance, DungeonRun};
use crate::item::EquipSlot;
use crate::notify::{Notifier, Severity, TracingNotifier};
use crate::persist::{CharacterStore, JsonFileStore};
use crate::progression::{LevelUpReport, Progression, RewardBundle};
use crate::quest::{QuestEvent, QuestUpdate};
use crate::rng::{seeded, RandomSource};
use crate::stats::StatKind;
use std::sync::Arc;
use tracing::{debug, info, warn};
use wayfarer_common::{ClassId, CoreError, CoreResult, GeoPoint, ItemId, PoiId, QuestId, ReferenceKind, SkillId};

/// Creates a level 1 character with the starting items and first quest.
pub fn create_character(
    data: &GameData,
    name: &str,
    class: &ClassId,
    notifier: &dyn Notifier,
) -> CoreResult<Character> {
    let name = name.trim();
    if name.is_empty() {
        return Err(CoreError::invalid_action("a character needs a name"));
    }
    let class_def = data
        .skills
        .class(class)
        .ok_or_else(|| CoreError::missing(ReferenceKind::Class, class))?;
    if class_def.required_level > 1 {
        return Err(CoreError::invalid_action(format!(
            "{} can only be chosen from level {}",
            class_def.name, class_def.required_level
        )));
    }

    let mut character = Character::new(name, class.clone(), &data.items);
    character.inventory.extend(data.starting_items.iter().cloned());
    if let Some(first) = data.quests.first() {
        data.quests.start_quest(&mut character, first, notifier)?;
    }
    info!("Created {} the {}", character.name, class_def.name);
    Ok(character)
}

/// Something the session did, for the outer application to present.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// A dungeon was entered.
    DungeonEntered {
        /// Point of interest
        poi: PoiId,
        /// Dungeon name
        name: String,
    },
    /// A new battle started.
    EncounterStarted {
        /// Opponent name
        monster: String,
        /// Whether the opponent is the dungeon boss
        boss: bool,
    },
    /// A battle step resolved.
    Battle(BattleEvent),
    /// The boss fell and the dungeon reward was granted.
    DungeonCleared {
        /// Reward bundle
        rewards: RewardBundle,
        /// Level-ups from the reward
        level_ups: LevelUpReport,
    },
    /// The player left the dungeon after a defeat or a flight.
    DungeonLeft(BattleOutcome),
    /// Quest state changed outside of battle.
    Quest(QuestUpdate),
}

#[derive(Debug)]
struct Encounter {
    run: DungeonRun,
    battle: Battle,
}

/// The running game for one character.
pub struct GameSession {
    character: Character,
    data: GameData,
    config: GameConfig,
    progression: Progression,
    resolver: DamageResolver,
    clock: Arc<dyn Clock>,
    rng: Box<dyn RandomSource>,
    notifier: Arc<dyn Notifier>,
    store: Box<dyn CharacterStore>,
    encounter: Option<Encounter>,
}

impl std::fmt::Debug for GameSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GameSession")
            .field("character", &self.character.name)
            .field("level", &self.character.level)
            .field("in_dungeon", &self.encounter.is_some())
            .finish_non_exhaustive()
    }
}

impl GameSession {
    /// Creates a session with a wall clock, a config-seeded generator, tracing
    /// notifications and a JSON file store at the configured save path.
    #[must_use]
    pub fn new(character: Character, data: GameData, config: GameConfig) -> Self {
        let store = JsonFileStore::new(config.save_path.clone());
        Self {
            character,
            data,
            progression: config.progression(),
            resolver: config.resolver(),
            clock: Arc::new(SystemClock::new()),
            rng: Box::new(seeded(config.rng_seed)),
            notifier: Arc::new(TracingNotifier),
            store: Box::new(store),
            config,
            encounter: None,
        }
    }

    /// Replaces the clock.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Replaces the random source.
    #[must_use]
    pub fn with_rng(mut self, rng: Box<dyn RandomSource>) -> Self {
        self.rng = rng;
        self
    }

    /// Replaces the notifier.
    #[must_use]
    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    /// Replaces the store.
    #[must_use]
    pub fn with_store(mut self, store: Box<dyn CharacterStore>) -> Self {
        self.store = store;
        self
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    /// The character.
    #[must_use]
    pub const fn character(&self) -> &Character {
        &self.character
    }

    /// Game data.
    #[must_use]
    pub const fn data(&self) -> &GameData {
        &self.data
    }

    /// Configuration.
    #[must_use]
    pub const fn config(&self) -> &GameConfig {
        &self.config
    }

    /// Current game time.
    #[must_use]
    pub fn now(&self) -> GameTime {
        self.clock.now()
    }

    /// Last validated camp location.
    #[must_use]
    pub const fn camp(&self) -> Option<GeoPoint> {
        self.character.camp
    }

    /// Check if a dungeon run is in progress.
    #[must_use]
    pub const fn in_dungeon(&self) -> bool {
        self.encounter.is_some()
    }

    /// The current dungeon, if any.
    #[must_use]
    pub fn dungeon(&self) -> Option<&DungeonInstance> {
        self.encounter.as_ref().map(|e| e.run.instance())
    }

    /// The current battle, if any.
    #[must_use]
    pub fn battle(&self) -> Option<&Battle> {
        self.encounter.as_ref().map(|e| &e.battle)
    }

    /// When [`GameSession::tick`] next has something to do.
    #[must_use]
    pub fn next_deadline(&self) -> Option<GameTime> {
        self.battle().and_then(Battle::next_deadline)
    }

    /// Saves the character now.
    pub fn save(&self) {
        match self.store.save(&self.character) {
            Ok(()) => debug!("Saved {}", self.character.name),
            Err(e) => {
                warn!("Save failed: {e}");
                self.notifier
                    .notify(&format!("Could not save your progress: {e}"), Severity::Warning);
            },
        }
    }

    fn report(&mut self, event: QuestEvent) -> QuestUpdate {
        self.data.quests.report_event(
            &mut self.character,
            event,
            &self.progression,
            &self.data.items,
            self.notifier.as_ref(),
        )
    }

    fn ensure_idle(&self) -> CoreResult<()> {
        if self.encounter.is_some() {
            return Err(CoreError::invalid_action("not while exploring a dungeon"));
        }
        Ok(())
    }

    // ========================================================================
    // Character management
    // ========================================================================

    /// Equips an item from the inventory.
    pub fn equip(&mut self, id: &ItemId) -> CoreResult<EquipSlot> {
        self.ensure_idle()?;
        let slot = self.character.equip(id, &self.data.items)?;
        self.save();
        Ok(slot)
    }

    /// Moves an equipped item back to the inventory.
    pub fn unequip(&mut self, slot: EquipSlot) -> CoreResult<ItemId> {
        self.ensure_idle()?;
        let id = self.character.unequip(slot, &self.data.items)?;
        self.save();
        Ok(id)
    }

    /// Uses a consumable.
    pub fn use_item(&mut self, id: &ItemId) -> CoreResult<(ItemUse, QuestUpdate)> {
        self.ensure_idle()?;
        let used = self.character.use_item(id, &self.data.items)?;
        self.notifier.notify(
            &format!("Recovered {} HP and {} mana", used.healed, used.restored_mana),
            Severity::Info,
        );
        let update = self.report(QuestEvent::ItemUsed(id.clone()));
        self.save();
        Ok((used, update))
    }

    /// Spends a stat point.
    pub fn spend_stat_point(&mut self, stat: StatKind) -> CoreResult<()> {
        self.ensure_idle()?;
        self.character.spend_stat_point(stat, &self.data.items)?;
        self.save();
        Ok(())
    }

    /// Spends a skill point on a skill.
    pub fn unlock_skill(&mut self, id: &SkillId) -> CoreResult<QuestUpdate> {
        self.ensure_idle()?;
        let skill = self.data.skills.unlock_skill(&mut self.character, id)?;
        self.notifier
            .notify(&format!("Learned {}", skill.name), Severity::Success);
        let update = self.report(QuestEvent::SkillUnlocked(id.clone()));
        self.save();
        Ok(update)
    }

    /// Unlocks a class.
    pub fn unlock_class(&mut self, id: &ClassId) -> CoreResult<()> {
        self.ensure_idle()?;
        let class = self.data.skills.unlock_class(&mut self.character, id)?;
        self.notifier
            .notify(&format!("{} class unlocked", class.name), Severity::Success);
        self.save();
        Ok(())
    }

    /// Switches to an unlocked class.
    pub fn switch_class(&mut self, id: &ClassId) -> CoreResult<()> {
        self.ensure_idle()?;
        self.data.skills.switch_class(&mut self.character, id)?;
        self.save();
        Ok(())
    }

    /// Starts a quest when none is active.
    pub fn start_quest(&mut self, id: &QuestId) -> CoreResult<()> {
        self.ensure_idle()?;
        self.data
            .quests
            .start_quest(&mut self.character, id, self.notifier.as_ref())?;
        self.save();
        Ok(())
    }

    /// Validates a location as the player's camp.
    pub fn set_camp(&mut self, location: GeoPoint) -> CoreResult<QuestUpdate> {
        self.ensure_idle()?;
        if !location.is_valid() {
            return Err(CoreError::invalid_action(format!("{location} is not on the map")));
        }
        self.character.camp = Some(location);
        self.character.restore_fully();
        self.notifier
            .notify(&format!("Camp set at {location}"), Severity::Success);
        let update = self.report(QuestEvent::LocationSet);
        self.save();
        Ok(update)
    }

    // ========================================================================
    // Dungeons and battles
    // ========================================================================

    /// Enters the dungeon at a point of interest and starts the first battle.
    pub fn enter_dungeon(&mut self, poi: &PoiId) -> CoreResult<Vec<SessionEvent>> {
        self.ensure_idle()?;
        let poi = self.data.atlas.poi(poi)?;
        let instance = self.data.atlas.instantiate(
            poi,
            self.character.level,
            &self.data.bestiary,
            self.rng.as_mut(),
        )?;

        let mut events = vec![SessionEvent::DungeonEntered {
            poi: instance.poi.clone(),
            name: instance.name.clone(),
        }];
        if !instance.narrative.is_empty() {
            self.notifier.notify(&instance.narrative, Severity::Info);
        }

        let run = DungeonRun::new(instance);
        let Some(first) = run.next_opponent().cloned() else {
            return Err(CoreError::invalid_action("the dungeon is empty"));
        };
        events.push(SessionEvent::EncounterStarted {
            monster: first.name.clone(),
            boss: run.at_boss(),
        });
        self.encounter = Some(Encounter {
            run,
            battle: Battle::new(first, self.config.timing()),
        });
        Ok(events)
    }

    /// Submits a player action to the current battle.
    pub fn act(&mut self, action: PlayerAction) -> CoreResult<Vec<SessionEvent>> {
        let now = self.clock.now();
        let Some(encounter) = self.encounter.as_mut() else {
            return Err(CoreError::invalid_action("there is nothing to fight"));
        };
        let mut env = BattleEnv {
            items: &self.data.items,
            skills: &self.data.skills,
            quests: &self.data.quests,
            progression: &self.progression,
            resolver: &self.resolver,
            notifier: self.notifier.as_ref(),
            rng: self.rng.as_mut(),
        };
        let events = encounter
            .battle
            .player_action(&mut self.character, action, &mut env, now)?;

        self.save();
        Ok(events.into_iter().map(SessionEvent::Battle).collect())
    }

    /// Resolves whatever is due at the current time: the monster's reply, the
    /// next encounter, or leaving the dungeon.
    pub fn tick(&mut self) -> Vec<SessionEvent> {
        let now = self.clock.now();
        let Some(encounter) = self.encounter.as_mut() else {
            return Vec::new();
        };

        let mut env = BattleEnv {
            items: &self.data.items,
            skills: &self.data.skills,
            quests: &self.data.quests,
            progression: &self.progression,
            resolver: &self.resolver,
            notifier: self.notifier.as_ref(),
            rng: self.rng.as_mut(),
        };
        let mut events: Vec<SessionEvent> = encounter
            .battle
            .advance(&mut self.character, &mut env, now)
            .into_iter()
            .map(SessionEvent::Battle)
            .collect();
        if !events.is_empty() {
            self.save();
        }

        if self.battle().is_some_and(|b| b.ready_to_return(now)) {
            events.extend(self.conclude_battle());
        }
        events
    }

    fn conclude_battle(&mut self) -> Vec<SessionEvent> {
        let Some(mut encounter) = self.encounter.take() else {
            return Vec::new();
        };
        let Some(outcome) = encounter.battle.outcome() else {
            self.encounter = Some(encounter);
            return Vec::new();
        };

        if outcome != BattleOutcome::Victory {
            info!("Left {} after {:?}", encounter.run.instance().name, outcome);
            return vec![SessionEvent::DungeonLeft(outcome)];
        }

        encounter.run.record_victory();
        if let Some(next) = encounter.run.next_opponent().cloned() {
            let boss = encounter.run.at_boss();
            if boss {
                self.notifier
                    .notify(&format!("{} blocks the way!", next.name), Severity::Warning);
            }
            let event = SessionEvent::EncounterStarted {
                monster: next.name.clone(),
                boss,
            };
            encounter.battle = Battle::new(next, self.config.timing());
            self.encounter = Some(encounter);
            return vec![event];
        }

        let instance = encounter.run.instance();
        let rewards = instance.rewards.clone();
        let level_ups = self
            .progression
            .apply_rewards(&mut self.character, &rewards, &self.data.items);
        self.notifier
            .notify(&format!("{} cleared!", instance.name), Severity::Success);
        level_ups.announce(self.notifier.as_ref());

        let mut events = vec![SessionEvent::DungeonCleared { rewards, level_ups }];
        if level_ups.leveled_up() {
            let update = self.report(QuestEvent::LevelReached(self.character.level));
            if !update.is_noop() {
                events.push(SessionEvent::Quest(update));
            }
        }
        self.save();
        events
    }
}
