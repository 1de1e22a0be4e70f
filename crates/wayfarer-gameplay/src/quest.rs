//! Quest tracking.
//!
//! A character works on at most one quest at a time. World events (kills,
//! level-ups, skill unlocks, item use, shelter placement) all go through
//! [`QuestBook::report_event`], which is the only code that advances or
//! completes quests. Completing a quest grants its rewards and activates the
//! next quest of its chain at zero progress.

use crate::character::{ActiveQuest, Character};
use crate::item::ItemCatalog;
use crate::notify::{Notifier, Severity};
use crate::progression::{LevelUpReport, Progression, RewardBundle};
use ahash::AHashMap;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use tracing::{debug, info, warn};
use wayfarer_common::{CoreError, CoreResult, ItemId, MonsterKey, QuestId, ReferenceKind, SkillId};

/// The kind of condition a quest objective tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectiveKind {
    /// Kill a specific monster.
    KillMonster,
    /// Reach a level.
    ReachLevel,
    /// Unlock skills.
    UnlockSkill,
    /// Use a specific item.
    UseItem,
    /// Validate a location (place a shelter).
    SetLocation,
}

const fn one() -> u32 {
    1
}

/// The single condition of a quest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum QuestObjective {
    /// Kill `count` monsters spawned from `target`.
    KillMonster {
        /// Bestiary key to match
        target: MonsterKey,
        /// Required kills
        #[serde(default = "one")]
        count: u32,
    },
    /// Reach `level`. A threshold, not a counter.
    ReachLevel {
        /// Level to reach
        level: u32,
    },
    /// Unlock `count` skills, any skill counts.
    UnlockSkill {
        /// Required unlocks
        #[serde(default = "one")]
        count: u32,
    },
    /// Use `item` `count` times.
    UseItem {
        /// Item to match
        item: ItemId,
        /// Required uses
        #[serde(default = "one")]
        count: u32,
    },
    /// Validate a location `count` times.
    SetLocation {
        /// Required validations
        #[serde(default = "one")]
        count: u32,
    },
}

impl QuestObjective {
    /// The kind of this objective.
    #[must_use]
    pub const fn kind(&self) -> ObjectiveKind {
        match self {
            Self::KillMonster { .. } => ObjectiveKind::KillMonster,
            Self::ReachLevel { .. } => ObjectiveKind::ReachLevel,
            Self::UnlockSkill { .. } => ObjectiveKind::UnlockSkill,
            Self::UseItem { .. } => ObjectiveKind::UseItem,
            Self::SetLocation { .. } => ObjectiveKind::SetLocation,
        }
    }

    /// Progress needed to complete.
    #[must_use]
    pub const fn required_count(&self) -> u32 {
        match self {
            Self::KillMonster { count, .. }
            | Self::UnlockSkill { count }
            | Self::UseItem { count, .. }
            | Self::SetLocation { count } => *count,
            Self::ReachLevel { .. } => 1,
        }
    }

    /// Check if an event counts toward this objective.
    #[must_use]
    pub fn matches(&self, event: &QuestEvent) -> bool {
        match (self, event) {
            (Self::KillMonster { target, .. }, QuestEvent::MonsterKilled(key)) => target == key,
            (Self::UseItem { item, .. }, QuestEvent::ItemUsed(used)) => item == used,
            (Self::ReachLevel { level }, QuestEvent::LevelReached(reached)) => reached >= level,
            (Self::UnlockSkill { .. }, QuestEvent::SkillUnlocked(_))
            | (Self::SetLocation { .. }, QuestEvent::LocationSet) => true,
            _ => false,
        }
    }

    /// Human-readable summary.
    #[must_use]
    pub fn description(&self) -> String {
        match self {
            Self::KillMonster { target, count } => format!("Defeat {count} {target}"),
            Self::ReachLevel { level } => format!("Reach level {level}"),
            Self::UnlockSkill { count } => format!("Unlock {count} skill(s)"),
            Self::UseItem { item, count } => format!("Use {item} {count} time(s)"),
            Self::SetLocation { count } => format!("Set up camp {count} time(s)"),
        }
    }
}

/// Something that happened in the world.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum QuestEvent {
    /// A monster was defeated.
    MonsterKilled(MonsterKey),
    /// The character is now at this level.
    LevelReached(u32),
    /// A skill was unlocked.
    SkillUnlocked(SkillId),
    /// An item was used.
    ItemUsed(ItemId),
    /// A location was validated.
    LocationSet,
}

impl QuestEvent {
    /// Objective kind this event can advance.
    #[must_use]
    pub const fn kind(&self) -> ObjectiveKind {
        match self {
            Self::MonsterKilled(_) => ObjectiveKind::KillMonster,
            Self::LevelReached(_) => ObjectiveKind::ReachLevel,
            Self::SkillUnlocked(_) => ObjectiveKind::UnlockSkill,
            Self::ItemUsed(_) => ObjectiveKind::UseItem,
            Self::LocationSet => ObjectiveKind::SetLocation,
        }
    }
}

/// A quest definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quest {
    /// Unique identifier
    pub id: QuestId,
    /// Title
    pub title: String,
    /// Display text
    #[serde(default)]
    pub description: String,
    /// What must be done
    pub objective: QuestObjective,
    /// Granted on completion
    #[serde(default)]
    pub rewards: RewardBundle,
    /// Quest activated on completion
    #[serde(default)]
    pub next: Option<QuestId>,
}

impl Quest {
    /// Creates a quest with no rewards and no follow-up.
    #[must_use]
    pub fn new(id: impl Into<QuestId>, title: impl Into<String>, objective: QuestObjective) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            description: String::new(),
            objective,
            rewards: RewardBundle::default(),
            next: None,
        }
    }

    /// Sets the rewards.
    #[must_use]
    pub fn with_rewards(mut self, rewards: RewardBundle) -> Self {
        self.rewards = rewards;
        self
    }

    /// Chains a follow-up quest.
    #[must_use]
    pub fn then(mut self, next: impl Into<QuestId>) -> Self {
        self.next = Some(next.into());
        self
    }
}

/// What a call to [`QuestBook::report_event`] changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QuestUpdate {
    /// The active quest's progress moved
    pub progressed: bool,
    /// Quests completed, in order
    pub completed: Vec<QuestId>,
    /// Quest active after the call, if a new one was activated
    pub activated: Option<QuestId>,
    /// Level-ups caused by quest rewards
    pub level_ups: LevelUpReport,
}

impl QuestUpdate {
    /// Check if nothing changed.
    #[must_use]
    pub fn is_noop(&self) -> bool {
        !self.progressed && self.completed.is_empty()
    }
}

/// Every quest definition.
#[derive(Debug, Clone, Default)]
pub struct QuestBook {
    quests: AHashMap<QuestId, Quest>,
    first: Option<QuestId>,
}

impl QuestBook {
    /// Creates an empty quest book.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a quest.
    pub fn register(&mut self, quest: Quest) {
        self.quests.insert(quest.id.clone(), quest);
    }

    /// Sets the quest new characters start with.
    pub fn set_first(&mut self, id: impl Into<QuestId>) {
        self.first = Some(id.into());
    }

    /// The quest new characters start with.
    #[must_use]
    pub const fn first(&self) -> Option<&QuestId> {
        self.first.as_ref()
    }

    /// Looks up a quest.
    #[must_use]
    pub fn get(&self, id: &QuestId) -> Option<&Quest> {
        self.quests.get(id)
    }

    /// Iterates over all quests.
    pub fn iter(&self) -> impl Iterator<Item = &Quest> + '_ {
        self.quests.values()
    }

    /// The character's active quest definition and progress.
    #[must_use]
    pub fn active<'a>(&'a self, character: &Character) -> Option<(&'a Quest, u32)> {
        let active = character.active_quest.as_ref()?;
        self.quests.get(&active.id).map(|q| (q, active.progress))
    }

    /// Makes a quest active when none is.
    pub fn start_quest(
        &self,
        character: &mut Character,
        id: &QuestId,
        notifier: &dyn Notifier,
    ) -> CoreResult<()> {
        let quest = self
            .quests
            .get(id)
            .ok_or_else(|| CoreError::missing(ReferenceKind::Quest, id))?;
        if let Some(active) = &character.active_quest {
            return Err(CoreError::invalid_action(format!(
                "quest {} is already in progress",
                active.id
            )));
        }
        if character.has_completed(id) {
            return Err(CoreError::invalid_action(format!(
                "{} is already completed",
                quest.title
            )));
        }
        character.active_quest = Some(ActiveQuest::new(id.clone()));
        notifier.notify(&format!("New quest: {}", quest.title), Severity::Info);
        info!("{} started quest {}", character.name, id);
        Ok(())
    }

    /// Applies a world event to the character's active quest.
    ///
    /// Completion grants rewards through `progression`. When a completion
    /// activates the next quest, the character's current level is re-reported
    /// so a reach-level follow-up already satisfied completes immediately.
    pub fn report_event(
        &self,
        character: &mut Character,
        event: QuestEvent,
        progression: &Progression,
        catalog: &ItemCatalog,
        notifier: &dyn Notifier,
    ) -> QuestUpdate {
        let mut update = QuestUpdate {
            level_ups: LevelUpReport {
                new_level: character.level,
                ..LevelUpReport::default()
            },
            ..QuestUpdate::default()
        };
        let mut pending = VecDeque::from([event]);
        // Bounds chain walking if data ever forms a cycle.
        let mut completions_left = self.quests.len();

        while let Some(event) = pending.pop_front() {
            let Some(active) = character.active_quest.as_mut() else {
                break;
            };
            let Some(quest) = self.quests.get(&active.id) else {
                warn!("Active quest {} is not registered", active.id);
                break;
            };
            if !quest.objective.matches(&event) {
                continue;
            }

            active.progress = match quest.objective {
                QuestObjective::ReachLevel { .. } => 1,
                _ => active.progress.saturating_add(1),
            };
            update.progressed = true;
            debug!(
                "Quest {} progress {}/{}",
                quest.id,
                active.progress,
                quest.objective.required_count()
            );

            if active.progress < quest.objective.required_count() {
                continue;
            }

            self.complete(character, quest, progression, catalog, notifier, &mut update);
            if update.activated.is_some() && !update.completed.is_empty() {
                pending.push_back(QuestEvent::LevelReached(character.level));
            }

            completions_left = completions_left.saturating_sub(1);
            if completions_left == 0 {
                break;
            }
        }

        update
    }

    fn complete(
        &self,
        character: &mut Character,
        quest: &Quest,
        progression: &Progression,
        catalog: &ItemCatalog,
        notifier: &dyn Notifier,
        update: &mut QuestUpdate,
    ) {
        character.active_quest = None;
        character.completed_quests.insert(quest.id.clone());
        update.completed.push(quest.id.clone());
        notifier.notify(&format!("Quest complete: {}", quest.title), Severity::Success);
        info!("{} completed quest {}", character.name, quest.id);

        let report = progression.apply_rewards(character, &quest.rewards, catalog);
        report.announce(notifier);
        update.level_ups.merge(report);

        update.activated = None;
        let Some(next_id) = &quest.next else {
            return;
        };
        match self.quests.get(next_id) {
            Some(next) if !character.has_completed(next_id) => {
                character.active_quest = Some(ActiveQuest::new(next_id.clone()));
                update.activated = Some(next_id.clone());
                notifier.notify(&format!("New quest: {}", next.title), Severity::Info);
                info!("{} started quest {}", character.name, next_id);
            },
            Some(_) => warn!("Next quest {next_id} was already completed"),
            None => warn!("Next quest {next_id} is not registered"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::NotificationLog;

    fn book() -> QuestBook {
        let mut book = QuestBook::new();
        book.register(
            Quest::new(
                "q_rats",
                "Rat Problem",
                QuestObjective::KillMonster {
                    target: MonsterKey::new("rat"),
                    count: 2,
                },
            )
            .with_rewards(RewardBundle::new(40, 15).with_item("potion"))
            .then("q_level"),
        );
        book.register(
            Quest::new("q_level", "Growing Stronger", QuestObjective::ReachLevel { level: 2 })
                .with_rewards(RewardBundle::new(0, 50))
                .then("q_camp"),
        );
        book.register(Quest::new(
            "q_camp",
            "A Place to Rest",
            QuestObjective::SetLocation { count: 1 },
        ));
        book.set_first("q_rats");
        book
    }

    fn hero(book: &QuestBook, log: &NotificationLog) -> Character {
        let mut c = Character::new("Ada", "warrior", &ItemCatalog::new());
        let first = book.first().cloned().expect("first quest");
        book.start_quest(&mut c, &first, log).expect("starts");
        c
    }

    fn report(book: &QuestBook, c: &mut Character, event: QuestEvent, log: &NotificationLog) -> QuestUpdate {
        book.report_event(c, event, &Progression::default(), &ItemCatalog::new(), log)
    }

    #[test]
    fn test_unmatched_events_do_nothing() {
        let book = book();
        let log = NotificationLog::new();
        let mut c = hero(&book, &log);
        let before = c.clone();

        let u1 = report(&book, &mut c, QuestEvent::MonsterKilled(MonsterKey::new("wolf")), &log);
        let u2 = report(&book, &mut c, QuestEvent::LocationSet, &log);
        assert!(u1.is_noop());
        assert!(u2.is_noop());
        assert_eq!(c, before);
    }

    #[test]
    fn test_kill_counter_then_chain() {
        let book = book();
        let log = NotificationLog::new();
        let mut c = hero(&book, &log);
        let rat = QuestEvent::MonsterKilled(MonsterKey::new("rat"));

        let first = report(&book, &mut c, rat.clone(), &log);
        assert!(first.progressed);
        assert_eq!(c.active_quest.as_ref().map(|q| q.progress), Some(1));

        let second = report(&book, &mut c, rat, &log);
        assert_eq!(second.completed, vec![QuestId::new("q_rats")]);
        assert_eq!(second.activated, Some(QuestId::new("q_level")));
        assert!(c.has_completed(&QuestId::new("q_rats")));
        assert_eq!(c.active_quest, Some(ActiveQuest::new(QuestId::new("q_level"))));
        assert_eq!(c.gold, 15);
        assert_eq!(c.experience, 40);
        assert_eq!(c.inventory, vec![ItemId::new("potion")]);
        assert!(log.contains("Quest complete: Rat Problem"));
        assert!(log.contains("New quest: Growing Stronger"));
    }

    #[test]
    fn test_reach_level_is_a_threshold() {
        let book = book();
        let log = NotificationLog::new();
        let mut c = Character::new("Ada", "warrior", &ItemCatalog::new());
        book.start_quest(&mut c, &QuestId::new("q_level"), &log).expect("starts");

        assert!(report(&book, &mut c, QuestEvent::LevelReached(1), &log).is_noop());
        let update = report(&book, &mut c, QuestEvent::LevelReached(5), &log);
        assert_eq!(update.completed, vec![QuestId::new("q_level")]);
        assert_eq!(c.active_quest, Some(ActiveQuest::new(QuestId::new("q_camp"))));
    }

    #[test]
    fn test_reward_level_up_cascades_into_next_quest() {
        let mut book = book();
        // Enough experience to level up on completion.
        book.register(
            Quest::new(
                "q_rats",
                "Rat Problem",
                QuestObjective::KillMonster {
                    target: MonsterKey::new("rat"),
                    count: 1,
                },
            )
            .with_rewards(RewardBundle::new(100, 0))
            .then("q_level"),
        );
        let log = NotificationLog::new();
        let mut c = hero(&book, &log);

        let update = report(&book, &mut c, QuestEvent::MonsterKilled(MonsterKey::new("rat")), &log);
        assert_eq!(
            update.completed,
            vec![QuestId::new("q_rats"), QuestId::new("q_level")]
        );
        assert_eq!(update.activated, Some(QuestId::new("q_camp")));
        assert_eq!(update.level_ups.levels_gained, 1);
        assert_eq!(c.level, 2);
        assert_eq!(c.gold, 50);
        assert!(log.contains("Level up!"));
    }

    #[test]
    fn test_chain_never_leaves_two_active() {
        let book = book();
        let log = NotificationLog::new();
        let mut c = hero(&book, &log);
        for _ in 0..2 {
            report(&book, &mut c, QuestEvent::MonsterKilled(MonsterKey::new("rat")), &log);
        }
        let active = c.active_quest.as_ref().map(|q| q.id.clone());
        assert_eq!(active, Some(QuestId::new("q_level")));
        assert!(!c.completed_quests.contains(&QuestId::new("q_level")));
        assert_eq!(c.active_quest.as_ref().map(|q| q.progress), Some(0));
    }

    #[test]
    fn test_start_quest_rejections() {
        let book = book();
        let log = NotificationLog::new();
        let mut c = hero(&book, &log);
        assert!(matches!(
            book.start_quest(&mut c, &QuestId::new("q_camp"), &log),
            Err(CoreError::InvalidAction(_))
        ));
        assert!(matches!(
            book.start_quest(&mut c, &QuestId::new("q_nope"), &log),
            Err(CoreError::MissingReference { .. })
        ));

        c.active_quest = None;
        c.completed_quests.insert(QuestId::new("q_camp"));
        assert!(book.start_quest(&mut c, &QuestId::new("q_camp"), &log).is_err());
    }

    #[test]
    fn test_objective_deserializes_from_table() {
        let json = r#"{ "kind": "use_item", "item": "potion" }"#;
        let objective: QuestObjective = serde_json::from_str(json).expect("valid objective");
        assert_eq!(objective.required_count(), 1);
        assert!(objective.matches(&QuestEvent::ItemUsed(ItemId::new("potion"))));
        assert!(!objective.matches(&QuestEvent::ItemUsed(ItemId::new("elixir"))));
        assert_eq!(objective.kind(), QuestEvent::ItemUsed(ItemId::new("x")).kind());
    }
}
