//! Turn-based battle between the player and one monster.
//!
//! ```text
//! PlayerTurn --attack--> MonsterTurn{due_at} --advance--> PlayerTurn
//!     |                        |
//!     +--flee--> Ended(Fled)   +--player down--> Ended(Defeat)
//!     +--monster down--> Ended(Victory)
//! ```
//!
//! Input is only accepted in [`BattlePhase::PlayerTurn`], so an action can
//! never be submitted while the previous one (including the delayed monster
//! counter-attack) is still resolving. Time is passed in explicitly; the
//! battle never sleeps.

use crate::character::Character;
use crate::clock::GameTime;
use crate::damage::{DamageOutcome, DamageResolver, PlayerCombatant};
use crate::item::ItemCatalog;
use crate::monster::Monster;
use crate::notify::{Notifier, Severity};
use crate::progression::{LevelUpReport, Progression, RewardBundle};
use crate::quest::{QuestBook, QuestEvent, QuestUpdate};
use crate::rng::RandomSource;
use crate::skill::SkillRegistry;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};
use wayfarer_common::{CoreError, CoreResult, SkillId};

/// How a battle ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BattleOutcome {
    /// The monster was defeated.
    Victory,
    /// The player was defeated.
    Defeat,
    /// The player ran away.
    Fled,
}

/// Current state of a battle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BattlePhase {
    /// Waiting for the player's action.
    PlayerTurn,
    /// The monster strikes back once `due_at` is reached.
    MonsterTurn {
        /// When the counter-attack resolves
        due_at: GameTime,
    },
    /// Terminal state.
    Ended {
        /// How it ended
        outcome: BattleOutcome,
        /// When to go back to the overworld
        return_at: GameTime,
    },
}

/// Something the player can do on their turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlayerAction {
    /// Attack with an unlocked skill.
    Attack(SkillId),
    /// Leave the battle without rewards.
    Flee,
}

impl PlayerAction {
    /// A basic attack.
    #[must_use]
    pub fn basic_attack() -> Self {
        Self::Attack(SkillId::fist_attack())
    }
}

/// Pacing delays. They only affect when things happen, never what happens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BattleTiming {
    /// Delay between the player's action and the monster's reply
    pub monster_turn_delay: Duration,
    /// Delay between the end of the battle and the return to the overworld
    pub return_delay: Duration,
}

impl Default for BattleTiming {
    fn default() -> Self {
        Self {
            monster_turn_delay: Duration::from_millis(1000),
            return_delay: Duration::from_millis(2000),
        }
    }
}

impl BattleTiming {
    /// No delays at all.
    #[must_use]
    pub const fn instant() -> Self {
        Self {
            monster_turn_delay: Duration::ZERO,
            return_delay: Duration::ZERO,
        }
    }
}

/// Collaborators a battle needs to resolve turns.
pub struct BattleEnv<'a> {
    /// Item definitions
    pub items: &'a ItemCatalog,
    /// Skill definitions
    pub skills: &'a SkillRegistry,
    /// Quest definitions
    pub quests: &'a QuestBook,
    /// Reward and level-up rules
    pub progression: &'a Progression,
    /// Damage formula
    pub resolver: &'a DamageResolver,
    /// Player-facing messages
    pub notifier: &'a dyn Notifier,
    /// Random draws
    pub rng: &'a mut dyn RandomSource,
}

/// What happened during one call into the battle.
#[derive(Debug, Clone, PartialEq)]
pub enum BattleEvent {
    /// The player attacked.
    PlayerStruck {
        /// Skill used
        skill: SkillId,
        /// Resolution details
        outcome: DamageOutcome,
        /// Monster HP afterwards
        monster_hp: i32,
    },
    /// The monster attacked.
    MonsterStruck {
        /// Resolution details
        outcome: DamageOutcome,
        /// Player HP afterwards
        player_hp: i32,
    },
    /// Victory rewards were applied.
    Rewarded {
        /// Experience and gold granted
        rewards: RewardBundle,
        /// Level-ups from the rewards
        level_ups: LevelUpReport,
        /// Quest changes from the kill
        quests: QuestUpdate,
    },
    /// The battle reached a terminal state.
    Ended(BattleOutcome),
}

/// A battle in progress.
#[derive(Debug, Clone)]
pub struct Battle {
    monster: Monster,
    phase: BattlePhase,
    timing: BattleTiming,
    rewarded: bool,
    turns: u32,
}

impl Battle {
    /// Starts a battle on the player's turn.
    #[must_use]
    pub fn new(monster: Monster, timing: BattleTiming) -> Self {
        info!("Battle started against {} ({} HP)", monster.name, monster.hp);
        Self {
            monster,
            phase: BattlePhase::PlayerTurn,
            timing,
            rewarded: false,
            turns: 0,
        }
    }

    /// The opponent.
    #[must_use]
    pub const fn monster(&self) -> &Monster {
        &self.monster
    }

    /// Current phase.
    #[must_use]
    pub const fn phase(&self) -> BattlePhase {
        self.phase
    }

    /// Player actions taken so far.
    #[must_use]
    pub const fn turns(&self) -> u32 {
        self.turns
    }

    /// Check if a player action would be accepted.
    #[must_use]
    pub const fn accepts_input(&self) -> bool {
        matches!(self.phase, BattlePhase::PlayerTurn)
    }

    /// Outcome, once the battle has ended.
    #[must_use]
    pub const fn outcome(&self) -> Option<BattleOutcome> {
        match self.phase {
            BattlePhase::Ended { outcome, .. } => Some(outcome),
            _ => None,
        }
    }

    /// Next time [`Battle::advance`] or the return would do something.
    #[must_use]
    pub const fn next_deadline(&self) -> Option<GameTime> {
        match self.phase {
            BattlePhase::PlayerTurn => None,
            BattlePhase::MonsterTurn { due_at } => Some(due_at),
            BattlePhase::Ended { return_at, .. } => Some(return_at),
        }
    }

    /// Check if the battle is over and the return delay has elapsed.
    #[must_use]
    pub fn ready_to_return(&self, now: GameTime) -> bool {
        matches!(self.phase, BattlePhase::Ended { return_at, .. } if now >= return_at)
    }

    /// Resolves a player action.
    ///
    /// Fails without changing anything when it is not the player's turn, the
    /// skill is not unlocked, or there is not enough mana.
    pub fn player_action(
        &mut self,
        player: &mut Character,
        action: PlayerAction,
        env: &mut BattleEnv<'_>,
        now: GameTime,
    ) -> CoreResult<Vec<BattleEvent>> {
        if !self.accepts_input() {
            return Err(CoreError::invalid_action("the battle is not waiting for you"));
        }

        let skill_id = match action {
            PlayerAction::Flee => {
                env.notifier
                    .notify(&format!("You fled from {}", self.monster.name), Severity::Warning);
                return Ok(vec![self.end(BattleOutcome::Fled, now)]);
            },
            PlayerAction::Attack(skill_id) => skill_id,
        };

        let skill = env.skills.usable(player, &skill_id)?;
        player.spend_mana(skill.mana_cost)?;
        self.turns += 1;

        let attacker = PlayerCombatant::new(player, env.items);
        let power = attacker.attack_power(skill.power);
        let element = skill.element.unwrap_or_else(|| attacker.weapon_element());
        let outcome = env
            .resolver
            .resolve(&attacker, &self.monster, power, element, &mut *env.rng);

        self.monster.take_damage(outcome.damage);
        debug!(
            "{} used {} for {} damage ({} HP left)",
            player.name, skill.name, outcome.damage, self.monster.hp
        );
        env.notifier.notify(
            &format!(
                "{} hits {} for {} damage",
                skill.name, self.monster.name, outcome.damage
            ),
            Severity::Info,
        );
        if !outcome.message.is_empty() {
            env.notifier.notify(&outcome.message, Severity::Info);
        }

        let mut events = vec![BattleEvent::PlayerStruck {
            skill: skill_id,
            outcome,
            monster_hp: self.monster.hp,
        }];

        if self.monster.is_dead() {
            events.extend(self.win(player, env, now));
        } else {
            self.phase = BattlePhase::MonsterTurn {
                due_at: now.after(self.timing.monster_turn_delay),
            };
        }
        Ok(events)
    }

    /// Resolves the monster's pending counter-attack once it is due.
    pub fn advance(
        &mut self,
        player: &mut Character,
        env: &mut BattleEnv<'_>,
        now: GameTime,
    ) -> Vec<BattleEvent> {
        let BattlePhase::MonsterTurn { due_at } = self.phase else {
            return Vec::new();
        };
        if now < due_at {
            return Vec::new();
        }

        let outcome = {
            let defender = PlayerCombatant::new(player, env.items);
            env.resolver.resolve(
                &self.monster,
                &defender,
                f64::from(self.monster.attack),
                self.monster.element,
                &mut *env.rng,
            )
        };
        player.take_damage(outcome.damage);
        env.notifier.notify(
            &format!("{} hits you for {} damage", self.monster.name, outcome.damage),
            Severity::Warning,
        );
        if !outcome.message.is_empty() {
            env.notifier.notify(&outcome.message, Severity::Info);
        }

        let mut events = vec![BattleEvent::MonsterStruck {
            outcome,
            player_hp: player.hp,
        }];

        if player.is_defeated() {
            player.hp = player.stats.max_hp;
            env.notifier.notify(
                &format!("You were defeated by {}", self.monster.name),
                Severity::Error,
            );
            events.push(self.end(BattleOutcome::Defeat, now));
        } else {
            self.phase = BattlePhase::PlayerTurn;
        }
        events
    }

    fn win(&mut self, player: &mut Character, env: &mut BattleEnv<'_>, now: GameTime) -> Vec<BattleEvent> {
        let mut events = Vec::with_capacity(2);

        if !self.rewarded {
            self.rewarded = true;
            let rewards = RewardBundle::new(self.monster.experience, self.monster.gold);
            let level_ups = env.progression.apply_rewards(player, &rewards, env.items);

            let mut quests = env.quests.report_event(
                player,
                QuestEvent::MonsterKilled(self.monster.key.clone()),
                env.progression,
                env.items,
                env.notifier,
            );
            if level_ups.leveled_up() {
                let by_level = env.quests.report_event(
                    player,
                    QuestEvent::LevelReached(player.level),
                    env.progression,
                    env.items,
                    env.notifier,
                );
                quests.progressed |= by_level.progressed;
                quests.completed.extend(by_level.completed);
                if by_level.activated.is_some() {
                    quests.activated = by_level.activated;
                }
                quests.level_ups.merge(by_level.level_ups);
            }

            env.notifier.notify(
                &format!(
                    "Victory! {} defeated (+{} XP, +{} gold)",
                    self.monster.name, rewards.experience, rewards.gold
                ),
                Severity::Success,
            );
            level_ups.announce(env.notifier);

            events.push(BattleEvent::Rewarded {
                rewards,
                level_ups,
                quests,
            });
        }

        events.push(self.end(BattleOutcome::Victory, now));
        events
    }

    fn end(&mut self, outcome: BattleOutcome, now: GameTime) -> BattleEvent {
        info!("Battle against {} ended: {:?}", self.monster.name, outcome);
        self.phase = BattlePhase::Ended {
            outcome,
            return_at: now.after(self.timing.return_delay),
        };
        BattleEvent::Ended(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monster::{MonsterTemplate, ScalingRates};
    use crate::notify::NotificationLog;
    use crate::quest::{Quest, QuestObjective};
    use crate::rng::ScriptedRandom;
    use crate::skill::Skill;
    use crate::stats::BaseStats;
    use wayfarer_common::{MonsterKey, QuestId};

    struct World {
        items: ItemCatalog,
        skills: SkillRegistry,
        quests: QuestBook,
        progression: Progression,
        resolver: DamageResolver,
        log: NotificationLog,
    }

    impl World {
        fn new() -> Self {
            let mut skills = SkillRegistry::new();
            skills.register_skill(Skill::new("fireball", "Fireball").with_cost_and_power(20, 10));
            let mut quests = QuestBook::new();
            quests.register(Quest::new(
                "q_slime",
                "Slime Hunt",
                QuestObjective::KillMonster {
                    target: MonsterKey::new("slime"),
                    count: 1,
                },
            ));
            Self {
                items: ItemCatalog::new(),
                skills,
                quests,
                progression: Progression::default(),
                resolver: DamageResolver::default(),
                log: NotificationLog::new(),
            }
        }

        fn env<'a>(&'a self, rng: &'a mut ScriptedRandom) -> BattleEnv<'a> {
            BattleEnv {
                items: &self.items,
                skills: &self.skills,
                quests: &self.quests,
                progression: &self.progression,
                resolver: &self.resolver,
                notifier: &self.log,
                rng,
            }
        }

        fn hero(&self) -> Character {
            // Strength 5: 15 attack, 7.5 defense, 150 HP
            Character::with_base_stats(
                "Ada",
                "warrior",
                BaseStats::default().with_strength(5),
                &self.items,
            )
        }
    }

    fn slime(hp: i32, attack: i32) -> Monster {
        MonsterTemplate::new("slime", "Slime", hp, attack)
            .with_rewards(30, 12)
            .spawn(0, ScalingRates::STANDARD)
    }

    #[test]
    fn test_one_hit_victory_grants_rewards_once() {
        let world = World::new();
        let mut rng = ScriptedRandom::new();
        let mut hero = world.hero();
        world
            .quests
            .start_quest(&mut hero, &QuestId::new("q_slime"), &world.log)
            .expect("quest starts");
        let mut battle = Battle::new(slime(10, 3), BattleTiming::default());
        let now = GameTime::from_millis(500);

        let events = battle
            .player_action(&mut hero, PlayerAction::basic_attack(), &mut world.env(&mut rng), now)
            .expect("attack resolves");

        assert!(matches!(
            events[0],
            BattleEvent::PlayerStruck { monster_hp: -5, .. }
        ));
        assert_eq!(battle.outcome(), Some(BattleOutcome::Victory));
        assert_eq!(hero.experience, 30);
        assert_eq!(hero.gold, 12);
        assert!(hero.has_completed(&QuestId::new("q_slime")));
        assert!(world.log.contains("Victory!"));

        // Terminal: further input is rejected and rewards stay put.
        let again = battle.player_action(&mut hero, PlayerAction::basic_attack(), &mut world.env(&mut rng), now);
        assert!(again.is_err());
        assert!(battle.advance(&mut hero, &mut world.env(&mut rng), GameTime::from_millis(99_999)).is_empty());
        assert_eq!(hero.gold, 12);

        assert!(!battle.ready_to_return(now));
        assert!(battle.ready_to_return(GameTime::from_millis(2500)));
    }

    #[test]
    fn test_monster_turn_waits_for_delay() {
        let world = World::new();
        let mut rng = ScriptedRandom::new();
        let mut hero = world.hero();
        let mut battle = Battle::new(slime(100, 20), BattleTiming::default());

        battle
            .player_action(&mut hero, PlayerAction::basic_attack(), &mut world.env(&mut rng), GameTime::ZERO)
            .expect("attack resolves");
        assert!(!battle.accepts_input());
        assert_eq!(battle.monster().hp, 85);

        let early = battle.player_action(
            &mut hero,
            PlayerAction::basic_attack(),
            &mut world.env(&mut rng),
            GameTime::from_millis(10),
        );
        assert!(matches!(early, Err(CoreError::InvalidAction(_))));
        assert!(battle
            .advance(&mut hero, &mut world.env(&mut rng), GameTime::from_millis(999))
            .is_empty());

        let events = battle.advance(&mut hero, &mut world.env(&mut rng), GameTime::from_millis(1000));
        // 20 attack - 7.5 defense rounds to 13
        assert!(matches!(
            events.as_slice(),
            [BattleEvent::MonsterStruck { player_hp: 137, .. }]
        ));
        assert!(battle.accepts_input());
    }

    #[test]
    fn test_defeat_restores_hp() {
        let world = World::new();
        let mut rng = ScriptedRandom::new();
        let mut hero = world.hero();
        hero.hp = 5;
        let mut battle = Battle::new(slime(100, 50), BattleTiming::instant());

        battle
            .player_action(&mut hero, PlayerAction::basic_attack(), &mut world.env(&mut rng), GameTime::ZERO)
            .expect("attack resolves");
        let events = battle.advance(&mut hero, &mut world.env(&mut rng), GameTime::ZERO);

        assert_eq!(events.last(), Some(&BattleEvent::Ended(BattleOutcome::Defeat)));
        assert_eq!(hero.hp, hero.stats.max_hp);
        assert_eq!(hero.experience, 0);
        assert!(world.log.contains("You were defeated by Slime"));
    }

    #[test]
    fn test_insufficient_mana_keeps_player_turn() {
        let world = World::new();
        let mut rng = ScriptedRandom::new();
        let mut hero = world.hero();
        hero.skills.insert(SkillId::new("fireball"));
        hero.mana = 5;
        let mut battle = Battle::new(slime(100, 5), BattleTiming::default());

        let result = battle.player_action(
            &mut hero,
            PlayerAction::Attack(SkillId::new("fireball")),
            &mut world.env(&mut rng),
            GameTime::ZERO,
        );
        assert!(result.is_err());
        assert_eq!(hero.mana, 5);
        assert_eq!(battle.monster().hp, 100);
        assert!(battle.accepts_input());
        assert_eq!(battle.turns(), 0);
    }

    #[test]
    fn test_skill_spends_mana_and_adds_power() {
        let world = World::new();
        let mut rng = ScriptedRandom::new();
        let mut hero = world.hero();
        hero.skills.insert(SkillId::new("fireball"));
        let mana = hero.mana;
        let mut battle = Battle::new(slime(100, 5), BattleTiming::default());

        battle
            .player_action(
                &mut hero,
                PlayerAction::Attack(SkillId::new("fireball")),
                &mut world.env(&mut rng),
                GameTime::ZERO,
            )
            .expect("attack resolves");
        assert_eq!(hero.mana, mana - 20);
        assert_eq!(battle.monster().hp, 75);
    }

    #[test]
    fn test_locked_skill_is_rejected() {
        let world = World::new();
        let mut rng = ScriptedRandom::new();
        let mut hero = world.hero();
        let mut battle = Battle::new(slime(100, 5), BattleTiming::default());

        let result = battle.player_action(
            &mut hero,
            PlayerAction::Attack(SkillId::new("fireball")),
            &mut world.env(&mut rng),
            GameTime::ZERO,
        );
        assert!(matches!(result, Err(CoreError::InvalidAction(_))));
    }

    #[test]
    fn test_flee_ends_without_rewards() {
        let world = World::new();
        let mut rng = ScriptedRandom::new();
        let mut hero = world.hero();
        let mut battle = Battle::new(slime(10, 5), BattleTiming::default());

        let events = battle
            .player_action(&mut hero, PlayerAction::Flee, &mut world.env(&mut rng), GameTime::ZERO)
            .expect("flee resolves");
        assert_eq!(events, vec![BattleEvent::Ended(BattleOutcome::Fled)]);
        assert_eq!(hero.experience, 0);
        assert_eq!(battle.next_deadline(), Some(GameTime::from_millis(2000)));
    }

    #[test]
    fn test_level_up_from_kill_reaches_level_quest() {
        let mut world = World::new();
        world.quests.register(Quest::new(
            "q_level",
            "Growing Up",
            QuestObjective::ReachLevel { level: 2 },
        ));
        let mut rng = ScriptedRandom::new();
        let mut hero = world.hero();
        world
            .quests
            .start_quest(&mut hero, &QuestId::new("q_level"), &world.log)
            .expect("quest starts");
        let boss = MonsterTemplate::new("ogre", "Ogre", 1, 1)
            .with_rewards(150, 0)
            .spawn(0, ScalingRates::STANDARD);
        let mut battle = Battle::new(boss, BattleTiming::instant());

        let events = battle
            .player_action(&mut hero, PlayerAction::basic_attack(), &mut world.env(&mut rng), GameTime::ZERO)
            .expect("attack resolves");
        assert_eq!(hero.level, 2);
        assert!(hero.has_completed(&QuestId::new("q_level")));
        assert!(events.iter().any(|e| matches!(
            e,
            BattleEvent::Rewarded { quests, .. } if quests.completed == vec![QuestId::new("q_level")]
        )));
    }
}
