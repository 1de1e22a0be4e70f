//! Automatic dungeon runs.
//!
//! Attacks whenever the battle accepts input and otherwise waits for the next
//! scheduled step, either by jumping a manual clock or by sleeping.

use anyhow::{bail, Result};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::debug;
use wayfarer_common::{CoreError, PoiId, SkillId};
use wayfarer_gameplay::{
    Battle, BattleEvent, BattleOutcome, GameSession, GameTime, ManualClock, PlayerAction,
    SessionEvent,
};

/// Upper bound on loop iterations for one run.
const MAX_STEPS: usize = 10_000;

/// How battle delays are waited out.
#[derive(Debug, Clone)]
pub enum Pace {
    /// Jump a manual clock straight to each deadline.
    Instant(Arc<ManualClock>),
    /// Sleep in real time.
    RealTime,
}

/// Summary of a dungeon run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExploreReport {
    /// Battles fought, boss included
    pub battles: u32,
    /// Outcome of the last battle
    pub outcome: Option<BattleOutcome>,
    /// Whether the boss fell
    pub cleared: bool,
}

impl ExploreReport {
    fn record(&mut self, event: &SessionEvent) {
        match event {
            SessionEvent::EncounterStarted { .. } => self.battles += 1,
            SessionEvent::Battle(BattleEvent::Ended(outcome)) | SessionEvent::DungeonLeft(outcome) => {
                self.outcome = Some(*outcome);
            },
            SessionEvent::DungeonCleared { .. } => self.cleared = true,
            _ => {},
        }
    }
}

/// Enters a dungeon and fights until the player leaves it.
pub fn run(
    session: &mut GameSession,
    poi: &PoiId,
    skill: Option<&SkillId>,
    pace: &Pace,
    mut on_event: impl FnMut(&SessionEvent),
) -> Result<ExploreReport> {
    if let Some(skill) = skill {
        if !session.character().skills.contains(skill) {
            bail!("{} has not learned {skill}", session.character().name);
        }
    }

    let mut report = ExploreReport::default();
    let mut events = session.enter_dungeon(poi)?;

    for _ in 0..MAX_STEPS {
        for event in &events {
            report.record(event);
            on_event(event);
        }
        if !session.in_dungeon() {
            return Ok(report);
        }

        events = if session.battle().is_some_and(Battle::accepts_input) {
            attack(session, skill)?
        } else {
            if let Some(deadline) = session.next_deadline() {
                wait_until(session, pace, deadline);
            }
            session.tick()
        };
    }
    bail!("the run at {poi} did not finish")
}

fn attack(session: &mut GameSession, skill: Option<&SkillId>) -> Result<Vec<SessionEvent>> {
    let Some(skill) = skill else {
        return Ok(session.act(PlayerAction::basic_attack())?);
    };
    match session.act(PlayerAction::Attack(skill.clone())) {
        Ok(events) => Ok(events),
        Err(CoreError::InvalidAction(reason)) => {
            debug!("{skill} unavailable ({reason}), using a basic attack");
            Ok(session.act(PlayerAction::basic_attack())?)
        },
        Err(e) => Err(e.into()),
    }
}

fn wait_until(session: &GameSession, pace: &Pace, deadline: GameTime) {
    match pace {
        Pace::Instant(clock) => clock.set(deadline.max(session.now())),
        Pace::RealTime => {
            let remaining = deadline.as_millis().saturating_sub(session.now().as_millis());
            thread::sleep(Duration::from_millis(remaining));
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wayfarer_common::{ClassId, QuestId};
    use wayfarer_gameplay::{
        create_character, Character, CharacterStore, GameConfig, GameData, MemoryStore,
        NotificationLog, ScriptedRandom,
    };

    fn session_with(edit: impl FnOnce(&mut Character)) -> (GameSession, Pace, MemoryStore) {
        let data = GameData::builtin().expect("built-in world");
        let log = Arc::new(NotificationLog::new());
        let mut character =
            create_character(&data, "Ada", &ClassId::new("warrior"), log.as_ref()).expect("creates");
        edit(&mut character);
        let clock = Arc::new(ManualClock::new());
        let store = MemoryStore::new();
        let session = GameSession::new(character, data, GameConfig::default())
            .with_clock(clock.clone())
            .with_rng(Box::new(ScriptedRandom::new()))
            .with_notifier(log)
            .with_store(Box::new(store.clone()));
        (session, Pace::Instant(clock), store)
    }

    #[test]
    fn test_tutorial_run_clears_and_saves() {
        let (mut session, pace, store) = session_with(|_| {});
        let mut seen = 0;
        let report = run(&mut session, &PoiId::new("training_yard"), None, &pace, |_| seen += 1)
            .expect("runs");

        assert!(report.cleared);
        assert_eq!(report.battles, 2);
        assert_eq!(report.outcome, Some(BattleOutcome::Victory));
        assert!(seen > 0);
        assert!(!session.in_dungeon());

        let c = session.character();
        assert_eq!(c.experience, 80);
        assert_eq!(c.gold, 25);
        assert!(c.has_completed(&QuestId::new("q_first_steps")));
        assert_eq!(store.load().expect("load").as_ref(), Some(c));
    }

    #[test]
    fn test_skill_without_mana_falls_back() {
        let (mut session, pace, _) = session_with(|c| {
            c.skills.insert(SkillId::new("power_strike"));
            c.mana = 0;
        });
        let report = run(
            &mut session,
            &PoiId::new("training_yard"),
            Some(&SkillId::new("power_strike")),
            &pace,
            |_| {},
        )
        .expect("runs");

        assert!(report.cleared);
        assert_eq!(session.character().mana, 0);
    }

    #[test]
    fn test_unlearned_skill_is_refused() {
        let (mut session, pace, _) = session_with(|_| {});
        let result = run(
            &mut session,
            &PoiId::new("training_yard"),
            Some(&SkillId::new("fireball")),
            &pace,
            |_| {},
        );
        assert!(result.is_err());
        assert!(!session.in_dungeon());
    }
}
