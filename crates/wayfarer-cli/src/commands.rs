//! Command dispatch and terminal output.

use crate::explore::{self, Pace};
use crate::Command;
use anyhow::{anyhow, Context as _, Result};
use crossbeam_channel::Receiver;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};
use wayfarer_common::{ClassId, GeoPoint, ItemId, PoiId, SkillId};
use wayfarer_gameplay::{
    create_character, BattleEvent, Character, CharacterStore, ChannelNotifier, Clock, EquipSlot,
    GameConfig, GameData, GameSession, JsonFileStore, ManualClock, Notification, QuestUpdate,
    SessionEvent, Severity, StatKind, SystemClock,
};

/// Notifications buffered between two flushes.
const NOTIFICATION_CAPACITY: usize = 256;

/// Everything loaded before a command runs.
pub(crate) struct Context {
    config_path: PathBuf,
    config: GameConfig,
    data: GameData,
    store: JsonFileStore,
}

impl Context {
    /// Loads the configuration and the game data it points at.
    pub(crate) fn load(config_path: &Path) -> Result<Self> {
        let config = GameConfig::load_from(config_path);
        let data = match &config.data_path {
            Some(path) => GameData::load(path)
                .with_context(|| format!("loading game data from {}", path.display()))?,
            None => GameData::builtin().context("loading the built-in world")?,
        };
        let store = JsonFileStore::new(&config.save_path);
        Ok(Self {
            config_path: config_path.to_path_buf(),
            config,
            data,
            store,
        })
    }

    fn load_character(&self) -> Result<Character> {
        self.store
            .load()
            .with_context(|| format!("reading {}", self.store.path().display()))?
            .ok_or_else(|| {
                anyhow!(
                    "no character saved at {}; create one with `wayfarer new <name>`",
                    self.store.path().display()
                )
            })
    }

    fn session(&self, character: Character, clock: Arc<dyn Clock>) -> (GameSession, Receiver<Notification>) {
        let (notifier, notifications) = ChannelNotifier::channel(NOTIFICATION_CAPACITY);
        let session = GameSession::new(character, self.data.clone(), self.config.clone())
            .with_clock(clock)
            .with_notifier(Arc::new(notifier))
            .with_store(Box::new(self.store.clone()));
        (session, notifications)
    }
}

/// Runs one command against the saved character.
pub(crate) fn run(ctx: &Context, command: Command) -> Result<()> {
    if let Command::New { name, class } = &command {
        return new_character(ctx, name, class);
    }
    match command {
        Command::Pois => {
            print_pois(&ctx.data);
            return Ok(());
        },
        Command::InitConfig => return init_config(ctx),
        _ => {},
    }

    let character = ctx.load_character()?;
    let manual = Arc::new(ManualClock::new());
    let clock: Arc<dyn Clock> = match &command {
        Command::Explore { paced: false, .. } => manual.clone(),
        _ => Arc::new(SystemClock::new()),
    };
    let (mut session, notifications) = ctx.session(character, clock);

    let result = dispatch(&mut session, command, manual, &notifications);
    flush(&notifications);
    result
}

fn dispatch(
    session: &mut GameSession,
    command: Command,
    manual: Arc<ManualClock>,
    notifications: &Receiver<Notification>,
) -> Result<()> {
    match command {
        Command::New { .. } | Command::Pois | Command::InitConfig => {},
        Command::Status => print_status(session),
        Command::Equip { item } => {
            let slot = session.equip(&ItemId::new(item.as_str()))?;
            println!("Equipped {} as {}", item_name(session, &ItemId::new(item)), slot_name(slot));
        },
        Command::Unequip { slot } => {
            let id = session.unequip(slot)?;
            println!("Unequipped {}", item_name(session, &id));
        },
        Command::Use { item } => {
            let (used, update) = session.use_item(&ItemId::new(item))?;
            println!("+{} HP, +{} mana", used.healed, used.restored_mana);
            print_quest_update(session, &update);
        },
        Command::SpendStat { stat } => {
            session.spend_stat_point(stat)?;
            println!(
                "{} raised to {} ({} points left)",
                stat_name(stat),
                base_stat(session.character(), stat),
                session.character().stat_points
            );
        },
        Command::UnlockSkill { skill } => {
            let update = session.unlock_skill(&SkillId::new(skill))?;
            print_quest_update(session, &update);
        },
        Command::UnlockClass { class } => session.unlock_class(&ClassId::new(class))?,
        Command::SwitchClass { class } => {
            session.switch_class(&ClassId::new(class))?;
            println!("You are now a {}", session.character().class);
        },
        Command::Quests => print_quests(session),
        Command::Camp { lat, lon } => {
            let update = session.set_camp(GeoPoint::new(lat, lon))?;
            println!("Camp set at {}", GeoPoint::new(lat, lon));
            print_quest_update(session, &update);
        },
        Command::Explore { poi, skill, paced } => {
            let pace = if paced { Pace::RealTime } else { Pace::Instant(manual) };
            let skill = skill.map(SkillId::new);
            let report = explore::run(session, &PoiId::new(poi), skill.as_ref(), &pace, |event| {
                if let Some(line) = describe(event) {
                    println!("{line}");
                }
                // Keep notifications next to the events that caused them.
                flush(notifications);
            })?;
            info!(
                "Run finished after {} battle(s): {:?}",
                report.battles, report.outcome
            );
            print_status(session);
        },
    }
    Ok(())
}

fn init_config(ctx: &Context) -> Result<()> {
    ctx.config
        .save_to(&ctx.config_path)
        .with_context(|| format!("writing {}", ctx.config_path.display()))?;
    println!("Wrote {}", ctx.config_path.display());
    Ok(())
}

fn new_character(ctx: &Context, name: &str, class: &str) -> Result<()> {
    if let Ok(Some(existing)) = ctx.store.load() {
        warn!("Replacing {} (level {})", existing.name, existing.level);
    }
    let (notifier, notifications) = ChannelNotifier::channel(NOTIFICATION_CAPACITY);
    let character = create_character(&ctx.data, name, &ClassId::new(class), &notifier)?;
    let (session, session_notifications) = ctx.session(character, Arc::new(SystemClock::new()));
    session.save();
    flush(&notifications);
    flush(&session_notifications);
    print_status(&session);
    Ok(())
}

// ============================================================================
// Output
// ============================================================================

fn flush(notifications: &Receiver<Notification>) {
    for note in notifications.try_iter() {
        let marker = match note.severity {
            Severity::Info => "*",
            Severity::Success => "+",
            Severity::Warning => "!",
            Severity::Error => "x",
        };
        println!("[{marker}] {}", note.message);
    }
}

fn describe(event: &SessionEvent) -> Option<String> {
    Some(match event {
        SessionEvent::DungeonEntered { name, .. } => format!("You enter {name}."),
        SessionEvent::EncounterStarted { monster, boss: false } => format!("A {monster} appears."),
        SessionEvent::EncounterStarted { monster, boss: true } => format!("Boss fight: {monster}!"),
        SessionEvent::Battle(BattleEvent::PlayerStruck {
            skill,
            outcome,
            monster_hp,
        }) => format!(
            "  {skill} hits for {}{} (monster HP {monster_hp})",
            outcome.damage,
            suffix(&outcome.message)
        ),
        SessionEvent::Battle(BattleEvent::MonsterStruck { outcome, player_hp }) => format!(
            "  You take {}{} (HP {player_hp})",
            outcome.damage,
            suffix(&outcome.message)
        ),
        SessionEvent::Battle(BattleEvent::Rewarded { .. } | BattleEvent::Ended(_))
        | SessionEvent::Quest(_) => return None,
        SessionEvent::DungeonCleared { rewards, .. } => format!(
            "Dungeon cleared: +{} XP, +{} gold",
            rewards.experience, rewards.gold
        ),
        SessionEvent::DungeonLeft(outcome) => format!("You leave the dungeon ({outcome:?})."),
    })
}

fn suffix(message: &str) -> String {
    if message.is_empty() {
        String::new()
    } else {
        format!(" - {message}")
    }
}

fn print_status(session: &GameSession) {
    let c = session.character();
    let data = session.data();
    let class = data
        .skills
        .class(&c.class)
        .map_or_else(|| c.class.to_string(), |def| def.name.clone());
    let s = &c.stats;

    println!("{} the {class}, level {}", c.name, c.level);
    println!("  XP {}/{}   Gold {}", c.experience, c.experience_to_next, c.gold);
    println!("  HP {}/{}   Mana {}/{}", c.hp, s.max_hp, c.mana, s.max_mana);
    println!(
        "  STR {}  INT {}  SPD {}  DEX {}   ({} stat points, {} skill points)",
        s.effective.strength,
        s.effective.intelligence,
        s.effective.speed,
        s.effective.dexterity,
        c.stat_points,
        c.skill_points
    );
    println!(
        "  Attack {}  Defense {:.1}  Crit {:.0}%",
        s.attack_damage,
        s.defense,
        s.crit_chance * 100.0
    );
    for slot in [EquipSlot::Weapon, EquipSlot::Armor] {
        let worn = c
            .equipment
            .get(slot)
            .map_or_else(|| "-".to_string(), |id| item_name(session, id));
        println!("  {}: {worn}", slot_name(slot));
    }

    let mut counts: BTreeMap<&ItemId, usize> = BTreeMap::new();
    for id in &c.inventory {
        *counts.entry(id).or_default() += 1;
    }
    let inventory: Vec<String> = counts
        .into_iter()
        .map(|(id, n)| match n {
            1 => format!("{} [{id}]", item_name(session, id)),
            n => format!("{} [{id}] x{n}", item_name(session, id)),
        })
        .collect();
    println!("  Inventory: {}", list_or_dash(&inventory));

    let skills: Vec<String> = c.skills.iter().map(ToString::to_string).collect();
    println!("  Skills: {}", list_or_dash(&skills));
    let classes: Vec<String> = c.classes.iter().map(ToString::to_string).collect();
    println!("  Classes: {}", list_or_dash(&classes));
    if let Some(camp) = session.camp() {
        println!("  Camp: {camp}");
    }
}

fn print_quests(session: &GameSession) {
    let c = session.character();
    let quests = &session.data().quests;
    match quests.active(c) {
        Some((quest, progress)) => {
            println!("Active: {}", quest.title);
            if !quest.description.is_empty() {
                println!("  {}", quest.description);
            }
            println!(
                "  {} ({progress}/{})",
                quest.objective.description(),
                quest.objective.required_count()
            );
        },
        None => println!("No active quest"),
    }
    for id in &c.completed_quests {
        let title = quests.get(id).map_or_else(|| id.to_string(), |q| q.title.clone());
        println!("  [done] {title}");
    }
}

fn print_quest_update(session: &GameSession, update: &QuestUpdate) {
    if update.progressed && update.completed.is_empty() {
        if let Some((quest, progress)) = session.data().quests.active(session.character()) {
            println!(
                "Quest progress: {} ({progress}/{})",
                quest.title,
                quest.objective.required_count()
            );
        }
    }
}

fn print_pois(data: &GameData) {
    for poi in data.atlas.pois() {
        let kind = data
            .atlas
            .dungeon_type(&poi.dungeon_type)
            .map_or_else(|| poi.dungeon_type.to_string(), |t| t.name.clone());
        let tutorial = if poi.tutorial { "  (tutorial)" } else { "" };
        println!(
            "{:<16} {:<24} {kind:<18} difficulty {}  {}{tutorial}",
            poi.id.to_string(),
            poi.name,
            poi.difficulty,
            poi.anchor
        );
    }
}

fn item_name(session: &GameSession, id: &ItemId) -> String {
    session
        .data()
        .items
        .get(id)
        .map_or_else(|| id.to_string(), |item| item.name.clone())
}

fn list_or_dash(entries: &[String]) -> String {
    if entries.is_empty() {
        "-".to_string()
    } else {
        entries.join(", ")
    }
}

const fn slot_name(slot: EquipSlot) -> &'static str {
    match slot {
        EquipSlot::Weapon => "Weapon",
        EquipSlot::Armor => "Armor",
    }
}

const fn stat_name(stat: StatKind) -> &'static str {
    match stat {
        StatKind::Strength => "Strength",
        StatKind::Intelligence => "Intelligence",
        StatKind::Speed => "Speed",
        StatKind::Dexterity => "Dexterity",
    }
}

const fn base_stat(c: &Character, stat: StatKind) -> i32 {
    match stat {
        StatKind::Strength => c.base_stats.strength,
        StatKind::Intelligence => c.base_stats.intelligence,
        StatKind::Speed => c.base_stats.speed,
        StatKind::Dexterity => c.base_stats.dexterity,
    }
}
