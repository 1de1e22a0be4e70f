//! # Wayfarer
//!
//! Command-line front end for the Wayfarer gameplay core.
//!
//! Every invocation loads the configuration, the game data and the saved
//! character, runs one command and saves again.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

mod commands;
mod explore;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use wayfarer_gameplay::{EquipSlot, StatKind, CONFIG_FILE};

/// Wayfarer - adventures at the places around you
#[derive(Parser, Debug)]
#[command(name = "wayfarer")]
#[command(author, version, about = "Wayfarer - a location-based RPG", long_about = None)]
struct Args {
    /// Configuration file
    #[arg(short = 'c', long = "config", default_value = CONFIG_FILE)]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create a new character, replacing any saved one
    New {
        /// Character name
        name: String,
        /// Starting class (e.g., warrior, mage, rogue)
        #[arg(short = 'k', long = "class", default_value = "warrior")]
        class: String,
    },
    /// Write the effective configuration to the config file
    InitConfig,
    /// Show the character sheet
    Status,
    /// Equip an item from the inventory
    Equip {
        /// Item id
        item: String,
    },
    /// Move an equipped item back to the inventory
    Unequip {
        /// Slot (weapon/armor)
        slot: EquipSlot,
    },
    /// Use a consumable
    Use {
        /// Item id
        item: String,
    },
    /// Spend a stat point
    SpendStat {
        /// Stat (strength/intelligence/speed/dexterity)
        stat: StatKind,
    },
    /// Spend a skill point on a skill
    UnlockSkill {
        /// Skill id
        skill: String,
    },
    /// Unlock an additional class
    UnlockClass {
        /// Class id
        class: String,
    },
    /// Switch to an unlocked class
    SwitchClass {
        /// Class id
        class: String,
    },
    /// Show the active and completed quests
    Quests,
    /// Make camp at the current location
    Camp {
        /// Latitude in degrees
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,
        /// Longitude in degrees
        #[arg(long, allow_hyphen_values = true)]
        lon: f64,
    },
    /// List the points of interest
    Pois,
    /// Enter the dungeon at a point of interest and fight through it
    Explore {
        /// Point of interest id
        poi: String,
        /// Skill to attack with (falls back to the basic attack without mana)
        #[arg(short = 's', long = "skill")]
        skill: Option<String>,
        /// Wait out the real battle delays
        #[arg(long = "paced")]
        paced: bool,
    },
}

/// Main entry point.
fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env().add_directive("wayfarer=info".parse()?))
        .init();

    let args = Args::parse();
    info!("Wayfarer {}", env!("CARGO_PKG_VERSION"));

    let ctx = commands::Context::load(&args.config)?;
    commands::run(&ctx, args.command)
}
