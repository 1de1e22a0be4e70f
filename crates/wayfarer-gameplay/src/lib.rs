//! # Wayfarer Gameplay
//!
//! The simulation core of Wayfarer, a location-based RPG.
//!
//! This crate provides:
//! - Element matrix and damage resolution
//! - Stat derivation from base stats, equipment and set bonuses
//! - Progression (experience, gold, items, level-ups)
//! - Turn-based battles against scaled monsters
//! - Quest objective tracking with linked quest chains
//! - Dungeons instantiated at real-world points of interest
//! - Skills, classes, items and the game data tables
//! - Collaborators for time, randomness, notifications and persistence
//! - The game session tying it all together

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod battle;
pub mod character;
pub mod clock;
pub mod config;
pub mod damage;
pub mod data;
pub mod dungeon;
pub mod element;
pub mod item;
pub mod monster;
pub mod notify;
pub mod persist;
pub mod progression;
pub mod quest;
pub mod rng;
pub mod session;
pub mod skill;
pub mod stats;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::battle::*;
    pub use crate::character::*;
    pub use crate::clock::*;
    pub use crate::config::*;
    pub use crate::damage::*;
    pub use crate::data::*;
    pub use crate::dungeon::*;
    pub use crate::element::*;
    pub use crate::item::*;
    pub use crate::monster::*;
    pub use crate::notify::*;
    pub use crate::persist::*;
    pub use crate::progression::*;
    pub use crate::quest::*;
    pub use crate::rng::*;
    pub use crate::session::*;
    pub use crate::skill::*;
    pub use crate::stats::*;
}

pub use prelude::*;
