//! # Wayfarer Common
//!
//! Common types shared by every Wayfarer crate:
//! - Identifier newtypes (items, skills, classes, quests, monsters, dungeons)
//! - Geographic anchors for points of interest
//! - Schema versions for persisted records
//! - The core error taxonomy
//! - Prelude for convenient imports

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod error;
pub mod geo;
pub mod ids;
pub mod version;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::error::*;
    pub use crate::geo::*;
    pub use crate::ids::*;
    pub use crate::version::*;
}

pub use prelude::*;
