//! ID types for game content.
//!
//! Content identifiers are strings so that data tables stay readable and
//! persisted character records survive reordering of the tables.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Creates an identifier from a raw string.
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Returns the raw identifier.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self::new(value)
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }
    };
}

string_id!(
    /// Identifier of an item definition.
    ItemId
);

string_id!(
    /// Identifier of an equipment set.
    SetId
);

string_id!(
    /// Identifier of a skill.
    SkillId
);

string_id!(
    /// Identifier of a character class.
    ClassId
);

string_id!(
    /// Identifier of a quest.
    QuestId
);

string_id!(
    /// Key of a monster template in the bestiary.
    MonsterKey
);

string_id!(
    /// Identifier of a dungeon-type template.
    DungeonTypeId
);

string_id!(
    /// Identifier of a point of interest.
    PoiId
);

impl SkillId {
    /// The basic attack every character knows.
    #[must_use]
    pub fn fist_attack() -> Self {
        Self::new("fist_attack")
    }
}

impl MonsterKey {
    /// The fixed entry used by tutorial dungeons.
    #[must_use]
    pub fn training_dummy() -> Self {
        Self::new("training_dummy")
    }
}
