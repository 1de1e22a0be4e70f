//! Error types for Wayfarer.

use thiserror::Error;

/// The kind of content a [`CoreError::MissingReference`] points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReferenceKind {
    /// Item definition or inventory entry
    Item,
    /// Equipment set
    Set,
    /// Skill
    Skill,
    /// Character class
    Class,
    /// Quest
    Quest,
    /// Monster template
    Monster,
    /// Dungeon type template
    DungeonType,
    /// Point of interest
    Poi,
}

impl std::fmt::Display for ReferenceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Item => "item",
            Self::Set => "set",
            Self::Skill => "skill",
            Self::Class => "class",
            Self::Quest => "quest",
            Self::Monster => "monster",
            Self::DungeonType => "dungeon type",
            Self::Poi => "point of interest",
        };
        f.write_str(name)
    }
}

/// Expected rejections raised by the gameplay core.
///
/// Every operation that returns one of these has left its inputs untouched.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CoreError {
    /// The action is not allowed right now (wrong turn, not enough mana, wrong item kind)
    #[error("Invalid action: {0}")]
    InvalidAction(String),

    /// The point of interest names a dungeon type with no registered template
    #[error("Unknown dungeon type: {0}")]
    InvalidDungeonType(String),

    /// An identifier did not resolve
    #[error("Unknown {kind}: {id}")]
    MissingReference {
        /// What kind of content was looked up
        kind: ReferenceKind,
        /// The identifier that failed to resolve
        id: String,
    },

    /// Not enough stat or skill points to spend
    #[error("Not enough {0} points")]
    InsufficientPoints(&'static str),
}

impl CoreError {
    /// Shorthand for an [`CoreError::InvalidAction`].
    pub fn invalid_action(reason: impl Into<String>) -> Self {
        Self::InvalidAction(reason.into())
    }

    /// Shorthand for a [`CoreError::MissingReference`].
    pub fn missing(kind: ReferenceKind, id: impl std::fmt::Display) -> Self {
        Self::MissingReference {
            kind,
            id: id.to_string(),
        }
    }
}

/// Result type alias for core operations.
pub type CoreResult<T> = Result<T, CoreError>;
