//! Character persistence.
//!
//! The core only ever asks a [`CharacterStore`] to save the whole character
//! record or load it back. Records are JSON wrapped in a versioned envelope.

use crate::character::Character;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;
use tracing::{debug, info};
use wayfarer_common::SchemaVersion;

/// Errors that can occur during save/load operations.
#[derive(Debug, Error)]
pub enum PersistError {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Version mismatch
    #[error("Incompatible save version: expected {expected}, found {found}")]
    VersionMismatch {
        /// Expected version
        expected: SchemaVersion,
        /// Found version
        found: SchemaVersion,
    },

    /// Store refused the write
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// Result type for persistence operations.
pub type PersistResult<T> = Result<T, PersistError>;

/// Somewhere a single character record lives.
pub trait CharacterStore: Send {
    /// Writes the whole record, replacing any previous one.
    fn save(&self, character: &Character) -> PersistResult<()>;

    /// Reads the record back, or `None` if nothing was saved yet.
    fn load(&self) -> PersistResult<Option<Character>>;
}

impl<S: CharacterStore + Sync> CharacterStore for Arc<S> {
    fn save(&self, character: &Character) -> PersistResult<()> {
        (**self).save(character)
    }

    fn load(&self) -> PersistResult<Option<Character>> {
        (**self).load()
    }
}

/// On-disk wrapper around a character record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaveEnvelope {
    /// Record format version
    pub version: SchemaVersion,
    /// Unix timestamp of the save
    pub saved_at: u64,
    /// The record
    pub character: Character,
}

impl SaveEnvelope {
    /// Wraps a character with the current version and time.
    #[must_use]
    pub fn new(character: Character) -> Self {
        Self {
            version: SchemaVersion::CHARACTER_RECORD,
            saved_at: current_timestamp(),
            character,
        }
    }

    /// Serializes to pretty JSON.
    pub fn to_json(&self) -> PersistResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parses and checks the version.
    pub fn from_json(json: &str) -> PersistResult<Self> {
        let envelope: Self = serde_json::from_str(json)?;
        if !SchemaVersion::CHARACTER_RECORD.can_read(&envelope.version) {
            return Err(PersistError::VersionMismatch {
                expected: SchemaVersion::CHARACTER_RECORD,
                found: envelope.version,
            });
        }
        Ok(envelope)
    }
}

// ============================================================================
// File store
// ============================================================================

/// Stores the character as a JSON file.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    /// Creates a store writing to `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the save file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self.path.file_name().unwrap_or_default().to_os_string();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl CharacterStore for JsonFileStore {
    /// Uses atomic write (write to temp, then rename).
    fn save(&self, character: &Character) -> PersistResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let json = SaveEnvelope::new(character.clone()).to_json()?;
        let temp_path = self.temp_path();

        let mut file = fs::File::create(&temp_path)?;
        file.write_all(json.as_bytes())?;
        file.sync_all()?;
        drop(file);

        fs::rename(&temp_path, &self.path)?;
        debug!("Saved {} to {}", character.name, self.path.display());
        Ok(())
    }

    fn load(&self) -> PersistResult<Option<Character>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let json = fs::read_to_string(&self.path)?;
        let envelope = SaveEnvelope::from_json(&json)?;
        info!(
            "Loaded {} (level {}) from {}",
            envelope.character.name,
            envelope.character.level,
            self.path.display()
        );
        Ok(Some(envelope.character))
    }
}

// ============================================================================
// Memory store
// ============================================================================

/// Keeps the serialized record in memory. Clones share the same slot.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    slot: Arc<Mutex<Option<String>>>,
    failing: Arc<Mutex<bool>>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every following save fail (or succeed again).
    pub fn set_failing(&self, failing: bool) {
        *self.failing.lock() = failing;
    }

    /// Raw stored JSON.
    #[must_use]
    pub fn raw(&self) -> Option<String> {
        self.slot.lock().clone()
    }

    /// Check if anything was saved.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slot.lock().is_none()
    }
}

impl CharacterStore for MemoryStore {
    fn save(&self, character: &Character) -> PersistResult<()> {
        if *self.failing.lock() {
            return Err(PersistError::Unavailable("memory store is read-only".into()));
        }
        let json = SaveEnvelope::new(character.clone()).to_json()?;
        *self.slot.lock() = Some(json);
        Ok(())
    }

    fn load(&self) -> PersistResult<Option<Character>> {
        self.slot
            .lock()
            .as_deref()
            .map(|json| SaveEnvelope::from_json(json).map(|e| e.character))
            .transpose()
    }
}

/// Returns current Unix timestamp.
fn current_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::ItemCatalog;
    use tempfile::TempDir;
    use wayfarer_common::{ItemId, QuestId};

    fn hero() -> Character {
        let mut c = Character::new("Ada", "mage", &ItemCatalog::new());
        c.gold = 77;
        c.inventory.push(ItemId::new("potion"));
        c.completed_quests.insert(QuestId::new("q_intro"));
        c
    }

    #[test]
    fn test_file_store_save_load() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let store = JsonFileStore::new(temp_dir.path().join("saves").join("hero.json"));

        assert!(store.load().expect("empty load").is_none());
        store.save(&hero()).expect("save");
        let loaded = store.load().expect("load").expect("record present");
        assert_eq!(loaded, hero());
        assert!(!store.temp_path().exists());
    }

    #[test]
    fn test_file_store_rejects_future_major() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let path = temp_dir.path().join("hero.json");
        let mut envelope = SaveEnvelope::new(hero());
        envelope.version = SchemaVersion::new(9, 0, 0);
        fs::write(&path, envelope.to_json().expect("json")).expect("write");

        let result = JsonFileStore::new(&path).load();
        assert!(matches!(result, Err(PersistError::VersionMismatch { .. })));
    }

    #[test]
    fn test_file_store_corrupt_file() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let path = temp_dir.path().join("hero.json");
        fs::write(&path, "{ not json").expect("write");

        let result = JsonFileStore::new(&path).load();
        assert!(matches!(result, Err(PersistError::Serialization(_))));
    }

    #[test]
    fn test_memory_store_shares_slot_and_fails_on_demand() {
        let store = MemoryStore::new();
        let view = store.clone();
        assert!(view.is_empty());

        store.save(&hero()).expect("save");
        assert_eq!(view.load().expect("load"), Some(hero()));

        store.set_failing(true);
        let mut changed = hero();
        changed.gold = 1;
        assert!(matches!(store.save(&changed), Err(PersistError::Unavailable(_))));
        assert_eq!(view.load().expect("load").map(|c| c.gold), Some(77));
    }

    #[test]
    fn test_envelope_carries_version() {
        let json = SaveEnvelope::new(hero()).to_json().expect("json");
        let value: serde_json::Value = serde_json::from_str(&json).expect("valid json");
        assert_eq!(value["version"]["major"], 1);
        assert_eq!(value["character"]["name"], "Ada");
    }
}
