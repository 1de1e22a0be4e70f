//! Game configuration.
//!
//! Tunable rules and pacing, loaded from a TOML file. Missing or unreadable
//! files fall back to defaults.

use crate::battle::BattleTiming;
use crate::damage::{DamageResolver, DEFAULT_CRIT_MULTIPLIER};
use crate::progression::{Progression, DEFAULT_SKILL_POINTS_PER_LEVEL, DEFAULT_STAT_POINTS_PER_LEVEL};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

/// Configuration file name.
pub const CONFIG_FILE: &str = "wayfarer.toml";

/// Game configuration parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    // === Pacing ===
    /// Delay before the monster strikes back, in milliseconds
    pub monster_turn_delay_ms: u64,
    /// Delay before returning to the overworld after a battle, in milliseconds
    pub return_delay_ms: u64,

    // === Rules ===
    /// Stat points granted per level-up
    pub stat_points_per_level: u32,
    /// Skill points granted per level-up
    pub skill_points_per_level: u32,
    /// Critical multiplier for attackers without their own
    pub critical_multiplier: f64,

    // === World ===
    /// Random seed (None = random)
    pub rng_seed: Option<u64>,
    /// Game data file (None = built-in world)
    pub data_path: Option<PathBuf>,

    // === Persistence ===
    /// Where the character is saved
    pub save_path: PathBuf,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            monster_turn_delay_ms: 1000,
            return_delay_ms: 2000,

            stat_points_per_level: DEFAULT_STAT_POINTS_PER_LEVEL,
            skill_points_per_level: DEFAULT_SKILL_POINTS_PER_LEVEL,
            critical_multiplier: DEFAULT_CRIT_MULTIPLIER,

            rng_seed: None,
            data_path: None,

            save_path: PathBuf::from("wayfarer_save.json"),
        }
    }
}

impl GameConfig {
    /// Load configuration from a specific path.
    /// Returns default config if file doesn't exist or is invalid.
    pub fn load_from<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();

        if !path.exists() {
            info!("Config file not found, using defaults");
            return Self::default();
        }

        let mut contents = String::new();
        match fs::File::open(path).and_then(|mut file| file.read_to_string(&mut contents)) {
            Ok(_) => match toml::from_str::<Self>(&contents) {
                Ok(mut config) => {
                    config.validate();
                    info!("Loaded config from {}", path.display());
                    config
                },
                Err(e) => {
                    warn!("Failed to parse config file: {e}");
                    Self::default()
                },
            },
            Err(e) => {
                warn!("Failed to read config file: {e}");
                Self::default()
            },
        }
    }

    /// Save configuration to a specific path.
    pub fn save_to<P: AsRef<Path>>(&self, path: P) -> io::Result<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

        let mut file = fs::File::create(path)?;
        file.write_all(contents.as_bytes())?;

        info!("Saved config to {}", path.display());
        Ok(())
    }

    /// Clamp values to sensible ranges.
    pub fn validate(&mut self) {
        self.monster_turn_delay_ms = self.monster_turn_delay_ms.min(60_000);
        self.return_delay_ms = self.return_delay_ms.min(60_000);
        self.stat_points_per_level = self.stat_points_per_level.clamp(1, 10);
        self.skill_points_per_level = self.skill_points_per_level.clamp(1, 10);
        if !self.critical_multiplier.is_finite() {
            self.critical_multiplier = DEFAULT_CRIT_MULTIPLIER;
        }
        self.critical_multiplier = self.critical_multiplier.clamp(1.0, 10.0);
    }

    /// Battle pacing.
    #[must_use]
    pub const fn timing(&self) -> BattleTiming {
        BattleTiming {
            monster_turn_delay: Duration::from_millis(self.monster_turn_delay_ms),
            return_delay: Duration::from_millis(self.return_delay_ms),
        }
    }

    /// Level-up rules.
    #[must_use]
    pub const fn progression(&self) -> Progression {
        Progression::new(self.stat_points_per_level, self.skill_points_per_level)
    }

    /// Damage rules.
    #[must_use]
    pub const fn resolver(&self) -> DamageResolver {
        DamageResolver::new(self.critical_multiplier)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = GameConfig::default();
        assert_eq!(config.monster_turn_delay_ms, 1000);
        assert_eq!(config.return_delay_ms, 2000);
        assert_eq!(config.stat_points_per_level, 3);
        assert_eq!(config.timing(), BattleTiming::default());
        assert_eq!(config.progression(), Progression::default());
    }

    #[test]
    fn test_config_validation() {
        let mut config = GameConfig::default();
        config.stat_points_per_level = 0;
        config.critical_multiplier = f64::NAN;

        config.validate();

        assert_eq!(config.stat_points_per_level, 1);
        assert!((config.critical_multiplier - 1.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_config_save_load() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let config_path = temp_dir.path().join("nested").join("wayfarer.toml");

        let mut config = GameConfig::default();
        config.rng_seed = Some(42);
        config.stat_points_per_level = 2;
        config.save_to(&config_path).expect("Failed to save config");

        let loaded = GameConfig::load_from(&config_path);
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let config_path = temp_dir.path().join(CONFIG_FILE);
        fs::write(&config_path, "return_delay_ms = 0\n").expect("write config");

        let loaded = GameConfig::load_from(&config_path);
        assert_eq!(loaded.return_delay_ms, 0);
        assert_eq!(loaded.monster_turn_delay_ms, 1000);
    }

    #[test]
    fn test_config_load_missing_or_broken_file() {
        let config = GameConfig::load_from("/nonexistent/path/wayfarer.toml");
        assert_eq!(config, GameConfig::default());

        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let config_path = temp_dir.path().join(CONFIG_FILE);
        fs::write(&config_path, "this is = = not toml").expect("write config");
        assert_eq!(GameConfig::load_from(&config_path), GameConfig::default());
    }
}
