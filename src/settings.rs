//! Player settings and preferences
//!
//! Persisted through the same store as the leaderboards.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::consts::MAX_PARTICLES;
use crate::input::KeyBindings;
use crate::persistence::{PersistenceError, ScoreStore};

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("settings are malformed: {0}")]
    Parse(#[from] serde_json::Error),
    #[error(transparent)]
    Store(#[from] PersistenceError),
}

/// Difficulty preset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Difficulty {
    Easy,
    #[default]
    Normal,
    Hard,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "Easy",
            Difficulty::Normal => "Normal",
            Difficulty::Hard => "Hard",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "easy" => Some(Difficulty::Easy),
            "normal" | "norm" => Some(Difficulty::Normal),
            "hard" => Some(Difficulty::Hard),
            _ => None,
        }
    }

    /// Starting lives given a game's default
    pub fn starting_lives(&self, base: u8) -> u8 {
        match self {
            Difficulty::Easy => base.saturating_add(2),
            Difficulty::Normal => base,
            Difficulty::Hard => base.saturating_sub(1).max(1),
        }
    }

    /// Waves added to the scaling index, so hard play starts further along
    pub fn level_offset(&self) -> u32 {
        match self {
            Difficulty::Easy | Difficulty::Normal => 0,
            Difficulty::Hard => 3,
        }
    }

    /// Multiplier on AI aggression (dive/attack frequency, adversary speed)
    pub fn aggression(&self) -> f32 {
        match self {
            Difficulty::Easy => 0.75,
            Difficulty::Normal => 1.0,
            Difficulty::Hard => 1.25,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Master volume (0.0 - 1.0)
    pub master_volume: f32,
    pub muted: bool,
    pub difficulty: Difficulty,
    /// Visual debris cap (never above the engine's hard cap)
    pub particle_cap: usize,
    /// Fixed RNG seed; a fresh seed per session when absent
    pub seed: Option<u64>,
    pub key_bindings: KeyBindings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            master_volume: 0.8,
            muted: false,
            difficulty: Difficulty::Normal,
            particle_cap: MAX_PARTICLES,
            seed: None,
            key_bindings: KeyBindings::default(),
        }
    }
}

impl Settings {
    /// Store key
    pub const STORAGE_KEY: &'static str = "arcade_settings";

    pub fn effective_particle_cap(&self) -> usize {
        self.particle_cap.min(MAX_PARTICLES)
    }

    pub fn effective_volume(&self) -> f32 {
        if self.muted {
            0.0
        } else {
            self.master_volume.clamp(0.0, 1.0)
        }
    }

    pub fn try_load(store: &dyn ScoreStore) -> Result<Option<Self>, SettingsError> {
        match store.load(Self::STORAGE_KEY)? {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    /// Load from the store; missing or malformed data gives defaults
    pub fn load(store: &dyn ScoreStore) -> Self {
        match Self::try_load(store) {
            Ok(Some(settings)) => {
                log::info!("loaded settings");
                settings
            }
            Ok(None) => {
                log::info!("using default settings");
                Self::default()
            }
            Err(err) => {
                log::warn!("{err}; using default settings");
                Self::default()
            }
        }
    }

    pub fn save(&self, store: &mut dyn ScoreStore) -> Result<(), SettingsError> {
        let json = serde_json::to_string(self)?;
        store.save(Self::STORAGE_KEY, &json)?;
        log::info!("settings saved");
        Ok(())
    }
}
