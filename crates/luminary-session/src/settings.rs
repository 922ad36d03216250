use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use luminary_haptics::{HapticPattern, PatternParams};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Key the settings record is stored under.
pub const SETTINGS_KEY: &str = "LUMINARY_LABS_SETTINGS";
const APP_DIR_NAME: &str = "LuminaryLabs";

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("config directory unavailable")]
    NoConfigDir,
    #[error("settings i/o failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed settings record: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("preference store unavailable: {0}")]
    Unavailable(String),
}

/// Flat key/value store holding serialized records.
pub trait PreferenceStore {
    fn load(&self, key: &str) -> Result<Option<String>, SettingsError>;

    fn save(&mut self, key: &str, record: &str) -> Result<(), SettingsError>;

    fn remove(&mut self, key: &str) -> Result<(), SettingsError>;
}

/// Persisted user preferences. Missing fields take their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Settings {
    pub is_grounding_active: bool,
    pub is_haptic_enabled: bool,
    pub haptic_intensity: f32,
    pub haptic_pattern: HapticPattern,
    pub haptic_wave_interval: u32,
    pub haptic_wave_duty_cycle: f32,
    pub haptic_heartbeat_intensity_mod: f32,
    pub is_crystal_attunement_active: bool,
}

impl Default for Settings {
    fn default() -> Self {
        let params = PatternParams::default();
        Self {
            is_grounding_active: true,
            is_haptic_enabled: true,
            haptic_intensity: params.intensity,
            haptic_pattern: HapticPattern::Default,
            haptic_wave_interval: params.wave_interval_ms,
            haptic_wave_duty_cycle: params.wave_duty_cycle,
            haptic_heartbeat_intensity_mod: params.heartbeat_mod,
            is_crystal_attunement_active: false,
        }
    }
}

impl Settings {
    /// Reads the record from `store`, falling back to defaults on any
    /// failure.
    pub fn load(store: &dyn PreferenceStore) -> Self {
        match store.load(SETTINGS_KEY) {
            Ok(Some(record)) => match serde_json::from_str(&record) {
                Ok(settings) => settings,
                Err(err) => {
                    tracing::error!(%err, "failed to parse settings, using defaults");
                    Self::default()
                }
            },
            Ok(None) => Self::default(),
            Err(err) => {
                tracing::error!(%err, "failed to load settings, using defaults");
                Self::default()
            }
        }
    }

    /// Writes the record. Failures are logged and otherwise ignored.
    pub fn save(&self, store: &mut dyn PreferenceStore) {
        let result = serde_json::to_string(self)
            .map_err(SettingsError::from)
            .and_then(|record| store.save(SETTINGS_KEY, &record));
        if let Err(err) = result {
            tracing::error!(%err, "failed to save settings");
        }
    }

    /// Removes the record and resets every field.
    pub fn clear(&mut self, store: &mut dyn PreferenceStore) {
        if let Err(err) = store.remove(SETTINGS_KEY) {
            tracing::error!(%err, "failed to remove settings");
        }
        *self = Self::default();
    }

    pub fn pattern_params(&self) -> PatternParams {
        PatternParams {
            intensity: self.haptic_intensity,
            wave_interval_ms: self.haptic_wave_interval,
            wave_duty_cycle: self.haptic_wave_duty_cycle,
            heartbeat_mod: self.haptic_heartbeat_intensity_mod,
        }
    }
}

/// One JSON file per key inside a directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Store under the user's config directory.
    pub fn user() -> Result<Self, SettingsError> {
        let base = dirs::config_dir().ok_or(SettingsError::NoConfigDir)?;
        Ok(Self::new(base.join(APP_DIR_NAME)))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl PreferenceStore for FileStore {
    fn load(&self, key: &str) -> Result<Option<String>, SettingsError> {
        match fs::read_to_string(self.path_for(key)) {
            Ok(contents) => Ok(Some(contents)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn save(&mut self, key: &str, record: &str) -> Result<(), SettingsError> {
        if !self.dir.exists() {
            fs::create_dir_all(&self.dir)?;
        }
        fs::write(self.path_for(key), record)?;
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), SettingsError> {
        match fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}

/// In-memory store. Clones share the same records.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    records: Arc<Mutex<HashMap<String, String>>>,
    failing: bool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store whose every operation fails.
    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Self::default()
        }
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.records.lock().get(key).cloned()
    }

    pub fn insert(&self, key: &str, record: &str) {
        self.records
            .lock()
            .insert(key.to_string(), record.to_string());
    }

    fn check(&self) -> Result<(), SettingsError> {
        if self.failing {
            Err(SettingsError::Unavailable("memory store set to fail".into()))
        } else {
            Ok(())
        }
    }
}

impl PreferenceStore for MemoryStore {
    fn load(&self, key: &str) -> Result<Option<String>, SettingsError> {
        self.check()?;
        Ok(self.get(key))
    }

    fn save(&mut self, key: &str, record: &str) -> Result<(), SettingsError> {
        self.check()?;
        self.insert(key, record);
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), SettingsError> {
        self.check()?;
        self.records.lock().remove(key);
        Ok(())
    }
}
