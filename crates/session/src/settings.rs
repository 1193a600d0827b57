use std::{fs, io, path::PathBuf};

use chanview_types::settings::Settings;
use tracing::{debug, info};

#[derive(thiserror::Error, Debug)]
pub enum SettingsError {
    #[error("Settings io error: {0}")]
    Io(#[from] io::Error),

    #[error("Settings format error: {0}")]
    Format(#[from] serde_json::Error),

    #[error("No settings location available")]
    NoLocation,

    #[error("Settings store unavailable")]
    Unavailable,
}

/// Key-value persistence for the [`Settings`] snapshot.
pub trait SettingsStore {
    fn load(&self) -> Result<Settings, SettingsError>;

    fn save(&mut self, settings: &Settings) -> Result<(), SettingsError>;
}

/// Settings kept as one JSON document on disk.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: Option<PathBuf>,
}

impl JsonFileStore {
    pub fn new(path: Option<PathBuf>) -> Self {
        JsonFileStore { path }
    }

    fn path(&self) -> Result<&PathBuf, SettingsError> {
        self.path.as_ref().ok_or(SettingsError::NoLocation)
    }
}

impl SettingsStore for JsonFileStore {
    fn load(&self) -> Result<Settings, SettingsError> {
        let path = self.path()?;
        match fs::read_to_string(path) {
            Ok(raw) => Ok(serde_json::from_str(&raw)?),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                info!("No settings at {}, using defaults", path.display());
                Ok(Settings::default())
            }
            Err(e) => Err(e.into()),
        }
    }

    fn save(&mut self, settings: &Settings) -> Result<(), SettingsError> {
        let path = self.path()?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_vec_pretty(settings)?)?;
        fs::rename(&tmp, path)?;
        debug!("Saved settings to {}", path.display());
        Ok(())
    }
}

/// Settings held in memory, for tests and for running without a disk.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    saved: Option<Settings>,
    saves: usize,
    fail_loads: bool,
    fail_saves: bool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(settings: Settings) -> Self {
        MemoryStore {
            saved: Some(settings),
            ..Default::default()
        }
    }

    pub fn failing_loads(mut self) -> Self {
        self.fail_loads = true;
        self
    }

    pub fn failing_saves(mut self) -> Self {
        self.fail_saves = true;
        self
    }

    pub fn saved(&self) -> Option<&Settings> {
        self.saved.as_ref()
    }

    pub fn save_count(&self) -> usize {
        self.saves
    }
}

impl SettingsStore for MemoryStore {
    fn load(&self) -> Result<Settings, SettingsError> {
        if self.fail_loads {
            return Err(SettingsError::Unavailable);
        }
        Ok(self.saved.clone().unwrap_or_default())
    }

    fn save(&mut self, settings: &Settings) -> Result<(), SettingsError> {
        if self.fail_saves {
            return Err(SettingsError::Unavailable);
        }
        self.saved = Some(settings.clone());
        self.saves += 1;
        Ok(())
    }
}
