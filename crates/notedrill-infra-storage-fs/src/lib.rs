use notedrill_ports::storage::{SettingsDto, StorageError, StoragePort};
use serde::{de::DeserializeOwned, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

const SETTINGS_FILE: &str = "settings.json";

/// Settings kept as pretty JSON under one directory.
pub struct FsStorage {
    base_dir: PathBuf,
}

impl FsStorage {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    /// `<config dir>/notedrill`, e.g. `~/.config/notedrill` on Linux.
    pub fn default_base_dir() -> Result<PathBuf, StorageError> {
        let base = dirs_next::config_dir()
            .ok_or_else(|| StorageError::Io("config dir not found".to_string()))?;
        Ok(base.join("notedrill"))
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn settings_path(&self) -> PathBuf {
        self.base_dir.join(SETTINGS_FILE)
    }
}

impl Default for FsStorage {
    fn default() -> Self {
        let base_dir = Self::default_base_dir().unwrap_or_else(|err| {
            log::warn!("{err}, keeping settings in the working directory");
            PathBuf::from(".")
        });
        Self { base_dir }
    }
}

impl StoragePort for FsStorage {
    fn load_settings(&self) -> Result<SettingsDto, StorageError> {
        let path = self.settings_path();
        if !path.exists() {
            log::debug!("no settings at {}, using defaults", path.display());
            return Ok(SettingsDto::default());
        }
        read_json(&path)
    }

    fn save_settings(&self, s: &SettingsDto) -> Result<(), StorageError> {
        write_json(&self.settings_path(), s)
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, StorageError> {
    let data = fs::read(path).map_err(|e| StorageError::Io(e.to_string()))?;
    serde_json::from_slice(&data).map_err(|e| StorageError::Serde(e.to_string()))
}

/// Writes through a sibling temp file so a crash never leaves half a file.
fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), StorageError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| StorageError::Io(e.to_string()))?;
    }
    let data = serde_json::to_vec_pretty(value).map_err(|e| StorageError::Serde(e.to_string()))?;
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, data).map_err(|e| StorageError::Io(e.to_string()))?;
    fs::rename(&tmp, path).map_err(|e| StorageError::Io(e.to_string()))
}
