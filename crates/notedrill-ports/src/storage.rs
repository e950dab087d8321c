use crate::types::*;
use serde::{Deserialize, Serialize};

pub const DEFAULT_PENALTY_LENGTH: u32 = 3;

fn default_penalty_length() -> u32 {
    DEFAULT_PENALTY_LENGTH
}

fn default_scale_preset() -> String {
    "c-major-pent".to_string()
}

#[derive(thiserror::Error, Debug)]
pub enum StorageError {
    #[error("io error: {0}")]
    Io(String),
    #[error("serialization error: {0}")]
    Serde(String),
}

/// Persisted drill preferences. Missing fields fall back to defaults so older
/// settings files keep loading.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SettingsDto {
    pub selected_midi_in: Option<DeviceId>,
    #[serde(default = "default_scale_preset")]
    pub scale_preset: String,
    /// Only read when `scale_preset` is `custom`.
    pub active_notes: Vec<MidiNote>,
    #[serde(default = "default_penalty_length")]
    pub penalty_length: u32,
    pub last_song_index: Option<usize>,
}

impl Default for SettingsDto {
    fn default() -> Self {
        Self {
            selected_midi_in: None,
            scale_preset: default_scale_preset(),
            active_notes: Vec::new(),
            penalty_length: DEFAULT_PENALTY_LENGTH,
            last_song_index: None,
        }
    }
}

pub trait StoragePort: Send + Sync {
    fn load_settings(&self) -> Result<SettingsDto, StorageError>;
    fn save_settings(&self, s: &SettingsDto) -> Result<(), StorageError>;
}
