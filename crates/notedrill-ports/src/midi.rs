use crate::types::*;
use serde::{Deserialize, Serialize};
use std::{sync::Arc, time::Instant};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum MidiLikeEvent {
    NoteOn {
        note: MidiNote,
        velocity: u8,
    },
    /// Also produced for a note-on carrying velocity 0.
    NoteOff {
        note: MidiNote,
    },
}

impl MidiLikeEvent {
    /// Pitch of a note-on, `None` for anything the drill ignores.
    pub fn struck_note(self) -> Option<MidiNote> {
        match self {
            MidiLikeEvent::NoteOn { note, .. } => Some(note),
            MidiLikeEvent::NoteOff { .. } => None,
        }
    }
}

/// Raw input from a MIDI device, stamped on arrival.
#[derive(Clone, Copy, Debug)]
pub struct PlayerEvent {
    pub at: Instant,
    pub event: MidiLikeEvent,
}

#[derive(thiserror::Error, Debug)]
pub enum MidiError {
    #[error("device not found: {0}")]
    DeviceNotFound(String),
    #[error("device unavailable: {0}")]
    DeviceUnavailable(String),
    #[error("backend error: {0}")]
    Backend(String),
}

/// MIDI input stream handle: drop closes it.
pub trait MidiInputStream: Send {
    fn close(self: Box<Self>);
}

pub type PlayerEventCallback = Arc<dyn Fn(PlayerEvent) + Send + Sync + 'static>;

pub trait MidiInputPort: Send + Sync {
    fn list_inputs(&self) -> Result<Vec<MidiInputDevice>, MidiError>;

    /// Open input stream: implementation should invoke cb from a background thread/callback.
    fn open_input(
        &self,
        device_id: &DeviceId,
        cb: PlayerEventCallback,
    ) -> Result<Box<dyn MidiInputStream>, MidiError>;
}
