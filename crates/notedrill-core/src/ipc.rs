use notedrill_domain_eval::{NoteOutcome, PracticeSnapshot};
use notedrill_ports::midi::MidiLikeEvent;
use notedrill_ports::types::{DeviceId, MidiInputDevice, MidiNote};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum Command {
    ListMidiInputs,
    SelectMidiInput { device_id: DeviceId },
    SetModeRandom,
    SetModeSong { index: usize },
    SetActiveNotes { notes: Vec<MidiNote> },
    ApplyScalePreset { id: String },
    SelectAllNotes,
    ClearNotes,
    /// A note struck without a device, e.g. typed or clicked.
    PlayNote { note: MidiNote },
    RequestSnapshot,
    ExportDiagnostics { path: String },
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum Event {
    MidiInputsUpdated { devices: Vec<MidiInputDevice> },
    SnapshotUpdated { snapshot: PracticeSnapshot },
    NoteJudged { outcome: NoteOutcome },
    SongCompleted { title: String },
    /// Current target first, then what follows it.
    UpcomingTargets { notes: Vec<MidiNote> },
    RecentInputEvents { events: Vec<MidiLikeEvent> },
}
