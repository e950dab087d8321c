use crate::notation::{parse_note_to_midi, parse_song_detailed};
use notedrill_ports::types::MidiNote;
use serde::{Deserialize, Serialize};

/// Chromatic C4..=C5, the pitches the drill offers by default.
pub const DEFAULT_AVAILABLE_NOTES: [MidiNote; 13] =
    [60, 61, 62, 63, 64, 65, 66, 67, 68, 69, 70, 71, 72];

pub const DEFAULT_SCALE_PRESET: &str = "c-major-pent";

/// Preset id for a hand-picked note selection. Has no chord progression.
pub const CUSTOM_SCALE_ID: &str = "custom";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Song {
    pub title: String,
    /// Space/comma separated `PITCH[/DURATION]` tokens.
    pub notes: String,
}

impl Song {
    pub fn new(title: impl Into<String>, notes: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            notes: notes.into(),
        }
    }

    /// Parses the notation, logging tokens that fell back to middle C.
    pub fn midi_sequence(&self) -> Vec<MidiNote> {
        let parsed = parse_song_detailed(&self.notes);
        let defaulted = parsed.iter().filter(|note| note.is_defaulted()).count();
        if defaulted > 0 {
            log::warn!(
                "song '{}': {} token(s) not understood, substituted middle C",
                self.title,
                defaulted
            );
        }
        parsed.into_iter().map(|note| note.midi()).collect()
    }
}

pub fn builtin_songs() -> Vec<Song> {
    vec![
        Song::new(
            "Twinkle Twinkle Little Star",
            "C4/q, C4, G4, G4, A4, A4, G4/h, F4/q, F4, E4, E4, D4, D4, C4/h",
        ),
        Song::new(
            "Mary Had a Little Lamb",
            "E4/q, D4, C4, D4, E4, E4, E4/h, D4/q, D4, D4/h, E4/q, G4, G4/h",
        ),
        Song::new(
            "Ode to Joy",
            "E4/q, E4, F4, G4, G4, F4, E4, D4, C4, C4, D4, E4, E4/q., D4/8, D4/h",
        ),
        Song::new(
            "Frere Jacques",
            "C4/q, D4, E4, C4, C4, D4, E4, C4, E4, F4, G4/h, E4/q, F4, G4/h",
        ),
        Song::new(
            "Hot Cross Buns",
            "E4/q, D4, C4/h, E4/q, D4, C4/h, C4/8, C4, C4, C4, D4, D4, D4, D4, E4/q, D4, C4/h",
        ),
    ]
}

/// A named note selection with the triads used to shape random phrases.
#[derive(Clone, Copy, Debug)]
pub struct ScalePreset {
    pub id: &'static str,
    pub name: &'static str,
    notes: &'static [&'static str],
    progression: &'static [[&'static str; 3]],
}

impl ScalePreset {
    /// Note names as written, lowest first.
    pub fn notes(&self) -> &'static [&'static str] {
        self.notes
    }

    /// Sorted, deduplicated pitches of the preset.
    pub fn midi_notes(&self) -> Vec<MidiNote> {
        let mut notes: Vec<MidiNote> = self
            .notes
            .iter()
            .map(|name| parse_note_to_midi(name).midi())
            .collect();
        notes.sort_unstable();
        notes.dedup();
        notes
    }

    /// Chord tones in written order; the order is the progression order.
    pub fn chord_progression(&self) -> Vec<Vec<MidiNote>> {
        self.progression
            .iter()
            .map(|chord| {
                chord
                    .iter()
                    .map(|name| parse_note_to_midi(name).midi())
                    .collect()
            })
            .collect()
    }
}

const SCALE_PRESETS: [ScalePreset; 4] = [
    ScalePreset {
        id: "c-major",
        name: "C Major (Ionian)",
        notes: &["C4", "D4", "E4", "F4", "G4", "A4", "B4", "C5"],
        progression: &[
            ["C4", "E4", "G4"],
            ["G4", "B4", "D4"],
            ["A4", "C5", "E4"],
            ["F4", "A4", "C5"],
        ],
    },
    ScalePreset {
        id: "c-natural-minor",
        name: "C Natural Minor",
        notes: &["C4", "D4", "D#4", "F4", "G4", "G#4", "A#4", "C5"],
        progression: &[
            ["C4", "D#4", "G4"],
            ["G4", "A#4", "D4"],
            ["D#4", "G4", "A#4"],
            ["F4", "G#4", "C5"],
        ],
    },
    ScalePreset {
        id: "c-major-pent",
        name: "C Major Pentatonic",
        notes: &["C4", "D4", "E4", "G4", "A4", "C5"],
        progression: &[
            ["C4", "E4", "G4"],
            ["D4", "G4", "A4"],
            ["E4", "A4", "C5"],
        ],
    },
    ScalePreset {
        id: "c-blues",
        name: "C Blues",
        notes: &["C4", "D#4", "F4", "F#4", "G4", "A#4", "C5"],
        progression: &[
            ["C4", "F4", "G4"],
            ["D#4", "G4", "A#4"],
            ["F4", "G#4", "C5"],
        ],
    },
];

pub fn scale_presets() -> &'static [ScalePreset] {
    &SCALE_PRESETS
}

pub fn find_scale_preset(id: &str) -> Option<&'static ScalePreset> {
    SCALE_PRESETS.iter().find(|preset| preset.id == id)
}

/// Chords for a preset id; empty for `custom` and unknown ids.
pub fn chord_progression_for(id: &str) -> Vec<Vec<MidiNote>> {
    find_scale_preset(id)
        .map(ScalePreset::chord_progression)
        .unwrap_or_default()
}
