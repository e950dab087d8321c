use notedrill_ports::types::{MidiNote, MIDDLE_C};

const CHROMATIC_NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

/// Result of reading a single pitch token.
///
/// Malformed tokens are not rejected: they become middle C, matching the
/// permissive behaviour song authors rely on. The `Defaulted` variant keeps
/// that substitution visible to callers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ParsedNote {
    Parsed(MidiNote),
    Defaulted(MidiNote),
}

impl ParsedNote {
    pub fn midi(self) -> MidiNote {
        match self {
            ParsedNote::Parsed(note) | ParsedNote::Defaulted(note) => note,
        }
    }

    pub fn is_defaulted(self) -> bool {
        matches!(self, ParsedNote::Defaulted(_))
    }
}

/// Reads `[A-G][#b]?[0-9]` (e.g. `C4`, `F#4`, `Bb3`) into a MIDI number.
pub fn parse_note_to_midi(name: &str) -> ParsedNote {
    parse_pitch(name.trim())
        .map(ParsedNote::Parsed)
        .unwrap_or(ParsedNote::Defaulted(MIDDLE_C))
}

fn parse_pitch(token: &str) -> Option<MidiNote> {
    let bytes = token.as_bytes();
    let (letter, accidental, octave) = match *bytes {
        [letter, octave] => (letter, None, octave),
        [letter, accidental, octave] => (letter, Some(accidental), octave),
        _ => return None,
    };

    let base: i32 = match letter {
        b'C' => 0,
        b'D' => 2,
        b'E' => 4,
        b'F' => 5,
        b'G' => 7,
        b'A' => 9,
        b'B' => 11,
        _ => return None,
    };
    let alter = match accidental {
        None => 0,
        Some(b'#') => 1,
        Some(b'b') => -1,
        Some(_) => return None,
    };
    if !octave.is_ascii_digit() {
        return None;
    }
    let octave = i32::from(octave - b'0');

    // Lowest reachable value is Cb0 = 11, highest B#9 = 132.
    let midi = base + (octave + 1) * 12 + alter;
    MidiNote::try_from(midi).ok()
}

/// Splits song notation (`"C4/q, D4/8, E4"`) into MIDI numbers, ignoring
/// anything after a `/` in each token.
pub fn parse_song_to_midi_sequence(notation: &str) -> Vec<MidiNote> {
    parse_song_detailed(notation)
        .into_iter()
        .map(ParsedNote::midi)
        .collect()
}

pub fn parse_song_detailed(notation: &str) -> Vec<ParsedNote> {
    notation
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|token| !token.is_empty())
        .map(|token| {
            let pitch = token.split('/').next().unwrap_or_default();
            parse_note_to_midi(pitch)
        })
        .collect()
}

/// Sharp-only spelling of a MIDI number, e.g. `60 -> "C4"`, `61 -> "C#4"`.
pub fn note_name(midi: MidiNote) -> String {
    let octave = i32::from(midi / 12) - 1;
    let pitch_class = CHROMATIC_NAMES[usize::from(midi % 12)];
    format!("{pitch_class}{octave}")
}

/// Name in the key format staff renderers expect. Same spelling as
/// [`note_name`].
pub fn easy_score_note(midi: MidiNote) -> String {
    note_name(midi)
}

pub fn chromatic_names() -> &'static [&'static str; 12] {
    &CHROMATIC_NAMES
}
