use crate::phrase::{MelodicEngine, PhraseContext};
use crate::random::RandomSource;
use notedrill_domain_theory::{
    builtin_songs, find_scale_preset, Song, CUSTOM_SCALE_ID, DEFAULT_AVAILABLE_NOTES,
    DEFAULT_SCALE_PRESET,
};
use notedrill_ports::storage::DEFAULT_PENALTY_LENGTH;
use notedrill_ports::types::MidiNote;
use serde::{Deserialize, Serialize};

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PracticeError {
    #[error("note pool must contain at least one MIDI note")]
    EmptyNotePool,
    #[error("active note selection would be empty")]
    EmptyActiveNotes,
    #[error("no song at index {0}")]
    InvalidSongIndex(usize),
    #[error("song has no notes: {0}")]
    EmptySong(String),
    #[error("unknown scale preset: {0}")]
    UnknownScalePreset(String),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PracticeMode {
    Random,
    Song,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PracticePhase {
    Practice,
    Penalty,
}

#[derive(Clone, Debug)]
pub struct PracticeConfig {
    pub available_notes: Vec<MidiNote>,
    /// Explicit selection; `None` takes the notes of `scale_preset`.
    pub active_notes: Option<Vec<MidiNote>>,
    pub scale_preset: String,
    /// Correct repeats demanded after a miss. Values below 1 are raised to 1.
    pub penalty_length: u32,
    pub songs: Vec<Song>,
}

impl Default for PracticeConfig {
    fn default() -> Self {
        Self {
            available_notes: DEFAULT_AVAILABLE_NOTES.to_vec(),
            active_notes: None,
            scale_preset: DEFAULT_SCALE_PRESET.to_string(),
            penalty_length: DEFAULT_PENALTY_LENGTH,
            songs: builtin_songs(),
        }
    }
}

/// Read-only copy of the session for renderers.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PracticeSnapshot {
    pub mode: PracticeMode,
    pub phase: PracticePhase,
    pub target_note: MidiNote,
    pub penalty_hits: u32,
    pub penalty_length: u32,
    pub current_streak: u32,
    pub active_notes: Vec<MidiNote>,
    pub scale_preset: String,
    pub current_song_index: Option<usize>,
    pub current_song_title: String,
    pub song_queue_length: usize,
    pub song_progress_index: usize,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum NoteOutcome {
    Miss {
        played: MidiNote,
        /// Unchanged by a miss.
        target: MidiNote,
        penalty_remaining: u32,
        streak: u32,
        mode: PracticeMode,
    },
    Hit {
        new_target: MidiNote,
        /// The drill moved on. A song may move on to the same pitch.
        target_changed: bool,
        penalty_remaining: u32,
        streak: u32,
        /// Set when a song ran off its end and restarted.
        song_looped: bool,
        mode: PracticeMode,
    },
}

impl NoteOutcome {
    pub fn is_hit(&self) -> bool {
        matches!(self, NoteOutcome::Hit { .. })
    }

    /// Target after this outcome was applied.
    pub fn target(&self) -> MidiNote {
        match self {
            NoteOutcome::Miss { target, .. } => *target,
            NoteOutcome::Hit { new_target, .. } => *new_target,
        }
    }

    pub fn song_looped(&self) -> bool {
        matches!(self, NoteOutcome::Hit { song_looped: true, .. })
    }
}

struct Advance {
    target: MidiNote,
    song_looped: bool,
}

/// The drill state machine: one target at a time, a repeat drill after every
/// miss, and either melodic random targets or a looping song.
///
/// Every operation completes synchronously; failed operations leave the
/// session untouched.
pub struct PracticeSession<R> {
    rng: R,
    engine: MelodicEngine,
    available_notes: Vec<MidiNote>,
    active_notes: Vec<MidiNote>,
    scale_preset: String,
    songs: Vec<Song>,
    mode: PracticeMode,
    phase: PracticePhase,
    target_note: MidiNote,
    penalty_hits: u32,
    penalty_length: u32,
    current_streak: u32,
    current_song_index: Option<usize>,
    current_song_title: String,
    song_queue: Vec<MidiNote>,
    song_progress_index: usize,
}

impl<R: RandomSource> PracticeSession<R> {
    pub fn new(config: PracticeConfig, rng: R) -> Result<Self, PracticeError> {
        let mut available_notes = config.available_notes;
        available_notes.sort_unstable();
        available_notes.dedup();
        let Some(&first_note) = available_notes.first() else {
            return Err(PracticeError::EmptyNotePool);
        };

        let (active_notes, scale_preset) = match config.active_notes {
            Some(notes) => {
                let active = sanitize_notes(&notes, &available_notes);
                if active.is_empty() {
                    return Err(PracticeError::EmptyActiveNotes);
                }
                (active, config.scale_preset)
            }
            None => {
                let preset_notes = find_scale_preset(&config.scale_preset)
                    .map(|preset| sanitize_notes(&preset.midi_notes(), &available_notes))
                    .unwrap_or_default();
                if preset_notes.is_empty() {
                    (available_notes.clone(), CUSTOM_SCALE_ID.to_string())
                } else {
                    (preset_notes, config.scale_preset)
                }
            }
        };

        let mut session = Self {
            rng,
            engine: MelodicEngine::new(),
            available_notes,
            active_notes,
            scale_preset,
            songs: config.songs,
            mode: PracticeMode::Random,
            phase: PracticePhase::Practice,
            target_note: first_note,
            penalty_hits: 0,
            penalty_length: config.penalty_length.max(1),
            current_streak: 0,
            current_song_index: None,
            current_song_title: String::new(),
            song_queue: Vec::new(),
            song_progress_index: 0,
        };
        session.target_note = session.draw_random_target(None);
        Ok(session)
    }

    pub fn snapshot(&self) -> PracticeSnapshot {
        PracticeSnapshot {
            mode: self.mode,
            phase: self.phase,
            target_note: self.target_note,
            penalty_hits: self.penalty_hits,
            penalty_length: self.penalty_length,
            current_streak: self.current_streak,
            active_notes: self.active_notes.clone(),
            scale_preset: self.scale_preset.clone(),
            current_song_index: self.current_song_index,
            current_song_title: self.current_song_title.clone(),
            song_queue_length: self.song_queue.len(),
            song_progress_index: self.song_progress_index,
        }
    }

    pub fn target_note(&self) -> MidiNote {
        self.target_note
    }

    pub fn available_notes(&self) -> &[MidiNote] {
        &self.available_notes
    }

    pub fn active_notes(&self) -> &[MidiNote] {
        &self.active_notes
    }

    pub fn songs(&self) -> &[Song] {
        &self.songs
    }

    pub fn engine(&self) -> &MelodicEngine {
        &self.engine
    }

    pub fn set_mode_random(&mut self) -> PracticeSnapshot {
        self.mode = PracticeMode::Random;
        self.current_song_index = None;
        self.current_song_title.clear();
        self.song_queue.clear();
        self.song_progress_index = 0;
        self.reset_penalty();
        self.current_streak = 0;
        self.engine.reset();
        self.target_note = self.draw_random_target(None);
        log::info!("random mode, first target {}", self.target_note);
        self.snapshot()
    }

    pub fn set_mode_song(&mut self, index: usize) -> Result<PracticeSnapshot, PracticeError> {
        let song = self
            .songs
            .get(index)
            .ok_or(PracticeError::InvalidSongIndex(index))?;
        let queue = song.midi_sequence();
        let Some(&first) = queue.first() else {
            return Err(PracticeError::EmptySong(song.title.clone()));
        };

        self.current_song_title = song.title.clone();
        self.mode = PracticeMode::Song;
        self.current_song_index = Some(index);
        self.song_queue = queue;
        self.song_progress_index = 0;
        self.target_note = first;
        self.reset_penalty();
        self.current_streak = 0;
        self.engine.reset();
        log::info!(
            "song mode: '{}' ({} notes)",
            self.current_song_title,
            self.song_queue.len()
        );
        Ok(self.snapshot())
    }

    /// Replaces the active notes with `notes`, deduplicated and restricted to
    /// the pool. Marks the selection as custom.
    pub fn set_active_notes(&mut self, notes: &[MidiNote]) -> Result<(), PracticeError> {
        let active = sanitize_notes(notes, &self.available_notes);
        if active.is_empty() {
            return Err(PracticeError::EmptyActiveNotes);
        }
        self.replace_active_notes(active, CUSTOM_SCALE_ID.to_string());
        Ok(())
    }

    pub fn apply_scale_preset(&mut self, id: &str) -> Result<(), PracticeError> {
        let preset = find_scale_preset(id)
            .ok_or_else(|| PracticeError::UnknownScalePreset(id.to_string()))?;
        let active = sanitize_notes(&preset.midi_notes(), &self.available_notes);
        if active.is_empty() {
            return Err(PracticeError::EmptyActiveNotes);
        }
        self.replace_active_notes(active, preset.id.to_string());
        Ok(())
    }

    pub fn select_all_notes(&mut self) {
        let all = self.available_notes.clone();
        self.replace_active_notes(all, CUSTOM_SCALE_ID.to_string());
    }

    /// Narrows the selection to the lowest note of the pool.
    pub fn clear_notes(&mut self) {
        let lowest = self.available_notes[..1].to_vec();
        self.replace_active_notes(lowest, CUSTOM_SCALE_ID.to_string());
    }

    pub fn reset_penalty(&mut self) {
        self.penalty_hits = 0;
        self.phase = PracticePhase::Practice;
    }

    pub fn record_note(&mut self, note: MidiNote) -> NoteOutcome {
        if note != self.target_note {
            self.current_streak = 0;
            self.penalty_hits = self.penalty_length;
            self.phase = PracticePhase::Penalty;
            log::debug!(
                "miss: played {} for target {}, drill of {}",
                note,
                self.target_note,
                self.penalty_hits
            );
            return NoteOutcome::Miss {
                played: note,
                target: self.target_note,
                penalty_remaining: self.penalty_hits,
                streak: self.current_streak,
                mode: self.mode,
            };
        }

        // Drill repeats count toward the streak too.
        self.current_streak += 1;

        let should_advance = if self.penalty_hits > 0 {
            self.penalty_hits -= 1;
            if self.penalty_hits == 0 {
                self.phase = PracticePhase::Practice;
                true
            } else {
                false
            }
        } else {
            true
        };

        let mut song_looped = false;
        if should_advance {
            let advance = self.advance_target();
            self.target_note = advance.target;
            song_looped = advance.song_looped;
        }
        log::debug!(
            "hit {}: streak {}, drill remaining {}, next {}",
            note,
            self.current_streak,
            self.penalty_hits,
            self.target_note
        );

        NoteOutcome::Hit {
            new_target: self.target_note,
            target_changed: should_advance,
            penalty_remaining: self.penalty_hits,
            streak: self.current_streak,
            song_looped,
            mode: self.mode,
        }
    }

    /// The current target followed by what comes after it, up to `count`
    /// notes. Exact for songs; for random mode it covers the rest of the
    /// current phrase.
    pub fn upcoming_targets(&self, count: usize) -> Vec<MidiNote> {
        if count == 0 {
            return Vec::new();
        }
        match self.mode {
            PracticeMode::Song if !self.song_queue.is_empty() => (0..count)
                .map(|offset| {
                    self.song_queue[(self.song_progress_index + offset) % self.song_queue.len()]
                })
                .collect(),
            _ => {
                let mut notes = vec![self.target_note];
                notes.extend(self.engine.upcoming(self.target_note, count - 1));
                notes
            }
        }
    }

    fn advance_target(&mut self) -> Advance {
        if self.mode == PracticeMode::Song && !self.song_queue.is_empty() {
            self.song_progress_index += 1;
            let song_looped = self.song_progress_index >= self.song_queue.len();
            if song_looped {
                self.song_progress_index = 0;
                log::info!("song '{}' completed, looping", self.current_song_title);
            }
            return Advance {
                target: self.song_queue[self.song_progress_index],
                song_looped,
            };
        }
        Advance {
            target: self.draw_random_target(Some(self.target_note)),
            song_looped: false,
        }
    }

    fn replace_active_notes(&mut self, active: Vec<MidiNote>, scale_preset: String) {
        self.active_notes = active;
        self.scale_preset = scale_preset;
        self.engine.reset();
        if self.mode == PracticeMode::Random && !self.active_notes.contains(&self.target_note) {
            self.target_note = self.draw_random_target(Some(self.target_note));
        }
        log::debug!(
            "active notes {:?} ({})",
            self.active_notes,
            self.scale_preset
        );
    }

    fn draw_random_target(&mut self, current: Option<MidiNote>) -> MidiNote {
        let ctx = PhraseContext {
            active_notes: &self.active_notes,
            scale_preset: &self.scale_preset,
        };
        let next = self.engine.next_random_note(current, &ctx, &mut self.rng);
        next.unwrap_or(self.target_note)
    }
}

/// Sorted, deduplicated members of `notes` that also appear in `pool`.
fn sanitize_notes(notes: &[MidiNote], pool: &[MidiNote]) -> Vec<MidiNote> {
    let mut sanitized: Vec<MidiNote> = notes
        .iter()
        .copied()
        .filter(|note| pool.contains(note))
        .collect();
    sanitized.sort_unstable();
    sanitized.dedup();
    sanitized
}
