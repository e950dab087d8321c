use crate::random::{chance, choose, RandomSource};
use notedrill_domain_theory::chord_progression_for;
use notedrill_ports::types::MidiNote;
use std::collections::VecDeque;

const CHORD_BLOCKS: usize = 4;
const MOTIF_LENGTH: usize = 4;
/// Passing tones are preferred on one step in four.
const PASSING_TONE_CHANCE: (usize, usize) = (1, 4);
const PASSING_TONE_RANGE: u8 = 2;
const MAX_LEAP: u8 = 5;

pub type Chord = Vec<MidiNote>;

/// What the engine needs to know about the current drill settings.
#[derive(Clone, Copy, Debug)]
pub struct PhraseContext<'a> {
    /// Sorted ascending, non-empty in every session state.
    pub active_notes: &'a [MidiNote],
    pub scale_preset: &'a str,
}

impl PhraseContext<'_> {
    fn tonic(&self) -> Option<MidiNote> {
        self.active_notes.iter().copied().min()
    }

    fn is_active(&self, note: MidiNote) -> bool {
        self.active_notes.contains(&note)
    }
}

/// Produces random-mode targets as short melodic phrases over a chord
/// progression instead of independent uniform draws.
#[derive(Clone, Debug, Default)]
pub struct MelodicEngine {
    phrase_queue: VecDeque<MidiNote>,
    last_note: Option<MidiNote>,
    chord_pool: Vec<Chord>,
    chord_cursor: usize,
}

impl MelodicEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drops all harmonic context. Must run whenever the active notes or the
    /// drill mode change.
    pub fn reset(&mut self) {
        self.phrase_queue.clear();
        self.last_note = None;
        self.chord_pool.clear();
        self.chord_cursor = 0;
    }

    pub fn phrase(&self) -> &VecDeque<MidiNote> {
        &self.phrase_queue
    }

    pub fn chord_pool(&self) -> &[Chord] {
        &self.chord_pool
    }

    pub fn last_note(&self) -> Option<MidiNote> {
        self.last_note
    }

    pub fn rebuild_chord_pool(&mut self, ctx: &PhraseContext<'_>) {
        let mut pool: Vec<Chord> = chord_progression_for(ctx.scale_preset)
            .into_iter()
            .map(|chord| {
                chord
                    .into_iter()
                    .filter(|note| ctx.is_active(*note))
                    .collect::<Chord>()
            })
            .filter(|chord| chord.len() >= 2)
            .collect();

        if pool.is_empty() {
            let mut sorted = ctx.active_notes.to_vec();
            sorted.sort_unstable();
            pool = sorted.windows(3).map(|window| window.to_vec()).collect();
        }

        log::trace!("chord pool rebuilt: {} chord(s)", pool.len());
        self.chord_pool = pool;
        self.chord_cursor = 0;
    }

    pub fn generate_motif<R: RandomSource>(
        &mut self,
        chord: &[MidiNote],
        length: usize,
        ctx: &PhraseContext<'_>,
        rng: &mut R,
    ) -> Vec<MidiNote> {
        let Some(mut prev) = self.last_note.or_else(|| choose(rng, chord)) else {
            return Vec::new();
        };

        let mut motif = Vec::with_capacity(length);
        for _ in 0..length {
            let (numerator, denominator) = PASSING_TONE_CHANCE;
            let preferred: Vec<MidiNote> = if chance(rng, numerator, denominator) {
                ctx.active_notes
                    .iter()
                    .copied()
                    .filter(|note| note.abs_diff(prev) <= PASSING_TONE_RANGE)
                    .collect()
            } else {
                chord.to_vec()
            };
            let candidates = if preferred.is_empty() {
                chord.to_vec()
            } else {
                preferred
            };

            let within_leap: Vec<MidiNote> = candidates
                .iter()
                .copied()
                .filter(|note| note.abs_diff(prev) <= MAX_LEAP)
                .collect();
            let reachable = if within_leap.is_empty() {
                candidates
            } else {
                within_leap
            };

            let fresh: Vec<MidiNote> = reachable
                .iter()
                .copied()
                .filter(|note| *note != prev)
                .collect();
            let options = if fresh.is_empty() { &reachable } else { &fresh };

            let Some(next) = choose(rng, options) else {
                break;
            };
            motif.push(next);
            prev = next;
        }

        self.last_note = Some(prev);
        motif
    }

    /// Fills the phrase queue with up to sixteen notes that open and close on
    /// the tonic. Leaves the queue empty when no chord pool can be built.
    pub fn generate_melodic_phrase<R: RandomSource>(
        &mut self,
        ctx: &PhraseContext<'_>,
        rng: &mut R,
    ) {
        let Some(tonic) = ctx.tonic() else {
            return;
        };
        if self.chord_pool.is_empty() {
            self.rebuild_chord_pool(ctx);
        }
        if self.chord_pool.is_empty() {
            return;
        }

        self.last_note = Some(tonic);
        let mut phrase = Vec::with_capacity(CHORD_BLOCKS * MOTIF_LENGTH);
        for _ in 0..CHORD_BLOCKS {
            let chord = self.chord_pool[self.chord_cursor].clone();
            phrase.extend(self.generate_motif(&chord, MOTIF_LENGTH, ctx, rng));
            self.chord_cursor = (self.chord_cursor + 1) % self.chord_pool.len();
        }

        if let Some(first) = phrase.first_mut() {
            *first = tonic;
        }
        if let Some(last) = phrase.last_mut() {
            *last = tonic;
        }
        // Anchoring and lone passing tones can repeat a note back-to-back.
        phrase.dedup();

        log::trace!("generated phrase {:?}", phrase);
        self.phrase_queue = phrase.into();
    }

    /// Next random-mode target. Always a member of `ctx.active_notes`, and
    /// different from `current` whenever more than one note is active.
    /// `None` only for an empty active set.
    pub fn next_random_note<R: RandomSource>(
        &mut self,
        current: Option<MidiNote>,
        ctx: &PhraseContext<'_>,
        rng: &mut R,
    ) -> Option<MidiNote> {
        if ctx.active_notes.is_empty() {
            return None;
        }
        if let Some(current) = current {
            if !ctx.is_active(current) {
                self.reset();
            }
        }

        if self.phrase_queue.is_empty() {
            self.generate_melodic_phrase(ctx, rng);
        }

        let varied = ctx.active_notes.len() > 1;
        if varied {
            while let Some(&head) = self.phrase_queue.front() {
                if Some(head) != current {
                    break;
                }
                self.phrase_queue.pop_front();
            }
        }

        let next = match self.phrase_queue.pop_front() {
            Some(next) => next,
            None => loop {
                let candidate = choose(rng, ctx.active_notes)?;
                if !varied || Some(candidate) != current {
                    break candidate;
                }
            },
        };
        self.last_note = Some(next);
        Some(next)
    }

    /// Notes the current phrase will hand out after `current`, without
    /// consuming them. Stops at the end of the phrase.
    pub fn upcoming(&self, current: MidiNote, count: usize) -> Vec<MidiNote> {
        self.phrase_queue
            .iter()
            .copied()
            .skip_while(|note| *note == current)
            .take(count)
            .collect()
    }
}
