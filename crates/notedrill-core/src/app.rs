use crate::diagnostics::export_diagnostics;
use crate::ipc::{Command, Event};
use notedrill_domain_eval::{PracticeConfig, PracticeError, PracticeSession};
use notedrill_domain_theory::{builtin_songs, Song, CUSTOM_SCALE_ID, DEFAULT_AVAILABLE_NOTES};
use notedrill_ports::midi::{MidiError, MidiInputPort, MidiInputStream, MidiLikeEvent, PlayerEvent};
use notedrill_ports::storage::{SettingsDto, StorageError, StoragePort};
use notedrill_ports::types::{DeviceId, MidiNote};
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rtrb::{Consumer, RingBuffer};
use std::collections::VecDeque;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Length of the target preview handed to renderers.
pub const NOTE_BATCH_SIZE: usize = 8;

const RECENT_INPUT_CAPACITY: usize = 20;

#[derive(thiserror::Error, Debug)]
pub enum AppError {
    #[error("midi error: {0}")]
    Midi(#[from] MidiError),
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
    #[error("practice error: {0}")]
    Practice(#[from] PracticeError),
}

/// Startup choices that are not persisted.
#[derive(Clone, Debug)]
pub struct CoreOptions {
    pub available_notes: Vec<MidiNote>,
    pub songs: Vec<Song>,
    /// Fixed seed for reproducible drills; `None` seeds from the OS.
    pub seed: Option<u64>,
}

impl Default for CoreOptions {
    fn default() -> Self {
        Self {
            available_notes: DEFAULT_AVAILABLE_NOTES.to_vec(),
            songs: builtin_songs(),
            seed: None,
        }
    }
}

pub struct AppCore {
    midi_port: Box<dyn MidiInputPort>,
    storage: Option<Box<dyn StoragePort>>,
    settings: SettingsDto,
    session: PracticeSession<StdRng>,
    midi_stream: Option<Box<dyn MidiInputStream>>,
    midi_queue_rx: Option<Consumer<PlayerEvent>>,
    events: VecDeque<Event>,
    recent_inputs: VecDeque<MidiLikeEvent>,
    last_input_emit: Instant,
}

impl AppCore {
    pub fn new(
        midi_port: Box<dyn MidiInputPort>,
        storage: Option<Box<dyn StoragePort>>,
        options: CoreOptions,
    ) -> Result<Self, AppError> {
        let settings = match storage.as_ref().map(|storage| storage.load_settings()) {
            Some(Ok(settings)) => settings,
            Some(Err(err)) => {
                log::warn!("settings not loaded, using defaults: {err}");
                SettingsDto::default()
            }
            None => SettingsDto::default(),
        };
        Self::with_settings(midi_port, storage, settings, options)
    }

    /// Like [`AppCore::new`] but with settings supplied by the caller, e.g.
    /// after command-line overrides were applied.
    pub fn with_settings(
        midi_port: Box<dyn MidiInputPort>,
        storage: Option<Box<dyn StoragePort>>,
        settings: SettingsDto,
        options: CoreOptions,
    ) -> Result<Self, AppError> {
        let rng = match options.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };

        // A saved custom selection only counts if it still overlaps the pool.
        let saved: Vec<MidiNote> = settings
            .active_notes
            .iter()
            .copied()
            .filter(|note| options.available_notes.contains(note))
            .collect();
        let custom = settings.scale_preset == CUSTOM_SCALE_ID && !saved.is_empty();
        let config = PracticeConfig {
            available_notes: options.available_notes,
            active_notes: custom.then_some(saved),
            scale_preset: settings.scale_preset.clone(),
            penalty_length: settings.penalty_length,
            songs: options.songs,
        };
        let mut session = PracticeSession::new(config, rng)?;

        if let Some(index) = settings.last_song_index {
            if let Err(err) = session.set_mode_song(index) {
                log::warn!("could not resume song {index}: {err}");
            }
        }

        Ok(Self {
            midi_port,
            storage,
            settings,
            session,
            midi_stream: None,
            midi_queue_rx: None,
            events: VecDeque::new(),
            recent_inputs: VecDeque::with_capacity(RECENT_INPUT_CAPACITY),
            last_input_emit: Instant::now(),
        })
    }

    pub fn handle_command(&mut self, cmd: Command) -> Result<(), AppError> {
        match cmd {
            Command::ListMidiInputs => {
                let devices = self.midi_port.list_inputs()?;
                self.events.push_back(Event::MidiInputsUpdated { devices });
            }
            Command::SelectMidiInput { device_id } => {
                self.open_midi_input(device_id)?;
            }
            Command::SetModeRandom => {
                self.session.set_mode_random();
                self.settings.last_song_index = None;
                self.save_settings();
                self.emit_session();
            }
            Command::SetModeSong { index } => {
                self.session.set_mode_song(index)?;
                self.settings.last_song_index = Some(index);
                self.save_settings();
                self.emit_session();
            }
            Command::SetActiveNotes { notes } => {
                self.session.set_active_notes(&notes)?;
                self.pool_changed();
            }
            Command::ApplyScalePreset { id } => {
                self.session.apply_scale_preset(&id)?;
                self.pool_changed();
            }
            Command::SelectAllNotes => {
                self.session.select_all_notes();
                self.pool_changed();
            }
            Command::ClearNotes => {
                self.session.clear_notes();
                self.pool_changed();
            }
            Command::PlayNote { note } => {
                self.judge_note(note);
            }
            Command::RequestSnapshot => {
                self.emit_session();
            }
            Command::ExportDiagnostics { path } => {
                let midi_inputs = self.midi_port.list_inputs().unwrap_or_else(|err| {
                    log::warn!("device list unavailable for diagnostics: {err}");
                    Vec::new()
                });
                export_diagnostics(
                    Path::new(&path),
                    &self.settings,
                    &self.session.snapshot(),
                    midi_inputs,
                    self.recent_inputs.iter().copied().collect(),
                )?;
            }
        }
        Ok(())
    }

    /// Drains queued device input. Call from the thread that owns the core.
    pub fn tick(&mut self) {
        self.process_midi_inputs();
        self.emit_recent_inputs();
    }

    pub fn drain_events(&mut self) -> Vec<Event> {
        self.events.drain(..).collect()
    }

    pub fn session(&self) -> &PracticeSession<StdRng> {
        &self.session
    }

    pub fn settings(&self) -> &SettingsDto {
        &self.settings
    }

    fn open_midi_input(&mut self, device_id: DeviceId) -> Result<(), AppError> {
        if let Some(stream) = self.midi_stream.take() {
            stream.close();
        }

        let (producer, consumer) = RingBuffer::new(2048);
        let producer = Arc::new(Mutex::new(producer));
        let cb = Arc::new(move |event: PlayerEvent| {
            if let Some(mut guard) = producer.try_lock() {
                let _ = guard.push(event);
            }
        });

        let stream = self.midi_port.open_input(&device_id, cb)?;
        log::info!("listening on midi input {device_id}");
        self.midi_stream = Some(stream);
        self.midi_queue_rx = Some(consumer);
        self.settings.selected_midi_in = Some(device_id);
        self.save_settings();
        Ok(())
    }

    fn process_midi_inputs(&mut self) {
        let Some(mut consumer) = self.midi_queue_rx.take() else {
            return;
        };

        let mut pending = Vec::new();
        while let Ok(event) = consumer.pop() {
            pending.push(event);
        }
        self.midi_queue_rx = Some(consumer);

        for event in pending {
            self.record_recent_input(event.event);
            if let Some(note) = event.event.struck_note() {
                self.judge_note(note);
            }
        }
    }

    fn judge_note(&mut self, note: MidiNote) {
        let outcome = self.session.record_note(note);
        let looped = outcome.song_looped();
        self.events.push_back(Event::NoteJudged { outcome });
        if looped {
            let title = self.session.snapshot().current_song_title;
            self.events.push_back(Event::SongCompleted { title });
        }
        self.emit_session();
    }

    fn pool_changed(&mut self) {
        let snapshot = self.session.snapshot();
        self.settings.scale_preset = snapshot.scale_preset;
        self.settings.active_notes = snapshot.active_notes;
        self.save_settings();
        self.emit_session();
    }

    fn record_recent_input(&mut self, event: MidiLikeEvent) {
        if self.recent_inputs.len() >= RECENT_INPUT_CAPACITY {
            self.recent_inputs.pop_front();
        }
        self.recent_inputs.push_back(event);
    }

    fn emit_recent_inputs(&mut self) {
        if self.last_input_emit.elapsed() < Duration::from_millis(50) {
            return;
        }
        if !self.recent_inputs.is_empty() {
            self.events.push_back(Event::RecentInputEvents {
                events: self.recent_inputs.iter().copied().collect(),
            });
        }
        self.last_input_emit = Instant::now();
    }

    fn emit_session(&mut self) {
        self.events.push_back(Event::SnapshotUpdated {
            snapshot: self.session.snapshot(),
        });
        self.events.push_back(Event::UpcomingTargets {
            notes: self.session.upcoming_targets(NOTE_BATCH_SIZE),
        });
    }

    fn save_settings(&self) {
        if let Some(storage) = self.storage.as_ref() {
            if let Err(err) = storage.save_settings(&self.settings) {
                log::warn!("settings not saved: {err}");
            }
        }
    }
}
