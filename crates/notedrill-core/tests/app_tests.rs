use notedrill_core::{AppCore, AppError, Command, CoreOptions, Event, NOTE_BATCH_SIZE};
use notedrill_domain_eval::{NoteOutcome, PracticeError, PracticeMode};
use notedrill_domain_theory::Song;
use notedrill_ports::midi::{
    MidiError, MidiInputPort, MidiInputStream, MidiLikeEvent, PlayerEvent, PlayerEventCallback,
};
use notedrill_ports::storage::{SettingsDto, StorageError, StoragePort};
use notedrill_ports::types::{DeviceId, MidiInputDevice};
use parking_lot::Mutex;
use pretty_assertions::assert_eq;
use std::sync::Arc;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

#[derive(Clone, Default)]
struct FakeMidiPort {
    callback: Arc<Mutex<Option<PlayerEventCallback>>>,
}

impl FakeMidiPort {
    fn press(&self, note: u8) {
        let callback = self.callback.lock().clone().expect("input opened");
        callback(PlayerEvent {
            at: Instant::now(),
            event: MidiLikeEvent::NoteOn { note, velocity: 90 },
        });
    }

    fn release(&self, note: u8) {
        let callback = self.callback.lock().clone().expect("input opened");
        callback(PlayerEvent {
            at: Instant::now(),
            event: MidiLikeEvent::NoteOff { note },
        });
    }
}

struct FakeStream;

impl MidiInputStream for FakeStream {
    fn close(self: Box<Self>) {}
}

impl MidiInputPort for FakeMidiPort {
    fn list_inputs(&self) -> Result<Vec<MidiInputDevice>, MidiError> {
        Ok(vec![MidiInputDevice {
            id: DeviceId("fake:0".to_string()),
            name: "Fake Keys".to_string(),
            is_available: true,
        }])
    }

    fn open_input(
        &self,
        device_id: &DeviceId,
        cb: PlayerEventCallback,
    ) -> Result<Box<dyn MidiInputStream>, MidiError> {
        if device_id.0 != "fake:0" {
            return Err(MidiError::DeviceNotFound(device_id.to_string()));
        }
        *self.callback.lock() = Some(cb);
        Ok(Box::new(FakeStream))
    }
}

#[derive(Clone, Default)]
struct MemoryStorage {
    saved: Arc<Mutex<Option<SettingsDto>>>,
}

impl StoragePort for MemoryStorage {
    fn load_settings(&self) -> Result<SettingsDto, StorageError> {
        Ok(self.saved.lock().clone().unwrap_or_default())
    }

    fn save_settings(&self, s: &SettingsDto) -> Result<(), StorageError> {
        *self.saved.lock() = Some(s.clone());
        Ok(())
    }
}

fn options(seed: u64) -> CoreOptions {
    CoreOptions {
        songs: vec![Song::new("Two Notes", "C4/q, D4/h")],
        seed: Some(seed),
        ..CoreOptions::default()
    }
}

fn core_with(port: &FakeMidiPort, storage: &MemoryStorage, seed: u64) -> AppCore {
    AppCore::new(
        Box::new(port.clone()),
        Some(Box::new(storage.clone())),
        options(seed),
    )
    .expect("core")
}

fn judged(events: &[Event]) -> Vec<NoteOutcome> {
    events
        .iter()
        .filter_map(|event| match event {
            Event::NoteJudged { outcome } => Some(outcome.clone()),
            _ => None,
        })
        .collect()
}

#[test]
fn device_notes_are_judged_on_tick() {
    let port = FakeMidiPort::default();
    let storage = MemoryStorage::default();
    let mut core = core_with(&port, &storage, 4);
    core.handle_command(Command::SelectMidiInput {
        device_id: DeviceId("fake:0".to_string()),
    })
    .expect("open input");

    let target = core.session().target_note();
    port.press(target);
    port.release(target);
    assert!(judged(&core.drain_events()).is_empty());

    core.tick();
    let outcomes = judged(&core.drain_events());
    assert_eq!(outcomes.len(), 1);
    assert!(outcomes[0].is_hit());
    assert_eq!(
        storage.saved.lock().clone().and_then(|s| s.selected_midi_in),
        Some(DeviceId("fake:0".to_string()))
    );
}

#[test]
fn unknown_device_is_reported() {
    let port = FakeMidiPort::default();
    let mut core = core_with(&port, &MemoryStorage::default(), 1);
    let result = core.handle_command(Command::SelectMidiInput {
        device_id: DeviceId("missing".to_string()),
    });
    assert!(matches!(result, Err(AppError::Midi(MidiError::DeviceNotFound(_)))));
}

#[test]
fn song_completion_is_announced() {
    let port = FakeMidiPort::default();
    let storage = MemoryStorage::default();
    let mut core = core_with(&port, &storage, 2);
    core.handle_command(Command::SetModeSong { index: 0 })
        .expect("song");
    core.handle_command(Command::PlayNote { note: 60 }).expect("play");
    core.handle_command(Command::PlayNote { note: 62 }).expect("play");

    let events = core.drain_events();
    assert!(events.contains(&Event::SongCompleted {
        title: "Two Notes".to_string()
    }));
    assert_eq!(core.session().snapshot().song_progress_index, 0);
    assert_eq!(
        storage.saved.lock().clone().and_then(|s| s.last_song_index),
        Some(0)
    );
}

#[test]
fn every_change_publishes_snapshot_and_preview() {
    let port = FakeMidiPort::default();
    let mut core = core_with(&port, &MemoryStorage::default(), 3);
    core.handle_command(Command::SetModeSong { index: 0 })
        .expect("song");

    let events = core.drain_events();
    let Some(Event::SnapshotUpdated { snapshot }) = events.first() else {
        panic!("expected snapshot first, got {events:?}");
    };
    assert_eq!(snapshot.mode, PracticeMode::Song);
    assert_eq!(
        events.get(1),
        Some(&Event::UpcomingTargets {
            notes: [60, 62].iter().copied().cycle().take(NOTE_BATCH_SIZE).collect()
        })
    );
}

#[test]
fn rejected_commands_surface_practice_errors() {
    let port = FakeMidiPort::default();
    let mut core = core_with(&port, &MemoryStorage::default(), 5);
    let before = core.session().snapshot();

    let result = core.handle_command(Command::SetActiveNotes { notes: Vec::new() });
    assert!(matches!(
        result,
        Err(AppError::Practice(PracticeError::EmptyActiveNotes))
    ));
    let result = core.handle_command(Command::SetModeSong { index: 9 });
    assert!(matches!(
        result,
        Err(AppError::Practice(PracticeError::InvalidSongIndex(9)))
    ));
    assert_eq!(core.session().snapshot(), before);
}

#[test]
fn note_selection_is_persisted_and_restored() {
    let port = FakeMidiPort::default();
    let storage = MemoryStorage::default();
    let mut core = core_with(&port, &storage, 6);
    core.handle_command(Command::SetActiveNotes {
        notes: vec![64, 60, 67],
    })
    .expect("selection");

    let saved = storage.saved.lock().clone().expect("saved settings");
    assert_eq!(saved.scale_preset, "custom");
    assert_eq!(saved.active_notes, vec![60, 64, 67]);

    let restored = core_with(&port, &storage, 7);
    assert_eq!(restored.session().active_notes(), &[60, 64, 67]);

    let mut core = restored;
    core.handle_command(Command::ApplyScalePreset {
        id: "c-major".to_string(),
    })
    .expect("preset");
    let saved = storage.saved.lock().clone().expect("saved settings");
    assert_eq!(saved.scale_preset, "c-major");
}

#[test]
fn diagnostics_are_written_as_json() {
    let port = FakeMidiPort::default();
    let mut core = core_with(&port, &MemoryStorage::default(), 8);
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    let dir = std::env::temp_dir().join(format!("notedrill-diagnostics-{nanos}"));

    core.handle_command(Command::ExportDiagnostics {
        path: dir.to_string_lossy().into_owned(),
    })
    .expect("export");

    let session: serde_json::Value =
        serde_json::from_slice(&std::fs::read(dir.join("session.json")).expect("session.json"))
            .expect("json");
    assert_eq!(session["mode"], "random");
    assert!(dir.join("device_snapshot.json").exists());
    let _ = std::fs::remove_dir_all(&dir);
}
