use notedrill_core::Event;
use notedrill_domain_eval::{NoteOutcome, PracticePhase, PracticeSnapshot};
use notedrill_domain_theory::note_name;
use notedrill_ports::types::MidiNote;

/// One terminal line per event worth showing, `None` for the rest.
pub fn describe(event: &Event) -> Option<String> {
    match event {
        Event::MidiInputsUpdated { devices } if devices.is_empty() => {
            Some("no midi inputs found".to_string())
        }
        Event::MidiInputsUpdated { devices } => Some(
            devices
                .iter()
                .map(|device| format!("  {}  ({})", device.id, device.name))
                .collect::<Vec<_>>()
                .join("\n"),
        ),
        Event::NoteJudged { outcome } => Some(describe_outcome(outcome)),
        Event::SongCompleted { title } => Some(format!("*** '{title}' complete, again from the top")),
        Event::UpcomingTargets { notes } => describe_upcoming(notes),
        Event::SnapshotUpdated { .. } | Event::RecentInputEvents { .. } => None,
    }
}

pub fn describe_snapshot(snapshot: &PracticeSnapshot) -> String {
    let mode = match snapshot.current_song_index {
        Some(_) => format!(
            "song '{}' ({}/{})",
            snapshot.current_song_title,
            snapshot.song_progress_index + 1,
            snapshot.song_queue_length
        ),
        None => format!("random over {}", names(&snapshot.active_notes)),
    };
    let phase = match snapshot.phase {
        PracticePhase::Practice => String::new(),
        PracticePhase::Penalty => format!(", drill {} left", snapshot.penalty_hits),
    };
    format!(
        "{mode}, scale {}, streak {}{phase}",
        snapshot.scale_preset, snapshot.current_streak
    )
}

fn describe_outcome(outcome: &NoteOutcome) -> String {
    match outcome {
        NoteOutcome::Miss {
            played,
            target,
            penalty_remaining,
            ..
        } => format!(
            "miss: {} is not {}, play it {} more times",
            note_name(*played),
            note_name(*target),
            penalty_remaining
        ),
        NoteOutcome::Hit {
            streak,
            penalty_remaining: 0,
            ..
        } => format!("hit  streak {streak}"),
        NoteOutcome::Hit {
            penalty_remaining, ..
        } => format!("hit  {penalty_remaining} to go"),
    }
}

fn describe_upcoming(notes: &[MidiNote]) -> Option<String> {
    let (target, rest) = notes.split_first()?;
    if rest.is_empty() {
        return Some(format!("play {}", note_name(*target)));
    }
    Some(format!("play {}    then {}", note_name(*target), names(rest)))
}

fn names(notes: &[MidiNote]) -> String {
    notes
        .iter()
        .map(|&note| note_name(note))
        .collect::<Vec<_>>()
        .join(" ")
}
