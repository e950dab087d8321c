mod display;
mod input;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use input::{parse_line, LineInput, HELP};
use notedrill_core::{AppCore, Command, CoreOptions};
use notedrill_domain_theory::{builtin_songs, find_scale_preset, scale_presets, CUSTOM_SCALE_ID};
use notedrill_infra_midi_midir::MidirMidiInputPort;
use notedrill_infra_storage_fs::FsStorage;
use notedrill_ports::midi::MidiInputPort;
use notedrill_ports::storage::{SettingsDto, StoragePort};
use notedrill_ports::types::DeviceId;
use parking_lot::Mutex;
use std::io::{self, BufRead};
use std::sync::Arc;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "notedrill")]
#[command(author, version, about = "Note-reading drill for a MIDI keyboard", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List MIDI input devices
    ListInputs,
    /// List the built-in songs
    Songs,
    /// List the scale presets
    Scales,
    /// Start a drill session
    Play(PlayArgs),
}

#[derive(Args)]
struct PlayArgs {
    /// MIDI input id as printed by `list-inputs` (default: last used, else first found)
    #[arg(short, long)]
    device: Option<String>,

    /// Drill a built-in song instead of random targets
    #[arg(long)]
    song: Option<usize>,

    /// Scale preset id
    #[arg(long)]
    scale: Option<String>,

    /// Seed for a reproducible random drill
    #[arg(long)]
    seed: Option<u64>,

    /// Correct repeats required after a miss
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    penalty: Option<u32>,

    /// Only take notes typed on stdin, without opening a MIDI input
    #[arg(long)]
    stdin: bool,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    match cli.command {
        Commands::ListInputs => list_inputs(),
        Commands::Songs => {
            for (index, song) in builtin_songs().iter().enumerate() {
                println!(
                    "{index:>3}  {}  ({} notes)",
                    song.title,
                    song.midi_sequence().len()
                );
            }
            Ok(())
        }
        Commands::Scales => {
            for preset in scale_presets() {
                println!("{:<18}{:<26}{}", preset.id, preset.name, preset.notes().join(" "));
            }
            Ok(())
        }
        Commands::Play(args) => play(args),
    }
}

fn list_inputs() -> Result<()> {
    let devices = MidirMidiInputPort::default().list_inputs()?;
    if devices.is_empty() {
        println!("No MIDI inputs found");
    }
    for device in devices {
        println!("{}  ({})", device.id, device.name);
    }
    Ok(())
}

fn play(args: PlayArgs) -> Result<()> {
    let storage = FsStorage::default();
    let mut settings = storage.load_settings().unwrap_or_else(|err| {
        log::warn!("settings unreadable, using defaults: {err}");
        SettingsDto::default()
    });

    if let Some(scale) = args.scale {
        if scale != CUSTOM_SCALE_ID && find_scale_preset(&scale).is_none() {
            bail!("unknown scale '{scale}', see `notedrill scales`");
        }
        settings.scale_preset = scale;
    }
    if let Some(penalty) = args.penalty {
        settings.penalty_length = penalty;
    }
    let saved_device = settings.selected_midi_in.clone();

    let options = CoreOptions {
        seed: args.seed,
        ..CoreOptions::default()
    };
    let mut core = AppCore::with_settings(
        Box::new(MidirMidiInputPort::default()),
        Some(Box::new(storage)),
        settings,
        options,
    )?;

    if let Some(index) = args.song {
        core.handle_command(Command::SetModeSong { index })
            .with_context(|| format!("cannot drill song {index}, see `notedrill songs`"))?;
    }
    if !args.stdin {
        connect_input(&mut core, args.device.map(DeviceId), saved_device)?;
    }

    println!("{}", display::describe_snapshot(&core.session().snapshot()));
    println!("type :help for commands");
    core.handle_command(Command::RequestSnapshot)?;

    let core = Arc::new(Mutex::new(core));
    let ticker = core.clone();
    std::thread::spawn(move || loop {
        let events = {
            let mut core = ticker.lock();
            core.tick();
            core.drain_events()
        };

        for event in events {
            if let Some(line) = display::describe(&event) {
                println!("{line}");
            }
        }

        std::thread::sleep(Duration::from_millis(16));
    });

    for line in io::stdin().lock().lines() {
        let command = match parse_line(&line?) {
            Ok(LineInput::Quit) => break,
            Ok(input) => input,
            Err(message) => {
                eprintln!("{message}");
                continue;
            }
        };
        if let Err(err) = run_line(&core, command) {
            eprintln!("{err}");
        }
    }

    let snapshot = core.lock().session().snapshot();
    println!("bye, streak {}", snapshot.current_streak);
    Ok(())
}

/// An explicit device must open. A remembered or discovered one may fail, in
/// which case the drill goes on with typed notes.
fn connect_input(
    core: &mut AppCore,
    requested: Option<DeviceId>,
    saved: Option<DeviceId>,
) -> Result<()> {
    if let Some(device_id) = requested {
        core.handle_command(Command::SelectMidiInput {
            device_id: device_id.clone(),
        })
        .with_context(|| format!("cannot open midi input {device_id}"))?;
        return Ok(());
    }

    let discovered = MidirMidiInputPort::default()
        .list_inputs()
        .unwrap_or_else(|err| {
            log::warn!("cannot list midi inputs: {err}");
            Vec::new()
        });
    let candidate = saved
        .filter(|id| discovered.iter().any(|device| &device.id == id))
        .or_else(|| discovered.first().map(|device| device.id.clone()));

    match candidate {
        Some(device_id) => {
            if let Err(err) = core.handle_command(Command::SelectMidiInput { device_id }) {
                log::warn!("{err}, type notes instead");
            }
        }
        None => log::warn!("no midi input found, type notes instead"),
    }
    Ok(())
}

fn run_line(core: &Mutex<AppCore>, input: LineInput) -> Result<()> {
    let mut core = core.lock();
    match input {
        LineInput::Notes(notes) => {
            for note in notes {
                core.handle_command(Command::PlayNote { note })?;
            }
        }
        LineInput::Random => core.handle_command(Command::SetModeRandom)?,
        LineInput::Song(index) => core.handle_command(Command::SetModeSong { index })?,
        LineInput::Scale(id) => core.handle_command(Command::ApplyScalePreset { id })?,
        LineInput::SelectNotes(notes) => core.handle_command(Command::SetActiveNotes { notes })?,
        LineInput::AllNotes => core.handle_command(Command::SelectAllNotes)?,
        LineInput::ClearNotes => core.handle_command(Command::ClearNotes)?,
        LineInput::Inputs => core.handle_command(Command::ListMidiInputs)?,
        LineInput::Diagnostics(path) => {
            core.handle_command(Command::ExportDiagnostics { path: path.clone() })?;
            println!("diagnostics written to {path}");
        }
        LineInput::Status => {
            println!("{}", display::describe_snapshot(&core.session().snapshot()));
        }
        LineInput::Help => println!("{HELP}"),
        LineInput::Empty | LineInput::Quit => {}
    }
    Ok(())
}
