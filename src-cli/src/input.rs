use notedrill_domain_theory::parse_note_to_midi;
use notedrill_ports::types::MidiNote;

/// What a line typed at the drill prompt asks for.
#[derive(Debug, PartialEq, Eq)]
pub enum LineInput {
    Notes(Vec<MidiNote>),
    Random,
    Song(usize),
    Scale(String),
    SelectNotes(Vec<MidiNote>),
    AllNotes,
    ClearNotes,
    Status,
    Inputs,
    Diagnostics(String),
    Help,
    Quit,
    Empty,
}

pub const HELP: &str = "\
type note names (C4, F#3, Bb4) to play them, or
  :random           random melodic targets
  :song N           drill song N (see `notedrill songs`)
  :scale ID         switch scale preset (see `notedrill scales`)
  :notes C4 E4 G4   drill exactly these notes
  :all | :clear     every note / only the lowest
  :status           show the session
  :inputs           list midi inputs
  :diag DIR         write diagnostics to DIR
  :quit";

pub fn parse_line(line: &str) -> Result<LineInput, String> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(LineInput::Empty);
    }
    if matches!(line, "q" | "quit" | ":q" | ":quit") {
        return Ok(LineInput::Quit);
    }

    let Some(command) = line.strip_prefix(':') else {
        return parse_notes(line).map(LineInput::Notes);
    };
    let (name, rest) = command
        .split_once(char::is_whitespace)
        .map(|(name, rest)| (name, rest.trim()))
        .unwrap_or((command, ""));

    match name {
        "random" => Ok(LineInput::Random),
        "song" => rest
            .parse()
            .map(LineInput::Song)
            .map_err(|_| format!("not a song number: '{rest}'")),
        "scale" if !rest.is_empty() => Ok(LineInput::Scale(rest.to_string())),
        "notes" => parse_notes(rest).map(LineInput::SelectNotes),
        "all" => Ok(LineInput::AllNotes),
        "clear" => Ok(LineInput::ClearNotes),
        "status" => Ok(LineInput::Status),
        "inputs" => Ok(LineInput::Inputs),
        "diag" if !rest.is_empty() => Ok(LineInput::Diagnostics(rest.to_string())),
        "help" | "h" | "?" => Ok(LineInput::Help),
        _ => Err(format!("unknown command ':{name}', try :help")),
    }
}

/// Unlike song notation, a typo here is rejected rather than read as C4.
fn parse_notes(text: &str) -> Result<Vec<MidiNote>, String> {
    let notes = text
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|token| !token.is_empty())
        .map(|token| match parse_note_to_midi(&capitalize(token)) {
            parsed if parsed.is_defaulted() => Err(format!("not a note: '{token}'")),
            parsed => Ok(parsed.midi()),
        })
        .collect::<Result<Vec<_>, _>>()?;
    if notes.is_empty() {
        return Err("no notes given".to_string());
    }
    Ok(notes)
}

/// Note letters are uppercase in notation; accept `c4` at the prompt.
fn capitalize(token: &str) -> String {
    let mut chars = token.chars();
    chars
        .next()
        .map(|first| first.to_ascii_uppercase())
        .into_iter()
        .chain(chars)
        .collect()
}
