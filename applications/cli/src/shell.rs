//! Line-oriented command shell
//!
//! Each input line is one command. Playlist edits go to the controller,
//! `finish`, `tick` and `fail` poke the simulated engine so transitions can
//! be driven by hand.

use crate::catalog::Catalog;
use anyhow::Result;
use cadence_playlist::{
    ControllerHandle, MemoryEngine, PlayerEvent, RepeatMode, ShuffleMode, Track, TrackId,
};
use std::io::{BufRead, Write};

const HELP: &str = "\
Playlist:  list | load [start] | play [index] | insert <id>.. | append <id>..
           remove <index> | drop <id>.. | move <from> <to> | clear
Transport: pause | next | prev | seek <ms> | repeat off|all|one
           shuffle off|random|smart
Engine:    finish | tick <ms> | fail <message>
Other:     status | catalog | help | quit";

// ===== Parsing =====

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellCommand {
    List,
    Load(usize),
    Play(Option<usize>),
    Insert(Vec<String>),
    Append(Vec<String>),
    Remove(usize),
    Drop(Vec<String>),
    Move(usize, usize),
    Clear,
    Pause,
    Next,
    Previous,
    Seek(u64),
    Repeat(RepeatMode),
    Shuffle(ShuffleMode),
    Finish,
    Tick(u64),
    Fail(String),
    Status,
    Catalog,
    Help,
    Quit,
}

pub fn parse_line(line: &str) -> std::result::Result<Option<ShellCommand>, String> {
    let mut words = line.split_whitespace();
    let Some(verb) = words.next() else {
        return Ok(None);
    };
    let args: Vec<&str> = words.collect();

    let command = match verb {
        "list" | "ls" => ShellCommand::List,
        "load" => ShellCommand::Load(optional_number(&args)?.unwrap_or(0)),
        "play" => ShellCommand::Play(optional_number(&args)?),
        "insert" => ShellCommand::Insert(ids(&args)?),
        "append" | "add" => ShellCommand::Append(ids(&args)?),
        "remove" | "rm" => ShellCommand::Remove(number(&args, 0)?),
        "drop" => ShellCommand::Drop(ids(&args)?),
        "move" | "mv" => ShellCommand::Move(number(&args, 0)?, number(&args, 1)?),
        "clear" => ShellCommand::Clear,
        "pause" => ShellCommand::Pause,
        "next" | "n" => ShellCommand::Next,
        "prev" | "p" => ShellCommand::Previous,
        "seek" => ShellCommand::Seek(number(&args, 0)?),
        "repeat" => ShellCommand::Repeat(match args.first().copied() {
            Some("off") => RepeatMode::Off,
            Some("all") => RepeatMode::All,
            Some("one") => RepeatMode::One,
            _ => return Err("usage: repeat off|all|one".to_string()),
        }),
        "shuffle" => ShellCommand::Shuffle(match args.first().copied() {
            Some("off") => ShuffleMode::Off,
            Some("random") => ShuffleMode::Random,
            Some("smart") => ShuffleMode::Smart,
            _ => return Err("usage: shuffle off|random|smart".to_string()),
        }),
        "finish" => ShellCommand::Finish,
        "tick" => ShellCommand::Tick(number(&args, 0)?),
        "fail" => ShellCommand::Fail(args.join(" ")),
        "status" => ShellCommand::Status,
        "catalog" => ShellCommand::Catalog,
        "help" | "?" => ShellCommand::Help,
        "quit" | "exit" | "q" => ShellCommand::Quit,
        other => return Err(format!("unknown command '{}', try 'help'", other)),
    };
    Ok(Some(command))
}

fn number<T: std::str::FromStr>(args: &[&str], position: usize) -> std::result::Result<T, String> {
    let raw = args
        .get(position)
        .ok_or_else(|| format!("missing argument {}", position + 1))?;
    raw.parse()
        .map_err(|_| format!("'{}' is not a valid number", raw))
}

fn optional_number(args: &[&str]) -> std::result::Result<Option<usize>, String> {
    if args.is_empty() {
        Ok(None)
    } else {
        number(args, 0).map(Some)
    }
}

fn ids(args: &[&str]) -> std::result::Result<Vec<String>, String> {
    if args.is_empty() {
        return Err("expected at least one track id".to_string());
    }
    Ok(args.iter().map(|s| (*s).to_string()).collect())
}

// ===== Execution =====

pub struct Shell {
    controller: ControllerHandle,
    engine: MemoryEngine,
    catalog: Catalog,
}

impl Shell {
    pub fn new(controller: ControllerHandle, engine: MemoryEngine, catalog: Catalog) -> Self {
        Self {
            controller,
            engine,
            catalog,
        }
    }

    /// Read commands until `quit` or end of input
    pub fn run(&self, input: impl BufRead, mut output: impl Write) -> Result<()> {
        writeln!(output, "{}", HELP)?;
        for line in input.lines() {
            let line = line?;
            match parse_line(&line) {
                Ok(None) => {}
                Ok(Some(ShellCommand::Quit)) => break,
                Ok(Some(command)) => self.execute(command, &mut output)?,
                Err(message) => writeln!(output, "error: {}", message)?,
            }
        }
        Ok(())
    }

    pub fn execute(&self, command: ShellCommand, output: &mut impl Write) -> Result<()> {
        match command {
            ShellCommand::List => {
                self.controller.wait_idle()?;
                self.print_playlist(output)?;
            }
            ShellCommand::Load(start) => {
                self.controller
                    .set_playlist(self.catalog.tracks().to_vec(), start)?;
            }
            ShellCommand::Play(Some(index)) => self.controller.play_at(index)?,
            ShellCommand::Play(None) => self.controller.play()?,
            ShellCommand::Insert(ids) => {
                let tracks = self.lookup(&ids, output)?;
                self.controller.insert_next(tracks)?;
            }
            ShellCommand::Append(ids) => {
                let tracks = self.lookup(&ids, output)?;
                self.controller.append(tracks)?;
            }
            ShellCommand::Remove(index) => self.controller.remove_at(index)?,
            ShellCommand::Drop(ids) => {
                self.controller
                    .remove_by_ids(ids.into_iter().map(TrackId::new).collect())?;
            }
            ShellCommand::Move(from, to) => self.controller.reorder(from, to)?,
            ShellCommand::Clear => self.controller.clear()?,
            ShellCommand::Pause => self.controller.pause()?,
            ShellCommand::Next => self.controller.next()?,
            ShellCommand::Previous => self.controller.previous()?,
            ShellCommand::Seek(position_ms) => self.controller.seek(position_ms)?,
            ShellCommand::Repeat(mode) => self.controller.set_repeat(mode)?,
            ShellCommand::Shuffle(mode) => self.controller.set_shuffle(mode)?,
            ShellCommand::Finish => {
                self.controller.wait_idle()?;
                self.engine.finish_current();
            }
            ShellCommand::Tick(position_ms) => {
                self.controller.wait_idle()?;
                self.engine.tick(position_ms);
            }
            ShellCommand::Fail(message) => {
                self.controller.wait_idle()?;
                self.engine.fail(message);
            }
            ShellCommand::Status => {
                self.controller.wait_idle()?;
                let state = self.controller.state()?;
                let position = self.controller.get_position_ms()?;
                match self.controller.get_current_track()? {
                    Some(track) => writeln!(
                        output,
                        "{} - {} at {} ms ({:?}, engine {:?})",
                        track.artist, track.title, position, state, self.engine.state()
                    )?,
                    None => writeln!(output, "nothing queued ({:?})", state)?,
                }
            }
            ShellCommand::Catalog => {
                for track in self.catalog.tracks() {
                    writeln!(output, "{:>4}  {} - {}", track.id, track.artist, track.title)?;
                }
            }
            ShellCommand::Help => writeln!(output, "{}", HELP)?,
            ShellCommand::Quit => {}
        }
        Ok(())
    }

    fn lookup(&self, ids: &[String], output: &mut impl Write) -> Result<Vec<Track>> {
        let mut tracks = Vec::with_capacity(ids.len());
        for id in ids {
            match self.catalog.get(id) {
                Some(track) => tracks.push(track.clone()),
                None => writeln!(output, "unknown track id '{}'", id)?,
            }
        }
        Ok(tracks)
    }

    fn print_playlist(&self, output: &mut impl Write) -> Result<()> {
        let items = self.controller.get_full_playlist()?;
        let current = self.controller.get_current_index()?;
        let window = self.controller.window()?;

        if items.is_empty() {
            writeln!(output, "(empty)")?;
            return Ok(());
        }
        for (index, track) in items.iter().enumerate() {
            let marker = if Some(index) == current { '>' } else { ' ' };
            let loaded = if window.is_some_and(|w| w.contains(index)) { '*' } else { ' ' };
            writeln!(
                output,
                "{}{} {:>3}  {:<5} {} - {}",
                marker, loaded, index, track.id, track.artist, track.title
            )?;
        }
        Ok(())
    }
}

/// One printed line per player event, position ticks excluded
pub fn describe_event(event: &PlayerEvent) -> Option<String> {
    let line = match event {
        PlayerEvent::SongChanged(track) => {
            format!("now playing {} - {}", track.artist, track.title)
        }
        PlayerEvent::PlaybackStopped => "playback stopped".to_string(),
        PlayerEvent::PlaylistEmpty => "playlist empty".to_string(),
        PlayerEvent::QueueChanged { length } => format!("queue now {} tracks", length),
        PlayerEvent::StateChanged(state) => format!("engine {:?}", state),
        PlayerEvent::Error { message } => format!("error: {}", message),
        PlayerEvent::RepeatModeChanged(mode) => format!("repeat {:?}", mode),
        PlayerEvent::ShuffleModeChanged(mode) => format!("shuffle {:?}", mode),
        PlayerEvent::PositionChanged { .. }
        | PlayerEvent::ProgressInitialized { .. }
        | PlayerEvent::Transition(_) => return None,
    };
    Some(line)
}
