//! Commands read line by line from stdin.

use thiserror::Error;

use crate::{
    controls::{ControlKind, Controls},
    playlist::{library_id_field, PlaylistItem},
};

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Press(ControlKind),
    Volume(i64),
    Mute,
    Unmute,
    ToggleMute,
    /// Play the playlist entry at this index
    GoTo(usize),
    Clear,
    /// Append a library item (`add song 12`) or a file (`add /music/a.flac`)
    Add(PlaylistItem),
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum CommandError {
    #[error("Unknown command {0:?}")]
    Unknown(String),
    #[error("{command} expects {expected}, got {got:?}")]
    BadArgument {
        command: &'static str,
        expected: &'static str,
        got: String,
    },
}

impl Command {
    /// Parse one line. Control words bound in `controls` win over the
    /// built-in commands. Blank lines yield `Ok(None)`.
    ///
    /// # Errors
    ///
    /// Returns an error for unknown words and malformed arguments.
    pub fn parse(line: &str, controls: &Controls) -> Result<Option<Self>, CommandError> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(None);
        }
        if let Some(control) = controls.find(line) {
            return Ok(Some(Self::Press(control)));
        }

        let (word, arg) = line
            .split_once(char::is_whitespace)
            .map_or((line, ""), |(w, a)| (w, a.trim()));
        let command = match (word, arg) {
            ("volume", arg) => Self::Volume(parse_arg("volume", "a number", arg)?),
            ("goto", arg) => Self::GoTo(parse_arg("goto", "a playlist index", arg)?),
            ("mute", "") => Self::Mute,
            ("unmute", "") => Self::Unmute,
            ("toggle-mute", "") => Self::ToggleMute,
            ("clear", "") => Self::Clear,
            ("add", arg) => Self::Add(parse_item(arg)?),
            _ => return Err(CommandError::Unknown(line.to_owned())),
        };
        Ok(Some(command))
    }
}

fn parse_item(arg: &str) -> Result<PlaylistItem, CommandError> {
    if arg.is_empty() {
        return Err(CommandError::BadArgument {
            command: "add",
            expected: "a file or a library item",
            got: String::new(),
        });
    }
    match arg.split_once(char::is_whitespace) {
        Some((kind, id)) if library_id_field(kind).is_some() => Ok(PlaylistItem::library(
            kind,
            parse_arg("add", "a library id", id.trim())?,
        )),
        _ => Ok(PlaylistItem::file(arg)),
    }
}

fn parse_arg<T: std::str::FromStr>(
    command: &'static str,
    expected: &'static str,
    arg: &str,
) -> Result<T, CommandError> {
    arg.parse().map_err(|_| CommandError::BadArgument {
        command,
        expected,
        got: arg.to_owned(),
    })
}
