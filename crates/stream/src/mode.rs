use std::fmt;
use std::str::FromStr;

/// Access mode of an open handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpenMode {
    /// Existing file, reads only.
    Read,
    /// Truncates an existing file or creates a new one.
    Write,
    /// Existing file (created if absent), reads and writes, no truncation.
    ReadWrite,
    /// Like `ReadWrite`, positioned at the end of the file on open.
    Append,
}

/// A mode string that the parser could not accept.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ModeParseError {
    #[error("empty open mode")]
    Empty,
    #[error("invalid open mode {mode:?}: unexpected '{found}'")]
    Unexpected { mode: String, found: char },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Start,
    Mode(OpenMode),
}

use OpenMode::{Append, Read, ReadWrite, Write};
use State::{Mode, Start};

/// `(state, symbol) -> next state`. Pairs not listed are rejected.
const TRANSITIONS: &[(State, char, State)] = &[
    (Start, 'r', Mode(Read)),
    (Mode(Write), 'r', Mode(ReadWrite)),
    (Start, 'w', Mode(Write)),
    (Mode(Read), 'w', Mode(ReadWrite)),
    (Mode(ReadWrite), 'w', Mode(ReadWrite)),
    (Mode(Read), '+', Mode(ReadWrite)),
    (Mode(Write), '+', Mode(ReadWrite)),
    (Start, 'a', Mode(Append)),
    (Mode(Read), 'a', Mode(Append)),
    (Mode(Write), 'a', Mode(Append)),
    (Mode(ReadWrite), 'a', Mode(Append)),
    (Mode(Append), 'a', Mode(Append)),
    (Mode(Read), 'b', Mode(Read)),
    (Mode(Write), 'b', Mode(Write)),
    (Mode(ReadWrite), 'b', Mode(ReadWrite)),
    (Mode(Append), 'b', Mode(Append)),
];

fn step(state: State, symbol: char) -> Option<State> {
    TRANSITIONS
        .iter()
        .find(|(from, sym, _)| *from == state && *sym == symbol)
        .map(|(_, _, to)| *to)
}

impl OpenMode {
    /// Parses an fopen-style mode string (`r`, `w`, `a`, `r+`, `w+`, `rb`, ...).
    /// Letters are case-insensitive.
    pub fn parse(mode: &str) -> Result<Self, ModeParseError> {
        let mut state = Start;
        for symbol in mode.chars().map(|c| c.to_ascii_lowercase()) {
            state = step(state, symbol).ok_or_else(|| ModeParseError::Unexpected {
                mode: mode.to_string(),
                found: symbol,
            })?;
        }
        match state {
            Mode(parsed) => Ok(parsed),
            Start => Err(ModeParseError::Empty),
        }
    }

    pub fn is_writable(self) -> bool {
        !matches!(self, Read)
    }

    /// Whether opening in this mode discards existing content.
    pub fn truncates(self) -> bool {
        matches!(self, Write)
    }
}

impl FromStr for OpenMode {
    type Err = ModeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for OpenMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Read => "r",
            Write => "w",
            ReadWrite => "r+",
            Append => "a",
        })
    }
}
