//! Command recognition.
//!
//! A line is matched in a fixed order: the exact-command table first, then
//! the argument-carrying matchers in the order they appear in
//! [`Dispatcher::new`]. The first matcher that applies wins.

use regex::Regex;

use crate::error::{SimError, SimResult};

/// Zero-argument commands, recognized by exact (lower-case) text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExactCommand {
    Exit,
    Identify,
    SampleDump,
    QueryPreamble,
    PreambleOn,
    PreambleOff,
    QueryAcquirePoints,
    QueryAcquireCount,
    QueryAverage,
    AverageOn,
    AverageOff,
    StopContinuousRead,
}

/// A fully recognized command, arguments included.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Exact(ExactCommand),
    SetAcquirePoints(u64),
    SetAcquireCount(u64),
    /// Capture target; empty when the line carried no path.
    CaptureFile(String),
    QueryChannelDisplay(u8),
}

pub const EXACT_COMMANDS: &[(&str, ExactCommand)] = &[
    ("exit", ExactCommand::Exit),
    ("q *idn?", ExactCommand::Identify),
    ("16", ExactCommand::SampleDump),
    ("q :waveform:preamble?", ExactCommand::QueryPreamble),
    ("pon", ExactCommand::PreambleOn),
    ("poff", ExactCommand::PreambleOff),
    ("q :acquire:points?", ExactCommand::QueryAcquirePoints),
    ("q :acquire:count?", ExactCommand::QueryAcquireCount),
    ("q :acquire:average?", ExactCommand::QueryAverage),
    ("s :acquire:average on", ExactCommand::AverageOn),
    ("s :acquire:average off", ExactCommand::AverageOff),
    ("?", ExactCommand::StopContinuousRead),
];

const FILE_PREFIX: &str = "file";
const ACQUIRE_POINTS_PREFIX: &str = "s :acquire:points";
const ACQUIRE_COUNT_PREFIX: &str = "s :acquire:count";
const CHANNEL_DISPLAY_PATTERN: &str = r"q :channel[1-4]:display\?";

/// One input line in both forms used by the dispatcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedLine {
    /// Trimmed text with its original casing.
    pub raw: String,
    /// ASCII lower-case form of `raw`, used for all matching.
    pub key: String,
}

impl NormalizedLine {
    /// Strips the terminator and surrounding whitespace, then lower-cases.
    ///
    /// Only ASCII letters are folded, so byte offsets in `key` line up with
    /// `raw` and an argument found in one can be sliced out of the other.
    pub fn new(record: &str) -> Self {
        let raw = record.trim().to_string();
        let key = raw.to_ascii_lowercase();
        Self { raw, key }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ArgumentKind {
    CaptureFile,
    AcquirePoints,
    AcquireCount,
    ChannelDisplay,
}

#[derive(Debug)]
enum Matcher {
    /// Literal prefix of the line.
    Prefix { prefix: &'static str, kind: ArgumentKind },
    /// Prefix of the line with every whitespace run read as one space.
    Words { prefix: &'static str, kind: ArgumentKind },
    /// Pattern found anywhere in the line.
    Pattern { regex: Regex, kind: ArgumentKind },
}

impl Matcher {
    /// Returns the part of the raw line following a literal prefix, or the
    /// whole raw line for the other matchers.
    fn argument<'a>(&self, line: &'a NormalizedLine) -> Option<&'a str> {
        match self {
            Matcher::Prefix { prefix, .. } => line
                .key
                .starts_with(prefix)
                .then(|| &line.raw[prefix.len()..]),
            Matcher::Words { prefix, .. } => {
                let words = line.key.split_whitespace().collect::<Vec<_>>().join(" ");
                words.starts_with(prefix).then_some(line.raw.as_str())
            }
            Matcher::Pattern { regex, .. } => {
                regex.is_match(&line.key).then_some(line.raw.as_str())
            }
        }
    }

    fn kind(&self) -> ArgumentKind {
        match self {
            Matcher::Prefix { kind, .. }
            | Matcher::Words { kind, .. }
            | Matcher::Pattern { kind, .. } => *kind,
        }
    }
}

/// Ordered matcher table, built once per simulator.
#[derive(Debug)]
pub struct Dispatcher {
    matchers: Vec<Matcher>,
}

impl Dispatcher {
    pub fn new() -> SimResult<Self> {
        let matchers = vec![
            Matcher::Prefix {
                prefix: FILE_PREFIX,
                kind: ArgumentKind::CaptureFile,
            },
            Matcher::Words {
                prefix: ACQUIRE_POINTS_PREFIX,
                kind: ArgumentKind::AcquirePoints,
            },
            Matcher::Words {
                prefix: ACQUIRE_COUNT_PREFIX,
                kind: ArgumentKind::AcquireCount,
            },
            Matcher::Pattern {
                regex: Regex::new(CHANNEL_DISPLAY_PATTERN)?,
                kind: ArgumentKind::ChannelDisplay,
            },
        ];
        Ok(Self { matchers })
    }

    /// Maps a line to a command. `Ok(None)` means the line is not a command
    /// this instrument knows; errors are malformed arguments.
    pub fn recognize(&self, line: &NormalizedLine) -> SimResult<Option<Command>> {
        if let Some(command) = exact_command(&line.key) {
            return Ok(Some(Command::Exact(command)));
        }

        for matcher in &self.matchers {
            if let Some(argument) = matcher.argument(line) {
                return build_command(matcher.kind(), argument, &line.key).map(Some);
            }
        }

        Ok(None)
    }
}

pub fn exact_command(key: &str) -> Option<ExactCommand> {
    EXACT_COMMANDS
        .iter()
        .find(|(text, _)| *text == key)
        .map(|(_, command)| *command)
}

fn build_command(kind: ArgumentKind, argument: &str, key: &str) -> SimResult<Command> {
    match kind {
        ArgumentKind::CaptureFile => Ok(Command::CaptureFile(argument.trim().to_string())),
        ArgumentKind::AcquirePoints => last_positive_integer(key).map(Command::SetAcquirePoints),
        ArgumentKind::AcquireCount => last_positive_integer(key).map(Command::SetAcquireCount),
        ArgumentKind::ChannelDisplay => channel_number(key).map(Command::QueryChannelDisplay),
    }
}

/// Parses the last whitespace-delimited token as a base-10 integer above zero.
fn last_positive_integer(command: &str) -> SimResult<u64> {
    let last = command.split_whitespace().last().unwrap_or_default();
    let value = last.parse::<u64>().map_err(|source| SimError::InvalidArgument {
        command: command.to_string(),
        source,
    })?;
    if value == 0 {
        return Err(SimError::NonPositive {
            command: command.to_string(),
        });
    }
    Ok(value)
}

/// First decimal digit in the command, scanning left to right.
fn channel_number(command: &str) -> SimResult<u8> {
    command
        .chars()
        .find_map(|c| c.to_digit(10))
        .map(|digit| digit as u8)
        .ok_or_else(|| SimError::MissingChannel {
            command: command.to_string(),
        })
}
