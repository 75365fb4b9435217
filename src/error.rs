//! Error types for the simulator.
//!
//! Every variant of [`SimError`] is fatal for the session: the interpreter
//! hands it back to the session driver, which stops reading and lets the
//! binary exit with a failure code. An unrecognized command is not an error
//! and never shows up here.

use std::num::ParseIntError;

use thiserror::Error;

/// Convenience alias for results using the simulator error type.
pub type SimResult<T> = std::result::Result<T, SimError>;

#[derive(Error, Debug)]
pub enum SimError {
    /// The binary was started without `-i`.
    #[error("the i flag wasn't used")]
    NotInteractive,

    /// Input, audit log, response sink, payload or capture file failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The line source closed before an `exit` command arrived.
    #[error("input closed before exit command")]
    UnexpectedEof,

    /// The trailing token of a numeric set command is missing or not a number.
    #[error("invalid numeric argument in '{command}': {source}")]
    InvalidArgument {
        command: String,
        #[source]
        source: ParseIntError,
    },

    /// A numeric set command carried zero.
    #[error("argument of '{command}' must be greater than zero")]
    NonPositive { command: String },

    /// Flush requested before any `file` command.
    #[error("measurement file is not set")]
    NoCaptureTarget,

    /// A channel display query matched without any channel digit.
    #[error("no channel number in '{command}'")]
    MissingChannel { command: String },

    #[error("configuration error: {0}")]
    Config(#[from] toml::de::Error),

    #[error("invalid command pattern: {0}")]
    Pattern(#[from] regex::Error),
}
