use std::io;

use thiserror::Error;

use crate::{options::Mode, parser::ParseError};

/// Every failure a dump or parse call can surface.
///
/// None of these are recovered locally; each one aborts the current
/// top-level call.
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed UTF-8 or an invalid surrogate pair.
    #[error("invalid unicode: {0}")]
    Encoding(String),
    /// Nesting exceeded the configured maximum depth.
    #[error("too deeply nested: depth {depth} exceeds limit {limit}")]
    Nesting {
        /// Depth at which the limit was hit.
        depth: usize,
        /// The configured limit.
        limit: usize,
    },
    /// A value kind the active mode cannot encode.
    #[error("failed to dump {kind} value to JSON in {mode} mode")]
    UnsupportedType {
        /// Short name of the offending value kind.
        kind: &'static str,
        /// The active dump mode.
        mode: Mode,
    },
    /// Syntax violation while parsing.
    #[error(transparent)]
    Parse(#[from] ParseError),
    /// Failure reading or writing a file or stream.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    /// A non-finite float under a raising policy.
    #[error("{value} not allowed in JSON ({mode} mode)")]
    Nan {
        /// The word form of the value (`NaN`, `Infinity` or `-Infinity`).
        value: &'static str,
        /// The active dump mode.
        mode: Mode,
    },
    /// Misuse of an incremental writer.
    #[error("{0}")]
    Writer(&'static str),
    /// A host callback reported a failure.
    #[error("host error: {0}")]
    Host(String),
}

impl Error {
    /// Returns the positioned parse error, if this is one.
    #[must_use]
    pub fn as_parse_error(&self) -> Option<&ParseError> {
        match self {
            Self::Parse(err) => Some(err),
            _ => None,
        }
    }

    /// Whether this error came from the nesting guard.
    #[must_use]
    pub fn is_nesting(&self) -> bool {
        matches!(self, Self::Nesting { .. })
    }
}

/// Shorthand used throughout the crate.
pub type Result<T, E = Error> = core::result::Result<T, E>;
