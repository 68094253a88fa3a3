//! Typed errors carrying the line range that provoked them.
//!
//! The parser is "sticky": once an [`Error`] has been recorded for a parser
//! instance, later calls return it unchanged and the caller must create a
//! fresh parser. See spec §7.

use crate::span::LineRange;
use thiserror::Error as ThisError;

/// Alias for `std::result::Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;

/// The closed set of error kinds a parser, edit pass, or emitter can raise.
///
/// Every variant except [`Error::DifferencesFound`] carries the (1-based)
/// line range it was raised at.
#[derive(Debug, Clone, PartialEq, Eq, ThisError)]
pub enum Error {
    /// An internal fixed-size buffer was too small for the input.
    #[error("buffer too small at {range}")]
    BufferTooSmall {
        /// Location of the offending input.
        range: LineRange,
    },

    /// Diff mode produced a non-empty patch. Not a failure in the usual
    /// sense — the signal a caller uses to set a nonzero exit status.
    #[error("differences found")]
    DifferencesFound,

    /// An edit pass declined to commit its output.
    #[error("edit failed at {range}")]
    EditFailed {
        /// Location of the failed edit.
        range: LineRange,
    },

    /// The tokeniser expected a specific character and didn't find it.
    #[error("expected '{ch}' at {range}")]
    ExpectedChar {
        /// The character that was expected.
        ch: char,
        /// Location of the failure.
        range: LineRange,
    },

    /// A value expected to parse as an integer did not.
    #[error("expected integer, got '{value}' at {range}")]
    ExpectedInt {
        /// The offending text.
        value: String,
        /// Location of the failure.
        range: LineRange,
    },

    /// A specific token kind was expected but not present.
    #[error("expected token '{kind}' at {range}")]
    ExpectedToken {
        /// Name of the expected token kind.
        kind: String,
        /// Location of the failure.
        range: LineRange,
    },

    /// A caller passed a combination of arguments that cannot be honoured.
    #[error("invalid argument: {message}")]
    InvalidArgument {
        /// Description of the invalid argument.
        message: String,
    },

    /// A domain rule regular expression failed to compile.
    #[error("invalid regular expression: {message}")]
    InvalidRegexp {
        /// Description of the failure.
        message: String,
    },

    /// An I/O operation failed.
    #[error("I/O error: {message}")]
    Io {
        /// Description of the failure.
        message: String,
    },

    /// A requested name (variable, target, file) could not be found.
    #[error("not found: {name}")]
    NotFound {
        /// The name that was looked up.
        name: String,
    },

    /// A pass encountered a token kind it does not know how to handle.
    #[error("unhandled token type '{kind}' at {range}")]
    UnhandledTokenType {
        /// Name of the unhandled token kind.
        kind: String,
        /// Location of the failure.
        range: LineRange,
    },

    /// A catch-all for conditions with no more specific kind.
    #[error("{message}")]
    Unspecified {
        /// Description of the failure.
        message: String,
    },
}

impl Error {
    /// Returns the line range this error was raised at, if any.
    ///
    /// [`Error::DifferencesFound`], [`Error::InvalidArgument`],
    /// [`Error::InvalidRegexp`], [`Error::Io`], and [`Error::NotFound`] carry
    /// no location.
    pub fn range(&self) -> Option<LineRange> {
        match self {
            Error::BufferTooSmall { range }
            | Error::EditFailed { range }
            | Error::ExpectedChar { range, .. }
            | Error::ExpectedInt { range, .. }
            | Error::ExpectedToken { range, .. }
            | Error::UnhandledTokenType { range, .. } => Some(*range),
            Error::DifferencesFound
            | Error::InvalidArgument { .. }
            | Error::InvalidRegexp { .. }
            | Error::Io { .. }
            | Error::NotFound { .. }
            | Error::Unspecified { .. } => None,
        }
    }
}
