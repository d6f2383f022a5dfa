//! Error types shared across the toolkit.

use std::{io, result::Result as StdResult};

use thiserror::Error;

/// Result type for weft operations.
pub type Result<T> = StdResult<T, Error>;

/// Toolkit error type.
#[derive(PartialEq, Eq, Error, Debug, Clone)]
pub enum Error {
    /// Stdin or stdout is not a terminal while interactive mode was requested.
    #[error("terminal unavailable: {0}")]
    TerminalUnavailable(String),

    /// Unbalanced tags or an unknown entity in markup input.
    #[error("markup error at offset {position}: {message}")]
    Markup {
        /// Byte offset of the offending construct.
        position: usize,
        /// What went wrong.
        message: String,
    },

    /// A window's minimum size cannot be satisfied.
    #[error("layout overflow: {0}")]
    LayoutOverflow(String),

    /// Two bindings with identical key sequence and filter.
    #[error("binding conflict: {0}")]
    BindingConflict(String),

    /// A buffer validator rejected the current text.
    #[error("validation: {0}")]
    Validation(String),

    /// The console exited while work was still pending.
    #[error("cancelled")]
    Cancelled,

    /// A terminal read or write failed.
    #[error("io: {0}")]
    Io(String),

    /// Internal invariant violation.
    #[error("internal: {0}")]
    Internal(String),
}

impl Error {
    /// Construct a markup error at a byte offset.
    pub fn markup(position: usize, message: impl Into<String>) -> Self {
        Self::Markup {
            position,
            message: message.into(),
        }
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Self::Io(e.to_string())
    }
}
