use std::io;

use thiserror::Error;

/// Errors produced by type operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid hex string: {0}")]
    InvalidHex(String),

    #[error("invalid byte length: expected {expected}, got {actual}")]
    InvalidLength { expected: usize, actual: usize },
}

/// Errors produced by path construction and resolution.
#[derive(Debug, Error)]
pub enum PathError {
    /// The string is not in canonical form for the requested path type.
    #[error("invalid path {path:?}: {reason}")]
    Invalid { path: String, reason: &'static str },

    /// An OS call failed while resolving a path.
    #[error("{context}({path}) failed: {source}")]
    System {
        context: &'static str,
        path: String,
        #[source]
        source: io::Error,
    },

    /// The OS returned a path that is not valid UTF-8.
    #[error("path is not valid UTF-8: {0}")]
    NonUtf8(String),
}
