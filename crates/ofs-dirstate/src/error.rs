//! Error types for the dirstate crate.
//!
//! Per-path user mistakes (untracked file, uncommitted changes) are not
//! errors here: they are [`AddRemoveError`](crate::AddRemoveError) values
//! collected by the batch operations. `DirstateError` covers failures that
//! abort a whole call.

use ofs_store::StoreError;
use ofs_types::PathError;

/// Errors that abort a dirstate operation.
#[derive(Debug, thiserror::Error)]
pub enum DirstateError {
    /// A mount collaborator could not answer a query.
    #[error("mount error: {0}")]
    Mount(String),

    /// Reading the base snapshot from the object store failed.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// A path could not be constructed or resolved.
    #[error("path error: {0}")]
    Path(#[from] PathError),

    /// Loading or saving the directive table failed.
    #[error("persistence error: {0}")]
    Persistence(String),

    /// Ignore rules could not be loaded.
    #[error("ignore file error: {0}")]
    Ignore(String),

    /// I/O error from an on-disk collaborator.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A thread panicked while holding the directive table.
    #[error("directive table lock poisoned")]
    LockPoisoned,
}

/// Convenience alias for dirstate results.
pub type DirstateResult<T> = Result<T, DirstateError>;
