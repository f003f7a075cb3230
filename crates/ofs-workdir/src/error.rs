use thiserror::Error;

#[derive(Debug, Error)]
pub enum WorkdirError {
    #[error("not an ofs working copy (or any parent): {0}")]
    NotInitialized(String),

    #[error("working copy already initialized at {0}")]
    AlreadyInitialized(String),

    #[error("path is outside the working copy: {0}")]
    OutsideRoot(String),

    #[error("invalid config {path}: {reason}")]
    Config { path: String, reason: String },

    #[error("corrupt HEAD: {0}")]
    CorruptHead(String),

    #[error("store error: {0}")]
    Store(#[from] ofs_store::StoreError),

    #[error("dirstate error: {0}")]
    Dirstate(#[from] ofs_dirstate::DirstateError),

    #[error("path error: {0}")]
    Path(#[from] ofs_types::PathError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type WorkdirResult<T> = Result<T, WorkdirError>;
