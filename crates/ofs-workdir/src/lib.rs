//! A working copy backed by a plain local directory.
//!
//! Wires the dirstate engine to real collaborators: a [`LocalMount`] that
//! computes the overlay by walking the directory against the base snapshot,
//! an on-disk object store under `.ofs/objects`, gitignore-style ignore files
//! and a file-backed directive table.

pub mod config;
pub mod error;
pub mod mount;
pub mod workdir;

pub use config::WorkdirConfig;
pub use error::{WorkdirError, WorkdirResult};
pub use mount::LocalMount;
pub use workdir::{SnapshotSummary, Workdir, META_DIR};

// Re-export the types callers need to drive a working copy.
pub use ofs_dirstate::{AddRemoveError, Directive, Status, StatusCode};
pub use ofs_types::{AbsolutePath, ObjectId, RelativePath};
