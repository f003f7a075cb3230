//! The mount collaborator: everything the engine needs to know about the
//! working copy on disk and the commit it is checked out against.

use std::sync::Arc;

use ofs_store::{EntryMode, SnapshotEntry, SnapshotTree};
use ofs_types::{ObjectId, RelativePath};

use crate::error::DirstateResult;

/// What currently exists on disk at a path.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DiskEntry {
    /// A regular file, executable or symlink, with the id its content would
    /// have as a blob.
    File { object_id: ObjectId, mode: EntryMode },
    Directory,
}

impl DiskEntry {
    pub fn file(object_id: ObjectId, mode: EntryMode) -> Self {
        Self::File { object_id, mode }
    }

    pub fn is_file(&self) -> bool {
        matches!(self, Self::File { .. })
    }

    /// True if this is a file whose content and mode equal `committed`.
    pub fn matches(&self, committed: &SnapshotEntry) -> bool {
        match self {
            Self::File { object_id, mode } => {
                *object_id == committed.object_id && *mode == committed.mode
            }
            Self::Directory => false,
        }
    }
}

/// Working copy collaborator.
///
/// Implementations synchronize their own state; the engine may call them
/// from any thread.
pub trait Mount: Send + Sync {
    /// Every path whose on-disk state differs from the base snapshot:
    /// changed files, files not in the snapshot, and snapshot files that are
    /// gone from disk. Paths outside this set are clean.
    fn overlay_paths(&self) -> DirstateResult<Vec<RelativePath>>;

    /// The entry at `path`, or `Ok(None)` if nothing exists there.
    fn lookup(&self, path: &RelativePath) -> DirstateResult<Option<DiskEntry>>;

    /// The commit the working copy is currently checked out against.
    fn base_snapshot(&self) -> DirstateResult<Arc<SnapshotTree>>;
}
