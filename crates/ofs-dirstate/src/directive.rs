//! Pending user intents and the table that guards them.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{RwLock, RwLockWriteGuard};

use ofs_types::RelativePath;
use serde::{Deserialize, Serialize};

use crate::error::{DirstateError, DirstateResult};
use crate::persistence::DirstatePersistence;

/// An uncommitted `add` or `remove` the base snapshot does not reflect yet.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Directive {
    /// Track a file that is absent from the base snapshot.
    Add,
    /// Stop tracking a file that is present in the base snapshot.
    Remove,
}

impl fmt::Display for Directive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Add => f.write_str("add"),
            Self::Remove => f.write_str("remove"),
        }
    }
}

/// Directive per path.
pub type DirectiveMap = BTreeMap<RelativePath, Directive>;

/// The only mutable state the engine owns.
///
/// Readers take a point-in-time copy; writers hold the lock for their whole
/// mutation window, including the persistence write.
#[derive(Debug, Default)]
pub struct DirectiveTable {
    inner: RwLock<DirectiveMap>,
}

impl DirectiveTable {
    /// Wrap an existing map. Nothing is persisted.
    pub fn new(directives: DirectiveMap) -> Self {
        Self {
            inner: RwLock::new(directives),
        }
    }

    /// Populate a table from whatever `persistence` last saved.
    pub fn load(persistence: &dyn DirstatePersistence) -> DirstateResult<Self> {
        Ok(Self::new(persistence.load()?))
    }

    /// A consistent copy of the whole table.
    pub fn snapshot(&self) -> DirstateResult<DirectiveMap> {
        let guard = self.inner.read().map_err(|_| DirstateError::LockPoisoned)?;
        Ok(guard.clone())
    }

    /// Number of pending directives.
    pub fn len(&self) -> DirstateResult<usize> {
        let guard = self.inner.read().map_err(|_| DirstateError::LockPoisoned)?;
        Ok(guard.len())
    }

    pub(crate) fn write(&self) -> DirstateResult<RwLockWriteGuard<'_, DirectiveMap>> {
        self.inner.write().map_err(|_| DirstateError::LockPoisoned)
    }

    #[cfg(test)]
    pub(crate) fn is_write_locked(&self) -> bool {
        matches!(self.inner.try_read(), Err(std::sync::TryLockError::WouldBlock))
    }
}

/// A per-path failure of `add` or `remove`.
///
/// Batch operations collect these and carry on with the remaining paths. A
/// non-empty list means the command as a whole failed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AddRemoveError {
    pub path: RelativePath,
    pub message: String,
}

impl AddRemoveError {
    pub fn new(path: RelativePath, message: impl Into<String>) -> Self {
        Self {
            path,
            message: message.into(),
        }
    }

    pub(crate) fn no_such_file(path: &RelativePath) -> Self {
        Self::new(path.clone(), "No such file or directory")
    }

    pub(crate) fn not_tracked(path: &RelativePath) -> Self {
        Self::new(path.clone(), "not removing: file is untracked")
    }

    pub(crate) fn uncommitted_changes(path: &RelativePath) -> Self {
        Self::new(
            path.clone(),
            "not removing: file has uncommitted changes (use -f to force removal)",
        )
    }

    pub(crate) fn no_tracked_files(path: &RelativePath) -> Self {
        Self::new(path.clone(), "not removing: no tracked files")
    }
}

impl fmt::Display for AddRemoveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}
