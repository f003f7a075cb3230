//! In-memory [`Mount`] for tests and embedding.

use std::collections::BTreeMap;
use std::sync::{Arc, PoisonError, RwLock};

use ofs_store::{Blob, EntryMode, SnapshotEntry, SnapshotTree};
use ofs_types::RelativePath;

use crate::error::DirstateResult;
use crate::mount::{DiskEntry, Mount};

/// A working copy that lives entirely in memory.
///
/// Only files are stored; a directory exists wherever some file lies below
/// it, and the root always exists.
#[derive(Debug)]
pub struct InMemoryMount {
    base: RwLock<Arc<SnapshotTree>>,
    disk: RwLock<BTreeMap<RelativePath, SnapshotEntry>>,
}

impl InMemoryMount {
    /// A clean checkout of `base`: disk contents equal the snapshot.
    pub fn new(base: SnapshotTree) -> Self {
        let disk = base.iter().map(|(p, e)| (p.clone(), *e)).collect();
        Self {
            base: RwLock::new(Arc::new(base)),
            disk: RwLock::new(disk),
        }
    }

    pub fn write_file(&self, path: &RelativePath, content: &[u8]) {
        self.write_file_with_mode(path, content, EntryMode::Regular);
    }

    pub fn write_file_with_mode(&self, path: &RelativePath, content: &[u8], mode: EntryMode) {
        let mut disk = self.disk.write().unwrap_or_else(PoisonError::into_inner);
        disk.insert(path.clone(), SnapshotEntry::new(Blob::id_for(content), mode));
    }

    pub fn delete_file(&self, path: &RelativePath) -> bool {
        let mut disk = self.disk.write().unwrap_or_else(PoisonError::into_inner);
        disk.remove(path).is_some()
    }

    /// Install a new base snapshot without touching disk, as a commit does.
    pub fn set_base(&self, base: SnapshotTree) {
        *self.base.write().unwrap_or_else(PoisonError::into_inner) = Arc::new(base);
    }

    /// The current disk contents as a snapshot, handy for simulating a
    /// commit of everything.
    pub fn disk_snapshot(&self) -> SnapshotTree {
        let disk = self.disk.read().unwrap_or_else(PoisonError::into_inner);
        SnapshotTree::from_entries(disk.iter().map(|(p, e)| (p.clone(), *e)))
    }
}

impl Mount for InMemoryMount {
    fn overlay_paths(&self) -> DirstateResult<Vec<RelativePath>> {
        let base = self.base_snapshot()?;
        let disk = self.disk.read().unwrap_or_else(PoisonError::into_inner);

        let mut paths: Vec<RelativePath> = disk
            .iter()
            .filter(|(path, entry)| base.get(path) != Some(*entry))
            .map(|(path, _)| path.clone())
            .collect();
        paths.extend(
            base.iter()
                .filter(|(path, _)| !disk.contains_key(*path))
                .map(|(path, _)| path.clone()),
        );
        paths.sort();
        Ok(paths)
    }

    fn lookup(&self, path: &RelativePath) -> DirstateResult<Option<DiskEntry>> {
        if path.is_root() {
            return Ok(Some(DiskEntry::Directory));
        }
        let disk = self.disk.read().unwrap_or_else(PoisonError::into_inner);
        if let Some(entry) = disk.get(path) {
            return Ok(Some(DiskEntry::file(entry.object_id, entry.mode)));
        }
        let is_dir = disk.keys().any(|p| p.is_descendant_of(path));
        Ok(is_dir.then_some(DiskEntry::Directory))
    }

    fn base_snapshot(&self) -> DirstateResult<Arc<SnapshotTree>> {
        Ok(Arc::clone(&self.base.read().unwrap_or_else(PoisonError::into_inner)))
    }
}
