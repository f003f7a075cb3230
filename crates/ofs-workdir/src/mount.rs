//! [`Mount`] over a real directory.
//!
//! The overlay is recomputed on every call by walking the directory and
//! hashing each file, then comparing against the base snapshot.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};

use ofs_dirstate::{DirstateError, DirstateResult, DiskEntry, Mount};
use ofs_store::{Blob, EntryMode, SnapshotEntry, SnapshotTree};
use ofs_types::{AbsolutePath, RelativePath};
use tracing::{debug, warn};
use walkdir::WalkDir;

/// A working copy directory on the local filesystem, with its base snapshot
/// held in memory.
pub struct LocalMount {
    root: AbsolutePath,
    meta_dir: String,
    base: RwLock<Arc<SnapshotTree>>,
}

impl std::fmt::Debug for LocalMount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalMount")
            .field("root", &self.root)
            .field("meta_dir", &self.meta_dir)
            .finish_non_exhaustive()
    }
}

impl LocalMount {
    /// Mount `root`, hiding the top-level `meta_dir` from every query.
    pub fn new(root: AbsolutePath, meta_dir: impl Into<String>, base: SnapshotTree) -> Self {
        Self {
            root,
            meta_dir: meta_dir.into(),
            base: RwLock::new(Arc::new(base)),
        }
    }

    pub fn root(&self) -> &AbsolutePath {
        &self.root
    }

    /// Install a new base snapshot after a commit.
    pub fn set_base(&self, base: SnapshotTree) {
        *self.base.write().unwrap_or_else(PoisonError::into_inner) = Arc::new(base);
    }

    pub fn disk_path(&self, path: &RelativePath) -> PathBuf {
        self.root.join(path).as_path().to_path_buf()
    }

    /// Content and mode of the file at `path`, as a snapshot would store it.
    /// A symlink's content is its target.
    pub fn read_file(&self, path: &RelativePath) -> io::Result<(Vec<u8>, EntryMode)> {
        let full = self.disk_path(path);
        let meta = fs::symlink_metadata(&full)?;
        if meta.file_type().is_symlink() {
            return Ok((link_bytes(&full)?, EntryMode::Symlink));
        }
        Ok((fs::read(&full)?, file_mode(&meta)))
    }

    fn is_meta(&self, path: &RelativePath) -> bool {
        path.components().next() == Some(self.meta_dir.as_str())
    }

    /// Every file on disk with the entry it would have in a snapshot.
    fn scan(&self) -> DirstateResult<BTreeMap<RelativePath, SnapshotEntry>> {
        let mut files = BTreeMap::new();
        let walker = WalkDir::new(self.root.as_path())
            .follow_links(false)
            .into_iter()
            .filter_entry(|e| !(e.depth() == 1 && e.file_name() == self.meta_dir.as_str()));

        for entry in walker {
            let entry = entry.map_err(|e| DirstateError::Mount(e.to_string()))?;
            if entry.file_type().is_dir() {
                continue;
            }
            let Some(path) = self.relative(entry.path()) else {
                warn!(path = %entry.path().display(), "skipping non UTF-8 path");
                continue;
            };
            if let Some(DiskEntry::File { object_id, mode }) = disk_entry(entry.path())? {
                files.insert(path, SnapshotEntry::new(object_id, mode));
            }
        }
        Ok(files)
    }

    fn relative(&self, full: &Path) -> Option<RelativePath> {
        let rel = full.strip_prefix(self.root.as_path()).ok()?;
        let parts: Option<Vec<&str>> = rel.components().map(|c| c.as_os_str().to_str()).collect();
        RelativePath::new(parts?.join("/")).ok()
    }
}

impl Mount for LocalMount {
    fn overlay_paths(&self) -> DirstateResult<Vec<RelativePath>> {
        let base = self.base_snapshot()?;
        let disk = self.scan()?;

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

        debug!(root = %self.root, scanned = disk.len(), overlay = paths.len(), "overlay walked");
        Ok(paths)
    }

    fn lookup(&self, path: &RelativePath) -> DirstateResult<Option<DiskEntry>> {
        if self.is_meta(path) {
            return Ok(None);
        }
        Ok(disk_entry(&self.disk_path(path))?)
    }

    fn base_snapshot(&self) -> DirstateResult<Arc<SnapshotTree>> {
        Ok(Arc::clone(&self.base.read().unwrap_or_else(PoisonError::into_inner)))
    }
}

fn disk_entry(full: &Path) -> io::Result<Option<DiskEntry>> {
    let meta = match fs::symlink_metadata(full) {
        Ok(meta) => meta,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        // A path below a regular file.
        Err(_) if full.parent().is_some_and(|p| !p.is_dir()) => return Ok(None),
        Err(e) => return Err(e),
    };

    let file_type = meta.file_type();
    if file_type.is_dir() {
        Ok(Some(DiskEntry::Directory))
    } else if file_type.is_symlink() {
        let id = Blob::id_for(&link_bytes(full)?);
        Ok(Some(DiskEntry::file(id, EntryMode::Symlink)))
    } else if file_type.is_file() {
        let id = Blob::id_for(&fs::read(full)?);
        Ok(Some(DiskEntry::file(id, file_mode(&meta))))
    } else {
        Ok(None)
    }
}

fn link_bytes(full: &Path) -> io::Result<Vec<u8>> {
    let target = fs::read_link(full)?;
    Ok(target.to_string_lossy().into_owned().into_bytes())
}

#[cfg(unix)]
fn file_mode(meta: &fs::Metadata) -> EntryMode {
    use std::os::unix::fs::PermissionsExt;
    if meta.permissions().mode() & 0o111 != 0 {
        EntryMode::Executable
    } else {
        EntryMode::Regular
    }
}

#[cfg(not(unix))]
fn file_mode(_meta: &fs::Metadata) -> EntryMode {
    EntryMode::Regular
}

#[cfg(test)]
mod tests {
    use super::*;
    use ofs_types::resolve_real_path;

    fn rel(s: &str) -> RelativePath {
        RelativePath::new(s).unwrap()
    }

    fn mount_at(dir: &Path, base: SnapshotTree) -> LocalMount {
        let root = resolve_real_path(dir.to_str().unwrap()).unwrap();
        LocalMount::new(root, ".ofs", base)
    }

    #[test]
    fn overlay_of_fresh_directory_lists_every_file() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("src/deep")).unwrap();
        fs::write(dir.path().join("a.txt"), "a").unwrap();
        fs::write(dir.path().join("src/deep/b.rs"), "b").unwrap();
        fs::create_dir_all(dir.path().join(".ofs/objects")).unwrap();
        fs::write(dir.path().join(".ofs/HEAD"), "").unwrap();

        let mount = mount_at(dir.path(), SnapshotTree::empty());
        assert_eq!(mount.overlay_paths().unwrap(), vec![rel("a.txt"), rel("src/deep/b.rs")]);
    }

    #[test]
    fn overlay_compares_against_base() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("same"), "same").unwrap();
        fs::write(dir.path().join("edited"), "new").unwrap();
        let base = SnapshotTree::from_entries([
            (rel("same"), SnapshotEntry::new(Blob::id_for(b"same"), EntryMode::Regular)),
            (rel("edited"), SnapshotEntry::new(Blob::id_for(b"old"), EntryMode::Regular)),
            (rel("gone"), SnapshotEntry::new(Blob::id_for(b"gone"), EntryMode::Regular)),
        ]);

        let mount = mount_at(dir.path(), base);
        assert_eq!(mount.overlay_paths().unwrap(), vec![rel("edited"), rel("gone")]);
    }

    #[test]
    fn lookup_reports_files_dirs_and_absence() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        fs::write(dir.path().join("sub/f"), "f").unwrap();
        let mount = mount_at(dir.path(), SnapshotTree::empty());

        assert_eq!(
            mount.lookup(&rel("sub/f")).unwrap(),
            Some(DiskEntry::file(Blob::id_for(b"f"), EntryMode::Regular))
        );
        assert_eq!(mount.lookup(&rel("sub")).unwrap(), Some(DiskEntry::Directory));
        assert_eq!(mount.lookup(&RelativePath::root()).unwrap(), Some(DiskEntry::Directory));
        assert_eq!(mount.lookup(&rel("nope")).unwrap(), None);
        assert_eq!(mount.lookup(&rel("sub/f/below")).unwrap(), None);
    }

    #[test]
    fn meta_dir_is_invisible() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join(".ofs")).unwrap();
        fs::write(dir.path().join(".ofs/HEAD"), "").unwrap();
        let mount = mount_at(dir.path(), SnapshotTree::empty());
        assert_eq!(mount.lookup(&rel(".ofs/HEAD")).unwrap(), None);
        assert!(mount.overlay_paths().unwrap().is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn modes_follow_permissions_and_links() {
        use std::os::unix::fs::{symlink, PermissionsExt};

        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("run.sh");
        fs::write(&script, "#!/bin/sh\n").unwrap();
        fs::set_permissions(&script, fs::Permissions::from_mode(0o755)).unwrap();
        symlink("run.sh", dir.path().join("link")).unwrap();
        let mount = mount_at(dir.path(), SnapshotTree::empty());

        assert_eq!(
            mount.lookup(&rel("run.sh")).unwrap(),
            Some(DiskEntry::file(Blob::id_for(b"#!/bin/sh\n"), EntryMode::Executable))
        );
        assert_eq!(
            mount.lookup(&rel("link")).unwrap(),
            Some(DiskEntry::file(Blob::id_for(b"run.sh"), EntryMode::Symlink))
        );
        assert_eq!(mount.read_file(&rel("link")).unwrap(), (b"run.sh".to_vec(), EntryMode::Symlink));
    }
}
