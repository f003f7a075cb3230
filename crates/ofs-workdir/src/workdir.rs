//! The working copy facade.
//!
//! Layout on disk:
//!
//! ```text
//! <root>/.ofs/config.toml   settings (optional)
//! <root>/.ofs/HEAD          hex root tree id of the base snapshot, empty before the first snapshot
//! <root>/.ofs/objects/      loose object store
//! <root>/.ofs/dirstate      pending add/remove directives
//! ```

use std::fs;
use std::path::Path;
use std::sync::Arc;

use ofs_dirstate::{
    AddRemoveError, Dirstate, DirectiveMap, FileDirstatePersistence, GitignoreMatcher, Mount,
    Status, StatusCode,
};
use ofs_store::{Blob, FsObjectStore, ObjectStore, SnapshotEntry, SnapshotTree};
use ofs_types::{canonicalize_with_base, resolve_real_path, AbsolutePath, ObjectId, PathError, RelativePath};
use tracing::{debug, info};

use crate::config::{WorkdirConfig, CONFIG_FILE};
use crate::error::{WorkdirError, WorkdirResult};
use crate::mount::LocalMount;

/// Metadata directory at the working copy root.
pub const META_DIR: &str = ".ofs";

const HEAD_FILE: &str = "HEAD";
const OBJECTS_DIR: &str = "objects";

/// What a [`Workdir::snapshot`] recorded.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SnapshotSummary {
    pub root_id: ObjectId,
    pub added: usize,
    pub modified: usize,
    pub removed: usize,
}

impl SnapshotSummary {
    pub fn changed(&self) -> usize {
        self.added + self.modified + self.removed
    }
}

/// A working copy rooted at a directory holding `.ofs`.
///
/// Ties the on-disk object store and HEAD to a [`Dirstate`] over a
/// [`LocalMount`].
pub struct Workdir {
    root: AbsolutePath,
    config: WorkdirConfig,
    store: FsObjectStore,
    mount: Arc<LocalMount>,
    dirstate: Dirstate,
}

impl std::fmt::Debug for Workdir {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Workdir")
            .field("root", &self.root)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Workdir {
    /// Create `.ofs` under `root` with default settings and open it.
    pub fn init(root: impl AsRef<Path>) -> WorkdirResult<Self> {
        Self::init_with_config(root, &WorkdirConfig::default())
    }

    pub fn init_with_config(root: impl AsRef<Path>, config: &WorkdirConfig) -> WorkdirResult<Self> {
        let root = real_root(root.as_ref())?;
        let meta = root.as_path().join(META_DIR);
        if meta.exists() {
            return Err(WorkdirError::AlreadyInitialized(root.to_string()));
        }

        fs::create_dir_all(meta.join(OBJECTS_DIR))?;
        config.save(&meta.join(CONFIG_FILE))?;
        fs::write(meta.join(HEAD_FILE), "")?;
        info!(root = %root, "initialized working copy");

        Self::open_at(root)
    }

    /// Open the working copy rooted exactly at `root`.
    pub fn open(root: impl AsRef<Path>) -> WorkdirResult<Self> {
        let root = real_root(root.as_ref())?;
        if !root.as_path().join(META_DIR).is_dir() {
            return Err(WorkdirError::NotInitialized(root.to_string()));
        }
        Self::open_at(root)
    }

    /// Open the working copy containing `start`, searching upwards.
    pub fn discover(start: impl AsRef<Path>) -> WorkdirResult<Self> {
        let start = real_root(start.as_ref())?;
        let mut dir = Some(start.clone());
        while let Some(candidate) = dir {
            if candidate.as_path().join(META_DIR).is_dir() {
                return Self::open_at(candidate);
            }
            dir = candidate.parent();
        }
        Err(WorkdirError::NotInitialized(start.to_string()))
    }

    fn open_at(root: AbsolutePath) -> WorkdirResult<Self> {
        let meta = root.as_path().join(META_DIR);
        let config = WorkdirConfig::load(&meta.join(CONFIG_FILE))?;
        let store = FsObjectStore::open(meta.join(OBJECTS_DIR))?;

        let base = match read_head(&meta)? {
            Some(id) => SnapshotTree::load(&store, &id)?,
            None => SnapshotTree::empty(),
        };
        let mount = Arc::new(LocalMount::new(root.clone(), META_DIR, base));

        let persistence = FileDirstatePersistence::new(meta.join(&config.dirstate_file))
            .with_fsync(config.persist_fsync);
        let ignore = GitignoreMatcher::from_files(root.as_path(), &config.ignore_files)?;
        let dirstate = Dirstate::open(mount.clone(), Arc::new(persistence), Arc::new(ignore))?;

        debug!(root = %root, "opened working copy");
        Ok(Self {
            root,
            config,
            store,
            mount,
            dirstate,
        })
    }

    pub fn root(&self) -> &AbsolutePath {
        &self.root
    }

    pub fn config(&self) -> &WorkdirConfig {
        &self.config
    }

    pub fn dirstate(&self) -> &Dirstate {
        &self.dirstate
    }

    /// Root tree id of the base snapshot, `None` before the first snapshot.
    pub fn head(&self) -> WorkdirResult<Option<ObjectId>> {
        read_head(&self.root.as_path().join(META_DIR))
    }

    /// Resolve user input, relative to `cwd` unless absolute, to a path
    /// inside this working copy.
    pub fn relativize(&self, path: &str, cwd: &AbsolutePath) -> WorkdirResult<RelativePath> {
        let absolute = canonicalize_with_base(path, cwd);
        absolute
            .relative_to(&self.root)
            .ok_or_else(|| WorkdirError::OutsideRoot(absolute.to_string()))
    }

    // ---- Dirstate operations ----

    pub fn status(&self, list_ignored: bool) -> WorkdirResult<Status> {
        Ok(self.dirstate.status(list_ignored)?)
    }

    pub fn add(&self, paths: &[RelativePath]) -> WorkdirResult<Vec<AddRemoveError>> {
        let mut errors = Vec::new();
        self.dirstate.add_all(paths, &mut errors)?;
        Ok(errors)
    }

    pub fn remove(&self, paths: &[RelativePath], force: bool) -> WorkdirResult<Vec<AddRemoveError>> {
        let mut errors = Vec::new();
        self.dirstate.remove_all(paths, force, &mut errors)?;
        Ok(errors)
    }

    pub fn directives(&self) -> WorkdirResult<DirectiveMap> {
        Ok(self.dirstate.directives()?)
    }

    // ---- Snapshot ----

    /// Commit the working copy: the base plus modified and added files,
    /// minus removed ones. Missing and untracked files are left out of the
    /// decision; a missing file stays in the snapshot with its old content.
    pub fn snapshot(&self) -> WorkdirResult<SnapshotSummary> {
        let status = self.dirstate.status(false)?;
        let base = self.mount.base_snapshot()?;
        let mut next = SnapshotTree::clone(&base);
        let (mut added, mut modified, mut removed) = (0, 0, 0);

        for (path, code) in status.iter() {
            match code {
                StatusCode::Added | StatusCode::Modified => {
                    let (data, mode) = self.mount.read_file(path)?;
                    let id = self.store.write(&Blob::new(data).to_stored_object())?;
                    next.insert(path.clone(), SnapshotEntry::new(id, mode));
                    if code == StatusCode::Added {
                        added += 1;
                    } else {
                        modified += 1;
                    }
                }
                StatusCode::Removed => {
                    next.remove(path);
                    removed += 1;
                }
                _ => {}
            }
        }

        let root_id = next.write(&self.store)?;
        // Pruning only asks whether paths are in `next`, so it can run before
        // HEAD moves. If it fails, HEAD and the directives are both untouched.
        self.dirstate.on_snapshot_changed(&next)?;
        write_head(&self.root.as_path().join(META_DIR), &root_id)?;
        self.mount.set_base(next);

        info!(root = %root_id.short_hex(), added, modified, removed, "snapshot written");
        Ok(SnapshotSummary {
            root_id,
            added,
            modified,
            removed,
        })
    }
}

fn real_root(path: &Path) -> WorkdirResult<AbsolutePath> {
    let s = path
        .to_str()
        .ok_or_else(|| PathError::NonUtf8(path.display().to_string()))?;
    Ok(resolve_real_path(s)?)
}

fn read_head(meta: &Path) -> WorkdirResult<Option<ObjectId>> {
    let text = fs::read_to_string(meta.join(HEAD_FILE))?;
    let hex = text.trim();
    if hex.is_empty() {
        return Ok(None);
    }
    ObjectId::from_hex(hex)
        .map(Some)
        .map_err(|e| WorkdirError::CorruptHead(e.to_string()))
}

fn write_head(meta: &Path, id: &ObjectId) -> WorkdirResult<()> {
    fs::write(meta.join(HEAD_FILE), format!("{}\n", id.to_hex()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ofs_dirstate::Directive;

    fn rel(s: &str) -> RelativePath {
        RelativePath::new(s).unwrap()
    }

    fn write(wd: &Workdir, path: &str, content: &str) {
        let full = wd.root().as_path().join(path);
        if let Some(parent) = full.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(full, content).unwrap();
    }

    fn code(wd: &Workdir, path: &str) -> StatusCode {
        wd.status(true).unwrap().status_for_path(&rel(path))
    }

    #[test]
    fn init_creates_layout() {
        let dir = tempfile::tempdir().unwrap();
        let wd = Workdir::init(dir.path()).unwrap();
        let meta = wd.root().as_path().join(META_DIR);
        assert!(meta.join(OBJECTS_DIR).is_dir());
        assert!(meta.join(CONFIG_FILE).is_file());
        assert_eq!(wd.head().unwrap(), None);
        assert!(wd.status(true).unwrap().is_empty());
    }

    #[test]
    fn init_twice_fails() {
        let dir = tempfile::tempdir().unwrap();
        Workdir::init(dir.path()).unwrap();
        assert!(matches!(Workdir::init(dir.path()), Err(WorkdirError::AlreadyInitialized(_))));
    }

    #[test]
    fn open_requires_init() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(Workdir::open(dir.path()), Err(WorkdirError::NotInitialized(_))));
    }

    #[test]
    fn discover_walks_up() {
        let dir = tempfile::tempdir().unwrap();
        let wd = Workdir::init(dir.path()).unwrap();
        let sub = dir.path().join("a/b");
        fs::create_dir_all(&sub).unwrap();
        let found = Workdir::discover(&sub).unwrap();
        assert_eq!(found.root(), wd.root());
    }

    #[test]
    fn relativize_resolves_against_cwd() {
        let dir = tempfile::tempdir().unwrap();
        let wd = Workdir::init(dir.path()).unwrap();
        let cwd = wd.root().join(&rel("src"));
        assert_eq!(wd.relativize("../README", &cwd).unwrap(), rel("README"));
        assert_eq!(wd.relativize("lib.rs", &cwd).unwrap(), rel("src/lib.rs"));
        assert_eq!(wd.relativize(".", wd.root()).unwrap(), RelativePath::root());
        assert!(matches!(
            wd.relativize("/elsewhere", &cwd),
            Err(WorkdirError::OutsideRoot(_))
        ));
    }

    #[test]
    fn add_snapshot_modify_remove_cycle() {
        let dir = tempfile::tempdir().unwrap();
        let wd = Workdir::init(dir.path()).unwrap();
        write(&wd, "README", "hello");
        write(&wd, "src/lib.rs", "fn main() {}");
        assert_eq!(code(&wd, "README"), StatusCode::NotTracked);

        assert!(wd.add(&[RelativePath::root()]).unwrap().is_empty());
        assert_eq!(code(&wd, "src/lib.rs"), StatusCode::Added);

        let first = wd.snapshot().unwrap();
        assert_eq!(first.added, 2);
        assert_eq!(wd.head().unwrap(), Some(first.root_id));
        assert!(wd.status(true).unwrap().is_empty());
        assert!(wd.directives().unwrap().is_empty());

        write(&wd, "README", "hello again");
        assert_eq!(code(&wd, "README"), StatusCode::Modified);
        let errors = wd.remove(&[rel("README")], false).unwrap();
        assert_eq!(errors.len(), 1);
        assert!(wd.remove(&[rel("README")], true).unwrap().is_empty());
        assert_eq!(code(&wd, "README"), StatusCode::Removed);

        let second = wd.snapshot().unwrap();
        assert_eq!(second.removed, 1);
        assert!(wd.directives().unwrap().is_empty());
        // The file is still on disk but no longer tracked.
        assert_eq!(code(&wd, "README"), StatusCode::NotTracked);
    }

    #[test]
    fn state_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        {
            let wd = Workdir::init(dir.path()).unwrap();
            write(&wd, "kept", "k");
            write(&wd, "pending", "p");
            wd.add(&[rel("kept")]).unwrap();
            wd.snapshot().unwrap();
            wd.add(&[rel("pending")]).unwrap();
        }

        let wd = Workdir::open(dir.path()).unwrap();
        assert_eq!(code(&wd, "kept"), StatusCode::Clean);
        assert_eq!(code(&wd, "pending"), StatusCode::Added);
        assert_eq!(wd.directives().unwrap().get(&rel("pending")), Some(&Directive::Add));
    }

    #[test]
    fn ignore_files_are_honoured() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(".gitignore"), "*.log\n").unwrap();
        let wd = Workdir::init(dir.path()).unwrap();
        write(&wd, "app.log", "noise");
        write(&wd, "main.rs", "code");

        let hidden = wd.status(false).unwrap();
        assert_eq!(hidden.status_for_path(&rel("app.log")), StatusCode::Clean);
        assert_eq!(hidden.status_for_path(&rel("main.rs")), StatusCode::NotTracked);
        assert_eq!(code(&wd, "app.log"), StatusCode::Ignored);

        wd.add(&[RelativePath::root()]).unwrap();
        let added: Vec<_> = wd.directives().unwrap().into_keys().collect();
        assert_eq!(added, vec![rel(".gitignore"), rel("main.rs")]);
    }

    #[test]
    fn missing_file_stays_in_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let wd = Workdir::init(dir.path()).unwrap();
        write(&wd, "f", "f");
        wd.add(&[rel("f")]).unwrap();
        wd.snapshot().unwrap();

        fs::remove_file(wd.root().as_path().join("f")).unwrap();
        assert_eq!(code(&wd, "f"), StatusCode::Missing);
        let summary = wd.snapshot().unwrap();
        assert_eq!(summary.changed(), 0);
        assert_eq!(code(&wd, "f"), StatusCode::Missing);
    }

    #[test]
    fn failed_directive_save_leaves_snapshot_retryable() {
        let dir = tempfile::tempdir().unwrap();
        let wd = Workdir::init(dir.path()).unwrap();
        write(&wd, "a", "a");
        assert!(wd.add(&[rel("a")]).unwrap().is_empty());

        // A non-empty directory where the dirstate file goes makes the save fail.
        let dirstate = wd.root().as_path().join(META_DIR).join("dirstate");
        fs::remove_file(&dirstate).unwrap();
        fs::create_dir_all(dirstate.join("blocker")).unwrap();

        assert!(wd.snapshot().is_err());
        assert_eq!(wd.head().unwrap(), None);
        assert_eq!(code(&wd, "a"), StatusCode::Added);

        fs::remove_dir_all(&dirstate).unwrap();
        let summary = wd.snapshot().unwrap();
        assert_eq!(summary.added, 1);
        assert_eq!(wd.head().unwrap(), Some(summary.root_id));
        assert!(wd.directives().unwrap().is_empty());
        assert_eq!(code(&wd, "a"), StatusCode::Clean);
    }

    #[test]
    fn corrupt_head_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let wd = Workdir::init(dir.path()).unwrap();
        fs::write(wd.root().as_path().join(META_DIR).join(HEAD_FILE), "not hex").unwrap();
        assert!(matches!(Workdir::open(dir.path()), Err(WorkdirError::CorruptHead(_))));
    }
}
