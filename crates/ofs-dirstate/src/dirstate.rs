//! The dirstate engine.
//!
//! [`Dirstate`] owns the directive table and nothing else. The overlay, the
//! base snapshot, ignore rules and durable storage all come from injected
//! collaborators, so one engine can sit behind an in-memory mount in tests
//! and a real directory walk in the CLI.
//!
//! Every mutation works on a copy of the table while holding its write lock,
//! saves the copy, and only then swaps it in. A failed save leaves the
//! in-memory table exactly as it was. Disk lookups happen before the lock is
//! taken.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use ofs_store::{SnapshotEntry, SnapshotTree};
use ofs_types::RelativePath;
use tracing::{debug, info};

use crate::directive::{AddRemoveError, Directive, DirectiveMap, DirectiveTable};
use crate::error::DirstateResult;
use crate::matcher::IgnoreMatcher;
use crate::mount::{DiskEntry, Mount};
use crate::persistence::DirstatePersistence;
use crate::status::{Status, StatusCode};

/// Tracks pending adds and removes against one mount and answers status
/// queries. Safe to share across threads.
pub struct Dirstate {
    mount: Arc<dyn Mount>,
    persistence: Arc<dyn DirstatePersistence>,
    ignore: Arc<dyn IgnoreMatcher>,
    directives: DirectiveTable,
}

impl std::fmt::Debug for Dirstate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dirstate")
            .field("directives", &self.directives.len().ok())
            .finish_non_exhaustive()
    }
}

impl Dirstate {
    /// Build an engine around an already populated directive table.
    pub fn new(
        mount: Arc<dyn Mount>,
        directives: DirectiveTable,
        persistence: Arc<dyn DirstatePersistence>,
        ignore: Arc<dyn IgnoreMatcher>,
    ) -> Self {
        Self {
            mount,
            persistence,
            ignore,
            directives,
        }
    }

    /// Build an engine whose table is whatever `persistence` last saved.
    pub fn open(
        mount: Arc<dyn Mount>,
        persistence: Arc<dyn DirstatePersistence>,
        ignore: Arc<dyn IgnoreMatcher>,
    ) -> DirstateResult<Self> {
        let directives = DirectiveTable::load(persistence.as_ref())?;
        debug!(directives = directives.len()?, "dirstate opened");
        Ok(Self::new(mount, directives, persistence, ignore))
    }

    /// A point-in-time copy of the directive table.
    pub fn directives(&self) -> DirstateResult<DirectiveMap> {
        self.directives.snapshot()
    }

    // ---------------------------------------------------------------
    // Status
    // ---------------------------------------------------------------

    /// Classify every path that is not clean.
    ///
    /// Untracked paths matched by the ignore rules are reported as
    /// [`StatusCode::Ignored`] when `list_ignored` is set and omitted
    /// otherwise. The whole pass sees one copy of the directive table.
    pub fn status(&self, list_ignored: bool) -> DirstateResult<Status> {
        let directives = self.directives.snapshot()?;
        let base = self.mount.base_snapshot()?;
        let overlay = self.mount.overlay_paths()?;

        let candidates: BTreeSet<RelativePath> = overlay
            .into_iter()
            .chain(directives.keys().cloned())
            .collect();

        let mut statuses = HashMap::new();
        for path in candidates {
            let disk = self.mount.lookup(&path)?;
            let code = match classify(base.get(&path), disk.as_ref(), directives.get(&path).copied()) {
                StatusCode::Clean => continue,
                StatusCode::NotTracked if self.ignore.is_ignored(&path, false) => {
                    if !list_ignored {
                        continue;
                    }
                    StatusCode::Ignored
                }
                code => code,
            };
            statuses.insert(path, code);
        }

        debug!(
            paths = statuses.len(),
            directives = directives.len(),
            list_ignored,
            "status computed"
        );
        Ok(Status::new(statuses))
    }

    // ---------------------------------------------------------------
    // Add
    // ---------------------------------------------------------------

    /// Start tracking `paths`.
    ///
    /// Directories expand to their untracked, non-ignored files. Tracked
    /// files are left alone, except that a pending removal is cancelled. A
    /// path with nothing on disk records an error and the batch continues.
    pub fn add_all(
        &self,
        paths: &[RelativePath],
        errors: &mut Vec<AddRemoveError>,
    ) -> DirstateResult<()> {
        if paths.is_empty() {
            return Ok(());
        }

        // Disk lookups happen before the table is locked.
        let base = self.mount.base_snapshot()?;
        let mut overlay: Option<Vec<RelativePath>> = None;
        let mut targets = BTreeSet::new();
        for path in paths {
            match self.mount.lookup(path)? {
                None => errors.push(AddRemoveError::no_such_file(path)),
                Some(DiskEntry::File { .. }) => {
                    targets.insert(path.clone());
                }
                Some(DiskEntry::Directory) => {
                    if overlay.is_none() {
                        overlay = Some(self.mount.overlay_paths()?);
                    }
                    for candidate in overlay.iter().flatten() {
                        if !candidate.is_descendant_of(path)
                            || base.contains(candidate)
                            || self.ignore.is_ignored(candidate, false)
                        {
                            continue;
                        }
                        if matches!(self.mount.lookup(candidate)?, Some(DiskEntry::File { .. })) {
                            targets.insert(candidate.clone());
                        }
                    }
                }
            }
        }

        let mut table = self.directives.write()?;
        // Re-read under the lock: a snapshot transition may have landed.
        let base = self.mount.base_snapshot()?;
        let mut next = table.clone();
        for path in targets {
            if base.contains(&path) {
                if next.get(&path) == Some(&Directive::Remove) {
                    next.remove(&path);
                }
            } else {
                next.insert(path, Directive::Add);
            }
        }

        if next != *table {
            self.persistence.save(&next)?;
            info!(before = table.len(), after = next.len(), "add applied");
            *table = next;
        }
        Ok(())
    }

    // ---------------------------------------------------------------
    // Remove
    // ---------------------------------------------------------------

    /// Stop tracking `paths`.
    ///
    /// A directory expands to every tracked file below it. Each failure is
    /// recorded in `errors` and the rest of the batch still runs; whatever
    /// succeeded is persisted before returning.
    pub fn remove_all(
        &self,
        paths: &[RelativePath],
        force: bool,
        errors: &mut Vec<AddRemoveError>,
    ) -> DirstateResult<()> {
        if paths.is_empty() {
            return Ok(());
        }

        // Expansion and disk lookups run against copies, before the lock.
        let base = self.mount.base_snapshot()?;
        let pending = self.directives.snapshot()?;
        let mut plan = Vec::with_capacity(paths.len());
        for path in paths {
            let disk = self.mount.lookup(path)?;
            let tracked_file = base.contains(path) || pending.get(path) == Some(&Directive::Add);
            let is_dir = !tracked_file
                && (matches!(disk, Some(DiskEntry::Directory))
                    || base.is_dir(path)
                    || pending.keys().any(|p| p.is_descendant_of(path)));
            if !is_dir {
                plan.push(RemoveTarget::File(path.clone(), disk));
                continue;
            }

            let targets: BTreeSet<RelativePath> = base
                .files_under(path)
                .map(|(p, _)| p.clone())
                .chain(
                    pending
                        .iter()
                        .filter(|(p, d)| **d == Directive::Add && p.is_descendant_of(path))
                        .map(|(p, _)| p.clone()),
                )
                .collect();
            let mut files = Vec::with_capacity(targets.len());
            for target in targets {
                let disk = self.mount.lookup(&target)?;
                files.push((target, disk));
            }
            plan.push(RemoveTarget::Directory(path.clone(), files));
        }

        let mut table = self.directives.write()?;
        // Re-read under the lock: a snapshot transition may have landed.
        let base = self.mount.base_snapshot()?;
        let mut next = table.clone();
        for target in &plan {
            match target {
                RemoveTarget::File(path, disk) => {
                    if let Err(err) = remove_one(&base, &mut next, path, disk.as_ref(), force) {
                        errors.push(err);
                    }
                }
                RemoveTarget::Directory(path, files) if files.is_empty() => {
                    errors.push(AddRemoveError::no_tracked_files(path));
                }
                RemoveTarget::Directory(_, files) => {
                    for (path, disk) in files {
                        if let Err(err) = remove_one(&base, &mut next, path, disk.as_ref(), force) {
                            errors.push(err);
                        }
                    }
                }
            }
        }

        if next != *table {
            self.persistence.save(&next)?;
            info!(before = table.len(), after = next.len(), force, "remove applied");
            *table = next;
        }
        Ok(())
    }

    // ---------------------------------------------------------------
    // Snapshot transition
    // ---------------------------------------------------------------

    /// Drop directives that `new_base` already reflects: adds of paths it
    /// now tracks and removes of paths it no longer tracks.
    pub fn on_snapshot_changed(&self, new_base: &SnapshotTree) -> DirstateResult<()> {
        let mut table = self.directives.write()?;
        let mut next = table.clone();
        next.retain(|path, directive| match directive {
            Directive::Add => !new_base.contains(path),
            Directive::Remove => new_base.contains(path),
        });

        self.persistence.save(&next)?;
        info!(
            dropped = table.len() - next.len(),
            kept = next.len(),
            "directives reconciled with new snapshot"
        );
        *table = next;
        Ok(())
    }
}

/// Status of one path from its committed entry, its on-disk entry and its
/// pending directive.
fn classify(
    base: Option<&SnapshotEntry>,
    disk: Option<&DiskEntry>,
    directive: Option<Directive>,
) -> StatusCode {
    let on_disk = disk.filter(|entry| entry.is_file());
    match (base, on_disk) {
        (Some(_), _) if directive == Some(Directive::Remove) => StatusCode::Removed,
        (Some(committed), Some(entry)) if entry.matches(committed) => StatusCode::Clean,
        (Some(_), Some(_)) => StatusCode::Modified,
        (Some(_), None) => StatusCode::Missing,
        (None, Some(_)) if directive == Some(Directive::Add) => StatusCode::Added,
        (None, Some(_)) => StatusCode::NotTracked,
        (None, None) if directive == Some(Directive::Add) => StatusCode::Missing,
        (None, None) => StatusCode::Clean,
    }
}

/// One argument of a remove batch, resolved before the table is locked.
enum RemoveTarget {
    File(RelativePath, Option<DiskEntry>),
    /// A directory and the tracked files found below it.
    Directory(RelativePath, Vec<(RelativePath, Option<DiskEntry>)>),
}

/// Single-path removal against the working copy of the table.
fn remove_one(
    base: &SnapshotTree,
    next: &mut DirectiveMap,
    path: &RelativePath,
    disk: Option<&DiskEntry>,
    force: bool,
) -> Result<(), AddRemoveError> {
    let Some(committed) = base.get(path) else {
        return match next.get(path) {
            Some(Directive::Add) => {
                next.remove(path);
                Ok(())
            }
            _ => Err(AddRemoveError::not_tracked(path)),
        };
    };

    let dirty = disk.is_some_and(|entry| entry.is_file() && !entry.matches(committed));
    if dirty && !force {
        return Err(AddRemoveError::uncommitted_changes(path));
    }
    next.insert(path.clone(), Directive::Remove);
    Ok(())
}
