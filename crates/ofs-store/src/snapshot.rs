//! Flattened view of a committed root tree.
//!
//! Trees are stored one directory level at a time. Status classification
//! wants the opposite shape: a direct `path -> (content id, mode)` lookup and
//! cheap membership checks. [`SnapshotTree`] is that view.

use std::cmp::Reverse;
use std::collections::BTreeMap;

use ofs_types::{ObjectId, RelativePath};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::object::{EntryMode, Tree, TreeEntry};
use crate::traits::ObjectStore;

/// Committed content and mode of one file.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotEntry {
    /// Id of the blob holding the content.
    pub object_id: ObjectId,
    /// Regular, executable or symlink.
    pub mode: EntryMode,
}

impl SnapshotEntry {
    pub fn new(object_id: ObjectId, mode: EntryMode) -> Self {
        Self { object_id, mode }
    }
}

/// All files of a base commit, keyed by canonical path.
///
/// Directories are implicit: a directory exists when some file lies below it.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SnapshotTree {
    root_id: Option<ObjectId>,
    files: BTreeMap<RelativePath, SnapshotEntry>,
}

impl SnapshotTree {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a snapshot that has not been written to a store yet.
    pub fn from_entries(entries: impl IntoIterator<Item = (RelativePath, SnapshotEntry)>) -> Self {
        Self {
            root_id: None,
            files: entries.into_iter().collect(),
        }
    }

    /// Load and flatten the tree rooted at `root`.
    pub fn load(store: &dyn ObjectStore, root: &ObjectId) -> StoreResult<Self> {
        let mut files = BTreeMap::new();
        let mut pending = vec![(RelativePath::root(), *root)];

        while let Some((dir, tree_id)) = pending.pop() {
            let stored = store.read(&tree_id)?.ok_or(StoreError::NotFound(tree_id))?;
            let tree = Tree::from_stored_object(&stored)?;
            for entry in tree.entries {
                let path = dir.join(&entry.name)?;
                if entry.mode.is_file() {
                    files.insert(path, SnapshotEntry::new(entry.object_id, entry.mode));
                } else {
                    pending.push((path, entry.object_id));
                }
            }
        }

        debug!(root = %root.short_hex(), files = files.len(), "snapshot loaded");
        Ok(Self {
            root_id: Some(*root),
            files,
        })
    }

    /// Write one tree object per directory, deepest first, and return the
    /// root tree id. Blob contents must already be in the store.
    pub fn write(&mut self, store: &dyn ObjectStore) -> StoreResult<ObjectId> {
        let mut dirs: BTreeMap<RelativePath, Vec<TreeEntry>> = BTreeMap::new();
        dirs.insert(RelativePath::root(), Vec::new());
        for (path, entry) in &self.files {
            let parent = path.parent().unwrap_or_default();
            dirs.entry(parent.clone())
                .or_default()
                .push(TreeEntry::new(entry.mode, path.file_name(), entry.object_id));
            let mut ancestor = parent;
            while let Some(up) = ancestor.parent() {
                dirs.entry(up.clone()).or_default();
                ancestor = up;
            }
        }

        let mut order: Vec<RelativePath> = dirs.keys().cloned().collect();
        order.sort_by_key(|dir| Reverse(dir.components().count()));

        let mut root_id = None;
        for dir in order {
            let entries = dirs.remove(&dir).unwrap_or_default();
            let id = store.write(&Tree::new(entries).to_stored_object()?)?;
            match dir.parent() {
                Some(parent) => {
                    if let Some(siblings) = dirs.get_mut(&parent) {
                        siblings.push(TreeEntry::new(EntryMode::Directory, dir.file_name(), id));
                    }
                }
                None => root_id = Some(id),
            }
        }

        let root_id = root_id.ok_or_else(|| StoreError::Serialization("no root tree written".into()))?;
        self.root_id = Some(root_id);
        Ok(root_id)
    }

    /// Id of the stored root tree, if this snapshot was loaded or written.
    pub fn root_id(&self) -> Option<ObjectId> {
        self.root_id
    }

    pub fn get(&self, path: &RelativePath) -> Option<&SnapshotEntry> {
        self.files.get(path)
    }

    /// True if the snapshot tracks a file at `path`.
    pub fn contains(&self, path: &RelativePath) -> bool {
        self.files.contains_key(path)
    }

    /// True if some tracked file lies below `path`.
    pub fn is_dir(&self, path: &RelativePath) -> bool {
        self.files_under(path).next().is_some()
    }

    /// Tracked files strictly below `dir`, in path order.
    pub fn files_under<'a>(
        &'a self,
        dir: &'a RelativePath,
    ) -> impl Iterator<Item = (&'a RelativePath, &'a SnapshotEntry)> + 'a {
        let prefix = if dir.is_root() {
            String::new()
        } else {
            format!("{dir}/")
        };
        self.files
            .range::<str, _>((std::ops::Bound::Included(prefix.as_str()), std::ops::Bound::Unbounded))
            .take_while(move |(path, _)| path.is_descendant_of(dir))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&RelativePath, &SnapshotEntry)> {
        self.files.iter()
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Track `path` with new content. Clears the stored root id.
    pub fn insert(&mut self, path: RelativePath, entry: SnapshotEntry) {
        self.root_id = None;
        self.files.insert(path, entry);
    }

    /// Stop tracking `path`. Clears the stored root id.
    pub fn remove(&mut self, path: &RelativePath) -> Option<SnapshotEntry> {
        self.root_id = None;
        self.files.remove(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryObjectStore;
    use crate::object::Blob;

    fn rel(s: &str) -> RelativePath {
        RelativePath::new(s).unwrap()
    }

    fn file(content: &[u8]) -> SnapshotEntry {
        SnapshotEntry::new(Blob::id_for(content), EntryMode::Regular)
    }

    fn sample() -> SnapshotTree {
        SnapshotTree::from_entries([
            (rel("README"), file(b"readme")),
            (rel("src/lib.rs"), file(b"lib")),
            (rel("src/bin/main.rs"), file(b"main")),
            (rel("src.txt"), file(b"not in src")),
        ])
    }

    #[test]
    fn write_then_load_preserves_files() {
        let store = InMemoryObjectStore::new();
        let mut snapshot = sample();
        let root = snapshot.write(&store).unwrap();
        assert_eq!(snapshot.root_id(), Some(root));

        let loaded = SnapshotTree::load(&store, &root).unwrap();
        assert_eq!(loaded, snapshot);
        assert_eq!(loaded.get(&rel("src/bin/main.rs")), Some(&file(b"main")));
    }

    #[test]
    fn nested_directories_become_tree_entries() {
        let store = InMemoryObjectStore::new();
        let root = sample().write(&store).unwrap();
        let stored = store.read(&root).unwrap().unwrap();
        let top = Tree::from_stored_object(&stored).unwrap();
        assert_eq!(top.get("src").unwrap().mode, EntryMode::Directory);
        assert_eq!(top.get("README").unwrap().mode, EntryMode::Regular);
        assert_eq!(top.len(), 3);
    }

    #[test]
    fn empty_snapshot_writes_empty_root() {
        let store = InMemoryObjectStore::new();
        let mut snapshot = SnapshotTree::empty();
        let root = snapshot.write(&store).unwrap();
        assert!(SnapshotTree::load(&store, &root).unwrap().is_empty());
    }

    #[test]
    fn load_reports_missing_tree() {
        let store = InMemoryObjectStore::new();
        let missing = ObjectId::from_bytes(b"no tree");
        assert!(matches!(
            SnapshotTree::load(&store, &missing),
            Err(StoreError::NotFound(id)) if id == missing
        ));
    }

    #[test]
    fn files_under_respects_component_boundaries() {
        let snapshot = sample();
        let src_dir = rel("src");
        let under_src: Vec<_> = snapshot.files_under(&src_dir).map(|(p, _)| p.as_str()).collect();
        assert_eq!(under_src, vec!["src/bin/main.rs", "src/lib.rs"]);
        assert_eq!(snapshot.files_under(&RelativePath::root()).count(), 4);
        assert!(snapshot.is_dir(&rel("src/bin")));
        assert!(!snapshot.is_dir(&rel("src/lib.rs")));
        assert!(snapshot.contains(&rel("src.txt")));
    }

    #[test]
    fn mutation_clears_root_id() {
        let store = InMemoryObjectStore::new();
        let mut snapshot = sample();
        snapshot.write(&store).unwrap();
        snapshot.remove(&rel("README"));
        assert_eq!(snapshot.root_id(), None);
        assert_eq!(snapshot.len(), 3);
    }
}
