//! Durable storage for the directive table.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{PoisonError, RwLock};

use ofs_types::RelativePath;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::{debug, warn};

use crate::directive::{Directive, DirectiveMap};
use crate::error::{DirstateError, DirstateResult};

/// Where the directive table survives restarts.
///
/// `save` receives the complete table every time; implementations replace
/// whatever they held before.
pub trait DirstatePersistence: Send + Sync {
    fn load(&self) -> DirstateResult<DirectiveMap>;
    fn save(&self, directives: &DirectiveMap) -> DirstateResult<()>;
}

/// Keeps the last saved table in memory and counts saves.
#[derive(Debug, Default)]
pub struct InMemoryDirstatePersistence {
    saved: RwLock<DirectiveMap>,
    saves: AtomicUsize,
}

impl InMemoryDirstatePersistence {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_directives(directives: DirectiveMap) -> Self {
        Self {
            saved: RwLock::new(directives),
            saves: AtomicUsize::new(0),
        }
    }

    /// The table as of the last `save`.
    pub fn saved(&self) -> DirectiveMap {
        self.saved.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }
}

impl DirstatePersistence for InMemoryDirstatePersistence {
    fn load(&self) -> DirstateResult<DirectiveMap> {
        Ok(self.saved())
    }

    fn save(&self, directives: &DirectiveMap) -> DirstateResult<()> {
        *self.saved.write().unwrap_or_else(PoisonError::into_inner) = directives.clone();
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

const FORMAT_VERSION: u32 = 1;

#[derive(Serialize, Deserialize)]
struct DirstateFile {
    version: u32,
    directives: Vec<(RelativePath, Directive)>,
}

/// Bincode-encoded table in a single file, replaced atomically on save.
#[derive(Debug, Clone)]
pub struct FileDirstatePersistence {
    path: PathBuf,
    fsync: bool,
}

impl FileDirstatePersistence {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            fsync: true,
        }
    }

    /// Skip `fsync` before the rename. Faster, but a crash may lose the last save.
    pub fn with_fsync(mut self, fsync: bool) -> Self {
        self.fsync = fsync;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl DirstatePersistence for FileDirstatePersistence {
    fn load(&self) -> DirstateResult<DirectiveMap> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "no dirstate file, starting empty");
                return Ok(DirectiveMap::new());
            }
            Err(e) => return Err(e.into()),
        };

        let file: DirstateFile = bincode::deserialize(&bytes).map_err(|e| {
            DirstateError::Persistence(format!("{}: {e}", self.path.display()))
        })?;
        if file.version != FORMAT_VERSION {
            return Err(DirstateError::Persistence(format!(
                "{}: unsupported format version {}",
                self.path.display(),
                file.version
            )));
        }

        debug!(path = %self.path.display(), directives = file.directives.len(), "dirstate loaded");
        Ok(file.directives.into_iter().collect())
    }

    fn save(&self, directives: &DirectiveMap) -> DirstateResult<()> {
        let file = DirstateFile {
            version: FORMAT_VERSION,
            directives: directives.iter().map(|(p, d)| (p.clone(), *d)).collect(),
        };
        let bytes = bincode::serialize(&file)
            .map_err(|e| DirstateError::Persistence(e.to_string()))?;

        let dir = match self.path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };
        fs::create_dir_all(dir)?;

        let mut tmp = NamedTempFile::new_in(dir)?;
        tmp.write_all(&bytes)?;
        if self.fsync {
            tmp.as_file().sync_all()?;
        }
        tmp.persist(&self.path).map_err(|e| {
            warn!(path = %self.path.display(), error = %e.error, "dirstate rename failed");
            DirstateError::Io(e.error)
        })?;

        debug!(path = %self.path.display(), directives = directives.len(), "dirstate saved");
        Ok(())
    }
}
