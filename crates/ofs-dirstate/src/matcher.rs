//! Ignore rules consulted when classifying untracked files.

use std::path::Path;

use ::ignore::gitignore::{Gitignore, GitignoreBuilder};
use ofs_types::RelativePath;
use tracing::debug;

use crate::error::{DirstateError, DirstateResult};

/// Decides whether an untracked path should be reported as ignored.
pub trait IgnoreMatcher: Send + Sync {
    fn is_ignored(&self, path: &RelativePath, is_dir: bool) -> bool;
}

/// Ignores nothing.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoIgnore;

impl IgnoreMatcher for NoIgnore {
    fn is_ignored(&self, _path: &RelativePath, _is_dir: bool) -> bool {
        false
    }
}

/// Gitignore-syntax rules rooted at the working copy.
///
/// A path is ignored when it or any of its parent directories matches.
#[derive(Clone, Debug)]
pub struct GitignoreMatcher {
    rules: Gitignore,
}

impl GitignoreMatcher {
    /// Load every file in `names` that exists directly under `root`.
    /// Missing files are skipped.
    pub fn from_files(root: &Path, names: &[String]) -> DirstateResult<Self> {
        let mut builder = GitignoreBuilder::new(root);
        for name in names {
            let file = root.join(name);
            if !file.is_file() {
                continue;
            }
            if let Some(err) = builder.add(&file) {
                return Err(DirstateError::Ignore(format!("{}: {err}", file.display())));
            }
            debug!(file = %file.display(), "loaded ignore rules");
        }
        let rules = builder
            .build()
            .map_err(|e| DirstateError::Ignore(e.to_string()))?;
        Ok(Self { rules })
    }

    /// Build from in-memory gitignore lines.
    pub fn from_patterns(root: &Path, patterns: &[&str]) -> DirstateResult<Self> {
        let mut builder = GitignoreBuilder::new(root);
        for line in patterns {
            builder
                .add_line(None, line)
                .map_err(|e| DirstateError::Ignore(e.to_string()))?;
        }
        let rules = builder
            .build()
            .map_err(|e| DirstateError::Ignore(e.to_string()))?;
        Ok(Self { rules })
    }

    pub fn num_rules(&self) -> u64 {
        self.rules.num_ignores()
    }
}

impl IgnoreMatcher for GitignoreMatcher {
    fn is_ignored(&self, path: &RelativePath, is_dir: bool) -> bool {
        if path.is_root() {
            return false;
        }
        self.rules
            .matched_path_or_any_parents(path.as_str(), is_dir)
            .is_ignore()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rel(s: &str) -> RelativePath {
        RelativePath::new(s).unwrap()
    }

    #[test]
    fn no_ignore_matches_nothing() {
        assert!(!NoIgnore.is_ignored(&rel("anything.log"), false));
    }

    #[test]
    fn patterns_match_files_and_parents() {
        let matcher = GitignoreMatcher::from_patterns(Path::new("/work"), &["*.log", "build/", "!keep.log"])
            .unwrap();
        assert!(matcher.is_ignored(&rel("debug.log"), false));
        assert!(matcher.is_ignored(&rel("sub/trace.log"), false));
        assert!(matcher.is_ignored(&rel("build/out.o"), false));
        assert!(!matcher.is_ignored(&rel("keep.log"), false));
        assert!(!matcher.is_ignored(&rel("src/main.rs"), false));
        assert!(!matcher.is_ignored(&RelativePath::root(), true));
    }

    #[test]
    fn loads_existing_files_and_skips_missing_ones() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(".gitignore"), "target/\n*.tmp\n").unwrap();
        let matcher = GitignoreMatcher::from_files(
            dir.path(),
            &[".gitignore".to_string(), ".ofsignore".to_string()],
        )
        .unwrap();
        assert_eq!(matcher.num_rules(), 2);
        assert!(matcher.is_ignored(&rel("target/debug/app"), false));
        assert!(matcher.is_ignored(&rel("scratch.tmp"), false));
        assert!(!matcher.is_ignored(&rel("Cargo.toml"), false));
    }
}
