//! Canonical path values and lexical path canonicalization.
//!
//! Every path that reaches the status engine is first reduced to one
//! unambiguous normal form: no `.` or `..` components, no empty components,
//! no doubled or trailing separators. [`RelativePath`] and [`AbsolutePath`]
//! can only be constructed in that form, so equality and ordering are plain
//! string comparisons.
//!
//! Canonicalization here is purely lexical. Symlinks are not followed; use
//! [`resolve_real_path`] when the on-disk answer is required.

use std::borrow::Borrow;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::PathError;

/// The only path separator understood by this crate.
pub const SEPARATOR: char = '/';

fn invalid(path: &str, reason: &'static str) -> PathError {
    PathError::Invalid {
        path: path.to_string(),
        reason,
    }
}

fn check_components(path: &str, body: &str) -> Result<(), PathError> {
    for component in body.split(SEPARATOR) {
        match component {
            "" => return Err(invalid(path, "empty path component")),
            "." | ".." => return Err(invalid(path, "'.' and '..' components are not allowed")),
            _ => {}
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// RelativePath
// ---------------------------------------------------------------------------

/// A canonical path relative to the working copy root.
///
/// The empty path names the root itself.
#[derive(Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RelativePath(String);

impl RelativePath {
    /// The working copy root (the empty path).
    pub fn root() -> Self {
        Self(String::new())
    }

    /// Validate an already-canonical relative path.
    pub fn new(path: impl Into<String>) -> Result<Self, PathError> {
        let path = path.into();
        if path.is_empty() {
            return Ok(Self(path));
        }
        if path.starts_with(SEPARATOR) {
            return Err(invalid(&path, "relative path must not start with '/'"));
        }
        check_components(&path, &path)?;
        Ok(Self(path))
    }

    /// Lexically normalize user input such as `"a/./b//c/"`.
    ///
    /// Fails if the input is absolute or climbs above the root.
    pub fn normalize(path: &str) -> Result<Self, PathError> {
        let data = CanonicalData::parse(path);
        if data.is_absolute {
            return Err(invalid(path, "relative path must not start with '/'"));
        }
        if data.components.first() == Some(&"..") {
            return Err(invalid(path, "path escapes the working copy root"));
        }
        Ok(Self(data.components.join("/")))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    pub fn components(&self) -> impl Iterator<Item = &str> {
        self.0.split(SEPARATOR).filter(|c| !c.is_empty())
    }

    /// Append one or more canonical components.
    pub fn join(&self, tail: &str) -> Result<Self, PathError> {
        if self.is_root() {
            return Self::new(tail);
        }
        if tail.is_empty() {
            return Ok(self.clone());
        }
        Self::new(format!("{}{SEPARATOR}{tail}", self.0))
    }

    /// The containing directory, or `None` for the root.
    pub fn parent(&self) -> Option<Self> {
        if self.is_root() {
            return None;
        }
        Some(Self(dirname(&self.0).to_string()))
    }

    pub fn file_name(&self) -> &str {
        basename(&self.0)
    }

    /// True if `self` lies strictly below `dir`.
    pub fn is_descendant_of(&self, dir: &RelativePath) -> bool {
        if dir.is_root() {
            return !self.is_root();
        }
        self.0.len() > dir.0.len()
            && self.0.starts_with(dir.as_str())
            && self.0.as_bytes()[dir.0.len()] == b'/'
    }
}

impl fmt::Debug for RelativePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RelativePath({:?})", self.0)
    }
}

impl fmt::Display for RelativePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for RelativePath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for RelativePath {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for RelativePath {
    type Error = PathError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl TryFrom<&str> for RelativePath {
    type Error = PathError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl FromStr for RelativePath {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl From<RelativePath> for String {
    fn from(path: RelativePath) -> Self {
        path.0
    }
}

// ---------------------------------------------------------------------------
// AbsolutePath
// ---------------------------------------------------------------------------

/// A canonical path starting at the filesystem root. The root is `"/"`.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AbsolutePath(String);

impl AbsolutePath {
    pub fn root() -> Self {
        Self(SEPARATOR.to_string())
    }

    /// Validate an already-canonical absolute path.
    pub fn new(path: impl Into<String>) -> Result<Self, PathError> {
        let path = path.into();
        let Some(body) = path.strip_prefix(SEPARATOR) else {
            return Err(invalid(&path, "absolute path must start with '/'"));
        };
        if !body.is_empty() {
            check_components(&path, body)?;
        }
        Ok(Self(path))
    }

    fn from_components(parts: &[&str]) -> Self {
        if parts.is_empty() {
            return Self::root();
        }
        let mut value = String::with_capacity(parts.iter().map(|p| p.len() + 1).sum());
        for part in parts {
            value.push(SEPARATOR);
            value.push_str(part);
        }
        Self(value)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn as_path(&self) -> &Path {
        Path::new(&self.0)
    }

    pub fn is_root(&self) -> bool {
        self.0.len() == 1
    }

    pub fn components(&self) -> impl Iterator<Item = &str> {
        self.0.split(SEPARATOR).filter(|c| !c.is_empty())
    }

    pub fn join(&self, tail: &RelativePath) -> Self {
        if tail.is_root() {
            return self.clone();
        }
        if self.is_root() {
            return Self(format!("{SEPARATOR}{tail}"));
        }
        Self(format!("{}{SEPARATOR}{tail}", self.0))
    }

    /// Express `self` relative to `base`, if it lies at or below `base`.
    pub fn relative_to(&self, base: &AbsolutePath) -> Option<RelativePath> {
        if self == base {
            return Some(RelativePath::root());
        }
        let rest = if base.is_root() {
            self.0.strip_prefix(SEPARATOR)?
        } else {
            self.0.strip_prefix(base.as_str())?.strip_prefix(SEPARATOR)?
        };
        Some(RelativePath(rest.to_string()))
    }

    pub fn parent(&self) -> Option<Self> {
        if self.is_root() {
            return None;
        }
        match dirname(&self.0) {
            "" => Some(Self::root()),
            dir => Some(Self(dir.to_string())),
        }
    }

    pub fn file_name(&self) -> &str {
        basename(&self.0)
    }
}

impl fmt::Debug for AbsolutePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AbsolutePath({:?})", self.0)
    }
}

impl fmt::Display for AbsolutePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<Path> for AbsolutePath {
    fn as_ref(&self) -> &Path {
        self.as_path()
    }
}

impl TryFrom<String> for AbsolutePath {
    type Error = PathError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<AbsolutePath> for String {
    fn from(path: AbsolutePath) -> Self {
        path.0
    }
}

// ---------------------------------------------------------------------------
// Canonicalization
// ---------------------------------------------------------------------------

/// Components of a path after `.`, empty and cancellable `..` parts are gone.
///
/// A relative result may still begin with a single `..`; an absolute one
/// never contains `..` because the root cannot be climbed above.
struct CanonicalData<'a> {
    components: Vec<&'a str>,
    is_absolute: bool,
}

impl<'a> CanonicalData<'a> {
    fn parse(path: &'a str) -> Self {
        // A leading "//" is treated like a single "/".
        let is_absolute = path.starts_with(SEPARATOR);
        let mut components: Vec<&'a str> = Vec::new();
        for component in path.split(SEPARATOR) {
            match component {
                "" | "." => {}
                ".." => match components.last() {
                    Some(&last) if last != ".." => {
                        components.pop();
                    }
                    None if !is_absolute => components.push(".."),
                    // At the root, or after a `..` that was already kept.
                    _ => {}
                },
                other => components.push(other),
            }
        }
        Self {
            components,
            is_absolute,
        }
    }

    fn resolve_against(self, base: &AbsolutePath) -> AbsolutePath {
        if self.is_absolute {
            return AbsolutePath::from_components(&self.components);
        }
        let mut parts: Vec<&str> = base.components().collect();
        for (idx, component) in self.components.iter().enumerate() {
            if *component == ".." {
                parts.pop();
            } else {
                // Only leading components can be "..".
                parts.extend_from_slice(&self.components[idx..]);
                break;
            }
        }
        AbsolutePath::from_components(&parts)
    }
}

/// Canonicalize `path`, resolving relative input against the process
/// working directory.
///
/// The working directory is only consulted when `path` is relative; that
/// lookup is the only way this can fail.
pub fn canonicalize(path: &str) -> Result<AbsolutePath, PathError> {
    let data = CanonicalData::parse(path);
    if data.is_absolute {
        return Ok(AbsolutePath::from_components(&data.components));
    }
    let cwd = getcwd()?;
    Ok(data.resolve_against(&cwd))
}

/// Canonicalize `path`, resolving relative input against `base`.
///
/// ```
/// use ofs_types::{canonicalize_with_base, AbsolutePath};
///
/// let base = AbsolutePath::new("/x/y").unwrap();
/// assert_eq!(canonicalize_with_base("a/../b", &base).as_str(), "/x/y/b");
/// assert_eq!(canonicalize_with_base("/a/./b/../c", &base).as_str(), "/a/c");
/// ```
pub fn canonicalize_with_base(path: &str, base: &AbsolutePath) -> AbsolutePath {
    CanonicalData::parse(path).resolve_against(base)
}

/// The current working directory in canonical form.
pub fn getcwd() -> Result<AbsolutePath, PathError> {
    let cwd = std::env::current_dir().map_err(|source| PathError::System {
        context: "getcwd",
        path: String::new(),
        source,
    })?;
    absolute_from_os(&cwd)
}

/// Resolve `path` on disk, following every symlink.
///
/// Unlike [`canonicalize`], the path must exist.
pub fn resolve_real_path(path: &str) -> Result<AbsolutePath, PathError> {
    let resolved = std::fs::canonicalize(path).map_err(|source| PathError::System {
        context: "realpath",
        path: path.to_string(),
        source,
    })?;
    absolute_from_os(&resolved)
}

fn absolute_from_os(path: &Path) -> Result<AbsolutePath, PathError> {
    let s = path
        .to_str()
        .ok_or_else(|| PathError::NonUtf8(path.display().to_string()))?;
    Ok(canonicalize_with_base(s, &AbsolutePath::root()))
}

/// Everything before the last separator, or `""` if there is none.
pub fn dirname(path: &str) -> &str {
    match path.rfind(SEPARATOR) {
        Some(idx) => &path[..idx],
        None => "",
    }
}

/// Everything after the last separator, or the whole input if there is none.
pub fn basename(path: &str) -> &str {
    match path.rfind(SEPARATOR) {
        Some(idx) => &path[idx + 1..],
        None => path,
    }
}
