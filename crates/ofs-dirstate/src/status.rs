//! Status report types.
//!
//! A [`Status`] is built fresh for every query and never mutated afterwards.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use ofs_types::RelativePath;
use serde::{Deserialize, Serialize};

/// Status of one path relative to the base snapshot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StatusCode {
    /// On disk exactly as committed.
    Clean,
    /// Tracked, but content or mode differs from the base.
    Modified,
    /// Not in the base, with a pending add.
    Added,
    /// In the base, with a pending remove.
    Removed,
    /// Tracked or pending add, but no file on disk.
    Missing,
    /// On disk but untracked.
    NotTracked,
    /// Untracked and matched by the ignore rules.
    Ignored,
}

impl StatusCode {
    pub const ALL: [StatusCode; 7] = [
        Self::Clean,
        Self::Modified,
        Self::Added,
        Self::Removed,
        Self::Missing,
        Self::NotTracked,
        Self::Ignored,
    ];

    /// The single character `hg status` prints for this code.
    pub fn as_char(&self) -> char {
        match self {
            Self::Clean => 'C',
            Self::Modified => 'M',
            Self::Added => 'A',
            Self::Removed => 'R',
            Self::Missing => '!',
            Self::NotTracked => '?',
            Self::Ignored => 'I',
        }
    }

    pub fn from_char(c: char) -> Option<Self> {
        Self::ALL.into_iter().find(|code| code.as_char() == c)
    }

    /// Enumerator name as exposed across the service boundary.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Clean => "CLEAN",
            Self::Modified => "MODIFIED",
            Self::Added => "ADDED",
            Self::Removed => "REMOVED",
            Self::Missing => "MISSING",
            Self::NotTracked => "NOT_TRACKED",
            Self::Ignored => "IGNORED",
        }
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

/// Result of one status query: every non-clean path and its code.
///
/// Paths absent from the report are [`StatusCode::Clean`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Status {
    statuses: HashMap<RelativePath, StatusCode>,
}

impl Status {
    pub fn new(statuses: HashMap<RelativePath, StatusCode>) -> Self {
        Self { statuses }
    }

    /// Code for `path`; a path the report does not mention is clean.
    pub fn status_for_path(&self, path: &RelativePath) -> StatusCode {
        self.statuses.get(path).copied().unwrap_or(StatusCode::Clean)
    }

    pub fn len(&self) -> usize {
        self.statuses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.statuses.is_empty()
    }

    /// The raw mapping.
    pub fn list(&self) -> &HashMap<RelativePath, StatusCode> {
        &self.statuses
    }

    /// Entries sorted by path.
    pub fn iter(&self) -> impl Iterator<Item = (&RelativePath, StatusCode)> {
        let mut entries: Vec<_> = self.statuses.iter().map(|(p, c)| (p, *c)).collect();
        entries.sort_by(|a, b| a.0.cmp(b.0));
        entries.into_iter()
    }

    /// Sorted paths carrying `code`.
    pub fn paths_with(&self, code: StatusCode) -> Vec<&RelativePath> {
        self.iter().filter(|(_, c)| *c == code).map(|(p, _)| p).collect()
    }

    /// Ordered `path -> code` map for serialization across a service boundary.
    pub fn to_wire(&self) -> BTreeMap<String, StatusCode> {
        self.statuses
            .iter()
            .map(|(p, c)| (p.to_string(), *c))
            .collect()
    }
}

/// One line per path: status character, a space, the path. Meant for
/// debugging only; the layout is not stable.
impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (path, code) in self.iter() {
            writeln!(f, "{} {}", code.as_char(), path)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rel(s: &str) -> RelativePath {
        RelativePath::new(s).unwrap()
    }

    fn sample() -> Status {
        Status::new(HashMap::from([
            (rel("b.txt"), StatusCode::Modified),
            (rel("a.txt"), StatusCode::Added),
            (rel("dir/gone"), StatusCode::Missing),
            (rel("new"), StatusCode::NotTracked),
        ]))
    }

    #[test]
    fn status_chars() {
        let chars: String = StatusCode::ALL.iter().map(StatusCode::as_char).collect();
        assert_eq!(chars, "CMAR!?I");
        for code in StatusCode::ALL {
            assert_eq!(StatusCode::from_char(code.as_char()), Some(code));
        }
        assert_eq!(StatusCode::from_char('x'), None);
    }

    #[test]
    fn names_match_serde() {
        for code in StatusCode::ALL {
            let json = serde_json::to_string(&code).unwrap();
            assert_eq!(json, format!("\"{}\"", code.name()));
        }
    }

    #[test]
    fn absent_path_is_clean() {
        let status = sample();
        assert_eq!(status.status_for_path(&rel("b.txt")), StatusCode::Modified);
        assert_eq!(status.status_for_path(&rel("untouched")), StatusCode::Clean);
    }

    #[test]
    fn equality_is_by_mapping() {
        assert_eq!(sample(), sample());
        assert_ne!(sample(), Status::default());
        assert_eq!(sample().len(), 4);
        assert!(Status::default().is_empty());
    }

    #[test]
    fn display_lists_one_sorted_line_per_path() {
        assert_eq!(sample().to_string(), "A a.txt\nM b.txt\n! dir/gone\n? new\n");
    }

    #[test]
    fn paths_with_code() {
        let status = sample();
        assert_eq!(status.paths_with(StatusCode::Missing), vec![&rel("dir/gone")]);
        assert!(status.paths_with(StatusCode::Removed).is_empty());
    }

    #[test]
    fn wire_map_is_ordered() {
        let keys: Vec<_> = sample().to_wire().into_keys().collect();
        assert_eq!(keys, vec!["a.txt", "b.txt", "dir/gone", "new"]);
    }
}
