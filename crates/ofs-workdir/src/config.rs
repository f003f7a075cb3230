use std::fs;
use std::io;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{WorkdirError, WorkdirResult};

/// Name of the config file inside the metadata directory.
pub const CONFIG_FILE: &str = "config.toml";

/// Per working copy settings, read from `.ofs/config.toml`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkdirConfig {
    /// Directive table file inside the metadata directory.
    pub dirstate_file: String,
    /// Root-level files holding gitignore-syntax rules.
    pub ignore_files: Vec<String>,
    /// Fsync the directive table before renaming it into place.
    pub persist_fsync: bool,
}

impl Default for WorkdirConfig {
    fn default() -> Self {
        Self {
            dirstate_file: "dirstate".into(),
            ignore_files: vec![".gitignore".into(), ".ofsignore".into()],
            persist_fsync: true,
        }
    }
}

impl WorkdirConfig {
    /// Read `path`, falling back to defaults when it does not exist.
    pub fn load(path: &Path) -> WorkdirResult<Self> {
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(e.into()),
        };
        toml::from_str(&text).map_err(|e| WorkdirError::Config {
            path: path.display().to_string(),
            reason: e.to_string(),
        })
    }

    pub fn save(&self, path: &Path) -> WorkdirResult<()> {
        let text = toml::to_string_pretty(self).map_err(|e| WorkdirError::Config {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        fs::write(path, text)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let c = WorkdirConfig::default();
        assert_eq!(c.dirstate_file, "dirstate");
        assert_eq!(c.ignore_files, vec![".gitignore", ".ofsignore"]);
        assert!(c.persist_fsync);
    }

    #[test]
    fn missing_file_means_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let c = WorkdirConfig::load(&dir.path().join(CONFIG_FILE)).unwrap();
        assert_eq!(c, WorkdirConfig::default());
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        fs::write(&path, "persist_fsync = false\n").unwrap();
        let c = WorkdirConfig::load(&path).unwrap();
        assert!(!c.persist_fsync);
        assert_eq!(c.dirstate_file, "dirstate");
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        let c = WorkdirConfig {
            dirstate_file: "ds.bin".into(),
            ignore_files: vec![".ofsignore".into()],
            persist_fsync: false,
        };
        c.save(&path).unwrap();
        assert_eq!(WorkdirConfig::load(&path).unwrap(), c);
    }

    #[test]
    fn malformed_file_is_a_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        fs::write(&path, "persist_fsync = \"sometimes\"\n").unwrap();
        assert!(matches!(WorkdirConfig::load(&path), Err(WorkdirError::Config { .. })));
    }
}
