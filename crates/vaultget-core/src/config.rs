//! Configuration management for vaultget

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::paths::Paths;

/// User configuration, read from `config.json`
#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
pub struct Config {
    /// Encrypted keyring holding vault passphrases
    #[serde(default)]
    pub keyring_path: Option<PathBuf>,

    /// Directory relative vault paths are resolved against
    #[serde(default)]
    pub work_dir: Option<PathBuf>,
}

impl Config {
    /// Load config from file, falling back to defaults when it does not exist
    pub fn load(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config {}", path.display()))?;
            serde_json::from_str(&content)
                .with_context(|| format!("Invalid config {}", path.display()))
        } else {
            Ok(Self::default())
        }
    }

    /// Keyring location, configured or default
    pub fn keyring_path(&self, paths: &Paths) -> PathBuf {
        self.keyring_path.clone().unwrap_or_else(|| paths.keyring())
    }

    /// Working directory, configured or the process's current one
    pub fn work_dir(&self) -> Result<PathBuf> {
        match &self.work_dir {
            Some(dir) => Ok(dir.clone()),
            None => std::env::current_dir().context("Failed to determine current directory"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(&dir.path().join("config.json")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{ "keyring_path": "/srv/keyring.age" }"#).unwrap();

        let loaded = Config::load(&path).unwrap();
        assert_eq!(
            loaded,
            Config {
                keyring_path: Some(PathBuf::from("/srv/keyring.age")),
                work_dir: None,
            }
        );

        let paths = Paths::with_root(dir.path());
        assert_eq!(loaded.keyring_path(&paths), PathBuf::from("/srv/keyring.age"));
    }

    #[test]
    fn test_default_keyring_path() {
        let paths = Paths::with_root("/tmp/vg");
        assert_eq!(
            Config::default().keyring_path(&paths),
            PathBuf::from("/tmp/vg/data/keyring.age")
        );
    }

    #[test]
    fn test_invalid_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(Config::load(&path).is_err());
    }
}
