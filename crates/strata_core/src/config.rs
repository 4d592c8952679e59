//! Repository configuration.

use crate::blob::{HashAlg, DEFAULT_HASH_ALG};
use crate::error::{Result, StrataError};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

const CONFIG_FILE: &str = "config.toml";

/// Configuration for a repository, loaded from `config.toml` inside the
/// repository folder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RepoConfig {
    /// Hash algorithm used for newly created objects.
    pub hash_alg: HashAlg,

    /// File name of the KV database inside the repository folder.
    pub db_file: String,
}

impl Default for RepoConfig {
    fn default() -> Self {
        Self {
            hash_alg: DEFAULT_HASH_ALG,
            db_file: "strata.redb".to_string(),
        }
    }
}

impl RepoConfig {
    /// Loads the configuration from the repository folder, falling back to
    /// defaults if no config file exists.
    pub fn load(folder: &Path) -> Result<Self> {
        let path = folder.join(CONFIG_FILE);
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(&path)
            .map_err(|e| StrataError::Config(format!("failed to read config: {}", e)))?;
        toml::from_str(&content)
            .map_err(|e| StrataError::Config(format!("failed to parse config: {}", e)))
    }

    /// Saves the configuration into the repository folder.
    pub fn save(&self, folder: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| StrataError::Config(format!("failed to serialize config: {}", e)))?;
        fs::write(folder.join(CONFIG_FILE), content)
            .map_err(|e| StrataError::Config(format!("failed to write config: {}", e)))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_when_missing() {
        let tmp = TempDir::new().unwrap();
        let config = RepoConfig::load(tmp.path()).unwrap();
        assert_eq!(config, RepoConfig::default());
        assert_eq!(config.hash_alg, HashAlg::Blake3);
    }

    #[test]
    fn test_save_load_roundtrip() {
        let tmp = TempDir::new().unwrap();
        let config = RepoConfig {
            hash_alg: HashAlg::Blake3,
            db_file: "custom.redb".to_string(),
        };
        config.save(tmp.path()).unwrap();

        let loaded = RepoConfig::load(tmp.path()).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(CONFIG_FILE), "db_file = \"other.redb\"\n").unwrap();

        let loaded = RepoConfig::load(tmp.path()).unwrap();
        assert_eq!(loaded.db_file, "other.redb");
        assert_eq!(loaded.hash_alg, HashAlg::Blake3);
    }

    #[test]
    fn test_malformed_config_errors() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(CONFIG_FILE), "db_file = [not toml").unwrap();

        let result = RepoConfig::load(tmp.path());
        assert!(matches!(result, Err(StrataError::Config(_))));
    }
}
