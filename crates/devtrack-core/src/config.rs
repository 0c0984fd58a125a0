//! DevTrack configuration system.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{DevTrackError, Result};

/// File name used when the database lives in a directory chosen by the user.
pub const DB_FILE_NAME: &str = "devtrack_data.db";

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DevTrackConfig {
    /// Absolute path of the SQLite file. `None` means `~/.devtrack/devtrack_data.db`.
    #[serde(default)]
    pub db_path: Option<String>,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl DevTrackConfig {
    /// Load config from the default path (~/.devtrack/config.toml).
    pub fn load() -> Result<Self> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load config from a specific path.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| DevTrackError::config(format!("Failed to read config: {e}")))?;
        let config: Self = toml::from_str(&content)
            .map_err(|e| DevTrackError::config(format!("Failed to parse config: {e}")))?;
        Ok(config)
    }

    /// Save config to the default path.
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::default_path())
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| DevTrackError::config(format!("Failed to serialize config: {e}")))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the default config path.
    pub fn default_path() -> PathBuf {
        Self::home_dir().join("config.toml")
    }

    /// Get the DevTrack home directory.
    pub fn home_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".devtrack")
    }

    /// Database file the storage host opens at startup.
    pub fn resolve_db_path(&self) -> PathBuf {
        match self.db_path.as_deref().map(str::trim) {
            Some(p) if !p.is_empty() => expand_path(p),
            _ => Self::home_dir().join(DB_FILE_NAME),
        }
    }

    /// Key-value file used by the local fallback backend.
    pub fn local_store_path(&self) -> PathBuf {
        expand_path(&self.storage.local_store)
    }

    /// Point the config at a new database location.
    ///
    /// When the current file exists it is copied to the new location first
    /// (`<dir>/devtrack_data.db` if `new_path` is a directory). The running
    /// connection is untouched; the caller saves the config and the new path
    /// is used on the next start.
    pub fn relocate_db(&mut self, new_path: &str) -> Result<PathBuf> {
        let new_path = new_path.trim();
        if new_path.is_empty() {
            return Err(DevTrackError::config("Database path must not be empty"));
        }

        let current = self.resolve_db_path();
        let requested = expand_path(new_path);
        let target = if requested.is_dir() {
            requested.join(DB_FILE_NAME)
        } else {
            requested
        };

        if current.exists() && current != target {
            if let Some(parent) = target.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::copy(&current, &target).map_err(|e| {
                DevTrackError::config(format!(
                    "Failed to copy {} to {}: {e}",
                    current.display(),
                    target.display()
                ))
            })?;
            tracing::info!("Database copied to {}", target.display());
        }

        self.db_path = Some(target.to_string_lossy().into_owned());
        Ok(target)
    }
}

fn expand_path(p: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(p).as_ref())
}

/// Which storage backend the data service should use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Native SQLite host when reachable, local store otherwise.
    #[default]
    Auto,
    Native,
    Local,
}

/// Storage configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: BackendKind,
    #[serde(default = "default_local_store")]
    pub local_store: String,
    /// Sleep between readiness checks while the host opens the database.
    #[serde(default = "default_ready_poll_ms")]
    pub ready_poll_ms: u64,
    #[serde(default = "default_ready_timeout_ms")]
    pub ready_timeout_ms: u64,
}

fn default_local_store() -> String { "~/.devtrack/local_storage.json".into() }
fn default_ready_poll_ms() -> u64 { 20 }
fn default_ready_timeout_ms() -> u64 { 10_000 }

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::default(),
            local_store: default_local_store(),
            ready_poll_ms: default_ready_poll_ms(),
            ready_timeout_ms: default_ready_timeout_ms(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub json: bool,
}

fn default_log_level() -> String { "info".into() }

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = DevTrackConfig::default();
        assert!(config.db_path.is_none());
        assert_eq!(config.storage.backend, BackendKind::Auto);
        assert_eq!(config.storage.ready_poll_ms, 20);
        assert_eq!(config.logging.level, "info");
        assert!(config.resolve_db_path().ends_with(DB_FILE_NAME));
    }

    #[test]
    fn test_config_from_toml() {
        let toml_str = r#"
            db_path = "/data/devtrack.db"

            [storage]
            backend = "local"
            ready_poll_ms = 5

            [logging]
            json = true
        "#;

        let config: DevTrackConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.resolve_db_path(), PathBuf::from("/data/devtrack.db"));
        assert_eq!(config.storage.backend, BackendKind::Local);
        assert_eq!(config.storage.ready_poll_ms, 5);
        assert_eq!(config.storage.ready_timeout_ms, 10_000);
        assert!(config.logging.json);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_config_missing_fields_use_defaults() {
        let config: DevTrackConfig = toml::from_str("").unwrap();
        assert_eq!(config.storage.backend, BackendKind::Auto);
        assert!(config.storage.local_store.ends_with("local_storage.json"));
    }

    #[test]
    fn test_home_dir() {
        let home = DevTrackConfig::home_dir();
        assert!(home.to_string_lossy().contains("devtrack"));
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let mut config = DevTrackConfig::default();
        config.db_path = Some("/tmp/x.db".into());
        config.save_to(&path).unwrap();

        let loaded = DevTrackConfig::load_from(&path).unwrap();
        assert_eq!(loaded.db_path.as_deref(), Some("/tmp/x.db"));
    }

    #[test]
    fn test_relocate_copies_existing_file_into_directory() {
        let dir = tempfile::tempdir().unwrap();
        let old = dir.path().join("old.db");
        std::fs::write(&old, b"sqlite bytes").unwrap();
        let target_dir = dir.path().join("moved");
        std::fs::create_dir_all(&target_dir).unwrap();

        let mut config = DevTrackConfig {
            db_path: Some(old.to_string_lossy().into_owned()),
            ..Default::default()
        };
        let new_path = config.relocate_db(target_dir.to_str().unwrap()).unwrap();

        assert_eq!(new_path, target_dir.join(DB_FILE_NAME));
        assert_eq!(std::fs::read(&new_path).unwrap(), b"sqlite bytes");
        assert!(old.exists());
        assert_eq!(config.resolve_db_path(), new_path);
    }

    #[test]
    fn test_relocate_without_existing_file_only_records_path() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = DevTrackConfig {
            db_path: Some(dir.path().join("missing.db").to_string_lossy().into_owned()),
            ..Default::default()
        };
        let target = dir.path().join("sub").join("new.db");
        let new_path = config.relocate_db(target.to_str().unwrap()).unwrap();
        assert_eq!(new_path, target);
        assert!(!target.exists());
    }

    #[test]
    fn test_relocate_rejects_empty_path() {
        let mut config = DevTrackConfig::default();
        assert!(config.relocate_db("   ").is_err());
        assert!(config.db_path.is_none());
    }
}
