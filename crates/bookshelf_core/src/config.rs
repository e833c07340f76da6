//! Runtime configuration.
//!
//! # Responsibility
//! - Resolve where durable storage and logs live, and the log level.
//! - Validate paths and names before anything touches the file system.
//!
//! # Invariants
//! - `data_dir` and `log_dir` are absolute.
//! - `db_file_name` is a bare file name (no separators).

use crate::logging::{default_log_level, normalize_level};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

pub const ENV_DATA_DIR: &str = "BOOKSHELF_DATA_DIR";
pub const ENV_LOG_LEVEL: &str = "BOOKSHELF_LOG_LEVEL";
pub const ENV_LOG_DIR: &str = "BOOKSHELF_LOG_DIR";
pub const DEFAULT_DB_FILE_NAME: &str = "bookshelf.sqlite3";

/// Configuration validation failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    RelativePath { field: &'static str, value: PathBuf },
    InvalidLogLevel(String),
    InvalidFileName(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RelativePath { field, value } => {
                write!(f, "{field} must be an absolute path, got `{}`", value.display())
            }
            Self::InvalidLogLevel(level) => write!(
                f,
                "unsupported log level `{level}`; expected trace|debug|info|warn|error"
            ),
            Self::InvalidFileName(name) => {
                write!(f, "database file name `{name}` must be a bare file name")
            }
        }
    }
}

impl Error for ConfigError {}

/// Resolved application configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub data_dir: PathBuf,
    pub db_file_name: String,
    pub log_level: String,
    pub log_dir: PathBuf,
    /// Keep durable records in memory only; nothing survives the process.
    pub in_memory: bool,
}

impl AppConfig {
    /// Builds a configuration from process environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a configuration from an arbitrary variable lookup.
    ///
    /// Missing or blank variables fall back to defaults: a `bookshelf`
    /// directory under the OS temp dir, `logs/` inside it, and the build's
    /// default log level.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let read = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let data_dir = read(ENV_DATA_DIR)
            .map(PathBuf::from)
            .unwrap_or_else(default_data_dir);
        let log_dir = read(ENV_LOG_DIR)
            .map(PathBuf::from)
            .unwrap_or_else(|| data_dir.join("logs"));
        let log_level = read(ENV_LOG_LEVEL).unwrap_or_else(|| default_log_level().to_string());

        let config = Self {
            data_dir,
            db_file_name: DEFAULT_DB_FILE_NAME.to_string(),
            log_level,
            log_dir,
            in_memory: false,
        };
        config.validate()?;
        Ok(config)
    }

    /// Checks every field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        require_absolute("data_dir", &self.data_dir)?;
        require_absolute("log_dir", &self.log_dir)?;
        normalize_level(&self.log_level)
            .map_err(|_| ConfigError::InvalidLogLevel(self.log_level.clone()))?;

        let name = self.db_file_name.trim();
        if name.is_empty() || name.contains(['/', '\\']) || name == "." || name == ".." {
            return Err(ConfigError::InvalidFileName(self.db_file_name.clone()));
        }
        Ok(())
    }

    /// Full path of the SQLite database file.
    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join(self.db_file_name.trim())
    }
}

fn default_data_dir() -> PathBuf {
    std::env::temp_dir().join("bookshelf")
}

fn require_absolute(field: &'static str, path: &Path) -> Result<(), ConfigError> {
    if path.is_absolute() {
        Ok(())
    } else {
        Err(ConfigError::RelativePath {
            field,
            value: path.to_path_buf(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{AppConfig, ConfigError, ENV_DATA_DIR, ENV_LOG_LEVEL};
    use std::collections::HashMap;
    use std::path::PathBuf;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map = vars
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect::<HashMap<_, _>>();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_environment_is_empty() {
        let config = AppConfig::from_lookup(lookup(&[])).unwrap();
        assert!(config.data_dir.ends_with("bookshelf"));
        assert_eq!(config.log_dir, config.data_dir.join("logs"));
        assert!(config.db_path().ends_with("bookshelf.sqlite3"));
        assert!(!config.in_memory);
    }

    #[test]
    fn log_dir_follows_data_dir_override() {
        let config =
            AppConfig::from_lookup(lookup(&[(ENV_DATA_DIR, "/var/lib/bookshelf")])).unwrap();
        assert_eq!(config.log_dir, PathBuf::from("/var/lib/bookshelf/logs"));
    }

    #[test]
    fn relative_data_dir_is_rejected() {
        let err = AppConfig::from_lookup(lookup(&[(ENV_DATA_DIR, "data")])).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::RelativePath {
                field: "data_dir",
                ..
            }
        ));
    }

    #[test]
    fn unknown_log_level_is_rejected() {
        let err = AppConfig::from_lookup(lookup(&[(ENV_LOG_LEVEL, "chatty")])).unwrap_err();
        assert_eq!(err, ConfigError::InvalidLogLevel("chatty".to_string()));
    }

    #[test]
    fn db_file_name_must_not_contain_separators() {
        let mut config = AppConfig::from_lookup(lookup(&[])).unwrap();
        config.db_file_name = "../escape.sqlite3".to_string();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidFileName(_))
        ));
    }
}
