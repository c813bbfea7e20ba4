//! Process configuration for hosts embedding the core.
//!
//! # Responsibility
//! - Resolve log level, log directory and database path from defaults and
//!   `TASKIFY_*` environment variables.
//!
//! # Invariants
//! - A resolved config always carries a supported log level and an absolute
//!   log directory, so `init_logging` accepts it as-is.

use crate::logging::{default_log_level, normalize_level};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

pub const ENV_LOG_LEVEL: &str = "TASKIFY_LOG_LEVEL";
pub const ENV_LOG_DIR: &str = "TASKIFY_LOG_DIR";
pub const ENV_DB_PATH: &str = "TASKIFY_DB_PATH";

const DATA_DIR_NAME: &str = ".taskify";
const DB_FILE_NAME: &str = "taskify.db";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    InvalidLogLevel(String),
    RelativeLogDir(String),
    EmptyValue(&'static str),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidLogLevel(message) => write!(f, "{message}"),
            Self::RelativeLogDir(value) => {
                write!(f, "{ENV_LOG_DIR} must be an absolute path, got `{value}`")
            }
            Self::EmptyValue(key) => write!(f, "{key} is set but empty"),
        }
    }
}

impl Error for ConfigError {}

/// Resolved core configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoreConfig {
    pub log_level: String,
    pub log_dir: PathBuf,
    pub db_path: PathBuf,
}

impl CoreConfig {
    /// Defaults rooted at `data_dir`.
    pub fn with_data_dir(data_dir: &Path) -> Self {
        Self {
            log_level: default_log_level().to_string(),
            log_dir: data_dir.join("logs"),
            db_path: data_dir.join(DB_FILE_NAME),
        }
    }

    /// Reads configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolves configuration through `lookup`.
    ///
    /// The data directory is `$HOME/.taskify`, or the system temp dir when
    /// `HOME` is unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let data_dir = lookup("HOME")
            .filter(|home| !home.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(std::env::temp_dir)
            .join(DATA_DIR_NAME);
        let mut config = Self::with_data_dir(&data_dir);

        if let Some(level) = non_empty(&lookup, ENV_LOG_LEVEL)? {
            config.log_level = normalize_level(&level)
                .map_err(ConfigError::InvalidLogLevel)?
                .to_string();
        }
        if let Some(dir) = non_empty(&lookup, ENV_LOG_DIR)? {
            let dir = PathBuf::from(dir);
            if !dir.is_absolute() {
                return Err(ConfigError::RelativeLogDir(dir.display().to_string()));
            }
            config.log_dir = dir;
        }
        if let Some(path) = non_empty(&lookup, ENV_DB_PATH)? {
            config.db_path = PathBuf::from(path);
        }
        Ok(config)
    }

    /// Log directory as the string form `init_logging` takes.
    pub fn log_dir_str(&self) -> String {
        self.log_dir.display().to_string()
    }
}

fn non_empty(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
) -> Result<Option<String>, ConfigError> {
    match lookup(key) {
        None => Ok(None),
        Some(value) if value.trim().is_empty() => Err(ConfigError::EmptyValue(key)),
        Some(value) => Ok(Some(value.trim().to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::{ConfigError, CoreConfig, ENV_DB_PATH, ENV_LOG_DIR, ENV_LOG_LEVEL};
    use crate::logging::default_log_level;
    use std::collections::HashMap;
    use std::path::PathBuf;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_live_under_home() {
        let config = CoreConfig::from_lookup(lookup(&[("HOME", "/home/ada")])).unwrap();
        assert_eq!(config.log_level, default_log_level());
        assert_eq!(config.log_dir, PathBuf::from("/home/ada/.taskify/logs"));
        assert_eq!(config.db_path, PathBuf::from("/home/ada/.taskify/taskify.db"));
    }

    #[test]
    fn env_overrides_apply() {
        let config = CoreConfig::from_lookup(lookup(&[
            ("HOME", "/home/ada"),
            (ENV_LOG_LEVEL, " WARNING "),
            (ENV_LOG_DIR, "/var/log/taskify"),
            (ENV_DB_PATH, "data/tasks.db"),
        ]))
        .unwrap();
        assert_eq!(config.log_level, "warn");
        assert_eq!(config.log_dir, PathBuf::from("/var/log/taskify"));
        assert_eq!(config.db_path, PathBuf::from("data/tasks.db"));
    }

    #[test]
    fn invalid_values_are_rejected() {
        let err = CoreConfig::from_lookup(lookup(&[(ENV_LOG_LEVEL, "loud")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidLogLevel(_)));

        let err = CoreConfig::from_lookup(lookup(&[(ENV_LOG_DIR, "logs")])).unwrap_err();
        assert_eq!(err, ConfigError::RelativeLogDir("logs".to_string()));

        let err = CoreConfig::from_lookup(lookup(&[(ENV_DB_PATH, "  ")])).unwrap_err();
        assert_eq!(err, ConfigError::EmptyValue(ENV_DB_PATH));
    }

    #[test]
    fn config_round_trips_through_json() {
        let config = CoreConfig::with_data_dir(&PathBuf::from("/tmp/taskify"));
        let json = serde_json::to_string(&config).unwrap();
        let parsed: CoreConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, config);
    }
}
