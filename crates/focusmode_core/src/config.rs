//! Application configuration.
//!
//! # Responsibility
//! - Load settings from an optional TOML file with built-in defaults.
//! - Apply `FOCUSMODE_*` environment overrides on top of the file.
//!
//! # Invariants
//! - A validated config has an http(s) base URL, a timeout in
//!   1..=120000 ms, and a non-empty data directory.

use crate::logging::{default_log_level, normalize_level};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const ENV_API_URL: &str = "FOCUSMODE_API_URL";
pub const ENV_DATA_DIR: &str = "FOCUSMODE_DATA_DIR";
pub const ENV_LOG_LEVEL: &str = "FOCUSMODE_LOG_LEVEL";

const DEFAULT_API_BASE_URL: &str = "http://127.0.0.1:8888/api";
const DEFAULT_TIMEOUT_MS: u64 = 10_000;
const MAX_TIMEOUT_MS: u64 = 120_000;
const APP_DIR_NAME: &str = "focusmode";
const CONFIG_FILE_NAME: &str = "config.toml";
const STORE_FILE_NAME: &str = "focusmode.sqlite3";

pub type ConfigResult<T> = Result<T, ConfigError>;

#[derive(Debug)]
pub enum ConfigError {
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    Parse(toml::de::Error),
    Invalid(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Read { path, source } => {
                write!(f, "failed to read config `{}`: {source}", path.display())
            }
            Self::Parse(err) => write!(f, "invalid config file: {err}"),
            Self::Invalid(reason) => write!(f, "invalid config: {reason}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Read { source, .. } => Some(source),
            Self::Parse(err) => Some(err),
            Self::Invalid(_) => None,
        }
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(value: toml::de::Error) -> Self {
        Self::Parse(value)
    }
}

/// Runtime settings shared by the core and the CLI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    pub api_base_url: String,
    pub request_timeout_ms: u64,
    pub data_dir: PathBuf,
    pub log_level: String,
    /// Defaults to `<data_dir>/logs`.
    pub log_dir: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            request_timeout_ms: DEFAULT_TIMEOUT_MS,
            data_dir: default_data_dir(),
            log_level: default_log_level().to_string(),
            log_dir: None,
        }
    }
}

impl AppConfig {
    /// Loads `path`, or the per-user config file when present, then applies
    /// environment overrides and validates the result.
    pub fn load(path: Option<&Path>) -> ConfigResult<Self> {
        let file = match path {
            Some(path) => Some(path.to_path_buf()),
            None => default_config_file().filter(|candidate| candidate.is_file()),
        };

        let mut config = match file {
            Some(file) => {
                let text = std::fs::read_to_string(&file).map_err(|source| ConfigError::Read {
                    path: file.clone(),
                    source,
                })?;
                Self::from_toml_str(&text)?
            }
            None => Self::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_str(text: &str) -> ConfigResult<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Applies `FOCUSMODE_*` overrides; blank values are ignored.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let value = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        if let Some(url) = value(ENV_API_URL) {
            self.api_base_url = url.trim().to_string();
        }
        if let Some(dir) = value(ENV_DATA_DIR) {
            self.data_dir = PathBuf::from(dir.trim());
        }
        if let Some(level) = value(ENV_LOG_LEVEL) {
            self.log_level = level.trim().to_string();
        }
    }

    pub fn validate(&self) -> ConfigResult<()> {
        let url = self.api_base_url.trim();
        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(ConfigError::Invalid(format!(
                "api_base_url `{url}` must start with http:// or https://"
            )));
        }
        if !(1..=MAX_TIMEOUT_MS).contains(&self.request_timeout_ms) {
            return Err(ConfigError::Invalid(format!(
                "request_timeout_ms must be within 1..={MAX_TIMEOUT_MS}, got {}",
                self.request_timeout_ms
            )));
        }
        if self.data_dir.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("data_dir cannot be empty".to_string()));
        }
        normalize_level(&self.log_level).map_err(|err| ConfigError::Invalid(err.to_string()))?;
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// SQLite file backing the local store.
    pub fn store_path(&self) -> PathBuf {
        self.data_dir.join(STORE_FILE_NAME)
    }

    pub fn log_dir(&self) -> PathBuf {
        self.log_dir
            .clone()
            .unwrap_or_else(|| self.data_dir.join("logs"))
    }
}

fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join(APP_DIR_NAME)
}

fn default_config_file() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(APP_DIR_NAME).join(CONFIG_FILE_NAME))
}

#[cfg(test)]
mod tests {
    use super::{AppConfig, ConfigError, ENV_API_URL, ENV_DATA_DIR, ENV_LOG_LEVEL};
    use std::collections::HashMap;
    use std::path::PathBuf;

    #[test]
    fn defaults_are_valid() {
        let config = AppConfig::default();
        config.validate().expect("defaults should validate");
        assert!(config.store_path().ends_with("focusmode.sqlite3"));
        assert_eq!(config.log_dir(), config.data_dir.join("logs"));
    }

    #[test]
    fn file_values_fill_missing_fields_with_defaults() {
        let config = AppConfig::from_toml_str(
            r#"
api_base_url = "https://focus.example.com/api"
request_timeout_ms = 2500
"#,
        )
        .unwrap();
        assert_eq!(config.api_base_url, "https://focus.example.com/api");
        assert_eq!(config.request_timeout().as_millis(), 2500);
        assert_eq!(config.log_dir, None);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = AppConfig::from_toml_str("api_url = \"http://x\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn environment_overrides_file_values() {
        let env = HashMap::from([
            (ENV_API_URL, " http://10.0.0.2:8888/api "),
            (ENV_DATA_DIR, "/var/lib/focusmode"),
            (ENV_LOG_LEVEL, ""),
        ]);
        let mut config = AppConfig::default();
        let level = config.log_level.clone();

        config.apply_overrides(|key| env.get(key).map(|value| value.to_string()));

        assert_eq!(config.api_base_url, "http://10.0.0.2:8888/api");
        assert_eq!(config.data_dir, PathBuf::from("/var/lib/focusmode"));
        assert_eq!(config.log_level, level);
    }

    #[test]
    fn validate_rejects_bad_values() {
        let mut config = AppConfig {
            api_base_url: "ftp://example.com".to_string(),
            ..AppConfig::default()
        };
        assert!(config.validate().is_err());

        config.api_base_url = "http://localhost".to_string();
        config.request_timeout_ms = 0;
        assert!(config.validate().unwrap_err().to_string().contains("1..=120000"));

        config.request_timeout_ms = 1000;
        config.data_dir = PathBuf::new();
        assert!(config.validate().is_err());

        config.data_dir = PathBuf::from("/tmp/focusmode");
        config.log_level = "chatty".to_string();
        assert!(config.validate().is_err());
    }
}
