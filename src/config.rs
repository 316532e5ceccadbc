//! Configuration management for the to-do list.
//!
//! Configuration can be set via environment variables:
//! - `TODO_LIST_STORE` - Optional. `memory`, `file` (or `json`), `sqlite` (or `db`). Defaults to `sqlite`.
//! - `TODO_LIST_DATA_DIR` - Optional. Where store files live. Defaults to `$HOME/.todo-list`.
//! - `TODO_LIST_PROFILE` - Optional. Names the store file (`tasks-{profile}.db`). Defaults to `default`.

use std::path::PathBuf;
use thiserror::Error;

use crate::store::StoreType;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

/// Store configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Which backend holds the tasks
    pub store_type: StoreType,

    /// Directory for store files
    pub data_dir: PathBuf,

    /// Store file name component
    pub profile: String,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if `TODO_LIST_STORE` names an unknown
    /// backend or `TODO_LIST_PROFILE` is blank.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from any key lookup (used by `from_env` and tests).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let store_type = match lookup("TODO_LIST_STORE") {
            Some(value) => parse_store_type(&value)?,
            None => StoreType::default(),
        };

        let data_dir = lookup("TODO_LIST_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| default_data_dir(lookup("HOME")));

        let profile = lookup("TODO_LIST_PROFILE").unwrap_or_else(|| "default".to_string());
        if profile.trim().is_empty() {
            return Err(ConfigError::InvalidValue(
                "TODO_LIST_PROFILE".to_string(),
                "profile cannot be blank".to_string(),
            ));
        }

        Ok(Self {
            store_type,
            data_dir,
            profile,
        })
    }
}

/// Parse a store type name, naming the offending value on failure.
pub fn parse_store_type(value: &str) -> Result<StoreType, ConfigError> {
    StoreType::parse(value).ok_or_else(|| {
        ConfigError::InvalidValue(
            "TODO_LIST_STORE".to_string(),
            format!("unknown store '{}' (expected memory, file or sqlite)", value),
        )
    })
}

fn default_data_dir(home: Option<String>) -> PathBuf {
    match home {
        Some(home) if !home.is_empty() => PathBuf::from(home).join(".todo-list"),
        _ => PathBuf::from(".todo-list"),
    }
}
