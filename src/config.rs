//! Configuration management for UnderCtrl.
//!
//! Configuration can be set via environment variables:
//! - `HOST` - Optional. Server host. Defaults to `127.0.0.1`.
//! - `PORT` - Optional. Server port. Defaults to `3000`.
//! - `STORE_BACKEND` - Optional. `sqlite` or `memory`. Defaults to `sqlite`.
//! - `DATABASE_PATH` - Optional. SQLite database file. Defaults to `db.sqlite3`.
//! - `CATEGORY_PREVIEW_LIMIT` - Optional. Existing categories listed when the
//!   task wizard asks for one. Defaults to `5`.

use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

/// Which `TaskStore` implementation to open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Sqlite,
    Memory,
}

impl FromStr for StoreBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sqlite" => Ok(StoreBackend::Sqlite),
            "memory" => Ok(StoreBackend::Memory),
            other => Err(ConfigError::InvalidValue(
                "STORE_BACKEND".to_string(),
                format!("expected 'sqlite' or 'memory', got '{}'", other),
            )),
        }
    }
}

/// Bot configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server host
    pub host: String,

    /// Server port
    pub port: u16,

    /// Storage backend
    pub store_backend: StoreBackend,

    /// SQLite database path (ignored by the memory backend)
    pub database_path: PathBuf,

    /// How many existing categories the wizard lists in its category prompt
    pub category_preview_limit: usize,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if a variable is set but unparsable.
    pub fn from_env() -> Result<Self, ConfigError> {
        let host = std::env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());

        let port = std::env::var("PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse()
            .map_err(|e| ConfigError::InvalidValue("PORT".to_string(), format!("{}", e)))?;

        let store_backend = match std::env::var("STORE_BACKEND") {
            Ok(value) => value.parse()?,
            Err(_) => StoreBackend::Sqlite,
        };

        let database_path = std::env::var("DATABASE_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("db.sqlite3"));

        let category_preview_limit = std::env::var("CATEGORY_PREVIEW_LIMIT")
            .unwrap_or_else(|_| "5".to_string())
            .parse()
            .map_err(|e| {
                ConfigError::InvalidValue("CATEGORY_PREVIEW_LIMIT".to_string(), format!("{}", e))
            })?;

        Ok(Self {
            host,
            port,
            store_backend,
            database_path,
            category_preview_limit,
        })
    }

    /// Create a config with custom values (useful for testing).
    pub fn new(store_backend: StoreBackend, database_path: PathBuf) -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
            store_backend,
            database_path,
            category_preview_limit: 5,
        }
    }
}
