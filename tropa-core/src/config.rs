//! Centralized configuration for the tropa service
//!
//! Loaded from a TOML file with environment-variable overrides. A missing
//! file is not an error: every field has a sensible local default so
//! `tropactl serve` works out of the box.
//!
//! Environment overrides:
//!   TROPA_DB          # database file path
//!   TROPA_BIND        # bind address (host:port)
//!   TROPA_UPLOAD_DIR  # uploads directory

use std::env;
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Default session lifetime in hours.
const DEFAULT_SESSION_TTL_HOURS: i64 = 24;

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Address the HTTP server binds to
    pub bind_addr: SocketAddr,

    /// Path to the SQLite database file
    pub database_path: PathBuf,

    /// Directory for uploaded files
    pub upload_dir: PathBuf,

    /// Session lifetime in hours
    pub session_ttl_hours: i64,

    /// Allow permissive CORS (default: false = localhost only)
    pub cors_permissive: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        let data_dir = dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("tropa");
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 8080)),
            database_path: data_dir.join("tropa.db"),
            upload_dir: data_dir.join("uploads"),
            session_ttl_hours: DEFAULT_SESSION_TTL_HOURS,
            cors_permissive: false,
        }
    }
}

impl AppConfig {
    /// Load config from the given path, falling back to defaults when the
    /// file does not exist. Environment overrides are applied last.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = path
            .map(Path::to_path_buf)
            .unwrap_or_else(Self::default_path);

        let mut config = if path.exists() {
            let content = fs::read_to_string(&path)?;
            toml::from_str(&content)
                .map_err(|e| Error::config_parse(&path, e.to_string()))?
        } else {
            Self::default()
        };

        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Default config file path: ~/.config/tropa/tropactl.toml
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("tropa/tropactl.toml")
    }

    /// Write the config back to the given path, creating parent dirs.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let toml_str = toml::to_string_pretty(self)
            .map_err(|e| Error::config(format!("failed to serialize config: {e}")))?;
        fs::write(path, toml_str)?;
        Ok(())
    }

    fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(db) = env::var("TROPA_DB") {
            self.database_path = PathBuf::from(db);
        }
        if let Ok(bind) = env::var("TROPA_BIND") {
            self.bind_addr = bind
                .parse()
                .map_err(|_| Error::config(format!("invalid TROPA_BIND address: {bind}")))?;
        }
        if let Ok(dir) = env::var("TROPA_UPLOAD_DIR") {
            self.upload_dir = PathBuf::from(dir);
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.session_ttl_hours <= 0 {
            return Err(Error::config("session_ttl_hours must be positive"));
        }
        Ok(())
    }
}
