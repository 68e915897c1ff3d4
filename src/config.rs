//! Configuration loading and management
//!
//! Handles parsing of `.weekboard.toml` configuration files.

use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Per-directory config file name
pub const CONFIG_FILE: &str = ".weekboard.toml";

/// Longest debounce accepted for move syncs
const MAX_DEBOUNCE_MS: u64 = 60_000;
const MAX_POSITION_STEP: i64 = 1_000_000;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Planner API connection
    #[serde(default)]
    pub backend: BackendConfig,

    /// Sync coordinator tuning
    #[serde(default)]
    pub sync: SyncConfig,

    /// Board ordering
    #[serde(default)]
    pub board: BoardConfig,
}

/// Backend-related configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Base URL of the planner API
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Bearer token issued by the session provider
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,

    /// Per-request timeout in milliseconds
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_base_url() -> String {
    "http://localhost:3000/api".to_string()
}

fn default_timeout_ms() -> u64 {
    10_000
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            token: None,
            timeout_ms: default_timeout_ms(),
        }
    }
}

/// Sync-related configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Quiet period before a move is sent
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
}

fn default_debounce_ms() -> u64 {
    1000
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
        }
    }
}

impl SyncConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

/// Board ordering configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoardConfig {
    /// Spacing between consecutive task positions
    #[serde(default = "default_position_step")]
    pub position_step: i64,
}

fn default_position_step() -> i64 {
    crate::position::POSITION_STEP
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            position_step: default_position_step(),
        }
    }
}

impl Config {
    /// Load configuration from a `.weekboard.toml` file
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::ConfigNotFound(path.to_path_buf()));
        }
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Resolve the config to use.
    ///
    /// An explicit path must exist. Otherwise `./.weekboard.toml`, then the
    /// user config file, then defaults.
    pub fn resolve(explicit: Option<&Path>, cwd: &Path) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        let local = cwd.join(CONFIG_FILE);
        if local.exists() {
            return Self::load(&local);
        }
        if let Some(user) = user_config_path().filter(|path| path.exists()) {
            return Self::load(&user);
        }
        Ok(Self::default())
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        self.backend.validate()?;
        self.sync.validate()?;
        self.board.validate()?;
        Ok(())
    }
}

/// `<config dir>/weekboard/config.toml` for the current user
pub fn user_config_path() -> Option<PathBuf> {
    ProjectDirs::from("", "", "weekboard").map(|dirs| dirs.config_dir().join("config.toml"))
}

impl BackendConfig {
    fn validate(&self) -> Result<()> {
        let url = self.base_url.trim();
        if url.is_empty() {
            return Err(Error::InvalidConfig(
                "backend.base_url cannot be empty".to_string(),
            ));
        }
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(Error::InvalidConfig(format!(
                "backend.base_url '{url}' must start with http:// or https://"
            )));
        }
        if self.timeout_ms == 0 {
            return Err(Error::InvalidConfig(
                "backend.timeout_ms must be > 0".to_string(),
            ));
        }
        Ok(())
    }
}

impl SyncConfig {
    fn validate(&self) -> Result<()> {
        if self.debounce_ms > MAX_DEBOUNCE_MS {
            return Err(Error::InvalidConfig(format!(
                "sync.debounce_ms must be <= {MAX_DEBOUNCE_MS}"
            )));
        }
        Ok(())
    }
}

impl BoardConfig {
    fn validate(&self) -> Result<()> {
        if self.position_step < 2 {
            return Err(Error::InvalidConfig(
                "board.position_step must be >= 2".to_string(),
            ));
        }
        if self.position_step > MAX_POSITION_STEP {
            return Err(Error::InvalidConfig(format!(
                "board.position_step must be <= {MAX_POSITION_STEP}"
            )));
        }
        Ok(())
    }
}
