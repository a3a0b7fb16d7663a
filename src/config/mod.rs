//! Configuration management for Loadstone

pub mod schema;

pub use schema::Config;

use crate::error::{LoadstoneError, LoadstoneResult};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};

/// Configuration manager
pub struct ConfigManager {
    config_path: PathBuf,
}

impl ConfigManager {
    /// Create a new config manager with default path
    pub fn new() -> Self {
        Self {
            config_path: Self::default_config_path(),
        }
    }

    /// Create a config manager with a custom path
    pub fn with_path(path: PathBuf) -> Self {
        Self { config_path: path }
    }

    /// Get the default config file path
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("loadstone")
            .join("config.toml")
    }

    /// Get the state directory path
    pub fn state_dir() -> PathBuf {
        dirs::state_dir()
            .or_else(dirs::data_local_dir)
            .unwrap_or_else(|| PathBuf::from("."))
            .join("loadstone")
    }

    /// Get the default package cache root
    pub fn default_cache_root() -> PathBuf {
        Self::state_dir().join("cache")
    }

    /// Get the default base content directory
    pub fn default_base_content() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("loadstone")
            .join("base")
    }

    /// The path this manager loads from and saves to
    pub fn path(&self) -> &Path {
        &self.config_path
    }

    /// Load configuration, using defaults if the file does not exist
    pub async fn load(&self) -> LoadstoneResult<Config> {
        if !self.config_path.exists() {
            debug!("Config file not found, using defaults");
            return Ok(Config::default());
        }

        self.load_from_file(&self.config_path).await
    }

    /// Load configuration from a specific file
    pub async fn load_from_file(&self, path: &Path) -> LoadstoneResult<Config> {
        let content = fs::read_to_string(path)
            .await
            .map_err(|e| LoadstoneError::io(format!("reading config from {}", path.display()), e))?;

        Ok(toml::from_str(&content)?)
    }

    /// Save configuration to file
    pub async fn save(&self, config: &Config) -> LoadstoneResult<()> {
        if let Some(parent) = self.config_path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| LoadstoneError::io("creating config directory", e))?;
        }

        let content = toml::to_string_pretty(config)?;
        fs::write(&self.config_path, content).await.map_err(|e| {
            LoadstoneError::io(
                format!("writing config to {}", self.config_path.display()),
                e,
            )
        })?;

        info!("Configuration saved to {}", self.config_path.display());
        Ok(())
    }
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}
