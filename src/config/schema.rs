//! Configuration schema for Loadstone
//!
//! Configuration is stored at `~/.config/loadstone/config.toml`

use crate::config::ConfigManager;
use crate::vfs::CollisionPolicy;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General settings
    pub general: GeneralConfig,

    /// Package cache settings
    pub cache: CacheConfig,

    /// Package source settings
    pub source: SourceConfig,

    /// Mount table settings
    pub mount: MountConfig,

    /// Runtime bootstrap settings
    pub runtime: RuntimeConfig,
}

/// General application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Enable verbose logging
    pub verbose: bool,

    /// Log format: "text" or "json"
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            verbose: false,
            log_format: "text".to_string(),
        }
    }
}

/// Package cache configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Cache root directory; defaults to the state directory
    pub root: Option<PathBuf>,
}

/// Package source configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// Registry base URL
    pub url: Option<String>,

    /// Local published-package directory; takes precedence over `url`
    pub dir: Option<PathBuf>,

    /// Retrieval timeout in seconds
    pub timeout_secs: u64,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            url: None,
            dir: None,
            timeout_secs: 30,
        }
    }
}

/// Mount table configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MountConfig {
    /// Policy when two packages provide the same logical path
    pub collision: CollisionPolicy,
}

/// Runtime bootstrap configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Base content directory mounted during bootstrap
    pub base_content: Option<PathBuf>,
}

impl Config {
    /// Effective cache root, falling back to the default state directory
    pub fn cache_root(&self) -> PathBuf {
        self.cache
            .root
            .clone()
            .unwrap_or_else(ConfigManager::default_cache_root)
    }

    /// Effective base content directory
    pub fn base_content_dir(&self) -> PathBuf {
        self.runtime
            .base_content
            .clone()
            .unwrap_or_else(ConfigManager::default_base_content)
    }

    /// Effective retrieval timeout
    pub fn source_timeout(&self) -> Duration {
        Duration::from_secs(self.source.timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = Config::default();
        assert_eq!(config.source.timeout_secs, 30);
        assert_eq!(config.mount.collision, CollisionPolicy::LastWins);
        assert!(config.cache.root.is_none());
        assert_eq!(config.general.log_format, "text");
    }

    #[test]
    fn toml_roundtrip() {
        let mut config = Config::default();
        config.cache.root = Some(PathBuf::from("/tmp/cache"));
        config.mount.collision = CollisionPolicy::Strict;

        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: Config = toml::from_str(&toml_str).unwrap();

        assert_eq!(parsed.cache.root, Some(PathBuf::from("/tmp/cache")));
        assert_eq!(parsed.mount.collision, CollisionPolicy::Strict);
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let config: Config = toml::from_str(
            r#"
            [source]
            url = "https://registry.example"
            "#,
        )
        .unwrap();

        assert_eq!(config.source.url.as_deref(), Some("https://registry.example"));
        assert_eq!(config.source.timeout_secs, 30);
        assert_eq!(config.mount.collision, CollisionPolicy::LastWins);
    }

    #[test]
    fn collision_policy_labels_parse() {
        let config: Config = toml::from_str(
            r#"
            [mount]
            collision = "first-wins"
            "#,
        )
        .unwrap();
        assert_eq!(config.mount.collision, CollisionPolicy::FirstWins);
    }
}
