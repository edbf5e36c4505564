//! Configuration for eloquent-tts
//!
//! Settings resolve in this priority order:
//! 1. Command-line arguments (`--port`, `--engine-url`, ...)
//! 2. Environment variables (`ELOQUENT_PORT`, ...), read by clap
//! 3. TOML bootstrap file (`~/.config/eloquent/eloquent-tts.toml`)
//! 4. Compiled defaults
//!
//! [`TomlConfig`] is the file format; [`ServiceConfig`] is the fully
//! resolved result handed to the rest of the service.

use std::path::PathBuf;
use std::time::Duration;

use eloquent_common::config::{default_data_dir, LoggingConfig, StorageConfig};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Config file name under the platform config directory
pub const CONFIG_FILE_NAME: &str = "eloquent-tts.toml";

/// TOML bootstrap file
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    pub bind_addr: String,
    pub port: u16,
    /// Base URL of the inference server
    pub engine_url: String,
    /// How long jobs wait for engine warm-up
    pub engine_ready_timeout_secs: u64,
    /// Per-clause engine request timeout
    pub engine_request_timeout_secs: u64,
    /// Minimum input length in characters
    pub min_text_chars: usize,
    /// Local cache of downloaded voice references
    pub voice_cache_dir: Option<PathBuf>,
    /// Local preset voices
    pub presets_dir: Option<PathBuf>,
    /// Object key prefix holding reference voices
    pub reference_prefix: String,
    pub storage: StorageConfig,
    pub cache_sync: CacheSyncToml,
    pub logging: LoggingConfig,
}

impl Default for TomlConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0".to_string(),
            port: 8000,
            engine_url: "http://127.0.0.1:8080".to_string(),
            engine_ready_timeout_secs: 120,
            engine_request_timeout_secs: 600,
            min_text_chars: 3,
            voice_cache_dir: None,
            presets_dir: None,
            reference_prefix: "references".to_string(),
            storage: StorageConfig::default(),
            cache_sync: CacheSyncToml::default(),
            logging: LoggingConfig::default(),
        }
    }
}

/// `[cache_sync]` table
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSyncToml {
    /// Only effective when object storage is configured
    pub enabled: bool,
    /// Directory tree to back up (compiled-model cache)
    pub cache_dir: Option<PathBuf>,
    pub archive_key: String,
    pub interval_secs: u64,
}

impl Default for CacheSyncToml {
    fn default() -> Self {
        Self {
            enabled: true,
            cache_dir: None,
            archive_key: "cache/compile_cache.tar.gz".to_string(),
            interval_secs: 60,
        }
    }
}

/// Command-line / environment overrides
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub port: Option<u16>,
    pub engine_url: Option<String>,
    pub storage_root: Option<PathBuf>,
    pub cache_dir: Option<PathBuf>,
}

/// Resolved cache sync settings
#[derive(Debug, Clone)]
pub struct CacheSyncSettings {
    pub cache_dir: PathBuf,
    pub archive_key: String,
    pub interval: Duration,
}

/// Fully resolved service configuration
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub bind_addr: String,
    pub port: u16,
    pub engine_url: String,
    pub engine_ready_timeout: Duration,
    pub engine_request_timeout: Duration,
    pub min_text_chars: usize,
    pub voice_cache_dir: PathBuf,
    pub presets_dir: PathBuf,
    pub reference_prefix: String,
    /// Object storage root; `None` disables remote tiers and cache sync
    pub storage_root: Option<PathBuf>,
    /// `None` when disabled or no storage is configured
    pub cache_sync: Option<CacheSyncSettings>,
    pub log_level: String,
}

impl ServiceConfig {
    /// Merge overrides over the TOML file over defaults
    pub fn resolve(toml: TomlConfig, overrides: ConfigOverrides) -> Self {
        let data_dir = default_data_dir();

        let storage_root = overrides.storage_root.or(toml.storage.root);
        let cache_sync = match (&storage_root, toml.cache_sync.enabled) {
            (Some(_), true) => Some(CacheSyncSettings {
                cache_dir: overrides
                    .cache_dir
                    .or(toml.cache_sync.cache_dir)
                    .unwrap_or_else(|| data_dir.join("compile_cache")),
                archive_key: toml.cache_sync.archive_key,
                interval: Duration::from_secs(toml.cache_sync.interval_secs.max(1)),
            }),
            (None, true) => {
                info!("Cache sync disabled: no object storage configured");
                None
            }
            (_, false) => None,
        };

        Self {
            bind_addr: toml.bind_addr,
            port: overrides.port.unwrap_or(toml.port),
            engine_url: overrides.engine_url.unwrap_or(toml.engine_url),
            engine_ready_timeout: Duration::from_secs(toml.engine_ready_timeout_secs),
            engine_request_timeout: Duration::from_secs(toml.engine_request_timeout_secs),
            min_text_chars: toml.min_text_chars,
            voice_cache_dir: toml
                .voice_cache_dir
                .unwrap_or_else(|| data_dir.join("references")),
            presets_dir: toml.presets_dir.unwrap_or_else(|| data_dir.join("presets")),
            reference_prefix: toml.reference_prefix,
            storage_root,
            cache_sync,
            log_level: toml.logging.level,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use eloquent_common::config::parse_toml;

    #[test]
    fn test_defaults() {
        let config = ServiceConfig::resolve(TomlConfig::default(), ConfigOverrides::default());
        assert_eq!(config.port, 8000);
        assert_eq!(config.min_text_chars, 3);
        assert_eq!(config.engine_ready_timeout, Duration::from_secs(120));
        assert_eq!(config.reference_prefix, "references");
        assert!(config.storage_root.is_none());
        assert!(config.cache_sync.is_none());
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn test_toml_values() {
        let toml: TomlConfig = parse_toml(
            r#"
            port = 9000
            min_text_chars = 10

            [storage]
            root = "/mnt/bucket"

            [cache_sync]
            cache_dir = "/var/cache/compile"
            interval_secs = 30

            [logging]
            level = "debug"
            "#,
        )
        .unwrap();

        let config = ServiceConfig::resolve(toml, ConfigOverrides::default());
        assert_eq!(config.port, 9000);
        assert_eq!(config.min_text_chars, 10);
        assert_eq!(config.storage_root, Some(PathBuf::from("/mnt/bucket")));
        let sync = config.cache_sync.unwrap();
        assert_eq!(sync.cache_dir, PathBuf::from("/var/cache/compile"));
        assert_eq!(sync.interval, Duration::from_secs(30));
        assert_eq!(sync.archive_key, "cache/compile_cache.tar.gz");
        assert_eq!(config.log_level, "debug");
    }

    #[test]
    fn test_overrides_win() {
        let toml: TomlConfig = parse_toml("port = 9000\nengine_url = \"http://a\"").unwrap();
        let config = ServiceConfig::resolve(
            toml,
            ConfigOverrides {
                port: Some(7000),
                engine_url: Some("http://b".to_string()),
                storage_root: Some(PathBuf::from("/srv/bucket")),
                cache_dir: Some(PathBuf::from("/tmp/cc")),
            },
        );
        assert_eq!(config.port, 7000);
        assert_eq!(config.engine_url, "http://b");
        assert_eq!(config.storage_root, Some(PathBuf::from("/srv/bucket")));
        assert_eq!(
            config.cache_sync.map(|s| s.cache_dir),
            Some(PathBuf::from("/tmp/cc"))
        );
    }

    #[test]
    fn test_cache_sync_can_be_disabled() {
        let toml: TomlConfig =
            parse_toml("[storage]\nroot = \"/mnt\"\n[cache_sync]\nenabled = false").unwrap();
        let config = ServiceConfig::resolve(toml, ConfigOverrides::default());
        assert!(config.cache_sync.is_none());
    }
}
