//! Bootstrap configuration helpers
//!
//! Services resolve settings in this priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//! 4. Compiled default (fallback)
//!
//! This module covers tiers 3 and 4. A missing or unreadable TOML file is
//! never fatal: the caller gets a warning in the log and compiled defaults.

use crate::{Error, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Directory name used under the platform config/data directories
pub const APP_DIR_NAME: &str = "eloquent";

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Object storage configuration
///
/// `root` points at a directory holding the bucket contents (a mounted
/// volume or synced bucket). When unset, remote tiers are disabled.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub root: Option<PathBuf>,
}

/// Default TOML config path for a service
///
/// Linux: `~/.config/eloquent/<file_name>`, falling back to
/// `/etc/eloquent/<file_name>` when the user file does not exist.
pub fn default_config_path(file_name: &str) -> Option<PathBuf> {
    let user_config = dirs::config_dir().map(|d| d.join(APP_DIR_NAME).join(file_name));

    if cfg!(target_os = "linux") {
        let system_config = PathBuf::from("/etc").join(APP_DIR_NAME).join(file_name);
        match user_config {
            Some(path) if path.exists() => Some(path),
            _ if system_config.exists() => Some(system_config),
            other => other,
        }
    } else {
        user_config
    }
}

/// OS-dependent default data folder
pub fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join(APP_DIR_NAME))
        .unwrap_or_else(|| PathBuf::from("./eloquent_data"))
}

/// Parse a TOML document into `T`
pub fn parse_toml<T: DeserializeOwned>(content: &str) -> Result<T> {
    toml::from_str(content).map_err(|e| Error::Config(format!("Parse TOML failed: {}", e)))
}

/// Read and parse a TOML file
pub fn read_toml_file<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
    parse_toml(&content)
}

/// Load a TOML config with graceful degradation
///
/// Returns `T::default()` when no path is known, the file is missing, or it
/// fails to parse. Parse failures are logged at warn level.
pub fn load_toml_or_default<T>(path: Option<&Path>) -> T
where
    T: DeserializeOwned + Default,
{
    let Some(path) = path else {
        info!("No config file location available, using compiled defaults");
        return T::default();
    };

    if !path.exists() {
        warn!(
            "Config file {} not found, using compiled defaults",
            path.display()
        );
        return T::default();
    }

    match read_toml_file(path) {
        Ok(config) => {
            info!("Loaded config from {}", path.display());
            config
        }
        Err(e) => {
            warn!("{} - using compiled defaults", e);
            T::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_logging_defaults_to_info() {
        let logging: LoggingConfig = parse_toml("").unwrap();
        assert_eq!(logging.level, "info");
    }

    #[test]
    fn test_storage_root_optional() {
        let storage: StorageConfig = parse_toml("").unwrap();
        assert!(storage.root.is_none());

        let storage: StorageConfig = parse_toml("root = \"/mnt/bucket\"").unwrap();
        assert_eq!(storage.root, Some(PathBuf::from("/mnt/bucket")));
    }

    #[test]
    fn test_parse_error_is_config_error() {
        let result: Result<StorageConfig> = parse_toml("root = ");
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_load_falls_back_to_defaults() {
        let dir = tempfile::TempDir::new().unwrap();

        let none: LoggingConfig = load_toml_or_default(None);
        assert_eq!(none.level, "info");

        let missing: LoggingConfig = load_toml_or_default(Some(&dir.path().join("absent.toml")));
        assert_eq!(missing.level, "info");

        let broken = dir.path().join("broken.toml");
        std::fs::write(&broken, "level = ").unwrap();
        let broken: LoggingConfig = load_toml_or_default(Some(&broken));
        assert_eq!(broken.level, "info");

        let good = dir.path().join("good.toml");
        std::fs::write(&good, "level = \"debug\"").unwrap();
        let good: LoggingConfig = load_toml_or_default(Some(&good));
        assert_eq!(good.level, "debug");
    }
}
