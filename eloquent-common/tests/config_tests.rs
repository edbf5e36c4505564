//! Unit tests for configuration loading and graceful degradation
//!
//! Tests cover:
//! - Missing TOML files SHALL NOT cause termination
//! - Unparseable TOML falls back to defaults
//! - Default config location honours the platform config directory
//!
//! Note: Uses serial_test crate to prevent ENV variable race conditions.

use eloquent_common::config::{
    default_config_path, load_toml_or_default, LoggingConfig, StorageConfig,
};
use serde::Deserialize;
use serial_test::serial;
use std::path::PathBuf;
use tempfile::TempDir;

#[derive(Debug, Deserialize)]
#[serde(default)]
struct SampleConfig {
    port: u16,
    logging: LoggingConfig,
    storage: StorageConfig,
}

impl Default for SampleConfig {
    fn default() -> Self {
        Self {
            port: 8000,
            logging: LoggingConfig::default(),
            storage: StorageConfig::default(),
        }
    }
}

#[test]
fn test_missing_file_uses_defaults() {
    let dir = TempDir::new().unwrap();
    let config: SampleConfig = load_toml_or_default(Some(&dir.path().join("absent.toml")));

    assert_eq!(config.port, 8000);
    assert_eq!(config.logging.level, "info");
}

#[test]
fn test_no_path_uses_defaults() {
    let config: SampleConfig = load_toml_or_default(None);
    assert_eq!(config.port, 8000);
}

#[test]
fn test_invalid_file_uses_defaults() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("broken.toml");
    std::fs::write(&path, "port = [not valid").unwrap();

    let config: SampleConfig = load_toml_or_default(Some(&path));
    assert_eq!(config.port, 8000);
}

#[test]
fn test_valid_file_overrides_defaults() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("service.toml");
    std::fs::write(
        &path,
        "port = 9100\n\n[logging]\nlevel = \"debug\"\n\n[storage]\nroot = \"/srv/bucket\"\n",
    )
    .unwrap();

    let config: SampleConfig = load_toml_or_default(Some(&path));
    assert_eq!(config.port, 9100);
    assert_eq!(config.logging.level, "debug");
    assert_eq!(config.storage.root, Some(PathBuf::from("/srv/bucket")));
}

#[cfg(target_os = "linux")]
#[test]
#[serial]
fn test_default_config_path_uses_xdg_config_home() {
    let dir = TempDir::new().unwrap();
    let previous = std::env::var_os("XDG_CONFIG_HOME");
    std::env::set_var("XDG_CONFIG_HOME", dir.path());

    let path = default_config_path("eloquent-tts.toml");

    match previous {
        Some(value) => std::env::set_var("XDG_CONFIG_HOME", value),
        None => std::env::remove_var("XDG_CONFIG_HOME"),
    }

    // /etc/eloquent only wins when the user file is absent and it exists
    let expected_user = dir.path().join("eloquent").join("eloquent-tts.toml");
    let system = PathBuf::from("/etc/eloquent/eloquent-tts.toml");
    let path = path.unwrap();
    assert!(path == expected_user || path == system);
}
