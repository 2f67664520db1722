//! Configuration management for PanelFS.
//!
//! This module provides TOML-based configuration file loading and saving.
//! The default configuration path is `~/.config/panelfs/config.toml`.

use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::files::GatewayConfig;
use crate::lookup;
use crate::size::{SizeFormatter, UnitSystem};

/// Configuration validation errors.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("max_edit_size must be between 1 and {max}, got {got}")]
    InvalidMaxEditSize { got: u64, max: u64 },

    #[error("timeout_ms must be between 1 and 300000, got {0}")]
    InvalidTimeout(u64),

    #[error("daemon address must be host:port with an IP host, got {0}")]
    InvalidAddress(String),

    #[error("log level must be one of: trace, debug, info, warn, error; got {0}")]
    InvalidLogLevel(String),
}

/// Valid log level values for tracing configuration.
const VALID_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Upper bound for `daemon.timeout_ms` (five minutes).
const MAX_TIMEOUT_MS: u64 = 300_000;

/// Main configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    /// How to reach the daemon.
    pub daemon: DaemonConfig,

    /// File editing limits and display.
    pub files: FilesConfig,

    /// Log output.
    pub logging: LoggingConfig,
}

/// Daemon connection configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DaemonConfig {
    /// Daemon address as `ip:port`.
    pub address: String,

    /// Bound on one request/response exchange, in milliseconds.
    pub timeout_ms: u64,
}

/// File editing configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct FilesConfig {
    /// Largest file, in bytes, that may be opened for editing (default: 4MiB).
    pub max_edit_size: u64,

    /// Show sizes with binary prefixes (KiB, MiB) instead of decimal ones.
    pub use_binary_prefix: bool,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    /// Logging level (trace, debug, info, warn, error).
    pub level: String,

    /// When set, logs are also written to a daily file in this directory.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub directory: Option<PathBuf>,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            address: "127.0.0.1:8080".to_string(),
            timeout_ms: 5_000,
        }
    }
}

impl Default for FilesConfig {
    fn default() -> Self {
        Self {
            max_edit_size: 4 * 1024 * 1024, // 4MiB
            use_binary_prefix: true,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            directory: None,
        }
    }
}

impl DaemonConfig {
    /// Parsed daemon address.
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.address
            .parse()
            .map_err(|_| ConfigError::InvalidAddress(self.address.clone()))
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl FilesConfig {
    pub fn unit_system(&self) -> UnitSystem {
        UnitSystem::from_binary_flag(self.use_binary_prefix)
    }

    pub fn size_formatter(&self) -> SizeFormatter {
        SizeFormatter::new(self.unit_system())
    }
}

/// Returns the default configuration file path.
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("panelfs")
        .join("config.toml")
}

impl Config {
    /// Apply environment variable overrides to the configuration.
    ///
    /// Environment variables take precedence over config file values.
    /// Supported variables:
    /// - PANELFS_DAEMON_ADDRESS: Override the daemon address
    /// - PANELFS_LOG_LEVEL: Override log level (trace, debug, info, warn, error)
    pub fn apply_env_overrides(&mut self) {
        if let Ok(address) = std::env::var("PANELFS_DAEMON_ADDRESS") {
            if !address.is_empty() {
                tracing::info!("Overriding daemon address from environment: {}", address);
                self.daemon.address = address;
            }
        }

        if let Ok(level) = std::env::var("PANELFS_LOG_LEVEL") {
            if !level.is_empty() {
                tracing::info!("Overriding log level from environment: {}", level);
                self.logging.level = level;
            }
        }
    }

    /// Validate the configuration values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let max = protocol::MAX_CONTENT_SIZE as u64;
        if self.files.max_edit_size == 0 || self.files.max_edit_size > max {
            return Err(ConfigError::InvalidMaxEditSize {
                got: self.files.max_edit_size,
                max,
            });
        }

        if self.daemon.timeout_ms == 0 || self.daemon.timeout_ms > MAX_TIMEOUT_MS {
            return Err(ConfigError::InvalidTimeout(self.daemon.timeout_ms));
        }

        self.daemon.socket_addr()?;

        let level = self.logging.level.to_lowercase();
        if !VALID_LOG_LEVELS.contains(&level.as_str()) {
            return Err(ConfigError::InvalidLogLevel(self.logging.level.clone()));
        }

        Ok(())
    }

    /// Gateway settings derived from the daemon section.
    pub fn gateway_config(&self) -> GatewayConfig {
        GatewayConfig {
            timeout: self.daemon.timeout(),
        }
    }

    /// Look up a setting by dotted key, e.g. `files.max_edit_size`.
    ///
    /// Returns `None` for unknown keys.
    pub fn setting(&self, key: &str) -> Option<serde_json::Value> {
        let tree = serde_json::to_value(self).ok()?;
        lookup::find(&tree, key).cloned()
    }

    /// Typed [`setting`](Self::setting), falling back to `default` when the
    /// key is unknown or holds a value of another type.
    pub fn setting_or<T: DeserializeOwned>(&self, key: &str, default: T) -> T {
        match serde_json::to_value(self) {
            Ok(tree) => lookup::get_strict_as(&tree, key, default),
            Err(_) => default,
        }
    }

    /// Load configuration from a file.
    ///
    /// If the file does not exist, returns the default configuration.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            tracing::debug!("Config file not found at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::from_toml(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Load configuration from the default path.
    pub fn load_default() -> Result<Self> {
        Self::load(default_config_path())
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        toml::from_str(toml_str)
            .map_err(|e| anyhow::anyhow!("Invalid TOML configuration: {}", format_toml_error(&e)))
    }

    /// Save configuration to a file, creating parent directories.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let contents = self.to_toml()?;
        fs::write(path, contents)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        tracing::debug!("Configuration saved to {:?}", path);
        Ok(())
    }

    /// Serialize configuration to a TOML string.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")
    }
}

fn format_toml_error(error: &toml::de::Error) -> String {
    let mut msg = error.message().to_string();

    if let Some(span) = error.span() {
        msg.push_str(&format!(" (at position {}..{})", span.start, span.end));
    }

    msg
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.daemon.address, "127.0.0.1:8080");
        assert_eq!(config.daemon.timeout_ms, 5000);
        assert_eq!(config.files.max_edit_size, 4 * 1024 * 1024);
        assert!(config.files.use_binary_prefix);
        assert_eq!(config.logging.level, "info");
        assert!(config.logging.directory.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_toml_empty() {
        let config = Config::from_toml("").unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_from_toml_partial() {
        let toml = r#"
[daemon]
address = "10.0.0.5:8080"

[files]
use_binary_prefix = false
"#;
        let config = Config::from_toml(toml).unwrap();

        assert_eq!(config.daemon.address, "10.0.0.5:8080");
        assert_eq!(config.daemon.timeout_ms, 5000);
        assert!(!config.files.use_binary_prefix);
        assert_eq!(config.files.unit_system(), UnitSystem::Decimal);
        assert_eq!(config.files.size_formatter().format(1024), "1.02 KB");
    }

    #[test]
    fn test_from_toml_invalid() {
        let err = Config::from_toml("[files]\nmax_edit_size = \"big\"").unwrap_err();
        assert!(err.to_string().contains("Invalid TOML configuration"));
    }

    #[test]
    fn test_save_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.toml");

        let mut original = Config::default();
        original.files.max_edit_size = 1024;
        original.logging.directory = Some(temp_dir.path().join("logs"));

        original.save(&config_path).unwrap();
        let loaded = Config::load(&config_path).unwrap();

        assert_eq!(original, loaded);
    }

    #[test]
    fn test_save_creates_parent_dirs() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("nested").join("config.toml");

        Config::default().save(&config_path).unwrap();
        assert!(config_path.exists());
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let config = Config::load(temp_dir.path().join("absent.toml")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_default_config_path() {
        let path = default_config_path();
        assert!(path.ends_with("panelfs/config.toml"));
    }

    #[test]
    fn test_validate_max_edit_size() {
        let mut config = Config::default();
        config.files.max_edit_size = 0;
        assert_eq!(
            config.validate(),
            Err(ConfigError::InvalidMaxEditSize {
                got: 0,
                max: protocol::MAX_CONTENT_SIZE as u64,
            })
        );
    }

    #[test]
    fn test_validate_max_edit_size_must_fit_in_a_frame() {
        let mut config = Config::default();
        config.files.max_edit_size = protocol::MAX_CONTENT_SIZE as u64;
        assert!(config.validate().is_ok());

        config.files.max_edit_size = 32 * 1024 * 1024;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidMaxEditSize { got, .. }) if got == 32 * 1024 * 1024
        ));
    }

    #[test]
    fn test_validate_timeout_bounds() {
        let mut config = Config::default();
        config.daemon.timeout_ms = 0;
        assert_eq!(config.validate(), Err(ConfigError::InvalidTimeout(0)));

        config.daemon.timeout_ms = 300_001;
        assert_eq!(config.validate(), Err(ConfigError::InvalidTimeout(300_001)));

        config.daemon.timeout_ms = 300_000;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_address() {
        let mut config = Config::default();
        config.daemon.address = "daemon.local".to_string();
        assert_eq!(
            config.validate(),
            Err(ConfigError::InvalidAddress("daemon.local".to_string()))
        );
    }

    #[test]
    fn test_validate_log_level() {
        let mut config = Config::default();
        config.logging.level = "WARN".to_string();
        assert!(config.validate().is_ok());

        config.logging.level = "verbose".to_string();
        assert_eq!(
            config.validate(),
            Err(ConfigError::InvalidLogLevel("verbose".to_string()))
        );
    }

    #[test]
    fn test_gateway_config_uses_timeout() {
        let mut config = Config::default();
        config.daemon.timeout_ms = 250;
        assert_eq!(
            config.gateway_config().timeout,
            Duration::from_millis(250)
        );
    }

    #[test]
    fn test_setting_lookup() {
        let config = Config::default();
        assert_eq!(
            config.setting("files.max_edit_size"),
            Some(serde_json::json!(4194304))
        );
        assert_eq!(config.setting("files.nope"), None);
        assert_eq!(config.setting_or("daemon.timeout_ms", 0u64), 5000);
        assert_eq!(config.setting_or("daemon.retries", 3u32), 3);
    }

    #[test]
    #[serial]
    fn test_env_override_address() {
        std::env::set_var("PANELFS_DAEMON_ADDRESS", "10.1.2.3:9000");

        let mut config = Config::default();
        config.apply_env_overrides();
        assert_eq!(config.daemon.address, "10.1.2.3:9000");

        std::env::remove_var("PANELFS_DAEMON_ADDRESS");
    }

    #[test]
    #[serial]
    fn test_env_override_empty_does_not_override() {
        std::env::set_var("PANELFS_DAEMON_ADDRESS", "");

        let mut config = Config::default();
        config.apply_env_overrides();
        assert_eq!(config.daemon.address, "127.0.0.1:8080");

        std::env::remove_var("PANELFS_DAEMON_ADDRESS");
    }

    #[test]
    #[serial]
    fn test_env_override_log_level() {
        std::env::remove_var("PANELFS_DAEMON_ADDRESS");
        std::env::set_var("PANELFS_LOG_LEVEL", "debug");

        let mut config = Config::default();
        config.apply_env_overrides();
        assert_eq!(config.logging.level, "debug");

        std::env::remove_var("PANELFS_LOG_LEVEL");
    }
}
