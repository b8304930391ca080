//! Configuration file support for MedRescue.
//!
//! Configuration is loaded from `$XDG_CONFIG_HOME/medrescue/config.toml`.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Application configuration
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub data: DataConfig,

    #[serde(default)]
    pub recents: RecentsConfig,

    #[serde(default)]
    pub protocol: ProtocolConfig,
}

/// Data storage configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DataConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

/// Limits for the recent-searches and recent-medications lists
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RecentsConfig {
    #[serde(default = "default_max_items")]
    pub max_items: usize,

    /// Shorter searches are not remembered
    #[serde(default = "default_min_search_len")]
    pub min_search_len: usize,
}

impl Default for RecentsConfig {
    fn default() -> Self {
        Self {
            max_items: default_max_items(),
            min_search_len: default_min_search_len(),
        }
    }
}

/// Protocol runner configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProtocolConfig {
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,

    #[serde(default = "default_urgent_threshold_seconds")]
    pub urgent_threshold_seconds: u32,
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: default_tick_interval_ms(),
            urgent_threshold_seconds: default_urgent_threshold_seconds(),
        }
    }
}

impl ProtocolConfig {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }
}

// Default value functions
fn default_data_dir() -> PathBuf {
    let base = dirs::data_local_dir()
        .or_else(|| dirs::home_dir().map(|home| home.join(".local/share")))
        .unwrap_or_else(|| PathBuf::from("."));
    base.join("medrescue")
}

fn default_max_items() -> usize {
    10
}

fn default_min_search_len() -> usize {
    2
}

fn default_tick_interval_ms() -> u64 {
    1000
}

fn default_urgent_threshold_seconds() -> u32 {
    crate::timer::DEFAULT_URGENT_THRESHOLD_SECONDS
}

impl Config {
    /// Load configuration from the standard config path
    pub fn load() -> Result<Self> {
        let config_path = Self::default_config_path();
        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            tracing::info!("No config file found at {:?}, using defaults", config_path);
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.check()?;
        tracing::info!("Loaded config from {:?}", path);
        Ok(config)
    }

    /// Reject values the runtime cannot work with
    pub fn check(&self) -> Result<()> {
        if self.protocol.tick_interval_ms == 0 {
            return Err(Error::Config(
                "protocol.tick_interval_ms must be greater than zero".into(),
            ));
        }
        if self.recents.max_items == 0 {
            return Err(Error::Config(
                "recents.max_items must be greater than zero".into(),
            ));
        }
        Ok(())
    }

    /// Get the default config file path
    pub fn default_config_path() -> PathBuf {
        let base = dirs::config_dir()
            .or_else(|| dirs::home_dir().map(|home| home.join(".config")))
            .unwrap_or_else(|| PathBuf::from("."));
        base.join("medrescue").join("config.toml")
    }

    /// Save the current configuration to the default path
    pub fn save(&self) -> Result<()> {
        let config_path = Self::default_config_path();
        self.save_to(&config_path)
    }

    /// Save the current configuration to a specific path
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, contents)?;
        tracing::info!("Saved config to {:?}", path);
        Ok(())
    }

    /// Path of the favorites/recents file inside the data directory
    pub fn preferences_path(&self) -> PathBuf {
        self.data.data_dir.join("preferences.json")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.recents.max_items, 10);
        assert_eq!(config.recents.min_search_len, 2);
        assert_eq!(config.protocol.tick_interval(), Duration::from_secs(1));
        assert_eq!(config.protocol.urgent_threshold_seconds, 30);
        assert!(config.data.data_dir.ends_with("medrescue"));
    }

    #[test]
    fn test_partial_config() {
        let toml_str = r#"
[recents]
max_items = 5
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.recents.max_items, 5);
        assert_eq!(config.recents.min_search_len, 2); // default
        assert_eq!(config.protocol.tick_interval_ms, 1000);
    }

    #[test]
    fn test_save_and_load() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nested").join("config.toml");

        let mut config = Config::default();
        config.data.data_dir = temp.path().join("data");
        config.protocol.urgent_threshold_seconds = 15;
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.data.data_dir, temp.path().join("data"));
        assert_eq!(loaded.protocol.urgent_threshold_seconds, 15);
        assert_eq!(
            loaded.preferences_path(),
            temp.path().join("data").join("preferences.json")
        );
    }

    #[test]
    fn test_rejects_zero_tick_interval() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        std::fs::write(&path, "[protocol]\ntick_interval_ms = 0\n").unwrap();

        let err = Config::load_from(&path).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_invalid_toml() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        std::fs::write(&path, "[recents\nmax_items = ").unwrap();

        assert!(matches!(Config::load_from(&path), Err(Error::Toml(_))));
    }
}
