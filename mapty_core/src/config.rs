//! Configuration file support for Mapty.
//!
//! Configuration is loaded from `$XDG_CONFIG_HOME/mapty/config.toml`.
//! Every field has a default, so the file is optional and may be partial.

use crate::geocode::{DEFAULT_FLAG_URL, DEFAULT_REVERSE_URL};
use crate::persistence::DEFAULT_KEY;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application configuration
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub data: DataConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub geocoding: GeocodingConfig,
}

/// Data storage location
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

/// Key-value storage settings
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Key the workout blob is saved under
    #[serde(default = "default_storage_key")]
    pub key: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            key: default_storage_key(),
        }
    }
}

/// Place name and flag lookups
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GeocodingConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_reverse_url")]
    pub reverse_url: String,

    #[serde(default = "default_flag_url")]
    pub flag_url: String,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for GeocodingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            reverse_url: default_reverse_url(),
            flag_url: default_flag_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

// Default value functions
fn default_data_dir() -> PathBuf {
    let base = dirs::data_local_dir()
        .or_else(|| dirs::home_dir().map(|home| home.join(".local/share")))
        .unwrap_or_else(|| PathBuf::from("."));
    base.join("mapty")
}

fn default_storage_key() -> String {
    DEFAULT_KEY.to_string()
}

fn default_true() -> bool {
    true
}

fn default_reverse_url() -> String {
    DEFAULT_REVERSE_URL.to_string()
}

fn default_flag_url() -> String {
    DEFAULT_FLAG_URL.to_string()
}

fn default_timeout_secs() -> u64 {
    5
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
        config.validate()?;
        tracing::info!("Loaded config from {:?}", path);
        Ok(config)
    }

    /// Reject values that would break storage or geocoding
    pub fn validate(&self) -> Result<()> {
        if self.storage.key.trim().is_empty() {
            return Err(Error::Config("storage.key must not be empty".into()));
        }
        if self.geocoding.timeout_secs == 0 {
            return Err(Error::Config(
                "geocoding.timeout_secs must be at least 1".into(),
            ));
        }
        Ok(())
    }

    /// Get the default config file path
    pub fn default_config_path() -> PathBuf {
        let base = dirs::config_dir()
            .or_else(|| dirs::home_dir().map(|home| home.join(".config")))
            .unwrap_or_else(|| PathBuf::from("."));
        base.join("mapty").join("config.toml")
    }

    /// Save the current configuration to a specific path
    pub fn save_to(&self, path: &Path) -> Result<()> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, contents)?;
        tracing::info!("Saved config to {:?}", path);
        Ok(())
    }
}
