//! Configuration for the delivery pipeline
//!
//! Stored at `~/.config/courier/config.toml`; the dedup cache file lives
//! under the state directory. A missing config file yields defaults, a
//! malformed one is an error.

use crate::error::{CourierError, CourierResult};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CourierConfig {
    /// Upload destination settings
    pub delivery: DeliveryConfig,

    /// Payload encryption settings
    pub encryption: EncryptionConfig,

    /// Dedup cache settings
    pub cache: CacheConfig,
}

/// Upload destination settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DeliveryConfig {
    /// Collection endpoint URL
    pub endpoint: String,

    /// Multipart field name carrying the payload
    pub field_name: String,

    /// Extra form fields sent with every upload, in order. Values may be
    /// stored concealed (see [`crate::obfuscate`]) and are revealed at
    /// send time.
    pub form_fields: Vec<(String, String)>,
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            field_name: "document".to_string(),
            form_fields: vec![],
        }
    }
}

/// Payload encryption settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EncryptionConfig {
    /// Seal payloads before upload
    pub enabled: bool,

    /// Recipient SPKI public key, PEM encoded. Required when `enabled`.
    pub recipient_key_pem: Option<String>,
}

/// Dedup cache settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Cache file location; defaults to the state directory
    pub path: Option<PathBuf>,

    /// Rolling dedup window in hours
    pub window_hours: i64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            path: None,
            window_hours: crate::dedup::gate::DEFAULT_WINDOW_HOURS,
        }
    }
}

impl CourierConfig {
    /// Get the default config file path
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("courier")
            .join("config.toml")
    }

    /// Get the state directory path
    pub fn state_dir() -> PathBuf {
        dirs::state_dir()
            .or_else(dirs::data_local_dir)
            .unwrap_or_else(|| PathBuf::from("."))
            .join("courier")
    }

    /// Effective cache file path
    pub fn cache_path(&self) -> PathBuf {
        self.cache
            .path
            .clone()
            .unwrap_or_else(|| Self::state_dir().join("sent.dat"))
    }

    /// Load configuration from `path`, falling back to defaults when the
    /// file does not exist
    pub fn load(path: &Path) -> CourierResult<Self> {
        if !path.exists() {
            debug!("Config file not found, using defaults");
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .map_err(|e| CourierError::io(format!("reading config from {}", path.display()), e))?;

        toml::from_str(&content).map_err(|e| CourierError::ConfigInvalid {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    /// Save configuration to `path`
    pub fn save(&self, path: &Path) -> CourierResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| CourierError::io(format!("creating {}", parent.display()), e))?;
        }

        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)
            .map_err(|e| CourierError::io(format!("writing config to {}", path.display()), e))
    }
}
