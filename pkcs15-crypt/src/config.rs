//! Operation layer configuration
//!
//! Options consulted while dispatching operations: PIN cache behaviour and
//! whether secure buffers are pinned in memory. Stored as JSON.

use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

/// Configuration for the cryptographic operation layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CryptoConfig {
    /// Re-present cached PINs when the card drops its security status
    pub use_pin_caching: bool,
    /// Number of revalidations a cached PIN may serve
    pub pin_cache_counter: u32,
    /// Revalidate even keys that require user consent for each use
    pub pin_cache_ignore_user_consent: bool,
    /// Pin secure buffers in RAM with mlock
    pub lock_secure_memory: bool,
}

impl Default for CryptoConfig {
    fn default() -> Self {
        Self {
            use_pin_caching: true,
            pin_cache_counter: 10,
            pin_cache_ignore_user_consent: false,
            lock_secure_memory: true,
        }
    }
}

impl CryptoConfig {
    const DEFAULT_CONFIG_FILE: &'static str = "config.json";

    /// Get the default configuration file path
    pub fn default_config_path() -> PathBuf {
        if let Ok(path) = std::env::var("PKCS15_CRYPT_CONFIG") {
            return PathBuf::from(path);
        }
        if let Some(dir) = dirs::config_dir() {
            return dir.join("pkcs15-crypt").join(Self::DEFAULT_CONFIG_FILE);
        }
        PathBuf::from("/etc/pkcs15-crypt").join(Self::DEFAULT_CONFIG_FILE)
    }

    /// Load configuration, falling back to defaults when the file is
    /// missing or cannot be parsed
    pub fn load(path: Option<PathBuf>) -> Self {
        let path = path.unwrap_or_else(Self::default_config_path);
        if !path.exists() {
            debug!("No configuration at {:?}, using defaults", path);
            return Self::default();
        }

        match fs::read_to_string(&path) {
            Ok(content) => match serde_json::from_str(&content) {
                Ok(config) => {
                    info!("Loaded configuration from {:?}", path);
                    config
                }
                Err(e) => {
                    warn!("Failed to parse configuration {:?}: {}", path, e);
                    Self::default()
                }
            },
            Err(e) => {
                warn!("Failed to read configuration {:?}: {}", path, e);
                Self::default()
            }
        }
    }

    /// Save configuration as pretty-printed JSON
    pub fn save(&self, path: &Path) -> bool {
        if let Some(parent) = path.parent() {
            if let Err(e) = fs::create_dir_all(parent) {
                warn!("Failed to create configuration directory: {}", e);
                return false;
            }
        }

        let content = match serde_json::to_string_pretty(self) {
            Ok(c) => c,
            Err(e) => {
                warn!("Failed to serialize configuration: {}", e);
                return false;
            }
        };

        match fs::write(path, content) {
            Ok(()) => {
                debug!("Saved configuration to {:?}", path);
                true
            }
            Err(e) => {
                warn!("Failed to write configuration: {}", e);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempdir().unwrap();
        let config = CryptoConfig::load(Some(dir.path().join("absent.json")));
        assert_eq!(config, CryptoConfig::default());
        assert!(config.use_pin_caching);
        assert_eq!(config.pin_cache_counter, 10);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");

        let config = CryptoConfig {
            use_pin_caching: false,
            pin_cache_counter: 3,
            pin_cache_ignore_user_consent: true,
            lock_secure_memory: false,
        };
        assert!(config.save(&path));

        let loaded = CryptoConfig::load(Some(path));
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{ "pin_cache_counter": 2 }"#).unwrap();

        let loaded = CryptoConfig::load(Some(path));
        assert_eq!(loaded.pin_cache_counter, 2);
        assert!(loaded.use_pin_caching);
        assert!(loaded.lock_secure_memory);
    }

    #[test]
    fn test_malformed_file_gives_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "not json").unwrap();

        assert_eq!(CryptoConfig::load(Some(path)), CryptoConfig::default());
    }
}
