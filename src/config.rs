//! Configuration management for the streaming gateway

use crate::error::{GateError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Configuration for the gateway
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GateConfig {
    /// Address the HTTP server binds to (default: 127.0.0.1:8080)
    #[serde(default = "default_bind")]
    pub bind: String,

    /// Root directory of the local chunk store backing the default
    /// transfer implementation (default: ./library)
    #[serde(default = "default_library_root")]
    pub library_root: String,

    /// Storage channel all file routes resolve against (default: -100)
    #[serde(default = "default_channel_id")]
    pub channel_id: i64,

    /// Number of backing clients in the pool (default: 4)
    ///
    /// A pool of zero clients is a fatal startup condition.
    #[serde(default = "default_pool_size")]
    pub pool_size: usize,

    /// Length of the secure hash prefix embedded in routes (default: 6)
    #[serde(default = "default_hash_length")]
    pub hash_length: usize,

    /// Smallest per-request chunk size in bytes (default: 1MiB)
    #[serde(default = "default_chunk_floor")]
    pub chunk_floor_bytes: u64,

    /// Largest per-request chunk size in bytes (default: 2MiB)
    #[serde(default = "default_chunk_ceiling")]
    pub chunk_ceiling_bytes: u64,
}

// Default value functions for serde
fn default_bind() -> String {
    "127.0.0.1:8080".to_string()
}

fn default_library_root() -> String {
    "./library".to_string()
}

fn default_channel_id() -> i64 {
    -100
}

fn default_pool_size() -> usize {
    4
}

fn default_hash_length() -> usize {
    6
}

fn default_chunk_floor() -> u64 {
    1024 * 1024 // 1MiB
}

fn default_chunk_ceiling() -> u64 {
    2 * 1024 * 1024 // 2MiB
}

impl Default for GateConfig {
    fn default() -> Self {
        GateConfig {
            bind: default_bind(),
            library_root: default_library_root(),
            channel_id: default_channel_id(),
            pool_size: default_pool_size(),
            hash_length: default_hash_length(),
            chunk_floor_bytes: default_chunk_floor(),
            chunk_ceiling_bytes: default_chunk_ceiling(),
        }
    }
}

impl GateConfig {
    /// Load configuration from a YAML file
    ///
    /// # Returns
    /// * `Ok(GateConfig)` if loading and validation succeed
    /// * `Err(GateError)` if the file cannot be read or the config is invalid
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())
            .map_err(|e| GateError::ConfigError(format!("Failed to read config file: {}", e)))?;

        let config: GateConfig = serde_yaml::from_str(&content)
            .map_err(|e| GateError::ConfigError(format!("Failed to parse config file: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    ///
    /// # Validation Rules
    /// - pool_size must be at least 1
    /// - hash_length must be between 1 and 16
    /// - chunk floor and ceiling must be powers of two, 64KiB..=8MiB
    /// - chunk floor must not exceed the ceiling
    pub fn validate(&self) -> Result<()> {
        const MIN_CHUNK: u64 = 64 * 1024;
        const MAX_CHUNK: u64 = 8 * 1024 * 1024;

        if self.pool_size == 0 {
            return Err(GateError::ConfigError(
                "pool_size must be at least 1".to_string(),
            ));
        }

        if self.hash_length == 0 || self.hash_length > 16 {
            return Err(GateError::ConfigError(format!(
                "hash_length must be between 1 and 16, got {}",
                self.hash_length
            )));
        }

        for (name, value) in [
            ("chunk_floor_bytes", self.chunk_floor_bytes),
            ("chunk_ceiling_bytes", self.chunk_ceiling_bytes),
        ] {
            if !(MIN_CHUNK..=MAX_CHUNK).contains(&value) {
                return Err(GateError::ConfigError(format!(
                    "{} must be between {}KiB and {}MiB, got {} bytes",
                    name,
                    MIN_CHUNK / 1024,
                    MAX_CHUNK / (1024 * 1024),
                    value
                )));
            }
            if !value.is_power_of_two() {
                return Err(GateError::ConfigError(format!(
                    "{} must be a power of two, got {}",
                    name, value
                )));
            }
        }

        if self.chunk_floor_bytes > self.chunk_ceiling_bytes {
            return Err(GateError::ConfigError(format!(
                "chunk_floor_bytes ({}) must not exceed chunk_ceiling_bytes ({})",
                self.chunk_floor_bytes, self.chunk_ceiling_bytes
            )));
        }

        Ok(())
    }
}
