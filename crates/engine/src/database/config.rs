//! Database configuration via `jsondb.toml`
//!
//! On first open, a default `jsondb.toml` is written to the store root. Later
//! opens read it back, so settings that shape the on-disk layout (the shard
//! width) stay stable across restarts. To change settings, edit the file and
//! reopen.

use jsondb_core::{Error, Result};
use jsondb_storage::layout::{MAX_SHARD_WIDTH, MIN_SHARD_WIDTH};
use jsondb_storage::StoreOptions;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Config file name placed in the store root.
pub const CONFIG_FILE_NAME: &str = "jsondb.toml";

/// Database configuration loaded from `jsondb.toml`.
///
/// # Example
///
/// ```toml
/// # "standard" = atomic rename, no fsync; "always" = fsync before rename
/// durability = "standard"
/// shard_width = 2
/// pretty = true
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Durability mode: `"standard"` or `"always"`.
    #[serde(default = "default_durability")]
    pub durability: String,
    /// Hex characters of the id digest used as shard directory name.
    #[serde(default = "default_shard_width")]
    pub shard_width: usize,
    /// Write documents as indented JSON.
    #[serde(default = "default_pretty")]
    pub pretty: bool,
}

fn default_durability() -> String {
    "standard".to_string()
}

fn default_shard_width() -> usize {
    2
}

fn default_pretty() -> bool {
    true
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            durability: default_durability(),
            shard_width: default_shard_width(),
            pretty: default_pretty(),
        }
    }
}

impl DatabaseConfig {
    /// Check every field, returning the storage options they imply.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] for an unknown durability mode or an
    /// out-of-range shard width.
    pub fn store_options(&self) -> Result<StoreOptions> {
        let sync = match self.durability.as_str() {
            "standard" => false,
            "always" => true,
            other => {
                return Err(Error::Config(format!(
                    "Invalid durability mode '{}' in {}. Expected \"standard\" or \"always\".",
                    other, CONFIG_FILE_NAME
                )))
            }
        };
        if !(MIN_SHARD_WIDTH..=MAX_SHARD_WIDTH).contains(&self.shard_width) {
            return Err(Error::Config(format!(
                "shard_width must be between {} and {}, got {}",
                MIN_SHARD_WIDTH, MAX_SHARD_WIDTH, self.shard_width
            )));
        }
        Ok(StoreOptions {
            shard_width: self.shard_width,
            sync,
            pretty: self.pretty,
        })
    }

    /// Returns the default config file content with comments.
    pub fn default_toml() -> &'static str {
        r#"# jsondb configuration
#
# Durability mode: "standard" (default) or "always"
#   "standard" = documents are replaced by atomic rename, no fsync
#   "always"   = the new file is fsynced before the rename
durability = "standard"

# Number of hex characters of the id hash used as the shard directory (1-4).
# Do not change this for an existing store.
shard_width = 2

# Write documents as indented JSON.
pretty = true
"#
    }

    /// Read and parse config from a file path.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        let config: DatabaseConfig = toml::from_str(&content).map_err(|e| {
            Error::Config(format!(
                "Failed to parse config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        config.store_options()?;
        Ok(config)
    }

    /// Read the config at `path`, writing the default first if it is missing.
    pub fn load_or_init(path: &Path) -> Result<Self> {
        if !path.exists() {
            std::fs::write(path, Self::default_toml()).map_err(|e| {
                Error::Config(format!(
                    "Failed to write default config file '{}': {}",
                    path.display(),
                    e
                ))
            })?;
        }
        Self::from_file(path)
    }

    /// Serialize this config to TOML and write it to the given path.
    pub fn write_to_file(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, content).map_err(|e| {
            Error::Config(format!(
                "Failed to write config file '{}': {}",
                path.display(),
                e
            ))
        })
    }
}
