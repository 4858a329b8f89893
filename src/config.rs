//! Provider configuration and index location management.

use crate::types::{IndexError, Result};
use rocksdb::DBCompressionType;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Environment variable overriding the index root directory.
pub const INDEX_DIR_ENV: &str = "P8_INDEX_DIR";

/// Block compression for posting lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Compression {
    /// No compression (posting lists are small and already dense)
    #[default]
    None,
    Snappy,
    Lz4,
    Zstd,
}

impl From<Compression> for DBCompressionType {
    fn from(compression: Compression) -> Self {
        match compression {
            Compression::None => DBCompressionType::None,
            Compression::Snappy => DBCompressionType::Snappy,
            Compression::Lz4 => DBCompressionType::Lz4,
            Compression::Zstd => DBCompressionType::Zstd,
        }
    }
}

/// RocksDB tuning applied to every index directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageOptions {
    /// Posting list compression.
    pub compression: Compression,
    /// fsync every batch write (WAL alone survives process crashes).
    pub sync_writes: bool,
    /// Open file limit per index (-1 = unlimited).
    pub max_open_files: i32,
}

impl Default for StorageOptions {
    fn default() -> Self {
        Self {
            compression: Compression::None,
            sync_writes: false,
            max_open_files: 256,
        }
    }
}

impl StorageOptions {
    /// Build database-wide RocksDB options.
    pub fn db_options(&self) -> rocksdb::Options {
        let mut opts = rocksdb::Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);
        opts.set_max_open_files(self.max_open_files);
        opts.set_compression_type(self.compression.into());
        opts
    }
}

/// Index provider configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Directory holding one `index-{id}` subdirectory per index.
    pub root_dir: PathBuf,
    /// Storage tuning.
    #[serde(default)]
    pub storage: StorageOptions,
}

impl ProviderConfig {
    /// Configuration rooted at `root_dir` with default storage options.
    pub fn new(root_dir: impl Into<PathBuf>) -> Self {
        Self {
            root_dir: root_dir.into(),
            storage: StorageOptions::default(),
        }
    }

    /// Get default index directory (`$P8_INDEX_DIR`, else `~/.p8/indexes/`).
    pub fn default_root_dir() -> Result<PathBuf> {
        if let Ok(dir) = std::env::var(INDEX_DIR_ENV) {
            return Ok(PathBuf::from(dir));
        }
        let home = std::env::var("HOME")
            .map_err(|_| IndexError::ConfigError("HOME not set".to_string()))?;
        Ok(PathBuf::from(home).join(".p8").join("indexes"))
    }

    /// Configuration from the environment with default storage options.
    pub fn from_env() -> Result<Self> {
        Ok(Self::new(Self::default_root_dir()?))
    }

    /// Load configuration from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns `IndexError::ConfigError` if the file is missing or invalid
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            IndexError::ConfigError(format!("Cannot read {}: {}", path.display(), e))
        })?;
        serde_json::from_str(&content)
            .map_err(|e| IndexError::ConfigError(format!("Invalid config: {}", e)))
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Create the root directory if it does not exist.
    pub fn ensure_root_dir(&self) -> Result<()> {
        fs::create_dir_all(&self.root_dir)?;
        Ok(())
    }
}
