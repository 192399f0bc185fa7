//! Storage unit abstractions.
//!
//! Persistent data is split into logical units (headers by hash, nonce to
//! hash indexes, mini blocks). A [`StorageService`] resolves a [`UnitType`]
//! to a [`Storer`], which is a plain byte key-value store.

use meridian_types::ShardId;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Errors that can occur during storage operations.
#[derive(Error, Debug)]
pub enum StorageError {
    /// The storage service has no such unit.
    #[error("storage unit not found: {0}")]
    UnitNotFound(UnitType),

    /// A database I/O error occurred.
    #[error("database I/O error: {0}")]
    Io(String),

    /// Data corruption was detected.
    #[error("data corruption: {0}")]
    Corruption(String),

    /// Generic internal error.
    #[error("internal storage error: {0}")]
    Internal(String),
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Logical storage units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum UnitType {
    /// Shard headers keyed by hash
    BlockHeader,
    /// Metachain headers keyed by hash
    MetaBlock,
    /// Mini blocks keyed by hash
    MiniBlock,
    /// Metachain nonce to header hash index
    MetaHdrNonceHash,
    /// Shard nonce to header hash index, one per shard
    ShardHdrNonceHash(ShardId),
}

impl UnitType {
    /// Stable name, used as the column family name by persistent backends.
    pub fn name(&self) -> String {
        match self {
            UnitType::BlockHeader => "block_header".to_string(),
            UnitType::MetaBlock => "meta_block".to_string(),
            UnitType::MiniBlock => "mini_block".to_string(),
            UnitType::MetaHdrNonceHash => "meta_hdr_nonce_hash".to_string(),
            UnitType::ShardHdrNonceHash(shard) => format!("shard_hdr_nonce_hash_{shard}"),
        }
    }

    /// Every unit a node running `num_shards` shards keeps.
    pub fn all(num_shards: u32) -> Vec<UnitType> {
        let mut units = vec![
            UnitType::BlockHeader,
            UnitType::MetaBlock,
            UnitType::MiniBlock,
            UnitType::MetaHdrNonceHash,
        ];
        units.extend((0..num_shards).map(UnitType::ShardHdrNonceHash));
        units
    }
}

impl fmt::Display for UnitType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

/// Key encoding used by the nonce to hash units.
pub fn nonce_to_bytes(nonce: u64) -> [u8; 8] {
    nonce.to_be_bytes()
}

/// A single byte key-value store.
pub trait Storer: Send + Sync {
    /// Get a value by key. Returns `Ok(None)` if the key does not exist.
    fn get(&self, key: &[u8]) -> StorageResult<Option<Vec<u8>>>;

    /// Put a key-value pair.
    fn put(&self, key: &[u8], value: &[u8]) -> StorageResult<()>;

    /// Remove a key. Returns `Ok(())` even if the key does not exist.
    fn remove(&self, key: &[u8]) -> StorageResult<()>;

    /// Check if a key exists.
    fn has(&self, key: &[u8]) -> StorageResult<bool> {
        Ok(self.get(key)?.is_some())
    }
}

/// Resolves logical units to stores.
pub trait StorageService: Send + Sync {
    /// The store backing `unit`, if this service has one.
    fn storer(&self, unit: UnitType) -> Option<Arc<dyn Storer>>;

    /// Get a value from a unit.
    fn get(&self, unit: UnitType, key: &[u8]) -> StorageResult<Option<Vec<u8>>> {
        self.storer(unit)
            .ok_or(StorageError::UnitNotFound(unit))?
            .get(key)
    }

    /// Put a value into a unit.
    fn put(&self, unit: UnitType, key: &[u8], value: &[u8]) -> StorageResult<()> {
        self.storer(unit)
            .ok_or(StorageError::UnitNotFound(unit))?
            .put(key, value)
    }

    /// Remove a key from a unit.
    fn remove(&self, unit: UnitType, key: &[u8]) -> StorageResult<()> {
        self.storer(unit)
            .ok_or(StorageError::UnitNotFound(unit))?
            .remove(key)
    }
}
