//! In-memory data pools.
//!
//! Pools hold data received from the network before it is processed. Each
//! pool notifies registered handlers after an insert; handlers may run on
//! any thread.

use meridian_types::{Header, MiniBlock, ShardId, H256};
use std::sync::Arc;

/// Called with the hash of an item just added to a pool.
pub type HashHandler = Arc<dyn Fn(H256) + Send + Sync>;

/// Called with `(nonce, shard, hash)` of an index entry just added.
pub type NonceHandler = Arc<dyn Fn(u64, ShardId, H256) + Send + Sync>;

/// Headers of both chain kinds keyed by hash.
pub trait HeadersPool: Send + Sync {
    /// Get a header by hash.
    fn get(&self, hash: &H256) -> Option<Header>;

    /// Insert a header and notify handlers.
    fn insert(&self, hash: H256, header: Header);

    /// Remove a header. No-op if absent.
    fn remove(&self, hash: &H256);

    /// Register a receipt handler.
    fn register_handler(&self, handler: HashHandler);

    /// Check if the pool holds `hash`.
    fn contains(&self, hash: &H256) -> bool {
        self.get(hash).is_some()
    }
}

/// Nonce to header hash index, per shard.
pub trait HeaderNoncesPool: Send + Sync {
    /// Hash of the header with `nonce` on `shard`.
    fn get(&self, nonce: u64, shard: ShardId) -> Option<H256>;

    /// Insert an index entry and notify handlers.
    fn insert(&self, nonce: u64, shard: ShardId, hash: H256);

    /// Remove an index entry. No-op if absent.
    fn remove(&self, nonce: u64, shard: ShardId);

    /// Register a receipt handler.
    fn register_handler(&self, handler: NonceHandler);
}

/// Mini blocks keyed by hash.
pub trait MiniBlocksPool: Send + Sync {
    /// Get a mini block by hash.
    fn get(&self, hash: &H256) -> Option<MiniBlock>;

    /// Insert a mini block and notify handlers.
    fn insert(&self, hash: H256, mini_block: MiniBlock);

    /// Remove a mini block. No-op if absent.
    fn remove(&self, hash: &H256);

    /// Register a receipt handler.
    fn register_handler(&self, handler: HashHandler);
}
