//! In-memory data pools with receipt notification.
//!
//! Handlers run on the inserting thread after the pool lock is released, so
//! a handler may read the pool it was notified by.

use meridian_core::{HashHandler, HeaderNoncesPool, HeadersPool, MiniBlocksPool, NonceHandler};
use meridian_types::{Header, MiniBlock, ShardId, H256};
use parking_lot::RwLock;
use std::collections::HashMap;
use tracing::trace;

/// Header pool keyed by hash.
#[derive(Default)]
pub struct HeaderCache {
    headers: RwLock<HashMap<H256, Header>>,
    handlers: RwLock<Vec<HashHandler>>,
}

impl HeaderCache {
    /// Create an empty pool.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of cached headers.
    pub fn len(&self) -> usize {
        self.headers.read().len()
    }

    /// Returns true if the pool is empty.
    pub fn is_empty(&self) -> bool {
        self.headers.read().is_empty()
    }
}

impl HeadersPool for HeaderCache {
    fn get(&self, hash: &H256) -> Option<Header> {
        self.headers.read().get(hash).cloned()
    }

    fn insert(&self, hash: H256, header: Header) {
        trace!(hash = %hash.short(), nonce = header.nonce(), "header added to pool");
        self.headers.write().insert(hash, header);
        let handlers = self.handlers.read().clone();
        for handler in handlers {
            handler(hash);
        }
    }

    fn remove(&self, hash: &H256) {
        self.headers.write().remove(hash);
    }

    fn register_handler(&self, handler: HashHandler) {
        self.handlers.write().push(handler);
    }
}

/// Nonce to hash index keyed by `(shard, nonce)`.
#[derive(Default)]
pub struct HeaderNonceIndex {
    entries: RwLock<HashMap<(ShardId, u64), H256>>,
    handlers: RwLock<Vec<NonceHandler>>,
}

impl HeaderNonceIndex {
    /// Create an empty index.
    pub fn new() -> Self {
        Self::default()
    }
}

impl HeaderNoncesPool for HeaderNonceIndex {
    fn get(&self, nonce: u64, shard: ShardId) -> Option<H256> {
        self.entries.read().get(&(shard, nonce)).copied()
    }

    fn insert(&self, nonce: u64, shard: ShardId, hash: H256) {
        self.entries.write().insert((shard, nonce), hash);
        let handlers = self.handlers.read().clone();
        for handler in handlers {
            handler(nonce, shard, hash);
        }
    }

    fn remove(&self, nonce: u64, shard: ShardId) {
        self.entries.write().remove(&(shard, nonce));
    }

    fn register_handler(&self, handler: NonceHandler) {
        self.handlers.write().push(handler);
    }
}

/// Mini block pool keyed by hash.
#[derive(Default)]
pub struct MiniBlockCache {
    mini_blocks: RwLock<HashMap<H256, MiniBlock>>,
    handlers: RwLock<Vec<HashHandler>>,
}

impl MiniBlockCache {
    /// Create an empty pool.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of cached mini blocks.
    pub fn len(&self) -> usize {
        self.mini_blocks.read().len()
    }

    /// Returns true if the pool is empty.
    pub fn is_empty(&self) -> bool {
        self.mini_blocks.read().is_empty()
    }
}

impl MiniBlocksPool for MiniBlockCache {
    fn get(&self, hash: &H256) -> Option<MiniBlock> {
        self.mini_blocks.read().get(hash).cloned()
    }

    fn insert(&self, hash: H256, mini_block: MiniBlock) {
        self.mini_blocks.write().insert(hash, mini_block);
        let handlers = self.handlers.read().clone();
        for handler in handlers {
            handler(hash);
        }
    }

    fn remove(&self, hash: &H256) {
        self.mini_blocks.write().remove(hash);
    }

    fn register_handler(&self, handler: HashHandler) {
        self.handlers.write().push(handler);
    }
}
