//! Shard chain strategy: bodies are mini blocks, notarization comes from
//! the metachain headers a shard block references.

use crate::error::{SyncError, SyncResult};
use crate::signal::Signal;
use crate::store::HeaderStore;
use crate::strategy::ChainStrategy;
use async_trait::async_trait;
use meridian_core::{BlockProcessor, MiniBlockRequester, MiniBlocksPool};
use meridian_types::{
    BlockBody, ChainKind, Header, MiniBlock, ShardHeader, ShardId, H256, METACHAIN_SHARD_ID,
};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, trace};

/// [`ChainStrategy`] for a shard chain.
pub struct ShardStrategy {
    shard_id: ShardId,
    finality: u64,
    store: HeaderStore,
    mini_blocks: Arc<dyn MiniBlocksPool>,
    requester: Arc<dyn MiniBlockRequester>,
    block_processor: Arc<dyn BlockProcessor>,
    wait_time: Duration,
    requested: Mutex<HashSet<H256>>,
    mini_blocks_received: Signal,
}

impl ShardStrategy {
    /// Create the strategy for shard `shard_id`.
    pub fn new(
        shard_id: ShardId,
        finality: u64,
        store: HeaderStore,
        mini_blocks: Arc<dyn MiniBlocksPool>,
        requester: Arc<dyn MiniBlockRequester>,
        block_processor: Arc<dyn BlockProcessor>,
        wait_time: Duration,
    ) -> Arc<Self> {
        Arc::new(Self {
            shard_id,
            finality,
            store,
            mini_blocks,
            requester,
            block_processor,
            wait_time,
            requested: Mutex::new(HashSet::new()),
            mini_blocks_received: Signal::new(),
        })
    }

    /// Hook the mini block receipt handler into the pool.
    pub fn register_handlers(self: &Arc<Self>) {
        let weak = Arc::downgrade(self);
        self.mini_blocks.register_handler(Arc::new(move |hash: H256| {
            if let Some(strategy) = weak.upgrade() {
                strategy.on_mini_block_received(hash);
            }
        }));
    }

    fn on_mini_block_received(&self, hash: H256) {
        let completed = {
            let mut requested = self.requested.lock();
            requested.remove(&hash) && requested.is_empty()
        };
        if completed {
            trace!(hash = %hash.short(), "all requested mini blocks received");
            self.mini_blocks_received.pulse();
        }
    }

    fn shard_header<'a>(&self, header: &'a Header) -> SyncResult<&'a ShardHeader> {
        header.as_shard().ok_or(SyncError::WrongHeaderType {
            expected: ChainKind::Shard,
            got: header.kind(),
        })
    }

    /// Mini blocks found in the pool or storage, and the hashes found in
    /// neither.
    fn collect(&self, hashes: &[H256]) -> (Vec<MiniBlock>, Vec<H256>) {
        let mut found = Vec::with_capacity(hashes.len());
        let mut missing = Vec::new();

        for hash in hashes {
            if let Some(mini_block) = self.mini_blocks.get(hash) {
                found.push(mini_block);
                continue;
            }
            match self.store.mini_block(hash) {
                Ok(Some(mini_block)) => found.push(mini_block),
                Ok(None) => missing.push(*hash),
                Err(e) => {
                    trace!(hash = %hash.short(), error = %e, "mini block not readable from storage");
                    missing.push(*hash);
                }
            }
        }

        (found, missing)
    }

    fn mini_block_hashes(header: &ShardHeader) -> Vec<H256> {
        header.mini_block_headers.iter().map(|mb| mb.hash).collect()
    }
}

#[async_trait]
impl ChainStrategy for ShardStrategy {
    fn kind(&self) -> ChainKind {
        ChainKind::Shard
    }

    fn shard_id(&self) -> ShardId {
        self.shard_id
    }

    fn block_finality(&self) -> u64 {
        self.finality
    }

    async fn block_body(&self, header: &Header) -> SyncResult<BlockBody> {
        let shard_header = self.shard_header(header)?;
        let hashes = Self::mini_block_hashes(shard_header);

        let (mini_blocks, missing) = self.collect(&hashes);
        if missing.is_empty() {
            return Ok(BlockBody { mini_blocks });
        }

        self.mini_blocks_received.drain();
        *self.requested.lock() = missing.iter().copied().collect();
        info!(
            nonce = header.nonce(),
            count = missing.len(),
            "requesting mini blocks from network"
        );
        if let Err(e) = self.requester.request_by_hashes(&missing) {
            error!(nonce = header.nonce(), error = %e, "mini block request failed");
        }

        if !self.mini_blocks_received.wait(self.wait_time).await {
            debug!(nonce = header.nonce(), "timed out waiting for mini blocks");
            return Err(SyncError::TimeIsOut);
        }

        let (mini_blocks, missing) = self.collect(&hashes);
        if !missing.is_empty() {
            return Err(SyncError::BodyNotFound {
                nonce: header.nonce(),
                missing: missing.len(),
            });
        }
        Ok(BlockBody { mini_blocks })
    }

    fn body_from_storage(&self, header: &Header) -> SyncResult<BlockBody> {
        let shard_header = self.shard_header(header)?;
        let (mini_blocks, missing) = self.collect(&Self::mini_block_hashes(shard_header));
        if !missing.is_empty() {
            return Err(SyncError::BodyNotFound {
                nonce: header.nonce(),
                missing: missing.len(),
            });
        }
        Ok(BlockBody { mini_blocks })
    }

    fn remove_body_from_pools(&self, header: &Header) -> Option<BlockBody> {
        let shard_header = header.as_shard()?;

        let mut mini_blocks = Vec::new();
        for mb in &shard_header.mini_block_headers {
            if let Some(mini_block) = self.mini_blocks.get(&mb.hash) {
                mini_blocks.push(mini_block);
            }
            self.mini_blocks.remove(&mb.hash);
        }

        Some(BlockBody { mini_blocks })
    }

    fn remove_body_from_storage(&self, header: &Header) {
        let Some(shard_header) = header.as_shard() else {
            return;
        };
        for mb in &shard_header.mini_block_headers {
            if let Err(e) = self.store.remove_mini_block(&mb.hash) {
                debug!(hash = %mb.hash.short(), error = %e, "removing mini block failed");
            }
        }
    }

    fn register_notarized_from_storage(&self, nonce: u64) -> SyncResult<()> {
        for current in (1..=nonce).rev() {
            let (header, _) = self.store.header_by_nonce(self.shard_id, current)?;
            let shard_header = self.shard_header(&header)?;
            if shard_header.meta_block_hashes.is_empty() {
                continue;
            }

            let mut highest: Option<Header> = None;
            for hash in &shard_header.meta_block_hashes {
                let meta = self.store.header_by_hash(METACHAIN_SHARD_ID, hash)?;
                if highest.as_ref().map_or(true, |h| meta.nonce() > h.nonce()) {
                    highest = Some(meta);
                }
            }

            if let Some(meta) = highest {
                debug!(
                    shard_nonce = current,
                    meta_nonce = meta.nonce(),
                    "last notarized metachain header loaded from storage"
                );
                self.block_processor
                    .add_last_notarized_header(METACHAIN_SHARD_ID, &meta);
            }
            return Ok(());
        }

        debug!(nonce, "no stored shard header references a metachain header");
        Ok(())
    }
}
