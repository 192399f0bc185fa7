//! Metachain strategy: no separate bodies, notarization recovered by
//! scanning stored metachain blocks.

use crate::error::{SyncError, SyncResult};
use crate::notarization::{NotarizationTracker, NotarizedInfo};
use crate::store::HeaderStore;
use crate::strategy::ChainStrategy;
use async_trait::async_trait;
use meridian_core::BlockProcessor;
use meridian_types::{BlockBody, ChainKind, Header, ShardId, METACHAIN_SHARD_ID};
use std::sync::Arc;
use tracing::{debug, info};

/// [`ChainStrategy`] for the metachain.
pub struct MetaStrategy {
    num_shards: u32,
    finality: u64,
    bootstrap_round: u64,
    store: HeaderStore,
    block_processor: Arc<dyn BlockProcessor>,
}

impl MetaStrategy {
    /// Create the strategy for a metachain notarizing `num_shards` shards.
    pub fn new(
        num_shards: u32,
        finality: u64,
        bootstrap_round: u64,
        store: HeaderStore,
        block_processor: Arc<dyn BlockProcessor>,
    ) -> Arc<Self> {
        Arc::new(Self {
            num_shards,
            finality,
            bootstrap_round,
            store,
            block_processor,
        })
    }

    fn check_kind(header: &Header) -> SyncResult<()> {
        if header.kind() != ChainKind::Meta {
            return Err(SyncError::WrongHeaderType {
                expected: ChainKind::Meta,
                got: header.kind(),
            });
        }
        Ok(())
    }

    fn scan_notarized(&self, nonce: u64) -> NotarizedInfo {
        NotarizationTracker::new(self.num_shards, self.bootstrap_round).scan(
            nonce,
            |current| {
                self.store
                    .header_by_nonce(METACHAIN_SHARD_ID, current)
                    .map(|(header, _)| header)
            },
            |shard, hash| {
                self.store
                    .header_by_hash(shard, hash)
                    .map(|header| header.nonce())
            },
        )
    }

    fn register_notarized(&self, shard: ShardId, nonce: Option<u64>) -> SyncResult<()> {
        let Some(nonce) = nonce.filter(|n| *n > 0) else {
            return Ok(());
        };
        let (header, _) = self.store.header_by_nonce(shard, nonce)?;
        self.block_processor.add_last_notarized_header(shard, &header);
        Ok(())
    }

    fn remove_unnotarized(&self, shard: ShardId, last_notarized: u64) {
        let highest = self.store.highest_nonce(shard);
        for nonce in (last_notarized + 1)..=highest {
            match self.store.remove_header(shard, nonce) {
                Ok(()) => debug!(shard, nonce, "removed header above last notarized"),
                Err(e) => debug!(shard, nonce, error = %e, "removing header failed"),
            }
        }
    }
}

#[async_trait]
impl ChainStrategy for MetaStrategy {
    fn kind(&self) -> ChainKind {
        ChainKind::Meta
    }

    fn shard_id(&self) -> ShardId {
        METACHAIN_SHARD_ID
    }

    fn block_finality(&self) -> u64 {
        self.finality
    }

    async fn block_body(&self, header: &Header) -> SyncResult<BlockBody> {
        Self::check_kind(header)?;
        Ok(BlockBody::empty())
    }

    fn body_from_storage(&self, header: &Header) -> SyncResult<BlockBody> {
        Self::check_kind(header)?;
        Ok(BlockBody::empty())
    }

    fn remove_body_from_pools(&self, _header: &Header) -> Option<BlockBody> {
        None
    }

    fn remove_body_from_storage(&self, _header: &Header) {}

    fn register_notarized_from_storage(&self, nonce: u64) -> SyncResult<()> {
        let notarized = self.scan_notarized(nonce);

        for shard in 0..self.num_shards {
            let last = notarized.last_notarized.get(&shard).copied();
            let last_final = notarized.final_notarized.get(&shard).copied();

            self.register_notarized(shard, last_final)?;
            self.register_notarized(shard, last)?;

            if let Some(last) = last {
                info!(shard, last_notarized = last, "shard notarization restored");
                self.remove_unnotarized(shard, last);
            }
        }

        Ok(())
    }
}
