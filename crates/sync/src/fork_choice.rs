//! Rollback of the chain head.
//!
//! Each rollback step reverts exactly one block: the head moves to the
//! previous header, the account trie is rebuilt at its root, the reverted
//! header leaves pools, fork detector and the storage nonce index, and its
//! transactions go back to the processing pools.

use crate::error::{SyncError, SyncResult};
use crate::store::HeaderStore;
use crate::strategy::ChainStrategy;
use meridian_core::{
    AccountsAdapter, BlockProcessor, ChainHandler, ForkDetector, HeaderNoncesPool, HeadersPool,
};
use meridian_types::{Header, H256};
use std::sync::Arc;
use tracing::{debug, info};

/// Rollback state machine over the chain head.
pub struct ForkChoice {
    pub(crate) chain: Arc<dyn ChainHandler>,
    pub(crate) accounts: Arc<dyn AccountsAdapter>,
    pub(crate) fork_detector: Arc<dyn ForkDetector>,
    pub(crate) block_processor: Arc<dyn BlockProcessor>,
    pub(crate) headers: Arc<dyn HeadersPool>,
    pub(crate) header_nonces: Arc<dyn HeaderNoncesPool>,
    pub(crate) store: HeaderStore,
    pub(crate) strategy: Arc<dyn ChainStrategy>,
}

impl ForkChoice {
    /// Roll back from the current head.
    ///
    /// With `revert_using_fork_nonce` set, steps repeat until the head is
    /// below `fork_nonce` and the finality floor is ignored. Otherwise a
    /// single step is taken, and only if the head is above the highest
    /// final nonce.
    pub fn run(&self, revert_using_fork_nonce: bool, fork_nonce: u64) -> SyncResult<()> {
        info!(revert_using_fork_nonce, fork_nonce, "starting fork choice");

        loop {
            let header = self.current_header()?;
            let final_nonce = self.fork_detector.highest_final_block_nonce();

            if !revert_using_fork_nonce && header.nonce() <= final_nonce {
                return Err(SyncError::RollBackBehindFinalHeader {
                    nonce: header.nonce(),
                    final_nonce,
                });
            }

            info!(
                nonce = header.nonce().saturating_sub(1),
                hash = %header.prev_hash().short(),
                highest_final_nonce = final_nonce,
                "rolling back to previous header"
            );

            self.rollback(&header)?;

            if revert_using_fork_nonce && header.nonce() > fork_nonce {
                continue;
            }
            break;
        }

        info!("ending fork choice");
        Ok(())
    }

    /// Revert the block `header`, which must be the current head.
    pub fn rollback(&self, header: &Header) -> SyncResult<()> {
        if header.nonce() == 0 {
            return Err(SyncError::RollbackFromGenesis);
        }

        let shard = self.strategy.shard_id();
        let hash = self
            .chain
            .current_header_hash()
            .unwrap_or_else(|| header.hash());

        let (new_header, new_hash, new_root, new_body) = if header.nonce() > 1 {
            let prev = self.store.header_by_hash(shard, &header.prev_hash())?;
            let body = self.strategy.body_from_storage(&prev)?;
            let root = prev.root_hash();
            (Some(prev), Some(header.prev_hash()), root, Some(body))
        } else {
            let genesis = self
                .chain
                .genesis_header()
                .ok_or(SyncError::NilGenesisHeader)?;
            (None, None, genesis.root_hash(), None)
        };

        self.chain.set_current_header(new_header)?;
        self.chain.set_current_header_hash(new_hash);
        self.chain.set_current_body(new_body);
        self.accounts.recreate_trie(&new_root)?;

        self.clean_caches_and_storage(header, &hash);

        let body = self.strategy.remove_body_from_pools(header);
        if let Err(e) = self
            .block_processor
            .restore_block_into_pools(header, body.as_ref())
        {
            info!(nonce = header.nonce(), error = %e, "restoring block into pools failed");
        }

        Ok(())
    }

    fn current_header(&self) -> SyncResult<Header> {
        let header = self.chain.current_header().ok_or(SyncError::NilBlockHeader)?;
        let expected = self.strategy.kind();
        if header.kind() != expected {
            return Err(SyncError::WrongHeaderType {
                expected,
                got: header.kind(),
            });
        }
        Ok(header)
    }

    fn clean_caches_and_storage(&self, header: &Header, hash: &H256) {
        let shard = self.strategy.shard_id();
        self.headers.remove(hash);
        self.header_nonces.remove(header.nonce(), shard);
        self.fork_detector.remove_headers(header.nonce(), hash);

        if let Err(e) = self.store.remove_nonce_entry(shard, header.nonce()) {
            info!(nonce = header.nonce(), error = %e, "removing nonce index entry failed");
        }
        debug!(nonce = header.nonce(), hash = %hash.short(), "rolled back header cleaned up");
    }
}

