//! Catch-up from local storage before network sync starts.

use super::Bootstrapper;
use crate::error::{SyncError, SyncResult};
use meridian_core::BlockHeaderState;
use meridian_types::Header;
use tracing::{debug, info};

impl Bootstrapper {
    /// Load the highest window of stored blocks that applies cleanly and make
    /// its top the chain head. Returns the accepted nonce.
    ///
    /// When no window applies the head is restored to genesis and
    /// `NotEnoughValidBlocksInStorage` is returned.
    pub fn sync_from_storage(&self) -> SyncResult<u64> {
        let shard = self.strategy.shard_id();
        let finality = self.strategy.block_finality();
        let highest = self.store.highest_nonce(shard);
        info!(kind = %self.strategy.kind(), highest, "loading blocks from storage");

        let mut current = highest;
        loop {
            if current <= finality {
                self.restore_genesis()?;
                return Err(SyncError::NotEnoughValidBlocksInStorage { highest });
            }

            match self.apply_window(current - finality, current) {
                Ok(()) => break,
                Err(e) => {
                    info!(nonce = current, error = %e, "stored block window rejected");
                    current -= 1;
                }
            }
        }

        info!(nonce = current, "chain head loaded from storage");
        self.remove_blocks_above(current, highest);
        self.strategy.register_notarized_from_storage(current)?;
        Ok(current)
    }

    fn apply_window(&self, from: u64, to: u64) -> SyncResult<()> {
        let shard = self.strategy.shard_id();

        for nonce in from..=to {
            let (header, hash) = self.store.header_by_nonce(shard, nonce)?;
            self.check_round(&header)?;
            let body = self.strategy.body_from_storage(&header)?;

            self.chain.set_current_header(Some(header.clone()))?;
            self.chain.set_current_header_hash(Some(hash));
            self.chain.set_current_body(Some(body));
            self.accounts.recreate_trie(&header.root_hash())?;

            if let Err(e) = self
                .fork_detector
                .add_header(&header, hash, BlockHeaderState::Processed)
            {
                debug!(nonce, error = %e, "fork detector rejected stored header");
            }
        }

        Ok(())
    }

    fn check_round(&self, header: &Header) -> SyncResult<()> {
        if header.round() > self.bootstrap_round {
            return Err(SyncError::HigherRoundInBlock {
                round: header.round(),
                bootstrap_round: self.bootstrap_round,
            });
        }
        Ok(())
    }

    fn restore_genesis(&self) -> SyncResult<()> {
        let genesis = self.chain.genesis_header().ok_or(SyncError::NilGenesisHeader)?;
        self.chain.set_current_header(None)?;
        self.chain.set_current_header_hash(None);
        self.chain.set_current_body(None);
        self.accounts.recreate_trie(&genesis.root_hash())?;
        Ok(())
    }

    fn remove_blocks_above(&self, nonce: u64, highest: u64) {
        let shard = self.strategy.shard_id();

        for current in (nonce + 1)..=highest {
            match self.store.header_by_nonce(shard, current) {
                Ok((header, _)) => self.strategy.remove_body_from_storage(&header),
                Err(e) => debug!(nonce = current, error = %e, "stored header unreadable"),
            }
            if let Err(e) = self.store.remove_header(shard, current) {
                debug!(nonce = current, error = %e, "removing stored header failed");
            }
        }
    }
}
