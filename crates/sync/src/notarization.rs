//! Recovery of per-shard notarization state from stored metachain blocks.
//!
//! Walking metachain blocks backwards, the first block that notarizes a
//! shard header fixes that shard's *last* notarized nonce and the next one
//! fixes its *final* notarized nonce. The walk stops once every shard has
//! both.

use crate::error::{SyncError, SyncResult};
use meridian_types::{ChainKind, Header, MetaHeader, ShardId, H256};
use std::collections::HashMap;
use tracing::{debug, info};

/// Notarization state recovered by a scan.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NotarizedInfo {
    /// Highest metachain nonce of the valid run the scan ended in
    pub start_nonce: u64,
    /// Last notarized shard header nonce per shard
    pub last_notarized: HashMap<ShardId, u64>,
    /// Final notarized shard header nonce per shard
    pub final_notarized: HashMap<ShardId, u64>,
    /// Metachain nonce at which the last notarized value was observed
    pub block_with_last_notarized: HashMap<ShardId, u64>,
    /// Metachain nonce at which the final notarized value was observed
    pub block_with_final_notarized: HashMap<ShardId, u64>,
}

impl NotarizedInfo {
    fn reset(&mut self) {
        *self = Self::default();
    }

    fn record(&mut self, max_nonces: &HashMap<ShardId, u64>, meta_nonce: u64, num_shards: u32) -> bool {
        for shard in 0..num_shards {
            let notarized = match max_nonces.get(&shard) {
                Some(&nonce) if nonce > 0 => nonce,
                _ => continue,
            };

            if !self.last_notarized.contains_key(&shard) {
                self.last_notarized.insert(shard, notarized);
                self.block_with_last_notarized.insert(shard, meta_nonce);
                continue;
            }

            if !self.final_notarized.contains_key(&shard) {
                self.final_notarized.insert(shard, notarized);
                self.block_with_final_notarized.insert(shard, meta_nonce);
            }
        }

        (0..num_shards).all(|shard| {
            self.last_notarized.contains_key(&shard) && self.final_notarized.contains_key(&shard)
        })
    }
}

/// Scans metachain blocks for notarized shard headers.
#[derive(Debug, Clone, Copy)]
pub struct NotarizationTracker {
    num_shards: u32,
    bootstrap_round: u64,
}

impl NotarizationTracker {
    /// Tracker for `num_shards` shards rejecting blocks after `bootstrap_round`.
    pub fn new(num_shards: u32, bootstrap_round: u64) -> Self {
        Self {
            num_shards,
            bootstrap_round,
        }
    }

    /// Walk metachain nonces from `nonce` down to 1.
    ///
    /// `meta_by_nonce` loads a metachain header; `shard_nonce_by_hash` resolves
    /// the nonce of a notarized shard header. An unloadable, mistyped or
    /// future metachain block resets the accumulated state, as does a shard
    /// header that cannot be resolved.
    pub fn scan<M, S>(&self, nonce: u64, mut meta_by_nonce: M, mut shard_nonce_by_hash: S) -> NotarizedInfo
    where
        M: FnMut(u64) -> SyncResult<Header>,
        S: FnMut(ShardId, &H256) -> SyncResult<u64>,
    {
        let mut info = NotarizedInfo::default();

        for current in (1..=nonce).rev() {
            let meta = match self.valid_meta_block(current, &mut meta_by_nonce) {
                Ok(meta) => meta,
                Err(e) => {
                    info!(nonce = current, error = %e, "skipping metachain block");
                    info.reset();
                    continue;
                }
            };

            if info.start_nonce == 0 {
                info.start_nonce = current;
            }

            if meta.shard_info.is_empty() {
                continue;
            }

            let max_nonces = match Self::max_notarized_nonces(&meta, &mut shard_nonce_by_hash) {
                Ok(max) => max,
                Err(e) => {
                    info!(nonce = current, error = %e, "notarized shard header unavailable");
                    info.reset();
                    continue;
                }
            };

            if info.record(&max_nonces, current, self.num_shards) {
                break;
            }
        }

        info!(start_nonce = info.start_nonce, "bootstrap from metachain block");

        for shard in 0..self.num_shards {
            if let Some(&block) = info.block_with_last_notarized.get(&shard) {
                if nonce > block {
                    if let Some(&last) = info.last_notarized.get(&shard) {
                        info.final_notarized.insert(shard, last);
                    }
                }
            }

            debug!(
                shard,
                last_notarized = info.last_notarized.get(&shard).copied().unwrap_or(0),
                final_notarized = info.final_notarized.get(&shard).copied().unwrap_or(0),
                "notarized shard headers"
            );
        }

        info
    }

    fn valid_meta_block<M>(&self, nonce: u64, meta_by_nonce: &mut M) -> SyncResult<MetaHeader>
    where
        M: FnMut(u64) -> SyncResult<Header>,
    {
        let header = meta_by_nonce(nonce)?;
        let meta = match header {
            Header::Meta(meta) => meta,
            other => {
                return Err(SyncError::WrongHeaderType {
                    expected: ChainKind::Meta,
                    got: other.kind(),
                })
            }
        };

        if meta.round > self.bootstrap_round {
            return Err(SyncError::HigherRoundInBlock {
                round: meta.round,
                bootstrap_round: self.bootstrap_round,
            });
        }

        Ok(meta)
    }

    fn max_notarized_nonces<S>(meta: &MetaHeader, shard_nonce_by_hash: &mut S) -> SyncResult<HashMap<ShardId, u64>>
    where
        S: FnMut(ShardId, &H256) -> SyncResult<u64>,
    {
        let mut max_nonces: HashMap<ShardId, u64> = HashMap::new();
        for shard_data in &meta.shard_info {
            let nonce = shard_nonce_by_hash(shard_data.shard_id, &shard_data.header_hash)?;
            let entry = max_nonces.entry(shard_data.shard_id).or_insert(0);
            *entry = (*entry).max(nonce);
        }
        Ok(max_nonces)
    }
}
