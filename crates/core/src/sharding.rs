//! Shard coordinators.

use crate::traits::ShardCoordinator;
use meridian_types::{ShardId, METACHAIN_SHARD_ID};

/// Coordinator for a network with a single shard.
#[derive(Debug, Clone, Copy, Default)]
pub struct OneShardCoordinator;

impl ShardCoordinator for OneShardCoordinator {
    fn number_of_shards(&self) -> u32 {
        1
    }

    fn self_id(&self) -> ShardId {
        0
    }
}

/// Coordinator for a network of `number_of_shards` shards.
#[derive(Debug, Clone, Copy)]
pub struct MultiShardCoordinator {
    number_of_shards: u32,
    self_id: ShardId,
}

impl MultiShardCoordinator {
    /// Returns `None` when there are no shards or `self_id` is neither a
    /// valid shard nor the metachain.
    pub fn new(number_of_shards: u32, self_id: ShardId) -> Option<Self> {
        if number_of_shards == 0 {
            return None;
        }
        if self_id >= number_of_shards && self_id != METACHAIN_SHARD_ID {
            return None;
        }
        Some(Self {
            number_of_shards,
            self_id,
        })
    }
}

impl ShardCoordinator for MultiShardCoordinator {
    fn number_of_shards(&self) -> u32 {
        self.number_of_shards
    }

    fn self_id(&self) -> ShardId {
        self.self_id
    }
}
