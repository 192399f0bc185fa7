//! Chain specific capabilities injected into the shared bootstrapper.

use crate::error::SyncResult;
use async_trait::async_trait;
use meridian_types::{BlockBody, ChainKind, Header, ShardId};

/// What differs between syncing a shard chain and the metachain.
#[async_trait]
pub trait ChainStrategy: Send + Sync {
    /// Kind of headers this chain carries.
    fn kind(&self) -> ChainKind;

    /// Shard id of this chain in the nonce indexes.
    fn shard_id(&self) -> ShardId;

    /// Blocks below the storage head that must load with it.
    fn block_finality(&self) -> u64;

    /// Body of `header`, fetched from pools, storage or the network.
    async fn block_body(&self, header: &Header) -> SyncResult<BlockBody>;

    /// Body of a committed `header`, from pools or storage only.
    fn body_from_storage(&self, header: &Header) -> SyncResult<BlockBody>;

    /// Drop the body of a rolled back `header` from the pools. Returns what
    /// was removed, to be restored by the block executor.
    fn remove_body_from_pools(&self, header: &Header) -> Option<BlockBody>;

    /// Drop the stored body of `header`.
    fn remove_body_from_storage(&self, header: &Header);

    /// Seed cross-chain notarization state after a storage bootstrap that
    /// accepted `nonce`.
    fn register_notarized_from_storage(&self, nonce: u64) -> SyncResult<()>;
}
