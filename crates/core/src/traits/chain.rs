//! Chain head, round timing and account state.

use meridian_types::{BlockBody, Header, ShardId, H256};
use std::time::Duration;
use thiserror::Error;

/// Errors raised by chain head and account state updates.
#[derive(Error, Debug)]
pub enum StateError {
    /// The trie has no node for the requested root.
    #[error("unknown state root: {0}")]
    UnknownRoot(H256),

    /// The header cannot become the chain head.
    #[error("invalid chain head: {0}")]
    InvalidHead(String),

    /// Generic internal error.
    #[error("internal state error: {0}")]
    Internal(String),
}

/// Result type for state operations.
pub type StateResult<T> = Result<T, StateError>;

/// Owner of the current chain head.
///
/// A head of `None` means the node sits at genesis.
pub trait ChainHandler: Send + Sync {
    /// The genesis header.
    fn genesis_header(&self) -> Option<Header>;

    /// Current head header.
    fn current_header(&self) -> Option<Header>;

    /// Hash of the current head header.
    fn current_header_hash(&self) -> Option<H256>;

    /// Body of the current head block.
    fn current_body(&self) -> Option<BlockBody>;

    /// Replace the head header.
    fn set_current_header(&self, header: Option<Header>) -> StateResult<()>;

    /// Replace the head hash.
    fn set_current_header_hash(&self, hash: Option<H256>);

    /// Replace the head body.
    fn set_current_body(&self, body: Option<BlockBody>);
}

/// Consensus round clock.
pub trait Rounder: Send + Sync {
    /// Index of the current round. Negative before the chain starts.
    fn index(&self) -> i64;

    /// Time left in the current round, used as the execution deadline.
    fn time_duration(&self) -> Duration;
}

/// Account trie access.
pub trait AccountsAdapter: Send + Sync {
    /// Rebuild the account trie at `root`.
    fn recreate_trie(&self, root: &H256) -> StateResult<()>;

    /// Root of the trie as currently loaded.
    fn root_hash(&self) -> H256;
}

/// Describes how the network is split into shards.
pub trait ShardCoordinator: Send + Sync {
    /// Number of shards, not counting the metachain.
    fn number_of_shards(&self) -> u32;

    /// Shard this node belongs to.
    fn self_id(&self) -> ShardId;
}
