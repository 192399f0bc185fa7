//! Fork detection and block execution.

use crate::traits::{ChainHandler, StateError, StorageError};
use meridian_types::{BlockBody, Header, ShardId, H256};
use std::time::Duration;
use thiserror::Error;

/// Errors returned by the fork detector and block executor.
#[derive(Error, Debug)]
pub enum ProcessError {
    /// The header does not extend the current head.
    #[error("block does not extend the chain: {0}")]
    InvalidBlock(String),

    /// The round ended before execution finished.
    #[error("time is out while processing block")]
    TimeIsOut,

    /// The fork detector rejected a header.
    #[error("fork detector rejected header: {0}")]
    HeaderRejected(String),

    /// State update failed.
    #[error(transparent)]
    State(#[from] StateError),

    /// Storage access failed.
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Result type for process operations.
pub type ProcessResult<T> = Result<T, ProcessError>;

/// How a header reached the fork detector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlockHeaderState {
    /// Seen on the network, not yet executed
    Received,
    /// Executed and committed locally
    Processed,
}

/// Fork detector verdict.
///
/// `nonce == u64::MAX` with no hash is a forced fork: divergence is suspected
/// but no competing header is known.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ForkInfo {
    /// A fork was detected
    pub is_detected: bool,
    /// Nonce the fork starts at
    pub nonce: u64,
    /// Hash of the competing header, if known
    pub hash: Option<H256>,
}

impl ForkInfo {
    /// No fork.
    pub fn none() -> Self {
        Self {
            is_detected: false,
            nonce: 0,
            hash: None,
        }
    }

    /// Fork without a known competing header.
    pub fn forced() -> Self {
        Self {
            is_detected: true,
            nonce: u64::MAX,
            hash: None,
        }
    }

    /// Fork at `nonce` in favour of the header `hash`.
    pub fn specific(nonce: u64, hash: H256) -> Self {
        Self {
            is_detected: true,
            nonce,
            hash: Some(hash),
        }
    }

    /// Returns true for a forced fork.
    pub fn is_forced(&self) -> bool {
        self.is_detected && self.nonce == u64::MAX && self.hash.is_none()
    }
}

impl Default for ForkInfo {
    fn default() -> Self {
        Self::none()
    }
}

/// Observes headers and flags divergence from the canonical chain.
pub trait ForkDetector: Send + Sync {
    /// Record a header.
    fn add_header(&self, header: &Header, hash: H256, state: BlockHeaderState)
        -> ProcessResult<()>;

    /// Forget headers with `nonce` and `hash`.
    fn remove_headers(&self, nonce: u64, hash: &H256);

    /// Current fork verdict.
    fn check_fork(&self) -> ForkInfo;

    /// Highest nonce considered irreversibly final.
    fn highest_final_block_nonce(&self) -> u64;

    /// Highest nonce the network is believed to have reached.
    fn probable_highest_nonce(&self) -> u64;

    /// Lower the probable highest nonce if it is no longer backed by headers.
    fn reset_probable_highest_nonce_if_needed(&self);

    /// Lower the probable highest nonce unconditionally.
    fn reset_probable_highest_nonce(&self);

    /// Clear a forced fork.
    fn reset_forced_fork(&self);
}

/// Executes and commits blocks.
pub trait BlockProcessor: Send + Sync {
    /// Execute `header` and `body` on top of the chain head, finishing before
    /// `have_time` reaches zero.
    fn process_block(
        &self,
        chain: &dyn ChainHandler,
        header: &Header,
        body: &BlockBody,
        have_time: &dyn Fn() -> Duration,
    ) -> ProcessResult<()>;

    /// Commit a processed block, moving the chain head.
    fn commit_block(
        &self,
        chain: &dyn ChainHandler,
        header: &Header,
        body: &BlockBody,
    ) -> ProcessResult<()>;

    /// Put the transactions of a rolled back block back into the pools.
    fn restore_block_into_pools(
        &self,
        header: &Header,
        body: Option<&BlockBody>,
    ) -> ProcessResult<()>;

    /// Record the last header notarized for `shard`.
    fn add_last_notarized_header(&self, shard: ShardId, header: &Header);
}
