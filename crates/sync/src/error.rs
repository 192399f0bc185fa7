//! Sync error types

use meridian_config::ConfigError;
use meridian_core::{ProcessError, StateError, StorageError, UnitType};
use meridian_types::{ChainKind, ShardId, H256};
use thiserror::Error;

/// Errors raised while bootstrapping or synchronizing a chain.
#[derive(Debug, Error)]
pub enum SyncError {
    /// A required collaborator was not supplied
    #[error("missing dependency: {0}")]
    MissingDependency(&'static str),

    /// The storage service lacks a unit the chain needs
    #[error("storage unit not available: {0}")]
    MissingStorageUnit(UnitType),

    /// The coordinator's own shard does not fit the chain being built
    #[error("shard {0} does not match the requested chain")]
    InvalidShard(ShardId),

    /// Sync configuration failed validation
    #[error("invalid sync configuration: {0}")]
    InvalidConfig(#[from] ConfigError),

    /// No header with this nonce in pools or storage
    #[error("header with nonce {nonce} not found")]
    HeaderNotFound {
        /// Requested nonce
        nonce: u64,
    },

    /// No header with this hash in pools or storage
    #[error("header with hash {0} not found")]
    HeaderHashNotFound(H256),

    /// Mini blocks of a block body are missing
    #[error("body of block {nonce} is missing {missing} mini blocks")]
    BodyNotFound {
        /// Nonce of the block
        nonce: u64,
        /// Number of missing mini blocks
        missing: usize,
    },

    /// The chain has no current header
    #[error("nil block header")]
    NilBlockHeader,

    /// The chain has no genesis header
    #[error("nil genesis header")]
    NilGenesisHeader,

    /// A requested header or body did not arrive in time
    #[error("time is out")]
    TimeIsOut,

    /// A header of the other chain kind was found
    #[error("wrong header type: expected {expected}, got {got}")]
    WrongHeaderType {
        /// Kind of the chain being synced
        expected: ChainKind,
        /// Kind of the header found
        got: ChainKind,
    },

    /// A stored header was produced after the bootstrap round
    #[error("block round {round} is higher than bootstrap round {bootstrap_round}")]
    HigherRoundInBlock {
        /// Round of the header
        round: u64,
        /// Round the bootstrap started in
        bootstrap_round: u64,
    },

    /// Genesis cannot be rolled back
    #[error("rollback from genesis")]
    RollbackFromGenesis,

    /// Rolling back would revert a final block
    #[error("roll back behind final header: nonce {nonce}, highest final nonce {final_nonce}")]
    RollBackBehindFinalHeader {
        /// Nonce of the current head
        nonce: u64,
        /// Highest final nonce
        final_nonce: u64,
    },

    /// Storage holds no window of blocks that loads cleanly
    #[error("not enough valid blocks in storage (highest stored nonce {highest})")]
    NotEnoughValidBlocksInStorage {
        /// Highest consecutive nonce in storage
        highest: u64,
    },

    /// Block execution failed
    #[error(transparent)]
    Process(#[from] ProcessError),

    /// Chain head or account state update failed
    #[error(transparent)]
    State(#[from] StateError),

    /// Storage access failed
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// Stored bytes could not be decoded
    #[error("decode error: {0}")]
    Decode(#[from] meridian_types::Error),
}

impl SyncError {
    /// Returns true for deadline failures, which are counted rather than
    /// rolled back immediately.
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            SyncError::TimeIsOut | SyncError::Process(ProcessError::TimeIsOut)
        )
    }
}

/// Result type for sync operations
pub type SyncResult<T> = Result<T, SyncError>;
