//! # Meridian Core - Collaborator Abstractions
//!
//! This crate defines the capabilities the block synchronization engine
//! consumes from the rest of the node. Every external collaborator is a
//! trait so that in-memory, persistent or recording implementations can be
//! swapped in:
//!
//! | Concern | Trait |
//! |---------|-------|
//! | Persistent storage | [`StorageService`], [`Storer`] |
//! | Data pools | [`HeadersPool`], [`HeaderNoncesPool`], [`MiniBlocksPool`] |
//! | Chain head | [`ChainHandler`] |
//! | Round timing | [`Rounder`] |
//! | Account state | [`AccountsAdapter`] |
//! | Fork detection | [`ForkDetector`] |
//! | Block execution | [`BlockProcessor`] |
//! | Network requests | [`HeaderRequester`], [`MiniBlockRequester`] |
//! | Sharding | [`ShardCoordinator`] |
//!
//! All traits require `Send + Sync`: pool receipt handlers run concurrently
//! with the sync loop.

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::all)]

pub mod sharding;
pub mod traits;

pub use sharding::{MultiShardCoordinator, OneShardCoordinator};
pub use traits::{
    // Chain
    AccountsAdapter, ChainHandler, Rounder, StateError, StateResult,
    // Pools
    HashHandler, HeaderNoncesPool, HeadersPool, MiniBlocksPool, NonceHandler,
    // Process
    BlockHeaderState, BlockProcessor, ForkDetector, ForkInfo, ProcessError, ProcessResult,
    // Requests
    HeaderRequester, MiniBlockRequester, RequestError, RequestResult,
    // Sharding
    ShardCoordinator,
    // Storage
    nonce_to_bytes, StorageError, StorageResult, StorageService, Storer, UnitType,
};
