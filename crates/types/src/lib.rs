//! # Meridian Types
//!
//! Core data types shared by the Meridian block synchronization engine:
//! - [`H256`] - 32-byte Keccak256 hashes
//! - [`Header`] - shard or metachain block header, a tagged union with
//!   exhaustive accessors
//! - [`BlockBody`] and [`MiniBlock`] - shard block bodies
//!
//! ## Example
//!
//! ```rust
//! use meridian_types::{Header, MetaHeader, H256};
//!
//! let header = Header::Meta(MetaHeader {
//!     nonce: 1,
//!     round: 1,
//!     epoch: 0,
//!     timestamp: 0,
//!     prev_hash: H256::NIL,
//!     root_hash: H256::NIL,
//!     shard_info: vec![],
//! });
//! let bytes = header.encode_bytes();
//! assert_eq!(Header::decode_bytes(&bytes).unwrap().hash(), header.hash());
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]
#![deny(unsafe_code)]

pub mod block;
pub mod hash;

pub use block::{
    BlockBody, ChainKind, Header, MetaHeader, MiniBlock, MiniBlockHeader, ShardData, ShardHeader,
    ShardId, METACHAIN_SHARD_ID,
};
pub use hash::H256;

/// Result type alias for type-level operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur when working with Meridian types
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid hex string
    #[error("invalid hex: {0}")]
    InvalidHex(#[from] hex::FromHexError),

    /// Invalid length for a fixed-size type
    #[error("invalid length: expected {expected}, got {actual}")]
    InvalidLength {
        /// Expected length
        expected: usize,
        /// Actual length
        actual: usize,
    },

    /// Invalid hash format
    #[error("invalid hash format: {0}")]
    InvalidHash(String),

    /// RLP decoding error
    #[error("RLP decode error: {0}")]
    RlpDecode(#[from] rlp::DecoderError),
}
