//! Network request dispatch.
//!
//! Requests are fire-and-forget: the answer arrives later through the pools.

use meridian_types::H256;
use thiserror::Error;

/// Errors raised while dispatching a request.
#[derive(Error, Debug)]
pub enum RequestError {
    /// No peer could take the request.
    #[error("no peers available")]
    NoPeers,

    /// The request could not be sent.
    #[error("send failed: {0}")]
    SendFailed(String),
}

/// Result type for request dispatch.
pub type RequestResult<T> = Result<T, RequestError>;

/// Requests headers of the node's own chain.
pub trait HeaderRequester: Send + Sync {
    /// Ask peers for the header with `nonce`.
    fn request_by_nonce(&self, nonce: u64) -> RequestResult<()>;

    /// Ask peers for the header with `hash`.
    fn request_by_hash(&self, hash: &H256) -> RequestResult<()>;
}

/// Requests mini blocks.
pub trait MiniBlockRequester: Send + Sync {
    /// Ask peers for every mini block in `hashes`.
    fn request_by_hashes(&self, hashes: &[H256]) -> RequestResult<()>;
}
