//! Capability traits consumed by the sync engine.
//!
//! - **Storage**: logical storage units and the service that hands them out
//! - **Pools**: in-memory caches with receipt notification
//! - **Chain**: chain head, round timing and the account trie
//! - **Process**: fork detector and block executor
//! - **Requests**: fire-and-forget network request dispatch
//!
//! ```ignore
//! use meridian_core::traits::{ForkDetector, HeadersPool};
//!
//! fn feed(pool: &dyn HeadersPool, detector: &dyn ForkDetector, hash: H256) {
//!     if let Some(header) = pool.get(&hash) {
//!         let _ = detector.add_header(&header, hash, BlockHeaderState::Received);
//!     }
//! }
//! ```

mod chain;
mod pool;
mod process;
mod request;
mod storage;

pub use chain::*;
pub use pool::*;
pub use process::*;
pub use request::*;
pub use storage::*;
