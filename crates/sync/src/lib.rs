//! # Meridian Sync
//!
//! Block synchronization and fork resolution for a sharded chain node.
//!
//! ## Components
//!
//! - **HeaderSource**: pool-first header lookup with bounded network waits
//! - **ForkChoice**: one-block rollback of the chain head and account trie
//! - **NotarizationTracker**: per-shard notarization recovered from stored
//!   metachain blocks
//! - **Bootstrapper**: one attempt at a time, with [`ShardStrategy`] and
//!   [`MetaStrategy`] supplying what differs between the chain kinds
//! - **Sync loop**: storage catch-up followed by repeated attempts until
//!   stopped
//!
//! ## Usage
//!
//! ```ignore
//! let bootstrapper = BootstrapperBuilder::new()
//!     .chain(chain)
//!     .storage(storage)
//!     .headers(headers)
//!     .header_nonces(header_nonces)
//!     .fork_detector(fork_detector)
//!     .block_processor(block_processor)
//!     .rounder(rounder)
//!     .accounts(accounts)
//!     .shard_coordinator(coordinator)
//!     .header_requester(requester)
//!     .config(config.sync)
//!     .build_meta()?;
//!
//! let handle = bootstrapper.start_sync();
//! // ...
//! bootstrapper.stop_sync();
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod bootstrap;
pub mod error;
pub mod fork_choice;
pub mod header_source;
pub mod notarization;
pub mod signal;
pub mod store;
pub mod strategy;
mod sync_loop;

pub use bootstrap::{Bootstrapper, BootstrapperBuilder, MetaStrategy, ShardStrategy, SyncStateListener};
pub use error::{SyncError, SyncResult};
pub use fork_choice::ForkChoice;
pub use header_source::HeaderSource;
pub use notarization::{NotarizationTracker, NotarizedInfo};
pub use signal::Signal;
pub use store::HeaderStore;
pub use strategy::ChainStrategy;
