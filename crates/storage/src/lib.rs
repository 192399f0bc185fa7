//! Meridian Storage Layer
//!
//! Concrete collaborators for the sync engine:
//!
//! - **Database**: RocksDB wrapper with one column family per storage unit
//! - **Memory**: hash map backed storage units
//! - **Pools**: header, nonce index and mini block pools with receipt handlers
//! - **Chain**: the chain head
//! - **Accounts**: account trie root tracking

#![deny(missing_docs)]
#![deny(unsafe_code)]

pub mod accounts;
pub mod chain;
pub mod db;
pub mod memory;
pub mod pool;

pub use accounts::InMemoryAccounts;
pub use chain::BlockChain;
pub use db::{Database, DatabaseConfig, DbUnit, RocksDbStorage};
pub use memory::{MemoryStorage, MemoryStorer};
pub use pool::{HeaderCache, HeaderNonceIndex, MiniBlockCache};
