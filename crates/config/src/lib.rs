//! # Meridian Configuration
//!
//! Configuration parsing and logging setup for the Meridian sync engine.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use meridian_config::{init_tracing, Config};
//! use std::path::Path;
//!
//! let config = Config::load(Path::new("meridian.toml"))?;
//! init_tracing(&config.logging)?;
//! println!("Wait time: {}ms", config.sync.wait_time_ms);
//! ```
//!
//! ## Configuration Sections
//!
//! - `[sync]` - Sync loop timing, retry thresholds and finality windows
//! - `[storage]` - Database path, shard count and RocksDB tuning
//! - `[logging]` - Logging level and format

mod config;
mod error;
mod logging;

pub use config::*;
pub use error::*;
pub use logging::init_tracing;
