//! Bootstrapper: one synchronization attempt at a time.
//!
//! The shared core lives here. Chain specific behaviour is injected as a
//! [`ChainStrategy`]: [`ShardStrategy`] for shard chains and
//! [`MetaStrategy`] for the metachain. Use [`BootstrapperBuilder`] to wire
//! one up.
//!
//! ## Attempt
//!
//! 1. Return early unless [`Bootstrapper::should_sync`] says otherwise
//! 2. Resolve a pending fork through [`ForkChoice`]; a forced fork ends the
//!    attempt after one rollback step
//! 3. Clear outstanding requests and resolve the next header (by hash when a
//!    specific fork is pending, by nonce otherwise)
//! 4. Request the following headers in the background
//! 5. Fetch the body, then process and commit the block
//!
//! A failed attempt runs the failure policy in
//! [`Bootstrapper::on_sync_block_fail`].

mod builder;
mod meta;
mod shard;
mod storage;

pub use builder::BootstrapperBuilder;
pub use meta::MetaStrategy;
pub use shard::ShardStrategy;

use crate::error::{SyncError, SyncResult};
use crate::fork_choice::ForkChoice;
use crate::header_source::HeaderSource;
use crate::store::HeaderStore;
use crate::strategy::ChainStrategy;
use meridian_config::SyncConfig;
use meridian_core::{
    AccountsAdapter, BlockProcessor, ChainHandler, ForkDetector, ForkInfo, HeaderNoncesPool,
    HeadersPool, Rounder,
};
use meridian_types::{ChainKind, Header, H256};
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

/// Called with the new synchronized state whenever it changes.
pub type SyncStateListener = Arc<dyn Fn(bool) + Send + Sync>;

#[derive(Debug)]
struct SyncState {
    fork: ForkInfo,
    requests_with_timeout: u32,
    round_index: i64,
    is_node_synchronized: bool,
    has_last_block: bool,
}

impl Default for SyncState {
    fn default() -> Self {
        Self {
            fork: ForkInfo::none(),
            requests_with_timeout: 0,
            round_index: -1,
            is_node_synchronized: false,
            has_last_block: false,
        }
    }
}

/// Drives synchronization of one chain.
pub struct Bootstrapper {
    pub(crate) chain: Arc<dyn ChainHandler>,
    pub(crate) accounts: Arc<dyn AccountsAdapter>,
    pub(crate) fork_detector: Arc<dyn ForkDetector>,
    pub(crate) block_processor: Arc<dyn BlockProcessor>,
    pub(crate) rounder: Arc<dyn Rounder>,
    pub(crate) headers: Arc<dyn HeadersPool>,
    pub(crate) header_nonces: Arc<dyn HeaderNoncesPool>,
    pub(crate) store: HeaderStore,
    pub(crate) strategy: Arc<dyn ChainStrategy>,
    pub(crate) source: Arc<HeaderSource>,
    pub(crate) fork_choice: ForkChoice,
    pub(crate) config: SyncConfig,
    pub(crate) bootstrap_round: u64,
    state: Mutex<SyncState>,
    listeners: RwLock<Vec<SyncStateListener>>,
    pub(crate) stop_tx: Mutex<Option<oneshot::Sender<()>>>,
}

impl Bootstrapper {
    /// Kind of chain being synced.
    pub fn kind(&self) -> ChainKind {
        self.strategy.kind()
    }

    /// Header lookup used by the attempts.
    pub fn header_source(&self) -> &Arc<HeaderSource> {
        &self.source
    }

    /// Rollback engine used by the attempts.
    pub fn fork_choice(&self) -> &ForkChoice {
        &self.fork_choice
    }

    /// Round the bootstrap started in.
    pub fn bootstrap_round(&self) -> u64 {
        self.bootstrap_round
    }

    /// Consecutive timed out attempts.
    pub fn requests_with_timeout(&self) -> u32 {
        self.state.lock().requests_with_timeout
    }

    /// Synchronized state as of the last evaluation.
    pub fn is_node_synchronized(&self) -> bool {
        self.state.lock().is_node_synchronized
    }

    /// Returns true if the node holds the highest block the network is
    /// believed to have, as of the last evaluation.
    pub fn has_last_block(&self) -> bool {
        self.state.lock().has_last_block
    }

    /// Register a callback for synchronized state changes.
    pub fn add_sync_state_listener<F>(&self, listener: F)
    where
        F: Fn(bool) + Send + Sync + 'static,
    {
        self.listeners.write().push(Arc::new(listener));
    }

    /// Decide whether an attempt has work to do, refreshing the fork verdict.
    ///
    /// A node that was synchronized skips the check until the round changes.
    pub fn should_sync(&self) -> bool {
        let round_index = self.rounder.index();

        let (changed, synchronized) = {
            let mut state = self.state.lock();
            if state.is_node_synchronized && state.round_index == round_index {
                return false;
            }

            state.fork = self.fork_detector.check_fork();
            let probable_highest_nonce = self.fork_detector.probable_highest_nonce();
            state.has_last_block = match self.chain.current_header() {
                Some(header) => probable_highest_nonce <= header.nonce(),
                None => probable_highest_nonce == 0,
            };

            let synchronized = !state.fork.is_detected && state.has_last_block;
            let changed = synchronized != state.is_node_synchronized;
            state.is_node_synchronized = synchronized;
            state.round_index = round_index;
            (changed, synchronized)
        };

        if changed {
            debug!(synchronized, "node changed its synchronized state");
            let listeners = self.listeners.read().clone();
            for listener in listeners {
                listener(synchronized);
            }
        }

        !synchronized
    }

    /// Run one synchronization attempt.
    pub async fn sync_block(&self) -> SyncResult<()> {
        if !self.should_sync() {
            return Ok(());
        }

        let fork = self.state.lock().fork;
        if fork.is_detected {
            let forced = fork.is_forced();
            if forced {
                info!("fork has been forced");
            } else {
                info!(
                    nonce = fork.nonce,
                    hash = %fork.hash.map(|h| h.short()).unwrap_or_default(),
                    "fork detected"
                );
            }

            if let Err(e) = self.fork_choice.run(!forced, fork.nonce) {
                info!(error = %e, "fork choice did not complete");
            }

            if forced {
                self.fork_detector.reset_probable_highest_nonce();
                self.fork_detector.reset_forced_fork();
                return Ok(());
            }
        }

        self.source.clear_requests();
        let nonce = self.next_nonce();

        let resolved = match fork.hash {
            Some(hash) if fork.is_detected => {
                self.source.header_by_hash(&hash).await.map(|h| (h, hash))
            }
            _ => self.source.header_by_nonce(nonce).await,
        };

        let (header, hash) = match resolved {
            Ok(found) => found,
            Err(e) => {
                self.fork_detector.reset_probable_highest_nonce_if_needed();
                self.on_sync_block_fail(None, &e);
                return Err(e);
            }
        };

        self.request_headers_ahead(header.nonce());

        if let Err(e) = self.process_and_commit(&header).await {
            self.on_sync_block_fail(Some((&header, hash)), &e);
            return Err(e);
        }

        self.state.lock().requests_with_timeout = 0;
        Ok(())
    }

    /// Failure policy for a failed attempt.
    ///
    /// Timeouts are counted. Any other error, or more consecutive timeouts
    /// than allowed in a proper round, drops the attempted header and rolls
    /// back one block. The timeout case also resets the probable highest
    /// nonce.
    pub fn on_sync_block_fail(&self, header: Option<(&Header, H256)>, err: &SyncError) {
        let round_index = self.rounder.index();

        let (should_roll_back, force_rollback) = {
            let mut state = self.state.lock();
            if err.is_timeout() {
                state.requests_with_timeout += 1;
            }

            let allowed_reached =
                state.requests_with_timeout > self.config.max_requests_with_timeout_allowed;
            let force_rollback = allowed_reached && self.config.is_in_proper_round(round_index);
            let should_roll_back = !err.is_timeout() || force_rollback;
            if should_roll_back {
                state.requests_with_timeout = 0;
            }
            (should_roll_back, force_rollback)
        };

        info!(
            nonce = header.map(|(h, _)| h.nonce()),
            round = round_index,
            error = %err,
            should_roll_back,
            "sync attempt failed"
        );

        if !should_roll_back {
            return;
        }

        if let Some((header, hash)) = header {
            self.remove_header_from_pools(header, &hash);
            self.fork_detector.remove_headers(header.nonce(), &hash);
        }

        if force_rollback {
            warn!(round = round_index, "too many requests timed out, resetting probable highest nonce");
            self.fork_detector.reset_probable_highest_nonce();
        }

        if let Err(e) = self.fork_choice.run(false, 0) {
            info!(error = %e, "rollback not applied");
        }
    }

    fn next_nonce(&self) -> u64 {
        self.chain
            .current_header()
            .map_or(1, |header| header.nonce().saturating_add(1))
    }

    fn remove_header_from_pools(&self, header: &Header, hash: &H256) {
        self.headers.remove(hash);
        self.header_nonces
            .remove(header.nonce(), self.strategy.shard_id());
    }

    fn request_headers_ahead(&self, nonce: u64) {
        let Some(from) = nonce.checked_add(1) else {
            return;
        };
        let to = nonce
            .saturating_add(self.config.max_headers_to_request_in_advance)
            .min(self.fork_detector.probable_highest_nonce());
        if from > to {
            return;
        }

        let source = Arc::clone(&self.source);
        tokio::spawn(async move {
            source.request_headers_in_advance(from, to);
        });
    }

    async fn process_and_commit(&self, header: &Header) -> SyncResult<()> {
        let body = self.strategy.block_body(header).await?;

        let rounder = Arc::clone(&self.rounder);
        let have_time = move || rounder.time_duration();

        let started = Instant::now();
        self.block_processor
            .process_block(self.chain.as_ref(), header, &body, &have_time)?;
        debug!(
            nonce = header.nonce(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "block processed"
        );

        let started = Instant::now();
        self.block_processor
            .commit_block(self.chain.as_ref(), header, &body)?;
        debug!(
            nonce = header.nonce(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "block committed"
        );

        info!(
            nonce = header.nonce(),
            round = header.round(),
            "block has been synced successfully"
        );
        Ok(())
    }
}
