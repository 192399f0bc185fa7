//! Wiring of a [`Bootstrapper`] from its collaborators.

use super::{Bootstrapper, MetaStrategy, ShardStrategy, SyncState};
use crate::error::{SyncError, SyncResult};
use crate::fork_choice::ForkChoice;
use crate::header_source::HeaderSource;
use crate::store::HeaderStore;
use crate::strategy::ChainStrategy;
use meridian_config::SyncConfig;
use meridian_core::{
    AccountsAdapter, BlockProcessor, ChainHandler, ForkDetector, HeaderNoncesPool,
    HeaderRequester, HeadersPool, MiniBlockRequester, MiniBlocksPool, Rounder, ShardCoordinator,
    StorageService, UnitType,
};
use meridian_types::METACHAIN_SHARD_ID;
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;
use tracing::info;

/// Collects the collaborators of a [`Bootstrapper`].
///
/// ```ignore
/// let bootstrapper = BootstrapperBuilder::new()
///     .chain(chain)
///     .storage(storage)
///     // ...
///     .config(config.sync.clone())
///     .build_shard()?;
/// ```
#[derive(Default)]
pub struct BootstrapperBuilder {
    chain: Option<Arc<dyn ChainHandler>>,
    storage: Option<Arc<dyn StorageService>>,
    headers: Option<Arc<dyn HeadersPool>>,
    header_nonces: Option<Arc<dyn HeaderNoncesPool>>,
    mini_blocks: Option<Arc<dyn MiniBlocksPool>>,
    fork_detector: Option<Arc<dyn ForkDetector>>,
    block_processor: Option<Arc<dyn BlockProcessor>>,
    rounder: Option<Arc<dyn Rounder>>,
    accounts: Option<Arc<dyn AccountsAdapter>>,
    shard_coordinator: Option<Arc<dyn ShardCoordinator>>,
    header_requester: Option<Arc<dyn HeaderRequester>>,
    mini_block_requester: Option<Arc<dyn MiniBlockRequester>>,
    config: SyncConfig,
    bootstrap_round: Option<u64>,
}

/// Collaborators shared by both chain kinds.
struct Common {
    chain: Arc<dyn ChainHandler>,
    storage: Arc<dyn StorageService>,
    headers: Arc<dyn HeadersPool>,
    header_nonces: Arc<dyn HeaderNoncesPool>,
    fork_detector: Arc<dyn ForkDetector>,
    block_processor: Arc<dyn BlockProcessor>,
    rounder: Arc<dyn Rounder>,
    accounts: Arc<dyn AccountsAdapter>,
    shard_coordinator: Arc<dyn ShardCoordinator>,
    header_requester: Arc<dyn HeaderRequester>,
    config: SyncConfig,
    bootstrap_round: u64,
}

fn require<T>(value: Option<T>, name: &'static str) -> SyncResult<T> {
    value.ok_or(SyncError::MissingDependency(name))
}

impl BootstrapperBuilder {
    /// Empty builder with the default sync configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Chain head of the synced chain.
    pub fn chain(mut self, chain: Arc<dyn ChainHandler>) -> Self {
        self.chain = Some(chain);
        self
    }

    /// Persistent storage units.
    pub fn storage(mut self, storage: Arc<dyn StorageService>) -> Self {
        self.storage = Some(storage);
        self
    }

    /// Header pool keyed by hash.
    pub fn headers(mut self, headers: Arc<dyn HeadersPool>) -> Self {
        self.headers = Some(headers);
        self
    }

    /// Header pool index by (nonce, shard).
    pub fn header_nonces(mut self, header_nonces: Arc<dyn HeaderNoncesPool>) -> Self {
        self.header_nonces = Some(header_nonces);
        self
    }

    /// Mini block pool. Required for shard chains only.
    pub fn mini_blocks(mut self, mini_blocks: Arc<dyn MiniBlocksPool>) -> Self {
        self.mini_blocks = Some(mini_blocks);
        self
    }

    /// Fork detector fed with received and processed headers.
    pub fn fork_detector(mut self, fork_detector: Arc<dyn ForkDetector>) -> Self {
        self.fork_detector = Some(fork_detector);
        self
    }

    /// Block executor.
    pub fn block_processor(mut self, block_processor: Arc<dyn BlockProcessor>) -> Self {
        self.block_processor = Some(block_processor);
        self
    }

    /// Round clock.
    pub fn rounder(mut self, rounder: Arc<dyn Rounder>) -> Self {
        self.rounder = Some(rounder);
        self
    }

    /// Account state adapter.
    pub fn accounts(mut self, accounts: Arc<dyn AccountsAdapter>) -> Self {
        self.accounts = Some(accounts);
        self
    }

    /// Shard layout and own shard id.
    pub fn shard_coordinator(mut self, shard_coordinator: Arc<dyn ShardCoordinator>) -> Self {
        self.shard_coordinator = Some(shard_coordinator);
        self
    }

    /// Network header requester.
    pub fn header_requester(mut self, requester: Arc<dyn HeaderRequester>) -> Self {
        self.header_requester = Some(requester);
        self
    }

    /// Mini block requester. Required for shard chains only.
    pub fn mini_block_requester(mut self, requester: Arc<dyn MiniBlockRequester>) -> Self {
        self.mini_block_requester = Some(requester);
        self
    }

    /// Sync tuning. Defaults to [`SyncConfig::default`].
    pub fn config(mut self, config: SyncConfig) -> Self {
        self.config = config;
        self
    }

    /// Round the bootstrap started in. Defaults to the rounder's index.
    pub fn bootstrap_round(mut self, round: u64) -> Self {
        self.bootstrap_round = Some(round);
        self
    }

    /// Build a bootstrapper for the shard chain of the coordinator's own shard.
    pub fn build_shard(mut self) -> SyncResult<Arc<Bootstrapper>> {
        let common = self.take_common()?;
        let mini_blocks = require(self.mini_blocks.take(), "mini_blocks")?;
        let mini_block_requester =
            require(self.mini_block_requester.take(), "mini_block_requester")?;

        let shard_id = common.shard_coordinator.self_id();
        if shard_id >= common.shard_coordinator.number_of_shards() {
            return Err(SyncError::InvalidShard(shard_id));
        }

        let store = HeaderStore::new(Arc::clone(&common.storage));
        store.require_units(&[
            UnitType::BlockHeader,
            UnitType::ShardHdrNonceHash(shard_id),
            UnitType::MiniBlock,
            UnitType::MetaBlock,
        ])?;
        common.config.validate()?;

        let strategy = ShardStrategy::new(
            shard_id,
            common.config.shard_block_finality,
            store.clone(),
            mini_blocks,
            mini_block_requester,
            Arc::clone(&common.block_processor),
            common.config.wait_time(),
        );
        strategy.register_handlers();

        Ok(assemble(common, store, strategy))
    }

    /// Build a bootstrapper for the metachain.
    pub fn build_meta(mut self) -> SyncResult<Arc<Bootstrapper>> {
        let common = self.take_common()?;
        let num_shards = common.shard_coordinator.number_of_shards();

        let self_id = common.shard_coordinator.self_id();
        if self_id != METACHAIN_SHARD_ID {
            return Err(SyncError::InvalidShard(self_id));
        }

        let store = HeaderStore::new(Arc::clone(&common.storage));
        let mut units = vec![
            UnitType::MetaBlock,
            UnitType::MetaHdrNonceHash,
            UnitType::BlockHeader,
        ];
        units.extend((0..num_shards).map(UnitType::ShardHdrNonceHash));
        store.require_units(&units)?;
        common.config.validate()?;

        let strategy = MetaStrategy::new(
            num_shards,
            common.config.meta_block_finality,
            common.bootstrap_round,
            store.clone(),
            Arc::clone(&common.block_processor),
        );

        Ok(assemble(common, store, strategy))
    }

    fn take_common(&mut self) -> SyncResult<Common> {
        let rounder = require(self.rounder.take(), "rounder")?;
        let bootstrap_round = self
            .bootstrap_round
            .unwrap_or_else(|| u64::try_from(rounder.index()).unwrap_or(0));

        Ok(Common {
            chain: require(self.chain.take(), "chain")?,
            storage: require(self.storage.take(), "storage")?,
            headers: require(self.headers.take(), "headers")?,
            header_nonces: require(self.header_nonces.take(), "header_nonces")?,
            fork_detector: require(self.fork_detector.take(), "fork_detector")?,
            block_processor: require(self.block_processor.take(), "block_processor")?,
            accounts: require(self.accounts.take(), "accounts")?,
            shard_coordinator: require(self.shard_coordinator.take(), "shard_coordinator")?,
            header_requester: require(self.header_requester.take(), "header_requester")?,
            rounder,
            config: self.config.clone(),
            bootstrap_round,
        })
    }
}

fn assemble(common: Common, store: HeaderStore, strategy: Arc<dyn ChainStrategy>) -> Arc<Bootstrapper> {
    let shard_id = strategy.shard_id();

    let source = HeaderSource::new(
        strategy.kind(),
        shard_id,
        Arc::clone(&common.headers),
        Arc::clone(&common.header_nonces),
        store.clone(),
        common.header_requester,
        Arc::clone(&common.fork_detector),
        common.config.wait_time(),
    );
    source.register_handlers();

    let fork_choice = ForkChoice {
        chain: Arc::clone(&common.chain),
        accounts: Arc::clone(&common.accounts),
        fork_detector: Arc::clone(&common.fork_detector),
        block_processor: Arc::clone(&common.block_processor),
        headers: Arc::clone(&common.headers),
        header_nonces: Arc::clone(&common.header_nonces),
        store: store.clone(),
        strategy: Arc::clone(&strategy),
    };

    info!(
        kind = %strategy.kind(),
        shard = shard_id,
        bootstrap_round = common.bootstrap_round,
        "bootstrapper created"
    );

    Arc::new(Bootstrapper {
        chain: common.chain,
        accounts: common.accounts,
        fork_detector: common.fork_detector,
        block_processor: common.block_processor,
        rounder: common.rounder,
        headers: common.headers,
        header_nonces: common.header_nonces,
        store,
        strategy,
        source,
        fork_choice,
        config: common.config,
        bootstrap_round: common.bootstrap_round,
        state: Mutex::new(SyncState::default()),
        listeners: RwLock::new(Vec::new()),
        stop_tx: Mutex::new(None),
    })
}
