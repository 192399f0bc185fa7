//! Shared collaborators for sync integration tests.

#![allow(dead_code)]

use meridian_config::SyncConfig;
use meridian_core::{
    AccountsAdapter, BlockHeaderState, BlockProcessor, ChainHandler, ForkDetector, ForkInfo,
    HeaderNoncesPool, HeaderRequester, HeadersPool, MiniBlockRequester, MiniBlocksPool,
    MultiShardCoordinator, ProcessError, ProcessResult, RequestResult, Rounder,
};
use meridian_storage::{
    BlockChain, HeaderCache, HeaderNonceIndex, InMemoryAccounts, MemoryStorage, MiniBlockCache,
};
use meridian_sync::{Bootstrapper, BootstrapperBuilder, HeaderStore};
use meridian_types::{
    BlockBody, ChainKind, Header, MetaHeader, MiniBlock, MiniBlockHeader, ShardData, ShardHeader,
    ShardId, H256, METACHAIN_SHARD_ID,
};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

pub const NUM_SHARDS: u32 = 2;

// =============================================================================
// Headers
// =============================================================================

pub fn root_for(nonce: u64) -> H256 {
    H256::keccak256(format!("root-{nonce}").as_bytes())
}

pub fn meta_header(nonce: u64, prev_hash: H256) -> Header {
    Header::Meta(MetaHeader {
        nonce,
        round: nonce,
        epoch: 0,
        timestamp: nonce * 1000,
        prev_hash,
        root_hash: root_for(nonce),
        shard_info: vec![],
    })
}

pub fn notarizing_meta_header(nonce: u64, prev_hash: H256, notarized: &[(ShardId, H256)]) -> Header {
    let Header::Meta(mut meta) = meta_header(nonce, prev_hash) else {
        unreachable!()
    };
    meta.shard_info = notarized
        .iter()
        .map(|(shard_id, header_hash)| ShardData {
            shard_id: *shard_id,
            header_hash: *header_hash,
            root_hash: H256::NIL,
        })
        .collect();
    Header::Meta(meta)
}

pub fn shard_header(nonce: u64, prev_hash: H256, mini_blocks: &[MiniBlock]) -> Header {
    Header::Shard(ShardHeader {
        nonce,
        round: nonce,
        epoch: 0,
        shard_id: 0,
        timestamp: nonce * 1000,
        prev_hash,
        root_hash: root_for(nonce),
        mini_block_headers: mini_blocks.iter().map(MiniBlock::to_header).collect(),
        meta_block_hashes: vec![],
    })
}

pub fn mini_block(seed: u8) -> MiniBlock {
    MiniBlock {
        sender_shard_id: 0,
        receiver_shard_id: 1,
        tx_hashes: vec![H256::new([seed; 32])],
    }
}

pub fn mini_block_header_hashes(header: &Header) -> Vec<H256> {
    header
        .as_shard()
        .map(|h| h.mini_block_headers.iter().map(|mb: &MiniBlockHeader| mb.hash).collect())
        .unwrap_or_default()
}

/// Genesis plus `count` linked metachain headers. Index equals nonce.
pub fn meta_chain(count: u64) -> Vec<Header> {
    let mut chain = vec![meta_header(0, H256::NIL)];
    for nonce in 1..=count {
        let prev = chain[nonce as usize - 1].hash();
        chain.push(meta_header(nonce, prev));
    }
    chain
}

/// Genesis plus `count` linked shard headers without mini blocks.
pub fn shard_chain(count: u64) -> Vec<Header> {
    let mut chain = vec![shard_header(0, H256::NIL, &[])];
    for nonce in 1..=count {
        let prev = chain[nonce as usize - 1].hash();
        chain.push(shard_header(nonce, prev, &[]));
    }
    chain
}

/// A header competing with `chain[nonce]`.
pub fn competing_meta_header(nonce: u64, prev_hash: H256) -> Header {
    let Header::Meta(mut meta) = meta_header(nonce, prev_hash) else {
        unreachable!()
    };
    meta.round += 100;
    meta.root_hash = H256::keccak256(format!("competing-{nonce}").as_bytes());
    Header::Meta(meta)
}

// =============================================================================
// Fork detector
// =============================================================================

#[derive(Default)]
pub struct MockForkDetector {
    pub final_nonce: AtomicU64,
    pub probable_highest: AtomicU64,
    pub fork: Mutex<ForkInfo>,
    pub added: Mutex<Vec<(u64, BlockHeaderState)>>,
    pub removed: Mutex<Vec<(u64, H256)>>,
    pub check_fork_calls: AtomicUsize,
    pub reset_probable_calls: AtomicUsize,
    pub reset_if_needed_calls: AtomicUsize,
    pub reset_forced_calls: AtomicUsize,
}

impl MockForkDetector {
    pub fn set_final(&self, nonce: u64) {
        self.final_nonce.store(nonce, Ordering::SeqCst);
    }

    pub fn set_probable(&self, nonce: u64) {
        self.probable_highest.store(nonce, Ordering::SeqCst);
    }

    pub fn set_fork(&self, fork: ForkInfo) {
        *self.fork.lock() = fork;
    }

    pub fn added_with(&self, state: BlockHeaderState) -> Vec<u64> {
        self.added
            .lock()
            .iter()
            .filter(|(_, s)| *s == state)
            .map(|(nonce, _)| *nonce)
            .collect()
    }

    pub fn removed_nonces(&self) -> Vec<u64> {
        self.removed.lock().iter().map(|(nonce, _)| *nonce).collect()
    }
}

impl ForkDetector for MockForkDetector {
    fn add_header(&self, header: &Header, _hash: H256, state: BlockHeaderState) -> ProcessResult<()> {
        self.added.lock().push((header.nonce(), state));
        Ok(())
    }

    fn remove_headers(&self, nonce: u64, hash: &H256) {
        self.removed.lock().push((nonce, *hash));
    }

    fn check_fork(&self) -> ForkInfo {
        self.check_fork_calls.fetch_add(1, Ordering::SeqCst);
        *self.fork.lock()
    }

    fn highest_final_block_nonce(&self) -> u64 {
        self.final_nonce.load(Ordering::SeqCst)
    }

    fn probable_highest_nonce(&self) -> u64 {
        self.probable_highest.load(Ordering::SeqCst)
    }

    fn reset_probable_highest_nonce_if_needed(&self) {
        self.reset_if_needed_calls.fetch_add(1, Ordering::SeqCst);
    }

    fn reset_probable_highest_nonce(&self) {
        self.reset_probable_calls.fetch_add(1, Ordering::SeqCst);
    }

    fn reset_forced_fork(&self) {
        self.reset_forced_calls.fetch_add(1, Ordering::SeqCst);
        *self.fork.lock() = ForkInfo::none();
    }
}

// =============================================================================
// Block processor
// =============================================================================

/// Commits by writing the header and mini blocks to storage and moving the
/// chain head and account root.
pub struct MockBlockProcessor {
    store: HeaderStore,
    accounts: Arc<InMemoryAccounts>,
    pub fail_process: AtomicBool,
    pub time_out: AtomicBool,
    pub processed: Mutex<Vec<u64>>,
    pub committed: Mutex<Vec<u64>>,
    pub restored: Mutex<Vec<(u64, usize)>>,
    pub notarized: Mutex<Vec<(ShardId, u64)>>,
}

impl MockBlockProcessor {
    pub fn new(store: HeaderStore, accounts: Arc<InMemoryAccounts>) -> Self {
        Self {
            store,
            accounts,
            fail_process: AtomicBool::new(false),
            time_out: AtomicBool::new(false),
            processed: Mutex::new(Vec::new()),
            committed: Mutex::new(Vec::new()),
            restored: Mutex::new(Vec::new()),
            notarized: Mutex::new(Vec::new()),
        }
    }
}

impl BlockProcessor for MockBlockProcessor {
    fn process_block(
        &self,
        _chain: &dyn ChainHandler,
        header: &Header,
        _body: &BlockBody,
        have_time: &dyn Fn() -> Duration,
    ) -> ProcessResult<()> {
        if self.time_out.load(Ordering::SeqCst) || have_time().is_zero() {
            return Err(ProcessError::TimeIsOut);
        }
        if self.fail_process.load(Ordering::SeqCst) {
            return Err(ProcessError::InvalidBlock(format!("rejected block {}", header.nonce())));
        }
        self.processed.lock().push(header.nonce());
        Ok(())
    }

    fn commit_block(&self, chain: &dyn ChainHandler, header: &Header, body: &BlockBody) -> ProcessResult<()> {
        for mini_block in &body.mini_blocks {
            self.store
                .put_mini_block(mini_block)
                .map_err(|e| ProcessError::InvalidBlock(e.to_string()))?;
        }
        let hash = self
            .store
            .put_header(header.shard_id(), header)
            .map_err(|e| ProcessError::InvalidBlock(e.to_string()))?;

        chain.set_current_header(Some(header.clone()))?;
        chain.set_current_header_hash(Some(hash));
        chain.set_current_body(Some(body.clone()));
        self.accounts.commit(header.root_hash());
        self.committed.lock().push(header.nonce());
        Ok(())
    }

    fn restore_block_into_pools(&self, header: &Header, body: Option<&BlockBody>) -> ProcessResult<()> {
        let count = body.map_or(0, |b| b.mini_blocks.len());
        self.restored.lock().push((header.nonce(), count));
        Ok(())
    }

    fn add_last_notarized_header(&self, shard: ShardId, header: &Header) {
        self.notarized.lock().push((shard, header.nonce()));
    }
}

// =============================================================================
// Network
// =============================================================================

/// Answers header requests from a fixed set of headers by inserting them
/// into the pools, as a topic interceptor would.
pub struct MockHeaderRequester {
    shard: ShardId,
    headers: Arc<HeaderCache>,
    header_nonces: Arc<HeaderNonceIndex>,
    network: Mutex<HashMap<u64, Header>>,
    competing: Mutex<HashMap<H256, Header>>,
    pub requested_nonces: Mutex<Vec<u64>>,
    pub requested_hashes: Mutex<Vec<H256>>,
}

impl MockHeaderRequester {
    pub fn new(shard: ShardId, headers: Arc<HeaderCache>, header_nonces: Arc<HeaderNonceIndex>) -> Self {
        Self {
            shard,
            headers,
            header_nonces,
            network: Mutex::new(HashMap::new()),
            competing: Mutex::new(HashMap::new()),
            requested_nonces: Mutex::new(Vec::new()),
            requested_hashes: Mutex::new(Vec::new()),
        }
    }

    /// Make `header` available by nonce.
    pub fn serve(&self, header: Header) {
        self.network.lock().insert(header.nonce(), header);
    }

    /// Make `header` available by hash only.
    pub fn serve_by_hash(&self, header: Header) {
        self.competing.lock().insert(header.hash(), header);
    }

    fn deliver(&self, header: Header) {
        let hash = header.hash();
        let nonce = header.nonce();
        self.headers.insert(hash, header);
        self.header_nonces.insert(nonce, self.shard, hash);
    }
}

impl HeaderRequester for MockHeaderRequester {
    fn request_by_nonce(&self, nonce: u64) -> RequestResult<()> {
        self.requested_nonces.lock().push(nonce);
        let header = self.network.lock().get(&nonce).cloned();
        if let Some(header) = header {
            self.deliver(header);
        }
        Ok(())
    }

    fn request_by_hash(&self, hash: &H256) -> RequestResult<()> {
        self.requested_hashes.lock().push(*hash);
        let header = self.competing.lock().get(hash).cloned().or_else(|| {
            self.network
                .lock()
                .values()
                .find(|h| h.hash() == *hash)
                .cloned()
        });
        if let Some(header) = header {
            self.deliver(header);
        }
        Ok(())
    }
}

pub struct MockMiniBlockRequester {
    mini_blocks: Arc<MiniBlockCache>,
    network: Mutex<HashMap<H256, MiniBlock>>,
    pub requested: Mutex<Vec<Vec<H256>>>,
}

impl MockMiniBlockRequester {
    pub fn new(mini_blocks: Arc<MiniBlockCache>) -> Self {
        Self {
            mini_blocks,
            network: Mutex::new(HashMap::new()),
            requested: Mutex::new(Vec::new()),
        }
    }

    pub fn serve(&self, mini_block: MiniBlock) {
        self.network.lock().insert(mini_block.hash(), mini_block);
    }
}

impl MiniBlockRequester for MockMiniBlockRequester {
    fn request_by_hashes(&self, hashes: &[H256]) -> RequestResult<()> {
        self.requested.lock().push(hashes.to_vec());
        let found: Vec<(H256, MiniBlock)> = {
            let network = self.network.lock();
            hashes
                .iter()
                .filter_map(|hash| network.get(hash).map(|mb| (*hash, mb.clone())))
                .collect()
        };
        for (hash, mini_block) in found {
            self.mini_blocks.insert(hash, mini_block);
        }
        Ok(())
    }
}

// =============================================================================
// Rounder
// =============================================================================

pub struct MockRounder {
    index: AtomicI64,
}

impl MockRounder {
    pub fn new(index: i64) -> Self {
        Self {
            index: AtomicI64::new(index),
        }
    }

    pub fn set_index(&self, index: i64) {
        self.index.store(index, Ordering::SeqCst);
    }
}

impl Rounder for MockRounder {
    fn index(&self) -> i64 {
        self.index.load(Ordering::SeqCst)
    }

    fn time_duration(&self) -> Duration {
        Duration::from_millis(100)
    }
}

// =============================================================================
// Harness
// =============================================================================

pub struct Harness {
    pub kind: ChainKind,
    pub genesis: Header,
    pub chain: Arc<BlockChain>,
    pub storage: Arc<MemoryStorage>,
    pub store: HeaderStore,
    pub headers: Arc<HeaderCache>,
    pub header_nonces: Arc<HeaderNonceIndex>,
    pub mini_blocks: Arc<MiniBlockCache>,
    pub fork_detector: Arc<MockForkDetector>,
    pub block_processor: Arc<MockBlockProcessor>,
    pub rounder: Arc<MockRounder>,
    pub accounts: Arc<InMemoryAccounts>,
    pub header_requester: Arc<MockHeaderRequester>,
    pub mini_block_requester: Arc<MockMiniBlockRequester>,
    pub config: SyncConfig,
}

impl Harness {
    pub fn meta() -> Self {
        Self::new(meta_header(0, H256::NIL))
    }

    pub fn shard() -> Self {
        Self::new(shard_header(0, H256::NIL, &[]))
    }

    fn new(genesis: Header) -> Self {
        let kind = genesis.kind();
        let shard = match kind {
            ChainKind::Meta => METACHAIN_SHARD_ID,
            ChainKind::Shard => 0,
        };

        let storage = Arc::new(MemoryStorage::new(NUM_SHARDS));
        let store = HeaderStore::new(storage.clone());
        let headers = Arc::new(HeaderCache::new());
        let header_nonces = Arc::new(HeaderNonceIndex::new());
        let mini_blocks = Arc::new(MiniBlockCache::new());
        let accounts = Arc::new(InMemoryAccounts::new(genesis.root_hash()));

        let config = SyncConfig {
            wait_time_ms: 50,
            ..SyncConfig::default()
        };

        Self {
            kind,
            chain: Arc::new(BlockChain::new(genesis.clone())),
            genesis,
            block_processor: Arc::new(MockBlockProcessor::new(store.clone(), accounts.clone())),
            header_requester: Arc::new(MockHeaderRequester::new(
                shard,
                headers.clone(),
                header_nonces.clone(),
            )),
            mini_block_requester: Arc::new(MockMiniBlockRequester::new(mini_blocks.clone())),
            storage,
            store,
            headers,
            header_nonces,
            mini_blocks,
            fork_detector: Arc::new(MockForkDetector::default()),
            rounder: Arc::new(MockRounder::new(1)),
            accounts,
            config,
        }
    }

    pub fn shard_id(&self) -> ShardId {
        match self.kind {
            ChainKind::Meta => METACHAIN_SHARD_ID,
            ChainKind::Shard => 0,
        }
    }

    /// Builder with every collaborator set.
    pub fn builder(&self) -> BootstrapperBuilder {
        let coordinator = MultiShardCoordinator::new(NUM_SHARDS, self.shard_id())
            .expect("valid coordinator");

        BootstrapperBuilder::new()
            .chain(self.chain.clone())
            .storage(self.storage.clone())
            .headers(self.headers.clone())
            .header_nonces(self.header_nonces.clone())
            .mini_blocks(self.mini_blocks.clone())
            .fork_detector(self.fork_detector.clone())
            .block_processor(self.block_processor.clone())
            .rounder(self.rounder.clone())
            .accounts(self.accounts.clone())
            .shard_coordinator(Arc::new(coordinator))
            .header_requester(self.header_requester.clone())
            .mini_block_requester(self.mini_block_requester.clone())
            .config(self.config.clone())
            .bootstrap_round(1_000)
    }

    pub fn build(&self) -> Arc<Bootstrapper> {
        let builder = self.builder();
        match self.kind {
            ChainKind::Meta => builder.build_meta(),
            ChainKind::Shard => builder.build_shard(),
        }
        .expect("bootstrapper builds")
    }

    /// Store `headers[1..]` and make the last one the chain head, as if they
    /// had been committed.
    pub fn commit_chain(&self, headers: &[Header]) {
        for header in headers.iter().skip(1) {
            let hash = self.store.put_header(self.shard_id(), header).expect("store header");
            self.accounts.add_root(header.root_hash());
            self.chain.set_current_header(Some(header.clone())).expect("set head");
            self.chain.set_current_header_hash(Some(hash));
            self.chain.set_current_body(Some(BlockBody::empty()));
        }
        if let Some(head) = headers.last() {
            self.accounts.commit(head.root_hash());
        }
    }

    /// Store `headers[1..]` without touching the chain head.
    pub fn store_headers(&self, headers: &[Header]) {
        for header in headers.iter().skip(1) {
            self.store.put_header(self.shard_id(), header).expect("store header");
            self.accounts.add_root(header.root_hash());
        }
    }

    /// Put `header` straight into the pools.
    pub fn pool_header(&self, header: &Header) -> H256 {
        let hash = header.hash();
        self.headers.insert(hash, header.clone());
        self.header_nonces.insert(header.nonce(), self.shard_id(), hash);
        hash
    }

    pub fn head_nonce(&self) -> u64 {
        self.chain.head_nonce()
    }

    pub fn accounts_root(&self) -> H256 {
        self.accounts.root_hash()
    }
}
