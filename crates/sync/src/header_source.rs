//! Pool-first header lookup with network fallback.
//!
//! At most one nonce request and one hash request are outstanding. A lookup
//! that misses the pool drains the matching [`Signal`], records the request,
//! dispatches it and waits for the receipt handler to pulse the signal.

use crate::error::{SyncError, SyncResult};
use crate::signal::Signal;
use crate::store::HeaderStore;
use meridian_core::{BlockHeaderState, ForkDetector, HeaderNoncesPool, HeaderRequester, HeadersPool};
use meridian_types::{ChainKind, Header, ShardId, H256};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, trace};

/// Resolves headers of one chain by nonce or hash.
pub struct HeaderSource {
    kind: ChainKind,
    shard_id: ShardId,
    headers: Arc<dyn HeadersPool>,
    header_nonces: Arc<dyn HeaderNoncesPool>,
    store: HeaderStore,
    requester: Arc<dyn HeaderRequester>,
    fork_detector: Arc<dyn ForkDetector>,
    wait_time: Duration,
    requested_nonce: Mutex<Option<u64>>,
    requested_hash: Mutex<Option<H256>>,
    nonce_received: Signal,
    hash_received: Signal,
}

impl HeaderSource {
    /// Create a source for the chain of `kind` identified by `shard_id` in
    /// the nonce index.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        kind: ChainKind,
        shard_id: ShardId,
        headers: Arc<dyn HeadersPool>,
        header_nonces: Arc<dyn HeaderNoncesPool>,
        store: HeaderStore,
        requester: Arc<dyn HeaderRequester>,
        fork_detector: Arc<dyn ForkDetector>,
        wait_time: Duration,
    ) -> Arc<Self> {
        Arc::new(Self {
            kind,
            shard_id,
            headers,
            header_nonces,
            store,
            requester,
            fork_detector,
            wait_time,
            requested_nonce: Mutex::new(None),
            requested_hash: Mutex::new(None),
            nonce_received: Signal::new(),
            hash_received: Signal::new(),
        })
    }

    /// Hook the receipt handlers into the pools.
    pub fn register_handlers(self: &Arc<Self>) {
        let weak = Arc::downgrade(self);
        self.headers.register_handler(Arc::new(move |hash: H256| {
            if let Some(source) = weak.upgrade() {
                source.on_header_received(hash);
            }
        }));

        let weak = Arc::downgrade(self);
        self.header_nonces
            .register_handler(Arc::new(move |nonce: u64, shard: ShardId, hash: H256| {
                if let Some(source) = weak.upgrade() {
                    source.on_header_nonce_received(nonce, shard, hash);
                }
            }));
    }

    /// Header with `hash` from the pool, if it belongs to this chain.
    pub fn header_from_pool(&self, hash: &H256) -> Option<Header> {
        let header = self.headers.get(hash)?;
        if header.kind() != self.kind {
            debug!(hash = %hash.short(), got = %header.kind(), "pool header of the other chain kind");
            return None;
        }
        Some(header)
    }

    /// Header with `nonce` from the pool, with its hash.
    pub fn header_from_pool_by_nonce(&self, nonce: u64) -> Option<(Header, H256)> {
        let hash = self.header_nonces.get(nonce, self.shard_id)?;
        self.header_from_pool(&hash).map(|header| (header, hash))
    }

    /// Returns true if the pool already holds the header with `nonce`.
    pub fn has_header_with_nonce(&self, nonce: u64) -> bool {
        self.header_from_pool_by_nonce(nonce).is_some()
    }

    /// Resolve the header with `nonce`, requesting it if the pool misses.
    pub async fn header_by_nonce(&self, nonce: u64) -> SyncResult<(Header, H256)> {
        if let Some(found) = self.header_from_pool_by_nonce(nonce) {
            return Ok(found);
        }

        self.nonce_received.drain();
        self.request_by_nonce(nonce);
        if !self.nonce_received.wait(self.wait_time).await {
            debug!(nonce, "timed out waiting for header");
            return Err(SyncError::TimeIsOut);
        }

        self.header_from_pool_by_nonce(nonce)
            .ok_or(SyncError::HeaderNotFound { nonce })
    }

    /// Resolve the header with `hash` from the pool or storage, requesting it
    /// if both miss.
    pub async fn header_by_hash(&self, hash: &H256) -> SyncResult<Header> {
        if let Some(header) = self.header_from_pool(hash) {
            return Ok(header);
        }
        match self.store.header_by_hash(self.shard_id, hash) {
            Ok(header) => return Ok(header),
            Err(e) => trace!(hash = %hash.short(), error = %e, "header not in storage"),
        }

        self.hash_received.drain();
        self.request_by_hash(hash);
        if !self.hash_received.wait(self.wait_time).await {
            debug!(hash = %hash.short(), "timed out waiting for header");
            return Err(SyncError::TimeIsOut);
        }

        self.header_from_pool(hash)
            .ok_or(SyncError::HeaderHashNotFound(*hash))
    }

    /// Request every header in `from..=to` missing from the pool, without
    /// touching the outstanding request markers.
    pub fn request_headers_in_advance(&self, from: u64, to: u64) {
        for nonce in from..=to {
            if self.has_header_with_nonce(nonce) {
                continue;
            }
            match self.requester.request_by_nonce(nonce) {
                Ok(()) => trace!(nonce, "requested header in advance"),
                Err(e) => error!(nonce, error = %e, "header request failed"),
            }
        }
    }

    /// Forget both outstanding requests.
    pub fn clear_requests(&self) {
        *self.requested_nonce.lock() = None;
        *self.requested_hash.lock() = None;
    }

    /// Nonce currently requested, if any.
    pub fn requested_nonce(&self) -> Option<u64> {
        *self.requested_nonce.lock()
    }

    /// Hash currently requested, if any.
    pub fn requested_hash(&self) -> Option<H256> {
        *self.requested_hash.lock()
    }

    fn request_by_nonce(&self, nonce: u64) {
        *self.requested_nonce.lock() = Some(nonce);
        let result = self.requester.request_by_nonce(nonce);

        info!(
            nonce,
            probable_highest_nonce = self.fork_detector.probable_highest_nonce(),
            "requested header from network"
        );

        if let Err(e) = result {
            error!(nonce, error = %e, "header request failed");
        }
    }

    fn request_by_hash(&self, hash: &H256) {
        *self.requested_hash.lock() = Some(*hash);
        let result = self.requester.request_by_hash(hash);

        info!(hash = %hash.short(), "requested header from network");

        if let Err(e) = result {
            error!(hash = %hash.short(), error = %e, "header request failed");
        }
    }

    fn on_header_received(&self, hash: H256) {
        let Some(header) = self.headers.get(&hash) else {
            return;
        };
        if header.kind() != self.kind {
            let e = SyncError::WrongHeaderType {
                expected: self.kind,
                got: header.kind(),
            };
            debug!(hash = %hash.short(), error = %e, "ignoring received header");
            return;
        }

        trace!(nonce = header.nonce(), hash = %hash.short(), "received header");
        if let Err(e) = self
            .fork_detector
            .add_header(&header, hash, BlockHeaderState::Received)
        {
            info!(nonce = header.nonce(), error = %e, "fork detector rejected header");
        }

        let mut requested = self.requested_hash.lock();
        if *requested == Some(hash) {
            *requested = None;
            drop(requested);
            self.hash_received.pulse();
        }
    }

    fn on_header_nonce_received(&self, nonce: u64, shard: ShardId, _hash: H256) {
        if shard != self.shard_id {
            return;
        }

        let mut requested = self.requested_nonce.lock();
        if *requested == Some(nonce) {
            *requested = None;
            drop(requested);
            self.nonce_received.pulse();
        }
    }
}
