//! Integration tests for shard chain synchronization.

mod common;

use common::*;
use meridian_core::{ChainHandler, MiniBlocksPool};
use meridian_sync::SyncError;
use meridian_types::{Header, MiniBlock, H256, METACHAIN_SHARD_ID};

fn with_meta_refs(header: Header, meta_hashes: Vec<H256>) -> Header {
    let Header::Shard(mut shard) = header else {
        unreachable!()
    };
    shard.meta_block_hashes = meta_hashes;
    Header::Shard(shard)
}

#[tokio::test]
async fn test_body_fetched_from_network() {
    let h = Harness::shard();
    let mbs = vec![mini_block(1), mini_block(2)];
    let header = shard_header(1, h.genesis.hash(), &mbs);
    h.fork_detector.set_probable(1);
    h.header_requester.serve(header.clone());
    for mb in &mbs {
        h.mini_block_requester.serve(mb.clone());
    }
    let bootstrapper = h.build();

    bootstrapper.sync_block().await.unwrap();

    assert_eq!(h.head_nonce(), 1);
    assert_eq!(
        *h.mini_block_requester.requested.lock(),
        vec![mini_block_header_hashes(&header)]
    );
    for mb in &mbs {
        assert_eq!(h.store.mini_block(&mb.hash()).unwrap().as_ref(), Some(mb));
    }
    assert_eq!(h.chain.current_body().unwrap().mini_blocks, mbs);
}

#[tokio::test]
async fn test_only_missing_mini_blocks_are_requested() {
    let h = Harness::shard();
    let pooled = mini_block(1);
    let missing = mini_block(2);
    let header = shard_header(1, h.genesis.hash(), &[pooled.clone(), missing.clone()]);
    h.fork_detector.set_probable(1);
    h.header_requester.serve(header);
    h.mini_blocks.insert(pooled.hash(), pooled);
    h.mini_block_requester.serve(missing.clone());
    let bootstrapper = h.build();

    bootstrapper.sync_block().await.unwrap();

    assert_eq!(*h.mini_block_requester.requested.lock(), vec![vec![missing.hash()]]);
}

#[tokio::test]
async fn test_stored_mini_blocks_are_not_requested() {
    let h = Harness::shard();
    let stored = mini_block(3);
    h.store.put_mini_block(&stored).unwrap();
    let header = shard_header(1, h.genesis.hash(), &[stored]);
    h.fork_detector.set_probable(1);
    h.header_requester.serve(header);
    let bootstrapper = h.build();

    bootstrapper.sync_block().await.unwrap();

    assert_eq!(h.head_nonce(), 1);
    assert!(h.mini_block_requester.requested.lock().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_missing_mini_blocks_time_out() {
    let h = Harness::shard();
    let header = shard_header(1, h.genesis.hash(), &[mini_block(1)]);
    h.fork_detector.set_probable(1);
    h.header_requester.serve(header);
    let bootstrapper = h.build();

    let err = bootstrapper.sync_block().await.unwrap_err();

    assert!(matches!(err, SyncError::TimeIsOut));
    assert_eq!(bootstrapper.requests_with_timeout(), 1);
    assert!(h.chain.current_header().is_none());
    assert!(h.block_processor.processed.lock().is_empty());
}

#[tokio::test]
async fn test_rollback_returns_mini_blocks_to_executor() {
    let h = Harness::shard();
    let first: MiniBlock = mini_block(1);
    let second: MiniBlock = mini_block(2);
    let header1 = shard_header(1, h.genesis.hash(), &[first.clone()]);
    let header2 = shard_header(2, header1.hash(), &[second.clone()]);

    h.store.put_mini_block(&first).unwrap();
    h.mini_blocks.insert(second.hash(), second.clone());
    h.commit_chain(&[h.genesis.clone(), header1.clone(), header2]);
    let bootstrapper = h.build();

    bootstrapper.fork_choice().run(false, 0).unwrap();

    assert_eq!(h.head_nonce(), 1);
    assert_eq!(h.chain.current_header_hash(), Some(header1.hash()));
    assert_eq!(h.chain.current_body().unwrap().mini_blocks, vec![first]);
    assert_eq!(*h.block_processor.restored.lock(), vec![(2, 1)]);
    assert!(h.mini_blocks.get(&second.hash()).is_none());
}

#[test]
fn test_storage_bootstrap_registers_metachain_notarization() {
    let h = Harness::shard();

    let metas = meta_chain(2);
    for meta in &metas[1..] {
        h.store.put_header(METACHAIN_SHARD_ID, meta).unwrap();
    }

    let mut chain = shard_chain(3);
    chain[2] = with_meta_refs(chain[2].clone(), vec![metas[2].hash(), metas[1].hash()]);
    let prev = chain[2].hash();
    chain[3] = shard_header(3, prev, &[]);
    h.store_headers(&chain);
    let bootstrapper = h.build();

    assert_eq!(bootstrapper.sync_from_storage().unwrap(), 3);

    assert_eq!(*h.block_processor.notarized.lock(), vec![(METACHAIN_SHARD_ID, 2)]);
}

#[test]
fn test_storage_bootstrap_needs_stored_bodies() {
    let h = Harness::shard();
    let mut chain = shard_chain(2);
    // body of block 3 never reached storage
    chain.push(shard_header(3, chain[2].hash(), &[mini_block(7)]));
    h.store_headers(&chain);
    let bootstrapper = h.build();

    assert_eq!(bootstrapper.sync_from_storage().unwrap(), 2);

    assert_eq!(h.head_nonce(), 2);
    assert_eq!(h.store.highest_nonce(0), 2);
    assert!(h.block_processor.notarized.lock().is_empty());
}
