//! Integration tests for catching up from local storage.

mod common;

use common::*;
use meridian_core::{BlockHeaderState, ChainHandler};
use meridian_storage::{DatabaseConfig, RocksDbStorage};
use meridian_sync::{HeaderStore, SyncError};
use meridian_types::{Header, H256, METACHAIN_SHARD_ID};
use std::sync::Arc;
use tempfile::TempDir;

fn meta_with_round(nonce: u64, prev_hash: H256, round: u64) -> Header {
    let Header::Meta(mut meta) = meta_header(nonce, prev_hash) else {
        unreachable!()
    };
    meta.round = round;
    Header::Meta(meta)
}

#[test]
fn test_loads_highest_stored_window() {
    let chain = meta_chain(5);
    let h = Harness::meta();
    h.store_headers(&chain);
    let bootstrapper = h.build();

    assert_eq!(bootstrapper.sync_from_storage().unwrap(), 5);

    assert_eq!(h.head_nonce(), 5);
    assert_eq!(h.chain.current_header_hash(), Some(chain[5].hash()));
    assert_eq!(h.accounts_root(), chain[5].root_hash());
    assert_eq!(h.fork_detector.added_with(BlockHeaderState::Processed), vec![4, 5]);
}

#[test]
fn test_skips_block_from_future_round() {
    let mut chain = meta_chain(4);
    let future = meta_with_round(5, chain[4].hash(), 5_000);
    chain.push(future);
    let h = Harness::meta();
    h.store_headers(&chain);
    let bootstrapper = h.build();

    assert_eq!(bootstrapper.sync_from_storage().unwrap(), 4);

    assert_eq!(h.head_nonce(), 4);
    assert_eq!(h.store.highest_nonce(METACHAIN_SHARD_ID), 4);
}

#[test]
fn test_walks_down_past_unloadable_block() {
    let chain = meta_chain(5);
    let h = Harness::meta();
    h.store_headers(&chain[..5]);
    // root of block 5 is unknown to the account state
    h.store.put_header(METACHAIN_SHARD_ID, &chain[5]).unwrap();
    let bootstrapper = h.build();

    assert_eq!(bootstrapper.sync_from_storage().unwrap(), 4);

    assert_eq!(h.head_nonce(), 4);
    assert_eq!(h.accounts_root(), chain[4].root_hash());
    assert!(h.store.hash_by_nonce(METACHAIN_SHARD_ID, 5).is_err());
}

#[test]
fn test_too_few_blocks_restores_genesis() {
    let chain = meta_chain(1);
    let h = Harness::meta();
    h.store_headers(&chain);
    let bootstrapper = h.build();

    let err = bootstrapper.sync_from_storage().unwrap_err();

    assert!(matches!(err, SyncError::NotEnoughValidBlocksInStorage { highest: 1 }));
    assert!(h.chain.current_header().is_none());
    assert_eq!(h.accounts_root(), h.genesis.root_hash());
}

#[test]
fn test_empty_storage() {
    let h = Harness::meta();
    let bootstrapper = h.build();

    assert!(matches!(
        bootstrapper.sync_from_storage(),
        Err(SyncError::NotEnoughValidBlocksInStorage { highest: 0 })
    ));
}

#[test]
fn test_meta_registers_notarized_shard_headers() {
    let h = Harness::meta();

    let shard_headers = shard_chain(4);
    for header in &shard_headers[1..] {
        h.store.put_header(0, header).unwrap();
    }

    let mut chain = vec![meta_header(0, H256::NIL)];
    for nonce in 1..=3u64 {
        let prev = chain[nonce as usize - 1].hash();
        let notarized = [(0, shard_headers[nonce as usize].hash())];
        chain.push(notarizing_meta_header(nonce, prev, &notarized));
    }
    h.store_headers(&chain);
    let bootstrapper = h.build();

    assert_eq!(bootstrapper.sync_from_storage().unwrap(), 3);

    // final first, then last; shard 1 was never notarized
    assert_eq!(*h.block_processor.notarized.lock(), vec![(0, 2), (0, 3)]);
    // shard 0 header above the last notarized one is dropped
    assert_eq!(h.store.highest_nonce(0), 3);
}

#[test]
fn test_meta_bootstrap_over_rocksdb() {
    let temp_dir = TempDir::new().unwrap();
    let storage = Arc::new(
        RocksDbStorage::open(DatabaseConfig {
            path: temp_dir.path().to_string_lossy().to_string(),
            num_shards: NUM_SHARDS,
            ..Default::default()
        })
        .unwrap(),
    );
    let store = HeaderStore::new(storage.clone());

    let chain = meta_chain(3);
    let h = Harness::meta();
    for header in &chain[1..] {
        store.put_header(METACHAIN_SHARD_ID, header).unwrap();
        h.accounts.add_root(header.root_hash());
    }

    let bootstrapper = h.builder().storage(storage).build_meta().unwrap();

    assert_eq!(bootstrapper.sync_from_storage().unwrap(), 3);
    assert_eq!(h.chain.current_header_hash(), Some(chain[3].hash()));
    assert_eq!(store.highest_nonce(METACHAIN_SHARD_ID), 3);
}
