//! Typed access to headers and mini blocks in the storage units.
//!
//! Shard headers live in [`UnitType::BlockHeader`] and are indexed per shard
//! by [`UnitType::ShardHdrNonceHash`]. Metachain headers live in
//! [`UnitType::MetaBlock`] and are indexed by [`UnitType::MetaHdrNonceHash`].

use crate::error::{SyncError, SyncResult};
use meridian_core::{nonce_to_bytes, StorageService, UnitType};
use meridian_types::{ChainKind, Header, MiniBlock, ShardId, H256, METACHAIN_SHARD_ID};
use std::sync::Arc;
use tracing::debug;

/// Header and mini block store over a [`StorageService`].
#[derive(Clone)]
pub struct HeaderStore {
    storage: Arc<dyn StorageService>,
}

fn kind_of(shard: ShardId) -> ChainKind {
    if shard == METACHAIN_SHARD_ID {
        ChainKind::Meta
    } else {
        ChainKind::Shard
    }
}

impl HeaderStore {
    /// Wrap a storage service.
    pub fn new(storage: Arc<dyn StorageService>) -> Self {
        Self { storage }
    }

    /// Unit holding headers of `shard`.
    pub fn header_unit(shard: ShardId) -> UnitType {
        match kind_of(shard) {
            ChainKind::Meta => UnitType::MetaBlock,
            ChainKind::Shard => UnitType::BlockHeader,
        }
    }

    /// Unit holding the nonce index of `shard`.
    pub fn nonce_unit(shard: ShardId) -> UnitType {
        match kind_of(shard) {
            ChainKind::Meta => UnitType::MetaHdrNonceHash,
            ChainKind::Shard => UnitType::ShardHdrNonceHash(shard),
        }
    }

    /// Fails with `MissingStorageUnit` for the first unit the service lacks.
    pub fn require_units(&self, units: &[UnitType]) -> SyncResult<()> {
        match units.iter().find(|unit| self.storage.storer(**unit).is_none()) {
            Some(unit) => Err(SyncError::MissingStorageUnit(*unit)),
            None => Ok(()),
        }
    }

    /// Header of `shard` with `hash`.
    pub fn header_by_hash(&self, shard: ShardId, hash: &H256) -> SyncResult<Header> {
        let bytes = self
            .storage
            .get(Self::header_unit(shard), hash.as_bytes())?
            .ok_or(SyncError::HeaderHashNotFound(*hash))?;
        let header = Header::decode_bytes(&bytes)?;
        let expected = kind_of(shard);
        if header.kind() != expected {
            return Err(SyncError::WrongHeaderType {
                expected,
                got: header.kind(),
            });
        }
        Ok(header)
    }

    /// Hash of the header of `shard` with `nonce`.
    pub fn hash_by_nonce(&self, shard: ShardId, nonce: u64) -> SyncResult<H256> {
        let bytes = self
            .storage
            .get(Self::nonce_unit(shard), &nonce_to_bytes(nonce))?
            .ok_or(SyncError::HeaderNotFound { nonce })?;
        Ok(H256::from_slice(&bytes)?)
    }

    /// Header of `shard` with `nonce`, with its hash.
    pub fn header_by_nonce(&self, shard: ShardId, nonce: u64) -> SyncResult<(Header, H256)> {
        let hash = self.hash_by_nonce(shard, nonce)?;
        Ok((self.header_by_hash(shard, &hash)?, hash))
    }

    /// Number of consecutive nonces stored for `shard`, counting from 1.
    pub fn highest_nonce(&self, shard: ShardId) -> u64 {
        let unit = Self::nonce_unit(shard);
        let mut nonce = 0;
        while matches!(self.storage.get(unit, &nonce_to_bytes(nonce + 1)), Ok(Some(_))) {
            nonce += 1;
        }
        nonce
    }

    /// Store a header of `shard` and index it by nonce. Returns its hash.
    pub fn put_header(&self, shard: ShardId, header: &Header) -> SyncResult<H256> {
        let hash = header.hash();
        self.storage.put(
            Self::header_unit(shard),
            hash.as_bytes(),
            &header.encode_bytes(),
        )?;
        self.storage.put(
            Self::nonce_unit(shard),
            &nonce_to_bytes(header.nonce()),
            hash.as_bytes(),
        )?;
        Ok(hash)
    }

    /// Drop the nonce index entry of `shard` for `nonce`.
    pub fn remove_nonce_entry(&self, shard: ShardId, nonce: u64) -> SyncResult<()> {
        self.storage
            .remove(Self::nonce_unit(shard), &nonce_to_bytes(nonce))?;
        Ok(())
    }

    /// Drop the header of `shard` with `nonce` and its index entry.
    pub fn remove_header(&self, shard: ShardId, nonce: u64) -> SyncResult<()> {
        let hash = self.hash_by_nonce(shard, nonce)?;
        self.storage
            .remove(Self::header_unit(shard), hash.as_bytes())?;
        self.remove_nonce_entry(shard, nonce)?;
        debug!(shard, nonce, hash = %hash.short(), "header removed from storage");
        Ok(())
    }

    /// Mini block with `hash`, if stored.
    pub fn mini_block(&self, hash: &H256) -> SyncResult<Option<MiniBlock>> {
        match self.storage.get(UnitType::MiniBlock, hash.as_bytes())? {
            Some(bytes) => Ok(Some(MiniBlock::decode_bytes(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Store a mini block under its hash.
    pub fn put_mini_block(&self, mini_block: &MiniBlock) -> SyncResult<H256> {
        let hash = mini_block.hash();
        self.storage
            .put(UnitType::MiniBlock, hash.as_bytes(), &mini_block.encode_bytes())?;
        Ok(hash)
    }

    /// Drop the mini block with `hash`.
    pub fn remove_mini_block(&self, hash: &H256) -> SyncResult<()> {
        self.storage.remove(UnitType::MiniBlock, hash.as_bytes())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use meridian_core::{StorageResult, Storer};
    use meridian_types::MetaHeader;
    use parking_lot::RwLock;
    use std::collections::HashMap;

    #[derive(Default)]
    struct MapStorer(RwLock<HashMap<Vec<u8>, Vec<u8>>>);

    impl Storer for MapStorer {
        fn get(&self, key: &[u8]) -> StorageResult<Option<Vec<u8>>> {
            Ok(self.0.read().get(key).cloned())
        }
        fn put(&self, key: &[u8], value: &[u8]) -> StorageResult<()> {
            self.0.write().insert(key.to_vec(), value.to_vec());
            Ok(())
        }
        fn remove(&self, key: &[u8]) -> StorageResult<()> {
            self.0.write().remove(key);
            Ok(())
        }
    }

    struct Units(HashMap<UnitType, Arc<dyn Storer>>);

    impl StorageService for Units {
        fn storer(&self, unit: UnitType) -> Option<Arc<dyn Storer>> {
            self.0.get(&unit).cloned()
        }
    }

    fn store() -> HeaderStore {
        let units = UnitType::all(1)
            .into_iter()
            .map(|u| (u, Arc::new(MapStorer::default()) as Arc<dyn Storer>))
            .collect();
        HeaderStore::new(Arc::new(Units(units)))
    }

    fn meta(nonce: u64) -> Header {
        Header::Meta(MetaHeader {
            nonce,
            round: nonce,
            epoch: 0,
            timestamp: 0,
            prev_hash: H256::NIL,
            root_hash: H256::NIL,
            shard_info: vec![],
        })
    }

    #[test]
    fn test_highest_nonce_stops_at_gap() {
        let store = store();
        for nonce in [1, 2, 3, 5] {
            store.put_header(METACHAIN_SHARD_ID, &meta(nonce)).unwrap();
        }
        assert_eq!(store.highest_nonce(METACHAIN_SHARD_ID), 3);
        assert_eq!(store.highest_nonce(0), 0);
    }

    #[test]
    fn test_wrong_kind_in_unit() {
        let store = store();
        let header = meta(1);
        let hash = header.hash();
        store
            .storage
            .put(UnitType::BlockHeader, hash.as_bytes(), &header.encode_bytes())
            .unwrap();
        assert!(matches!(
            store.header_by_hash(0, &hash),
            Err(SyncError::WrongHeaderType {
                expected: ChainKind::Shard,
                got: ChainKind::Meta
            })
        ));
    }

    #[test]
    fn test_remove_header() {
        let store = store();
        store.put_header(METACHAIN_SHARD_ID, &meta(1)).unwrap();
        store.remove_header(METACHAIN_SHARD_ID, 1).unwrap();
        assert!(matches!(
            store.header_by_nonce(METACHAIN_SHARD_ID, 1),
            Err(SyncError::HeaderNotFound { nonce: 1 })
        ));
    }

    #[test]
    fn test_require_units() {
        let store = HeaderStore::new(Arc::new(Units(HashMap::new())));
        assert!(matches!(
            store.require_units(&[UnitType::MetaBlock]),
            Err(SyncError::MissingStorageUnit(UnitType::MetaBlock))
        ));
    }
}
