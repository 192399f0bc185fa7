//! In-memory storage units.

use meridian_core::{StorageResult, StorageService, Storer, UnitType};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// A [`Storer`] backed by a hash map.
#[derive(Debug, Default)]
pub struct MemoryStorer {
    data: RwLock<HashMap<Vec<u8>, Vec<u8>>>,
}

impl MemoryStorer {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys.
    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    /// Returns true if nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.data.read().is_empty()
    }
}

impl Storer for MemoryStorer {
    fn get(&self, key: &[u8]) -> StorageResult<Option<Vec<u8>>> {
        Ok(self.data.read().get(key).cloned())
    }

    fn put(&self, key: &[u8], value: &[u8]) -> StorageResult<()> {
        self.data.write().insert(key.to_vec(), value.to_vec());
        Ok(())
    }

    fn remove(&self, key: &[u8]) -> StorageResult<()> {
        self.data.write().remove(key);
        Ok(())
    }
}

/// A [`StorageService`] made of [`MemoryStorer`] units.
pub struct MemoryStorage {
    units: HashMap<UnitType, Arc<dyn Storer>>,
}

impl MemoryStorage {
    /// Every unit needed by a network of `num_shards` shards.
    pub fn new(num_shards: u32) -> Self {
        Self::with_units(UnitType::all(num_shards))
    }

    /// Only the given units.
    pub fn with_units(units: impl IntoIterator<Item = UnitType>) -> Self {
        let units = units
            .into_iter()
            .map(|unit| {
                let storer: Arc<dyn Storer> = Arc::new(MemoryStorer::new());
                (unit, storer)
            })
            .collect();
        Self { units }
    }
}

impl StorageService for MemoryStorage {
    fn storer(&self, unit: UnitType) -> Option<Arc<dyn Storer>> {
        self.units.get(&unit).cloned()
    }
}
