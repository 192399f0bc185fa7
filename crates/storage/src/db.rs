//! RocksDB backed storage units
//!
//! Every [`UnitType`] maps to its own column family. [`RocksDbStorage`]
//! exposes the units through the [`StorageService`] trait.

use meridian_core::{StorageError, StorageResult, StorageService, Storer, UnitType};
use parking_lot::RwLock;
use rocksdb::{
    BoundColumnFamily, ColumnFamilyDescriptor, DBWithThreadMode, MultiThreaded, Options, DB,
};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

/// Database configuration
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// Path to the database directory
    pub path: String,
    /// Number of shards; one nonce index column family is created per shard
    pub num_shards: u32,
    /// Enable compression (LZ4)
    pub enable_compression: bool,
    /// Maximum number of open files
    pub max_open_files: i32,
    /// Write buffer size in bytes
    pub write_buffer_size: usize,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: String::from("./data/meridian"),
            num_shards: 1,
            enable_compression: true,
            max_open_files: 512,
            write_buffer_size: 64 * 1024 * 1024, // 64 MB
        }
    }
}

fn db_err(e: rocksdb::Error) -> StorageError {
    StorageError::Io(e.to_string())
}

/// RocksDB wrapper with one column family per storage unit
pub struct Database {
    inner: DBWithThreadMode<MultiThreaded>,
    config: DatabaseConfig,
    units: Vec<UnitType>,
    /// Lock for coordinating writes
    write_lock: RwLock<()>,
}

impl Database {
    /// Open or create a database at the configured path
    pub fn open(config: DatabaseConfig) -> StorageResult<Self> {
        info!(path = %config.path, "Opening database");

        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);
        opts.set_max_open_files(config.max_open_files);
        opts.set_write_buffer_size(config.write_buffer_size);

        if config.enable_compression {
            opts.set_compression_type(rocksdb::DBCompressionType::Lz4);
        }

        let units = UnitType::all(config.num_shards);
        let cf_descriptors: Vec<ColumnFamilyDescriptor> = units
            .iter()
            .map(|unit| {
                let mut cf_opts = Options::default();
                if config.enable_compression {
                    cf_opts.set_compression_type(rocksdb::DBCompressionType::Lz4);
                }
                ColumnFamilyDescriptor::new(unit.name(), cf_opts)
            })
            .collect();

        let db = DB::open_cf_descriptors(&opts, Path::new(&config.path), cf_descriptors)
            .map_err(db_err)?;

        info!(
            column_families = units.len(),
            "Database opened successfully"
        );

        Ok(Self {
            inner: db,
            config,
            units,
            write_lock: RwLock::new(()),
        })
    }

    /// Open database with default configuration
    pub fn open_default<P: AsRef<Path>>(path: P, num_shards: u32) -> StorageResult<Self> {
        Self::open(DatabaseConfig {
            path: path.as_ref().to_string_lossy().to_string(),
            num_shards,
            ..Default::default()
        })
    }

    fn cf_handle(&self, unit: UnitType) -> StorageResult<Arc<BoundColumnFamily<'_>>> {
        self.inner
            .cf_handle(&unit.name())
            .ok_or(StorageError::UnitNotFound(unit))
    }

    /// Get a value from a unit
    pub fn get(&self, unit: UnitType, key: &[u8]) -> StorageResult<Option<Vec<u8>>> {
        let cf = self.cf_handle(unit)?;
        self.inner.get_cf(&cf, key).map_err(db_err)
    }

    /// Put a value into a unit
    pub fn put(&self, unit: UnitType, key: &[u8], value: &[u8]) -> StorageResult<()> {
        let cf = self.cf_handle(unit)?;
        let _guard = self.write_lock.write();
        self.inner.put_cf(&cf, key, value).map_err(db_err)
    }

    /// Delete a value from a unit
    pub fn delete(&self, unit: UnitType, key: &[u8]) -> StorageResult<()> {
        let cf = self.cf_handle(unit)?;
        let _guard = self.write_lock.write();
        self.inner.delete_cf(&cf, key).map_err(db_err)
    }

    /// Flush all memtables to disk
    pub fn flush_all(&self) -> StorageResult<()> {
        for unit in &self.units {
            let cf = self.cf_handle(*unit)?;
            self.inner.flush_cf(&cf).map_err(db_err)?;
        }
        Ok(())
    }

    /// Units this database was opened with
    pub fn units(&self) -> &[UnitType] {
        &self.units
    }

    /// Get the path to the database
    pub fn path(&self) -> &str {
        &self.config.path
    }
}

impl Drop for Database {
    fn drop(&mut self) {
        debug!(path = %self.config.path, "Closing database");
    }
}

/// A single column family viewed as a [`Storer`].
pub struct DbUnit {
    db: Arc<Database>,
    unit: UnitType,
}

impl Storer for DbUnit {
    fn get(&self, key: &[u8]) -> StorageResult<Option<Vec<u8>>> {
        self.db.get(self.unit, key)
    }

    fn put(&self, key: &[u8], value: &[u8]) -> StorageResult<()> {
        self.db.put(self.unit, key, value)
    }

    fn remove(&self, key: &[u8]) -> StorageResult<()> {
        self.db.delete(self.unit, key)
    }
}

/// [`StorageService`] over a shared [`Database`].
pub struct RocksDbStorage {
    db: Arc<Database>,
    units: HashMap<UnitType, Arc<dyn Storer>>,
}

impl RocksDbStorage {
    /// Wrap an open database.
    pub fn new(db: Database) -> Self {
        let db = Arc::new(db);
        let units = db
            .units()
            .iter()
            .map(|unit| {
                let storer: Arc<dyn Storer> = Arc::new(DbUnit {
                    db: Arc::clone(&db),
                    unit: *unit,
                });
                (*unit, storer)
            })
            .collect();
        Self { db, units }
    }

    /// Open a database and wrap it.
    pub fn open(config: DatabaseConfig) -> StorageResult<Self> {
        Ok(Self::new(Database::open(config)?))
    }

    /// Underlying database.
    pub fn database(&self) -> &Arc<Database> {
        &self.db
    }
}

impl StorageService for RocksDbStorage {
    fn storer(&self, unit: UnitType) -> Option<Arc<dyn Storer>> {
        self.units.get(&unit).cloned()
    }
}
