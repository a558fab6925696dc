//! Vigil database backend.
//!
//! One rocksdb instance, five column families: the group read model, the
//! per-block rollback ledger, transaction records, the watched transaction
//! set and a meta column holding the reconciliation watermark. All writes
//! keep the WAL enabled so a half-written block batch cannot survive a
//! crash, and per-block writes are staged through a single
//! [`WriteBatchWithTransaction`] so they land atomically.

use anyhow::Context;
use rocksdb::{BoundColumnFamily, ColumnFamilyDescriptor, DBWithThreadMode, FlushOptions, MultiThreaded, WriteOptions};
use rocksdb_options::rocksdb_global_options;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

mod error;
mod rocksdb_options;

pub mod group_db;
pub mod ledger_db;
pub mod meta_db;
pub mod tx_db;

pub use error::StorageError;
pub use group_db::GroupChanges;
pub type DB = DBWithThreadMode<MultiThreaded>;
pub use rocksdb;
pub type WriteBatchWithTransaction = rocksdb::WriteBatchWithTransaction<false>;

pub fn open_rocksdb(path: &Path) -> anyhow::Result<Arc<DB>> {
    let opts = rocksdb_global_options()?;
    tracing::debug!("opening db at {:?}", path.display());
    let db = DB::open_cf_descriptors(
        &opts,
        path,
        Column::ALL.iter().map(|col| ColumnFamilyDescriptor::new(col.rocksdb_name(), col.rocksdb_options())),
    )?;

    Ok(Arc::new(db))
}

#[derive(Clone, Copy, PartialEq, Eq)]
pub enum Column {
    /// group_id => GroupRow
    Groups,
    /// block_n => BlockRollbackRecord
    RollbackLedger,
    /// tx_hash => TxRecord
    TxRecords,
    /// tx_hash => (), membership set drained by the receipt watcher
    WatchedTxs,
    /// Meta column (reconciliation watermark)
    Meta,
}

impl fmt::Debug for Column {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.rocksdb_name())
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.rocksdb_name())
    }
}

impl Column {
    pub const ALL: &'static [Self] = {
        use Column::*;
        &[Groups, RollbackLedger, TxRecords, WatchedTxs, Meta]
    };
    pub const NUM_COLUMNS: usize = Self::ALL.len();

    pub(crate) fn rocksdb_name(&self) -> &'static str {
        use Column::*;
        match self {
            Groups => "groups",
            RollbackLedger => "rollback_ledger",
            TxRecords => "tx_records",
            WatchedTxs => "watched_txs",
            Meta => "meta",
        }
    }
}

#[cfg(test)]
#[test]
fn test_column_all() {
    assert_eq!(Column::ALL.len(), Column::NUM_COLUMNS);
}

pub trait DatabaseExt {
    fn get_column(&self, col: Column) -> Arc<BoundColumnFamily<'_>>;
}

impl DatabaseExt for DB {
    fn get_column(&self, col: Column) -> Arc<BoundColumnFamily<'_>> {
        let name = col.rocksdb_name();
        match self.cf_handle(name) {
            Some(column) => column,
            None => panic!("column {name} not initialized"),
        }
    }
}

fn make_writeopts() -> WriteOptions {
    // Keep the WAL: the watermark and block batches must survive a crash.
    let mut opts = WriteOptions::new();
    opts.disable_wal(false);
    opts
}

#[derive(Debug, Clone)]
pub struct VigilBackendConfig {
    pub base_path: PathBuf,
}

/// Vigil client database backend singleton.
pub struct VigilBackend {
    db: Arc<DB>,
    /// Serializes the watermark read-check-write sequence.
    watermark_lock: Mutex<()>,
    writeopts: WriteOptions,
    #[cfg(any(test, feature = "testing"))]
    _temp_dir: Option<tempfile::TempDir>,
}

impl fmt::Debug for VigilBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VigilBackend").field("db", &self.db).finish()
    }
}

impl Drop for VigilBackend {
    fn drop(&mut self) {
        tracing::info!("⏳ Gracefully closing the database...");
        self.flush().expect("Error when flushing the database");
    }
}

impl VigilBackend {
    #[cfg(any(test, feature = "testing"))]
    pub fn open_for_testing() -> Arc<VigilBackend> {
        let temp_dir = tempfile::TempDir::with_prefix("vigil-test").unwrap();
        let db = open_rocksdb(temp_dir.as_ref()).unwrap();
        Arc::new(Self {
            db,
            watermark_lock: Mutex::new(()),
            writeopts: make_writeopts(),
            _temp_dir: Some(temp_dir),
        })
    }

    /// Open the db.
    pub fn open(config: &VigilBackendConfig) -> anyhow::Result<Arc<VigilBackend>> {
        let db_path = config.base_path.join("db");
        let db = open_rocksdb(&db_path).with_context(|| format!("Opening database at {:?}", db_path.display()))?;

        Ok(Arc::new(Self {
            db,
            watermark_lock: Mutex::new(()),
            writeopts: make_writeopts(),
            #[cfg(any(test, feature = "testing"))]
            _temp_dir: None,
        }))
    }

    /// Write a fully staged batch in one rocksdb write.
    pub fn write_batch(&self, batch: WriteBatchWithTransaction) -> Result<(), StorageError> {
        self.db.write_opt(batch, &self.writeopts)?;
        Ok(())
    }

    pub fn flush(&self) -> anyhow::Result<()> {
        tracing::debug!("doing a db flush");
        let mut opts = FlushOptions::default();
        opts.set_wait(true);
        // we have to collect twice here :/
        let columns = Column::ALL.iter().map(|e| self.db.get_column(*e)).collect::<Vec<_>>();
        let columns = columns.iter().collect::<Vec<_>>();

        self.db.flush_cfs_opt(&columns, &opts).context("Flushing database")?;

        Ok(())
    }
}
