//! Transaction records and the watched set.
//!
//! `TxRecords` is written by the receipt watcher and read by the
//! confirmation poller. `WatchedTxs` is the set of broadcast hashes the
//! watcher still has to resolve.

use crate::{Column, DatabaseExt, StorageError, VigilBackend};
use alloy::primitives::B256;
use vp_types::TxRecord;

impl VigilBackend {
    pub fn tx_record(&self, transaction_hash: &B256) -> Result<Option<TxRecord>, StorageError> {
        let records_cf = self.db.get_column(Column::TxRecords);
        let Some(res) = self.db.get_pinned_cf(&records_cf, transaction_hash.as_slice())? else { return Ok(None) };
        Ok(Some(bincode::deserialize(&res)?))
    }

    pub fn put_tx_record(&self, record: &TxRecord) -> Result<(), StorageError> {
        let records_cf = self.db.get_column(Column::TxRecords);
        self.db.put_cf_opt(
            &records_cf,
            record.transaction_hash.as_slice(),
            bincode::serialize(record)?,
            &self.writeopts,
        )?;
        Ok(())
    }

    /// Register a broadcast hash for the receipt watcher to resolve.
    pub fn watch_tx(&self, transaction_hash: &B256) -> Result<(), StorageError> {
        let watched_cf = self.db.get_column(Column::WatchedTxs);
        self.db.put_cf_opt(&watched_cf, transaction_hash.as_slice(), [], &self.writeopts)?;
        Ok(())
    }

    pub fn unwatch_tx(&self, transaction_hash: &B256) -> Result<(), StorageError> {
        let watched_cf = self.db.get_column(Column::WatchedTxs);
        self.db.delete_cf_opt(&watched_cf, transaction_hash.as_slice(), &self.writeopts)?;
        Ok(())
    }

    pub fn watched_txs(&self) -> Result<Vec<B256>, StorageError> {
        let watched_cf = self.db.get_column(Column::WatchedTxs);
        let mut hashes = Vec::new();
        for res in self.db.iterator_cf(&watched_cf, rocksdb::IteratorMode::Start) {
            let (key, _) = res?;
            hashes.push(
                B256::try_from(&key[..])
                    .map_err(|_| StorageError::InconsistentStorage("Malformated watched tx hash".into()))?,
            );
        }
        Ok(hashes)
    }
}
