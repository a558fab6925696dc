//! Rollback ledger.
//!
//! One record per committed block, keyed by big-endian block number so the
//! column iterates in height order. A record's mutations are stored in
//! reverse application order; applying them front to back undoes the block.

use crate::{Column, DatabaseExt, StorageError, VigilBackend, WriteBatchWithTransaction};
use vp_types::BlockRollbackRecord;

fn ledger_key_block(key: &[u8]) -> Result<u64, StorageError> {
    Ok(u64::from_be_bytes(
        key.try_into().map_err(|_| StorageError::InconsistentStorage("Malformated ledger key".into()))?,
    ))
}

impl VigilBackend {
    pub fn rollback_record(&self, block_number: u64) -> Result<Option<BlockRollbackRecord>, StorageError> {
        let ledger_cf = self.db.get_column(Column::RollbackLedger);
        let Some(res) = self.db.get_pinned_cf(&ledger_cf, block_number.to_be_bytes())? else { return Ok(None) };
        Ok(Some(bincode::deserialize(&res)?))
    }

    /// Staged into the block's batch so the record and the forward writes
    /// it undoes commit together.
    pub fn put_rollback_record(
        &self,
        batch: &mut WriteBatchWithTransaction,
        record: &BlockRollbackRecord,
    ) -> Result<(), StorageError> {
        let ledger_cf = self.db.get_column(Column::RollbackLedger);
        batch.put_cf(&ledger_cf, record.block_number.to_be_bytes(), bincode::serialize(record)?);
        Ok(())
    }

    /// If the record does not exist, this does nothing.
    pub fn delete_rollback_record(&self, block_number: u64) -> Result<(), StorageError> {
        let ledger_cf = self.db.get_column(Column::RollbackLedger);
        self.db.delete_cf_opt(&ledger_cf, block_number.to_be_bytes(), &self.writeopts)?;
        Ok(())
    }

    /// Drops every record strictly below `block_number`, returning how many
    /// were removed. Run after commits for heights the chain can no longer
    /// reorg.
    pub fn prune_rollback_records_below(&self, block_number: u64) -> Result<u64, StorageError> {
        let ledger_cf = self.db.get_column(Column::RollbackLedger);
        let mut batch = WriteBatchWithTransaction::default();
        let mut removed = 0u64;

        for res in self.db.iterator_cf(&ledger_cf, rocksdb::IteratorMode::Start) {
            let (key, _) = res?;
            if ledger_key_block(&key)? >= block_number {
                break;
            }
            batch.delete_cf(&ledger_cf, key);
            removed += 1;
        }

        if removed > 0 {
            self.db.write_opt(batch, &self.writeopts)?;
        }
        Ok(removed)
    }

    /// Most recent records first.
    pub fn latest_rollback_records(&self, limit: usize) -> Result<Vec<BlockRollbackRecord>, StorageError> {
        let ledger_cf = self.db.get_column(Column::RollbackLedger);
        let mut records = Vec::with_capacity(limit);
        for res in self.db.iterator_cf(&ledger_cf, rocksdb::IteratorMode::End).take(limit) {
            let (_, value) = res?;
            records.push(bincode::deserialize(&value)?);
        }
        Ok(records)
    }

    /// Height of the oldest retained record, the reorg depth limit.
    pub fn oldest_rollback_block(&self) -> Result<Option<u64>, StorageError> {
        let ledger_cf = self.db.get_column(Column::RollbackLedger);
        match self.db.iterator_cf(&ledger_cf, rocksdb::IteratorMode::Start).next() {
            Some(res) => Ok(Some(ledger_key_block(&res?.0)?)),
            None => Ok(None),
        }
    }
}
