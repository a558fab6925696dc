//! Reconciliation watermark.
//!
//! The watermark is the height of the last fully committed block. It only
//! ever moves through compare-and-set so a second writer racing the
//! scheduler surfaces as [`StorageError::WatermarkConflict`] instead of a
//! silently corrupted cursor.

use crate::{Column, DatabaseExt, StorageError, VigilBackend, WriteBatchWithTransaction};
use std::sync::MutexGuard;

pub const RECONCILE_WATERMARK: &[u8] = b"RECONCILE_WATERMARK";

impl VigilBackend {
    pub fn watermark(&self) -> Result<Option<u64>, StorageError> {
        let meta_cf = self.db.get_column(Column::Meta);
        let Some(data) = self.db.get_pinned_cf(&meta_cf, RECONCILE_WATERMARK)? else { return Ok(None) };
        Ok(Some(u64::from_be_bytes(
            data[..].try_into().map_err(|_| StorageError::InconsistentStorage("Malformated watermark".into()))?,
        )))
    }

    /// Moves the watermark from `expected` to `next`. The read, check and
    /// write run under the backend's watermark lock, so no interleaved
    /// writer can slip between them.
    pub fn compare_and_set_watermark(&self, expected: Option<u64>, next: u64) -> Result<(), StorageError> {
        let _guard = self.watermark_guard()?;
        self.check_watermark(expected)?;
        let meta_cf = self.db.get_column(Column::Meta);
        self.db.put_cf_opt(&meta_cf, RECONCILE_WATERMARK, next.to_be_bytes(), &self.writeopts)?;
        Ok(())
    }

    /// In-batch variant: `expected` is validated now, the write itself
    /// lands with the batch commit.
    pub fn compare_and_set_watermark_with_batch(
        &self,
        batch: &mut WriteBatchWithTransaction,
        expected: Option<u64>,
        next: u64,
    ) -> Result<(), StorageError> {
        let _guard = self.watermark_guard()?;
        self.check_watermark(expected)?;
        let meta_cf = self.db.get_column(Column::Meta);
        batch.put_cf(&meta_cf, RECONCILE_WATERMARK, next.to_be_bytes());
        Ok(())
    }

    fn check_watermark(&self, expected: Option<u64>) -> Result<(), StorageError> {
        let found = self.watermark()?;
        if found != expected {
            return Err(StorageError::WatermarkConflict { expected, found });
        }
        Ok(())
    }

    fn watermark_guard(&self) -> Result<MutexGuard<'_, ()>, StorageError> {
        self.watermark_lock.lock().map_err(|_| StorageError::InconsistentStorage("watermark lock poisoned".into()))
    }
}
