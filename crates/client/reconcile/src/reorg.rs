//! Reorg detection and rollback.
//!
//! The rollback ledger records the hash of every committed block. A reorg
//! shows up as the chain reporting a different hash for a height vigil
//! already committed; the resolver walks the recorded chain down to the
//! last height both sides agree on, replays the stored rollback mutations
//! for everything above it and drops the watermark so the scheduler can
//! re-index the canonical blocks.

use crate::error::ReconcileError;
use std::sync::Arc;
use vc_chain::ChainProvider;
use vc_db::VigilBackend;

pub struct ReorgResolver {
    backend: Arc<VigilBackend>,
    provider: Arc<dyn ChainProvider>,
}

impl ReorgResolver {
    pub fn new(backend: Arc<VigilBackend>, provider: Arc<dyn ChainProvider>) -> Self {
        Self { backend, provider }
    }

    /// Checks whether the block at the watermark is still canonical and, if
    /// not, finds the fork point: the highest height whose recorded hash
    /// the chain still reports. Returns `None` when there is nothing to
    /// undo.
    pub async fn detect(&self) -> Result<Option<u64>, ReconcileError> {
        let Some(watermark) = self.backend.watermark()? else { return Ok(None) };

        match self.backend.rollback_record(watermark)? {
            Some(record) => {
                if self.provider.block_hash(watermark).await? == Some(record.block_hash) {
                    return Ok(None);
                }
                tracing::warn!(
                    "Reorg detected: block {watermark} recorded as {:#x} is no longer canonical",
                    record.block_hash
                );
            }
            None => {
                // Only an interrupted rollback leaves the watermark without
                // its ledger record; resume from the highest retained one.
                if self.backend.oldest_rollback_block()?.is_none() {
                    return Ok(None);
                }
                tracing::warn!("No ledger record at watermark {watermark}, resuming an interrupted rollback");
            }
        }

        self.find_fork_point(watermark).await.map(Some)
    }

    /// Descending scan over the retained ledger, comparing each recorded
    /// hash against the chain. The ledger is pruned to roughly
    /// `finality_depth` records, which bounds the walk.
    async fn find_fork_point(&self, watermark: u64) -> Result<u64, ReconcileError> {
        let oldest_retained = self.backend.oldest_rollback_block()?.unwrap_or(watermark);
        let depth = watermark.saturating_sub(oldest_retained) as usize + 1;

        for record in self.backend.latest_rollback_records(depth)? {
            if self.provider.block_hash(record.block_number).await? == Some(record.block_hash) {
                return Ok(record.block_number);
            }
        }

        Err(ReconcileError::ForkBeyondLedger { oldest_retained })
    }

    /// Undoes every block above `fork_point` (highest first), consuming its
    /// ledger record, then drops the watermark to `fork_point`. `fork_point`
    /// comes from [`Self::detect`] and sits strictly below the watermark.
    ///
    /// Rollback mutations are set-to-value, so a crash anywhere in the walk
    /// is recovered by running detection again: already-undone blocks have
    /// no record left and are skipped with a warning.
    pub async fn resolve(&self, fork_point: u64) -> Result<(), ReconcileError> {
        let Some(watermark) = self.backend.watermark()? else { return Ok(()) };

        for block_number in (fork_point + 1..=watermark).rev() {
            let Some(record) = self.backend.rollback_record(block_number)? else {
                tracing::warn!("No rollback record for block {block_number}, skipping");
                continue;
            };
            for mutation in &record.rollback_mutations {
                self.backend
                    .apply_mutation(mutation)
                    .map_err(|e| ReconcileError::RollbackFailed { block_number, source: Box::new(e) })?;
            }
            self.backend
                .delete_rollback_record(block_number)
                .map_err(|e| ReconcileError::RollbackFailed { block_number, source: Box::new(e) })?;
            tracing::debug!("Rolled back block {block_number}, {} mutations", record.rollback_mutations.len());
        }

        self.backend.compare_and_set_watermark(Some(watermark), fork_point)?;
        tracing::info!("Rolled back to block {fork_point}, replaying the canonical chain");
        Ok(())
    }
}
