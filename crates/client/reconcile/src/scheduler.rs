//! Block-by-block reconciliation loop.
//!
//! One cycle fetches a bounded range of events, groups them per block and
//! commits each block atomically: forward mutations, the rollback record
//! and the watermark move in a single batch. Blocks are committed strictly
//! ascending, so block N is durable before N+1 converts, and a crash at any
//! point leaves the watermark pointing at the last fully committed block.

use crate::converter::ConverterRegistry;
use crate::error::ReconcileError;
use crate::reorg::ReorgResolver;
use alloy::primitives::B256;
use itertools::Itertools;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use vc_chain::ChainProvider;
use vc_db::{VigilBackend, WriteBatchWithTransaction};
use vp_types::{BlockRollbackRecord, ChainEvent};
use vp_utils::service::ServiceContext;

/// Tuning for the reconciliation loop. `start_block` and `finality_depth`
/// mirror the chain profile; the rest is operator tuning.
#[derive(Debug, Clone)]
pub struct ReconcileConfig {
    /// Delay between cycles.
    pub poll_interval: Duration,
    /// Upper bound on blocks committed per cycle.
    pub max_blocks_per_cycle: u64,
    /// First block to index on a fresh database.
    pub start_block: u64,
    /// Reorgs deeper than this are treated as impossible: ledger records
    /// this far below the watermark are pruned after each cycle.
    pub finality_depth: u64,
}

/// Commit progress of one block. A failure in any phase before `Committed`
/// leaves the watermark unadvanced and the block is reprocessed from
/// scratch on the next cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BlockPhase {
    Pending,
    Converting,
    Committing,
    Committed,
}

fn enter_phase(block_number: u64, phase: &mut BlockPhase, next: BlockPhase) {
    tracing::debug!("Block {block_number}: {:?} -> {next:?}", *phase);
    *phase = next;
}

/// Single writer advancing the read model along the chain.
///
/// Every tick first checks the recorded hash chain against the provider
/// and lets [`ReorgResolver`] undo orphaned blocks, then replays the
/// canonical chain forward through the converter registry.
pub struct ReconcileScheduler {
    backend: Arc<VigilBackend>,
    provider: Arc<dyn ChainProvider>,
    registry: ConverterRegistry,
    config: ReconcileConfig,
}

impl ReconcileScheduler {
    pub fn new(
        backend: Arc<VigilBackend>,
        provider: Arc<dyn ChainProvider>,
        registry: ConverterRegistry,
        config: ReconcileConfig,
    ) -> Self {
        Self { backend, provider, registry, config }
    }

    /// Service loop: detect reorgs, run a cycle, sleep, repeat until the
    /// context is cancelled. Recoverable errors are logged and retried on
    /// the next tick; anything else stops the service.
    pub async fn run(self, ctx: ServiceContext) -> Result<(), ReconcileError> {
        let resolver = ReorgResolver::new(Arc::clone(&self.backend), Arc::clone(&self.provider));

        let mut interval = tokio::time::interval(self.config.poll_interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        while ctx.run_until_cancelled(interval.tick()).await.is_some() {
            match self.tick(&ctx, &resolver).await {
                Ok(()) => {}
                Err(e) if e.is_recoverable() => {
                    tracing::warn!("Reconciliation tick failed, will retry: {e}");
                }
                Err(e) => return Err(e),
            }
        }

        tracing::debug!("Reconciliation loop stopped");
        Ok(())
    }

    async fn tick(&self, ctx: &ServiceContext, resolver: &ReorgResolver) -> Result<(), ReconcileError> {
        if let Some(fork_point) = resolver.detect().await? {
            resolver.resolve(fork_point).await?;
        }
        self.run_cycle(ctx).await
    }

    /// Fetches and commits the next batch of blocks, bounded by
    /// `max_blocks_per_cycle`. Blocks without events still commit an empty
    /// ledger record so the recorded hash chain stays contiguous.
    pub async fn run_cycle(&self, ctx: &ServiceContext) -> Result<(), ReconcileError> {
        let mut committed = self.backend.watermark()?;
        let start = match committed {
            Some(block_number) => block_number + 1,
            None => self.config.start_block,
        };

        let latest = self.provider.latest_block_number().await?;
        if latest < start {
            return Ok(());
        }
        let span = self.config.max_blocks_per_cycle.max(1);
        let to_block = latest.min(start.saturating_add(span - 1));

        let events = self.provider.fetch_events(start, to_block).await?;
        let event_count = events.len();

        // fetch_events orders by (block_number, log_index), so chunks come
        // out one per block, ascending.
        let by_block = events.into_iter().chunk_by(|event| event.block_number);
        let mut blocks = by_block.into_iter().peekable();

        for block_number in start..=to_block {
            if ctx.is_cancelled() {
                return Ok(());
            }

            let block_events: Vec<ChainEvent> = match blocks.next_if(|(number, _)| *number == block_number) {
                Some((_, chunk)) => chunk.collect(),
                None => Vec::new(),
            };
            let block_hash = match block_events.first() {
                Some(event) => event.block_hash,
                None => self
                    .provider
                    .block_hash(block_number)
                    .await?
                    .ok_or(ReconcileError::MissingBlockHash(block_number))?,
            };

            self.process_block(block_number, block_hash, &block_events, committed)?;
            committed = Some(block_number);
        }

        if let Some(tip) = committed {
            let cutoff = tip.saturating_sub(self.config.finality_depth);
            let pruned = self.backend.prune_rollback_records_below(cutoff)?;
            if pruned > 0 {
                tracing::debug!("Pruned {pruned} rollback records below block {cutoff}");
            }
        }

        tracing::debug!("Reconciled blocks {start}..={to_block}, {event_count} events");
        Ok(())
    }

    /// Converts and commits one block. Conversion touches nothing; the
    /// commit stages everything into one batch, so either the whole block
    /// lands (mutations, ledger record, watermark) or none of it does.
    fn process_block(
        &self,
        block_number: u64,
        block_hash: B256,
        events: &[ChainEvent],
        expected_watermark: Option<u64>,
    ) -> Result<(), ReconcileError> {
        let mut phase = BlockPhase::Pending;
        enter_phase(block_number, &mut phase, BlockPhase::Converting);

        let mut forwards = Vec::new();
        let mut rollbacks = VecDeque::new();
        for event in events {
            for pair in self.registry.convert(event, &self.backend)? {
                forwards.push(pair.forward);
                // Front insertion stores rollbacks in reverse application
                // order; the resolver replays them front to back.
                rollbacks.push_front(pair.rollback);
            }
        }

        enter_phase(block_number, &mut phase, BlockPhase::Committing);

        let record = BlockRollbackRecord::new(block_number, block_hash, rollbacks.into());
        let mut batch = WriteBatchWithTransaction::default();
        self.backend.apply_mutations_with_batch(&mut batch, &forwards)?;
        self.backend.put_rollback_record(&mut batch, &record)?;
        self.backend.compare_and_set_watermark_with_batch(&mut batch, expected_watermark, block_number)?;
        self.backend.write_batch(batch)?;

        enter_phase(block_number, &mut phase, BlockPhase::Committed);
        Ok(())
    }
}
