use crate::error::BroadcastError;
use alloy::primitives::B256;
use std::sync::Arc;
use vc_chain::ChainProvider;
use vc_db::VigilBackend;
use vp_types::{TxIntent, TxSeqState};

/// Submits transaction intents through the chain provider.
///
/// Broadcasting is a one-shot step with no retry: duplicate avoidance is
/// the caller checking `broadcasted` before invoking, and failures surface
/// to the owning workflow instead of being retried here.
pub struct TransactionBroadcaster {
    provider: Arc<dyn ChainProvider>,
    watch_registry: Option<Arc<VigilBackend>>,
}

impl TransactionBroadcaster {
    pub fn new(provider: Arc<dyn ChainProvider>) -> Self {
        Self { provider, watch_registry: None }
    }

    /// Registers every broadcast hash into the backend's watched set so
    /// the receipt watcher resolves it.
    pub fn with_watch_registry(mut self, backend: Arc<VigilBackend>) -> Self {
        self.watch_registry = Some(backend);
        self
    }

    /// Validates and submits one intent, returning the transaction hash.
    /// A missing or zero sender is refused before any network call.
    pub async fn broadcast(&self, intent: &TxIntent) -> Result<B256, BroadcastError> {
        match intent.from {
            Some(from) if !from.is_zero() => {}
            _ => return Err(BroadcastError::MissingSender),
        }

        let transaction_hash = self
            .provider
            .broadcast_transaction(intent)
            .await
            .map_err(|e| BroadcastError::Submit(e.to_string()))?;
        tracing::info!("Broadcast transaction {transaction_hash:#x} to {:#x}", intent.to);
        Ok(transaction_hash)
    }

    /// One-shot `NotBroadcast -> Broadcasted` transition: broadcasts,
    /// records the hash in `state` and registers it for receipt watching.
    /// Callers must check `state.broadcasted` first; this does not.
    pub async fn broadcast_step(&self, state: &mut TxSeqState) -> Result<(), BroadcastError> {
        let transaction_hash = self.broadcast(&state.transaction).await?;
        state.mark_broadcasted(transaction_hash);

        if let Some(backend) = &self.watch_registry {
            // The transaction is already on the wire; losing the watch
            // entry must not fail the step.
            if let Err(e) = backend.watch_tx(&transaction_hash) {
                tracing::warn!("Failed to watch transaction {transaction_hash:#x}: {e}");
            }
        }
        Ok(())
    }
}
