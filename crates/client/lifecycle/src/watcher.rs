use crate::error::LifecycleError;
use std::sync::Arc;
use std::time::Duration;
use vc_chain::ChainProvider;
use vc_db::VigilBackend;
use vp_types::TxRecord;
use vp_utils::service::ServiceContext;

#[derive(Debug, Clone)]
pub struct ReceiptWatcherConfig {
    pub poll_interval: Duration,
}

/// Background sweep resolving watched transaction hashes into confirmation
/// records.
///
/// The watcher is the only writer of [`TxRecord`]s: pollers read whatever
/// the last sweep persisted and never touch the chain themselves. A hash
/// stays watched until a receipt exists for it, so transient RPC failures
/// only delay confirmation.
pub struct ReceiptWatcher {
    backend: Arc<VigilBackend>,
    provider: Arc<dyn ChainProvider>,
    config: ReceiptWatcherConfig,
}

impl ReceiptWatcher {
    pub fn new(
        backend: Arc<VigilBackend>,
        provider: Arc<dyn ChainProvider>,
        config: ReceiptWatcherConfig,
    ) -> Self {
        Self { backend, provider, config }
    }

    /// Sweeps on `poll_interval` until the service is cancelled.
    pub async fn run(self, ctx: ServiceContext) -> Result<(), LifecycleError> {
        let mut interval = tokio::time::interval(self.config.poll_interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        while ctx.run_until_cancelled(interval.tick()).await.is_some() {
            self.sweep().await?;
        }

        tracing::debug!("Receipt watcher stopped");
        Ok(())
    }

    /// One pass over the watched set: fetches receipts, persists a record
    /// for each confirmed transaction and drops it from the set.
    pub async fn sweep(&self) -> Result<(), LifecycleError> {
        for transaction_hash in self.backend.watched_txs()? {
            let receipt = match self.provider.transaction_receipt(transaction_hash).await {
                Ok(receipt) => receipt,
                Err(e) => {
                    tracing::warn!("Receipt lookup for {transaction_hash:#x} failed: {e}");
                    continue;
                }
            };
            let Some(receipt) = receipt else { continue };

            let record = TxRecord {
                transaction_hash,
                confirmed: true,
                status: receipt.status,
                block_number: receipt.block_number,
                gas_used: receipt.gas_used,
                logs: receipt.logs,
            };
            self.backend.put_tx_record(&record)?;
            self.backend.unwatch_tx(&transaction_hash)?;
            tracing::info!(
                "Transaction {transaction_hash:#x} confirmed in block {} (status: {})",
                record.block_number,
                record.status
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::B256;
    use vc_chain::{ChainClientError, MockChainProvider, TxReceiptView};

    fn watcher(backend: &Arc<VigilBackend>, provider: MockChainProvider) -> ReceiptWatcher {
        ReceiptWatcher::new(
            Arc::clone(backend),
            Arc::new(provider),
            ReceiptWatcherConfig { poll_interval: Duration::from_millis(10) },
        )
    }

    #[tokio::test]
    async fn sweep_confirms_mined_transactions_and_unwatches_them() {
        let backend = VigilBackend::open_for_testing();
        let mined = B256::repeat_byte(0xc5);
        let pending = B256::repeat_byte(0xd7);
        backend.watch_tx(&mined).unwrap();
        backend.watch_tx(&pending).unwrap();

        let mut provider = MockChainProvider::new();
        provider.expect_transaction_receipt().withf(move |hash| *hash == mined).returning(|_| {
            Ok(Some(TxReceiptView { status: true, block_number: 117, gas_used: 21_000, logs: vec![] }))
        });
        provider
            .expect_transaction_receipt()
            .withf(move |hash| *hash == pending)
            .returning(|_| Ok(None));

        watcher(&backend, provider).sweep().await.unwrap();

        let record = backend.tx_record(&mined).unwrap().unwrap();
        assert!(record.confirmed);
        assert!(record.status);
        assert_eq!(record.block_number, 117);
        assert_eq!(record.gas_used, 21_000);
        assert_eq!(backend.watched_txs().unwrap(), vec![pending]);
    }

    #[tokio::test]
    async fn reverted_transactions_are_recorded_with_a_false_status() {
        let backend = VigilBackend::open_for_testing();
        let reverted = B256::repeat_byte(0xc5);
        backend.watch_tx(&reverted).unwrap();

        let mut provider = MockChainProvider::new();
        provider.expect_transaction_receipt().returning(|_| {
            Ok(Some(TxReceiptView { status: false, block_number: 118, gas_used: 40_000, logs: vec![] }))
        });

        watcher(&backend, provider).sweep().await.unwrap();

        let record = backend.tx_record(&reverted).unwrap().unwrap();
        assert!(record.confirmed);
        assert!(!record.status);
        assert!(backend.watched_txs().unwrap().is_empty());
    }

    #[tokio::test]
    async fn rpc_failures_keep_the_hash_watched() {
        let backend = VigilBackend::open_for_testing();
        let hash = B256::repeat_byte(0xc5);
        backend.watch_tx(&hash).unwrap();

        let mut provider = MockChainProvider::new();
        provider
            .expect_transaction_receipt()
            .returning(|_| Err(ChainClientError::Rpc("timeout".into())));

        watcher(&backend, provider).sweep().await.unwrap();

        assert_eq!(backend.tx_record(&hash).unwrap(), None);
        assert_eq!(backend.watched_txs().unwrap(), vec![hash]);
    }

    #[tokio::test]
    async fn run_stops_when_the_service_is_cancelled() {
        let backend = VigilBackend::open_for_testing();
        let mut provider = MockChainProvider::new();
        provider.expect_transaction_receipt().returning(|_| Ok(None));

        let parent = ServiceContext::new();
        let ctx = parent.child();
        let handle = tokio::spawn(watcher(&backend, provider).run(ctx));

        tokio::time::sleep(Duration::from_millis(30)).await;
        parent.cancel_global();

        handle.await.unwrap().unwrap();
    }
}
