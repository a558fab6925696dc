use crate::cli::LifecycleParams;
use std::sync::Arc;
use vc_chain::ChainProvider;
use vc_db::VigilBackend;
use vc_lifecycle::{ReceiptWatcher, ReceiptWatcherConfig};
use vp_utils::service::{Service, ServiceRunner};

/// Wraps the receipt watcher sweep as a node service.
pub struct ReceiptWatcherService {
    backend: Arc<VigilBackend>,
    provider: Arc<dyn ChainProvider>,
    config: ReceiptWatcherConfig,
}

impl ReceiptWatcherService {
    pub fn new(
        params: &LifecycleParams,
        backend: Arc<VigilBackend>,
        provider: Arc<dyn ChainProvider>,
    ) -> Self {
        let config = ReceiptWatcherConfig { poll_interval: params.receipt_poll_interval };
        Self { backend, provider, config }
    }
}

#[async_trait::async_trait]
impl Service for ReceiptWatcherService {
    fn name(&self) -> &'static str {
        "receipt-watcher"
    }

    async fn start<'a>(&mut self, runner: ServiceRunner<'a>) -> anyhow::Result<()> {
        let watcher = ReceiptWatcher::new(
            Arc::clone(&self.backend),
            Arc::clone(&self.provider),
            self.config.clone(),
        );

        tracing::info!("🧾 Watching transaction receipts every {:?}", self.config.poll_interval);
        runner.service_loop(move |ctx| watcher.run(ctx));
        Ok(())
    }
}
