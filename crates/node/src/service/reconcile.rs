use crate::cli::ReconcileParams;
use std::sync::Arc;
use vc_chain::{ChainProfile, ChainProvider};
use vc_db::VigilBackend;
use vc_reconcile::{ConverterRegistry, ReconcileConfig, ReconcileScheduler};
use vp_utils::service::{Service, ServiceRunner};

/// Wraps the reconciliation scheduler as a node service.
pub struct ReconcileService {
    backend: Arc<VigilBackend>,
    provider: Arc<dyn ChainProvider>,
    config: ReconcileConfig,
}

impl ReconcileService {
    pub fn new(
        params: &ReconcileParams,
        profile: &ChainProfile,
        backend: Arc<VigilBackend>,
        provider: Arc<dyn ChainProvider>,
    ) -> Self {
        let config = ReconcileConfig {
            poll_interval: params.reconcile_poll_interval,
            max_blocks_per_cycle: params.max_blocks_per_cycle,
            start_block: profile.start_block,
            finality_depth: profile.finality_depth,
        };
        Self { backend, provider, config }
    }
}

#[async_trait::async_trait]
impl Service for ReconcileService {
    fn name(&self) -> &'static str {
        "reconcile"
    }

    async fn start<'a>(&mut self, runner: ServiceRunner<'a>) -> anyhow::Result<()> {
        let scheduler = ReconcileScheduler::new(
            Arc::clone(&self.backend),
            Arc::clone(&self.provider),
            ConverterRegistry::with_default_converters(),
            self.config.clone(),
        );

        tracing::info!(
            "🔄 Reconciling every {:?}, up to {} blocks per cycle",
            self.config.poll_interval,
            self.config.max_blocks_per_cycle
        );
        runner.service_loop(move |ctx| scheduler.run(ctx));
        Ok(())
    }
}
