//! Vigil node command line.

mod cli;
mod service;

use anyhow::Context;
use clap::Parser;
use cli::RunCmd;
use service::{ReceiptWatcherService, ReconcileService};
use std::sync::Arc;
use vc_chain::{ChainProfile, ChainProvider, EthProvider};
use vc_db::{VigilBackend, VigilBackendConfig};
use vp_utils::service::ServiceMonitor;

const GREET_IMPL_NAME: &str = "Vigil";
const GREET_SUPPORT_URL: &str = "https://github.com/vigil-works/vigil/issues";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let run_cmd = RunCmd::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&run_cmd.log_params.log_level)),
        )
        .init();

    tracing::info!("🦉 {} Node", GREET_IMPL_NAME);
    tracing::info!("✌️  Version {}", env!("CARGO_PKG_VERSION"));
    tracing::info!("💁 Support URL: {}", GREET_SUPPORT_URL);

    let profile = ChainProfile::from_yaml(&run_cmd.chain_params.chain_profile).context("Loading chain profile")?;
    tracing::info!(
        "🌐 GroupRegistry {:#x}, ContributionVault {:#x} (indexing from block {}, finality depth {})",
        profile.group_registry_address,
        profile.contribution_vault_address,
        profile.start_block,
        profile.finality_depth
    );

    // ===================================================================== //
    //                             SERVICES (SETUP)                          //
    // ===================================================================== //

    // Database

    let backend = VigilBackend::open(&VigilBackendConfig { base_path: run_cmd.db_params.base_path.clone() })
        .context("Opening database")?;

    // Chain provider

    let private_key = run_cmd.chain_params.private_key();
    if private_key.is_none() {
        tracing::warn!("🔒 VIGIL_PRIVATE_KEY is not set, running read-only");
    }
    let provider: Arc<dyn ChainProvider> = Arc::new(
        EthProvider::new(run_cmd.chain_params.chain_rpc_url.clone(), &profile, private_key.as_deref())
            .await
            .context("Connecting to the chain endpoint")?,
    );

    // ===================================================================== //
    //                             SERVICES (START)                          //
    // ===================================================================== //

    let mut app = ServiceMonitor::default();

    if run_cmd.reconcile_params.reconcile_disabled {
        tracing::warn!("❗ Reconciliation is disabled");
    } else {
        app = app.with(ReconcileService::new(
            &run_cmd.reconcile_params,
            &profile,
            Arc::clone(&backend),
            Arc::clone(&provider),
        ));
    }

    if run_cmd.lifecycle_params.receipt_watcher_disabled {
        tracing::warn!("❗ The receipt watcher is disabled");
    } else {
        app = app.with(ReceiptWatcherService::new(
            &run_cmd.lifecycle_params,
            Arc::clone(&backend),
            Arc::clone(&provider),
        ));
    }

    app.start().await
}
