pub mod chain;
pub mod db;
pub mod lifecycle;
pub mod logging;
pub mod reconcile;

pub use chain::*;
pub use db::*;
pub use lifecycle::*;
pub use logging::*;
pub use reconcile::*;

/// Vigil: chain-indexing service for the group contribution contracts.
#[derive(Clone, Debug, clap::Parser)]
pub struct RunCmd {
    #[allow(missing_docs)]
    #[clap(flatten)]
    pub db_params: DbParams,

    #[allow(missing_docs)]
    #[clap(flatten)]
    pub chain_params: ChainParams,

    #[allow(missing_docs)]
    #[clap(flatten)]
    pub reconcile_params: ReconcileParams,

    #[allow(missing_docs)]
    #[clap(flatten)]
    pub lifecycle_params: LifecycleParams,

    #[allow(missing_docs)]
    #[clap(flatten)]
    pub log_params: LogParams,
}
