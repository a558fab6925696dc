use std::time::Duration;
use vp_utils::parsers::parse_duration;

#[derive(Clone, Debug, clap::Args)]
pub struct ReconcileParams {
    /// Disable the reconciliation service. The read model stops following
    /// the chain; receipt watching is unaffected.
    #[clap(env = "VIGIL_NO_RECONCILE", long, alias = "no-reconcile")]
    pub reconcile_disabled: bool,

    /// Time the scheduler waits between reconciliation cycles.
    #[clap(
        env = "VIGIL_RECONCILE_POLL_INTERVAL",
        long,
        default_value = "12s",
        value_parser = parse_duration,
        value_name = "DURATION"
    )]
    pub reconcile_poll_interval: Duration,

    /// Maximum number of blocks one reconciliation cycle commits. Bounds
    /// the size of a catch-up fetch after downtime.
    #[clap(env = "VIGIL_MAX_BLOCKS_PER_CYCLE", long, default_value_t = 64, value_name = "BLOCK COUNT")]
    pub max_blocks_per_cycle: u64,
}
