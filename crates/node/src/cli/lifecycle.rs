use std::time::Duration;
use vp_utils::parsers::parse_duration;

#[derive(Clone, Debug, clap::Args)]
pub struct LifecycleParams {
    /// Disable the background receipt watcher. Broadcast transactions will
    /// stay unconfirmed locally until it is re-enabled.
    #[clap(env = "VIGIL_NO_RECEIPT_WATCHER", long, alias = "no-receipt-watcher")]
    pub receipt_watcher_disabled: bool,

    /// Time the receipt watcher waits between sweeps over the watched
    /// transaction set.
    #[clap(
        env = "VIGIL_RECEIPT_POLL_INTERVAL",
        long,
        default_value = "6s",
        value_parser = parse_duration,
        value_name = "DURATION"
    )]
    pub receipt_poll_interval: Duration,
}
