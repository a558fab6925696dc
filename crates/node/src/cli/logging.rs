#[derive(Clone, Debug, clap::Args)]
pub struct LogParams {
    /// Log filter of the node, in `tracing` env-filter syntax (for example
    /// `info` or `info,vc_reconcile=debug`). `RUST_LOG` takes precedence
    /// when set.
    #[clap(env = "VIGIL_LOG_LEVEL", long, default_value = "info", value_name = "FILTER")]
    pub log_level: String,
}
