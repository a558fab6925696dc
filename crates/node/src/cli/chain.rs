use std::path::PathBuf;
use url::Url;
use vp_utils::parsers::parse_url;

#[derive(Clone, Debug, clap::Args)]
pub struct ChainParams {
    /// JSON-RPC endpoint of the chain node to index and broadcast through.
    #[clap(env = "VIGIL_CHAIN_RPC_URL", long, value_parser = parse_url, value_name = "ETHEREUM RPC URL")]
    pub chain_rpc_url: Url,

    /// Chain profile file declaring the contract addresses, the first block
    /// to index and the finality depth. Presets ship under `configs/`.
    #[clap(env = "VIGIL_CHAIN_PROFILE", long, value_name = "YAML FILE PATH")]
    pub chain_profile: PathBuf,
}

impl ChainParams {
    /// Signing key used for transaction broadcast. Read from the
    /// `VIGIL_PRIVATE_KEY` environment variable only, never from a flag;
    /// without it the node runs read-only.
    pub fn private_key(&self) -> Option<String> {
        std::env::var("VIGIL_PRIVATE_KEY").ok()
    }
}
