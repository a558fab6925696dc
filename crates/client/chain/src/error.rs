use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChainClientError {
    #[error("Chain RPC error: {0}")]
    Rpc(String),

    #[error("Contract interaction failed: {0}")]
    Contract(String),

    #[error("Missing field in response: {0}")]
    MissingField(&'static str),

    #[error("Event decode error: {message} at block {block_number}")]
    EventDecode { message: String, block_number: u64 },

    #[error("Broadcast requires a configured signer")]
    NoSigner,

    #[error("Invalid chain configuration: {0}")]
    InvalidConfig(String),
}

impl ChainClientError {
    /// Returns true for transport-level failures that are worth retrying on
    /// the next cycle. Decode and configuration errors are deterministic and
    /// would fail again.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Rpc(_))
    }
}
