use crate::error::ChainClientError;
use alloy::primitives::B256;
use async_trait::async_trait;
#[cfg(any(test, feature = "testing"))]
use mockall::automock;
use vp_types::event::ChainEvent;
use vp_types::tx::{TxIntent, TxLog};

/// View of a confirmed transaction receipt, reduced to the fields the
/// lifecycle tracker persists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxReceiptView {
    /// Chain-level success flag.
    pub status: bool,
    pub block_number: u64,
    pub gas_used: u128,
    pub logs: Vec<TxLog>,
}

#[cfg_attr(any(test, feature = "testing"), automock)]
/// Chain access shared by the reconciliation engine (reading) and the
/// lifecycle tracker (writing).
///
/// Implementations are read-your-node: every answer reflects the chain the
/// connected node currently follows, and nothing here protects against that
/// chain being reorganized later. Reorg handling is the caller's concern.
#[async_trait]
pub trait ChainProvider: Send + Sync {
    /// Height of the chain head.
    async fn latest_block_number(&self) -> Result<u64, ChainClientError>;

    /// Decoded contract events in `[from_block, to_block]` (inclusive),
    /// ordered by `(block_number, log_index)`. The ordering holds within one
    /// fetch only; blocks already delivered may still be invalidated by a
    /// reorg.
    async fn fetch_events(&self, from_block: u64, to_block: u64) -> Result<Vec<ChainEvent>, ChainClientError>;

    /// Hash of the block at the given height, `None` when the height is past
    /// the head.
    async fn block_hash(&self, block_number: u64) -> Result<Option<B256>, ChainClientError>;

    /// Signs and submits a transaction, returning its hash without waiting
    /// for inclusion.
    async fn broadcast_transaction(&self, intent: &TxIntent) -> Result<B256, ChainClientError>;

    /// Receipt of a transaction, `None` while it is unknown or pending.
    async fn transaction_receipt(&self, transaction_hash: B256)
        -> Result<Option<TxReceiptView>, ChainClientError>;
}
