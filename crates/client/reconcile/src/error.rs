use thiserror::Error;
use vc_chain::ChainClientError;
use vc_db::StorageError;
use vp_types::EventKind;

/// Failure while compiling an event into mutation pairs. Conversion never
/// writes, so any of these leaves the backend untouched and the whole block
/// is retried on the next cycle.
#[derive(Debug, Error)]
pub enum ConversionError {
    #[error("No converter registered for {0}")]
    NoConverter(EventKind),
    #[error("Storage error during conversion: {0}")]
    Storage(#[from] StorageError),
}

#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error(transparent)]
    Conversion(#[from] ConversionError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Chain(#[from] ChainClientError),
    #[error("Chain reported no hash for block {0}")]
    MissingBlockHash(u64),
    #[error("Fork point is older than the rollback ledger (oldest retained block: {oldest_retained})")]
    ForkBeyondLedger { oldest_retained: u64 },
    #[error("Rollback of block {block_number} failed: {source}")]
    RollbackFailed { block_number: u64, source: Box<StorageError> },
}

impl ReconcileError {
    /// Whether the service loop may swallow this error and retry on the next
    /// tick. Rollback failures and forks deeper than the ledger require
    /// operator intervention and must stop the service.
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Chain(e) => e.is_recoverable(),
            Self::Conversion(_) | Self::Storage(_) | Self::MissingBlockHash(_) => true,
            Self::ForkBeyondLedger { .. } | Self::RollbackFailed { .. } => false,
        }
    }
}
