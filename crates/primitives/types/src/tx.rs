use alloy::primitives::{Address, Bytes, B256, U256};
use serde::{Deserialize, Serialize};

/// One log entry captured from a confirmed transaction's receipt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxLog {
    pub address: Address,
    pub topics: Vec<B256>,
    pub data: Bytes,
}

/// Confirmed outcome of a broadcast transaction, persisted by the chain
/// watcher and keyed by `transaction_hash`.
///
/// Absent until the watcher observes the transaction on-chain; written once
/// on confirmation and immutable thereafter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxRecord {
    pub transaction_hash: B256,
    pub confirmed: bool,
    /// Chain-level success flag, meaningful only once `confirmed` is true.
    pub status: bool,
    pub block_number: u64,
    pub gas_used: u128,
    pub logs: Vec<TxLog>,
}

/// Continuation a workflow attaches to a transaction: the job to enqueue
/// once the terminal outcome is known, plus caller-supplied payload data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContinuationSpec {
    pub job_name: String,
    pub job_data: serde_json::Value,
}

/// The transaction a workflow wants broadcast.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxIntent {
    /// Sender address. Broadcast is refused before any network call when
    /// this is missing.
    pub from: Option<Address>,
    pub to: Address,
    pub value: U256,
    pub data: Bytes,
    pub on_confirm: Option<ContinuationSpec>,
    pub on_failure: Option<ContinuationSpec>,
}

/// Violation of the `broadcasted <=> transaction_hash` invariant.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum StateConsistencyError {
    #[error("state is marked broadcasted but carries no transaction hash")]
    BroadcastedWithoutHash,
    #[error("state carries transaction hash {0} but is not marked broadcasted")]
    HashWithoutBroadcast(B256),
}

/// Transaction-lifecycle state carried inside a workflow action's payload.
///
/// Not a standalone table: the owning action engine persists it between
/// polls. Invariant: `transaction_hash` is set iff `broadcasted` is true.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxSeqState {
    pub transaction: TxIntent,
    pub broadcasted: bool,
    pub transaction_hash: Option<B256>,
}

impl TxSeqState {
    /// Fresh state for a transaction that has not been broadcast yet.
    pub fn new(transaction: TxIntent) -> Self {
        Self { transaction, broadcasted: false, transaction_hash: None }
    }

    pub fn check_consistency(&self) -> Result<(), StateConsistencyError> {
        match (self.broadcasted, self.transaction_hash) {
            (true, None) => Err(StateConsistencyError::BroadcastedWithoutHash),
            (false, Some(hash)) => Err(StateConsistencyError::HashWithoutBroadcast(hash)),
            _ => Ok(()),
        }
    }

    /// One-shot transition recording a successful broadcast.
    pub fn mark_broadcasted(&mut self, transaction_hash: B256) {
        self.broadcasted = true;
        self.transaction_hash = Some(transaction_hash);
    }
}
