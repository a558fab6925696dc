use crate::mutation::Mutation;
use alloy::primitives::B256;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Everything needed to undo one committed block, keyed by block number.
///
/// `rollback_mutations` is stored in reverse application order: the mutation
/// applied last comes first, so replaying the list front to back undoes the
/// block even when mutations touch the same row. A record exists for every
/// processed block, including blocks that carried no events; the recorded
/// `block_hash` keeps the chain of hashes contiguous for fork-point walking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockRollbackRecord {
    pub block_number: u64,
    /// Hash the chain reported for this block when it was committed.
    pub block_hash: B256,
    pub rollback_mutations: Vec<Mutation>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl BlockRollbackRecord {
    /// Builds the record for a freshly committed block. `rollbacks` must
    /// already be in reverse application order; committers push each block's
    /// rollback to the front as they stage the matching forward mutation.
    pub fn new(block_number: u64, block_hash: B256, rollback_mutations: Vec<Mutation>) -> Self {
        let now = Utc::now();
        Self { block_number, block_hash, rollback_mutations, created_at: now, updated_at: now }
    }

    pub fn is_empty(&self) -> bool {
        self.rollback_mutations.is_empty()
    }
}
