use crate::group::{GroupId, GroupStatus};
use alloy::primitives::U256;
use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// A single field write, recorded with both endpoints so the inverse write
/// can be derived and the original value audited.
///
/// Application uses set semantics: `apply` writes `to` without re-checking
/// that the field still holds `from`, so replaying a mutation is idempotent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MutationOp {
    SetStatus { from: GroupStatus, to: GroupStatus },
    SetTotalContributed { from: U256, to: U256 },
    SetPayoutRound { from: u64, to: u64 },
    SetUpdatedAtBlock { from: u64, to: u64 },
}

impl MutationOp {
    /// The op that undoes this one.
    pub fn inverted(&self) -> MutationOp {
        match *self {
            Self::SetStatus { from, to } => Self::SetStatus { from: to, to: from },
            Self::SetTotalContributed { from, to } => Self::SetTotalContributed { from: to, to: from },
            Self::SetPayoutRound { from, to } => Self::SetPayoutRound { from: to, to: from },
            Self::SetUpdatedAtBlock { from, to } => Self::SetUpdatedAtBlock { from: to, to: from },
        }
    }

    /// Whether applying this op would leave the row unchanged.
    pub fn is_noop(&self) -> bool {
        match self {
            Self::SetStatus { from, to } => from == to,
            Self::SetTotalContributed { from, to } => from == to,
            Self::SetPayoutRound { from, to } => from == to,
            Self::SetUpdatedAtBlock { from, to } => from == to,
        }
    }
}

impl Display for MutationOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SetStatus { from, to } => write!(f, "status {from}->{to}"),
            Self::SetTotalContributed { from, to } => write!(f, "total_contributed {from}->{to}"),
            Self::SetPayoutRound { from, to } => write!(f, "payout_round {from}->{to}"),
            Self::SetUpdatedAtBlock { from, to } => write!(f, "updated_at_block {from}->{to}"),
        }
    }
}

/// A dry write description: constructed and validated, not yet executed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mutation {
    pub group_id: GroupId,
    pub op: MutationOp,
}

impl Mutation {
    pub fn inverted(&self) -> Mutation {
        Mutation { group_id: self.group_id, op: self.op.inverted() }
    }
}

impl Display for Mutation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.group_id, self.op)
    }
}

/// Forward and rollback mutations for one field write, always produced
/// together. Construction lives behind [MutationPair::symmetric] so no code
/// path can emit one half without the other.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MutationPair {
    pub forward: Mutation,
    pub rollback: Mutation,
}

impl MutationPair {
    /// Pairs a forward mutation with its derived inverse.
    pub fn symmetric(forward: Mutation) -> Self {
        let rollback = forward.inverted();
        Self { forward, rollback }
    }
}
