use alloy::primitives::{B256, U256};
use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// Identifier of a savings group, as emitted on-chain (`bytes32`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GroupId(pub B256);

impl GroupId {
    pub fn as_bytes(&self) -> &[u8; 32] {
        self.0.as_ref()
    }

    pub fn from_slice(bytes: &[u8]) -> Self {
        Self(B256::from_slice(bytes))
    }
}

impl From<B256> for GroupId {
    fn from(value: B256) -> Self {
        Self(value)
    }
}

impl Display for GroupId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// Lifecycle status of a group row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GroupStatus {
    /// Created off-chain, not yet activated on-chain.
    Pending,
    /// Live: accepting contributions and payouts.
    Active,
    /// Closed out on-chain.
    Retired,
}

impl GroupStatus {
    /// Whether a status write from `self` to `next` is a legal transition.
    ///
    /// Forward edges follow the contract lifecycle; the reverse edges exist
    /// because rollback mutations re-traverse them when a block is undone.
    /// Same-status writes are allowed so that a duplicated on-chain event
    /// compiles to a harmless no-op pair instead of wedging its block.
    pub fn can_transition_to(&self, next: GroupStatus) -> bool {
        use GroupStatus::*;
        matches!(
            (self, next),
            (Pending, Active) | (Active, Retired) | (Active, Pending) | (Retired, Active)
        ) || *self == next
    }
}

impl Display for GroupStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::Active => "active",
            Self::Retired => "retired",
        };
        f.write_str(s)
    }
}

/// One row of the read model mirroring a group's on-chain state.
///
/// `total_contributed` and `payout_round` are absolute values taken from
/// events, never accumulated locally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupRow {
    pub group_id: GroupId,
    pub status: GroupStatus,
    pub total_contributed: U256,
    pub payout_round: u64,
    /// Height of the last block whose events touched this row.
    pub updated_at_block: u64,
}

impl GroupRow {
    /// A freshly indexed group, before any chain event touched it.
    pub fn new_pending(group_id: GroupId) -> Self {
        Self { group_id, status: GroupStatus::Pending, total_contributed: U256::ZERO, payout_round: 0, updated_at_block: 0 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(GroupStatus::Pending, GroupStatus::Active, true)]
    #[case(GroupStatus::Active, GroupStatus::Retired, true)]
    #[case(GroupStatus::Active, GroupStatus::Pending, true)]
    #[case(GroupStatus::Retired, GroupStatus::Active, true)]
    #[case(GroupStatus::Pending, GroupStatus::Retired, false)]
    #[case(GroupStatus::Retired, GroupStatus::Pending, false)]
    fn transition_table(#[case] from: GroupStatus, #[case] to: GroupStatus, #[case] allowed: bool) {
        assert_eq!(from.can_transition_to(to), allowed);
    }

    #[rstest]
    fn same_status_is_always_allowed(
        #[values(GroupStatus::Pending, GroupStatus::Active, GroupStatus::Retired)] status: GroupStatus,
    ) {
        assert!(status.can_transition_to(status));
    }

    #[test]
    fn new_pending_row_is_zeroed() {
        let row = GroupRow::new_pending(GroupId(B256::repeat_byte(1)));
        assert_eq!(row.status, GroupStatus::Pending);
        assert_eq!(row.total_contributed, U256::ZERO);
        assert_eq!(row.payout_round, 0);
        assert_eq!(row.updated_at_block, 0);
    }
}
