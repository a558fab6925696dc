use crate::group::GroupId;
use alloy::primitives::{Address, B256, U256};
use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// Contract family an event originates from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Artifact {
    /// Group lifecycle contract: activation and retirement.
    GroupRegistry,
    /// Contribution accounting contract: contributions and payouts.
    ContributionVault,
}

impl Artifact {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::GroupRegistry => "GroupRegistry",
            Self::ContributionVault => "ContributionVault",
        }
    }
}

impl Display for Artifact {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Discriminant of [EventPayload], used as the converter-registry key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    GroupActivated,
    GroupRetired,
    ContributionRecorded,
    PayoutExecuted,
}

impl EventKind {
    pub fn artifact(&self) -> Artifact {
        match self {
            Self::GroupActivated | Self::GroupRetired => Artifact::GroupRegistry,
            Self::ContributionRecorded | Self::PayoutExecuted => Artifact::ContributionVault,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::GroupActivated => "GroupActivated",
            Self::GroupRetired => "GroupRetired",
            Self::ContributionRecorded => "ContributionRecorded",
            Self::PayoutExecuted => "PayoutExecuted",
        }
    }
}

impl Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}::{}", self.artifact(), self.as_str())
    }
}

/// Decoded event body. Each variant carries its own strongly-typed fields;
/// undecoded topic/data bytes never reach this layer.
///
/// Amount-bearing variants carry absolute values (the cumulative total, the
/// latest round), never deltas, so re-applying the mutation they compile to
/// is idempotent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventPayload {
    GroupActivated { group_id: GroupId },
    GroupRetired { group_id: GroupId },
    ContributionRecorded { group_id: GroupId, member: Address, new_total: U256 },
    PayoutExecuted { group_id: GroupId, round: u64, recipient: Address },
}

impl EventPayload {
    pub fn kind(&self) -> EventKind {
        match self {
            Self::GroupActivated { .. } => EventKind::GroupActivated,
            Self::GroupRetired { .. } => EventKind::GroupRetired,
            Self::ContributionRecorded { .. } => EventKind::ContributionRecorded,
            Self::PayoutExecuted { .. } => EventKind::PayoutExecuted,
        }
    }

    /// Every event names the group it concerns.
    pub fn group_id(&self) -> GroupId {
        match self {
            Self::GroupActivated { group_id }
            | Self::GroupRetired { group_id }
            | Self::ContributionRecorded { group_id, .. }
            | Self::PayoutExecuted { group_id, .. } => *group_id,
        }
    }
}

/// One decoded contract log, produced by the chain provider per fetch cycle
/// and consumed exactly once by the matching converter.
///
/// Events within one fetch are ordered by `(block_number, log_index)`. The
/// provider does not guarantee that blocks already delivered will not later
/// be invalidated by a reorg.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainEvent {
    pub block_number: u64,
    pub block_hash: B256,
    pub transaction_hash: B256,
    pub transaction_index: u64,
    pub log_index: u64,
    pub payload: EventPayload,
}

impl ChainEvent {
    pub fn kind(&self) -> EventKind {
        self.payload.kind()
    }

    pub fn artifact(&self) -> Artifact {
        self.kind().artifact()
    }
}
