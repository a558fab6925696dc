use alloy::primitives::Address;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Deployment profile of one indexed chain: where the contracts live and how
/// far back the rollback ledger has to reach.
///
/// Profiles ship as YAML presets under `configs/` and are selected with
/// `--chain-profile`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainProfile {
    /// Address of the deployed `GroupRegistry` contract.
    pub group_registry_address: Address,
    /// Address of the deployed `ContributionVault` contract.
    pub contribution_vault_address: Address,
    /// First block to index when no watermark exists yet. Usually the
    /// deployment block of the contracts.
    pub start_block: u64,
    /// Blocks below the watermark after which ledger records are pruned.
    /// Bounds the deepest reorg that can be resolved automatically.
    pub finality_depth: u64,
}

impl ChainProfile {
    pub fn from_yaml(path: &Path) -> anyhow::Result<Self> {
        let profile_str = fs::read_to_string(path)?;
        serde_yaml::from_str(&profile_str).context("While deserializing chain profile")
    }
}
