//! Group read model.
//!
//! Rows mirror on-chain state, so every write is set-to-value: `dry_update`
//! compiles intended changes into forward/rollback pairs without touching
//! the db, and the apply path writes `op.to` without re-checking `op.from`
//! (a retried block must be able to re-apply its mutations verbatim).

use crate::{Column, DatabaseExt, StorageError, VigilBackend, WriteBatchWithTransaction};
use alloy::primitives::U256;
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use vp_types::{GroupId, GroupRow, GroupStatus, Mutation, MutationOp, MutationPair};

/// Intended changes to one group row. `None` fields are left untouched.
#[derive(Debug, Clone, Default)]
pub struct GroupChanges {
    pub status: Option<GroupStatus>,
    pub total_contributed: Option<U256>,
    pub payout_round: Option<u64>,
    pub updated_at_block: Option<u64>,
}

fn push_effective(pairs: &mut Vec<MutationPair>, group_id: GroupId, op: MutationOp) {
    if !op.is_noop() {
        pairs.push(MutationPair::symmetric(Mutation { group_id, op }));
    }
}

impl VigilBackend {
    pub fn group(&self, group_id: &GroupId) -> Result<Option<GroupRow>, StorageError> {
        let groups_cf = self.db.get_column(Column::Groups);
        let Some(res) = self.db.get_pinned_cf(&groups_cf, group_id.as_bytes())? else { return Ok(None) };
        Ok(Some(bincode::deserialize(&res)?))
    }

    /// Rows ordered by group id, starting at `start` (inclusive) when given.
    pub fn groups_page(&self, start: Option<GroupId>, limit: usize) -> Result<Vec<GroupRow>, StorageError> {
        let groups_cf = self.db.get_column(Column::Groups);
        let mode = match &start {
            Some(id) => rocksdb::IteratorMode::From(id.as_bytes(), rocksdb::Direction::Forward),
            None => rocksdb::IteratorMode::Start,
        };

        let mut rows = Vec::with_capacity(limit);
        for res in self.db.iterator_cf(&groups_cf, mode).take(limit) {
            let (_, value) = res?;
            rows.push(bincode::deserialize(&value)?);
        }
        Ok(rows)
    }

    /// Compiles `changes` against the current row into forward/rollback
    /// pairs, one per changed field, without applying anything. Fields whose
    /// target equals the current value are skipped, so re-delivering an
    /// already applied event compiles to an empty set.
    pub fn dry_update(&self, row: &GroupRow, changes: GroupChanges) -> Result<Vec<MutationPair>, StorageError> {
        let mut pairs = Vec::new();

        if let Some(to) = changes.status {
            if !row.status.can_transition_to(to) {
                return Err(StorageError::InvalidTransition { group_id: row.group_id, from: row.status, to });
            }
            push_effective(&mut pairs, row.group_id, MutationOp::SetStatus { from: row.status, to });
        }
        if let Some(to) = changes.total_contributed {
            push_effective(&mut pairs, row.group_id, MutationOp::SetTotalContributed {
                from: row.total_contributed,
                to,
            });
        }
        if let Some(to) = changes.payout_round {
            push_effective(&mut pairs, row.group_id, MutationOp::SetPayoutRound { from: row.payout_round, to });
        }
        if let Some(to) = changes.updated_at_block {
            push_effective(&mut pairs, row.group_id, MutationOp::SetUpdatedAtBlock {
                from: row.updated_at_block,
                to,
            });
        }

        Ok(pairs)
    }

    /// Executes a single mutation immediately. Used by the reorg resolver
    /// and administrative paths; block commits go through
    /// [`Self::apply_mutations_with_batch`].
    pub fn apply_mutation(&self, mutation: &Mutation) -> Result<(), StorageError> {
        let groups_cf = self.db.get_column(Column::Groups);
        let mut row = self.group(&mutation.group_id)?.ok_or(StorageError::MissingGroup(mutation.group_id))?;
        apply_op(&mut row, &mutation.op);
        self.db.put_cf_opt(&groups_cf, mutation.group_id.as_bytes(), bincode::serialize(&row)?, &self.writeopts)?;
        Ok(())
    }

    /// Stages a block's mutations into `batch`, folded per subject row:
    /// each row is loaded once, all of its mutations applied in order in
    /// memory, and a single put staged. Folding matters because a staged
    /// put is invisible to later `get_pinned_cf` reads, so two writes to
    /// the same group within one block would otherwise stage stale rows.
    pub fn apply_mutations_with_batch(
        &self,
        batch: &mut WriteBatchWithTransaction,
        mutations: &[Mutation],
    ) -> Result<(), StorageError> {
        let groups_cf = self.db.get_column(Column::Groups);

        let mut rows: BTreeMap<GroupId, GroupRow> = BTreeMap::new();
        for mutation in mutations {
            let row = match rows.entry(mutation.group_id) {
                Entry::Occupied(entry) => entry.into_mut(),
                Entry::Vacant(entry) => {
                    let row =
                        self.group(&mutation.group_id)?.ok_or(StorageError::MissingGroup(mutation.group_id))?;
                    entry.insert(row)
                }
            };
            apply_op(row, &mutation.op);
        }

        for (group_id, row) in &rows {
            batch.put_cf(&groups_cf, group_id.as_bytes(), bincode::serialize(row)?);
        }
        Ok(())
    }

    pub fn put_group(&self, row: &GroupRow) -> Result<(), StorageError> {
        let groups_cf = self.db.get_column(Column::Groups);
        self.db.put_cf_opt(&groups_cf, row.group_id.as_bytes(), bincode::serialize(row)?, &self.writeopts)?;
        Ok(())
    }

    /// If the group does not exist, this does nothing.
    pub fn delete_group(&self, group_id: &GroupId) -> Result<(), StorageError> {
        let groups_cf = self.db.get_column(Column::Groups);
        self.db.delete_cf_opt(&groups_cf, group_id.as_bytes(), &self.writeopts)?;
        Ok(())
    }
}

fn apply_op(row: &mut GroupRow, op: &MutationOp) {
    match *op {
        MutationOp::SetStatus { to, .. } => row.status = to,
        MutationOp::SetTotalContributed { to, .. } => row.total_contributed = to,
        MutationOp::SetPayoutRound { to, .. } => row.payout_round = to,
        MutationOp::SetUpdatedAtBlock { to, .. } => row.updated_at_block = to,
    }
}
