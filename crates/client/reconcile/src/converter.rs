//! Event-to-mutation compilation.
//!
//! A converter reads the subject row and compiles the event into
//! forward/rollback pairs through [`VigilBackend::dry_update`]. Nothing in
//! this module writes to the backend; the scheduler owns the commit. An
//! event whose group row does not exist compiles to no pairs at all, so
//! duplicate delivery and events for groups vigil never indexed are
//! harmless.

use crate::error::ConversionError;
use std::collections::HashMap;
use vc_db::{GroupChanges, VigilBackend};
use vp_types::{ChainEvent, EventKind, EventPayload, GroupRow, GroupStatus, MutationPair};

pub trait EventConverter: Send + Sync {
    fn convert(&self, event: &ChainEvent, backend: &VigilBackend) -> Result<Vec<MutationPair>, ConversionError>;
}

/// Fetches the row an event addresses, or short-circuits with no pairs.
fn subject_row(event: &ChainEvent, backend: &VigilBackend) -> Result<Option<GroupRow>, ConversionError> {
    let group_id = event.payload.group_id();
    let Some(row) = backend.group(&group_id)? else {
        tracing::debug!("Skipping {} for unindexed group {group_id}", event.kind());
        return Ok(None);
    };
    Ok(Some(row))
}

pub struct GroupActivatedConverter;

impl EventConverter for GroupActivatedConverter {
    fn convert(&self, event: &ChainEvent, backend: &VigilBackend) -> Result<Vec<MutationPair>, ConversionError> {
        let Some(row) = subject_row(event, backend)? else { return Ok(vec![]) };
        let changes = GroupChanges {
            status: Some(GroupStatus::Active),
            updated_at_block: Some(event.block_number),
            ..Default::default()
        };
        Ok(backend.dry_update(&row, changes)?)
    }
}

pub struct GroupRetiredConverter;

impl EventConverter for GroupRetiredConverter {
    fn convert(&self, event: &ChainEvent, backend: &VigilBackend) -> Result<Vec<MutationPair>, ConversionError> {
        let Some(row) = subject_row(event, backend)? else { return Ok(vec![]) };
        let changes = GroupChanges {
            status: Some(GroupStatus::Retired),
            updated_at_block: Some(event.block_number),
            ..Default::default()
        };
        Ok(backend.dry_update(&row, changes)?)
    }
}

pub struct ContributionRecordedConverter;

impl EventConverter for ContributionRecordedConverter {
    fn convert(&self, event: &ChainEvent, backend: &VigilBackend) -> Result<Vec<MutationPair>, ConversionError> {
        let EventPayload::ContributionRecorded { new_total, .. } = event.payload else { return Ok(vec![]) };
        let Some(row) = subject_row(event, backend)? else { return Ok(vec![]) };
        // new_total is the contract's running total, not a delta, so the row
        // is set to it directly and reprocessing cannot double-count.
        let changes = GroupChanges {
            total_contributed: Some(new_total),
            updated_at_block: Some(event.block_number),
            ..Default::default()
        };
        Ok(backend.dry_update(&row, changes)?)
    }
}

pub struct PayoutExecutedConverter;

impl EventConverter for PayoutExecutedConverter {
    fn convert(&self, event: &ChainEvent, backend: &VigilBackend) -> Result<Vec<MutationPair>, ConversionError> {
        let EventPayload::PayoutExecuted { round, .. } = event.payload else { return Ok(vec![]) };
        let Some(row) = subject_row(event, backend)? else { return Ok(vec![]) };
        let changes = GroupChanges {
            payout_round: Some(round),
            updated_at_block: Some(event.block_number),
            ..Default::default()
        };
        Ok(backend.dry_update(&row, changes)?)
    }
}

/// Dispatch table from [`EventKind`] to its converter.
#[derive(Default)]
pub struct ConverterRegistry {
    converters: HashMap<EventKind, Box<dyn EventConverter>>,
}

impl ConverterRegistry {
    /// Registry covering every event kind the chain client decodes.
    pub fn with_default_converters() -> Self {
        let mut registry = Self::default();
        registry.register(EventKind::GroupActivated, Box::new(GroupActivatedConverter));
        registry.register(EventKind::GroupRetired, Box::new(GroupRetiredConverter));
        registry.register(EventKind::ContributionRecorded, Box::new(ContributionRecordedConverter));
        registry.register(EventKind::PayoutExecuted, Box::new(PayoutExecutedConverter));
        registry
    }

    pub fn register(&mut self, kind: EventKind, converter: Box<dyn EventConverter>) {
        self.converters.insert(kind, converter);
    }

    pub fn convert(&self, event: &ChainEvent, backend: &VigilBackend) -> Result<Vec<MutationPair>, ConversionError> {
        let kind = event.kind();
        let converter = self.converters.get(&kind).ok_or(ConversionError::NoConverter(kind))?;
        converter.convert(event, backend)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::{address, B256, U256};
    use assert_matches::assert_matches;
    use rstest::rstest;
    use std::sync::Arc;
    use vc_db::StorageError;
    use vp_types::{GroupId, MutationOp};

    fn gid(byte: u8) -> GroupId {
        GroupId(B256::repeat_byte(byte))
    }

    fn event_at(block_number: u64, payload: EventPayload) -> ChainEvent {
        ChainEvent {
            block_number,
            block_hash: B256::repeat_byte(0xbb),
            transaction_hash: B256::repeat_byte(0xcc),
            transaction_index: 0,
            log_index: 0,
            payload,
        }
    }

    fn seeded_backend(row: &GroupRow) -> Arc<VigilBackend> {
        let backend = VigilBackend::open_for_testing();
        backend.put_group(row).unwrap();
        backend
    }

    #[test]
    fn activation_compiles_status_and_block_pairs() {
        let row = GroupRow::new_pending(gid(1));
        let backend = seeded_backend(&row);
        let event = event_at(120, EventPayload::GroupActivated { group_id: gid(1) });

        let pairs = ConverterRegistry::with_default_converters().convert(&event, &backend).unwrap();

        assert_eq!(pairs.len(), 2);
        assert_eq!(
            pairs[0].forward.op,
            MutationOp::SetStatus { from: GroupStatus::Pending, to: GroupStatus::Active }
        );
        assert_eq!(pairs[0].rollback.op, MutationOp::SetStatus { from: GroupStatus::Active, to: GroupStatus::Pending });
        assert_eq!(pairs[1].forward.op, MutationOp::SetUpdatedAtBlock { from: 0, to: 120 });

        // Conversion alone must not have touched the row.
        assert_eq!(backend.group(&gid(1)).unwrap().unwrap(), row);
    }

    #[test]
    fn retirement_compiles_from_active() {
        let row = GroupRow { status: GroupStatus::Active, updated_at_block: 100, ..GroupRow::new_pending(gid(2)) };
        let backend = seeded_backend(&row);
        let event = event_at(130, EventPayload::GroupRetired { group_id: gid(2) });

        let pairs = ConverterRegistry::with_default_converters().convert(&event, &backend).unwrap();

        assert_eq!(
            pairs[0].forward.op,
            MutationOp::SetStatus { from: GroupStatus::Active, to: GroupStatus::Retired }
        );
        assert_eq!(pairs[1].forward.op, MutationOp::SetUpdatedAtBlock { from: 100, to: 130 });
    }

    #[test]
    fn contribution_sets_absolute_total() {
        let row = GroupRow {
            status: GroupStatus::Active,
            total_contributed: U256::from(500u64),
            ..GroupRow::new_pending(gid(3))
        };
        let backend = seeded_backend(&row);
        let event = event_at(
            140,
            EventPayload::ContributionRecorded {
                group_id: gid(3),
                member: address!("dac17f958d2ee523a2206206994597c13d831ec7"),
                new_total: U256::from(800u64),
            },
        );

        let pairs = ConverterRegistry::with_default_converters().convert(&event, &backend).unwrap();

        assert_eq!(
            pairs[0].forward.op,
            MutationOp::SetTotalContributed { from: U256::from(500u64), to: U256::from(800u64) }
        );
        assert_eq!(
            pairs[0].rollback.op,
            MutationOp::SetTotalContributed { from: U256::from(800u64), to: U256::from(500u64) }
        );
    }

    #[test]
    fn payout_sets_round() {
        let row = GroupRow { status: GroupStatus::Active, payout_round: 3, ..GroupRow::new_pending(gid(4)) };
        let backend = seeded_backend(&row);
        let event = event_at(
            150,
            EventPayload::PayoutExecuted {
                group_id: gid(4),
                round: 4,
                recipient: address!("6b175474e89094c44da98b954eedeac495271d0f"),
            },
        );

        let pairs = ConverterRegistry::with_default_converters().convert(&event, &backend).unwrap();

        assert_eq!(pairs[0].forward.op, MutationOp::SetPayoutRound { from: 3, to: 4 });
    }

    #[rstest]
    #[case(EventPayload::GroupActivated { group_id: gid(9) })]
    #[case(EventPayload::GroupRetired { group_id: gid(9) })]
    #[case(EventPayload::ContributionRecorded {
        group_id: gid(9),
        member: address!("dac17f958d2ee523a2206206994597c13d831ec7"),
        new_total: U256::from(1u64),
    })]
    #[case(EventPayload::PayoutExecuted {
        group_id: gid(9),
        round: 1,
        recipient: address!("6b175474e89094c44da98b954eedeac495271d0f"),
    })]
    fn unindexed_group_compiles_to_nothing(#[case] payload: EventPayload) {
        let backend = VigilBackend::open_for_testing();
        let event = event_at(160, payload);

        let pairs = ConverterRegistry::with_default_converters().convert(&event, &backend).unwrap();

        assert!(pairs.is_empty());
        assert!(backend.group(&gid(9)).unwrap().is_none());
    }

    #[test]
    fn forbidden_transition_is_a_conversion_error() {
        // Pending -> Retired has no edge in the status machine.
        let row = GroupRow::new_pending(gid(5));
        let backend = seeded_backend(&row);
        let event = event_at(170, EventPayload::GroupRetired { group_id: gid(5) });

        let err = ConverterRegistry::with_default_converters().convert(&event, &backend).unwrap_err();

        assert_matches!(
            err,
            ConversionError::Storage(StorageError::InvalidTransition {
                from: GroupStatus::Pending,
                to: GroupStatus::Retired,
                ..
            })
        );
        assert_eq!(backend.group(&gid(5)).unwrap().unwrap(), row);
    }

    #[test]
    fn duplicate_activation_compiles_only_the_block_pair() {
        let row = GroupRow { status: GroupStatus::Active, updated_at_block: 120, ..GroupRow::new_pending(gid(6)) };
        let backend = seeded_backend(&row);
        let event = event_at(121, EventPayload::GroupActivated { group_id: gid(6) });

        let pairs = ConverterRegistry::with_default_converters().convert(&event, &backend).unwrap();

        // Active -> Active is a no-op and dropped; only updated_at_block moves.
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].forward.op, MutationOp::SetUpdatedAtBlock { from: 120, to: 121 });
    }

    #[test]
    fn empty_registry_reports_missing_converter() {
        let backend = VigilBackend::open_for_testing();
        let event = event_at(180, EventPayload::GroupActivated { group_id: gid(7) });

        let err = ConverterRegistry::default().convert(&event, &backend).unwrap_err();

        assert_matches!(err, ConversionError::NoConverter(EventKind::GroupActivated));
    }
}
