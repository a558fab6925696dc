use crate::error::ChainClientError;
use crate::eth::{ContributionVault, GroupRegistry};
use alloy::rpc::types::Log;
use alloy::sol_types::SolEvent;
use vp_types::event::{ChainEvent, EventPayload};
use vp_types::group::GroupId;

/// Decodes one raw log into a [`ChainEvent`].
///
/// Logs whose first topic matches none of the indexed events decode to
/// `None` and are skipped by the fetch path. A log that matches a known
/// topic but fails ABI decoding is an error: the deployed contract and this
/// binary disagree on the event layout.
pub(crate) fn convert_log(log: &Log) -> Result<Option<ChainEvent>, ChainClientError> {
    let payload = match log.topic0() {
        Some(&GroupRegistry::GroupActivated::SIGNATURE_HASH) => {
            let event =
                log.log_decode::<GroupRegistry::GroupActivated>().map_err(|e| decode_error(log, e))?;
            EventPayload::GroupActivated { group_id: GroupId::from(event.inner.data.groupId) }
        }
        Some(&GroupRegistry::GroupRetired::SIGNATURE_HASH) => {
            let event = log.log_decode::<GroupRegistry::GroupRetired>().map_err(|e| decode_error(log, e))?;
            EventPayload::GroupRetired { group_id: GroupId::from(event.inner.data.groupId) }
        }
        Some(&ContributionVault::ContributionRecorded::SIGNATURE_HASH) => {
            let event = log
                .log_decode::<ContributionVault::ContributionRecorded>()
                .map_err(|e| decode_error(log, e))?;
            let data = event.inner.data;
            EventPayload::ContributionRecorded {
                group_id: GroupId::from(data.groupId),
                member: data.member,
                new_total: data.newTotal,
            }
        }
        Some(&ContributionVault::PayoutExecuted::SIGNATURE_HASH) => {
            let event =
                log.log_decode::<ContributionVault::PayoutExecuted>().map_err(|e| decode_error(log, e))?;
            let data = event.inner.data;
            EventPayload::PayoutExecuted {
                group_id: GroupId::from(data.groupId),
                round: data.round,
                recipient: data.recipient,
            }
        }
        _ => {
            tracing::debug!("Skipping log with unrecognized topic from {:#x}", log.inner.address);
            return Ok(None);
        }
    };

    Ok(Some(ChainEvent {
        block_number: log.block_number.ok_or(ChainClientError::MissingField("block_number in Ethereum log"))?,
        block_hash: log.block_hash.ok_or(ChainClientError::MissingField("block_hash in Ethereum log"))?,
        transaction_hash: log
            .transaction_hash
            .ok_or(ChainClientError::MissingField("transaction_hash in Ethereum log"))?,
        transaction_index: log
            .transaction_index
            .ok_or(ChainClientError::MissingField("transaction_index in Ethereum log"))?,
        log_index: log.log_index.ok_or(ChainClientError::MissingField("log_index in Ethereum log"))?,
        payload,
    }))
}

fn decode_error(log: &Log, e: alloy::sol_types::Error) -> ChainClientError {
    ChainClientError::EventDecode {
        message: e.to_string(),
        block_number: log.block_number.unwrap_or_default(),
    }
}
