use crate::queue::JobRequest;
use alloy::primitives::B256;
use std::sync::Arc;
use vc_db::VigilBackend;
use vp_types::{ContinuationSpec, TxSeqState};

/// Outcome of one confirmation poll over a broadcast transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollVerdict {
    /// The backend lookup itself failed; the detail is the storage error.
    LookupFailed(String),
    /// No record yet. The receipt watcher has not resolved the hash.
    NotFound,
    /// A record exists but the transaction is not confirmed yet.
    Unconfirmed,
    /// Confirmed with a successful execution status.
    Succeeded { continuation: Option<JobRequest> },
    /// Confirmed but the execution reverted.
    Failed { continuation: Option<JobRequest> },
}

/// Reads confirmation state for broadcast transactions out of the local
/// transaction store. Polling never touches the chain; the receipt watcher
/// is the only writer of confirmation records.
pub struct ConfirmationPoller {
    backend: Arc<VigilBackend>,
}

impl ConfirmationPoller {
    pub fn new(backend: Arc<VigilBackend>) -> Self {
        Self { backend }
    }

    /// Maps the stored record for `state`'s hash to a verdict, resolving
    /// the matching continuation spec into a ready-to-enqueue job.
    pub fn poll(&self, state: &TxSeqState) -> PollVerdict {
        let Some(transaction_hash) = state.transaction_hash else {
            return PollVerdict::LookupFailed("transaction sequence has no hash to poll".into());
        };

        let record = match self.backend.tx_record(&transaction_hash) {
            Ok(record) => record,
            Err(e) => return PollVerdict::LookupFailed(e.to_string()),
        };
        let Some(record) = record else {
            return PollVerdict::NotFound;
        };
        if !record.confirmed {
            return PollVerdict::Unconfirmed;
        }

        if record.status {
            PollVerdict::Succeeded {
                continuation: continuation_job(state.transaction.on_confirm.as_ref(), &transaction_hash),
            }
        } else {
            PollVerdict::Failed {
                continuation: continuation_job(state.transaction.on_failure.as_ref(), &transaction_hash),
            }
        }
    }
}

/// Builds the continuation job for a resolved transaction, stamping the
/// transaction hash into the payload under the `transactionHash` key so
/// downstream consumers can correlate without re-reading the sequence.
fn continuation_job(spec: Option<&ContinuationSpec>, transaction_hash: &B256) -> Option<JobRequest> {
    let spec = spec?;
    let hash = serde_json::json!(format!("{transaction_hash:#x}"));
    let mut payload = spec.job_data.clone();
    match payload.as_object_mut() {
        Some(object) => {
            object.insert("transactionHash".to_string(), hash);
        }
        // Non-object payloads cannot take the extra key; replace them
        // rather than dropping the correlation hash.
        None => payload = serde_json::json!({ "transactionHash": hash }),
    }
    Some(JobRequest { job_name: spec.job_name.clone(), payload })
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::{Address, Bytes, U256};
    use assert_matches::assert_matches;
    use vp_types::{TxIntent, TxRecord};

    fn intent_with_continuations() -> TxIntent {
        TxIntent {
            from: Some(Address::repeat_byte(0xaa)),
            to: Address::repeat_byte(0xbb),
            value: U256::ZERO,
            data: Bytes::new(),
            on_confirm: Some(ContinuationSpec {
                job_name: "settle".to_string(),
                job_data: serde_json::json!({ "round": 4 }),
            }),
            on_failure: Some(ContinuationSpec {
                job_name: "retry".to_string(),
                job_data: serde_json::json!({ "attempt": 1 }),
            }),
        }
    }

    fn broadcast_state(hash: B256) -> TxSeqState {
        let mut state = TxSeqState::new(intent_with_continuations());
        state.mark_broadcasted(hash);
        state
    }

    fn record(hash: B256, confirmed: bool, status: bool) -> TxRecord {
        TxRecord {
            transaction_hash: hash,
            confirmed,
            status,
            block_number: 117,
            gas_used: 21_000,
            logs: vec![],
        }
    }

    #[test]
    fn polling_without_a_hash_is_a_lookup_failure() {
        let backend = VigilBackend::open_for_testing();
        let poller = ConfirmationPoller::new(backend);

        let verdict = poller.poll(&TxSeqState::new(intent_with_continuations()));

        assert_matches!(verdict, PollVerdict::LookupFailed(detail) if detail.contains("no hash"));
    }

    #[test]
    fn missing_record_reports_not_found() {
        let backend = VigilBackend::open_for_testing();
        let poller = ConfirmationPoller::new(backend);

        let verdict = poller.poll(&broadcast_state(B256::repeat_byte(0xc5)));

        assert_eq!(verdict, PollVerdict::NotFound);
    }

    #[test]
    fn unconfirmed_record_reports_unconfirmed() {
        let backend = VigilBackend::open_for_testing();
        let hash = B256::repeat_byte(0xc5);
        backend.put_tx_record(&record(hash, false, false)).unwrap();

        let verdict = ConfirmationPoller::new(backend).poll(&broadcast_state(hash));

        assert_eq!(verdict, PollVerdict::Unconfirmed);
    }

    #[test]
    fn success_resolves_the_confirm_continuation_with_the_hash_stamped_in() {
        let backend = VigilBackend::open_for_testing();
        let hash = B256::repeat_byte(0xc5);
        backend.put_tx_record(&record(hash, true, true)).unwrap();

        let verdict = ConfirmationPoller::new(backend).poll(&broadcast_state(hash));

        let PollVerdict::Succeeded { continuation: Some(job) } = verdict else {
            panic!("expected a succeeded verdict with a continuation, got {verdict:?}");
        };
        assert_eq!(job.job_name, "settle");
        assert_eq!(
            job.payload,
            serde_json::json!({ "round": 4, "transactionHash": format!("{hash:#x}") })
        );
    }

    #[test]
    fn revert_resolves_the_failure_continuation() {
        let backend = VigilBackend::open_for_testing();
        let hash = B256::repeat_byte(0xc5);
        backend.put_tx_record(&record(hash, true, false)).unwrap();

        let verdict = ConfirmationPoller::new(backend).poll(&broadcast_state(hash));

        let PollVerdict::Failed { continuation: Some(job) } = verdict else {
            panic!("expected a failed verdict with a continuation, got {verdict:?}");
        };
        assert_eq!(job.job_name, "retry");
        assert_eq!(job.payload["attempt"], 1);
        assert_eq!(job.payload["transactionHash"], format!("{hash:#x}"));
    }

    #[test]
    fn missing_continuation_spec_resolves_to_no_job() {
        let backend = VigilBackend::open_for_testing();
        let hash = B256::repeat_byte(0xc5);
        backend.put_tx_record(&record(hash, true, true)).unwrap();

        let mut state = TxSeqState::new(TxIntent {
            on_confirm: None,
            ..intent_with_continuations()
        });
        state.mark_broadcasted(hash);

        let verdict = ConfirmationPoller::new(backend).poll(&state);

        assert_eq!(verdict, PollVerdict::Succeeded { continuation: None });
    }

    #[test]
    fn non_object_payload_is_replaced_by_the_hash_object() {
        let hash = B256::repeat_byte(0xc5);
        let spec = ContinuationSpec {
            job_name: "notify".to_string(),
            job_data: serde_json::json!("plain string"),
        };

        let job = continuation_job(Some(&spec), &hash).unwrap();

        assert_eq!(job.payload, serde_json::json!({ "transactionHash": format!("{hash:#x}") }));
    }
}
