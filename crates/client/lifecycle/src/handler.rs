use crate::action::{ActionError, ActionStatus, TxAction};
use crate::broadcaster::TransactionBroadcaster;
use crate::error::LifecycleError;
use crate::poller::{ConfirmationPoller, PollVerdict};
use crate::queue::{JobQueue, JobRequest};

/// Result of driving a batch of actions one step forward.
pub struct HandleOutcome {
    pub actions: Vec<TxAction>,
    pub jobs: Vec<JobRequest>,
}

/// Drives transaction actions through broadcast and confirmation.
///
/// Each call advances every in-progress action by at most one transition:
/// not-yet-broadcast actions get broadcast, broadcast ones get polled.
/// Every terminal failure lands in the action's error slot; callers branch
/// on `error.error` for the machine-readable code.
pub struct TxLifecycleHandler {
    broadcaster: TransactionBroadcaster,
    poller: ConfirmationPoller,
}

impl TxLifecycleHandler {
    pub fn new(broadcaster: TransactionBroadcaster, poller: ConfirmationPoller) -> Self {
        Self { broadcaster, poller }
    }

    /// Steps every in-progress action once. Completed and errored actions
    /// pass through untouched; continuation jobs from resolved actions are
    /// collected for the caller to enqueue.
    pub async fn handle(&self, actions: Vec<TxAction>) -> HandleOutcome {
        let mut outcome = HandleOutcome { actions, jobs: Vec::new() };
        for action in &mut outcome.actions {
            if !matches!(action.status, ActionStatus::InProgress) {
                continue;
            }
            if let Some(job) = self.step(action).await {
                outcome.jobs.push(job);
            }
        }
        outcome
    }

    /// Steps every in-progress action once and enqueues the resulting
    /// continuation jobs. Queue failures abort the dispatch; the already
    /// mutated actions are dropped with the error, so callers retry the
    /// whole batch.
    #[tracing::instrument(skip(self, actions, queue), fields(actions = actions.len()), err)]
    pub async fn dispatch(
        &self,
        actions: Vec<TxAction>,
        queue: &dyn JobQueue,
    ) -> Result<HandleOutcome, LifecycleError> {
        let outcome = self.handle(actions).await;
        for job in &outcome.jobs {
            queue.enqueue(job.clone()).await?;
        }
        Ok(outcome)
    }

    async fn step(&self, action: &mut TxAction) -> Option<JobRequest> {
        if let Err(violation) = action.data.check_consistency() {
            action.fail(ActionError::with_detail("inconsistent_state", violation.to_string()));
            return None;
        }

        if !action.data.broadcasted {
            match self.broadcaster.broadcast_step(&mut action.data).await {
                Ok(()) => action.touch(),
                Err(e) => action.fail(ActionError::with_detail("broadcast_failed", e.to_string())),
            }
            return None;
        }

        match self.poller.poll(&action.data) {
            // Still waiting on the receipt watcher; no transition, no
            // version bump.
            PollVerdict::Unconfirmed => None,
            PollVerdict::LookupFailed(detail) => {
                action.fail(ActionError::with_detail("lookup_failed", detail));
                None
            }
            PollVerdict::NotFound => {
                action.fail(ActionError::new("transaction_not_found"));
                None
            }
            PollVerdict::Succeeded { continuation } => {
                action.complete();
                continuation
            }
            PollVerdict::Failed { continuation } => {
                action.fail(ActionError::new("transaction_failed"));
                continuation
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::MockJobQueue;
    use alloy::primitives::{address, b256, Address, Bytes, B256, U256};
    use assert_matches::assert_matches;
    use std::sync::Arc;
    use vc_chain::MockChainProvider;
    use vc_db::VigilBackend;
    use vp_types::{ContinuationSpec, TxIntent, TxRecord, TxSeqState};

    const SENDER: Address = address!("dac17f958d2ee523a2206206994597c13d831ec7");
    const RECIPIENT: Address = address!("6e76dc4dd77dca6230dd2360ab228fcc5d77b972");
    const TX_HASH: B256 =
        b256!("c5f64e8e6f96aafdcd288fa139b4ec6097e12764c9d64c1bd3d0b7ea3ce9ab87");

    fn intent(on_confirm: Option<ContinuationSpec>, on_failure: Option<ContinuationSpec>) -> TxIntent {
        TxIntent {
            from: Some(SENDER),
            to: RECIPIENT,
            value: U256::ZERO,
            data: Bytes::new(),
            on_confirm,
            on_failure,
        }
    }

    fn broadcast_action(intent: TxIntent) -> TxAction {
        let mut state = TxSeqState::new(intent);
        state.mark_broadcasted(TX_HASH);
        TxAction::new(state)
    }

    fn record(confirmed: bool, status: bool) -> TxRecord {
        TxRecord {
            transaction_hash: TX_HASH,
            confirmed,
            status,
            block_number: 117,
            gas_used: 21_000,
            logs: vec![],
        }
    }

    fn handler(provider: MockChainProvider, backend: &Arc<VigilBackend>) -> TxLifecycleHandler {
        TxLifecycleHandler::new(
            TransactionBroadcaster::new(Arc::new(provider)).with_watch_registry(Arc::clone(backend)),
            ConfirmationPoller::new(Arc::clone(backend)),
        )
    }

    #[tokio::test]
    async fn fresh_action_is_broadcast_exactly_once() {
        let backend = VigilBackend::open_for_testing();
        let mut provider = MockChainProvider::new();
        provider.expect_broadcast_transaction().times(1).returning(|_| Ok(TX_HASH));

        let handler = handler(provider, &backend);
        let action = TxAction::new(TxSeqState::new(intent(None, None)));
        let outcome = handler.handle(vec![action]).await;

        let action = &outcome.actions[0];
        assert!(action.data.broadcasted);
        assert_eq!(action.data.transaction_hash, Some(TX_HASH));
        assert_matches!(action.status, ActionStatus::InProgress);
        assert_eq!(action.version, 1);
        assert!(outcome.jobs.is_empty());
    }

    #[tokio::test]
    async fn unconfirmed_action_is_left_untouched() {
        let backend = VigilBackend::open_for_testing();
        backend.put_tx_record(&record(false, false)).unwrap();

        let handler = handler(MockChainProvider::new(), &backend);
        let outcome = handler.handle(vec![broadcast_action(intent(None, None))]).await;

        let action = &outcome.actions[0];
        assert_matches!(action.status, ActionStatus::InProgress);
        assert_eq!(action.version, 0);
        assert!(action.error.is_none());
    }

    #[tokio::test]
    async fn missing_record_errors_as_transaction_not_found() {
        let backend = VigilBackend::open_for_testing();
        let handler = handler(MockChainProvider::new(), &backend);

        let outcome = handler.handle(vec![broadcast_action(intent(None, None))]).await;

        let action = &outcome.actions[0];
        assert_matches!(action.status, ActionStatus::Errored);
        assert_eq!(action.error.as_ref().unwrap().error, "transaction_not_found");
    }

    #[tokio::test]
    async fn confirmed_success_completes_and_yields_the_confirm_job() {
        let backend = VigilBackend::open_for_testing();
        backend.put_tx_record(&record(true, true)).unwrap();

        let on_confirm = ContinuationSpec {
            job_name: "settle".to_string(),
            job_data: serde_json::json!({ "round": 4 }),
        };
        let handler = handler(MockChainProvider::new(), &backend);
        let outcome = handler.handle(vec![broadcast_action(intent(Some(on_confirm), None))]).await;

        assert_matches!(outcome.actions[0].status, ActionStatus::Complete);
        assert_eq!(outcome.jobs.len(), 1);
        assert_eq!(outcome.jobs[0].job_name, "settle");
        assert_eq!(outcome.jobs[0].payload["transactionHash"], format!("{TX_HASH:#x}"));
    }

    #[tokio::test]
    async fn reverted_transaction_errors_and_dispatches_the_failure_job() {
        let backend = VigilBackend::open_for_testing();
        backend.put_tx_record(&record(true, false)).unwrap();

        let on_failure = ContinuationSpec {
            job_name: "failure".to_string(),
            job_data: serde_json::json!({ "status": "failure" }),
        };
        let handler = handler(MockChainProvider::new(), &backend);

        let mut queue = MockJobQueue::new();
        queue
            .expect_enqueue()
            .times(1)
            .withf(|job| {
                job.job_name == "failure"
                    && job.payload
                        == serde_json::json!({
                            "status": "failure",
                            "transactionHash": format!("{TX_HASH:#x}"),
                        })
            })
            .returning(|_| Ok(()));

        let outcome = handler
            .dispatch(vec![broadcast_action(intent(None, Some(on_failure)))], &queue)
            .await
            .unwrap();

        let action = &outcome.actions[0];
        assert_matches!(action.status, ActionStatus::Errored);
        assert_eq!(action.error.as_ref().unwrap().error, "transaction_failed");
    }

    #[tokio::test]
    async fn terminal_failure_without_a_continuation_enqueues_nothing() {
        let backend = VigilBackend::open_for_testing();

        let handler = handler(MockChainProvider::new(), &backend);
        let mut queue = MockJobQueue::new();
        queue.expect_enqueue().times(0);

        let outcome =
            handler.dispatch(vec![broadcast_action(intent(None, None))], &queue).await.unwrap();

        assert_eq!(outcome.actions[0].error.as_ref().unwrap().error, "transaction_not_found");
        assert!(outcome.jobs.is_empty());
    }

    #[tokio::test]
    async fn inconsistent_state_is_failed_without_touching_the_chain() {
        let backend = VigilBackend::open_for_testing();
        let mut provider = MockChainProvider::new();
        provider.expect_broadcast_transaction().times(0);

        // Broadcasted with no hash: the consistency check has to catch
        // this before any broadcast or poll.
        let mut state = TxSeqState::new(intent(None, None));
        state.broadcasted = true;

        let handler = handler(provider, &backend);
        let outcome = handler.handle(vec![TxAction::new(state)]).await;

        let action = &outcome.actions[0];
        assert_matches!(action.status, ActionStatus::Errored);
        assert_eq!(action.error.as_ref().unwrap().error, "inconsistent_state");
    }

    #[tokio::test]
    async fn failed_broadcast_errors_the_action_with_the_detail() {
        let backend = VigilBackend::open_for_testing();
        let mut provider = MockChainProvider::new();
        provider
            .expect_broadcast_transaction()
            .returning(|_| Err(vc_chain::ChainClientError::Rpc("gas estimation failed".into())));

        let handler = handler(provider, &backend);
        let outcome = handler.handle(vec![TxAction::new(TxSeqState::new(intent(None, None)))]).await;

        let action = &outcome.actions[0];
        assert_matches!(action.status, ActionStatus::Errored);
        let error = action.error.as_ref().unwrap();
        assert_eq!(error.error, "broadcast_failed");
        assert!(error.detail.as_ref().unwrap().contains("gas estimation failed"));
    }

    #[tokio::test]
    async fn terminal_actions_pass_through_untouched() {
        let backend = VigilBackend::open_for_testing();
        let mut provider = MockChainProvider::new();
        provider.expect_broadcast_transaction().times(0);

        let mut completed = broadcast_action(intent(None, None));
        completed.complete();
        let mut errored = TxAction::new(TxSeqState::new(intent(None, None)));
        errored.fail(ActionError::new("transaction_failed"));

        let handler = handler(provider, &backend);
        let outcome = handler.handle(vec![completed, errored]).await;

        assert_matches!(outcome.actions[0].status, ActionStatus::Complete);
        assert_matches!(outcome.actions[1].status, ActionStatus::Errored);
        assert_eq!(outcome.actions[0].version, 1);
        assert_eq!(outcome.actions[1].version, 1);
    }

    #[tokio::test]
    async fn queue_failure_aborts_the_dispatch() {
        let backend = VigilBackend::open_for_testing();
        backend.put_tx_record(&record(true, true)).unwrap();

        let on_confirm = ContinuationSpec {
            job_name: "settle".to_string(),
            job_data: serde_json::json!({}),
        };
        let handler = handler(MockChainProvider::new(), &backend);

        let mut queue = MockJobQueue::new();
        queue
            .expect_enqueue()
            .returning(|_| Err(crate::error::QueueError("queue unavailable".to_string())));

        let err = handler
            .dispatch(vec![broadcast_action(intent(Some(on_confirm), None))], &queue)
            .await
            .unwrap_err();

        assert_matches!(err, LifecycleError::Queue(_));
    }
}
