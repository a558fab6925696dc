//! Workflow actions carrying transaction sequences.
//!
//! The action engine that owns persistence lives outside this crate; these
//! types are the contract it exchanges with the lifecycle handler. Every
//! terminal failure lands in [`TxAction::error`] as a structured
//! [`ActionError`] so downstream consumers branch on `error.error` without
//! inspecting internals.

use serde::{Deserialize, Serialize};
use uuid::Uuid;
use vp_types::TxSeqState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActionStatus {
    InProgress,
    Complete,
    Errored,
}

/// Structured terminal failure. `error` is the stable code consumers
/// branch on; `detail` carries the raw underlying message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionError {
    pub error: String,
    pub detail: Option<String>,
}

impl ActionError {
    pub fn new(error: impl Into<String>) -> Self {
        Self { error: error.into(), detail: None }
    }

    pub fn with_detail(error: impl Into<String>, detail: impl Into<String>) -> Self {
        Self { error: error.into(), detail: Some(detail.into()) }
    }
}

/// One step of a workflow, tracking a single transaction from broadcast to
/// its terminal outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxAction {
    pub id: Uuid,
    pub status: ActionStatus,
    pub data: TxSeqState,
    pub error: Option<ActionError>,
    /// Bumped on every state transition, optimistic-locking style.
    pub version: u64,
}

impl TxAction {
    pub fn new(data: TxSeqState) -> Self {
        Self { id: Uuid::new_v4(), status: ActionStatus::InProgress, data, error: None, version: 0 }
    }

    /// Records a step that changed `data` without finishing the action.
    pub fn touch(&mut self) {
        self.version += 1;
    }

    pub fn complete(&mut self) {
        self.status = ActionStatus::Complete;
        self.version += 1;
    }

    pub fn fail(&mut self, error: ActionError) {
        self.status = ActionStatus::Errored;
        self.error = Some(error);
        self.version += 1;
    }
}
