use crate::error::QueueError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Continuation descriptor: the job to run next and its payload. Emitted
/// by the confirmation poller, enqueued by the handler layer; the poller
/// itself never touches a queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobRequest {
    pub job_name: String,
    pub payload: serde_json::Value,
}

#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait JobQueue: Send + Sync {
    async fn enqueue(&self, job: JobRequest) -> Result<(), QueueError>;
}

/// Process-local queue over an unbounded channel, for tests and the dev
/// node wiring.
pub struct MemoryJobQueue {
    sender: tokio::sync::mpsc::UnboundedSender<JobRequest>,
}

impl MemoryJobQueue {
    pub fn new() -> (Self, tokio::sync::mpsc::UnboundedReceiver<JobRequest>) {
        let (sender, receiver) = tokio::sync::mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

#[async_trait]
impl JobQueue for MemoryJobQueue {
    async fn enqueue(&self, job: JobRequest) -> Result<(), QueueError> {
        self.sender.send(job).map_err(|e| QueueError(format!("channel closed: {e}")))
    }
}
