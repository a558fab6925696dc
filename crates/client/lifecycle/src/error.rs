use thiserror::Error;
use vc_db::StorageError;

/// Failure submitting a transaction. Neither variant is retried here: the
/// caller surfaces both to the owning workflow as an errored action.
#[derive(Debug, Error)]
pub enum BroadcastError {
    #[error("Transaction intent has no usable sender")]
    MissingSender,
    #[error("Transaction submission failed: {0}")]
    Submit(String),
}

#[derive(Debug, Error)]
#[error("Job queue error: {0}")]
pub struct QueueError(pub String);

#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Queue(#[from] QueueError),
}
