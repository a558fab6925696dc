//! Transaction lifecycle tracking for vigil.
//!
//! A workflow hands the [`TxLifecycleHandler`] a batch of [`TxAction`]s and
//! gets each one stepped forward by a single transition per call: broadcast
//! first, then poll until the [`ReceiptWatcher`] has resolved the hash into
//! a confirmation record. Terminal outcomes fire the intent's continuation
//! as a [`JobRequest`] on the configured [`JobQueue`].
//!
//! Polling never queries the chain. The watcher sweeps the watched-hash set
//! in the background and persists [`vp_types::TxRecord`]s; pollers only read
//! the local store, so a slow RPC endpoint stalls confirmation latency but
//! never a handler pass.

pub mod action;
pub mod broadcaster;
pub mod error;
pub mod handler;
pub mod poller;
pub mod queue;
pub mod watcher;

pub use action::{ActionError, ActionStatus, TxAction};
pub use broadcaster::TransactionBroadcaster;
pub use error::{BroadcastError, LifecycleError, QueueError};
pub use handler::{HandleOutcome, TxLifecycleHandler};
pub use poller::{ConfirmationPoller, PollVerdict};
pub use queue::{JobQueue, JobRequest, MemoryJobQueue};
pub use watcher::{ReceiptWatcher, ReceiptWatcherConfig};

#[cfg(any(test, feature = "testing"))]
pub use queue::MockJobQueue;
