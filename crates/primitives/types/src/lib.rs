//! Plain data shared across the vigil workspace: decoded chain events, the
//! group read model, dry mutations and the transaction-lifecycle shapes.
//!
//! Nothing in this crate performs I/O. Persisted shapes all derive serde and
//! are encoded by `vc-db`.

pub mod event;
pub mod group;
pub mod ledger;
pub mod mutation;
pub mod tx;

pub use event::{Artifact, ChainEvent, EventKind, EventPayload};
pub use group::{GroupId, GroupRow, GroupStatus};
pub use ledger::BlockRollbackRecord;
pub use mutation::{Mutation, MutationOp, MutationPair};
pub use tx::{ContinuationSpec, StateConsistencyError, TxIntent, TxLog, TxRecord, TxSeqState};
