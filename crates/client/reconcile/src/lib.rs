//! Event reconciliation for vigil.
//!
//! Chain events compile into forward/rollback [`vp_types::MutationPair`]s
//! through the converter registry, the scheduler commits them one block at
//! a time (mutations, rollback record and watermark in a single batch) and
//! the reorg resolver undoes orphaned blocks from the rollback ledger when
//! the chain revises history.

pub mod converter;
pub mod error;
pub mod reorg;
pub mod scheduler;

pub use converter::{ConverterRegistry, EventConverter};
pub use error::{ConversionError, ReconcileError};
pub use reorg::ReorgResolver;
pub use scheduler::{ReconcileConfig, ReconcileScheduler};
