use std::borrow::Cow;
use vp_types::{GroupId, GroupStatus};

#[derive(thiserror::Error, Debug)]
pub enum StorageError {
    #[error("Rocksdb error: {0:#}")]
    RocksDB(#[from] rocksdb::Error),
    #[error("Bincode error: {0}")]
    Bincode(#[from] bincode::Error),
    #[error("Inconsistent storage: {0}")]
    InconsistentStorage(Cow<'static, str>),
    #[error("Watermark conflict: expected {expected:?}, found {found:?}")]
    WatermarkConflict { expected: Option<u64>, found: Option<u64> },
    #[error("Group {group_id} cannot transition from {from} to {to}")]
    InvalidTransition { group_id: GroupId, from: GroupStatus, to: GroupStatus },
    #[error("Unknown group {0}")]
    MissingGroup(GroupId),
}
