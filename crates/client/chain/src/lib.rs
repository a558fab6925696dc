//! Chain access for vigil. The [`ChainProvider`] trait hides the transport;
//! [`EthProvider`] implements it over JSON-RPC, decoding `GroupRegistry` and
//! `ContributionVault` logs into [`vp_types::event::ChainEvent`]s and pushing
//! signed transactions through `eth_sendRawTransaction`.
//!
//! Everything downstream of this crate (reconciliation, lifecycle tracking)
//! only ever sees the trait, so tests run against [`MockChainProvider`]
//! (exposed under the `testing` feature) without a node.

pub mod client;
pub mod error;
pub mod eth;
pub mod profile;

pub use client::{ChainProvider, TxReceiptView};
pub use error::ChainClientError;
pub use eth::EthProvider;
pub use profile::ChainProfile;

#[cfg(any(test, feature = "testing"))]
pub use client::MockChainProvider;
