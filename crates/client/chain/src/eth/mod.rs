pub mod event;

use crate::client::{ChainProvider, TxReceiptView};
use crate::error::ChainClientError;
use crate::eth::event::convert_log;
use crate::profile::ChainProfile;
use alloy::consensus::{SignableTransaction, TxEip1559, TxEnvelope};
use alloy::eips::eip2718::Encodable2718;
use alloy::eips::eip2930::AccessList;
use alloy::eips::BlockNumberOrTag;
use alloy::network::EthereumWallet;
use alloy::primitives::{Address, TxKind, B256};
use alloy::providers::{Provider, ProviderBuilder, ReqwestProvider};
use alloy::rpc::types::Filter;
use alloy::signers::local::PrivateKeySigner;
use alloy::sol;
use async_trait::async_trait;
use std::sync::Arc;
use url::Url;
use vp_types::event::ChainEvent;
use vp_types::tx::{TxIntent, TxLog};

// Event surface of the two indexed contracts. Only events are declared here:
// vigil never calls into the contracts, it decodes their logs and submits
// pre-encoded calldata.
sol! {
    #[derive(Debug)]
    interface GroupRegistry {
        event GroupActivated(bytes32 indexed groupId);
        event GroupRetired(bytes32 indexed groupId);
    }

    #[derive(Debug)]
    interface ContributionVault {
        event ContributionRecorded(bytes32 indexed groupId, address indexed member, uint256 newTotal);
        event PayoutExecuted(bytes32 indexed groupId, uint64 round, address recipient);
    }
}

/// Gas limit applied to every broadcast. Vigil only sends calls into the
/// group contracts, which stay far below this.
const GAS_LIMIT_BROADCAST: u64 = 1_000_000;

/// Signing identity attached to an [`EthProvider`] that broadcasts.
struct BroadcastWallet {
    wallet: EthereumWallet,
    address: Address,
}

/// [`ChainProvider`] over an Ethereum JSON-RPC node.
pub struct EthProvider {
    provider: Arc<ReqwestProvider>,
    group_registry_address: Address,
    contribution_vault_address: Address,
    wallet: Option<BroadcastWallet>,
}

impl EthProvider {
    /// Connects to the node and verifies that both contracts are deployed.
    ///
    /// `private_key` is only required when this provider will broadcast
    /// transactions; a read-only provider passes `None`.
    pub async fn new(
        rpc_url: Url,
        profile: &ChainProfile,
        private_key: Option<&str>,
    ) -> Result<Self, ChainClientError> {
        let provider = ProviderBuilder::new().on_http(rpc_url);

        for (name, address) in [
            ("GroupRegistry", profile.group_registry_address),
            ("ContributionVault", profile.contribution_vault_address),
        ] {
            let code =
                provider.get_code_at(address).await.map_err(|e| ChainClientError::Rpc(e.to_string()))?;
            if code.is_empty() {
                return Err(ChainClientError::Contract(format!("{name} contract not found at {address}")));
            }
        }

        let wallet = private_key
            .map(|key| -> Result<BroadcastWallet, ChainClientError> {
                let signer: PrivateKeySigner = key
                    .parse()
                    .map_err(|e| ChainClientError::InvalidConfig(format!("invalid private key: {e}")))?;
                let address = signer.address();
                Ok(BroadcastWallet { wallet: EthereumWallet::from(signer), address })
            })
            .transpose()?;

        Ok(Self {
            provider: Arc::new(provider),
            group_registry_address: profile.group_registry_address,
            contribution_vault_address: profile.contribution_vault_address,
            wallet,
        })
    }
}

#[async_trait]
impl ChainProvider for EthProvider {
    async fn latest_block_number(&self) -> Result<u64, ChainClientError> {
        self.provider.get_block_number().await.map_err(|e| ChainClientError::Rpc(e.to_string()))
    }

    async fn fetch_events(&self, from_block: u64, to_block: u64) -> Result<Vec<ChainEvent>, ChainClientError> {
        let filter = Filter::new()
            .from_block(from_block)
            .to_block(to_block)
            .address(vec![self.group_registry_address, self.contribution_vault_address]);

        let logs = self.provider.get_logs(&filter).await.map_err(|e| ChainClientError::Rpc(e.to_string()))?;

        let mut events = Vec::with_capacity(logs.len());
        for log in &logs {
            if let Some(event) = convert_log(log)? {
                events.push(event);
            }
        }
        // eth_getLogs ordering is node-dependent; (block_number, log_index) is
        // the contract of this trait.
        events.sort_by_key(|event| (event.block_number, event.log_index));
        Ok(events)
    }

    async fn block_hash(&self, block_number: u64) -> Result<Option<B256>, ChainClientError> {
        let Some(block) = self
            .provider
            .get_block_by_number(BlockNumberOrTag::from(block_number), false)
            .await
            .map_err(|e| ChainClientError::Rpc(e.to_string()))?
        else {
            return Ok(None);
        };
        let hash = block.header.hash.ok_or(ChainClientError::MissingField("hash in Ethereum block header"))?;
        Ok(Some(hash))
    }

    async fn broadcast_transaction(&self, intent: &TxIntent) -> Result<B256, ChainClientError> {
        let broadcast = self.wallet.as_ref().ok_or(ChainClientError::NoSigner)?;

        let chain_id = self.provider.get_chain_id().await.map_err(|e| ChainClientError::Rpc(e.to_string()))?;
        let nonce = self
            .provider
            .get_transaction_count(broadcast.address)
            .await
            .map_err(|e| ChainClientError::Rpc(e.to_string()))?;
        let fees = self
            .provider
            .estimate_eip1559_fees(None)
            .await
            .map_err(|e| ChainClientError::Rpc(e.to_string()))?;

        let mut tx = TxEip1559 {
            chain_id,
            nonce,
            gas_limit: GAS_LIMIT_BROADCAST,
            max_fee_per_gas: fees.max_fee_per_gas,
            max_priority_fee_per_gas: fees.max_priority_fee_per_gas,
            to: TxKind::Call(intent.to),
            value: intent.value,
            access_list: AccessList(vec![]),
            input: intent.data.clone(),
        };

        let signature = broadcast
            .wallet
            .default_signer()
            .sign_transaction(&mut tx)
            .await
            .map_err(|e| ChainClientError::Contract(format!("failed to sign transaction: {e}")))?;
        let tx_envelope = TxEnvelope::from(tx.into_signed(signature));
        let encoded = tx_envelope.encoded_2718();

        let pending = self
            .provider
            .send_raw_transaction(encoded.as_slice())
            .await
            .map_err(|e| ChainClientError::Rpc(e.to_string()))?;

        tracing::debug!("Broadcast transaction {:#x} (nonce {nonce})", pending.tx_hash());
        Ok(*pending.tx_hash())
    }

    async fn transaction_receipt(
        &self,
        transaction_hash: B256,
    ) -> Result<Option<TxReceiptView>, ChainClientError> {
        let Some(receipt) = self
            .provider
            .get_transaction_receipt(transaction_hash)
            .await
            .map_err(|e| ChainClientError::Rpc(e.to_string()))?
        else {
            return Ok(None);
        };

        let block_number =
            receipt.block_number.ok_or(ChainClientError::MissingField("block_number in Ethereum receipt"))?;
        let logs = receipt
            .inner
            .as_receipt()
            .map(|inner| {
                inner
                    .logs
                    .iter()
                    .map(|log| TxLog {
                        address: log.inner.address,
                        topics: log.inner.data.topics().to_vec(),
                        data: log.inner.data.data.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default();

        Ok(Some(TxReceiptView {
            status: receipt.status(),
            block_number,
            gas_used: receipt.gas_used.into(),
            logs,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use vp_types::tx::TxIntent;

    fn read_only_provider() -> EthProvider {
        // The transport is lazy, so a provider can exist without a node
        // behind it. Nothing in these tests performs a network call.
        let provider = ProviderBuilder::new().on_http(Url::parse("http://localhost:1").unwrap());
        EthProvider {
            provider: Arc::new(provider),
            group_registry_address: Address::repeat_byte(0x0b),
            contribution_vault_address: Address::repeat_byte(0x36),
            wallet: None,
        }
    }

    #[tokio::test]
    async fn broadcast_without_signer_is_refused_before_any_network_call() {
        let provider = read_only_provider();
        let intent = TxIntent {
            from: Some(Address::repeat_byte(0xaa)),
            to: Address::repeat_byte(0xbb),
            value: alloy::primitives::U256::ZERO,
            data: alloy::primitives::Bytes::new(),
            on_confirm: None,
            on_failure: None,
        };
        // The RPC endpoint is unreachable: an error other than NoSigner here
        // would mean the network was touched first.
        assert_matches!(provider.broadcast_transaction(&intent).await, Err(ChainClientError::NoSigner));
    }
}
