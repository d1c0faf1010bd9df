use alloy::eips::BlockNumberOrTag;
use alloy::providers::WsConnect;
use alloy::sol;
use alloy_primitives::{Address, Bytes};
use alloy_provider::{DynProvider, Provider as ProviderTrait, ProviderBuilder};
use async_trait::async_trait;
use tokio::sync::OnceCell;
use tracing::{debug, info};
use url::Url;

use crate::config::NODE_INTERFACE_ADDRESS;
use crate::error::FetchError;
use crate::network::{FeeSourceKind, Network};
use crate::normalize::RawFeeData;

sol! {
    #[sol(rpc)]
    interface NodeInterface {
        function gasEstimateComponents(address to, bool contractCreation, bytes calldata data)
            external
            view
            returns (uint64 gasEstimate, uint64 gasEstimateForL1, uint256 baseFee, uint256 l1BaseFeeEstimate);
    }
}

/// Upstream of fee data for a single network.
///
/// `Ok(None)` means the upstream answered but had nothing to report (e.g. a
/// null latest block); the tick is skipped without it counting as an error.
#[async_trait]
pub trait FeeSource: Send + Sync {
    /// Opens the upstream session ahead of the first fetch. Sources without a
    /// session have nothing to do.
    async fn connect(&self) -> Result<(), FetchError> {
        Ok(())
    }

    async fn fetch_latest(&self) -> Result<Option<RawFeeData>, FetchError>;
}

/// WebSocket JSON-RPC source. The session is opened by `connect` (or the first
/// fetch, if that failed) and reused afterwards; reconnects are left to the
/// transport.
pub struct RpcFeeSource {
    network: Network,
    url: Url,
    provider: OnceCell<DynProvider>,
}

impl RpcFeeSource {
    pub fn new(network: Network, url: Url) -> Self {
        Self {
            network,
            url,
            provider: OnceCell::new(),
        }
    }

    async fn provider(&self) -> Result<&DynProvider, FetchError> {
        self.provider
            .get_or_try_init(|| async {
                info!(network = %self.network, url = %self.url, "opening upstream session");
                let provider = ProviderBuilder::new()
                    .disable_recommended_fillers()
                    .connect_ws(WsConnect::new(self.url.as_str()))
                    .await?;
                Ok::<_, FetchError>(provider.erased())
            })
            .await
    }
}

#[async_trait]
impl FeeSource for RpcFeeSource {
    async fn connect(&self) -> Result<(), FetchError> {
        self.provider().await.map(|_| ())
    }

    async fn fetch_latest(&self) -> Result<Option<RawFeeData>, FetchError> {
        let provider = self.provider().await?;

        let Some(block) = provider
            .get_block_by_number(BlockNumberOrTag::Latest)
            .await?
        else {
            return Ok(None);
        };
        debug!(network = %self.network, number = block.header.number, "fetched latest block");

        match self.network.fee_source() {
            FeeSourceKind::BlockBaseFee => Ok(Some(RawFeeData::Block {
                base_fee_per_gas: block.header.base_fee_per_gas,
            })),
            FeeSourceKind::NodeInterface => {
                let node_interface = NodeInterface::new(NODE_INTERFACE_ADDRESS, provider.clone());
                let components = node_interface
                    .gasEstimateComponents(Address::ZERO, false, Bytes::new())
                    .call()
                    .await?;
                Ok(Some(RawFeeData::GasEstimate {
                    base_fee: Some(components.baseFee),
                    priority_fee: None,
                }))
            }
        }
    }
}
