use std::fmt;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Networks whose fees are tracked. Adding a variant here (plus an endpoint in
/// `config::Cli`) is all a new chain needs.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    Ethereum,
    Polygon,
    Arbitrum,
}

/// Where a network's base fee comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeeSourceKind {
    /// EIP-1559 `baseFeePerGas` on the latest block.
    BlockBaseFee,
    /// Arbitrum `NodeInterface.gasEstimateComponents` helper call.
    NodeInterface,
}

impl Network {
    pub const ALL: [Network; 3] = [Network::Ethereum, Network::Polygon, Network::Arbitrum];

    pub fn display_name(self) -> &'static str {
        match self {
            Network::Ethereum => "Ethereum",
            Network::Polygon => "Polygon",
            Network::Arbitrum => "Arbitrum",
        }
    }

    pub fn fee_source(self) -> FeeSourceKind {
        match self {
            Network::Ethereum | Network::Polygon => FeeSourceKind::BlockBaseFee,
            Network::Arbitrum => FeeSourceKind::NodeInterface,
        }
    }

    /// Next network in display order, wrapping around.
    pub fn next(self) -> Network {
        let idx = Self::ALL.iter().position(|n| *n == self).unwrap_or(0);
        Self::ALL[(idx + 1) % Self::ALL.len()]
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let id = match self {
            Network::Ethereum => "ethereum",
            Network::Polygon => "polygon",
            Network::Arbitrum => "arbitrum",
        };
        f.write_str(id)
    }
}
