//! Configuration parameters for the gas tracker
use std::{path::PathBuf, time::Duration};

use alloy_primitives::{Address, address};
use clap::Parser;
use url::Url;

use crate::network::Network;

/// How often each network's latest fee data is polled
pub const FEE_POLL_INTERVAL: Duration = Duration::from_secs(6);

/// How often the reference price is refreshed
pub const PRICE_POLL_INTERVAL: Duration = Duration::from_secs(30);

/// Upper bound on a single price request, so a stalled source reports as unhealthy
pub const PRICE_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Width of one chart candle in milliseconds
pub const CANDLE_INTERVAL_MS: u64 = 60 * 1000;

/// ETH/USD value reported when the price source is unavailable
pub const FALLBACK_USD_PRICE: f64 = 3735.87;

/// Priority fee reported for base-fee networks (Gwei). Not a live estimate.
pub const PRIORITY_FEE_PLACEHOLDER_GWEI: f64 = 2.0;

/// Wei per Gwei
pub const WEI_PER_GWEI: f64 = 1e9;

/// Arbitrum's NodeInterface precompile, used for gas estimate components
pub const NODE_INTERFACE_ADDRESS: Address = address!("0x00000000000000000000000000000000000000c8");

// ========================= SIMULATION =========================
/// Gas used by a plain value transfer
pub const SIMULATION_GAS_LIMIT: u64 = 21_000;

// ========================= UI =========================
/// Redraw cadence of the dashboard
pub const UI_REFRESH: Duration = Duration::from_millis(100);

pub const DEFAULT_ETHEREUM_URL: &str = "wss://ethereum-rpc.publicnode.com";
pub const DEFAULT_POLYGON_URL: &str = "wss://polygon-bor-rpc.publicnode.com";
pub const DEFAULT_ARBITRUM_URL: &str = "wss://arbitrum-one-rpc.publicnode.com";
pub const DEFAULT_PRICE_URL: &str =
    "https://api.coingecko.com/api/v3/simple/price?ids=ethereum&vs_currencies=usd";

/// Command line / environment configuration.
#[derive(Debug, Clone, Parser)]
#[command(name = "gastrack", about = "Multi-network gas fee tracker")]
pub struct Cli {
    /// Ethereum mainnet WebSocket endpoint
    #[arg(long, env = "ETHEREUM_WSS_URL", default_value = DEFAULT_ETHEREUM_URL)]
    pub ethereum_url: Url,

    /// Polygon PoS WebSocket endpoint
    #[arg(long, env = "POLYGON_WSS_URL", default_value = DEFAULT_POLYGON_URL)]
    pub polygon_url: Url,

    /// Arbitrum One WebSocket endpoint
    #[arg(long, env = "ARBITRUM_WSS_URL", default_value = DEFAULT_ARBITRUM_URL)]
    pub arbitrum_url: Url,

    /// Reference price endpoint (CoinGecko simple price shape)
    #[arg(long, env = "PRICE_API_URL", default_value = DEFAULT_PRICE_URL)]
    pub price_url: Url,

    /// Network shown in the chart at startup
    #[arg(long, value_enum, default_value_t = Network::Ethereum)]
    pub network: Network,

    /// File receiving log output (stdout belongs to the dashboard)
    #[arg(long, env = "GASTRACK_LOG_FILE", default_value = "gastrack.log")]
    pub log_file: PathBuf,
}

impl Cli {
    pub fn endpoint(&self, network: Network) -> &Url {
        match network {
            Network::Ethereum => &self.ethereum_url,
            Network::Polygon => &self.polygon_url,
            Network::Arbitrum => &self.arbitrum_url,
        }
    }
}
