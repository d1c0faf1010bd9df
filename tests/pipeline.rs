//! End-to-end: timer-driven pollers feeding the store, then candles built
//! from the recorded history.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use gastrack::candles::aggregate;
use gastrack::config::{CANDLE_INTERVAL_MS, FEE_POLL_INTERVAL, PRIORITY_FEE_PLACEHOLDER_GWEI};
use gastrack::error::FetchError;
use gastrack::network::Network;
use gastrack::normalize::RawFeeData;
use gastrack::poller::FeePoller;
use gastrack::source::FeeSource;
use gastrack::store::FeeStore;

/// Reports a base fee that rises by 1 Gwei per call.
struct RisingFees {
    next_gwei: AtomicU64,
}

#[async_trait]
impl FeeSource for RisingFees {
    async fn fetch_latest(&self) -> Result<Option<RawFeeData>, FetchError> {
        let gwei = self.next_gwei.fetch_add(1, Ordering::SeqCst);
        Ok(Some(RawFeeData::Block {
            base_fee_per_gas: Some(gwei * 1_000_000_000),
        }))
    }
}

/// Times out on every call.
struct Unreachable;

#[async_trait]
impl FeeSource for Unreachable {
    async fn fetch_latest(&self) -> Result<Option<RawFeeData>, FetchError> {
        tokio::time::sleep(Duration::from_secs(2)).await;
        Err(FetchError::Transport("timed out".into()))
    }
}

#[tokio::test(start_paused = true)]
async fn polled_history_aggregates_into_candles() {
    let store = FeeStore::default();
    let poller = FeePoller::new(store.clone());
    let rising: Arc<dyn FeeSource> = Arc::new(RisingFees {
        next_gwei: AtomicU64::new(10),
    });
    let unreachable: Arc<dyn FeeSource> = Arc::new(Unreachable);

    let started = poller.start([
        (Network::Ethereum, rising.clone()),
        (Network::Arbitrum, unreachable.clone()),
    ]);
    assert_eq!(started, vec![Network::Ethereum, Network::Arbitrum]);
    assert!(poller.start([(Network::Ethereum, rising)]).is_empty());

    // Twenty ticks; sample timestamps come from the wall clock, not the paused timer.
    tokio::time::sleep(FEE_POLL_INTERVAL * 20 + Duration::from_secs(3)).await;

    let history = store.history(Network::Ethereum);
    assert_eq!(history.len(), 20);
    assert!(history.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));
    assert!(history.iter().all(|s| s.priority_fee == PRIORITY_FEE_PLACEHOLDER_GWEI));
    assert_eq!(store.current_fees(Network::Ethereum).base_fee, 29.0);

    let candles = aggregate(&history, CANDLE_INTERVAL_MS);
    assert!(!candles.is_empty());
    assert!(candles.windows(2).all(|w| w[0].interval_start < w[1].interval_start));
    assert_eq!(candles.first().map(|c| c.open), Some(10.0));
    assert_eq!(candles.last().map(|c| c.close), Some(29.0));
    for c in &candles {
        assert!(c.low <= c.open && c.open <= c.high);
        assert!(c.low <= c.close && c.close <= c.high);
    }
    assert_eq!(candles, aggregate(&history, CANDLE_INTERVAL_MS));

    assert!(store.history(Network::Arbitrum).is_empty());
    assert!(store.history(Network::Polygon).is_empty());
    poller.stop();
}
