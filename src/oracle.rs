//! ETH/USD reference price from a CoinGecko-style `simple/price` endpoint.
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, info, warn};
use url::Url;

use crate::config::{FALLBACK_USD_PRICE, PRICE_POLL_INTERVAL};
use crate::error::PriceError;
use crate::scheduler::TaskRegistry;
use crate::store::{FeeStore, ReferencePrice};

#[derive(Debug, Deserialize)]
struct SimplePriceResponse {
    ethereum: Option<UsdQuote>,
}

#[derive(Debug, Deserialize)]
struct UsdQuote {
    usd: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct PriceOracle {
    url: Url,
    client: reqwest::Client,
}

impl PriceOracle {
    pub fn new(url: Url, client: reqwest::Client) -> Self {
        Self { url, client }
    }

    /// Never fails: any problem is logged and reported as the fallback price
    /// with `healthy = false`.
    pub async fn fetch_reference_price(&self) -> ReferencePrice {
        match self.try_fetch().await {
            Ok(value) => {
                debug!(value, "fetched reference price");
                ReferencePrice {
                    value,
                    healthy: true,
                }
            }
            Err(e @ PriceError::Value(_)) | Err(e @ PriceError::DataShape) => {
                warn!(error = %e, fallback = FALLBACK_USD_PRICE, "price not usable, using fallback");
                ReferencePrice::fallback()
            }
            Err(e) => {
                warn!(error = %e, fallback = FALLBACK_USD_PRICE, "price request failed, using fallback");
                ReferencePrice::fallback()
            }
        }
    }

    async fn try_fetch(&self) -> Result<f64, PriceError> {
        let response = self.client.get(self.url.clone()).send().await?;
        if !response.status().is_success() {
            return Err(PriceError::Status(response.status().as_u16()));
        }
        let body = response.json::<SimplePriceResponse>().await?;
        let price = body
            .ethereum
            .and_then(|quote| quote.usd)
            .ok_or(PriceError::DataShape)?;
        if !price.is_finite() || price <= 0.0 {
            return Err(PriceError::Value(price));
        }
        Ok(price)
    }
}

/// Refreshes the store's reference price immediately and then on a fixed
/// interval.
///
/// Every refresh is spawned as its own task, so a stalled request never holds
/// back later ones. Pair the oracle with a client timeout to bound how long a
/// stalled request lingers.
pub struct PriceUpdater {
    oracle: Arc<PriceOracle>,
    store: FeeStore,
    interval: Duration,
    timer: TaskRegistry<()>,
}

impl PriceUpdater {
    pub fn new(oracle: PriceOracle, store: FeeStore) -> Self {
        Self::with_interval(oracle, store, PRICE_POLL_INTERVAL)
    }

    pub fn with_interval(oracle: PriceOracle, store: FeeStore, interval: Duration) -> Self {
        Self {
            oracle: Arc::new(oracle),
            store,
            interval,
            timer: TaskRegistry::new(),
        }
    }

    /// Returns `false` if the updater was already running.
    pub fn start(&self) -> bool {
        let oracle = self.oracle.clone();
        let store = self.store.clone();
        let period = self.interval;
        let started = self
            .timer
            .start_if_idle((), move || run_timer(oracle, store, period));
        if started {
            info!(?period, "price updater started");
        }
        started
    }

    pub fn is_running(&self) -> bool {
        self.timer.is_running(())
    }

    pub fn stop(&self) {
        self.timer.stop(());
    }
}

async fn run_timer(oracle: Arc<PriceOracle>, store: FeeStore, period: Duration) {
    let mut ticker = time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        // The first tick completes immediately.
        ticker.tick().await;
        tokio::spawn(refresh_once(oracle.clone(), store.clone()));
    }
}

async fn refresh_once(oracle: Arc<PriceOracle>, store: FeeStore) {
    let price = oracle.fetch_reference_price().await;
    store.set_reference_price(price.value, price.healthy);
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::Mock;
    use httpmock::prelude::*;

    const PRICE_PATH: &str = "/api/v3/simple/price";

    fn oracle_for(server: &MockServer) -> PriceOracle {
        let url = Url::parse(&server.url(format!("{PRICE_PATH}?ids=ethereum&vs_currencies=usd")))
            .unwrap();
        PriceOracle::new(url, reqwest::Client::new())
    }

    async fn mock_body<'a>(server: &'a MockServer, status: u16, body: &str) -> Mock<'a> {
        mock_delayed(server, status, body, Duration::ZERO).await
    }

    async fn mock_delayed<'a>(
        server: &'a MockServer,
        status: u16,
        body: &str,
        delay: Duration,
    ) -> Mock<'a> {
        let body = body.to_string();
        server
            .mock_async(|when, then| {
                when.method(GET)
                    .path(PRICE_PATH)
                    .query_param("ids", "ethereum")
                    .query_param("vs_currencies", "usd");
                then.status(status).body(body).delay(delay);
            })
            .await
    }

    async fn wait_for_price(store: &FeeStore, expected: ReferencePrice) {
        for _ in 0..100 {
            if store.reference_price() == expected {
                break;
            }
            time::sleep(Duration::from_millis(20)).await;
        }
        assert_eq!(store.reference_price(), expected);
    }

    #[tokio::test]
    async fn live_price_is_healthy() {
        let server = MockServer::start_async().await;
        let body = serde_json::json!({ "ethereum": { "usd": 3012.45 } }).to_string();
        mock_body(&server, 200, &body).await;

        let price = oracle_for(&server).fetch_reference_price().await;
        assert_eq!(
            price,
            ReferencePrice {
                value: 3012.45,
                healthy: true
            }
        );
    }

    #[tokio::test]
    async fn http_error_falls_back() {
        let server = MockServer::start_async().await;
        mock_body(&server, 429, "").await;

        let oracle = oracle_for(&server);
        assert!(matches!(oracle.try_fetch().await, Err(PriceError::Status(429))));
        assert_eq!(oracle.fetch_reference_price().await, ReferencePrice::fallback());
    }

    #[tokio::test]
    async fn missing_field_falls_back() {
        let server = MockServer::start_async().await;
        mock_body(&server, 200, r#"{"ethereum":{}}"#).await;

        let oracle = oracle_for(&server);
        assert!(matches!(oracle.try_fetch().await, Err(PriceError::DataShape)));
        assert_eq!(oracle.fetch_reference_price().await, ReferencePrice::fallback());
    }

    #[tokio::test]
    async fn zero_price_falls_back() {
        let server = MockServer::start_async().await;
        mock_body(&server, 200, r#"{"ethereum":{"usd":0}}"#).await;

        let oracle = oracle_for(&server);
        assert!(matches!(oracle.try_fetch().await, Err(PriceError::Value(v)) if v == 0.0));
        assert_eq!(oracle.fetch_reference_price().await, ReferencePrice::fallback());
    }

    #[tokio::test]
    async fn malformed_body_falls_back() {
        let server = MockServer::start_async().await;
        mock_body(&server, 200, "<html>rate limited</html>").await;

        let price = oracle_for(&server).fetch_reference_price().await;
        assert_eq!(price, ReferencePrice::fallback());
    }

    #[tokio::test]
    async fn unreachable_source_falls_back() {
        // Nothing listens on port 9 (discard) in the test environment.
        let url = Url::parse("http://127.0.0.1:9/api/v3/simple/price").unwrap();
        let oracle = PriceOracle::new(url, reqwest::Client::new());
        assert_eq!(oracle.fetch_reference_price().await, ReferencePrice::fallback());
    }

    #[tokio::test]
    async fn stalled_source_times_out_to_fallback() {
        let server = MockServer::start_async().await;
        mock_delayed(&server, 200, r#"{"ethereum":{"usd":2500.0}}"#, Duration::from_secs(5)).await;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(200))
            .build()
            .unwrap();
        let oracle = PriceOracle::new(oracle_for(&server).url, client);
        assert!(matches!(oracle.try_fetch().await, Err(PriceError::Transport(_))));
        assert_eq!(oracle.fetch_reference_price().await, ReferencePrice::fallback());
    }

    #[tokio::test]
    async fn updater_refreshes_immediately_and_is_idempotent() {
        let server = MockServer::start_async().await;
        mock_body(&server, 200, r#"{"ethereum":{"usd":2500.0}}"#).await;

        let store = FeeStore::default();
        let updater = PriceUpdater::new(oracle_for(&server), store.clone());
        assert!(updater.start());
        assert!(!updater.start());
        assert!(updater.is_running());

        wait_for_price(
            &store,
            ReferencePrice {
                value: 2500.0,
                healthy: true,
            },
        )
        .await;

        updater.stop();
        assert!(!updater.is_running());
    }

    #[tokio::test]
    async fn updater_stores_fallback_when_source_fails() {
        let server = MockServer::start_async().await;
        mock_body(&server, 500, "").await;

        let store = FeeStore::default();
        store.set_reference_price(1.0, true);
        let updater = PriceUpdater::new(oracle_for(&server), store.clone());
        updater.start();

        wait_for_price(&store, ReferencePrice::fallback()).await;
        updater.stop();
    }

    #[tokio::test]
    async fn updater_keeps_refreshing_on_its_interval() {
        let server = MockServer::start_async().await;
        let first = mock_body(&server, 200, r#"{"ethereum":{"usd":2500.0}}"#).await;

        let store = FeeStore::default();
        let updater =
            PriceUpdater::with_interval(oracle_for(&server), store.clone(), Duration::from_millis(100));
        updater.start();
        wait_for_price(
            &store,
            ReferencePrice {
                value: 2500.0,
                healthy: true,
            },
        )
        .await;

        // A later refresh picks up the new quote.
        first.delete_async().await;
        let second = mock_body(&server, 200, r#"{"ethereum":{"usd":2600.0}}"#).await;
        wait_for_price(
            &store,
            ReferencePrice {
                value: 2600.0,
                healthy: true,
            },
        )
        .await;
        assert!(second.hits_async().await >= 1);
        updater.stop();
    }

    #[tokio::test]
    async fn slow_refresh_does_not_hold_back_the_next() {
        let server = MockServer::start_async().await;
        let slow = mock_delayed(
            &server,
            200,
            r#"{"ethereum":{"usd":2500.0}}"#,
            Duration::from_secs(3),
        )
        .await;

        let store = FeeStore::default();
        let updater =
            PriceUpdater::with_interval(oracle_for(&server), store.clone(), Duration::from_millis(100));
        updater.start();
        time::sleep(Duration::from_millis(750)).await;
        updater.stop();

        // No response has arrived yet, but a request went out on every tick.
        assert!(slow.hits_async().await >= 4);
        assert_eq!(store.reference_price(), ReferencePrice::fallback());
    }
}
