use std::sync::Arc;
use std::time::Duration;

use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::config::FEE_POLL_INTERVAL;
use crate::network::Network;
use crate::normalize::normalize;
use crate::scheduler::TaskRegistry;
use crate::source::FeeSource;
use crate::store::FeeStore;

/// Owns one recurring poll timer per network.
///
/// Each tick runs as its own task, so a slow fetch never delays the next
/// tick and overlapping ticks for the same network are possible. Ticks only
/// merge and append, so overlap cannot lose an update.
pub struct FeePoller {
    store: FeeStore,
    interval: Duration,
    timers: TaskRegistry<Network>,
}

impl FeePoller {
    pub fn new(store: FeeStore) -> Self {
        Self::with_interval(store, FEE_POLL_INTERVAL)
    }

    pub fn with_interval(store: FeeStore, interval: Duration) -> Self {
        Self {
            store,
            interval,
            timers: TaskRegistry::new(),
        }
    }

    /// Starts polling every given network that is not already being polled.
    /// Returns the networks for which a timer was started.
    pub fn start<I>(&self, sources: I) -> Vec<Network>
    where
        I: IntoIterator<Item = (Network, Arc<dyn FeeSource>)>,
    {
        let mut started = Vec::new();
        for (network, source) in sources {
            let store = self.store.clone();
            let period = self.interval;
            if self
                .timers
                .start_if_idle(network, move || run_timer(network, source, store, period))
            {
                info!(network = %network, ?period, "fee poller started");
                started.push(network);
            }
        }
        started
    }

    pub fn is_polling(&self, network: Network) -> bool {
        self.timers.is_running(network)
    }

    /// Stops all timers. Ticks already in flight run to completion.
    pub fn stop(&self) {
        self.timers.stop_all();
    }
}

async fn run_timer(network: Network, source: Arc<dyn FeeSource>, store: FeeStore, period: Duration) {
    // First tick fires one full period after start, however long the connect takes.
    let mut ticker = time::interval_at(Instant::now() + period, period);
    tokio::spawn(open_session(network, source.clone()));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        ticker.tick().await;
        tokio::spawn(poll_once(network, source.clone(), store.clone()));
    }
}

async fn open_session(network: Network, source: Arc<dyn FeeSource>) {
    match source.connect().await {
        Ok(()) => debug!(network = %network, "upstream session ready"),
        Err(e) => warn!(network = %network, error = %e, "failed to open upstream session, next tick retries"),
    }
}

/// One poll: fetch, normalize, record. Every failure ends the tick without
/// touching the store.
pub async fn poll_once(network: Network, source: Arc<dyn FeeSource>, store: FeeStore) {
    let raw = match source.fetch_latest().await {
        Ok(Some(raw)) => raw,
        Ok(None) => {
            warn!(network = %network, "latest block data is null, skipping tick");
            return;
        }
        Err(e) => {
            warn!(network = %network, error = %e, "failed to fetch fee data");
            return;
        }
    };

    match normalize(network, &raw) {
        Ok(fees) => store.record_fees(network, fees),
        Err(e) => warn!(network = %network, error = %e, "failed to normalize fee data"),
    }
}
