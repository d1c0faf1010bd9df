//! Shared state of the tracker: current fees and sample history per network,
//! the reference price, and the UI selection. Every write is a single
//! critical section, so readers never observe a half-applied update.
use std::collections::BTreeMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::Serialize;
use tracing::warn;

use crate::config::FALLBACK_USD_PRICE;
use crate::network::Network;
use crate::normalize::FeeSnapshot;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FeeSample {
    /// Unix milliseconds
    pub timestamp: u64,
    pub base_fee: f64,
    pub priority_fee: f64,
}

impl FeeSample {
    pub fn new(timestamp: u64, fees: FeeSnapshot) -> Self {
        Self {
            timestamp,
            base_fee: fees.base_fee,
            priority_fee: fees.priority_fee,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NetworkFeeState {
    pub base_fee: f64,
    pub priority_fee: f64,
    /// Append-only, oldest first. Grows without bound.
    pub history: Vec<FeeSample>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ReferencePrice {
    pub value: f64,
    /// `false` when `value` is the built-in fallback rather than a live quote.
    pub healthy: bool,
}

impl ReferencePrice {
    pub fn fallback() -> Self {
        Self {
            value: FALLBACK_USD_PRICE,
            healthy: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[default]
    Live,
    Simulation,
}

/// Field-level fee update; `None` leaves the current value untouched.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FeeUpdate {
    pub base_fee: Option<f64>,
    pub priority_fee: Option<f64>,
}

impl From<FeeSnapshot> for FeeUpdate {
    fn from(fees: FeeSnapshot) -> Self {
        Self {
            base_fee: Some(fees.base_fee),
            priority_fee: Some(fees.priority_fee),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AppSnapshot {
    pub networks: BTreeMap<Network, NetworkFeeState>,
    pub price: ReferencePrice,
    pub selected: Network,
    pub mode: Mode,
}

impl AppSnapshot {
    fn new(selected: Network) -> Self {
        Self {
            networks: Network::ALL
                .into_iter()
                .map(|n| (n, NetworkFeeState::default()))
                .collect(),
            price: ReferencePrice::fallback(),
            selected,
            mode: Mode::default(),
        }
    }

    pub fn network(&self, network: Network) -> Option<&NetworkFeeState> {
        self.networks.get(&network)
    }

    fn network_mut(&mut self, network: Network) -> &mut NetworkFeeState {
        self.networks.entry(network).or_default()
    }
}

/// Cloneable handle to the process-wide state.
#[derive(Debug, Clone)]
pub struct FeeStore {
    inner: Arc<RwLock<AppSnapshot>>,
}

impl Default for FeeStore {
    fn default() -> Self {
        Self::new(Network::Ethereum)
    }
}

impl FeeStore {
    pub fn new(selected: Network) -> Self {
        Self {
            inner: Arc::new(RwLock::new(AppSnapshot::new(selected))),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, AppSnapshot> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, AppSnapshot> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn set_mode(&self, mode: Mode) {
        self.write().mode = mode;
    }

    pub fn set_selected_network(&self, network: Network) {
        self.write().selected = network;
    }

    pub fn update_current_fees(&self, network: Network, update: FeeUpdate) {
        let mut state = self.write();
        let entry = state.network_mut(network);
        if let Some(base) = update.base_fee {
            entry.base_fee = clamp_fee(network, "base_fee", base);
        }
        if let Some(priority) = update.priority_fee {
            entry.priority_fee = clamp_fee(network, "priority_fee", priority);
        }
    }

    /// Appends to the network's history. A sample older than the last one is
    /// stamped with the last timestamp so the history stays ordered.
    pub fn append_sample(&self, network: Network, sample: FeeSample) {
        let mut state = self.write();
        push_sample(network, state.network_mut(network), sample);
    }

    /// Updates current fees and appends a sample stamped with the current
    /// time, under a single write lock.
    pub fn record_fees(&self, network: Network, fees: FeeSnapshot) {
        let mut state = self.write();
        let entry = state.network_mut(network);
        entry.base_fee = clamp_fee(network, "base_fee", fees.base_fee);
        entry.priority_fee = clamp_fee(network, "priority_fee", fees.priority_fee);
        let sample = FeeSample {
            timestamp: unix_millis(),
            base_fee: entry.base_fee,
            priority_fee: entry.priority_fee,
        };
        push_sample(network, entry, sample);
    }

    /// Replaces the reference price. Non-positive or non-finite values are
    /// ignored so the stored price always stays usable.
    pub fn set_reference_price(&self, value: f64, healthy: bool) {
        if !(value.is_finite() && value > 0.0) {
            warn!(value, "refusing to store unusable reference price");
            return;
        }
        self.write().price = ReferencePrice { value, healthy };
    }

    pub fn snapshot(&self) -> AppSnapshot {
        self.read().clone()
    }

    pub fn history(&self, network: Network) -> Vec<FeeSample> {
        self.read()
            .network(network)
            .map(|s| s.history.clone())
            .unwrap_or_default()
    }

    pub fn current_fees(&self, network: Network) -> FeeSnapshot {
        self.read()
            .network(network)
            .map(|s| FeeSnapshot {
                base_fee: s.base_fee,
                priority_fee: s.priority_fee,
            })
            .unwrap_or_default()
    }

    pub fn reference_price(&self) -> ReferencePrice {
        self.read().price
    }

    pub fn mode(&self) -> Mode {
        self.read().mode
    }

    pub fn selected_network(&self) -> Network {
        self.read().selected
    }

    #[cfg(test)]
    pub fn reset(&self) {
        let selected = self.read().selected;
        *self.write() = AppSnapshot::new(selected);
    }
}

fn push_sample(network: Network, entry: &mut NetworkFeeState, mut sample: FeeSample) {
    if let Some(last) = entry.history.last() {
        if sample.timestamp < last.timestamp {
            warn!(
                network = %network,
                sample = sample.timestamp,
                last = last.timestamp,
                "sample older than history tail, restamping"
            );
            sample.timestamp = last.timestamp;
        }
    }
    sample.base_fee = clamp_fee(network, "base_fee", sample.base_fee);
    sample.priority_fee = clamp_fee(network, "priority_fee", sample.priority_fee);
    entry.history.push(sample);
}

fn clamp_fee(network: Network, field: &'static str, value: f64) -> f64 {
    if value.is_finite() && value >= 0.0 {
        value
    } else {
        warn!(network = %network, field, value, "fee outside valid range, storing 0");
        0.0
    }
}

pub fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
