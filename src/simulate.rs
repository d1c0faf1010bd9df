//! Estimated USD cost of a plain transfer on a network at current fees.
use crate::config::{SIMULATION_GAS_LIMIT, WEI_PER_GWEI};
use crate::network::Network;
use crate::store::AppSnapshot;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransactionKind {
    #[default]
    Eth,
    Matic,
    EthArbitrum,
}

impl TransactionKind {
    pub const ALL: [TransactionKind; 3] = [
        TransactionKind::Eth,
        TransactionKind::Matic,
        TransactionKind::EthArbitrum,
    ];

    pub fn network(self) -> Network {
        match self {
            TransactionKind::Eth => Network::Ethereum,
            TransactionKind::Matic => Network::Polygon,
            TransactionKind::EthArbitrum => Network::Arbitrum,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            TransactionKind::Eth => "ETH",
            TransactionKind::Matic => "MATIC",
            TransactionKind::EthArbitrum => "ETH (Arbitrum)",
        }
    }

    pub fn next(self) -> TransactionKind {
        let idx = Self::ALL.iter().position(|k| *k == self).unwrap_or(0);
        Self::ALL[(idx + 1) % Self::ALL.len()]
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimulationResult {
    pub network: Network,
    pub value_usd: f64,
    pub gas_cost_native: f64,
    pub gas_cost_usd: f64,
    pub total_cost_usd: f64,
}

/// Prices a transfer of `value_usd` using the snapshot's current fees.
///
/// The single ETH/USD reference price converts every network's native gas
/// cost, MATIC included; this is an approximation.
pub fn simulate(
    snapshot: &AppSnapshot,
    value_usd: f64,
    kind: TransactionKind,
) -> Option<SimulationResult> {
    if !value_usd.is_finite() || value_usd <= 0.0 || snapshot.price.value <= 0.0 {
        return None;
    }
    let network = kind.network();
    let state = snapshot.network(network)?;

    let gas_price_gwei = state.base_fee + state.priority_fee;
    let gas_cost_native = gas_price_gwei * SIMULATION_GAS_LIMIT as f64 / WEI_PER_GWEI;
    let gas_cost_usd = gas_cost_native * snapshot.price.value;
    Some(SimulationResult {
        network,
        value_usd,
        gas_cost_native,
        gas_cost_usd,
        total_cost_usd: value_usd + gas_cost_usd,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::FeeSnapshot;
    use crate::store::FeeStore;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn transfer_cost_uses_base_plus_priority() {
        let store = FeeStore::default();
        store.record_fees(
            Network::Ethereum,
            FeeSnapshot {
                base_fee: 18.0,
                priority_fee: 2.0,
            },
        );
        store.set_reference_price(3000.0, true);

        let result = simulate(&store.snapshot(), 100.0, TransactionKind::Eth).unwrap();
        // 20 gwei * 21000 = 420000 gwei = 0.00042 ETH
        assert_eq!(result.network, Network::Ethereum);
        assert!(approx(result.gas_cost_native, 0.00042));
        assert!(approx(result.gas_cost_usd, 1.26));
        assert!(approx(result.total_cost_usd, 101.26));
    }

    #[test]
    fn kind_selects_network() {
        let store = FeeStore::default();
        store.record_fees(
            Network::Arbitrum,
            FeeSnapshot {
                base_fee: 0.01,
                priority_fee: 0.0,
            },
        );
        let result = simulate(&store.snapshot(), 5.0, TransactionKind::EthArbitrum).unwrap();
        assert_eq!(result.network, Network::Arbitrum);
        assert!(approx(result.gas_cost_native, 0.01 * 21_000.0 / 1e9));
    }

    #[test]
    fn non_positive_value_yields_nothing() {
        let snapshot = FeeStore::default().snapshot();
        assert_eq!(simulate(&snapshot, 0.0, TransactionKind::Eth), None);
        assert_eq!(simulate(&snapshot, -3.0, TransactionKind::Matic), None);
        assert_eq!(simulate(&snapshot, f64::NAN, TransactionKind::Matic), None);
    }

    #[test]
    fn kinds_cycle() {
        assert_eq!(TransactionKind::Eth.next(), TransactionKind::Matic);
        assert_eq!(TransactionKind::EthArbitrum.next(), TransactionKind::Eth);
    }
}
