//! Turns a network-specific upstream response into a fee snapshot in Gwei.
use alloy_primitives::U256;

use crate::config::{PRIORITY_FEE_PLACEHOLDER_GWEI, WEI_PER_GWEI};
use crate::error::NormalizationError;
use crate::network::{FeeSourceKind, Network};

/// Raw fee data as returned by an upstream, before unit conversion.
#[derive(Debug, Clone, PartialEq)]
pub enum RawFeeData {
    /// Latest block header; `base_fee_per_gas` is in wei.
    Block { base_fee_per_gas: Option<u64> },
    /// Helper-contract gas estimate; values are in wei.
    GasEstimate {
        base_fee: Option<U256>,
        priority_fee: Option<U256>,
    },
}

/// Current fees of one network, in Gwei.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FeeSnapshot {
    pub base_fee: f64,
    pub priority_fee: f64,
}

pub fn normalize(network: Network, raw: &RawFeeData) -> Result<FeeSnapshot, NormalizationError> {
    match (network.fee_source(), raw) {
        (FeeSourceKind::BlockBaseFee, RawFeeData::Block { base_fee_per_gas }) => {
            let wei = base_fee_per_gas.ok_or(NormalizationError::MissingField {
                network,
                field: "baseFeePerGas",
            })?;
            Ok(FeeSnapshot {
                base_fee: wei as f64 / WEI_PER_GWEI,
                priority_fee: PRIORITY_FEE_PLACEHOLDER_GWEI,
            })
        }
        (
            FeeSourceKind::NodeInterface,
            RawFeeData::GasEstimate {
                base_fee,
                priority_fee,
            },
        ) => {
            let base = base_fee.ok_or(NormalizationError::MissingField {
                network,
                field: "baseFee",
            })?;
            let priority = match priority_fee {
                Some(wei) => u256_to_gwei(network, "priorityFee", *wei)?,
                None => 0.0,
            };
            Ok(FeeSnapshot {
                base_fee: u256_to_gwei(network, "baseFee", base)?,
                priority_fee: priority,
            })
        }
        _ => Err(NormalizationError::UnexpectedShape { network }),
    }
}

fn u256_to_gwei(
    network: Network,
    field: &'static str,
    wei: U256,
) -> Result<f64, NormalizationError> {
    let wei = u128::try_from(wei).map_err(|_| NormalizationError::OutOfRange { network, field })?;
    Ok(wei as f64 / WEI_PER_GWEI)
}
