//! Fee strategist: two-tier transaction pricing.
//!
//! Chains that expose a base fee get fee-market pricing with a fixed small
//! priority fee and `max_fee = base_fee + 2 × priority_fee`; everything
//! else, including any read failure along the way, falls back to the
//! endpoint's single legacy gas price. Submitting a transaction with the
//! wrong fee shape is rejected by the receiving chain, so the fallback
//! order is load-bearing.

use tracing::debug;

use crate::endpoint::ChainRpc;
use crate::error::Result;
use crate::types::{BlockHeader, FeeFields};

/// Choose pricing for the next transaction on `endpoint`.
///
/// `priority_fee` is the fixed tip in wei (2 gwei in the reference
/// configuration). Only fails if both the header read and the legacy
/// gas-price query fail.
pub async fn price_for<C: ChainRpc + ?Sized>(
    endpoint: &C,
    priority_fee: u128,
) -> Result<FeeFields> {
    match endpoint.latest_header().await {
        Ok(BlockHeader {
            base_fee_per_gas: Some(base_fee),
            ..
        }) => {
            let fees = FeeFields::Eip1559 {
                max_fee_per_gas: base_fee + 2 * priority_fee,
                max_priority_fee_per_gas: priority_fee,
            };
            debug!(role = %endpoint.role(), base_fee, priority_fee, "Using fee-market pricing");
            Ok(fees)
        }
        Ok(BlockHeader {
            base_fee_per_gas: None,
            ..
        }) => legacy_price(endpoint).await,
        Err(e) => {
            debug!(
                role = %endpoint.role(),
                error = %e,
                "Header read failed, falling back to legacy gas price"
            );
            legacy_price(endpoint).await
        }
    }
}

async fn legacy_price<C: ChainRpc + ?Sized>(endpoint: &C) -> Result<FeeFields> {
    let gas_price = endpoint.gas_price().await?;
    debug!(role = %endpoint.role(), gas_price, "Using legacy gas price");
    Ok(FeeFields::Legacy { gas_price })
}
