//! Transaction submitter: builds, signs, broadcasts, and confirms one
//! transaction per call.
//!
//! Gas estimation failures are recovered with a fixed conservative limit
//! instead of aborting the action. Broadcast rejection and confirmation
//! timeout are surfaced to the caller and are not retried here; the
//! orchestrator isolates them per event.

use std::time::Instant;

use alloy::consensus::{SignableTransaction, TxEip1559, TxEnvelope, TxLegacy};
use alloy::eips::eip2718::Encodable2718;
use alloy::network::TxSignerSync;
use alloy::primitives::{Address, TxKind, B256, U256};
use alloy::signers::local::PrivateKeySigner;
use tracing::{debug, info, warn};

use crate::config::RelaySettings;
use crate::contracts;
use crate::endpoint::ChainRpc;
use crate::error::{Result, WardenError};
use crate::types::{FeeFields, RelayAction, SignedReceipt};

/// Signs and submits relay actions for one warden identity.
pub struct Submitter<'a> {
    signer: &'a PrivateKeySigner,
    settings: &'a RelaySettings,
}

impl<'a> Submitter<'a> {
    pub fn new(signer: &'a PrivateKeySigner, settings: &'a RelaySettings) -> Self {
        Submitter { signer, settings }
    }

    /// The warden's sending address.
    pub fn signer_address(&self) -> Address {
        self.signer.address()
    }

    /// Submit one relay action to `contract` on `endpoint`.
    ///
    /// Exactly one transaction is broadcast per call. The provided nonce is
    /// consumed regardless of the eventual receipt status, so the caller's
    /// ledger must already have advanced past it.
    pub async fn submit<C: ChainRpc + ?Sized>(
        &self,
        endpoint: &C,
        contract: Address,
        action: &RelayAction,
        nonce: u64,
        fees: &FeeFields,
    ) -> Result<SignedReceipt> {
        let calldata = contracts::encode_call(action);
        let gas_limit = self.gas_limit_for(endpoint, contract, &calldata).await;

        let raw = self.sign(endpoint.chain_id(), contract, calldata, nonce, gas_limit, fees)?;

        let tx_hash = endpoint
            .send_raw_transaction(&raw)
            .await
            .map_err(|e| WardenError::Submission(e.to_string()))?;

        info!(
            role = %endpoint.role(),
            function = action.function_name(),
            tx_hash = %tx_hash,
            nonce,
            gas_limit,
            "Transaction sent, waiting for confirmation"
        );

        let receipt = self.wait_for_receipt(endpoint, tx_hash).await?;
        if receipt.success {
            info!(tx_hash = %tx_hash, block_number = ?receipt.block_number, "Transaction confirmed");
        } else {
            warn!(tx_hash = %tx_hash, "Transaction reverted on-chain");
        }

        Ok(receipt)
    }

    /// Estimate gas with a 20% safety bump, falling back to the fixed
    /// conservative limit when estimation is rejected.
    async fn gas_limit_for<C: ChainRpc + ?Sized>(
        &self,
        endpoint: &C,
        contract: Address,
        calldata: &[u8],
    ) -> u64 {
        match endpoint
            .estimate_gas(self.signer.address(), contract, calldata)
            .await
        {
            Ok(estimate) => estimate.saturating_mul(12) / 10,
            Err(e) => {
                let err = WardenError::GasEstimation(e.to_string());
                warn!(
                    error = %err,
                    fallback = self.settings.gas_limit_fallback,
                    "Gas estimation failed, using fallback limit"
                );
                self.settings.gas_limit_fallback
            }
        }
    }

    /// Build and sign the transaction in the shape the fee fields dictate.
    fn sign(
        &self,
        chain_id: u64,
        contract: Address,
        calldata: Vec<u8>,
        nonce: u64,
        gas_limit: u64,
        fees: &FeeFields,
    ) -> Result<Vec<u8>> {
        let raw = match *fees {
            FeeFields::Eip1559 {
                max_fee_per_gas,
                max_priority_fee_per_gas,
            } => {
                let mut tx = TxEip1559 {
                    chain_id,
                    nonce,
                    gas_limit,
                    max_fee_per_gas,
                    max_priority_fee_per_gas,
                    to: TxKind::Call(contract),
                    value: U256::ZERO,
                    input: calldata.into(),
                    ..Default::default()
                };
                let signature = self
                    .signer
                    .sign_transaction_sync(&mut tx)
                    .map_err(|e| WardenError::Submission(format!("signing failed: {e}")))?;
                TxEnvelope::from(tx.into_signed(signature)).encoded_2718()
            }
            FeeFields::Legacy { gas_price } => {
                let mut tx = TxLegacy {
                    chain_id: Some(chain_id),
                    nonce,
                    gas_price,
                    gas_limit,
                    to: TxKind::Call(contract),
                    value: U256::ZERO,
                    input: calldata.into(),
                };
                let signature = self
                    .signer
                    .sign_transaction_sync(&mut tx)
                    .map_err(|e| WardenError::Submission(format!("signing failed: {e}")))?;
                TxEnvelope::from(tx.into_signed(signature)).encoded_2718()
            }
        };

        Ok(raw)
    }

    /// Poll for the receipt under the bounded confirmation wait.
    async fn wait_for_receipt<C: ChainRpc + ?Sized>(
        &self,
        endpoint: &C,
        tx_hash: B256,
    ) -> Result<SignedReceipt> {
        let timeout = self.settings.confirmation_timeout();
        let started = Instant::now();

        loop {
            match endpoint.transaction_receipt(tx_hash).await {
                Ok(Some(receipt)) => {
                    return Ok(SignedReceipt {
                        transaction_hash: receipt.transaction_hash,
                        success: receipt.success,
                        block_number: receipt.block_number,
                    });
                }
                Ok(None) => {
                    debug!(tx_hash = %tx_hash, "Receipt not yet available");
                }
                // Transient poll failures don't fail the action; the
                // deadline bounds the total wait either way.
                Err(e) => {
                    debug!(tx_hash = %tx_hash, error = %e, "Receipt poll failed");
                }
            }

            if started.elapsed() >= timeout {
                return Err(WardenError::ConfirmationTimeout(timeout));
            }
            tokio::time::sleep(self.settings.receipt_poll_interval()).await;
        }
    }
}
