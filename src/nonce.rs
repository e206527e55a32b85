//! Nonce ledger: per-(chain, signer) monotonic counters for one run.
//!
//! Transactions sent back-to-back within a pass would collide if each read
//! the chain's transaction count; the ledger is primed once from the chain
//! and then advances locally, exactly once per constructed transaction.
//! Transactions the chain later rejects still consume their value. The
//! ledger is exclusive to one run and is never persisted
//! or shared across concurrent runs for the same signer.

use std::collections::HashMap;

use alloy::primitives::Address;

use crate::error::{Result, WardenError};
use crate::types::ChainRole;

/// Strictly increasing nonce counters keyed by (chain, signer).
#[derive(Debug, Default)]
pub struct NonceLedger {
    counters: HashMap<(ChainRole, Address), u64>,
}

impl NonceLedger {
    pub fn new() -> Self {
        NonceLedger::default()
    }

    /// Seed a key from the chain's reported transaction count.
    pub fn prime(&mut self, chain: ChainRole, signer: Address, transaction_count: u64) {
        self.counters.insert((chain, signer), transaction_count);
    }

    /// Take the next nonce for a key, advancing the counter.
    ///
    /// The key must have been primed; drawing from an unprimed key is a
    /// setup bug, not a recoverable condition.
    pub fn next(&mut self, chain: ChainRole, signer: Address) -> Result<u64> {
        let counter = self.counters.get_mut(&(chain, signer)).ok_or_else(|| {
            WardenError::Config(format!("nonce ledger not primed for ({chain}, {signer})"))
        })?;
        let nonce = *counter;
        *counter += 1;
        Ok(nonce)
    }

    /// Current value for a key without advancing it.
    pub fn peek(&self, chain: ChainRole, signer: Address) -> Option<u64> {
        self.counters.get(&(chain, signer)).copied()
    }
}
