//! Core value types for one relay pass.
//!
//! Events and actions are plain values: created during a scan, consumed by
//! the submitter within the same pass, never persisted across runs.

use std::fmt;
use std::str::FromStr;

use alloy::primitives::{Address, Bytes, B256, U256};
use serde::{Deserialize, Serialize};

/// Logical role of a chain for this deployment.
///
/// The mapping role -> RPC endpoint -> contract is fixed for the lifetime of
/// a process; a pass scans the chain named by its role argument and submits
/// on the opposite one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChainRole {
    Source,
    Destination,
}

impl ChainRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChainRole::Source => "source",
            ChainRole::Destination => "destination",
        }
    }

    /// The chain a relay action lands on when events are observed on `self`.
    pub fn opposite(&self) -> ChainRole {
        match self {
            ChainRole::Source => ChainRole::Destination,
            ChainRole::Destination => ChainRole::Source,
        }
    }
}

impl fmt::Display for ChainRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ChainRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "source" => Ok(ChainRole::Source),
            "destination" => Ok(ChainRole::Destination),
            other => Err(format!("invalid chain role: {other}")),
        }
    }
}

/// A decoded on-chain event the warden relays.
///
/// Closed variant set with validated fields; malformed logs are rejected at
/// decode time instead of propagating untyped payloads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DomainEvent {
    /// `Deposit(token, recipient, amount)` observed on the source chain.
    Deposit {
        token: Address,
        recipient: Address,
        amount: U256,
        block_number: u64,
    },
    /// `Unwrap(underlying_token, ..., to, amount)` observed on the
    /// destination chain.
    Unwrap {
        underlying_token: Address,
        recipient: Address,
        amount: U256,
        block_number: u64,
    },
}

impl DomainEvent {
    /// Event name scanned for on a chain with the given role.
    pub fn name_for(role: ChainRole) -> &'static str {
        match role {
            ChainRole::Source => "Deposit",
            ChainRole::Destination => "Unwrap",
        }
    }

    pub fn block_number(&self) -> u64 {
        match self {
            DomainEvent::Deposit { block_number, .. } => *block_number,
            DomainEvent::Unwrap { block_number, .. } => *block_number,
        }
    }

    /// Deterministic translation into the call submitted on the opposite
    /// chain: Deposit -> wrap on destination, Unwrap -> withdraw on source.
    pub fn relay_action(&self) -> RelayAction {
        match *self {
            DomainEvent::Deposit {
                token,
                recipient,
                amount,
                ..
            } => RelayAction::Wrap {
                token,
                recipient,
                amount,
            },
            DomainEvent::Unwrap {
                underlying_token,
                recipient,
                amount,
                ..
            } => RelayAction::Withdraw {
                token: underlying_token,
                recipient,
                amount,
            },
        }
    }
}

/// The remote contract call an event translates to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayAction {
    /// `wrap(token, recipient, amount)` on the destination chain.
    Wrap {
        token: Address,
        recipient: Address,
        amount: U256,
    },
    /// `withdraw(token, recipient, amount)` on the source chain.
    Withdraw {
        token: Address,
        recipient: Address,
        amount: U256,
    },
}

impl RelayAction {
    pub fn function_name(&self) -> &'static str {
        match self {
            RelayAction::Wrap { .. } => "wrap",
            RelayAction::Withdraw { .. } => "withdraw",
        }
    }

    /// Role of the chain this action must be submitted on.
    pub fn target_role(&self) -> ChainRole {
        match self {
            RelayAction::Wrap { .. } => ChainRole::Destination,
            RelayAction::Withdraw { .. } => ChainRole::Source,
        }
    }
}

/// Transaction pricing chosen by the fee strategist.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeeFields {
    /// Modern fee-market pricing (base fee present on the latest block).
    Eip1559 {
        max_fee_per_gas: u128,
        max_priority_fee_per_gas: u128,
    },
    /// Single legacy gas price.
    Legacy { gas_price: u128 },
}

/// Terminal record of one relay action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedReceipt {
    pub transaction_hash: B256,
    pub success: bool,
    pub block_number: Option<u64>,
}

// ============================================================================
// RPC view types
//
// Minimal projections of the JSON-RPC objects the warden consumes. Decoding
// only the fields listed here is what makes the endpoint tolerant of chains
// that extend the standard formats (proof-of-authority headers).
// ============================================================================

/// The header fields fee selection needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockHeader {
    pub number: u64,
    pub base_fee_per_gas: Option<u128>,
}

/// The receipt fields confirmation needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceiptView {
    pub transaction_hash: B256,
    pub success: bool,
    pub block_number: Option<u64>,
}

/// One undecoded log entry from `eth_getLogs`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawLog {
    pub topics: Vec<B256>,
    pub data: Bytes,
    pub block_number: Option<u64>,
}

/// Log query over a bounded block range, filtered to one event signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogFilter {
    pub address: Address,
    pub topic0: B256,
    pub from_block: u64,
    pub to_block: u64,
}
