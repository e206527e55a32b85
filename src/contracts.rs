//! Contract bindings and metadata resolution.
//!
//! The deployed addresses and interface schemas come from a role-keyed JSON
//! document (`contract_info.json`); the typed call/event shapes the warden
//! relies on are declared with alloy's `sol!` macro. Resolution fails closed:
//! a missing role key, malformed address, or unparseable schema aborts the
//! run before anything is scanned or submitted.

use std::str::FromStr;

use alloy::primitives::{keccak256, Address, B256};
use alloy::sol;
use alloy::sol_types::SolCall;

use crate::error::{Result, WardenError};
use crate::types::{ChainRole, RelayAction};

sol! {
    /// Source-side vault: locks the underlying asset, releases on withdraw.
    contract SourceVault {
        function withdraw(address token, address recipient, uint256 amount) external;

        event Deposit(address indexed token, address indexed recipient, uint256 amount);
    }

    /// Destination-side contract: mints the wrapped asset, burns on unwrap.
    contract WrappedVault {
        function wrap(address token, address recipient, uint256 amount) external;

        event Unwrap(
            address indexed underlying_token,
            address indexed wrapped_token,
            address frm,
            address to,
            uint256 amount
        );
    }
}

/// ABI-encode the remote call for a relay action.
pub fn encode_call(action: &RelayAction) -> Vec<u8> {
    match *action {
        RelayAction::Wrap {
            token,
            recipient,
            amount,
        } => WrappedVault::wrapCall {
            token,
            recipient,
            amount,
        }
        .abi_encode(),
        RelayAction::Withdraw {
            token,
            recipient,
            amount,
        } => SourceVault::withdrawCall {
            token,
            recipient,
            amount,
        }
        .abi_encode(),
    }
}

/// Kind of a declared interface entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbiKind {
    Function,
    Event,
}

/// One declared function or event, reduced to its canonical signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AbiEntry {
    pub kind: AbiKind,
    pub name: String,
    /// Canonical form, e.g. `Deposit(address,address,uint256)`.
    pub signature: String,
}

/// Resolved deployment for one role: address plus declared interface.
#[derive(Debug, Clone)]
pub struct ContractMetadata {
    pub role: ChainRole,
    pub address: Address,
    pub interface: Vec<AbiEntry>,
}

impl ContractMetadata {
    /// Resolve a role's contract from the metadata document.
    ///
    /// The document is keyed by role, each entry carrying `address` and
    /// `abi`. The resolved interface must declare the operations the warden
    /// uses on that chain (`Deposit` + `withdraw` on source, `Unwrap` +
    /// `wrap` on destination).
    pub fn resolve(role: ChainRole, document: &serde_json::Value) -> Result<Self> {
        let entry = document.get(role.as_str()).ok_or_else(|| {
            WardenError::Config(format!("metadata document missing role key '{role}'"))
        })?;

        let address_str = entry
            .get("address")
            .and_then(|v| v.as_str())
            .ok_or_else(|| WardenError::Config(format!("missing contract address for '{role}'")))?;
        let address = Address::from_str(address_str).map_err(|e| {
            WardenError::Config(format!("malformed contract address for '{role}': {e}"))
        })?;

        let abi = entry
            .get("abi")
            .and_then(|v| v.as_array())
            .ok_or_else(|| WardenError::Config(format!("missing or non-array abi for '{role}'")))?;

        let mut interface = Vec::new();
        for item in abi {
            if let Some(parsed) = parse_abi_entry(role, item)? {
                interface.push(parsed);
            }
        }

        let metadata = ContractMetadata {
            role,
            address,
            interface,
        };

        for (kind, name) in required_operations(role) {
            if metadata.entry(kind, name).is_none() {
                return Err(WardenError::Config(format!(
                    "abi for '{role}' does not declare required {} '{name}'",
                    match kind {
                        AbiKind::Function => "function",
                        AbiKind::Event => "event",
                    }
                )));
            }
        }

        Ok(metadata)
    }

    fn entry(&self, kind: AbiKind, name: &str) -> Option<&AbiEntry> {
        self.interface
            .iter()
            .find(|e| e.kind == kind && e.name == name)
    }

    /// Declared function by name.
    pub fn function(&self, name: &str) -> Result<&AbiEntry> {
        self.entry(AbiKind::Function, name).ok_or_else(|| {
            WardenError::Config(format!("contract for '{}' has no function '{name}'", self.role))
        })
    }

    /// topic0 for a declared event, from its canonical signature.
    pub fn event_topic(&self, name: &str) -> Result<B256> {
        let entry = self.entry(AbiKind::Event, name).ok_or_else(|| {
            WardenError::Config(format!("contract for '{}' has no event '{name}'", self.role))
        })?;
        Ok(keccak256(entry.signature.as_bytes()))
    }
}

/// Operations the warden needs declared per role.
fn required_operations(role: ChainRole) -> [(AbiKind, &'static str); 2] {
    match role {
        ChainRole::Source => [(AbiKind::Event, "Deposit"), (AbiKind::Function, "withdraw")],
        ChainRole::Destination => [(AbiKind::Event, "Unwrap"), (AbiKind::Function, "wrap")],
    }
}

/// Parse one ABI item into an entry; constructors/fallbacks and other
/// non-callable items are skipped.
fn parse_abi_entry(role: ChainRole, item: &serde_json::Value) -> Result<Option<AbiEntry>> {
    let kind = match item.get("type").and_then(|v| v.as_str()) {
        Some("function") => AbiKind::Function,
        Some("event") => AbiKind::Event,
        Some(_) => return Ok(None),
        None => {
            return Err(WardenError::Config(format!(
                "abi entry for '{role}' has no type field"
            )))
        }
    };

    let name = item
        .get("name")
        .and_then(|v| v.as_str())
        .ok_or_else(|| WardenError::Config(format!("unnamed abi entry for '{role}'")))?
        .to_string();

    let inputs = item
        .get("inputs")
        .and_then(|v| v.as_array())
        .ok_or_else(|| {
            WardenError::Config(format!("abi entry '{name}' for '{role}' has no inputs"))
        })?;

    let mut param_types = Vec::with_capacity(inputs.len());
    for input in inputs {
        let ty = input
            .get("type")
            .and_then(|v| v.as_str())
            .ok_or_else(|| {
                WardenError::Config(format!("untyped parameter in abi entry '{name}' for '{role}'"))
            })?;
        if ty == "tuple" || ty.starts_with("tuple") {
            return Err(WardenError::Config(format!(
                "tuple parameters are not supported (abi entry '{name}' for '{role}')"
            )));
        }
        param_types.push(ty.to_string());
    }

    let signature = format!("{}({})", name, param_types.join(","));
    Ok(Some(AbiEntry {
        kind,
        name,
        signature,
    }))
}
