//! Event scanner: bounded-window log queries with validated decoding.
//!
//! A pass only has authority over a sliding window of recent blocks
//! (`from = max(0, tip - window)`), which bounds RPC cost per call but means
//! overlapping windows across repeated invocations are expected. Callers
//! must tolerate re-observing an event, and "no events" is never proof that
//! none occurred (see `relay::run`).

use alloy::primitives::{Address, B256, U256};
use tracing::{debug, error};

use crate::contracts::ContractMetadata;
use crate::endpoint::ChainRpc;
use crate::error::{Result, WardenError};
use crate::types::{ChainRole, DomainEvent, LogFilter, RawLog};

/// Scan the most recent `window` blocks for the origin chain's event type.
pub async fn scan_recent<C: ChainRpc + ?Sized>(
    endpoint: &C,
    metadata: &ContractMetadata,
    window: u64,
) -> Result<Vec<DomainEvent>> {
    let tip = endpoint
        .block_number()
        .await
        .map_err(|e| WardenError::Scan(format!("block height query failed: {e}")))?;
    let (from_block, to_block) = window_bounds(tip, window);
    scan(endpoint, metadata, from_block, to_block).await
}

/// Scan an explicit block range for the origin chain's event type.
///
/// Malformed logs are rejected and skipped with a diagnostic; a failed
/// provider query surfaces as `WardenError::Scan` for the caller to recover.
pub async fn scan<C: ChainRpc + ?Sized>(
    endpoint: &C,
    metadata: &ContractMetadata,
    from_block: u64,
    to_block: u64,
) -> Result<Vec<DomainEvent>> {
    let role = endpoint.role();
    let event_name = DomainEvent::name_for(role);
    let topic0 = metadata.event_topic(event_name)?;

    let filter = LogFilter {
        address: metadata.address,
        topic0,
        from_block,
        to_block,
    };

    let logs = endpoint
        .logs(&filter)
        .await
        .map_err(|e| WardenError::Scan(e.to_string()))?;

    debug!(
        role = %role,
        event = event_name,
        from_block,
        to_block,
        log_count = logs.len(),
        "Scanned block window"
    );

    let mut events = Vec::with_capacity(logs.len());
    for log in &logs {
        let decoded = match role {
            ChainRole::Source => decode_deposit(log),
            ChainRole::Destination => decode_unwrap(log),
        };
        match decoded {
            Ok(event) => events.push(event),
            Err(reason) => {
                error!(
                    role = %role,
                    event = event_name,
                    block_number = ?log.block_number,
                    reason,
                    "Rejected malformed log"
                );
            }
        }
    }

    Ok(events)
}

/// Window policy: the last `window` blocks up to the current tip.
pub fn window_bounds(tip: u64, window: u64) -> (u64, u64) {
    (tip.saturating_sub(window), tip)
}

/// Decode `Deposit(address indexed token, address indexed recipient,
/// uint256 amount)`.
fn decode_deposit(log: &RawLog) -> std::result::Result<DomainEvent, String> {
    if log.topics.len() != 3 {
        return Err(format!("expected 3 topics, got {}", log.topics.len()));
    }
    if log.data.len() != 32 {
        return Err(format!("expected 32 data bytes, got {}", log.data.len()));
    }

    let token = address_from_topic(&log.topics[1])?;
    let recipient = address_from_topic(&log.topics[2])?;
    let amount = U256::from_be_slice(&log.data[..32]);
    let block_number = log.block_number.ok_or("missing block number")?;

    Ok(DomainEvent::Deposit {
        token,
        recipient,
        amount,
        block_number,
    })
}

/// Decode `Unwrap(address indexed underlying_token, address indexed
/// wrapped_token, address frm, address to, uint256 amount)`.
///
/// The relay consumes the underlying token, the `to` recipient, and the
/// amount; the wrapped token and the burner are informational.
fn decode_unwrap(log: &RawLog) -> std::result::Result<DomainEvent, String> {
    if log.topics.len() != 3 {
        return Err(format!("expected 3 topics, got {}", log.topics.len()));
    }
    if log.data.len() != 96 {
        return Err(format!("expected 96 data bytes, got {}", log.data.len()));
    }

    let underlying_token = address_from_topic(&log.topics[1])?;
    let recipient = address_from_word(&log.data[32..64])?;
    let amount = U256::from_be_slice(&log.data[64..96]);
    let block_number = log.block_number.ok_or("missing block number")?;

    Ok(DomainEvent::Unwrap {
        underlying_token,
        recipient,
        amount,
        block_number,
    })
}

/// An address topic is a 20-byte address left-padded to 32 bytes; nonzero
/// padding means the log does not carry a valid address.
fn address_from_topic(topic: &B256) -> std::result::Result<Address, String> {
    address_from_word(topic.as_slice())
}

fn address_from_word(word: &[u8]) -> std::result::Result<Address, String> {
    if word.len() != 32 {
        return Err(format!("expected 32-byte word, got {}", word.len()));
    }
    if word[..12].iter().any(|&b| b != 0) {
        return Err("nonzero padding in address word".to_string());
    }
    Ok(Address::from_slice(&word[12..]))
}
