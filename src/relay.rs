//! Relay orchestrator: one scan-and-relay pass.
//!
//! Delivery is at-least-once. There is no persisted "last processed block"
//! cursor: each pass scans a sliding window of recent blocks, so a
//! scheduler invoking passes more often than the window advances will
//! re-observe events, and chain congestion can delay a relay past the next
//! pass. Integrators must either rely on the remote contract rejecting
//! duplicate claims or accept duplicate submissions.

use alloy::signers::local::PrivateKeySigner;
use tracing::{debug, error, info, warn};

use crate::config::{Config, RelaySettings};
use crate::contracts::ContractMetadata;
use crate::endpoint::{ChainRpc, HttpEndpoint};
use crate::error::{Result, WardenError};
use crate::nonce::NonceLedger;
use crate::submitter::Submitter;
use crate::types::ChainRole;
use crate::{fees, scanner};

/// Run one relay pass for the chain named by `role_label`.
///
/// Scans the origin chain's recent window for its event type and mirrors
/// each event on the opposite chain. Returns the number of relays confirmed
/// with a success receipt; `0` means either nothing to relay or a setup
/// failure, and the accompanying diagnostics distinguish the two.
///
/// Any label other than `source`/`destination` returns 0 before any
/// endpoint is contacted.
pub async fn run(config: &Config, role_label: &str) -> u64 {
    let role: ChainRole = match role_label.parse() {
        Ok(role) => role,
        Err(e) => {
            error!(role = role_label, "{e}");
            return 0;
        }
    };

    match run_pass(config, role).await {
        Ok(processed) => processed,
        Err(e) => {
            error!(role = %role, error = %e, "Relay pass aborted");
            0
        }
    }
}

/// Open endpoints, resolve bindings, and drive the pass.
async fn run_pass(config: &Config, role: ChainRole) -> Result<u64> {
    let document: serde_json::Value = {
        let raw = std::fs::read_to_string(&config.warden.contract_info).map_err(|e| {
            WardenError::Config(format!(
                "failed to read {}: {e}",
                config.warden.contract_info
            ))
        })?;
        serde_json::from_str(&raw).map_err(|e| {
            WardenError::Config(format!(
                "failed to parse {}: {e}",
                config.warden.contract_info
            ))
        })?
    };

    let origin_meta = ContractMetadata::resolve(role, &document)?;
    let remote_meta = ContractMetadata::resolve(role.opposite(), &document)?;

    let signer: PrivateKeySigner = config
        .warden
        .private_key
        .parse()
        .map_err(|e| WardenError::Config(format!("invalid warden private key: {e}")))?;

    let origin = HttpEndpoint::connect(role, config.chain(role)).await?;
    let remote = HttpEndpoint::connect(role.opposite(), config.chain(role.opposite())).await?;

    relay_window(
        &origin,
        &remote,
        &origin_meta,
        &remote_meta,
        &signer,
        &config.relay,
    )
    .await
}

/// Drive one pass over already-opened endpoints.
///
/// Scan order is preserved; each event's submission is isolated so one
/// failure is logged and skipped without aborting its siblings. The nonce
/// ledger is primed here and lives exactly as long as the pass.
pub async fn relay_window<O, R>(
    origin: &O,
    remote: &R,
    origin_meta: &ContractMetadata,
    remote_meta: &ContractMetadata,
    signer: &PrivateKeySigner,
    settings: &RelaySettings,
) -> Result<u64>
where
    O: ChainRpc + ?Sized,
    R: ChainRpc + ?Sized,
{
    let submitter = Submitter::new(signer, settings);
    let warden = submitter.signer_address();

    let mut ledger = NonceLedger::new();
    let transaction_count = remote.transaction_count(warden).await?;
    ledger.prime(remote.role(), warden, transaction_count);

    let events = match scanner::scan_recent(origin, origin_meta, settings.scan_window).await {
        Ok(events) => events,
        Err(e) => {
            // Distinct from the "no events" case: an outage here looks like
            // a quiet period to callers unless they read this log.
            warn!(
                role = %origin.role(),
                error = %e,
                "Scan failed, treating window as empty"
            );
            Vec::new()
        }
    };

    if events.is_empty() {
        debug!(role = %origin.role(), "No events in scan window");
        return Ok(0);
    }

    info!(
        role = %origin.role(),
        event_count = events.len(),
        "Relaying events to opposite chain"
    );

    let mut processed = 0u64;
    for event in &events {
        let action = event.relay_action();
        debug_assert_eq!(action.target_role(), remote.role());

        info!(
            origin = %origin.role(),
            block_number = event.block_number(),
            function = action.function_name(),
            "Observed event, submitting relay action"
        );

        let fees = match fees::price_for(remote, settings.priority_fee_wei()).await {
            Ok(fees) => fees,
            Err(e) => {
                error!(error = %e, "Fee selection failed, skipping event");
                continue;
            }
        };

        // Drawn after pricing so a pricing failure doesn't burn a value;
        // advances even if the broadcast below is rejected.
        let nonce = match ledger.next(remote.role(), warden) {
            Ok(nonce) => nonce,
            Err(e) => {
                error!(error = %e, "Nonce ledger failure, skipping event");
                continue;
            }
        };

        match submitter
            .submit(remote, remote_meta.address, &action, nonce, &fees)
            .await
        {
            Ok(receipt) if receipt.success => {
                processed += 1;
            }
            Ok(receipt) => {
                warn!(
                    tx_hash = %receipt.transaction_hash,
                    function = action.function_name(),
                    "Relay transaction failed on-chain, continuing with next event"
                );
            }
            Err(e) => {
                error!(
                    error = %e,
                    function = action.function_name(),
                    "Relay submission failed, continuing with next event"
                );
            }
        }
    }

    debug!(
        role = %remote.role(),
        processed,
        next_nonce = ?ledger.peek(remote.role(), warden),
        "Relay window complete"
    );

    Ok(processed)
}
