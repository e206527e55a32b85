use std::time::Duration;

use thiserror::Error;

/// Error taxonomy for one relay pass.
///
/// `Config` and `Connection` are fatal to the run and surface before any
/// event is processed. `Scan` is recovered by the orchestrator as an empty
/// window. `GasEstimation` is recovered inside the submitter via the fixed
/// fallback gas limit. `Submission` and `ConfirmationTimeout` are per-event:
/// logged, skipped, and never allowed to abort sibling events.
///
/// Nothing is retried within a run; the external scheduler decides whether
/// to invoke another pass.
#[derive(Debug, Error)]
pub enum WardenError {
    /// Bad or missing contract metadata / configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// RPC endpoint unreachable, URL malformed, or transport-level failure.
    #[error("connection error: {0}")]
    Connection(String),

    /// Log query against the scan window failed.
    #[error("log query failed: {0}")]
    Scan(String),

    /// Gas estimation was rejected by the endpoint.
    #[error("gas estimation failed: {0}")]
    GasEstimation(String),

    /// The signed transaction was rejected at broadcast.
    #[error("transaction submission failed: {0}")]
    Submission(String),

    /// No receipt observed within the bounded confirmation wait.
    #[error("no receipt within {0:?}")]
    ConfirmationTimeout(Duration),
}

pub type Result<T> = std::result::Result<T, WardenError>;
