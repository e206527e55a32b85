//! Cross-chain bridge warden.
//!
//! Watches one EVM chain for asset-lock events and mirrors their effect on
//! a second chain: `Deposit` events observed on the source chain become
//! `wrap` calls on the destination, `Unwrap` events observed on the
//! destination become `withdraw` calls on the source. One invocation of
//! [`relay::run`] performs one pass over a bounded window of recent blocks;
//! scheduling repeated passes is the caller's concern.

pub mod config;
pub mod contracts;
pub mod endpoint;
pub mod error;
pub mod fees;
pub mod nonce;
pub mod relay;
pub mod scanner;
pub mod submitter;
pub mod types;

pub use config::Config;
pub use error::WardenError;
pub use types::ChainRole;
