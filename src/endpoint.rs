//! Chain endpoints.
//!
//! `ChainRpc` is the surface one relay pass needs from a ledger. Runs take
//! explicitly constructed endpoint handles; there is no process-wide
//! connection state, and tests substitute in-memory implementations.
//!
//! `HttpEndpoint` speaks plain JSON-RPC over HTTP. Responses are decoded
//! into minimal view types that only read the fields the warden uses, so
//! providers that extend the standard formats (proof-of-authority header
//! extra data, vendor-specific fields) decode without a compatibility shim.

use std::str::FromStr;
use std::time::Duration;

use alloy::primitives::{Address, Bytes, B256};
use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::config::ChainConfig;
use crate::error::{Result, WardenError};
use crate::types::{BlockHeader, ChainRole, LogFilter, RawLog, ReceiptView};

/// The RPC operations one relay pass performs against a ledger.
#[async_trait]
pub trait ChainRpc: Send + Sync {
    /// Logical role this endpoint was opened for.
    fn role(&self) -> ChainRole;

    /// Chain id, resolved when the endpoint was opened.
    fn chain_id(&self) -> u64;

    /// Current block height.
    async fn block_number(&self) -> Result<u64>;

    /// Latest block header (number and base fee, if the chain has one).
    async fn latest_header(&self) -> Result<BlockHeader>;

    /// Current legacy gas price in wei.
    async fn gas_price(&self) -> Result<u128>;

    /// Transaction count for an account at the latest block.
    async fn transaction_count(&self, address: Address) -> Result<u64>;

    /// Gas estimate for a call from `from` to `to` with `data`.
    async fn estimate_gas(&self, from: Address, to: Address, data: &[u8]) -> Result<u64>;

    /// Broadcast a signed raw transaction, returning its hash.
    async fn send_raw_transaction(&self, raw: &[u8]) -> Result<B256>;

    /// Receipt for a transaction hash, if one exists yet.
    async fn transaction_receipt(&self, hash: B256) -> Result<Option<ReceiptView>>;

    /// Logs matching the filter's address, topic and block range.
    async fn logs(&self, filter: &LogFilter) -> Result<Vec<RawLog>>;
}

/// JSON-RPC response wrapper.
#[derive(Debug, Deserialize)]
struct RpcResponse<T> {
    result: Option<T>,
    error: Option<RpcError>,
}

/// JSON-RPC error object.
#[derive(Debug, Deserialize)]
struct RpcError {
    code: i32,
    message: String,
}

/// Block header projection. Unknown fields (including nonstandard
/// proof-of-authority extra data) are ignored by serde, which is the
/// normalization layer here.
#[derive(Debug, Deserialize)]
struct BlockJson {
    number: String,
    #[serde(rename = "baseFeePerGas")]
    base_fee_per_gas: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ReceiptJson {
    #[serde(rename = "transactionHash")]
    transaction_hash: String,
    #[serde(rename = "blockNumber")]
    block_number: Option<String>,
    status: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LogJson {
    topics: Vec<String>,
    data: String,
    #[serde(rename = "blockNumber")]
    block_number: Option<String>,
}

/// Authenticated HTTP connection to one ledger.
pub struct HttpEndpoint {
    role: ChainRole,
    chain_id: u64,
    url: Url,
    client: Client,
}

impl HttpEndpoint {
    /// Open an endpoint for the given role.
    ///
    /// Fails with `WardenError::Connection` if the URL is malformed or the
    /// endpoint does not answer `eth_chainId`, so unreachable providers
    /// surface before any event is processed.
    pub async fn connect(role: ChainRole, config: &ChainConfig) -> Result<Self> {
        let url = Url::parse(&config.rpc_url).map_err(|e| {
            WardenError::Connection(format!("malformed RPC URL for {role}: {e}"))
        })?;

        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| WardenError::Connection(format!("failed to build HTTP client: {e}")))?;

        let mut endpoint = HttpEndpoint {
            role,
            chain_id: 0,
            url,
            client,
        };
        let chain_id_hex: String = endpoint.call("eth_chainId", serde_json::json!([])).await?;
        endpoint.chain_id = parse_quantity(&chain_id_hex)? as u64;

        tracing::debug!(
            role = %role,
            chain_id = endpoint.chain_id,
            "Endpoint connected"
        );

        Ok(endpoint)
    }

    /// Issue one JSON-RPC call and decode a required result.
    async fn call<T: DeserializeOwned>(&self, method: &str, params: serde_json::Value) -> Result<T> {
        let response: RpcResponse<T> = self.call_raw(method, params).await?;

        if let Some(error) = response.error {
            return Err(WardenError::Connection(format!(
                "{method}: RPC error {} - {}",
                error.code, error.message
            )));
        }

        response
            .result
            .ok_or_else(|| WardenError::Connection(format!("{method}: empty result")))
    }

    /// Issue one JSON-RPC call, keeping a null result distinguishable.
    async fn call_raw<T: DeserializeOwned>(
        &self,
        method: &str,
        params: serde_json::Value,
    ) -> Result<RpcResponse<T>> {
        let body = serde_json::json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params,
            "id": 1
        });

        let response = self
            .client
            .post(self.url.clone())
            .json(&body)
            .send()
            .await
            .map_err(|e| WardenError::Connection(format!("{method}: request failed: {e}")))?;

        response
            .json::<RpcResponse<T>>()
            .await
            .map_err(|e| WardenError::Connection(format!("{method}: bad response: {e}")))
    }
}

#[async_trait]
impl ChainRpc for HttpEndpoint {
    fn role(&self) -> ChainRole {
        self.role
    }

    fn chain_id(&self) -> u64 {
        self.chain_id
    }

    async fn block_number(&self) -> Result<u64> {
        let hex: String = self.call("eth_blockNumber", serde_json::json!([])).await?;
        Ok(parse_quantity(&hex)? as u64)
    }

    async fn latest_header(&self) -> Result<BlockHeader> {
        let block: BlockJson = self
            .call("eth_getBlockByNumber", serde_json::json!(["latest", false]))
            .await?;

        let base_fee_per_gas = match &block.base_fee_per_gas {
            Some(hex) => Some(parse_quantity(hex)?),
            None => None,
        };

        Ok(BlockHeader {
            number: parse_quantity(&block.number)? as u64,
            base_fee_per_gas,
        })
    }

    async fn gas_price(&self) -> Result<u128> {
        let hex: String = self.call("eth_gasPrice", serde_json::json!([])).await?;
        parse_quantity(&hex)
    }

    async fn transaction_count(&self, address: Address) -> Result<u64> {
        let hex: String = self
            .call(
                "eth_getTransactionCount",
                serde_json::json!([format!("{address:?}"), "latest"]),
            )
            .await?;
        Ok(parse_quantity(&hex)? as u64)
    }

    async fn estimate_gas(&self, from: Address, to: Address, data: &[u8]) -> Result<u64> {
        let hex: String = self
            .call(
                "eth_estimateGas",
                serde_json::json!([{
                    "from": format!("{from:?}"),
                    "to": format!("{to:?}"),
                    "data": format!("0x{}", hex::encode(data)),
                }]),
            )
            .await?;
        Ok(parse_quantity(&hex)? as u64)
    }

    async fn send_raw_transaction(&self, raw: &[u8]) -> Result<B256> {
        let hash: String = self
            .call(
                "eth_sendRawTransaction",
                serde_json::json!([format!("0x{}", hex::encode(raw))]),
            )
            .await?;
        parse_hash(&hash)
    }

    async fn transaction_receipt(&self, hash: B256) -> Result<Option<ReceiptView>> {
        let response: RpcResponse<ReceiptJson> = self
            .call_raw(
                "eth_getTransactionReceipt",
                serde_json::json!([format!("{hash:?}")]),
            )
            .await?;

        if let Some(error) = response.error {
            return Err(WardenError::Connection(format!(
                "eth_getTransactionReceipt: RPC error {} - {}",
                error.code, error.message
            )));
        }

        let Some(receipt) = response.result else {
            return Ok(None);
        };

        let block_number = match &receipt.block_number {
            Some(hex) => Some(parse_quantity(hex)? as u64),
            None => None,
        };

        Ok(Some(ReceiptView {
            transaction_hash: parse_hash(&receipt.transaction_hash)?,
            success: receipt.status.as_deref() != Some("0x0"),
            block_number,
        }))
    }

    async fn logs(&self, filter: &LogFilter) -> Result<Vec<RawLog>> {
        let entries: Vec<LogJson> = self
            .call(
                "eth_getLogs",
                serde_json::json!([{
                    "address": format!("{:?}", filter.address),
                    "topics": [format!("{:?}", filter.topic0)],
                    "fromBlock": format!("0x{:x}", filter.from_block),
                    "toBlock": format!("0x{:x}", filter.to_block),
                }]),
            )
            .await?;

        let mut logs = Vec::with_capacity(entries.len());
        for entry in entries {
            let mut topics = Vec::with_capacity(entry.topics.len());
            for topic in &entry.topics {
                topics.push(parse_hash(topic)?);
            }

            let data = hex::decode(entry.data.trim_start_matches("0x"))
                .map_err(|e| WardenError::Connection(format!("eth_getLogs: bad data hex: {e}")))?;

            let block_number = match &entry.block_number {
                Some(hex) => Some(parse_quantity(hex)? as u64),
                None => None,
            };

            logs.push(RawLog {
                topics,
                data: Bytes::from(data),
                block_number,
            });
        }

        Ok(logs)
    }
}

/// Parse a 0x-prefixed JSON-RPC quantity.
fn parse_quantity(hex: &str) -> Result<u128> {
    u128::from_str_radix(hex.trim_start_matches("0x"), 16)
        .map_err(|e| WardenError::Connection(format!("bad quantity {hex:?}: {e}")))
}

/// Parse a 0x-prefixed 32-byte hash.
fn parse_hash(hex: &str) -> Result<B256> {
    B256::from_str(hex).map_err(|e| WardenError::Connection(format!("bad hash {hex:?}: {e}")))
}
