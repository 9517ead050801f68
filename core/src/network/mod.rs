/// Thin JSON-RPC client for chain reads: balances and contract calls.
mod abi;
mod contracts;
mod types;

pub use abi::{decode_address_word, decode_uint_word, encode_call, selector};
pub use types::*;

use std::sync::atomic::{AtomicU64, Ordering};

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::address::Address;
use crate::config::NetworkConfig;

pub struct NetworkClient {
    pub(super) http: reqwest::Client,
    pub(super) rpc_url: String,
    next_id: AtomicU64,
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcErrorBody>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorBody {
    code: i64,
    message: String,
}

/// Reject non-HTTPS node URLs unless `allow_insecure` is set.
fn validate_rpc_url(url: &str, allow_insecure: bool) -> Result<()> {
    if url.starts_with("https://") {
        return Ok(());
    }
    if url.starts_with("http://") {
        if allow_insecure {
            return Ok(());
        }
        bail!("Refusing to connect over plain HTTP: {url}\nUse --insecure to allow unencrypted connections.");
    }
    bail!("Invalid RPC URL scheme: {url}\nExpected an https:// URL.");
}

/// Parse a JSON-RPC hex quantity (`"0x1bc16d674ec80000"`).
pub fn parse_quantity(value: &str) -> Result<u128> {
    let digits = value
        .strip_prefix("0x")
        .with_context(|| format!("Quantity '{value}' is not 0x-prefixed"))?;
    if digits.is_empty() {
        return Ok(0);
    }
    u128::from_str_radix(digits, 16).with_context(|| format!("Quantity '{value}' out of range"))
}

impl NetworkClient {
    pub fn new(config: &NetworkConfig, allow_insecure: bool) -> Result<Self> {
        let url = config.rpc_url()?;
        Self::new_custom(&url, allow_insecure || config.allows_plain_http())
    }

    /// Create a client pointed at an arbitrary JSON-RPC endpoint.
    pub fn new_custom(url: &str, allow_insecure: bool) -> Result<Self> {
        validate_rpc_url(url, allow_insecure)?;
        let http = reqwest::Client::builder()
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            http,
            rpc_url: url.to_string(),
            next_id: AtomicU64::new(1),
        })
    }

    pub fn rpc_url(&self) -> &str {
        &self.rpc_url
    }

    /// Issue a single JSON-RPC request and return its `result`.
    pub async fn call(&self, method: &str, params: Value) -> Result<Value> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });
        tracing::debug!(method, id, "rpc request");

        let resp = self
            .http
            .post(&self.rpc_url)
            .json(&body)
            .send()
            .await
            .with_context(|| format!("RPC request {method} failed"))?;
        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let text = resp.text().await.unwrap_or_default();
            bail!("RPC {method} returned HTTP {status}: {text}");
        }

        let parsed: RpcResponse = resp
            .json()
            .await
            .with_context(|| format!("Invalid JSON-RPC response for {method}"))?;
        if let Some(err) = parsed.error {
            bail!("RPC {method} error {}: {}", err.code, err.message);
        }
        parsed
            .result
            .with_context(|| format!("RPC {method} returned no result"))
    }

    /// Native balance of an address, in wei.
    pub async fn balance(&self, address: &Address) -> Result<u128> {
        let result = self
            .call("eth_getBalance", json!([address.to_string(), "latest"]))
            .await
            .context("Failed to query balance")?;
        let quantity = result.as_str().context("Balance is not a string")?;
        parse_quantity(quantity)
    }

    pub async fn chain_id(&self) -> Result<u64> {
        let result = self.call("eth_chainId", json!([])).await?;
        let quantity = result.as_str().context("Chain id is not a string")?;
        u64::try_from(parse_quantity(quantity)?).context("Chain id out of range")
    }

    /// Check the node answers before anything else is asked of it.
    pub async fn ensure_connected(&self) -> Result<u64> {
        let chain_id = self
            .chain_id()
            .await
            .with_context(|| format!("Not connected to {}", self.rpc_url))?;
        tracing::debug!(rpc = %self.rpc_url, chain_id, "connected");
        Ok(chain_id)
    }

    /// Read-only contract call at the latest block. Returns the raw return data.
    pub async fn eth_call(&self, to: &Address, data: &[u8]) -> Result<Vec<u8>> {
        let result = self
            .call(
                "eth_call",
                json!([
                    { "to": to.to_string(), "data": format!("0x{}", hex::encode(data)) },
                    "latest"
                ]),
            )
            .await?;
        let raw = result.as_str().context("Call result is not a string")?;
        let digits = raw.strip_prefix("0x").unwrap_or(raw);
        hex::decode(digits).context("Call result is not valid hex")
    }
}
