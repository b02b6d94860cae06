use crate::{
    rate_limit::RateLimiter,
    wire::{JsonRpcRequest, JsonRpcResponse},
};
use serde_json::json;
use std::time::Duration;
use tracing::instrument;
use txidx_errors::CoreError;

/// Reads against the Ethereum-like node's JSON-RPC surface, per the
/// external-interfaces contract: current block height, an account's native
/// balance, and its deployed code (used by the resolver's contract-creation
/// binary search).
#[async_trait::async_trait]
pub trait NodeRpc: Send + Sync + 'static {
    /// The current chain head.
    async fn get_block_number(&self) -> Result<u64, CoreError>;

    /// `address`'s native balance in wei, as a decimal string.
    async fn get_balance(&self, address: &str) -> Result<String, CoreError>;

    /// `address`'s deployed code, hex-encoded (`"0x"` for an EOA), as of
    /// `block_tag` (defaults to `"latest"` when absent).
    async fn get_code(&self, address: &str, block_tag: Option<u64>) -> Result<String, CoreError>;
}

/// A `reqwest`-backed JSON-RPC [`NodeRpc`] client, gated by the shared
/// process-wide [`RateLimiter`].
#[derive(Debug, Clone)]
pub struct HttpNodeRpc {
    url: url::Url,
    client: reqwest::Client,
    rate_limiter: RateLimiter,
    timeout: Duration,
}

impl HttpNodeRpc {
    /// Construct a client for `url`, applying `timeout` to every call and
    /// funneling all calls through `rate_limiter`.
    pub fn new(url: url::Url, rate_limiter: RateLimiter, timeout: Duration) -> Self {
        Self { url, client: reqwest::Client::new(), rate_limiter, timeout }
    }

    async fn call(&self, method: &str, params: serde_json::Value) -> Result<serde_json::Value, CoreError> {
        let permit = self.rate_limiter.acquire().await;
        let request = JsonRpcRequest { jsonrpc: "2.0", id: 1, method, params };
        let response = self
            .client
            .post(self.url.clone())
            .timeout(self.timeout)
            .json(&request)
            .send()
            .await
            .map_err(map_reqwest_error)?;
        permit.release();

        let envelope: JsonRpcResponse = response
            .json()
            .await
            .map_err(|e| CoreError::UpstreamInvalid(format!("node RPC response did not parse: {e}")))?;
        if let Some(error) = envelope.error {
            return Err(CoreError::UpstreamInvalid(format!(
                "node RPC error {}: {}",
                error.code, error.message
            )));
        }
        envelope
            .result
            .ok_or_else(|| CoreError::UpstreamInvalid("node RPC response had neither result nor error".into()))
    }
}

fn map_reqwest_error(err: reqwest::Error) -> CoreError {
    if err.is_timeout() {
        CoreError::UpstreamTimeout(err.to_string())
    } else {
        CoreError::UpstreamTransient(err.to_string())
    }
}

fn parse_hex_u64(value: &serde_json::Value, field: &str) -> Result<u64, CoreError> {
    let s = value
        .as_str()
        .ok_or_else(|| CoreError::UpstreamInvalid(format!("{field} was not a string")))?;
    u64::from_str_radix(s.trim_start_matches("0x"), 16)
        .map_err(|e| CoreError::UpstreamInvalid(format!("{field} {s:?} was not valid hex: {e}")))
}

fn parse_hex_string(value: &serde_json::Value, field: &str) -> Result<String, CoreError> {
    value
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| CoreError::UpstreamInvalid(format!("{field} was not a string")))
}

#[async_trait::async_trait]
impl NodeRpc for HttpNodeRpc {
    #[instrument(skip(self))]
    async fn get_block_number(&self) -> Result<u64, CoreError> {
        let result = self.call("eth_blockNumber", json!([])).await?;
        parse_hex_u64(&result, "eth_blockNumber result")
    }

    #[instrument(skip(self))]
    async fn get_balance(&self, address: &str) -> Result<String, CoreError> {
        let result = self.call("eth_getBalance", json!([address, "latest"])).await?;
        let hex = parse_hex_string(&result, "eth_getBalance result")?;
        let wei = u128::from_str_radix(hex.trim_start_matches("0x"), 16)
            .map_err(|e| CoreError::UpstreamInvalid(format!("eth_getBalance result {hex:?} was not valid hex: {e}")))?;
        Ok(wei.to_string())
    }

    #[instrument(skip(self))]
    async fn get_code(&self, address: &str, block_tag: Option<u64>) -> Result<String, CoreError> {
        let tag = block_tag.map_or_else(|| "latest".to_string(), |b| format!("0x{b:x}"));
        let result = self.call("eth_getCode", json!([address, tag])).await?;
        parse_hex_string(&result, "eth_getCode result")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_hex_block_number() {
        let v = serde_json::json!("0x10");
        assert_eq!(parse_hex_u64(&v, "x").unwrap(), 16);
    }

    #[test]
    fn rejects_non_string_result() {
        let v = serde_json::json!(16);
        assert!(parse_hex_u64(&v, "x").is_err());
    }
}
