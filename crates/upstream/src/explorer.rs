use crate::{
    rate_limit::RateLimiter,
    wire::{ExplorerEnvelope, ExplorerTxRecord},
};
use chrono::{DateTime, Utc};
use std::time::Duration;
use tracing::{instrument, warn};
use txidx_errors::CoreError;
use txidx_types::{Order, Transaction};

/// The upstream chain explorer's paginated transaction listing, per the
/// external-interfaces contract. Implementations are expected to surface
/// [`CoreError::UpstreamTimeout`] specifically when the explorer refuses a
/// range as too large, distinct from a plain network timeout
/// ([`CoreError::UpstreamTransient`]), so callers can run their dedicated
/// recovery paths.
#[async_trait::async_trait]
pub trait Explorer: Send + Sync + 'static {
    /// Fetch up to `offset` transactions for `address` within
    /// `[start_block, end_block]`, ordered by block then position.
    async fn txlist(
        &self,
        address: &str,
        start_block: u64,
        end_block: u64,
        page: u32,
        offset: u32,
        sort: Order,
    ) -> Result<Vec<Transaction>, CoreError>;
}

/// A `reqwest`-backed [`Explorer`] for an Etherscan-shaped REST API, gated
/// by the shared process-wide [`RateLimiter`].
#[derive(Debug, Clone)]
pub struct HttpExplorer {
    base_url: url::Url,
    client: reqwest::Client,
    rate_limiter: RateLimiter,
    timeout: Duration,
}

impl HttpExplorer {
    /// Construct an adapter for `base_url`, applying `timeout` to every
    /// call and funneling all calls through `rate_limiter`.
    pub fn new(base_url: url::Url, rate_limiter: RateLimiter, timeout: Duration) -> Self {
        Self { base_url, client: reqwest::Client::new(), rate_limiter, timeout }
    }
}

fn is_query_window_error(message: &str) -> bool {
    let lower = message.to_ascii_lowercase();
    lower.contains("window is too large") || lower.contains("result window")
}

fn parse_record(address: &str, record: ExplorerTxRecord) -> Result<Transaction, CoreError> {
    let block_number = record
        .block_number
        .parse::<u64>()
        .map_err(|e| CoreError::UpstreamInvalid(format!("bad blockNumber {:?}: {e}", record.block_number)))?;
    let time_stamp = record
        .time_stamp
        .parse::<i64>()
        .map_err(|e| CoreError::UpstreamInvalid(format!("bad timeStamp {:?}: {e}", record.time_stamp)))?;
    let timestamp: DateTime<Utc> = DateTime::from_timestamp(time_stamp, 0)
        .ok_or_else(|| CoreError::UpstreamInvalid(format!("timeStamp {time_stamp} out of range")))?;

    let to = (!record.to.is_empty()).then_some(record.to);
    let contract_address = (!record.contract_address.is_empty()).then_some(record.contract_address);
    let gas_used = (!record.gas_used.is_empty())
        .then(|| record.gas_used.parse::<u64>())
        .transpose()
        .map_err(|e| CoreError::UpstreamInvalid(format!("bad gasUsed: {e}")))?;
    let gas = (!record.gas.is_empty())
        .then(|| record.gas.parse::<u64>())
        .transpose()
        .map_err(|e| CoreError::UpstreamInvalid(format!("bad gas: {e}")))?;

    let is_error = (!record.is_error.is_empty()).then_some(record.is_error.as_str());
    let txreceipt_status = (!record.txreceipt_status.is_empty()).then_some(record.txreceipt_status.as_str());
    let receipt_status = Transaction::derive_receipt_status(is_error, txreceipt_status);
    let explicit_function_name = (!record.function_name.is_empty()).then_some(record.function_name);
    let function_name = Transaction::derive_function_name(&record.input, explicit_function_name);

    Ok(Transaction {
        hash: record.hash,
        address: address.to_string(),
        block_number,
        from: record.from,
        to,
        value: record.value,
        gas_price: record.gas_price,
        gas_used,
        gas,
        function_name,
        receipt_status,
        contract_address,
        timestamp,
    })
}

#[async_trait::async_trait]
impl Explorer for HttpExplorer {
    #[instrument(skip(self))]
    async fn txlist(
        &self,
        address: &str,
        start_block: u64,
        end_block: u64,
        page: u32,
        offset: u32,
        sort: Order,
    ) -> Result<Vec<Transaction>, CoreError> {
        let permit = self.rate_limiter.acquire().await;
        let mut url = self.base_url.clone();
        url.query_pairs_mut()
            .append_pair("module", "account")
            .append_pair("action", "txlist")
            .append_pair("address", address)
            .append_pair("startblock", &start_block.to_string())
            .append_pair("endblock", &end_block.to_string())
            .append_pair("page", &page.to_string())
            .append_pair("offset", &offset.to_string())
            .append_pair("sort", sort.as_str());

        let response = self
            .client
            .get(url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(map_reqwest_error)?;
        permit.release();

        let envelope: ExplorerEnvelope = response.json().await.map_err(|e| {
            CoreError::UpstreamInvalid(format!("explorer response did not parse: {e}"))
        })?;

        if envelope.status != "1" {
            if is_query_window_error(&envelope.message) {
                return Err(CoreError::UpstreamTimeout(envelope.message));
            }
            // "No transactions found" and similar are empty results, not errors.
            if envelope.result.as_array().is_none_or(|a| a.is_empty()) {
                return Ok(Vec::new());
            }
        }

        let records: Vec<ExplorerTxRecord> = serde_json::from_value(envelope.result)
            .map_err(|e| CoreError::UpstreamInvalid(format!("explorer result did not parse: {e}")))?;

        records.into_iter().map(|r| parse_record(address, r)).collect()
    }
}

fn map_reqwest_error(err: reqwest::Error) -> CoreError {
    if err.is_timeout() {
        warn!(%err, "explorer call timed out");
        CoreError::UpstreamTimeout(err.to_string())
    } else {
        warn!(%err, "explorer call failed");
        CoreError::UpstreamTransient(err.to_string())
    }
}
