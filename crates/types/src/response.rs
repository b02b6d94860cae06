use crate::Transaction;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Where a `get_transactions` response's data came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TxSource {
    /// Served from the durable store because coverage was already complete.
    Database,
    /// Served by a live call to the upstream explorer.
    Explorer,
    /// Served from the KV cache.
    Cache,
}

/// Where a `get_balance` response's data came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BalanceSource {
    /// Served from the KV cache.
    Cache,
    /// Served by a live call to the upstream node.
    Provider,
    /// Served from the last durable snapshot after an upstream failure.
    Database,
}

/// Where a `get_stored_count` response's data came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CountSource {
    /// Served from the KV cache.
    Cache,
    /// Served by a `COUNT(*)` against the durable store.
    Database,
}

/// Pagination echoed back on a `get_transactions` response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaginationInfo {
    /// The page that was served.
    pub page: u32,
    /// The page size that was served.
    pub limit: u32,
    /// `true` iff `returned_count == limit`; pagination is count-based, not
    /// total-based.
    pub has_more: bool,
}

/// Metadata describing how a `get_transactions` response was produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseMetadata {
    /// The normalized, lowercase address the query was for.
    pub address: String,
    /// The effective lower bound after resolver/chain-head substitution.
    pub from_block: u64,
    /// The effective upper bound after resolver/chain-head substitution.
    pub to_block: u64,
    /// Where the data came from.
    pub source: TxSource,
    /// `true` if any gap was scheduled for background fill while serving
    /// this response.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub background_processing: bool,
    /// `true` if the explorer timed out on both the original call and the
    /// half-range retry, and the response was served from the database
    /// despite not being fully covered.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub incomplete: bool,
}

/// Response for `get_transactions`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxQueryResponse {
    /// The page of transactions.
    pub transactions: Vec<Transaction>,
    /// `true` if this response was served verbatim from the KV cache.
    pub from_cache: bool,
    /// Pagination info.
    pub pagination: PaginationInfo,
    /// How this response was produced.
    pub metadata: ResponseMetadata,
}

/// Response for `get_balance`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceResponse {
    /// The normalized, lowercase address.
    pub address: String,
    /// Balance in ether, as a decimal string.
    pub balance: String,
    /// Balance in wei, as a decimal string.
    pub balance_wei: String,
    /// Block height the balance was read at.
    pub block_number: u64,
    /// When the underlying snapshot was last refreshed.
    pub last_updated: DateTime<Utc>,
    /// `true` if this response was served from the KV cache.
    pub from_cache: bool,
    /// Age of the cached value, if served from cache.
    pub cache_age_secs: Option<i64>,
    /// How this response was produced.
    pub source: BalanceSource,
}

/// Response for `get_stored_count`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountResponse {
    /// The normalized, lowercase address.
    pub address: String,
    /// Number of persisted transactions for the address.
    pub count: u64,
    /// `true` if this response was served from the KV cache.
    pub from_cache: bool,
    /// How this response was produced.
    pub source: CountSource,
}
