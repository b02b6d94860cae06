//! Typed configuration surface for the transaction index core.
//!
//! Every tunable named in the system's configuration surface is a field of
//! [`Config`], loaded through the `env_utils` helpers rather than read
//! ad hoc from `std::env` at the point of use. Business logic never
//! hardcodes a TTL, a retry count, or a rate limit; it receives a `Config`
//! (or a field of one) from its caller.

#![warn(
    missing_copy_implementations,
    missing_debug_implementations,
    missing_docs,
    unreachable_pub,
    clippy::missing_const_for_fn,
    rustdoc::all
)]
#![cfg_attr(not(test), warn(unused_crate_dependencies))]
#![deny(unused_must_use, rust_2018_idioms)]

mod error;
pub use error::ConfigError;

/// Environment-variable loading helpers.
pub mod env_utils;

use url::Url;

/// The full configuration surface recognized by the transaction index core.
#[derive(Debug, Clone)]
pub struct Config {
    /// Postgres connection string for the durable store.
    pub database_url: String,
    /// Base URL of the upstream block explorer's `txlist` API.
    pub explorer_base_url: Url,
    /// Base URL of the upstream JSON-RPC node.
    pub node_rpc_url: Url,

    /// TTL for cached balance snapshots, in seconds. Default 30.
    pub balance_cache_ttl_secs: u64,
    /// TTL for cached paginated transaction-query responses, in seconds.
    /// Default 300.
    pub tx_query_cache_ttl_secs: u64,
    /// TTL for cached stored-transaction counts, in seconds. Default 300.
    pub txcount_cache_ttl_secs: u64,
    /// TTL for cached address-info lookups, in seconds. Default 604800 (7
    /// days).
    pub address_info_cache_ttl_secs: u64,

    /// Deadline for NodeRPC calls, in milliseconds. Default 10000.
    pub rpc_timeout_ms: u64,
    /// Deadline for Explorer calls, in milliseconds. Default 5000.
    pub explorer_timeout_ms: u64,

    /// Number of concurrent gap workers. Default 2.
    pub worker_concurrency: u32,
    /// Maximum blocks per enqueued gap job. Default 5000.
    pub max_blocks_per_job: u64,
    /// Maximum transactions requested per explorer page inside a worker.
    /// Default 5000.
    pub max_tx_per_batch: u32,

    /// Explorer rate limit: tokens replenished per second. Default 5.
    pub rate_limit_tokens_per_sec: u32,
    /// Explorer rate limit: maximum in-flight requests. Default 1.
    pub rate_limit_max_concurrent: u32,

    /// Maximum attempts per gap job before it is parked in the failed tail.
    /// Default 3.
    pub job_retry_attempts: u32,
    /// Base of the exponential backoff between job retries, in
    /// milliseconds. Default 2000.
    pub job_retry_backoff_base_ms: u64,
}

impl Config {
    /// Load configuration from the environment. Required variables
    /// (`DATABASE_URL`, `EXPLORER_BASE_URL`, `NODE_RPC_URL`) have no
    /// default and this fails if any is missing or malformed; every other
    /// variable falls back to the default documented on its field.
    pub fn from_env() -> Result<Self, ConfigError> {
        use env_utils::*;

        Ok(Self {
            database_url: load_string("DATABASE_URL")?,
            explorer_base_url: load_url("EXPLORER_BASE_URL")?,
            node_rpc_url: load_url("NODE_RPC_URL")?,

            balance_cache_ttl_secs: load_u64_or("BALANCE_CACHE_TTL", 30)?,
            tx_query_cache_ttl_secs: load_u64_or("TX_QUERY_CACHE_TTL", 300)?,
            txcount_cache_ttl_secs: load_u64_or("TXCOUNT_CACHE_TTL", 300)?,
            address_info_cache_ttl_secs: load_u64_or("ADDRESS_INFO_CACHE_TTL", 604_800)?,

            rpc_timeout_ms: load_u64_or("RPC_TIMEOUT_MS", 10_000)?,
            explorer_timeout_ms: load_u64_or("EXPLORER_TIMEOUT_MS", 5_000)?,

            worker_concurrency: load_u32_or("WORKER_CONCURRENCY", 2)?,
            max_blocks_per_job: load_u64_or("MAX_BLOCKS_PER_JOB", 5_000)?,
            max_tx_per_batch: load_u32_or("MAX_TX_PER_BATCH", 5_000)?,

            rate_limit_tokens_per_sec: load_u32_or("RATE_LIMIT_TOKENS_PER_SEC", 5)?,
            rate_limit_max_concurrent: load_u32_or("RATE_LIMIT_MAX_CONCURRENT", 1)?,

            job_retry_attempts: load_u32_or("JOB_RETRY_ATTEMPTS", 3)?,
            job_retry_backoff_base_ms: load_u64_or("JOB_RETRY_BACKOFF_BASE_MS", 2_000)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // Environment variables are process-global, so tests that touch them
    // are serialized through this lock to avoid interleaving.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    fn clear_vars() {
        for key in [
            "DATABASE_URL",
            "EXPLORER_BASE_URL",
            "NODE_RPC_URL",
            "BALANCE_CACHE_TTL",
            "WORKER_CONCURRENCY",
        ] {
            std::env::remove_var(key);
        }
    }

    #[test]
    fn missing_required_variable_is_an_error() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_vars();
        assert!(matches!(Config::from_env(), Err(ConfigError::Var(_))));
    }

    #[test]
    fn defaults_apply_when_optional_variables_are_unset() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_vars();
        std::env::set_var("DATABASE_URL", "postgres://localhost/txidx");
        std::env::set_var("EXPLORER_BASE_URL", "https://explorer.example/api");
        std::env::set_var("NODE_RPC_URL", "https://node.example/rpc");

        let cfg = Config::from_env().unwrap();
        assert_eq!(cfg.balance_cache_ttl_secs, 30);
        assert_eq!(cfg.worker_concurrency, 2);
        assert_eq!(cfg.job_retry_attempts, 3);

        clear_vars();
    }

    #[test]
    fn explicit_values_override_defaults() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_vars();
        std::env::set_var("DATABASE_URL", "postgres://localhost/txidx");
        std::env::set_var("EXPLORER_BASE_URL", "https://explorer.example/api");
        std::env::set_var("NODE_RPC_URL", "https://node.example/rpc");
        std::env::set_var("WORKER_CONCURRENCY", "8");

        let cfg = Config::from_env().unwrap();
        assert_eq!(cfg.worker_concurrency, 8);

        clear_vars();
    }
}
