//! The transaction index core's public orchestration layer.
//!
//! [`TransactionService`] is the single entry point a collaborator (the
//! HTTP layer, a CLI, a test) drives: it wires the KV cache, the durable
//! store, the upstream adapters, the resolver, and the gap scheduler
//! together into the three public operations of the data model.

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

mod balance;
mod count;
mod service;
mod transactions;

pub use service::TransactionService;

#[cfg(test)]
mod test_support {
    use crate::TransactionService;
    use std::sync::Arc;
    use std::time::Duration;
    use txidx_cache::KvCache;
    use txidx_config::Config;
    use txidx_resolver::Resolver;
    use txidx_test_utils::{FakeExplorer, FakeNodeRpc, InMemoryKv, InMemoryStore};

    pub struct ServiceHarness {
        pub service: TransactionService,
        pub store: Arc<InMemoryStore>,
        pub explorer: Arc<FakeExplorer>,
        pub node: Arc<FakeNodeRpc>,
    }

    pub async fn harness() -> ServiceHarness {
        let store = Arc::new(InMemoryStore::new());
        let explorer = Arc::new(FakeExplorer::new());
        let node = Arc::new(FakeNodeRpc::new(1_000));
        let cache = KvCache::new(
            Arc::new(InMemoryKv::new()),
            Duration::from_secs(30),
            Duration::from_secs(300),
            Duration::from_secs(604_800),
            Duration::from_secs(300),
        );
        let resolver = Resolver::new(cache.clone(), store.clone(), node.clone());

        let config = Config {
            database_url: "postgres://localhost/txidx".into(),
            explorer_base_url: "https://explorer.example/api".parse().unwrap(),
            node_rpc_url: "https://node.example/rpc".parse().unwrap(),
            balance_cache_ttl_secs: 30,
            tx_query_cache_ttl_secs: 300,
            txcount_cache_ttl_secs: 300,
            address_info_cache_ttl_secs: 604_800,
            rpc_timeout_ms: 10_000,
            explorer_timeout_ms: 5_000,
            worker_concurrency: 2,
            max_blocks_per_job: 5_000,
            max_tx_per_batch: 5_000,
            rate_limit_tokens_per_sec: 5,
            rate_limit_max_concurrent: 1,
            job_retry_attempts: 3,
            job_retry_backoff_base_ms: 2_000,
        };

        let service = TransactionService::new(
            cache,
            store.clone(),
            explorer.clone(),
            node.clone(),
            resolver,
            &config,
        );

        ServiceHarness { service, store, explorer, node }
    }
}
