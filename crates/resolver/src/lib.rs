//! Classifies an address as an externally-owned account or a contract, and
//! for contracts, finds the creation block via binary search over
//! `getCode` snapshots.

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

use chrono::Utc;
use std::sync::Arc;
use tracing::{instrument, warn};
use txidx_cache::KvCache;
use txidx_errors::CoreError;
use txidx_store::DurableStore;
use txidx_types::AddressInfo;
use txidx_upstream::NodeRpc;

fn is_empty_code(code: &str) -> bool {
    code.is_empty() || code == "0x"
}

fn is_retryable_during_search(err: &CoreError) -> bool {
    matches!(err, CoreError::UpstreamTimeout(_) | CoreError::UpstreamTransient(_))
}

/// Resolves address classification through the three-tier cache hierarchy:
/// KV, then the durable store, then live discovery against the node.
#[derive(Clone)]
pub struct Resolver {
    cache: KvCache,
    store: Arc<dyn DurableStore>,
    node: Arc<dyn NodeRpc>,
}

impl std::fmt::Debug for Resolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resolver").finish()
    }
}

impl Resolver {
    /// Build a resolver over the given cache, durable store, and node RPC
    /// client.
    pub fn new(cache: KvCache, store: Arc<dyn DurableStore>, node: Arc<dyn NodeRpc>) -> Self {
        Self { cache, store, node }
    }

    /// Resolve `address`'s classification, consulting KV, then the durable
    /// store, then live discovery in that order. A freshly discovered
    /// result is persisted to both KV and the durable store concurrently;
    /// a failure on one side does not mask success on the other.
    #[instrument(skip(self))]
    pub async fn resolve(&self, address: &str) -> Result<AddressInfo, CoreError> {
        if let Some(info) = self.cache.get_address_info(address).await {
            return Ok(info);
        }

        if let Ok(Some(info)) = self.store.get_address_info(address).await {
            self.cache.set_address_info(address, &info).await;
            return Ok(info);
        }

        let info = self.discover(address).await?;

        let (store_result, ()) =
            tokio::join!(self.store.upsert_address_info(address, &info), self.cache.set_address_info(address, &info));
        if let Err(e) = store_result {
            warn!(address, %e, "failed to persist discovered address info to the durable store");
        }

        Ok(info)
    }

    /// The block a scan for `address` should start from: its creation block
    /// if it is a contract with one known, otherwise genesis. Resolves
    /// `address` first if not already known.
    #[instrument(skip(self))]
    pub async fn starting_block_for(&self, address: &str) -> Result<u64, CoreError> {
        Ok(self.resolve(address).await?.starting_block())
    }

    async fn discover(&self, address: &str) -> Result<AddressInfo, CoreError> {
        let code = self.node.get_code(address, None).await?;
        let now = Utc::now();
        if is_empty_code(&code) {
            return Ok(AddressInfo::eoa(now));
        }
        let creation_block = self.discover_creation_block(address).await?;
        Ok(AddressInfo::contract(creation_block, now))
    }

    /// Binary search over `getCode` snapshots for the smallest block at
    /// which `address` has code. Transient errors at the probed block bias
    /// the search upward rather than failing outright.
    async fn discover_creation_block(&self, address: &str) -> Result<u64, CoreError> {
        let mut lo = 0u64;
        let mut hi = self.node.get_block_number().await?;
        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            match self.node.get_code(address, Some(mid)).await {
                Ok(code) if is_empty_code(&code) => lo = mid + 1,
                Ok(_) => hi = mid,
                Err(e) if is_retryable_during_search(&e) => lo = mid + 1,
                Err(e) => return Err(e),
            }
        }
        Ok(lo)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::{
        collections::HashMap,
        sync::{
            atomic::{AtomicU64, Ordering},
            Mutex,
        },
    };
    use txidx_cache::InMemoryKv;
    use txidx_types::{BlockRange, Balance, GapJob, PaginationParams, Transaction};

    struct FakeStore {
        address_info: Mutex<HashMap<String, AddressInfo>>,
    }

    #[async_trait]
    impl DurableStore for FakeStore {
        async fn insert_transactions_and_extend_coverage(
            &self,
            _: &str,
            _: &[Transaction],
            _: BlockRange,
        ) -> Result<(), CoreError> {
            unimplemented!()
        }
        async fn coverage_for(&self, _: &str) -> Result<Vec<BlockRange>, CoreError> {
            unimplemented!()
        }
        async fn transactions_page(
            &self,
            _: &str,
            _: BlockRange,
            _: PaginationParams,
        ) -> Result<Vec<Transaction>, CoreError> {
            unimplemented!()
        }
        async fn count_transactions(&self, _: &str) -> Result<u64, CoreError> {
            unimplemented!()
        }
        async fn get_balance(&self, _: &str) -> Result<Option<Balance>, CoreError> {
            unimplemented!()
        }
        async fn upsert_balance(&self, _: &str, _: &Balance) -> Result<(), CoreError> {
            unimplemented!()
        }
        async fn get_address_info(&self, address: &str) -> Result<Option<AddressInfo>, CoreError> {
            Ok(self.address_info.lock().unwrap().get(address).copied())
        }
        async fn upsert_address_info(&self, address: &str, info: &AddressInfo) -> Result<(), CoreError> {
            self.address_info.lock().unwrap().insert(address.to_string(), *info);
            Ok(())
        }
        async fn enqueue_jobs(&self, _: &[GapJob]) -> Result<(), CoreError> {
            unimplemented!()
        }
        async fn claim_job(&self) -> Result<Option<GapJob>, CoreError> {
            unimplemented!()
        }
        async fn complete_job(&self, _: &str) -> Result<(), CoreError> {
            unimplemented!()
        }
        async fn retry_or_fail_job(
            &self,
            _: &str,
            _: u32,
            _: &str,
            _: chrono::DateTime<Utc>,
            _: u32,
        ) -> Result<(), CoreError> {
            unimplemented!()
        }
        async fn prune_job_tails(&self, _: u32, _: u32) -> Result<(), CoreError> {
            unimplemented!()
        }
    }

    /// A contract created at block `creation_block`; `hi` is the chain head.
    struct FakeNode {
        creation_block: u64,
        hi: u64,
        code_calls: AtomicU64,
    }

    #[async_trait]
    impl NodeRpc for FakeNode {
        async fn get_block_number(&self) -> Result<u64, CoreError> {
            Ok(self.hi)
        }
        async fn get_balance(&self, _: &str) -> Result<String, CoreError> {
            unimplemented!()
        }
        async fn get_code(&self, _: &str, block_tag: Option<u64>) -> Result<String, CoreError> {
            self.code_calls.fetch_add(1, Ordering::SeqCst);
            let block = block_tag.unwrap_or(self.hi);
            Ok(if block >= self.creation_block { "0x600160015b" } else { "0x" }.to_string())
        }
    }

    fn resolver(store: Arc<FakeStore>, node: Arc<FakeNode>) -> Resolver {
        Resolver::new(
            KvCache::new(
                Arc::new(InMemoryKv::new()),
                std::time::Duration::from_secs(30),
                std::time::Duration::from_secs(30),
                std::time::Duration::from_secs(30),
                std::time::Duration::from_secs(30),
            ),
            store,
            node,
        )
    }

    #[tokio::test]
    async fn eoa_has_no_creation_block() {
        let store = Arc::new(FakeStore { address_info: Mutex::new(HashMap::new()) });
        let node = Arc::new(FakeNode { creation_block: u64::MAX, hi: 1000, code_calls: AtomicU64::new(0) });
        let resolver = resolver(store, node);
        let info = resolver.resolve("0xeoa").await.unwrap();
        assert!(!info.is_contract);
        assert_eq!(info.starting_block(), 0);
    }

    #[tokio::test]
    async fn binary_search_finds_the_creation_block_in_log_calls() {
        let store = Arc::new(FakeStore { address_info: Mutex::new(HashMap::new()) });
        let node = Arc::new(FakeNode { creation_block: 12_345, hi: 1_000_000, code_calls: AtomicU64::new(0) });
        let resolver = resolver(store, node.clone());
        let info = resolver.resolve("0xcontract").await.unwrap();
        assert!(info.is_contract);
        assert_eq!(info.creation_block, Some(12_345));
        // O(log latest): well under a linear scan of 1,000,000 blocks.
        assert!(node.code_calls.load(Ordering::SeqCst) < 30);
    }

    #[tokio::test]
    async fn second_resolve_does_no_upstream_work() {
        let store = Arc::new(FakeStore { address_info: Mutex::new(HashMap::new()) });
        let node = Arc::new(FakeNode { creation_block: 500, hi: 10_000, code_calls: AtomicU64::new(0) });
        let resolver = resolver(store, node.clone());
        resolver.resolve("0xcontract").await.unwrap();
        let calls_after_first = node.code_calls.load(Ordering::SeqCst);
        assert!(calls_after_first > 0);

        let info2 = resolver.resolve("0xcontract").await.unwrap();
        assert_eq!(info2.creation_block, Some(500));
        assert_eq!(node.code_calls.load(Ordering::SeqCst), calls_after_first);
    }

    #[tokio::test]
    async fn starting_block_for_eoa_is_genesis() {
        let store = Arc::new(FakeStore { address_info: Mutex::new(HashMap::new()) });
        let node = Arc::new(FakeNode { creation_block: u64::MAX, hi: 100, code_calls: AtomicU64::new(0) });
        let resolver = resolver(store, node);
        assert_eq!(resolver.starting_block_for("0xeoa").await.unwrap(), 0);
    }
}
