use std::sync::Arc;
use txidx_cache::KvCache;
use txidx_config::Config;
use txidx_resolver::Resolver;
use txidx_store::DurableStore;
use txidx_upstream::{Explorer, NodeRpc};

/// The orchestrator behind `get_transactions`, `get_balance`, and
/// `get_stored_count`. Holds everything those operations need: the cache,
/// the durable store, the upstream adapters, the address resolver, and the
/// subset of configuration that tunes their behavior.
#[derive(Clone)]
pub struct TransactionService {
    pub(crate) cache: KvCache,
    pub(crate) store: Arc<dyn DurableStore>,
    pub(crate) explorer: Arc<dyn Explorer>,
    pub(crate) node: Arc<dyn NodeRpc>,
    pub(crate) resolver: Resolver,
    pub(crate) max_blocks_per_job: u64,
}

impl std::fmt::Debug for TransactionService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransactionService").finish()
    }
}

impl TransactionService {
    /// Assemble a service from its collaborators and the relevant slice of
    /// `config`.
    pub fn new(
        cache: KvCache,
        store: Arc<dyn DurableStore>,
        explorer: Arc<dyn Explorer>,
        node: Arc<dyn NodeRpc>,
        resolver: Resolver,
        config: &Config,
    ) -> Self {
        Self { cache, store, explorer, node, resolver, max_blocks_per_job: config.max_blocks_per_job }
    }
}
