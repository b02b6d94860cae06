use async_trait::async_trait;
use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicU64, Ordering},
        Mutex,
    },
};
use txidx_errors::CoreError;
use txidx_types::{Order, Transaction};
use txidx_upstream::{Explorer, NodeRpc};

/// A canned [`Explorer`] backed by a fixed per-address transaction log.
/// `txlist` answers from that log by slicing to `[start_block, end_block]`
/// and paginating exactly as the real HTTP adapter would; it never returns
/// a query-timeout unless primed to with [`FakeExplorer::fail_next_with_timeout`].
#[derive(Default)]
pub struct FakeExplorer {
    ledger: Mutex<HashMap<String, Vec<Transaction>>>,
    timeout_budget: AtomicU64,
    calls: AtomicU64,
}

impl std::fmt::Debug for FakeExplorer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FakeExplorer").finish()
    }
}

impl FakeExplorer {
    /// An explorer with no recorded transactions for any address.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed `address`'s transaction log.
    pub fn seed(&self, address: &str, transactions: Vec<Transaction>) {
        self.ledger.lock().unwrap().insert(address.to_string(), transactions);
    }

    /// The next `n` calls to `txlist` return [`CoreError::UpstreamTimeout`]
    /// instead of consulting the ledger.
    pub fn fail_next_with_timeout(&self, n: u64) {
        self.timeout_budget.store(n, Ordering::SeqCst);
    }

    /// Number of `txlist` calls made so far.
    pub fn call_count(&self) -> u64 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Explorer for FakeExplorer {
    async fn txlist(
        &self,
        address: &str,
        start_block: u64,
        end_block: u64,
        page: u32,
        offset: u32,
        sort: Order,
    ) -> Result<Vec<Transaction>, CoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let remaining = self.timeout_budget.load(Ordering::SeqCst);
        if remaining > 0 {
            self.timeout_budget.store(remaining - 1, Ordering::SeqCst);
            return Err(CoreError::UpstreamTimeout("result window is too large".into()));
        }

        let ledger = self.ledger.lock().unwrap();
        let mut rows: Vec<Transaction> = ledger
            .get(address)
            .into_iter()
            .flatten()
            .filter(|t| t.block_number >= start_block && t.block_number <= end_block)
            .cloned()
            .collect();
        rows.sort_by_key(|t| t.block_number);
        if sort == Order::Desc {
            rows.reverse();
        }
        let start = ((page.saturating_sub(1)) as usize) * offset as usize;
        Ok(rows.into_iter().skip(start).take(offset as usize).collect())
    }
}

/// A canned [`NodeRpc`] with a fixed chain head and a contract-creation
/// block per address; every other address is treated as an EOA.
pub struct FakeNodeRpc {
    head: AtomicU64,
    creation_blocks: Mutex<HashMap<String, u64>>,
}

impl std::fmt::Debug for FakeNodeRpc {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FakeNodeRpc").finish()
    }
}

impl FakeNodeRpc {
    /// A node at chain head `head`, with no known contracts.
    pub fn new(head: u64) -> Self {
        Self { head: AtomicU64::new(head), creation_blocks: Mutex::new(HashMap::new()) }
    }

    /// Mark `address` as a contract created at `block`.
    pub fn seed_contract(&self, address: &str, block: u64) {
        self.creation_blocks.lock().unwrap().insert(address.to_string(), block);
    }

    /// Advance the chain head to `head`.
    pub fn set_head(&self, head: u64) {
        self.head.store(head, Ordering::SeqCst);
    }
}

#[async_trait]
impl NodeRpc for FakeNodeRpc {
    async fn get_block_number(&self) -> Result<u64, CoreError> {
        Ok(self.head.load(Ordering::SeqCst))
    }

    async fn get_balance(&self, _address: &str) -> Result<String, CoreError> {
        Ok("0".to_string())
    }

    async fn get_code(&self, address: &str, block_tag: Option<u64>) -> Result<String, CoreError> {
        let creation_blocks = self.creation_blocks.lock().unwrap();
        let Some(&creation_block) = creation_blocks.get(address) else {
            return Ok("0x".to_string());
        };
        let block = block_tag.unwrap_or_else(|| self.head.load(Ordering::SeqCst));
        Ok(if block >= creation_block { "0x600160015b".to_string() } else { "0x".to_string() })
    }
}
