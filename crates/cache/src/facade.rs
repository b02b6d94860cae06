use crate::store::KvStore;
use serde::{de::DeserializeOwned, Serialize};
use std::{sync::Arc, time::Duration};
use tracing::{instrument, warn};
use txidx_types::{AddressInfo, Balance, Order, TxQueryResponse, TxSource};

/// Typed facade over a [`KvStore`], owning the key scheme and TTLs from the
/// data model. Every read here is best-effort: a [`KvStore`] failure is
/// logged and downgraded to a miss rather than propagated, per the design
/// ("all cache reads are best-effort").
#[derive(Clone)]
pub struct KvCache {
    store: Arc<dyn KvStore>,
    balance_ttl: Duration,
    txcount_ttl: Duration,
    address_info_ttl: Duration,
    tx_query_ttl: Duration,
}

impl std::fmt::Debug for KvCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KvCache").finish()
    }
}

impl KvCache {
    /// Construct a facade over `store`, with the TTLs from configuration.
    pub fn new(
        store: Arc<dyn KvStore>,
        balance_ttl: Duration,
        txcount_ttl: Duration,
        address_info_ttl: Duration,
        tx_query_ttl: Duration,
    ) -> Self {
        Self { store, balance_ttl, txcount_ttl, address_info_ttl, tx_query_ttl }
    }

    async fn get_json<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        match self.store.get_raw(key).await {
            Ok(Some(raw)) => match serde_json::from_str(&raw) {
                Ok(value) => Some(value),
                Err(e) => {
                    warn!(key, %e, "cache value failed to deserialize, treating as a miss");
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                warn!(key, %e, "cache read failed, treating as a miss");
                None
            }
        }
    }

    async fn set_json<T: Serialize + Sync>(&self, key: &str, value: &T, ttl: Duration) {
        match serde_json::to_string(value) {
            Ok(raw) => {
                if let Err(e) = self.store.set_raw(key, raw, ttl).await {
                    warn!(key, %e, "cache write failed");
                }
            }
            Err(e) => warn!(key, %e, "cache value failed to serialize, not writing"),
        }
    }

    /// `blockchain:balance:{addr}`
    #[instrument(skip(self))]
    pub async fn get_balance(&self, address: &str) -> Option<Balance> {
        self.get_json(&balance_key(address)).await
    }

    /// Write-through for [`Self::get_balance`].
    #[instrument(skip(self, value))]
    pub async fn set_balance(&self, address: &str, value: &Balance) {
        self.set_json(&balance_key(address), value, self.balance_ttl).await;
    }

    /// `blockchain:txcount:{addr}`
    #[instrument(skip(self))]
    pub async fn get_txcount(&self, address: &str) -> Option<u64> {
        self.get_json(&txcount_key(address)).await
    }

    /// Write-through for [`Self::get_txcount`].
    #[instrument(skip(self))]
    pub async fn set_txcount(&self, address: &str, count: u64) {
        self.set_json(&txcount_key(address), &count, self.txcount_ttl).await;
    }

    /// `blockchain:address_info:{addr}`
    #[instrument(skip(self))]
    pub async fn get_address_info(&self, address: &str) -> Option<AddressInfo> {
        self.get_json(&address_info_key(address)).await
    }

    /// Write-through for [`Self::get_address_info`].
    #[instrument(skip(self, value))]
    pub async fn set_address_info(&self, address: &str, value: &AddressInfo) {
        self.set_json(&address_info_key(address), value, self.address_info_ttl).await;
    }

    /// `blockchain:tx:paginated:{addr}:{fromBlock}:{toBlock}:{page}:{limit}:{order}`
    #[instrument(skip(self))]
    pub async fn get_tx_query(
        &self,
        address: &str,
        from_block: u64,
        to_block: u64,
        page: u32,
        limit: u32,
        order: Order,
    ) -> Option<TxQueryResponse> {
        let key = tx_query_key(address, from_block, to_block, page, limit, order);
        self.get_json(&key).await
    }

    /// Write-through for [`Self::get_tx_query`]. Stamps `from_cache = true`
    /// and `metadata.source = Cache` on the stored copy so that the next
    /// read reports its origin correctly, without the caller having to
    /// remember to do so.
    #[instrument(skip(self, value))]
    pub async fn set_tx_query(
        &self,
        address: &str,
        from_block: u64,
        to_block: u64,
        page: u32,
        limit: u32,
        order: Order,
        value: &TxQueryResponse,
    ) {
        let key = tx_query_key(address, from_block, to_block, page, limit, order);
        let mut stamped = value.clone();
        stamped.from_cache = true;
        stamped.metadata.source = TxSource::Cache;
        self.set_json(&key, &stamped, self.tx_query_ttl).await;
    }
}

fn balance_key(address: &str) -> String {
    format!("blockchain:balance:{address}")
}

fn txcount_key(address: &str) -> String {
    format!("blockchain:txcount:{address}")
}

fn address_info_key(address: &str) -> String {
    format!("blockchain:address_info:{address}")
}

fn tx_query_key(
    address: &str,
    from_block: u64,
    to_block: u64,
    page: u32,
    limit: u32,
    order: Order,
) -> String {
    format!(
        "blockchain:tx:paginated:{address}:{from_block}:{to_block}:{page}:{limit}:{}",
        order.as_str()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryKv;
    use chrono::Utc;
    use txidx_types::{PaginationInfo, ResponseMetadata, TxSource};

    fn cache() -> KvCache {
        KvCache::new(
            Arc::new(InMemoryKv::new()),
            Duration::from_secs(30),
            Duration::from_secs(300),
            Duration::from_secs(604_800),
            Duration::from_secs(300),
        )
    }

    #[tokio::test]
    async fn balance_round_trips() {
        let cache = cache();
        let balance = Balance { balance: "100".into(), block_number: 5, updated_at: Utc::now() };
        cache.set_balance("0xabc", &balance).await;
        assert_eq!(cache.get_balance("0xabc").await, Some(balance));
    }

    #[tokio::test]
    async fn miss_on_unset_key() {
        let cache = cache();
        assert_eq!(cache.get_txcount("0xnobody").await, None);
    }

    #[tokio::test]
    async fn tx_query_cache_stamps_from_cache_on_write_back() {
        let cache = cache();
        let response = TxQueryResponse {
            transactions: vec![],
            from_cache: false,
            pagination: PaginationInfo { page: 1, limit: 10, has_more: false },
            metadata: ResponseMetadata {
                address: "0xabc".into(),
                from_block: 0,
                to_block: 10,
                source: TxSource::Explorer,
                background_processing: true,
                incomplete: false,
            },
        };
        cache.set_tx_query("0xabc", 0, 10, 1, 10, Order::Asc, &response).await;
        let cached = cache.get_tx_query("0xabc", 0, 10, 1, 10, Order::Asc).await.unwrap();
        assert!(cached.from_cache);
        assert_eq!(cached.metadata.source, TxSource::Cache);
        assert_eq!(cached.transactions, response.transactions);
    }
}
