use crate::service::TransactionService;
use tracing::instrument;
use txidx_errors::CoreError;
use txidx_types::{normalize_address, CountResponse, CountSource};

impl TransactionService {
    /// `get_stored_count`: KV, then a `COUNT(*)` against the durable store.
    #[instrument(skip(self))]
    pub async fn get_stored_count(&self, address: &str) -> Result<CountResponse, CoreError> {
        let normalized = normalize_address(address)?;
        let address = normalized.lowercase();

        if let Some(count) = self.cache.get_txcount(&address).await {
            return Ok(CountResponse { address, count, from_cache: true, source: CountSource::Cache });
        }

        let count = self.store.count_transactions(&address).await?;
        self.cache.set_txcount(&address, count).await;
        Ok(CountResponse { address, count, from_cache: false, source: CountSource::Database })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{harness, ServiceHarness};
    use txidx_types::BlockRange;

    #[tokio::test]
    async fn counts_persisted_transactions_then_caches() {
        let ServiceHarness { service, store, .. } = harness().await;
        let address = "33".repeat(20);
        let range = BlockRange::new(0, 10).unwrap();
        store.insert_transactions_and_extend_coverage(&address, &[], range).await.unwrap();

        let first = service.get_stored_count(&address).await.unwrap();
        assert_eq!(first.count, 0);
        assert_eq!(first.source, CountSource::Database);

        let second = service.get_stored_count(&address).await.unwrap();
        assert_eq!(second.source, CountSource::Cache);
        assert!(second.from_cache);
    }
}
