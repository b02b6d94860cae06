use crate::service::TransactionService;
use chrono::Utc;
use tracing::{instrument, warn};
use txidx_coverage::find_gaps;
use txidx_errors::CoreError;
use txidx_scheduler::plan_jobs;
use txidx_types::{
    normalize_address, validate_pagination, BlockRange, Order, PaginationInfo, PaginationParams,
    ResponseMetadata, Transaction, TxQueryResponse, TxSource,
};

impl TransactionService {
    /// Serve a page of transactions for `address` over `[from, to]`
    /// (defaulting through the resolver and the chain head), scheduling
    /// background fill for whatever the durable store doesn't yet cover.
    #[instrument(skip(self))]
    pub async fn get_transactions(
        &self,
        address: &str,
        from: Option<u64>,
        to: Option<u64>,
        page: u32,
        limit: u32,
        order: Order,
    ) -> Result<TxQueryResponse, CoreError> {
        let normalized = normalize_address(address)?;
        let address = normalized.lowercase();
        let pagination = validate_pagination(page, limit, order)?;

        if let (Some(f), Some(t)) = (from, to) {
            if f > t {
                return Err(CoreError::InvalidInput(format!("from ({f}) must be <= to ({t})")));
            }
        }

        let eff_from = match from {
            Some(f) => f,
            None => self.resolver.starting_block_for(&address).await?,
        };
        let eff_to = match to {
            Some(t) => t,
            None => self.node.get_block_number().await?,
        };

        if eff_from > eff_to {
            return Ok(empty_page(&address, eff_from, eff_to, pagination));
        }

        if let Some(cached) =
            self.cache.get_tx_query(&address, eff_from, eff_to, pagination.page(), pagination.limit(), order).await
        {
            return Ok(cached);
        }

        let coverage = self.store.coverage_for(&address).await?;
        let gaps = find_gaps(&coverage, eff_from, eff_to);

        let mut response = if gaps.is_empty() {
            let range = BlockRange::new(eff_from, eff_to)?;
            let rows = self.store.transactions_page(&address, range, pagination).await?;
            build_response(&address, eff_from, eff_to, rows, pagination, TxSource::Database, false)
        } else {
            self.serve_from_explorer(&address, eff_from, eff_to, pagination, order).await?
        };

        self.cache
            .set_tx_query(&address, eff_from, eff_to, pagination.page(), pagination.limit(), order, &response)
            .await;

        if !gaps.is_empty() {
            response.metadata.background_processing = true;
            self.schedule_background_fill(&address, &gaps);
        }

        Ok(response)
    }

    async fn serve_from_explorer(
        &self,
        address: &str,
        eff_from: u64,
        eff_to: u64,
        pagination: PaginationParams,
        order: Order,
    ) -> Result<TxQueryResponse, CoreError> {
        match self.explorer.txlist(address, eff_from, eff_to, pagination.page(), pagination.limit(), order).await {
            Ok(rows) => Ok(build_response(address, eff_from, eff_to, rows, pagination, TxSource::Explorer, false)),
            Err(e) if e.is_upstream_timeout() => {
                let mid = eff_from + (eff_to - eff_from) / 2;
                let (retry_from, retry_to) =
                    if order == Order::Asc { (eff_from, mid) } else { (mid + 1, eff_to) };
                match self
                    .explorer
                    .txlist(address, retry_from, retry_to, pagination.page(), pagination.limit(), order)
                    .await
                {
                    Ok(rows) => {
                        Ok(build_response(address, eff_from, eff_to, rows, pagination, TxSource::Explorer, false))
                    }
                    Err(e2) => {
                        warn!(
                            address,
                            %e2,
                            "half-range retry against the explorer also failed; falling back to the durable store"
                        );
                        let range = BlockRange::new(eff_from, eff_to)?;
                        let rows = self.store.transactions_page(address, range, pagination).await?;
                        Ok(build_response(address, eff_from, eff_to, rows, pagination, TxSource::Database, true))
                    }
                }
            }
            Err(e) => Err(e),
        }
    }

    /// Turn `gaps` into background jobs and submit them without delaying
    /// the response; a submission failure is logged, never surfaced.
    fn schedule_background_fill(&self, address: &str, gaps: &[BlockRange]) {
        let jobs = plan_jobs(address, gaps, self.max_blocks_per_job, Utc::now());
        let store = self.store.clone();
        let address = address.to_string();
        tokio::spawn(async move {
            if let Err(e) = store.enqueue_jobs(&jobs).await {
                warn!(address, %e, "failed to enqueue background-fill jobs");
            }
        });
    }
}

fn empty_page(address: &str, eff_from: u64, eff_to: u64, pagination: PaginationParams) -> TxQueryResponse {
    TxQueryResponse {
        transactions: Vec::new(),
        from_cache: false,
        pagination: PaginationInfo { page: pagination.page(), limit: pagination.limit(), has_more: false },
        metadata: ResponseMetadata {
            address: address.to_string(),
            from_block: eff_from,
            to_block: eff_to,
            source: TxSource::Database,
            background_processing: false,
            incomplete: false,
        },
    }
}

fn build_response(
    address: &str,
    eff_from: u64,
    eff_to: u64,
    transactions: Vec<Transaction>,
    pagination: PaginationParams,
    source: TxSource,
    incomplete: bool,
) -> TxQueryResponse {
    let has_more = transactions.len() as u32 == pagination.limit();
    TxQueryResponse {
        transactions,
        from_cache: false,
        pagination: PaginationInfo { page: pagination.page(), limit: pagination.limit(), has_more },
        metadata: ResponseMetadata {
            address: address.to_string(),
            from_block: eff_from,
            to_block: eff_to,
            source,
            background_processing: false,
            incomplete,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{harness, ServiceHarness};

    #[tokio::test]
    async fn explicit_inverted_bounds_are_rejected_before_any_io() {
        let ServiceHarness { service, .. } = harness().await;
        let address = "ab".repeat(20);
        let err = service.get_transactions(&address, Some(100), Some(10), 1, 10, Order::Asc).await.unwrap_err();
        assert!(matches!(err, CoreError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn from_beyond_the_chain_head_yields_an_empty_page_not_an_error() {
        // `to` is left unset and defaults to the chain head (1000 in the
        // harness); an explicit `from` past that inverts the effective
        // range without either bound having been individually invalid.
        let ServiceHarness { service, .. } = harness().await;
        let address = "aa".repeat(20);
        let response = service.get_transactions(&address, Some(2_000), None, 1, 10, Order::Asc).await.unwrap();
        assert!(response.transactions.is_empty());
        assert!(!response.pagination.has_more);
    }

    #[tokio::test]
    async fn full_coverage_serves_from_the_database() {
        let ServiceHarness { service, store, .. } = harness().await;
        let address = "ab".repeat(20);
        let range = BlockRange::new(0, 100).unwrap();
        store.insert_transactions_and_extend_coverage(&address, &[], range).await.unwrap();

        let response = service.get_transactions(&address, Some(0), Some(100), 1, 10, Order::Asc).await.unwrap();
        assert_eq!(response.metadata.source, TxSource::Database);
        assert!(!response.metadata.background_processing);
    }

    #[tokio::test]
    async fn a_gap_is_served_from_the_explorer_and_scheduled_for_fill() {
        let ServiceHarness { service, store, .. } = harness().await;
        let address = "cd".repeat(20);

        let response = service.get_transactions(&address, Some(0), Some(100), 1, 10, Order::Asc).await.unwrap();
        assert_eq!(response.metadata.source, TxSource::Explorer);
        assert!(response.metadata.background_processing);

        // the enqueue is fire-and-forget; give the spawned task a turn.
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        assert!(!store.jobs_for(&address).is_empty());
    }

    #[tokio::test]
    async fn a_second_identical_query_is_served_from_cache() {
        let ServiceHarness { service, .. } = harness().await;
        let address = "ef".repeat(20);

        let first = service.get_transactions(&address, Some(0), Some(50), 1, 10, Order::Asc).await.unwrap();
        assert!(!first.from_cache);
        assert_ne!(first.metadata.source, TxSource::Cache);

        let second = service.get_transactions(&address, Some(0), Some(50), 1, 10, Order::Asc).await.unwrap();
        assert!(second.from_cache);
        assert_eq!(second.metadata.source, TxSource::Cache);
    }

    #[tokio::test]
    async fn explorer_timeout_retries_the_lower_half_then_falls_back_to_storage() {
        let ServiceHarness { service, explorer, .. } = harness().await;
        let address = "fa".repeat(20);
        explorer.fail_next_with_timeout(2);

        let response = service.get_transactions(&address, Some(0), Some(100), 1, 10, Order::Asc).await.unwrap();
        assert_eq!(response.metadata.source, TxSource::Database);
        assert!(response.metadata.incomplete);
        assert_eq!(explorer.call_count(), 2);
    }
}
