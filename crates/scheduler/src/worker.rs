use crate::{plan::plan_jobs, retry::backoff_delay};
use chrono::Utc;
use std::{sync::Arc, time::Duration};
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, warn};
use txidx_errors::CoreError;
use txidx_store::DurableStore;
use txidx_types::{BlockRange, GapJob, Order, Transaction};
use txidx_upstream::Explorer;

/// Tunables the worker pool needs that aren't implied by the job itself.
#[derive(Debug, Clone, Copy)]
pub struct WorkerConfig {
    /// Number of concurrent worker loops.
    pub concurrency: usize,
    /// `MAX_TX_PER_BATCH`: the explorer page size a worker requests.
    pub max_tx_per_batch: u32,
    /// `MAX_BLOCKS_PER_JOB`: the chunk size used when re-enqueueing after a
    /// query-timeout recovery or a partial-range follow-up.
    pub max_blocks_per_job: u64,
    /// How long an idle worker sleeps between queue polls.
    pub poll_interval: Duration,
    /// `job_retry_attempts` from configuration.
    pub retry_attempts: u32,
    /// `job_retry_backoff_base_ms` from configuration.
    pub retry_backoff_base_ms: u64,
}

/// Outcome of running [`process_gap`] to completion (never returned for a
/// query-timeout -- that is reported as an `Err` so the caller can run the
/// chunk-and-re-enqueue recovery).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GapOutcome {
    /// The block actually reached. May be less than the job's `to_block`
    /// when the explorer's page limit forced a partial range.
    pub actual_end: u64,
}

/// Execute the worker's per-job algorithm: page through the explorer from
/// `from_block` to `to_block`, persist whatever was fetched plus the
/// coverage it implies in one durable transaction, and report how far it
/// actually got.
///
/// A query-timeout from the explorer is propagated as
/// [`CoreError::UpstreamTimeout`] rather than folded into [`GapOutcome`];
/// the caller is expected to run the chunk-and-re-enqueue recovery and
/// still mark the job complete.
#[instrument(skip(store, explorer))]
pub async fn process_gap(
    store: &dyn DurableStore,
    explorer: &dyn Explorer,
    address: &str,
    from_block: u64,
    to_block: u64,
    max_tx_per_batch: u32,
) -> Result<GapOutcome, CoreError> {
    let mut current_start = from_block;
    let mut actual_end = from_block.saturating_sub(1);
    let mut iters = 0u32;
    let mut buf: Vec<Transaction> = Vec::new();

    while current_start <= to_block && iters <= 100 {
        debug!(
            phase = "fetching",
            page = 1,
            current_block = current_start,
            target_block = to_block,
            "fetching a page from the explorer"
        );
        let rows = explorer.txlist(address, current_start, to_block, 1, max_tx_per_batch, Order::Asc).await?;

        if rows.is_empty() {
            actual_end = to_block;
            break;
        }

        let raw_count = rows.len() as u32;
        let last_block = rows.last().map(|t| t.block_number).unwrap_or(current_start);
        buf.extend(rows.into_iter().filter(|t| t.block_number >= current_start && t.block_number <= to_block));

        if raw_count == max_tx_per_batch {
            actual_end = actual_end.max(last_block.saturating_sub(1));
            current_start = last_block.saturating_sub(1);
            iters += 1;
        } else {
            actual_end = to_block;
            break;
        }
    }

    debug!(
        phase = "saving",
        transactions = buf.len(),
        blocks_processed = actual_end.saturating_sub(from_block) + 1,
        total_blocks = to_block.saturating_sub(from_block) + 1,
        "persisting fetched transactions and coverage"
    );

    let range = BlockRange::new(from_block, actual_end)?;
    store.insert_transactions_and_extend_coverage(address, &buf, range).await?;

    Ok(GapOutcome { actual_end })
}

/// A pool of long-lived worker loops draining the durable `gap_job` queue.
pub struct WorkerPool {
    store: Arc<dyn DurableStore>,
    explorer: Arc<dyn Explorer>,
    config: WorkerConfig,
    shutdown: CancellationToken,
}

impl std::fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerPool").field("config", &self.config).finish()
    }
}

impl WorkerPool {
    /// Build a pool over `store`/`explorer`, not yet running.
    pub fn new(store: Arc<dyn DurableStore>, explorer: Arc<dyn Explorer>, config: WorkerConfig) -> Self {
        Self { store, explorer, config, shutdown: CancellationToken::new() }
    }

    /// A handle that can be used to request shutdown from elsewhere.
    pub fn shutdown_handle(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Spawn `config.concurrency` worker loops. Each drains the queue until
    /// shutdown is requested, then finishes its in-flight job and exits;
    /// a shutdown signal received while already draining is ignored.
    pub fn spawn(self: Arc<Self>) -> Vec<tokio::task::JoinHandle<()>> {
        (0..self.config.concurrency)
            .map(|worker_id| {
                let pool = self.clone();
                tokio::spawn(async move { pool.run_worker(worker_id).await })
            })
            .collect()
    }

    async fn run_worker(&self, worker_id: usize) {
        debug!(worker_id, "worker started");
        loop {
            if self.shutdown.is_cancelled() {
                break;
            }
            match self.store.claim_job().await {
                Ok(Some(job)) => self.run_job(worker_id, job).await,
                Ok(None) => {
                    tokio::select! {
                        _ = tokio::time::sleep(self.config.poll_interval) => {}
                        () = self.shutdown.cancelled() => break,
                    }
                }
                Err(e) => {
                    warn!(worker_id, %e, "failed to claim a job from the durable queue");
                    tokio::time::sleep(self.config.poll_interval).await;
                }
            }
        }
        debug!(worker_id, "worker shutting down");
    }

    #[instrument(skip(self, job), fields(job_key = %job.job_key))]
    async fn run_job(&self, worker_id: usize, job: GapJob) {
        debug!(worker_id, job_key = %job.job_key, "claimed job");
        let outcome =
            process_gap(&*self.store, &*self.explorer, &job.address, job.from_block, job.to_block, self.config.max_tx_per_batch)
                .await;

        match outcome {
            Ok(GapOutcome { actual_end }) => {
                if let Err(e) = self.store.complete_job(&job.job_key).await {
                    warn!(job_key = %job.job_key, %e, "failed to mark job completed");
                }
                if actual_end < job.to_block {
                    self.requeue_remainder(&job.address, actual_end + 1, job.to_block).await;
                }
            }
            Err(e) if e.is_upstream_timeout() => {
                debug!(job_key = %job.job_key, "explorer refused the range; chunking and re-enqueueing");
                self.requeue_in_chunks(&job.address, job.from_block, job.to_block).await;
                if let Err(e) = self.store.complete_job(&job.job_key).await {
                    warn!(job_key = %job.job_key, %e, "failed to mark timed-out job completed after recovery");
                }
            }
            Err(e) => {
                let run_after = Utc::now() + chrono::Duration::from_std(backoff_delay(job.attempts, self.config.retry_backoff_base_ms)).unwrap_or_default();
                if let Err(store_err) = self
                    .store
                    .retry_or_fail_job(&job.job_key, job.attempts, &e.to_string(), run_after, self.config.retry_attempts)
                    .await
                {
                    warn!(job_key = %job.job_key, %store_err, "failed to record job failure");
                }
            }
        }
    }

    async fn requeue_remainder(&self, address: &str, from_block: u64, to_block: u64) {
        let Ok(range) = BlockRange::new(from_block, to_block) else { return };
        let jobs = plan_jobs(address, &[range], self.config.max_blocks_per_job, Utc::now());
        if let Err(e) = self.store.enqueue_jobs(&jobs).await {
            warn!(address, %e, "failed to enqueue the follow-up job for a partial range");
        }
    }

    async fn requeue_in_chunks(&self, address: &str, from_block: u64, to_block: u64) {
        const QUERY_TIMEOUT_CHUNK: u64 = 1_000;
        let Ok(range) = BlockRange::new(from_block, to_block) else { return };
        let jobs = plan_jobs(address, &[range], QUERY_TIMEOUT_CHUNK, Utc::now());
        if let Err(e) = self.store.enqueue_jobs(&jobs).await {
            warn!(address, %e, "failed to enqueue query-timeout recovery chunks");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use txidx_store::DurableStore;
    use txidx_test_utils::{FakeExplorer, InMemoryStore};
    use txidx_types::JobStatus;

    fn tx(address: &str, block: u64) -> Transaction {
        Transaction {
            hash: format!("0x{block:064x}"),
            address: address.to_string(),
            block_number: block,
            from: "0xfrom".into(),
            to: Some("0xto".into()),
            value: "0".into(),
            gas_price: "1".into(),
            gas_used: Some(21_000),
            gas: Some(21_000),
            function_name: None,
            receipt_status: "1".into(),
            contract_address: None,
            timestamp: Utc::now(),
        }
    }

    #[tokio::test]
    async fn empty_explorer_response_marks_the_whole_range_processed() {
        let store = InMemoryStore::new();
        let explorer = FakeExplorer::new();
        let address = "0xabc";

        let outcome = process_gap(&store, &explorer, address, 0, 100, 5_000).await.unwrap();
        assert_eq!(outcome.actual_end, 100);
        assert_eq!(store.coverage_for(address).await.unwrap(), vec![BlockRange::new(0, 100).unwrap()]);
    }

    #[tokio::test]
    async fn overlapping_full_pages_are_deduplicated_on_persist() {
        let store = InMemoryStore::new();
        let explorer = FakeExplorer::new();
        let address = "0xabc";
        explorer.seed(address, (0..=5).map(|b| tx(address, b)).collect());

        let outcome = process_gap(&store, &explorer, address, 0, 5, 3).await.unwrap();
        assert_eq!(outcome.actual_end, 5);
        assert_eq!(store.count_transactions(address).await.unwrap(), 6);
    }

    #[tokio::test]
    async fn query_timeout_is_propagated_for_the_caller_to_recover() {
        let store = InMemoryStore::new();
        let explorer = FakeExplorer::new();
        explorer.fail_next_with_timeout(1);

        let err = process_gap(&store, &explorer, "0xabc", 0, 100, 5_000).await.unwrap_err();
        assert!(err.is_upstream_timeout());
    }

    #[tokio::test]
    async fn worker_pool_claims_processes_and_completes_a_job_then_shuts_down() {
        let store = Arc::new(InMemoryStore::new());
        let explorer = Arc::new(FakeExplorer::new());
        let address = "0xabc";
        explorer.seed(address, vec![tx(address, 10)]);

        let range = BlockRange::new(0, 100).unwrap();
        let jobs = plan_jobs(address, &[range], 5_000, Utc::now());
        store.enqueue_jobs(&jobs).await.unwrap();

        let pool = Arc::new(WorkerPool::new(
            store.clone(),
            explorer.clone(),
            WorkerConfig {
                concurrency: 1,
                max_tx_per_batch: 5_000,
                max_blocks_per_job: 5_000,
                poll_interval: Duration::from_millis(5),
                retry_attempts: 3,
                retry_backoff_base_ms: 100,
            },
        ));
        let shutdown = pool.shutdown_handle();
        let handles = pool.clone().spawn();

        tokio::time::sleep(Duration::from_millis(50)).await;
        shutdown.cancel();
        for handle in handles {
            handle.await.unwrap();
        }

        let completed = store.jobs_for(address);
        assert_eq!(completed.len(), 1);
        assert_eq!(completed[0].status, JobStatus::Completed);
    }
}
