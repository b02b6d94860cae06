use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::{collections::HashMap, sync::Mutex};
use txidx_errors::CoreError;
use txidx_store::DurableStore;
use txidx_types::{AddressInfo, Balance, BlockRange, GapJob, JobStatus, PaginationParams, Transaction};

#[derive(Default)]
struct State {
    transactions: HashMap<String, Vec<Transaction>>,
    coverage: HashMap<String, Vec<BlockRange>>,
    balances: HashMap<String, Balance>,
    address_info: HashMap<String, AddressInfo>,
    jobs: HashMap<String, GapJob>,
}

/// An in-memory stand-in for [`DurableStore`], backed by a single
/// `Mutex`-guarded map of tables. Mirrors `PgStore`'s semantics closely
/// enough to exercise the resolver, the scheduler, and the transaction
/// service without a live Postgres instance: transaction inserts dedupe on
/// `(address, hash)`, job claiming honors `run_after` and priority.
#[derive(Default)]
pub struct InMemoryStore {
    state: Mutex<State>,
}

impl std::fmt::Debug for InMemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryStore").finish()
    }
}

impl InMemoryStore {
    /// An empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// All jobs currently enqueued for `address`, in no particular order.
    /// Exposed for tests; does not affect job status the way `claim_job`
    /// does.
    pub fn jobs_for(&self, address: &str) -> Vec<GapJob> {
        self.state.lock().unwrap().jobs.values().filter(|j| j.address == address).cloned().collect()
    }
}

#[async_trait]
impl DurableStore for InMemoryStore {
    async fn insert_transactions_and_extend_coverage(
        &self,
        address: &str,
        transactions: &[Transaction],
        range: BlockRange,
    ) -> Result<(), CoreError> {
        let mut state = self.state.lock().unwrap();
        let existing = state.transactions.entry(address.to_string()).or_default();
        for tx in transactions {
            if !existing.iter().any(|t| t.hash == tx.hash) {
                existing.push(tx.clone());
            }
        }
        state.coverage.entry(address.to_string()).or_default().push(range);
        Ok(())
    }

    async fn coverage_for(&self, address: &str) -> Result<Vec<BlockRange>, CoreError> {
        Ok(self.state.lock().unwrap().coverage.get(address).cloned().unwrap_or_default())
    }

    async fn transactions_page(
        &self,
        address: &str,
        range: BlockRange,
        pagination: PaginationParams,
    ) -> Result<Vec<Transaction>, CoreError> {
        let state = self.state.lock().unwrap();
        let mut rows: Vec<Transaction> = state
            .transactions
            .get(address)
            .into_iter()
            .flatten()
            .filter(|t| t.block_number >= range.from_block() && t.block_number <= range.to_block())
            .cloned()
            .collect();
        rows.sort_by_key(|t| t.block_number);
        if pagination.order() == txidx_types::Order::Desc {
            rows.reverse();
        }
        let offset = pagination.offset() as usize;
        let limit = pagination.limit() as usize;
        Ok(rows.into_iter().skip(offset).take(limit).collect())
    }

    async fn count_transactions(&self, address: &str) -> Result<u64, CoreError> {
        Ok(self.state.lock().unwrap().transactions.get(address).map(Vec::len).unwrap_or(0) as u64)
    }

    async fn get_balance(&self, address: &str) -> Result<Option<Balance>, CoreError> {
        Ok(self.state.lock().unwrap().balances.get(address).cloned())
    }

    async fn upsert_balance(&self, address: &str, balance: &Balance) -> Result<(), CoreError> {
        self.state.lock().unwrap().balances.insert(address.to_string(), balance.clone());
        Ok(())
    }

    async fn get_address_info(&self, address: &str) -> Result<Option<AddressInfo>, CoreError> {
        Ok(self.state.lock().unwrap().address_info.get(address).copied())
    }

    async fn upsert_address_info(&self, address: &str, info: &AddressInfo) -> Result<(), CoreError> {
        self.state.lock().unwrap().address_info.insert(address.to_string(), *info);
        Ok(())
    }

    async fn enqueue_jobs(&self, jobs: &[GapJob]) -> Result<(), CoreError> {
        let mut state = self.state.lock().unwrap();
        for job in jobs {
            state.jobs.entry(job.job_key.clone()).or_insert_with(|| job.clone());
        }
        Ok(())
    }

    async fn claim_job(&self) -> Result<Option<GapJob>, CoreError> {
        let mut state = self.state.lock().unwrap();
        let now = Utc::now();
        let key = state
            .jobs
            .values()
            .filter(|j| j.status == JobStatus::Pending && j.run_after <= now)
            .max_by(|a, b| a.priority.cmp(&b.priority).then(b.run_after.cmp(&a.run_after)))
            .map(|j| j.job_key.clone());

        let Some(key) = key else { return Ok(None) };
        let job = state.jobs.get_mut(&key).unwrap();
        job.status = JobStatus::Running;
        job.attempts += 1;
        job.updated_at = now;
        Ok(Some(job.clone()))
    }

    async fn complete_job(&self, job_key: &str) -> Result<(), CoreError> {
        let mut state = self.state.lock().unwrap();
        if let Some(job) = state.jobs.get_mut(job_key) {
            job.status = JobStatus::Completed;
            job.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn retry_or_fail_job(
        &self,
        job_key: &str,
        attempts: u32,
        last_error: &str,
        run_after: DateTime<Utc>,
        max_attempts: u32,
    ) -> Result<(), CoreError> {
        let mut state = self.state.lock().unwrap();
        if let Some(job) = state.jobs.get_mut(job_key) {
            job.last_error = Some(last_error.to_string());
            job.updated_at = Utc::now();
            if attempts >= max_attempts {
                job.status = JobStatus::Failed;
            } else {
                job.status = JobStatus::Pending;
                job.run_after = run_after;
            }
        }
        Ok(())
    }

    async fn prune_job_tails(&self, keep_completed: u32, keep_failed: u32) -> Result<(), CoreError> {
        let mut state = self.state.lock().unwrap();
        prune_tail(&mut state.jobs, JobStatus::Completed, keep_completed);
        prune_tail(&mut state.jobs, JobStatus::Failed, keep_failed);
        Ok(())
    }
}

fn prune_tail(jobs: &mut HashMap<String, GapJob>, status: JobStatus, keep: u32) {
    let mut matching: Vec<(String, DateTime<Utc>)> =
        jobs.values().filter(|j| j.status == status).map(|j| (j.job_key.clone(), j.updated_at)).collect();
    matching.sort_by_key(|(_, updated_at)| std::cmp::Reverse(*updated_at));
    for (key, _) in matching.into_iter().skip(keep as usize) {
        jobs.remove(&key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job(key: &str, priority: i16) -> GapJob {
        let now = Utc::now();
        GapJob {
            job_key: key.to_string(),
            address: "0xabc".to_string(),
            from_block: 0,
            to_block: 1,
            total_jobs: 1,
            current_job: 1,
            priority,
            status: JobStatus::Pending,
            attempts: 0,
            run_after: now,
            last_error: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn claim_job_prefers_the_higher_priority_value() {
        let store = InMemoryStore::new();
        store.enqueue_jobs(&[job("large-gap", GapJob::priority_for_size(10_000)), job("small-gap", GapJob::priority_for_size(10))])
            .await
            .unwrap();

        let claimed = store.claim_job().await.unwrap().unwrap();
        assert_eq!(claimed.job_key, "small-gap");
    }
}
