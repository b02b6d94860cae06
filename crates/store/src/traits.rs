use chrono::{DateTime, Utc};
use txidx_errors::CoreError;
use txidx_types::{AddressInfo, Balance, BlockRange, GapJob, PaginationParams, Transaction};

/// The durable store's contract: everything the transaction service, the
/// resolver, and the gap scheduler need from the relational backend.
///
/// Implemented by [`crate::PgStore`] against Postgres, and by an in-memory
/// fake in `txidx-test-utils` so the service and scheduler crates can be
/// exercised without a live database.
#[async_trait::async_trait]
pub trait DurableStore: Send + Sync + 'static {
    /// Insert `transactions` (ignoring any that already exist for
    /// `(address, hash)`) and extend `address`'s coverage by `range`, in a
    /// single durable transaction. This is the write path for both the
    /// synchronous fast path and the gap worker (§4.6 step 3).
    async fn insert_transactions_and_extend_coverage(
        &self,
        address: &str,
        transactions: &[Transaction],
        range: BlockRange,
    ) -> Result<(), CoreError>;

    /// All coverage rows recorded for `address`, unmerged.
    async fn coverage_for(&self, address: &str) -> Result<Vec<BlockRange>, CoreError>;

    /// A page of persisted transactions for `address` within `range`.
    async fn transactions_page(
        &self,
        address: &str,
        range: BlockRange,
        pagination: PaginationParams,
    ) -> Result<Vec<Transaction>, CoreError>;

    /// Total number of persisted transactions for `address`, across all
    /// ranges.
    async fn count_transactions(&self, address: &str) -> Result<u64, CoreError>;

    /// The last durable balance snapshot for `address`, if any.
    async fn get_balance(&self, address: &str) -> Result<Option<Balance>, CoreError>;

    /// Overwrite the balance snapshot for `address`.
    async fn upsert_balance(&self, address: &str, balance: &Balance) -> Result<(), CoreError>;

    /// The durable address-info record for `address`, if the resolver has
    /// already discovered it.
    async fn get_address_info(&self, address: &str) -> Result<Option<AddressInfo>, CoreError>;

    /// Persist the resolver's finding for `address`.
    async fn upsert_address_info(&self, address: &str, info: &AddressInfo) -> Result<(), CoreError>;

    /// Bulk-submit `jobs`, as a single operation; a job whose `job_key`
    /// already exists is left untouched (duplicate submissions collapse).
    async fn enqueue_jobs(&self, jobs: &[GapJob]) -> Result<(), CoreError>;

    /// Atomically claim the highest-priority eligible pending job (highest
    /// `priority` value, oldest first), marking it `running` and
    /// incrementing its attempt count. Returns `None` if no job is eligible.
    async fn claim_job(&self) -> Result<Option<GapJob>, CoreError>;

    /// Mark a job as having completed successfully.
    async fn complete_job(&self, job_key: &str) -> Result<(), CoreError>;

    /// Record a failed attempt: re-queues the job for `run_after` if
    /// `attempts < max_attempts`, otherwise parks it in the failed tail.
    async fn retry_or_fail_job(
        &self,
        job_key: &str,
        attempts: u32,
        last_error: &str,
        run_after: DateTime<Utc>,
        max_attempts: u32,
    ) -> Result<(), CoreError>;

    /// Trim the `completed`/`failed` tails to approximately `keep_completed`
    /// and `keep_failed` rows respectively, discarding the oldest first.
    async fn prune_job_tails(&self, keep_completed: u32, keep_failed: u32) -> Result<(), CoreError>;
}
