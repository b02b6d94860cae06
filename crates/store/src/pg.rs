use crate::{
    conv::{from_i32, from_i64, from_i64_opt, to_i32, to_i64, to_i64_opt},
    error::map_sqlx_error,
    traits::DurableStore,
};
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPool;
use tracing::instrument;
use txidx_errors::CoreError;
use txidx_types::{AddressInfo, Balance, BlockRange, GapJob, JobStatus, PaginationParams, Transaction};

/// A [`DurableStore`] backed by Postgres via `sqlx`.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Wrap an already-connected, already-migrated pool.
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct TransactionRow {
    hash: String,
    address: String,
    block_number: i64,
    from_address: String,
    to_address: Option<String>,
    value: String,
    gas_price: String,
    gas_used: Option<i64>,
    gas: Option<i64>,
    function_name: Option<String>,
    receipt_status: String,
    contract_address: Option<String>,
    timestamp: DateTime<Utc>,
}

impl TryFrom<TransactionRow> for Transaction {
    type Error = CoreError;

    fn try_from(row: TransactionRow) -> Result<Self, Self::Error> {
        Ok(Self {
            hash: row.hash,
            address: row.address,
            block_number: from_i64(row.block_number)?,
            from: row.from_address,
            to: row.to_address,
            value: row.value,
            gas_price: row.gas_price,
            gas_used: from_i64_opt(row.gas_used)?,
            gas: from_i64_opt(row.gas)?,
            function_name: row.function_name,
            receipt_status: row.receipt_status,
            contract_address: row.contract_address,
            timestamp: row.timestamp,
        })
    }
}

#[derive(sqlx::FromRow)]
struct CoverageRow {
    from_block: i64,
    to_block: i64,
}

#[derive(sqlx::FromRow)]
struct AddressInfoRow {
    is_contract: bool,
    creation_block: Option<i64>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<AddressInfoRow> for AddressInfo {
    type Error = CoreError;

    fn try_from(row: AddressInfoRow) -> Result<Self, Self::Error> {
        Ok(Self {
            is_contract: row.is_contract,
            creation_block: from_i64_opt(row.creation_block)?,
            updated_at: row.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct BalanceRow {
    balance: String,
    block_number: i64,
    updated_at: DateTime<Utc>,
}

impl TryFrom<BalanceRow> for Balance {
    type Error = CoreError;

    fn try_from(row: BalanceRow) -> Result<Self, Self::Error> {
        Ok(Self { balance: row.balance, block_number: from_i64(row.block_number)?, updated_at: row.updated_at })
    }
}

#[derive(sqlx::FromRow)]
struct GapJobRow {
    job_key: String,
    address: String,
    from_block: i64,
    to_block: i64,
    total_jobs: i32,
    current_job: i32,
    priority: i16,
    status: String,
    attempts: i32,
    run_after: DateTime<Utc>,
    last_error: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<GapJobRow> for GapJob {
    type Error = CoreError;

    fn try_from(row: GapJobRow) -> Result<Self, Self::Error> {
        let status = match row.status.as_str() {
            "pending" => JobStatus::Pending,
            "running" => JobStatus::Running,
            "completed" => JobStatus::Completed,
            "failed" => JobStatus::Failed,
            other => return Err(CoreError::Internal(format!("unknown gap_job status {other:?}"))),
        };
        Ok(Self {
            job_key: row.job_key,
            address: row.address,
            from_block: from_i64(row.from_block)?,
            to_block: from_i64(row.to_block)?,
            total_jobs: from_i32(row.total_jobs)?,
            current_job: from_i32(row.current_job)?,
            priority: row.priority,
            status,
            attempts: from_i32(row.attempts)?,
            run_after: row.run_after,
            last_error: row.last_error,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

const fn status_str(status: JobStatus) -> &'static str {
    match status {
        JobStatus::Pending => "pending",
        JobStatus::Running => "running",
        JobStatus::Completed => "completed",
        JobStatus::Failed => "failed",
    }
}

#[async_trait::async_trait]
impl DurableStore for PgStore {
    #[instrument(skip(self, transactions))]
    async fn insert_transactions_and_extend_coverage(
        &self,
        address: &str,
        transactions: &[Transaction],
        range: BlockRange,
    ) -> Result<(), CoreError> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;
        for t in transactions {
            sqlx::query(
                "INSERT INTO transaction
                 (hash, address, block_number, from_address, to_address, value, gas_price,
                  gas_used, gas, function_name, receipt_status, contract_address, \"timestamp\")
                 VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12,$13)
                 ON CONFLICT (address, hash) DO NOTHING",
            )
            .bind(&t.hash)
            .bind(&t.address)
            .bind(to_i64(t.block_number)?)
            .bind(&t.from)
            .bind(&t.to)
            .bind(&t.value)
            .bind(&t.gas_price)
            .bind(to_i64_opt(t.gas_used)?)
            .bind(to_i64_opt(t.gas)?)
            .bind(&t.function_name)
            .bind(&t.receipt_status)
            .bind(&t.contract_address)
            .bind(t.timestamp)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;
        }
        sqlx::query(
            "INSERT INTO coverage (address, from_block, to_block)
             VALUES ($1,$2,$3)
             ON CONFLICT (address, from_block, to_block) DO NOTHING",
        )
        .bind(address)
        .bind(to_i64(range.from_block())?)
        .bind(to_i64(range.to_block())?)
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;
        tx.commit().await.map_err(map_sqlx_error)?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn coverage_for(&self, address: &str) -> Result<Vec<BlockRange>, CoreError> {
        let rows: Vec<CoverageRow> =
            sqlx::query_as("SELECT from_block, to_block FROM coverage WHERE address = $1")
                .bind(address)
                .fetch_all(&self.pool)
                .await
                .map_err(map_sqlx_error)?;
        rows.into_iter()
            .map(|r| Ok(BlockRange::new_unchecked(from_i64(r.from_block)?, from_i64(r.to_block)?)))
            .collect()
    }

    #[instrument(skip(self))]
    async fn transactions_page(
        &self,
        address: &str,
        range: BlockRange,
        pagination: PaginationParams,
    ) -> Result<Vec<Transaction>, CoreError> {
        // `order` is a closed two-variant enum (see `Order::sql_keyword`), so
        // interpolating its keyword here never admits untrusted input.
        let sql = format!(
            "SELECT hash, address, block_number, from_address, to_address, value, gas_price,
                    gas_used, gas, function_name, receipt_status, contract_address, \"timestamp\"
             FROM transaction
             WHERE address = $1 AND block_number BETWEEN $2 AND $3
             ORDER BY block_number {}
             LIMIT $4 OFFSET $5",
            pagination.order().sql_keyword()
        );
        let rows: Vec<TransactionRow> = sqlx::query_as(&sql)
            .bind(address)
            .bind(to_i64(range.from_block())?)
            .bind(to_i64(range.to_block())?)
            .bind(i64::from(pagination.limit()))
            .bind(to_i64(pagination.offset())?)
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        rows.into_iter().map(Transaction::try_from).collect()
    }

    #[instrument(skip(self))]
    async fn count_transactions(&self, address: &str) -> Result<u64, CoreError> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM transaction WHERE address = $1")
            .bind(address)
            .fetch_one(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        from_i64(count)
    }

    #[instrument(skip(self))]
    async fn get_balance(&self, address: &str) -> Result<Option<Balance>, CoreError> {
        let row: Option<BalanceRow> =
            sqlx::query_as("SELECT balance, block_number, updated_at FROM balance WHERE address = $1")
                .bind(address)
                .fetch_optional(&self.pool)
                .await
                .map_err(map_sqlx_error)?;
        row.map(Balance::try_from).transpose()
    }

    #[instrument(skip(self, balance))]
    async fn upsert_balance(&self, address: &str, balance: &Balance) -> Result<(), CoreError> {
        sqlx::query(
            "INSERT INTO balance (address, balance, block_number, updated_at)
             VALUES ($1,$2,$3,$4)
             ON CONFLICT (address) DO UPDATE
             SET balance = EXCLUDED.balance,
                 block_number = EXCLUDED.block_number,
                 updated_at = EXCLUDED.updated_at",
        )
        .bind(address)
        .bind(&balance.balance)
        .bind(to_i64(balance.block_number)?)
        .bind(balance.updated_at)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn get_address_info(&self, address: &str) -> Result<Option<AddressInfo>, CoreError> {
        let row: Option<AddressInfoRow> = sqlx::query_as(
            "SELECT is_contract, creation_block, updated_at FROM address_info WHERE address = $1",
        )
        .bind(address)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;
        row.map(AddressInfo::try_from).transpose()
    }

    #[instrument(skip(self, info))]
    async fn upsert_address_info(&self, address: &str, info: &AddressInfo) -> Result<(), CoreError> {
        sqlx::query(
            "INSERT INTO address_info (address, is_contract, creation_block, updated_at)
             VALUES ($1,$2,$3,$4)
             ON CONFLICT (address) DO UPDATE
             SET is_contract = EXCLUDED.is_contract,
                 creation_block = EXCLUDED.creation_block,
                 updated_at = EXCLUDED.updated_at",
        )
        .bind(address)
        .bind(info.is_contract)
        .bind(to_i64_opt(info.creation_block)?)
        .bind(info.updated_at)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;
        Ok(())
    }

    #[instrument(skip(self, jobs))]
    async fn enqueue_jobs(&self, jobs: &[GapJob]) -> Result<(), CoreError> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;
        for job in jobs {
            sqlx::query(
                "INSERT INTO gap_job
                 (job_key, address, from_block, to_block, total_jobs, current_job, priority,
                  status, attempts, run_after, last_error, created_at, updated_at)
                 VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12,$13)
                 ON CONFLICT (job_key) DO NOTHING",
            )
            .bind(&job.job_key)
            .bind(&job.address)
            .bind(to_i64(job.from_block)?)
            .bind(to_i64(job.to_block)?)
            .bind(to_i32(job.total_jobs)?)
            .bind(to_i32(job.current_job)?)
            .bind(job.priority)
            .bind(status_str(job.status))
            .bind(to_i32(job.attempts)?)
            .bind(job.run_after)
            .bind(&job.last_error)
            .bind(job.created_at)
            .bind(job.updated_at)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;
        }
        tx.commit().await.map_err(map_sqlx_error)?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn claim_job(&self) -> Result<Option<GapJob>, CoreError> {
        let row: Option<GapJobRow> = sqlx::query_as(
            "WITH next AS (
                 SELECT job_key FROM gap_job
                 WHERE status = 'pending' AND run_after <= now()
                 ORDER BY priority DESC, created_at ASC
                 LIMIT 1
                 FOR UPDATE SKIP LOCKED
             )
             UPDATE gap_job
             SET status = 'running', attempts = attempts + 1, updated_at = now()
             FROM next
             WHERE gap_job.job_key = next.job_key
             RETURNING gap_job.job_key, gap_job.address, gap_job.from_block, gap_job.to_block,
                       gap_job.total_jobs, gap_job.current_job, gap_job.priority, gap_job.status,
                       gap_job.attempts, gap_job.run_after, gap_job.last_error,
                       gap_job.created_at, gap_job.updated_at",
        )
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;
        row.map(GapJob::try_from).transpose()
    }

    #[instrument(skip(self))]
    async fn complete_job(&self, job_key: &str) -> Result<(), CoreError> {
        sqlx::query("UPDATE gap_job SET status = 'completed', updated_at = now() WHERE job_key = $1")
            .bind(job_key)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        Ok(())
    }

    #[instrument(skip(self, last_error))]
    async fn retry_or_fail_job(
        &self,
        job_key: &str,
        attempts: u32,
        last_error: &str,
        run_after: DateTime<Utc>,
        max_attempts: u32,
    ) -> Result<(), CoreError> {
        let status = if attempts >= max_attempts { "failed" } else { "pending" };
        sqlx::query(
            "UPDATE gap_job
             SET status = $2, last_error = $3, run_after = $4, updated_at = now()
             WHERE job_key = $1",
        )
        .bind(job_key)
        .bind(status)
        .bind(last_error)
        .bind(run_after)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn prune_job_tails(&self, keep_completed: u32, keep_failed: u32) -> Result<(), CoreError> {
        sqlx::query(
            "DELETE FROM gap_job WHERE job_key IN (
                 SELECT job_key FROM (
                     SELECT job_key, status,
                            row_number() OVER (PARTITION BY status ORDER BY updated_at DESC) AS rn
                     FROM gap_job
                     WHERE status IN ('completed', 'failed')
                 ) ranked
                 WHERE (ranked.status = 'completed' AND ranked.rn > $1)
                    OR (ranked.status = 'failed' AND ranked.rn > $2)
             )",
        )
        .bind(i64::from(keep_completed))
        .bind(i64::from(keep_failed))
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;
        Ok(())
    }
}
