use crate::BlockRange;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle state of a durable gap job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Waiting for `run_after` to elapse and a worker to pick it up.
    Pending,
    /// Claimed by a worker and in flight.
    Running,
    /// Finished: either it fully processed its range, or it hit the
    /// query-timeout recovery path and re-enqueued smaller chunks.
    Completed,
    /// Exhausted its retry budget and was parked in the failed tail.
    Failed,
}

/// A unit of background work to materialize one gap, backed by the durable
/// `gap_job` table so it survives a process restart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GapJob {
    /// Deterministic key `{address}-{fromBlock}-{toBlock}`; duplicate
    /// submissions collapse onto the same row.
    pub job_key: String,
    /// The address this job is filling coverage for.
    pub address: String,
    /// Inclusive lower bound of the range this job is responsible for.
    pub from_block: u64,
    /// Inclusive upper bound of the range this job is responsible for.
    pub to_block: u64,
    /// Total number of jobs in the batch this job was enqueued as part of.
    pub total_jobs: u32,
    /// This job's 1-based index within that batch, also used to compute its
    /// staggered start delay (`current_job * 1s`).
    pub current_job: u32,
    /// Scheduling priority: smaller gaps run first (10 for <=100 blocks, 5
    /// for <=1000, 1 otherwise).
    pub priority: i16,
    /// Current lifecycle state.
    pub status: JobStatus,
    /// Number of attempts made so far, capped by `job_retry_attempts`.
    pub attempts: u32,
    /// Earliest time a worker may claim this job; used for both the initial
    /// stagger and the exponential backoff between retries.
    pub run_after: DateTime<Utc>,
    /// The error from the most recent failed attempt, if any.
    pub last_error: Option<String>,
    /// When this row was first inserted.
    pub created_at: DateTime<Utc>,
    /// When this row was last transitioned.
    pub updated_at: DateTime<Utc>,
}

impl GapJob {
    /// The deterministic job key for a given address and range.
    pub fn key_for(address: &str, range: BlockRange) -> String {
        format!("{address}-{}-{}", range.from_block(), range.to_block())
    }

    /// The scheduling priority for a gap of the given size: smaller gaps run
    /// first.
    pub const fn priority_for_size(block_count: u64) -> i16 {
        if block_count <= 100 {
            10
        } else if block_count <= 1_000 {
            5
        } else {
            1
        }
    }

    /// The range this job covers.
    pub const fn range(&self) -> BlockRange {
        BlockRange::new_unchecked(self.from_block, self.to_block)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn job_key_is_deterministic() {
        let range = BlockRange::new(100, 200).unwrap();
        assert_eq!(GapJob::key_for("0xabc", range), "0xabc-100-200");
    }

    #[test]
    fn priority_follows_size_bands() {
        assert_eq!(GapJob::priority_for_size(1), 10);
        assert_eq!(GapJob::priority_for_size(100), 10);
        assert_eq!(GapJob::priority_for_size(101), 5);
        assert_eq!(GapJob::priority_for_size(1_000), 5);
        assert_eq!(GapJob::priority_for_size(1_001), 1);
    }
}
