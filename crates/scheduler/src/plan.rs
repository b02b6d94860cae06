use chrono::{DateTime, Utc};
use txidx_types::{BlockRange, GapJob, JobStatus};

/// Split `gaps` into jobs of at most `max_blocks_per_job` blocks each, and
/// assign each a deterministic key, a size-based priority, a shared
/// `total_jobs` denominator, and a staggered `run_after` of
/// `current_job * 1s` from `now`.
///
/// `gaps` may come from more than one originating request; callers that
/// want independent stagger/priority bookkeeping per gap should call this
/// once per gap rather than batching unrelated gaps together.
pub fn plan_jobs(address: &str, gaps: &[BlockRange], max_blocks_per_job: u64, now: DateTime<Utc>) -> Vec<GapJob> {
    let chunks: Vec<BlockRange> = gaps.iter().flat_map(|gap| gap.split(max_blocks_per_job)).collect();
    let total_jobs = chunks.len() as u32;

    chunks
        .into_iter()
        .enumerate()
        .map(|(i, range)| {
            let current_job = i as u32 + 1;
            GapJob {
                job_key: GapJob::key_for(address, range),
                address: address.to_string(),
                from_block: range.from_block(),
                to_block: range.to_block(),
                total_jobs,
                current_job,
                priority: GapJob::priority_for_size(range.len()),
                status: JobStatus::Pending,
                attempts: 0,
                run_after: now + chrono::Duration::seconds(i64::from(current_job)),
                last_error: None,
                created_at: now,
                updated_at: now,
            }
        })
        .collect()
}
