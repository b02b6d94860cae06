//! Durable background-fill scheduling: turns coverage gaps into jobs,
//! retries failed jobs with exponential backoff, and runs a worker pool
//! that drains the `gap_job` queue against the explorer.

#![warn(
    missing_copy_implementations,
    missing_debug_implementations,
    missing_docs,
    unreachable_pub,
    clippy::missing_const_for_fn,
    rustdoc::all
)]
#![cfg_attr(not(test), warn(unused_crate_dependencies))]
#![deny(unused_must_use, rust_2018_idioms)]

mod plan;
pub use plan::plan_jobs;

mod retry;
pub use retry::backoff_delay;

mod worker;
pub use worker::{process_gap, GapOutcome, WorkerConfig, WorkerPool};
