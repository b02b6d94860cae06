//! Durable relational storage for the transaction index core.
//!
//! Four data tables from the data model -- `transaction`, `coverage`,
//! `address_info`, `balance` -- plus the `gap_job` operational table that
//! backs the gap scheduler's durable, at-least-once queue. Backed by
//! Postgres via `sqlx`, with migrations embedded in the binary.

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

mod conv;
mod error;

mod pool;
pub use pool::connect;

mod pg;
pub use pg::PgStore;

mod traits;
pub use traits::DurableStore;

pub use sqlx::postgres::PgPool;
