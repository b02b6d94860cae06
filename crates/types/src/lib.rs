//! Data model and validation for the transaction index core.
//!
//! This crate defines the shapes described by the system's data model --
//! [`Address`] normalization, [`BlockRange`], [`Transaction`],
//! [`AddressInfo`], [`Balance`], and the durable gap-job queue record -- plus
//! the pagination parameters the transaction service accepts. It contains no
//! I/O and no business logic beyond structural validation; the gap-finding
//! algorithm itself lives in `txidx-coverage`, and coverage rows as persisted
//! are represented directly as `Vec<BlockRange>` (see
//! `txidx_store::DurableStore::coverage_for`) rather than through a
//! dedicated wrapper type.

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

mod address;
pub use address::{normalize_address, NormalizedAddress};

mod block_range;
pub use block_range::{validate_bounds, BlockRange};

mod transaction;
pub use transaction::Transaction;

mod address_info;
pub use address_info::AddressInfo;

mod balance;
pub use balance::Balance;

mod gap_job;
pub use gap_job::{GapJob, JobStatus};

mod pagination;
pub use pagination::{validate_pagination, Order, PaginationParams};

mod response;
pub use response::{
    BalanceResponse, BalanceSource, CountResponse, CountSource, PaginationInfo, ResponseMetadata,
    TxQueryResponse, TxSource,
};

pub use alloy_primitives::{Address as AlloyAddress, B256, U256};
