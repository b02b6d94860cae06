//! Shared in-memory fakes for exercising the durable store, the upstream
//! adapters, and (via `txidx_cache::InMemoryKv`, re-exported for
//! convenience) the KV cache, without a live Postgres instance or network
//! access.

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

mod store;
pub use store::InMemoryStore;

mod upstream;
pub use upstream::{FakeExplorer, FakeNodeRpc};

pub use txidx_cache::InMemoryKv;
