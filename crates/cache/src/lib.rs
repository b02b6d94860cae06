//! Best-effort KV caching for the transaction index core.
//!
//! [`store::KvStore`] is the raw, opaque-bytes storage trait; [`KvCache`] is
//! the typed facade that owns the key scheme from the data model and the
//! per-kind TTLs. Nothing here ever surfaces a cache failure to a caller --
//! misses and errors look identical from outside this crate.

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

mod facade;
pub use facade::KvCache;

pub mod store;
pub use store::{InMemoryKv, KvStore};
