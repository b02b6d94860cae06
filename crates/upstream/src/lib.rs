//! HTTP adapters to the two upstream collaborators -- the chain explorer and
//! the node's JSON-RPC surface -- plus the process-global rate limiter every
//! outbound call funnels through.
//!
//! Wire shapes are parsed strictly at this boundary (see `wire`); nothing
//! downstream of this crate ever handles an unparsed upstream payload.

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

mod wire;

mod rate_limit;
pub use rate_limit::{Permit, RateLimiter};

mod explorer;
pub use explorer::{Explorer, HttpExplorer};

mod node_rpc;
pub use node_rpc::{HttpNodeRpc, NodeRpc};
