//! Shared error taxonomy for the transaction index core.
//!
//! Every crate in this workspace that can fail surfaces one of the
//! [`CoreError`] variants rather than a string or an opaque `anyhow`-style
//! error. The HTTP collaborator (out of scope here) is expected to map each
//! variant to a status code; this crate does not know about HTTP at all.

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

/// Result alias using [`CoreError`].
pub type Result<T> = std::result::Result<T, CoreError>;

/// The distinct error taxonomy surfaced by the transaction index core.
///
/// Variants are deliberately coarse: callers match on the *kind* of failure,
/// never on a formatted message.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// Malformed address, block range, or pagination parameters.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The requested resource has no known value (e.g. no stored balance).
    #[error("not found: {0}")]
    NotFound(String),

    /// A uniqueness constraint was violated. Callers performing an
    /// `ON CONFLICT DO NOTHING`-style insert should treat this as success,
    /// not failure; it is surfaced for callers that care.
    #[error("conflict: {0}")]
    Conflict(String),

    /// An upstream call (Explorer or NodeRPC) exceeded its deadline, or the
    /// explorer refused a range as too large ("query timeout").
    #[error("upstream timeout: {0}")]
    UpstreamTimeout(String),

    /// An upstream call failed for a transient reason: network error, 5xx,
    /// or an upstream rate limit.
    #[error("upstream transient error: {0}")]
    UpstreamTransient(String),

    /// An upstream call returned a payload that does not parse into the
    /// expected shape.
    #[error("upstream returned invalid data: {0}")]
    UpstreamInvalid(String),

    /// The durable store is unavailable, or a constraint other than a
    /// uniqueness conflict was violated.
    #[error("storage error: {0}")]
    StorageError(String),

    /// The KV cache is unavailable. Per design this is never surfaced to a
    /// caller of the transaction service -- it is always downgraded to a
    /// cache miss -- but the variant exists so cache implementations have
    /// somewhere to put the failure before it gets downgraded.
    #[error("cache error: {0}")]
    CacheError(String),

    /// A programmer error: an invariant the code itself is responsible for
    /// maintaining was violated.
    #[error("internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// True if this error should never reach a caller of the transaction
    /// service as a hard failure -- cache errors are always a miss.
    pub const fn is_cache(&self) -> bool {
        matches!(self, Self::CacheError(_))
    }

    /// True if this is one of the two upstream-timeout conditions that the
    /// serving path and the gap worker both have dedicated recovery paths
    /// for (half-range retry, and chunk-and-re-enqueue, respectively).
    pub const fn is_upstream_timeout(&self) -> bool {
        matches!(self, Self::UpstreamTimeout(_))
    }

    /// True if this is a uniqueness conflict, which write paths that use
    /// `ON CONFLICT DO NOTHING` semantics should treat as success.
    pub const fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cache_errors_are_marked_downgradeable() {
        let err = CoreError::CacheError("kv unreachable".into());
        assert!(err.is_cache());
        assert!(!err.is_upstream_timeout());
    }

    #[test]
    fn timeout_is_distinguishable_from_transient() {
        let timeout = CoreError::UpstreamTimeout("explorer refused range".into());
        let transient = CoreError::UpstreamTransient("connection reset".into());
        assert!(timeout.is_upstream_timeout());
        assert!(!transient.is_upstream_timeout());
    }
}
