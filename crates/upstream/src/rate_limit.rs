use governor::{
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter as GovernorLimiter,
};
use std::{num::NonZeroU32, sync::Arc};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::instrument;

/// The single process-wide gate every outbound call to the explorer passes
/// through: at most `tokens_per_sec` calls admitted per second, at most
/// `max_concurrent` in flight at once. Per the design note, this type
/// exposes only `acquire`/`release` -- nothing else touches the governor or
/// semaphore directly.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    tokens: Arc<GovernorLimiter<NotKeyed, InMemoryState, DefaultClock>>,
    concurrency: Arc<Semaphore>,
}

/// Held for the duration of one admitted call. Dropping it (or calling
/// [`Permit::release`] explicitly) frees the concurrency slot for the next
/// waiter in line.
#[derive(Debug)]
pub struct Permit {
    _slot: OwnedSemaphorePermit,
}

impl Permit {
    /// Release the slot. Equivalent to dropping the permit; spelled out
    /// because the design note names `release` as a first-class operation.
    pub fn release(self) {
        drop(self);
    }
}

impl RateLimiter {
    /// Construct a limiter admitting `tokens_per_sec` calls/second with at
    /// most `max_concurrent` in flight. Falls back to `1` for either bound
    /// if configured as `0`, since a zero quota would never admit anything.
    pub fn new(tokens_per_sec: u32, max_concurrent: u32) -> Self {
        let quota = Quota::per_second(NonZeroU32::new(tokens_per_sec.max(1)).unwrap());
        Self {
            tokens: Arc::new(GovernorLimiter::direct(quota)),
            concurrency: Arc::new(Semaphore::new(max_concurrent.max(1) as usize)),
        }
    }

    /// Wait for both a free concurrency slot and a rate-limit token, FIFO
    /// with respect to other waiters. The semaphore is a fair queue, so
    /// acquiring it first before awaiting the token preserves call order.
    #[instrument(skip(self))]
    pub async fn acquire(&self) -> Permit {
        let slot = self.concurrency.clone().acquire_owned().await.expect("semaphore is never closed");
        self.tokens.until_ready().await;
        Permit { _slot: slot }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[tokio::test]
    async fn admits_up_to_the_concurrency_cap_without_blocking() {
        let limiter = RateLimiter::new(100, 2);
        let start = Instant::now();
        let _a = limiter.acquire().await;
        let _b = limiter.acquire().await;
        assert!(start.elapsed().as_millis() < 200);
    }

    #[tokio::test]
    async fn a_released_slot_can_be_reacquired() {
        let limiter = RateLimiter::new(100, 1);
        let permit = limiter.acquire().await;
        permit.release();
        let _second = limiter.acquire().await;
    }
}
