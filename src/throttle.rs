//! Write throttling for the import driver.
//!
//! The remote document and asset stores have low, undocumented rate limits.
//! The driver calls [`RateLimiter::acquire`] after every successfully
//! persisted row; the limiter decides how long that call blocks.
//!
//! | Policy | Type | Behavior |
//! |--------|------|----------|
//! | `fixed` | [`FixedDelay`] | Sleep a fixed delay (default 500 ms) |
//! | `token_bucket` | [`TokenBucket`] | Allow `burst` writes, then one per interval |
//! | `none` | [`Unthrottled`] | Never wait |
//!
//! All waiting goes through `tokio::time`, so tests can pause the clock.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::config::ImportConfig;

/// Pacing policy applied between committed rows.
#[async_trait]
pub trait RateLimiter: Send + Sync {
    /// Wait until the next write is allowed.
    async fn acquire(&self);
}

/// Build the limiter named by `import.rate_limit`.
pub fn from_config(config: &ImportConfig) -> Arc<dyn RateLimiter> {
    match config.rate_limit.as_str() {
        "none" => Arc::new(Unthrottled),
        "token_bucket" => Arc::new(TokenBucket::new(config.burst, config.delay())),
        _ => Arc::new(FixedDelay::new(config.delay())),
    }
}

/// No pacing.
pub struct Unthrottled;

#[async_trait]
impl RateLimiter for Unthrottled {
    async fn acquire(&self) {}
}

/// Sleeps for a constant delay on every call.
pub struct FixedDelay {
    delay: Duration,
}

impl FixedDelay {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

#[async_trait]
impl RateLimiter for FixedDelay {
    async fn acquire(&self) {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
    }
}

/// Token bucket holding up to `capacity` tokens, refilled one per `interval`.
///
/// Starts full. Waiters queue on the internal mutex, so tokens are handed
/// out in call order.
pub struct TokenBucket {
    capacity: u32,
    interval: Duration,
    state: Mutex<BucketState>,
}

struct BucketState {
    tokens: u32,
    last_refill: Instant,
}

impl TokenBucket {
    pub fn new(capacity: u32, interval: Duration) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            interval,
            state: Mutex::new(BucketState {
                tokens: capacity,
                last_refill: Instant::now(),
            }),
        }
    }

    fn refill(&self, state: &mut BucketState, now: Instant) {
        if self.interval.is_zero() {
            state.tokens = self.capacity;
            state.last_refill = now;
            return;
        }
        let elapsed = now.saturating_duration_since(state.last_refill);
        let earned = (elapsed.as_nanos() / self.interval.as_nanos()).min(self.capacity as u128) as u32;
        if earned == 0 {
            return;
        }
        state.tokens = (state.tokens + earned).min(self.capacity);
        if state.tokens == self.capacity {
            state.last_refill = now;
        } else {
            state.last_refill += self.interval * earned;
        }
    }
}

#[async_trait]
impl RateLimiter for TokenBucket {
    async fn acquire(&self) {
        let mut state = self.state.lock().await;
        self.refill(&mut state, Instant::now());

        if state.tokens == 0 {
            let ready_at = state.last_refill + self.interval;
            tokio::time::sleep_until(ready_at).await;
            self.refill(&mut state, Instant::now());
        }

        state.tokens = state.tokens.saturating_sub(1);
    }
}
