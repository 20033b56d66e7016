//! Token bucket pacing outbound calls to the image gateway.

use std::time::Duration;

use tokio::{
    sync::Mutex,
    time::{Instant, sleep},
};
use tracing::debug;

// Float rounding can leave the bucket a hair short of a token.
const MIN_WAIT: Duration = Duration::from_millis(1);

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RateLimitConfig {
    /// Calls that may be made back to back
    pub capacity: f64,
    pub refill_per_sec: f64,
    /// Pause imposed after the upstream reports a rate limit
    pub cooldown: Duration,
}

impl RateLimitConfig {
    /// One call per `min_interval`, no bursting.
    pub fn every(min_interval: Duration, cooldown: Duration) -> Self {
        let min_interval = min_interval.max(Duration::from_millis(1));
        Self {
            capacity: 1.0,
            refill_per_sec: 1.0 / min_interval.as_secs_f64(),
            cooldown,
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self::every(Duration::from_secs(1), Duration::from_secs(10))
    }
}

#[derive(Debug)]
struct Bucket {
    tokens: f64,
    last_refill: Instant,
    blocked_until: Option<Instant>,
}

#[derive(Debug)]
pub struct RateLimiter {
    cfg: RateLimitConfig,
    bucket: Mutex<Bucket>,
}

impl RateLimiter {
    pub fn new(cfg: RateLimitConfig) -> Self {
        Self {
            cfg,
            bucket: Mutex::new(Bucket {
                tokens: cfg.capacity,
                last_refill: Instant::now(),
                blocked_until: None,
            }),
        }
    }

    pub fn config(&self) -> &RateLimitConfig {
        &self.cfg
    }

    /// Wait until a call is allowed and take its token.
    pub async fn acquire(&self) {
        loop {
            let wait = {
                let mut bucket = self.bucket.lock().await;
                let now = Instant::now();
                let elapsed = now.duration_since(bucket.last_refill).as_secs_f64();
                bucket.last_refill = now;
                bucket.tokens =
                    (bucket.tokens + elapsed * self.cfg.refill_per_sec).min(self.cfg.capacity);

                match bucket.blocked_until {
                    Some(until) if until > now => until - now,
                    _ => {
                        bucket.blocked_until = None;
                        if bucket.tokens >= 1.0 {
                            bucket.tokens -= 1.0;
                            return;
                        }
                        Duration::from_secs_f64((1.0 - bucket.tokens) / self.cfg.refill_per_sec)
                            .max(MIN_WAIT)
                    }
                }
            };
            debug!(wait_ms = wait.as_millis() as u64, "Rate limiter waiting");
            sleep(wait).await;
        }
    }

    /// Block every caller for the configured cooldown and drain the bucket.
    pub async fn penalize(&self) {
        let mut bucket = self.bucket.lock().await;
        let now = Instant::now();
        bucket.tokens = 0.0;
        bucket.last_refill = now;
        bucket.blocked_until = Some(now + self.cfg.cooldown);
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(RateLimitConfig::default())
    }
}
