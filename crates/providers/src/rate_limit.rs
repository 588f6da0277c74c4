//! Global minimum-interval gate for outbound model calls.

use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

/// Enforces a minimum spacing between successive grants.
///
/// One instance is shared by every conversation. The lock is held across
/// the sleep, so concurrent waiters are granted one at a time and each
/// grant is at least `min_interval` after the previous one.
pub struct RateLimiter {
    min_interval: Duration,
    last_granted: Mutex<Option<Instant>>,
}

impl RateLimiter {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_granted: Mutex::new(None),
        }
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Suspend until at least `min_interval` has passed since the previous
    /// grant, then record this grant. The first call returns immediately.
    pub async fn wait(&self) {
        let mut last = self.last_granted.lock().await;

        if let Some(previous) = *last {
            let ready_at = previous + self.min_interval;
            let now = Instant::now();
            if ready_at > now {
                let delay = ready_at - now;
                debug!(delay_ms = delay.as_millis() as u64, "Rate limiter: waiting");
                tokio::time::sleep_until(ready_at).await;
            }
        }

        *last = Some(Instant::now());
    }

    /// When the most recent grant happened, if any.
    pub async fn last_granted(&self) -> Option<Instant> {
        *self.last_granted.lock().await
    }
}
