//! Per-subject request spacing
//!
//! One GCRA cell per subject (burst of 1, period = minimum interval), kept in
//! governor's concurrent keyed store. Reserving a slot is a per-key
//! compare-and-set, so two runs for the same subject can never fire inside the
//! same interval while different subjects never wait on each other.
//!
//! Every `SWEEP_EVERY` acquisitions, keys whose interval has already elapsed
//! are dropped from the store, so it holds only subjects seen recently.

use governor::{DefaultKeyedRateLimiter, Quota, RateLimiter};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::{debug, trace};

const SWEEP_EVERY: u64 = 64;

/// Minimum-interval throttle keyed by subject (case-insensitive)
pub struct SubjectThrottle {
    /// None when the interval is zero (throttling disabled)
    limiter: Option<DefaultKeyedRateLimiter<String>>,
    min_interval: Duration,
    acquisitions: AtomicU64,
}

impl SubjectThrottle {
    pub fn new(min_interval: Duration) -> Self {
        let limiter = Quota::with_period(min_interval).map(RateLimiter::keyed);
        Self {
            limiter,
            min_interval,
            acquisitions: AtomicU64::new(0),
        }
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Wait until `subject` may issue its next request, reserving that slot
    pub async fn acquire(&self, subject: &str) {
        let Some(limiter) = &self.limiter else {
            return;
        };
        let key = subject.trim().to_lowercase();
        trace!(subject = %key, "Waiting for throttle slot");
        limiter.until_key_ready(&key).await;

        if (self.acquisitions.fetch_add(1, Ordering::Relaxed) + 1) % SWEEP_EVERY == 0 {
            limiter.retain_recent();
            debug!(tracked = limiter.len(), "Swept idle throttle keys");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Instant;

    #[tokio::test]
    async fn test_same_subject_is_spaced() {
        let throttle = SubjectThrottle::new(Duration::from_millis(200));
        let start = Instant::now();
        throttle.acquire("Alice").await;
        throttle.acquire("alice").await;
        throttle.acquire("ALICE").await;
        // Two full intervals after the first, immediate, request
        assert!(start.elapsed() >= Duration::from_millis(380), "{:?}", start.elapsed());
    }

    #[tokio::test]
    async fn test_different_subjects_do_not_wait() {
        let throttle = Arc::new(SubjectThrottle::new(Duration::from_secs(5)));
        let start = Instant::now();
        let handles: Vec<_> = ["a", "b", "c", "d"]
            .into_iter()
            .map(|s| {
                let throttle = Arc::clone(&throttle);
                tokio::spawn(async move { throttle.acquire(s).await })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap();
        }
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_concurrent_same_subject_serializes() {
        let throttle = Arc::new(SubjectThrottle::new(Duration::from_millis(150)));
        let start = Instant::now();
        let handles: Vec<_> = (0..3)
            .map(|_| {
                let throttle = Arc::clone(&throttle);
                tokio::spawn(async move {
                    throttle.acquire("bob").await;
                    start.elapsed()
                })
            })
            .collect();

        let mut fired = Vec::new();
        for handle in handles {
            fired.push(handle.await.unwrap());
        }
        fired.sort();
        assert!(fired[0] < Duration::from_millis(100));
        assert!(fired[2] >= Duration::from_millis(280), "{:?}", fired);
    }

    #[tokio::test]
    async fn test_idle_subjects_are_swept() {
        let throttle = SubjectThrottle::new(Duration::from_millis(20));
        for i in 0..SWEEP_EVERY {
            throttle.acquire(&format!("old-{}", i)).await;
        }

        tokio::time::sleep(Duration::from_millis(60)).await;
        for i in 0..SWEEP_EVERY {
            throttle.acquire(&format!("new-{}", i)).await;
        }

        // The old keys are gone; at most the new ones remain
        let tracked = throttle.limiter.as_ref().unwrap().len();
        assert!(tracked <= SWEEP_EVERY as usize, "{}", tracked);
    }

    #[tokio::test]
    async fn test_zero_interval_disables_throttle() {
        let throttle = SubjectThrottle::new(Duration::ZERO);
        let start = Instant::now();
        for _ in 0..10 {
            throttle.acquire("x").await;
        }
        assert!(start.elapsed() < Duration::from_millis(100));
    }
}
