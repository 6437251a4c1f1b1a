use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};

/// Per-IP token bucket state (§4.3).
struct Bucket {
    tokens: i64,
    last_reset: DateTime<Utc>,
}

/// Coarse-grained, single-mutex rate limiter (§5's "Shared-resource
/// policy": the rate-limit map is sufficient under one mutex at
/// per-instance scale). Keyed by the extracted client IP string.
pub struct RateLimiter {
    rate: i64,
    window: Duration,
    buckets: Mutex<HashMap<String, Bucket>>,
}

impl RateLimiter {
    /// Sweep cadence (§4.3): every 5 minutes.
    pub const SWEEP_INTERVAL: Duration = Duration::from_secs(5 * 60);

    pub fn new(rate: i64, window: Duration) -> Self {
        Self {
            rate,
            window,
            buckets: Mutex::new(HashMap::new()),
        }
    }

    pub fn wrap(rate: i64, window: Duration) -> Arc<Self> {
        Arc::new(Self::new(rate, window))
    }

    /// `Allow(ip)` (§4.3): resets the bucket if the window has elapsed
    /// since `last_reset`, otherwise decrements if tokens remain.
    pub fn allow(&self, ip: &str) -> bool {
        self.allow_at(ip, Utc::now())
    }

    fn allow_at(&self, ip: &str, now: DateTime<Utc>) -> bool {
        let mut buckets = self.buckets.lock().unwrap();

        let needs_reset = match buckets.get(ip) {
            None => true,
            Some(bucket) => {
                now.signed_duration_since(bucket.last_reset).num_milliseconds()
                    >= self.window.as_millis() as i64
            }
        };

        if needs_reset {
            buckets.insert(
                ip.to_string(),
                Bucket {
                    tokens: self.rate - 1,
                    last_reset: now,
                },
            );
            return true;
        }

        let bucket = buckets.get_mut(ip).expect("checked above");
        if bucket.tokens <= 0 {
            false
        } else {
            bucket.tokens -= 1;
            true
        }
    }

    /// Removes entries whose bucket is older than `2*window` (§4.3), run
    /// from [`run_sweep_loop`] on a fixed interval.
    pub fn sweep(&self) {
        self.sweep_at(Utc::now());
    }

    fn sweep_at(&self, now: DateTime<Utc>) {
        let stale_after = self.window * 2;
        let mut buckets = self.buckets.lock().unwrap();
        buckets.retain(|_, bucket| {
            now.signed_duration_since(bucket.last_reset).num_milliseconds()
                < stale_after.as_millis() as i64
        });
    }

    /// Runs [`sweep`](Self::sweep) on [`SWEEP_INTERVAL`](Self::SWEEP_INTERVAL)
    /// until the process shuts down, mirroring the topic graph's periodic
    /// refresh loop.
    pub async fn run_sweep_loop(self: Arc<Self>) {
        let mut ticker = tokio::time::interval(Self::SWEEP_INTERVAL);
        loop {
            ticker.tick().await;
            self.sweep();
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn allows_up_to_rate_requests_per_window() {
        let limiter = RateLimiter::new(3, Duration::from_secs(60));
        let now = Utc::now();
        assert!(limiter.allow_at("1.2.3.4", now));
        assert!(limiter.allow_at("1.2.3.4", now));
        assert!(limiter.allow_at("1.2.3.4", now));
        assert!(!limiter.allow_at("1.2.3.4", now));
    }

    #[test]
    fn resets_after_the_window_elapses() {
        let limiter = RateLimiter::new(1, Duration::from_secs(60));
        let start = Utc::now();
        assert!(limiter.allow_at("1.2.3.4", start));
        assert!(!limiter.allow_at("1.2.3.4", start));

        let later = start + chrono::Duration::seconds(61);
        assert!(limiter.allow_at("1.2.3.4", later));
    }

    #[test]
    fn distinct_ips_have_independent_buckets() {
        let limiter = RateLimiter::new(1, Duration::from_secs(60));
        let now = Utc::now();
        assert!(limiter.allow_at("1.1.1.1", now));
        assert!(limiter.allow_at("2.2.2.2", now));
        assert!(!limiter.allow_at("1.1.1.1", now));
    }

    #[test]
    fn sweep_removes_entries_older_than_twice_the_window() {
        let limiter = RateLimiter::new(1, Duration::from_secs(60));
        let start = Utc::now();
        limiter.allow_at("1.2.3.4", start);

        limiter.sweep_at(start + chrono::Duration::seconds(121));
        assert_eq!(limiter.buckets.lock().unwrap().len(), 0);
    }

    #[test]
    fn sweep_keeps_entries_within_twice_the_window() {
        let limiter = RateLimiter::new(1, Duration::from_secs(60));
        let start = Utc::now();
        limiter.allow_at("1.2.3.4", start);

        limiter.sweep_at(start + chrono::Duration::seconds(90));
        assert_eq!(limiter.buckets.lock().unwrap().len(), 1);
    }
}
