//! Request and token bucket rate limiting, keyed by caller identity.
//! Sliding windows are maintained as a list of timestamps with eviction;
//! the token bucket additionally corrects its last entry from estimated to
//! actual usage once a response lands.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use lexiscribe_core::Error;
use parking_lot::Mutex;

struct RequestBuckets {
    minute: Mutex<VecDeque<Instant>>,
    hour: Mutex<VecDeque<Instant>>,
}

impl RequestBuckets {
    fn new() -> Self {
        Self {
            minute: Mutex::new(VecDeque::new()),
            hour: Mutex::new(VecDeque::new()),
        }
    }
}

struct TokenBucket {
    /// (timestamp, token_count), most recent at the back.
    entries: Mutex<VecDeque<(Instant, u32)>>,
    daily_total: Mutex<u32>,
}

impl TokenBucket {
    fn new() -> Self {
        Self {
            entries: Mutex::new(VecDeque::new()),
            daily_total: Mutex::new(0),
        }
    }
}

fn evict_before(bucket: &mut VecDeque<Instant>, window: Duration, now: Instant) {
    while let Some(&front) = bucket.front() {
        if now.duration_since(front) > window {
            bucket.pop_front();
        } else {
            break;
        }
    }
}

/// Process-global rate limiter shared via one `Arc` per substrate instance.
/// Operations holding the per-key lock are O(bucket size) only, per the
/// concurrency model's shared-resource policy.
pub struct RateLimiter {
    requests_per_minute: u32,
    requests_per_hour: u32,
    tokens_per_minute: u32,
    requests_per_day: u32,
    request_buckets: DashMap<String, RequestBuckets>,
    token_buckets: DashMap<String, TokenBucket>,
    day_counts: DashMap<String, (Instant, u32)>,
}

pub struct Admission {
    pub retry_after: Option<Duration>,
}

/// Point-in-time bucket counters for the rate-limit response headers.
/// Read-only: does not evict or mutate state beyond what the caller's next
/// `admit` would anyway.
#[derive(Debug, Clone, Copy)]
pub struct RateLimitSnapshot {
    pub requests_limit_minute: u32,
    pub requests_remaining_minute: u32,
    pub tokens_limit_minute: u32,
    pub tokens_remaining_minute: u32,
}

impl RateLimiter {
    pub fn new(requests_per_minute: u32, requests_per_hour: u32, tokens_per_minute: u32, requests_per_day: u32) -> Self {
        Self {
            requests_per_minute,
            requests_per_hour,
            tokens_per_minute,
            requests_per_day,
            request_buckets: DashMap::new(),
            token_buckets: DashMap::new(),
            day_counts: DashMap::new(),
        }
    }

    /// Admits a request carrying an *estimated* token count. Returns
    /// `Err(RateLimited)` with a retry-after hint if any bucket is
    /// exhausted; otherwise records the request/estimate and returns `Ok`.
    pub fn admit(&self, key: &str, estimated_tokens: u32) -> Result<(), Error> {
        let now = Instant::now();

        {
            let day_entry = self.day_counts.entry(key.to_string()).or_insert((now, 0));
            let (started, count) = *day_entry;
            drop(day_entry);
            if now.duration_since(started) > Duration::from_secs(86_400) {
                self.day_counts.insert(key.to_string(), (now, 0));
            } else if count >= self.requests_per_day {
                let retry_after = Duration::from_secs(86_400).saturating_sub(now.duration_since(started));
                metrics::counter!("lexiscribe_rate_limit_denials_total", "window" => "day").increment(1);
                return Err(Error::RateLimited { retry_after: Some(retry_after.as_secs()) });
            }
        }

        let bucket_entry = self.request_buckets.entry(key.to_string()).or_insert_with(RequestBuckets::new);
        {
            let mut minute = bucket_entry.minute.lock();
            evict_before(&mut minute, Duration::from_secs(60), now);
            if minute.len() as u32 >= self.requests_per_minute {
                let reset = minute.front().copied().unwrap_or(now) + Duration::from_secs(60);
                let retry_after = reset.saturating_duration_since(now);
                metrics::counter!("lexiscribe_rate_limit_denials_total", "window" => "minute").increment(1);
                return Err(Error::RateLimited { retry_after: Some(retry_after.as_secs().max(1)) });
            }
        }
        {
            let mut hour = bucket_entry.hour.lock();
            evict_before(&mut hour, Duration::from_secs(3600), now);
            if hour.len() as u32 >= self.requests_per_hour {
                let reset = hour.front().copied().unwrap_or(now) + Duration::from_secs(3600);
                let retry_after = reset.saturating_duration_since(now);
                metrics::counter!("lexiscribe_rate_limit_denials_total", "window" => "hour").increment(1);
                return Err(Error::RateLimited { retry_after: Some(retry_after.as_secs().max(1)) });
            }
        }

        let token_entry = self.token_buckets.entry(key.to_string()).or_insert_with(TokenBucket::new);
        {
            let mut entries = token_entry.entries.lock();
            evict_before_tokens(&mut entries, Duration::from_secs(60), now);
            let current: u32 = entries.iter().map(|(_, t)| *t).sum();
            if current + estimated_tokens > self.tokens_per_minute {
                let retry_after = entries
                    .front()
                    .map(|(ts, _)| (*ts + Duration::from_secs(60)).saturating_duration_since(now))
                    .unwrap_or(Duration::from_secs(1));
                metrics::counter!("lexiscribe_rate_limit_denials_total", "window" => "tokens_minute").increment(1);
                return Err(Error::RateLimited { retry_after: Some(retry_after.as_secs().max(1)) });
            }
            entries.push_back((now, estimated_tokens));
        }
        *token_entry.daily_total.lock() += estimated_tokens;

        bucket_entry.minute.lock().push_back(now);
        bucket_entry.hour.lock().push_back(now);
        self.day_counts.entry(key.to_string()).and_modify(|(_, c)| *c += 1);

        Ok(())
    }

    /// Snapshot of remaining admission for `key`, for the `X-RateLimit-*`
    /// response headers. Does not evict stale entries, so it may
    /// slightly undercount remaining capacity versus the next `admit` call.
    pub fn snapshot(&self, key: &str) -> RateLimitSnapshot {
        let now = Instant::now();
        let requests_used = self
            .request_buckets
            .get(key)
            .map(|b| {
                let mut minute = b.minute.lock();
                evict_before(&mut minute, Duration::from_secs(60), now);
                minute.len() as u32
            })
            .unwrap_or(0);
        let tokens_used: u32 = self
            .token_buckets
            .get(key)
            .map(|b| {
                let mut entries = b.entries.lock();
                evict_before_tokens(&mut entries, Duration::from_secs(60), now);
                entries.iter().map(|(_, t)| *t).sum()
            })
            .unwrap_or(0);

        RateLimitSnapshot {
            requests_limit_minute: self.requests_per_minute,
            requests_remaining_minute: self.requests_per_minute.saturating_sub(requests_used),
            tokens_limit_minute: self.tokens_per_minute,
            tokens_remaining_minute: self.tokens_per_minute.saturating_sub(tokens_used),
        }
    }

    /// Corrects the most recent estimate for `key` with the actual token
    /// usage reported by the completed call.
    pub fn record_actual_tokens(&self, key: &str, actual_tokens: u32) {
        if let Some(bucket) = self.token_buckets.get(key) {
            let mut entries = bucket.entries.lock();
            if let Some(last) = entries.back_mut() {
                let estimated = last.1;
                last.1 = actual_tokens;
                drop(entries);
                let mut daily = bucket.daily_total.lock();
                *daily = daily.saturating_sub(estimated).saturating_add(actual_tokens);
            }
        }
    }
}

fn evict_before_tokens(entries: &mut VecDeque<(Instant, u32)>, window: Duration, now: Instant) {
    while let Some(&(ts, _)) = entries.front() {
        if now.duration_since(ts) > window {
            entries.pop_front();
        } else {
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admits_within_limits() {
        let limiter = RateLimiter::new(5, 100, 10_000, 1000);
        for _ in 0..5 {
            limiter.admit("caller", 100).unwrap();
        }
        let err = limiter.admit("caller", 100).unwrap_err();
        assert!(matches!(err, Error::RateLimited { .. }));
    }

    #[test]
    fn denies_when_token_budget_exhausted() {
        let limiter = RateLimiter::new(1000, 1000, 500, 10_000);
        limiter.admit("caller", 400).unwrap();
        let err = limiter.admit("caller", 200).unwrap_err();
        assert!(matches!(err, Error::RateLimited { .. }));
    }

    #[test]
    fn independent_callers_have_independent_buckets() {
        let limiter = RateLimiter::new(1, 100, 10_000, 1000);
        limiter.admit("a", 10).unwrap();
        limiter.admit("b", 10).unwrap();
    }

    #[test]
    fn actual_token_correction_adjusts_daily_total() {
        let limiter = RateLimiter::new(1000, 1000, 10_000, 1000);
        limiter.admit("caller", 100).unwrap();
        limiter.record_actual_tokens("caller", 40);
        let bucket = limiter.token_buckets.get("caller").unwrap();
        assert_eq!(*bucket.daily_total.lock(), 40);
    }
}
