//! Simple per-provider token bucket for the requests-per-second limit each
//! provider client enforces internally.

use std::time::{Duration, Instant};

use parking_lot::Mutex;

pub struct TokenBucket {
    capacity: f64,
    refill_per_second: f64,
    state: Mutex<(f64, Instant)>,
}

impl TokenBucket {
    pub fn new(requests_per_second: f64) -> Self {
        Self {
            capacity: requests_per_second.max(1.0),
            refill_per_second: requests_per_second.max(0.01),
            state: Mutex::new((requests_per_second.max(1.0), Instant::now())),
        }
    }

    /// Blocks the current task until a token is available, then consumes it.
    pub async fn acquire(&self) {
        loop {
            let wait = {
                let mut state = self.state.lock();
                let (tokens, last) = *state;
                let elapsed = last.elapsed().as_secs_f64();
                let refilled = (tokens + elapsed * self.refill_per_second).min(self.capacity);

                if refilled >= 1.0 {
                    *state = (refilled - 1.0, Instant::now());
                    None
                } else {
                    *state = (refilled, Instant::now());
                    let deficit = 1.0 - refilled;
                    Some(Duration::from_secs_f64(deficit / self.refill_per_second))
                }
            };

            match wait {
                None => return,
                Some(duration) => tokio::time::sleep(duration).await,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn acquires_immediately_within_capacity() {
        let bucket = TokenBucket::new(5.0);
        for _ in 0..5 {
            bucket.acquire().await;
        }
    }
}
