//! Single-flight coalescing for in-flight LLM calls. Concurrent
//! callers for the same key share one computation via a `tokio::sync::watch`
//! channel; a waiter that doesn't see a result within `max_wait` falls
//! through to an independent call rather than waiting forever.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use lexiscribe_core::{Error, Result};
use tokio::sync::watch;

#[derive(Clone)]
enum Slot<T> {
    Pending,
    Done(Result<T>),
}

pub struct SingleFlight<K, T>
where
    K: std::hash::Hash + Eq + Clone,
    T: Clone + Send + Sync + 'static,
{
    inflight: DashMap<K, watch::Receiver<Slot<T>>>,
}

impl<K, T> SingleFlight<K, T>
where
    K: std::hash::Hash + Eq + Clone,
    T: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self { inflight: DashMap::new() }
    }

    /// Runs `work` for `key`, coalescing concurrent callers onto one
    /// execution. A caller that joins an in-flight computation waits up to
    /// `max_wait`; on timeout it proceeds to run `work` independently rather
    /// than blocking indefinitely. Whichever caller actually executes the
    /// work propagates its error to every other waiter that observed it in
    /// time.
    pub async fn run<F, Fut>(&self, key: K, max_wait: Duration, work: F) -> Result<T>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = Result<T>>,
    {
        if let Some(receiver) = self.inflight.get(&key).map(|r| r.clone()) {
            match wait_for_slot(receiver, max_wait).await {
                Some(result) => return result,
                None => {
                    // Timed out waiting; fall through to an independent call.
                }
            }
        }

        let (tx, rx) = watch::channel(Slot::Pending);
        // Only the first caller to insert wins the leader role; losers of
        // this race join the winner's channel instead.
        match self.inflight.entry(key.clone()) {
            dashmap::mapref::entry::Entry::Occupied(existing) => {
                let receiver = existing.get().clone();
                drop(existing);
                return match wait_for_slot(receiver, max_wait).await {
                    Some(result) => result,
                    None => work().await,
                };
            }
            dashmap::mapref::entry::Entry::Vacant(vacant) => {
                vacant.insert(rx);
            }
        }

        let result = work().await;
        let _ = tx.send(Slot::Done(result.clone()));
        self.inflight.remove(&key);
        result
    }
}

async fn wait_for_slot<T: Clone>(mut receiver: watch::Receiver<Slot<T>>, max_wait: Duration) -> Option<Result<T>> {
    let deadline = tokio::time::sleep(max_wait);
    tokio::pin!(deadline);

    loop {
        if let Slot::Done(result) = receiver.borrow().clone() {
            return Some(result);
        }
        tokio::select! {
            changed = receiver.changed() => {
                if changed.is_err() {
                    return None;
                }
            }
            _ = &mut deadline => {
                return None;
            }
        }
    }
}

impl<K, T> Default for SingleFlight<K, T>
where
    K: std::hash::Hash + Eq + Clone,
    T: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

/// Shared handle, cloned cheaply into every call site that needs dedup.
pub type SharedSingleFlight<K, T> = Arc<SingleFlight<K, T>>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn concurrent_callers_share_one_execution() {
        let sf: SingleFlight<String, u32> = SingleFlight::new();
        let sf = Arc::new(sf);
        let calls = Arc::new(AtomicU32::new(0));

        let mut handles = Vec::new();
        for _ in 0..10 {
            let sf = sf.clone();
            let calls = calls.clone();
            handles.push(tokio::spawn(async move {
                sf.run("key".to_string(), Duration::from_secs(1), || {
                    let calls = calls.clone();
                    async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(30)).await;
                        Ok(42u32)
                    }
                })
                .await
            }));
        }

        for handle in handles {
            assert_eq!(handle.await.unwrap().unwrap(), 42);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn error_propagates_to_waiters() {
        let sf: SingleFlight<String, u32> = SingleFlight::new();
        let sf = Arc::new(sf);

        let leader = {
            let sf = sf.clone();
            tokio::spawn(async move {
                sf.run("key".to_string(), Duration::from_secs(1), || async {
                    tokio::time::sleep(Duration::from_millis(20)).await;
                    Err(Error::Internal { cause: "boom".to_string() })
                })
                .await
            })
        };
        tokio::time::sleep(Duration::from_millis(5)).await;
        let follower = {
            let sf = sf.clone();
            tokio::spawn(async move {
                sf.run("key".to_string(), Duration::from_secs(1), || async { Ok(0u32) }).await
            })
        };

        assert!(leader.await.unwrap().is_err());
        assert!(follower.await.unwrap().is_err());
    }
}
