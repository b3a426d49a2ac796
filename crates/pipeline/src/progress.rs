//! Progress tracker: a single-writer state object scoped to one
//! lookup, fanning out to any number of bounded subscriber queues.

use std::collections::VecDeque;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::Notify;

/// Bound on each subscriber's queue. A full queue drops the oldest
/// non-terminal entry rather than blocking the single writer.
const SUBSCRIBER_QUEUE_CAPACITY: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Resolve,
    CacheCheck,
    ProviderFanout,
    Cluster,
    ClusterSynthesis,
    WordSynthesis,
    Persist,
    Enhancement,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Resolve => "resolve",
            Stage::CacheCheck => "cache_check",
            Stage::ProviderFanout => "provider_fanout",
            Stage::Cluster => "cluster",
            Stage::ClusterSynthesis => "cluster_synthesis",
            Stage::WordSynthesis => "word_synthesis",
            Stage::Persist => "persist",
            Stage::Enhancement => "enhancement",
        }
    }

    /// The ordered stage list a fresh lookup may traverse, used to build the
    /// streaming adapter's opening `config` frame.
    pub const ALL: [Stage; 8] = [
        Stage::Resolve,
        Stage::CacheCheck,
        Stage::ProviderFanout,
        Stage::Cluster,
        Stage::ClusterSynthesis,
        Stage::WordSynthesis,
        Stage::Persist,
        Stage::Enhancement,
    ];
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineState {
    pub stage: Stage,
    pub progress: f32,
    pub message: String,
    pub details: serde_json::Value,
    pub is_complete: bool,
    pub error: Option<String>,
    pub ts: DateTime<Utc>,
}

impl PipelineState {
    fn new(stage: Stage, progress: f32, message: impl Into<String>, details: serde_json::Value) -> Self {
        Self {
            stage,
            progress: progress.clamp(0.0, 1.0),
            message: message.into(),
            details,
            is_complete: false,
            error: None,
            ts: Utc::now(),
        }
    }

    fn complete() -> Self {
        Self {
            stage: Stage::Enhancement,
            progress: 1.0,
            message: "complete".to_string(),
            details: serde_json::Value::Null,
            is_complete: true,
            error: None,
            ts: Utc::now(),
        }
    }

    fn error_state(message: impl Into<String>) -> Self {
        Self {
            stage: Stage::Enhancement,
            progress: 1.0,
            message: "error".to_string(),
            details: serde_json::Value::Null,
            is_complete: true,
            error: Some(message.into()),
            ts: Utc::now(),
        }
    }
}

struct SubscriberQueue {
    states: Mutex<VecDeque<PipelineState>>,
    notify: Notify,
    closed: Mutex<bool>,
}

impl SubscriberQueue {
    fn push(&self, state: PipelineState) {
        let mut states = self.states.lock();
        if state.is_complete {
            // Terminal events are always delivered, even over capacity;
            // make room by evicting the oldest non-terminal entry.
            if states.len() >= SUBSCRIBER_QUEUE_CAPACITY {
                states.pop_front();
            }
            states.push_back(state);
            *self.closed.lock() = true;
        } else if states.len() >= SUBSCRIBER_QUEUE_CAPACITY {
            states.pop_front();
            states.push_back(state);
        } else {
            states.push_back(state);
        }
        drop(states);
        self.notify.notify_waiters();
    }
}

struct Inner {
    current: PipelineState,
    subscribers: Vec<Arc<SubscriberQueue>>,
    terminal: bool,
}

/// Single-writer progress state with bounded-queue pub/sub. The pipeline
/// coroutine is the
/// only writer; `subscribe` is the only reader-side entry point.
pub struct ProgressTracker {
    inner: Mutex<Inner>,
}

impl ProgressTracker {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            inner: Mutex::new(Inner {
                current: PipelineState::new(Stage::Resolve, 0.0, "starting", serde_json::Value::Null),
                subscribers: Vec::new(),
                terminal: false,
            }),
        })
    }

    pub fn current(&self) -> PipelineState {
        self.inner.lock().current.clone()
    }

    /// Returns a scoped subscription: the subscriber entry is pruned from
    /// `subscribers` the moment the returned guard is dropped, on every exit
    /// path including cancellation.
    pub fn subscribe(self: &Arc<Self>) -> ProgressSubscription {
        let queue = Arc::new(SubscriberQueue {
            states: Mutex::new(VecDeque::new()),
            notify: Notify::new(),
            closed: Mutex::new(false),
        });
        self.inner.lock().subscribers.push(queue.clone());
        ProgressSubscription {
            tracker: self.clone(),
            queue,
        }
    }

    pub fn update_stage(&self, stage: Stage, progress: f32, message: impl Into<String>, details: serde_json::Value) {
        let state = PipelineState::new(stage, progress, message, details);
        self.publish(state);
    }

    /// Sticky terminal transition: ignored if the tracker already reached a
    /// terminal state (`update_complete`/`update_error` called once).
    pub fn update_complete(&self) {
        self.publish(PipelineState::complete());
    }

    pub fn update_error(&self, message: impl Into<String>) {
        self.publish(PipelineState::error_state(message));
    }

    fn publish(&self, state: PipelineState) {
        let mut inner = self.inner.lock();
        if inner.terminal {
            return;
        }
        inner.terminal = state.is_complete;
        inner.current = state.clone();
        for subscriber in &inner.subscribers {
            subscriber.push(state.clone());
        }
    }

    fn unsubscribe(&self, queue: &Arc<SubscriberQueue>) {
        self.inner.lock().subscribers.retain(|q| !Arc::ptr_eq(q, queue));
    }
}

/// Owns one subscriber's queue handle. Dropping it (including via task
/// cancellation) removes it from the tracker's subscriber list.
pub struct ProgressSubscription {
    tracker: Arc<ProgressTracker>,
    queue: Arc<SubscriberQueue>,
}

impl ProgressSubscription {
    pub async fn recv(&mut self) -> Option<PipelineState> {
        loop {
            {
                let mut states = self.queue.states.lock();
                if let Some(state) = states.pop_front() {
                    return Some(state);
                }
                if *self.queue.closed.lock() {
                    return None;
                }
            }
            self.queue.notify.notified().await;
        }
    }
}

impl Drop for ProgressSubscription {
    fn drop(&mut self) {
        self.tracker.unsubscribe(&self.queue);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscriber_observes_published_states_in_order() {
        let tracker = ProgressTracker::new();
        let mut sub = tracker.subscribe();

        tracker.update_stage(Stage::Resolve, 0.1, "resolving", serde_json::Value::Null);
        tracker.update_stage(Stage::ProviderFanout, 0.3, "fetching", serde_json::Value::Null);
        tracker.update_complete();

        let first = sub.recv().await.unwrap();
        assert_eq!(first.stage, Stage::Resolve);
        let second = sub.recv().await.unwrap();
        assert_eq!(second.stage, Stage::ProviderFanout);
        let third = sub.recv().await.unwrap();
        assert!(third.is_complete);
        assert!(sub.recv().await.is_none());
    }

    #[tokio::test]
    async fn updates_after_terminal_state_are_ignored() {
        let tracker = ProgressTracker::new();
        let mut sub = tracker.subscribe();

        tracker.update_complete();
        tracker.update_stage(Stage::Enhancement, 0.5, "should be dropped", serde_json::Value::Null);

        let first = sub.recv().await.unwrap();
        assert!(first.is_complete);
        assert!(sub.recv().await.is_none());
    }

    #[tokio::test]
    async fn error_is_sticky_once_set() {
        let tracker = ProgressTracker::new();
        tracker.update_error("boom");
        tracker.update_stage(Stage::Persist, 0.9, "late update", serde_json::Value::Null);

        assert_eq!(tracker.current().error.as_deref(), Some("boom"));
    }

    #[tokio::test]
    async fn dropping_subscription_removes_it_from_the_tracker() {
        let tracker = ProgressTracker::new();
        let sub = tracker.subscribe();
        drop(sub);

        tracker.update_stage(Stage::Resolve, 0.2, "after drop", serde_json::Value::Null);
        assert_eq!(tracker.inner.lock().subscribers.len(), 0);
    }

    #[tokio::test]
    async fn full_queue_drops_oldest_non_terminal_event() {
        let tracker = ProgressTracker::new();
        let mut sub = tracker.subscribe();

        for i in 0..(SUBSCRIBER_QUEUE_CAPACITY + 10) {
            tracker.update_stage(Stage::Resolve, 0.0, format!("step {i}"), serde_json::Value::Null);
        }

        let first = sub.recv().await.unwrap();
        assert_ne!(first.message, "step 0");
    }
}
