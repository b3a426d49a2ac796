//! The streaming adapter: wraps one lookup in a long-lived
//! server-sent-events connection. Runs the pipeline in a background task,
//! relays progress frames as they arrive, heartbeats on an idle connection,
//! enforces an overall timeout, and cancels the background task cleanly on
//! client disconnect ("canceling the streaming adapter cancels the
//! background pipeline task").

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio_stream::Stream;

use lexiscribe_core::{EntryProjection, Example, Fact, Result};

use crate::lookup::{LookupInput, LookupPipeline};
use crate::progress::{PipelineState, ProgressTracker};
use crate::Repos;

const EXAMPLE_CHUNK_SIZE: usize = 10;

/// Aborts the wrapped task on drop, so a client disconnect (which drops the
/// `async_stream::stream!` generator mid-poll, never reaching the normal
/// completion path below) still cancels the background pipeline task.
struct AbortOnDrop<T>(Option<tokio::task::JoinHandle<T>>);

impl<T> AbortOnDrop<T> {
    fn abort(&mut self) {
        if let Some(handle) = &self.0 {
            handle.abort();
        }
    }

    async fn join(mut self) -> std::result::Result<T, tokio::task::JoinError> {
        self.0.take().expect("join called at most once").await
    }
}

impl<T> Drop for AbortOnDrop<T> {
    fn drop(&mut self) {
        if let Some(handle) = self.0.take() {
            handle.abort();
        }
    }
}

/// Keeps the active-streaming-connections gauge accurate across both
/// normal completion and a client disconnect mid-stream (the latter just
/// drops the generator, so the decrement has to live in `Drop`, not at the
/// end of the function body).
struct ActiveStreamGuard;

impl ActiveStreamGuard {
    fn new() -> Self {
        metrics::gauge!("lexiscribe_streaming_connections_active").increment(1.0);
        Self
    }
}

impl Drop for ActiveStreamGuard {
    fn drop(&mut self) {
        metrics::gauge!("lexiscribe_streaming_connections_active").decrement(1.0);
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind")]
pub enum StreamFrame {
    #[serde(rename = "config")]
    Config { stages: Vec<&'static str> },
    #[serde(rename = "progress")]
    Progress(PipelineState),
    #[serde(rename = "completion_start")]
    CompletionStart {
        word: String,
        id: lexiscribe_core::SynthesizedEntryId,
        model_info: lexiscribe_core::ModelInfo,
        pronunciation: Option<lexiscribe_core::Pronunciation>,
        etymology: Option<String>,
    },
    /// One frame per definition, plus one additional frame per extra batch
    /// of ≤10 examples once a definition's examples exceed the first batch
    /// ("examples for each definition in batches of 10"). `definition`
    /// is `Some` only on the first frame for that definition.
    #[serde(rename = "completion_chunk")]
    CompletionChunk { definition: Option<lexiscribe_core::Definition>, examples: Vec<Example> },
    #[serde(rename = "complete")]
    Complete { facts: Vec<Fact> },
    #[serde(rename = "error")]
    Error { error: String, details: Vec<lexiscribe_core::ErrorDetail>, request_id: String },
    /// A keepalive comment frame — no payload, just resets the idle timer on
    /// the wire.
    #[serde(rename = "heartbeat")]
    Heartbeat,
}

pub struct StreamingConfig {
    pub heartbeat: Duration,
    pub overall_timeout: Duration,
}

impl From<&lexiscribe_config::StreamConfig> for StreamingConfig {
    fn from(cfg: &lexiscribe_config::StreamConfig) -> Self {
        Self {
            heartbeat: Duration::from_secs(cfg.heartbeat_seconds),
            overall_timeout: Duration::from_secs(cfg.overall_timeout_seconds),
        }
    }
}

pub struct StreamingAdapter {
    pipeline: Arc<LookupPipeline>,
    repos: Repos,
    config: StreamingConfig,
}

impl StreamingAdapter {
    pub fn new(pipeline: Arc<LookupPipeline>, repos: Repos, config: StreamingConfig) -> Self {
        Self { pipeline, repos, config }
    }

    /// Runs the lookup in the background and returns a stream of frames.
    /// Dropping the returned stream (e.g. because the client disconnected)
    /// aborts the background pipeline task via `JoinHandle::abort` and drops
    /// the progress subscription, releasing the subscriber slot and any
    /// rate-limit admission held by in-flight calls.
    pub fn run(&self, input: LookupInput, request_id: String) -> impl Stream<Item = StreamFrame> + Send + 'static {
        let pipeline = self.pipeline.clone();
        let repos = self.repos.clone();
        let heartbeat = self.config.heartbeat;
        let overall_timeout = self.config.overall_timeout;

        async_stream::stream! {
            let _active_guard = ActiveStreamGuard::new();
            yield StreamFrame::Config { stages: stage_names() };

            let tracker = ProgressTracker::new();
            let mut subscription = tracker.subscribe();

            let task_input = input;
            let task_tracker = tracker.clone();
            let mut handle =
                AbortOnDrop(Some(tokio::spawn(async move { pipeline.lookup(task_input, Some(task_tracker)).await })));

            let deadline = tokio::time::sleep(overall_timeout);
            tokio::pin!(deadline);

            let mut final_entry: Option<lexiscribe_core::SynthesizedEntry> = None;
            let mut final_error: Option<lexiscribe_core::Error> = None;

            loop {
                let idle = tokio::time::sleep(heartbeat);
                tokio::pin!(idle);

                tokio::select! {
                    biased;

                    _ = &mut deadline => {
                        handle.abort();
                        final_error = Some(lexiscribe_core::Error::Timeout);
                        break;
                    }
                    state = subscription.recv() => {
                        match state {
                            Some(state) => {
                                let is_complete = state.is_complete;
                                let is_error = state.error.is_some();
                                yield StreamFrame::Progress(state);
                                if is_complete || is_error {
                                    break;
                                }
                            }
                            None => break,
                        }
                    }
                    _ = &mut idle => {
                        yield StreamFrame::Heartbeat;
                    }
                }
            }

            if final_error.is_none() {
                match handle.join().await {
                    Ok(Ok(entry)) => final_entry = Some(entry),
                    Ok(Err(e)) => final_error = Some(e),
                    Err(join_err) if join_err.is_cancelled() => {
                        final_error = Some(lexiscribe_core::Error::Cancelled);
                    }
                    Err(join_err) => {
                        final_error = Some(lexiscribe_core::Error::internal(join_err.to_string()));
                    }
                }
            }

            match final_entry {
                Some(entry) => {
                    for frame in hydrate_completion_frames(&repos, entry).await {
                        yield frame;
                    }
                }
                None => {
                    let error = final_error.unwrap_or(lexiscribe_core::Error::internal("stream ended without a result"));
                    tracing::info!(error = %error, %request_id, "streaming lookup ended in error");
                    yield StreamFrame::Error {
                        error: error.label().to_string(),
                        details: lexiscribe_core::ErrorBody::from_error(&error, request_id.clone()).details,
                        request_id,
                    };
                }
            }
        }
    }
}

fn stage_names() -> Vec<&'static str> {

    crate::progress::Stage::ALL.iter().map(|s| s.as_str()).collect()
}

/// Builds the chunked completion sequence ("basic info first, then one
/// definition at a time, then examples in batches of 10, then `complete`"),
/// hydrating ids into the full entities the projection needs.
async fn hydrate_completion_frames(repos: &Repos, entry: lexiscribe_core::SynthesizedEntry) -> Vec<StreamFrame> {
    let mut frames = Vec::new();

    let pronunciation = match entry.pronunciation_id {
        Some(id) => repos.pronunciation.find_by_word(entry.word_id).await.ok().flatten().filter(|p| p.id == id),
        None => None,
    };

    frames.push(StreamFrame::CompletionStart {
        word: repos.word.find_by_id(entry.word_id).await.ok().flatten().map(|w| w.text).unwrap_or_default(),
        id: entry.id,
        model_info: entry.model_info.clone(),
        pronunciation,
        etymology: entry.etymology.clone(),
    });

    let definitions = repos.definition.find_by_ids(&entry.definition_ids).await.unwrap_or_default();
    for definition in definitions {
        let examples = match &definition.example_ids {
            Some(ids) if !ids.is_empty() => {
                let all = repos.example.find_by_definition(definition.id).await.unwrap_or_default();
                all.into_iter().filter(|e| ids.contains(&e.id)).collect()
            }
            _ => Vec::new(),
        };

        if examples.len() <= EXAMPLE_CHUNK_SIZE {
            frames.push(StreamFrame::CompletionChunk { definition: Some(definition), examples });
        } else {
            let mut remaining = examples;
            let first_batch: Vec<Example> = remaining.drain(..EXAMPLE_CHUNK_SIZE).collect();
            frames.push(StreamFrame::CompletionChunk { definition: Some(definition), examples: first_batch });
            for batch in remaining.chunks(EXAMPLE_CHUNK_SIZE) {
                frames.push(StreamFrame::CompletionChunk { definition: None, examples: batch.to_vec() });
            }
        }
    }

    let facts = repos.fact.find_by_ids(&entry.fact_ids).await.unwrap_or_default();
    frames.push(StreamFrame::Complete { facts });
    frames
}

/// Collapses a `SynthesizedEntry` plus its hydrated parts into the same
/// projection shape the unary endpoint returns, for callers that want the
/// non-streaming representation of a completed lookup.
pub async fn project_entry(repos: &Repos, entry: &lexiscribe_core::SynthesizedEntry) -> Result<EntryProjection> {
    let word = repos.word.find_by_id(entry.word_id).await?.ok_or(lexiscribe_core::Error::NotFound)?;
    let definitions = repos.definition.find_by_ids(&entry.definition_ids).await?;
    let pronunciation = match entry.pronunciation_id {
        Some(_) => repos.pronunciation.find_by_word(entry.word_id).await?,
        None => None,
    };
    let facts = repos.fact.find_by_ids(&entry.fact_ids).await?;

    Ok(EntryProjection {
        word: word.text,
        id: entry.id,
        last_updated: entry.updated_at,
        model_info: entry.model_info.clone(),
        pronunciation,
        etymology: entry.etymology.clone(),
        images: entry.image_ids.clone(),
        definitions,
        facts,
    })
}
