//! HTTP surface: unary/streaming lookup, enhancement, corpus/search,
//! and health/readiness/metrics.

use std::convert::Infallible;
use std::time::Duration;

use axum::extract::{Path, Query, State};
use axum::http::{HeaderValue, Method};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use futures::stream::StreamExt;
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use lexiscribe_core::{parse_components, Error, SearchHit, SynthesizedEntryId, WordListId};
use lexiscribe_llm::RateLimitSnapshot;
use lexiscribe_pipeline::{project_entry, LookupInput, StreamFrame};

use crate::auth::auth_middleware;
use crate::metrics::{metrics_handler, track_http_metrics};
use crate::state::AppState;
use crate::ApiError;

pub fn create_router(state: AppState) -> Router {
    let cors_layer = build_cors_layer(&state.settings.server.cors_origins, state.settings.server.cors_enabled);

    Router::new()
        .route("/api/v1/lookup", post(lookup))
        .route("/api/v1/lookup/stream", get(lookup_stream))
        .route("/api/v1/enhance", post(enhance))
        .route("/api/v1/wordlists/:id/search", get(wordlist_search))
        .route("/api/v1/corpus/names/search", get(corpus_names_search))
        .route("/health", get(health_check))
        .route("/ready", get(readiness_check))
        .route("/metrics", get(metrics_handler))
        .layer(axum::middleware::from_fn_with_state(state.clone(), auth_middleware))
        .layer(axum::middleware::from_fn(track_http_metrics))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer)
        .with_state(state)
}

/// Builds the CORS layer from `server.cors_enabled`/`server.cors_origins`.
/// Disabled means permissive (local development only); an empty origin list
/// with CORS enabled falls back to `localhost:3000` rather than silently
/// allowing nothing.
fn build_cors_layer(origins: &[String], enabled: bool) -> CorsLayer {
    if !enabled {
        tracing::warn!("CORS is disabled, allowing all origins (not for production)");
        return CorsLayer::permissive();
    }

    if origins.is_empty() {
        tracing::info!("no CORS origins configured, defaulting to localhost:3000");
        return CorsLayer::new()
            .allow_origin("http://localhost:3000".parse::<HeaderValue>().unwrap())
            .allow_methods([Method::GET, Method::POST])
            .allow_headers(Any);
    }

    let parsed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| {
            origin.parse::<HeaderValue>().ok().or_else(|| {
                tracing::warn!(origin, "invalid CORS origin");
                None
            })
        })
        .collect();

    if parsed.is_empty() {
        tracing::error!("all configured CORS origins are invalid, falling back to localhost");
        return CorsLayer::new()
            .allow_origin("http://localhost:3000".parse::<HeaderValue>().unwrap())
            .allow_methods([Method::GET, Method::POST])
            .allow_headers(Any);
    }

    tracing::info!(count = parsed.len(), "CORS configured with explicit origins");
    CorsLayer::new()
        .allow_origin(parsed)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any)
        .allow_credentials(true)
}

fn new_request_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

fn rate_limit_headers(snapshot: RateLimitSnapshot) -> [(&'static str, String); 4] {
    [
        ("X-RateLimit-Limit-Minute", snapshot.requests_limit_minute.to_string()),
        ("X-RateLimit-Remaining-Minute", snapshot.requests_remaining_minute.to_string()),
        ("X-RateLimit-Limit-Tokens-Minute", snapshot.tokens_limit_minute.to_string()),
        ("X-RateLimit-Remaining-Tokens-Minute", snapshot.tokens_remaining_minute.to_string()),
    ]
}

#[derive(Debug, Deserialize)]
struct LookupRequest {
    word: String,
    #[serde(default)]
    providers: Vec<String>,
    #[serde(default)]
    languages: Vec<String>,
    #[serde(default)]
    force_refresh: bool,
    #[serde(default)]
    no_ai: bool,
}

impl LookupRequest {
    fn into_input(self, caller_key: String) -> LookupInput {
        LookupInput {
            word: self.word,
            providers: self.providers,
            languages: self.languages,
            force_refresh: self.force_refresh,
            no_ai: self.no_ai,
            caller_key,
        }
    }
}

async fn lookup(State(state): State<AppState>, Json(request): Json<LookupRequest>) -> impl IntoResponse {
    let request_id = new_request_id();
    if request.word.trim().is_empty() {
        return ApiError { error: Error::validation("word", "word must not be empty", "required"), request_id }
            .into_response();
    }

    let caller_key = "http".to_string();
    let input = request.into_input(caller_key.clone());
    let no_ai = input.no_ai;

    match state.pipeline.lookup(input, None).await {
        Ok(entry) => match project_entry(&state.repos, &entry).await {
            Ok(projection) => {
                if no_ai {
                    Json(projection).into_response()
                } else {
                    let snapshot = state.substrate.rate_limiter().snapshot(&caller_key);
                    (rate_limit_headers(snapshot), Json(projection)).into_response()
                }
            }
            Err(error) => ApiError { error, request_id }.into_response(),
        },
        Err(error) => ApiError { error, request_id }.into_response(),
    }
}

#[derive(Debug, Deserialize)]
struct LookupStreamQuery {
    word: String,
    #[serde(default)]
    providers: Option<String>,
    #[serde(default)]
    languages: Option<String>,
    #[serde(default)]
    force_refresh: bool,
    #[serde(default)]
    no_ai: bool,
}

fn split_csv(value: Option<String>) -> Vec<String> {
    value
        .map(|raw| raw.split(',').map(str::trim).filter(|s| !s.is_empty()).map(str::to_string).collect())
        .unwrap_or_default()
}

async fn lookup_stream(
    State(state): State<AppState>,
    Query(query): Query<LookupStreamQuery>,
) -> Sse<impl futures::Stream<Item = Result<Event, Infallible>>> {
    let request_id = new_request_id();
    let input = LookupInput {
        word: query.word,
        providers: split_csv(query.providers),
        languages: split_csv(query.languages),
        force_refresh: query.force_refresh,
        no_ai: query.no_ai,
        caller_key: "http-stream".to_string(),
    };

    let frames = state.streaming.run(input, request_id);
    let events = frames.map(|frame| {
        let event_name = match &frame {
            StreamFrame::Config { .. } => "config",
            StreamFrame::Progress(_) => "progress",
            StreamFrame::CompletionStart { .. } => "completion_start",
            StreamFrame::CompletionChunk { .. } => "completion_chunk",
            StreamFrame::Complete { .. } => "complete",
            StreamFrame::Error { .. } => "error",
            StreamFrame::Heartbeat => "heartbeat",
        };
        let data = serde_json::to_string(&frame).unwrap_or_default();
        Ok(Event::default().event(event_name).data(data))
    });

    Sse::new(events).keep_alive(KeepAlive::new().interval(Duration::from_secs(state.settings.stream.heartbeat_seconds)))
}

#[derive(Debug, Deserialize)]
struct EnhanceRequest {
    entry_id: Option<SynthesizedEntryId>,
    #[serde(default)]
    definition_ids: Vec<lexiscribe_core::DefinitionId>,
    #[serde(default)]
    components: Vec<String>,
    #[serde(default)]
    force: bool,
}

#[derive(Debug, Serialize)]
struct EnhanceResponse {
    updated_definitions: Vec<lexiscribe_core::Definition>,
    errors: Vec<EnhanceErrorOut>,
}

#[derive(Debug, Serialize)]
struct EnhanceErrorOut {
    definition_id: Option<lexiscribe_core::DefinitionId>,
    component: &'static str,
    message: String,
}

async fn enhance(State(state): State<AppState>, Json(request): Json<EnhanceRequest>) -> impl IntoResponse {
    let request_id = new_request_id();

    let components = match parse_components(&request.components) {
        Ok(components) => components,
        Err(error) => return ApiError { error, request_id }.into_response(),
    };

    let outcome = if let Some(entry_id) = request.entry_id {
        state.enhancement.regenerate_entry(entry_id, &components, request.force).await
    } else if !request.definition_ids.is_empty() {
        state.enhancement.regenerate_definition_ids(&request.definition_ids, &components, request.force).await
    } else {
        return ApiError {
            error: Error::validation("entry_id", "either entry_id or definition_ids is required", "required"),
            request_id,
        }
        .into_response();
    };

    match outcome {
        Ok(outcome) => Json(EnhanceResponse {
            updated_definitions: outcome.updated_definitions,
            errors: outcome
                .errors
                .into_iter()
                .map(|e| EnhanceErrorOut { definition_id: e.definition_id, component: e.component.name(), message: e.message })
                .collect(),
        })
        .into_response(),
        Err(error) => ApiError { error, request_id }.into_response(),
    }
}

#[derive(Debug, Deserialize)]
struct SearchQuery {
    q: String,
    #[serde(default = "default_max_results")]
    max_results: usize,
    #[serde(default)]
    min_score: Option<f32>,
    #[serde(default)]
    semantic: Option<bool>,
}

fn default_max_results() -> usize {
    20
}

/// Adaptive minimum-score stepping for short queries: a caller
/// that doesn't name a `min_score` gets progressively looser thresholds as
/// the query shortens, since a 2-3 character query otherwise starves a
/// fuzzy matcher tuned for longer words.
fn adaptive_min_score(query: &str, requested: Option<f32>) -> f32 {
    if let Some(score) = requested {
        return score;
    }
    match query.trim().chars().count() {
        0..=3 => 0.20,
        4..=6 => 0.25,
        _ => 0.30,
    }
}

#[derive(Debug, Serialize)]
struct SearchResponse {
    hits: Vec<SearchHit>,
}

async fn wordlist_search(
    State(state): State<AppState>,
    Path(id): Path<WordListId>,
    Query(query): Query<SearchQuery>,
) -> impl IntoResponse {
    let request_id = new_request_id();

    let list = match state.raw_repos.wordlists.find_by_id(id).await {
        Ok(Some(list)) => list,
        Ok(None) => return ApiError { error: Error::NotFound, request_id }.into_response(),
        Err(error) => return ApiError { error, request_id }.into_response(),
    };

    let corpus_name = format!("wordlist:{}:{}", list.id, list.hash_id);
    let mut vocabulary = Vec::with_capacity(list.words.len());
    for item in &list.words {
        if let Ok(Some(word)) = state.raw_repos.words.find_by_id(item.word_id).await {
            vocabulary.push(word.text);
        }
    }

    if let Err(error) = state.corpus_wordlists.create_or_get(&corpus_name, vocabulary).await {
        return ApiError { error, request_id }.into_response();
    }

    let min_score = adaptive_min_score(&query.q, query.min_score);
    match state.corpus_wordlists.search(&corpus_name, &query.q, query.max_results, min_score, query.semantic).await {
        Ok(hits) => Json(SearchResponse { hits }).into_response(),
        Err(error) => ApiError { error, request_id }.into_response(),
    }
}

#[derive(Debug, Deserialize)]
struct CorpusNamesQuery {
    q: String,
    owner_id: String,
    #[serde(default = "default_max_results")]
    max_results: usize,
    #[serde(default)]
    min_score: Option<f32>,
    #[serde(default)]
    semantic: Option<bool>,
}

/// Searches wordlist *names* for one owner. `WordListRepository` only
/// exposes `find_by_owner`, not a global listing, so this endpoint is scoped
/// to `owner_id` rather than searching every wordlist in the system.
async fn corpus_names_search(State(state): State<AppState>, Query(query): Query<CorpusNamesQuery>) -> impl IntoResponse {
    let request_id = new_request_id();

    let lists = match state.raw_repos.wordlists.find_by_owner(&query.owner_id).await {
        Ok(lists) => lists,
        Err(error) => return ApiError { error, request_id }.into_response(),
    };

    let corpus_name = format!("names:{}", query.owner_id);
    let vocabulary: Vec<String> = lists.iter().map(|l| l.name.clone()).collect();

    if let Err(error) = state.corpus_names.create_or_get(&corpus_name, vocabulary).await {
        return ApiError { error, request_id }.into_response();
    }

    let min_score = adaptive_min_score(&query.q, query.min_score);
    match state.corpus_names.search(&corpus_name, &query.q, query.max_results, min_score, query.semantic).await {
        Ok(hits) => Json(SearchResponse { hits }).into_response(),
        Err(error) => ApiError { error, request_id }.into_response(),
    }
}

async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "healthy", "version": env!("CARGO_PKG_VERSION") }))
}

async fn readiness_check(State(_state): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ready" }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn adaptive_min_score_steps_by_query_length() {
        assert_eq!(adaptive_min_score("ab", None), 0.20);
        assert_eq!(adaptive_min_score("abcde", None), 0.25);
        assert_eq!(adaptive_min_score("abcdefgh", None), 0.30);
        assert_eq!(adaptive_min_score("ab", Some(0.5)), 0.5);
    }

    #[test]
    fn split_csv_trims_and_drops_empty() {
        assert_eq!(split_csv(Some(" a, b ,,c".to_string())), vec!["a", "b", "c"]);
        assert_eq!(split_csv(None), Vec::<String>::new());
    }
}
