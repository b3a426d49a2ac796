//! Prometheus metrics exposition. `init_metrics` installs the global
//! recorder once at startup; every other module just calls the `metrics`
//! crate's macros (`counter!`, `histogram!`, `gauge!`) and the values land
//! in the registry this module owns.

use std::time::Instant;

use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use crate::state::AppState;

/// Installs the process-wide Prometheus recorder and returns a handle whose
/// `render()` the `/metrics` route calls on every scrape. Must be called
/// exactly once, before any `metrics::counter!`/`histogram!`/`gauge!` call.
pub fn init_metrics() -> PrometheusHandle {
    PrometheusBuilder::new()
        .install_recorder()
        .expect("failed to install Prometheus recorder")
}

pub async fn metrics_handler(State(state): State<AppState>) -> impl IntoResponse {
    (StatusCode::OK, state.prometheus_handle.render())
}

/// Records `HTTP_REQUESTS_TOTAL` for every request that reaches the router,
/// labeled by route and status class. Sits outermost so it also
/// counts requests the auth middleware rejects.
pub async fn track_http_metrics(request: Request, next: Next) -> Response {
    let path = request.uri().path().to_string();
    let method = request.method().as_str().to_string();
    let started = Instant::now();

    let response = next.run(request).await;

    let status_class = match response.status().as_u16() {
        200..=299 => "2xx",
        300..=399 => "3xx",
        400..=499 => "4xx",
        _ => "5xx",
    };
    metrics::counter!(names::HTTP_REQUESTS_TOTAL, "method" => method, "path" => path, "status" => status_class)
        .increment(1);
    metrics::histogram!("lexiscribe_http_request_duration_seconds").record(started.elapsed().as_secs_f64());

    response
}

/// Metric names shared between this crate's own instrumentation points.
/// Lower-level crates (`llm`, `pipeline`, `corpus`) cannot depend on the
/// `server` crate, so they use their own inline literals; these constants
/// only back the counters this crate emits directly.
pub mod names {
    pub const HTTP_REQUESTS_TOTAL: &str = "lexiscribe_http_requests_total";
}
