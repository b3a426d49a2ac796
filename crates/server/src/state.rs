//! `AppState`: everything a request handler needs, constructed once at
//! startup in `main.rs` and cloned (cheaply, via `Arc` fields) into every
//! Axum handler.

use std::sync::Arc;
use std::time::Duration;

use lexiscribe_config::Settings;
use lexiscribe_corpus::CorpusRegistry;
use lexiscribe_llm::Substrate;
use lexiscribe_persistence::RepositorySet;
use lexiscribe_pipeline::{EnhancementEngine, LookupPipeline, PipelineDeadlines, Repos, StreamingAdapter, StreamingConfig};
use lexiscribe_providers::ProviderRegistry;
use metrics_exporter_prometheus::PrometheusHandle;

#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub repos: Repos,
    pub raw_repos: RepositorySet,
    pub substrate: Arc<Substrate>,
    pub pipeline: Arc<LookupPipeline>,
    pub enhancement: Arc<EnhancementEngine>,
    pub streaming: Arc<StreamingAdapter>,
    /// Shared corpus over every wordlist's *name*.
    pub corpus_names: Arc<CorpusRegistry>,
    /// Per-wordlist corpus over that list's *words*.
    pub corpus_wordlists: Arc<CorpusRegistry>,
    pub prometheus_handle: PrometheusHandle,
}

impl AppState {
    pub fn new(settings: Settings, prometheus_handle: PrometheusHandle) -> lexiscribe_core::Result<Self> {
        let settings = Arc::new(settings);
        let raw_repos = RepositorySet::new();

        let rate_limiter = Arc::new(lexiscribe_llm::RateLimiter::new(
            settings.rate.requests_per_minute,
            settings.rate.requests_per_hour,
            settings.rate.tokens_per_minute,
            settings.rate.requests_per_day,
        ));
        let dedup_max_wait = Duration::from_secs(settings.pipeline.lookup_dedup_max_wait_seconds);
        let substrate = Arc::new(Substrate::new(&settings.llm, rate_limiter, dedup_max_wait)?);

        let repos = Repos {
            word: raw_repos.words.clone(),
            provider_data: raw_repos.provider_data.clone(),
            definition: raw_repos.definitions.clone(),
            example: raw_repos.examples.clone(),
            pronunciation: raw_repos.pronunciations.clone(),
            fact: raw_repos.facts.clone(),
            entry: raw_repos.entries.clone(),
            llm: substrate.clone(),
        };

        let providers =
            ProviderRegistry::new(&settings.providers.enabled, settings.providers.wiktionary_requests_per_second)?
                .active_providers();

        let enhancement = Arc::new(EnhancementEngine::new(repos.clone()));
        let deadlines = PipelineDeadlines::from(&settings.pipeline);
        let pipeline = Arc::new(LookupPipeline::new(repos.clone(), providers, enhancement.clone(), deadlines));

        let streaming_config = StreamingConfig::from(&settings.stream);
        let streaming = Arc::new(StreamingAdapter::new(pipeline.clone(), repos.clone(), streaming_config));

        let corpus_names = Arc::new(
            CorpusRegistry::new(chrono::Duration::hours(settings.cache.corpus_names_hours as i64))
                .with_semantic_params(settings.corpus.semantic_auto_threshold, settings.corpus.semantic_weight),
        );
        let corpus_wordlists = Arc::new(
            CorpusRegistry::new(chrono::Duration::hours(settings.cache.corpus_wordlist_hours as i64))
                .with_semantic_params(settings.corpus.semantic_auto_threshold, settings.corpus.semantic_weight),
        );

        Ok(Self {
            settings,
            repos,
            raw_repos,
            substrate,
            pipeline,
            enhancement,
            streaming,
            corpus_names,
            corpus_wordlists,
            prometheus_handle,
        })
    }
}
