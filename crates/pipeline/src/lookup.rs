//! The lookup pipeline: resolve → cache check → provider fan-out →
//! cluster → per-cluster synthesis → word-level synthesis → persist →
//! enhancement. One `LookupPipeline` is built once per process and shared
//! across requests; `lookup()` is the sole entry point the server and
//! streaming adapter call.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::join_all;
use tokio::time::timeout;

use lexiscribe_core::{
    Definition, Error, Example, Fact, ModelInfo, Pronunciation, ProviderBundle, ProviderClient,
    ProviderFetchResult, Result, StructuredRequest, SynthesizedEntry, TaskTag, TokenUsage, Word,
};
use lexiscribe_llm::SingleFlight;

use crate::enhancement::EnhancementEngine;
use crate::llm_tasks;
use crate::progress::{ProgressTracker, Stage};
use crate::Repos;

/// A single lookup request. `providers` empty means "every configured,
/// available provider"; `languages` only uses its first element today (the
/// resolve stage), kept as a list so a future multi-language resolve doesn't
/// need a wire-shape change.
#[derive(Debug, Clone)]
pub struct LookupInput {
    pub word: String,
    pub providers: Vec<String>,
    pub languages: Vec<String>,
    pub force_refresh: bool,
    pub no_ai: bool,
    pub caller_key: String,
}

impl LookupInput {
    pub fn language(&self) -> &str {
        self.languages.first().map(String::as_str).unwrap_or("en")
    }
}

struct TokenAccumulator {
    model: String,
    prompt_tokens: u32,
    completion_tokens: u32,
}

impl TokenAccumulator {
    fn new() -> Self {
        Self { model: String::new(), prompt_tokens: 0, completion_tokens: 0 }
    }

    fn add(&mut self, model: &str, usage: &TokenUsage) {
        self.model = model.to_string();
        self.prompt_tokens += usage.prompt_tokens;
        self.completion_tokens += usage.completion_tokens;
    }

    fn into_model_info(self) -> ModelInfo {
        ModelInfo {
            model: if self.model.is_empty() { "none".to_string() } else { self.model },
            confidence: None,
            prompt_tokens: self.prompt_tokens,
            completion_tokens: self.completion_tokens,
            total_tokens: self.prompt_tokens + self.completion_tokens,
        }
    }
}

pub struct PipelineDeadlines {
    pub provider_fetch: Duration,
    pub llm_request: Duration,
    pub db_bulk: Duration,
    pub dedup_max_wait: Duration,
}

impl From<&lexiscribe_config::PipelineConfig> for PipelineDeadlines {
    fn from(cfg: &lexiscribe_config::PipelineConfig) -> Self {
        Self {
            provider_fetch: Duration::from_secs(cfg.provider_fetch_deadline_seconds),
            llm_request: Duration::from_secs(cfg.llm_request_deadline_seconds),
            db_bulk: Duration::from_secs(cfg.db_bulk_deadline_seconds),
            dedup_max_wait: Duration::from_secs(cfg.lookup_dedup_max_wait_seconds),
        }
    }
}

pub struct LookupPipeline {
    repos: Repos,
    providers: Vec<Arc<dyn ProviderClient>>,
    enhancement: Arc<EnhancementEngine>,
    deadlines: PipelineDeadlines,
    single_flight: SingleFlight<String, SynthesizedEntry>,
}

impl LookupPipeline {
    pub fn new(
        repos: Repos,
        providers: Vec<Arc<dyn ProviderClient>>,
        enhancement: Arc<EnhancementEngine>,
        deadlines: PipelineDeadlines,
    ) -> Self {
        Self { repos, providers, enhancement, deadlines, single_flight: SingleFlight::new() }
    }

    fn active_providers(&self, requested: &[String]) -> Vec<Arc<dyn ProviderClient>> {
        if requested.is_empty() {
            return self.providers.clone();
        }
        self.providers
            .iter()
            .filter(|p| requested.iter().any(|name| name == p.tag().as_str()))
            .cloned()
            .collect()
    }

    fn dedup_key(word: &str, language: &str, providers: &[Arc<dyn ProviderClient>], no_ai: bool) -> String {
        let mut tags: Vec<&str> = providers.iter().map(|p| p.tag().as_str()).collect();
        tags.sort_unstable();
        format!("{}|{}|{}|{}", word.trim().to_lowercase(), language, tags.join(","), no_ai)
    }

    /// Runs the full pipeline for one request, coalescing concurrent
    /// identical requests via single-flight (the "shared-resource
    /// policy"). `progress`, if given, receives stage updates as the
    /// pipeline advances; only the single-flight leader's progress tracker
    /// observes real stage transitions — a follower only sees the final
    /// result (the leader already reported the stages).
    pub async fn lookup(&self, input: LookupInput, progress: Option<Arc<ProgressTracker>>) -> Result<SynthesizedEntry> {
        let active = self.active_providers(&input.providers);
        let key = Self::dedup_key(&input.word, input.language(), &active, input.no_ai);

        self.single_flight
            .run(key, self.deadlines.dedup_max_wait, || self.run_pipeline(input, active, progress))
            .await
    }

    async fn run_pipeline(
        &self,
        input: LookupInput,
        active_providers: Vec<Arc<dyn ProviderClient>>,
        progress: Option<Arc<ProgressTracker>>,
    ) -> Result<SynthesizedEntry> {
        let report = |stage: Stage, p: f32, msg: &str| {
            if let Some(tracker) = &progress {
                tracker.update_stage(stage, p, msg, serde_json::Value::Null);
            }
        };
        let mut stage_started = Instant::now();
        let mut record_stage = |name: &'static str, started: &mut Instant| {
            metrics::histogram!("lexiscribe_pipeline_stage_latency_seconds", "stage" => name)
                .record(started.elapsed().as_secs_f64());
            *started = Instant::now();
        };

        // Stage 1: resolve.
        report(Stage::Resolve, 0.05, "resolving word");
        let word = self.repos.word.get_or_create(&input.word, input.language()).await?;
        record_stage("resolve", &mut stage_started);

        // Stage 2: cache check.
        report(Stage::CacheCheck, 0.1, "checking cache");
        if !input.force_refresh {
            if let Some(mut existing) = self.repos.entry.find_by_word(word.id).await? {
                if existing.is_fresh(None) {
                    existing.touch_access();
                    let version = existing.version;
                    let updated = self.repos.entry.update(existing, version).await?;
                    report(Stage::Persist, 1.0, "served from cache");
                    if let Some(tracker) = &progress {
                        tracker.update_complete();
                    }
                    return Ok(updated);
                }
            }
        }

        record_stage("cache_check", &mut stage_started);

        // Stage 3: provider fan-out.
        report(Stage::ProviderFanout, 0.2, "fetching from providers");
        if active_providers.is_empty() {
            return Err(Error::AllProvidersFailed);
        }

        let fetches = active_providers.iter().map(|provider| {
            let provider = provider.clone();
            let word_text = word.text.clone();
            let language = input.language().to_string();
            let deadline = self.deadlines.provider_fetch;
            async move {
                let started = Instant::now();
                let result = timeout(deadline, provider.fetch(&word_text, &language)).await;
                metrics::histogram!("lexiscribe_provider_latency_seconds", "provider" => provider.tag().as_str())
                    .record(started.elapsed().as_secs_f64());
                result
            }
        });
        let fetch_results = join_all(fetches).await;

        let mut any_hard_error = false;
        let mut collected_definitions: Vec<Definition> = Vec::new();
        let mut collected_pronunciation: Option<Pronunciation> = None;
        let mut etymology_snippets: Vec<String> = Vec::new();
        let mut provider_data_ids = Vec::new();

        for (provider, outcome) in active_providers.iter().zip(fetch_results) {
            match outcome {
                Ok(Ok(ProviderFetchResult::Found(bundle))) => {
                    let ProviderBundle { mut provider_data, definitions, examples, pronunciation } = bundle;
                    provider_data.word_id = word.id;
                    if let Some(etym) = &provider_data.etymology {
                        etymology_snippets.push(etym.clone());
                    }

                    let mut persisted_defs = Vec::with_capacity(definitions.len());
                    for def in definitions {
                        let mut def = def;
                        def.word_id = word.id;
                        let original_id = def.id;
                        let inserted = self.repos.definition.insert(def).await?;
                        let own_examples: Vec<Example> =
                            examples.iter().filter(|ex| ex.definition_id == original_id).cloned().collect();
                        if !own_examples.is_empty() {
                            let retagged: Vec<Example> = own_examples
                                .into_iter()
                                .map(|mut ex| {
                                    ex.definition_id = inserted.id;
                                    ex
                                })
                                .collect();
                            self.repos.example.insert_many(retagged).await?;
                        }
                        persisted_defs.push(inserted);
                    }
                    provider_data.definition_ids = persisted_defs.iter().map(|d| d.id).collect();

                    if let Some(pron) = pronunciation {
                        let mut pron = pron;
                        pron.word_id = word.id;
                        let persisted_pron = self.repos.pronunciation.upsert(pron).await?;
                        provider_data.pronunciation_id = Some(persisted_pron.id);
                        if collected_pronunciation.is_none() {
                            collected_pronunciation = Some(persisted_pron);
                        }
                    }

                    let persisted_provider_data = self.repos.provider_data.upsert(provider_data).await?;
                    provider_data_ids.push(persisted_provider_data.id);
                    collected_definitions.extend(persisted_defs);

                    tracing::debug!(provider = %provider.tag(), word = %word.text, "provider fetch succeeded");
                }
                Ok(Ok(ProviderFetchResult::NotFound)) => {
                    tracing::debug!(provider = %provider.tag(), word = %word.text, "provider reported not found");
                }
                Ok(Err(err)) => {
                    tracing::warn!(provider = %provider.tag(), word = %word.text, error = %err, "provider fetch failed");
                    any_hard_error = true;
                }
                Err(_) => {
                    tracing::warn!(provider = %provider.tag(), word = %word.text, "provider fetch timed out");
                    any_hard_error = true;
                }
            }
        }

        record_stage("provider_fanout", &mut stage_started);

        if collected_definitions.is_empty() {
            return if any_hard_error { Err(Error::AllProvidersFailed) } else { Err(Error::NotFound) };
        }

        if input.no_ai {
            report(Stage::Persist, 0.9, "persisting raw provider data");
            let model_info = ModelInfo {
                model: "none".to_string(),
                confidence: None,
                prompt_tokens: 0,
                completion_tokens: 0,
                total_tokens: 0,
            };
            let entry = self
                .persist_entry(
                    &word,
                    collected_definitions.iter().map(|d| d.id).collect(),
                    collected_pronunciation.as_ref().map(|p| p.id),
                    etymology_snippets.first().cloned(),
                    Vec::new(),
                    provider_data_ids,
                    model_info,
                )
                .await?;
            report(Stage::Persist, 1.0, "persisted");
            if let Some(tracker) = &progress {
                tracker.update_complete();
            }
            return Ok(entry);
        }

        let mut usage = TokenAccumulator::new();

        // Stage 4: cluster.
        report(Stage::Cluster, 0.35, "clustering raw definitions");
        let cluster_request = StructuredRequest {
            task_tag: TaskTag::ClusterDefinitions,
            prompt: llm_tasks::cluster_prompt(&word.text, &collected_definitions),
            schema: llm_tasks::cluster_schema(),
            caller_key: input.caller_key.clone(),
            estimated_tokens: llm_tasks::estimate_tokens(&word.text),
            cache_ttl_seconds: None,
            model_override: None,
        };
        let cluster_response = timeout(self.deadlines.llm_request, self.repos.llm.complete_structured(cluster_request))
            .await
            .map_err(|_| Error::Timeout)??;
        usage.add(&cluster_response.model, &cluster_response.usage);
        let assignments = llm_tasks::parse_cluster_response(&cluster_response.value);

        let mut clusters: BTreeMap<String, (String, Vec<usize>)> = BTreeMap::new();
        let mut assigned = vec![false; collected_definitions.len()];
        for a in &assignments {
            if a.definition_index < collected_definitions.len() {
                assigned[a.definition_index] = true;
                clusters
                    .entry(a.cluster_id.clone())
                    .or_insert_with(|| (a.cluster_label.clone(), Vec::new()))
                    .1
                    .push(a.definition_index);
            }
        }
        for (idx, was_assigned) in assigned.iter().enumerate() {
            if !was_assigned {
                let def = &collected_definitions[idx];
                clusters.insert(format!("singleton-{}", def.id), (def.part_of_speech.clone(), vec![idx]));
            }
        }

        record_stage("cluster", &mut stage_started);

        // Stage 5: per-cluster synthesis.
        report(Stage::ClusterSynthesis, 0.55, "synthesizing senses");
        let mut synthesized_definitions = Vec::new();
        for (sense_number, (cluster_id, (cluster_label, indices))) in clusters.iter().enumerate() {
            let members: Vec<&Definition> = indices.iter().map(|&i| &collected_definitions[i]).collect();
            let request = StructuredRequest {
                task_tag: TaskTag::SynthesizeCluster,
                prompt: llm_tasks::synthesis_prompt(&word.text, cluster_label, &members),
                schema: llm_tasks::synthesis_schema(),
                caller_key: input.caller_key.clone(),
                estimated_tokens: llm_tasks::estimate_tokens(cluster_label),
                cache_ttl_seconds: None,
                model_override: None,
            };
            let response = timeout(self.deadlines.llm_request, self.repos.llm.complete_structured(request))
                .await
                .map_err(|_| Error::Timeout)??;
            usage.add(&response.model, &response.usage);
            let synth = llm_tasks::parse_synthesis_response(&response.value)?;

            let mut def = Definition::new(word.id, synth.part_of_speech, synth.text, (sense_number + 1) as u32);
            def.meaning_cluster =
                Some(lexiscribe_core::MeaningCluster { id: cluster_id.clone(), label: cluster_label.clone() });
            let persisted = self.repos.definition.insert(def).await?;
            synthesized_definitions.push(persisted);
        }

        record_stage("cluster_synthesis", &mut stage_started);

        // Stage 6: word-level synthesis.
        report(Stage::WordSynthesis, 0.7, "synthesizing word-level facets");
        let pronunciation_id = if let Some(pron) = collected_pronunciation {
            Some(pron.id)
        } else {
            let request = StructuredRequest {
                task_tag: TaskTag::GeneratePronunciation,
                prompt: llm_tasks::pronunciation_prompt(&word.text),
                schema: llm_tasks::pronunciation_schema(),
                caller_key: input.caller_key.clone(),
                estimated_tokens: llm_tasks::estimate_tokens(&word.text),
                cache_ttl_seconds: None,
                model_override: None,
            };
            let response = timeout(self.deadlines.llm_request, self.repos.llm.complete_structured(request))
                .await
                .map_err(|_| Error::Timeout)??;
            usage.add(&response.model, &response.usage);
            let (phonetic, ipa) = llm_tasks::parse_pronunciation_response(&response.value)?;
            let pron = self.repos.pronunciation.upsert(Pronunciation::new(word.id, phonetic, ipa)).await?;
            Some(pron.id)
        };

        let etymology_request = StructuredRequest {
            task_tag: TaskTag::ExtractEtymology,
            prompt: llm_tasks::etymology_prompt(&word.text, &etymology_snippets),
            schema: llm_tasks::etymology_schema(),
            caller_key: input.caller_key.clone(),
            estimated_tokens: llm_tasks::estimate_tokens(&word.text),
            cache_ttl_seconds: None,
            model_override: None,
        };
        let etymology_response =
            timeout(self.deadlines.llm_request, self.repos.llm.complete_structured(etymology_request))
                .await
                .map_err(|_| Error::Timeout)??;
        usage.add(&etymology_response.model, &etymology_response.usage);
        let etymology = llm_tasks::parse_etymology_response(&etymology_response.value)?;

        let primary_text = synthesized_definitions.first().map(|d| d.text.as_str()).unwrap_or(&word.text);
        let facts_request = StructuredRequest {
            task_tag: TaskTag::GenerateFacts,
            prompt: llm_tasks::facts_prompt(&word.text, primary_text),
            schema: llm_tasks::facts_schema(),
            caller_key: input.caller_key.clone(),
            estimated_tokens: llm_tasks::estimate_tokens(primary_text),
            cache_ttl_seconds: None,
            model_override: None,
        };
        let facts_response = timeout(self.deadlines.llm_request, self.repos.llm.complete_structured(facts_request))
            .await
            .map_err(|_| Error::Timeout)??;
        usage.add(&facts_response.model, &facts_response.usage);
        let parsed_facts = llm_tasks::parse_facts_response(&facts_response.value);
        let model_info_for_facts = ModelInfo {
            model: facts_response.model.clone(),
            confidence: Some(0.9),
            prompt_tokens: facts_response.usage.prompt_tokens,
            completion_tokens: facts_response.usage.completion_tokens,
            total_tokens: facts_response.usage.total_tokens,
        };
        let facts: Vec<Fact> = parsed_facts
            .into_iter()
            .map(|(content, category)| Fact {
                id: lexiscribe_core::FactId::new(),
                word_id: word.id,
                content,
                category,
                model_info: model_info_for_facts.clone(),
                created_at: chrono::Utc::now(),
            })
            .collect();
        let fact_ids = if facts.is_empty() {
            Vec::new()
        } else {
            self.repos.fact.insert_many(facts).await?.into_iter().map(|f| f.id).collect()
        };

        record_stage("word_synthesis", &mut stage_started);

        // Stage 7: persist.
        report(Stage::Persist, 0.9, "persisting synthesized entry");
        let entry = self
            .persist_entry(
                &word,
                synthesized_definitions.iter().map(|d| d.id).collect(),
                pronunciation_id,
                Some(etymology),
                fact_ids,
                provider_data_ids,
                usage.into_model_info(),
            )
            .await?;
        report(Stage::Persist, 0.95, "persisted");
        record_stage("persist", &mut stage_started);

        // Stage 8: enhancement, observable in progress but not gating the
        // response — the entry above is already durable.
        report(Stage::Enhancement, 0.97, "enhancing default facets");
        let outcome = self
            .enhancement
            .regenerate_definitions(synthesized_definitions, &word, &lexiscribe_core::Component::default_set(), false)
            .await;
        for err in &outcome.errors {
            tracing::warn!(component = err.component.name(), error = %err.message, "enhancement component failed");
        }
        record_stage("enhancement", &mut stage_started);

        if let Some(tracker) = &progress {
            tracker.update_complete();
        }
        Ok(entry)
    }

    #[allow(clippy::too_many_arguments)]
    async fn persist_entry(
        &self,
        word: &Word,
        definition_ids: Vec<lexiscribe_core::DefinitionId>,
        pronunciation_id: Option<lexiscribe_core::PronunciationId>,
        etymology: Option<String>,
        fact_ids: Vec<lexiscribe_core::FactId>,
        source_provider_data_ids: Vec<lexiscribe_core::ProviderDataId>,
        model_info: ModelInfo,
    ) -> Result<SynthesizedEntry> {
        let mut entry = SynthesizedEntry::new(word.id, model_info);
        entry.definition_ids = definition_ids;
        entry.pronunciation_id = pronunciation_id;
        entry.etymology = etymology;
        entry.fact_ids = fact_ids;
        entry.source_provider_data_ids = source_provider_data_ids;

        match self.repos.entry.find_by_word(word.id).await? {
            Some(existing) => {
                entry.id = existing.id;
                self.repos.entry.replace(entry, existing.version).await
            }
            None => self.repos.entry.insert(entry).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{test_repos, test_repos_with_llm, FailingProvider, NotFoundProvider, ScriptedSubstrate, StubProvider};
    use lexiscribe_core::ProviderTag;

    fn deadlines() -> PipelineDeadlines {
        PipelineDeadlines {
            provider_fetch: Duration::from_secs(5),
            llm_request: Duration::from_secs(5),
            db_bulk: Duration::from_secs(5),
            dedup_max_wait: Duration::from_secs(5),
        }
    }

    fn input(word: &str) -> LookupInput {
        LookupInput {
            word: word.to_string(),
            providers: Vec::new(),
            languages: vec!["en".to_string()],
            force_refresh: false,
            no_ai: false,
            caller_key: "test-caller".to_string(),
        }
    }

    fn pipeline_with_providers(repos: Repos, providers: Vec<Arc<dyn ProviderClient>>) -> LookupPipeline {
        let enhancement = Arc::new(EnhancementEngine::new(repos.clone()));
        LookupPipeline::new(repos, providers, enhancement, deadlines())
    }

    #[tokio::test]
    async fn lookup_synthesizes_and_persists_an_entry() {
        let repos = test_repos();
        let providers: Vec<Arc<dyn ProviderClient>> = vec![Arc::new(StubProvider { tag: ProviderTag::Wiktionary })];
        let pipeline = pipeline_with_providers(repos, providers);

        let entry = pipeline.lookup(input("joy"), None).await.unwrap();

        assert!(!entry.definition_ids.is_empty());
        assert!(entry.pronunciation_id.is_some());
        assert!(entry.etymology.is_some());
        assert_eq!(entry.model_info.model, "scripted-model");
    }

    #[tokio::test]
    async fn no_ai_lookup_skips_synthesis_and_uses_raw_provider_data() {
        let repos = test_repos();
        let providers: Vec<Arc<dyn ProviderClient>> = vec![Arc::new(StubProvider { tag: ProviderTag::Apple })];
        let pipeline = pipeline_with_providers(repos, providers);

        let mut req = input("joy");
        req.no_ai = true;
        let entry = pipeline.lookup(req, None).await.unwrap();

        assert_eq!(entry.model_info.model, "none");
        assert!(entry.fact_ids.is_empty());
    }

    #[tokio::test]
    async fn second_lookup_is_served_from_cache() {
        let repos = test_repos();
        let providers: Vec<Arc<dyn ProviderClient>> = vec![Arc::new(StubProvider { tag: ProviderTag::Wiktionary })];
        let pipeline = pipeline_with_providers(repos, providers);

        let first = pipeline.lookup(input("joy"), None).await.unwrap();
        let second = pipeline.lookup(input("joy"), None).await.unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(second.access_count, 1);
    }

    #[tokio::test]
    async fn all_providers_failing_hard_is_an_error() {
        let repos = test_repos();
        let providers: Vec<Arc<dyn ProviderClient>> = vec![Arc::new(FailingProvider)];
        let pipeline = pipeline_with_providers(repos, providers);

        let err = pipeline.lookup(input("joy"), None).await.unwrap_err();
        assert!(matches!(err, Error::AllProvidersFailed));
    }

    #[tokio::test]
    async fn all_providers_reporting_not_found_is_soft() {
        let repos = test_repos();
        let providers: Vec<Arc<dyn ProviderClient>> = vec![Arc::new(NotFoundProvider)];
        let pipeline = pipeline_with_providers(repos, providers);

        let err = pipeline.lookup(input("zzqx"), None).await.unwrap_err();
        assert!(matches!(err, Error::NotFound));
    }

    #[tokio::test]
    async fn no_active_providers_is_an_error() {
        let repos = test_repos_with_llm(Arc::new(ScriptedSubstrate::new()));
        let pipeline = pipeline_with_providers(repos, Vec::new());

        let err = pipeline.lookup(input("joy"), None).await.unwrap_err();
        assert!(matches!(err, Error::AllProvidersFailed));
    }

    #[test]
    fn dedup_key_is_order_independent_in_providers() {
        let a: Vec<Arc<dyn ProviderClient>> =
            vec![Arc::new(StubProvider { tag: ProviderTag::Wiktionary }), Arc::new(StubProvider { tag: ProviderTag::Apple })];
        let b: Vec<Arc<dyn ProviderClient>> =
            vec![Arc::new(StubProvider { tag: ProviderTag::Apple }), Arc::new(StubProvider { tag: ProviderTag::Wiktionary })];
        assert_eq!(LookupPipeline::dedup_key("Joy", "en", &a, false), LookupPipeline::dedup_key(" joy ", "en", &b, false));
    }
}
