//! The enhancement engine: fills in the remaining component facets on
//! a set of `Definition`s, plus the three word-level facets
//! (pronunciation/etymology/facts), via a bounded fan-out of independent LLM
//! calls. A partial failure in one (definition, component) pair never
//! blocks the others — each call is independently retried by the substrate
//! and independently reported here.

use futures::future::join_all;

use lexiscribe_core::{
    Component, Definition, DefinitionId, Example, ExampleType, Pronunciation, Result,
    StructuredRequest, SynthesizedEntry, SynthesizedEntryId, TaskTag, Word,
};

use crate::llm_tasks;
use crate::Repos;

#[derive(Debug, Clone)]
pub struct EnhancementError {
    pub definition_id: Option<DefinitionId>,
    pub component: Component,
    pub message: String,
}

#[derive(Debug, Default)]
pub struct EnhancementOutcome {
    pub updated_definitions: Vec<Definition>,
    pub errors: Vec<EnhancementError>,
}

pub struct EnhancementEngine {
    repos: Repos,
}

impl EnhancementEngine {
    pub fn new(repos: Repos) -> Self {
        Self { repos }
    }

    /// Regenerates `components` across every definition in `definitions`
    /// that doesn't already have them (or all of them, if `force`). Each
    /// (definition, component) pair is its own LLM call; pairs for the same
    /// definition are merged into a single `update` write so a definition's
    /// `version` advances by exactly one per `regenerate_definitions` call
    /// regardless of how many components changed (the "exactly-once version
    /// bump").
    pub async fn regenerate_definitions(
        &self,
        definitions: Vec<Definition>,
        word: &Word,
        components: &[Component],
        force: bool,
    ) -> EnhancementOutcome {
        let def_components: Vec<Component> = components.iter().copied().filter(Component::is_definition_scoped).collect();

        let tasks = definitions.iter().enumerate().flat_map(|(idx, def)| {
            def_components
                .iter()
                .filter(move |c| force || !def.has_component(**c))
                .map(move |c| (idx, *c))
        });

        let calls = tasks.map(|(idx, component)| {
            let def = definitions[idx].clone();
            let word_text = word.text.clone();
            async move {
                let result = self.call_component(&word_text, &def, component).await;
                (idx, component, result)
            }
        });

        let results = join_all(calls).await;

        let mut per_definition: std::collections::HashMap<usize, Vec<(Component, serde_json::Value)>> =
            std::collections::HashMap::new();
        let mut example_texts: std::collections::HashMap<usize, Vec<String>> = std::collections::HashMap::new();
        let mut errors = Vec::new();

        for (idx, component, result) in results {
            match result {
                Ok(value) => {
                    if component == Component::Examples {
                        match llm_tasks::parse_example_texts(&value) {
                            Ok(texts) => {
                                example_texts.insert(idx, texts);
                            }
                            Err(e) => errors.push(EnhancementError {
                                definition_id: Some(definitions[idx].id),
                                component,
                                message: e.to_string(),
                            }),
                        }
                    } else {
                        per_definition.entry(idx).or_default().push((component, value));
                    }
                }
                Err(e) => errors.push(EnhancementError {
                    definition_id: Some(definitions[idx].id),
                    component,
                    message: e.to_string(),
                }),
            }
        }

        let mut updated_definitions = Vec::new();
        for (idx, original) in definitions.into_iter().enumerate() {
            let has_field_updates = per_definition.contains_key(&idx);
            let has_examples = example_texts.contains_key(&idx);
            if !has_field_updates && !has_examples {
                continue;
            }

            let mut updated = original.clone();
            if let Some(results) = per_definition.get(&idx) {
                for (component, value) in results {
                    if let Err(e) = llm_tasks::apply_component_result(&mut updated, *component, value) {
                        errors.push(EnhancementError {
                            definition_id: Some(original.id),
                            component: *component,
                            message: e.to_string(),
                        });
                    }
                }
            }

            if let Some(texts) = example_texts.get(&idx) {
                let examples: Vec<Example> = texts
                    .iter()
                    .map(|text| Example::new(original.id, text.clone(), ExampleType::Generated))
                    .collect();
                match self.repos.example.insert_many(examples).await {
                    Ok(persisted) => updated.example_ids = Some(persisted.iter().map(|e| e.id).collect()),
                    Err(e) => errors.push(EnhancementError {
                        definition_id: Some(original.id),
                        component: Component::Examples,
                        message: e.to_string(),
                    }),
                }
            }

            let batch_component = per_definition
                .get(&idx)
                .and_then(|v| v.first())
                .map(|(c, _)| *c)
                .unwrap_or(Component::Examples);
            match self.repos.definition.update(updated, original.version).await {
                Ok(saved) => updated_definitions.push(saved),
                Err(e) => errors.push(EnhancementError {
                    definition_id: Some(original.id),
                    component: batch_component,
                    message: format!("persisting enhanced definition failed: {e}"),
                }),
            }
        }

        EnhancementOutcome { updated_definitions, errors }
    }

    async fn call_component(&self, word: &str, definition: &Definition, component: Component) -> Result<serde_json::Value> {
        let prompt = llm_tasks::component_prompt(word, definition, component);
        let request = StructuredRequest {
            task_tag: TaskTag::from_component(component),
            estimated_tokens: llm_tasks::estimate_tokens(&prompt),
            prompt,
            schema: llm_tasks::component_schema(component),
            caller_key: format!("enhancement:{}", definition.id),
            cache_ttl_seconds: None,
            model_override: None,
        };
        let response = self.repos.llm.complete_structured(request).await?;
        Ok(response.value)
    }

    /// Regenerates the three word-level facets (pronunciation/etymology/
    /// facts) on an entry, skipping any already populated unless `force`.
    async fn regenerate_word_level(
        &self,
        word: &Word,
        entry: &SynthesizedEntry,
        definitions: &[Definition],
        components: &[Component],
        force: bool,
    ) -> (Option<lexiscribe_core::PronunciationId>, Option<String>, Vec<lexiscribe_core::FactId>, Vec<EnhancementError>) {
        let mut errors = Vec::new();
        let mut pronunciation_id = entry.pronunciation_id;
        let mut etymology = entry.etymology.clone();
        let mut fact_ids = entry.fact_ids.clone();

        if components.contains(&Component::Pronunciation) && (force || entry.pronunciation_id.is_none()) {
            let request = StructuredRequest {
                task_tag: TaskTag::GeneratePronunciation,
                prompt: llm_tasks::pronunciation_prompt(&word.text),
                schema: llm_tasks::pronunciation_schema(),
                caller_key: format!("enhancement:{}", word.id),
                estimated_tokens: llm_tasks::estimate_tokens(&word.text),
                cache_ttl_seconds: None,
                model_override: None,
            };
            match self.repos.llm.complete_structured(request).await {
                Ok(response) => match llm_tasks::parse_pronunciation_response(&response.value) {
                    Ok((phonetic, ipa)) => match self
                        .repos
                        .pronunciation
                        .upsert(Pronunciation::new(word.id, phonetic, ipa))
                        .await
                    {
                        Ok(pron) => pronunciation_id = Some(pron.id),
                        Err(e) => errors.push(EnhancementError {
                            definition_id: None,
                            component: Component::Pronunciation,
                            message: e.to_string(),
                        }),
                    },
                    Err(e) => errors.push(EnhancementError {
                        definition_id: None,
                        component: Component::Pronunciation,
                        message: e.to_string(),
                    }),
                },
                Err(e) => errors.push(EnhancementError {
                    definition_id: None,
                    component: Component::Pronunciation,
                    message: e.to_string(),
                }),
            }
        }

        if components.contains(&Component::Etymology) && (force || entry.etymology.is_none()) {
            let request = StructuredRequest {
                task_tag: TaskTag::ExtractEtymology,
                prompt: llm_tasks::etymology_prompt(&word.text, &[]),
                schema: llm_tasks::etymology_schema(),
                caller_key: format!("enhancement:{}", word.id),
                estimated_tokens: llm_tasks::estimate_tokens(&word.text),
                cache_ttl_seconds: None,
                model_override: None,
            };
            match self.repos.llm.complete_structured(request).await {
                Ok(response) => match llm_tasks::parse_etymology_response(&response.value) {
                    Ok(text) => etymology = Some(text),
                    Err(e) => errors.push(EnhancementError {
                        definition_id: None,
                        component: Component::Etymology,
                        message: e.to_string(),
                    }),
                },
                Err(e) => errors.push(EnhancementError {
                    definition_id: None,
                    component: Component::Etymology,
                    message: e.to_string(),
                }),
            }
        }

        if components.contains(&Component::Facts) && (force || entry.fact_ids.is_empty()) {
            let primary = definitions.first().map(|d| d.text.as_str()).unwrap_or(&word.text);
            let request = StructuredRequest {
                task_tag: TaskTag::GenerateFacts,
                prompt: llm_tasks::facts_prompt(&word.text, primary),
                schema: llm_tasks::facts_schema(),
                caller_key: format!("enhancement:{}", word.id),
                estimated_tokens: llm_tasks::estimate_tokens(primary),
                cache_ttl_seconds: None,
                model_override: None,
            };
            match self.repos.llm.complete_structured(request).await {
                Ok(response) => {
                    let model_info = lexiscribe_core::ModelInfo {
                        model: response.model.clone(),
                        confidence: Some(0.9),
                        prompt_tokens: response.usage.prompt_tokens,
                        completion_tokens: response.usage.completion_tokens,
                        total_tokens: response.usage.total_tokens,
                    };
                    let facts: Vec<lexiscribe_core::Fact> = llm_tasks::parse_facts_response(&response.value)
                        .into_iter()
                        .map(|(content, category)| lexiscribe_core::Fact {
                            id: lexiscribe_core::FactId::new(),
                            word_id: word.id,
                            content,
                            category,
                            model_info: model_info.clone(),
                            created_at: chrono::Utc::now(),
                        })
                        .collect();
                    if !facts.is_empty() {
                        match self.repos.fact.insert_many(facts).await {
                            Ok(persisted) => fact_ids = persisted.into_iter().map(|f| f.id).collect(),
                            Err(e) => errors.push(EnhancementError {
                                definition_id: None,
                                component: Component::Facts,
                                message: e.to_string(),
                            }),
                        }
                    }
                }
                Err(e) => errors.push(EnhancementError { definition_id: None, component: Component::Facts, message: e.to_string() }),
            }
        }

        (pronunciation_id, etymology, fact_ids, errors)
    }

    /// Top-level entry point for an explicit enhancement request against an
    /// already-persisted entry (`POST /api/v1/enhance`): resolves the
    /// entry's word and definitions, then delegates to the definition- and
    /// word-level regeneration paths and folds the word-level changes back
    /// into the entry.
    pub async fn regenerate_entry(
        &self,
        entry_id: SynthesizedEntryId,
        components: &[Component],
        force: bool,
    ) -> Result<EnhancementOutcome> {
        let entry = self.repos.entry.find_by_id(entry_id).await?.ok_or(lexiscribe_core::Error::NotFound)?;
        let word = self.repos.word.find_by_id(entry.word_id).await?.ok_or(lexiscribe_core::Error::NotFound)?;
        let definitions = self.repos.definition.find_by_ids(&entry.definition_ids).await?;

        let def_components: Vec<Component> = components.iter().copied().filter(Component::is_definition_scoped).collect();
        let word_components: Vec<Component> =
            components.iter().copied().filter(|c| !c.is_definition_scoped()).collect();

        let mut outcome = self.regenerate_definitions(definitions.clone(), &word, &def_components, force).await;
        let (pronunciation_id, etymology, fact_ids, mut word_errors) =
            self.regenerate_word_level(&word, &entry, &definitions, &word_components, force).await;
        outcome.errors.append(&mut word_errors);

        if pronunciation_id != entry.pronunciation_id || etymology != entry.etymology || fact_ids != entry.fact_ids {
            let mut updated_entry = entry.clone();
            updated_entry.pronunciation_id = pronunciation_id;
            updated_entry.etymology = etymology;
            updated_entry.fact_ids = fact_ids;
            self.repos.entry.update(updated_entry, entry.version).await?;
        }

        Ok(outcome)
    }

    /// Entry point for an enhancement request that names explicit
    /// `definition_ids` rather than an `entry_id` (`POST
    /// /api/v1/enhance`). Definitions are grouped by their owning Word since
    /// a request may span several headwords; word-scoped components
    /// (pronunciation/etymology/facts) are silently dropped from `components`
    /// here — there is no `SynthesizedEntry` in scope to attach them to
    /// without an `entry_id`, so only definition-scoped facets apply.
    pub async fn regenerate_definition_ids(
        &self,
        definition_ids: &[DefinitionId],
        components: &[Component],
        force: bool,
    ) -> Result<EnhancementOutcome> {
        let definitions = self.repos.definition.find_by_ids(definition_ids).await?;
        let def_components: Vec<Component> = components.iter().copied().filter(Component::is_definition_scoped).collect();

        let mut by_word: std::collections::HashMap<lexiscribe_core::WordId, Vec<Definition>> = std::collections::HashMap::new();
        for def in definitions {
            by_word.entry(def.word_id).or_default().push(def);
        }

        let mut outcome = EnhancementOutcome::default();
        for (word_id, group) in by_word {
            let word = self.repos.word.find_by_id(word_id).await?.ok_or(lexiscribe_core::Error::NotFound)?;
            let mut group_outcome = self.regenerate_definitions(group, &word, &def_components, force).await;
            outcome.updated_definitions.append(&mut group_outcome.updated_definitions);
            outcome.errors.append(&mut group_outcome.errors);
        }

        Ok(outcome)
    }
}
