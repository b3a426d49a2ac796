//! Wiktionary REST client, normalizing its entry shape into the internal
//! model. Wiktionary's public REST API returns one JSON blob per headword
//! keyed by language name, each holding a list of part-of-speech sections
//! with plain HTML-stripped definition strings.

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

use lexiscribe_core::{
    Definition, Example, ExampleType, ProviderBundle, ProviderClient, ProviderData, ProviderFetchResult, ProviderTag,
    Result, Word,
};

use crate::token_bucket::TokenBucket;
use crate::ProviderError;

const DEFAULT_BASE_URL: &str = "https://en.wiktionary.org/api/rest_v1/page/definition";

pub struct WiktionaryClient {
    http: Client,
    base_url: String,
    bucket: TokenBucket,
}

impl WiktionaryClient {
    pub fn new(requests_per_second: f64) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(10))
            .user_agent("lexiscribe/0.1")
            .build()
            .map_err(|e| lexiscribe_core::Error::internal(e.to_string()))?;

        Ok(Self {
            http,
            base_url: DEFAULT_BASE_URL.to_string(),
            bucket: TokenBucket::new(requests_per_second),
        })
    }

    #[cfg(test)]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    async fn fetch_raw(&self, word: &str) -> std::result::Result<serde_json::Value, ProviderError> {
        self.bucket.acquire().await;

        let url = format!("{}/{}", self.base_url, urlencoding_lite(word));
        let response = self.http.get(url).send().await?;

        if response.status().as_u16() == 404 {
            return Err(ProviderError::NotFound);
        }
        if !response.status().is_success() {
            return Err(ProviderError::Network(format!("status {}", response.status())));
        }

        response
            .json::<serde_json::Value>()
            .await
            .map_err(|e| ProviderError::MalformedResponse(e.to_string()))
    }
}

fn urlencoding_lite(word: &str) -> String {
    word.trim().replace(' ', "_")
}

#[async_trait]
impl ProviderClient for WiktionaryClient {
    fn tag(&self) -> ProviderTag {
        ProviderTag::Wiktionary
    }

    async fn fetch(&self, word: &str, language: &str) -> Result<ProviderFetchResult> {
        let raw = match self.fetch_raw(word).await {
            Ok(raw) => raw,
            Err(ProviderError::NotFound) => return Ok(ProviderFetchResult::NotFound),
            Err(err) => return Err(err.into()),
        };

        let language_key = language_key_for(language);
        let sections = raw.get(language_key).and_then(|v| v.as_array());
        let Some(sections) = sections else {
            return Ok(ProviderFetchResult::NotFound);
        };

        let dummy_word = Word::new(word, language);
        let mut provider_data = ProviderData::new(dummy_word.id, ProviderTag::Wiktionary, raw.clone());
        let mut definitions = Vec::new();
        let mut examples = Vec::new();
        let mut sense_number = 0u32;

        for section in sections {
            let part_of_speech = section
                .get("partOfSpeech")
                .and_then(|v| v.as_str())
                .unwrap_or("unknown")
                .to_lowercase();

            let Some(defs) = section.get("definitions").and_then(|v| v.as_array()) else {
                continue;
            };

            for def in defs {
                let Some(text) = def.get("definition").and_then(|v| v.as_str()) else {
                    continue;
                };
                let clean_text = strip_html(text);
                if clean_text.trim().is_empty() {
                    continue;
                }

                sense_number += 1;
                let definition = Definition::new(dummy_word.id, &part_of_speech, clean_text, sense_number);

                if let Some(parsed_examples) = def.get("parsedExamples").and_then(|v| v.as_array()) {
                    for example in parsed_examples {
                        if let Some(example_text) = example.get("example").and_then(|v| v.as_str()) {
                            examples.push(Example::new(definition.id, strip_html(example_text), ExampleType::Provider));
                        }
                    }
                }

                provider_data.definition_ids.push(definition.id);
                definitions.push(definition);
            }
        }

        if definitions.is_empty() {
            return Ok(ProviderFetchResult::NotFound);
        }

        Ok(ProviderFetchResult::Found(ProviderBundle {
            provider_data,
            definitions,
            examples,
            pronunciation: None,
        }))
    }
}

fn language_key_for(language: &str) -> &str {
    match language {
        "en" => "en",
        other => other,
    }
}

fn strip_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut in_tag = false;
    for c in input.chars() {
        match c {
            '<' => in_tag = true,
            '>' => in_tag = false,
            _ if !in_tag => out.push(c),
            _ => {}
        }
    }
    out.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_html_tags_from_definition_text() {
        let raw = "a feeling of <i>sudden</i> and unexpected <b>joy</b>";
        assert_eq!(strip_html(raw), "a feeling of sudden and unexpected joy");
    }

    #[test]
    fn language_key_maps_iso_code() {
        assert_eq!(language_key_for("en"), "en");
    }
}
