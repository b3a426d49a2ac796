//! Response-schema and prompt construction for every LLM call the pipeline
//! and enhancement engine make (the "caller supplies a structured-output
//! contract"). Prompt bodies are intentionally terse template strings, not
//! tuned prompt copy — only the structural contract (schema, task tag, what
//! context goes in) is owned here.

use serde_json::{json, Value};

use lexiscribe_core::{Component, Definition, Error, FactCategory, Result};

fn values_schema() -> Value {
    json!({
        "type": "object",
        "properties": { "values": { "type": "array", "items": { "type": "string" } } },
        "required": ["values"]
    })
}

fn single_value_schema() -> Value {
    json!({
        "type": "object",
        "properties": { "value": { "type": "string" } },
        "required": ["value"]
    })
}

/// Schema for each recognized enhancement component's structured response.
pub fn component_schema(component: Component) -> Value {
    use Component::*;
    match component {
        Synonyms | Antonyms | WordForms | GrammarPatterns | Collocations | UsageNotes | RegionalVariants => {
            values_schema()
        }
        Examples => json!({
            "type": "object",
            "properties": { "examples": { "type": "array", "items": { "type": "string" } } },
            "required": ["examples"]
        }),
        CefrLevel => json!({
            "type": "object",
            "properties": { "level": { "type": "string", "enum": ["A1", "A2", "B1", "B2", "C1", "C2"] } },
            "required": ["level"]
        }),
        FrequencyBand => json!({
            "type": "object",
            "properties": { "band": { "type": "integer", "minimum": 1, "maximum": 5 } },
            "required": ["band"]
        }),
        Register | Domain => single_value_schema(),
        Pronunciation => pronunciation_schema(),
        Etymology => etymology_schema(),
        Facts => facts_schema(),
    }
}

pub fn component_prompt(word: &str, definition: &Definition, component: Component) -> String {
    format!(
        "Word: {word}\nPart of speech: {pos}\nDefinition: {text}\nTask: produce the {name} facet for this sense.",
        word = word,
        pos = definition.part_of_speech,
        text = definition.text,
        name = component.name(),
    )
}

/// Applies a component's validated structured response onto a cloned
/// `Definition`. Callers are expected to have already checked
/// `force`/`has_component` before dispatching the call this parses.
pub fn apply_component_result(definition: &mut Definition, component: Component, value: &Value) -> Result<()> {
    use Component::*;
    match component {
        Synonyms => definition.synonyms = Some(string_list(value)?),
        Antonyms => definition.antonyms = Some(string_list(value)?),
        WordForms => definition.word_forms = Some(string_list(value)?),
        GrammarPatterns => definition.grammar_patterns = Some(string_list(value)?),
        Collocations => definition.collocations = Some(string_list(value)?),
        UsageNotes => definition.usage_notes = Some(string_list(value)?),
        RegionalVariants => definition.region = Some(string_list(value)?),
        Examples => {
            // Example text generation is resolved into persisted `Example`
            // rows by the caller (it needs the repository); here we only
            // validate shape was already done by the LLM substrate.
        }
        CefrLevel => {
            let level = value
                .get("level")
                .and_then(|v| v.as_str())
                .ok_or_else(|| Error::internal("missing cefr level in response"))?;
            definition.cefr_level = Some(parse_cefr(level)?);
        }
        FrequencyBand => {
            let band = value
                .get("band")
                .and_then(|v| v.as_u64())
                .ok_or_else(|| Error::internal("missing frequency band in response"))?;
            definition.frequency_band = Some(band as u8);
        }
        Register => {
            definition.language_register =
                Some(value.get("value").and_then(|v| v.as_str()).unwrap_or_default().to_string());
        }
        Domain => {
            definition.domain = Some(value.get("value").and_then(|v| v.as_str()).unwrap_or_default().to_string());
        }
        Pronunciation | Etymology | Facts => {
            // Word-level components never touch a Definition field.
        }
    }
    Ok(())
}

fn string_list(value: &Value) -> Result<Vec<String>> {
    value
        .get("values")
        .and_then(|v| v.as_array())
        .map(|arr| arr.iter().filter_map(|v| v.as_str().map(str::to_string)).collect())
        .ok_or_else(|| Error::internal("expected a `values` array in component response"))
}

fn parse_cefr(level: &str) -> Result<lexiscribe_core::CefrLevel> {
    use lexiscribe_core::CefrLevel::*;
    match level {
        "A1" => Ok(A1),
        "A2" => Ok(A2),
        "B1" => Ok(B1),
        "B2" => Ok(B2),
        "C1" => Ok(C1),
        "C2" => Ok(C2),
        other => Err(Error::internal(format!("unrecognized CEFR level: {other}"))),
    }
}

/// Parses the `examples` facet's raw string list out of a structured
/// response (kept separate from `apply_component_result` because examples
/// become persisted `Example` rows, not a `Definition` field).
pub fn parse_example_texts(value: &Value) -> Result<Vec<String>> {
    value
        .get("examples")
        .and_then(|v| v.as_array())
        .map(|arr| arr.iter().filter_map(|v| v.as_str().map(str::to_string)).collect())
        .ok_or_else(|| Error::internal("expected an `examples` array in component response"))
}

// --- Cluster stage ---

pub fn cluster_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "assignments": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "definition_index": { "type": "integer" },
                        "cluster_id": { "type": "string" },
                        "cluster_label": { "type": "string" },
                        "relevance_score": { "type": "number" }
                    },
                    "required": ["definition_index", "cluster_id", "cluster_label", "relevance_score"]
                }
            }
        },
        "required": ["assignments"]
    })
}

pub fn cluster_prompt(word: &str, definitions: &[Definition]) -> String {
    let mut body = format!("Word: {word}\nGroup the following raw definitions by distinct meaning.\n");
    for (i, def) in definitions.iter().enumerate() {
        body.push_str(&format!("{i}. ({}) {}\n", def.part_of_speech, def.text));
    }
    body
}

pub struct ClusterAssignment {
    pub definition_index: usize,
    pub cluster_id: String,
    pub cluster_label: String,
    pub relevance_score: f32,
}

pub fn parse_cluster_response(value: &Value) -> Vec<ClusterAssignment> {
    value
        .get("assignments")
        .and_then(|v| v.as_array())
        .map(|arr| {
            arr.iter()
                .filter_map(|entry| {
                    Some(ClusterAssignment {
                        definition_index: entry.get("definition_index")?.as_u64()? as usize,
                        cluster_id: entry.get("cluster_id")?.as_str()?.to_string(),
                        cluster_label: entry.get("cluster_label")?.as_str()?.to_string(),
                        relevance_score: entry.get("relevance_score").and_then(|v| v.as_f64()).unwrap_or(0.0) as f32,
                    })
                })
                .collect()
        })
        .unwrap_or_default()
}

// --- Per-cluster synthesis ---

pub fn synthesis_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "text": { "type": "string" },
            "part_of_speech": { "type": "string" }
        },
        "required": ["text", "part_of_speech"]
    })
}

pub fn synthesis_prompt(word: &str, cluster_label: &str, definitions: &[&Definition]) -> String {
    let mut body = format!(
        "Word: {word}\nMeaning cluster: {cluster_label}\nSynthesize one coherent definition covering these raw senses:\n"
    );
    for def in definitions {
        body.push_str(&format!("- ({}) {}\n", def.part_of_speech, def.text));
    }
    body
}

pub struct SynthesizedClusterDefinition {
    pub text: String,
    pub part_of_speech: String,
}

pub fn parse_synthesis_response(value: &Value) -> Result<SynthesizedClusterDefinition> {
    Ok(SynthesizedClusterDefinition {
        text: value
            .get("text")
            .and_then(|v| v.as_str())
            .ok_or_else(|| Error::internal("missing `text` in synthesis response"))?
            .to_string(),
        part_of_speech: value
            .get("part_of_speech")
            .and_then(|v| v.as_str())
            .ok_or_else(|| Error::internal("missing `part_of_speech` in synthesis response"))?
            .to_string(),
    })
}

// --- Word-level synthesis ---

pub fn pronunciation_schema() -> Value {
    json!({
        "type": "object",
        "properties": { "phonetic": { "type": "string" }, "ipa": { "type": "string" } },
        "required": ["phonetic", "ipa"]
    })
}

pub fn pronunciation_prompt(word: &str) -> String {
    format!("Word: {word}\nGenerate a reasonable phonetic respelling and IPA transcription.")
}

pub fn parse_pronunciation_response(value: &Value) -> Result<(String, String)> {
    let phonetic = value
        .get("phonetic")
        .and_then(|v| v.as_str())
        .ok_or_else(|| Error::internal("missing `phonetic` in pronunciation response"))?;
    let ipa = value
        .get("ipa")
        .and_then(|v| v.as_str())
        .ok_or_else(|| Error::internal("missing `ipa` in pronunciation response"))?;
    Ok((phonetic.to_string(), ipa.to_string()))
}

pub fn etymology_schema() -> Value {
    json!({
        "type": "object",
        "properties": { "etymology": { "type": "string" } },
        "required": ["etymology"]
    })
}

pub fn etymology_prompt(word: &str, raw_context: &[String]) -> String {
    let mut body = format!("Word: {word}\nExtract and summarize the etymology.\n");
    if raw_context.is_empty() {
        body.push_str("No provider-supplied etymology text was available; use general knowledge.\n");
    } else {
        for snippet in raw_context {
            body.push_str(&format!("Provider note: {snippet}\n"));
        }
    }
    body
}

pub fn parse_etymology_response(value: &Value) -> Result<String> {
    value
        .get("etymology")
        .and_then(|v| v.as_str())
        .map(str::to_string)
        .ok_or_else(|| Error::internal("missing `etymology` in response"))
}

pub fn facts_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "facts": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "content": { "type": "string" },
                        "category": {
                            "type": "string",
                            "enum": ["general", "technical", "cultural", "scientific", "etymology", "usage"]
                        }
                    },
                    "required": ["content", "category"]
                }
            }
        },
        "required": ["facts"]
    })
}

pub fn facts_prompt(word: &str, primary_definition: &str) -> String {
    format!("Word: {word}\nPrimary sense: {primary_definition}\nGenerate a few interesting, true facts about this word.")
}

pub fn parse_facts_response(value: &Value) -> Vec<(String, FactCategory)> {
    value
        .get("facts")
        .and_then(|v| v.as_array())
        .map(|arr| {
            arr.iter()
                .filter_map(|entry| {
                    let content = entry.get("content")?.as_str()?.to_string();
                    let category = parse_fact_category(entry.get("category")?.as_str()?);
                    Some((content, category))
                })
                .collect()
        })
        .unwrap_or_default()
}

fn parse_fact_category(raw: &str) -> FactCategory {
    match raw {
        "technical" => FactCategory::Technical,
        "cultural" => FactCategory::Cultural,
        "scientific" => FactCategory::Scientific,
        "etymology" => FactCategory::Etymology,
        "usage" => FactCategory::Usage,
        _ => FactCategory::General,
    }
}

/// Cheap token estimate (≈4 characters/token) used as the `estimated_tokens`
/// admission figure before the substrate's rate limiter; corrected to actual
/// usage once the call completes.
pub fn estimate_tokens(prompt: &str) -> u32 {
    ((prompt.len() / 4).max(32)) as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use lexiscribe_core::WordId;

    #[test]
    fn cluster_response_parses_assignments() {
        let value = json!({
            "assignments": [
                { "definition_index": 0, "cluster_id": "c1", "cluster_label": "joy", "relevance_score": 0.9 }
            ]
        });
        let parsed = parse_cluster_response(&value);
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].cluster_id, "c1");
    }

    #[test]
    fn component_apply_sets_synonyms() {
        let mut def = Definition::new(WordId::new(), "noun", "a feeling", 1);
        let value = json!({ "values": ["happiness", "delight"] });
        apply_component_result(&mut def, Component::Synonyms, &value).unwrap();
        assert_eq!(def.synonyms.unwrap(), vec!["happiness", "delight"]);
    }

    #[test]
    fn component_apply_sets_frequency_band() {
        let mut def = Definition::new(WordId::new(), "noun", "a feeling", 1);
        let value = json!({ "band": 3 });
        apply_component_result(&mut def, Component::FrequencyBand, &value).unwrap();
        assert_eq!(def.frequency_band, Some(3));
    }
}
