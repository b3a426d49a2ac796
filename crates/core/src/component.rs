//! The recognized enhancement-engine component (facet) set. Requests name a
//! subset of these; unknown names are rejected with a structured validation
//! error at the server boundary rather than silently ignored.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Component {
    Synonyms,
    Antonyms,
    Examples,
    CefrLevel,
    FrequencyBand,
    Register,
    Domain,
    GrammarPatterns,
    Collocations,
    UsageNotes,
    RegionalVariants,
    WordForms,
    Pronunciation,
    Etymology,
    Facts,
}

impl Component {
    pub const ALL: [Component; 15] = [
        Component::Synonyms,
        Component::Antonyms,
        Component::Examples,
        Component::CefrLevel,
        Component::FrequencyBand,
        Component::Register,
        Component::Domain,
        Component::GrammarPatterns,
        Component::Collocations,
        Component::UsageNotes,
        Component::RegionalVariants,
        Component::WordForms,
        Component::Pronunciation,
        Component::Etymology,
        Component::Facts,
    ];

    /// The default facet set the pipeline requests after persisting a fresh
    /// entry. The remainder are computed lazily on client
    /// request.
    pub fn default_set() -> Vec<Component> {
        vec![
            Component::Synonyms,
            Component::Antonyms,
            Component::Examples,
            Component::UsageNotes,
            Component::RegionalVariants,
        ]
    }

    /// Whether this component is computed per-`Definition` (true) or once
    /// per-`Word` (false, e.g. pronunciation/etymology/facts).
    pub fn is_definition_scoped(&self) -> bool {
        !matches!(self, Component::Pronunciation | Component::Etymology | Component::Facts)
    }

    pub fn from_name(name: &str) -> Option<Component> {
        match name {
            "synonyms" => Some(Component::Synonyms),
            "antonyms" => Some(Component::Antonyms),
            "examples" => Some(Component::Examples),
            "cefr_level" => Some(Component::CefrLevel),
            "frequency_band" => Some(Component::FrequencyBand),
            "register" => Some(Component::Register),
            "domain" => Some(Component::Domain),
            "grammar_patterns" => Some(Component::GrammarPatterns),
            "collocations" => Some(Component::Collocations),
            "usage_notes" => Some(Component::UsageNotes),
            "regional_variants" => Some(Component::RegionalVariants),
            "word_forms" => Some(Component::WordForms),
            "pronunciation" => Some(Component::Pronunciation),
            "etymology" => Some(Component::Etymology),
            "facts" => Some(Component::Facts),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Component::Synonyms => "synonyms",
            Component::Antonyms => "antonyms",
            Component::Examples => "examples",
            Component::CefrLevel => "cefr_level",
            Component::FrequencyBand => "frequency_band",
            Component::Register => "register",
            Component::Domain => "domain",
            Component::GrammarPatterns => "grammar_patterns",
            Component::Collocations => "collocations",
            Component::UsageNotes => "usage_notes",
            Component::RegionalVariants => "regional_variants",
            Component::WordForms => "word_forms",
            Component::Pronunciation => "pronunciation",
            Component::Etymology => "etymology",
            Component::Facts => "facts",
        }
    }
}

/// Parses a caller-supplied component name list, rejecting unknown names
/// with a `ValidationError` naming the offending field.
pub fn parse_components(names: &[String]) -> crate::Result<Vec<Component>> {
    names
        .iter()
        .map(|name| {
            Component::from_name(name).ok_or_else(|| {
                crate::Error::validation("components", format!("unrecognized component: {name}"), "unknown_component")
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_unknown_component() {
        let err = parse_components(&["synonyms".to_string(), "bogus".to_string()]).unwrap_err();
        assert_eq!(err.label(), "validation_error");
    }

    #[test]
    fn accepts_known_components() {
        let parsed = parse_components(&["synonyms".to_string(), "etymology".to_string()]).unwrap();
        assert_eq!(parsed, vec![Component::Synonyms, Component::Etymology]);
    }
}
