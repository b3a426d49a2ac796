//! Task tag → model tier → temperature resolution. The mapping table and
//! the reasoning-model token multiplier mirror the provider's documented
//! tiering.

use lexiscribe_core::{ModelComplexity, ModelTier, TaskTag};

/// Fixed task → complexity table. Anything not listed defaults to `Medium`.
fn complexity_for(task: TaskTag) -> ModelComplexity {
    use ModelComplexity::*;
    use TaskTag::*;
    match task {
        ClusterDefinitions => High,
        SynthesizeCluster => High,
        GenerateFacts => Medium,
        Examples => Medium,
        ExtractEtymology => Medium,
        Collocations => Medium,
        WordForms => Medium,
        Antonyms => Medium,
        FrequencyBand => Low,
        CefrLevel => Low,
        Domain => Low,
        Register => Low,
        GeneratePronunciation => Low,
        UsageNotes => Low,
        GrammarPatterns => Low,
        RegionalVariants => Low,
        Synonyms => Medium,
    }
}

fn model_for_complexity(complexity: ModelComplexity) -> ModelTier {
    match complexity {
        ModelComplexity::High => ModelTier::Reasoning,
        ModelComplexity::Medium => ModelTier::Capable,
        ModelComplexity::Low => ModelTier::Fast,
    }
}

/// The model identifier string sent on the wire for a tier. Kept separate
/// from `ModelTier` so swapping the underlying provider model doesn't touch
/// the complexity/temperature logic.
pub fn model_identifier(tier: ModelTier) -> &'static str {
    match tier {
        ModelTier::Reasoning => "o3-mini",
        ModelTier::Capable => "gpt-4o",
        ModelTier::Fast => "gpt-4o-mini",
    }
}

pub fn model_for_task(task: TaskTag, override_model: Option<&str>) -> (ModelTier, String) {
    if let Some(name) = override_model {
        let tier = tier_from_identifier(name);
        return (tier, name.to_string());
    }
    let tier = model_for_complexity(complexity_for(task));
    (tier, model_identifier(tier).to_string())
}

fn tier_from_identifier(name: &str) -> ModelTier {
    if name.starts_with("o1") || name.starts_with("o3") {
        ModelTier::Reasoning
    } else if name.contains("mini") {
        ModelTier::Fast
    } else {
        ModelTier::Capable
    }
}

/// Single-argument temperature decision, folding task and tier into one
/// function rather than letting temperature policy scatter across call
/// sites inconsistently.
pub fn temperature_for(tier: ModelTier, task: TaskTag) -> Option<f32> {
    if tier == ModelTier::Reasoning {
        return None;
    }

    const CREATIVE: &[TaskTag] = &[TaskTag::GenerateFacts, TaskTag::Examples];
    const CLASSIFICATION: &[TaskTag] = &[
        TaskTag::FrequencyBand,
        TaskTag::CefrLevel,
        TaskTag::Domain,
        TaskTag::Register,
    ];

    if CREATIVE.contains(&task) {
        Some(0.8)
    } else if CLASSIFICATION.contains(&task) {
        Some(0.3)
    } else {
        Some(0.7)
    }
}

/// Reasoning models reserve internal-thinking tokens the caller never sees
/// directly; the completion budget is multiplied up from the requested
/// token count, floored at 4000.
pub fn completion_token_budget(tier: ModelTier, requested_tokens: u32) -> u32 {
    if tier != ModelTier::Reasoning {
        return requested_tokens;
    }
    let multiplier: u32 = if requested_tokens <= 50 { 30 } else { 15 };
    std::cmp::max(4000, requested_tokens.saturating_mul(multiplier))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clustering_routes_to_reasoning_tier() {
        let (tier, _) = model_for_task(TaskTag::ClusterDefinitions, None);
        assert_eq!(tier, ModelTier::Reasoning);
        assert_eq!(temperature_for(tier, TaskTag::ClusterDefinitions), None);
    }

    #[test]
    fn facts_generation_uses_creative_temperature() {
        let (tier, _) = model_for_task(TaskTag::GenerateFacts, None);
        assert_eq!(temperature_for(tier, TaskTag::GenerateFacts), Some(0.8));
    }

    #[test]
    fn classification_tasks_use_low_temperature() {
        let (tier, _) = model_for_task(TaskTag::CefrLevel, None);
        assert_eq!(temperature_for(tier, TaskTag::CefrLevel), Some(0.3));
    }

    #[test]
    fn reasoning_budget_floors_at_4000_and_scales_small_requests_by_30() {
        assert_eq!(completion_token_budget(ModelTier::Reasoning, 40), 4000);
        assert_eq!(completion_token_budget(ModelTier::Reasoning, 1000), 15_000);
        assert_eq!(completion_token_budget(ModelTier::Fast, 1000), 1000);
    }

    #[test]
    fn explicit_override_bypasses_complexity_table() {
        let (tier, model) = model_for_task(TaskTag::Synonyms, Some("o1-mini"));
        assert_eq!(tier, ModelTier::Reasoning);
        assert_eq!(model, "o1-mini");
    }
}
