//! Character/edit-distance fuzzy scoring. Scores are normalized
//! similarities in `[0.0, 1.0]`, 1.0 being an exact match.

/// Normalized Jaro-Winkler similarity: a cheap, dependency-light
/// string-similarity signal driven by `strsim`'s edit-distance based
/// implementation instead of raw token overlap.
pub fn similarity(query: &str, candidate: &str) -> f32 {
    let query = query.trim().to_lowercase();
    let candidate_lower = candidate.trim().to_lowercase();

    if query.is_empty() || candidate_lower.is_empty() {
        return 0.0;
    }

    if candidate_lower == query {
        return 1.0;
    }

    let prefix_bonus = if candidate_lower.starts_with(&query) { 0.1 } else { 0.0 };
    let jw = strsim::jaro_winkler(&query, &candidate_lower) as f32;
    (jw + prefix_bonus).min(1.0)
}

/// Adaptive minimum score stepping for short queries ("Adaptive minimum
/// score"): short queries lower the floor to preserve recall, since a 2 or
/// 3 character query naturally scores lower against longer candidates.
pub fn adaptive_min_score(query: &str, base_min_score: f32) -> f32 {
    match query.trim().chars().count() {
        0..=2 => base_min_score.min(0.20),
        3..=4 => base_min_score.min(0.25),
        5..=6 => base_min_score.min(0.30),
        _ => base_min_score,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_match_scores_one() {
        assert_eq!(similarity("joy", "joy"), 1.0);
    }

    #[test]
    fn unrelated_strings_score_low() {
        assert!(similarity("joy", "xylophone") < 0.5);
    }

    #[test]
    fn prefix_match_gets_a_bonus() {
        let prefix = similarity("jo", "joyful");
        let elsewhere = similarity("ul", "joyful");
        assert!(prefix > elsewhere);
    }

    #[test]
    fn short_queries_lower_the_floor() {
        assert!(adaptive_min_score("jo", 0.5) <= 0.20);
        assert!(adaptive_min_score("joyf", 0.5) <= 0.25);
        assert!(adaptive_min_score("joyful", 0.5) <= 0.30);
        assert_eq!(adaptive_min_score("joyfully so", 0.5), 0.5);
    }
}
