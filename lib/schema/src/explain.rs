//! Explainability for compatibility scores
//!
//! Turns a score and the two encoded profiles into something a person can
//! read: per-group compatibility, shared traits and match reasons.

use crate::encoder::FeatureEncoder;
use matchmate_core::{match_percentage, FactorGroup, Profile, ProfileField, RecommendationEntry, Vector};
use serde::Serialize;
use std::collections::BTreeMap;

pub const HIGH_COMPATIBILITY: f64 = 0.8;
pub const EXCELLENT_COMPATIBILITY: f64 = 0.85;

pub const TRAIT_HIGH_COMPATIBILITY: &str = "high-compatibility";
pub const TRAIT_SAME_PERSONALITY: &str = "same-personality";
pub const TRAIT_SAME_SLEEP_PATTERN: &str = "same-sleep-pattern";

pub const REASON_EXCELLENT: &str = "Excellent compatibility";
pub const REASON_SAME_CLUSTER: &str = "Same lifestyle cluster";
pub const REASON_PERSONALITY: &str = "Matching personality";
pub const REASON_DEFAULT: &str = "Potential good match";

/// Requester and candidate, with their encoded vectors
#[derive(Debug, Clone, Copy)]
pub struct ScoredPair<'a> {
    pub requester: &'a Profile,
    pub candidate: &'a Profile,
    pub requester_vector: &'a Vector,
    pub candidate_vector: &'a Vector,
}

impl ScoredPair<'_> {
    fn shares(&self, field: ProfileField) -> bool {
        match (
            self.requester.categorical(field),
            self.candidate.categorical(field),
        ) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        }
    }
}

/// Cosine similarity per factor group, in percent
pub fn compatibility_factors(
    encoder: &FeatureEncoder,
    a: &Vector,
    b: &Vector,
) -> BTreeMap<FactorGroup, u8> {
    encoder
        .registry()
        .groups()
        .into_iter()
        .map(|group| {
            let ranges = encoder.group_ranges(group);
            let score = a.cosine_similarity_over(b, &ranges);
            (group, match_percentage(score))
        })
        .collect()
}

pub fn shared_traits(score: f64, same_personality: bool, same_sleep_pattern: bool) -> Vec<String> {
    let mut traits = Vec::new();
    if score > HIGH_COMPATIBILITY {
        traits.push(TRAIT_HIGH_COMPATIBILITY.to_string());
    }
    if same_personality {
        traits.push(TRAIT_SAME_PERSONALITY.to_string());
    }
    if same_sleep_pattern {
        traits.push(TRAIT_SAME_SLEEP_PATTERN.to_string());
    }
    traits
}

pub fn match_reasons(score: f64, same_cluster: bool, same_personality: bool) -> Vec<String> {
    let mut reasons = Vec::new();
    if score > EXCELLENT_COMPATIBILITY {
        reasons.push(REASON_EXCELLENT.to_string());
    }
    if same_cluster {
        reasons.push(REASON_SAME_CLUSTER.to_string());
    }
    if same_personality {
        reasons.push(REASON_PERSONALITY.to_string());
    }
    if reasons.is_empty() {
        reasons.push(REASON_DEFAULT.to_string());
    }
    reasons
}

/// Fill in factors, traits and reasons of an entry.
///
/// Without a profile pair only the score-based traits and reasons are set.
pub fn explain_entry(
    entry: &mut RecommendationEntry,
    encoder: &FeatureEncoder,
    pair: Option<&ScoredPair<'_>>,
    same_cluster: bool,
) {
    let score = entry.compatibility_score;
    let (same_personality, same_sleep) = match pair {
        Some(pair) => {
            entry.compatibility_factors =
                compatibility_factors(encoder, pair.requester_vector, pair.candidate_vector);
            (
                pair.shares(ProfileField::PersonalityType),
                pair.shares(ProfileField::SleepPattern),
            )
        }
        None => (false, false),
    };

    entry.shared_traits = shared_traits(score, same_personality, same_sleep);
    entry.match_reasons = match_reasons(score, same_cluster, same_personality);
}

/// Summary statistics for one scoring run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoringStats {
    /// Number of candidates scored
    pub candidates_count: usize,
    /// Number of results returned
    pub results_count: usize,
    /// Average score of results
    pub avg_score: f64,
    /// Score of best result
    pub best_score: f64,
    /// Strongest factor group of the best result
    pub top_factor: Option<FactorGroup>,
}

impl ScoringStats {
    /// Compute stats from results sorted best first
    pub fn compute(results: &[RecommendationEntry], candidates_count: usize) -> Self {
        if results.is_empty() {
            return Self {
                candidates_count,
                results_count: 0,
                avg_score: 0.0,
                best_score: 0.0,
                top_factor: None,
            };
        }

        let avg_score =
            results.iter().map(|r| r.compatibility_score).sum::<f64>() / results.len() as f64;
        let best_score = results[0].compatibility_score;

        // Ties resolve to the group that comes first
        let top_factor = results[0]
            .compatibility_factors
            .iter()
            .fold(None::<(FactorGroup, u8)>, |best, (group, pct)| match best {
                Some((_, best_pct)) if best_pct >= *pct => best,
                _ => Some((*group, *pct)),
            })
            .map(|(group, _)| group);

        Self {
            candidates_count,
            results_count: results.len(),
            avg_score,
            best_score,
            top_factor,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use matchmate_core::{DisplayFields, UserId};

    fn entry(id: &str, score: f64) -> RecommendationEntry {
        RecommendationEntry::new(
            DisplayFields {
                id: UserId::from(id),
                name: id.to_string(),
                ..Default::default()
            },
            score,
        )
    }

    fn profile(personality: &str, sleep: &str, hobbies: &[&str]) -> Profile {
        Profile {
            personality_type: Some(personality.into()),
            sleep_pattern: Some(sleep.into()),
            hobbies: hobbies.iter().map(|h| h.to_string()).collect(),
            form_completed: true,
            ..Default::default()
        }
    }

    #[test]
    fn test_shared_traits() {
        assert_eq!(
            shared_traits(0.9, true, true),
            vec![TRAIT_HIGH_COMPATIBILITY, TRAIT_SAME_PERSONALITY, TRAIT_SAME_SLEEP_PATTERN]
        );
        assert!(shared_traits(0.8, false, false).is_empty());
    }

    #[test]
    fn test_match_reasons() {
        assert_eq!(match_reasons(0.9, true, false), vec![REASON_EXCELLENT, REASON_SAME_CLUSTER]);
        assert_eq!(match_reasons(0.85, false, true), vec![REASON_PERSONALITY]);
        assert_eq!(match_reasons(0.2, false, false), vec![REASON_DEFAULT]);
    }

    #[test]
    fn test_explain_entry_with_profiles() {
        let encoder = FeatureEncoder::standard();
        let a = profile("introvert", "night-owl", &["reading"]);
        let b = profile("introvert", "early-bird", &["gaming"]);
        let (va, vb) = (encoder.encode(&a), encoder.encode(&b));
        let pair = ScoredPair {
            requester: &a,
            candidate: &b,
            requester_vector: &va,
            candidate_vector: &vb,
        };

        let mut e = entry("b", crate::distance::compatibility(&va, &vb));
        explain_entry(&mut e, &encoder, Some(&pair), false);

        assert_eq!(e.compatibility_factors[&FactorGroup::Personality], 100);
        assert_eq!(e.compatibility_factors[&FactorGroup::Interests], 0);
        assert_eq!(e.compatibility_factors[&FactorGroup::Lifestyle], 0);
        assert_eq!(e.shared_traits, vec![TRAIT_SAME_PERSONALITY]);
        assert_eq!(e.match_reasons, vec![REASON_PERSONALITY]);
    }

    #[test]
    fn test_factors_reported_for_every_group() {
        let encoder = FeatureEncoder::standard();
        let a = Profile {
            age: Some(30.0),
            gender: Some("female".into()),
            ..profile("ambivert", "flexible", &["music"])
        };
        let va = encoder.encode(&a);
        let factors = compatibility_factors(&encoder, &va, &va);

        let groups: Vec<FactorGroup> = factors.keys().copied().collect();
        assert_eq!(
            groups,
            vec![
                FactorGroup::Demographics,
                FactorGroup::Personality,
                FactorGroup::Lifestyle,
                FactorGroup::Interests,
                FactorGroup::Habits,
                FactorGroup::LivingStyle,
            ]
        );
        assert_eq!(factors[&FactorGroup::Demographics], 100);
        assert_eq!(factors[&FactorGroup::LivingStyle], 0);
    }

    #[test]
    fn test_explain_entry_without_profiles() {
        let encoder = FeatureEncoder::standard();
        let mut e = entry("x", 0.95);
        explain_entry(&mut e, &encoder, None, true);

        assert!(e.compatibility_factors.is_empty());
        assert_eq!(e.shared_traits, vec![TRAIT_HIGH_COMPATIBILITY]);
        assert_eq!(e.match_reasons, vec![REASON_EXCELLENT, REASON_SAME_CLUSTER]);
    }

    #[test]
    fn test_scoring_stats() {
        let mut best = entry("1", 0.95);
        best.compatibility_factors = BTreeMap::from([
            (FactorGroup::Personality, 100),
            (FactorGroup::Habits, 100),
            (FactorGroup::Interests, 40),
        ]);
        let results = vec![best, entry("2", 0.85), entry("3", 0.75)];

        let stats = ScoringStats::compute(&results, 10);

        assert_eq!(stats.candidates_count, 10);
        assert_eq!(stats.results_count, 3);
        assert_eq!(stats.best_score, 0.95);
        assert!((stats.avg_score - 0.85).abs() < 1e-9);
        assert_eq!(stats.top_factor, Some(FactorGroup::Personality));
    }

    #[test]
    fn test_empty_stats() {
        let stats = ScoringStats::compute(&[], 5);

        assert_eq!(stats.candidates_count, 5);
        assert_eq!(stats.results_count, 0);
        assert_eq!(stats.best_score, 0.0);
        assert_eq!(stats.top_factor, None);
    }
}
