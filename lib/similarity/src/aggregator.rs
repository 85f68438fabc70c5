//! Candidate Aggregator
//!
//! Local recommendation path: scores every eligible candidate against the
//! requester, ranks them and keeps the top N with explanations.

use matchmate_core::{Error, Profile, RecommendationEntry, Result, UserRecord, Vector};
use matchmate_schema::{explain_entry, CompatibilityScorer, FeatureEncoder, ScoredPair, ScoringStats};
use ordered_float::OrderedFloat;
use rayon::prelude::*;
use serde::Serialize;
use tracing::debug;

/// Result count when the caller does not ask for one
pub const DEFAULT_LIMIT: usize = 5;

/// Ranked entries of one local scoring run
#[derive(Debug, Clone, Serialize)]
pub struct LocalRecommendations {
    pub entries: Vec<RecommendationEntry>,
    pub stats: ScoringStats,
}

struct Scored<'a> {
    score: OrderedFloat<f64>,
    candidate: &'a UserRecord,
    profile: &'a Profile,
    vector: Vector,
}

/// Scores and ranks a candidate pool for one requester
#[derive(Debug, Clone, Default)]
pub struct CandidateAggregator {
    scorer: CompatibilityScorer,
}

impl CandidateAggregator {
    /// Create a new aggregator with the given encoder
    pub fn new(encoder: FeatureEncoder) -> Self {
        Self {
            scorer: CompatibilityScorer::new(encoder),
        }
    }

    pub fn encoder(&self) -> &FeatureEncoder {
        self.scorer.encoder()
    }

    /// Rank `pool` for `requester`, best match first.
    ///
    /// The requester, non-candidate accounts and users without a completed
    /// profile are skipped. Equal scores are ordered by candidate id.
    ///
    /// # Errors
    /// [`Error::PreferencesNotSet`] when the requester has no completed
    /// profile.
    pub fn recommend(
        &self,
        requester: &UserRecord,
        pool: &[UserRecord],
        limit: usize,
    ) -> Result<LocalRecommendations> {
        let requester_profile = requester
            .usable_profile()
            .ok_or_else(|| Error::PreferencesNotSet(requester.id.clone()))?;
        let requester_vector = self.scorer.encode(requester_profile);

        let eligible: Vec<(&UserRecord, &Profile)> = pool
            .iter()
            .filter(|c| c.id != requester.id && c.is_candidate())
            .filter_map(|c| c.usable_profile().map(|p| (c, p)))
            .collect();

        let mut scored: Vec<Scored<'_>> = eligible
            .par_iter()
            .map(|&(candidate, profile)| {
                let vector = self.scorer.encode(profile);
                let score = matchmate_schema::compatibility(&requester_vector, &vector);
                Scored {
                    score: OrderedFloat(score),
                    candidate,
                    profile,
                    vector,
                }
            })
            .collect();

        // Sort by score descending
        scored.sort_by(|a, b| {
            b.score
                .cmp(&a.score)
                .then_with(|| a.candidate.id.cmp(&b.candidate.id))
        });
        scored.truncate(limit);

        let entries: Vec<RecommendationEntry> = scored
            .into_iter()
            .map(|s| {
                let mut entry = RecommendationEntry::new(s.candidate.display_fields(), s.score.0);
                let pair = ScoredPair {
                    requester: requester_profile,
                    candidate: s.profile,
                    requester_vector: &requester_vector,
                    candidate_vector: &s.vector,
                };
                explain_entry(&mut entry, self.encoder(), Some(&pair), false);
                entry
            })
            .collect();

        let stats = ScoringStats::compute(&entries, eligible.len());
        debug!(
            user_id = %requester.id,
            pool = pool.len(),
            eligible = eligible.len(),
            returned = entries.len(),
            best_score = stats.best_score,
            "local candidates ranked"
        );

        Ok(LocalRecommendations { entries, stats })
    }
}
