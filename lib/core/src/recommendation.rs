//! Recommendation output types shared by the local and the AI-backed path

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;

use crate::user::{DisplayFields, UserId};

/// Named subset of profile fields used to explain a match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FactorGroup {
    Demographics,
    Personality,
    Lifestyle,
    Interests,
    Habits,
    LivingStyle,
}

impl FactorGroup {
    pub fn as_str(&self) -> &'static str {
        match self {
            FactorGroup::Demographics => "demographics",
            FactorGroup::Personality => "personality",
            FactorGroup::Lifestyle => "lifestyle",
            FactorGroup::Interests => "interests",
            FactorGroup::Habits => "habits",
            FactorGroup::LivingStyle => "living_style",
        }
    }
}

impl fmt::Display for FactorGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which strategy produced a recommendation list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    /// External AI recommendation service
    Primary,
    /// Local cosine-similarity scorer
    Fallback,
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Source::Primary => f.write_str("primary"),
            Source::Fallback => f.write_str("fallback"),
        }
    }
}

/// One recommended roommate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendationEntry {
    pub candidate_id: UserId,
    /// Compatibility in [0, 1]
    pub compatibility_score: f64,
    pub match_percentage: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cluster_id: Option<i64>,
    pub display_fields: DisplayFields,
    /// Per-group compatibility in percent
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub compatibility_factors: BTreeMap<FactorGroup, u8>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub shared_traits: Vec<String>,
    #[serde(default)]
    pub match_reasons: Vec<String>,
    /// Fields the AI service returned that have no typed counterpart
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub upstream: Map<String, Value>,
}

impl RecommendationEntry {
    pub fn new(display_fields: DisplayFields, compatibility_score: f64) -> Self {
        let compatibility_score = compatibility_score.clamp(0.0, 1.0);
        Self {
            candidate_id: display_fields.id.clone(),
            compatibility_score,
            match_percentage: match_percentage(compatibility_score),
            cluster_id: None,
            display_fields,
            compatibility_factors: BTreeMap::new(),
            shared_traits: Vec::new(),
            match_reasons: Vec::new(),
            upstream: Map::new(),
        }
    }

    pub fn with_cluster(mut self, cluster_id: Option<i64>) -> Self {
        self.cluster_id = cluster_id;
        self
    }
}

/// Whole percent for a score in [0, 1]
pub fn match_percentage(score: f64) -> u8 {
    (score.clamp(0.0, 1.0) * 100.0).round() as u8
}
