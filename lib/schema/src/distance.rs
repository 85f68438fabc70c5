//! Compatibility scoring between feature vectors
//!
//! Scores are cosine similarities clamped into [0.0, 1.0], where 1.0 means
//! identical preferences. Encoded components are never negative, so the
//! clamp only removes floating-point noise.

use crate::encoder::FeatureEncoder;
use matchmate_core::{Profile, Vector};

/// Cosine similarity of two feature vectors, in [0, 1].
///
/// An all-zero vector on either side scores 0.
pub fn compatibility(a: &Vector, b: &Vector) -> f64 {
    a.cosine_similarity(b).clamp(0.0, 1.0)
}

/// Encodes profiles and scores them against each other
#[derive(Debug, Clone, Default)]
pub struct CompatibilityScorer {
    encoder: FeatureEncoder,
}

impl CompatibilityScorer {
    pub fn new(encoder: FeatureEncoder) -> Self {
        Self { encoder }
    }

    pub fn encoder(&self) -> &FeatureEncoder {
        &self.encoder
    }

    pub fn encode(&self, profile: &Profile) -> Vector {
        self.encoder.encode(profile)
    }

    /// Compatibility of two profiles
    pub fn score_profiles(&self, a: &Profile, b: &Profile) -> f64 {
        compatibility(&self.encoder.encode(a), &self.encoder.encode(b))
    }
}
