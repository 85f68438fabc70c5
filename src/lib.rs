//! # matchmate
//!
//! Roommate recommendations: an AI recommendation service answers first,
//! and a deterministic local scorer takes over whenever it cannot.
//!
//! ## Quick Start
//!
//! ### As a Server
//!
//! ```bash
//! matchmate --profiles ./data/profiles.json --ai-service-url http://localhost:8000
//! ```
//!
//! ### As a Library
//!
//! ```rust
//! use matchmate::prelude::*;
//!
//! let profile = Profile {
//!     personality_type: Some("introvert".into()),
//!     hobbies: vec!["reading".into()],
//!     form_completed: true,
//!     ..Default::default()
//! };
//! let me = UserRecord::new("1", "Ada").with_profile(profile.clone());
//! let pool = vec![UserRecord::new("2", "Bo").with_profile(profile)];
//!
//! let local = CandidateAggregator::new(FeatureEncoder::standard())
//!     .recommend(&me, &pool, 5)
//!     .unwrap();
//! assert_eq!(local.entries[0].match_percentage, 100);
//! ```
//!
//! ## Crate Structure
//!
//! - `matchmate-core` - Profiles, users, vectors, recommendation entries, errors
//! - `matchmate-schema` - Field registry, feature encoder, scorer, match insights
//! - `matchmate-similarity` - Local candidate aggregation
//! - `matchmate-storage` - Profile store and recommendation ledger
//! - `matchmate-api` - AI service client, façade, scheduler, REST API

// Re-export core types
pub use matchmate_core::{
    DisplayFields, Error, ExternalId, FactorGroup, Profile, ProfileField, RecommendationEntry, Result,
    Role, Source, UserId, UserRecord, Vector,
};

// Re-export scoring
pub use matchmate_schema::{CompatibilityScorer, FeatureEncoder, FieldRegistry, ScoringStats};
pub use matchmate_similarity::{CandidateAggregator, LocalRecommendations};

// Re-export storage
pub use matchmate_storage::{InMemoryProfileStore, ProfileStore, RecommendationLedger, RecommendationSource};

// Re-export API
pub use matchmate_api::{
    HttpRecommendationClient, RecommendationFacade, RecommendationResponse, RecommendationService, RestApi,
};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{
        CandidateAggregator, CompatibilityScorer, Error, FeatureEncoder, FieldRegistry, InMemoryProfileStore,
        Profile, ProfileStore, RecommendationEntry, RecommendationFacade, RecommendationResponse, Result, Source,
        UserId, UserRecord,
    };
}
