//! # matchmate Similarity
//!
//! Local recommendation path. Used on its own, or as the fallback when the
//! AI recommendation service cannot answer.
//!
//! ```rust
//! use matchmate_core::{Profile, UserRecord};
//! use matchmate_similarity::CandidateAggregator;
//!
//! let profile = Profile {
//!     personality_type: Some("introvert".into()),
//!     form_completed: true,
//!     ..Default::default()
//! };
//! let me = UserRecord::new("1", "Ada").with_profile(profile.clone());
//! let pool = vec![UserRecord::new("2", "Bo").with_profile(profile)];
//!
//! let result = CandidateAggregator::default().recommend(&me, &pool, 5).unwrap();
//! assert_eq!(result.entries.len(), 1);
//! ```

pub mod aggregator;

pub use aggregator::{CandidateAggregator, LocalRecommendations, DEFAULT_LIMIT};
