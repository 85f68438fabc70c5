//! # matchmate Schema
//!
//! Profile encoding and compatibility scoring.
//!
//! ## Overview
//!
//! Every profile is turned into a fixed-length feature vector and two
//! profiles are compared with cosine similarity.
//!
//! **How it works:**
//! 1. The [`FieldRegistry`] lists the encoded fields, their category lists
//!    and their factor groups, in vector order
//! 2. The [`FeatureEncoder`] writes each field with its encoding:
//!    normalized scalar, one-hot, multi-hot or flag
//! 3. [`compatibility`] scores two vectors in [0, 1]
//! 4. [`explain_entry`] breaks a score down per factor group
//!
//! ## Example
//!
//! ```rust
//! use matchmate_schema::{CompatibilityScorer, FeatureEncoder};
//! use matchmate_core::Profile;
//!
//! let scorer = CompatibilityScorer::new(FeatureEncoder::standard());
//! let a = Profile {
//!     gender: Some("male".into()),
//!     hobbies: vec!["reading".into(), "sports".into()],
//!     cleanliness_level: Some("very-clean".into()),
//!     ..Default::default()
//! };
//! let b = a.clone();
//! assert!((scorer.score_profiles(&a, &b) - 1.0).abs() < 1e-9);
//! ```
//!
//! Income and budget never enter the vector, so matches are not ranked by
//! wealth.

pub mod distance;
pub mod encoder;
pub mod explain;
pub mod registry;

// Re-export main types
pub use distance::{compatibility, CompatibilityScorer};
pub use encoder::{multi_hot, normalize, one_hot, FeatureEncoder, FieldSlot};
pub use explain::{explain_entry, ScoredPair, ScoringStats};
pub use registry::{Encoding, FieldRegistry, FieldSpec, FieldViolation, RegistryError};
