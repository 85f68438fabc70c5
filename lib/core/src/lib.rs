//! # matchmate Core
//!
//! Core types for the matchmate roommate recommender.
//!
//! This crate provides the shared vocabulary of the workspace:
//!
//! - [`Profile`] - Lifestyle and living preferences of one user
//! - [`UserRecord`] - A user, their display fields and their profile
//! - [`Vector`] - Dense feature vector with cosine similarity
//! - [`RecommendationEntry`] - One scored candidate, from either strategy
//! - [`Error`] - The error taxonomy shared by every crate
//!
//! ## Example
//!
//! ```rust
//! use matchmate_core::{Profile, UserRecord, Vector};
//!
//! let user = UserRecord::new("42", "Ada").with_profile(Profile {
//!     form_completed: true,
//!     ..Default::default()
//! });
//! assert!(user.usable_profile().is_some());
//!
//! let a = Vector::new(vec![1.0, 0.0, 1.0]);
//! let b = Vector::new(vec![1.0, 0.0, 1.0]);
//! assert!((a.cosine_similarity(&b) - 1.0).abs() < 1e-9);
//! ```

pub mod error;
pub mod profile;
pub mod recommendation;
pub mod user;
pub mod vector;

pub use error::{Error, Result};
pub use profile::{BudgetRange, Profile, ProfileField};
pub use recommendation::{match_percentage, FactorGroup, RecommendationEntry, Source};
pub use user::{DisplayFields, ExternalId, Role, UserId, UserRecord};
pub use vector::Vector;
