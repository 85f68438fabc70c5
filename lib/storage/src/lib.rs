//! # matchmate Storage
//!
//! Users, profiles and delivered recommendations.
//!
//! - [`ProfileStore`] - async read access used by the façade
//! - [`InMemoryProfileStore`] - ordered in-memory store with JSON snapshots
//! - [`RecommendationLedger`] - saved, dismissed and expiring recommendations

pub mod ledger;
pub mod persistence;
pub mod store;

pub use ledger::{RecommendationLedger, RecommendationSource, StoredRecommendation, DEFAULT_TTL_DAYS};
pub use persistence::{read_json, write_json};
pub use store::{InMemoryProfileStore, ProfileStore, StoreSnapshot};
