//! User records in the shape the AI service trains on

use chrono::{DateTime, Utc};
use matchmate_core::{Profile, ProfileField, UserId};
use serde::Serialize;

const GENDERS: &[&str] = &["male", "female", "non-binary", "prefer-not-to-say"];
const PERSONALITY_TYPES: &[&str] = &["introvert", "extrovert", "ambivert"];
const SLEEP_PATTERNS: &[&str] = &["early-bird", "night-owl", "flexible"];
const PET_TOLERANCES: &[&str] = &["no-pets", "cats", "dogs", "both"];
const CLEANLINESS_LEVELS: &[&str] = &["very-clean", "clean", "average", "messy"];
const SMOKING: &[&str] = &["Smoker", "Non-smoker"];

const DEFAULT_AGE: i64 = 25;

/// Body of `POST /add_model_user`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AiUserPayload {
    pub user_id: String,
    pub age: i64,
    pub gender: String,
    pub personality_type: String,
    pub sleep_pattern: String,
    pub hobbies: Vec<String>,
    pub pet_tolerance: String,
    pub has_pets: String,
    pub smoking: String,
    pub cleanliness_level: String,
    pub created_at: DateTime<Utc>,
    pub is_mock: u8,
}

impl AiUserPayload {
    /// Out-of-vocabulary values fall back to the service defaults
    pub fn from_profile(user_id: &UserId, profile: &Profile, created_at: DateTime<Utc>) -> Self {
        let age = profile
            .age
            .filter(|age| age.is_finite() && age.fract() == 0.0)
            .map_or(DEFAULT_AGE, |age| age as i64);

        Self {
            user_id: user_id.external_id(),
            age,
            gender: pick(&profile.gender, GENDERS, "prefer-not-to-say"),
            personality_type: pick(&profile.personality_type, PERSONALITY_TYPES, "ambivert"),
            sleep_pattern: pick(&profile.sleep_pattern, SLEEP_PATTERNS, "flexible"),
            hobbies: profile.hobbies.iter().map(|h| h.to_lowercase()).collect(),
            pet_tolerance: pick(&profile.pet_tolerance, PET_TOLERANCES, "no-pets"),
            has_pets: if profile.flag(ProfileField::HasPets) == Some(true) {
                "yes".to_string()
            } else {
                "no".to_string()
            },
            smoking: pick(&profile.smoking, SMOKING, "Non-smoker"),
            cleanliness_level: pick(&profile.cleanliness_level, CLEANLINESS_LEVELS, "average"),
            created_at,
            is_mock: 0,
        }
    }
}

fn pick(value: &Option<String>, allowed: &[&str], default: &str) -> String {
    match value.as_deref() {
        Some(v) if allowed.contains(&v) => v.to_string(),
        _ => default.to_string(),
    }
}
