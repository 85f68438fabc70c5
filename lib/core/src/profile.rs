//! Roommate profile
//!
//! Enum-like fields are kept as raw strings: values outside a field's
//! category list are legal here and simply carry no signal when encoded.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifestyle and living preferences of one user
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Profile {
    // Personal information
    pub age: Option<f64>,
    pub gender: Option<String>,
    pub occupation: Option<String>,
    pub religion: Option<String>,

    // Lifestyle
    pub personality_type: Option<String>,
    pub daily_routine: Option<String>,
    pub sleep_pattern: Option<String>,

    // Neighborhood
    pub preferred_location_type: Option<String>,
    pub commute_tolerance_minutes: Option<f64>,

    pub hobbies: Vec<String>,

    // Financial, never encoded
    pub income_level: Option<String>,
    pub budget_range: Option<BudgetRange>,

    // Shared living
    pub cleanliness_level: Option<String>,
    pub chore_sharing_preference: Option<String>,
    pub noise_tolerance: Option<String>,
    pub guest_frequency: Option<String>,
    pub party_habits: Option<String>,

    // Pets, `has_pets` is "true" / "false"
    pub has_pets: Option<String>,
    pub pet_tolerance: Option<String>,

    // Food & kitchen
    pub cooking_frequency: Option<String>,
    pub diet_type: Option<String>,
    pub shared_groceries: Option<bool>,

    // Work & time
    pub work_hours: Option<String>,
    pub works_from_home: Option<bool>,
    pub chronotype: Option<String>,

    // Privacy & shared space
    pub privacy_level: Option<String>,
    pub shared_space_usage: Option<String>,

    pub smoking: Option<String>,
    pub bio: Option<String>,

    /// Set once the preferences form has been submitted
    pub form_completed: bool,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct BudgetRange {
    pub min: f64,
    pub max: f64,
}

impl Profile {
    /// Only completed profiles take part in matching
    #[inline]
    pub fn is_usable(&self) -> bool {
        self.form_completed
    }

    pub fn categorical(&self, field: ProfileField) -> Option<&str> {
        let value = match field {
            ProfileField::Gender => &self.gender,
            ProfileField::Religion => &self.religion,
            ProfileField::PersonalityType => &self.personality_type,
            ProfileField::SleepPattern => &self.sleep_pattern,
            ProfileField::PreferredLocationType => &self.preferred_location_type,
            ProfileField::CleanlinessLevel => &self.cleanliness_level,
            ProfileField::ChoreSharingPreference => &self.chore_sharing_preference,
            ProfileField::NoiseTolerance => &self.noise_tolerance,
            ProfileField::GuestFrequency => &self.guest_frequency,
            ProfileField::PartyHabits => &self.party_habits,
            ProfileField::PetTolerance => &self.pet_tolerance,
            ProfileField::CookingFrequency => &self.cooking_frequency,
            ProfileField::DietType => &self.diet_type,
            ProfileField::WorkHours => &self.work_hours,
            ProfileField::Chronotype => &self.chronotype,
            ProfileField::PrivacyLevel => &self.privacy_level,
            ProfileField::SharedSpaceUsage => &self.shared_space_usage,
            _ => return None,
        };
        value.as_deref()
    }

    pub fn scalar(&self, field: ProfileField) -> Option<f64> {
        match field {
            ProfileField::Age => self.age,
            ProfileField::CommuteToleranceMinutes => self.commute_tolerance_minutes,
            _ => None,
        }
    }

    pub fn tags(&self, field: ProfileField) -> &[String] {
        match field {
            ProfileField::Hobbies => &self.hobbies,
            _ => &[],
        }
    }

    /// Boolean fields, including the string-encoded `has_pets`
    pub fn flag(&self, field: ProfileField) -> Option<bool> {
        match field {
            ProfileField::HasPets => self.has_pets.as_deref().map(|v| v == "true"),
            ProfileField::SharedGroceries => self.shared_groceries,
            ProfileField::WorksFromHome => self.works_from_home,
            _ => None,
        }
    }
}

/// Profile fields that can take part in the feature vector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProfileField {
    Age,
    Gender,
    Religion,
    PersonalityType,
    SleepPattern,
    PreferredLocationType,
    CommuteToleranceMinutes,
    Hobbies,
    CleanlinessLevel,
    ChoreSharingPreference,
    NoiseTolerance,
    GuestFrequency,
    PartyHabits,
    HasPets,
    PetTolerance,
    CookingFrequency,
    DietType,
    SharedGroceries,
    WorkHours,
    WorksFromHome,
    Chronotype,
    PrivacyLevel,
    SharedSpaceUsage,
}

impl ProfileField {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProfileField::Age => "age",
            ProfileField::Gender => "gender",
            ProfileField::Religion => "religion",
            ProfileField::PersonalityType => "personality_type",
            ProfileField::SleepPattern => "sleep_pattern",
            ProfileField::PreferredLocationType => "preferred_location_type",
            ProfileField::CommuteToleranceMinutes => "commute_tolerance_minutes",
            ProfileField::Hobbies => "hobbies",
            ProfileField::CleanlinessLevel => "cleanliness_level",
            ProfileField::ChoreSharingPreference => "chore_sharing_preference",
            ProfileField::NoiseTolerance => "noise_tolerance",
            ProfileField::GuestFrequency => "guest_frequency",
            ProfileField::PartyHabits => "party_habits",
            ProfileField::HasPets => "has_pets",
            ProfileField::PetTolerance => "pet_tolerance",
            ProfileField::CookingFrequency => "cooking_frequency",
            ProfileField::DietType => "diet_type",
            ProfileField::SharedGroceries => "shared_groceries",
            ProfileField::WorkHours => "work_hours",
            ProfileField::WorksFromHome => "works_from_home",
            ProfileField::Chronotype => "chronotype",
            ProfileField::PrivacyLevel => "privacy_level",
            ProfileField::SharedSpaceUsage => "shared_space_usage",
        }
    }
}

impl fmt::Display for ProfileField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
