//! Field registry
//!
//! The one table that says which profile fields enter the feature vector,
//! how each is encoded, its fixed category list, the factor group it
//! explains, and its weight. The order of the table is the vector layout.

use matchmate_core::{FactorGroup, Profile, ProfileField};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

pub const AGE_RANGE: (f64, f64) = (18.0, 99.0);
pub const COMMUTE_RANGE_MINUTES: (f64, f64) = (0.0, 120.0);

/// Registry of encoded profile fields, in vector order
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FieldRegistry {
    /// Registry version for future compatibility
    #[serde(default = "default_version")]
    pub version: u32,

    pub fields: Vec<FieldSpec>,
}

fn default_version() -> u32 {
    1
}

/// How one field is encoded
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FieldSpec {
    pub field: ProfileField,

    #[serde(flatten)]
    pub encoding: Encoding,

    pub group: FactorGroup,

    /// Relative importance; enters the dot product linearly
    #[serde(default = "default_weight")]
    pub weight: f64,
}

fn default_weight() -> f64 {
    1.0
}

/// Encoding of a single field
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "encoding", rename_all = "snake_case")]
pub enum Encoding {
    /// Min-max normalized number, clamped to [0, 1]
    Scalar { min: f64, max: f64 },
    /// One slot per category, at most one set
    OneHot { categories: Vec<String> },
    /// One slot per category, any number set
    MultiHot { categories: Vec<String> },
    /// Single 0/1 slot
    Flag,
}

impl Encoding {
    /// Number of vector slots this encoding occupies
    pub fn width(&self) -> usize {
        match self {
            Encoding::Scalar { .. } | Encoding::Flag => 1,
            Encoding::OneHot { categories } | Encoding::MultiHot { categories } => categories.len(),
        }
    }

    pub fn categories(&self) -> Option<&[String]> {
        match self {
            Encoding::OneHot { categories } | Encoding::MultiHot { categories } => Some(categories),
            _ => None,
        }
    }

    fn kind(&self) -> FieldKind {
        match self {
            Encoding::Scalar { .. } => FieldKind::Scalar,
            Encoding::OneHot { .. } => FieldKind::Categorical,
            Encoding::MultiHot { .. } => FieldKind::Tags,
            Encoding::Flag => FieldKind::Flag,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FieldKind {
    Scalar,
    Categorical,
    Tags,
    Flag,
}

fn kind_of(field: ProfileField) -> FieldKind {
    match field {
        ProfileField::Age | ProfileField::CommuteToleranceMinutes => FieldKind::Scalar,
        ProfileField::Hobbies => FieldKind::Tags,
        ProfileField::HasPets | ProfileField::SharedGroceries | ProfileField::WorksFromHome => {
            FieldKind::Flag
        }
        _ => FieldKind::Categorical,
    }
}

impl FieldSpec {
    pub fn scalar(field: ProfileField, range: (f64, f64), group: FactorGroup) -> Self {
        Self {
            field,
            encoding: Encoding::Scalar {
                min: range.0,
                max: range.1,
            },
            group,
            weight: 1.0,
        }
    }

    pub fn one_hot(field: ProfileField, categories: &[&str], group: FactorGroup) -> Self {
        Self {
            field,
            encoding: Encoding::OneHot {
                categories: to_owned(categories),
            },
            group,
            weight: 1.0,
        }
    }

    pub fn multi_hot(field: ProfileField, categories: &[&str], group: FactorGroup) -> Self {
        Self {
            field,
            encoding: Encoding::MultiHot {
                categories: to_owned(categories),
            },
            group,
            weight: 1.0,
        }
    }

    pub fn flag(field: ProfileField, group: FactorGroup) -> Self {
        Self {
            field,
            encoding: Encoding::Flag,
            group,
            weight: 1.0,
        }
    }
}

fn to_owned(categories: &[&str]) -> Vec<String> {
    categories.iter().map(|c| c.to_string()).collect()
}

impl FieldRegistry {
    pub fn new(fields: Vec<FieldSpec>) -> Self {
        Self { version: 1, fields }
    }

    /// Fields the roommate scorer has always encoded. Financial fields are
    /// left out so matches are not ranked by wealth.
    pub fn standard() -> Self {
        use FactorGroup::*;
        use ProfileField as F;

        Self::new(vec![
            FieldSpec::scalar(F::Age, AGE_RANGE, Demographics),
            FieldSpec::one_hot(F::Gender, &["male", "female", "other"], Demographics),
            FieldSpec::one_hot(
                F::Religion,
                &["christianity", "islam", "hinduism", "judaism", "other", "none"],
                Demographics,
            ),
            FieldSpec::one_hot(F::PersonalityType, &["introvert", "extrovert", "ambivert"], Personality),
            FieldSpec::one_hot(F::SleepPattern, &["early-bird", "night-owl", "flexible"], Lifestyle),
            FieldSpec::one_hot(F::PreferredLocationType, &["urban", "suburban", "rural"], Lifestyle),
            FieldSpec::scalar(F::CommuteToleranceMinutes, COMMUTE_RANGE_MINUTES, Lifestyle),
            FieldSpec::multi_hot(
                F::Hobbies,
                &[
                    "reading",
                    "sports",
                    "travelling",
                    "music",
                    "movies",
                    "gaming",
                    "cooking",
                    "art",
                    "board games",
                ],
                Interests,
            ),
            FieldSpec::one_hot(F::CleanlinessLevel, &["very-clean", "clean", "average", "messy"], LivingStyle),
            FieldSpec::one_hot(F::ChoreSharingPreference, &["share", "separate"], LivingStyle),
            FieldSpec::one_hot(F::NoiseTolerance, &["quiet", "average", "noisy"], Habits),
            FieldSpec::one_hot(F::GuestFrequency, &["never", "rarely", "sometimes", "often"], Habits),
            FieldSpec::one_hot(F::PartyHabits, &["never", "rarely", "sometimes", "often"], Habits),
            FieldSpec::flag(F::HasPets, Habits),
            FieldSpec::one_hot(F::PetTolerance, &["no-pets", "cats", "dogs", "both"], Habits),
        ])
    }

    /// Standard fields plus food, work and privacy preferences
    pub fn extended() -> Self {
        use FactorGroup::*;
        use ProfileField as F;

        let mut registry = Self::standard();
        registry.fields.extend([
            FieldSpec::one_hot(F::CookingFrequency, &["never", "sometimes", "often", "always"], Habits),
            FieldSpec::one_hot(
                F::DietType,
                &["vegan", "vegetarian", "omnivore", "pescatarian", "other"],
                Lifestyle,
            ),
            FieldSpec::flag(F::SharedGroceries, LivingStyle),
            FieldSpec::one_hot(F::WorkHours, &["9-5", "flexible", "shift-work", "other"], Lifestyle),
            FieldSpec::flag(F::WorksFromHome, Lifestyle),
            FieldSpec::one_hot(F::Chronotype, &["early-bird", "night-owl", "flexible"], Lifestyle),
            FieldSpec::one_hot(F::PrivacyLevel, &["high", "medium", "low"], LivingStyle),
            FieldSpec::one_hot(F::SharedSpaceUsage, &["private", "shared", "both"], LivingStyle),
        ]);
        registry
    }

    /// Check the registry is usable for encoding
    pub fn validate(&self) -> Result<(), RegistryError> {
        if self.fields.is_empty() {
            return Err(RegistryError::EmptyRegistry);
        }

        let mut seen = HashSet::new();
        for def in &self.fields {
            if !seen.insert(def.field) {
                return Err(RegistryError::DuplicateField(def.field));
            }
            if !(def.weight >= 0.0 && def.weight.is_finite()) {
                return Err(RegistryError::InvalidWeight(def.field));
            }
            if def.encoding.kind() != kind_of(def.field) {
                return Err(RegistryError::EncodingMismatch(def.field));
            }
            match &def.encoding {
                Encoding::Scalar { min, max } => {
                    if !(min < max) {
                        return Err(RegistryError::InvalidRange(def.field));
                    }
                }
                Encoding::OneHot { categories } | Encoding::MultiHot { categories } => {
                    if categories.is_empty() {
                        return Err(RegistryError::EmptyCategories(def.field));
                    }
                    let mut unique = HashSet::new();
                    for category in categories {
                        if !unique.insert(category.as_str()) {
                            return Err(RegistryError::DuplicateCategory {
                                field: def.field,
                                category: category.clone(),
                            });
                        }
                    }
                }
                Encoding::Flag => {}
            }
        }

        let weight_sum: f64 = self.fields.iter().map(|f| f.weight).sum();
        if weight_sum <= 0.0 {
            return Err(RegistryError::ZeroTotalWeight);
        }

        Ok(())
    }

    pub fn get(&self, field: ProfileField) -> Option<&FieldSpec> {
        self.fields.iter().find(|def| def.field == field)
    }

    /// Total vector width
    pub fn dim(&self) -> usize {
        self.fields.iter().map(|def| def.encoding.width()).sum()
    }

    /// Groups present in the registry, in first-appearance order
    pub fn groups(&self) -> Vec<FactorGroup> {
        let mut groups = Vec::new();
        for def in &self.fields {
            if !groups.contains(&def.group) {
                groups.push(def.group);
            }
        }
        groups
    }

    /// Copy of the registry with some weights replaced.
    ///
    /// Fields not present in the registry are ignored; negative weights are
    /// clamped to zero.
    pub fn with_weights(&self, overrides: &HashMap<ProfileField, f64>) -> FieldRegistry {
        let mut registry = self.clone();
        for def in &mut registry.fields {
            if let Some(weight) = overrides.get(&def.field) {
                def.weight = weight.max(0.0);
            }
        }
        registry
    }

    /// List categorical values that fall outside their category list
    pub fn check_profile(&self, profile: &Profile) -> Vec<FieldViolation> {
        let mut violations = Vec::new();
        for def in &self.fields {
            match &def.encoding {
                Encoding::OneHot { categories } => {
                    if let Some(value) = profile.categorical(def.field) {
                        if !categories.iter().any(|c| c == value) {
                            violations.push(FieldViolation::new(def.field, value));
                        }
                    }
                }
                Encoding::MultiHot { categories } => {
                    for value in profile.tags(def.field) {
                        if !categories.iter().any(|c| c == value) {
                            violations.push(FieldViolation::new(def.field, value));
                        }
                    }
                }
                Encoding::Scalar { .. } | Encoding::Flag => {}
            }
        }
        violations
    }
}

impl Default for FieldRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

/// A profile value outside its field's category list
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldViolation {
    pub field: ProfileField,
    pub value: String,
}

impl FieldViolation {
    fn new(field: ProfileField, value: &str) -> Self {
        Self {
            field,
            value: value.to_string(),
        }
    }
}

/// Errors that can occur during registry validation
#[derive(Debug, Clone, thiserror::Error)]
pub enum RegistryError {
    #[error("Registry cannot be empty")]
    EmptyRegistry,

    #[error("Field '{0}' appears more than once")]
    DuplicateField(ProfileField),

    #[error("Field '{0}' has a negative or non-finite weight")]
    InvalidWeight(ProfileField),

    #[error("Total weight cannot be zero")]
    ZeroTotalWeight,

    #[error("Field '{0}' has an encoding that does not fit its values")]
    EncodingMismatch(ProfileField),

    #[error("Field '{0}' needs min < max")]
    InvalidRange(ProfileField),

    #[error("Field '{0}' has no categories")]
    EmptyCategories(ProfileField),

    #[error("Field '{field}' lists category '{category}' twice")]
    DuplicateCategory {
        field: ProfileField,
        category: String,
    },
}

impl From<RegistryError> for matchmate_core::Error {
    fn from(e: RegistryError) -> Self {
        matchmate_core::Error::InvalidRegistry(e.to_string())
    }
}
