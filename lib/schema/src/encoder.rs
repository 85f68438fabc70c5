//! Feature Vector Encoder
//!
//! Converts a profile into a fixed-length vector based on the field registry.
//! Every profile encoded by the same encoder has the same layout, so any two
//! vectors are directly comparable.

use crate::registry::{Encoding, FieldRegistry, RegistryError};
use ahash::AHashMap;
use matchmate_core::{FactorGroup, Profile, ProfileField, Vector};
use std::ops::Range;

/// `clamp((value - min) / (max - min), 0, 1)`
pub fn normalize(value: f64, min: f64, max: f64) -> f64 {
    if max <= min || !value.is_finite() {
        return 0.0;
    }
    ((value - min) / (max - min)).clamp(0.0, 1.0)
}

/// 1 at the matching category, all zeros for absent or unknown values
pub fn one_hot(value: Option<&str>, categories: &[String]) -> Vec<f64> {
    let mut encoded = vec![0.0; categories.len()];
    if let Some(index) = value.and_then(|v| categories.iter().position(|c| c == v)) {
        encoded[index] = 1.0;
    }
    encoded
}

/// 1 at every category present in `values`; unknown values are ignored
pub fn multi_hot<S: AsRef<str>>(values: &[S], categories: &[String]) -> Vec<f64> {
    let mut encoded = vec![0.0; categories.len()];
    for value in values {
        if let Some(index) = categories.iter().position(|c| c == value.as_ref()) {
            encoded[index] = 1.0;
        }
    }
    encoded
}

/// Position of one field inside the encoded vector
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSlot {
    pub field: ProfileField,
    pub group: FactorGroup,
    pub range: Range<usize>,
}

#[derive(Debug, Clone)]
struct SlotPlan {
    field: ProfileField,
    encoding: Encoding,
    offset: usize,
    /// sqrt(weight), so the weight enters dot products linearly
    scale: f64,
    lookup: AHashMap<String, usize>,
}

/// Profile encoder driven by a [`FieldRegistry`]
#[derive(Debug, Clone)]
pub struct FeatureEncoder {
    registry: FieldRegistry,
    plan: Vec<SlotPlan>,
    dim: usize,
}

impl FeatureEncoder {
    /// Create an encoder, validating the registry first
    pub fn new(registry: FieldRegistry) -> Result<Self, RegistryError> {
        registry.validate()?;
        Ok(Self::build(registry))
    }

    /// Encoder over [`FieldRegistry::standard`]
    pub fn standard() -> Self {
        Self::build(FieldRegistry::standard())
    }

    /// Encoder over [`FieldRegistry::extended`]
    pub fn extended() -> Self {
        Self::build(FieldRegistry::extended())
    }

    fn build(registry: FieldRegistry) -> Self {
        let mut plan = Vec::with_capacity(registry.fields.len());
        let mut offset = 0;

        for def in &registry.fields {
            let lookup = def
                .encoding
                .categories()
                .map(|categories| {
                    categories
                        .iter()
                        .enumerate()
                        .map(|(i, c)| (c.clone(), i))
                        .collect()
                })
                .unwrap_or_default();

            plan.push(SlotPlan {
                field: def.field,
                encoding: def.encoding.clone(),
                offset,
                scale: def.weight.sqrt(),
                lookup,
            });
            offset += def.encoding.width();
        }

        Self {
            registry,
            plan,
            dim: offset,
        }
    }

    /// Get the total vector dimension for this encoder
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Get a reference to the registry
    pub fn registry(&self) -> &FieldRegistry {
        &self.registry
    }

    /// Slot range of every field, in layout order
    pub fn layout(&self) -> Vec<FieldSlot> {
        self.plan
            .iter()
            .zip(&self.registry.fields)
            .map(|(slot, def)| FieldSlot {
                field: slot.field,
                group: def.group,
                range: slot.offset..slot.offset + slot.encoding.width(),
            })
            .collect()
    }

    /// Slot ranges belonging to one factor group
    pub fn group_ranges(&self, group: FactorGroup) -> Vec<Range<usize>> {
        self.layout()
            .into_iter()
            .filter(|slot| slot.group == group)
            .map(|slot| slot.range)
            .collect()
    }

    /// Convert a profile to its feature vector.
    ///
    /// Fields are written in registry order. Missing or unrecognized values
    /// leave their slots at zero.
    pub fn encode(&self, profile: &Profile) -> Vector {
        let mut components = vec![0.0; self.dim];

        for slot in &self.plan {
            let out = &mut components[slot.offset..slot.offset + slot.encoding.width()];
            match &slot.encoding {
                Encoding::Scalar { min, max } => {
                    if let Some(value) = profile.scalar(slot.field) {
                        out[0] = normalize(value, *min, *max);
                    }
                }
                Encoding::OneHot { .. } => {
                    if let Some(&i) = profile
                        .categorical(slot.field)
                        .and_then(|value| slot.lookup.get(value))
                    {
                        out[i] = 1.0;
                    }
                }
                Encoding::MultiHot { .. } => {
                    for value in profile.tags(slot.field) {
                        if let Some(&i) = slot.lookup.get(value.as_str()) {
                            out[i] = 1.0;
                        }
                    }
                }
                Encoding::Flag => {
                    if profile.flag(slot.field) == Some(true) {
                        out[0] = 1.0;
                    }
                }
            }

            if slot.scale != 1.0 {
                out.iter_mut().for_each(|x| *x *= slot.scale);
            }
        }

        Vector::new(components)
    }
}

impl Default for FeatureEncoder {
    fn default() -> Self {
        Self::standard()
    }
}
