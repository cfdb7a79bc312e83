//! Method Registry
//!
//! Static table per profile mapping each method to its base weight, the
//! confidence assumed when a detector reports none, and an optional
//! redistribution target for when the method is inapplicable.
//!
//! Base weights need not sum to 1.0; the engine normalizes over whatever
//! evidence is present.

use crate::types::{FusionError, MethodId, Profile};
use std::collections::BTreeMap;

/// One registry row
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RegistryEntry {
    pub method: MethodId,
    /// Relative weight before boosts, always > 0
    pub base_weight: f64,
    /// Confidence used when the observation carries none
    pub default_confidence: f64,
    /// Method that inherits `base_weight` when this one is inapplicable
    pub redistribute_to: Option<MethodId>,
}

impl RegistryEntry {
    const fn new(method: MethodId, base_weight: f64, default_confidence: f64) -> Self {
        Self {
            method,
            base_weight,
            default_confidence,
            redistribute_to: None,
        }
    }

    const fn redistributing_to(mut self, target: MethodId) -> Self {
        self.redistribute_to = Some(target);
        self
    }
}

/// Image profile defaults
const IMAGE_ENTRIES: [RegistryEntry; 4] = [
    RegistryEntry::new(MethodId::Neural, 0.50, 0.85),
    RegistryEntry::new(MethodId::Frequency, 0.25, 0.80),
    RegistryEntry::new(MethodId::Face, 0.15, 0.70).redistributing_to(MethodId::Neural),
    RegistryEntry::new(MethodId::Metadata, 0.10, 0.60),
];

/// Video profile defaults
///
/// Physiological is listed at 0.10; the heartbeat-absence rule raises it to
/// 0.20 per call.
const VIDEO_ENTRIES: [RegistryEntry; 7] = [
    RegistryEntry::new(MethodId::Metadata, 0.05, 0.60),
    RegistryEntry::new(MethodId::FrameBased, 0.30, 0.85),
    RegistryEntry::new(MethodId::Temporal, 0.20, 0.75),
    RegistryEntry::new(MethodId::VideoModel, 0.15, 0.50),
    RegistryEntry::new(MethodId::Audio, 0.15, 0.70),
    RegistryEntry::new(MethodId::Physiological, 0.10, 0.80),
    RegistryEntry::new(MethodId::Physics, 0.10, 0.65),
];

/// Immutable method registry for one profile
#[derive(Debug, Clone, PartialEq)]
pub struct MethodRegistry {
    profile: Profile,
    entries: Vec<RegistryEntry>,
}

impl MethodRegistry {
    /// Default registry for a profile
    pub fn for_profile(profile: Profile) -> Self {
        let entries = match profile {
            Profile::Image => IMAGE_ENTRIES.to_vec(),
            Profile::Video => VIDEO_ENTRIES.to_vec(),
        };
        Self { profile, entries }
    }

    /// Default static-image registry
    pub fn image() -> Self {
        Self::for_profile(Profile::Image)
    }

    /// Default video registry
    pub fn video() -> Self {
        Self::for_profile(Profile::Video)
    }

    /// Copy of this registry with some base weights replaced
    ///
    /// # Errors
    /// - `UnknownMethod` if a method is not part of this profile
    /// - `InvalidConfig` if a weight is not finite and strictly positive
    pub fn with_weights(&self, overrides: &BTreeMap<MethodId, f64>) -> Result<Self, FusionError> {
        let mut registry = self.clone();
        for (&method, &weight) in overrides {
            if !weight.is_finite() || weight <= 0.0 {
                return Err(FusionError::InvalidConfig(format!(
                    "base weight for {} must be > 0, got {}",
                    method, weight
                )));
            }
            let entry = registry
                .entries
                .iter_mut()
                .find(|e| e.method == method)
                .ok_or_else(|| FusionError::UnknownMethod {
                    method: method.to_string(),
                    profile: self.profile,
                })?;
            entry.base_weight = weight;
        }
        Ok(registry)
    }

    pub fn profile(&self) -> Profile {
        self.profile
    }

    /// Entries in declaration order
    pub fn entries(&self) -> &[RegistryEntry] {
        &self.entries
    }

    /// Look up a method's entry
    ///
    /// # Errors
    /// `UnknownMethod` if the method is outside this profile's closed set.
    pub fn lookup(&self, method: MethodId) -> Result<&RegistryEntry, FusionError> {
        self.entries
            .iter()
            .find(|e| e.method == method)
            .ok_or_else(|| FusionError::UnknownMethod {
                method: method.to_string(),
                profile: self.profile,
            })
    }

    /// Sum of the base weights
    pub fn total_base_weight(&self) -> f64 {
        self.entries.iter().map(|e| e.base_weight).sum()
    }
}
