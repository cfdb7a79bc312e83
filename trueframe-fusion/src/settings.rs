//! Fusion settings
//!
//! Converts the raw TOML schema from `trueframe-common` into validated,
//! immutable settings for the engine: per-profile registries (with base
//! weight overrides), policy switches, feature toggles and risk thresholds.

use crate::agreement::AgreementSchedule;
use crate::policy::WeightingPolicy;
use crate::registry::MethodRegistry;
use crate::risk::RiskThresholds;
use crate::types::{FusionError, MethodId, Profile};
use std::collections::{BTreeMap, BTreeSet};
use trueframe_common::config::{ProfileConfig, TomlConfig};

/// Settings for one profile
#[derive(Debug, Clone, PartialEq)]
pub struct ProfileSettings {
    pub registry: MethodRegistry,
    pub policy: WeightingPolicy,
    pub agreement: AgreementSchedule,
    /// Methods whose observations are ignored
    pub disabled: BTreeSet<MethodId>,
}

impl ProfileSettings {
    /// Compiled defaults for a profile
    pub fn defaults(profile: Profile) -> Self {
        let agreement = match profile {
            Profile::Image => AgreementSchedule::image(),
            Profile::Video => AgreementSchedule::video(),
        };
        Self {
            registry: MethodRegistry::for_profile(profile),
            policy: WeightingPolicy::standard(),
            agreement,
            disabled: BTreeSet::new(),
        }
    }

    pub fn is_enabled(&self, method: MethodId) -> bool {
        !self.disabled.contains(&method)
    }

    fn from_config(profile: Profile, config: &ProfileConfig) -> Result<Self, FusionError> {
        let defaults = Self::defaults(profile);

        let overrides = config
            .weights
            .iter()
            .map(|(name, &weight)| -> Result<(MethodId, f64), FusionError> {
                Ok((MethodId::parse_for(name, profile)?, weight))
            })
            .collect::<Result<BTreeMap<_, _>, _>>()?;

        let disabled = config
            .disabled
            .iter()
            .map(|name| MethodId::parse_for(name, profile))
            .collect::<Result<BTreeSet<_>, _>>()?;

        Ok(Self {
            registry: defaults.registry.with_weights(&overrides)?,
            policy: defaults
                .policy
                .dynamic_weighting(config.dynamic_weighting)
                .redistribute_inapplicable(config.redistribute_inapplicable),
            agreement: defaults.agreement,
            disabled,
        })
    }
}

/// Complete engine settings
#[derive(Debug, Clone, PartialEq)]
pub struct FusionSettings {
    pub image: ProfileSettings,
    pub video: ProfileSettings,
    pub thresholds: RiskThresholds,
}

impl Default for FusionSettings {
    fn default() -> Self {
        Self {
            image: ProfileSettings::defaults(Profile::Image),
            video: ProfileSettings::defaults(Profile::Video),
            thresholds: RiskThresholds::default(),
        }
    }
}

impl FusionSettings {
    /// Validate and convert a loaded config file
    ///
    /// # Errors
    /// - `UnknownMethod` for a method name outside the section's profile
    /// - `InvalidConfig` for non-positive weights or inconsistent thresholds
    pub fn from_config(config: &TomlConfig) -> Result<Self, FusionError> {
        Ok(Self {
            image: ProfileSettings::from_config(Profile::Image, &config.image)?,
            video: ProfileSettings::from_config(Profile::Video, &config.video)?,
            thresholds: RiskThresholds::new(config.risk.high, config.risk.medium)?,
        })
    }

    pub fn profile(&self, profile: Profile) -> &ProfileSettings {
        match profile {
            Profile::Image => &self.image,
            Profile::Video => &self.video,
        }
    }
}
