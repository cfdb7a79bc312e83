//! Fusion Engine
//!
//! Combines one request's observations into a single calibrated result.
//!
//! # Algorithm
//! 1. Validate: every method must belong to the profile, at most one
//!    observation per method, scores and confidences finite. Out-of-range
//!    finite values are clamped and marked.
//! 2. Drop observations of disabled methods, then keep the applicable ones.
//! 3. Weight each applicable observation through the
//!    [`WeightingPolicy`](crate::policy::WeightingPolicy)
//!    (redistribution first, then rules).
//! 4. `W = Σ effective_weight`. `W = 0` yields the no-evidence result
//!    (score 0.5, confidence 0.0).
//! 5. `final_score = Σ(w·s) / W`, base confidence likewise.
//! 6. Agreement correction on the contributing scores, confidence clamped
//!    to 1.0.
//! 7. Risk tier from the final score.
//!
//! The engine is a pure function of its inputs and settings: no I/O, no
//! interior mutability, safe to share across threads.

use crate::agreement::AgreementAssessment;
use crate::policy::{PolicyContext, Redistribution};
use crate::risk::{RiskThresholds, RiskTier};
use crate::settings::FusionSettings;
use crate::types::{FusionError, MethodId, Observation, Profile};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Fused score reported when no evidence is usable
pub const NO_EVIDENCE_SCORE: f64 = 0.5;

// ============================================================================
// Result types
// ============================================================================

/// Where a contribution's confidence came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfidenceSource {
    /// Supplied by the detector
    Reported,
    /// Registry default for the method
    RegistryDefault,
}

/// One method's part in a fusion result
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Contribution {
    pub method: MethodId,
    /// Score used for fusion, in [0, 1]
    pub score: f64,
    /// Score as supplied
    pub raw_score: f64,
    /// Confidence used for fusion, in [0, 1]
    pub confidence: f64,
    pub confidence_source: ConfidenceSource,
    /// True when score or confidence had to be clamped into [0, 1]
    pub clamped: bool,
    /// Registry base weight, or a rule's replacement
    pub base_weight: f64,
    /// Weight inherited from inapplicable methods
    pub inherited_weight: f64,
    /// Product of the matched rule multipliers
    pub multiplier: f64,
    /// Post-boost, pre-normalization weight
    pub effective_weight: f64,
    /// `effective_weight / W`
    pub normalized_weight: f64,
    pub applied_rules: Vec<&'static str>,
}

/// Outcome of one fusion call
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FusionResult {
    pub profile: Profile,
    /// Probability of manipulation, in [0, 1]
    pub final_score: f64,
    /// Confidence after agreement correction, in [0, 1]
    pub confidence: f64,
    /// Weighted confidence before agreement correction
    pub base_confidence: f64,
    pub risk_tier: RiskTier,
    /// Contributing methods only
    pub contributions: BTreeMap<MethodId, Contribution>,
    pub redistributions: Vec<Redistribution>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agreement: Option<AgreementAssessment>,
    /// Supplied methods ignored because they are disabled
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub disabled: Vec<MethodId>,
}

impl FusionResult {
    fn no_evidence(profile: Profile, thresholds: &RiskThresholds, disabled: Vec<MethodId>) -> Self {
        Self {
            profile,
            final_score: NO_EVIDENCE_SCORE,
            confidence: 0.0,
            base_confidence: 0.0,
            risk_tier: thresholds.classify(NO_EVIDENCE_SCORE),
            contributions: BTreeMap::new(),
            redistributions: Vec::new(),
            agreement: None,
            disabled,
        }
    }

    /// True when nothing contributed
    pub fn is_no_evidence(&self) -> bool {
        self.contributions.is_empty()
    }

    pub fn contribution(&self, method: MethodId) -> Option<&Contribution> {
        self.contributions.get(&method)
    }

    /// `W`, the normalization denominator
    pub fn total_effective_weight(&self) -> f64 {
        self.contributions.values().map(|c| c.effective_weight).sum()
    }
}

// ============================================================================
// Engine
// ============================================================================

/// Validated observation with its pre-clamp score
#[derive(Debug)]
struct Sanitized {
    observation: Observation,
    raw_score: f64,
    clamped: bool,
}

/// Stateless fusion engine over immutable settings
#[derive(Debug, Clone, Default)]
pub struct FusionEngine {
    settings: FusionSettings,
}

impl FusionEngine {
    /// Engine with compiled defaults
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_settings(settings: FusionSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &FusionSettings {
        &self.settings
    }

    pub fn thresholds(&self) -> &RiskThresholds {
        &self.settings.thresholds
    }

    /// Fuse one request's observations under `profile`
    ///
    /// # Errors
    /// - `UnknownMethod` if an observation's method is outside the profile
    /// - `DuplicateObservation` if a method is observed twice
    /// - `InvalidObservation` if an applicable observation has a NaN or
    ///   infinite score or confidence
    pub fn fuse(
        &self,
        observations: &[Observation],
        profile: Profile,
    ) -> Result<FusionResult, FusionError> {
        let settings = self.settings.profile(profile);
        let registry = &settings.registry;

        let mut supplied: BTreeMap<MethodId, Sanitized> = BTreeMap::new();
        for observation in observations {
            registry.lookup(observation.method)?;
            let sanitized = sanitize(observation)?;
            if supplied.insert(observation.method, sanitized).is_some() {
                return Err(FusionError::DuplicateObservation {
                    method: observation.method,
                });
            }
        }

        let disabled: Vec<MethodId> = supplied
            .keys()
            .copied()
            .filter(|&m| !settings.is_enabled(m))
            .collect();
        for method in &disabled {
            debug!(method = %method, "Ignoring observation of disabled method");
        }

        let applicable: BTreeMap<MethodId, Observation> = supplied
            .iter()
            .filter(|&(&m, s)| settings.is_enabled(m) && s.observation.applicable)
            .map(|(&m, s)| (m, s.observation.clone()))
            .collect();

        let context = PolicyContext::new(&applicable);
        let redistributions = settings.policy.redistributions(registry, &context);

        let mut contributions = BTreeMap::new();
        for entry in registry.entries() {
            let (Some(observation), Some(sanitized)) =
                (applicable.get(&entry.method), supplied.get(&entry.method))
            else {
                continue;
            };

            let inherited: f64 = redistributions
                .iter()
                .filter(|r| r.to == entry.method)
                .map(|r| r.weight)
                .sum();
            let decision = settings
                .policy
                .evaluate(profile, entry, observation, inherited, &context);

            let (confidence, confidence_source) = match observation.confidence {
                Some(c) => (c, ConfidenceSource::Reported),
                None => (entry.default_confidence, ConfidenceSource::RegistryDefault),
            };

            contributions.insert(
                entry.method,
                Contribution {
                    method: entry.method,
                    score: observation.score,
                    raw_score: sanitized.raw_score,
                    confidence,
                    confidence_source,
                    clamped: sanitized.clamped,
                    base_weight: decision.base_weight,
                    inherited_weight: decision.inherited_weight,
                    multiplier: decision.multiplier,
                    effective_weight: decision.effective_weight,
                    normalized_weight: 0.0,
                    applied_rules: decision.applied_rules,
                },
            );
        }

        let total_weight: f64 = contributions.values().map(|c| c.effective_weight).sum();
        if contributions.is_empty() || total_weight <= 0.0 {
            debug!(profile = %profile, "No usable evidence, returning neutral result");
            return Ok(FusionResult::no_evidence(
                profile,
                &self.settings.thresholds,
                disabled,
            ));
        }

        for contribution in contributions.values_mut() {
            contribution.normalized_weight = contribution.effective_weight / total_weight;
        }

        let final_score = (contributions
            .values()
            .map(|c| c.effective_weight * c.score)
            .sum::<f64>()
            / total_weight)
            .clamp(0.0, 1.0);

        let base_confidence = (contributions
            .values()
            .map(|c| c.effective_weight * c.confidence)
            .sum::<f64>()
            / total_weight)
            .clamp(0.0, 1.0);

        let scores: Vec<f64> = contributions.values().map(|c| c.score).collect();
        let agreement = settings.agreement.assess(&scores);
        let confidence = match &agreement {
            Some(a) => (base_confidence * a.multiplier).min(1.0),
            None => base_confidence,
        };

        let risk_tier = self.settings.thresholds.classify(final_score);

        debug!(
            profile = %profile,
            methods = contributions.len(),
            total_weight,
            final_score,
            confidence,
            risk_tier = %risk_tier,
            "Fusion complete"
        );

        Ok(FusionResult {
            profile,
            final_score,
            confidence,
            base_confidence,
            risk_tier,
            contributions,
            redistributions,
            agreement,
            disabled,
        })
    }
}

/// Validate and clamp one observation
///
/// Inapplicable observations are passed through; their values are never read.
fn sanitize(observation: &Observation) -> Result<Sanitized, FusionError> {
    let raw_score = observation.score;
    if !observation.applicable {
        return Ok(Sanitized {
            observation: observation.clone(),
            raw_score,
            clamped: false,
        });
    }

    if !raw_score.is_finite() {
        return Err(FusionError::InvalidObservation {
            method: observation.method,
            reason: format!("score {} is not finite", raw_score),
        });
    }
    if let Some(confidence) = observation.confidence {
        if !confidence.is_finite() {
            return Err(FusionError::InvalidObservation {
                method: observation.method,
                reason: format!("confidence {} is not finite", confidence),
            });
        }
    }

    let mut clean = observation.clone();
    clean.score = raw_score.clamp(0.0, 1.0);
    clean.confidence = observation.confidence.map(|c| c.clamp(0.0, 1.0));

    let clamped = clean.score != raw_score || clean.confidence != observation.confidence;
    if clamped {
        warn!(
            method = %observation.method,
            score = raw_score,
            confidence = ?observation.confidence,
            "Observation out of range, clamped into [0, 1]"
        );
    }

    Ok(Sanitized {
        observation: clean,
        raw_score,
        clamped,
    })
}
