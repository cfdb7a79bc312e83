//! Reweighting Policy
//!
//! Turns a method's registry base weight into the effective weight used by the
//! engine. Two mechanisms:
//!
//! 1. **Redistribution**: a method that is inapplicable (or absent) and
//!    declares a `redistribute_to` target hands its whole base weight to that
//!    target, added before the target's boosts.
//! 2. **Rules**: a declarative table of `(profile, method, condition, effect)`.
//!    Every matching rule contributes independently; effects are either a
//!    multiplier or a replacement base weight.
//!
//! ```text
//! effective = (base_or_override + inherited) × Π multipliers
//! ```
//!
//! Multiplication commutes, so rule order only matters for base-weight
//! overrides (first match wins).

use crate::registry::{MethodRegistry, RegistryEntry};
use crate::types::{flag, MethodId, Observation, Profile};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::debug;

// ============================================================================
// Rule table
// ============================================================================

/// Predicate over one observation and the rest of the request
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// Own score strictly below `below` or strictly above `above`
    ExtremeScore { below: f64, above: f64 },
    /// Own verdict matches the primary's: both > `high` or both < `low`
    AgreesWithPrimary {
        primary: MethodId,
        high: f64,
        low: f64,
    },
    /// Any of `flags` set, and the primary's score strictly above `threshold`
    AnyFlagWithPrimaryAbove {
        flags: &'static [&'static str],
        primary: MethodId,
        threshold: f64,
    },
    /// Flag present and explicitly false
    FlagFalse(&'static str),
}

impl Condition {
    /// Evaluate against an applicable observation
    pub fn holds(&self, observation: &Observation, context: &PolicyContext<'_>) -> bool {
        match *self {
            Condition::ExtremeScore { below, above } => {
                observation.score < below || observation.score > above
            }
            Condition::AgreesWithPrimary { primary, high, low } => {
                match context.score_of(primary) {
                    Some(primary_score) => {
                        (primary_score > high && observation.score > high)
                            || (primary_score < low && observation.score < low)
                    }
                    None => false,
                }
            }
            Condition::AnyFlagWithPrimaryAbove {
                flags,
                primary,
                threshold,
            } => {
                flags.iter().any(|f| observation.flag(f))
                    && context.score_of(primary).is_some_and(|s| s > threshold)
            }
            Condition::FlagFalse(name) => observation.flag_value(name) == Some(false),
        }
    }
}

/// What a matching rule does to the weight
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Effect {
    /// Multiply the weight
    Multiply(f64),
    /// Replace the registry base weight for this call
    BaseWeight(f64),
}

/// One policy rule
#[derive(Debug, Clone, PartialEq)]
pub struct WeightRule {
    /// Stable identifier reported in contributions
    pub name: &'static str,
    pub profile: Profile,
    pub method: MethodId,
    pub condition: Condition,
    pub effect: Effect,
}

/// Face anomaly flags that corroborate a suspicious neural verdict
const FACE_ANOMALY_FLAGS: &[&str] = &[
    flag::SYMMETRY_ANOMALY,
    flag::EYE_ANOMALY,
    flag::TEXTURE_ANOMALY,
];

/// Metadata anomaly flags that corroborate a suspicious neural verdict
const METADATA_ANOMALY_FLAGS: &[&str] = &[flag::EXIF_SUSPICIOUS, flag::ELA_ANOMALIES];

/// Calibrated rule table
///
/// Thresholds and multipliers are calibration constants, kept exactly.
pub fn standard_rules() -> Vec<WeightRule> {
    vec![
        WeightRule {
            name: "neural_extremity",
            profile: Profile::Image,
            method: MethodId::Neural,
            condition: Condition::ExtremeScore {
                below: 0.1,
                above: 0.9,
            },
            effect: Effect::Multiply(1.5),
        },
        WeightRule {
            name: "frequency_agrees_with_neural",
            profile: Profile::Image,
            method: MethodId::Frequency,
            condition: Condition::AgreesWithPrimary {
                primary: MethodId::Neural,
                high: 0.6,
                low: 0.4,
            },
            effect: Effect::Multiply(1.3),
        },
        WeightRule {
            name: "face_anomaly_corroboration",
            profile: Profile::Image,
            method: MethodId::Face,
            condition: Condition::AnyFlagWithPrimaryAbove {
                flags: FACE_ANOMALY_FLAGS,
                primary: MethodId::Neural,
                threshold: 0.7,
            },
            effect: Effect::Multiply(1.4),
        },
        WeightRule {
            name: "metadata_anomaly_corroboration",
            profile: Profile::Image,
            method: MethodId::Metadata,
            condition: Condition::AnyFlagWithPrimaryAbove {
                flags: METADATA_ANOMALY_FLAGS,
                primary: MethodId::Neural,
                threshold: 0.7,
            },
            effect: Effect::Multiply(1.3),
        },
        WeightRule {
            name: "heartbeat_absent",
            profile: Profile::Video,
            method: MethodId::Physiological,
            condition: Condition::FlagFalse(flag::HEARTBEAT_DETECTED),
            effect: Effect::BaseWeight(0.20),
        },
    ]
}

// ============================================================================
// Evaluation
// ============================================================================

/// Applicable observations of the current request, keyed by method
///
/// Scores are already clamped into [0, 1].
#[derive(Debug, Clone, Copy)]
pub struct PolicyContext<'a> {
    applicable: &'a BTreeMap<MethodId, Observation>,
}

impl<'a> PolicyContext<'a> {
    pub fn new(applicable: &'a BTreeMap<MethodId, Observation>) -> Self {
        Self { applicable }
    }

    pub fn get(&self, method: MethodId) -> Option<&'a Observation> {
        self.applicable.get(&method)
    }

    pub fn score_of(&self, method: MethodId) -> Option<f64> {
        self.get(method).map(|o| o.score)
    }

    pub fn is_applicable(&self, method: MethodId) -> bool {
        self.applicable.contains_key(&method)
    }
}

/// Weight handed from an inapplicable method to its target
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Redistribution {
    pub from: MethodId,
    pub to: MethodId,
    pub weight: f64,
}

/// Outcome of weighting one observation
#[derive(Debug, Clone, PartialEq)]
pub struct WeightDecision {
    /// Registry base weight, or the override from a matching rule
    pub base_weight: f64,
    /// Weight inherited through redistribution
    pub inherited_weight: f64,
    /// Product of all matching multipliers
    pub multiplier: f64,
    /// `(base_weight + inherited_weight) × multiplier`
    pub effective_weight: f64,
    /// Names of the rules that matched
    pub applied_rules: Vec<&'static str>,
}

/// Reweighting policy
#[derive(Debug, Clone, PartialEq)]
pub struct WeightingPolicy {
    rules: Vec<WeightRule>,
    dynamic_weighting: bool,
    redistribute_inapplicable: bool,
}

impl Default for WeightingPolicy {
    fn default() -> Self {
        Self::standard()
    }
}

impl WeightingPolicy {
    /// Calibrated rules with both mechanisms enabled
    pub fn standard() -> Self {
        Self::with_rules(standard_rules())
    }

    /// Custom rule table with both mechanisms enabled
    pub fn with_rules(rules: Vec<WeightRule>) -> Self {
        Self {
            rules,
            dynamic_weighting: true,
            redistribute_inapplicable: true,
        }
    }

    /// Enable or disable the rule table (redistribution unaffected)
    pub fn dynamic_weighting(mut self, enabled: bool) -> Self {
        self.dynamic_weighting = enabled;
        self
    }

    /// Enable or disable redistribution of inapplicable methods' weight
    pub fn redistribute_inapplicable(mut self, enabled: bool) -> Self {
        self.redistribute_inapplicable = enabled;
        self
    }

    pub fn rules(&self) -> &[WeightRule] {
        &self.rules
    }

    /// Weight transfers for methods that have no applicable observation
    ///
    /// Transfers whose target is itself not applicable are dropped.
    pub fn redistributions(
        &self,
        registry: &MethodRegistry,
        context: &PolicyContext<'_>,
    ) -> Vec<Redistribution> {
        if !self.redistribute_inapplicable {
            return Vec::new();
        }

        registry
            .entries()
            .iter()
            .filter(|entry| !context.is_applicable(entry.method))
            .filter_map(|entry| {
                let target = entry.redistribute_to?;
                if !context.is_applicable(target) {
                    debug!(
                        from = %entry.method,
                        to = %target,
                        weight = entry.base_weight,
                        "Redistribution target not applicable, weight dropped"
                    );
                    return None;
                }
                debug!(
                    from = %entry.method,
                    to = %target,
                    weight = entry.base_weight,
                    "Redistributing weight of inapplicable method"
                );
                Some(Redistribution {
                    from: entry.method,
                    to: target,
                    weight: entry.base_weight,
                })
            })
            .collect()
    }

    /// Effective weight for one applicable observation
    pub fn evaluate(
        &self,
        profile: Profile,
        entry: &RegistryEntry,
        observation: &Observation,
        inherited_weight: f64,
        context: &PolicyContext<'_>,
    ) -> WeightDecision {
        let matching: Vec<&WeightRule> = if self.dynamic_weighting {
            self.rules
                .iter()
                .filter(|r| r.profile == profile && r.method == entry.method)
                .filter(|r| r.condition.holds(observation, context))
                .collect()
        } else {
            Vec::new()
        };

        let base_weight = matching
            .iter()
            .find_map(|r| match r.effect {
                Effect::BaseWeight(w) => Some(w),
                Effect::Multiply(_) => None,
            })
            .unwrap_or(entry.base_weight);

        let multiplier: f64 = matching
            .iter()
            .filter_map(|r| match r.effect {
                Effect::Multiply(m) => Some(m),
                Effect::BaseWeight(_) => None,
            })
            .product();

        let applied_rules: Vec<&'static str> = matching.iter().map(|r| r.name).collect();
        for rule in &applied_rules {
            debug!(method = %entry.method, rule = %rule, "Weight rule applied");
        }

        WeightDecision {
            base_weight,
            inherited_weight,
            multiplier,
            effective_weight: (base_weight + inherited_weight) * multiplier,
            applied_rules,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context_of(observations: &[Observation]) -> BTreeMap<MethodId, Observation> {
        observations
            .iter()
            .filter(|o| o.applicable)
            .map(|o| (o.method, o.clone()))
            .collect()
    }

    fn evaluate(
        profile: Profile,
        observations: &[Observation],
        method: MethodId,
    ) -> WeightDecision {
        let registry = MethodRegistry::for_profile(profile);
        let applicable = context_of(observations);
        let ctx = PolicyContext::new(&applicable);
        let observation = &applicable[&method];
        WeightingPolicy::standard().evaluate(
            profile,
            registry.lookup(method).unwrap(),
            observation,
            0.0,
            &ctx,
        )
    }

    #[test]
    fn test_neural_extremity_boost() {
        for (score, boosted) in [(0.95, true), (0.05, true), (0.9, false), (0.1, false), (0.5, false)] {
            let decision = evaluate(
                Profile::Image,
                &[Observation::new(MethodId::Neural, score)],
                MethodId::Neural,
            );
            let expected = if boosted { 0.75 } else { 0.50 };
            assert!(
                (decision.effective_weight - expected).abs() < 1e-12,
                "score {} → weight {}",
                score,
                decision.effective_weight
            );
        }
    }

    #[test]
    fn test_frequency_agreement_both_directions() {
        let high = evaluate(
            Profile::Image,
            &[
                Observation::new(MethodId::Neural, 0.8),
                Observation::new(MethodId::Frequency, 0.7),
            ],
            MethodId::Frequency,
        );
        assert!((high.effective_weight - 0.25 * 1.3).abs() < 1e-12);
        assert_eq!(high.applied_rules, vec!["frequency_agrees_with_neural"]);

        let low = evaluate(
            Profile::Image,
            &[
                Observation::new(MethodId::Neural, 0.2),
                Observation::new(MethodId::Frequency, 0.3),
            ],
            MethodId::Frequency,
        );
        assert!((low.effective_weight - 0.25 * 1.3).abs() < 1e-12);
    }

    #[test]
    fn test_frequency_disagreement_or_neutral_band() {
        for (neural, frequency) in [(0.8, 0.3), (0.2, 0.7), (0.5, 0.5), (0.8, 0.55), (0.6, 0.7)] {
            let decision = evaluate(
                Profile::Image,
                &[
                    Observation::new(MethodId::Neural, neural),
                    Observation::new(MethodId::Frequency, frequency),
                ],
                MethodId::Frequency,
            );
            assert_eq!(decision.multiplier, 1.0, "neural {} frequency {}", neural, frequency);
        }
    }

    #[test]
    fn test_agreement_requires_primary() {
        let decision = evaluate(
            Profile::Image,
            &[Observation::new(MethodId::Frequency, 0.9)],
            MethodId::Frequency,
        );
        assert_eq!(decision.multiplier, 1.0);
    }

    #[test]
    fn test_face_anomaly_needs_suspicious_neural() {
        let face = Observation::new(MethodId::Face, 0.6).with_flag(flag::EYE_ANOMALY, true);

        let corroborated = evaluate(
            Profile::Image,
            &[Observation::new(MethodId::Neural, 0.75), face.clone()],
            MethodId::Face,
        );
        assert!((corroborated.effective_weight - 0.15 * 1.4).abs() < 1e-12);

        let not_corroborated = evaluate(
            Profile::Image,
            &[Observation::new(MethodId::Neural, 0.7), face],
            MethodId::Face,
        );
        assert_eq!(not_corroborated.multiplier, 1.0);
    }

    #[test]
    fn test_metadata_anomaly_boost() {
        let decision = evaluate(
            Profile::Image,
            &[
                Observation::new(MethodId::Neural, 0.85),
                Observation::new(MethodId::Metadata, 0.4).with_flag(flag::ELA_ANOMALIES, true),
            ],
            MethodId::Metadata,
        );
        assert!((decision.effective_weight - 0.10 * 1.3).abs() < 1e-12);

        let unflagged = evaluate(
            Profile::Image,
            &[
                Observation::new(MethodId::Neural, 0.85),
                Observation::new(MethodId::Metadata, 0.4).with_flag(flag::ELA_ANOMALIES, false),
            ],
            MethodId::Metadata,
        );
        assert_eq!(unflagged.multiplier, 1.0);
    }

    #[test]
    fn test_heartbeat_absence_overrides_base() {
        let absent = evaluate(
            Profile::Video,
            &[Observation::new(MethodId::Physiological, 0.7)
                .with_flag(flag::HEARTBEAT_DETECTED, false)],
            MethodId::Physiological,
        );
        assert_eq!(absent.base_weight, 0.20);
        assert_eq!(absent.effective_weight, 0.20);

        let present = evaluate(
            Profile::Video,
            &[Observation::new(MethodId::Physiological, 0.3)
                .with_flag(flag::HEARTBEAT_DETECTED, true)],
            MethodId::Physiological,
        );
        assert_eq!(present.effective_weight, 0.10);

        let unreported = evaluate(
            Profile::Video,
            &[Observation::new(MethodId::Physiological, 0.3)],
            MethodId::Physiological,
        );
        assert_eq!(unreported.effective_weight, 0.10);
    }

    #[test]
    fn test_rules_are_profile_scoped() {
        // Metadata anomaly rule is image-only even though metadata is in both profiles
        let decision = evaluate(
            Profile::Video,
            &[Observation::new(MethodId::Metadata, 0.9).with_flag(flag::EXIF_SUSPICIOUS, true)],
            MethodId::Metadata,
        );
        assert_eq!(decision.multiplier, 1.0);
        assert_eq!(decision.effective_weight, 0.05);
    }

    #[test]
    fn test_inherited_weight_is_boosted_with_target() {
        let registry = MethodRegistry::image();
        let applicable = context_of(&[Observation::new(MethodId::Neural, 0.95)]);
        let ctx = PolicyContext::new(&applicable);
        let decision = WeightingPolicy::standard().evaluate(
            Profile::Image,
            registry.lookup(MethodId::Neural).unwrap(),
            &applicable[&MethodId::Neural],
            0.15,
            &ctx,
        );
        assert!((decision.effective_weight - (0.50 + 0.15) * 1.5).abs() < 1e-12);
    }

    #[test]
    fn test_redistributions() {
        let registry = MethodRegistry::image();
        let policy = WeightingPolicy::standard();

        let with_neural = context_of(&[
            Observation::new(MethodId::Neural, 0.6),
            Observation::inapplicable(MethodId::Face),
        ]);
        let transfers = policy.redistributions(&registry, &PolicyContext::new(&with_neural));
        assert_eq!(
            transfers,
            vec![Redistribution {
                from: MethodId::Face,
                to: MethodId::Neural,
                weight: 0.15,
            }]
        );

        let without_neural = context_of(&[Observation::new(MethodId::Frequency, 0.6)]);
        assert!(policy
            .redistributions(&registry, &PolicyContext::new(&without_neural))
            .is_empty());

        let disabled = policy.clone().redistribute_inapplicable(false);
        assert!(disabled
            .redistributions(&registry, &PolicyContext::new(&with_neural))
            .is_empty());
    }

    #[test]
    fn test_dynamic_weighting_off_ignores_rules() {
        let registry = MethodRegistry::image();
        let applicable = context_of(&[Observation::new(MethodId::Neural, 0.99)]);
        let ctx = PolicyContext::new(&applicable);
        let decision = WeightingPolicy::standard().dynamic_weighting(false).evaluate(
            Profile::Image,
            registry.lookup(MethodId::Neural).unwrap(),
            &applicable[&MethodId::Neural],
            0.0,
            &ctx,
        );
        assert_eq!(decision.effective_weight, 0.50);
        assert!(decision.applied_rules.is_empty());
    }
}
