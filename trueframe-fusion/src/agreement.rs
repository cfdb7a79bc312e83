//! Agreement-based confidence correction
//!
//! When at least three methods contribute, low population variance of their
//! scores raises the fused confidence. Each profile has an ordered schedule of
//! tiers; the first tier whose bound the variance falls under applies.
//!
//! | Profile | variance < 0.05 | variance < 0.10 |
//! |---------|-----------------|-----------------|
//! | image   | × 1.2           | × 1.1           |
//! | video   | × 1.3           | × 1.15          |
//!
//! The boosted confidence is clamped to 1.0 by the engine.

use serde::Serialize;

/// Minimum number of contributing methods before agreement is assessed
pub const MIN_METHODS_FOR_AGREEMENT: usize = 3;

/// Agreement strength
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AgreementLevel {
    Strong,
    Moderate,
}

/// One schedule row
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AgreementTier {
    /// Exclusive upper bound on the score variance
    pub max_variance: f64,
    pub multiplier: f64,
    pub level: AgreementLevel,
}

/// Agreement assessment attached to a fusion result
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AgreementAssessment {
    /// Population variance of the contributing scores
    pub variance: f64,
    /// Matched tier, if any
    pub level: Option<AgreementLevel>,
    /// Confidence multiplier (1.0 when no tier matched)
    pub multiplier: f64,
}

/// Ordered agreement tiers for one profile
#[derive(Debug, Clone, PartialEq)]
pub struct AgreementSchedule {
    tiers: Vec<AgreementTier>,
}

impl AgreementSchedule {
    /// Static-image schedule
    pub fn image() -> Self {
        Self::new(vec![
            AgreementTier {
                max_variance: 0.05,
                multiplier: 1.2,
                level: AgreementLevel::Strong,
            },
            AgreementTier {
                max_variance: 0.10,
                multiplier: 1.1,
                level: AgreementLevel::Moderate,
            },
        ])
    }

    /// Video schedule
    pub fn video() -> Self {
        Self::new(vec![
            AgreementTier {
                max_variance: 0.05,
                multiplier: 1.3,
                level: AgreementLevel::Strong,
            },
            AgreementTier {
                max_variance: 0.10,
                multiplier: 1.15,
                level: AgreementLevel::Moderate,
            },
        ])
    }

    /// Custom schedule; tiers are sorted by bound
    pub fn new(mut tiers: Vec<AgreementTier>) -> Self {
        tiers.sort_by(|a, b| a.max_variance.total_cmp(&b.max_variance));
        Self { tiers }
    }

    pub fn tiers(&self) -> &[AgreementTier] {
        &self.tiers
    }

    /// Assess a set of contributing scores
    ///
    /// `None` when fewer than [`MIN_METHODS_FOR_AGREEMENT`] scores are given.
    pub fn assess(&self, scores: &[f64]) -> Option<AgreementAssessment> {
        if scores.len() < MIN_METHODS_FOR_AGREEMENT {
            return None;
        }

        let variance = population_variance(scores);
        let tier = self.tiers.iter().find(|t| variance < t.max_variance);

        Some(AgreementAssessment {
            variance,
            level: tier.map(|t| t.level),
            multiplier: tier.map_or(1.0, |t| t.multiplier),
        })
    }
}

/// Population variance (divides by n)
pub fn population_variance(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n
}
