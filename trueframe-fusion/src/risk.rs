//! Risk Classifier
//!
//! Maps a fused score onto a discrete tier using two half-open intervals:
//! `score >= high` → High, `medium <= score < high` → Medium, otherwise Low.

use crate::types::FusionError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Discrete risk tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RiskTier {
    Low,
    Medium,
    High,
}

impl RiskTier {
    /// Convert to string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskTier::Low => "Low",
            RiskTier::Medium => "Medium",
            RiskTier::High => "High",
        }
    }
}

impl fmt::Display for RiskTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classifier thresholds
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RiskThresholds {
    high: f64,
    medium: f64,
}

impl Default for RiskThresholds {
    /// High ≥ 0.65, Medium ≥ 0.40
    fn default() -> Self {
        Self {
            high: 0.65,
            medium: 0.40,
        }
    }
}

impl RiskThresholds {
    /// Validated thresholds
    ///
    /// # Errors
    /// `InvalidConfig` unless `0 <= medium <= high <= 1`.
    pub fn new(high: f64, medium: f64) -> Result<Self, FusionError> {
        let in_range = |v: f64| v.is_finite() && (0.0..=1.0).contains(&v);
        if !in_range(high) || !in_range(medium) || medium > high {
            return Err(FusionError::InvalidConfig(format!(
                "risk thresholds must satisfy 0 <= medium <= high <= 1 (high {}, medium {})",
                high, medium
            )));
        }
        Ok(Self { high, medium })
    }

    pub fn high(&self) -> f64 {
        self.high
    }

    pub fn medium(&self) -> f64 {
        self.medium
    }

    /// Classify a score
    pub fn classify(&self, score: f64) -> RiskTier {
        if score >= self.high {
            RiskTier::High
        } else if score >= self.medium {
            RiskTier::Medium
        } else {
            RiskTier::Low
        }
    }
}

/// Classify with the default thresholds
pub fn classify(score: f64) -> RiskTier {
    RiskThresholds::default().classify(score)
}
