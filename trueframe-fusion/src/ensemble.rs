//! Neural Model Ensemble
//!
//! Combines votes from several classifier models into the single `neural`
//! observation. Each model reports the probability that the image is fake and
//! its own confidence (the top softmax probability).
//!
//! - Inputs: finite scores and confidences are clamped into [0, 1]; NaN or
//!   infinite values are rejected
//! - Score: confidence-weighted mean of the votes; plain mean when every
//!   confidence is zero
//! - Confidence: mean of the vote confidences
//! - Agreement: label derived from the population standard deviation of the
//!   vote scores

use crate::types::{FusionError, MethodId, Observation};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, warn};

/// One model's vote
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelVote {
    /// Model name for provenance
    pub model: String,
    /// Probability of manipulation
    pub score: f64,
    /// Model's own confidence
    pub confidence: f64,
}

impl ModelVote {
    pub fn new(model: impl Into<String>, score: f64, confidence: f64) -> Self {
        Self {
            model: model.into(),
            score,
            confidence,
        }
    }
}

/// How closely the models agree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelAgreement {
    /// No model produced a vote
    NoModels,
    /// Only one vote; agreement undefined
    SingleModel,
    /// std < 0.1
    Unanimous,
    /// std < 0.2
    StrongAgreement,
    /// std < 0.3
    ModerateAgreement,
    /// std ≥ 0.3
    Disagreement,
}

impl ModelAgreement {
    /// Label from the standard deviation of the vote scores
    pub fn from_std_dev(std_dev: f64) -> Self {
        if std_dev < 0.1 {
            ModelAgreement::Unanimous
        } else if std_dev < 0.2 {
            ModelAgreement::StrongAgreement
        } else if std_dev < 0.3 {
            ModelAgreement::ModerateAgreement
        } else {
            ModelAgreement::Disagreement
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ModelAgreement::NoModels => "no models",
            ModelAgreement::SingleModel => "single model",
            ModelAgreement::Unanimous => "unanimous",
            ModelAgreement::StrongAgreement => "strong agreement",
            ModelAgreement::ModerateAgreement => "moderate agreement",
            ModelAgreement::Disagreement => "disagreement",
        }
    }
}

impl fmt::Display for ModelAgreement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Combined ensemble verdict
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnsembleOutcome {
    pub score: f64,
    pub confidence: f64,
    pub agreement: ModelAgreement,
    pub num_models: usize,
    /// Individual scores in vote order
    pub individual_scores: Vec<f64>,
    pub model_names: Vec<String>,
}

impl EnsembleOutcome {
    /// The `neural` observation; inapplicable when no model voted
    pub fn to_observation(&self) -> Observation {
        if self.num_models == 0 {
            return Observation::inapplicable(MethodId::Neural);
        }
        Observation::new(MethodId::Neural, self.score).with_confidence(self.confidence)
    }
}

/// Combine model votes
///
/// # Errors
/// `InvalidObservation` (attributed to `neural`) when a vote's score or
/// confidence is NaN or infinite
pub fn fuse_model_votes(votes: &[ModelVote]) -> Result<EnsembleOutcome, FusionError> {
    if votes.is_empty() {
        return Ok(EnsembleOutcome {
            score: 0.5,
            confidence: 0.0,
            agreement: ModelAgreement::NoModels,
            num_models: 0,
            individual_scores: vec![],
            model_names: vec![],
        });
    }

    let votes = votes.iter().map(sanitize).collect::<Result<Vec<_>, _>>()?;

    let n = votes.len() as f64;
    let total_confidence: f64 = votes.iter().map(|v| v.confidence).sum();

    let score = if total_confidence > 0.0 {
        votes.iter().map(|v| v.score * v.confidence).sum::<f64>() / total_confidence
    } else {
        votes.iter().map(|v| v.score).sum::<f64>() / n
    };

    let agreement = if votes.len() == 1 {
        ModelAgreement::SingleModel
    } else {
        let mean = votes.iter().map(|v| v.score).sum::<f64>() / n;
        let variance = votes.iter().map(|v| (v.score - mean).powi(2)).sum::<f64>() / n;
        ModelAgreement::from_std_dev(variance.sqrt())
    };

    debug!(
        num_models = votes.len(),
        score,
        agreement = %agreement,
        "Model ensemble fused"
    );

    Ok(EnsembleOutcome {
        score,
        confidence: total_confidence / n,
        agreement,
        num_models: votes.len(),
        individual_scores: votes.iter().map(|v| v.score).collect(),
        model_names: votes.into_iter().map(|v| v.model).collect(),
    })
}

fn sanitize(vote: &ModelVote) -> Result<ModelVote, FusionError> {
    let check = |value: f64, field: &str| -> Result<f64, FusionError> {
        if !value.is_finite() {
            return Err(FusionError::InvalidObservation {
                method: MethodId::Neural,
                reason: format!("{} {} from model {} is not finite", field, value, vote.model),
            });
        }
        let clamped = value.clamp(0.0, 1.0);
        if clamped != value {
            warn!(model = %vote.model, field, value, "Model vote clamped into [0, 1]");
        }
        Ok(clamped)
    };

    Ok(ModelVote {
        model: vote.model.clone(),
        score: check(vote.score, "score")?,
        confidence: check(vote.confidence, "confidence")?,
    })
}
