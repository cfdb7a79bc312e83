//! Analysis request and outcome documents
//!
//! The JSON boundary of the fusion core. A request carries detector output
//! with method ids as plain strings, optionally the per-model neural votes and
//! the per-frame scores of a video. [`AnalysisRequest::assemble`] resolves it
//! into typed observations; [`AnalysisOutcome::analyze`] runs the whole
//! pipeline and stamps the result.

use crate::breakdown::Breakdown;
use crate::engine::{FusionEngine, FusionResult};
use crate::ensemble::{fuse_model_votes, EnsembleOutcome, ModelVote};
use crate::frames::{summarize_frames, FrameEvidence, FrameSummary};
use crate::report::CredibilityReport;
use crate::types::{Flags, FusionError, MethodId, Observation, Profile};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

fn default_applicable() -> bool {
    true
}

/// Observation as received on the wire
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObservationRecord {
    pub method: String,
    /// Required unless `applicable` is false
    #[serde(default)]
    pub score: Option<f64>,
    #[serde(default)]
    pub confidence: Option<f64>,
    #[serde(default = "default_applicable")]
    pub applicable: bool,
    #[serde(default)]
    pub flags: Flags,
}

/// One analysis request
///
/// ```json
/// {
///   "profile": "image",
///   "observations": [
///     {"method": "frequency", "score": 0.72, "flags": {"fft_anomaly": true}},
///     {"method": "face", "applicable": false}
///   ],
///   "model_votes": [{"model": "vit", "score": 0.91, "confidence": 0.88}]
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisRequest {
    pub profile: Profile,
    #[serde(default)]
    pub observations: Vec<ObservationRecord>,
    /// Per-model votes folded into the `neural` observation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_votes: Option<Vec<ModelVote>>,
    /// Per-frame scores folded into the `frame_based` observation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frames: Option<FrameEvidence>,
}

/// Request resolved into typed observations
#[derive(Debug, Clone, PartialEq)]
pub struct AssembledRequest {
    pub profile: Profile,
    pub observations: Vec<Observation>,
    pub ensemble: Option<EnsembleOutcome>,
    pub frames: Option<FrameSummary>,
}

impl AnalysisRequest {
    /// Resolve method ids and fold votes and frames into observations
    ///
    /// # Errors
    /// - `UnknownMethod` for an id outside the profile, model votes outside the
    ///   image profile, or frames outside the video profile
    /// - `DuplicateObservation` when `neural` or `frame_based` is supplied both
    ///   directly and through votes or frames
    /// - `InvalidObservation` for an applicable record without a score, or a
    ///   non-finite vote or frame score
    pub fn assemble(&self) -> Result<AssembledRequest, FusionError> {
        let profile = self.profile;

        let mut observations = self
            .observations
            .iter()
            .map(|record| -> Result<Observation, FusionError> {
                let method = MethodId::parse_for(&record.method, profile)?;
                let score = match (record.score, record.applicable) {
                    (Some(score), _) => score,
                    (None, false) => 0.0,
                    (None, true) => {
                        return Err(FusionError::InvalidObservation {
                            method,
                            reason: "missing score".to_string(),
                        })
                    }
                };
                Ok(Observation {
                    method,
                    score,
                    confidence: record.confidence,
                    applicable: record.applicable,
                    flags: record.flags.clone(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let ensemble = match &self.model_votes {
            Some(votes) => {
                let method = MethodId::parse_for(MethodId::Neural.as_str(), profile)?;
                ensure_not_supplied(&observations, method)?;
                let outcome = fuse_model_votes(votes)?;
                observations.push(outcome.to_observation());
                Some(outcome)
            }
            None => None,
        };

        let frames = match &self.frames {
            Some(evidence) => {
                let method = MethodId::parse_for(MethodId::FrameBased.as_str(), profile)?;
                ensure_not_supplied(&observations, method)?;
                let summary = summarize_frames(evidence)?;
                if let Some(summary) = &summary {
                    observations.push(summary.to_observation());
                }
                summary
            }
            None => None,
        };

        debug!(
            profile = %profile,
            observations = observations.len(),
            ensemble = ensemble.is_some(),
            frames = frames.is_some(),
            "Request assembled"
        );

        Ok(AssembledRequest {
            profile,
            observations,
            ensemble,
            frames,
        })
    }
}

fn ensure_not_supplied(observations: &[Observation], method: MethodId) -> Result<(), FusionError> {
    if observations.iter().any(|o| o.method == method) {
        return Err(FusionError::DuplicateObservation { method });
    }
    Ok(())
}

/// Stamped outcome of one analysis
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisOutcome {
    pub analysis_id: Uuid,
    pub analyzed_at: DateTime<Utc>,
    pub profile: Profile,
    pub result: FusionResult,
    pub breakdown: Breakdown,
    /// Rendered breakdown lines
    pub lines: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ensemble: Option<EnsembleOutcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frames: Option<FrameSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report: Option<CredibilityReport>,
}

impl AnalysisOutcome {
    /// Assemble, fuse and describe one request
    pub fn analyze(
        engine: &FusionEngine,
        request: &AnalysisRequest,
        with_report: bool,
    ) -> Result<Self, FusionError> {
        let assembled = request.assemble()?;
        let result = engine.fuse(&assembled.observations, assembled.profile)?;

        let mut breakdown = Breakdown::build(&result, &assembled.observations);
        if let Some(ensemble) = &assembled.ensemble {
            breakdown = breakdown.with_ensemble(ensemble);
        }
        let lines = breakdown.render_lines();

        let report = with_report.then(|| {
            CredibilityReport::generate(
                &result,
                assembled.frames.as_ref().map(|f| f.frames_analyzed),
            )
        });

        Ok(Self {
            analysis_id: Uuid::new_v4(),
            analyzed_at: Utc::now(),
            profile: assembled.profile,
            result,
            breakdown,
            lines,
            ensemble: assembled.ensemble,
            frames: assembled.frames,
            report,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(json: &str) -> AnalysisRequest {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_assemble_resolves_methods() {
        let assembled = request(
            r#"{
                "profile": "image",
                "observations": [
                    {"method": "frequency", "score": 0.72, "flags": {"fft_anomaly": true}},
                    {"method": "face", "applicable": false}
                ]
            }"#,
        )
        .assemble()
        .unwrap();

        assert_eq!(assembled.observations.len(), 2);
        assert_eq!(assembled.observations[0].method, MethodId::Frequency);
        assert!(assembled.observations[0].flag("fft_anomaly"));
        assert!(!assembled.observations[1].applicable);
    }

    #[test]
    fn test_applicable_record_without_score_rejected() {
        let err = request(r#"{"profile": "image", "observations": [{"method": "neural"}]}"#)
            .assemble()
            .unwrap_err();
        assert!(matches!(
            err,
            FusionError::InvalidObservation { method: MethodId::Neural, .. }
        ));

        let err = AnalysisOutcome::analyze(
            &FusionEngine::new(),
            &request(
                r#"{"profile": "video", "observations": [{"method": "audio", "applicable": true}]}"#,
            ),
            false,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            FusionError::InvalidObservation { method: MethodId::Audio, .. }
        ));
    }

    #[test]
    fn test_out_of_range_vote_confidence_clamped() {
        let assembled = request(
            r#"{
                "profile": "image",
                "model_votes": [
                    {"model": "vit", "score": 0.9, "confidence": 0.5},
                    {"model": "cnn", "score": 0.1, "confidence": -0.45}
                ]
            }"#,
        )
        .assemble()
        .unwrap();

        let ensemble = assembled.ensemble.unwrap();
        assert!((ensemble.score - 0.9).abs() < 1e-12);
        assert!((assembled.observations[0].score - 0.9).abs() < 1e-12);
    }

    #[test]
    fn test_unknown_method_rejected() {
        let err = request(r#"{"profile": "video", "observations": [{"method": "neural", "score": 0.4}]}"#)
            .assemble()
            .unwrap_err();
        assert_eq!(
            err,
            FusionError::UnknownMethod {
                method: "neural".to_string(),
                profile: Profile::Video,
            }
        );
    }

    #[test]
    fn test_model_votes_become_neural() {
        let assembled = request(
            r#"{
                "profile": "image",
                "model_votes": [
                    {"model": "vit", "score": 0.9, "confidence": 0.8},
                    {"model": "cnn", "score": 0.8, "confidence": 0.8}
                ]
            }"#,
        )
        .assemble()
        .unwrap();

        let neural = &assembled.observations[0];
        assert_eq!(neural.method, MethodId::Neural);
        assert!((neural.score - 0.85).abs() < 1e-12);
        assert_eq!(assembled.ensemble.unwrap().num_models, 2);
    }

    #[test]
    fn test_neural_supplied_twice_rejected() {
        let err = request(
            r#"{
                "profile": "image",
                "observations": [{"method": "neural", "score": 0.4}],
                "model_votes": [{"model": "vit", "score": 0.9, "confidence": 0.8}]
            }"#,
        )
        .assemble()
        .unwrap_err();
        assert_eq!(err, FusionError::DuplicateObservation { method: MethodId::Neural });
    }

    #[test]
    fn test_frames_only_for_video() {
        let err = request(r#"{"profile": "image", "frames": {"neural": [0.2]}}"#)
            .assemble()
            .unwrap_err();
        assert!(matches!(err, FusionError::UnknownMethod { profile: Profile::Image, .. }));

        let assembled = request(r#"{"profile": "video", "frames": {"neural": [0.1, 0.95]}}"#)
            .assemble()
            .unwrap();
        assert_eq!(assembled.observations[0].method, MethodId::FrameBased);
        assert_eq!(assembled.frames.unwrap().frames_analyzed, 2);
    }

    #[test]
    fn test_empty_frames_add_nothing() {
        let assembled = request(r#"{"profile": "video", "frames": {}}"#).assemble().unwrap();
        assert!(assembled.observations.is_empty());
        assert!(assembled.frames.is_none());
    }

    #[test]
    fn test_analyze_outcome() {
        let outcome = AnalysisOutcome::analyze(
            &FusionEngine::new(),
            &request(
                r#"{
                    "profile": "video",
                    "observations": [
                        {"method": "audio", "applicable": false},
                        {"method": "physiological", "score": 0.8,
                         "flags": {"heartbeat_detected": false}}
                    ],
                    "frames": {"neural": [0.3, 0.5]}
                }"#,
            ),
            true,
        )
        .unwrap();

        assert_eq!(outcome.profile, Profile::Video);
        assert_eq!(outcome.breakdown.entries.len(), 3);
        assert!(outcome.lines.contains(&"  - No heartbeat signal detected".to_string()));
        let report = outcome.report.unwrap();
        assert!(report.findings.contains("A total of 2 frames"));

        let json = serde_json::to_value(
            AnalysisOutcome::analyze(&FusionEngine::new(), &request(r#"{"profile": "image"}"#), false)
                .unwrap(),
        )
        .unwrap();
        assert!(json["analysis_id"].is_string());
        assert!(json.get("report").is_none());
        assert_eq!(json["result"]["final_score"], 0.5);
    }
}
