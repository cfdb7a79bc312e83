//! Frame Evidence Fusion
//!
//! Collapses per-frame neural, face and frequency scores into the single
//! `frame_based` observation consumed by the video profile.
//!
//! # Algorithm
//! 1. Average each method's scores over the frames it produced a score for
//!    (face only scores frames where a face was found).
//! 2. Combine the averages with inner weights neural 0.60, face 0.25,
//!    frequency 0.15, renormalized over the methods that have any frames.
//! 3. Blend in the single most suspicious neural frame:
//!
//! ```text
//! frame_score = 0.7 × weighted_average + 0.3 × max_neural
//! ```
//!
//! One anomalous frame among many clean ones still moves the score. Without
//! neural frames the max term is omitted.
//!
//! The 0.7/0.3 split and the inner weights are calibration constants.

use crate::types::{FusionError, MethodId, Observation};
use serde::{Deserialize, Serialize};
use tracing::debug;

const NEURAL_FRAME_WEIGHT: f64 = 0.60;
const FACE_FRAME_WEIGHT: f64 = 0.25;
const FREQUENCY_FRAME_WEIGHT: f64 = 0.15;

/// Share of the weighted frame average in `frame_score`
pub const AVERAGE_SHARE: f64 = 0.7;

/// Share of the worst neural frame in `frame_score`
pub const WORST_FRAME_SHARE: f64 = 0.3;

/// Per-frame scores from the visual detectors
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FrameEvidence {
    /// Neural classifier score per frame
    pub neural: Vec<f64>,
    /// Face analysis score per frame with a detected face
    pub face: Vec<f64>,
    /// Frequency analysis score per frame
    pub frequency: Vec<f64>,
}

impl FrameEvidence {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one frame's scores; `None` where a detector produced nothing
    pub fn push_frame(&mut self, neural: Option<f64>, face: Option<f64>, frequency: Option<f64>) {
        self.neural.extend(neural);
        self.face.extend(face);
        self.frequency.extend(frequency);
    }

    /// Number of frames that produced at least one score
    pub fn frames_analyzed(&self) -> usize {
        self.neural
            .len()
            .max(self.face.len())
            .max(self.frequency.len())
    }

    pub fn is_empty(&self) -> bool {
        self.frames_analyzed() == 0
    }
}

/// Result of frame evidence fusion
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrameSummary {
    pub frames_analyzed: usize,
    pub average_neural: Option<f64>,
    pub average_face: Option<f64>,
    pub average_frequency: Option<f64>,
    /// Most suspicious neural frame
    pub max_neural: Option<f64>,
    /// Inner-weighted average of the per-method averages
    pub weighted_average: f64,
    /// Final frame-based score
    pub frame_score: f64,
}

impl FrameSummary {
    /// The `frame_based` observation for the video profile
    pub fn to_observation(&self) -> Observation {
        Observation::new(MethodId::FrameBased, self.frame_score)
    }
}

/// Fuse per-frame scores
///
/// Returns `Ok(None)` when there are no frames at all. Out-of-range scores are
/// clamped into [0, 1].
///
/// # Errors
/// `InvalidObservation` if any frame score is NaN or infinite.
pub fn summarize_frames(evidence: &FrameEvidence) -> Result<Option<FrameSummary>, FusionError> {
    if evidence.is_empty() {
        return Ok(None);
    }

    let neural = sanitize(&evidence.neural, "neural")?;
    let face = sanitize(&evidence.face, "face")?;
    let frequency = sanitize(&evidence.frequency, "frequency")?;

    let average_neural = mean(&neural);
    let average_face = mean(&face);
    let average_frequency = mean(&frequency);
    let max_neural = neural.iter().copied().reduce(f64::max);

    let weighted: Vec<(f64, f64)> = [
        (average_neural, NEURAL_FRAME_WEIGHT),
        (average_face, FACE_FRAME_WEIGHT),
        (average_frequency, FREQUENCY_FRAME_WEIGHT),
    ]
    .into_iter()
    .filter_map(|(avg, w)| avg.map(|a| (a, w)))
    .collect();

    let total_weight: f64 = weighted.iter().map(|(_, w)| w).sum();
    let weighted_average = weighted.iter().map(|(a, w)| a * w).sum::<f64>() / total_weight;

    let frame_score = match max_neural {
        Some(max) => AVERAGE_SHARE * weighted_average + WORST_FRAME_SHARE * max,
        None => weighted_average,
    }
    .clamp(0.0, 1.0);

    debug!(
        frames = evidence.frames_analyzed(),
        weighted_average,
        max_neural = ?max_neural,
        frame_score,
        "Frame evidence fused"
    );

    Ok(Some(FrameSummary {
        frames_analyzed: evidence.frames_analyzed(),
        average_neural,
        average_face,
        average_frequency,
        max_neural,
        weighted_average,
        frame_score,
    }))
}

fn sanitize(scores: &[f64], detector: &str) -> Result<Vec<f64>, FusionError> {
    scores
        .iter()
        .enumerate()
        .map(|(idx, &s)| {
            if s.is_finite() {
                Ok(s.clamp(0.0, 1.0))
            } else {
                Err(FusionError::InvalidObservation {
                    method: MethodId::FrameBased,
                    reason: format!("{} score for frame {} is not finite", detector, idx),
                })
            }
        })
        .collect()
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_worst_frame_dominance() {
        let mut evidence = FrameEvidence::new();
        for _ in 0..9 {
            evidence.push_frame(Some(0.1), None, None);
        }
        evidence.push_frame(Some(0.95), None, None);

        let summary = summarize_frames(&evidence).unwrap().unwrap();
        assert_eq!(summary.frames_analyzed, 10);
        assert!((summary.weighted_average - 0.185).abs() < 1e-12);
        assert_eq!(summary.max_neural, Some(0.95));
        // 0.7 × 0.185 + 0.3 × 0.95
        assert!((summary.frame_score - 0.4145).abs() < 1e-12);
        assert!(summary.frame_score > summary.weighted_average);
    }

    #[test]
    fn test_inner_weights_with_all_methods() {
        let evidence = FrameEvidence {
            neural: vec![0.8, 0.6],
            face: vec![0.4],
            frequency: vec![0.2, 0.2],
        };

        let summary = summarize_frames(&evidence).unwrap().unwrap();
        // 0.7 × 0.6 + 0.25 × 0.4 + 0.15 × 0.2 = 0.42 + 0.10 + 0.03
        assert!((summary.weighted_average - 0.55).abs() < 1e-12);
        assert!((summary.frame_score - (0.7 * 0.55 + 0.3 * 0.8)).abs() < 1e-12);
        assert_eq!(summary.average_face, Some(0.4));
    }

    #[test]
    fn test_missing_face_frames_renormalize() {
        let evidence = FrameEvidence {
            neural: vec![0.5],
            face: vec![],
            frequency: vec![0.5],
        };
        let summary = summarize_frames(&evidence).unwrap().unwrap();
        assert!((summary.weighted_average - 0.5).abs() < 1e-12);
        assert!(summary.average_face.is_none());
    }

    #[test]
    fn test_no_neural_frames_omits_max_term() {
        let evidence = FrameEvidence {
            neural: vec![],
            face: vec![0.9],
            frequency: vec![0.3],
        };
        let summary = summarize_frames(&evidence).unwrap().unwrap();
        let expected = (0.9 * 0.25 + 0.3 * 0.15) / 0.40;
        assert!((summary.frame_score - expected).abs() < 1e-12);
        assert!(summary.max_neural.is_none());
    }

    #[test]
    fn test_empty_evidence_yields_nothing() {
        assert_eq!(summarize_frames(&FrameEvidence::new()).unwrap(), None);
    }

    #[test]
    fn test_out_of_range_frames_clamped_and_nan_rejected() {
        let clamped = FrameEvidence {
            neural: vec![1.4, -0.2],
            ..Default::default()
        };
        let summary = summarize_frames(&clamped).unwrap().unwrap();
        assert_eq!(summary.max_neural, Some(1.0));
        assert!((summary.weighted_average - 0.5).abs() < 1e-12);

        let broken = FrameEvidence {
            frequency: vec![0.3, f64::NAN],
            ..Default::default()
        };
        assert!(matches!(
            summarize_frames(&broken),
            Err(FusionError::InvalidObservation { method: MethodId::FrameBased, .. })
        ));
    }

    #[test]
    fn test_to_observation() {
        let evidence = FrameEvidence {
            neural: vec![0.3],
            ..Default::default()
        };
        let obs = summarize_frames(&evidence).unwrap().unwrap().to_observation();
        assert_eq!(obs.method, MethodId::FrameBased);
        assert!(obs.applicable);
        assert!((obs.score - 0.3).abs() < 1e-12);
    }
}
