//! Core Types for Evidence Fusion
//!
//! Defines the data contracts between external detectors and the fusion core:
//! - [`MethodId`]: closed set of detection methods
//! - [`Profile`]: which fusion profile (image or video) is active
//! - [`Observation`]: one detector's output for one request
//! - [`FusionError`]: error taxonomy of the fusion core
//!
//! Observations are created fresh per request by the detectors and are never
//! mutated by the core.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

// ============================================================================
// Method identifiers
// ============================================================================

/// Detection method identifier
///
/// The union of both profiles' method sets. Which subset is valid depends on
/// the active [`Profile`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MethodId {
    /// Neural classifier (image)
    Neural,
    /// Frequency-domain (FFT/DCT) analysis (image)
    Frequency,
    /// Facial geometry, texture and lighting analysis (image)
    Face,
    /// EXIF/ELA metadata forensics (image and video)
    Metadata,
    /// Nested per-frame visual fusion (video)
    FrameBased,
    /// Temporal consistency across frames (video)
    Temporal,
    /// 3D video classifier (video)
    VideoModel,
    /// Voice and lip-sync analysis (video)
    Audio,
    /// Heartbeat and blink signals (video)
    Physiological,
    /// Lighting and physics consistency (video)
    Physics,
}

impl MethodId {
    /// Every method id, in declaration order
    pub const ALL: [MethodId; 10] = [
        MethodId::Neural,
        MethodId::Frequency,
        MethodId::Face,
        MethodId::Metadata,
        MethodId::FrameBased,
        MethodId::Temporal,
        MethodId::VideoModel,
        MethodId::Audio,
        MethodId::Physiological,
        MethodId::Physics,
    ];

    /// Wire identifier (matches the serde representation)
    pub fn as_str(self) -> &'static str {
        match self {
            MethodId::Neural => "neural",
            MethodId::Frequency => "frequency",
            MethodId::Face => "face",
            MethodId::Metadata => "metadata",
            MethodId::FrameBased => "frame_based",
            MethodId::Temporal => "temporal",
            MethodId::VideoModel => "video_model",
            MethodId::Audio => "audio",
            MethodId::Physiological => "physiological",
            MethodId::Physics => "physics",
        }
    }

    /// Human-readable label used in breakdown lines
    pub fn display_name(self) -> &'static str {
        match self {
            MethodId::Neural => "Neural Network Analysis",
            MethodId::Frequency => "Frequency Analysis",
            MethodId::Face => "Facial Analysis",
            MethodId::Metadata => "Metadata Forensics",
            MethodId::FrameBased => "Frame-Based Analysis",
            MethodId::Temporal => "Temporal Consistency",
            MethodId::VideoModel => "3D Video Model",
            MethodId::Audio => "Audio Analysis",
            MethodId::Physiological => "Physiological Signals",
            MethodId::Physics => "Physics Consistency",
        }
    }

    /// Resolve a wire identifier within a profile
    ///
    /// # Errors
    /// `FusionError::UnknownMethod` if the id is unknown or not part of `profile`.
    pub fn parse_for(id: &str, profile: Profile) -> Result<MethodId, FusionError> {
        match id.parse::<MethodId>() {
            Ok(method) if profile.methods().contains(&method) => Ok(method),
            _ => Err(FusionError::UnknownMethod {
                method: id.to_string(),
                profile,
            }),
        }
    }
}

impl fmt::Display for MethodId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parse error for an id outside the closed method set
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unrecognized method id: {0}")]
pub struct ParseMethodError(pub String);

impl FromStr for MethodId {
    type Err = ParseMethodError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MethodId::ALL
            .iter()
            .copied()
            .find(|m| m.as_str() == s)
            .ok_or_else(|| ParseMethodError(s.to_string()))
    }
}

// ============================================================================
// Profiles
// ============================================================================

/// Fusion profile selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Profile {
    /// Static image: neural, frequency, face, metadata
    Image,
    /// Video: metadata plus the layered visual, audio, physiological and physics methods
    Video,
}

impl Profile {
    /// Closed method set of this profile, in registry order
    pub fn methods(self) -> &'static [MethodId] {
        match self {
            Profile::Image => &[
                MethodId::Neural,
                MethodId::Frequency,
                MethodId::Face,
                MethodId::Metadata,
            ],
            Profile::Video => &[
                MethodId::Metadata,
                MethodId::FrameBased,
                MethodId::Temporal,
                MethodId::VideoModel,
                MethodId::Audio,
                MethodId::Physiological,
                MethodId::Physics,
            ],
        }
    }

    /// Media type noun used in reports
    pub fn media_type(self) -> &'static str {
        match self {
            Profile::Image => "image",
            Profile::Video => "video",
        }
    }
}

impl fmt::Display for Profile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.media_type())
    }
}

impl FromStr for Profile {
    type Err = FusionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "image" => Ok(Profile::Image),
            "video" => Ok(Profile::Video),
            other => Err(FusionError::InvalidConfig(format!(
                "unknown profile '{}', expected 'image' or 'video'",
                other
            ))),
        }
    }
}

// ============================================================================
// Observations
// ============================================================================

/// Well-known flag names read by the weighting policy and breakdown builder
pub mod flag {
    /// Face: left/right asymmetry beyond natural range
    pub const SYMMETRY_ANOMALY: &str = "symmetry_anomaly";
    /// Face: eye region quality issues
    pub const EYE_ANOMALY: &str = "eye_anomaly";
    /// Face: unnatural skin texture
    pub const TEXTURE_ANOMALY: &str = "texture_anomaly";
    /// Metadata: EXIF contents look edited or synthetic
    pub const EXIF_SUSPICIOUS: &str = "exif_suspicious";
    /// Metadata: error-level analysis found inconsistent compression
    pub const ELA_ANOMALIES: &str = "ela_anomalies";
    /// Metadata: any EXIF block was found
    pub const EXIF_PRESENT: &str = "exif_present";
    /// Frequency: FFT spectrum anomaly
    pub const FFT_ANOMALY: &str = "fft_anomaly";
    /// Frequency: DCT coefficient anomaly
    pub const DCT_ANOMALY: &str = "dct_anomaly";
    /// Frequency: high-frequency noise anomaly
    pub const HIGH_FREQ_ANOMALY: &str = "high_freq_anomaly";
    /// Physiological: a pulse signal was recovered
    pub const HEARTBEAT_DETECTED: &str = "heartbeat_detected";
    /// Physiological: blink cadence looks natural
    pub const BLINK_PATTERN_NATURAL: &str = "blink_pattern_natural";
    /// Physics: lighting direction consistent across frames
    pub const LIGHTING_CONSISTENT: &str = "lighting_consistent";
    /// Temporal: identity shifted between frames
    pub const IDENTITY_SHIFT: &str = "identity_shift";
    /// Audio: lip movement does not follow speech
    pub const LIP_SYNC_MISMATCH: &str = "lip_sync_mismatch";
}

/// Named boolean flags attached to an observation
pub type Flags = BTreeMap<String, bool>;

fn default_applicable() -> bool {
    true
}

/// One detection method's output for one analysis request
///
/// `score` is the probability that the media is manipulated. `confidence`
/// falls back to the registry default when absent. An observation with
/// `applicable = false` never contributes to scoring.
///
/// # Example
/// ```rust
/// use trueframe_fusion::types::{flag, MethodId, Observation};
///
/// let face = Observation::new(MethodId::Face, 0.8)
///     .with_confidence(0.7)
///     .with_flag(flag::SYMMETRY_ANOMALY, true);
/// assert!(face.flag(flag::SYMMETRY_ANOMALY));
///
/// let no_face = Observation::inapplicable(MethodId::Face);
/// assert!(!no_face.applicable);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub method: MethodId,
    pub score: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    #[serde(default = "default_applicable")]
    pub applicable: bool,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub flags: Flags,
}

impl Observation {
    /// Applicable observation with no confidence and no flags
    pub fn new(method: MethodId, score: f64) -> Self {
        Self {
            method,
            score,
            confidence: None,
            applicable: true,
            flags: Flags::new(),
        }
    }

    /// Observation for a method that could not run this time
    /// (no face found, no audio track, ...)
    pub fn inapplicable(method: MethodId) -> Self {
        Self {
            method,
            score: 0.0,
            confidence: None,
            applicable: false,
            flags: Flags::new(),
        }
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = Some(confidence);
        self
    }

    pub fn with_flag(mut self, name: impl Into<String>, value: bool) -> Self {
        self.flags.insert(name.into(), value);
        self
    }

    /// Flag value, `false` when absent
    pub fn flag(&self, name: &str) -> bool {
        self.flags.get(name).copied().unwrap_or(false)
    }

    /// Flag value, `None` when absent
    pub fn flag_value(&self, name: &str) -> Option<bool> {
        self.flags.get(name).copied()
    }
}

// ============================================================================
// Errors
// ============================================================================

/// Fusion core error
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FusionError {
    /// Method id not in the active profile's registry
    #[error("Unknown method '{method}' for {profile} profile")]
    UnknownMethod { method: String, profile: Profile },

    /// Score or confidence that cannot be brought into [0, 1]
    #[error("Invalid observation for {method}: {reason}")]
    InvalidObservation { method: MethodId, reason: String },

    /// The same method observed twice in one request
    #[error("Duplicate observation for {method}")]
    DuplicateObservation { method: MethodId },

    /// Rejected configuration value
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}
