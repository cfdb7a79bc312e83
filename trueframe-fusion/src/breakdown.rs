//! Breakdown Builder
//!
//! Projects a [`FusionResult`] and the observations it was computed from into
//! an ordered, per-method structure for presentation. Contains no scoring
//! logic.

use crate::engine::FusionResult;
use crate::ensemble::{EnsembleOutcome, ModelAgreement};
use crate::types::{flag, MethodId, Observation, Profile};
use serde::Serialize;

/// How a supplied method ended up in the fusion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryStatus {
    /// Contributed to the fused score
    Contributed,
    /// Detector could not run (no face, no audio track, ...)
    Inapplicable,
    /// Method switched off in configuration
    Disabled,
}

/// Flag worth surfacing to a reader
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NotableFlag {
    pub name: String,
    pub value: bool,
    pub description: String,
}

/// Model ensemble details shown under the neural entry
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EnsembleNote {
    pub agreement: ModelAgreement,
    pub models_used: usize,
}

/// One method's line in the breakdown
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BreakdownEntry {
    pub method: MethodId,
    pub label: &'static str,
    pub status: EntryStatus,
    /// Score used by fusion; `None` unless contributed
    pub score: Option<f64>,
    pub effective_weight: f64,
    /// Fraction of `W`
    pub share: f64,
    pub clamped: bool,
    pub notable_flags: Vec<NotableFlag>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ensemble: Option<EnsembleNote>,
}

/// Ordered per-method breakdown in registry order
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Breakdown {
    pub profile: Profile,
    pub entries: Vec<BreakdownEntry>,
}

impl Breakdown {
    /// Build from a result and the observations that produced it
    ///
    /// Methods never supplied are left out.
    pub fn build(result: &FusionResult, observations: &[Observation]) -> Self {
        let entries = result
            .profile
            .methods()
            .iter()
            .filter_map(|&method| {
                let observation = observations.iter().find(|o| o.method == method)?;
                Some(entry_for(result, observation))
            })
            .collect();

        Self {
            profile: result.profile,
            entries,
        }
    }

    /// Attach model ensemble details to the neural entry
    pub fn with_ensemble(mut self, outcome: &EnsembleOutcome) -> Self {
        if let Some(entry) = self.entries.iter_mut().find(|e| e.method == MethodId::Neural) {
            entry.ensemble = Some(EnsembleNote {
                agreement: outcome.agreement,
                models_used: outcome.num_models,
            });
        }
        self
    }

    pub fn entry(&self, method: MethodId) -> Option<&BreakdownEntry> {
        self.entries.iter().find(|e| e.method == method)
    }

    /// Indented human-readable lines
    ///
    /// ```text
    /// Facial Analysis: 0.72
    ///   - Asymmetry detected
    /// Metadata Forensics: n/a
    ///   - Not applicable
    /// ```
    pub fn render_lines(&self) -> Vec<String> {
        let mut lines = Vec::new();
        for entry in &self.entries {
            let value = match (entry.status, entry.score) {
                (EntryStatus::Contributed, Some(score)) => format!("{:.2}", score),
                (EntryStatus::Disabled, _) => "disabled".to_string(),
                _ => "n/a".to_string(),
            };
            lines.push(format!("{}: {}", entry.label, value));

            if entry.status == EntryStatus::Inapplicable {
                lines.push(format!("  - {}", inapplicable_note(entry.method)));
            }
            if let Some(note) = &entry.ensemble {
                lines.push(format!("  - Model Agreement: {}", note.agreement));
                lines.push(format!("  - Models Used: {}", note.models_used));
            }
            for notable in &entry.notable_flags {
                lines.push(format!("  - {}", notable.description));
            }
            if entry.clamped {
                lines.push("  - Out-of-range value clamped".to_string());
            }
        }
        lines
    }
}

fn entry_for(result: &FusionResult, observation: &Observation) -> BreakdownEntry {
    let method = observation.method;
    let total = result.total_effective_weight();

    let (status, score, effective_weight, clamped) = match result.contribution(method) {
        Some(c) => (EntryStatus::Contributed, Some(c.score), c.effective_weight, c.clamped),
        None if result.disabled.contains(&method) => (EntryStatus::Disabled, None, 0.0, false),
        None => (EntryStatus::Inapplicable, None, 0.0, false),
    };

    let notable_flags = if status == EntryStatus::Contributed {
        notable_flags(observation)
    } else {
        Vec::new()
    };

    BreakdownEntry {
        method,
        label: method.display_name(),
        status,
        score,
        effective_weight,
        share: if total > 0.0 { effective_weight / total } else { 0.0 },
        clamped,
        notable_flags,
        ensemble: None,
    }
}

/// Flags that are noteworthy in their false state
const NEGATIVE_SENSE_FLAGS: &[&str] = &[
    flag::EXIF_PRESENT,
    flag::HEARTBEAT_DETECTED,
    flag::LIGHTING_CONSISTENT,
    flag::BLINK_PATTERN_NATURAL,
];

fn notable_flags(observation: &Observation) -> Vec<NotableFlag> {
    observation
        .flags
        .iter()
        .filter(|&(name, &value)| value != NEGATIVE_SENSE_FLAGS.contains(&name.as_str()))
        .map(|(name, &value)| NotableFlag {
            name: name.clone(),
            value,
            description: describe_flag(name),
        })
        .collect()
}

fn describe_flag(name: &str) -> String {
    let text = match name {
        flag::SYMMETRY_ANOMALY => "Asymmetry detected",
        flag::EYE_ANOMALY => "Eye quality issues",
        flag::TEXTURE_ANOMALY => "Unnatural skin texture",
        flag::EXIF_SUSPICIOUS => "Suspicious EXIF data",
        flag::ELA_ANOMALIES => "Compression anomalies detected",
        flag::EXIF_PRESENT => "No EXIF data found",
        flag::FFT_ANOMALY => "FFT anomaly detected",
        flag::DCT_ANOMALY => "DCT anomaly detected",
        flag::HIGH_FREQ_ANOMALY => "High-frequency noise anomaly",
        flag::HEARTBEAT_DETECTED => "No heartbeat signal detected",
        flag::BLINK_PATTERN_NATURAL => "Unnatural blink pattern",
        flag::LIGHTING_CONSISTENT => "Inconsistent lighting",
        flag::IDENTITY_SHIFT => "Identity shift between frames",
        flag::LIP_SYNC_MISMATCH => "Lip-sync mismatch",
        other => return other.replace('_', " "),
    };
    text.to_string()
}

fn inapplicable_note(method: MethodId) -> &'static str {
    match method {
        MethodId::Face => "No face detected",
        MethodId::Audio => "No audio track",
        MethodId::Neural => "No model available",
        MethodId::FrameBased => "No frames analyzed",
        _ => "Not applicable",
    }
}
