//! Credibility report
//!
//! Deterministic narrative for a fusion result: introduction, findings,
//! tier-specific interpretation and a fixed limitation paragraph, joined with
//! blank lines. Same result in, same text out.

use crate::engine::FusionResult;
use crate::risk::RiskTier;
use crate::types::Profile;
use serde::Serialize;
use std::fmt;

const LIMITATION: &str = "This assessment is probabilistic and is not definitive proof of \
authenticity or manipulation. It is meant to support journalistic and legal workflows \
alongside contextual analysis, source verification and human judgment.";

/// Rendered report paragraphs
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CredibilityReport {
    pub introduction: String,
    pub findings: String,
    pub interpretation: String,
    pub limitation: String,
}

impl CredibilityReport {
    /// Build the report for a result
    ///
    /// `frames_analyzed` is mentioned only for the video profile.
    pub fn generate(result: &FusionResult, frames_analyzed: Option<usize>) -> Self {
        let introduction = format!(
            "This {} was analyzed using automated forensic techniques designed to \
             identify potential signs of digital manipulation.",
            result.profile.media_type()
        );

        let mut findings = format!(
            "The estimated manipulation probability is {:.1}%, which corresponds to a \
             {} risk classification.",
            result.final_score * 100.0,
            result.risk_tier.as_str().to_lowercase()
        );
        if let (Profile::Video, Some(frames)) = (result.profile, frames_analyzed) {
            findings.push_str(&format!(
                " A total of {} frames were examined to assess visual consistency over time.",
                frames
            ));
        }

        Self {
            introduction,
            findings,
            interpretation: interpretation(result.risk_tier).to_string(),
            limitation: LIMITATION.to_string(),
        }
    }

    /// Paragraphs in reading order
    pub fn paragraphs(&self) -> [&str; 4] {
        [
            self.introduction.as_str(),
            self.findings.as_str(),
            self.interpretation.as_str(),
            self.limitation.as_str(),
        ]
    }

    pub fn to_text(&self) -> String {
        self.paragraphs().join("\n\n")
    }
}

impl fmt::Display for CredibilityReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_text())
    }
}

fn interpretation(tier: RiskTier) -> &'static str {
    match tier {
        RiskTier::High => {
            "Multiple indicators commonly associated with manipulated or synthetically \
             generated media were detected, such as unnatural visual patterns, facial \
             inconsistencies or artifacts introduced during generation or editing."
        }
        RiskTier::Medium => {
            "Some indicators of potential manipulation were observed, but the evidence \
             is not conclusive. Treat the content with caution and verify it using \
             additional sources."
        }
        RiskTier::Low => {
            "No strong indicators of manipulation were detected. This does not \
             guarantee authenticity, as sophisticated manipulations may evade \
             automated detection."
        }
    }
}
