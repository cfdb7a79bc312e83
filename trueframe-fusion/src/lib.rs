//! # TrueFrame Fusion
//!
//! Evidence fusion core for deepfake detection. External detectors each
//! report an [`Observation`]; the [`FusionEngine`] combines them into one
//! calibrated [`FusionResult`] with a fused score, a confidence and a risk
//! tier.
//!
//! - [`registry`]: per-profile method table (base weights, default confidences)
//! - [`policy`]: redistribution and declarative reweighting rules
//! - [`engine`]: weighted fusion with agreement correction
//! - [`risk`]: score → tier classification
//! - [`breakdown`]: per-method projection of a result for presentation
//! - [`ensemble`], [`frames`]: nested fusion of model votes and video frames
//! - [`report`], [`request`]: narrative report and JSON request/outcome documents
//!
//! The core is synchronous and pure. It performs no I/O and holds no mutable
//! state, so one engine can serve any number of threads.

pub mod agreement;
pub mod breakdown;
pub mod engine;
pub mod ensemble;
pub mod frames;
pub mod policy;
pub mod registry;
pub mod report;
pub mod request;
pub mod risk;
pub mod settings;
pub mod types;

pub use breakdown::Breakdown;
pub use engine::{Contribution, FusionEngine, FusionResult};
pub use registry::MethodRegistry;
pub use request::{AnalysisOutcome, AnalysisRequest};
pub use risk::{classify, RiskThresholds, RiskTier};
pub use settings::FusionSettings;
pub use types::{FusionError, MethodId, Observation, Profile};
