//! Config file → settings → engine
//!
//! Tests that touch TRUEFRAME_CONFIG are marked #[serial].

use serial_test::serial;
use std::env;
use std::fs;
use tempfile::TempDir;
use trueframe_common::config::{ConfigResolver, CONFIG_ENV_VAR};
use trueframe_fusion::{
    FusionEngine, FusionError, FusionSettings, MethodId, Observation, Profile, RiskTier,
};

const CONFIG: &str = r#"
[logging]
level = "debug"

[risk]
high = 0.8
medium = 0.3

[image]
disabled = ["metadata"]

[image.weights]
frequency = 0.5

[video]
redistribute_inapplicable = false
"#;

fn engine_from_env(content: &str) -> Result<FusionEngine, FusionError> {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("trueframe.toml");
    fs::write(&path, content).unwrap();
    env::set_var(CONFIG_ENV_VAR, &path);

    let config = ConfigResolver::new("trueframe-fusion")
        .with_search_paths(vec![])
        .load()
        .unwrap();
    env::remove_var(CONFIG_ENV_VAR);

    assert_eq!(config.logging.level, "debug");
    FusionSettings::from_config(&config).map(FusionEngine::with_settings)
}

#[test]
#[serial]
fn test_configured_engine_applies_overrides() {
    let engine = engine_from_env(CONFIG).unwrap();

    let result = engine
        .fuse(
            &[
                Observation::new(MethodId::Neural, 0.7),
                Observation::new(MethodId::Frequency, 0.5),
                Observation::new(MethodId::Metadata, 1.0),
            ],
            Profile::Image,
        )
        .unwrap();

    // Metadata disabled, face's 0.15 still moves to neural
    assert_eq!(result.disabled, vec![MethodId::Metadata]);
    let expected = (0.65 * 0.7 + 0.5 * 0.5) / 1.15;
    assert!((result.final_score - expected).abs() < 1e-12);
    assert_eq!(result.risk_tier, RiskTier::Medium);
    assert_eq!(engine.thresholds().high(), 0.8);
}

#[test]
#[serial]
fn test_invalid_method_in_config_rejected() {
    let err = engine_from_env("[video]\ndisabled = [\"face\"]\n").unwrap_err();
    assert_eq!(
        err,
        FusionError::UnknownMethod {
            method: "face".to_string(),
            profile: Profile::Video,
        }
    );
}

#[test]
#[serial]
fn test_no_config_file_gives_default_engine() {
    env::remove_var(CONFIG_ENV_VAR);
    let dir = TempDir::new().unwrap();

    let config = ConfigResolver::new("trueframe-fusion")
        .with_search_paths(vec![dir.path().join("absent.toml")])
        .load()
        .unwrap();
    let settings = FusionSettings::from_config(&config).unwrap();
    assert_eq!(settings, FusionSettings::default());
}
